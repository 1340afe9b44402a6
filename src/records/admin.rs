//! Decoders for the IDE handshake and the security analyzer.
use serde::Deserialize;
use serde_json::Value as Json;

use crate::{Error, Result, buffer::DecodeError, protocol::Response};

use super::expect_count;

/// Reply to the `IDE_DEFAULT` handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdeInfo {
    pub num1: i64,
    pub server_version: String,
    pub client_version: String,
    pub num2: i64,
    pub num3: i64,
}

pub fn decode_ide_info(response: &Response) -> Result<IdeInfo> {
    expect_count(response.count(), 5)?;

    let mut fields = response.fields();
    let info = IdeInfo {
        num1: fields.integer("num1")?,
        server_version: fields.string()?,
        client_version: fields.string()?,
        num2: fields.integer("num2")?,
        num3: fields.integer("num3")?,
    };
    fields.finish()?;
    Ok(info)
}

/// Handle of a security scan started on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ScanStarted {
    pub id: i64,
}

/// Progress of a security scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AnalyzerStatus {
    #[serde(rename = "totalfiles")]
    pub total_files: i64,
    #[serde(rename = "filesvisitedcount")]
    pub files_visited: i64,
    pub percentage: i64,
    #[serde(rename = "lastupdated")]
    pub last_updated: i64,
}

/// Parses the JSON object a `SECURITYANALYZER` reply carries, failing unless its
/// `status` is `success`.
pub fn decode_analyzer(response: &Response) -> Result<Json> {
    let text = response.single_string()?;
    let json: Json = serde_json::from_str(&text)?;

    let status = json.get("status").and_then(Json::as_str).map(str::to_string);
    if status.as_deref() == Some("success") {
        return Ok(json);
    }

    Err(Error::Analyzer {
        status: status.unwrap_or_else(|| "<missing>".to_string()),
        message: json
            .get("errormessage")
            .and_then(Json::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

impl TryFrom<Json> for ScanStarted {
    type Error = Error;

    fn try_from(json: Json) -> Result<Self> {
        Ok(serde_json::from_value(json)?)
    }
}

impl TryFrom<Json> for AnalyzerStatus {
    type Error = Error;

    fn try_from(json: Json) -> Result<Self> {
        Ok(serde_json::from_value(json)?)
    }
}

/// Fails unless a reply that should be empty really is.
pub(crate) fn expect_empty_message(response: &Response) -> Result<()> {
    let message = response.single_string()?;
    if message.is_empty() {
        Ok(())
    } else {
        Err(DecodeError::InvalidField {
            field: "reply",
            reason: format!("expected an empty message, got '{message}'"),
        }
        .into())
    }
}
