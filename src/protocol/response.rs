use log::warn;

use crate::{
    Error, Result,
    buffer::{DecodeError, FieldReader},
};

const STATUS_LINES: [&[u8]; 2] = [b"HTTP/1.1 200 ", b"HTTP/1.0 200 "];
const HEADER_END: &[u8] = b"\r\n\r\n";

/// A successful RDS reply: the field count announced by the server and the encoded
/// fields that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    count: i64,
    body: Vec<u8>,
}

impl Response {
    /// Parses a raw HTTP reply.
    ///
    /// Anything other than a `200` with a header terminator is [`Error::ResponseNotFound`].
    /// A negative leading number turns the rest of the body into [`Error::Server`].
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if !STATUS_LINES.iter().any(|line| raw.starts_with(line)) {
            return Err(Error::ResponseNotFound);
        }
        let body_start = raw
            .windows(HEADER_END.len())
            .position(|w| w == HEADER_END)
            .ok_or(Error::ResponseNotFound)?
            + HEADER_END.len();

        let mut reader = FieldReader::new(&raw[body_start..]);
        let count = reader.number()?;
        if count < 0 {
            let message = String::from_utf8_lossy(reader.rest()).into_owned();
            warn!("server reported error {count}: {message}");
            return Err(Error::Server {
                code: count,
                message,
            });
        }

        Ok(Self {
            count,
            body: reader.rest().to_vec(),
        })
    }

    /// Number of fields the server announced.
    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn fields(&self) -> FieldReader<'_> {
        FieldReader::new(&self.body)
    }

    /// Reads the single string a one-field reply carries, rejecting anything extra.
    pub fn single_string(&self) -> Result<String> {
        if self.count != 1 {
            return Err(DecodeError::FieldCount {
                expected: "1".into(),
                found: self.count,
            }
            .into());
        }
        let mut fields = self.fields();
        let value = fields.string()?;
        fields.finish()?;
        Ok(value)
    }
}
