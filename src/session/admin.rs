use crate::{
    Result,
    buffer::DecodeError,
    protocol::{Request, Response, Transport, family},
    records::{
        AnalyzerStatus, IdeInfo, ScanStarted, decode_analyzer, decode_ide_info,
        expect_empty_message,
    },
    wddx::{Packet, Value},
};

use super::{Connection, required};

const DEBUGGING_API: &str = "cfide.adminapi.debugging";
const EXTENSIONS_API: &str = "cfide.adminapi.extensions";

impl<T: Transport> Connection<T> {
    /// Starts a security scan of `pathnames` and returns its command id.
    pub fn scan(&mut self, pathnames: &str, recursive: bool, cores: u32) -> Result<i64> {
        let request = required("pathnames", pathnames).map(|pathnames| {
            analyzer("scan")
                .arg(pathnames)
                .arg(if recursive { "true" } else { "false" })
                .arg(cores.to_string())
        });
        self.call(request, |r| Ok(ScanStarted::try_from(decode_analyzer(r)?)?.id))
    }

    pub fn cancel(&mut self, command_id: i64) -> Result<()> {
        let request = Ok(analyzer("cancel").arg(command_id.to_string()));
        self.call(request, |r| decode_analyzer(r).map(|_| ()))
    }

    /// Progress of a running scan.
    pub fn status(&mut self, command_id: i64) -> Result<AnalyzerStatus> {
        let request = Ok(analyzer("status").arg(command_id.to_string()));
        self.call(request, |r| AnalyzerStatus::try_from(decode_analyzer(r)?))
    }

    /// Findings of a finished scan, as the JSON document the server sent.
    pub fn result(&mut self, command_id: i64) -> Result<String> {
        let request = Ok(analyzer("result").arg(command_id.to_string()));
        self.call(request, Response::single_string)
    }

    /// Discards a scan's results on the server.
    pub fn clean(&mut self, command_id: i64) -> Result<()> {
        let request = Ok(analyzer("clean").arg(command_id.to_string()));
        self.call(request, |r| decode_analyzer(r).map(|_| ()))
    }

    /// Handshake an IDE performs first, announcing its protocol version.
    pub fn ide_default(&mut self, version: i32) -> Result<IdeInfo> {
        let request = Ok(Request::new(family::IDE_DEFAULT)
            .arg("")
            .arg(format!("{version},")));
        self.call(request, decode_ide_info)
    }

    /// Value of a logging property. `None` when the server has nothing to report.
    pub fn log_property(&mut self, property: &str) -> Result<Option<String>> {
        let request = required("property", property)
            .map(|p| admin_api(DEBUGGING_API, "getlogproperty").arg(p));
        self.call(request, decode_log_property)
    }

    pub fn custom_tag_paths(&mut self) -> Result<Packet> {
        let request = Ok(admin_api(EXTENSIONS_API, "getcustomtagpaths"));
        self.call(request, decode_packet)
    }

    /// Maps the logical path `name` to the directory `path`.
    pub fn set_mapping(&mut self, name: &str, path: &str) -> Result<()> {
        let request = required("mapping name", name).and_then(|name| {
            let path = required("mapping path", path)?;
            Ok(admin_api(EXTENSIONS_API, "setmappings").arg(format!("name:{name};path:{path}")))
        });
        self.call(request, expect_empty_message)
    }

    pub fn delete_mapping(&mut self, name: &str) -> Result<()> {
        let request =
            required("mapping name", name).map(|n| admin_api(EXTENSIONS_API, "deletemappings").arg(n));
        self.call(request, expect_empty_message)
    }

    pub fn mappings(&mut self) -> Result<Packet> {
        let request = Ok(admin_api(EXTENSIONS_API, "getmappings"));
        self.call(request, decode_packet)
    }
}

fn analyzer(operation: &str) -> Request {
    Request::new(family::SECURITY_ANALYZER).arg(operation)
}

fn admin_api(component: &str, method: &str) -> Request {
    Request::new(family::ADMIN_API).arg(component).arg(method)
}

fn decode_packet(response: &Response) -> Result<Packet> {
    Ok(Packet::from_xml(&response.single_string()?)?)
}

fn decode_log_property(response: &Response) -> Result<Option<String>> {
    let xml = response.single_string()?;
    if xml.is_empty() {
        return Ok(None);
    }

    match Packet::from_xml(&xml)?.into_data() {
        Some(Value::String(value)) => Ok(Some(value)),
        other => Err(DecodeError::InvalidField {
            field: "log property",
            reason: format!(
                "expected a string, found {}",
                other.as_ref().map_or("nothing", Value::kind)
            ),
        }
        .into()),
    }
}
