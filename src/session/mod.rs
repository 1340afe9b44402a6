//! Connections and the commands they run.
//!
//! A [`Connection`] holds the server address and credentials and runs each command as one
//! request/reply exchange over a fresh transport connection. Commands are grouped by the
//! RDS family they belong to:
//!
//! - files and directories (`BROWSEDIR`, `FILEIO`)
//! - data sources (`DBFUNCS`)
//! - the line debugger (`DBGREQUEST`)
//! - the security analyzer, the IDE handshake and the admin API
//!
//! Every command returns a [`Result`]. The most recent failure is also kept on the
//! connection and can be inspected through [`Connection::last_error`] until the next
//! command starts.
use log::{debug, trace, warn};

use crate::{
    Error, Result, Status,
    protocol::{ProtocolTransport, Request, Response, TcpTransport, Transport, obfuscate_password},
};

mod admin;
mod debugger;
mod file;
mod sql;

pub use debugger::FetchFlags;

/// Summary of the failure recorded by the last command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    pub status: Status,
    /// Code reported by the server, if the server reported the failure.
    pub code: Option<i64>,
    pub message: String,
    pub os_error: Option<i32>,
}

impl From<&Error> for LastError {
    fn from(err: &Error) -> Self {
        Self {
            status: err.status(),
            code: err.server_code(),
            message: err
                .server_message()
                .map_or_else(|| err.to_string(), str::to_string),
            os_error: err.raw_os_error(),
        }
    }
}

/// An RDS server endpoint and the credentials used for it.
#[derive(Debug)]
pub struct Connection<T: Transport = TcpTransport> {
    host: String,
    port: u16,
    username: String,
    password: String,
    obfuscated: String,
    transport: ProtocolTransport<T>,
    last_error: Option<LastError>,
}

impl Connection {
    /// Connection over plain TCP.
    pub fn new(host: &str, port: u16, username: &str, password: &str) -> Result<Self> {
        Self::with_transport(host, port, username, password, TcpTransport::new())
    }
}

impl<T: Transport> Connection<T> {
    pub fn with_transport(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        transport: T,
    ) -> Result<Self> {
        if host.is_empty() {
            return Err(Error::MissingParameter("host"));
        }
        if port == 0 {
            return Err(Error::InvalidInput("port must be non-zero".into()));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            username: username.to_string(),
            password: password.to_string(),
            obfuscated: obfuscate_password(password),
            transport: ProtocolTransport::new(transport),
            last_error: None,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn transport(&self) -> &T {
        self.transport.get_ref()
    }

    /// Failure recorded by the last command, if it failed.
    pub fn last_error(&self) -> Option<&LastError> {
        self.last_error.as_ref()
    }

    pub fn last_status(&self) -> Status {
        self.last_error.as_ref().map_or(Status::Ok, |e| e.status)
    }

    /// Runs one command: sends `request` if it was built, decodes the reply and records
    /// the outcome.
    fn call<R>(
        &mut self,
        request: Result<Request>,
        decode: impl FnOnce(&Response) -> Result<R>,
    ) -> Result<R> {
        self.last_error = None;

        let result = request.and_then(|request| {
            let response = self.send(&request)?;
            decode(&response)
        });

        if let Err(err) = &result {
            if err.status() == Status::ResponseMalformed {
                warn!("malformed reply from {}:{}: {err}", self.host, self.port);
            }
            self.last_error = Some(LastError::from(err));
        }
        result
    }

    /// Forgets the recorded failure, for commands that turn one into a success.
    fn clear_error(&mut self) {
        self.last_error = None;
    }

    fn send(&mut self, request: &Request) -> Result<Response> {
        let payload = request.encode(&self.username, &self.obfuscated);
        trace!(
            "{} payload is {} bytes in {} arguments",
            request.command(),
            payload.len(),
            request.args().len()
        );

        let message = request.frame(&self.host, self.port, payload.as_bytes());
        debug!("sending {} to {}:{}", request.command(), self.host, self.port);

        let reply = self
            .transport
            .exchange(&self.host, self.port, message.as_bytes())?;
        debug!("{} replied with {} bytes", request.command(), reply.len());

        Response::parse(reply.as_bytes())
    }
}

/// Rejects an empty required argument.
fn required<'a>(name: &'static str, value: &'a str) -> Result<&'a str> {
    if value.is_empty() {
        Err(Error::MissingParameter(name))
    } else {
        Ok(value)
    }
}


#[cfg(test)]
mod tests {
    use super::{testing::*, *};
    use crate::protocol::ScriptedTransport;

    #[test]
    fn new_validates_endpoint() {
        assert!(matches!(
            Connection::new("", 8500, "", ""),
            Err(Error::MissingParameter("host"))
        ));
        assert!(matches!(
            Connection::new("cf.local", 0, "", ""),
            Err(Error::InvalidInput(_))
        ));

        let connection = Connection::new("cf.local", 8500, "admin", "secret123").unwrap();
        assert_eq!(connection.host(), "cf.local");
        assert_eq!(connection.port(), 8500);
        assert_eq!(connection.username(), "admin");
        assert_eq!(connection.password(), "secret123");
        assert_eq!(connection.last_status(), Status::Ok);
    }

    #[test]
    fn credentials_follow_arguments() {
        let mut connection = connection(ScriptedTransport::new().reply(fields(&[b"C:\\cf"])));
        connection.root_dir().unwrap();

        let body = connection.transport().sent_body(0);
        assert_eq!(
            body,
            b"4:STR:0:STR:12:CF_DIRECTORYSTR:5:adminSTR:10:55145d252e"
        );
    }

    #[test]
    fn anonymous_requests_omit_credentials() {
        let transport = ScriptedTransport::new().reply(fields(&[b"C:\\cf"]));
        let mut connection = Connection::with_transport("cf.local", 80, "", "", transport).unwrap();
        connection.root_dir().unwrap();

        assert_eq!(
            connection.transport().sent_body(0),
            b"2:STR:0:STR:12:CF_DIRECTORY"
        );
    }

    #[test]
    fn server_error_is_recorded_then_cleared() {
        let transport = ScriptedTransport::new()
            .reply("-1:Access denied")
            .reply(fields(&[b"C:\\cf"]));
        let mut connection = connection(transport);

        let err = connection.root_dir().unwrap_err();
        assert_eq!(err.status(), Status::CommandFailed);
        assert_eq!(
            connection.last_error(),
            Some(&LastError {
                status: Status::CommandFailed,
                code: Some(-1),
                message: "Access denied".into(),
                os_error: None,
            })
        );

        connection.root_dir().unwrap();
        assert_eq!(connection.last_error(), None);
        assert_eq!(connection.last_status(), Status::Ok);
    }

    #[test]
    fn transport_failure_is_recorded() {
        let mut transport = ScriptedTransport::new();
        transport.refuse_connect = true;
        let mut connection = connection(transport);

        assert!(connection.root_dir().is_err());
        assert_eq!(connection.last_status(), Status::ConnectFailed);
    }

    #[test]
    fn missing_envelope_is_not_found() {
        let transport = ScriptedTransport::new().raw_reply("HTTP/1.1 200 OK\r\n");
        let mut connection = connection(transport);

        assert!(matches!(connection.root_dir(), Err(Error::ResponseNotFound)));
        assert_eq!(connection.last_status(), Status::ResponseNotFound);
    }

    #[test]
    fn local_validation_skips_the_network() {
        let mut connection = connection(ScriptedTransport::new());

        assert!(matches!(
            connection.read_file(""),
            Err(Error::MissingParameter(_))
        ));
        assert_eq!(connection.last_status(), Status::ParamMissing);
        assert!(connection.transport().connects.is_empty());
    }
}
