use std::fmt;

use thiserror::Error;

use crate::{buffer::DecodeError, protocol::TransportError, wddx::WddxError};

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure a command can report.
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("no RDS response found in server reply")]
    ResponseNotFound,

    #[error("server error {code}: {message}")]
    Server { code: i64, message: String },

    #[error("malformed response: {0}")]
    Decode(#[from] DecodeError),

    #[error("malformed exchange packet: {0}")]
    Wddx(#[from] WddxError),

    #[error("malformed JSON response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("security analyzer reported '{status}': {message}")]
    Analyzer { status: String, message: String },
}

impl Error {
    pub fn status(&self) -> Status {
        match self {
            Error::MissingParameter(_) => Status::ParamMissing,
            Error::InvalidInput(_) => Status::InvalidInputParameter,
            Error::Transport(e) => e.status(),
            Error::ResponseNotFound => Status::ResponseNotFound,
            Error::Server { .. } => Status::CommandFailed,
            Error::Wddx(WddxError::IndexTooLarge(_)) => Status::IndexOutOfBounds,
            Error::Wddx(WddxError::EmptySegment(_) | WddxError::TypeMismatch { .. }) => {
                Status::InvalidInputParameter
            }
            Error::Decode(_) | Error::Wddx(_) | Error::Json(_) | Error::Analyzer { .. } => {
                Status::ResponseMalformed
            }
        }
    }

    /// Code reported by the server, when the failure came from it.
    pub fn server_code(&self) -> Option<i64> {
        match self {
            Error::Server { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Message reported by the server, when the failure came from it.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Error::Server { message, .. } => Some(message),
            _ => None,
        }
    }

    /// OS error number behind a socket failure.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Error::Transport(e) => e.raw_os_error(),
            _ => None,
        }
    }
}

/// Coarse classification of a command outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    ParamMissing,
    ConnectionMissing,
    IndexOutOfBounds,
    CommandFailed,
    ResponseMalformed,
    ResponseNotFound,
    DirAlreadyExists,
    SocketCreationFailed,
    HostNotFound,
    ConnectFailed,
    WriteFailed,
    PartialWrite,
    ReadFailed,
    InvalidInputParameter,
    OutOfMemory,
}

impl Status {
    pub fn description(&self) -> &'static str {
        match self {
            Status::Ok => "success",
            Status::ParamMissing => "missing parameter",
            Status::ConnectionMissing => "no connection",
            Status::IndexOutOfBounds => "index out of bounds",
            Status::CommandFailed => "command failed",
            Status::ResponseMalformed => "malformed response",
            Status::ResponseNotFound => "response not found",
            Status::DirAlreadyExists => "directory already exists",
            Status::SocketCreationFailed => "socket creation failed",
            Status::HostNotFound => "host not found",
            Status::ConnectFailed => "connection failed",
            Status::WriteFailed => "write failed",
            Status::PartialWrite => "partial write",
            Status::ReadFailed => "read failed",
            Status::InvalidInputParameter => "invalid input parameter",
            Status::OutOfMemory => "out of memory",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn server_errors_are_command_failures() {
        let err = Error::Server {
            code: -1,
            message: "Access denied".into(),
        };

        assert_eq!(err.status(), Status::CommandFailed);
        assert_eq!(err.server_code(), Some(-1));
        assert_eq!(err.server_message(), Some("Access denied"));
        assert_eq!(err.to_string(), "server error -1: Access denied");
    }

    #[test]
    fn decode_errors_are_malformed() {
        let err: Error = DecodeError::UnterminatedNumber.into();
        assert_eq!(err.status(), Status::ResponseMalformed);
        assert_eq!(err.server_code(), None);
    }

    #[test]
    fn transport_errors_keep_os_error() {
        let io = io::Error::from_raw_os_error(111);
        let err: Error = TransportError::Connect(io).into();

        assert_eq!(err.status(), Status::ConnectFailed);
        assert_eq!(err.raw_os_error(), Some(111));
    }

    #[test]
    fn wddx_errors() {
        let err: Error = WddxError::Xml("unexpected end".into()).into();
        assert_eq!(err.status(), Status::ResponseMalformed);

        let err: Error = WddxError::IndexTooLarge(1 << 20).into();
        assert_eq!(err.status(), Status::IndexOutOfBounds);

        let err: Error = WddxError::EmptySegment("0,".into()).into();
        assert_eq!(err.status(), Status::InvalidInputParameter);
    }

    #[test]
    fn local_errors() {
        assert_eq!(
            Error::MissingParameter("session id").status(),
            Status::ParamMissing
        );
        assert_eq!(
            Error::InvalidInput("empty".into()).status(),
            Status::InvalidInputParameter
        );
    }
}
