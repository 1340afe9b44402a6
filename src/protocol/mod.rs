//! RDS wire protocol.
//!
//! This module defines how commands are sent to a ColdFusion server's remote development
//! endpoint and how its replies are interpreted. It owns request encoding, the HTTP framing
//! around it, the transport abstraction, and decoding of the response envelope.
//!
//! # Overview
//!
//! Every command is a single HTTP/1.0 `POST` to `/CFIDE/main/ide.cfm?CFSRV=IDE&ACTION=<family>`
//! on a fresh connection. The server answers and closes the socket, so a reply is simply
//! everything read until end of stream.
//!
//! # Key Components
//!
//! - [`Request`]: a command family plus its ordered byte-string arguments.
//! - [`Response`]: the decoded envelope of a successful reply.
//! - [`Transport`]: the duplex byte stream a command runs over, with [`TcpTransport`] as
//!   the blocking TCP implementation.
//! - [`ProtocolTransport`]: drives one connect/write/read/close exchange.
//!
//! # Request Format
//!
//! The POST body is a field count followed by that many fields:
//!
//! ```text
//! 3:STR:7:C:\temp STR:5:admin STR:10:55145d252e
//! ```
//!
//! (spaces added for readability). The username and the obfuscated password are appended
//! after the command arguments and counted only when non-empty. The password is XOR-ed
//! with a fixed 8-byte key and hex encoded; see [`obfuscate_password`].
//!
//! # Response Format
//!
//! The reply must be an HTTP `200`. Its body starts with a signed number followed by `:`.
//! A negative number is an error code and the remainder of the body is the server's
//! message. Otherwise the number is the count of length-prefixed fields that follow, each
//! written as `<len>:<bytes>`. Interpreting those fields is left to
//! [`records`](crate::records) and [`wddx`](crate::wddx).
mod request;
mod response;
mod transport;

pub use request::{Request, family, obfuscate_password};
pub use response::Response;
pub use transport::{ProtocolTransport, TcpTransport, Transport, TransportError};

#[cfg(test)]
pub(crate) use transport::scripted::ScriptedTransport;
