//! Decoders for `DBGREQUEST` replies.
use crate::{
    Error, Result,
    buffer::DecodeError,
    protocol::Response,
    wddx::{Packet, Value},
};

use super::{decode_first_string, record_count};

/// Where a thread stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopLocation {
    pub source: String,
    pub line: Option<i64>,
    pub thread: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// The server resolved a breakpoint request to an actual line.
    BreakpointSet {
        pathname: String,
        requested_line: Option<i64>,
        actual_line: Option<i64>,
    },
    Breakpoint(StopLocation),
    Step(StopLocation),
    Unknown,
}

/// A debugger event, kept as the tree the server sent alongside its classification.
#[derive(Debug, Clone, PartialEq)]
pub struct DebuggerEvent {
    packet: Packet,
    kind: EventKind,
}

impl DebuggerEvent {
    pub fn from_packet(packet: Packet) -> Self {
        let kind = match packet.get_string("0,EVENT") {
            Some("CF_BREAKPOINT_SET") => EventKind::BreakpointSet {
                pathname: string_at(&packet, "0,CFML_PATH"),
                requested_line: line_at(&packet, "0,REQ_LINE_NUM"),
                actual_line: line_at(&packet, "0,ACTUAL_LINE_NUM"),
            },
            Some("BREAKPOINT") => EventKind::Breakpoint(StopLocation::from_packet(&packet)),
            Some("STEP") => EventKind::Step(StopLocation::from_packet(&packet)),
            _ => EventKind::Unknown,
        };
        Self { packet, kind }
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Event name as sent by the server.
    pub fn name(&self) -> Option<&str> {
        self.packet.get_string("0,EVENT")
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub fn scopes(&self) -> Option<&Value> {
        self.packet.get("0,SCOPES")
    }

    pub fn threads(&self) -> Option<&Value> {
        self.packet.get("0,THREADS")
    }

    pub fn watch(&self) -> Option<&Value> {
        self.packet.get("0,WATCH")
    }

    pub fn cf_trace(&self) -> Option<&Value> {
        self.packet.get("0,CF_TRACE")
    }

    pub fn java_trace(&self) -> Option<&Value> {
        self.packet.get("0,JAVA_TRACE")
    }
}

impl StopLocation {
    fn from_packet(packet: &Packet) -> Self {
        Self {
            source: string_at(packet, "0,GET_SOURCE"),
            line: line_at(packet, "0,LINE"),
            thread: string_at(packet, "0,THREAD"),
        }
    }
}

fn string_at(packet: &Packet, path: &str) -> String {
    packet.get_string(path).unwrap_or_default().to_string()
}

fn line_at(packet: &Packet, path: &str) -> Option<i64> {
    let line = packet.get_number(path)?;
    line.is_finite().then_some(line as i64)
}

/// Session id handed out by `DBG_START`: the first field of the reply.
pub fn decode_session_id(response: &Response) -> Result<String> {
    let id = decode_first_string(response)?;
    if id.is_empty() {
        return Err(DecodeError::InvalidField {
            field: "session id",
            reason: "empty".into(),
        }
        .into());
    }
    Ok(id)
}

/// Port of the debugger listener, read from `DBG_GET_DEBUG_SERVER_INFO`.
pub fn decode_server_port(response: &Response) -> Result<u16> {
    let packet = Packet::from_xml(&response.single_string()?)?;
    let port = packet
        .get_number("0,DEBUG_SERVER_PORT")
        .ok_or(DecodeError::InvalidField {
            field: "debug server port",
            reason: "missing".into(),
        })?;

    if port.fract() != 0.0 || !(0.0..=f64::from(u16::MAX)).contains(&port) {
        return Err(Error::Decode(DecodeError::InvalidField {
            field: "debug server port",
            reason: format!("{port} is not a port number"),
        }));
    }
    Ok(port as u16)
}

/// Event carried as a WDDX document in a one-field reply.
pub fn decode_event(response: &Response) -> Result<DebuggerEvent> {
    let packet = Packet::from_xml(&response.single_string()?)?;
    Ok(DebuggerEvent::from_packet(packet))
}

/// Acknowledgement of `DBG_STOP`: the announced fields and nothing after them.
pub fn decode_stop(response: &Response) -> Result<()> {
    let count = record_count(response.count(), 1)?;
    let mut fields = response.fields();
    for _ in 0..count {
        fields.bytes()?;
    }
    fields.finish()?;
    Ok(())
}
