use log::trace;

use crate::{
    Error, Result,
    protocol::{Request, Transport, family},
    records::{DebuggerEvent, decode_event, decode_server_port, decode_session_id, decode_stop},
    wddx::{Packet, WddxError},
};

use super::{Connection, required};

/// Optional parts of a debugger event the server should include.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchFlags {
    pub threads: bool,
    pub watch: bool,
    pub scopes: bool,
    pub cf_trace: bool,
    pub java_trace: bool,
}

impl FetchFlags {
    pub fn all() -> Self {
        Self {
            threads: true,
            watch: true,
            scopes: true,
            cf_trace: true,
            java_trace: true,
        }
    }
}

impl<T: Transport> Connection<T> {
    /// Opens a debugging session and returns its id.
    pub fn start(&mut self) -> Result<String> {
        let request = packet(|p| p.put("0,REMOTE_SESSION", true)).map(|xml| {
            Request::new(family::DEBUGGER)
                .arg("DBG_START")
                .arg(xml)
        });
        self.call(request, decode_session_id)
    }

    pub fn stop(&mut self, session_id: &str) -> Result<()> {
        let request = required("session id", session_id).map(|id| {
            Request::new(family::DEBUGGER)
                .arg("DBG_STOP")
                .arg(id)
        });
        self.call(request, decode_stop)
    }

    /// Port the server's debugger listener accepts connections on.
    pub fn server_info(&mut self, session_id: &str) -> Result<u16> {
        let request = required("session id", session_id).map(|id| {
            Request::new(family::DEBUGGER)
                .arg("DBG_GET_DEBUG_SERVER_INFO")
                .arg(id)
        });
        self.call(request, decode_server_port)
    }

    pub fn break_on_exception(&mut self, session_id: &str, enable: bool) -> Result<()> {
        let request = debugger_request(session_id, |p| {
            p.put("0,BREAK_ON_EXCEPTION", enable)?;
            p.put("0,COMMAND", "SESSION_BREAK_ON_EXCEPTION")
        });
        self.call(request, |_| Ok(()))
    }

    pub fn set_breakpoint(&mut self, session_id: &str, pathname: &str, line: u32) -> Result<()> {
        self.breakpoint(session_id, pathname, line, "SET_BREAKPOINT")
    }

    pub fn clear_breakpoint(&mut self, session_id: &str, pathname: &str, line: u32) -> Result<()> {
        self.breakpoint(session_id, pathname, line, "UNSET_BREAKPOINT")
    }

    fn breakpoint(
        &mut self,
        session_id: &str,
        pathname: &str,
        line: u32,
        command: &str,
    ) -> Result<()> {
        let request = required("pathname", pathname).and_then(|pathname| {
            debugger_request(session_id, |p| {
                p.put("0,Y", line)?;
                p.put("0,COMMAND", command)?;
                p.put("0,FILE", pathname)?;
                p.put("0,SEQ", 1.0)
            })
        });
        self.call(request, |_| Ok(()))
    }

    pub fn clear_all_breakpoints(&mut self, session_id: &str) -> Result<()> {
        let request = debugger_request(session_id, |p| p.put("0,COMMAND", "UNSET_ALL_BREAKPOINTS"));
        self.call(request, |_| Ok(()))
    }

    /// Waits for the next debugger event of the session.
    pub fn events(&mut self, session_id: &str) -> Result<DebuggerEvent> {
        let request = required("session id", session_id).map(|id| {
            Request::new(family::DEBUGGER)
                .arg("DBG_EVENTS")
                .arg(id)
        });
        self.call(request, decode_event)
    }

    /// Like [`events`](Self::events), asking the server to include the parts in `flags`.
    pub fn events_with_flags(
        &mut self,
        session_id: &str,
        flags: FetchFlags,
    ) -> Result<DebuggerEvent> {
        let request = required("session id", session_id).and_then(|id| {
            let xml = packet(|p| {
                p.put("THREADS", flags.threads)?;
                p.put("WATCH", flags.watch)?;
                p.put("SCOPES", flags.scopes)?;
                p.put("CF_TRACE", flags.cf_trace)?;
                p.put("JAVA_TRACE", flags.java_trace)
            })?;
            Ok(Request::new(family::DEBUGGER)
                .arg("DBG_EVENTS")
                .arg(id)
                .arg(xml))
        });
        self.call(request, decode_event)
    }

    pub fn step_in(&mut self, session_id: &str, thread: &str) -> Result<()> {
        self.thread_command(session_id, thread, "STEP_IN")
    }

    pub fn step_over(&mut self, session_id: &str, thread: &str) -> Result<()> {
        self.thread_command(session_id, thread, "STEP_OVER")
    }

    pub fn step_out(&mut self, session_id: &str, thread: &str) -> Result<()> {
        self.thread_command(session_id, thread, "STEP_OUT")
    }

    /// Lets a stopped thread run on.
    pub fn resume(&mut self, session_id: &str, thread: &str) -> Result<()> {
        self.thread_command(session_id, thread, "CONTINUE")
    }

    fn thread_command(&mut self, session_id: &str, thread: &str, command: &str) -> Result<()> {
        let request = required("thread", thread).and_then(|thread| {
            debugger_request(session_id, |p| {
                p.put("0,COMMAND", command)?;
                p.put("0,THREAD", thread)
            })
        });
        self.call(request, |_| Ok(()))
    }

    /// Asks for the value of `variable` in a stopped thread; the value arrives as an event.
    pub fn watch_expression(&mut self, session_id: &str, thread: &str, variable: &str) -> Result<()> {
        let request = required("thread", thread)
            .and_then(|thread| Ok((thread, required("variable", variable)?)))
            .and_then(|(thread, variable)| {
                debugger_request(session_id, |p| {
                    p.put("0,VARIABLE_NAME", variable)?;
                    p.put("0,COMMAND", "GET_SINGLE_CF_VARIABLE")?;
                    p.put("0,THREAD", thread)
                })
            });
        self.call(request, |_| Ok(()))
    }

    pub fn set_variable(
        &mut self,
        session_id: &str,
        thread: &str,
        variable: &str,
        value: &str,
    ) -> Result<()> {
        let request = required("thread", thread)
            .and_then(|thread| Ok((thread, required("variable", variable)?)))
            .and_then(|(thread, variable)| {
                debugger_request(session_id, |p| {
                    p.put("0,VARIABLE_VALUE", value)?;
                    p.put("0,VARIABLE_NAME", variable)?;
                    p.put("0,COMMAND", "SET_VARIABLE_VALUE")?;
                    p.put("0,THREAD", thread)
                })
            });
        self.call(request, |_| Ok(()))
    }

    /// Replaces the session's watch list. Empty names are skipped; at least one must remain.
    pub fn watch_variables(&mut self, session_id: &str, variables: &[&str]) -> Result<()> {
        let names: Vec<&str> = variables.iter().copied().filter(|v| !v.is_empty()).collect();
        let request = if names.is_empty() {
            Err(Error::InvalidInput("no variables to watch".into()))
        } else {
            debugger_request(session_id, |p| {
                p.put("0,COMMAND", "SET_WATCH_VARIABLES")?;
                names
                    .iter()
                    .enumerate()
                    .try_for_each(|(i, name)| p.put(&format!("0,WATCH,{i}"), *name))
            })
        };
        self.call(request, |_| Ok(()))
    }

    /// Asks for the page output a thread has produced so far.
    pub fn get_output(&mut self, session_id: &str, thread: &str) -> Result<()> {
        let request = required("thread", thread).and_then(|thread| {
            debugger_request(session_id, |p| {
                p.put("0,BODY_ONLY", true)?;
                p.put("0,THREAD", thread)
            })
        });
        self.call(request, |_| Ok(()))
    }

    /// Limits which variable scopes events report, e.g. `"VARIABLES,FORM"`.
    pub fn set_scope_filter(&mut self, session_id: &str, filter: &str) -> Result<()> {
        let request = debugger_request(session_id, |p| {
            p.put("0,FILTER", filter)?;
            p.put("0,COMMAND", "SET_SCOPE_FILTER")
        });
        self.call(request, |_| Ok(()))
    }
}

/// Builds a packet and renders it to XML.
fn packet(
    build: impl FnOnce(&mut Packet) -> std::result::Result<(), WddxError>,
) -> Result<String> {
    let mut packet = Packet::new();
    build(&mut packet)?;
    let xml = packet.to_xml()?;
    trace!("debugger packet: {xml}");
    Ok(xml)
}

/// A `DBG_REQUEST` carrying the packet `build` fills in.
fn debugger_request(
    session_id: &str,
    build: impl FnOnce(&mut Packet) -> std::result::Result<(), WddxError>,
) -> Result<Request> {
    let session_id = required("session id", session_id)?;
    let xml = packet(build)?;
    Ok(Request::new(family::DEBUGGER)
        .arg("DBG_REQUEST")
        .arg(session_id)
        .arg(xml))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Status,
        protocol::ScriptedTransport,
        records::EventKind,
        session::testing::{connection, fields, sent_args},
    };

    fn sent_packet(connection: &Connection<ScriptedTransport>, n: usize) -> Packet {
        let args = sent_args(connection, n);
        Packet::from_xml(args.last().unwrap()).unwrap()
    }

    fn event_body(build: impl FnOnce(&mut Packet)) -> Vec<u8> {
        let mut packet = Packet::new();
        build(&mut packet);
        fields(&[packet.to_xml().unwrap().as_bytes()])
    }

    #[test]
    fn start_returns_session_id() {
        let mut connection = connection(ScriptedTransport::new().reply(fields(&[b"D1E2"])));

        assert_eq!(connection.start().unwrap(), "D1E2");

        let args = sent_args(&connection, 0);
        assert_eq!(args[0], "DBG_START");
        assert_eq!(sent_packet(&connection, 0).get_bool("0,REMOTE_SESSION"), Some(true));
    }

    #[test]
    fn start_rejects_empty_id() {
        let mut connection = connection(ScriptedTransport::new().reply(fields(&[b""])));

        assert!(connection.start().is_err());
        assert_eq!(connection.last_status(), Status::ResponseMalformed);
    }

    #[test]
    fn stop_needs_session() {
        let transport = ScriptedTransport::new().reply("0:");
        let mut connection = connection(transport);

        assert!(matches!(
            connection.stop(""),
            Err(Error::MissingParameter("session id"))
        ));
        connection.stop("D1E2").unwrap();
        assert_eq!(sent_args(&connection, 0), ["DBG_STOP", "D1E2"]);
    }

    #[test]
    fn stop_rejects_short_reply() {
        let mut connection = connection(ScriptedTransport::new().reply("2:7:stopped"));

        assert!(connection.stop("D1E2").is_err());
        assert_eq!(connection.last_status(), Status::ResponseMalformed);
    }

    #[test]
    fn server_info_port() {
        let body = event_body(|p| p.put("0,DEBUG_SERVER_PORT", 5005).unwrap());
        let mut connection = connection(ScriptedTransport::new().reply(body));

        assert_eq!(connection.server_info("D1E2").unwrap(), 5005);
        assert_eq!(sent_args(&connection, 0), ["DBG_GET_DEBUG_SERVER_INFO", "D1E2"]);
    }

    #[test]
    fn breakpoints() {
        let transport = ScriptedTransport::new().reply("0:").reply("0:").reply("0:");
        let mut connection = connection(transport);

        connection.set_breakpoint("D1E2", "/app/index.cfm", 12).unwrap();
        connection.clear_breakpoint("D1E2", "/app/index.cfm", 12).unwrap();
        connection.clear_all_breakpoints("D1E2").unwrap();

        let args = sent_args(&connection, 0);
        assert_eq!(&args[..2], ["DBG_REQUEST", "D1E2"]);

        let set = sent_packet(&connection, 0);
        assert_eq!(set.get_string("0,COMMAND"), Some("SET_BREAKPOINT"));
        assert_eq!(set.get_string("0,FILE"), Some("/app/index.cfm"));
        assert_eq!(set.get_number("0,Y"), Some(12.0));
        assert_eq!(set.get_number("0,SEQ"), Some(1.0));

        let cleared = sent_packet(&connection, 1);
        assert_eq!(cleared.get_string("0,COMMAND"), Some("UNSET_BREAKPOINT"));

        let all = sent_packet(&connection, 2);
        assert_eq!(all.get_string("0,COMMAND"), Some("UNSET_ALL_BREAKPOINTS"));
    }

    #[test]
    fn break_on_exception_packet() {
        let mut connection = connection(ScriptedTransport::new().reply("0:"));

        connection.break_on_exception("D1E2", true).unwrap();

        let packet = sent_packet(&connection, 0);
        assert_eq!(packet.get_bool("0,BREAK_ON_EXCEPTION"), Some(true));
        assert_eq!(
            packet.get_string("0,COMMAND"),
            Some("SESSION_BREAK_ON_EXCEPTION")
        );
    }

    #[test]
    fn events_are_classified() {
        let body = event_body(|p| {
            p.put("0,EVENT", "BREAKPOINT").unwrap();
            p.put("0,GET_SOURCE", "/app/index.cfm").unwrap();
            p.put("0,LINE", 12).unwrap();
            p.put("0,THREAD", "web-3").unwrap();
        });
        let mut connection = connection(ScriptedTransport::new().reply(body));

        let event = connection.events("D1E2").unwrap();

        assert!(matches!(
            event.kind(),
            EventKind::Breakpoint(stop) if stop.line == Some(12) && stop.thread == "web-3"
        ));
        assert_eq!(sent_args(&connection, 0), ["DBG_EVENTS", "D1E2"]);
    }

    #[test]
    fn events_with_flags_packet() {
        let body = event_body(|p| p.put("0,EVENT", "STEP").unwrap());
        let mut connection = connection(ScriptedTransport::new().reply(body));

        let flags = FetchFlags {
            threads: true,
            scopes: true,
            ..FetchFlags::default()
        };
        connection.events_with_flags("D1E2", flags).unwrap();

        let packet = sent_packet(&connection, 0);
        assert_eq!(packet.get_bool("THREADS"), Some(true));
        assert_eq!(packet.get_bool("WATCH"), Some(false));
        assert_eq!(packet.get_bool("SCOPES"), Some(true));
        assert_eq!(packet.get_bool("JAVA_TRACE"), Some(false));
    }

    #[test]
    fn stepping_names_the_thread() {
        let transport = ScriptedTransport::new()
            .reply("0:")
            .reply("0:")
            .reply("0:")
            .reply("0:");
        let mut connection = connection(transport);

        connection.step_in("D1E2", "web-3").unwrap();
        connection.step_over("D1E2", "web-3").unwrap();
        connection.step_out("D1E2", "web-3").unwrap();
        connection.resume("D1E2", "web-3").unwrap();

        let commands: Vec<String> = (0..4)
            .map(|n| {
                let packet = sent_packet(&connection, n);
                assert_eq!(packet.get_string("0,THREAD"), Some("web-3"));
                packet.get_string("0,COMMAND").unwrap().to_string()
            })
            .collect();
        assert_eq!(commands, ["STEP_IN", "STEP_OVER", "STEP_OUT", "CONTINUE"]);
    }

    #[test]
    fn variables() {
        let transport = ScriptedTransport::new().reply("0:").reply("0:");
        let mut connection = connection(transport);

        connection.watch_expression("D1E2", "web-3", "form.id").unwrap();
        connection
            .set_variable("D1E2", "web-3", "variables.count", "42")
            .unwrap();

        let watch = sent_packet(&connection, 0);
        assert_eq!(watch.get_string("0,VARIABLE_NAME"), Some("form.id"));
        assert_eq!(watch.get_string("0,COMMAND"), Some("GET_SINGLE_CF_VARIABLE"));

        let set = sent_packet(&connection, 1);
        assert_eq!(set.get_string("0,VARIABLE_VALUE"), Some("42"));
        assert_eq!(set.get_string("0,COMMAND"), Some("SET_VARIABLE_VALUE"));
    }

    #[test]
    fn watch_variables_skips_empty_names() {
        let mut connection = connection(ScriptedTransport::new().reply("0:"));

        connection
            .watch_variables("D1E2", &["a", "", "b"])
            .unwrap();

        let packet = sent_packet(&connection, 0);
        assert_eq!(packet.get_string("0,COMMAND"), Some("SET_WATCH_VARIABLES"));
        assert_eq!(packet.get_string("0,WATCH,0"), Some("a"));
        assert_eq!(packet.get_string("0,WATCH,1"), Some("b"));
        assert_eq!(packet.get("0,WATCH,2"), None);
    }

    #[test]
    fn watch_variables_needs_a_name() {
        let mut connection = connection(ScriptedTransport::new());

        assert!(matches!(
            connection.watch_variables("D1E2", &["", ""]),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(connection.last_status(), Status::InvalidInputParameter);
        assert!(connection.transport().connects.is_empty());
    }

    #[test]
    fn output_and_scope_filter() {
        let transport = ScriptedTransport::new().reply("0:").reply("0:");
        let mut connection = connection(transport);

        connection.get_output("D1E2", "web-3").unwrap();
        connection.set_scope_filter("D1E2", "VARIABLES,FORM").unwrap();

        assert_eq!(sent_packet(&connection, 0).get_bool("0,BODY_ONLY"), Some(true));
        assert_eq!(
            sent_packet(&connection, 1).get_string("0,FILTER"),
            Some("VARIABLES,FORM")
        );
    }
}
