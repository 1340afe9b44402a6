
use crate::buffer::Buffer;

/// Key XOR-ed over the password before it is hex encoded.
const PASSWORD_KEY: &[u8; 8] = b"4p0L@r1$";

const USER_AGENT: &str = "Mozilla/3.0 (compatible; Macromedia RDS Client)";
const DEFAULT_HTTP_PORT: u16 = 80;

/// Well-known command families understood by the RDS endpoint.
pub mod family {
    pub const BROWSE_DIR: &str = "BROWSEDIR";
    pub const FILE_IO: &str = "FILEIO";
    pub const DB_FUNCS: &str = "DBFUNCS";
    pub const DEBUGGER: &str = "DBGREQUEST";
    pub const SECURITY_ANALYZER: &str = "SECURITYANALYZER";
    pub const IDE_DEFAULT: &str = "IDE_DEFAULT";
    pub const ADMIN_API: &str = "ADMINAPI";
}

/// One RDS command: the family name sent as `ACTION` and its ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    command: String,
    args: Vec<Vec<u8>>,
}

impl Request {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<[u8]>) -> Self {
        self.args.push(arg.as_ref().to_vec());
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }

    /// Encodes the argument list followed by the credentials.
    ///
    /// `password` must already be obfuscated. Empty credentials are neither written nor
    /// counted.
    pub fn encode(&self, username: &str, password: &str) -> Buffer {
        let credentials = [username, password]
            .into_iter()
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>();

        let mut payload = Buffer::new();
        payload.append_count(self.args.len() + credentials.len());
        for arg in &self.args {
            payload.append_field(arg);
        }
        for credential in credentials {
            payload.append_field(credential.as_bytes());
        }
        payload
    }

    /// Wraps an encoded payload in the HTTP POST the endpoint expects.
    pub fn frame(&self, host: &str, port: u16, payload: &[u8]) -> Buffer {
        let mut head = format!(
            "POST /CFIDE/main/ide.cfm?CFSRV=IDE&ACTION={} HTTP/1.0\r\n",
            self.command
        );
        if port == DEFAULT_HTTP_PORT {
            head.push_str(&format!("Host: {host}\r\n"));
        } else {
            head.push_str(&format!("Host: {host}:{port}\r\n"));
        }
        head.push_str("Connection: close\r\n");
        head.push_str(&format!("User-Agent: {USER_AGENT}\r\n"));
        head.push_str("Accept: text/html, */*\r\n");
        head.push_str("Accept-Encoding: deflate\r\n");
        head.push_str("Content-type: text/html\r\n");
        head.push_str(&format!("Content-length: {}\r\n\r\n", payload.len()));

        let mut message = Buffer::new();
        message.append_str(&head);
        message.append(payload);
        message
    }
}

/// Obfuscates a password the way the RDS endpoint expects: each byte XOR-ed with the
/// repeating key, then rendered as two lowercase hex digits.
pub fn obfuscate_password(password: &str) -> String {
    password
        .bytes()
        .zip(PASSWORD_KEY.iter().cycle())
        .map(|(b, k)| format!("{:02x}", b ^ k))
        .collect()
}
