use std::{
    io::{self, Read, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs},
};

use log::trace;
use thiserror::Error;

use crate::{Status, buffer::Buffer};

const READ_CHUNK: usize = 4096;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not resolve host '{0}'")]
    HostNotFound(String),
    #[error("transport used before it was connected")]
    NotConnected,
    #[error("failed to connect: {0}")]
    Connect(#[source] io::Error),
    #[error("failed to write request: {0}")]
    Write(#[source] io::Error),
    #[error("request cut short after {written} of {expected} bytes")]
    PartialWrite { written: usize, expected: usize },
    #[error("failed to read response: {0}")]
    Read(#[source] io::Error),
}

impl TransportError {
    pub fn status(&self) -> Status {
        match self {
            TransportError::HostNotFound(_) => Status::HostNotFound,
            TransportError::NotConnected => Status::SocketCreationFailed,
            TransportError::Connect(_) => Status::ConnectFailed,
            TransportError::Write(_) => Status::WriteFailed,
            TransportError::PartialWrite { .. } => Status::PartialWrite,
            TransportError::Read(_) => Status::ReadFailed,
        }
    }

    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            TransportError::Connect(e) | TransportError::Write(e) | TransportError::Read(e) => {
                e.raw_os_error()
            }
            _ => None,
        }
    }
}

/// A duplex byte stream to the server, opened once per command.
pub trait Transport {
    fn connect(&mut self, host: &str, port: u16) -> Result<(), TransportError>;

    /// Writes some of `bytes`, returning how many were taken.
    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError>;

    /// Reads into `buf`, returning `0` at end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    fn close(&mut self);
}

/// Blocking TCP [`Transport`].
#[derive(Debug, Default)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn stream(&mut self) -> Result<&mut TcpStream, TransportError> {
        self.stream.as_mut().ok_or(TransportError::NotConnected)
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|_| TransportError::HostNotFound(host.to_string()))?
            .collect::<Vec<_>>();
        if addrs.is_empty() {
            return Err(TransportError::HostNotFound(host.to_string()));
        }

        let stream = TcpStream::connect(&addrs[..]).map_err(TransportError::Connect)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        self.stream()?.write(bytes).map_err(TransportError::Write)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.stream()?.read(buf).map_err(TransportError::Read)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

/// Closes the wrapped transport however the exchange ends.
struct CloseGuard<'a, T: Transport>(&'a mut T);

impl<T: Transport> Drop for CloseGuard<'_, T> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Runs one request/reply exchange per call over a [`Transport`].
#[derive(Debug)]
pub struct ProtocolTransport<T: Transport> {
    transport: T,
}

impl<T: Transport> ProtocolTransport<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Connects, sends `message` in full, reads until the server closes, then closes.
    pub fn exchange(
        &mut self,
        host: &str,
        port: u16,
        message: &[u8],
    ) -> Result<Buffer, TransportError> {
        self.transport.connect(host, port)?;
        let mut guard = CloseGuard(&mut self.transport);

        let mut written = 0;
        while written < message.len() {
            let n = guard.0.write(&message[written..])?;
            if n == 0 {
                return Err(TransportError::PartialWrite {
                    written,
                    expected: message.len(),
                });
            }
            written += n;
        }
        trace!("sent {written} bytes to {host}:{port}");

        let mut reply = Buffer::new();
        while reply.fill(READ_CHUNK, |chunk| guard.0.read(chunk))? > 0 {}
        trace!("received {} bytes from {host}:{port}", reply.len());

        Ok(reply)
    }
}
