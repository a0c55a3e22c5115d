//! Output and control connections
//!
//! Connection instructions are a kind followed by endpoints:
//!
//! ```text
//! tcp 127.0.0.1_5000 127.0.0.1_5001     two TCP outputs
//! pipe 5_6 7_8                          two pipes, as <read fd>_<write fd>
//! ```

use log::info;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;
use std::os::fd::{FromRawFd, RawFd};

use stackpipe_common::CONNECT_GREETING;

use crate::domain::ConnectError;

/// One endpoint of a connection instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Pipe { read_fd: RawFd, write_fd: RawFd },
}

impl Endpoint {
    fn parse_tcp(endpoint: &str) -> Result<Self, ConnectError> {
        let malformed = || ConnectError::MalformedEndpoint(endpoint.to_string());
        let (host, port) = endpoint.rsplit_once('_').ok_or_else(malformed)?;
        if host.is_empty() {
            return Err(malformed());
        }
        let port = port.parse().map_err(|_| malformed())?;
        Ok(Endpoint::Tcp { host: host.to_string(), port })
    }

    fn parse_pipe(endpoint: &str) -> Result<Self, ConnectError> {
        let malformed = || ConnectError::MalformedEndpoint(endpoint.to_string());
        let (read_fd, write_fd) = endpoint.split_once('_').ok_or_else(malformed)?;
        let read_fd: RawFd = read_fd.parse().map_err(|_| malformed())?;
        let write_fd: RawFd = write_fd.parse().map_err(|_| malformed())?;
        if read_fd < 0 || write_fd < 0 {
            return Err(malformed());
        }
        Ok(Endpoint::Pipe { read_fd, write_fd })
    }
}

/// Parse connection instructions into endpoints.
///
/// # Errors
/// Returns an error for an empty string, an unknown kind, or a malformed
/// endpoint
pub fn parse_endpoints(instructions: &str) -> Result<Vec<Endpoint>, ConnectError> {
    let mut parts = instructions.split_whitespace();
    let kind = parts.next().ok_or(ConnectError::Empty)?;

    let parse: fn(&str) -> Result<Endpoint, ConnectError> = match kind {
        "tcp" => Endpoint::parse_tcp,
        "pipe" => Endpoint::parse_pipe,
        other => return Err(ConnectError::UnknownKind(other.to_string())),
    };

    let endpoints = parts.map(parse).collect::<Result<Vec<_>, _>>()?;
    if endpoints.is_empty() {
        return Err(ConnectError::Empty);
    }
    Ok(endpoints)
}

/// Take ownership of a file descriptor inherited from the launching process.
#[allow(unsafe_code)]
fn adopt_fd(fd: RawFd) -> File {
    // SAFETY: the launcher hands each descriptor to this process exclusively;
    // nothing else in the process refers to it.
    unsafe { File::from_raw_fd(fd) }
}

fn connect_tcp(host: &str, port: u16) -> Result<TcpStream, ConnectError> {
    let stream = TcpStream::connect((host, port)).map_err(|source| ConnectError::ConnectFailed {
        endpoint: format!("{host}:{port}"),
        source,
    })?;
    info!("Connected to {host}:{port}");
    Ok(stream)
}

/// A writable connection.
#[derive(Debug)]
pub enum Connection {
    Tcp(TcpStream),
    Pipe(File),
}

impl Connection {
    /// Open an output connection. Pipes only use their write side.
    ///
    /// # Errors
    /// Returns an error if the TCP connection or the greeting fails
    pub fn open(endpoint: &Endpoint) -> Result<Self, ConnectError> {
        match endpoint {
            Endpoint::Tcp { host, port } => Ok(Connection::Tcp(connect_tcp(host, *port)?)),
            Endpoint::Pipe { write_fd, .. } => {
                let mut pipe = adopt_fd(*write_fd);
                pipe.write_all(CONNECT_GREETING.as_bytes())?;
                pipe.flush()?;
                info!("Connected to pipe fd {write_fd}");
                Ok(Connection::Pipe(pipe))
            }
        }
    }

    /// Open a control connection: a reader for bootstrap messages and a
    /// writer for shutdown reports.
    ///
    /// # Errors
    /// Returns an error if the connection or the greeting fails
    pub fn open_control(endpoint: &Endpoint) -> Result<(Box<dyn BufRead>, Self), ConnectError> {
        match endpoint {
            Endpoint::Tcp { host, port } => {
                let stream = connect_tcp(host, *port)?;
                let reader = BufReader::new(stream.try_clone()?);
                Ok((Box::new(reader), Connection::Tcp(stream)))
            }
            Endpoint::Pipe { read_fd, .. } => {
                let reader = BufReader::new(adopt_fd(*read_fd));
                let connection = Self::open(endpoint)?;
                Ok((Box::new(reader), connection))
            }
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Connection::Tcp(stream) => stream.write(buf),
            Connection::Pipe(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Connection::Tcp(stream) => stream.flush(),
            Connection::Pipe(file) => file.flush(),
        }
    }
}
