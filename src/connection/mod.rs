//! Connection layer
//!
//! This module opens the byte stream to an X server via TCP or Unix sockets
//! and defines the `Transport` seam the handshake is written against.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

use thiserror::Error;

/// Directory holding the local X server sockets
pub const X11_UNIX_DIR: &str = "/tmp/.X11-unix";

/// TCP port of display 0
pub const X11_TCP_PORT_BASE: u16 = 6000;

/// Byte stream the handshake runs over
pub trait Transport {
    /// Write all of `bytes`
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read at most `buf.len()` bytes, returning 0 at end of stream
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<T: Read + Write> Transport for T {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)?;
        self.flush()
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("empty display name")]
    Empty,
    #[error("display name {0:?} has no ':'")]
    MissingColon(String),
    #[error("invalid display number in {0:?}")]
    BadDisplayNumber(String),
}

/// Where a display name says the server listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayAddress {
    Unix(PathBuf),
    Tcp { host: String, port: u16 },
}

impl DisplayAddress {
    /// Parse a `DISPLAY`-style name: `:0`, `:1.0`, `unix:0`, `host:2`, or an
    /// absolute socket path.
    pub fn parse(name: &str) -> Result<Self, AddressError> {
        if name.is_empty() {
            return Err(AddressError::Empty);
        }
        if name.starts_with('/') {
            return Ok(DisplayAddress::Unix(PathBuf::from(name)));
        }

        let (host, rest) = name
            .rsplit_once(':')
            .ok_or_else(|| AddressError::MissingColon(name.to_string()))?;

        // Screen number after '.' is irrelevant to where we connect
        let number = rest.split_once('.').map_or(rest, |(display, _)| display);
        let display: u16 = number
            .parse()
            .map_err(|_| AddressError::BadDisplayNumber(name.to_string()))?;

        if host.is_empty() || host == "unix" {
            return Ok(DisplayAddress::Unix(
                PathBuf::from(X11_UNIX_DIR).join(format!("X{}", display)),
            ));
        }

        let port = X11_TCP_PORT_BASE
            .checked_add(display)
            .ok_or_else(|| AddressError::BadDisplayNumber(name.to_string()))?;

        Ok(DisplayAddress::Tcp {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for DisplayAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayAddress::Unix(path) => write!(f, "unix:{}", path.display()),
            DisplayAddress::Tcp { host, port } => write!(f, "tcp:{}:{}", host, port),
        }
    }
}

/// Connection type
pub enum Connection {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Connection {
    /// Connect to the server at `address`
    pub fn open(address: &DisplayAddress) -> io::Result<Self> {
        match address {
            DisplayAddress::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port))?;
                stream.set_nodelay(true)?;
                Ok(Connection::Tcp(stream))
            }
            #[cfg(unix)]
            DisplayAddress::Unix(path) => Ok(Connection::Unix(UnixStream::connect(path)?)),
            #[cfg(not(unix))]
            DisplayAddress::Unix(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "unix sockets are not available on this platform",
            )),
        }
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Connection::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Connection::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Connection::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Connection::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Connection::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Connection::Unix(stream) => stream.flush(),
        }
    }
}
