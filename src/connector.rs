//! Timed TCP connect.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, trace};

/// Byte stream a fingerprinter can probe. Implemented by `TcpStream` and by
/// in-memory streams such as `tokio::io::DuplexStream`.
pub trait ProbeStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ProbeStream for T {}

pub type BoxedStream = Box<dyn ProbeStream>;

/// Result of one connection attempt. The stream in `Open` is owned by the
/// caller; every other variant has already released its socket.
pub enum Connection {
    Open(BoxedStream),
    /// Refused or timed out.
    Closed,
    /// Any other OS-level error, kept apart from `Closed` for diagnostics.
    Failed(String),
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(_) => write!(f, "Open"),
            Self::Closed => write!(f, "Closed"),
            Self::Failed(reason) => write!(f, "Failed({reason})"),
        }
    }
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, port: u16) -> Connection;
}

/// Connects to one target address with a bounded connect timeout.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    target: IpAddr,
    timeout: Duration,
}

impl TcpConnector {
    pub fn new(target: IpAddr, timeout: Duration) -> Self {
        Self { target, timeout }
    }

    pub fn target(&self) -> IpAddr {
        self.target
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, port: u16) -> Connection {
        let addr = SocketAddr::new(self.target, port);
        match time::timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                debug!(%addr, "connected");
                Connection::Open(Box::new(stream))
            }
            Ok(Err(e)) => classify_connect_error(addr, e),
            Err(_) => {
                trace!(%addr, "connect timed out");
                Connection::Closed
            }
        }
    }
}

fn classify_connect_error(addr: SocketAddr, e: std::io::Error) -> Connection {
    match e.kind() {
        ErrorKind::ConnectionRefused | ErrorKind::TimedOut => {
            trace!(%addr, error = %e, "port closed");
            Connection::Closed
        }
        _ => {
            debug!(%addr, error = %e, "unexpected connect error");
            Connection::Failed(e.to_string())
        }
    }
}
