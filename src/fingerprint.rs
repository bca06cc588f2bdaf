//! Service identification for open ports.
//!
//! The classifiers are pure functions over the raw response bytes; the
//! network side only sends a probe, reads once with a timeout and hands the
//! bytes over. Any failure along the way yields an empty [`Fingerprint`].

use crate::config::ScanConfig;
use crate::connector::BoxedStream;
use crate::error::Result;
use crate::probes::{ProbeTable, TLS_HTTP_PROBE};
use crate::types::Fingerprint;
use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;
use tracing::debug;

/// Upper bound on bytes read from a probed service.
pub const MAX_RESPONSE: usize = 1024;

#[async_trait]
pub trait Fingerprinter: Send + Sync {
    /// Identify the service behind `stream`. The stream is closed on return.
    async fn fingerprint(&self, stream: BoxedStream, port: u16) -> Fingerprint;
}

/// Sends the port's probe and matches the reply against a [`ProbeTable`].
pub struct ProbeFingerprinter {
    table: Arc<ProbeTable>,
    target: IpAddr,
    server_name: String,
    connect_timeout: Duration,
    read_timeout: Duration,
    tls_timeout: Duration,
    tls: tokio_native_tls::TlsConnector,
}

impl ProbeFingerprinter {
    pub fn new(table: Arc<ProbeTable>, config: &ScanConfig) -> Result<Self> {
        // Identification only: self-signed and mismatched certificates are
        // the norm on scanned hosts.
        let tls = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()?;
        Ok(Self {
            table,
            target: config.target,
            server_name: config.server_name.clone(),
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
            tls_timeout: config.tls_timeout,
            tls: tokio_native_tls::TlsConnector::from(tls),
        })
    }

    async fn probe_plain(
        &self,
        stream: &mut BoxedStream,
        port: u16,
    ) -> anyhow::Result<Fingerprint> {
        let payload = self.table.probe_for(port);
        let response = exchange(stream, payload, self.read_timeout).await?;
        Ok(classify_response(&self.table, port, &response))
    }

    async fn probe_tls(&self, port: u16) -> anyhow::Result<Fingerprint> {
        let addr = SocketAddr::new(self.target, port);
        let tcp = time::timeout(self.connect_timeout, TcpStream::connect(addr)).await??;
        let mut tls =
            time::timeout(self.tls_timeout, self.tls.connect(&self.server_name, tcp)).await??;
        time::timeout(self.read_timeout, tls.write_all(TLS_HTTP_PROBE)).await??;
        let response = match read_response(&mut tls, self.read_timeout).await {
            Ok(r) => r,
            // Peer closed the TCP connection without a close_notify.
            Err(e) if is_truncation(&e) => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let _ = time::timeout(self.read_timeout, tls.shutdown()).await;
        Ok(classify_tls_response(&response))
    }
}

#[async_trait]
impl Fingerprinter for ProbeFingerprinter {
    async fn fingerprint(&self, mut stream: BoxedStream, port: u16) -> Fingerprint {
        if self.table.is_tls_port(port) {
            // The plain connection is not reused for the TLS session.
            drop(stream);
            return self.probe_tls(port).await.unwrap_or_else(|e| {
                debug!(port, error = %e, "TLS fingerprint failed");
                Fingerprint::none()
            });
        }

        let result = self.probe_plain(&mut stream, port).await;
        let _ = time::timeout(self.read_timeout, stream.shutdown()).await;
        result.unwrap_or_else(|e| {
            debug!(port, error = %e, "fingerprint failed");
            Fingerprint::none()
        })
    }
}

/// Write `payload`, then read one response of at most [`MAX_RESPONSE`]
/// bytes. Both steps are bounded by `timeout`.
async fn exchange<S>(
    stream: &mut S,
    payload: &[u8],
    timeout: Duration,
) -> anyhow::Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    time::timeout(timeout, stream.write_all(payload)).await??;
    Ok(read_response(stream, timeout).await?)
}

/// One read of at most [`MAX_RESPONSE`] bytes; a timeout surfaces as
/// `ErrorKind::TimedOut`.
async fn read_response<S>(stream: &mut S, timeout: Duration) -> io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin + ?Sized,
{
    let mut buf = vec![0u8; MAX_RESPONSE];
    let n = time::timeout(timeout, stream.read(&mut buf))
        .await
        .map_err(|_| io::Error::from(io::ErrorKind::TimedOut))??;
    buf.truncate(n);
    Ok(buf)
}

/// OpenSSL 3 reports a TCP close without close_notify as an SSL error
/// rather than a zero-length read.
fn is_truncation(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::UnexpectedEof
        || e.to_string().to_lowercase().contains("unexpected eof")
}

/// Classify a plain (non-TLS) probe response.
///
/// Magic prefixes are checked first, then keyword signatures in table
/// order. Text that matches nothing is reported as `unknown`.
pub fn classify_response(table: &ProbeTable, port: u16, response: &[u8]) -> Fingerprint {
    if let Some(service) = table.match_magic(port, response) {
        return Fingerprint::service(service);
    }
    if response.is_empty() {
        return Fingerprint::none();
    }

    let text = decode(response);
    let service = table
        .match_signature(&text.to_lowercase())
        .unwrap_or("unknown");
    Fingerprint::service(service).with_banner(text)
}

/// Classify the reply to the HTTP probe sent over a TLS session.
pub fn classify_tls_response(response: &[u8]) -> Fingerprint {
    if response.is_empty() {
        return Fingerprint::service("tls");
    }
    let text = decode(response);
    let service = if text.to_lowercase().contains("http/") {
        "https"
    } else {
        "tls"
    };
    Fingerprint::service(service).with_banner(text)
}

/// Lossy UTF-8 decode; invalid sequences become U+FFFD. Whitespace is kept.
fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
