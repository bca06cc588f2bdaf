use portprobe::fingerprint::{Fingerprinter, ProbeFingerprinter};
use portprobe::probes::ProbeTable;
use portprobe::{Fingerprint, ScanConfig};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_native_tls::TlsAcceptor;

const CERT: &[u8] = include_bytes!("fixtures/localhost.crt");
const KEY: &[u8] = include_bytes!("fixtures/localhost.key");

/// What the TLS listener does after reading the client's request.
#[derive(Clone, Copy)]
enum Reply {
    /// Send close_notify without any application data.
    Close,
    /// Answer with an HTTP status line, then close_notify.
    Http,
    /// Drop the TCP connection without close_notify.
    Drop,
}

fn acceptor() -> TlsAcceptor {
    let identity = native_tls::Identity::from_pkcs8(CERT, KEY).unwrap();
    TlsAcceptor::from(native_tls::TlsAcceptor::new(identity).unwrap())
}

async fn read_request<S: AsyncRead + Unpin>(stream: &mut S) -> Vec<u8> {
    let mut request = Vec::new();
    let mut buf = [0u8; 256];
    while !request.ends_with(b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    request
}

async fn tls_listener(reply: Reply) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let acceptor = acceptor();
    tokio::spawn(async move {
        while let Ok((sock, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                let Ok(mut tls) = acceptor.accept(sock).await else {
                    return;
                };
                let request = read_request(&mut tls).await;
                assert!(request.starts_with(b"HEAD / HTTP/1.0"));
                match reply {
                    Reply::Close => {
                        let _ = tls.shutdown().await;
                    }
                    Reply::Http => {
                        let _ = tls.write_all(b"HTTP/1.1 200 OK\r\nServer: test\r\n\r\n").await;
                        let _ = tls.shutdown().await;
                    }
                    Reply::Drop => drop(tls),
                }
            });
        }
    });
    port
}

/// Accepts TCP and answers in plain text, never speaking TLS.
async fn plain_listener() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = sock.write_all(b"220 plain service ready\r\n").await;
                let mut buf = [0u8; 256];
                let _ = sock.read(&mut buf).await;
            });
        }
    });
    port
}

/// Accepts TCP and then says nothing.
async fn silent_listener() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((sock, _)) = listener.accept().await {
            held.push(sock);
        }
    });
    port
}

fn fingerprinter_for(port: u16) -> ProbeFingerprinter {
    let config = ScanConfig::new(IpAddr::V4(Ipv4Addr::LOCALHOST))
        .with_server_name("localhost")
        .with_connect_timeout(Duration::from_millis(500))
        .with_read_timeout(Duration::from_millis(1000))
        .with_tls_timeout(Duration::from_millis(300));
    let table = ProbeTable::empty().with_tls_port(port);
    ProbeFingerprinter::new(Arc::new(table), &config).unwrap()
}

async fn identify(port: u16) -> Fingerprint {
    // The plain connection handed in is discarded on TLS ports.
    let (client, _peer) = tokio::io::duplex(64);
    fingerprinter_for(port).fingerprint(Box::new(client), port).await
}

#[tokio::test]
async fn clean_close_after_handshake_is_tls() {
    let port = tls_listener(Reply::Close).await;
    let fp = identify(port).await;
    assert_eq!(fp, Fingerprint::service("tls"));
    assert_eq!(fp.banner, None);
}

#[tokio::test]
async fn http_reply_over_tls_is_https() {
    let port = tls_listener(Reply::Http).await;
    let fp = identify(port).await;
    assert_eq!(fp.service.as_deref(), Some("https"));
    assert!(fp.banner.unwrap().starts_with("HTTP/1.1 200 OK"));
}

#[tokio::test]
async fn close_without_notify_is_still_tls() {
    let port = tls_listener(Reply::Drop).await;
    let fp = identify(port).await;
    assert_eq!(fp, Fingerprint::service("tls"));
}

#[tokio::test]
async fn plain_listener_on_tls_port_has_no_fingerprint() {
    let port = plain_listener().await;
    assert_eq!(identify(port).await, Fingerprint::none());
}

#[tokio::test]
async fn stalled_handshake_gives_up_after_tls_timeout() {
    let port = silent_listener().await;
    let started = Instant::now();
    assert_eq!(identify(port).await, Fingerprint::none());
    assert!(started.elapsed() < Duration::from_secs(2));
}
