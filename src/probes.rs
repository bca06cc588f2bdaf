//! Probe payloads and response signatures used for service identification.
//!
//! A `ProbeTable` is an immutable value; the scanner shares it behind an
//! `Arc` and never mutates it once a scan starts.

use std::collections::{HashMap, HashSet};

/// Sent when a port has no dedicated probe.
pub const DEFAULT_PROBE: &[u8] = b"\r\n";

/// Sent over TLS on TLS-only ports.
pub const TLS_HTTP_PROBE: &[u8] = b"HEAD / HTTP/1.0\r\n\r\n";

const HTTP_PROBE: &[u8] = b"GET / HTTP/1.0\r\n\r\n";

/// X.224 connection request wrapped in a TPKT header.
const RDP_PROBE: &[u8] = &[
    0x03, 0x00, 0x00, 0x13, 0x0e, 0xe0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x08, 0x00,
    0x03, 0x00, 0x00, 0x00,
];

/// PostgreSQL SSLRequest.
const POSTGRES_PROBE: &[u8] = &[0x00, 0x00, 0x00, 0x08, 0x04, 0xd2, 0x16, 0x2f];

/// Service name plus lowercase keywords expected somewhere in its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub service: &'static str,
    pub keywords: &'static [&'static str],
}

/// Binary protocol recognised by its leading bytes on one specific port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicPrefix {
    pub port: u16,
    pub prefix: [u8; 2],
    pub service: &'static str,
}

/// Iteration order is the classification tie-break: the first signature with
/// a matching keyword wins.
pub const SIGNATURES: &[Signature] = &[
    Signature { service: "ssh", keywords: &["ssh-", "openssh"] },
    Signature { service: "ftp", keywords: &["ftp", "filezilla"] },
    Signature { service: "smtp", keywords: &["smtp", "esmtp", "postfix", "exim"] },
    Signature { service: "pop3", keywords: &["pop3", "+ok"] },
    Signature { service: "imap", keywords: &["imap", "* ok"] },
    Signature { service: "http", keywords: &["http/", "server:", "<html"] },
    Signature { service: "mysql", keywords: &["mysql", "mariadb"] },
    Signature { service: "postgresql", keywords: &["postgres"] },
    Signature { service: "redis", keywords: &["+pong", "redis"] },
    Signature { service: "memcached", keywords: &["stat pid"] },
    Signature { service: "vnc", keywords: &["rfb "] },
    Signature { service: "irc", keywords: &["irc", "notice auth"] },
    Signature { service: "telnet", keywords: &["telnet", "login:"] },
];

/// TPKT version 3 reply on the RDP port.
pub const RDP_MAGIC: MagicPrefix = MagicPrefix {
    port: 3389,
    prefix: [0x03, 0x00],
    service: "rdp",
};

/// Ports that only speak TLS; fingerprinting opens its own TLS session there.
pub const TLS_ONLY_PORTS: &[u16] = &[443, 5986, 8443];

#[derive(Debug, Clone)]
pub struct ProbeTable {
    probes: HashMap<u16, Vec<u8>>,
    signatures: Vec<Signature>,
    magic: Vec<MagicPrefix>,
    tls_ports: HashSet<u16>,
}

impl ProbeTable {
    /// An empty table: every port gets the default probe and nothing matches.
    pub fn empty() -> Self {
        Self {
            probes: HashMap::new(),
            signatures: Vec::new(),
            magic: Vec::new(),
            tls_ports: HashSet::new(),
        }
    }

    pub fn with_probe(mut self, port: u16, payload: impl Into<Vec<u8>>) -> Self {
        self.probes.insert(port, payload.into());
        self
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signatures.push(signature);
        self
    }

    pub fn with_magic(mut self, magic: MagicPrefix) -> Self {
        self.magic.push(magic);
        self
    }

    pub fn with_tls_port(mut self, port: u16) -> Self {
        self.tls_ports.insert(port);
        self
    }

    /// Payload to send to `port`, falling back to [`DEFAULT_PROBE`].
    pub fn probe_for(&self, port: u16) -> &[u8] {
        self.probes.get(&port).map(Vec::as_slice).unwrap_or(DEFAULT_PROBE)
    }

    pub fn is_tls_port(&self, port: u16) -> bool {
        self.tls_ports.contains(&port)
    }

    /// Binary protocol whose magic prefix starts `response` on `port`.
    pub fn match_magic(&self, port: u16, response: &[u8]) -> Option<&'static str> {
        self.magic
            .iter()
            .find(|m| m.port == port && response.starts_with(&m.prefix))
            .map(|m| m.service)
    }

    /// First service, in table order, with any keyword contained in `lowered`.
    pub fn match_signature(&self, lowered: &str) -> Option<&'static str> {
        self.signatures
            .iter()
            .find(|sig| sig.keywords.iter().any(|kw| lowered.contains(kw)))
            .map(|sig| sig.service)
    }
}

impl Default for ProbeTable {
    fn default() -> Self {
        let mut table = Self::empty()
            .with_probe(21, b"HELP\r\n".to_vec())
            .with_probe(22, b"SSH-2.0-portprobe\r\n".to_vec())
            .with_probe(25, b"EHLO portprobe\r\n".to_vec())
            .with_probe(587, b"EHLO portprobe\r\n".to_vec())
            .with_probe(110, b"CAPA\r\n".to_vec())
            .with_probe(143, b"a1 CAPABILITY\r\n".to_vec())
            .with_probe(3389, RDP_PROBE.to_vec())
            .with_probe(5432, POSTGRES_PROBE.to_vec())
            .with_probe(6379, b"PING\r\n".to_vec())
            .with_probe(6667, b"NICK portprobe\r\n".to_vec())
            .with_probe(11211, b"stats\r\n".to_vec())
            .with_magic(RDP_MAGIC);

        for &port in &[80, 8000, 8008, 8080, 8086, 8087, 8888] {
            table = table.with_probe(port, HTTP_PROBE.to_vec());
        }
        for sig in SIGNATURES {
            table = table.with_signature(sig.clone());
        }
        for &port in TLS_ONLY_PORTS {
            table = table.with_tls_port(port);
        }
        table
    }
}
