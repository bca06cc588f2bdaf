use std::net::IpAddr;
use std::time::Duration;

pub const DEFAULT_WORKERS: usize = 500;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(2000);
pub const DEFAULT_TLS_TIMEOUT: Duration = Duration::from_millis(3000);

/// Settings for one scan of one target.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub target: IpAddr,
    /// Name presented during TLS handshakes. Defaults to the address itself.
    pub server_name: String,
    /// Upper bound on concurrent workers; the pool never exceeds the port count.
    pub workers: usize,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub tls_timeout: Duration,
}

impl ScanConfig {
    pub fn new(target: IpAddr) -> Self {
        Self {
            target,
            server_name: target.to_string(),
            workers: DEFAULT_WORKERS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            tls_timeout: DEFAULT_TLS_TIMEOUT,
        }
    }

    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_tls_timeout(mut self, timeout: Duration) -> Self {
        self.tls_timeout = timeout;
        self
    }

    /// Workers actually started for `port_count` ports.
    pub fn effective_workers(&self, port_count: usize) -> usize {
        self.workers.max(1).min(port_count)
    }
}
