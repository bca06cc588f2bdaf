use crate::ports::ScanMode;
use serde::Serialize;
use std::time::Duration;

/// Service identification for one open port.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprint {
    pub service: Option<String>,
    pub banner: Option<String>,
}

impl Fingerprint {
    /// No service identified and no banner captured.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn service(name: impl Into<String>) -> Self {
        Self {
            service: Some(name.into()),
            banner: None,
        }
    }

    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = Some(banner.into());
        self
    }
}

/// Final classification of a single port. Produced exactly once per port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Open(Fingerprint),
    Closed,
    /// An OS-level failure other than refusal or timeout.
    Errored(String),
}

/// One open port as it appears in the report.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OpenPort {
    pub port: u16,
    pub service: Option<String>,
    pub banner: Option<String>,
}

/// Frozen result of a completed scan.
#[derive(Serialize, Debug, Clone)]
pub struct ScanReport {
    pub target: String,
    pub mode: Option<ScanMode>,
    pub started_at: String,
    /// Sorted ascending by port number.
    pub open: Vec<OpenPort>,
    pub closed_count: u64,
    pub errored_count: u64,
    pub total_scanned: u64,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

impl ScanReport {
    pub fn open_count(&self) -> u64 {
        self.open.len() as u64
    }

    pub fn open_port_numbers(&self) -> Vec<u16> {
        self.open.iter().map(|p| p.port).collect()
    }

    /// Ports per second using integer division, `None` when the elapsed
    /// time rounds to zero milliseconds.
    pub fn ports_per_second(&self) -> Option<u64> {
        let ms = self.elapsed.as_millis() as u64;
        if ms == 0 {
            return None;
        }
        Some(self.total_scanned * 1000 / ms)
    }
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(total: u64, elapsed: Duration) -> ScanReport {
        ScanReport {
            target: "127.0.0.1".into(),
            mode: Some(ScanMode::Common),
            started_at: String::new(),
            open: Vec::new(),
            closed_count: total,
            errored_count: 0,
            total_scanned: total,
            elapsed,
        }
    }

    #[test]
    fn throughput_uses_integer_division() {
        let r = report(1024, Duration::from_millis(3000));
        assert_eq!(r.ports_per_second(), Some(341));
    }

    #[test]
    fn throughput_guards_zero_duration() {
        let r = report(10, Duration::from_micros(200));
        assert_eq!(r.ports_per_second(), None);
    }

    #[test]
    fn fingerprint_builders() {
        let fp = Fingerprint::service("ftp").with_banner("220 ready");
        assert_eq!(fp.service.as_deref(), Some("ftp"));
        assert_eq!(fp.banner.as_deref(), Some("220 ready"));
        assert_eq!(Fingerprint::none(), Fingerprint::default());
    }
}
