use crate::error::{Result, ScanError};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Which set of ports a scan examines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScanMode {
    /// Well-known ports 1-1024
    #[value(alias = "1")]
    WellKnown,
    /// Curated list of commonly exposed ports
    #[value(alias = "2")]
    #[default]
    Common,
    /// Every port, 1-65535
    #[value(alias = "3")]
    All,
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WellKnown => write!(f, "Well known ports (1-1024)"),
            Self::Common => write!(f, "Most common ports"),
            Self::All => write!(f, "All ports"),
        }
    }
}

/// Curated common ports. The historical list carried 12345 twice; it appears
/// once here, so the common set holds 61 ports.
pub const COMMON_PORTS: &[u16] = &[
    20, 21, 22, 23, 25, 53, 69, 80, 88, 102, 110, 111, 135, 137, 139, 143, 381, 383, 443, 445,
    464, 465, 587, 593, 636, 691, 902, 989, 990, 993, 1025, 1194, 1337, 1589, 1725, 2082, 3074,
    3306, 3389, 3585, 3586, 3724, 4444, 5432, 5900, 6665, 6666, 6667, 6668, 6669, 6881, 6970,
    6999, 8086, 8087, 8222, 9100, 10000, 12345, 27374, 31337,
];

/// Produce the ordered port set for a scan mode.
pub fn ports_for_mode(mode: ScanMode) -> Vec<u16> {
    match mode {
        ScanMode::WellKnown => (1..=1024).collect(),
        ScanMode::Common => COMMON_PORTS.to_vec(),
        ScanMode::All => (1..=u16::MAX).collect(),
    }
}

/// Parse a port specification such as `22,80,8000-8010` into a deduplicated
/// list of TCP ports (1..=65535), keeping the order of first appearance.
///
/// Whitespace around items is ignored; empty items (`80,,443`) are skipped.
pub fn parse_port_spec(s: &str) -> Result<Vec<u16>> {
    let mut out: Vec<u16> = Vec::new();
    let mut seen = HashSet::new();

    for item in s.split(',').map(str::trim) {
        if item.is_empty() {
            continue;
        }

        if let Some((a, b)) = item.split_once('-') {
            let start = parse_port_str(a.trim())?;
            let end = parse_port_str(b.trim())?;
            if start > end {
                return Err(ScanError::InvalidPortSpec(format!(
                    "range {start}-{end} has start > end"
                )));
            }
            for p in start..=end {
                if seen.insert(p) {
                    out.push(p);
                }
            }
            continue;
        }

        let p = parse_port_str(item)?;
        if seen.insert(p) {
            out.push(p);
        }
    }

    if out.is_empty() {
        return Err(ScanError::InvalidPortSpec(format!("no ports in {s:?}")));
    }
    Ok(out)
}

fn parse_port_str(s: &str) -> Result<u16> {
    let val: u32 = s
        .parse()
        .map_err(|_| ScanError::InvalidPortSpec(format!("not a port number: {s:?}")))?;
    if val == 0 || val > 65535 {
        return Err(ScanError::InvalidPortSpec(format!("port out of range: {val}")));
    }
    Ok(val as u16)
}
