//! Console and JSON rendering of scan results.

use crate::types::{OpenPort, ScanReport};
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs::File;
use std::path::Path;

/// Longest banner snippet shown on one console line.
pub const BANNER_SNIPPET_LEN: usize = 60;

/// One line announcing an open port, e.g.
/// `[✓]	port 21 is OPEN! (ftp) 220 ProFTPD Server ready`.
pub fn open_port_line(p: &OpenPort) -> String {
    let mut line = format!("[\u{2713}]\tport {} is OPEN!", p.port);
    if let Some(service) = &p.service {
        let _ = write!(line, " ({service})");
    }
    if let Some(banner) = p.banner.as_deref().map(banner_snippet) {
        if !banner.is_empty() {
            let _ = write!(line, " {banner}");
        }
    }
    line
}

/// Single-line, length-bounded rendering of a banner. Surrounding
/// whitespace is dropped before inner line breaks are escaped.
pub fn banner_snippet(banner: &str) -> String {
    let flat = banner.trim().replace('\n', "\\n").replace('\r', "\\r");
    let mut chars = flat.chars();
    let mut out: String = chars.by_ref().take(BANNER_SNIPPET_LEN).collect();
    if chars.next().is_some() {
        out.push_str("...");
    }
    out
}

/// Summary block printed after the scan.
pub fn summary(report: &ScanReport) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "\nStats for {}:", report.target);
    let _ = writeln!(s, "--------------------------");
    let _ = writeln!(
        s,
        "[\u{2713}]\t{} ports are open: {:?}",
        report.open_count(),
        report.open_port_numbers()
    );
    let _ = writeln!(s, "[!]\t{} ports are closed.", report.closed_count);
    if report.errored_count > 0 {
        let _ = writeln!(
            s,
            "[x]\t{} ports failed with unexpected network errors.",
            report.errored_count
        );
    }
    let _ = writeln!(
        s,
        "[?]\t{} ports scanned in {:.2} seconds.",
        report.total_scanned,
        report.elapsed.as_secs_f64()
    );
    match report.ports_per_second() {
        Some(pps) => {
            let _ = writeln!(s, "[?]\tScanned {pps} ports per second.");
        }
        None => {
            let _ = writeln!(s, "[?]\tScan finished too quickly to measure throughput.");
        }
    }
    s
}

/// Write the report as pretty JSON to `path`.
pub fn write_json(path: &Path, report: &ScanReport) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create report file: {}", path.display()))?;
    serde_json::to_writer_pretty(file, report)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ScanMode;
    use std::time::Duration;

    fn sample() -> ScanReport {
        ScanReport {
            target: "192.168.1.10".into(),
            mode: Some(ScanMode::WellKnown),
            started_at: "2024-01-01T00:00:00Z".into(),
            open: vec![
                OpenPort {
                    port: 21,
                    service: Some("ftp".into()),
                    banner: Some("220 ProFTPD Server ready".into()),
                },
                OpenPort {
                    port: 80,
                    service: None,
                    banner: None,
                },
            ],
            closed_count: 1021,
            errored_count: 1,
            total_scanned: 1024,
            elapsed: Duration::from_millis(2000),
        }
    }

    #[test]
    fn open_line_includes_service_and_banner() {
        let r = sample();
        assert_eq!(
            open_port_line(&r.open[0]),
            "[\u{2713}]\tport 21 is OPEN! (ftp) 220 ProFTPD Server ready"
        );
        assert_eq!(open_port_line(&r.open[1]), "[\u{2713}]\tport 80 is OPEN!");

        let blank = OpenPort {
            port: 9999,
            service: Some("unknown".into()),
            banner: Some("\r\n".into()),
        };
        assert_eq!(open_port_line(&blank), "[\u{2713}]\tport 9999 is OPEN! (unknown)");
    }

    #[test]
    fn snippet_is_flattened_and_bounded() {
        assert_eq!(banner_snippet("a\r\nb"), "a\\r\\nb");
        assert_eq!(banner_snippet("220 ready\r\n"), "220 ready");
        assert_eq!(banner_snippet("\r\n"), "");
        let long = "é".repeat(100);
        let snip = banner_snippet(&long);
        assert_eq!(snip.chars().count(), BANNER_SNIPPET_LEN + 3);
        assert!(snip.ends_with("..."));
    }

    #[test]
    fn summary_lists_counts() {
        let text = summary(&sample());
        assert!(text.contains("2 ports are open: [21, 80]"));
        assert!(text.contains("1021 ports are closed."));
        assert!(text.contains("1 ports failed"));
        assert!(text.contains("1024 ports scanned in 2.00 seconds."));
        assert!(text.contains("Scanned 512 ports per second."));
    }

    #[test]
    fn summary_guards_zero_elapsed() {
        let mut r = sample();
        r.elapsed = Duration::ZERO;
        assert!(summary(&r).contains("too quickly"));
    }

    #[test]
    fn json_report_round_trips_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_json(&path, &sample()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["target"], "192.168.1.10");
        assert_eq!(value["mode"], "well-known");
        assert_eq!(value["elapsed_ms"], 2000);
        assert_eq!(value["open"][0]["service"], "ftp");
    }
}
