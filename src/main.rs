use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use portprobe::config::{self, ScanConfig};
use portprobe::{ports, report, ScanError, ScanMode, Scanner};

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

/// portprobe — concurrent TCP connect scanner with service fingerprinting.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "portprobe",
    version,
    about = "Concurrent TCP connect scanner with probe-based service fingerprinting.",
    long_about = None
)]
struct Cli {
    /// IPv4 or IPv6 address to scan.
    #[arg(value_name = "TARGET")]
    target: String,

    /// Port set to scan: well-known (1), common (2) or all (3).
    #[arg(short, long, value_enum, default_value_t = ScanMode::Common)]
    mode: ScanMode,

    /// Explicit ports, e.g. "22,80,8000-8010". Overrides --mode.
    #[arg(short, long)]
    ports: Option<String>,

    /// Maximum number of concurrent workers.
    #[arg(short, long, default_value_t = config::DEFAULT_WORKERS)]
    workers: usize,

    /// TCP connect timeout in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = 1000)]
    timeout_ms: u64,

    /// Probe read timeout in milliseconds.
    #[arg(long = "read-timeout-ms", default_value_t = 2000)]
    read_timeout_ms: u64,

    /// TLS handshake timeout in milliseconds.
    #[arg(long = "tls-timeout-ms", default_value_t = 3000)]
    tls_timeout_ms: u64,

    /// Write the report as pretty JSON to this path.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let target: IpAddr = match cli.target.trim().parse() {
        Ok(ip) => ip,
        Err(_) => {
            eprintln!("\n{}\n", ScanError::InvalidTarget(cli.target.clone()));
            return Ok(ExitCode::from(2));
        }
    };

    let custom_ports = match cli.ports.as_deref().map(ports::parse_port_spec).transpose() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("\n{e}\n");
            return Ok(ExitCode::from(2));
        }
    };

    println!("The IP to be scanned is: {target}");
    match &custom_ports {
        Some(p) => println!("The ports to be scanned are: {} custom ports\n", p.len()),
        None => println!("The mode to be used is: {}\n", cli.mode),
    }

    let config = ScanConfig::new(target)
        .with_workers(cli.workers)
        .with_connect_timeout(Duration::from_millis(cli.timeout_ms))
        .with_read_timeout(Duration::from_millis(cli.read_timeout_ms))
        .with_tls_timeout(Duration::from_millis(cli.tls_timeout_ms));

    // Print open ports as they are found.
    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(open) = rx.recv().await {
            println!("{}", report::open_port_line(&open));
        }
    });

    let scanner = Scanner::new(config)?.with_events(tx);

    // Ctrl-C cancels the scan.
    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_ctrlc.cancel();
        }
    });

    let result = match &custom_ports {
        Some(p) => scanner.run(p, cancel).await,
        None => scanner.run_mode(cli.mode, cancel).await,
    };

    // Dropping the scanner closes the event channel so the printer drains.
    drop(scanner);
    let _ = printer.await;

    let results = match result {
        Ok(r) => r,
        Err(ScanError::Cancelled) => {
            eprintln!("\nScan aborted by user. Exiting.\n");
            return Ok(ExitCode::from(130));
        }
        Err(e) => return Err(e.into()),
    };

    print!("{}", report::summary(&results));
    println!();

    if let Some(path) = cli.output.as_deref() {
        match report::write_json(path, &results) {
            Ok(()) => println!("Wrote JSON results to {}", path.display()),
            Err(e) => eprintln!("{e:#}"),
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
