//! Library crate for portprobe: concurrent connect scanning of one host with
//! probe-based service fingerprinting.
pub mod aggregator;
pub mod config;
pub mod connector;
pub mod error;
pub mod fingerprint;
pub mod ports;
pub mod probes;
pub mod queue;
pub mod report;
pub mod scanner;
pub mod types;

pub use config::ScanConfig;
pub use error::ScanError;
pub use ports::ScanMode;
pub use scanner::Scanner;
pub use types::{Fingerprint, OpenPort, ScanOutcome, ScanReport};
