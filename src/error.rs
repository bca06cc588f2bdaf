//! Error types for the scan engine.
//!
//! Per-port failures are not errors: they surface as `ScanOutcome` values.
//! `ScanError` covers the cases that stop a scan before or while it runs.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("invalid target address: {0}")]
    InvalidTarget(String),

    #[error("invalid port specification: {0}")]
    InvalidPortSpec(String),

    #[error("work queue is closed")]
    QueueClosed,

    #[error("scan cancelled")]
    Cancelled,

    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
