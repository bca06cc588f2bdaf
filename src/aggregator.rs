//! Serialized accumulation of per-port outcomes.

use crate::types::{OpenPort, ScanOutcome};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Debug, Default, Clone)]
struct Tally {
    open: Vec<OpenPort>,
    closed: u64,
    errored: u64,
}

/// Collects outcomes from all workers behind a single lock.
///
/// An optional channel receives each open port as it is recorded, for live
/// reporting while the scan is still running.
#[derive(Debug, Default)]
pub struct Aggregator {
    tally: Mutex<Tally>,
    events: Option<mpsc::UnboundedSender<OpenPort>>,
}

/// Immutable view of the aggregated outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Sorted ascending by port.
    pub open: Vec<OpenPort>,
    pub closed: u64,
    pub errored: u64,
}

impl Snapshot {
    pub fn total(&self) -> u64 {
        self.open.len() as u64 + self.closed + self.errored
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: mpsc::UnboundedSender<OpenPort>) -> Self {
        Self {
            tally: Mutex::default(),
            events: Some(events),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tally> {
        self.tally.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the outcome for `port`.
    pub fn record(&self, port: u16, outcome: ScanOutcome) {
        let mut tally = self.lock();
        match outcome {
            ScanOutcome::Open(fp) => {
                let entry = OpenPort {
                    port,
                    service: fp.service,
                    banner: fp.banner,
                };
                if let Some(tx) = &self.events {
                    // Receiver gone only means nobody is watching live.
                    let _ = tx.send(entry.clone());
                }
                tally.open.push(entry);
            }
            ScanOutcome::Closed => tally.closed += 1,
            ScanOutcome::Errored(reason) => {
                warn!(port, %reason, "connect failed");
                tally.errored += 1;
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let tally = self.lock().clone();
        let mut open = tally.open;
        open.sort_by_key(|p| p.port);
        Snapshot {
            open,
            closed: tally.closed,
            errored: tally.errored,
        }
    }
}
