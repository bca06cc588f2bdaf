use crate::aggregator::Aggregator;
use crate::config::ScanConfig;
use crate::connector::{Connection, Connector, TcpConnector};
use crate::error::{Result, ScanError};
use crate::fingerprint::{Fingerprinter, ProbeFingerprinter};
use crate::ports::{ports_for_mode, ScanMode};
use crate::probes::ProbeTable;
use crate::queue::WorkQueue;
use crate::types::{OpenPort, ScanOutcome, ScanReport};
use ::time::{format_description::well_known, OffsetDateTime};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One scan context: configuration plus the connector and fingerprinter
/// every worker shares. Each call to [`Scanner::run`] builds its own queue
/// and aggregator, so a `Scanner` can be reused or run concurrently.
pub struct Scanner {
    config: ScanConfig,
    connector: Arc<dyn Connector>,
    fingerprinter: Arc<dyn Fingerprinter>,
    events: Option<mpsc::UnboundedSender<OpenPort>>,
}

impl Scanner {
    /// Scanner with a real TCP connector and the built-in probe table.
    pub fn new(config: ScanConfig) -> Result<Self> {
        Self::with_probe_table(config, ProbeTable::default())
    }

    pub fn with_probe_table(config: ScanConfig, table: ProbeTable) -> Result<Self> {
        let connector = TcpConnector::new(config.target, config.connect_timeout);
        let fingerprinter = ProbeFingerprinter::new(Arc::new(table), &config)?;
        Ok(Self::from_parts(
            config,
            Arc::new(connector),
            Arc::new(fingerprinter),
        ))
    }

    pub fn from_parts(
        config: ScanConfig,
        connector: Arc<dyn Connector>,
        fingerprinter: Arc<dyn Fingerprinter>,
    ) -> Self {
        Self {
            config,
            connector,
            fingerprinter,
            events: None,
        }
    }

    /// Send every open port to `events` as soon as it is recorded.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<OpenPort>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan the port set generated for `mode`.
    pub async fn run_mode(&self, mode: ScanMode, cancel: CancellationToken) -> Result<ScanReport> {
        let ports = ports_for_mode(mode);
        self.scan(&ports, Some(mode), cancel).await
    }

    /// Scan an explicit list of ports.
    pub async fn run(&self, ports: &[u16], cancel: CancellationToken) -> Result<ScanReport> {
        self.scan(ports, None, cancel).await
    }

    /// Fill the queue, start the pool, wait for the queue to drain, join
    /// every worker and freeze the aggregate.
    ///
    /// Returns [`ScanError::Cancelled`] if `cancel` fires first; in-flight
    /// workers are aborted and partial results are discarded.
    async fn scan(
        &self,
        ports: &[u16],
        mode: Option<ScanMode>,
        cancel: CancellationToken,
    ) -> Result<ScanReport> {
        let started_at = now_rfc3339();
        let start = Instant::now();

        let queue = Arc::new(WorkQueue::new());
        queue.extend(ports.iter().copied())?;
        queue.close();

        let aggregator = Arc::new(match &self.events {
            Some(tx) => Aggregator::with_events(tx.clone()),
            None => Aggregator::new(),
        });

        let workers = self.config.effective_workers(ports.len());
        info!(
            host = %self.config.target,
            ports = ports.len(),
            workers,
            "scan starting"
        );

        let mut set = JoinSet::new();
        for id in 0..workers {
            let worker = Worker {
                id,
                queue: Arc::clone(&queue),
                aggregator: Arc::clone(&aggregator),
                connector: Arc::clone(&self.connector),
                fingerprinter: Arc::clone(&self.fingerprinter),
                cancel: cancel.clone(),
            };
            set.spawn(worker.run());
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                set.abort_all();
                while set.join_next().await.is_some() {}
                warn!(host = %self.config.target, "scan cancelled");
                return Err(ScanError::Cancelled);
            }
            _ = queue.join() => {}
        }

        while let Some(res) = set.join_next().await {
            if let Err(e) = res {
                warn!(error = %e, "worker did not finish cleanly");
            }
        }

        let snapshot = aggregator.snapshot();
        let elapsed = start.elapsed();
        info!(
            open = snapshot.open.len(),
            closed = snapshot.closed,
            errored = snapshot.errored,
            elapsed_ms = elapsed.as_millis() as u64,
            "scan finished"
        );

        Ok(ScanReport {
            target: self.config.target.to_string(),
            mode,
            started_at,
            total_scanned: snapshot.total(),
            open: snapshot.open,
            closed_count: snapshot.closed,
            errored_count: snapshot.errored,
            elapsed,
        })
    }
}

struct Worker {
    id: usize,
    queue: Arc<WorkQueue>,
    aggregator: Arc<Aggregator>,
    connector: Arc<dyn Connector>,
    fingerprinter: Arc<dyn Fingerprinter>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) {
        let mut handled = 0usize;
        while let Some(job) = self.queue.try_take() {
            let port = job.port();
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                outcome = probe_port(&*self.connector, &*self.fingerprinter, port) => outcome,
            };
            // Record before completing so the queue barrier implies a
            // recorded outcome.
            self.aggregator.record(port, outcome);
            job.complete();
            handled += 1;
        }
        debug!(worker = self.id, handled, "worker exiting");
    }
}

async fn probe_port(
    connector: &dyn Connector,
    fingerprinter: &dyn Fingerprinter,
    port: u16,
) -> ScanOutcome {
    match connector.connect(port).await {
        Connection::Open(stream) => {
            ScanOutcome::Open(fingerprinter.fingerprint(stream, port).await)
        }
        Connection::Closed => ScanOutcome::Closed,
        Connection::Failed(reason) => ScanOutcome::Errored(reason),
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
