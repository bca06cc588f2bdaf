//! Shared queue of pending ports.
//!
//! `try_take` never blocks. Every taken port yields a [`Job`] ticket; the
//! port only counts as finished once that ticket is completed or dropped,
//! so [`WorkQueue::join`] cannot return while a worker still holds a port it
//! has taken but not yet recorded.

use crate::error::{Result, ScanError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    pending: VecDeque<u16>,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct WorkQueue {
    inner: Mutex<Inner>,
    /// Pushed but not yet marked done.
    unfinished: AtomicUsize,
    idle: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, port: u16) -> Result<()> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(ScanError::QueueClosed);
        }
        self.unfinished.fetch_add(1, Ordering::SeqCst);
        inner.pending.push_back(port);
        Ok(())
    }

    pub fn extend(&self, ports: impl IntoIterator<Item = u16>) -> Result<()> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(ScanError::QueueClosed);
        }
        let before = inner.pending.len();
        inner.pending.extend(ports);
        self.unfinished
            .fetch_add(inner.pending.len() - before, Ordering::SeqCst);
        Ok(())
    }

    /// No further pushes are accepted after this.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    /// Ports pushed but not yet marked done.
    pub fn unfinished(&self) -> usize {
        self.unfinished.load(Ordering::SeqCst)
    }

    /// Take the next port, or `None` if nothing is pending.
    pub fn try_take(&self) -> Option<Job<'_>> {
        let port = self.lock().pending.pop_front()?;
        Some(Job { queue: self, port })
    }

    fn task_done(&self) {
        if self.unfinished.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Wait until every pushed port has been taken and marked done.
    pub async fn join(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a wake-up between the check and the
            // await is not lost.
            notified.as_mut().enable();
            if self.unfinished() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// A port handed to exactly one worker. Dropping it marks the port done.
#[derive(Debug)]
pub struct Job<'q> {
    queue: &'q WorkQueue,
    port: u16,
}

impl Job<'_> {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Mark the port done. Equivalent to dropping the ticket.
    pub fn complete(self) {}
}

impl Drop for Job<'_> {
    fn drop(&mut self) {
        self.queue.task_done();
    }
}
