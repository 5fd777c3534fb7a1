use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::config::GuardLimits;
use crate::error::SimulatorError;
use crate::SimulatorResult;

/// Runs a computation on a worker thread under a wall-clock and memory budget.
///
/// The supervisor waits on a channel with a timeout; on breach it flags the
/// worker as cancelled, abandons it, and reports `ResourceExhausted`. Whatever
/// the worker produces afterwards is dropped with the channel, so a caller
/// never observes a partial result.
#[derive(Debug, Clone)]
pub struct ResourceGuard {
    limits: GuardLimits,
}

/// Handle given to the supervised computation for cooperative budget checks.
///
/// Memory is accounted by the worker declaring what it is about to allocate,
/// which keeps aborts deterministic for a given input and budget.
#[derive(Debug)]
pub struct GuardContext {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
    memory_limit: u64,
    reserved: Cell<u64>,
}

impl GuardContext {
    fn new(deadline: Option<Instant>, cancelled: Arc<AtomicBool>, memory_limit: u64) -> Self {
        Self {
            deadline,
            cancelled,
            memory_limit,
            reserved: Cell::new(0),
        }
    }

    /// Fail if the supervisor has given up on this computation or the deadline passed.
    pub fn checkpoint(&self) -> SimulatorResult<()> {
        let expired = self.deadline.is_some_and(|d| Instant::now() >= d);
        if expired || self.cancelled.load(Ordering::Relaxed) {
            return Err(SimulatorError::ResourceExhausted {
                budget: "wall_clock".into(),
                limit: "deadline".into(),
            });
        }
        Ok(())
    }

    /// Account for `bytes` of upcoming allocation against the memory budget.
    pub fn reserve(&self, bytes: u64) -> SimulatorResult<()> {
        let total = self.reserved.get().saturating_add(bytes);
        if total > self.memory_limit {
            return Err(SimulatorError::ResourceExhausted {
                budget: "memory".into(),
                limit: format!("{} bytes", self.memory_limit),
            });
        }
        self.reserved.set(total);
        Ok(())
    }

    /// Bytes reserved so far.
    pub fn reserved(&self) -> u64 {
        self.reserved.get()
    }
}

impl ResourceGuard {
    pub fn new(limits: GuardLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &GuardLimits {
        &self.limits
    }

    /// Execute `task` under the configured budget.
    pub fn run<T, F>(&self, label: &str, task: F) -> SimulatorResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&GuardContext) -> SimulatorResult<T> + Send + 'static,
    {
        let timeout = Duration::from_millis(self.limits.timeout_ms);
        let started = Instant::now();
        let cancelled = Arc::new(AtomicBool::new(false));
        let ctx = GuardContext::new(
            started.checked_add(timeout),
            Arc::clone(&cancelled),
            self.limits.memory_limit_bytes,
        );

        let (tx, rx) = mpsc::sync_channel(1);
        let handle = thread::Builder::new()
            .name(format!("guard-{label}"))
            .spawn(move || {
                let outcome = task(&ctx);
                // The receiver is gone if the supervisor already timed out.
                let _ = tx.send(outcome);
            })
            .map_err(|e| SimulatorError::ResourceExhausted {
                budget: "worker_thread".into(),
                limit: e.to_string(),
            })?;

        debug!(label, timeout_ms = self.limits.timeout_ms, "guarded computation started");

        match rx.recv_timeout(timeout) {
            Ok(outcome) => {
                let _ = handle.join();
                debug!(
                    label,
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "guarded computation finished"
                );
                outcome
            }
            Err(RecvTimeoutError::Timeout) => {
                cancelled.store(true, Ordering::Relaxed);
                error!(label, timeout_ms = self.limits.timeout_ms, "guarded computation abandoned");
                Err(SimulatorError::ResourceExhausted {
                    budget: "wall_clock".into(),
                    limit: format!("{}ms", self.limits.timeout_ms),
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                error!(label, "guarded computation panicked");
                Err(SimulatorError::arithmetic(format!(
                    "{label}: supervised computation panicked"
                )))
            }
        }
    }
}

impl Default for ResourceGuard {
    fn default() -> Self {
        Self::new(GuardLimits::default())
    }
}
