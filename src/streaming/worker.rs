//! Background maintenance executor
//!
//! Region cuts, expansions and saves run on a dedicated single-worker tokio
//! runtime so at most one maintenance job touches the disk at a time and the
//! caller's thread never blocks on I/O.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::{Builder, Runtime};

use crate::core::error::Error;
use crate::core::types::Result;

/// Decrements the in-flight count even if the job panics
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Single-threaded job runner for maintenance work
pub struct MaintenanceWorker {
    runtime: Option<Runtime>,
    in_flight: Arc<AtomicUsize>,
}

impl std::fmt::Debug for MaintenanceWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaintenanceWorker")
            .field("running", &self.runtime.is_some())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl MaintenanceWorker {
    /// Create a worker with its own runtime
    pub fn new() -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("lod-maintenance")
            .enable_time()
            .build()
            .map_err(|e| Error::Executor(format!("failed to create runtime: {}", e)))?;
        Ok(Self {
            runtime: Some(runtime),
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Queue `job`; returns false once the worker is shut down
    pub fn spawn<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(runtime) = &self.runtime else {
            log::warn!("Maintenance job dropped: worker is shut down");
            return false;
        };
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let guard = InFlight(self.in_flight.clone());
        runtime.spawn(async move {
            let _guard = guard;
            job();
        });
        true
    }

    /// Jobs queued or running
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Block until no job is in flight or `timeout` passes.
    ///
    /// Returns whether the worker went idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Drain queued jobs for up to `timeout`, then stop the runtime.
    ///
    /// Returns whether every job finished.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        let Some(runtime) = self.runtime.take() else {
            return true;
        };
        let started = Instant::now();
        let drained = self.wait_idle(timeout);
        if !drained {
            log::warn!(
                "Maintenance worker shutdown timed out after {:?} with {} jobs in flight",
                timeout,
                self.in_flight()
            );
        }
        runtime.shutdown_timeout(timeout.saturating_sub(started.elapsed()));
        drained
    }
}

impl Drop for MaintenanceWorker {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
