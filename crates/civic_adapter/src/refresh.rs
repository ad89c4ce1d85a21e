#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::SharedRuntime;

/// In-flight flag for refresh passes. A tick that finds a pass outstanding is
/// skipped, never queued.
#[derive(Debug, Clone, Default)]
pub struct RefreshGuard {
    in_flight: Arc<AtomicBool>,
}

/// Held for the duration of one pass; clears the flag on drop.
#[derive(Debug)]
pub struct RefreshPass {
    in_flight: Arc<AtomicBool>,
}

impl Drop for RefreshPass {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

impl RefreshGuard {
    pub fn try_begin(&self) -> Option<RefreshPass> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RefreshPass {
                in_flight: Arc::clone(&self.in_flight),
            })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Reloads the directory from persistence; `Ok(false)` means a degraded load
/// was ignored. Lock poisoning is reported, not propagated.
pub fn run_refresh_pass(runtime: &SharedRuntime) -> Result<bool, String> {
    let mut runtime = runtime
        .lock()
        .map_err(|_| "adapter runtime lock poisoned".to_string())?;
    Ok(runtime.refresh_pass())
}

pub fn spawn_refresh_worker(runtime: SharedRuntime, interval_ms: u64) -> JoinHandle<()> {
    let guard = RefreshGuard::default();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
        loop {
            ticker.tick().await;
            let Some(pass) = guard.try_begin() else {
                debug!("refresh pass still running; skipping tick");
                continue;
            };
            let runtime = Arc::clone(&runtime);
            tokio::task::spawn_blocking(move || {
                let _pass = pass;
                if let Err(err) = run_refresh_pass(&runtime) {
                    error!(error = %err, "refresh pass failed");
                }
            });
        }
    })
}
