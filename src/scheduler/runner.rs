//! Periodic, self-excluding audit loop
//!
//! One tokio task owns the interval. Each tick claims the task's run slot
//! before starting a run on the blocking pool; a tick that finds the slot
//! taken, by an earlier tick or by a manual run, is counted as skipped,
//! never queued. The claim is dropped at the end of the run, whether it
//! returns, fails or panics.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::observability::{log_event, log_event_with_fields, Event, Logger, MetricsRegistry};

use super::job::{AuditTask, RunSlot};

/// Default audit period: 30 minutes
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(30 * 60);

/// Counters for one scheduler instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub ticks_skipped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    runs_started: AtomicU64,
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
    ticks_skipped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Builder for the audit loop
#[derive(Debug, Clone)]
pub struct AuditScheduler {
    period: Duration,
    metrics: Arc<MetricsRegistry>,
}

impl Default for AuditScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD)
    }
}

impl AuditScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Starts the loop on the current tokio runtime.
    ///
    /// The first run happens one period after spawning.
    pub fn spawn(self, task: Arc<dyn AuditTask>) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let slot = task.slot().clone();
        let counters = Arc::new(Counters::default());

        let loop_counters = Arc::clone(&counters);
        let period = self.period.max(Duration::from_millis(1));
        let metrics = self.metrics;

        let join = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut in_flight: Option<JoinHandle<()>> = None;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(claim) = task.slot().try_claim() else {
                            loop_counters.ticks_skipped.fetch_add(1, Ordering::Relaxed);
                            metrics.increment_audit_ticks_skipped();
                            Logger::warn(Event::AuditTickSkipped.as_str(), &[("reason", "run in progress")]);
                            continue;
                        };

                        let task = Arc::clone(&task);
                        let counters = Arc::clone(&loop_counters);
                        counters.runs_started.fetch_add(1, Ordering::Relaxed);

                        // The loop keeps ticking (and skipping) while this runs
                        in_flight = Some(tokio::task::spawn_blocking(move || {
                            let result = panic::catch_unwind(AssertUnwindSafe(|| task.run_claimed(&claim)));
                            match result {
                                Ok(Ok(_)) => {
                                    counters.runs_completed.fetch_add(1, Ordering::Relaxed);
                                }
                                Ok(Err(_)) => {
                                    counters.runs_failed.fetch_add(1, Ordering::Relaxed);
                                }
                                Err(_) => {
                                    counters.runs_failed.fetch_add(1, Ordering::Relaxed);
                                    Logger::error(Event::AuditRunFailed.as_str(), &[("error", "audit task panicked")]);
                                }
                            }
                        }));
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }

            if let Some(run) = in_flight.take() {
                let _ = run.await;
            }

            log_event(Event::SchedulerStopped);
        });

        log_event_with_fields(
            Event::SchedulerStarted,
            &[("period_secs", &period.as_secs_f64().to_string())],
        );

        SchedulerHandle {
            shutdown_tx,
            join,
            slot,
            counters,
        }
    }
}

/// Handle on a running scheduler
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
    slot: RunSlot,
    counters: Arc<Counters>,
}

impl SchedulerHandle {
    pub fn stats(&self) -> SchedulerStats {
        self.counters.snapshot()
    }

    /// True while any run of the task holds its slot, scheduled or not
    pub fn is_running(&self) -> bool {
        self.slot.is_busy()
    }

    /// Stops ticking and waits for the scheduler's in-flight run to finish.
    pub async fn shutdown(self) -> SchedulerStats {
        let _ = self.shutdown_tx.send(true);
        let _ = self.join.await;
        self.counters.snapshot()
    }
}
