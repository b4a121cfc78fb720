//! Recurring background tasks.
//!
//! A small owned scheduler instead of a cron dependency. Jobs come in two
//! shapes: daily runs anchored to a caller-supplied delay function (so a job
//! can track a provider's generation boundary) and fixed-period runs. All
//! tasks stop through one shutdown signal; a job caught mid-run finishes its
//! batch first.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

pub struct Scheduler {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            handles: Vec::new(),
        }
    }

    /// Runs `job` repeatedly, waiting `next_delay()` before each run. The
    /// delay is re-evaluated every cycle, so wall-clock anchored jobs stay
    /// aligned across runs of uneven length.
    pub fn spawn_daily<D, J, F>(&mut self, name: &'static str, next_delay: D, job: J)
    where
        D: Fn() -> Duration + Send + 'static,
        J: Fn() -> F + Send + 'static,
        F: Future<Output = ()> + Send + 'static,
    {
        let mut shutdown = self.shutdown.subscribe();
        self.handles.push(tokio::spawn(async move {
            loop {
                let delay = next_delay();
                debug!(task = name, delay_secs = delay.as_secs(), "next run scheduled");
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = sleep(delay) => job().await,
                }
            }
            debug!(task = name, "stopped");
        }));
    }

    /// Runs `job` every `period`, starting one period from now.
    pub fn spawn_interval<J, F>(&mut self, name: &'static str, period: Duration, job: J)
    where
        J: Fn() -> F + Send + 'static,
        F: Future<Output = ()> + Send + 'static,
    {
        let mut shutdown = self.shutdown.subscribe();
        self.handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // An interval's first tick fires immediately; swallow it.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => job().await,
                }
            }
            debug!(task = name, "stopped");
        }));
    }

    /// Signals shutdown and waits for every task to wind down.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
        info!("scheduler stopped");
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
