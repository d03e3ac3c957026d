use std::time::Duration;

use log::info;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Plain periodic scheduler: fires once immediately, then every `period`,
/// until stopped. Holds at most one running loop.
pub struct Ticker {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    period: Option<Duration>,
}

impl Ticker {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
            period: None,
        }
    }

    /// Start ticking, replacing any loop that is already running.
    pub fn start<F>(&mut self, period: Duration, on_tick: F)
    where
        F: Fn() + Send + 'static,
    {
        self.stop();

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => on_tick(),
                    _ = token_clone.cancelled() => {
                        info!("ticker shutting down");
                        break;
                    }
                }
            }
        });

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.period = Some(period);
    }

    /// Idempotent.
    pub fn stop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.period = None;
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
