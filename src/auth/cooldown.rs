//! Rate-limit backoff for the auth form.
//!
//! A rate-limited failure sets the cooldown to the wait time named in the
//! service message ("... after N seconds"), or to [`DEFAULT_COOLDOWN_SECS`]
//! when none can be parsed. The counter drops by one per second on a tokio
//! task owned by [`Cooldown`]; only one ticker exists at a time.

use crate::backend::ServiceError;
use regex::Regex;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::{
    task::JoinHandle,
    time::{self, Instant},
};
use tracing::debug;

pub const DEFAULT_COOLDOWN_SECS: u64 = 60;

const TICK: Duration = Duration::from_secs(1);

/// Extracts `N` from a message containing "after N seconds".
#[must_use]
pub fn parse_wait_seconds(message: &str) -> Option<u64> {
    let regex = Regex::new(r"after (\d+) seconds").ok()?;
    regex.captures(message)?.get(1)?.as_str().parse().ok()
}

/// Cooldown to apply after `error`, or `None` if it was not rate limited.
#[must_use]
pub fn cooldown_for(error: &ServiceError) -> Option<u64> {
    error
        .is_rate_limited()
        .then(|| parse_wait_seconds(&error.to_string()).unwrap_or(DEFAULT_COOLDOWN_SECS))
}

#[derive(Debug, Default)]
pub struct Cooldown {
    remaining: Arc<AtomicU64>,
    ticker: Option<JoinHandle<()>>,
}

impl Cooldown {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds left before the form may submit again.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.remaining() > 0
    }

    /// Replaces any running cooldown with a fresh one of `seconds`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, seconds: u64) {
        self.cancel();
        debug!(seconds, "starting auth cooldown");

        // A fresh counter per ticker: an aborted ticker can never touch it.
        let remaining = Arc::new(AtomicU64::new(seconds));
        self.remaining = Arc::clone(&remaining);
        if seconds == 0 {
            return;
        }

        self.ticker = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + TICK, TICK);
            loop {
                interval.tick().await;
                let previous =
                    remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                        left.checked_sub(1)
                    });
                if matches!(previous, Ok(1) | Err(_)) {
                    break;
                }
            }
        }));
    }

    /// Stops the ticker and zeroes the counter.
    pub fn cancel(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        self.remaining = Arc::new(AtomicU64::new(0));
    }

    #[cfg(test)]
    fn ticker_finished(&self) -> bool {
        self.ticker.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for Cooldown {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}
