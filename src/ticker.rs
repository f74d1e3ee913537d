//! Periodic timestamp appender.
//!
//! Mirrors the heartbeat/cleanup interval pattern in this codebase's
//! `NetworkServerActor::run`: a single `tokio::time::interval` loop, selected alongside a
//! shutdown signal, that fires on a fixed period for as long as the server runs.

use crate::command::Command;
use crate::log_store::LogStore;
use bytes::Bytes;
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Appends a `timestamp:<formatted local time>\n` command to `store` every `period`,
/// until `shutdown` fires.
///
/// Ticker writes through the same [`LogStore::commit`] path a client session does, so a
/// timestamp command takes its place in `RingLog`'s ordering exactly like any other
/// command — it is not a side channel.
pub struct Ticker {
    store: Arc<LogStore>,
    period: Duration,
}

impl Ticker {
    /// Builds a ticker that will append to `store` every `period` once run.
    pub fn new(store: Arc<LogStore>, period: Duration) -> Self {
        Self { store, period }
    }

    /// Runs the periodic loop until `shutdown` is notified.
    ///
    /// The first tick fires after one full `period` has elapsed, not immediately on
    /// entry, matching `tokio::time::interval`'s default behavior.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.period);
        // The first tick of a freshly-constructed interval fires immediately; skip it so
        // the first timestamp command lands one full period after startup.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(err) = self.emit().await {
                        warn!(error = %err, "ticker failed to append timestamp command");
                    }
                }
                _ = shutdown.changed() => {
                    debug!("ticker stopping");
                    break;
                }
            }
        }
    }

    async fn emit(&self) -> crate::error::LogResult<()> {
        let formatted = format!("timestamp:{}\n", Local::now().format("%a %b %e %T %Y"));
        let cmd = Command::new(Bytes::from(formatted.into_bytes()));
        self.store.commit(cmd).await
    }
}
