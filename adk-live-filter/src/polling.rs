//! Timed query loop gated on the session's connection state.
//!
//! ```text
//!   Idle ──connected=true──▶ Polling ──connected=false / stop──▶ Idle
//!                              │
//!                              └─ every period: send(query), fire-and-forget
//! ```
//!
//! Each `Polling` episode owns a child [`CancellationToken`]. Leaving the
//! state cancels it before anything else runs, and every spawned send checks
//! it (and the session's connection flag) before touching the session.

use crate::config::{LiveFilterConfig, OverlapPolicy};
use crate::error::Result;
use crate::events::Part;
use crate::session::SharedSession;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Periodically asks the session a fixed question while it is connected.
#[derive(Clone)]
pub struct PollingDriver {
    session: SharedSession,
    interval: Duration,
    query: String,
    overlap: OverlapPolicy,
}

impl PollingDriver {
    /// Create a driver using the polling settings of `config`.
    ///
    /// Returns [`LiveFilterError::ConfigError`](crate::LiveFilterError::ConfigError)
    /// if `config` does not validate, e.g. for a zero polling period.
    pub fn new(session: SharedSession, config: &LiveFilterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            session,
            interval: config.poll_interval,
            query: config.query.clone(),
            overlap: config.overlap,
        })
    }

    /// Polling period.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the driver. It polls whenever the session is connected until the
    /// handle is stopped or dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> PollingHandle {
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(self.supervise(shutdown.clone()));
        PollingHandle { shutdown, task: Some(task) }
    }

    async fn supervise(self, shutdown: CancellationToken) {
        let mut connection = self.session.connection();

        loop {
            if !*connection.borrow_and_update() {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => return,
                    changed = connection.changed() => {
                        if changed.is_err() {
                            debug!(session_id = %self.session.session_id(), "Connection watch closed");
                            return;
                        }
                        continue;
                    }
                }
            }

            let episode = shutdown.child_token();
            info!(
                session_id = %self.session.session_id(),
                interval = ?self.interval,
                "Polling started"
            );
            let closed = self.poll(&episode, &mut connection).await;
            episode.cancel();
            info!(session_id = %self.session.session_id(), "Polling stopped");

            if closed || shutdown.is_cancelled() {
                return;
            }
        }
    }

    /// Tick until disconnected or cancelled. Returns `true` if the connection
    /// watch closed.
    async fn poll(&self, episode: &CancellationToken, connection: &mut watch::Receiver<bool>) -> bool {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let in_flight = Arc::new(AtomicBool::new(false));

        loop {
            tokio::select! {
                biased;
                _ = episode.cancelled() => return false,
                changed = connection.changed() => {
                    if changed.is_err() {
                        return true;
                    }
                    if !*connection.borrow_and_update() {
                        return false;
                    }
                }
                _ = ticker.tick() => self.fire(episode, &in_flight),
            }
        }
    }

    fn fire(&self, episode: &CancellationToken, in_flight: &Arc<AtomicBool>) {
        let guard = match self.overlap {
            OverlapPolicy::Concurrent => None,
            OverlapPolicy::SkipWhileInFlight => {
                if in_flight.swap(true, Ordering::AcqRel) {
                    debug!(session_id = %self.session.session_id(), "Previous query pending, skipping tick");
                    return;
                }
                Some(InFlightGuard(in_flight.clone()))
            }
        };

        let session = self.session.clone();
        let episode = episode.clone();
        let parts = vec![Part::text(self.query.clone())];

        tokio::spawn(async move {
            let _guard = guard;
            if episode.is_cancelled() || !session.is_connected() {
                debug!(session_id = %session.session_id(), "Polling stopped before query was sent");
                return;
            }

            match session.send(parts).await {
                Ok(response) => debug!(session_id = %session.session_id(), %response, "Query response"),
                Err(e) => warn!(session_id = %session.session_id(), error = %e, "Query failed"),
            }
        });
    }
}

impl std::fmt::Debug for PollingDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingDriver")
            .field("session_id", &self.session.session_id())
            .field("interval", &self.interval)
            .field("query", &self.query)
            .field("overlap", &self.overlap)
            .finish()
    }
}

struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to a running [`PollingDriver`]. Dropping it stops polling.
#[derive(Debug)]
pub struct PollingHandle {
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollingHandle {
    /// Whether the driver task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop polling and wait for the driver task to exit.
    ///
    /// No query is sent after this returns.
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
