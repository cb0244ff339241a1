//! The live filter adapter.

use crate::config::LiveFilterConfig;
use crate::configurator::SessionConfigurator;
use crate::error::Result;
use crate::handler::{ToolCallHandler, ToolCallRegistration};
use crate::polling::{PollingDriver, PollingHandle};
use crate::session::SharedSession;
use crate::state::{DetectionCell, DetectionState};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Turns a live session into a polled duck detector.
///
/// Attaching a session configures it, subscribes to its tool calls and starts
/// polling it whenever it is connected. Attaching a different session releases
/// everything bound to the previous one first; re-attaching the same session
/// is a no-op. Dropping the filter releases the subscription and the timer.
///
/// # Example
///
/// ```rust,ignore
/// use adk_live_filter::{LiveFilter, LiveFilterConfig};
///
/// let mut filter = LiveFilter::new(LiveFilterConfig::from_env()?)?;
/// filter.attach(session).await?;
///
/// let mut updates = filter.subscribe();
/// while updates.changed().await.is_ok() {
///     println!("{}", *updates.borrow());
/// }
/// ```
pub struct LiveFilter {
    config: LiveFilterConfig,
    configurator: SessionConfigurator,
    handler: Arc<ToolCallHandler>,
    binding: Option<Binding>,
}

struct Binding {
    registration: ToolCallRegistration,
    polling: PollingHandle,
}

impl LiveFilter {
    /// Create a filter. Fails if `config` is invalid.
    pub fn new(config: LiveFilterConfig) -> Result<Self> {
        config.validate()?;
        let configurator = SessionConfigurator::new(config.session_config());
        let handler = Arc::new(ToolCallHandler::duck_spotted(Arc::new(DetectionCell::new())));
        Ok(Self { config, configurator, handler, binding: None })
    }

    /// Runtime settings.
    pub fn config(&self) -> &LiveFilterConfig {
        &self.config
    }

    /// The shared detection cell.
    pub fn state(&self) -> Arc<DetectionCell> {
        self.handler.state().clone()
    }

    /// Snapshot of the latest detection.
    pub fn detection(&self) -> DetectionState {
        self.handler.state().get()
    }

    /// Watch detection changes.
    pub fn subscribe(&self) -> watch::Receiver<DetectionState> {
        self.handler.state().subscribe()
    }

    /// The currently attached session.
    pub fn session(&self) -> Option<&SharedSession> {
        self.binding.as_ref().map(|b| b.registration.session())
    }

    /// Bind to `session`.
    ///
    /// Configuration errors are returned and leave the filter unbound from
    /// `session`.
    pub async fn attach(&mut self, session: SharedSession) -> Result<()> {
        if self.binding.as_ref().is_some_and(|b| b.registration.is_for(&session)) {
            return Ok(());
        }

        self.detach().await;
        let driver = PollingDriver::new(session.clone(), &self.config)?;
        self.configurator.ensure_configured(&session).await?;

        info!(session_id = %session.session_id(), "Attaching live filter");
        let registration = self.handler.clone().register(session);
        let polling = driver.start();
        self.binding = Some(Binding { registration, polling });
        Ok(())
    }

    /// Release the current session, if any. No query is sent and no tool call
    /// is handled for it after this returns.
    pub async fn detach(&mut self) {
        if let Some(Binding { registration, polling }) = self.binding.take() {
            info!(session_id = %registration.session().session_id(), "Detaching live filter");
            polling.stop().await;
            registration.unregister().await;
        }
    }
}

impl std::fmt::Debug for LiveFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveFilter")
            .field("config", &self.config)
            .field("session_id", &self.session().map(|s| s.session_id().to_string()))
            .field("detection", &self.detection())
            .finish()
    }
}
