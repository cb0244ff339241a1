//! Session configuration.

use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::{LiveSession, SharedSession};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// Submits the capability contract to a session.
///
/// [`ensure_configured`](Self::ensure_configured) applies the config once per
/// session object and re-applies only when handed a different session. Only a
/// weak reference to the configured session is kept.
pub struct SessionConfigurator {
    config: SessionConfig,
    applied_to: Option<Weak<dyn LiveSession>>,
}

impl SessionConfigurator {
    /// Create a configurator for the given config.
    pub fn new(config: SessionConfig) -> Self {
        Self { config, applied_to: None }
    }

    /// The config this configurator submits.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Send the config unconditionally. Session errors are returned as-is.
    pub async fn configure(&self, session: &dyn LiveSession) -> Result<()> {
        info!(
            session_id = %session.session_id(),
            model_id = %self.config.model_id,
            capabilities = self.config.capabilities.len(),
            "Configuring live session"
        );
        session.configure(self.config.clone()).await
    }

    /// Configure `session` unless it was already configured by this instance.
    ///
    /// Returns whether a config was sent. A failed attempt is not remembered,
    /// so the next call retries.
    pub async fn ensure_configured(&mut self, session: &SharedSession) -> Result<bool> {
        if self.is_configured_for(session) {
            debug!(session_id = %session.session_id(), "Session already configured");
            return Ok(false);
        }

        self.configure(session.as_ref()).await?;
        self.applied_to = Some(Arc::downgrade(session));
        Ok(true)
    }

    /// Whether `session` is the one last configured.
    pub fn is_configured_for(&self, session: &SharedSession) -> bool {
        self.applied_to.as_ref().is_some_and(|applied| {
            applied.strong_count() > 0 && std::ptr::addr_eq(applied.as_ptr(), Arc::as_ptr(session))
        })
    }
}

impl std::fmt::Debug for SessionConfigurator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfigurator")
            .field("model_id", &self.config.model_id)
            .field(
                "applied_to",
                &self.applied_to.as_ref().and_then(Weak::upgrade).map(|s| s.session_id().to_string()),
            )
            .finish()
    }
}
