//! Configuration types for the live filter.

use crate::declaration::{CapabilityDeclaration, duck_spotted_declaration};
use crate::error::{LiveFilterError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

/// Default Gemini Live model.
pub const DEFAULT_MODEL: &str = "models/gemini-2.0-flash-exp";

/// Default system instruction for duck detection.
pub const DEFAULT_INSTRUCTION: &str = "You are my helpful bird watching assistant. I am going to ask you if you see a duck. Please call the \"duck_spotted\" function with true or false depending on if you see a duck, and where in the image you see it. Dont ask for additional information just make your best judgement.";

/// Default polling query.
pub const DEFAULT_QUERY: &str = "Do you see a duck?";

/// Default polling period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Output modality requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseModality {
    /// Text responses.
    #[default]
    Text,
    /// Audio responses.
    Audio,
}

/// Configuration bundle submitted to the session on initialization.
///
/// Always sent wholesale; there are no partial updates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Model identifier.
    pub model_id: String,
    /// Desired response modality.
    pub response_modality: ResponseModality,
    /// Natural-language behavioral prompt.
    pub system_instruction: String,
    /// Declared capabilities, in advertisement order.
    pub capabilities: Vec<CapabilityDeclaration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL.to_string(),
            response_modality: ResponseModality::Text,
            system_instruction: DEFAULT_INSTRUCTION.to_string(),
            capabilities: vec![duck_spotted_declaration()],
        }
    }
}

impl SessionConfig {
    /// Create a builder for SessionConfig.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// Find a declared capability by name.
    pub fn capability(&self, name: &str) -> Option<&CapabilityDeclaration> {
        self.capabilities.iter().find(|c| c.name() == name)
    }

    /// Render the Gemini Live `setup` payload.
    pub fn to_setup(&self) -> Result<Value> {
        let function_declarations = self
            .capabilities
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut setup = json!({
            "model": self.model_id,
            "generationConfig": {
                "responseModalities": self.response_modality,
            },
            "systemInstruction": {
                "parts": [{ "text": self.system_instruction }],
            },
        });

        if !function_declarations.is_empty() {
            setup["tools"] = json!([{ "functionDeclarations": function_declarations }]);
        }

        Ok(setup)
    }
}

/// Builder for SessionConfig.
#[derive(Debug, Clone)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfigBuilder {
    /// Create a new builder with no capabilities and the default model.
    pub fn new() -> Self {
        Self {
            config: SessionConfig {
                model_id: DEFAULT_MODEL.to_string(),
                response_modality: ResponseModality::Text,
                system_instruction: String::new(),
                capabilities: Vec::new(),
            },
        }
    }

    /// Set the model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model_id = model.into();
        self
    }

    /// Set the response modality.
    pub fn response_modality(mut self, modality: ResponseModality) -> Self {
        self.config.response_modality = modality;
        self
    }

    /// Set the system instruction.
    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.system_instruction = instruction.into();
        self
    }

    /// Add a capability.
    pub fn capability(mut self, capability: CapabilityDeclaration) -> Self {
        self.config.capabilities.push(capability);
        self
    }

    /// Build the configuration, rejecting duplicate capability names.
    pub fn build(self) -> Result<SessionConfig> {
        let caps = &self.config.capabilities;
        for (i, cap) in caps.iter().enumerate() {
            if caps[..i].iter().any(|c| c.name() == cap.name()) {
                return Err(LiveFilterError::config(format!(
                    "capability `{}` declared more than once",
                    cap.name()
                )));
            }
        }
        if self.config.model_id.trim().is_empty() {
            return Err(LiveFilterError::config("model id must not be empty"));
        }
        Ok(self.config)
    }
}

/// How the polling driver treats a tick while an earlier query is unanswered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Every tick sends, regardless of in-flight queries.
    #[default]
    Concurrent,
    /// A tick is skipped while the previous query is still pending.
    SkipWhileInFlight,
}

/// Runtime settings for the live filter.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveFilterConfig {
    /// Model identifier placed in the session config.
    pub model_id: String,
    /// Period between queries while connected.
    pub poll_interval: Duration,
    /// Query text sent on every tick.
    pub query: String,
    /// Tick overlap policy.
    pub overlap: OverlapPolicy,
}

impl Default for LiveFilterConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            query: DEFAULT_QUERY.to_string(),
            overlap: OverlapPolicy::Concurrent,
        }
    }
}

impl LiveFilterConfig {
    /// Defaults overridden by `LIVE_FILTER_MODEL`, `LIVE_FILTER_POLL_INTERVAL_MS`
    /// and `LIVE_FILTER_QUERY` when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(model) = lookup("LIVE_FILTER_MODEL") {
            config.model_id = model;
        }

        if let Some(raw) = lookup("LIVE_FILTER_POLL_INTERVAL_MS") {
            let ms: u64 = raw.trim().parse().map_err(|e| {
                LiveFilterError::config(format!("LIVE_FILTER_POLL_INTERVAL_MS `{}`: {}", raw, e))
            })?;
            config = config.with_poll_interval(Duration::from_millis(ms));
        }

        if let Some(query) = lookup("LIVE_FILTER_QUERY") {
            config.query = query;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_id = model.into();
        self
    }

    /// Set the polling period.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the query text.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// Set the overlap policy.
    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    /// Check invariants.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(LiveFilterError::config("poll interval must be positive"));
        }
        if self.query.trim().is_empty() {
            return Err(LiveFilterError::config("query must not be empty"));
        }
        if self.model_id.trim().is_empty() {
            return Err(LiveFilterError::config("model id must not be empty"));
        }
        Ok(())
    }

    /// The duck detection session config for this model.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig { model_id: self.model_id.clone(), ..SessionConfig::default() }
    }
}
