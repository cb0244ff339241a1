//! Tool call handling.
//!
//! Every inbound `toolcall` event is answered with one acknowledgement per
//! invocation, whether or not the filter understood it. Only the first
//! invocation of the watched capability updates [`DetectionState`].

use crate::declaration::DUCK_SPOTTED;
use crate::error::ArgumentError;
use crate::events::{ToolCallEvent, ToolInvocation, ToolResponse};
use crate::session::{ListenerId, LiveSession, SharedSession, same_session};
use crate::state::{DetectionCell, DetectionState};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What handling one event did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCallOutcome {
    /// ID of the invocation that updated the state, if any.
    pub matched: Option<String>,
    /// Number of invocations acknowledged.
    pub acknowledged: usize,
    /// Arguments of the matched invocation that were missing or mistyped.
    pub argument_errors: Vec<ArgumentError>,
}

/// Interprets tool calls for one capability and acknowledges all of them.
#[derive(Debug)]
pub struct ToolCallHandler {
    capability: String,
    state: Arc<DetectionCell>,
}

impl ToolCallHandler {
    /// Create a handler watching `capability`.
    pub fn new(capability: impl Into<String>, state: Arc<DetectionCell>) -> Self {
        Self { capability: capability.into(), state }
    }

    /// Create a handler for `duck_spotted`.
    pub fn duck_spotted(state: Arc<DetectionCell>) -> Self {
        Self::new(DUCK_SPOTTED, state)
    }

    /// Name of the watched capability.
    pub fn capability(&self) -> &str {
        &self.capability
    }

    /// The state this handler writes.
    pub fn state(&self) -> &Arc<DetectionCell> {
        &self.state
    }

    /// Update state from `event` and build the acknowledgement, without sending it.
    pub fn apply(&self, event: &ToolCallEvent) -> (ToolCallOutcome, Option<ToolResponse>) {
        let mut outcome = ToolCallOutcome::default();

        if let Some(call) = event.find(&self.capability) {
            let (state, errors) = extract_detection(call);
            for err in &errors {
                warn!(call_id = %call.id, error = %err, "Malformed tool call argument");
            }
            self.state.set(state);
            outcome.matched = Some(call.id.clone());
            outcome.argument_errors = errors;
        }

        let response = ToolResponse::acknowledge_all(event);
        outcome.acknowledged = response.as_ref().map_or(0, |r| r.function_responses.len());
        (outcome, response)
    }

    /// Handle one event and send the acknowledgement.
    ///
    /// Acknowledgement failures are logged and dropped.
    pub async fn handle(&self, session: &dyn LiveSession, event: ToolCallEvent) -> ToolCallOutcome {
        debug!(invocations = event.len(), "Got tool call");
        let (outcome, response) = self.apply(&event);

        if let Some(response) = response {
            if let Err(e) = session.send_tool_response(response).await {
                warn!(session_id = %session.session_id(), error = %e, "Failed to send tool response");
            }
        }
        outcome
    }

    /// Subscribe to `session`'s tool calls until the returned registration is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn register(self: Arc<Self>, session: SharedSession) -> ToolCallRegistration {
        let subscription = session.on_tool_call();
        let id = subscription.id;
        let mut events = subscription.events;
        let token = CancellationToken::new();

        info!(session_id = %session.session_id(), capability = %self.capability, "Registered tool call handler");

        let task = {
            let token = token.clone();
            let session = session.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => break,
                        event = events.recv() => match event {
                            Some(event) => {
                                self.handle(session.as_ref(), event).await;
                            }
                            None => break,
                        },
                    }
                }
            })
        };

        ToolCallRegistration { session, id, token, task: Some(task) }
    }
}

/// Read `spotted`/`where` leniently, collecting what was wrong.
///
/// A missing `spotted` reads as `false`, a mistyped one by JSON truthiness.
/// A missing `where` reads as empty, a mistyped one as its JSON text.
fn extract_detection(call: &ToolInvocation) -> (DetectionState, Vec<ArgumentError>) {
    let mut errors = Vec::new();

    let spotted = call.get_bool("spotted").unwrap_or_else(|err| {
        errors.push(err);
        call.arg("spotted").is_some_and(truthy)
    });

    let location = match call.get_str("where") {
        Ok(location) => location.to_string(),
        Err(err) => {
            errors.push(err);
            call.arg("where").map(Value::to_string).unwrap_or_default()
        }
    };

    (DetectionState { spotted, location }, errors)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A live `toolcall` subscription. Dropping it unsubscribes.
pub struct ToolCallRegistration {
    session: SharedSession,
    id: ListenerId,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ToolCallRegistration {
    /// The subscribed session.
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Whether this registration belongs to `session`.
    pub fn is_for(&self, session: &SharedSession) -> bool {
        same_session(&self.session, session)
    }

    /// Unsubscribe and wait for the listener task to finish.
    pub async fn unregister(mut self) {
        self.release();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn release(&self) {
        if !self.token.is_cancelled() {
            self.token.cancel();
            self.session.off_tool_call(self.id);
            info!(session_id = %self.session.session_id(), "Unregistered tool call handler");
        }
    }
}

impl Drop for ToolCallRegistration {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ToolCallRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCallRegistration")
            .field("session_id", &self.session.session_id())
            .field("listener", &self.id)
            .field("active", &!self.token.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn handler() -> ToolCallHandler {
        ToolCallHandler::duck_spotted(Arc::new(DetectionCell::new()))
    }

    #[test]
    fn test_apply_matching_call() {
        let handler = handler();
        let event = ToolCallEvent::new(vec![ToolInvocation::new(
            "1",
            "duck_spotted",
            json!({"spotted": true, "where": "left bank"}),
        )]);

        let (outcome, response) = handler.apply(&event);
        assert_eq!(outcome.matched.as_deref(), Some("1"));
        assert_eq!(outcome.acknowledged, 1);
        assert!(outcome.argument_errors.is_empty());
        assert_eq!(handler.state().get(), DetectionState::new(true, "left bank"));
        assert_eq!(response.unwrap().function_responses[0].id, "1");
    }

    #[test]
    fn test_apply_empty_event_is_noop() {
        let handler = handler();
        let (outcome, response) = handler.apply(&ToolCallEvent::default());
        assert_eq!(outcome, ToolCallOutcome::default());
        assert!(response.is_none());
        assert_eq!(handler.state().get(), DetectionState::default());
    }

    #[test]
    fn test_apply_unrelated_call_only_acknowledges() {
        let handler = handler();
        handler.state().set(DetectionState::new(true, "reeds"));
        let event =
            ToolCallEvent::new(vec![ToolInvocation::new("9", "goose_spotted", json!({"spotted": false}))]);

        let (outcome, response) = handler.apply(&event);
        assert!(outcome.matched.is_none());
        assert_eq!(outcome.acknowledged, 1);
        assert!(response.is_some());
        assert_eq!(handler.state().get(), DetectionState::new(true, "reeds"));
    }

    #[test]
    fn test_malformed_arguments_pass_through() {
        let handler = handler();
        let event = ToolCallEvent::new(vec![ToolInvocation::new(
            "1",
            "duck_spotted",
            json!({"spotted": "yes", "where": 3}),
        )]);

        let (outcome, _) = handler.apply(&event);
        assert_eq!(outcome.argument_errors.len(), 2);
        assert_eq!(outcome.argument_errors[0].field(), "spotted");
        assert_eq!(outcome.argument_errors[1].field(), "where");
        assert_eq!(handler.state().get(), DetectionState::new(true, "3"));
    }

    #[test]
    fn test_missing_arguments_use_defaults() {
        let handler = handler();
        handler.state().set(DetectionState::new(true, "pond"));
        let event = ToolCallEvent::new(vec![ToolInvocation::new("1", "duck_spotted", json!({}))]);

        let (outcome, _) = handler.apply(&event);
        assert_eq!(
            outcome.argument_errors,
            vec![
                ArgumentError::Missing { field: "spotted".into() },
                ArgumentError::Missing { field: "where".into() },
            ]
        );
        assert_eq!(handler.state().get(), DetectionState::default());
    }

    #[test]
    fn test_truthy() {
        assert!(!truthy(&json!(null)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(truthy(&json!("false")));
        assert!(truthy(&json!(1.5)));
        assert!(truthy(&json!([])));
    }
}
