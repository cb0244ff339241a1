//! Message types exchanged with the live session.
//!
//! Field names follow the Gemini Live wire format (`toolCall.functionCalls`,
//! `toolResponse.functionResponses`) so the types can be handed to a transport
//! as-is.

use crate::error::ArgumentError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

// ── Custom serde for wrapped function output ────────────────────────────

fn serialize_wrapped_output<S>(output: &Value, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    #[derive(Serialize)]
    struct Wrapped<'a> {
        output: &'a Value,
    }
    Wrapped { output }.serialize(serializer)
}

fn deserialize_wrapped_output<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapped {
        #[serde(default)]
        output: Value,
    }
    Wrapped::deserialize(deserializer).map(|w| w.output)
}

/// Name of a JSON value's type, for diagnostics.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Outbound content ────────────────────────────────────────────────────

/// A content part of an outbound user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    /// Text content.
    pub text: String,
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

// ── Tool calls ──────────────────────────────────────────────────────────

/// A single invocation of a declared capability.
///
/// Arguments are untyped at this boundary; the declared schema is only a hint
/// to the model. Use the typed getters to read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Opaque call ID, unique within its event.
    pub id: String,
    /// Name of the invoked capability.
    pub name: String,
    /// Raw arguments.
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl ToolInvocation {
    /// Create a new invocation.
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { id: id.into(), name: name.into(), args }
    }

    /// Raw argument value, if present.
    pub fn arg(&self, field: &str) -> Option<&Value> {
        self.args.get(field)
    }

    /// Read a boolean argument.
    pub fn get_bool(&self, field: &str) -> Result<bool, ArgumentError> {
        match self.require(field)? {
            Value::Bool(b) => Ok(*b),
            other => Err(wrong_type(field, "boolean", other)),
        }
    }

    /// Read a string argument.
    pub fn get_str(&self, field: &str) -> Result<&str, ArgumentError> {
        match self.require(field)? {
            Value::String(s) => Ok(s),
            other => Err(wrong_type(field, "string", other)),
        }
    }

    fn require(&self, field: &str) -> Result<&Value, ArgumentError> {
        self.args.get(field).ok_or_else(|| ArgumentError::Missing { field: field.to_string() })
    }
}

fn wrong_type(field: &str, expected: &'static str, actual: &Value) -> ArgumentError {
    ArgumentError::WrongType { field: field.to_string(), expected, actual: json_type_name(actual) }
}

/// An inbound batch of invocations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallEvent {
    /// Invocations in arrival order; may be empty.
    #[serde(default)]
    pub function_calls: Vec<ToolInvocation>,
}

impl ToolCallEvent {
    /// Create an event from invocations.
    pub fn new(function_calls: Vec<ToolInvocation>) -> Self {
        Self { function_calls }
    }

    /// Extract the tool call from a raw server message (`{"toolCall": {...}}`).
    ///
    /// Returns `None` when the message carries no tool call.
    pub fn from_server_message(message: &Value) -> Option<serde_json::Result<Self>> {
        message.get("toolCall").map(|raw| serde_json::from_value(raw.clone()))
    }

    /// First invocation of the named capability.
    pub fn find(&self, name: &str) -> Option<&ToolInvocation> {
        self.function_calls.iter().find(|call| call.name == name)
    }

    /// Number of invocations.
    pub fn len(&self) -> usize {
        self.function_calls.len()
    }

    /// Whether the event carries no invocations.
    pub fn is_empty(&self) -> bool {
        self.function_calls.is_empty()
    }
}

// ── Tool responses ──────────────────────────────────────────────────────

/// Acknowledgement of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    /// The call ID being responded to.
    pub id: String,
    /// Output of the call, sent as `response.output` on the wire.
    #[serde(
        rename = "response",
        serialize_with = "serialize_wrapped_output",
        deserialize_with = "deserialize_wrapped_output"
    )]
    pub output: Value,
}

impl FunctionResponse {
    /// Create a response with arbitrary output.
    pub fn new(id: impl Into<String>, output: Value) -> Self {
        Self { id: id.into(), output }
    }

    /// `{ "success": true }` acknowledgement.
    pub fn success(id: impl Into<String>) -> Self {
        Self::new(id, json!({ "success": true }))
    }
}

/// A batch of acknowledgements sent as a single message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    /// One entry per invocation of the triggering event.
    pub function_responses: Vec<FunctionResponse>,
}

impl ToolResponse {
    /// Acknowledge every invocation of `event` with success, preserving order.
    ///
    /// Returns `None` for an empty event; nothing should be sent in that case.
    pub fn acknowledge_all(event: &ToolCallEvent) -> Option<Self> {
        if event.is_empty() {
            return None;
        }
        Some(Self {
            function_responses: event
                .function_calls
                .iter()
                .map(|call| FunctionResponse::success(call.id.clone()))
                .collect(),
        })
    }

    /// Wrap in the client message envelope (`{"toolResponse": {...}}`).
    pub fn to_client_message(&self) -> serde_json::Result<Value> {
        Ok(json!({ "toolResponse": serde_json::to_value(self)? }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duck_call(id: &str, args: Value) -> ToolInvocation {
        ToolInvocation::new(id, "duck_spotted", args)
    }

    #[test]
    fn test_typed_getters() {
        let call = duck_call("1", json!({"spotted": true, "where": "left bank"}));
        assert_eq!(call.get_bool("spotted"), Ok(true));
        assert_eq!(call.get_str("where"), Ok("left bank"));
    }

    #[test]
    fn test_typed_getters_report_missing_and_wrong_type() {
        let call = duck_call("1", json!({"spotted": "yes"}));
        assert_eq!(
            call.get_bool("spotted"),
            Err(ArgumentError::WrongType {
                field: "spotted".into(),
                expected: "boolean",
                actual: "string"
            })
        );
        assert_eq!(call.get_str("where"), Err(ArgumentError::Missing { field: "where".into() }));
    }

    #[test]
    fn test_non_object_args_become_empty() {
        let call = duck_call("1", json!(["not", "an", "object"]));
        assert!(call.args.is_empty());
    }

    #[test]
    fn test_tool_call_from_server_message() {
        let message = json!({
            "toolCall": {
                "functionCalls": [
                    {"id": "a", "name": "duck_spotted", "args": {"spotted": false, "where": ""}},
                    {"id": "b", "name": "other"}
                ]
            }
        });

        let event = ToolCallEvent::from_server_message(&message).unwrap().unwrap();
        assert_eq!(event.len(), 2);
        assert_eq!(event.find("duck_spotted").unwrap().id, "a");
        assert!(event.function_calls[1].args.is_empty());
    }

    #[test]
    fn test_non_tool_message_is_ignored() {
        let message = json!({"serverContent": {"turnComplete": true}});
        assert!(ToolCallEvent::from_server_message(&message).is_none());
    }

    #[test]
    fn test_find_returns_first_match() {
        let event = ToolCallEvent::new(vec![
            ToolInvocation::new("x", "other", json!({})),
            duck_call("1", json!({"spotted": true})),
            duck_call("2", json!({"spotted": false})),
        ]);
        assert_eq!(event.find("duck_spotted").unwrap().id, "1");
        assert!(event.find("missing").is_none());
    }

    #[test]
    fn test_acknowledge_all_preserves_order() {
        let event = ToolCallEvent::new(vec![
            duck_call("3", json!({})),
            ToolInvocation::new("1", "other", json!({})),
            duck_call("2", json!({})),
        ]);

        let response = ToolResponse::acknowledge_all(&event).unwrap();
        let ids: Vec<_> = response.function_responses.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["3", "1", "2"]);
        assert!(response.function_responses.iter().all(|r| r.output == json!({"success": true})));
    }

    #[test]
    fn test_acknowledge_empty_event() {
        assert!(ToolResponse::acknowledge_all(&ToolCallEvent::default()).is_none());
    }

    #[test]
    fn test_tool_response_wire_format() {
        let response = ToolResponse { function_responses: vec![FunctionResponse::success("1")] };
        let message = response.to_client_message().unwrap();
        assert_eq!(
            message,
            json!({
                "toolResponse": {
                    "functionResponses": [
                        {"id": "1", "response": {"output": {"success": true}}}
                    ]
                }
            })
        );

        let parsed: ToolResponse = serde_json::from_value(message["toolResponse"].clone()).unwrap();
        assert_eq!(parsed, response);
    }
}
