//! In-memory live session used by the integration tests.

#![allow(dead_code)]

use adk_live_filter::{
    LiveFilterError, ListenerId, LiveSession, Part, Result, SessionConfig, ToolCallEvent,
    ToolCallListeners, ToolCallSubscription, ToolInvocation, ToolResponse,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;

pub struct MockSession {
    id: String,
    connected: watch::Sender<bool>,
    listeners: ToolCallListeners,
    configs: Mutex<Vec<SessionConfig>>,
    queries: Mutex<Vec<Vec<Part>>>,
    tool_responses: Mutex<Vec<ToolResponse>>,
    fail_configure: AtomicBool,
    fail_send: AtomicBool,
    send_delay: Mutex<Option<Duration>>,
}

impl MockSession {
    pub fn new(id: &str) -> Arc<Self> {
        let (connected, _) = watch::channel(false);
        Arc::new(Self {
            id: id.to_string(),
            connected,
            listeners: ToolCallListeners::new(),
            configs: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            tool_responses: Mutex::new(Vec::new()),
            fail_configure: AtomicBool::new(false),
            fail_send: AtomicBool::new(false),
            send_delay: Mutex::new(None),
        })
    }

    pub fn connected(id: &str) -> Arc<Self> {
        let session = Self::new(id);
        session.set_connected(true);
        session
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.send_replace(connected);
    }

    pub fn fail_configure(&self, fail: bool) {
        self.fail_configure.store(fail, Ordering::SeqCst);
    }

    pub fn fail_send(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    pub fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock() = Some(delay);
    }

    /// Deliver a tool call to every registered listener.
    pub fn emit(&self, event: ToolCallEvent) -> usize {
        self.listeners.dispatch(&event)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn configs(&self) -> Vec<SessionConfig> {
        self.configs.lock().clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().len()
    }

    pub fn queries(&self) -> Vec<Vec<Part>> {
        self.queries.lock().clone()
    }

    pub fn tool_responses(&self) -> Vec<ToolResponse> {
        self.tool_responses.lock().clone()
    }
}

#[async_trait]
impl LiveSession for MockSession {
    fn session_id(&self) -> &str {
        &self.id
    }

    fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    fn connection(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }

    async fn configure(&self, config: SessionConfig) -> Result<()> {
        if self.fail_configure.load(Ordering::SeqCst) {
            return Err(LiveFilterError::provider("setup rejected"));
        }
        self.configs.lock().push(config);
        Ok(())
    }

    async fn send(&self, parts: Vec<Part>) -> Result<Value> {
        if !self.is_connected() {
            return Err(LiveFilterError::NotConnected);
        }
        self.queries.lock().push(parts);

        let delay = *self.send_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_send.load(Ordering::SeqCst) {
            return Err(LiveFilterError::send("socket closed"));
        }
        Ok(json!({ "turnComplete": true }))
    }

    async fn send_tool_response(&self, response: ToolResponse) -> Result<()> {
        self.tool_responses.lock().push(response);
        Ok(())
    }

    fn on_tool_call(&self) -> ToolCallSubscription {
        self.listeners.register()
    }

    fn off_tool_call(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

/// Let spawned tasks run to completion.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

pub fn duck_call(id: &str, spotted: bool, location: &str) -> ToolInvocation {
    ToolInvocation::new(id, "duck_spotted", json!({ "spotted": spotted, "where": location }))
}

pub fn ack_ids(response: &ToolResponse) -> Vec<String> {
    response.function_responses.iter().map(|r| r.id.clone()).collect()
}
