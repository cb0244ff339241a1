//! Runs the live filter against an in-process session that pretends to watch
//! a pond.
//!
//! ```bash
//! RUST_LOG=adk_live_filter=debug cargo run -p adk-live-filter --example simulated_pond
//! ```

use adk_live_filter::{
    LiveFilter, LiveFilterConfig, LiveFilterError, ListenerId, LiveSession, Part, Result,
    SessionConfig, ToolCallEvent, ToolCallListeners, ToolCallSubscription, ToolInvocation,
    ToolResponse, telemetry,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;

const SPOTS: [Option<&str>; 4] = [None, Some("left bank"), Some("under the bridge"), None];

/// Answers every query with a `duck_spotted` call cycling through `SPOTS`.
struct PondSession {
    connected: watch::Sender<bool>,
    listeners: ToolCallListeners,
    config: Mutex<Option<SessionConfig>>,
    turns: AtomicU64,
}

impl PondSession {
    fn new() -> Arc<Self> {
        let (connected, _) = watch::channel(false);
        Arc::new(Self {
            connected,
            listeners: ToolCallListeners::new(),
            config: Mutex::new(None),
            turns: AtomicU64::new(0),
        })
    }

    fn set_connected(&self, connected: bool) {
        self.connected.send_replace(connected);
    }
}

#[async_trait]
impl LiveSession for PondSession {
    fn session_id(&self) -> &str {
        "pond"
    }

    fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    fn connection(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }

    async fn configure(&self, config: SessionConfig) -> Result<()> {
        println!("setup: {}", config.to_setup()?);
        *self.config.lock() = Some(config);
        Ok(())
    }

    async fn send(&self, _parts: Vec<Part>) -> Result<Value> {
        if !self.is_connected() {
            return Err(LiveFilterError::NotConnected);
        }
        let turn = self.turns.fetch_add(1, Ordering::SeqCst);
        let spot = SPOTS[turn as usize % SPOTS.len()];

        self.listeners.dispatch(&ToolCallEvent::new(vec![ToolInvocation::new(
            format!("call-{turn}"),
            "duck_spotted",
            json!({ "spotted": spot.is_some(), "where": spot.unwrap_or_default() }),
        )]));
        Ok(json!({ "turnComplete": true }))
    }

    async fn send_tool_response(&self, response: ToolResponse) -> Result<()> {
        println!("ack: {}", response.to_client_message()?);
        Ok(())
    }

    fn on_tool_call(&self) -> ToolCallSubscription {
        self.listeners.register()
    }

    fn off_tool_call(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    telemetry::init_logging("simulated-pond");

    let config = LiveFilterConfig::from_env()?.with_poll_interval(Duration::from_millis(500));
    let mut filter = LiveFilter::new(config)?;
    let session = PondSession::new();

    let mut detections = filter.subscribe();
    let render = tokio::spawn(async move {
        while detections.changed().await.is_ok() {
            println!("{}", *detections.borrow_and_update());
        }
    });

    filter.attach(session.clone()).await?;
    session.set_connected(true);
    tokio::time::sleep(Duration::from_millis(2600)).await;

    session.set_connected(false);
    println!("-- disconnected --");
    tokio::time::sleep(Duration::from_millis(1500)).await;

    session.set_connected(true);
    tokio::time::sleep(Duration::from_millis(1100)).await;

    filter.detach().await;
    drop(filter);
    render.await?;
    Ok(())
}
