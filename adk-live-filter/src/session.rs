//! The live session collaborator.
//!
//! The transport itself lives elsewhere (see `adk-realtime`); this module only
//! names the surface the filter consumes from it.

use crate::config::SessionConfig;
use crate::error::Result;
use crate::events::{Part, ToolCallEvent, ToolResponse};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, watch};

/// Identifies one `toolcall` listener registered on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A registered `toolcall` listener: its ID and the events routed to it.
#[derive(Debug)]
pub struct ToolCallSubscription {
    /// Pass to [`LiveSession::off_tool_call`] to unregister.
    pub id: ListenerId,
    /// Tool call events, delivered once each.
    pub events: mpsc::UnboundedReceiver<ToolCallEvent>,
}

/// A long-lived connection to a live model.
///
/// # Example
///
/// ```rust,ignore
/// use adk_live_filter::{LiveSession, Part};
///
/// async fn ask(session: &dyn LiveSession) -> Result<()> {
///     let mut sub = session.on_tool_call();
///     session.send(vec![Part::text("Do you see a duck?")]).await?;
///     if let Some(event) = sub.events.recv().await {
///         println!("{} invocations", event.len());
///     }
///     session.off_tool_call(sub.id);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait LiveSession: Send + Sync {
    /// Get the session ID.
    fn session_id(&self) -> &str;

    /// Check if the session is currently connected.
    fn is_connected(&self) -> bool;

    /// Watch the connection state.
    fn connection(&self) -> watch::Receiver<bool>;

    /// Replace the session configuration.
    async fn configure(&self, config: SessionConfig) -> Result<()>;

    /// Send a user turn and return the raw response.
    ///
    /// The session must be connected.
    async fn send(&self, parts: Vec<Part>) -> Result<Value>;

    /// Send a tool/function response.
    async fn send_tool_response(&self, response: ToolResponse) -> Result<()>;

    /// Register a `toolcall` listener.
    fn on_tool_call(&self) -> ToolCallSubscription;

    /// Unregister a `toolcall` listener. Unknown IDs are ignored.
    fn off_tool_call(&self, id: ListenerId);
}

/// A shared session type for dynamic dispatch.
pub type SharedSession = Arc<dyn LiveSession>;

/// Whether two handles refer to the same session object.
pub fn same_session(a: &SharedSession, b: &SharedSession) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Listener bookkeeping for [`LiveSession`] implementations.
#[derive(Debug, Default)]
pub struct ToolCallListeners {
    listeners: Mutex<Vec<(ListenerId, mpsc::UnboundedSender<ToolCallEvent>)>>,
}

impl ToolCallListeners {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener.
    pub fn register(&self) -> ToolCallSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ListenerId::next();
        self.listeners.lock().push((id, tx));
        ToolCallSubscription { id, events: rx }
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Deliver an event to every live listener, returning how many received it.
    pub fn dispatch(&self, event: &ToolCallEvent) -> usize {
        let mut listeners = self.listeners.lock();
        listeners.retain(|(_, tx)| !tx.is_closed());
        listeners.iter().filter(|(_, tx)| tx.send(event.clone()).is_ok()).count()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ToolInvocation;
    use serde_json::json;

    #[tokio::test]
    async fn test_dispatch_reaches_each_listener_once() {
        let listeners = ToolCallListeners::new();
        let mut a = listeners.register();
        let mut b = listeners.register();
        assert_ne!(a.id, b.id);

        let event = ToolCallEvent::new(vec![ToolInvocation::new("1", "duck_spotted", json!({}))]);
        assert_eq!(listeners.dispatch(&event), 2);

        assert_eq!(a.events.recv().await.unwrap(), event);
        assert_eq!(b.events.recv().await.unwrap(), event);
        assert!(a.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_removed_listener_gets_nothing() {
        let listeners = ToolCallListeners::new();
        let mut sub = listeners.register();
        assert!(listeners.remove(sub.id));
        assert!(!listeners.remove(sub.id));
        assert!(listeners.is_empty());

        assert_eq!(listeners.dispatch(&ToolCallEvent::default()), 0);
        assert!(sub.events.recv().await.is_none());
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let listeners = ToolCallListeners::new();
        drop(listeners.register());
        assert_eq!(listeners.dispatch(&ToolCallEvent::default()), 0);
        assert!(listeners.is_empty());
    }
}
