//! # adk-live-filter
//!
//! Polled visual detection on top of a live multimodal session.
//!
//! The filter declares a single `duck_spotted(spotted, where)` function to the
//! model, asks "Do you see a duck?" on a fixed period while the session is
//! connected, and records the latest function call as [`DetectionState`].
//!
//! ```text
//!   PollingDriver ──send(query)──▶ LiveSession ──toolcall──▶ ToolCallHandler
//!                                      ▲                          │
//!                                      └──── toolResponse ◀───────┤
//!                                                                 ▼
//!   SessionConfigurator ──configure──▶ LiveSession          DetectionCell
//! ```
//!
//! Every tool call event is acknowledged in full, one response per invocation,
//! even when none of them is `duck_spotted`.
//!
//! The transport is not part of this crate: implement [`LiveSession`] over
//! whatever connection you have (for example an `adk-realtime` Gemini session).
//!
//! ## Example
//!
//! ```rust,ignore
//! use adk_live_filter::{LiveFilter, LiveFilterConfig, telemetry};
//!
//! telemetry::init_logging("duck-watch");
//!
//! let mut filter = LiveFilter::new(LiveFilterConfig::default())?;
//! filter.attach(session.clone()).await?;
//!
//! let mut detections = filter.subscribe();
//! while detections.changed().await.is_ok() {
//!     println!("{}", *detections.borrow_and_update());
//! }
//! ```

pub mod config;
pub mod configurator;
pub mod declaration;
pub mod error;
pub mod events;
pub mod filter;
pub mod handler;
pub mod polling;
pub mod session;
pub mod state;
pub mod telemetry;

// Re-exports
pub use config::{LiveFilterConfig, OverlapPolicy, ResponseModality, SessionConfig, SessionConfigBuilder};
pub use configurator::SessionConfigurator;
pub use declaration::{
    CapabilityDeclaration, CapabilityDeclarationBuilder, DUCK_SPOTTED, ObjectSchema,
    PrimitiveSchema, SchemaKind, duck_spotted_declaration,
};
pub use error::{ArgumentError, LiveFilterError, Result};
pub use events::{FunctionResponse, Part, ToolCallEvent, ToolInvocation, ToolResponse};
pub use filter::LiveFilter;
pub use handler::{ToolCallHandler, ToolCallOutcome, ToolCallRegistration};
pub use polling::{PollingDriver, PollingHandle};
pub use session::{
    ListenerId, LiveSession, SharedSession, ToolCallListeners, ToolCallSubscription, same_session,
};
pub use state::{DetectionCell, DetectionState};
