//! Observable detection state.

use std::fmt;
use tokio::sync::watch;

/// Latest answer reported by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionState {
    /// Whether a duck is visible.
    pub spotted: bool,
    /// Where in the image the duck is.
    pub location: String,
}

impl DetectionState {
    /// Create a new state.
    pub fn new(spotted: bool, location: impl Into<String>) -> Self {
        Self { spotted, location: location.into() }
    }
}

impl fmt::Display for DetectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SPOTTED: {} WHERE: {}", self.spotted, self.location)
    }
}

/// Reactive cell holding the current [`DetectionState`].
///
/// Written by the tool call handler, read by renderers. Subscribers are only
/// woken when the value actually changes.
#[derive(Debug)]
pub struct DetectionCell {
    tx: watch::Sender<DetectionState>,
}

impl Default for DetectionCell {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionCell {
    /// Create a cell holding the default state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(DetectionState::default());
        Self { tx }
    }

    /// Snapshot of the current state.
    pub fn get(&self) -> DetectionState {
        self.tx.borrow().clone()
    }

    /// Replace the state. Returns `true` if the value changed.
    pub fn set(&self, state: DetectionState) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        })
    }

    /// Watch for changes.
    pub fn subscribe(&self) -> watch::Receiver<DetectionState> {
        self.tx.subscribe()
    }
}
