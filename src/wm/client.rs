//! Client Module
//!
//! Per-window state the manager keeps for every managed window.

/// X11 window id as handed to us by the server.
pub type WindowId = u32;

/// A window under management and the state tracked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    /// X11 window ID
    pub window: WindowId,

    /// Urgency hint as last reported by the client
    pub urgent: bool,
}

impl Client {
    pub fn new(window: WindowId) -> Self {
        Self {
            window,
            urgent: false,
        }
    }
}
