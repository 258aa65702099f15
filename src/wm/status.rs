//! Status line
//!
//! One line per change on standard output, for panels and scripts to read:
//! `index:clients:mode:active:urgent` per desktop, space separated.

use std::fmt::Write as _;

use crate::wm::layout::Mode;

/// Snapshot of one desktop as shown in the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesktopStatus {
    pub index: usize,
    pub clients: usize,
    pub mode: Mode,
    pub active: bool,
    pub urgent: bool,
}

/// Format the full status line, trailing newline included.
pub fn format_line(desktops: &[DesktopStatus]) -> String {
    let mut line = String::new();
    for (i, d) in desktops.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        let _ = write!(
            line,
            "{}:{}:{}:{}:{}",
            d.index,
            d.clients,
            d.mode.code(),
            u8::from(d.active),
            u8::from(d.urgent)
        );
    }
    line.push('\n');
    line
}
