//! ICCCM client properties
//!
//! The few client-side conventions the manager honours: WM_CLASS for rules,
//! WM_TRANSIENT_FOR, the urgency bit of WM_HINTS and WM_DELETE_WINDOW.

use anyhow::Result;
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;

/// XUrgencyHint in the WM_HINTS flags word
const URGENCY_HINT: u32 = 1 << 8;

/// Interned atoms
#[derive(Debug, Clone, Copy)]
pub struct Atoms {
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
}

impl Atoms {
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        let intern = |name: &str| -> Result<Atom> {
            Ok(conn.intern_atom(false, name.as_bytes())?.reply()?.atom)
        };

        Ok(Self {
            wm_protocols: intern("WM_PROTOCOLS")?,
            wm_delete_window: intern("WM_DELETE_WINDOW")?,
        })
    }

    /// Check if window supports WM_DELETE_WINDOW protocol
    pub fn supports_delete_protocol<C: Connection>(&self, conn: &C, window: Window) -> Result<bool> {
        if let Ok(reply) = conn
            .get_property(false, window, self.wm_protocols, AtomEnum::ATOM, 0, 1024)?
            .reply()
        {
            if let Some(mut value32) = reply.value32() {
                return Ok(value32.any(|atom| atom == self.wm_delete_window));
            }
        }
        Ok(false)
    }

    /// Ask a client to close itself
    pub fn send_delete_window<C: Connection>(&self, conn: &C, window: Window) -> Result<()> {
        let event = ClientMessageEvent::new(
            32,
            window,
            self.wm_protocols,
            [self.wm_delete_window, 0, 0, 0, 0],
        );
        conn.send_event(false, window, EventMask::NO_EVENT, event)?;
        Ok(())
    }
}

/// WM_CLASS of `window` as (instance, class)
pub fn window_class<C: Connection>(
    conn: &C,
    window: Window,
) -> Result<(Option<String>, Option<String>)> {
    if let Ok(reply) = conn
        .get_property(false, window, AtomEnum::WM_CLASS, AtomEnum::STRING, 0, 256)?
        .reply()
    {
        return Ok(parse_wm_class(&reply.value));
    }
    Ok((None, None))
}

/// Whether `window` declares itself transient for another window
pub fn is_transient<C: Connection>(conn: &C, window: Window) -> Result<bool> {
    if let Ok(reply) = conn
        .get_property(false, window, AtomEnum::WM_TRANSIENT_FOR, AtomEnum::WINDOW, 0, 1)?
        .reply()
    {
        if let Some(mut value32) = reply.value32() {
            return Ok(value32.next().is_some_and(|w| w != x11rb::NONE));
        }
    }
    Ok(false)
}

/// Urgency bit of the WM_HINTS property
pub fn is_urgent<C: Connection>(conn: &C, window: Window) -> Result<bool> {
    if let Ok(reply) = conn
        .get_property(false, window, AtomEnum::WM_HINTS, AtomEnum::WM_HINTS, 0, 9)?
        .reply()
    {
        if let Some(mut value32) = reply.value32() {
            let urgent = value32.next().is_some_and(|flags| flags & URGENCY_HINT != 0);
            debug!("WM_HINTS of {}: urgent={}", window, urgent);
            return Ok(urgent);
        }
    }
    Ok(false)
}

/// Split the two NUL-terminated strings of a WM_CLASS value.
fn parse_wm_class(value: &[u8]) -> (Option<String>, Option<String>) {
    let mut parts = value
        .split(|&b| b == 0)
        .map(|s| String::from_utf8_lossy(s).into_owned());
    let instance = parts.next().filter(|s| !s.is_empty());
    let class = parts.next().filter(|s| !s.is_empty());
    (instance, class)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wm_class() {
        assert_eq!(
            parse_wm_class(b"gimp\0Gimp\0"),
            (Some("gimp".to_string()), Some("Gimp".to_string()))
        );
        assert_eq!(parse_wm_class(b"xterm"), (Some("xterm".to_string()), None));
        assert_eq!(parse_wm_class(b""), (None, None));
    }
}
