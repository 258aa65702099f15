//! Adapter Module
//!
//! The window-control primitives the manager core drives. The X11 backend in
//! `display` implements this over an x11rb connection; tests use a recording
//! fake.

use anyhow::Result;

use crate::wm::client::WindowId;
use crate::wm::layout::Geometry;

/// Fields of a client's configure request; `None` means not requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowChanges {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

pub trait Adapter {
    /// Move and resize a window in one request
    fn move_resize(&mut self, window: WindowId, geometry: Geometry) -> Result<()>;

    /// Apply only the fields present in `changes`
    fn configure(&mut self, window: WindowId, changes: &WindowChanges) -> Result<()>;

    fn map(&mut self, window: WindowId) -> Result<()>;

    fn unmap(&mut self, window: WindowId) -> Result<()>;

    fn raise(&mut self, window: WindowId) -> Result<()>;

    /// Border colour as an allocated pixel value
    fn set_border_color(&mut self, window: WindowId, pixel: u32) -> Result<()>;

    fn set_border_width(&mut self, window: WindowId, width: u32) -> Result<()>;

    fn set_input_focus(&mut self, window: WindowId) -> Result<()>;

    /// Politely ask the client to close (WM_DELETE_WINDOW)
    fn send_close_request(&mut self, window: WindowId) -> Result<()>;

    /// Intercept pointer buttons on an unfocused window (click-to-focus)
    fn grab_buttons(&mut self, window: WindowId) -> Result<()>;

    fn ungrab_buttons(&mut self, window: WindowId) -> Result<()>;

    /// Subscribe to the client events the manager cares about: property
    /// changes always, pointer entry when `enter` is set.
    fn watch_client(&mut self, window: WindowId, enter: bool) -> Result<()>;
}
