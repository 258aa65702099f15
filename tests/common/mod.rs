//! Common testing utilities for ringwm integration tests
#![allow(dead_code)]

use anyhow::Result;
use ringwm::config::Config;
use ringwm::wm::adapter::{Adapter, WindowChanges};
use ringwm::wm::client::WindowId;
use ringwm::wm::keyboard::Action;
use ringwm::wm::layout::Geometry;
use ringwm::wm::{Palette, WindowManager, WmEvent};

pub const SCREEN_WIDTH: u16 = 1000;
pub const SCREEN_HEIGHT: u16 = 800;
pub const FOCUS_PIXEL: u32 = 0xff950e;
pub const UNFOCUS_PIXEL: u32 = 0x444444;

/// One adapter primitive as the manager invoked it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    MoveResize(WindowId, Geometry),
    Configure(WindowId, WindowChanges),
    Map(WindowId),
    Unmap(WindowId),
    Raise(WindowId),
    BorderColor(WindowId, u32),
    BorderWidth(WindowId, u32),
    Focus(WindowId),
    Close(WindowId),
    GrabButtons(WindowId),
    UngrabButtons(WindowId),
    Watch(WindowId, bool),
}

/// Adapter that records every call instead of talking to a server
#[derive(Debug, Default)]
pub struct FakeAdapter {
    pub calls: Vec<Call>,
}

impl Adapter for FakeAdapter {
    fn move_resize(&mut self, window: WindowId, geometry: Geometry) -> Result<()> {
        self.calls.push(Call::MoveResize(window, geometry));
        Ok(())
    }

    fn configure(&mut self, window: WindowId, changes: &WindowChanges) -> Result<()> {
        self.calls.push(Call::Configure(window, *changes));
        Ok(())
    }

    fn map(&mut self, window: WindowId) -> Result<()> {
        self.calls.push(Call::Map(window));
        Ok(())
    }

    fn unmap(&mut self, window: WindowId) -> Result<()> {
        self.calls.push(Call::Unmap(window));
        Ok(())
    }

    fn raise(&mut self, window: WindowId) -> Result<()> {
        self.calls.push(Call::Raise(window));
        Ok(())
    }

    fn set_border_color(&mut self, window: WindowId, pixel: u32) -> Result<()> {
        self.calls.push(Call::BorderColor(window, pixel));
        Ok(())
    }

    fn set_border_width(&mut self, window: WindowId, width: u32) -> Result<()> {
        self.calls.push(Call::BorderWidth(window, width));
        Ok(())
    }

    fn set_input_focus(&mut self, window: WindowId) -> Result<()> {
        self.calls.push(Call::Focus(window));
        Ok(())
    }

    fn send_close_request(&mut self, window: WindowId) -> Result<()> {
        self.calls.push(Call::Close(window));
        Ok(())
    }

    fn grab_buttons(&mut self, window: WindowId) -> Result<()> {
        self.calls.push(Call::GrabButtons(window));
        Ok(())
    }

    fn ungrab_buttons(&mut self, window: WindowId) -> Result<()> {
        self.calls.push(Call::UngrabButtons(window));
        Ok(())
    }

    fn watch_client(&mut self, window: WindowId, enter: bool) -> Result<()> {
        self.calls.push(Call::Watch(window, enter));
        Ok(())
    }
}

/// A window manager wired to a [`FakeAdapter`] and an in-memory status sink
pub struct TestWm {
    pub wm: WindowManager<FakeAdapter, Vec<u8>>,
}

impl TestWm {
    /// Default configuration: four desktops, tile mode, panel on top
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        config.validate().expect("test config should be valid");
        let palette = Palette {
            focus: FOCUS_PIXEL,
            unfocus: UNFOCUS_PIXEL,
        };
        let mut wm = WindowManager::new(
            FakeAdapter::default(),
            Vec::new(),
            config,
            SCREEN_WIDTH,
            SCREEN_HEIGHT,
            palette,
        )
        .expect("window manager should start");
        wm.start().expect("initial status line");
        Self { wm }
    }

    /// Map a plain window without a class
    pub fn create(&mut self, window: WindowId) {
        self.create_with_class(window, None);
    }

    pub fn create_with_class(&mut self, window: WindowId, class: Option<&str>) {
        self.event(WmEvent::WindowCreated {
            window,
            class: class.map(str::to_string),
            instance: None,
            transient: false,
        });
    }

    pub fn event(&mut self, event: WmEvent) {
        self.wm.handle_event(event).expect("event handler failed");
    }

    pub fn action(&mut self, action: Action) {
        self.wm.handle_action(&action).expect("action failed");
    }

    pub fn calls(&self) -> &[Call] {
        &self.wm.adapter().calls
    }

    pub fn clear_calls(&mut self) {
        self.wm.adapter_mut().calls.clear();
    }

    /// Every status line written so far
    pub fn status_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(self.wm.status_sink())
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn last_status(&self) -> String {
        self.status_lines().pop().unwrap_or_default()
    }

    /// Windows of the active desktop in ring order
    pub fn windows(&self) -> Vec<WindowId> {
        self.wm.desktops().active().ring.windows()
    }

    pub fn current(&self) -> Option<WindowId> {
        self.wm.desktops().active().current_window()
    }

    pub fn focused(&self) -> Option<WindowId> {
        self.calls().iter().rev().find_map(|call| match call {
            Call::Focus(w) => Some(*w),
            _ => None,
        })
    }

    pub fn mapped(&self, window: WindowId) -> usize {
        self.count(&Call::Map(window))
    }

    pub fn unmapped(&self, window: WindowId) -> usize {
        self.count(&Call::Unmap(window))
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    /// Last geometry pushed for `window`
    pub fn geometry(&self, window: WindowId) -> Option<Geometry> {
        self.calls().iter().rev().find_map(|call| match call {
            Call::MoveResize(w, g) if *w == window => Some(*g),
            _ => None,
        })
    }
}
