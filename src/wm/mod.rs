//! Window Manager Module
//!
//! The tiling policy core: desktops, client rings, layout, focus and event
//! dispatch. Everything in here talks to the display through the
//! [`Adapter`] trait; the x11rb implementation lives in `display`.

pub mod adapter;
pub mod client;
pub mod display;
pub mod events;
pub mod focus;
pub mod icccm;
pub mod keyboard;
pub mod layout;
pub mod ring;
pub mod spawn;
pub mod status;
pub mod workspace;

use anyhow::{Context, Result};
use std::io::{self, Write};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::wm::adapter::Adapter;
use crate::wm::keyboard::{Action, KeyBindings};
use crate::wm::layout::{Mode, Screen, default_master_size, master_size_fits};
use crate::wm::ring::Direction;
use crate::wm::workspace::{Desktop, Desktops};

pub use events::WmEvent;

/// Border colours after allocation on the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub focus: u32,
    pub unfocus: u32,
}

/// Runtime settings derived from the configuration and the screen
#[derive(Debug, Clone)]
pub struct Settings {
    pub screen: Screen,
    pub focus_pixel: u32,
    pub unfocus_pixel: u32,
    pub master_fraction: f32,
    pub min_window_size: i32,
    pub attach_aside: bool,
    pub follow_window: bool,
    pub click_to_focus: bool,
    pub focus_button: u8,
    pub follow_mouse: bool,
}

impl Settings {
    pub fn new(config: &Config, width: u16, height: u16, palette: Palette) -> Self {
        Self {
            screen: Screen {
                width: i32::from(width),
                height: i32::from(height),
                border: i32::from(config.border.width),
                panel_height: config.panel.height,
                top_panel: config.panel.top,
            },
            focus_pixel: palette.focus,
            unfocus_pixel: palette.unfocus,
            master_fraction: config.general.master_fraction,
            min_window_size: config.general.min_window_size,
            attach_aside: config.general.attach_aside,
            follow_window: config.general.follow_window,
            click_to_focus: config.focus.click_to_focus,
            focus_button: config.focus.focus_button,
            follow_mouse: config.focus.follow_mouse,
        }
    }
}

/// The window manager state and its collaborators.
///
/// `S` receives the status line; it is standard output in production.
pub struct WindowManager<A: Adapter, S: Write = io::Stdout> {
    adapter: A,
    status_out: S,
    settings: Settings,
    config: Config,
    bindings: KeyBindings,
    desktops: Desktops,
    running: bool,
    exit_code: i32,
}

impl<A: Adapter, S: Write> WindowManager<A, S> {
    /// Create a window manager. `config` must already be validated.
    pub fn new(
        adapter: A,
        status_out: S,
        config: Config,
        width: u16,
        height: u16,
        palette: Palette,
    ) -> Result<Self> {
        let settings = Settings::new(&config, width, height, palette);
        let bindings = KeyBindings::new(config.key_bindings()?);

        let mode = config.general.default_mode;
        let show_panel = config.panel.show;
        let area = settings.screen.work_area(show_panel);
        let master_size = default_master_size(mode, &area, settings.master_fraction);
        let desktops = Desktops::new(
            config.general.desktops,
            config.general.default_desktop,
            Desktop::new(mode, master_size, show_panel),
        );

        info!(
            "Window manager ready: {} desktops, {}x{} screen, {} key bindings",
            desktops.count(),
            width,
            height,
            bindings.len()
        );

        Ok(Self {
            adapter,
            status_out,
            settings,
            config,
            bindings,
            desktops,
            running: true,
            exit_code: 0,
        })
    }

    /// Announce the initial state.
    pub fn start(&mut self) -> Result<()> {
        self.emit_status()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn desktops(&self) -> &Desktops {
        &self.desktops
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn status_sink(&self) -> &S {
        &self.status_out
    }

    /// Run a bound action.
    pub fn handle_action(&mut self, action: &Action) -> Result<()> {
        debug!("Action: {:?}", action);
        match action {
            Action::ChangeDesktop(index) => self.switch_to(*index),
            Action::ClientToDesktop(index) => {
                self.move_client_to(*index, self.settings.follow_window)
            }
            Action::LastDesktop => self.last_desktop(),
            Action::RotateDesktop(delta) => self.rotate_desktop(*delta),
            Action::RotateFilled(delta) => self.rotate_filled(*delta),
            Action::NextWindow => self.advance(Direction::Next),
            Action::PrevWindow => self.advance(Direction::Prev),
            Action::MoveDown => self.move_current(Direction::Next),
            Action::MoveUp => self.move_current(Direction::Prev),
            Action::SwapMaster => self.swap_master(),
            Action::FocusUrgent => self.focus_urgent(),
            Action::KillClient => self.kill_client(),
            Action::ResizeMaster(delta) => self.resize_master(*delta),
            Action::ResizeStack(delta) => self.resize_stack(*delta),
            Action::SwitchMode(mode) => self.switch_mode(*mode),
            Action::TogglePanel => self.toggle_panel(),
            Action::Spawn(argv) => {
                if let Err(e) = spawn::spawn(argv) {
                    error!("{:#}", e);
                }
                Ok(())
            }
            Action::Quit(code) => {
                info!("Quit requested with exit code {}", code);
                self.exit_code = *code;
                self.running = false;
                Ok(())
            }
        }
    }

    /// Arrange the active desktop and push the geometry to the display.
    pub fn tile(&mut self) -> Result<()> {
        let desktop = self.desktops.active();
        let windows = desktop.ring.windows();
        let params = desktop.layout_params(&self.settings.screen);

        match layout::arrange(&windows, &params) {
            Ok(placements) => {
                for placement in placements {
                    self.adapter.move_resize(placement.window, placement.geometry)?;
                }
            }
            Err(e) => error!("{}", e),
        }
        Ok(())
    }

    /// Write the status line for all desktops.
    pub fn emit_status(&mut self) -> Result<()> {
        let line = status::format_line(&self.desktops.statuses());
        self.status_out
            .write_all(line.as_bytes())
            .and_then(|()| self.status_out.flush())
            .context("Failed to write status line")
    }

    /// Swap the current client with its neighbour and keep focus on it.
    fn move_current(&mut self, direction: Direction) -> Result<()> {
        let desktop = self.desktops.active_mut();
        if desktop.ring.len() <= 1 {
            return Ok(());
        }
        let Some(current) = desktop.current else {
            return Ok(());
        };
        let Some(other) = desktop.ring.step(current, direction) else {
            return Ok(());
        };
        desktop.ring.swap_contents(current, other);
        desktop.current = Some(other);

        self.tile()?;
        self.refresh_visuals()
    }

    /// Exchange the current client with the master. When the master is
    /// current it trades places with the first stack client instead.
    fn swap_master(&mut self) -> Result<()> {
        let desktop = self.desktops.active_mut();
        if desktop.mode == Mode::Monocle || desktop.ring.len() <= 1 {
            return Ok(());
        }
        let (Some(current), Some(head)) = (desktop.current, desktop.ring.head()) else {
            return Ok(());
        };
        let other = if current == head {
            desktop.ring.next(head)
        } else {
            Some(current)
        };
        let Some(other) = other else {
            return Ok(());
        };
        desktop.ring.swap_contents(head, other);
        desktop.current = Some(head);

        self.tile()?;
        self.refresh_visuals()
    }

    /// Ask the current client to close and stop managing it.
    fn kill_client(&mut self) -> Result<()> {
        let desktop = self.desktops.active_mut();
        let Some(current) = desktop.current else {
            return Ok(());
        };
        let Some(client) = desktop.detach(current) else {
            return Ok(());
        };

        self.adapter.send_close_request(client.window)?;
        self.after_removal()
    }

    /// Re-arrange the active desktop after a client left it.
    pub(crate) fn after_removal(&mut self) -> Result<()> {
        self.tile()?;
        self.map_monocle_current()?;
        self.refresh_visuals()?;
        self.emit_status()
    }

    fn resize_master(&mut self, delta: i32) -> Result<()> {
        let screen = self.settings.screen;
        let min = self.settings.min_window_size;
        let desktop = self.desktops.active_mut();
        let size = desktop.master_size + delta;
        let area = screen.work_area(desktop.show_panel);
        if !master_size_fits(desktop.mode, &area, size, min) {
            debug!("Master size {} out of bounds, ignoring", size);
            return Ok(());
        }
        desktop.master_size = size;
        self.tile()
    }

    fn resize_stack(&mut self, delta: i32) -> Result<()> {
        self.desktops.active_mut().growth += delta;
        self.tile()
    }

    fn switch_mode(&mut self, mode: Mode) -> Result<()> {
        if mode == Mode::Float {
            warn!("Layout mode {} is not supported", mode);
            return Ok(());
        }
        let previous = self.desktops.active().mode;
        if previous == mode {
            return Ok(());
        }
        if previous == Mode::Monocle {
            for window in self.desktops.active().ring.windows() {
                self.adapter.map(window)?;
            }
        }

        let screen = self.settings.screen;
        let fraction = self.settings.master_fraction;
        let desktop = self.desktops.active_mut();
        desktop.mode = mode;
        desktop.master_size = default_master_size(mode, &screen.work_area(desktop.show_panel), fraction);

        self.tile()?;
        self.refresh_visuals()?;
        self.emit_status()
    }

    fn toggle_panel(&mut self) -> Result<()> {
        let desktop = self.desktops.active_mut();
        desktop.show_panel = !desktop.show_panel;
        self.tile()
    }
}
