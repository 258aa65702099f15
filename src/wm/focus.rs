//! Focus Module
//!
//! Which client is current on the active desktop, urgency hints, and the
//! border/input-focus visuals that follow from it.

use anyhow::Result;
use std::io::Write;
use tracing::debug;

use crate::wm::WindowManager;
use crate::wm::adapter::Adapter;
use crate::wm::client::WindowId;
use crate::wm::layout::Mode;
use crate::wm::ring::{ClientId, Direction};

impl<A: Adapter, S: Write> WindowManager<A, S> {
    /// Move focus to the next or previous client, wrapping around.
    pub fn advance(&mut self, direction: Direction) -> Result<()> {
        let desktop = self.desktops.active();
        if desktop.ring.len() <= 1 {
            return Ok(());
        }
        let Some(current) = desktop.current else {
            return Ok(());
        };
        let Some(target) = desktop.ring.step(current, direction) else {
            return Ok(());
        };
        self.set_current(target)
    }

    /// Focus an urgent client on the active desktop, if there is one.
    ///
    /// With several urgent clients the one closest to the tail wins.
    pub fn focus_urgent(&mut self) -> Result<()> {
        let desktop = self.desktops.active();
        let urgent = desktop
            .ring
            .ids()
            .filter(|&id| desktop.ring.get(id).is_some_and(|c| c.urgent))
            .last();

        match urgent {
            Some(id) => self.set_current(id),
            None => self.refresh_visuals(),
        }
    }

    /// Record the urgency hint of `window`, on whatever desktop it lives.
    ///
    /// Returns `false` if the window is not managed. Focus changes never
    /// clear the flag; only a later hint update does.
    pub fn set_urgent(&mut self, window: WindowId, urgent: bool) -> bool {
        let Some((index, id)) = self.desktops.find_window(window) else {
            return false;
        };
        match self
            .desktops
            .get_mut(index)
            .and_then(|d| d.ring.get_mut(id))
        {
            Some(client) => {
                debug!("Window {} urgency set to {}", window, urgent);
                client.urgent = urgent;
                true
            }
            None => false,
        }
    }

    /// Focus `window` if it is a non-current client of the active desktop.
    ///
    /// Returns whether focus changed.
    pub fn focus_window(&mut self, window: WindowId) -> Result<bool> {
        let desktop = self.desktops.active();
        let Some(id) = desktop.ring.find(window) else {
            return Ok(false);
        };
        if desktop.current == Some(id) {
            return Ok(false);
        }
        self.set_current(id)?;
        Ok(true)
    }

    /// Repaint borders of the active desktop and give input focus to the
    /// current client.
    pub fn refresh_visuals(&mut self) -> Result<()> {
        let desktop = self.desktops.active();
        let Some(current) = desktop.current_window() else {
            return Ok(());
        };

        let border = if desktop.ring.len() <= 1 || desktop.mode == Mode::Monocle {
            0
        } else {
            self.settings.screen.border as u32
        };
        let windows = desktop.ring.windows();
        let click_to_focus = self.settings.click_to_focus;

        for window in windows {
            self.adapter.set_border_width(window, border)?;
            self.adapter.set_border_color(window, self.settings.unfocus_pixel)?;
            if click_to_focus {
                self.adapter.grab_buttons(window)?;
            }
        }

        self.adapter.set_border_color(current, self.settings.focus_pixel)?;
        self.adapter.set_input_focus(current)?;
        self.adapter.raise(current)?;
        if click_to_focus {
            self.adapter.ungrab_buttons(current)?;
        }
        Ok(())
    }

    /// Make `target` current. In monocle the old window is hidden and the new
    /// one shown.
    fn set_current(&mut self, target: ClientId) -> Result<()> {
        let desktop = self.desktops.active_mut();
        let previous = desktop.current_window();
        desktop.current = Some(target);
        let next = desktop.current_window();
        let monocle = desktop.mode == Mode::Monocle;

        if monocle && previous != next {
            if let Some(window) = previous {
                self.adapter.unmap(window)?;
            }
            if let Some(window) = next {
                self.adapter.map(window)?;
            }
        }
        self.refresh_visuals()
    }
}
