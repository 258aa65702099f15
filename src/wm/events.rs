//! Events Module
//!
//! The closed set of events the display backend delivers and the handler
//! for each. Every handler runs to completion before the next event is read.

use anyhow::Result;
use std::io::Write;
use tracing::{debug, info, warn};

use crate::wm::WindowManager;
use crate::wm::adapter::{Adapter, WindowChanges};
use crate::wm::client::WindowId;
use crate::wm::keyboard::{Keysym, Modifiers};
use crate::wm::layout::Mode;

/// Events translated from the display server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WmEvent {
    /// A window asked to be mapped, or was found mapped at startup
    WindowCreated {
        window: WindowId,
        class: Option<String>,
        instance: Option<String>,
        transient: bool,
    },
    WindowDestroyed {
        window: WindowId,
    },
    /// Unmapped by its client, not by us
    WindowUnmapped {
        window: WindowId,
    },
    ConfigureRequest {
        window: WindowId,
        changes: WindowChanges,
    },
    ButtonPress {
        window: WindowId,
        button: u8,
    },
    PointerEnter {
        window: WindowId,
    },
    /// Modifiers already have Caps Lock and Num Lock removed
    KeyPress {
        keysym: Keysym,
        modifiers: Modifiers,
    },
    UrgencyHint {
        window: WindowId,
        urgent: bool,
    },
}

impl<A: Adapter, S: Write> WindowManager<A, S> {
    /// Dispatch one event.
    pub fn handle_event(&mut self, event: WmEvent) -> Result<()> {
        match event {
            WmEvent::WindowCreated {
                window,
                class,
                instance,
                transient,
            } => self.manage(window, class.as_deref(), instance.as_deref(), transient),
            WmEvent::WindowDestroyed { window } | WmEvent::WindowUnmapped { window } => {
                self.unmanage(window)
            }
            WmEvent::ConfigureRequest { window, changes } => self.configure_request(window, changes),
            WmEvent::ButtonPress { window, button } => {
                if self.settings.click_to_focus && button == self.settings.focus_button {
                    self.focus_window(window)?;
                }
                Ok(())
            }
            WmEvent::PointerEnter { window } => {
                if self.settings.follow_mouse {
                    self.focus_window(window)?;
                }
                Ok(())
            }
            WmEvent::KeyPress { keysym, modifiers } => {
                match self.bindings.lookup(modifiers, keysym).cloned() {
                    Some(action) => self.handle_action(&action),
                    None => Ok(()),
                }
            }
            WmEvent::UrgencyHint { window, urgent } => {
                if self.set_urgent(window, urgent) {
                    self.emit_status()?;
                }
                Ok(())
            }
        }
    }

    /// Start managing `window`, placing it per the first matching rule.
    fn manage(
        &mut self,
        window: WindowId,
        class: Option<&str>,
        instance: Option<&str>,
        transient: bool,
    ) -> Result<()> {
        if self.desktops.find_window(window).is_some() {
            debug!("Window {} is already managed", window);
            return Ok(());
        }

        let active = self.desktops.active_index();
        let rule = if transient {
            None
        } else {
            self.config.rule_for(class, instance)
        };
        let target = rule.and_then(|r| r.desktop).unwrap_or(active);
        let follow = rule.is_some_and(|r| r.follow);
        if rule.is_some_and(|r| r.float) {
            warn!("Floating is not supported, tiling window {} ({:?})", window, class);
        }

        info!(
            "Managing window {} ({:?}/{:?}) on desktop {}",
            window, instance, class, target
        );

        self.adapter.watch_client(window, self.settings.follow_mouse)?;
        let at_tail = self.settings.attach_aside;
        let Some(desktop) = self.desktops.get_mut(target) else {
            return Ok(());
        };
        let hidden = match desktop.mode {
            Mode::Monocle => desktop.current_window(),
            _ => None,
        };
        desktop.attach(window, at_tail);

        if target == active {
            if !transient {
                self.tile()?;
            }
            if let Some(previous) = hidden {
                self.adapter.unmap(previous)?;
            }
            self.adapter.map(window)?;
            self.refresh_visuals()?;
        } else if follow {
            return self.switch_to(target);
        } else {
            // Windows adopted at startup are already on screen.
            self.adapter.unmap(window)?;
        }
        self.emit_status()
    }

    /// Forget `window` wherever it lives.
    fn unmanage(&mut self, window: WindowId) -> Result<()> {
        let Some((index, id)) = self.desktops.find_window(window) else {
            return Ok(());
        };
        info!("Unmanaging window {} from desktop {}", window, index);

        if let Some(desktop) = self.desktops.get_mut(index) {
            desktop.detach(id);
        }
        if index == self.desktops.active_index() {
            self.after_removal()
        } else {
            self.emit_status()
        }
    }

    /// Honour a client's geometry request within the usable screen area,
    /// then put the tiling back in force.
    fn configure_request(&mut self, window: WindowId, requested: WindowChanges) -> Result<()> {
        let screen = self.settings.screen;
        let border = screen.border;
        let area = screen.work_area(self.desktops.active().show_panel);

        let clamp = |size: i32, limit: i32| {
            if size < limit - border {
                size
            } else {
                limit + border
            }
        };
        let changes = WindowChanges {
            x: requested.x.map(|x| x.clamp(0, area.width)),
            y: requested.y.map(|y| y.max(area.y)),
            width: requested.width.map(|w| clamp(w, area.width)),
            height: requested.height.map(|h| clamp(h, area.height)),
        };

        debug!("Configure request for {}: {:?} -> {:?}", window, requested, changes);
        self.adapter.configure(window, &changes)?;
        self.tile()
    }
}
