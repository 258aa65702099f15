//! Workspace Module
//!
//! Virtual desktops and desktop switching. Each desktop owns its client ring
//! and tiling parameters. The active desktop lives outside the slot table as
//! an owned value and is swapped with its slot on every switch, so a ring is
//! never reachable from two places at once.

use anyhow::Result;
use std::io::Write;
use std::mem;
use tracing::{debug, info, warn};

use crate::wm::WindowManager;
use crate::wm::adapter::Adapter;
use crate::wm::client::{Client, WindowId};
use crate::wm::layout::{LayoutParams, Mode, Screen};
use crate::wm::ring::{ClientId, ClientRing};
use crate::wm::status::DesktopStatus;

/// One virtual desktop
#[derive(Debug, Clone)]
pub struct Desktop {
    pub mode: Mode,
    pub master_size: i32,
    pub growth: i32,
    pub show_panel: bool,
    pub ring: ClientRing,
    pub current: Option<ClientId>,
}

impl Default for Desktop {
    fn default() -> Self {
        Self::new(Mode::Tile, 0, true)
    }
}

impl Desktop {
    pub fn new(mode: Mode, master_size: i32, show_panel: bool) -> Self {
        Self {
            mode,
            master_size,
            growth: 0,
            show_panel,
            ring: ClientRing::new(),
            current: None,
        }
    }

    /// Add a client for `window` and make it current.
    pub fn attach(&mut self, window: WindowId, at_tail: bool) -> ClientId {
        let id = self.ring.insert(window, at_tail);
        self.current = Some(id);
        id
    }

    /// Remove a client. Current moves to the removed client's predecessor,
    /// or to the new master when the master was removed.
    pub fn detach(&mut self, id: ClientId) -> Option<Client> {
        let removed = self.ring.remove(id)?;
        self.current = removed.fallback;
        Some(removed.client)
    }

    pub fn current_window(&self) -> Option<WindowId> {
        self.current
            .and_then(|id| self.ring.get(id))
            .map(|c| c.window)
    }

    pub fn has_urgent(&self) -> bool {
        self.ring.iter().any(|c| c.urgent)
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Layout parameters of this desktop on `screen`
    pub fn layout_params(&self, screen: &Screen) -> LayoutParams {
        LayoutParams {
            mode: self.mode,
            master_size: self.master_size,
            growth: self.growth,
            area: screen.work_area(self.show_panel),
            border: screen.border,
        }
    }
}

/// All desktops: the stored slots plus the active one
#[derive(Debug)]
pub struct Desktops {
    /// The slot at `active_index` is an empty placeholder
    slots: Vec<Desktop>,
    active: Desktop,
    active_index: usize,
    previous_index: usize,
}

impl Desktops {
    /// `count` identical desktops, `initial` active.
    pub fn new(count: usize, initial: usize, template: Desktop) -> Self {
        let mut slots = vec![template; count.max(1)];
        let initial = initial.min(slots.len() - 1);
        let active = mem::take(&mut slots[initial]);
        Self {
            slots,
            active,
            active_index: initial,
            previous_index: initial,
        }
    }

    pub fn count(&self) -> usize {
        self.slots.len()
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn previous_index(&self) -> usize {
        self.previous_index
    }

    pub fn active(&self) -> &Desktop {
        &self.active
    }

    pub fn active_mut(&mut self) -> &mut Desktop {
        &mut self.active
    }

    pub fn get(&self, index: usize) -> Option<&Desktop> {
        if index == self.active_index {
            Some(&self.active)
        } else {
            self.slots.get(index)
        }
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Desktop> {
        if index == self.active_index {
            Some(&mut self.active)
        } else {
            self.slots.get_mut(index)
        }
    }

    /// Store the active desktop in its slot and take `target` out of its
    /// slot. The caller has already checked `target`.
    fn activate(&mut self, target: usize) {
        let outgoing = mem::take(&mut self.active);
        self.slots[self.active_index] = outgoing;
        self.active = mem::take(&mut self.slots[target]);
        self.previous_index = self.active_index;
        self.active_index = target;
    }

    /// Desktop index and ring position of the client managing `window`
    pub fn find_window(&self, window: WindowId) -> Option<(usize, ClientId)> {
        (0..self.count()).find_map(|index| {
            self.get(index)
                .and_then(|d| d.ring.find(window))
                .map(|id| (index, id))
        })
    }

    pub fn statuses(&self) -> Vec<DesktopStatus> {
        (0..self.count())
            .filter_map(|index| {
                self.get(index).map(|d| DesktopStatus {
                    index,
                    clients: d.len(),
                    mode: d.mode,
                    active: index == self.active_index,
                    urgent: d.has_urgent(),
                })
            })
            .collect()
    }
}

impl<A: Adapter, S: Write> WindowManager<A, S> {
    /// Make `target` the active desktop.
    pub fn switch_to(&mut self, target: usize) -> Result<()> {
        if target >= self.desktops.count() {
            warn!("Invalid desktop index: {} (max: {})", target, self.desktops.count() - 1);
            return Ok(());
        }
        if target == self.desktops.active_index() {
            debug!("Already on desktop {}", target);
            return Ok(());
        }

        info!("Switching from desktop {} to {}", self.desktops.active_index(), target);

        for window in self.desktops.active().ring.windows() {
            self.adapter.unmap(window)?;
        }
        self.desktops.activate(target);

        self.tile()?;
        self.map_active()?;
        self.refresh_visuals()?;
        self.emit_status()
    }

    /// Send the current client to desktop `target`, switching along when
    /// `follow` is set.
    pub fn move_client_to(&mut self, target: usize, follow: bool) -> Result<()> {
        if target >= self.desktops.count() || target == self.desktops.active_index() {
            return Ok(());
        }
        let Some(current) = self.desktops.active().current else {
            return Ok(());
        };
        let Some(client) = self.desktops.active_mut().detach(current) else {
            return Ok(());
        };

        debug!("Moving window {} to desktop {}", client.window, target);
        self.adapter.unmap(client.window)?;
        if let Some(desktop) = self.desktops.get_mut(target) {
            let id = desktop.attach(client.window, true);
            if let Some(moved) = desktop.ring.get_mut(id) {
                moved.urgent = client.urgent;
            }
        }

        self.tile()?;
        self.map_monocle_current()?;
        self.refresh_visuals()?;
        if follow {
            return self.switch_to(target);
        }
        self.emit_status()
    }

    /// Switch back to the previously active desktop.
    pub fn last_desktop(&mut self) -> Result<()> {
        self.switch_to(self.desktops.previous_index())
    }

    /// Switch to the desktop `delta` steps away, wrapping around.
    pub fn rotate_desktop(&mut self, delta: i32) -> Result<()> {
        let count = self.desktops.count() as i32;
        let target = (self.desktops.active_index() as i32 + delta).rem_euclid(count);
        self.switch_to(target as usize)
    }

    /// Like [`rotate_desktop`](Self::rotate_desktop), skipping empty desktops.
    pub fn rotate_filled(&mut self, delta: i32) -> Result<()> {
        if delta == 0 {
            return Ok(());
        }
        let count = self.desktops.count() as i32;
        let start = self.desktops.active_index() as i32;
        let target = (1..count)
            .map(|step| (start + step * delta.signum()).rem_euclid(count) as usize)
            .find(|&index| self.desktops.get(index).is_some_and(|d| !d.is_empty()));

        match target {
            Some(target) => self.switch_to(target),
            None => Ok(()),
        }
    }

    /// Map the active desktop's windows: in monocle only the current one.
    pub(crate) fn map_active(&mut self) -> Result<()> {
        let desktop = self.desktops.active();
        let windows = if desktop.mode == Mode::Monocle {
            desktop.current_window().into_iter().collect()
        } else {
            desktop.ring.windows()
        };
        for window in windows {
            self.adapter.map(window)?;
        }
        Ok(())
    }

    /// In monocle the current window may have changed underneath us.
    pub(crate) fn map_monocle_current(&mut self) -> Result<()> {
        let desktop = self.desktops.active();
        if desktop.mode == Mode::Monocle {
            if let Some(window) = desktop.current_window() {
                self.adapter.map(window)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detach_moves_current_to_predecessor() {
        let mut desktop = Desktop::new(Mode::Tile, 500, true);
        desktop.attach(1, true);
        desktop.attach(2, true);
        let c = desktop.attach(3, true);
        assert_eq!(desktop.current_window(), Some(3));

        desktop.detach(c);
        assert_eq!(desktop.current_window(), Some(2));
    }

    #[test]
    fn test_detach_master_moves_current_to_new_master() {
        let mut desktop = Desktop::new(Mode::Tile, 500, true);
        let a = desktop.attach(1, true);
        desktop.attach(2, true);
        desktop.attach(3, true);

        desktop.detach(a);
        assert_eq!(desktop.current_window(), Some(2));
        assert_eq!(desktop.ring.windows(), vec![2, 3]);
    }

    #[test]
    fn test_activate_swaps_slots() {
        let mut desktops = Desktops::new(3, 0, Desktop::new(Mode::Tile, 500, true));
        desktops.active_mut().attach(10, true);
        desktops.active_mut().mode = Mode::Grid;

        desktops.activate(2);
        assert_eq!(desktops.active_index(), 2);
        assert_eq!(desktops.previous_index(), 0);
        assert!(desktops.active().is_empty());
        assert_eq!(desktops.get(0).unwrap().ring.windows(), vec![10]);
        assert_eq!(desktops.get(0).unwrap().mode, Mode::Grid);
        assert_eq!(desktops.find_window(10).map(|(i, _)| i), Some(0));

        desktops.activate(0);
        assert_eq!(desktops.active().ring.windows(), vec![10]);
        assert_eq!(desktops.active().mode, Mode::Grid);
    }

    #[test]
    fn test_statuses() {
        let mut desktops = Desktops::new(2, 1, Desktop::new(Mode::Tile, 500, true));
        let id = desktops.get_mut(0).unwrap().attach(5, true);
        desktops.get_mut(0).unwrap().ring.get_mut(id).unwrap().urgent = true;

        let statuses = desktops.statuses();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].clients, 1);
        assert!(statuses[0].urgent);
        assert!(!statuses[0].active);
        assert!(statuses[1].active);
    }
}
