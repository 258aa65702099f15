//! Display Module
//!
//! The X11 backend: owns the x11rb connection, registers as the window
//! manager, implements [`Adapter`] and turns raw protocol events into
//! [`WmEvent`]s.

use anyhow::{Context, Result, anyhow};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};
use x11rb::connection::Connection;
use x11rb::protocol::ErrorKind;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::x11_utils::X11Error;

use crate::config::{BorderConfig, Rgb};
use crate::wm::Palette;
use crate::wm::adapter::{Adapter, WindowChanges};
use crate::wm::client::WindowId;
use crate::wm::events::WmEvent;
use crate::wm::icccm::{self, Atoms};
use crate::wm::keyboard::{KeyBindings, Keysym, Modifiers, XK_NUM_LOCK};
use crate::wm::layout::Geometry;

/// Keycode to keysym table as reported by the server
#[derive(Debug, Default)]
struct KeyMap {
    min_keycode: u8,
    per_keycode: usize,
    keysyms: Vec<Keysym>,
}

impl KeyMap {
    fn fetch(conn: &RustConnection) -> Result<Self> {
        let setup = conn.setup();
        let min_keycode = setup.min_keycode;
        let count = setup.max_keycode - min_keycode + 1;
        let reply = conn.get_keyboard_mapping(min_keycode, count)?.reply()?;
        Ok(Self {
            min_keycode,
            per_keycode: usize::from(reply.keysyms_per_keycode).max(1),
            keysyms: reply.keysyms,
        })
    }

    /// Unshifted keysym of `keycode`
    fn keysym(&self, keycode: u8) -> Option<Keysym> {
        let index = usize::from(keycode.checked_sub(self.min_keycode)?) * self.per_keycode;
        self.keysyms.get(index).copied().filter(|&sym| sym != 0)
    }

    /// First keycode producing `keysym` in any column
    fn keycode(&self, keysym: Keysym) -> Option<u8> {
        self.keysyms
            .chunks(self.per_keycode)
            .position(|syms| syms.contains(&keysym))
            .and_then(|i| u8::try_from(i).ok())
            .and_then(|i| i.checked_add(self.min_keycode))
    }
}

/// X errors that only mean a window vanished under a pending request.
/// Everything else is fatal.
pub fn is_benign(kind: ErrorKind, major_opcode: u8) -> bool {
    match kind {
        ErrorKind::Window => true,
        ErrorKind::Match => {
            matches!(major_opcode, SET_INPUT_FOCUS_REQUEST | CONFIGURE_WINDOW_REQUEST)
        }
        ErrorKind::Drawable => matches!(
            major_opcode,
            POLY_TEXT8_REQUEST | POLY_FILL_RECTANGLE_REQUEST | POLY_SEGMENT_REQUEST | COPY_AREA_REQUEST
        ),
        ErrorKind::Access => major_opcode == GRAB_KEY_REQUEST,
        _ => false,
    }
}

/// Tells our own unmaps apart from the ones clients make.
///
/// Every unmap we send for a mapped window produces one UnmapNotify that must
/// not be read as the client withdrawing itself.
#[derive(Debug, Default)]
struct UnmapTracker {
    mapped: HashSet<Window>,
    /// Unmaps we issued whose UnmapNotify has not arrived yet
    pending: HashMap<Window, usize>,
}

impl UnmapTracker {
    fn mapped(&mut self, window: Window) {
        self.mapped.insert(window);
    }

    /// Record an unmap we are about to send. Returns `false` when the window
    /// is not mapped, in which case no request should go out.
    fn unmapped_by_us(&mut self, window: Window) -> bool {
        if !self.mapped.remove(&window) {
            return false;
        }
        *self.pending.entry(window).or_default() += 1;
        true
    }

    /// Account for an UnmapNotify. Returns `true` if the client caused it.
    fn notify(&mut self, window: Window) -> bool {
        match self.pending.get_mut(&window) {
            Some(count) => {
                *count -= 1;
                if *count == 0 {
                    self.pending.remove(&window);
                }
                false
            }
            None => {
                self.mapped.remove(&window);
                true
            }
        }
    }

    fn destroyed(&mut self, window: Window) {
        self.mapped.remove(&window);
        self.pending.remove(&window);
    }
}

/// How a window is asked to go away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Close {
    Delete,
    Kill,
}

/// Windows without WM_DELETE_WINDOW are killed only when `kill` is allowed.
fn close_method(supports_delete: bool, kill: bool) -> Option<Close> {
    if supports_delete {
        Some(Close::Delete)
    } else if kill {
        Some(Close::Kill)
    } else {
        None
    }
}

/// x11rb implementation of the window-control primitives
pub struct X11Backend {
    conn: Arc<RustConnection>,
    root: Window,
    colormap: Colormap,
    width: u16,
    height: u16,
    atoms: Atoms,
    keymap: KeyMap,
    numlock: Modifiers,
    /// Bound keys, kept for regrabbing after a keyboard remap
    keys: Vec<(Modifiers, Keysym)>,
    focus_button: u8,
    unmaps: UnmapTracker,
}

impl X11Backend {
    /// Connect to the display named by `$DISPLAY`.
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
        let conn = Arc::new(conn);

        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let colormap = screen.default_colormap;
        let width = screen.width_in_pixels;
        let height = screen.height_in_pixels;
        info!("Connected to X server, screen {}, root window {}", screen_num, root);
        info!("Screen size: {}x{}", width, height);

        let atoms = Atoms::new(conn.as_ref())?;
        let keymap = KeyMap::fetch(&conn)?;

        let mut backend = Self {
            conn,
            root,
            colormap,
            width,
            height,
            atoms,
            keymap,
            numlock: Modifiers::empty(),
            keys: Vec::new(),
            focus_button: 1,
            unmaps: UnmapTracker::default(),
        };
        backend.numlock = backend.find_numlock()?;
        Ok(backend)
    }

    pub fn connection(&self) -> Arc<RustConnection> {
        self.conn.clone()
    }

    pub fn screen_size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Redirect the root window's substructure to us. Only one client may
    /// hold this at a time.
    pub fn become_wm(&self) -> Result<()> {
        let mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::PROPERTY_CHANGE;
        self.conn
            .change_window_attributes(self.root, &ChangeWindowAttributesAux::new().event_mask(mask))?
            .check()
            .context("Another window manager is already running")?;
        info!("Registered as window manager on root {}", self.root);
        Ok(())
    }

    /// Allocate the border colours on the default colormap.
    pub fn alloc_palette(&self, border: &BorderConfig) -> Result<Palette> {
        Ok(Palette {
            focus: self.alloc_color(&border.focus)?,
            unfocus: self.alloc_color(&border.unfocus)?,
        })
    }

    fn alloc_color(&self, spec: &str) -> Result<u32> {
        let rgb = Rgb::parse(spec)?;
        let scale = |c: u8| u16::from(c) * 257;
        let reply = self
            .conn
            .alloc_color(self.colormap, scale(rgb.r), scale(rgb.g), scale(rgb.b))?
            .reply()
            .with_context(|| format!("Failed to allocate colour {}", spec))?;
        Ok(reply.pixel)
    }

    pub fn set_focus_button(&mut self, button: u8) {
        self.focus_button = button;
    }

    /// Modifier bit Num Lock is mapped to, if any
    fn find_numlock(&self) -> Result<Modifiers> {
        let Some(numlock_code) = self.keymap.keycode(XK_NUM_LOCK) else {
            return Ok(Modifiers::empty());
        };
        let reply = self.conn.get_modifier_mapping()?.reply()?;
        let per = usize::from(reply.keycodes_per_modifier()).max(1);

        let mask = reply
            .keycodes
            .chunks(per)
            .position(|codes| codes.contains(&numlock_code))
            .map(|bit| Modifiers::from_bits_truncate(1 << bit))
            .unwrap_or_else(Modifiers::empty);
        debug!("Num Lock modifier: {:?}", mask);
        Ok(mask)
    }

    /// Variants of `mods` with Caps Lock and Num Lock on or off
    fn lock_variants(&self, mods: Modifiers) -> [Modifiers; 4] {
        let num = self.numlock;
        [
            mods,
            mods | Modifiers::LOCK,
            mods | num,
            mods | num | Modifiers::LOCK,
        ]
    }

    /// Grab every bound key on the root window.
    pub fn grab_keys(&mut self, bindings: &KeyBindings) -> Result<()> {
        self.keys = bindings.keys().collect();
        self.regrab_keys()
    }

    fn regrab_keys(&self) -> Result<()> {
        self.conn.ungrab_key(Grab::ANY, self.root, ModMask::ANY)?;
        for &(mods, keysym) in &self.keys {
            let Some(keycode) = self.keymap.keycode(keysym) else {
                warn!("No keycode for keysym {:#x}, binding skipped", keysym);
                continue;
            };
            for variant in self.lock_variants(mods) {
                self.conn.grab_key(
                    true,
                    self.root,
                    ModMask::from(variant.bits()),
                    keycode,
                    GrabMode::ASYNC,
                    GrabMode::ASYNC,
                )?;
            }
        }
        debug!("Grabbed {} key bindings", self.keys.len());
        Ok(())
    }

    /// Mapped top-level windows that should be managed right away
    pub fn existing_windows(&mut self) -> Result<Vec<WmEvent>> {
        let tree = self.conn.query_tree(self.root)?.reply()?;
        info!("Scanning {} existing windows", tree.children.len());

        let mut events = Vec::new();
        for &window in &tree.children {
            let Ok(attrs) = self.conn.get_window_attributes(window)?.reply() else {
                continue;
            };
            if attrs.override_redirect || attrs.map_state != MapState::VIEWABLE {
                continue;
            }
            self.unmaps.mapped(window);
            events.push(self.created(window)?);
        }
        Ok(events)
    }

    fn created(&self, window: Window) -> Result<WmEvent> {
        let (instance, class) = icccm::window_class(self.conn.as_ref(), window)?;
        Ok(WmEvent::WindowCreated {
            window,
            class,
            instance,
            transient: icccm::is_transient(self.conn.as_ref(), window)?,
        })
    }

    /// Translate a protocol event. Returns an error for fatal X errors.
    pub fn translate(&mut self, event: Event) -> Result<Option<WmEvent>> {
        let translated = match event {
            Event::MapRequest(e) => {
                let Ok(attrs) = self.conn.get_window_attributes(e.window)?.reply() else {
                    return Ok(None);
                };
                if attrs.override_redirect {
                    return Ok(None);
                }
                Some(self.created(e.window)?)
            }
            Event::DestroyNotify(e) => {
                self.unmaps.destroyed(e.window);
                Some(WmEvent::WindowDestroyed { window: e.window })
            }
            Event::UnmapNotify(e) => {
                if self.unmaps.notify(e.window) {
                    Some(WmEvent::WindowUnmapped { window: e.window })
                } else {
                    trace!("Ignoring our own unmap of {}", e.window);
                    None
                }
            }
            Event::ConfigureRequest(e) => {
                let mask = e.value_mask;
                let changes = WindowChanges {
                    x: mask.contains(ConfigWindow::X).then_some(i32::from(e.x)),
                    y: mask.contains(ConfigWindow::Y).then_some(i32::from(e.y)),
                    width: mask.contains(ConfigWindow::WIDTH).then_some(i32::from(e.width)),
                    height: mask.contains(ConfigWindow::HEIGHT).then_some(i32::from(e.height)),
                };
                Some(WmEvent::ConfigureRequest {
                    window: e.window,
                    changes,
                })
            }
            Event::ButtonPress(e) => Some(WmEvent::ButtonPress {
                window: e.event,
                button: e.detail,
            }),
            Event::EnterNotify(e) => {
                if e.mode == NotifyMode::NORMAL && e.detail != NotifyDetail::INFERIOR {
                    Some(WmEvent::PointerEnter { window: e.event })
                } else {
                    None
                }
            }
            Event::KeyPress(e) => self.keymap.keysym(e.detail).map(|keysym| WmEvent::KeyPress {
                keysym,
                modifiers: Modifiers::from_bits_truncate(u16::from(e.state)).clean(self.numlock),
            }),
            Event::PropertyNotify(e) if e.atom == Atom::from(AtomEnum::WM_HINTS) => {
                Some(WmEvent::UrgencyHint {
                    window: e.window,
                    urgent: icccm::is_urgent(self.conn.as_ref(), e.window)?,
                })
            }
            Event::MappingNotify(e) => {
                if e.request == Mapping::KEYBOARD {
                    info!("Keyboard mapping changed, regrabbing keys");
                    self.keymap = KeyMap::fetch(&self.conn)?;
                    self.numlock = self.find_numlock()?;
                    self.regrab_keys()?;
                }
                None
            }
            Event::Error(e) => {
                self.check_error(&e)?;
                None
            }
            other => {
                trace!("Unhandled event: {:?}", other);
                None
            }
        };
        Ok(translated)
    }

    fn check_error(&self, error: &X11Error) -> Result<()> {
        if is_benign(error.error_kind, error.major_opcode) {
            debug!("Ignoring X error: {:?}", error);
            Ok(())
        } else {
            Err(anyhow!(
                "X error {:?} (request {}, resource {:#x})",
                error.error_kind,
                error.major_opcode,
                error.bad_value
            ))
        }
    }

    /// Release the keyboard, send WM_DELETE_WINDOW to every top-level window
    /// that accepts it and hand focus back to the pointer root.
    pub fn cleanup(&mut self) -> Result<()> {
        info!("Cleaning up before exit");
        self.conn.ungrab_key(Grab::ANY, self.root, ModMask::ANY)?;

        let tree = self.conn.query_tree(self.root)?.reply()?;
        for &window in &tree.children {
            if let Err(e) = self.close(window, false) {
                debug!("Failed to close window {}: {}", window, e);
            }
        }

        self.conn.set_input_focus(
            InputFocus::POINTER_ROOT,
            u32::from(InputFocus::POINTER_ROOT),
            x11rb::CURRENT_TIME,
        )?;
        self.conn.sync()?;
        Ok(())
    }

    fn close(&self, window: Window, kill: bool) -> Result<()> {
        let supports_delete = self.atoms.supports_delete_protocol(self.conn.as_ref(), window)?;
        match close_method(supports_delete, kill) {
            Some(Close::Delete) => self.atoms.send_delete_window(self.conn.as_ref(), window),
            Some(Close::Kill) => {
                debug!("Window {} ignores WM_DELETE_WINDOW, killing its client", window);
                self.conn.kill_client(window)?;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Adapter for X11Backend {
    fn move_resize(&mut self, window: WindowId, geometry: Geometry) -> Result<()> {
        let aux = ConfigureWindowAux::new()
            .x(geometry.x)
            .y(geometry.y)
            .width(geometry.width)
            .height(geometry.height);
        self.conn.configure_window(window, &aux)?;
        Ok(())
    }

    fn configure(&mut self, window: WindowId, changes: &WindowChanges) -> Result<()> {
        let size = |v: Option<i32>| v.map(|v| v.max(1) as u32);
        let aux = ConfigureWindowAux::new()
            .x(changes.x)
            .y(changes.y)
            .width(size(changes.width))
            .height(size(changes.height));
        self.conn.configure_window(window, &aux)?;
        Ok(())
    }

    fn map(&mut self, window: WindowId) -> Result<()> {
        self.unmaps.mapped(window);
        self.conn.map_window(window)?;
        Ok(())
    }

    fn unmap(&mut self, window: WindowId) -> Result<()> {
        // No UnmapNotify comes back for a window that is not mapped.
        if self.unmaps.unmapped_by_us(window) {
            self.conn.unmap_window(window)?;
        }
        Ok(())
    }

    fn raise(&mut self, window: WindowId) -> Result<()> {
        self.conn
            .configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))?;
        Ok(())
    }

    fn set_border_color(&mut self, window: WindowId, pixel: u32) -> Result<()> {
        self.conn
            .change_window_attributes(window, &ChangeWindowAttributesAux::new().border_pixel(pixel))?;
        Ok(())
    }

    fn set_border_width(&mut self, window: WindowId, width: u32) -> Result<()> {
        self.conn
            .configure_window(window, &ConfigureWindowAux::new().border_width(width))?;
        Ok(())
    }

    fn set_input_focus(&mut self, window: WindowId) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, window, x11rb::CURRENT_TIME)?;
        Ok(())
    }

    fn send_close_request(&mut self, window: WindowId) -> Result<()> {
        self.close(window, true)
    }

    fn grab_buttons(&mut self, window: WindowId) -> Result<()> {
        self.conn.ungrab_button(ButtonIndex::ANY, window, ModMask::ANY)?;
        for variant in self.lock_variants(Modifiers::empty()) {
            self.conn.grab_button(
                false,
                window,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                x11rb::NONE,
                ButtonIndex::from(self.focus_button),
                ModMask::from(variant.bits()),
            )?;
        }
        Ok(())
    }

    fn ungrab_buttons(&mut self, window: WindowId) -> Result<()> {
        self.conn.ungrab_button(ButtonIndex::ANY, window, ModMask::ANY)?;
        Ok(())
    }

    fn watch_client(&mut self, window: WindowId, enter: bool) -> Result<()> {
        let mut mask = EventMask::PROPERTY_CHANGE;
        if enter {
            mask |= EventMask::ENTER_WINDOW;
        }
        self.conn
            .change_window_attributes(window, &ChangeWindowAttributesAux::new().event_mask(mask))?;
        Ok(())
    }
}
