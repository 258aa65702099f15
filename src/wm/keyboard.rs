//! Keyboard Module
//!
//! Key binding table, modifier handling and the closed set of actions a
//! binding can trigger.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::wm::layout::Mode;

/// X11 keysym value
pub type Keysym = u32;

pub const XK_NUM_LOCK: Keysym = 0xff7f;

bitflags! {
    /// X11 modifier mask bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u16 {
        const SHIFT = 1 << 0;
        const LOCK = 1 << 1;
        const CONTROL = 1 << 2;
        const MOD1 = 1 << 3;
        const MOD2 = 1 << 4;
        const MOD3 = 1 << 5;
        const MOD4 = 1 << 6;
        const MOD5 = 1 << 7;
    }
}

impl Modifiers {
    /// Parse a modifier name as written in the config file
    pub fn parse_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "shift" => Some(Self::SHIFT),
            "control" | "ctrl" => Some(Self::CONTROL),
            "alt" | "mod1" => Some(Self::MOD1),
            "mod2" => Some(Self::MOD2),
            "mod3" => Some(Self::MOD3),
            "super" | "mod4" => Some(Self::MOD4),
            "mod5" => Some(Self::MOD5),
            _ => None,
        }
    }

    /// Strip Caps Lock and Num Lock, which never take part in a binding.
    pub fn clean(self, numlock: Modifiers) -> Self {
        self - (numlock | Self::LOCK)
    }
}

/// Everything a key binding can do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Switch to desktop `n`
    ChangeDesktop(usize),
    /// Send the current client to desktop `n`
    ClientToDesktop(usize),
    /// Switch back to the previously active desktop
    LastDesktop,
    /// Switch to the desktop `n` steps away, wrapping
    RotateDesktop(i32),
    /// Like `RotateDesktop` but skip desktops without clients
    RotateFilled(i32),
    NextWindow,
    PrevWindow,
    /// Swap the current client with the next one
    MoveDown,
    /// Swap the current client with the previous one
    MoveUp,
    SwapMaster,
    FocusUrgent,
    KillClient,
    /// Grow or shrink the master area by `n` pixels
    ResizeMaster(i32),
    /// Grow or shrink the first stack slot by `n` pixels
    ResizeStack(i32),
    SwitchMode(Mode),
    TogglePanel,
    /// Launch an external command (argv)
    Spawn(Vec<String>),
    /// Stop the manager with the given exit code
    Quit(i32),
}

/// Key binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    /// Modifier mask
    pub modifiers: Modifiers,
    /// Keysym
    pub keysym: Keysym,
    /// Action
    pub action: Action,
}

/// Lookup table from (modifiers, keysym) to action
#[derive(Debug, Default)]
pub struct KeyBindings {
    bindings: HashMap<(Modifiers, Keysym), Action>,
    order: Vec<(Modifiers, Keysym)>,
}

impl KeyBindings {
    pub fn new(list: Vec<KeyBinding>) -> Self {
        let mut table = Self::default();
        for binding in list {
            let key = (binding.modifiers, binding.keysym);
            if table.bindings.insert(key, binding.action).is_none() {
                table.order.push(key);
            } else {
                debug!(
                    "Key binding modifiers={:?} keysym=0x{:x} overrides an earlier one",
                    key.0, key.1
                );
            }
        }
        table
    }

    /// Action bound to an already cleaned modifier mask and keysym
    pub fn lookup(&self, modifiers: Modifiers, keysym: Keysym) -> Option<&Action> {
        self.bindings.get(&(modifiers, keysym))
    }

    /// Every bound (modifiers, keysym) pair, in configuration order
    pub fn keys(&self) -> impl Iterator<Item = (Modifiers, Keysym)> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Resolve a key name to its keysym (values from X11/keysymdef.h).
pub fn keysym_from_name(name: &str) -> Option<Keysym> {
    let bytes = name.as_bytes();
    if bytes.len() == 1 {
        let c = bytes[0];
        return match c {
            b'a'..=b'z' | b'0'..=b'9' => Some(Keysym::from(c)),
            b'A'..=b'Z' => Some(Keysym::from(c.to_ascii_lowercase())),
            _ => None,
        };
    }

    if let Some(n) = name.strip_prefix('F').and_then(|n| n.parse::<u32>().ok()) {
        return (1..=12).contains(&n).then(|| 0xffbe + n - 1);
    }

    let keysym = match name {
        "space" => 0x0020,
        "minus" => 0x002d,
        "equal" => 0x003d,
        "comma" => 0x002c,
        "period" => 0x002e,
        "BackSpace" => 0xff08,
        "Tab" => 0xff09,
        "Return" => 0xff0d,
        "Escape" => 0xff1b,
        "Delete" => 0xffff,
        "Home" => 0xff50,
        "Left" => 0xff51,
        "Up" => 0xff52,
        "Right" => 0xff53,
        "Down" => 0xff54,
        "Page_Up" => 0xff55,
        "Page_Down" => 0xff56,
        "End" => 0xff57,
        "Print" => 0xff61,
        "Num_Lock" => XK_NUM_LOCK,
        _ => return None,
    };
    Some(keysym)
}
