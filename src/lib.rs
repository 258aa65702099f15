//! ringwm: a small dynamic tiling window manager for X11.

pub mod config;
pub mod wm;
pub mod x11_async;
