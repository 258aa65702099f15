//! Layout Module
//!
//! Pure geometry for the tiling modes. Given the windows of a desktop in ring
//! order and the desktop's parameters, compute where every window goes.
//! Nothing here talks to the X server; callers apply the result.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::wm::client::WindowId;

/// Arrangement mode of a desktop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Master on the left, stack on the right
    Tile,
    /// Every window fullscreen, only the current one mapped
    Monocle,
    /// Master on top, stack along the bottom
    Bstack,
    /// Column-major grid
    Grid,
    /// Accepted by the parser so configuration validation can reject it
    Float,
}

impl Mode {
    /// Numeric code used in the status line
    pub fn code(self) -> u8 {
        match self {
            Mode::Tile => 0,
            Mode::Monocle => 1,
            Mode::Bstack => 2,
            Mode::Grid => 3,
            Mode::Float => 4,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Tile => "tile",
            Mode::Monocle => "monocle",
            Mode::Bstack => "bstack",
            Mode::Grid => "grid",
            Mode::Float => "float",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("no such layout mode: {0}")]
    UnsupportedMode(Mode),
}

/// Window geometry, size excludes the border
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    /// Build a geometry from signed arithmetic; X rejects empty windows so
    /// sizes are clamped to one pixel.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width: width.max(1) as u32,
            height: height.max(1) as u32,
        }
    }
}

/// Physical screen plus the static border and panel settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Screen {
    pub width: i32,
    pub height: i32,
    pub border: i32,
    pub panel_height: i32,
    pub top_panel: bool,
}

impl Screen {
    /// Usable area for a desktop with the given panel visibility.
    pub fn work_area(&self, show_panel: bool) -> WorkArea {
        let panel = if show_panel { self.panel_height } else { 0 };
        WorkArea {
            y: if show_panel && self.top_panel { panel } else { 0 },
            width: self.width - self.border,
            height: self.height - self.border - panel,
        }
    }
}

/// Space the layouts divide up: screen minus border and panel allowance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkArea {
    /// Vertical offset (panel on top)
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Everything the layout needs to know about a desktop
#[derive(Debug, Clone, Copy)]
pub struct LayoutParams {
    pub mode: Mode,
    pub master_size: i32,
    pub growth: i32,
    pub area: WorkArea,
    pub border: i32,
}

/// One window and the geometry it should get
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub window: WindowId,
    pub geometry: Geometry,
}

/// Compute the geometry of `windows` (ring order, master first).
pub fn arrange(windows: &[WindowId], params: &LayoutParams) -> Result<Vec<Placement>, LayoutError> {
    let Some((&master, stack)) = windows.split_first() else {
        return Ok(Vec::new());
    };

    match params.mode {
        Mode::Float => Err(LayoutError::UnsupportedMode(params.mode)),
        _ if stack.is_empty() => Ok(monocle(windows, params)),
        Mode::Monocle => Ok(monocle(windows, params)),
        Mode::Tile => Ok(tile(master, stack, params)),
        Mode::Bstack => Ok(bstack(master, stack, params)),
        Mode::Grid => Ok(grid(windows, params)),
    }
}

/// Master span for `mode` at the given fraction of the work area.
pub fn default_master_size(mode: Mode, area: &WorkArea, fraction: f32) -> i32 {
    (f64::from(master_span(mode, area)) * f64::from(fraction)) as i32
}

/// Whether a master of `size` leaves both master and stack above `min`.
pub fn master_size_fits(mode: Mode, area: &WorkArea, size: i32, min: i32) -> bool {
    size > min && master_span(mode, area) - size > min
}

/// Number of grid columns for `n` windows.
///
/// Smallest `cols` with `cols * cols >= n`, except that five windows always
/// get two columns (two on the left, three on the right).
pub fn grid_columns(n: i32) -> i32 {
    if n == 5 {
        return 2;
    }
    let mut cols = 0;
    while cols <= n / 2 {
        if cols * cols >= n {
            break;
        }
        cols += 1;
    }
    cols
}

fn master_span(mode: Mode, area: &WorkArea) -> i32 {
    if mode == Mode::Bstack {
        area.height
    } else {
        area.width
    }
}

/// Split `total` pixels over `n` stack slots.
///
/// Returns the span of the first slot and of every later slot. The first
/// slot takes the division remainder plus `growth`, so the spans always add
/// up to `total`.
fn stack_spans(total: i32, n: i32, growth: i32) -> (i32, i32) {
    if n > 1 {
        let each = (total - growth) / n;
        let extra = (total - growth) % n + growth;
        (each + extra, each)
    } else {
        (total, total)
    }
}

fn monocle(windows: &[WindowId], params: &LayoutParams) -> Vec<Placement> {
    let area = &params.area;
    let geometry = Geometry::new(
        0,
        area.y,
        area.width + params.border,
        area.height + params.border,
    );
    windows
        .iter()
        .map(|&window| Placement { window, geometry })
        .collect()
}

fn tile(master: WindowId, stack: &[WindowId], params: &LayoutParams) -> Vec<Placement> {
    let area = &params.area;
    let bw = params.border;
    let ms = params.master_size;
    let (first, rest) = stack_spans(area.height, stack.len() as i32, params.growth);

    let mut placements = Vec::with_capacity(stack.len() + 1);
    placements.push(Placement {
        window: master,
        geometry: Geometry::new(0, area.y, ms - bw, area.height - bw),
    });

    let x = ms + bw;
    let width = area.width - ms - 2 * bw;
    let mut y = area.y;
    for (i, &window) in stack.iter().enumerate() {
        let span = if i == 0 { first } else { rest };
        placements.push(Placement {
            window,
            geometry: Geometry::new(x, y, width, span - bw),
        });
        y += span;
    }
    placements
}

fn bstack(master: WindowId, stack: &[WindowId], params: &LayoutParams) -> Vec<Placement> {
    let area = &params.area;
    let bw = params.border;
    let ms = params.master_size;
    let (first, rest) = stack_spans(area.width, stack.len() as i32, params.growth);

    let mut placements = Vec::with_capacity(stack.len() + 1);
    placements.push(Placement {
        window: master,
        geometry: Geometry::new(0, area.y, area.width - bw, ms - bw),
    });

    let y = area.y + ms + bw;
    let height = area.height - ms - 2 * bw;
    let mut x = 0;
    for (i, &window) in stack.iter().enumerate() {
        let span = if i == 0 { first } else { rest };
        placements.push(Placement {
            window,
            geometry: Geometry::new(x, y, span - bw, height),
        });
        x += span;
    }
    placements
}

fn grid(windows: &[WindowId], params: &LayoutParams) -> Vec<Placement> {
    let area = &params.area;
    let bw = params.border;
    let n = windows.len() as i32;
    let cols = grid_columns(n);
    let mut rows = n / cols;
    let cell_width = if cols > 0 { area.width / cols } else { area.width };

    let mut placements = Vec::with_capacity(windows.len());
    let (mut col, mut row) = (0, 0);
    for (i, &window) in windows.iter().enumerate() {
        // The rightmost `n % cols` columns hold one extra row.
        if i as i32 / rows + 1 > cols - n % cols {
            rows = n / cols + 1;
        }
        let cell_height = area.height / rows;
        placements.push(Placement {
            window,
            geometry: Geometry::new(
                col * cell_width,
                area.y + row * cell_height,
                cell_width - 2 * bw,
                cell_height - 2 * bw,
            ),
        });
        row += 1;
        if row >= rows {
            row = 0;
            col += 1;
        }
    }
    placements
}
