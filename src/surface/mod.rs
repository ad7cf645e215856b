//! Presentation surface
//!
//! The overlay window that draws the pie menu lives outside this crate. The
//! orchestrator only sees the [`Surface`] trait: it positions the window,
//! toggles visibility and focus, and pushes the menu to show. Messages going
//! the other way arrive as [`SurfaceMessage`]s.

mod stdio;

pub use stdio::{forward_messages, StdioSurface, SurfaceCommand};

use serde::{Deserialize, Serialize};

use crate::backend::KeyStroke;
use crate::menu::MenuNode;

/// Integer pixel rectangle in global screen coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }

    /// Squared distance from a point to the closest point of the rectangle
    pub fn distance_sq(&self, x: i32, y: i32) -> i64 {
        let dx = (self.x - x).max(0).max(x - (self.x + self.width - 1)) as i64;
        let dy = (self.y - y).max(0).max(y - (self.y + self.height - 1)) as i64;
        dx * dx + dy * dy
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// A monitor as reported by the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Display {
    pub id: u32,
    pub bounds: Rect,
    /// `bounds` minus panels and docks
    pub work_area: Rect,
}

/// The display containing `(x, y)`, or the nearest one if none does
pub fn display_at(displays: &[Display], x: i32, y: i32) -> Option<&Display> {
    displays
        .iter()
        .find(|d| d.bounds.contains(x, y))
        .or_else(|| displays.iter().min_by_key(|d| d.bounds.distance_sq(x, y)))
}

/// Window bounds covering `work_area`.
///
/// One extra pixel in each direction, otherwise a one pixel gap shows up at
/// the seam between two monitors.
pub fn surface_bounds(work_area: Rect) -> Rect {
    Rect::new(work_area.x, work_area.y, work_area.width + 1, work_area.height + 1)
}

/// Where the menu centre goes, relative to the work area origin
pub fn menu_position(work_area: Rect, pointer_x: i32, pointer_y: i32, centered: bool) -> Point {
    if centered {
        Point {
            x: work_area.width / 2,
            y: work_area.height / 2,
        }
    } else {
        Point {
            x: pointer_x - work_area.x,
            y: pointer_y - work_area.y,
        }
    }
}

/// Messages the surface sends to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SurfaceMessage {
    /// Fade-out started; hide the window after `delay` milliseconds
    HideWindow { delay: u64 },
    ShowDevTools,
    Log { message: String },
    SimulateKeys { keys: Vec<KeyStroke> },
    /// Relative pointer motion; fractions are truncated
    MovePointer { x: f64, y: f64 },
    OpenUri { uri: String },
}

/// Handle on the overlay window
pub trait Surface {
    /// Monitors known to the window system
    fn displays(&self) -> Vec<Display>;

    fn set_bounds(&mut self, bounds: Rect);

    /// Push the menu tree and its centre position
    fn show_menu(&mut self, root: &MenuNode, position: Point);

    fn show(&mut self);

    /// Remove from screen without destroying the window
    fn hide(&mut self);

    fn is_visible(&self) -> bool;

    /// Grab input focus. Must be a no-op while hidden.
    fn focus(&mut self);

    fn open_dev_tools(&mut self) {}
}
