use serde::{Deserialize, Serialize};

/// A rectangle in logical screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// Fixed chrome around the content area of the host window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Width of the tab strip on the left edge.
    pub sidebar_width: f64,
    /// Height of the bar along the top edge.
    pub top_bar_height: f64,
}

impl Layout {
    /// Content-surface bounds for a host client area: inset left by the sidebar
    /// and top by the top bar. Width and height never go negative.
    pub fn surface_bounds(&self, host: Bounds) -> Bounds {
        Bounds {
            x: host.x + self.sidebar_width,
            y: host.y + self.top_bar_height,
            width: (host.width - self.sidebar_width).max(0.0),
            height: (host.height - self.top_bar_height).max(0.0),
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            sidebar_width: 240.0,
            top_bar_height: 48.0,
        }
    }
}
