//! Canvas dimensions of an edge.

use serde::{Deserialize, Serialize};

/// Width and height of an edge canvas, in layout units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    width: f64,
    height: f64,
}

impl Dimensions {
    /// The canvas size used when no source declares one.
    pub const DEFAULT: Dimensions = Dimensions {
        width: 15.0,
        height: 200.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Returns these dimensions with both sides divided by `factor`.
    pub fn scale_down(self, factor: f64) -> Self {
        Self::new(self.width / factor, self.height / factor)
    }

    /// Returns these dimensions with both sides multiplied by `factor`.
    pub fn scale_up(self, factor: f64) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::DEFAULT
    }
}
