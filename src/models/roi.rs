use serde::{Deserialize, Serialize};

/// Products this close to an integer are treated as that integer before flooring/ceiling,
/// so `0.6 * 100.0` maps to pixel 60 and not 61.
const SNAP_EPSILON: f64 = 1e-9;

/// Pixel rectangle inside a source image
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from bounds (x1, y1, x2, y2). Inverted bounds give an empty rectangle.
    pub fn from_bounds(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2.saturating_sub(x1),
            height: y2.saturating_sub(y1),
        }
    }

    pub fn x2(&self) -> u32 {
        self.x + self.width
    }

    pub fn y2(&self) -> u32 {
        self.y + self.height
    }

    /// (x1, y1, x2, y2)
    pub fn bounds(&self) -> (u32, u32, u32, u32) {
        (self.x, self.y, self.x2(), self.y2())
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Region of interest in ratio coordinates relative to the image size.
///
/// Serialized as `[[left, top], [right, bottom]]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(from = "[[f64; 2]; 2]", into = "[[f64; 2]; 2]")]
pub struct RatioBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl RatioBox {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Build from upper-left and lower-right (x, y) ratio pairs
    pub fn from_corners(upper_left: (f64, f64), lower_right: (f64, f64)) -> Self {
        Self::new(upper_left.0, upper_left.1, lower_right.0, lower_right.1)
    }

    /// Map onto a `width` x `height` image.
    ///
    /// Start edges are floored, end edges ceiled, and both are clamped to
    /// `[0, dimension]`, so out-of-range ratios never produce coordinates outside
    /// the image.
    pub fn to_pixel_rect(&self, width: u32, height: u32) -> PixelRect {
        let x1 = scale_floor(self.left, width);
        let y1 = scale_floor(self.top, height);
        let x2 = scale_ceil(self.right, width).max(x1);
        let y2 = scale_ceil(self.bottom, height).max(y1);

        PixelRect::from_bounds(x1, y1, x2, y2)
    }
}

impl From<[[f64; 2]; 2]> for RatioBox {
    fn from(corners: [[f64; 2]; 2]) -> Self {
        Self::new(corners[0][0], corners[0][1], corners[1][0], corners[1][1])
    }
}

impl From<RatioBox> for [[f64; 2]; 2] {
    fn from(bbox: RatioBox) -> Self {
        [[bbox.left, bbox.top], [bbox.right, bbox.bottom]]
    }
}

fn snap(value: f64) -> f64 {
    let nearest = value.round();
    if (value - nearest).abs() < SNAP_EPSILON {
        nearest
    } else {
        value
    }
}

fn clamp_to(value: f64, dimension: u32) -> u32 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, dimension as f64) as u32
}

fn scale_floor(ratio: f64, dimension: u32) -> u32 {
    clamp_to(snap(ratio * dimension as f64).floor(), dimension)
}

fn scale_ceil(ratio: f64, dimension: u32) -> u32 {
    clamp_to(snap(ratio * dimension as f64).ceil(), dimension)
}
