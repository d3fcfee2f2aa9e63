//! Pixel rectangle types for HUD crops and overlay placement.
//!
//! Absolute pixel coordinates: crop rectangles live in source-frame
//! space, placements live in the fixed mobile canvas.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in pixels, ordered like ffmpeg's `crop=w:h:x:y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl PixelRect {
    pub const fn new(width: u32, height: u32, x: u32, y: u32) -> Self {
        Self {
            width,
            height,
            x,
            y,
        }
    }

    /// Uniformly scale every component, rounding to the nearest pixel.
    pub fn scaled(&self, factor: f64) -> Self {
        let s = |v: u32| (v as f64 * factor).round().max(0.0) as u32;
        Self {
            width: s(self.width),
            height: s(self.height),
            x: s(self.x),
            y: s(self.y),
        }
    }

    /// Right edge (exclusive).
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Whether the rectangle lies fully inside a `frame_w` x `frame_h` frame.
    pub fn fits_within(&self, frame_w: u32, frame_h: u32) -> bool {
        self.right() <= frame_w && self.bottom() <= frame_h
    }

    /// The `w:h:x:y` argument for ffmpeg's crop filter.
    pub fn crop_arg(&self) -> String {
        format!("{}:{}:{}:{}", self.width, self.height, self.x, self.y)
    }
}

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Place this size at `(x, y)`, clamping the origin so the element stays
    /// inside a `canvas_w` x `canvas_h` canvas. Elements larger than the
    /// canvas are pinned to the origin.
    pub fn place_clamped(&self, x: i64, y: i64, canvas_w: u32, canvas_h: u32) -> PixelRect {
        let max_x = (canvas_w as i64 - self.width as i64).max(0);
        let max_y = (canvas_h as i64 - self.height as i64).max(0);
        PixelRect {
            width: self.width,
            height: self.height,
            x: x.clamp(0, max_x) as u32,
            y: y.clamp(0, max_y) as u32,
        }
    }
}
