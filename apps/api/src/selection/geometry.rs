use serde::{Deserialize, Serialize};

/// Minimum width and height (device-independent px) a drag must exceed to count as a
/// region selection rather than a click.
pub const MIN_SELECTION_SIZE: f64 = 10.0;

/// Extra oversampling applied on top of the device pixel ratio when rasterizing.
pub const RASTER_OVERSAMPLE: f64 = 2.0;

/// A point in container-relative viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle; width and height are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// Both sides strictly larger than [`MIN_SELECTION_SIZE`].
    pub fn is_selection(&self) -> bool {
        self.width > MIN_SELECTION_SIZE && self.height > MIN_SELECTION_SIZE
    }

    /// Top-centre of the rectangle, where the action menu is anchored.
    pub fn menu_anchor(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top)
    }
}

/// What the rasterizer is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRegion {
    pub rect: Rect,
    pub page: u32,
    pub scale: f64,
}

impl CaptureRegion {
    pub fn new(rect: Rect, page: u32, device_pixel_ratio: f64) -> Self {
        let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        Self {
            rect,
            page,
            scale: dpr * RASTER_OVERSAMPLE,
        }
    }

    /// Bitmap dimensions in physical pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        let px = |v: f64| (v * self.scale).round().max(1.0) as u32;
        (px(self.rect.width), px(self.rect.height))
    }
}
