//! Mapping between normalized (fractional) and pixel coordinates.
//!
//! Mapping never validates. Out-of-range fractions give out-of-canvas pixel
//! coordinates, which the renderer and cropper clip to the canvas.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Slack allowed on `left + width` and `top + height` before they count as out of range
const EDGE_TOLERANCE: f64 = 1e-9;

/// Box in fractions of the image width/height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        check_unit("left", self.left, 0.0)?;
        check_unit("top", self.top, 0.0)?;
        check_unit("width", self.width, 0.0)?;
        check_unit("height", self.height, 0.0)?;
        check_unit("right", self.left + self.width, EDGE_TOLERANCE)?;
        check_unit("bottom", self.top + self.height, EDGE_TOLERANCE)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedPolygon {
    pub points: Vec<NormalizedPoint>,
}

impl NormalizedPolygon {
    pub fn new(points: Vec<NormalizedPoint>) -> Self {
        Self { points }
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.points.len() < 3 {
            return Err(GeometryError::TooFewPoints(self.points.len()));
        }
        for point in &self.points {
            check_unit("x", point.x, 0.0)?;
            check_unit("y", point.y, 0.0)?;
        }
        Ok(())
    }
}

fn check_unit(field: &'static str, value: f64, tolerance: f64) -> Result<(), GeometryError> {
    if value.is_finite() && value >= -tolerance && value <= 1.0 + tolerance {
        Ok(())
    } else {
        Err(GeometryError::OutOfRange { field, value })
    }
}

/// Box in absolute pixel coordinates; `right`/`bottom` are exclusive edges
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

/// Integer region inside an image, ready for cropping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelBox {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn is_finite(&self) -> bool {
        self.left.is_finite()
            && self.top.is_finite()
            && self.right.is_finite()
            && self.bottom.is_finite()
    }

    /// Clamp every edge into `[min_x, max_x] x [min_y, max_y]`
    pub fn clamp_within(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> PixelBox {
        PixelBox {
            left: self.left.clamp(min_x, max_x),
            top: self.top.clamp(min_y, max_y),
            right: self.right.clamp(min_x, max_x),
            bottom: self.bottom.clamp(min_y, max_y),
        }
    }

    /// Clamp to the canvas `[0, width] x [0, height]`
    pub fn clamp_to(&self, width: u32, height: u32) -> PixelBox {
        self.clamp_within(0.0, 0.0, width as f64, height as f64)
    }

    /// Inverse of [`map_box`]
    pub fn to_normalized(&self, width: u32, height: u32) -> NormalizedBox {
        let (w, h) = (width as f64, height as f64);
        NormalizedBox {
            left: self.left / w,
            top: self.top / h,
            width: self.width() / w,
            height: self.height() / h,
        }
    }

    /// Round the edges to whole pixels (ties to even) and clip to the canvas.
    ///
    /// Fails with [`GeometryError::EmptyRegion`] when nothing of the box lies on the canvas.
    pub fn to_crop_rect(&self, width: u32, height: u32) -> Result<PixelRect, GeometryError> {
        if !self.is_finite() {
            return Err(GeometryError::NonFinite);
        }
        let clipped = self.clamp_to(width, height);
        let x0 = clipped.left.round_ties_even() as u32;
        let y0 = clipped.top.round_ties_even() as u32;
        let x1 = clipped.right.round_ties_even() as u32;
        let y1 = clipped.bottom.round_ties_even() as u32;
        if x1 <= x0 || y1 <= y0 {
            return Err(GeometryError::EmptyRegion);
        }
        Ok(PixelRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    fn lerp(&self, to: &PixelPoint, t: f64) -> PixelPoint {
        PixelPoint {
            x: self.x + t * (to.x - self.x),
            y: self.y + t * (to.y - self.y),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PixelPolygon {
    pub points: Vec<PixelPoint>,
}

impl PixelPolygon {
    /// Closing edges of the outline clipped to `[min_x, max_x] x [min_y, max_y]`.
    ///
    /// Clipped edges keep their slope. Edges wholly outside the window are dropped.
    pub fn clipped_edges(
        &self,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    ) -> Vec<(PixelPoint, PixelPoint)> {
        let count = self.points.len();
        (0..count)
            .filter_map(|i| {
                let start = &self.points[i];
                let end = &self.points[(i + 1) % count];
                clip_segment(start, end, min_x, min_y, max_x, max_y)
            })
            .collect()
    }

    /// Edges clipped to the canvas plus a 1px border, so edges lying on
    /// the far sides stay outside the image
    pub fn clip_to(&self, width: u32, height: u32) -> Vec<(PixelPoint, PixelPoint)> {
        self.clipped_edges(-1.0, -1.0, width as f64, height as f64)
    }
}

/// Liang-Barsky clipping of the segment `a -> b`
fn clip_segment(
    a: &PixelPoint,
    b: &PixelPoint,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
) -> Option<(PixelPoint, PixelPoint)> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    if !dx.is_finite() || !dy.is_finite() {
        return None;
    }

    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    let bounds = [
        (-dx, a.x - min_x),
        (dx, max_x - a.x),
        (-dy, a.y - min_y),
        (dy, max_y - a.y),
    ];
    for (p, q) in bounds {
        if p == 0.0 {
            // Parallel to this edge of the window
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    Some((a.lerp(b, t0), a.lerp(b, t1)))
}

/// Scale a normalized box by the image dimensions
pub fn map_box(width: u32, height: u32, b: &NormalizedBox) -> PixelBox {
    let (w, h) = (width as f64, height as f64);
    let left = w * b.left;
    let top = h * b.top;
    PixelBox {
        left,
        top,
        right: left + w * b.width,
        bottom: top + h * b.height,
    }
}

/// Scale each polygon point independently
pub fn map_polygon(width: u32, height: u32, polygon: &NormalizedPolygon) -> PixelPolygon {
    let (w, h) = (width as f64, height as f64);
    PixelPolygon {
        points: polygon
            .points
            .iter()
            .map(|p| PixelPoint { x: w * p.x, y: h * p.y })
            .collect(),
    }
}
