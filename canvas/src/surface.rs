//! Raster surfaces: owned RGBA8 buffers with the handful of 2D operations the
//! engine needs (fill, clear, copy, snapshot, PNG encode).
//!
//! Rectangles are given in surface pixels as floats. Edges are rounded to the
//! nearest pixel and clipped to the surface, so out-of-range rectangles are
//! silently trimmed.

#[cfg(test)]
#[path = "surface_test.rs"]
mod surface_test;

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage, imageops};

use crate::consts::{DEFAULT_OBSCURE_OPACITY, DEFAULT_OBSCURE_RGB, SELECTION_OPACITY, SELECTION_RGB};
use crate::geometry::Rect;

/// Errors raised by surface operations and style parsing.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("invalid opacity: {0:?}")]
    InvalidOpacity(String),
    #[error("invalid colour component: {0:?}")]
    InvalidColour(String),
    #[error("png encode failed: {0}")]
    Encode(#[from] image::ImageError),
}

// =============================================================
// Fill
// =============================================================

/// Solid fill colour plus opacity, composited source-over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub rgb: [u8; 3],
    pub opacity: f64,
}

impl Default for Fill {
    fn default() -> Self {
        Self { rgb: DEFAULT_OBSCURE_RGB, opacity: DEFAULT_OBSCURE_OPACITY }
    }
}

impl Fill {
    /// Translucent white used for the live selection preview.
    #[must_use]
    pub fn selection() -> Self {
        Self { rgb: SELECTION_RGB, opacity: SELECTION_OPACITY }
    }

    /// Parse a decimal opacity in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::InvalidOpacity`] for non-numeric or
    /// out-of-range input.
    pub fn parse_opacity(raw: &str) -> Result<f64, SurfaceError> {
        match raw.trim().parse::<f64>() {
            Ok(v) if (0.0..=1.0).contains(&v) => Ok(v),
            _ => Err(SurfaceError::InvalidOpacity(raw.to_owned())),
        }
    }

    /// Parse a decimal colour component in `0..=255`.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::InvalidColour`] for anything else.
    pub fn parse_component(raw: &str) -> Result<u8, SurfaceError> {
        raw.trim().parse::<u8>().map_err(|_| SurfaceError::InvalidColour(raw.to_owned()))
    }

    fn alpha(&self) -> u8 {
        unit_to_u8(self.opacity)
    }
}

// =============================================================
// Snapshot
// =============================================================

/// Immutable capture of a surface's pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot(RgbaImage);

impl Snapshot {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }
}

// =============================================================
// Surface
// =============================================================

/// A fixed-size RGBA8 drawing surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    /// A fully transparent surface.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { pixels: RgbaImage::new(width.max(1), height.max(1)) }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[must_use]
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    /// Replace the buffer with a transparent one of the new size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.pixels = RgbaImage::new(width.max(1), height.max(1));
    }

    /// Make every pixel transparent.
    pub fn clear(&mut self) {
        for px in self.pixels.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
    }

    /// Make every pixel inside `rect` transparent.
    pub fn clear_rect(&mut self, rect: Rect) {
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                self.pixels.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
        }
    }

    /// Composite `fill` over every pixel inside `rect`.
    pub fn fill_rect(&mut self, rect: Rect, fill: Fill) {
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        let src = Rgba([fill.rgb[0], fill.rgb[1], fill.rgb[2], fill.alpha()]);
        for y in y0..y1 {
            for x in x0..x1 {
                let dst = self.pixels.get_pixel_mut(x, y);
                *dst = source_over(src, *dst);
            }
        }
    }

    /// Copy `src` onto this surface with its top-left at `(x, y)`, replacing
    /// the covered pixels.
    pub fn copy_from(&mut self, src: &RgbaImage, x: i64, y: i64) {
        imageops::replace(&mut self.pixels, src, x, y);
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.pixels.clone())
    }

    /// Overwrite the surface with a snapshot, including its size.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.pixels.clone_from(&snapshot.0);
    }

    /// Encode the surface as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::Encode`] if the encoder fails.
    pub fn encode_png(&self) -> Result<Vec<u8>, SurfaceError> {
        let mut out = Cursor::new(Vec::new());
        self.pixels.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }

    /// True when every pixel is fully transparent.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pixels.pixels().all(|p| p.0[3] == 0)
    }

    fn clip(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        let (w, h) = (f64::from(self.width()), f64::from(self.height()));
        let x0 = rect.x.round().clamp(0.0, w);
        let y0 = rect.y.round().clamp(0.0, h);
        let x1 = rect.right().round().clamp(0.0, w);
        let y1 = rect.bottom().round().clamp(0.0, h);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((to_u32(x0), to_u32(y0), to_u32(x1), to_u32(y1)))
    }
}

// =============================================================
// Pixel math
// =============================================================

/// Porter-Duff source-over on straight (non-premultiplied) alpha.
fn source_over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = f64::from(src.0[3]) / 255.0;
    let da = f64::from(dst.0[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |i: usize| {
        let sc = f64::from(src.0[i]);
        let dc = f64::from(dst.0[i]);
        unit_to_u8((sc * sa + dc * da * (1.0 - sa)) / out_a / 255.0)
    };
    Rgba([channel(0), channel(1), channel(2), unit_to_u8(out_a)])
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unit_to_u8(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u32(v: f64) -> u32 {
    v as u32
}
