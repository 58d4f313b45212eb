//! Session geometry: the numbers that tie the editor canvas to the full image.
//!
//! DESIGN
//! ======
//! The editor shows the background image rotated by `angle` inside a container.
//! At [`Zoom::Fit`] the whole rotated image is scaled down into the container
//! and the visible surfaces take the fitted size. At [`Zoom::Factor`] the
//! surfaces take the full container size and show a window of the image that
//! is `factor` image pixels per editor pixel, offset by `pan`.
//!
//! Two sizes describe what is drawn:
//! - `viewport`: the source window in image pixels (never rotated);
//! - `rotated_viewport`: the destination size in editor pixels, expressed in
//!   image orientation (the surface size rotated by `-angle`).
//!
//! `viewport / rotated_viewport` is the editor→image scale on each axis, which
//! is all the inverse mapping in [`SessionGeometry::editor_to_full`] needs.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use crate::consts::NATIVE_ZOOM;
use crate::geometry::{
    EditorRect, FullImageRect, Point, Rect, Size, get_scaled_container_size, rotate_back_to_origin, rotate_vector,
    rotated_width_and_height,
};

/// Current zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Zoom {
    /// Whole image fitted into the container.
    #[default]
    Fit,
    /// Image pixels per editor pixel. `1.0` is native resolution.
    Factor(f64),
}

/// Derived geometry for one loaded image at one angle and container size.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionGeometry {
    angle: f64,
    image: Size,
    container: Size,
    full_rotated: Size,
    unrotated_container: Size,
    fit: Size,
    fit_origin: Size,
    zoom: Zoom,
    pan: Point,
    viewport: Size,
    rotated_viewport: Size,
}

/// Normalise an angle into `[0, 360)`.
#[must_use]
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    if a >= 360.0 { 0.0 } else { a }
}

impl SessionGeometry {
    /// Full recompute. Starts at fit zoom with zero pan.
    #[must_use]
    pub fn new(angle: f64, image: Size, container: Size) -> Self {
        let angle = normalize_angle(angle);
        let container = Size::new(container.width.round().max(1.0), container.height.round().max(1.0));
        let image = Size::new(image.width.max(1.0), image.height.max(1.0));

        let (frw, frh) = rotated_width_and_height(angle, image.width, image.height);
        let (ucw, uch) = rotated_width_and_height(-angle, container.width, container.height);
        let (fw, fh) = get_scaled_container_size(container.width, container.height, frw, frh);
        let fit = Size::new(fw.round().max(1.0), fh.round().max(1.0));
        let (ow, oh) = rotated_width_and_height(-angle, fit.width, fit.height);
        let fit_origin = Size::new(ow, oh);

        Self {
            angle,
            image,
            container,
            full_rotated: Size::new(frw, frh),
            unrotated_container: Size::new(ucw, uch),
            fit,
            fit_origin,
            zoom: Zoom::Fit,
            pan: Point::default(),
            viewport: image,
            rotated_viewport: fit_origin,
        }
    }

    // =============================================================
    // Getters
    // =============================================================

    #[must_use]
    pub fn angle(&self) -> f64 {
        self.angle
    }

    #[must_use]
    pub fn image(&self) -> Size {
        self.image
    }

    #[must_use]
    pub fn container(&self) -> Size {
        self.container
    }

    /// Bounding size of the full image after rotation.
    #[must_use]
    pub fn full_rotated(&self) -> Size {
        self.full_rotated
    }

    /// Size of the visible surfaces when zoomed out to fit.
    #[must_use]
    pub fn fit(&self) -> Size {
        self.fit
    }

    #[must_use]
    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    #[must_use]
    pub fn pan(&self) -> Point {
        self.pan
    }

    #[must_use]
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    #[must_use]
    pub fn rotated_viewport(&self) -> Size {
        self.rotated_viewport
    }

    /// Pixel size the display surfaces must have at the current zoom.
    #[must_use]
    pub fn surface_size(&self) -> Size {
        match self.zoom {
            Zoom::Fit => self.fit,
            Zoom::Factor(_) => self.container,
        }
    }

    /// Integer pixel dimensions for [`surface_size`](Self::surface_size).
    #[must_use]
    pub fn surface_pixels(&self) -> (u32, u32) {
        let size = self.surface_size();
        (to_pixels(size.width), to_pixels(size.height))
    }

    /// Editor→image scale on each axis.
    #[must_use]
    pub fn ratio(&self) -> (f64, f64) {
        (self.viewport.width / self.rotated_viewport.width, self.viewport.height / self.rotated_viewport.height)
    }

    // =============================================================
    // Zoom
    // =============================================================

    /// Largest zoom factor at which the container is still filled by image.
    #[must_use]
    pub fn first_step(&self) -> f64 {
        (self.image.width / self.unrotated_container.width).min(self.image.height / self.unrotated_container.height)
    }

    /// Zoom factors below `Fit`, most zoomed-out first.
    #[must_use]
    pub fn ladder(&self) -> Vec<f64> {
        let first = self.first_step();
        let mut rungs: Vec<f64> = Vec::with_capacity(2);
        for rung in [first, NATIVE_ZOOM] {
            if (NATIVE_ZOOM..=first).contains(&rung) && !rungs.iter().any(|r| (r - rung).abs() < f64::EPSILON) {
                rungs.push(rung);
            }
        }
        rungs
    }

    /// Step one rung closer to native resolution. Returns `false` at the end
    /// of the ladder.
    pub fn zoom_in(&mut self) -> bool {
        let ladder = self.ladder();
        let next = match self.zoom {
            Zoom::Fit => ladder.first().copied(),
            Zoom::Factor(current) => ladder.iter().copied().find(|r| *r < current),
        };
        match next {
            Some(factor) => {
                self.apply_factor(factor);
                true
            }
            None => false,
        }
    }

    /// Step one rung towards `Fit`. Returns `false` when already at `Fit`.
    pub fn zoom_out(&mut self) -> bool {
        let Zoom::Factor(current) = self.zoom else {
            return false;
        };
        match self.ladder().iter().rev().copied().find(|r| *r > current) {
            Some(factor) => self.apply_factor(factor),
            None => self.reset_to_fit(),
        }
        true
    }

    fn apply_factor(&mut self, factor: f64) {
        self.zoom = Zoom::Factor(factor);
        self.rotated_viewport = self.unrotated_container;
        self.viewport =
            Size::new(factor * self.unrotated_container.width, factor * self.unrotated_container.height);
        self.clamp_pan();
    }

    fn reset_to_fit(&mut self) {
        self.zoom = Zoom::Fit;
        self.pan = Point::default();
        self.viewport = self.image;
        self.rotated_viewport = self.fit_origin;
    }

    // =============================================================
    // Pan
    // =============================================================

    /// Move the view by an editor-space delta. No-op at `Fit`.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let Zoom::Factor(factor) = self.zoom else {
            return;
        };
        let (ix, iy) = rotate_vector(-self.angle, dx, dy);
        self.pan.x += ix * factor;
        self.pan.y += iy * factor;
        self.clamp_pan();
    }

    /// Keep the viewport inside the image.
    pub fn clamp_pan(&mut self) {
        self.pan.x = self.pan.x.min(self.image.width - self.viewport.width).max(0.0);
        self.pan.y = self.pan.y.min(self.image.height - self.viewport.height).max(0.0);
    }

    // =============================================================
    // Resize
    // =============================================================

    /// Recompute for a new container, keeping the zoom factor when it is still
    /// reachable.
    pub fn resize(&mut self, container: Size) {
        let zoom = self.zoom;
        let pan = self.pan;
        *self = Self::new(self.angle, self.image, container);
        if let Zoom::Factor(factor) = zoom {
            let first = self.first_step();
            if first >= NATIVE_ZOOM {
                self.pan = pan;
                self.apply_factor(factor.clamp(NATIVE_ZOOM, first));
            }
        }
    }

    // =============================================================
    // Coordinate mapping
    // =============================================================

    /// Map an editor-space point into full-image space.
    #[must_use]
    pub fn editor_to_full(&self, point: Point) -> Point {
        let surface = self.surface_size();
        let (ux, uy) = rotate_back_to_origin(
            -self.angle,
            point.x,
            point.y,
            surface.width,
            surface.height,
            self.rotated_viewport.width,
            self.rotated_viewport.height,
        );
        let (rx, ry) = self.ratio();
        Point::new(self.pan.x + ux * rx, self.pan.y + uy * ry)
    }

    /// Map an editor-space rectangle into full-image space.
    #[must_use]
    pub fn editor_rect_to_full(&self, rect: EditorRect) -> FullImageRect {
        let r = rect.rect();
        let a = self.editor_to_full(Point::new(r.x, r.y));
        let b = self.editor_to_full(Point::new(r.right(), r.bottom()));
        FullImageRect::from_corners(a, b)
    }

    /// Like [`editor_rect_to_full`](Self::editor_rect_to_full), rounded to whole pixels.
    #[must_use]
    pub fn project(&self, rect: EditorRect) -> FullImageRect {
        FullImageRect(self.editor_rect_to_full(rect).rect().rounded())
    }

    /// The part of the full image currently visible in the editor.
    #[must_use]
    pub fn visible_region(&self) -> FullImageRect {
        FullImageRect(Rect::new(self.pan.x, self.pan.y, self.viewport.width, self.viewport.height))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_pixels(v: f64) -> u32 {
    v.round().clamp(1.0, f64::from(u32::MAX)) as u32
}
