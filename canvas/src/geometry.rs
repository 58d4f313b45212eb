//! Pure 2D geometry: fitting, rotation about centres, rescaling between frames.
//!
//! Every function here is a deterministic function of its arguments. Angles are
//! in degrees and follow the 2D canvas convention (positive is clockwise on a
//! y-down surface). Right-angle rotations are exact: sine and cosine are snapped
//! for multiples of 90° so that corners land on whole pixels.
//!
//! Rectangles carry no coordinate space on their own. Callers that move a
//! rectangle between spaces wrap it in [`EditorRect`], [`FullImageRect`] or
//! [`ViewportRect`] so a mismatched argument fails to compile.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use crate::consts::{CONTROLS_HEIGHT_PX, CONTROLS_WIDTH_PX, RECT_EPSILON, UNSET};

/// A point in any 2D pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The "not recorded yet" point.
    #[must_use]
    pub fn unset() -> Self {
        Self::new(UNSET, UNSET)
    }

    /// Either coordinate holds the [`UNSET`] sentinel.
    #[must_use]
    pub fn is_unset(self) -> bool {
        (self.x - UNSET).abs() < f64::EPSILON || (self.y - UNSET).abs() < f64::EPSILON
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether the size is strictly wider than tall.
    #[must_use]
    pub fn is_landscape(self) -> bool {
        self.width > self.height
    }

    /// Whether the size is strictly taller than wide.
    #[must_use]
    pub fn is_portrait(self) -> bool {
        self.height > self.width
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Build a rectangle from two arbitrary corners, normalising so width and
    /// height are non-negative.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self { x, y, width: (a.x - b.x).abs(), height: (a.y - b.y).abs() }
    }

    /// A rectangle at the origin covering `size`.
    #[must_use]
    pub fn from_size(size: Size) -> Self {
        Self { x: 0.0, y: 0.0, width: size.width, height: size.height }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// True when the rectangle covers no area.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Width divided by height.
    #[must_use]
    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    /// Scale position and size by independent horizontal/vertical factors.
    #[must_use]
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self { x: self.x * sx, y: self.y * sy, width: self.width * sx, height: self.height * sy }
    }

    /// Round every field to the nearest whole pixel.
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self { x: self.x.round(), y: self.y.round(), width: self.width.round(), height: self.height.round() }
    }

    /// Field-wise comparison within [`RECT_EPSILON`].
    #[must_use]
    pub fn approx_eq(&self, other: &Self) -> bool {
        (self.x - other.x).abs() < RECT_EPSILON
            && (self.y - other.y).abs() < RECT_EPSILON
            && (self.width - other.width).abs() < RECT_EPSILON
            && (self.height - other.height).abs() < RECT_EPSILON
    }
}

macro_rules! space_rect {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Default)]
        pub struct $name(pub Rect);

        impl $name {
            #[must_use]
            pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
                Self(Rect::new(x, y, width, height))
            }

            #[must_use]
            pub fn from_corners(a: Point, b: Point) -> Self {
                Self(Rect::from_corners(a, b))
            }

            /// The untagged rectangle.
            #[must_use]
            pub fn rect(&self) -> Rect {
                self.0
            }
        }
    };
}

space_rect!(
    /// Rectangle in editor-space: pixels of the on-screen editor canvas.
    EditorRect
);
space_rect!(
    /// Rectangle in full-image-space: pixels of the original background image.
    FullImageRect
);
space_rect!(
    /// Rectangle in viewport-space: the frame of a remote display's crop.
    ViewportRect
);

/// Placement of a scaled image inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImageBound {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// A 90° rotation was applied to get a better fit.
    pub rotate: bool,
}

/// Screen area reserved for editor chrome (toolbars, margins).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chrome {
    pub width: f64,
    pub height: f64,
}

impl Default for Chrome {
    fn default() -> Self {
        Self { width: CONTROLS_WIDTH_PX, height: CONTROLS_HEIGHT_PX }
    }
}

/// How logical image coordinates are corrected when the decoded bitmap is
/// smaller than the nominal image size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeCorrection {
    /// Multiply by `(actual / nominal)²`. Matches runtimes that silently
    /// downsample large images at decode time.
    #[default]
    Squared,
    /// Multiply by `actual / nominal`.
    Linear,
}

impl DecodeCorrection {
    /// Correction factor for one axis.
    #[must_use]
    pub fn factor(self, actual: f64, nominal: f64) -> f64 {
        let ratio = actual / nominal;
        match self {
            Self::Squared => ratio * ratio,
            Self::Linear => ratio,
        }
    }
}

// =============================================================
// Trigonometry
// =============================================================

/// Cosine and sine of `angle_deg`, exact for multiples of 90°.
fn cos_sin(angle_deg: f64) -> (f64, f64) {
    let normalized = angle_deg.rem_euclid(360.0);
    if normalized == 0.0 {
        (1.0, 0.0)
    } else if normalized == 90.0 {
        (0.0, 1.0)
    } else if normalized == 180.0 {
        (-1.0, 0.0)
    } else if normalized == 270.0 {
        (0.0, -1.0)
    } else {
        let rad = normalized.to_radians();
        (rad.cos(), rad.sin())
    }
}

/// Rotate a vector about the origin.
#[must_use]
pub fn rotate_vector(angle_deg: f64, x: f64, y: f64) -> (f64, f64) {
    let (c, s) = cos_sin(angle_deg);
    (x * c - y * s, x * s + y * c)
}

/// Rotate a point about the centre of a `box_w × box_h` rectangle.
#[must_use]
pub fn rotate_point(angle_deg: f64, x: f64, y: f64, box_w: f64, box_h: f64) -> (f64, f64) {
    let (cx, cy) = (box_w / 2.0, box_h / 2.0);
    let (rx, ry) = rotate_vector(angle_deg, x - cx, y - cy);
    (rx + cx, ry + cy)
}

/// Bounding box size of a `w × h` rectangle rotated about its own centre.
#[must_use]
pub fn rotated_width_and_height(angle_deg: f64, w: f64, h: f64) -> (f64, f64) {
    let (c, s) = cos_sin(angle_deg);
    ((w * c).abs() + (h * s).abs(), (w * s).abs() + (h * c).abs())
}

/// Rotate a point about the centre of `w × h` and re-anchor it on the centre
/// of `orig_w × orig_h`.
///
/// After a 90° turn the working rectangle and the rectangle being mapped back
/// to have swapped dimensions, so the two centres differ.
#[must_use]
pub fn rotate_back_to_origin(angle_deg: f64, x: f64, y: f64, w: f64, h: f64, orig_w: f64, orig_h: f64) -> (f64, f64) {
    let (rx, ry) = rotate_vector(angle_deg, x - w / 2.0, y - h / 2.0);
    (rx + orig_w / 2.0, ry + orig_h / 2.0)
}

// =============================================================
// Fitting
// =============================================================

/// Fit an image inside a container, rotating by 90° when the image and the
/// container have opposite orientations.
///
/// When rotated, `width`/`height` stay in image orientation while `left`/`top`
/// centre the swapped extents.
#[must_use]
pub fn calculate_bounds(container_w: f64, container_h: f64, image_w: f64, image_h: f64) -> ImageBound {
    let container = Size::new(container_w, container_h);
    let image = Size::new(image_w, image_h);
    let rotate = (image.is_landscape() && container.is_portrait()) || (image.is_portrait() && container.is_landscape());

    if rotate {
        let scale = (container_w / image_h).min(container_h / image_w);
        let width = image_w * scale;
        let height = image_h * scale;
        ImageBound { left: (container_w - height) / 2.0, top: (container_h - width) / 2.0, width, height, rotate }
    } else {
        let scale = (container_w / image_w).min(container_h / image_h);
        let width = image_w * scale;
        let height = image_h * scale;
        ImageBound { left: (container_w - width) / 2.0, top: (container_h - height) / 2.0, width, height, rotate }
    }
}

/// Largest size with the image's aspect ratio that fits in the container.
#[must_use]
pub fn get_scaled_container_size(container_w: f64, container_h: f64, image_w: f64, image_h: f64) -> (f64, f64) {
    let scale = (container_w / image_w).min(container_h / image_h);
    (image_w * scale, image_h * scale)
}

/// Drawable area left on a screen after subtracting editor chrome.
#[must_use]
pub fn get_max_container_size(screen_w: f64, screen_h: f64, chrome: Chrome) -> (f64, f64) {
    ((screen_w - chrome.width).max(1.0), (screen_h - chrome.height).max(1.0))
}

// =============================================================
// Frame conversions
// =============================================================

/// Rescale `selection` from the frame of `viewport` into a `target_w × target_h`
/// frame.
///
/// The selection is taken relative to the viewport origin. When the viewport is
/// strictly landscape and the target strictly portrait the selection is first
/// turned +90° inside the viewport; the opposite case turns −90°, so scaling
/// back with the arguments swapped restores the input.
#[must_use]
pub fn scale_selection(selection: Rect, viewport: Rect, target_w: f64, target_h: f64) -> Rect {
    let target = Size::new(target_w, target_h);
    let frame = viewport.size();
    let turn = if frame.is_landscape() && target.is_portrait() {
        90.0
    } else if frame.is_portrait() && target.is_landscape() {
        -90.0
    } else {
        0.0
    };

    let local = Rect::new(selection.x - viewport.x, selection.y - viewport.y, selection.width, selection.height);
    let (local, frame) = if turn == 0.0 {
        (local, frame)
    } else {
        let turned = Size::new(frame.height, frame.width);
        let (ax, ay) = rotate_back_to_origin(turn, local.x, local.y, frame.width, frame.height, turned.width, turned.height);
        let (bx, by) =
            rotate_back_to_origin(turn, local.right(), local.bottom(), frame.width, frame.height, turned.width, turned.height);
        (Rect::from_corners(Point::new(ax, ay), Point::new(bx, by)), turned)
    };

    local.scaled(target_w / frame.width, target_h / frame.height)
}

/// Expand `selection` to the target `aspect` (width / height) without leaving
/// `container`, so a zoomed player view is never letterboxed.
///
/// `actual_w`/`actual_h` are the dimensions the decoded bitmap really has. When
/// they differ from the container's nominal size, positions, sizes and the
/// container bounds are all scaled by `correction`. A selection equal to the
/// whole container is returned as-is.
#[must_use]
pub fn fill_to_aspect(
    selection: Rect,
    container: Rect,
    actual_w: f64,
    actual_h: f64,
    aspect: f64,
    correction: DecodeCorrection,
) -> Rect {
    if selection.approx_eq(&container) {
        return container;
    }

    let fx = correction.factor(actual_w, container.width);
    let fy = correction.factor(actual_h, container.height);
    let bounds = container.scaled(fx, fy);
    let mut filled = selection.scaled(fx, fy);

    if filled.aspect() > aspect {
        let height = filled.width / aspect;
        filled.y -= (height - filled.height) / 2.0;
        filled.height = height;
    } else {
        let width = filled.height * aspect;
        filled.x -= (width - filled.width) / 2.0;
        filled.width = width;
    }

    filled.width = filled.width.min(bounds.width);
    filled.height = filled.height.min(bounds.height);

    if filled.right() > bounds.right() {
        filled.x = bounds.right() - filled.width;
    }
    if filled.x < bounds.x {
        filled.x = bounds.x;
    }
    if filled.bottom() > bounds.bottom() {
        filled.y = bounds.bottom() - filled.height;
    }
    if filled.y < bounds.y {
        filled.y = bounds.y;
    }
    filled
}
