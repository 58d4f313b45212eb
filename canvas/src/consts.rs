//! Shared numeric constants for the canvas crate.

// ── Coordinates ─────────────────────────────────────────────────

/// Sentinel for a pointer coordinate that has not been recorded yet.
pub const UNSET: f64 = -1.0;

/// Tolerance used when comparing rectangles that went through float math.
pub const RECT_EPSILON: f64 = 1e-9;

// ── Layout ──────────────────────────────────────────────────────

/// Height of the editor toolbar subtracted from the screen, in CSS pixels.
pub const CONTROLS_HEIGHT_PX: f64 = 46.0;

/// Horizontal chrome subtracted from the screen, in CSS pixels.
pub const CONTROLS_WIDTH_PX: f64 = 0.0;

// ── Drawing ─────────────────────────────────────────────────────

/// Fill used for the live selection preview: `rgba(255, 255, 255, 0.25)`.
pub const SELECTION_RGB: [u8; 3] = [255, 255, 255];

/// Opacity of the live selection preview.
pub const SELECTION_OPACITY: f64 = 0.25;

/// Default obscure colour (red).
pub const DEFAULT_OBSCURE_RGB: [u8; 3] = [255, 0, 0];

/// Default obscure opacity.
pub const DEFAULT_OBSCURE_OPACITY: f64 = 1.0;

// ── Zoom ────────────────────────────────────────────────────────

/// Zoom factor at which one image pixel maps to one editor pixel.
pub const NATIVE_ZOOM: f64 = 1.0;
