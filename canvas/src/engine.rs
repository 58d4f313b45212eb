//! Render surface manager: owns the session's bitmaps and surfaces and turns
//! commands into surface mutations plus [`Action`]s for the host.
//!
//! ARCHITECTURE
//! ============
//! Three surfaces per session:
//! - `background`: display-resolution render of the background image;
//! - `overlay`: display-resolution render of the fog;
//! - `full_overlay`: the fog at full image resolution, unrotated.
//!
//! `full_overlay` is the only authoritative copy of the fog. The display
//! overlay is re-derived from it after every committed mutation and on every
//! redraw, so the two can never drift apart.
//!
//! Snapshots (`buff`, `full_buff`) are taken after each committed mutation.
//! The live selection preview draws onto the display overlay between
//! snapshot restores and never touches `full_overlay`.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use image::RgbaImage;
use tracing::debug;

use crate::geometry::{DecodeCorrection, EditorRect, FullImageRect, Point, Rect, Size};
use crate::player::{PlayerFrame, player_frame};
use crate::render::render_image;
use crate::session::{SessionGeometry, normalize_angle};
use crate::surface::{Fill, Snapshot, Surface, SurfaceError};

/// Actions returned from engine operations for the host to forward.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Surfaces are sized and drawn for a freshly loaded image.
    Initialized { width: u32, height: u32, full_width: u32, full_height: u32 },
    /// PNG encoding of the full-resolution overlay after a committed change.
    Overlay(Vec<u8>),
    /// An editor rectangle projected into full-image space.
    Viewport(FullImageRect),
    /// A pan gesture finished and its result is committed.
    PanComplete,
    /// Player display projection.
    PlayerFrame(PlayerFrame),
}

/// Errors from engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no image has been loaded")]
    NotInitialized,
    #[error("background image has no pixels")]
    EmptyImage,
    #[error("invalid style: {0}")]
    InvalidStyle(#[source] SurfaceError),
    #[error("overlay encode failed: {0}")]
    Encode(#[source] SurfaceError),
}

/// What the current recording gesture does on each animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureMode {
    #[default]
    Idle,
    Select,
    Pan,
}

impl GestureMode {
    /// Mode implied by a pointer `buttons` bitmask.
    #[must_use]
    pub fn from_buttons(buttons: u16) -> Self {
        match buttons {
            1 => Self::Select,
            2 | 4 => Self::Pan,
            _ => Self::Idle,
        }
    }
}

#[derive(Debug, Default)]
struct Gesture {
    recording: bool,
    mode: GestureMode,
    start: Option<Point>,
    end: Option<Point>,
    last_anim: Option<Point>,
}

impl Gesture {
    /// The recorded rectangle, if both corners are set and it has area.
    fn rect(&self) -> Option<EditorRect> {
        let (start, end) = (self.start?, self.end?);
        if start.is_unset() || end.is_unset() {
            return None;
        }
        let rect = EditorRect::from_corners(start, end);
        if rect.rect().is_empty() { None } else { Some(rect) }
    }
}

struct Session {
    background_image: RgbaImage,
    geometry: SessionGeometry,
    background: Surface,
    overlay: Surface,
    full_overlay: Surface,
    buff: Snapshot,
    full_buff: Snapshot,
}

impl Session {
    fn image_size(&self) -> Size {
        Size::new(f64::from(self.background_image.width()), f64::from(self.background_image.height()))
    }

    /// Resize the display surfaces to the geometry and draw both.
    fn redraw_visible(&mut self) {
        let (w, h) = self.geometry.surface_pixels();
        if (self.background.width(), self.background.height()) != (w, h) {
            self.background.resize(w, h);
            self.overlay.resize(w, h);
        }
        render_image(&mut self.background, &self.background_image, &self.geometry);
        render_image(&mut self.overlay, self.full_overlay.pixels(), &self.geometry);
    }

    fn rederive_overlay(&mut self) {
        render_image(&mut self.overlay, self.full_overlay.pixels(), &self.geometry);
    }

    fn commit(&mut self) {
        self.buff = self.overlay.snapshot();
        self.full_buff = self.full_overlay.snapshot();
    }

    fn restore(&mut self) {
        self.overlay.restore(&self.buff);
        self.full_overlay.restore(&self.full_buff);
    }

    fn overlay_artifact(&self) -> Result<Action, EngineError> {
        self.full_overlay.encode_png().map(Action::Overlay).map_err(EngineError::Encode)
    }
}

/// The render surface manager.
#[derive(Default)]
pub struct Engine {
    session: Option<Session>,
    gesture: Gesture,
    fill: Fill,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn session(&mut self) -> Result<&mut Session, EngineError> {
        self.session.as_mut().ok_or(EngineError::NotInitialized)
    }

    // =============================================================
    // Lifecycle
    // =============================================================

    /// Replace the session with freshly decoded bitmaps.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyImage`] for a zero-sized background. The
    /// previous session is left untouched in that case.
    pub fn initialize(
        &mut self,
        background: RgbaImage,
        overlay: Option<RgbaImage>,
        container: Size,
        angle: f64,
    ) -> Result<Vec<Action>, EngineError> {
        let (full_w, full_h) = background.dimensions();
        if full_w == 0 || full_h == 0 {
            return Err(EngineError::EmptyImage);
        }

        let geometry = SessionGeometry::new(angle, Size::new(f64::from(full_w), f64::from(full_h)), container);
        let (w, h) = geometry.surface_pixels();

        let mut full_overlay = Surface::new(full_w, full_h);
        if let Some(overlay) = overlay {
            full_overlay.copy_from(&overlay, 0, 0);
        }
        let overlay = Surface::new(w, h);

        let mut session = Session {
            background_image: background,
            geometry,
            background: Surface::new(w, h),
            buff: overlay.snapshot(),
            full_buff: full_overlay.snapshot(),
            overlay,
            full_overlay,
        };
        session.redraw_visible();
        session.commit();

        debug!(width = w, height = h, full_width = full_w, full_height = full_h, angle, "engine initialized");
        self.session = Some(session);
        self.gesture = Gesture::default();
        Ok(vec![Action::Initialized { width: w, height: h, full_width: full_w, full_height: full_h }])
    }

    /// Re-render everything at a new angle from the source bitmaps. Resets
    /// to fit zoom.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotInitialized`] before the first load.
    pub fn rotate(&mut self, angle: f64) -> Result<Vec<Action>, EngineError> {
        let session = self.session()?;
        let angle = normalize_angle(angle);
        session.geometry = SessionGeometry::new(angle, session.image_size(), session.geometry.container());
        session.redraw_visible();
        session.commit();
        debug!(angle, "engine rotated");
        Ok(Vec::new())
    }

    /// Recompute for a new container size without reloading.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotInitialized`] before the first load.
    pub fn resize(&mut self, container: Size) -> Result<Vec<Action>, EngineError> {
        let session = self.session()?;
        session.restore();
        session.geometry.resize(container);
        session.redraw_visible();
        session.commit();
        Ok(Vec::new())
    }

    // =============================================================
    // Pan / zoom
    // =============================================================

    /// Pan by an editor-space delta and redraw the visible surfaces.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotInitialized`] before the first load.
    pub fn pan(&mut self, dx: f64, dy: f64) -> Result<Vec<Action>, EngineError> {
        let session = self.session()?;
        session.geometry.pan_by(dx, dy);
        session.redraw_visible();
        session.commit();
        Ok(Vec::new())
    }

    /// Step one zoom rung in. Ignored at the last rung.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotInitialized`] before the first load.
    pub fn zoom_in(&mut self) -> Result<Vec<Action>, EngineError> {
        let session = self.session()?;
        if session.geometry.zoom_in() {
            session.restore();
            session.redraw_visible();
            session.commit();
        }
        Ok(Vec::new())
    }

    /// Step one zoom rung out. Ignored at fit.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotInitialized`] before the first load.
    pub fn zoom_out(&mut self) -> Result<Vec<Action>, EngineError> {
        let session = self.session()?;
        if session.geometry.zoom_out() {
            session.restore();
            session.redraw_visible();
            session.commit();
        }
        Ok(Vec::new())
    }

    // =============================================================
    // Recording
    // =============================================================

    /// Begin a new recording: drop any on-screen selection preview.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotInitialized`] before the first load.
    pub fn start_recording(&mut self) -> Result<Vec<Action>, EngineError> {
        self.session()?.restore();
        if self.gesture.mode == GestureMode::Select {
            self.gesture.mode = GestureMode::Idle;
        }
        Ok(Vec::new())
    }

    /// Update the recorded rectangle. The first call of a gesture fixes its
    /// mode from `buttons`. A corner at the unset sentinel clears the
    /// rectangle.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotInitialized`] before the first load.
    pub fn record(&mut self, start: Point, end: Point, buttons: u16) -> Result<Vec<Action>, EngineError> {
        self.session()?;
        let g = &mut self.gesture;
        if start.is_unset() || end.is_unset() {
            g.start = None;
            g.end = None;
            return Ok(Vec::new());
        }
        if g.last_anim.is_none() {
            g.last_anim = Some(start);
        }
        g.start = Some(start);
        g.end = Some(end);
        if !g.recording {
            g.recording = true;
            g.mode = GestureMode::from_buttons(buttons);
        }
        Ok(Vec::new())
    }

    /// Run one animation frame of the active gesture.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotInitialized`] before the first load.
    pub fn animate(&mut self) -> Result<Vec<Action>, EngineError> {
        if !self.gesture.recording {
            return Ok(Vec::new());
        }
        let Some(session) = self.session.as_mut() else {
            return Err(EngineError::NotInitialized);
        };
        match self.gesture.mode {
            GestureMode::Select => {
                session.overlay.restore(&session.buff);
                if let Some(rect) = self.gesture.rect() {
                    session.overlay.fill_rect(rect.rect(), Fill::selection());
                }
            }
            GestureMode::Pan => {
                let (Some(end), Some(last)) = (self.gesture.end, self.gesture.last_anim) else {
                    return Ok(Vec::new());
                };
                if end != last {
                    self.gesture.last_anim = Some(end);
                    session.geometry.pan_by(end.x - last.x, end.y - last.y);
                    session.redraw_visible();
                }
            }
            GestureMode::Idle => {}
        }
        Ok(Vec::new())
    }

    /// Stop recording. A pan gesture is committed and reported; a selection
    /// stays on screen until the next recording starts.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotInitialized`] before the first load.
    pub fn end_recording(&mut self) -> Result<Vec<Action>, EngineError> {
        let session = self.session.as_mut().ok_or(EngineError::NotInitialized)?;
        let mut actions = Vec::new();
        if self.gesture.mode == GestureMode::Pan {
            session.commit();
            actions.push(Action::PanComplete);
            self.gesture.mode = GestureMode::Idle;
        }
        self.gesture.recording = false;
        self.gesture.last_anim = None;
        Ok(actions)
    }

    // =============================================================
    // Fog edits
    // =============================================================

    /// Paint the recorded rectangle with the current fill.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotInitialized`] before the first load, or
    /// [`EngineError::Encode`] if the artifact cannot be produced.
    pub fn obscure(&mut self) -> Result<Vec<Action>, EngineError> {
        let fill = self.fill;
        self.edit_selection(|full, rect| full.fill_rect(rect, fill))
    }

    /// Erase the recorded rectangle.
    ///
    /// # Errors
    ///
    /// Same as [`obscure`](Self::obscure).
    pub fn reveal(&mut self) -> Result<Vec<Action>, EngineError> {
        self.edit_selection(Surface::clear_rect)
    }

    fn edit_selection(&mut self, edit: impl FnOnce(&mut Surface, Rect)) -> Result<Vec<Action>, EngineError> {
        let rect = self.gesture.rect();
        let session = self.session.as_mut().ok_or(EngineError::NotInitialized)?;
        let Some(rect) = rect else {
            return Ok(Vec::new());
        };
        session.restore();
        let full = session.geometry.editor_rect_to_full(rect);
        edit(&mut session.full_overlay, full.rect());
        session.rederive_overlay();
        session.commit();
        Ok(vec![session.overlay_artifact()?])
    }

    /// Wipe the whole fog.
    ///
    /// # Errors
    ///
    /// Same as [`obscure`](Self::obscure).
    pub fn clear(&mut self) -> Result<Vec<Action>, EngineError> {
        let session = self.session()?;
        session.full_overlay.clear();
        session.overlay.clear();
        session.commit();
        Ok(vec![session.overlay_artifact()?])
    }

    /// Drop the on-screen selection preview without committing anything.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotInitialized`] before the first load.
    pub fn clear_selection(&mut self) -> Result<Vec<Action>, EngineError> {
        self.session()?.restore();
        Ok(Vec::new())
    }

    // =============================================================
    // Style
    // =============================================================

    /// Set the obscure opacity from a decimal string.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidStyle`]; the previous opacity is kept.
    pub fn set_opacity(&mut self, raw: &str) -> Result<Vec<Action>, EngineError> {
        self.fill.opacity = Fill::parse_opacity(raw).map_err(EngineError::InvalidStyle)?;
        Ok(Vec::new())
    }

    /// Set the obscure colour from decimal strings.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidStyle`] if any component is invalid; the
    /// previous colour is kept.
    pub fn set_colour(&mut self, red: &str, green: &str, blue: &str) -> Result<Vec<Action>, EngineError> {
        let parse = |raw: &str| Fill::parse_component(raw).map_err(EngineError::InvalidStyle);
        self.fill.rgb = [parse(red)?, parse(green)?, parse(blue)?];
        Ok(Vec::new())
    }

    // =============================================================
    // Projections
    // =============================================================

    /// Project an editor rectangle onto the full image and drop the selection
    /// preview.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotInitialized`] before the first load.
    pub fn project_viewport(&mut self, rect: EditorRect) -> Result<Vec<Action>, EngineError> {
        let session = self.session()?;
        let viewport = session.geometry.project(rect);
        session.restore();
        Ok(vec![Action::Viewport(viewport)])
    }

    /// Compute the player display frame for `viewport` on a `screen`.
    /// `table` is the nominal size `viewport` is expressed in; the loaded
    /// background is the decoded size. `None` means they agree.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotInitialized`] before the first load.
    pub fn player_frame(
        &mut self,
        viewport: Option<FullImageRect>,
        table: Option<Size>,
        screen: Size,
        correction: DecodeCorrection,
    ) -> Result<Vec<Action>, EngineError> {
        let session = self.session()?;
        let actual = session.image_size();
        let nominal = table.filter(|t| t.width > 0.0 && t.height > 0.0).unwrap_or(actual);
        let frame = player_frame(viewport, nominal, actual, screen, correction);
        Ok(vec![Action::PlayerFrame(frame)])
    }

    // =============================================================
    // Queries
    // =============================================================

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Whether animation frames should currently be scheduled.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.gesture.recording
    }

    #[must_use]
    pub fn gesture_mode(&self) -> GestureMode {
        self.gesture.mode
    }

    #[must_use]
    pub fn fill(&self) -> Fill {
        self.fill
    }

    #[must_use]
    pub fn geometry(&self) -> Option<&SessionGeometry> {
        self.session.as_ref().map(|s| &s.geometry)
    }

    #[must_use]
    pub fn background(&self) -> Option<&Surface> {
        self.session.as_ref().map(|s| &s.background)
    }

    #[must_use]
    pub fn overlay(&self) -> Option<&Surface> {
        self.session.as_ref().map(|s| &s.overlay)
    }

    #[must_use]
    pub fn full_overlay(&self) -> Option<&Surface> {
        self.session.as_ref().map(|s| &s.full_overlay)
    }
}
