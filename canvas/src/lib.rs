//! Fog-of-war map rendering core.
//!
//! A game master paints an obscuring overlay on top of a background map. This
//! crate keeps the on-screen editor canvas and the full-resolution overlay in
//! step: it maps editor gestures into full-image pixel regions, draws the
//! rotated/zoomed/panned display surfaces, and derives what a remote player
//! screen should show. Everything here is synchronous and free of I/O; the host
//! decodes images and forwards the resulting [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Render surface manager: surfaces, snapshots, fog edits |
//! | [`session`] | Angle, zoom ladder, pan and editor→image mapping |
//! | [`geometry`] | Pure fitting, rotation and rescaling helpers |
//! | [`surface`] | RGBA surfaces, fills, snapshots, PNG encoding |
//! | [`render`] | Draws a bitmap through the session geometry |
//! | [`input`] | Tools, buttons and the interaction state machine |
//! | [`player`] | Player display projection |
//! | [`consts`] | Shared numeric constants |

pub mod consts;
pub mod engine;
pub mod geometry;
pub mod input;
pub mod player;
pub mod render;
pub mod session;
pub mod surface;
