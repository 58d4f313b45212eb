//! Projection of the game master's viewport onto a remote player screen.
//!
//! The player display never letterboxes: the requested viewport is grown to
//! the screen's aspect ratio inside the table image, and turned by 90° when
//! that gives the better fit.

#[cfg(test)]
#[path = "player_test.rs"]
mod player_test;

use crate::geometry::{
    DecodeCorrection, FullImageRect, Rect, Size, ViewportRect, calculate_bounds, fill_to_aspect, scale_selection,
};

/// What a player screen should show.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerFrame {
    /// Region of the decoded table image to draw, in its actual pixels.
    pub crop: FullImageRect,
    /// Rotate the crop by 90° before fitting it to the screen.
    pub rotate: bool,
    /// Where the requested viewport lands on the screen.
    pub focus: ViewportRect,
}

/// Compute the player frame for `viewport` on a table image of nominal size
/// `table`, decoded at `actual`, shown on a `screen`-sized display.
///
/// `None` or an empty viewport shows the whole table.
#[must_use]
pub fn player_frame(
    viewport: Option<FullImageRect>,
    table: Size,
    actual: Size,
    screen: Size,
    correction: DecodeCorrection,
) -> PlayerFrame {
    let container = Rect::from_size(table);
    let selection = viewport.map(|v| v.rect()).filter(|r| !r.is_empty()).unwrap_or(container);

    let bounds = calculate_bounds(screen.width, screen.height, selection.width, selection.height);
    let aspect = if bounds.rotate { screen.height / screen.width } else { screen.width / screen.height };
    let crop = fill_to_aspect(selection, container, actual.width, actual.height, aspect, correction);

    let decoded_selection = if selection.approx_eq(&container) {
        container
    } else {
        selection.scaled(
            correction.factor(actual.width, table.width),
            correction.factor(actual.height, table.height),
        )
    };
    let focus = scale_selection(decoded_selection, crop, screen.width, screen.height);

    PlayerFrame { crop: FullImageRect(crop), rotate: bounds.rotate, focus: ViewportRect(focus) }
}
