#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn landscape() -> SessionGeometry {
    SessionGeometry::new(0.0, Size::new(400.0, 200.0), Size::new(200.0, 100.0))
}

fn assert_pan_in_bounds(g: &SessionGeometry) {
    let pan = g.pan();
    assert!(pan.x >= 0.0 && pan.y >= 0.0, "{pan:?}");
    assert!(pan.x + g.viewport().width <= g.image().width + EPSILON, "{pan:?}");
    assert!(pan.y + g.viewport().height <= g.image().height + EPSILON, "{pan:?}");
}

// =============================================================
// Construction
// =============================================================

#[test]
fn new_starts_at_fit_with_zero_pan() {
    let g = landscape();
    assert_eq!(g.zoom(), Zoom::Fit);
    assert_eq!(g.pan(), Point::default());
    assert_eq!(g.fit(), Size::new(200.0, 100.0));
    assert_eq!(g.viewport(), Size::new(400.0, 200.0));
    assert_eq!(g.surface_pixels(), (200, 100));
}

#[test]
fn new_quarter_turn_swaps_fit() {
    let g = SessionGeometry::new(90.0, Size::new(400.0, 200.0), Size::new(100.0, 200.0));
    assert_eq!(g.full_rotated(), Size::new(200.0, 400.0));
    assert_eq!(g.fit(), Size::new(100.0, 200.0));
    assert_eq!(g.rotated_viewport(), Size::new(200.0, 100.0));
}

#[test]
fn new_rounds_fit_to_whole_pixels() {
    let g = SessionGeometry::new(0.0, Size::new(300.0, 200.0), Size::new(100.0, 100.0));
    assert_eq!(g.fit(), Size::new(100.0, 67.0));
}

#[test]
fn normalize_angle_wraps_negative_and_full_turns() {
    assert_eq!(normalize_angle(-90.0), 270.0);
    assert_eq!(normalize_angle(360.0), 0.0);
    assert_eq!(normalize_angle(450.0), 90.0);
}

// =============================================================
// Zoom ladder
// =============================================================

#[test]
fn ladder_is_first_step_then_native() {
    let g = landscape();
    assert!(approx_eq(g.first_step(), 2.0));
    assert_eq!(g.ladder(), vec![2.0, 1.0]);
}

#[test]
fn ladder_is_empty_when_image_smaller_than_container() {
    let g = SessionGeometry::new(0.0, Size::new(50.0, 50.0), Size::new(200.0, 100.0));
    assert!(g.ladder().is_empty());
}

#[test]
fn ladder_collapses_duplicate_rungs() {
    let g = SessionGeometry::new(0.0, Size::new(200.0, 100.0), Size::new(200.0, 100.0));
    assert_eq!(g.ladder(), vec![1.0]);
}

#[test]
fn zoom_in_steps_through_ladder_then_stops() {
    let mut g = landscape();
    assert!(g.zoom_in());
    assert_eq!(g.zoom(), Zoom::Factor(2.0));
    assert_eq!(g.viewport(), Size::new(400.0, 200.0));
    assert!(g.zoom_in());
    assert_eq!(g.zoom(), Zoom::Factor(1.0));
    assert_eq!(g.viewport(), Size::new(200.0, 100.0));
    assert_eq!(g.surface_size(), Size::new(200.0, 100.0));
    assert!(!g.zoom_in());
    assert_eq!(g.zoom(), Zoom::Factor(1.0));
}

#[test]
fn zoom_out_returns_to_fit_then_stops() {
    let mut g = landscape();
    g.zoom_in();
    g.zoom_in();
    assert!(g.zoom_out());
    assert_eq!(g.zoom(), Zoom::Factor(2.0));
    assert!(g.zoom_out());
    assert_eq!(g.zoom(), Zoom::Fit);
    assert_eq!(g.pan(), Point::default());
    assert!(!g.zoom_out());
}

#[test]
fn zoom_in_without_ladder_is_ignored() {
    let mut g = SessionGeometry::new(0.0, Size::new(50.0, 50.0), Size::new(200.0, 100.0));
    assert!(!g.zoom_in());
    assert_eq!(g.zoom(), Zoom::Fit);
}

// =============================================================
// Pan
// =============================================================

#[test]
fn pan_at_fit_is_noop() {
    let mut g = landscape();
    g.pan_by(50.0, 50.0);
    assert_eq!(g.pan(), Point::default());
}

#[test]
fn pan_clamps_to_image_edges() {
    let mut g = landscape();
    g.zoom_in();
    g.zoom_in();
    g.pan_by(1000.0, 1000.0);
    assert_eq!(g.pan(), pt(200.0, 100.0));
    g.pan_by(-5000.0, -5000.0);
    assert_eq!(g.pan(), pt(0.0, 0.0));
}

#[test]
fn pan_delta_is_rotated_into_image_orientation() {
    let mut g = SessionGeometry::new(90.0, Size::new(400.0, 200.0), Size::new(100.0, 200.0));
    g.zoom_in();
    g.zoom_in();
    assert_eq!(g.zoom(), Zoom::Factor(1.0));
    g.pan_by(0.0, 10.0);
    assert_eq!(g.pan(), pt(10.0, 0.0));
}

#[test]
fn pan_stays_in_bounds_after_any_sequence() {
    let mut g = SessionGeometry::new(90.0, Size::new(1200.0, 700.0), Size::new(300.0, 400.0));
    g.zoom_in();
    g.zoom_in();
    let deltas = [(37.0, -12.0), (500.0, 3.0), (-2.5, 999.0), (-800.0, -800.0), (13.0, 17.0), (250.0, 250.0)];
    for (dx, dy) in deltas.iter().cycle().take(30) {
        g.pan_by(*dx, *dy);
        assert_pan_in_bounds(&g);
    }
    g.zoom_out();
    assert_pan_in_bounds(&g);
}

#[test]
fn zoom_out_reclamps_pan() {
    let mut g = landscape();
    g.zoom_in();
    g.zoom_in();
    g.pan_by(1000.0, 1000.0);
    g.zoom_out();
    assert_eq!(g.pan(), pt(0.0, 0.0));
}

// =============================================================
// Mapping
// =============================================================

#[test]
fn editor_to_full_at_fit_scales_by_image_ratio() {
    let g = landscape();
    assert_eq!(g.editor_to_full(pt(50.0, 25.0)), pt(100.0, 50.0));
}

#[test]
fn editor_to_full_quarter_turn_maps_top_left_to_bottom_left() {
    let g = SessionGeometry::new(90.0, Size::new(400.0, 200.0), Size::new(100.0, 200.0));
    assert_eq!(g.editor_to_full(pt(0.0, 0.0)), pt(0.0, 200.0));
    assert_eq!(g.editor_to_full(pt(100.0, 200.0)), pt(400.0, 0.0));
}

#[test]
fn editor_to_full_zoomed_applies_pan() {
    let mut g = landscape();
    g.zoom_in();
    g.zoom_in();
    g.pan_by(30.0, 20.0);
    assert_eq!(g.editor_to_full(pt(0.0, 0.0)), pt(30.0, 20.0));
    assert_eq!(g.editor_to_full(pt(10.0, 10.0)), pt(40.0, 30.0));
}

#[test]
fn editor_rect_to_full_normalises_corners() {
    let g = SessionGeometry::new(180.0, Size::new(400.0, 200.0), Size::new(200.0, 100.0));
    let r = g.editor_rect_to_full(EditorRect::new(0.0, 0.0, 50.0, 25.0));
    assert_eq!(r, FullImageRect::new(300.0, 150.0, 100.0, 50.0));
}

#[test]
fn project_rounds_to_whole_pixels() {
    let g = SessionGeometry::new(0.0, Size::new(300.0, 200.0), Size::new(100.0, 100.0));
    let r = g.project(EditorRect::new(10.0, 10.0, 33.0, 20.0));
    let raw = r.rect();
    assert_eq!(raw, raw.rounded());
}

#[test]
fn visible_region_is_whole_image_at_fit() {
    let g = landscape();
    assert_eq!(g.visible_region(), FullImageRect::new(0.0, 0.0, 400.0, 200.0));
}

// =============================================================
// Resize
// =============================================================

#[test]
fn resize_keeps_zoom_factor_and_pan() {
    let mut g = landscape();
    g.zoom_in();
    g.zoom_in();
    g.pan_by(40.0, 20.0);
    g.resize(Size::new(100.0, 50.0));
    assert_eq!(g.zoom(), Zoom::Factor(1.0));
    assert_eq!(g.viewport(), Size::new(100.0, 50.0));
    assert_eq!(g.pan(), pt(40.0, 20.0));
}

#[test]
fn resize_clamps_factor_to_new_first_step() {
    let mut g = landscape();
    g.zoom_in();
    g.resize(Size::new(400.0, 200.0));
    assert_eq!(g.zoom(), Zoom::Factor(1.0));
}

#[test]
fn resize_falls_back_to_fit_when_ladder_vanishes() {
    let mut g = landscape();
    g.zoom_in();
    g.resize(Size::new(800.0, 400.0));
    assert_eq!(g.zoom(), Zoom::Fit);
}
