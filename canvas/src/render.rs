//! Draws an unrotated source bitmap onto a display surface at the session's
//! angle, zoom and pan.
//!
//! Equivalent to: translate to the surface centre, rotate by `angle`, then draw
//! the source window `pan + viewport` into `-rotated_viewport / 2 ..
//! rotated_viewport / 2`. Implemented as an inverse mapping per destination
//! pixel with nearest-neighbour sampling, so right-angle rotations are
//! pixel-exact.

use image::{Rgba, RgbaImage};

use crate::geometry::rotate_vector;
use crate::session::SessionGeometry;
use crate::surface::Surface;

/// Clear `target` and draw `source` through `geometry`.
///
/// Pixels outside the drawn window stay transparent. `source` is expected in
/// full-image pixels; the target keeps its current size.
pub fn render_image(target: &mut Surface, source: &RgbaImage, geometry: &SessionGeometry) {
    let (tw, th) = (target.width(), target.height());
    let (sw, sh) = (source.width(), source.height());
    let half_w = f64::from(tw) / 2.0;
    let half_h = f64::from(th) / 2.0;
    let rvp = geometry.rotated_viewport();
    let (rx, ry) = geometry.ratio();
    let pan = geometry.pan();
    let angle = geometry.angle();

    let pixels = target.pixels_mut();
    for py in 0..th {
        for px in 0..tw {
            let dx = f64::from(px) + 0.5 - half_w;
            let dy = f64::from(py) + 0.5 - half_h;
            let (ux, uy) = rotate_vector(-angle, dx, dy);
            let u = ux + rvp.width / 2.0;
            let v = uy + rvp.height / 2.0;

            let out = if u >= 0.0 && v >= 0.0 && u < rvp.width && v < rvp.height {
                let sx = (pan.x + u * rx).floor();
                let sy = (pan.y + v * ry).floor();
                sample(source, sx, sy, sw, sh)
            } else {
                Rgba([0, 0, 0, 0])
            };
            pixels.put_pixel(px, py, out);
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn sample(source: &RgbaImage, sx: f64, sy: f64, sw: u32, sh: u32) -> Rgba<u8> {
    if sx < 0.0 || sy < 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let (x, y) = (sx as u32, sy as u32);
    if x >= sw || y >= sh {
        return Rgba([0, 0, 0, 0]);
    }
    *source.get_pixel(x, y)
}
