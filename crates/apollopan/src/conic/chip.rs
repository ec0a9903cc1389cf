//! Containment tests of ellipses against image chips and points.

use super::Ellipse;

/// True if the whole ellipse lies inside a `width × height` chip.
///
/// Chip extents are the centers of its corner pixels, `[0, width − 1] ×
/// [0, height − 1]`. The corners are moved into the ellipse frame (centered,
/// rotated onto the major axis, scaled to unit semi-axes); there the ellipse
/// is the unit circle and every chip edge must keep a perpendicular distance
/// of at least 1 from the origin.
pub fn ellipse_in_chip(ellipse: &Ellipse, width: u32, height: u32) -> bool {
    if width == 0 || height == 0 {
        return false;
    }
    let max_x = f64::from(width - 1);
    let max_y = f64::from(height - 1);
    let [cx, cy] = ellipse.center;
    if !(0.0..=max_x).contains(&cx) || !(0.0..=max_y).contains(&cy) {
        return false;
    }

    let to_unit = |x: f64, y: f64| -> [f64; 2] {
        let dx = x - cx;
        let dy = y - cy;
        [
            (dx * ellipse.major_axis[0] + dy * ellipse.major_axis[1]) / ellipse.semi_major,
            (dx * ellipse.minor_axis[0] + dy * ellipse.minor_axis[1]) / ellipse.semi_minor,
        ]
    };
    let corners = [
        to_unit(0.0, 0.0),
        to_unit(max_x, 0.0),
        to_unit(max_x, max_y),
        to_unit(0.0, max_y),
    ];

    (0..4).all(|i| {
        let p = corners[i];
        let q = corners[(i + 1) % 4];
        let ex = q[0] - p[0];
        let ey = q[1] - p[1];
        let len = (ex * ex + ey * ey).sqrt();
        len > 0.0 && (p[0] * q[1] - p[1] * q[0]).abs() / len >= 1.0
    })
}

/// True if `point` lies inside the ellipse, allowing `play` units of slack
/// beyond the boundary (first-order distance).
pub fn point_in_ellipse(ellipse: &Ellipse, point: [f64; 2], play: f64) -> bool {
    ellipse.contains(point, play)
}
