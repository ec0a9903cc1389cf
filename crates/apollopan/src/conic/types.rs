//! Conic coefficients and the dual-form ellipse type.

use serde::{Deserialize, Serialize};

/// General conic: A x² + B xy + C y² + D x + E y + F = 0.
/// Stored as [A, B, C, D, E, F].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConicCoeffs(pub [f64; 6]);

impl ConicCoeffs {
    /// Algebraic distance of a point (x, y) to this conic.
    pub fn algebraic_distance(&self, x: f64, y: f64) -> f64 {
        let [a, b, c, d, e, f] = self.0;
        a * x * x + b * x * y + c * y * y + d * x + e * y + f
    }

    /// Discriminant B² − 4AC; negative for ellipses (real or imaginary).
    pub fn discriminant(&self) -> f64 {
        let [a, b, c, ..] = self.0;
        b * b - 4.0 * a * c
    }

    /// Determinant of the 3×3 conic matrix,
    /// `(AC − B²/4) F + BED/4 − CD²/4 − AE²/4`.
    pub fn delta(&self) -> f64 {
        let [a, b, c, d, e, f] = self.0;
        (a * c - b * b / 4.0) * f + b * e * d / 4.0 - c * d * d / 4.0 - a * e * e / 4.0
    }

    /// True if the conic is a real, non-degenerate ellipse: `D < 0` and
    /// `delta · C < 0`.
    pub fn is_real_ellipse(&self) -> bool {
        let c = self.0[2];
        self.discriminant() < 0.0 && self.delta() * c < 0.0
    }

    /// Canonical ellipse, or `None` if the conic is not a real ellipse.
    pub fn to_ellipse(self) -> Option<Ellipse> {
        if !self.is_real_ellipse() {
            return None;
        }
        let [a, b, c, d, e, _] = self.0;

        // 2A·cx + B·cy + D = 0, B·cx + 2C·cy + E = 0
        let denom = 4.0 * a * c - b * b;
        let cx = (b * e - 2.0 * c * d) / denom;
        let cy = (b * d - 2.0 * a * e) / denom;

        // Conic value at the center; (p−c)ᵀQ(p−c) = −F'.
        let f_center = self.algebraic_distance(cx, cy);
        if f_center == 0.0 || !f_center.is_finite() {
            return None;
        }
        let s = -1.0 / f_center;
        Ellipse::from_matrix([cx, cy], [a * s, 0.5 * b * s, c * s])
    }
}

/// Ellipse held in two equivalent forms.
///
/// Matrix form: the symmetric matrix `A = [[a11, a12], [a12, a22]]` and the
/// center `c`, with `(p − c)ᵀ A (p − c) = 1` on the boundary. Canonical form:
/// orthonormal major/minor axes, semi-axes (`semi_major >= semi_minor`),
/// and area `π a b`. The semi-axes are the square roots of the eigenvalues
/// of `A⁻¹`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    /// Center `c` in pixel coordinates.
    pub center: [f64; 2],
    /// `[a11, a12, a22]`.
    pub matrix: [f64; 3],
    /// Semi-axis `a` along `major_axis`.
    pub semi_major: f64,
    /// Semi-axis `b <= a`.
    pub semi_minor: f64,
    /// Unit direction of the major axis.
    pub major_axis: [f64; 2],
    /// Unit direction of the minor axis.
    pub minor_axis: [f64; 2],
    /// `π a b`.
    pub area: f64,
}

impl Ellipse {
    /// Build from the matrix form. Returns `None` unless `A` is finite and
    /// positive definite.
    pub fn from_matrix(center: [f64; 2], matrix: [f64; 3]) -> Option<Self> {
        let [p, q, r] = matrix;
        if !(p.is_finite() && q.is_finite() && r.is_finite())
            || !(center[0].is_finite() && center[1].is_finite())
        {
            return None;
        }
        let det = p * r - q * q;
        if p <= 0.0 || det <= 0.0 {
            return None;
        }

        let mean = 0.5 * (p + r);
        let half_gap = (0.25 * (p - r) * (p - r) + q * q).sqrt();
        let lambda_big = mean + half_gap;
        let lambda_small = mean - half_gap;
        if lambda_small <= 0.0 {
            return None;
        }

        // Eigenvector of the larger eigenvalue of A is the ellipse's minor axis.
        let theta = 0.5 * (2.0 * q).atan2(p - r);
        let (sin_t, cos_t) = theta.sin_cos();
        let minor_axis = [cos_t, sin_t];
        let major_axis = [-sin_t, cos_t];

        let semi_major = 1.0 / lambda_small.sqrt();
        let semi_minor = 1.0 / lambda_big.sqrt();
        Some(Self {
            center,
            matrix,
            semi_major,
            semi_minor,
            major_axis,
            minor_axis,
            area: std::f64::consts::PI * semi_major * semi_minor,
        })
    }

    /// Build from canonical parameters; `angle` is the major-axis direction
    /// measured from +x, in radians.
    pub fn from_axes(center: [f64; 2], semi_major: f64, semi_minor: f64, angle: f64) -> Option<Self> {
        if semi_major <= 0.0 || semi_minor <= 0.0 {
            return None;
        }
        let (sin_a, cos_a) = angle.sin_cos();
        let ia2 = 1.0 / (semi_major * semi_major);
        let ib2 = 1.0 / (semi_minor * semi_minor);
        let a11 = cos_a * cos_a * ia2 + sin_a * sin_a * ib2;
        let a12 = cos_a * sin_a * (ia2 - ib2);
        let a22 = sin_a * sin_a * ia2 + cos_a * cos_a * ib2;
        Self::from_matrix(center, [a11, a12, a22])
    }

    /// Major-axis angle from +x, normalized to (−π/2, π/2].
    pub fn angle(&self) -> f64 {
        let mut angle = self.major_axis[1].atan2(self.major_axis[0]);
        let pi = std::f64::consts::PI;
        while angle > pi / 2.0 {
            angle -= pi;
        }
        while angle <= -pi / 2.0 {
            angle += pi;
        }
        angle
    }

    /// `A⁻¹` as `[m11, m12, m22]`.
    pub fn inverse_matrix(&self) -> [f64; 3] {
        let [p, q, r] = self.matrix;
        let det = p * r - q * q;
        [r / det, -q / det, p / det]
    }

    /// `(p − c)ᵀ A (p − c)`; below 1 inside, 1 on the boundary.
    pub fn quadratic_form(&self, p: [f64; 2]) -> f64 {
        let [a11, a12, a22] = self.matrix;
        let dx = p[0] - self.center[0];
        let dy = p[1] - self.center[1];
        a11 * dx * dx + 2.0 * a12 * dx * dy + a22 * dy * dy
    }

    /// First-order signed distance to the boundary: `ẇ / ‖Ḃ‖`, where `ẇ` is
    /// the implicit residual and `Ḃ` its gradient w.r.t. the point.
    /// Negative inside, positive outside.
    pub fn linearized_distance(&self, p: [f64; 2]) -> f64 {
        let [a11, a12, a22] = self.matrix;
        let dx = p[0] - self.center[0];
        let dy = p[1] - self.center[1];
        let w = a11 * dx * dx + 2.0 * a12 * dx * dy + a22 * dy * dy - 1.0;
        let bx = 2.0 * (a11 * dx + a12 * dy);
        let by = 2.0 * (a12 * dx + a22 * dy);
        let norm = (bx * bx + by * by).sqrt();
        if norm == 0.0 {
            // Only reachable at the center, which is inside.
            return f64::NEG_INFINITY;
        }
        w / norm
    }

    /// Inside test with slack: true if the point is at most `play` units
    /// outside the boundary.
    pub fn contains(&self, p: [f64; 2], play: f64) -> bool {
        self.linearized_distance(p) <= play
    }

    /// Half-widths of the axis-aligned bounding box.
    pub fn half_extents(&self) -> [f64; 2] {
        let [m11, _, m22] = self.inverse_matrix();
        [m11.sqrt(), m22.sqrt()]
    }

    /// General conic coefficients of the boundary.
    pub fn to_conic(&self) -> ConicCoeffs {
        let [a11, a12, a22] = self.matrix;
        let [cx, cy] = self.center;
        ConicCoeffs([
            a11,
            2.0 * a12,
            a22,
            -2.0 * (a11 * cx + a12 * cy),
            -2.0 * (a12 * cx + a22 * cy),
            a11 * cx * cx + 2.0 * a12 * cx * cy + a22 * cy * cy - 1.0,
        ])
    }

    /// Sample `n` points on the boundary.
    pub fn sample_points(&self, n: usize) -> Vec<[f64; 2]> {
        (0..n)
            .map(|i| {
                let t = 2.0 * std::f64::consts::PI * (i as f64) / (n as f64);
                let u = self.semi_major * t.cos();
                let v = self.semi_minor * t.sin();
                [
                    self.center[0] + u * self.major_axis[0] + v * self.minor_axis[0],
                    self.center[1] + u * self.major_axis[1] + v * self.minor_axis[1],
                ]
            })
            .collect()
    }
}

/// Ellipse parameters for serialization (center + geometry).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EllipseParams {
    /// Center `[x, y]`.
    pub center_xy: [f64; 2],
    /// Semi-axes [a, b], a >= b.
    pub semi_axes: [f64; 2],
    /// Major-axis angle in radians, (−π/2, π/2].
    pub angle: f64,
}

impl From<&Ellipse> for EllipseParams {
    fn from(e: &Ellipse) -> Self {
        Self {
            center_xy: e.center,
            semi_axes: [e.semi_major, e.semi_minor],
            angle: e.angle(),
        }
    }
}

impl From<Ellipse> for EllipseParams {
    fn from(e: Ellipse) -> Self {
        Self::from(&e)
    }
}

impl TryFrom<EllipseParams> for Ellipse {
    type Error = EllipseParams;

    fn try_from(p: EllipseParams) -> Result<Self, Self::Error> {
        let [a, b] = p.semi_axes;
        Ellipse::from_axes(p.center_xy, a.abs().max(b.abs()), a.abs().min(b.abs()), p.angle).ok_or(p)
    }
}
