//! Per-strip affine maps and strip boundaries.

use serde::{Deserialize, Serialize};

/// Planar affine map `(x, y) ↦ (c0·x + c1·y + c4, c2·x + c3·y + c5)`.
///
/// The coefficient order matches the unknown order of the strip normal
/// equations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine2 {
    /// `[c0, c1, c2, c3, c4, c5]`.
    pub coeffs: [f64; 6],
}

impl Affine2 {
    /// The identity map.
    pub const IDENTITY: Self = Self {
        coeffs: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
    };

    pub(crate) const INVALID: Self = Self {
        coeffs: [f64::NAN; 6],
    };

    /// Map with the given coefficients.
    pub fn new(coeffs: [f64; 6]) -> Self {
        Self { coeffs }
    }

    /// Image of `p`.
    #[inline]
    pub fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        let c = &self.coeffs;
        [
            c[0] * p[0] + c[1] * p[1] + c[4],
            c[2] * p[0] + c[3] * p[1] + c[5],
        ]
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> f64 {
        self.coeffs[0] * self.coeffs[3] - self.coeffs[1] * self.coeffs[2]
    }

    /// Closed-form inverse: cofactors of the linear part over the
    /// determinant, translation `−M⁻¹·t`. `None` for a singular map.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let [a0, a1, a2, a3, a4, a5] = self.coeffs;
        let b0 = a3 / det;
        let b1 = -a1 / det;
        let b2 = -a2 / det;
        let b3 = a0 / det;
        Some(Self {
            coeffs: [b0, b1, b2, b3, -(b0 * a4 + b1 * a5), -(b2 * a4 + b3 * a5)],
        })
    }

    /// True when every coefficient is finite.
    pub fn is_finite(&self) -> bool {
        self.coeffs.iter().all(|c| c.is_finite())
    }
}

/// Right-hand boundary of a strip: the line `p·(sin θ, cos θ) = max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StripBoundary {
    /// `sin θ` of the rotation taking the line normal onto +y.
    pub sin: f64,
    /// `cos θ`.
    pub cos: f64,
    /// Rotated y of the line itself.
    pub max: f64,
}

impl StripBoundary {
    pub(crate) const INVALID: Self = Self {
        sin: f64::NAN,
        cos: f64::NAN,
        max: f64::NAN,
    };

    /// Rotated y of `p`, comparable against `max`.
    #[inline]
    pub fn rotated_y(&self, p: [f64; 2]) -> f64 {
        p[0] * self.sin + p[1] * self.cos
    }

    /// Boundary through `p0` and `p1` in machine space.
    ///
    /// The origin is projected onto the line and rotated onto the positive
    /// y axis with a full-quadrant angle.
    pub fn machine(p0: [f64; 2], p1: [f64; 2]) -> Self {
        let q = foot_of_origin(p0, p1);
        Self::from_angle(q[0].atan2(q[1]), p0)
    }

    /// Boundary through `p0` and `p1` in image space.
    ///
    /// Uses the single-quadrant angle `atan(x / y)` of the line normal, so
    /// the rotated y always grows toward +y whichever side of the origin
    /// the line passes. Image boundaries may pass through the origin.
    pub fn image(p0: [f64; 2], p1: [f64; 2]) -> Self {
        let q = foot_of_origin(p0, p1);
        let normal = if q[0] == 0.0 && q[1] == 0.0 {
            [p0[1] - p1[1], p1[0] - p0[0]]
        } else {
            q
        };
        Self::from_angle((normal[0] / normal[1]).atan(), p0)
    }

    fn from_angle(theta: f64, on_line: [f64; 2]) -> Self {
        let (sin, cos) = theta.sin_cos();
        Self {
            sin,
            cos,
            max: on_line[0] * sin + on_line[1] * cos,
        }
    }
}

/// Orthogonal projection of the origin onto the line through `p0`, `p1`.
fn foot_of_origin(p0: [f64; 2], p1: [f64; 2]) -> [f64; 2] {
    let d = [p1[0] - p0[0], p1[1] - p0[1]];
    let dd = d[0] * d[0] + d[1] * d[1];
    if dd == 0.0 {
        return p0;
    }
    let t = -(p0[0] * d[0] + p0[1] * d[1]) / dd;
    [p0[0] + t * d[0], p0[1] + t * d[1]]
}
