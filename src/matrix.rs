/// A 2D affine transform stored as six coefficients.
///
/// A point `(x, y)` maps to `(a*x + c*y + e, b*x + d*y + f)`, the same
/// convention as a canvas `setTransform(a, b, c, d, e, f)` call.
///
/// The builder methods (`translate`, `scale`, `rotate`) append their
/// operation *after* the existing transform, so
/// `Matrix::IDENTITY.translate(-ox, -oy).scale(sx, sy).rotate(r).translate(x, y)`
/// reads in the order the operations are applied to a point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

/// Smallest determinant magnitude used by [`Matrix::invert`].
///
/// Singular transforms (for example a zero scale) get this value substituted,
/// so the result is only an approximation of an inverse.
pub const MIN_DETERMINANT: f32 = 1e-6;

impl Matrix {
    /// Identity matrix (no transformation)
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn from_translate(x: f32, y: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, x, y)
    }

    pub fn from_scale(sx: f32, sy: f32) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Rotation about the origin, in degrees (clockwise on a y-down surface).
    pub fn from_rotation(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    /// Multiply two matrices.
    ///
    /// With `is_right == false` the result applies `self` first and `other`
    /// second. With `is_right == true` it applies `other` first and `self`
    /// second.
    pub fn compose(&self, other: &Matrix, is_right: bool) -> Matrix {
        let (first, second) = if is_right {
            (other, self)
        } else {
            (self, other)
        };
        // second ∘ first
        Matrix {
            a: second.a * first.a + second.c * first.b,
            b: second.b * first.a + second.d * first.b,
            c: second.a * first.c + second.c * first.d,
            d: second.b * first.c + second.d * first.d,
            e: second.a * first.e + second.c * first.f + second.e,
            f: second.b * first.e + second.d * first.f + second.f,
        }
    }

    /// Apply `other` after this transform.
    pub fn then(&self, other: &Matrix) -> Matrix {
        self.compose(other, false)
    }

    pub fn translate(&self, x: f32, y: f32) -> Matrix {
        if x == 0.0 && y == 0.0 {
            return *self;
        }
        self.then(&Matrix::from_translate(x, y))
    }

    pub fn scale(&self, sx: f32, sy: f32) -> Matrix {
        if sx == 1.0 && sy == 1.0 {
            return *self;
        }
        self.then(&Matrix::from_scale(sx, sy))
    }

    pub fn rotate(&self, degrees: f32) -> Matrix {
        if degrees == 0.0 {
            return *self;
        }
        self.then(&Matrix::from_rotation(degrees))
    }

    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    /// Closed-form inverse.
    ///
    /// Never fails: a (near) zero determinant is replaced by
    /// [`MIN_DETERMINANT`] with the same sign, which yields a best-effort
    /// approximation rather than a true inverse.
    pub fn invert(&self) -> Matrix {
        let mut det = self.determinant();
        if det.abs() < MIN_DETERMINANT {
            det = if det < 0.0 {
                -MIN_DETERMINANT
            } else {
                MIN_DETERMINANT
            };
        }
        let inv = 1.0 / det;

        Matrix {
            a: self.d * inv,
            b: -self.b * inv,
            c: -self.c * inv,
            d: self.a * inv,
            e: (self.c * self.f - self.d * self.e) * inv,
            f: (self.b * self.e - self.a * self.f) * inv,
        }
    }

    /// Transform a 2D point by this matrix
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Whether every coefficient is within `epsilon` of `other`'s.
    pub fn approx_eq(&self, other: &Matrix, epsilon: f32) -> bool {
        (self.a - other.a).abs() <= epsilon
            && (self.b - other.b).abs() <= epsilon
            && (self.c - other.c).abs() <= epsilon
            && (self.d - other.d).abs() <= epsilon
            && (self.e - other.e).abs() <= epsilon
            && (self.f - other.f).abs() <= epsilon
    }

    pub fn to_skia(&self) -> resvg::tiny_skia::Transform {
        resvg::tiny_skia::Transform::from_row(self.a, self.b, self.c, self.d, self.e, self.f)
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}
