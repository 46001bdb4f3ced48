use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fmt;
use std::ops::{Mul, Sub};

/// Multiply radians by this to get degrees.
pub const RAD_TO_DEG: f32 = 180.0 / PI;

/// Significant digits kept when a number is printed.
pub const SIGNIFICANT_DIGITS: usize = 6;

/// Prints a number with six significant digits, the way C's `%g` does:
/// trailing zeros are dropped, and very small or large magnitudes switch to
/// exponent form (`1e-05`, `1.23457e+06`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Significant(pub f32);

impl fmt::Display for Significant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = f64::from(self.0);
        if value.is_nan() {
            return f.write_str("nan");
        }
        if value.is_infinite() {
            return f.write_str(if value < 0.0 { "-inf" } else { "inf" });
        }
        if value == 0.0 {
            return f.write_str(if value.is_sign_negative() { "-0" } else { "0" });
        }

        // exponent after rounding to the kept digits
        let scientific = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, value);
        let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);

        if exponent < -4 || exponent >= SIGNIFICANT_DIGITS as i32 {
            let sign = if exponent < 0 { '-' } else { '+' };
            write!(f, "{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
        } else {
            let decimals = (SIGNIFICANT_DIGITS as i32 - 1 - exponent) as usize;
            f.write_str(trim_fraction(&format!("{:.*}", decimals, value)))
        }
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

/// 3D vector in the tracking coordinate system (millimeters, right-handed,
/// +Y up, -Z pointing away from the user).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Vector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector {
    pub const ZERO: Vector = Vector::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: &Vector) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn magnitude_squared(&self) -> f32 {
        self.dot(self)
    }

    /// Angle between this vector and `other` in radians, in `[0, π]`.
    /// Zero if either vector has no length.
    pub fn angle_to(&self, other: &Vector) -> f32 {
        let denom = self.magnitude_squared() * other.magnitude_squared();
        if denom <= f32::EPSILON {
            return 0.0;
        }
        let cos = (self.dot(other) / denom.sqrt()).clamp(-1.0, 1.0);
        cos.acos()
    }

    /// Angle above the x-z plane, measured around the x axis from -z.
    pub fn pitch(&self) -> f32 {
        self.y.atan2(-self.z)
    }

    /// Angle from -z towards +x, measured around the y axis.
    pub fn yaw(&self) -> f32 {
        self.x.atan2(-self.z)
    }

    /// Angle from -y towards +x, measured around the z axis.
    pub fn roll(&self) -> f32 {
        self.x.atan2(-self.y)
    }
}

impl From<[f32; 3]> for Vector {
    fn from(v: [f32; 3]) -> Self {
        Vector::new(v[0], v[1], v[2])
    }
}

impl From<Vector> for [f32; 3] {
    fn from(v: Vector) -> Self {
        [v.x, v.y, v.z]
    }
}

impl Sub for Vector {
    type Output = Vector;

    fn sub(self, rhs: Vector) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Three comma separated components in parentheses, so one vector fills the
/// X, Y and Z columns of a CSV row.
impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            Significant(self.x),
            Significant(self.y),
            Significant(self.z)
        )
    }
}

/// Orthonormal 3x3 basis, stored as rows `[x_basis, y_basis, z_basis]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f32; 3]; 3]", into = "[[f32; 3]; 3]")]
pub struct Matrix {
    pub rows: [[f32; 3]; 3],
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        rows: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    pub fn transpose(&self) -> Matrix {
        let m = &self.rows;
        Matrix {
            rows: [
                [m[0][0], m[1][0], m[2][0]],
                [m[0][1], m[1][1], m[2][1]],
                [m[0][2], m[1][2], m[2][2]],
            ],
        }
    }

    /// Inverse of a rotation-only basis.
    pub fn rigid_inverse(&self) -> Matrix {
        self.transpose()
    }

    /// Euler angles `[yaw, roll, pitch]` in degrees, in the channel order
    /// (Z, X, Y) used by the BVH writer.
    pub fn euler_zxy_deg(&self) -> [f32; 3] {
        let m = &self.rows;
        let yaw = m[2][2].clamp(-1.0, 1.0).acos();
        let pitch = -m[2][0].atan2(m[2][1]);
        let roll = -m[0][2].atan2(m[1][2]);
        [yaw * RAD_TO_DEG, roll * RAD_TO_DEG, pitch * RAD_TO_DEG]
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::IDENTITY
    }
}

impl From<[[f32; 3]; 3]> for Matrix {
    fn from(rows: [[f32; 3]; 3]) -> Self {
        Matrix { rows }
    }
}

impl From<Matrix> for [[f32; 3]; 3] {
    fn from(m: Matrix) -> Self {
        m.rows
    }
}

impl Mul for Matrix {
    type Output = Matrix;

    fn mul(self, rhs: Matrix) -> Matrix {
        let mut rows = [[0.0f32; 3]; 3];
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.rows[i][k] * rhs.rows[k][j]).sum();
            }
        }
        Matrix { rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_of_up_vector_is_quarter_turn() {
        let up = Vector::new(0.0, 1.0, 0.0);
        assert!((up.pitch() * RAD_TO_DEG - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_forward_vector_angles() {
        let forward = Vector::new(0.0, 0.0, -1.0);
        assert!(forward.pitch().abs() < 1e-6);
        assert!(forward.yaw().abs() < 1e-6);

        let right = Vector::new(1.0, 0.0, 0.0);
        assert!((right.yaw() - PI / 2.0).abs() < 1e-6);

        let down = Vector::new(0.0, -1.0, 0.0);
        assert!(down.roll().abs() < 1e-6);
    }

    #[test]
    fn test_angle_to() {
        let a = Vector::new(1.0, 0.0, 0.0);
        assert!(a.angle_to(&a).abs() < 1e-6);
        assert!((a.angle_to(&Vector::new(0.0, 2.0, 0.0)) - PI / 2.0).abs() < 1e-6);
        assert!((a.angle_to(&Vector::new(-3.0, 0.0, 0.0)) - PI).abs() < 1e-6);
        assert_eq!(a.angle_to(&Vector::ZERO), 0.0);
    }

    #[test]
    fn test_display_fills_three_columns() {
        let v = Vector::new(1.5, -2.0, 0.25);
        assert_eq!(v.to_string(), "(1.5, -2, 0.25)");
        let v = Vector::new(12.345678, -180.00002, 0.1);
        assert_eq!(v.to_string(), "(12.3457, -180, 0.1)");
    }

    #[test]
    fn test_six_significant_digits() {
        let cases = [
            (12.345678, "12.3457"),
            (90.00001, "90"),
            (250.0, "250"),
            (-20.5, "-20.5"),
            (0.3, "0.3"),
            (123456.7, "123457"),
            (999999.6, "1e+06"),
            (1234567.0, "1.23457e+06"),
            (0.0001, "0.0001"),
            (0.00001234, "1.234e-05"),
            (0.0, "0"),
            (-0.0, "-0"),
        ];
        for (value, expected) in cases {
            assert_eq!(Significant(value).to_string(), expected, "{}", value);
        }
        assert_eq!(Significant(f32::NAN).to_string(), "nan");
    }

    #[test]
    fn test_rigid_inverse_undoes_rotation() {
        // 90 degrees about z
        let r = Matrix::from([[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        assert_eq!(r * r.rigid_inverse(), Matrix::IDENTITY);
    }

    #[test]
    fn test_vector_serde_as_array() {
        let v: Vector = serde_json::from_str("[1.0, 2.0, 3.0]").unwrap();
        assert_eq!(v, Vector::new(1.0, 2.0, 3.0));
        assert_eq!(serde_json::to_string(&v).unwrap(), "[1.0,2.0,3.0]");
    }
}
