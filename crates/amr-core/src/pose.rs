use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::constants::EPSILON;

/// 3-vector in metres. Serialized as `[x, y, z]`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PartialEq for Vec3 {
    fn eq(&self, other: &Self) -> bool {
        (self.x - other.x).abs() < EPSILON
            && (self.y - other.y).abs() < EPSILON
            && (self.z - other.z).abs() < EPSILON
    }
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Same value on all three axes.
    pub const fn splat(v: f64) -> Self {
        Self::new(v, v, v)
    }

    pub fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(arr: [f64; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

/// Unit quaternion representing an orientation.
///
/// Always normalized. q and -q describe the same rotation, so equality
/// accepts either sign.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PartialEq for Quaternion {
    fn eq(&self, other: &Self) -> bool {
        let direct = (self.w - other.w).abs() < EPSILON
            && (self.x - other.x).abs() < EPSILON
            && (self.y - other.y).abs() < EPSILON
            && (self.z - other.z).abs() < EPSILON;
        direct
            || ((self.w + other.w).abs() < EPSILON
                && (self.x + other.x).abs() < EPSILON
                && (self.y + other.y).abs() < EPSILON
                && (self.z + other.z).abs() < EPSILON)
    }
}

impl Quaternion {
    /// Create a new quaternion, automatically normalized.
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }.normalize()
    }

    /// Identity quaternion (1, 0, 0, 0).
    pub fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Rotation of `angle` radians about `axis`. A zero axis yields identity.
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        let n = axis.norm();
        if n < EPSILON {
            return Self::identity();
        }
        let half = angle / 2.0;
        let s = half.sin() / n;
        Self::new(half.cos(), axis.x * s, axis.y * s, axis.z * s)
    }

    /// Normalize to unit length. Returns identity if near-zero magnitude.
    pub fn normalize(self) -> Self {
        let norm = self.dot(self).sqrt();
        if norm < EPSILON {
            return Self::identity();
        }
        Self {
            w: self.w / norm,
            x: self.x / norm,
            y: self.y / norm,
            z: self.z / norm,
        }
    }

    /// 4D dot product.
    pub fn dot(self, other: Self) -> f64 {
        self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Rotate a vector: q · v · q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        // v' = v + 2w(u × v) + 2u × (u × v), u = vector part
        let u = Vec3::new(self.x, self.y, self.z);
        let t = u.cross(v).scale(2.0);
        v + t.scale(self.w) + u.cross(t)
    }

    /// Convert to [w, x, y, z] array for serialization.
    pub fn to_array(self) -> [f64; 4] {
        [self.w, self.x, self.y, self.z]
    }

    /// Create from [w, x, y, z] array.
    pub fn from_array(arr: [f64; 4]) -> Self {
        Self::new(arr[0], arr[1], arr[2], arr[3])
    }
}

impl From<[f64; 4]> for Quaternion {
    fn from(arr: [f64; 4]) -> Self {
        Self::from_array(arr)
    }
}

impl From<Quaternion> for [f64; 4] {
    fn from(q: Quaternion) -> Self {
        q.to_array()
    }
}

/// Rigid transform: rotate, then translate.
///
/// A marker's centre pose maps points in the image's local frame into
/// world space; overlay anchors are bound to it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quaternion,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    pub fn new(translation: Vec3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation: rotation.normalize(),
        }
    }

    pub fn identity() -> Self {
        Self {
            translation: Vec3::zero(),
            rotation: Quaternion::identity(),
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quaternion::identity(),
        }
    }

    /// Map a point from this pose's local frame into the parent frame.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation.rotate(p) + self.translation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn assert_vec_eq(a: Vec3, b: Vec3) {
        assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-9);
        assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-9);
        assert_abs_diff_eq!(a.z, b.z, epsilon = 1e-9);
    }

    #[test]
    fn test_normalize_near_zero() {
        let q = Quaternion::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(q, Quaternion::identity());
    }

    #[test]
    fn test_antipodal_equal() {
        let q = Quaternion::new(0.3, 0.1, -0.5, 0.2);
        let flipped = Quaternion::from_array(q.to_array().map(|c| -c));
        assert_eq!(q, flipped);
    }

    #[test]
    fn test_rotate_quarter_turn_about_y() {
        let q = Quaternion::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), FRAC_PI_2);
        let v = q.rotate(Vec3::new(1.0, 0.0, 0.0));
        assert_vec_eq(v, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_rotate_preserves_length() {
        let q = Quaternion::new(0.9, 0.2, -0.3, 0.1);
        let v = Vec3::new(1.5, -2.0, 0.25);
        assert_abs_diff_eq!(q.rotate(v).norm(), v.norm(), epsilon = 1e-9);
    }

    #[test]
    fn test_zero_axis_is_identity() {
        let q = Quaternion::from_axis_angle(Vec3::zero(), 1.0);
        assert_eq!(q, Quaternion::identity());
    }

    #[test]
    fn test_transform_point() {
        let pose = Pose::new(
            Vec3::new(0.0, 0.0, -1.0),
            Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), FRAC_PI_2),
        );
        let p = pose.transform_point(Vec3::new(1.0, 0.0, 0.0));
        assert_vec_eq(p, Vec3::new(0.0, 1.0, -1.0));
    }

    #[test]
    fn test_serde_array_form() {
        let pose = Pose::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let json = serde_json::to_string(&pose).unwrap();
        assert_eq!(
            json,
            r#"{"translation":[1.0,2.0,3.0],"rotation":[1.0,0.0,0.0,0.0]}"#
        );
    }
}
