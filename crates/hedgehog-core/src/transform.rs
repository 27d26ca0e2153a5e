//! Rigid transform algebra for field poses.
//!
//! Rotations are stored as raw (not necessarily unit) quaternions so that
//! transforms can be summed and divided componentwise when averaging. Every
//! operation that actually rotates something normalizes first.

use core::ops::{Add, Div, Mul, Neg, Sub};
use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONFIGURATION
// ---------------------------------------------------------------------------
pub type Scalar = f64;

pub type Vector3r = Vector3<Scalar>;
type Quaternionr = Quaternion<Scalar>;
type UnitQuaternionr = UnitQuaternion<Scalar>;

pub const INCHES_TO_METERS: Scalar = 0.0254;

/// Below this norm a quaternion carries no usable orientation.
const DEGENERATE_NORM: Scalar = 1e-12;

// ---------------------------------------------------------------------------
// TRANSLATION
// ---------------------------------------------------------------------------

/// A 3D offset in meters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub x: Scalar,
    pub y: Scalar,
    pub z: Scalar,
}

impl Translation {
    pub const fn new(x: Scalar, y: Scalar, z: Scalar) -> Self {
        Self { x, y, z }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn from_inches(x: Scalar, y: Scalar, z: Scalar) -> Self {
        Self::new(
            x * INCHES_TO_METERS,
            y * INCHES_TO_METERS,
            z * INCHES_TO_METERS,
        )
    }

    pub fn to_vector(self) -> Vector3r {
        Vector3r::new(self.x, self.y, self.z)
    }

    pub fn norm(self) -> Scalar {
        self.to_vector().norm()
    }

    /// Euclidean distance between two points.
    pub fn distance(self, other: Translation) -> Scalar {
        (self - other).norm()
    }

    pub fn abs(self) -> Self {
        Self::new(self.x.abs(), self.y.abs(), self.z.abs())
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

impl From<Vector3r> for Translation {
    fn from(v: Vector3r) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl Neg for Translation {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Add for Translation {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Translation {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<Scalar> for Translation {
    type Output = Self;
    fn mul(self, rhs: Scalar) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<Scalar> for Translation {
    type Output = Self;
    fn div(self, rhs: Scalar) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

// ---------------------------------------------------------------------------
// ROTATION
// ---------------------------------------------------------------------------

/// An orientation stored as quaternion components `w + xi + yj + zk`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub w: Scalar,
    pub x: Scalar,
    pub y: Scalar,
    pub z: Scalar,
}

impl Default for Rotation {
    fn default() -> Self {
        Self::identity()
    }
}

impl Rotation {
    pub const fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// All-zero quaternion. Only meaningful as an averaging accumulator.
    pub const fn zero() -> Self {
        Self {
            w: 0.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    pub fn from_axis_angle(axis: Vector3r, radians: Scalar) -> Self {
        Self::from_unit(UnitQuaternionr::from_axis_angle(
            &Unit::new_normalize(axis),
            radians,
        ))
    }

    /// Rotation about the field's vertical (z) axis.
    pub fn from_yaw_degrees(degrees: Scalar) -> Self {
        Self::from_axis_angle(Vector3r::z(), degrees.to_radians())
    }

    pub fn from_unit(q: UnitQuaternionr) -> Self {
        Self::from_quaternion(q.into_inner())
    }

    pub fn from_quaternion(q: Quaternionr) -> Self {
        Self {
            w: q.w,
            x: q.i,
            y: q.j,
            z: q.k,
        }
    }

    pub fn to_quaternion(self) -> Quaternionr {
        Quaternionr::new(self.w, self.x, self.y, self.z)
    }

    /// Normalized form. A degenerate quaternion acts as the identity.
    pub fn to_unit(self) -> UnitQuaternionr {
        UnitQuaternionr::try_new(self.to_quaternion(), DEGENERATE_NORM)
            .unwrap_or_else(UnitQuaternionr::identity)
    }

    pub fn conjugate(self) -> Self {
        Self {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    /// Rotates a vector by this orientation (`q p q*`, normalized).
    pub fn rotate(self, t: Translation) -> Translation {
        self.to_unit().transform_vector(&t.to_vector()).into()
    }

    /// `self` followed by `other` in the rotated frame (`self * other`).
    pub fn compose(self, other: Rotation) -> Self {
        Self::from_quaternion(self.to_quaternion() * other.to_quaternion())
    }

    pub fn yaw_degrees(self) -> Scalar {
        self.to_unit().euler_angles().2.to_degrees()
    }

    /// Four-component dot product of the raw quaternions.
    pub fn dot(self, other: Rotation) -> Scalar {
        self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Same orientation, with the sign that lies in `reference`'s hemisphere.
    pub fn aligned_to(self, reference: Rotation) -> Self {
        if self.dot(reference) < 0.0 {
            self * -1.0
        } else {
            self
        }
    }

    /// Unit-length form. A degenerate quaternion becomes the identity.
    pub fn normalized(self) -> Self {
        Self::from_unit(self.to_unit())
    }

    /// Angle in radians between two orientations, ignoring quaternion sign.
    pub fn angle_to(self, other: Rotation) -> Scalar {
        self.to_unit().angle_to(&other.to_unit())
    }
}

impl Add for Rotation {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::from_quaternion(self.to_quaternion() + rhs.to_quaternion())
    }
}

impl Sub for Rotation {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::from_quaternion(self.to_quaternion() - rhs.to_quaternion())
    }
}

impl Mul<Scalar> for Rotation {
    type Output = Self;
    fn mul(self, rhs: Scalar) -> Self {
        Self::from_quaternion(self.to_quaternion() * rhs)
    }
}

impl Div<Scalar> for Rotation {
    type Output = Self;
    fn div(self, rhs: Scalar) -> Self {
        Self::from_quaternion(self.to_quaternion() / rhs)
    }
}

// ---------------------------------------------------------------------------
// RIGID TRANSFORM
// ---------------------------------------------------------------------------

/// A pose, or the relative transform between two frames.
///
/// The componentwise `Add`, `Sub`, `Mul` and `Div` impls exist for averaging
/// and deviation statistics; they are not pose composition. Use
/// [`RigidTransform::transform_by`] for that.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    pub translation: Translation,
    pub rotation: Rotation,
}

impl RigidTransform {
    pub const fn new(translation: Translation, rotation: Rotation) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub const fn identity() -> Self {
        Self::new(Translation::zero(), Rotation::identity())
    }

    /// All-zero transform, the starting point for sums.
    pub const fn zero() -> Self {
        Self::new(Translation::zero(), Rotation::zero())
    }

    pub const fn from_translation(translation: Translation) -> Self {
        Self::new(translation, Rotation::identity())
    }

    pub fn inverse(self) -> Self {
        let inv_rot = self.rotation.conjugate();
        Self::new(inv_rot.rotate(-self.translation), inv_rot)
    }

    /// Applies `other` expressed in this transform's frame: `self ∘ other`.
    pub fn transform_by(self, other: RigidTransform) -> Self {
        Self::new(
            self.translation + self.rotation.rotate(other.translation),
            self.rotation.compose(other.rotation),
        )
    }

    /// Distance between the translation parts only.
    pub fn distance_to(self, other: RigidTransform) -> Scalar {
        self.translation.distance(other.translation)
    }

    pub fn abs(self) -> Self {
        Self::new(self.translation.abs(), Rotation::zero())
    }

    /// Componentwise mean. The rotation part is a plain average of quaternion
    /// components, which is only a reasonable orientation when the inputs
    /// are close together.
    ///
    /// `q` and `-q` are the same rotation, so every quaternion is first moved
    /// into the first one's hemisphere. The mean rotation is normalized.
    pub fn average(transforms: &[RigidTransform]) -> Option<Self> {
        let reference = transforms.first()?.rotation;
        let sum = transforms.iter().fold(Self::zero(), |acc, t| {
            acc + Self::new(t.translation, t.rotation.aligned_to(reference))
        });
        let mean = sum / transforms.len() as Scalar;
        Some(Self::new(mean.translation, mean.rotation.normalized()))
    }

    /// Mean absolute per-axis offset of `transforms` from `center`.
    pub fn mean_abs_deviation(transforms: &[RigidTransform], center: RigidTransform) -> Translation {
        if transforms.is_empty() {
            return Translation::zero();
        }
        let sum = transforms
            .iter()
            .fold(Translation::zero(), |acc, t| {
                acc + (t.translation - center.translation).abs()
            });
        sum / transforms.len() as Scalar
    }

    /// True when both the translation and the rotation match within `tol`.
    pub fn approx_eq(self, other: RigidTransform, tol: Scalar) -> bool {
        self.distance_to(other) <= tol && self.rotation.angle_to(other.rotation) <= tol
    }
}

impl Add for RigidTransform {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.translation + rhs.translation,
            self.rotation + rhs.rotation,
        )
    }
}

impl Sub for RigidTransform {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(
            self.translation - rhs.translation,
            self.rotation - rhs.rotation,
        )
    }
}

impl Mul<Scalar> for RigidTransform {
    type Output = Self;
    fn mul(self, rhs: Scalar) -> Self {
        Self::new(self.translation * rhs, self.rotation * rhs)
    }
}

impl Div<Scalar> for RigidTransform {
    type Output = Self;
    fn div(self, rhs: Scalar) -> Self {
        Self::new(self.translation / rhs, self.rotation / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: Scalar = 1e-6;

    fn sample_transforms() -> Vec<RigidTransform> {
        vec![
            RigidTransform::identity(),
            RigidTransform::new(
                Translation::new(1.0, -2.0, 0.5),
                Rotation::from_yaw_degrees(37.0),
            ),
            RigidTransform::new(
                Translation::new(-4.2, 0.3, 7.9),
                Rotation::from_axis_angle(Vector3r::new(1.0, 2.0, -0.5), 2.1),
            ),
            RigidTransform::new(
                Translation::new(0.0, 15.5, 0.46),
                Rotation::from_yaw_degrees(180.0),
            ),
        ]
    }

    #[test]
    fn test_compose_with_inverse_is_identity() {
        for t in sample_transforms() {
            let result = t.transform_by(t.inverse());
            assert!(
                result.approx_eq(RigidTransform::identity(), TOL),
                "{:?} composed with its inverse gave {:?}",
                t,
                result
            );
            let result = t.inverse().transform_by(t);
            assert!(result.approx_eq(RigidTransform::identity(), TOL));
        }
    }

    #[test]
    fn test_yaw_rotates_x_onto_y() {
        let r = Rotation::from_yaw_degrees(90.0);
        let v = r.rotate(Translation::new(1.0, 0.0, 0.0));
        assert!(v.distance(Translation::new(0.0, 1.0, 0.0)) < TOL);
        assert!((r.yaw_degrees() - 90.0).abs() < TOL);
    }

    #[test]
    fn test_transform_by_applies_parent_rotation() {
        let parent = RigidTransform::new(
            Translation::new(2.0, 3.0, 0.0),
            Rotation::from_yaw_degrees(180.0),
        );
        let child = RigidTransform::from_translation(Translation::new(1.0, 0.0, 0.0));
        let out = parent.transform_by(child);
        assert!(out.translation.distance(Translation::new(1.0, 3.0, 0.0)) < TOL);
        assert!((out.rotation.yaw_degrees().abs() - 180.0).abs() < TOL);
    }

    #[test]
    fn test_average_of_identical_transforms() {
        let t = sample_transforms()[1];
        let avg = RigidTransform::average(&[t, t, t]).unwrap();
        assert!(avg.approx_eq(t, TOL));
        assert!(RigidTransform::mean_abs_deviation(&[t, t, t], avg).norm() < TOL);
    }

    #[test]
    fn test_average_ignores_quaternion_sign() {
        let a = RigidTransform::new(Translation::new(2.0, 9.0, 0.0), Rotation::from_yaw_degrees(80.0));
        let b = RigidTransform::new(Translation::new(4.0, 11.0, 0.0), a.rotation * -1.0);
        let avg = RigidTransform::average(&[a, b]).unwrap();
        assert!(avg.translation.distance(Translation::new(3.0, 10.0, 0.0)) < TOL);
        assert!((avg.rotation.yaw_degrees() - 80.0).abs() < 1e-6);
        assert!((avg.rotation.to_quaternion().norm() - 1.0).abs() < TOL);

        // Same set, negated sample first.
        let avg = RigidTransform::average(&[b, a]).unwrap();
        assert!((avg.rotation.yaw_degrees() - 80.0).abs() < 1e-6);
    }

    #[test]
    fn test_average_rotation_is_unit() {
        let a = RigidTransform::from_translation(Translation::zero());
        let b = RigidTransform::new(Translation::zero(), Rotation::from_yaw_degrees(20.0));
        let avg = RigidTransform::average(&[a, b]).unwrap();
        assert!((avg.rotation.to_quaternion().norm() - 1.0).abs() < TOL);
        assert!((avg.rotation.yaw_degrees() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_average_of_nothing() {
        assert!(RigidTransform::average(&[]).is_none());
    }

    #[test]
    fn test_mean_abs_deviation_is_per_axis() {
        let center = RigidTransform::from_translation(Translation::new(1.0, 1.0, 1.0));
        let samples = [
            RigidTransform::from_translation(Translation::new(0.0, 1.0, 1.0)),
            RigidTransform::from_translation(Translation::new(2.0, 1.0, 3.0)),
        ];
        let dev = RigidTransform::mean_abs_deviation(&samples, center);
        assert!((dev.x - 1.0).abs() < TOL);
        assert!(dev.y.abs() < TOL);
        assert!((dev.z - 1.0).abs() < TOL);
    }

    #[test]
    fn test_degenerate_rotation_acts_as_identity() {
        let v = Translation::new(1.0, 2.0, 3.0);
        assert_eq!(Rotation::zero().rotate(v), v);
    }

    #[test]
    fn test_inches() {
        let t = Translation::from_inches(42.19, 610.77, 18.22);
        assert!((t.x - 1.071626).abs() < TOL);
        assert!((t.y - 15.513558).abs() < TOL);
        assert!((t.z - 0.462788).abs() < TOL);
    }
}
