// Planar rigid-body geometry for the field frame
//
// Angles are radians, distances meters. Headings are stored unwrapped so a
// pose can keep counting turns; use `angle_modulus` when the shortest
// rotation is wanted.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::{Add, Mul, Neg, Sub};

/// Below this magnitude the exp/log series expansions are used instead of
/// the closed forms (which divide by the angle).
const SMALL_ANGLE: f64 = 1e-9;

/// Wraps `value` into `[min, max)`.
pub fn input_modulus(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    let offset = (value - min).rem_euclid(span);
    min + offset
}

/// Wraps an angle into `[-pi, pi)`.
pub fn angle_modulus(radians: f64) -> f64 {
    input_modulus(radians, -PI, PI)
}

/// A rotation in the plane
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation2d {
    radians: f64,
}

impl Rotation2d {
    pub const ZERO: Self = Self { radians: 0.0 };

    pub const fn from_radians(radians: f64) -> Self {
        Self { radians }
    }

    pub fn from_degrees(degrees: f64) -> Self {
        Self::from_radians(degrees.to_radians())
    }

    pub fn radians(&self) -> f64 {
        self.radians
    }

    pub fn degrees(&self) -> f64 {
        self.radians.to_degrees()
    }

    pub fn cos(&self) -> f64 {
        self.radians.cos()
    }

    pub fn sin(&self) -> f64 {
        self.radians.sin()
    }

    /// Same rotation expressed in `[-pi, pi)`
    pub fn wrapped(&self) -> Self {
        Self::from_radians(angle_modulus(self.radians))
    }

    /// Smallest signed rotation taking `self` onto `target`
    pub fn shortest_to(&self, target: Rotation2d) -> Rotation2d {
        Self::from_radians(angle_modulus(target.radians - self.radians))
    }
}

impl Add for Rotation2d {
    type Output = Rotation2d;

    fn add(self, rhs: Rotation2d) -> Rotation2d {
        Rotation2d::from_radians(self.radians + rhs.radians)
    }
}

impl Sub for Rotation2d {
    type Output = Rotation2d;

    fn sub(self, rhs: Rotation2d) -> Rotation2d {
        Rotation2d::from_radians(self.radians - rhs.radians)
    }
}

impl Neg for Rotation2d {
    type Output = Rotation2d;

    fn neg(self) -> Rotation2d {
        Rotation2d::from_radians(-self.radians)
    }
}

impl Mul<f64> for Rotation2d {
    type Output = Rotation2d;

    fn mul(self, scalar: f64) -> Rotation2d {
        Rotation2d::from_radians(self.radians * scalar)
    }
}

/// A displacement in the plane
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Translation2d {
    pub x: f64,
    pub y: f64,
}

impl Translation2d {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(&self, other: Translation2d) -> f64 {
        (other - *self).norm()
    }

    /// Counter-clockwise rotation about the origin
    pub fn rotate_by(&self, rotation: Rotation2d) -> Translation2d {
        let (sin, cos) = rotation.radians().sin_cos();
        Translation2d::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}

impl Add for Translation2d {
    type Output = Translation2d;

    fn add(self, rhs: Translation2d) -> Translation2d {
        Translation2d::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Translation2d {
    type Output = Translation2d;

    fn sub(self, rhs: Translation2d) -> Translation2d {
        Translation2d::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Translation2d {
    type Output = Translation2d;

    fn neg(self) -> Translation2d {
        Translation2d::new(-self.x, -self.y)
    }
}

impl Mul<f64> for Translation2d {
    type Output = Translation2d;

    fn mul(self, scalar: f64) -> Translation2d {
        Translation2d::new(self.x * scalar, self.y * scalar)
    }
}

/// A rigid transform expressed in the frame of the pose it is applied to
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform2d {
    pub translation: Translation2d,
    pub rotation: Rotation2d,
}

impl Transform2d {
    pub const IDENTITY: Self = Self {
        translation: Translation2d::ZERO,
        rotation: Rotation2d::ZERO,
    };

    pub fn new(translation: Translation2d, rotation: Rotation2d) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn inverse(&self) -> Transform2d {
        Transform2d::new(
            (-self.translation).rotate_by(-self.rotation),
            -self.rotation,
        )
    }

    /// Applies `self` then `other` (in the frame left by `self`)
    pub fn then(&self, other: Transform2d) -> Transform2d {
        Pose2d::ORIGIN.plus(*self).plus(other).minus(Pose2d::ORIGIN)
    }
}

/// A constant-velocity arc: displacement along and across the heading plus
/// heading change, all in the starting pose's frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Twist2d {
    pub dx: f64,
    pub dy: f64,
    pub dtheta: f64,
}

impl Twist2d {
    pub const fn new(dx: f64, dy: f64, dtheta: f64) -> Self {
        Self { dx, dy, dtheta }
    }
}

/// Position and heading in the field frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose2d {
    pub translation: Translation2d,
    pub rotation: Rotation2d,
}

impl Pose2d {
    pub const ORIGIN: Self = Self {
        translation: Translation2d::ZERO,
        rotation: Rotation2d::ZERO,
    };

    pub fn new(x: f64, y: f64, rotation: Rotation2d) -> Self {
        Self {
            translation: Translation2d::new(x, y),
            rotation,
        }
    }

    pub fn x(&self) -> f64 {
        self.translation.x
    }

    pub fn y(&self) -> f64 {
        self.translation.y
    }

    /// Moves the pose by a transform expressed in the pose's own frame
    pub fn plus(&self, transform: Transform2d) -> Pose2d {
        Pose2d {
            translation: self.translation + transform.translation.rotate_by(self.rotation),
            rotation: self.rotation + transform.rotation,
        }
    }

    /// Transform that takes `other` onto `self`, expressed in `other`'s frame
    pub fn minus(&self, other: Pose2d) -> Transform2d {
        let pose = self.relative_to(other);
        Transform2d::new(pose.translation, pose.rotation)
    }

    /// `self` seen from `origin`
    pub fn relative_to(&self, origin: Pose2d) -> Pose2d {
        Pose2d {
            translation: (self.translation - origin.translation).rotate_by(-origin.rotation),
            rotation: self.rotation - origin.rotation,
        }
    }

    /// Pose reached by following `twist` from `self`
    pub fn exp(&self, twist: Twist2d) -> Pose2d {
        let Twist2d { dx, dy, dtheta } = twist;
        let (sin_theta, cos_theta) = dtheta.sin_cos();

        let (s, c) = if dtheta.abs() < SMALL_ANGLE {
            (1.0 - dtheta * dtheta / 6.0, 0.5 * dtheta)
        } else {
            (sin_theta / dtheta, (1.0 - cos_theta) / dtheta)
        };

        self.plus(Transform2d::new(
            Translation2d::new(dx * s - dy * c, dx * c + dy * s),
            Rotation2d::from_radians(dtheta),
        ))
    }

    /// Twist that `exp` would turn into `end`, starting from `self`
    pub fn log(&self, end: Pose2d) -> Twist2d {
        let transform = end.relative_to(*self);
        let dtheta = transform.rotation.radians();
        let half_dtheta = dtheta / 2.0;
        let cos_minus_one = dtheta.cos() - 1.0;

        let half_theta_by_tan = if cos_minus_one.abs() < SMALL_ANGLE {
            1.0 - dtheta * dtheta / 12.0
        } else {
            -(half_dtheta * dtheta.sin()) / cos_minus_one
        };

        let correction = Rotation2d::from_radians((-half_dtheta).atan2(half_theta_by_tan));
        let translation = transform
            .translation
            .rotate_by(correction)
            * half_theta_by_tan.hypot(half_dtheta);

        Twist2d::new(translation.x, translation.y, dtheta)
    }
}
