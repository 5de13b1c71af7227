//! Analytical velocity fields with known deformation.
//!
//! These are used to prescribe the grid state and to measure the error of particle
//! integration schemes.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::{Matrix2, Vector2};

/// An analytical motion `x(X, t)` of the continuum.
pub trait Motion: std::fmt::Debug {
    fn name(&self) -> &'static str;
    /// Spatial velocity at point `x` and time `time`.
    fn velocity(&self, x: &Vector2, time: f64) -> Vector2;
    /// Partial time derivative of the spatial velocity at a fixed point `x`.
    fn velocity_time_derivative(&self, x: &Vector2, time: f64) -> Vector2;
    /// Spatial velocity gradient `∂v/∂x`.
    fn velocity_gradient(&self, x: &Vector2, time: f64) -> Matrix2;
    /// Deformation gradient `∂x/∂X` at `time`. Both motions here are homogeneous.
    fn analytical_deformation_gradient(&self, time: f64) -> Matrix2;
    /// Current position of the material point initially at `x0`.
    fn analytical_position(&self, x0: &Vector2, time: f64) -> Vector2;
}

/// Counter-clockwise rotation matrix.
pub fn rotation(angle: f64) -> Matrix2 {
    na::Rotation2::new(angle).into_inner()
}

/// Generator of counter-clockwise rotations, `[[0, -1], [1, 0]]`.
pub fn skew() -> Matrix2 {
    Matrix2::new(0.0, -1.0, 1.0, 0.0)
}

/// Rigid rotation at a constant rate about a center translating at a constant velocity.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RigidRotation {
    pub center: Vector2,
    pub translation: Vector2,
    /// Angular rate in radians per unit time.
    pub rate: f64,
}

impl Default for RigidRotation {
    fn default() -> Self {
        RigidRotation {
            center: Vector2::new(0.5, 0.5),
            translation: Vector2::new(0.1, 0.0),
            rate: PI,
        }
    }
}

impl RigidRotation {
    fn omega(&self) -> Matrix2 {
        skew() * self.rate
    }
}

impl Motion for RigidRotation {
    fn name(&self) -> &'static str {
        "rigid_rotation"
    }

    fn velocity(&self, x: &Vector2, time: f64) -> Vector2 {
        self.omega() * (x - self.center - self.translation * time) + self.translation
    }

    fn velocity_time_derivative(&self, _x: &Vector2, _time: f64) -> Vector2 {
        -(self.omega() * self.translation)
    }

    fn velocity_gradient(&self, _x: &Vector2, _time: f64) -> Matrix2 {
        self.omega()
    }

    fn analytical_deformation_gradient(&self, time: f64) -> Matrix2 {
        rotation(self.rate * time)
    }

    fn analytical_position(&self, x0: &Vector2, time: f64) -> Vector2 {
        rotation(self.rate * time) * (x0 - self.center) + self.translation * time + self.center
    }
}

/// Weighted blend of two rigid rotations about fixed centers:
///
/// `x = γ Q₁(t) (X - X₁) + (1 - γ) Q₂(t) (X - X₂) + γ X₁ + (1 - γ) X₂`.
///
/// The deformation gradient `γ Q₁ + (1 - γ) Q₂` is not a rotation unless one weight vanishes,
/// so this motion stretches material. The blend is invertible for `γ ≠ ½`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlendedRotation {
    pub weight: f64,
    pub rates: [f64; 2],
    pub centers: [Vector2; 2],
}

impl Default for BlendedRotation {
    fn default() -> Self {
        BlendedRotation {
            weight: 1.0,
            rates: [PI, 0.5],
            centers: [Vector2::new(0.5, 0.5), Vector2::new(10.0, 10.0)],
        }
    }
}

impl BlendedRotation {
    pub fn new(weight: f64, rates: [f64; 2], centers: [Vector2; 2]) -> Self {
        BlendedRotation {
            weight,
            rates,
            centers,
        }
    }

    fn weights(&self) -> [f64; 2] {
        [self.weight, 1.0 - self.weight]
    }

    fn rotations(&self, time: f64) -> [Matrix2; 2] {
        [rotation(self.rates[0] * time), rotation(self.rates[1] * time)]
    }

    fn mean_center(&self) -> Vector2 {
        let [g1, g2] = self.weights();
        self.centers[0] * g1 + self.centers[1] * g2
    }

    /// Material point currently at `x`.
    fn reference_position(&self, x: &Vector2, time: f64) -> Vector2 {
        let [g1, g2] = self.weights();
        let [q1, q2] = self.rotations(time);
        let shift = q1 * self.centers[0] * g1 + q2 * self.centers[1] * g2;
        self.inverse_blend(time) * (x - self.mean_center() + shift)
    }

    fn inverse_blend(&self, time: f64) -> Matrix2 {
        self.analytical_deformation_gradient(time)
            .try_inverse()
            .unwrap_or_else(|| Matrix2::from_element(f64::NAN))
    }

    /// Velocity contributed by each rotation, `Ωₖ Qₖ (X - Xₖ)`.
    fn partial_velocities(&self, x: &Vector2, time: f64) -> [Vector2; 2] {
        let x_ref = self.reference_position(x, time);
        let q = self.rotations(time);
        let mut v = [Vector2::zeros(); 2];
        for k in 0..2 {
            v[k] = skew() * q[k] * (x_ref - self.centers[k]) * self.rates[k];
        }
        v
    }
}

impl Motion for BlendedRotation {
    fn name(&self) -> &'static str {
        "blended_rotation"
    }

    fn velocity(&self, x: &Vector2, time: f64) -> Vector2 {
        let [g1, g2] = self.weights();
        let [v1, v2] = self.partial_velocities(x, time);
        v1 * g1 + v2 * g2
    }

    fn velocity_time_derivative(&self, x: &Vector2, time: f64) -> Vector2 {
        // Material acceleration minus the convective part.
        let [g1, g2] = self.weights();
        let [v1, v2] = self.partial_velocities(x, time);
        let material = (skew() * v1 * self.rates[0]) * g1 + (skew() * v2 * self.rates[1]) * g2;
        material - self.velocity_gradient(x, time) * self.velocity(x, time)
    }

    fn velocity_gradient(&self, _x: &Vector2, time: f64) -> Matrix2 {
        let [g1, g2] = self.weights();
        let [q1, q2] = self.rotations(time);
        let omega_q = skew() * q1 * (self.rates[0] * g1) + skew() * q2 * (self.rates[1] * g2);
        omega_q * self.inverse_blend(time)
    }

    fn analytical_deformation_gradient(&self, time: f64) -> Matrix2 {
        let [g1, g2] = self.weights();
        let [q1, q2] = self.rotations(time);
        q1 * g1 + q2 * g2
    }

    fn analytical_position(&self, x0: &Vector2, time: f64) -> Vector2 {
        let [g1, g2] = self.weights();
        let [q1, q2] = self.rotations(time);
        q1 * (x0 - self.centers[0]) * g1 + q2 * (x0 - self.centers[1]) * g2 + self.mean_center()
    }
}

/// Serializable selection of a motion.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MotionKind {
    Rigid(RigidRotation),
    Blended(BlendedRotation),
}

impl MotionKind {
    pub fn build(&self) -> Box<dyn Motion> {
        match *self {
            MotionKind::Rigid(m) => Box::new(m),
            MotionKind::Blended(m) => Box::new(m),
        }
    }
}
