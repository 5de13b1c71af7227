//! Explicit Runge-Kutta integration of particle position and deformation gradient.

use serde::{Deserialize, Serialize};

use crate::field::FlowField;
use crate::{Error, Matrix2, Vector2};

/// Particle update scheme.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scheme {
    /// Forward Euler.
    ExplicitEuler,
    /// Explicit midpoint rule.
    MidPoint,
    /// Heun's method (explicit trapezoid rule).
    Heun,
    /// Classic fourth order Runge-Kutta.
    RungeKutta4,
}

impl Default for Scheme {
    fn default() -> Self {
        Scheme::RungeKutta4
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Scheme::ExplicitEuler => "explicit_euler",
            Scheme::MidPoint => "midpoint",
            Scheme::Heun => "heun",
            Scheme::RungeKutta4 => "runge_kutta4",
        };
        write!(f, "{}", name)
    }
}

pub const EXPLICIT_EULER: ButcherTableau = ButcherTableau {
    a: &[&[]],
    b: &[1.0],
    c: &[0.0],
    order: 1,
};

pub const MIDPOINT: ButcherTableau = ButcherTableau {
    a: &[&[], &[0.5]],
    b: &[0.0, 1.0],
    c: &[0.0, 0.5],
    order: 2,
};

pub const HEUN: ButcherTableau = ButcherTableau {
    a: &[&[], &[1.0]],
    b: &[0.5, 0.5],
    c: &[0.0, 1.0],
    order: 2,
};

pub const RUNGE_KUTTA4: ButcherTableau = ButcherTableau {
    a: &[&[], &[0.5], &[0.0, 0.5], &[0.0, 0.0, 1.0]],
    b: &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
    c: &[0.0, 0.5, 0.5, 1.0],
    order: 4,
};

impl Scheme {
    pub fn tableau(&self) -> ButcherTableau {
        match self {
            Scheme::ExplicitEuler => EXPLICIT_EULER,
            Scheme::MidPoint => MIDPOINT,
            Scheme::Heun => HEUN,
            Scheme::RungeKutta4 => RUNGE_KUTTA4,
        }
    }

    pub fn order(&self) -> u32 {
        self.tableau().order
    }
}

/// Coefficients of an explicit Runge-Kutta method.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ButcherTableau {
    /// Strictly lower triangular stage matrix, one row per stage.
    pub a: &'static [&'static [f64]],
    /// Weights.
    pub b: &'static [f64],
    /// Nodes: stage time fractions.
    pub c: &'static [f64],
    /// Nominal order of accuracy.
    pub order: u32,
}

/// State of a particle after one integration step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Advanced {
    pub position: Vector2,
    /// Field velocity at the new position and time.
    pub velocity: Vector2,
    pub deformation_gradient: Matrix2,
    /// Cell containing the new position, for grid fields.
    pub cell: Option<usize>,
}

impl ButcherTableau {
    pub fn num_stages(&self) -> usize {
        self.b.len()
    }

    /// Advances a material point and its deformation gradient from `time` to `time + dt`.
    ///
    /// The coupled system `dx/dt = v(x, t)`, `dF/dt = ∇v(x, t) F` is integrated with the
    /// same coefficients so that `F` is advanced consistently with the position. Each stage
    /// uses the cell of the previous stage as its lookup hint.
    pub fn advance<F: FlowField + ?Sized>(
        &self,
        field: &F,
        x: &Vector2,
        f: &Matrix2,
        time: f64,
        dt: f64,
        hint: Option<usize>,
    ) -> Result<Advanced, Error> {
        let num_stages = self.num_stages();
        let mut stage_velocity = Vec::with_capacity(num_stages);
        let mut stage_rate = Vec::with_capacity(num_stages);
        let mut hint = hint;

        for (k, row) in self.a.iter().enumerate() {
            let mut xk = *x;
            let mut fk = *f;
            for (j, &a) in row.iter().enumerate() {
                if a != 0.0 {
                    xk += stage_velocity[j] * (dt * a);
                    fk += stage_rate[j] * (dt * a);
                }
            }

            let sample = field.sample(&xk, time + self.c[k] * dt, hint)?;
            hint = sample.cell.or(hint);
            stage_velocity.push(sample.velocity);
            stage_rate.push(sample.gradient * fk);
        }

        let mut position = *x;
        let mut deformation_gradient = *f;
        for (k, &b) in self.b.iter().enumerate() {
            position += stage_velocity[k] * (dt * b);
            deformation_gradient += stage_rate[k] * (dt * b);
        }

        let end = field.sample(&position, time + dt, hint)?;
        Ok(Advanced {
            position,
            velocity: end.velocity,
            deformation_gradient,
            cell: end.cell,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{AnalyticalField, FieldSample};
    use crate::motion::{rotation, RigidRotation};
    use approx::*;

    const SCHEMES: [Scheme; 4] = [
        Scheme::ExplicitEuler,
        Scheme::MidPoint,
        Scheme::Heun,
        Scheme::RungeKutta4,
    ];

    #[test]
    fn tableaux_are_consistent() {
        for scheme in SCHEMES {
            let tab = scheme.tableau();
            assert_eq!(tab.a.len(), tab.num_stages());
            assert_eq!(tab.c.len(), tab.num_stages());
            assert_relative_eq!(tab.b.iter().sum::<f64>(), 1.0, epsilon = 1e-15);
            for (k, row) in tab.a.iter().enumerate() {
                assert_eq!(row.len(), k);
                assert_relative_eq!(row.iter().sum::<f64>(), tab.c[k], epsilon = 1e-15);
            }
        }
    }

    /// Uniform flow: every scheme is exact and F stays the identity.
    #[test]
    fn uniform_flow_is_exact() {
        struct Uniform;
        impl FlowField for Uniform {
            fn sample(&self, _: &Vector2, _: f64, _: Option<usize>) -> Result<FieldSample, Error> {
                Ok(FieldSample {
                    velocity: Vector2::new(0.5, -0.25),
                    gradient: Matrix2::zeros(),
                    cell: None,
                })
            }
        }
        for scheme in SCHEMES {
            let out = scheme
                .tableau()
                .advance(&Uniform, &Vector2::new(1.0, 1.0), &Matrix2::identity(), 0.0, 0.4, None)
                .unwrap();
            assert_relative_eq!(out.position, Vector2::new(1.2, 0.9), epsilon = 1e-15);
            assert_eq!(out.deformation_gradient, Matrix2::identity());
        }
    }

    #[test]
    fn rk4_single_step_local_error() {
        let motion = RigidRotation::default();
        let field = AnalyticalField { motion: &motion };
        let tab = Scheme::RungeKutta4.tableau();
        let x0 = Vector2::new(0.6, 0.5);
        let mut errors = Vec::new();
        for &dt in &[0.1, 0.05] {
            let out = tab
                .advance(&field, &x0, &Matrix2::identity(), 0.0, dt, None)
                .unwrap();
            errors.push((out.deformation_gradient - rotation(motion.rate * dt)).norm());
        }
        // Local error of a fourth order method is fifth order.
        let ratio = errors[0] / errors[1];
        assert!(ratio > 25.0 && ratio < 40.0, "ratio = {}", ratio);
    }
}
