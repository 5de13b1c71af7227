//! Time step refinement studies of the particle integration schemes.
//!
//! A single particle is moved through the velocity field of an analytical motion with a
//! sequence of decreasing time steps, and its position and deformation gradient are compared
//! with the exact solution. The observed order of accuracy is the slope of the error against
//! the time step on a log-log scale.

use serde::{Deserialize, Serialize};

use crate::domain::{Domain, ParticleError};
use crate::field::AnalyticalField;
use crate::integrator::Scheme;
use crate::motion::MotionKind;
use crate::params::AnalysisControl;
use crate::{Error, Matrix2, Vector2};

/// Where the particle integrator samples the velocity.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FieldMode {
    /// Directly from the motion.
    Analytical,
    /// From a unit square grid with the given number of cells, whose nodes are prescribed by
    /// the motion at the start of every step.
    Grid { n_cells: [usize; 2] },
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceStudy {
    pub scheme: Scheme,
    pub motion: MotionKind,
    pub mode: FieldMode,
    /// Initial position of the particle.
    pub position: [f64; 2],
    /// With `None`, each sample is the local error of a single step from time zero.
    /// Otherwise errors are measured at this time after integrating with equal steps.
    pub end_time: Option<f64>,
    pub initial_dt: f64,
    /// Factor by which the time step shrinks between samples.
    pub ratio: f64,
    /// Number of samples.
    pub refinements: usize,
}

impl ConvergenceStudy {
    pub fn new(scheme: Scheme, motion: MotionKind) -> Self {
        ConvergenceStudy {
            scheme,
            motion,
            mode: FieldMode::Analytical,
            position: [0.6, 0.5],
            end_time: None,
            initial_dt: 0.1,
            ratio: 2.0,
            refinements: 4,
        }
    }

    pub fn run(&self) -> Result<ConvergenceReport, Error> {
        if self.refinements < 2 {
            return Err(Error::InvalidParameter {
                name: "refinements".to_string(),
            });
        }
        if !(self.ratio > 1.0) {
            return Err(Error::InvalidParameter {
                name: "ratio".to_string(),
            });
        }
        if !(self.initial_dt > 0.0) {
            return Err(Error::InvalidParameter {
                name: "initial_dt".to_string(),
            });
        }

        let mut samples = Vec::with_capacity(self.refinements);
        let mut dt = self.initial_dt;
        for _ in 0..self.refinements {
            let (num_steps, step) = match self.end_time {
                Some(end) => {
                    let n = (end / dt).round().max(1.0);
                    (n as usize, end / n)
                }
                None => (1, dt),
            };
            let error = match self.mode {
                FieldMode::Analytical => self.integrate_analytical(num_steps, step)?,
                FieldMode::Grid { n_cells } => self.integrate_on_grid(n_cells, num_steps, step)?,
            };
            log::debug!(
                "{} {}: dt = {:.2e}, position error = {:.3e}, F error = {:.3e}",
                self.scheme,
                self.motion.build().name(),
                step,
                error.position,
                error.deformation_gradient
            );
            samples.push(ConvergenceSample {
                dt: step,
                position_error: error.position,
                deformation_error: error.deformation_gradient,
            });
            dt /= self.ratio;
        }

        Ok(ConvergenceReport {
            scheme: self.scheme,
            motion: self.motion.build().name().to_string(),
            samples,
        })
    }

    fn integrate_analytical(&self, num_steps: usize, dt: f64) -> Result<ParticleError, Error> {
        let motion = self.motion.build();
        let field = AnalyticalField { motion: &*motion };
        let tableau = self.scheme.tableau();
        let x0 = Vector2::from(self.position);
        let mut x = x0;
        let mut f = Matrix2::identity();
        for step in 0..num_steps {
            let out = tableau.advance(&field, &x, &f, step as f64 * dt, dt, None)?;
            x = out.position;
            f = out.deformation_gradient;
        }
        let time = num_steps as f64 * dt;
        Ok(ParticleError {
            position: (x - motion.analytical_position(&x0, time)).norm(),
            deformation_gradient: (f - motion.analytical_deformation_gradient(time)).norm(),
        })
    }

    fn integrate_on_grid(&self, n_cells: [usize; 2], num_steps: usize, dt: f64) -> Result<ParticleError, Error> {
        let mut domain = Domain::new(1.0, 1.0, n_cells[0], n_cells[1])?;
        domain.set_analysis(AnalysisControl::particles_only());
        domain.set_scheme(self.scheme);
        domain.set_motion(self.motion.build());
        let id = domain.add_particle(Vector2::from(self.position))?;

        let mut error = ParticleError::default();
        for step in 0..num_steps {
            domain.set_state(step as f64 * dt)?;
            let errors = domain.update_particle_motion_with_errors(dt)?;
            error = errors[id];
        }
        Ok(error)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceSample {
    pub dt: f64,
    pub position_error: f64,
    pub deformation_error: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    pub scheme: Scheme,
    pub motion: String,
    pub samples: Vec<ConvergenceSample>,
}

impl ConvergenceReport {
    /// Observed order of the position error between the first and last samples.
    pub fn position_slope(&self) -> f64 {
        self.slope(|s| s.position_error)
    }

    /// Observed order of the deformation gradient error between the first and last samples.
    pub fn deformation_slope(&self) -> f64 {
        self.slope(|s| s.deformation_error)
    }

    /// Ratios of the deformation gradient errors of consecutive samples.
    pub fn deformation_ratios(&self) -> Vec<f64> {
        self.samples
            .windows(2)
            .map(|w| w[0].deformation_error / w[1].deformation_error)
            .collect()
    }

    /// Ratios of the position errors of consecutive samples.
    pub fn position_ratios(&self) -> Vec<f64> {
        self.samples
            .windows(2)
            .map(|w| w[0].position_error / w[1].position_error)
            .collect()
    }

    fn slope(&self, error: impl Fn(&ConvergenceSample) -> f64) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) if self.samples.len() > 1 => {
                (error(first) / error(last)).ln() / (first.dt / last.dt).ln()
            }
            _ => f64::NAN,
        }
    }
}

impl std::fmt::Display for ConvergenceReport {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "{} {}", self.scheme, self.motion)?;
        writeln!(f, "{:>10} {:>12} {:>12}", "dt", "position", "F")?;
        for s in self.samples.iter() {
            writeln!(f, "{:>10.2e} {:>12.3e} {:>12.3e}", s.dt, s.position_error, s.deformation_error)?;
        }
        writeln!(f, "Position convergence slope = {:.2}", self.position_slope())?;
        write!(f, "Deformation gradient convergence slope = {:.2}", self.deformation_slope())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::RigidRotation;

    #[test]
    fn invalid_studies_are_rejected() {
        let mut study = ConvergenceStudy::new(Scheme::Heun, MotionKind::Rigid(RigidRotation::default()));
        study.refinements = 1;
        assert!(study.run().is_err());
        study.refinements = 3;
        study.ratio = 1.0;
        assert!(study.run().is_err());
    }

    #[test]
    fn explicit_euler_local_error_is_second_order() {
        let study = ConvergenceStudy::new(
            Scheme::ExplicitEuler,
            MotionKind::Rigid(RigidRotation::default()),
        );
        let report = study.run().unwrap();
        assert_eq!(report.samples.len(), 4);
        let slope = report.deformation_slope();
        assert!((slope - 2.0).abs() < 0.2, "slope = {}", slope);
    }
}
