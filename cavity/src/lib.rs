//! Two-dimensional incompressible flow on a uniform background grid with
//! Lagrangian tracer particles carrying a deformation gradient.
//!
//! The grid stage is a pressure projection: a provisional nodal velocity is
//! computed from viscous forces, a pressure Poisson problem is solved over the
//! nodes, and the nodal velocity is corrected by the pressure gradient.
//! Particles are then advected through the corrected field with an explicit
//! Runge-Kutta scheme which also integrates their deformation gradient.

pub mod cell;
pub mod convergence;
pub mod domain;
pub mod field;
pub mod grid;
pub mod integrator;
pub mod linsolve;
pub mod motion;
pub mod node;
pub mod params;
pub mod particle;
pub mod scene;

// TODO: This should be feature gated. Integration tests would then need the
// feature passed explicitly, see https://github.com/rust-lang/cargo/issues/2911.
pub mod test_utils;

pub use self::cell::Cell;
pub use self::domain::{Domain, Observer, ParticleError, Snapshot};
pub use self::field::{FieldSample, FlowField};
pub use self::grid::{find_cell, Grid};
pub use self::integrator::{ButcherTableau, Scheme};
pub use self::motion::{BlendedRotation, Motion, RigidRotation};
pub use self::node::Node;
pub use self::params::*;
pub use self::particle::Particle;

pub type Vector2 = na::Vector2<f64>;
pub type Matrix2 = na::Matrix2<f64>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Point ({x}, {y}) could not be resolved to a cell index")]
    CellIndex { x: f64, y: f64 },
    #[error("Point ({x}, {y}) lies outside of the grid")]
    OutsideDomain { x: f64, y: f64 },
    #[error("Pressure system is singular")]
    SingularPressureSystem,
    #[error("Sparse factorization of the pressure system failed: {reason}")]
    SparseFactorization { reason: String },
    #[error("Invalid parameter: {name:?}")]
    InvalidParameter { name: String },
    #[error("No analytical motion is attached to the domain")]
    MissingMotion,
    #[error("Observer failed: {description}")]
    Observer { description: String },
}

impl Error {
    /// Returns `true` if this error was caused by a failed point to cell lookup.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, Error::CellIndex { .. } | Error::OutsideDomain { .. })
    }
}

pub(crate) fn inf_norm<I>(iter: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    iter.into_iter()
        .map(|x| x.abs())
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Less))
        .unwrap_or(0.0)
}
