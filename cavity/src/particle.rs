use serde::{Deserialize, Serialize};

use crate::{Matrix2, Vector2};

/// A massless (for the flow) Lagrangian tracer.
///
/// The mass is only used to weigh the particle velocity when momentum is mapped back onto the
/// grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub id: usize,
    mass: f64,
    /// Position at creation.
    pub reference_position: Vector2,
    pub position: Vector2,
    pub velocity: Vector2,
    pub deformation_gradient: Matrix2,
    /// Accumulated strain `[ε_xx, ε_yy, γ_xy]`.
    pub strain: [f64; 3],
    /// Rate of deformation `[D_xx, D_yy, 2 D_xy]`.
    pub strain_rate: [f64; 3],
    pub pressure: f64,
    pub viscosity: f64,
    /// Index of the cell containing this particle as of the last relocation.
    pub(crate) cell: Option<usize>,
}

impl Particle {
    pub fn new(id: usize, mass: f64, position: Vector2) -> Self {
        Particle {
            id,
            mass,
            reference_position: position,
            position,
            velocity: Vector2::zeros(),
            deformation_gradient: Matrix2::identity(),
            strain: [0.0; 3],
            strain_rate: [0.0; 3],
            pressure: 0.0,
            viscosity: 0.0,
            cell: None,
        }
    }

    pub fn with_velocity(mut self, velocity: Vector2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// The cell this particle was last found in.
    pub fn cell(&self) -> Option<usize> {
        self.cell
    }

    pub fn set_viscosity(&mut self, viscosity: f64) {
        self.viscosity = viscosity;
    }

    /// Updates the strain measures from the local velocity gradient and pressure.
    pub fn update_stress(&mut self, velocity_gradient: &Matrix2, pressure: f64, dt: f64) {
        let l = velocity_gradient;
        self.strain_rate = [l[(0, 0)], l[(1, 1)], l[(0, 1)] + l[(1, 0)]];
        for (eps, rate) in self.strain.iter_mut().zip(self.strain_rate.iter()) {
            *eps += dt * rate;
        }
        self.pressure = pressure;
    }

    /// Newtonian stress `[σ_xx, σ_yy, σ_xy]`.
    pub fn stress(&self) -> [f64; 3] {
        let mu = self.viscosity;
        let d = &self.strain_rate;
        [
            2.0 * mu * d[0] - self.pressure,
            2.0 * mu * d[1] - self.pressure,
            mu * d[2],
        ]
    }
}
