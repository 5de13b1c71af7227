use serde::{Deserialize, Serialize};

use crate::Vector2;

/// A grid vertex carrying the Eulerian state of the flow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: usize,
    /// Integer grid coordinates `(i, j)`.
    pub grid: [usize; 2],
    pub position: Vector2,
    pub mass: f64,
    pub momentum: Vector2,
    pub velocity: Vector2,
    pub pressure: f64,
    pub force: Vector2,
    /// Time derivative of the velocity at this (fixed) point.
    pub apparent_acceleration: Vector2,
    /// Prescribed values of Dirichlet-fixed velocity components.
    fixity: [Option<f64>; 2],
}

impl Node {
    pub fn new(id: usize, grid: [usize; 2], position: Vector2) -> Self {
        Node {
            id,
            grid,
            position,
            mass: 0.0,
            momentum: Vector2::zeros(),
            velocity: Vector2::zeros(),
            pressure: 0.0,
            force: Vector2::zeros(),
            apparent_acceleration: Vector2::zeros(),
            fixity: [None, None],
        }
    }

    /// Resets all per-step accumulators.
    ///
    /// Fixed velocity components are restored to their prescribed values.
    pub fn wipe(&mut self) {
        self.mass = 0.0;
        self.momentum = Vector2::zeros();
        self.force = Vector2::zeros();
        self.velocity = Vector2::zeros();
        self.enforce_fixity();
    }

    /// Marks the velocity `component` (0 for x, 1 for y) as fixed to `value`.
    ///
    /// # Panics
    ///
    /// This function panics if `component` is not 0 or 1.
    pub fn fix_dof(&mut self, component: usize, value: f64) {
        self.fixity[component] = Some(value);
        self.velocity[component] = value;
    }

    /// Removes all fixities from this node.
    pub fn free_dofs(&mut self) {
        self.fixity = [None, None];
    }

    pub fn is_fixed(&self, component: usize) -> bool {
        self.fixity[component].is_some()
    }

    pub fn fixed_value(&self, component: usize) -> Option<f64> {
        self.fixity[component]
    }

    pub fn add_mass(&mut self, mass: f64) {
        self.mass += mass;
    }

    pub fn add_momentum(&mut self, momentum: Vector2) {
        self.momentum += momentum;
    }

    pub fn add_force(&mut self, force: Vector2) {
        self.force += force;
    }

    pub fn set_force(&mut self, force: Vector2) {
        self.force = force;
    }

    pub fn set_pressure(&mut self, pressure: f64) {
        self.pressure = pressure;
    }

    /// Overwrites the free velocity components.
    pub fn set_velocity(&mut self, velocity: Vector2) {
        for c in 0..2 {
            if self.fixity[c].is_none() {
                self.velocity[c] = velocity[c];
            }
        }
    }

    pub fn set_apparent_acceleration(&mut self, acceleration: Vector2) {
        self.apparent_acceleration = acceleration;
    }

    /// Recovers the free velocity components from the scattered momentum.
    pub fn compute_velocity_from_momentum(&mut self) {
        if self.mass > 0.0 {
            let velocity = self.momentum / self.mass;
            self.set_velocity(velocity);
        }
    }

    /// Explicit update `v += dt f / m` of the free velocity components.
    ///
    /// Does nothing for a massless node.
    pub fn update_vstar(&mut self, dt: f64) {
        if self.mass == 0.0 {
            return;
        }
        let dv = self.force * (dt / self.mass);
        self.add_velocity(dv);
    }

    /// Adds `dv` to the free velocity components.
    pub fn add_velocity(&mut self, dv: Vector2) {
        for c in 0..2 {
            if self.fixity[c].is_none() {
                self.velocity[c] += dv[c];
            }
        }
    }

    fn enforce_fixity(&mut self) {
        for c in 0..2 {
            if let Some(value) = self.fixity[c] {
                self.velocity[c] = value;
            }
        }
    }
}
