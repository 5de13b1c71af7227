use serde::{Deserialize, Serialize};

use super::Domain;
use crate::field::GridField;
use crate::grid::find_cell;
use crate::particle::Particle;
use crate::{Error, Vector2};

/// Deviation of a particle from the analytical solution of the attached motion.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticleError {
    /// Euclidean distance to the analytical position.
    pub position: f64,
    /// Frobenius norm of the deformation gradient error.
    pub deformation_gradient: f64,
}

impl Domain {
    /// Index of the cell containing `x`.
    pub fn find_cell(&self, x: &Vector2) -> Result<usize, Error> {
        find_cell(&self.grid, &self.cells, x, None)
    }

    /// Seeds an `n × m` regular pattern of particles in every cell.
    pub fn create_particles(&mut self, n: usize, m: usize) {
        let [nx, ny] = self.grid.n_cells;
        for i in 0..nx {
            for j in 0..ny {
                let k = self.grid.cell_index(i, j);
                self.seed_cell(k, n, m);
            }
        }
    }

    /// Seeds an `n × m` regular pattern of particles in cell `(i, j)`.
    ///
    /// Particles sit at the centers of an `n × m` subdivision of the cell and share the cell
    /// mass equally. Their initial velocity is interpolated from the nodes.
    ///
    /// Fails with [`Error::InvalidParameter`] if `(i, j)` does not name a cell.
    pub fn create_particles_in_cell(&mut self, i: usize, j: usize, n: usize, m: usize) -> Result<(), Error> {
        let [nx, ny] = self.grid.n_cells;
        if i >= nx || j >= ny {
            return Err(Error::InvalidParameter {
                name: format!("cell ({}, {})", i, j),
            });
        }
        let k = self.grid.cell_index(i, j);
        self.seed_cell(k, n, m);
        Ok(())
    }

    fn seed_cell(&mut self, k: usize, n: usize, m: usize) {
        let mass = self.cells[k].density * self.cells[k].area() / (n * m) as f64;
        for a in 0..n {
            let s = -1.0 + (2 * a + 1) as f64 / n as f64;
            for b in 0..m {
                let t = -1.0 + (2 * b + 1) as f64 / m as f64;
                let x = self.cells[k].to_global(&Vector2::new(s, t));
                self.insert_particle(k, mass, x);
            }
        }
    }

    /// Adds a single particle carrying the mass of the cell it falls into.
    pub fn add_particle(&mut self, position: Vector2) -> Result<usize, Error> {
        let k = self.find_cell(&position)?;
        let mass = self.cells[k].density * self.cells[k].area();
        Ok(self.insert_particle(k, mass, position))
    }

    fn insert_particle(&mut self, cell: usize, mass: f64, position: Vector2) -> usize {
        let id = self.particles.len();
        let velocity = self.cells[cell].velocity_at(&self.nodes, &position);
        let mut particle = Particle::new(id, mass, position).with_velocity(velocity);
        particle.set_viscosity(self.viscosity);
        particle.cell = Some(cell);
        self.particles.push(particle);
        self.cells[cell].add_particle(id);
        id
    }

    /// Rebuilds the particle sets of all cells from the current particle positions.
    pub fn relocate_particles(&mut self) -> Result<(), Error> {
        for cell in self.cells.iter_mut() {
            cell.clear_particles();
        }
        for particle in self.particles.iter_mut() {
            let k = find_cell(&self.grid, &self.cells, &particle.position, particle.cell)?;
            particle.cell = Some(k);
            self.cells[k].add_particle(particle.id);
        }
        Ok(())
    }

    /// Advects all particles through the nodal velocity field over one step, integrating
    /// their deformation gradients with the current scheme.
    ///
    /// Either every particle is moved or, if any of them leaves the grid, none is.
    pub fn update_particle_motion(&mut self, dt: f64) -> Result<(), Error> {
        let field = GridField {
            grid: &self.grid,
            nodes: &self.nodes,
            cells: &self.cells,
            field_time: self.state.field_time,
        };
        let tableau = self.scheme.tableau();
        let time = self.state.time;

        let advanced = self
            .particles
            .iter()
            .map(|p| tableau.advance(&field, &p.position, &p.deformation_gradient, time, dt, p.cell))
            .collect::<Result<Vec<_>, Error>>()?;

        for (particle, out) in self.particles.iter_mut().zip(advanced) {
            particle.position = out.position;
            particle.velocity = out.velocity;
            particle.deformation_gradient = out.deformation_gradient;
            particle.cell = out.cell;
        }
        log::trace!("Advected {} particles with {}", self.particles.len(), self.scheme);
        self.relocate_particles()
    }

    /// Same as [`Domain::update_particle_motion`] but also measures every particle against
    /// the analytical solution of the attached motion at the end of the step.
    ///
    /// Particles are assumed to have started from their reference positions at time zero.
    pub fn update_particle_motion_with_errors(&mut self, dt: f64) -> Result<Vec<ParticleError>, Error> {
        if self.motion.is_none() {
            return Err(Error::MissingMotion);
        }
        self.update_particle_motion(dt)?;

        let motion = self.motion.as_ref().ok_or(Error::MissingMotion)?;
        let time = self.state.time + dt;
        let f_exact = motion.analytical_deformation_gradient(time);
        Ok(self
            .particles
            .iter()
            .map(|p| {
                let x_exact = motion.analytical_position(&p.reference_position, time);
                ParticleError {
                    position: (p.position - x_exact).norm(),
                    deformation_gradient: (p.deformation_gradient - f_exact).norm(),
                }
            })
            .collect())
    }

    /// Updates particle strain measures and pressure from the current nodal field.
    pub fn update_particle_stress(&mut self, dt: f64) -> Result<(), Error> {
        for particle in self.particles.iter_mut() {
            let k = find_cell(&self.grid, &self.cells, &particle.position, particle.cell)?;
            let cell = &self.cells[k];
            let l = cell.velocity_gradient_at(&self.nodes, &particle.position);
            let p = cell.pressure_at(&self.nodes, &particle.position);
            particle.update_stress(&l, p, dt);
        }
        Ok(())
    }
}
