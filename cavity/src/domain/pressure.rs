use super::Domain;
use crate::linsolve::{pressure_system, LinearSystem};
use crate::{Error, Vector2};

impl Domain {
    /// Pressure degree of freedom pinned to zero: the middle of the lid.
    pub fn pinned_pressure_dof(&self) -> usize {
        let [nx, ny] = self.grid.n_cells;
        self.grid.dof(nx / 2, ny)
    }

    /// Assembles the pressure Poisson system for a step of size `dt` into `system`.
    pub fn assemble_pressure_system<S: LinearSystem>(&self, system: &mut S, dt: f64) {
        for cell in self.cells.iter() {
            let ke = cell.stiffness();
            let fe = cell.pressure_load(&self.nodes, dt);
            let dofs = cell.nodes.map(|n| {
                let [i, j] = self.nodes[n].grid;
                self.grid.dof(i, j)
            });
            system.add_element(&dofs, &ke, &fe);
        }
        system.pin(self.pinned_pressure_dof(), 0.0);
    }

    /// Solves for the nodal pressure that makes the provisional velocity divergence free.
    pub fn solve_p(&mut self, dt: f64) -> Result<(), Error> {
        let mut system = pressure_system(self.grid.num_nodes());
        self.assemble_pressure_system(&mut system, dt);
        let pressure = system.solve()?;

        let grid = &self.grid;
        for node in self.nodes.iter_mut() {
            let [i, j] = node.grid;
            node.set_pressure(pressure[grid.dof(i, j)]);
        }
        Ok(())
    }

    /// Corrects the free nodal velocity components by the pressure gradient,
    /// `v += -dt/ρ ∇p`.
    ///
    /// The gradient is approximated by central differences and taken to be zero along
    /// boundary rows and columns.
    pub fn solve_vtilde(&mut self, dt: f64) {
        let [nx, ny] = self.grid.n_cells;
        let [hx, hy] = self.grid.h;
        let scale = -dt / self.flow.density;

        let pressure = |i: usize, j: usize| self.nodes[self.grid.node_index(i, j)].pressure;
        let corrections: Vec<Vector2> = self
            .nodes
            .iter()
            .map(|node| {
                let [i, j] = node.grid;
                let dpx = if i == 0 || i == nx {
                    0.0
                } else {
                    0.5 * (pressure(i + 1, j) - pressure(i - 1, j)) / hx
                };
                let dpy = if j == 0 || j == ny {
                    0.0
                } else {
                    0.5 * (pressure(i, j + 1) - pressure(i, j - 1)) / hy
                };
                Vector2::new(dpx, dpy) * scale
            })
            .collect();

        for (node, dv) in self.nodes.iter_mut().zip(corrections) {
            node.add_velocity(dv);
        }
    }
}
