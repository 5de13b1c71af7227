//! The simulation domain: a uniform grid of nodes and cells with a particle arena.

mod particles;
mod pressure;

pub use particles::ParticleError;

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::grid::Grid;
use crate::integrator::Scheme;
use crate::motion::Motion;
use crate::node::Node;
use crate::params::{AnalysisControl, AnalysisState, FlowParams, GridParams};
use crate::particle::Particle;
use crate::{inf_norm, Error, Vector2};

/// Largest number of sub-steps taken by [`Domain::run_analysis`].
pub const MAX_SUBSTEPS: usize = 50;

/// Velocities below this magnitude do not restrict the time step.
const TIME_STEP_VELOCITY_EPSILON: f64 = 1.0e-5;

/// Time step returned when nothing moves.
const MAX_TIME_STEP: f64 = 1.0e10;

/// Hooks invoked after each step when requested by the analysis control.
pub trait Observer {
    /// Called when `plot_figures` is set.
    fn visualize(&mut self, _domain: &Domain) -> Result<(), Error> {
        Ok(())
    }
    /// Called when `write_output` is set.
    fn persist(&mut self, _snapshot: &Snapshot) -> Result<(), Error> {
        Ok(())
    }
}

impl Observer for () {}

/// Serializable copy of the simulation state at one point in time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: f64,
    pub nodes: Vec<Node>,
    pub particles: Vec<Particle>,
}

#[derive(Debug)]
pub struct Domain {
    grid: Grid,
    nodes: Vec<Node>,
    cells: Vec<Cell>,
    particles: Vec<Particle>,
    flow: FlowParams,
    viscosity: f64,
    state: AnalysisState,
    scheme: Scheme,
    motion: Option<Box<dyn Motion>>,
}

impl Domain {
    pub fn new(width: f64, height: f64, n_cells_x: usize, n_cells_y: usize) -> Result<Self, Error> {
        Domain::from_params(&GridParams {
            width,
            height,
            n_cells_x,
            n_cells_y,
        })
    }

    /// Builds the nodes and cells of the grid and applies the lid-driven cavity boundary
    /// conditions with the lid at rest.
    pub fn from_params(params: &GridParams) -> Result<Self, Error> {
        let grid = Grid::new(params)?;
        let [nx, ny] = grid.n_cells;

        let mut nodes = Vec::with_capacity(grid.num_nodes());
        for i in 0..=nx {
            for j in 0..=ny {
                nodes.push(Node::new(nodes.len(), [i, j], grid.node_position(i, j)));
            }
        }

        let mut cells = Vec::with_capacity(grid.num_cells());
        for i in 0..nx {
            for j in 0..ny {
                let cell_nodes = [
                    grid.node_index(i, j),
                    grid.node_index(i + 1, j),
                    grid.node_index(i + 1, j + 1),
                    grid.node_index(i, j + 1),
                ];
                let origin = grid.node_position(i, j);
                cells.push(Cell::new(cells.len(), cell_nodes, origin, grid.h[0], grid.h[1]));
            }
        }

        let mut domain = Domain {
            grid,
            nodes,
            cells,
            particles: Vec::new(),
            flow: FlowParams::default(),
            viscosity: 0.0,
            state: AnalysisState::default(),
            scheme: Scheme::default(),
            motion: None,
        };
        domain.set_flow_parameters(FlowParams {
            velocity: 0.0,
            ..FlowParams::default()
        })?;
        Ok(domain)
    }

    /*
     * Configuration
     */

    /// Sets the physical parameters, the cell properties and the lid-driven cavity boundary
    /// conditions.
    pub fn set_parameters(&mut self, reynolds: f64, density: f64, velocity: f64) -> Result<(), Error> {
        self.set_flow_parameters(FlowParams {
            reynolds,
            density,
            velocity,
            ..self.flow
        })
    }

    pub fn set_flow_parameters(&mut self, flow: FlowParams) -> Result<(), Error> {
        if !(flow.reynolds > 0.0 && flow.reynolds.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "reynolds".to_string(),
            });
        }
        if !(flow.density > 0.0 && flow.density.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "density".to_string(),
            });
        }
        if !flow.velocity.is_finite() {
            return Err(Error::InvalidParameter {
                name: "velocity".to_string(),
            });
        }

        self.flow = flow;
        self.viscosity = flow.viscosity(&self.grid);
        log::debug!(
            "Flow parameters: Re = {}, density = {}, lid velocity = {}, viscosity = {}",
            flow.reynolds,
            flow.density,
            flow.velocity,
            self.viscosity
        );

        for cell in self.cells.iter_mut() {
            cell.set_parameters(flow.density, self.viscosity);
        }
        for particle in self.particles.iter_mut() {
            particle.set_viscosity(self.viscosity);
        }
        self.set_boundary_conditions();
        Ok(())
    }

    /// Lid-driven cavity: no penetration on the top and bottom rows, the lid moves
    /// tangentially, and the side columns have no horizontal flow. The top corners are
    /// held at rest.
    fn set_boundary_conditions(&mut self) {
        let [nx, ny] = self.grid.n_cells;
        let v0 = self.flow.velocity;
        for node in self.nodes.iter_mut() {
            node.free_dofs();
        }
        for i in 0..=nx {
            self.nodes[self.grid.node_index(i, 0)].fix_dof(1, 0.0);
            let top = self.grid.node_index(i, ny);
            self.nodes[top].fix_dof(1, 0.0);
            if i > 0 {
                self.nodes[top].fix_dof(0, v0);
            }
        }
        for j in 0..=ny {
            self.nodes[self.grid.node_index(0, j)].fix_dof(0, 0.0);
            self.nodes[self.grid.node_index(nx, j)].fix_dof(0, 0.0);
        }
    }

    pub fn set_analysis(&mut self, control: AnalysisControl) {
        if !control.is_consistent() {
            log::warn!("Inconsistent analysis: transient term active with update_position and do_init");
        }
        self.state.control = control;
    }

    pub fn set_scheme(&mut self, scheme: Scheme) {
        self.scheme = scheme;
    }

    /// Attaches an analytical motion used by [`Domain::set_state`] and for error measurement.
    ///
    /// The motion prescribes every nodal velocity component, so all boundary fixities are
    /// released. They are restored by the next call to [`Domain::set_flow_parameters`].
    pub fn set_motion(&mut self, motion: Box<dyn Motion>) {
        for node in self.nodes.iter_mut() {
            node.free_dofs();
        }
        self.motion = Some(motion);
    }

    /*
     * Accessors
     */

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, i: usize, j: usize) -> &Node {
        &self.nodes[self.grid.node_index(i, j)]
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, i: usize, j: usize) -> &Cell {
        &self.cells[self.grid.cell_index(i, j)]
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn time(&self) -> f64 {
        self.state.time
    }

    pub fn state(&self) -> &AnalysisState {
        &self.state
    }

    pub fn analysis_control(&self) -> &AnalysisControl {
        &self.state.control
    }

    pub fn flow_parameters(&self) -> &FlowParams {
        &self.flow
    }

    pub fn viscosity(&self) -> f64 {
        self.viscosity
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn motion(&self) -> Option<&dyn Motion> {
        self.motion.as_deref()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            time: self.state.time,
            nodes: self.nodes.clone(),
            particles: self.particles.clone(),
        }
    }

    /*
     * Initial and prescribed states
     */

    /// Computes a divergence free initial nodal velocity from a fluid at rest driven by the
    /// lid, using a fictitious unit time step.
    pub fn set_initial_state(&mut self) -> Result<(), Error> {
        for node in self.nodes.iter_mut() {
            node.wipe();
        }
        for cell in self.cells.iter() {
            cell.map_mass_to_nodes(&mut self.nodes);
        }
        // Fixed components keep their prescribed values.
        for node in self.nodes.iter_mut() {
            node.set_velocity(Vector2::zeros());
        }
        self.solve_p(1.0)?;
        self.solve_vtilde(1.0);
        Ok(())
    }

    /// Writes the velocity of the attached motion at `time` and its partial time derivative
    /// onto the nodes, and sets the simulation clock to `time`.
    pub fn set_state(&mut self, time: f64) -> Result<(), Error> {
        let motion = self.motion.as_ref().ok_or(Error::MissingMotion)?;
        for node in self.nodes.iter_mut() {
            let x = node.position;
            node.set_velocity(motion.velocity(&x, time));
            node.set_apparent_acceleration(motion.velocity_time_derivative(&x, time));
        }
        self.state.time = time;
        self.state.field_time = time;
        Ok(())
    }

    /*
     * Time stepping
     */

    /// Largest stable time step `CFL · min(h / |v|)` over all nodal velocity components.
    pub fn get_time_step(&self, cfl: f64) -> f64 {
        let [hx, hy] = self.grid.h;
        let mut dt = MAX_TIME_STEP;
        for node in self.nodes.iter() {
            for (&v, &h) in node.velocity.iter().zip([hx, hy].iter()) {
                if v.abs() > TIME_STEP_VELOCITY_EPSILON {
                    dt = dt.min(h / v.abs());
                }
            }
        }
        if dt < MAX_TIME_STEP {
            cfl * dt
        } else {
            dt
        }
    }

    pub fn run_analysis(&mut self, max_time: f64) -> Result<usize, Error> {
        self.run_analysis_with(max_time, &mut ())
    }

    /// Advances the simulation to `max_time` with equal sub-steps, returning the number of
    /// steps taken.
    ///
    /// The step size is limited by a unit CFL number and by the remaining interval, but no
    /// more than [`MAX_SUBSTEPS`] steps are taken.
    pub fn run_analysis_with(&mut self, max_time: f64, observer: &mut dyn Observer) -> Result<usize, Error> {
        let remaining = max_time - self.state.time;
        if !(remaining > 0.0) {
            return Ok(0);
        }

        let mut dt = self.get_time_step(1.0).min(remaining);
        if dt < remaining {
            let num_steps = (remaining / dt).ceil().min(MAX_SUBSTEPS as f64);
            dt = remaining / num_steps;
        }
        log::debug!("Running analysis to t = {} with dt = {}", max_time, dt);

        let mut steps = 0;
        while self.state.time < max_time - 0.1 * dt {
            self.run_single_step_with(dt, observer)?;
            steps += 1;
        }
        self.state.time = max_time;
        Ok(steps)
    }

    pub fn run_single_step(&mut self, dt: f64) -> Result<(), Error> {
        self.run_single_step_with(dt, &mut ())
    }

    /// Runs the enabled stages of one time step from `t` to `t + dt`.
    ///
    /// When any stage updates the nodal velocity, the change over the step is stored as the
    /// nodal apparent acceleration so that particle stages see a field varying linearly in
    /// time between the old and new nodal states.
    ///
    /// If the particle update fails, the grid is restored to its state at `t` and the error
    /// is returned, so the domain is left exactly as it was before the call.
    pub fn run_single_step_with(&mut self, dt: f64, observer: &mut dyn Observer) -> Result<(), Error> {
        let time = self.state.time;
        let control = self.state.control;
        log::info!(
            "Starting at t_n = {:.3}, time step Δt = {}, ending at t_(n+1) = {:.3}",
            time,
            dt,
            time + dt
        );

        let previous: Vec<Vector2> = self.nodes.iter().map(|node| node.velocity).collect();
        let checkpoint = if control.any_grid_stage() && control.update_position {
            Some((self.nodes.clone(), self.cells.clone(), self.state.field_time))
        } else {
            None
        };

        if control.do_init {
            self.init_step();
        }
        if control.solve_vstar {
            self.solve_vstar(dt);
        }
        if control.solve_p {
            self.solve_p(dt)?;
        }
        if control.solve_vtilde {
            self.solve_vtilde(dt);
        }
        if control.solve_venhanced {
            self.solve_venhanced();
        } else {
            for cell in self.cells.iter_mut() {
                cell.clear_enhanced_velocity();
            }
        }

        if control.any_grid_stage() {
            for (node, v) in self.nodes.iter_mut().zip(previous.iter()) {
                let a = (node.velocity - v) / dt;
                node.set_apparent_acceleration(a);
            }
            self.state.field_time = time + dt;
            log::debug!(
                "Largest nodal velocity component: {:.3e}",
                inf_norm(self.nodes.iter().flat_map(|node| node.velocity.iter().copied()))
            );
        }

        if control.update_position {
            if let Err(err) = self.update_particle_motion(dt) {
                if let Some((nodes, cells, field_time)) = checkpoint {
                    self.nodes = nodes;
                    self.cells = cells;
                    self.state.field_time = field_time;
                }
                log::warn!("Step from t = {} rolled back: {}", time, err);
                return Err(err);
            }
        }
        if control.update_stress {
            self.update_particle_stress(dt)?;
        }

        self.state.time = time + dt;

        if control.plot_figures {
            observer.visualize(self)?;
        }
        if control.write_output {
            observer.persist(&self.snapshot())?;
        }
        Ok(())
    }

    /*
     * Grid stages
     */

    /// Resets the nodal accumulators and scatters mass and particle momentum onto the nodes.
    pub fn init_step(&mut self) {
        for node in self.nodes.iter_mut() {
            node.wipe();
        }
        for cell in self.cells.iter() {
            cell.map_momentum_to_nodes(&mut self.nodes, &self.particles);
        }
        for node in self.nodes.iter_mut() {
            node.compute_velocity_from_momentum();
        }
    }

    /// Explicit update of the nodal velocity by the viscous (and optionally convective)
    /// forces.
    pub fn solve_vstar(&mut self, dt: f64) {
        let add_transient = self.state.control.add_transient;
        for node in self.nodes.iter_mut() {
            node.set_force(Vector2::zeros());
        }
        for cell in self.cells.iter() {
            cell.compute_forces(&mut self.nodes, add_transient);
        }
        for node in self.nodes.iter_mut() {
            node.update_vstar(dt);
        }
    }

    /// Recomputes the enhanced velocity mode of every cell from the current nodal velocity.
    pub fn solve_venhanced(&mut self) {
        for cell in self.cells.iter_mut() {
            cell.set_enhanced_velocity(&self.nodes);
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let [nx, ny] = self.grid.n_cells;
        writeln!(
            f,
            "Domain {} x {} with {} x {} cells at t = {}",
            self.grid.width, self.grid.height, nx, ny, self.state.time
        )?;
        writeln!(f, "Nodes:")?;
        for node in self.nodes.iter() {
            writeln!(
                f,
                "  {} ({}, {}): v = ({:.4}, {:.4}), p = {:.4}",
                node.id, node.grid[0], node.grid[1], node.velocity[0], node.velocity[1], node.pressure
            )?;
        }
        writeln!(f, "Cells:")?;
        for cell in self.cells.iter() {
            writeln!(f, "  {} {:?}: {} particles", cell.id, cell.nodes, cell.particles().len())?;
        }
        Ok(())
    }
}
