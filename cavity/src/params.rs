use serde::{Deserialize, Serialize};

use crate::grid::Grid;

/// Extent and resolution of the background grid.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridParams {
    pub width: f64,
    pub height: f64,
    pub n_cells_x: usize,
    pub n_cells_y: usize,
}

impl Default for GridParams {
    fn default() -> Self {
        GridParams {
            width: 1.0,
            height: 1.0,
            n_cells_x: 2,
            n_cells_y: 2,
        }
    }
}

/// Characteristic length used to derive the viscosity from the Reynolds number.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthScale {
    /// Smallest cell dimension.
    Cell,
    /// Smallest domain dimension.
    Domain,
}

impl Default for LengthScale {
    fn default() -> Self {
        LengthScale::Cell
    }
}

/// Physical parameters of the lid-driven cavity.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowParams {
    pub reynolds: f64,
    pub density: f64,
    /// Tangential velocity of the lid.
    pub velocity: f64,
    #[serde(default)]
    pub length_scale: LengthScale,
}

impl Default for FlowParams {
    fn default() -> Self {
        FlowParams {
            reynolds: 1.0,
            density: 1.0,
            velocity: 1.0,
            length_scale: LengthScale::Cell,
        }
    }
}

impl FlowParams {
    pub fn length(&self, grid: &Grid) -> f64 {
        match self.length_scale {
            LengthScale::Cell => grid.h[0].min(grid.h[1]),
            LengthScale::Domain => grid.width.min(grid.height),
        }
    }

    /// Dynamic viscosity `ρ v L / Re`.
    pub fn viscosity(&self, grid: &Grid) -> f64 {
        self.density * self.velocity * self.length(grid) / self.reynolds
    }
}

/// Toggles for the individual stages of a time step.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisControl {
    /// Rebuild the nodal state from the particle momentum at the start of every step.
    pub do_init: bool,
    pub solve_vstar: bool,
    pub solve_p: bool,
    pub solve_vtilde: bool,
    pub solve_venhanced: bool,
    pub update_position: bool,
    pub update_stress: bool,
    /// Include the convective term in the nodal forces.
    pub add_transient: bool,
    /// Invoke [`Observer::visualize`](crate::Observer::visualize) after every step.
    pub plot_figures: bool,
    /// Invoke [`Observer::persist`](crate::Observer::persist) after every step.
    pub write_output: bool,
}

impl Default for AnalysisControl {
    fn default() -> Self {
        AnalysisControl {
            do_init: false,
            solve_vstar: true,
            solve_p: true,
            solve_vtilde: true,
            solve_venhanced: true,
            update_position: true,
            update_stress: false,
            add_transient: false,
            plot_figures: false,
            write_output: false,
        }
    }
}

impl AnalysisControl {
    /// Only moves particles through a prescribed nodal field.
    pub fn particles_only() -> Self {
        AnalysisControl {
            do_init: false,
            solve_vstar: false,
            solve_p: false,
            solve_vtilde: false,
            solve_venhanced: false,
            update_position: true,
            update_stress: false,
            add_transient: false,
            plot_figures: false,
            write_output: false,
        }
    }

    /// Re-initializing from particles while also moving them with the convective term
    /// included double counts transport.
    pub fn is_consistent(&self) -> bool {
        !(self.do_init && self.update_position && self.add_transient)
    }

    /// Returns `true` if any stage modifying the nodal velocity is enabled.
    pub fn any_grid_stage(&self) -> bool {
        self.do_init || self.solve_vstar || self.solve_p || self.solve_vtilde
    }
}

/// Simulation clock and stage toggles owned by the domain.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisState {
    pub time: f64,
    /// Time at which the nodal velocity field is valid.
    pub field_time: f64,
    pub control: AnalysisControl,
}
