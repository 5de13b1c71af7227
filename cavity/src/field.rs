//! Sampling of velocity fields by the particle integrator.

use crate::cell::Cell;
use crate::grid::{find_cell, Grid};
use crate::motion::Motion;
use crate::node::Node;
use crate::{Error, Matrix2, Vector2};

/// Velocity and velocity gradient at a point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FieldSample {
    pub velocity: Vector2,
    pub gradient: Matrix2,
    /// Cell the sample was taken in, if the field lives on the grid.
    pub cell: Option<usize>,
}

pub trait FlowField {
    /// Samples the field at point `x` and absolute time `time`.
    ///
    /// `hint` is a cell likely to contain `x`, typically the one found by the previous sample
    /// along the same trajectory.
    fn sample(&self, x: &Vector2, time: f64, hint: Option<usize>) -> Result<FieldSample, Error>;
}

/// The nodal velocity field interpolated over the grid cells.
///
/// The nodal state is valid at `field_time`. At other times the field is extrapolated
/// linearly using the nodal apparent acceleration.
#[derive(Copy, Clone, Debug)]
pub struct GridField<'a> {
    pub grid: &'a Grid,
    pub nodes: &'a [Node],
    pub cells: &'a [Cell],
    pub field_time: f64,
}

impl FlowField for GridField<'_> {
    fn sample(&self, x: &Vector2, time: f64, hint: Option<usize>) -> Result<FieldSample, Error> {
        let k = find_cell(self.grid, self.cells, x, hint)?;
        let cell = &self.cells[k];
        let tau = time - self.field_time;
        let mut velocity = cell.velocity_at(self.nodes, x);
        let mut gradient = cell.velocity_gradient_at(self.nodes, x);
        if tau != 0.0 {
            velocity += cell.apparent_acceleration_at(self.nodes, x) * tau;
            gradient += cell.acceleration_gradient_at(self.nodes, x) * tau;
        }
        Ok(FieldSample {
            velocity,
            gradient,
            cell: Some(k),
        })
    }
}

/// A motion sampled directly, bypassing the grid.
#[derive(Copy, Clone, Debug)]
pub struct AnalyticalField<'a> {
    pub motion: &'a dyn Motion,
}

impl FlowField for AnalyticalField<'_> {
    fn sample(&self, x: &Vector2, time: f64, _hint: Option<usize>) -> Result<FieldSample, Error> {
        if !(x[0].is_finite() && x[1].is_finite()) {
            return Err(Error::CellIndex { x: x[0], y: x[1] });
        }
        Ok(FieldSample {
            velocity: self.motion.velocity(x, time),
            gradient: self.motion.velocity_gradient(x, time),
            cell: None,
        })
    }
}
