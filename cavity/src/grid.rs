//! Geometry of the uniform background grid and point location.

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::params::GridParams;
use crate::{Error, Vector2};

/// Uniform rectangular grid with its lower-left corner at the origin.
///
/// Nodes are numbered `i * (ny + 1) + j` and cells `ny * i + j`, while the pressure degrees of
/// freedom are numbered row by row as `i + j * (nx + 1)`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub width: f64,
    pub height: f64,
    pub n_cells: [usize; 2],
    /// Cell size `(hx, hy)`.
    pub h: [f64; 2],
}

impl Grid {
    pub fn new(params: &GridParams) -> Result<Self, Error> {
        let GridParams {
            width,
            height,
            n_cells_x,
            n_cells_y,
        } = *params;
        if n_cells_x == 0 {
            return Err(Error::InvalidParameter {
                name: "n_cells_x".to_string(),
            });
        }
        if n_cells_y == 0 {
            return Err(Error::InvalidParameter {
                name: "n_cells_y".to_string(),
            });
        }
        if !(width > 0.0 && width.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "width".to_string(),
            });
        }
        if !(height > 0.0 && height.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "height".to_string(),
            });
        }
        Ok(Grid {
            width,
            height,
            n_cells: [n_cells_x, n_cells_y],
            h: [width / n_cells_x as f64, height / n_cells_y as f64],
        })
    }

    pub fn num_nodes(&self) -> usize {
        (self.n_cells[0] + 1) * (self.n_cells[1] + 1)
    }

    pub fn num_cells(&self) -> usize {
        self.n_cells[0] * self.n_cells[1]
    }

    #[inline]
    pub fn node_index(&self, i: usize, j: usize) -> usize {
        i * (self.n_cells[1] + 1) + j
    }

    #[inline]
    pub fn cell_index(&self, i: usize, j: usize) -> usize {
        self.n_cells[1] * i + j
    }

    /// Pressure degree of freedom of node `(i, j)`.
    #[inline]
    pub fn dof(&self, i: usize, j: usize) -> usize {
        i + j * (self.n_cells[0] + 1)
    }

    pub fn node_position(&self, i: usize, j: usize) -> Vector2 {
        Vector2::new(i as f64 * self.h[0], j as f64 * self.h[1])
    }

    /// Grid coordinates of the cell a point falls into, clamped to the valid range.
    ///
    /// Returns `None` for non-finite input.
    pub fn clamped_cell_coordinates(&self, x: &Vector2) -> Option<[usize; 2]> {
        if !(x[0].is_finite() && x[1].is_finite()) {
            return None;
        }
        let clamp = |v: f64, h: f64, n: usize| -> usize {
            let idx = (v / h).floor();
            if idx <= 0.0 {
                0
            } else {
                (idx as usize).min(n - 1)
            }
        };
        Some([
            clamp(x[0], self.h[0], self.n_cells[0]),
            clamp(x[1], self.h[1], self.n_cells[1]),
        ])
    }
}

/// Finds the cell containing `x`.
///
/// The `hint` cell is tested first. Otherwise the cell is computed directly from the grid
/// coordinates of the point, clamped so that points on the outer boundary resolve to the
/// boundary cells.
pub fn find_cell(grid: &Grid, cells: &[Cell], x: &Vector2, hint: Option<usize>) -> Result<usize, Error> {
    if let Some(k) = hint {
        if cells.get(k).map_or(false, |cell| cell.contains_exactly(x)) {
            return Ok(k);
        }
    }

    let cell_index_error = || Error::CellIndex { x: x[0], y: x[1] };
    let [i, j] = grid.clamped_cell_coordinates(x).ok_or_else(cell_index_error)?;
    let k = grid.cell_index(i, j);
    let cell = cells.get(k).ok_or_else(cell_index_error)?;
    if cell.contains(x) {
        Ok(k)
    } else {
        Err(Error::OutsideDomain { x: x[0], y: x[1] })
    }
}
