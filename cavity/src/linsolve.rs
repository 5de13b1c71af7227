//! Assembly and solution of the global pressure system.
//!
//! Both implementations accept the same sequence of calls: accumulate matrix and load
//! entries, pin degrees of freedom, then solve. Which one is used is decided by
//! [`pressure_system`] from the problem size alone.

mod dense;
mod sparse;

pub use dense::*;
pub use sparse::*;

use crate::Error;

/// Diagonal penalty used to pin a degree of freedom.
pub const PIN_PENALTY: f64 = 1.0e20;

/// Systems with fewer degrees of freedom than this are solved densely.
pub const DENSE_DOF_THRESHOLD: usize = 100;

pub trait LinearSystem {
    /// Number of rows (and columns) of the system.
    fn size(&self) -> usize;
    /// Adds `value` to the matrix entry at `(row, col)`.
    fn add_to_matrix(&mut self, row: usize, col: usize, value: f64);
    /// Adds `value` to the load vector entry at `row`.
    fn add_to_load(&mut self, row: usize, value: f64);
    /// Forces the solution at `dof` to (approximately) `value` with a diagonal penalty.
    ///
    /// The penalty is added to the diagonal while the load entry is replaced.
    fn pin(&mut self, dof: usize, value: f64);
    /// Solves the assembled system.
    fn solve(&mut self) -> Result<Vec<f64>, Error>;

    /// Scatters a dense element block into the global system.
    fn add_element<const N: usize>(
        &mut self,
        dofs: &[usize; N],
        matrix: &na::SMatrix<f64, N, N>,
        load: &na::SVector<f64, N>,
    ) where
        Self: Sized,
    {
        for a in 0..N {
            self.add_to_load(dofs[a], load[a]);
            for b in 0..N {
                self.add_to_matrix(dofs[a], dofs[b], matrix[(a, b)]);
            }
        }
    }
}

/// Kind of linear solver used for a system.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SolverKind {
    Dense,
    Sparse,
}

impl SolverKind {
    pub fn for_size(size: usize) -> Self {
        if size < DENSE_DOF_THRESHOLD {
            SolverKind::Dense
        } else {
            SolverKind::Sparse
        }
    }
}

/// Creates an empty system of the given size, dense or sparse depending on the size.
pub fn pressure_system(size: usize) -> Box<dyn LinearSystem> {
    match SolverKind::for_size(size) {
        SolverKind::Dense => {
            log::debug!("Using dense pressure solve for {} dofs", size);
            Box::new(DenseSystem::new(size))
        }
        SolverKind::Sparse => {
            log::debug!("Using sparse pressure solve for {} dofs", size);
            Box::new(SparseSystem::new(size))
        }
    }
}

impl LinearSystem for Box<dyn LinearSystem> {
    fn size(&self) -> usize {
        (**self).size()
    }
    fn add_to_matrix(&mut self, row: usize, col: usize, value: f64) {
        (**self).add_to_matrix(row, col, value)
    }
    fn add_to_load(&mut self, row: usize, value: f64) {
        (**self).add_to_load(row, value)
    }
    fn pin(&mut self, dof: usize, value: f64) {
        (**self).pin(dof, value)
    }
    fn solve(&mut self) -> Result<Vec<f64>, Error> {
        (**self).solve()
    }
}
