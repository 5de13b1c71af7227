use sprs::{FillInReduction, SymmetryCheck};

use super::{LinearSystem, PIN_PENALTY};
use crate::Error;

/// Sparse symmetric system assembled from triplets and solved with an LDLᵀ factorization.
///
/// Duplicate triplets are summed when the matrix is compressed.
#[derive(Debug)]
pub struct SparseSystem {
    triplets: sprs::TriMat<f64>,
    load: Vec<f64>,
}

impl SparseSystem {
    pub fn new(size: usize) -> Self {
        SparseSystem {
            // A node touches at most four cells, each contributing four entries.
            triplets: sprs::TriMat::with_capacity((size, size), 16 * size),
            load: vec![0.0; size],
        }
    }

    /// Compressed copy of the assembled matrix.
    pub fn matrix(&self) -> sprs::CsMat<f64> {
        self.triplets.to_csc()
    }
}

impl LinearSystem for SparseSystem {
    fn size(&self) -> usize {
        self.load.len()
    }

    #[inline]
    fn add_to_matrix(&mut self, row: usize, col: usize, value: f64) {
        self.triplets.add_triplet(row, col, value);
    }

    #[inline]
    fn add_to_load(&mut self, row: usize, value: f64) {
        self.load[row] += value;
    }

    fn pin(&mut self, dof: usize, value: f64) {
        self.triplets.add_triplet(dof, dof, PIN_PENALTY);
        self.load[dof] = PIN_PENALTY * value;
    }

    fn solve(&mut self) -> Result<Vec<f64>, Error> {
        let matrix: sprs::CsMat<f64> = self.triplets.to_csc();
        log::trace!("Sparse pressure matrix has {} non-zeros", matrix.nnz());
        let ldl = sprs_ldl::Ldl::new()
            .fill_in_reduction(FillInReduction::ReverseCuthillMcKee)
            .check_symmetry(SymmetryCheck::DontCheckSymmetry)
            .numeric(matrix.view())
            .map_err(|err| Error::SparseFactorization {
                reason: err.to_string(),
            })?;
        let x = ldl.solve(&self.load[..]);
        if x.iter().any(|v| !v.is_finite()) {
            return Err(Error::SingularPressureSystem);
        }
        Ok(x)
    }
}
