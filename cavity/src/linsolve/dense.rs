use super::{LinearSystem, PIN_PENALTY};
use crate::Error;

/// Dense system solved by LU decomposition with partial pivoting.
#[derive(Clone, Debug)]
pub struct DenseSystem {
    matrix: na::DMatrix<f64>,
    load: na::DVector<f64>,
}

impl DenseSystem {
    pub fn new(size: usize) -> Self {
        DenseSystem {
            matrix: na::DMatrix::zeros(size, size),
            load: na::DVector::zeros(size),
        }
    }

    pub fn matrix(&self) -> &na::DMatrix<f64> {
        &self.matrix
    }
}

impl LinearSystem for DenseSystem {
    fn size(&self) -> usize {
        self.load.len()
    }

    #[inline]
    fn add_to_matrix(&mut self, row: usize, col: usize, value: f64) {
        self.matrix[(row, col)] += value;
    }

    #[inline]
    fn add_to_load(&mut self, row: usize, value: f64) {
        self.load[row] += value;
    }

    fn pin(&mut self, dof: usize, value: f64) {
        self.matrix[(dof, dof)] += PIN_PENALTY;
        self.load[dof] = PIN_PENALTY * value;
    }

    fn solve(&mut self) -> Result<Vec<f64>, Error> {
        let lu = self.matrix.clone().lu();
        let x = lu.solve(&self.load).ok_or(Error::SingularPressureSystem)?;
        if x.iter().any(|v| !v.is_finite()) {
            return Err(Error::SingularPressureSystem);
        }
        Ok(x.as_slice().to_vec())
    }
}
