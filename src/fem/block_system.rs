use crate::StrError;
use russell_lab::{vec_norm, Matrix, Norm, Vector};
use russell_sparse::{CooMatrix, Sym};
use serde::{Deserialize, Serialize};

/// Holds a vector split into the fluid (velocity-pressure) and solid (displacement) blocks
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BlockVector {
    /// Fluid block ξ_f
    pub fluid: Vector,

    /// Solid block ξ_s
    pub solid: Vector,
}

impl BlockVector {
    /// Allocates a new instance filled with zeros
    pub fn new(n_fluid: usize, n_solid: usize) -> Self {
        BlockVector {
            fluid: Vector::new(n_fluid),
            solid: Vector::new(n_solid),
        }
    }

    /// Returns the total dimension
    pub fn dim(&self) -> usize {
        self.fluid.dim() + self.solid.dim()
    }

    /// Fills both blocks with a value
    pub fn fill(&mut self, value: f64) {
        self.fluid.fill(value);
        self.solid.fill(value);
    }

    /// Returns the Euclidean norm of the whole vector
    pub fn norm(&self) -> f64 {
        let f = vec_norm(&self.fluid, Norm::Euc);
        let s = vec_norm(&self.solid, Norm::Euc);
        f64::sqrt(f * f + s * s)
    }

    /// Copies the values of another vector with the same dimensions
    pub fn set(&mut self, other: &BlockVector) {
        for i in 0..self.fluid.dim() {
            self.fluid[i] = other.fluid[i];
        }
        for i in 0..self.solid.dim() {
            self.solid[i] = other.solid[i];
        }
    }

    /// Sets this vector to the backward difference (a - b) / dt
    pub fn set_rate(&mut self, a: &BlockVector, b: &BlockVector, dt: f64) {
        for i in 0..self.fluid.dim() {
            self.fluid[i] = (a.fluid[i] - b.fluid[i]) / dt;
        }
        for i in 0..self.solid.dim() {
            self.solid[i] = (a.solid[i] - b.solid[i]) / dt;
        }
    }

    /// Adds a concatenated vector [δ_f, δ_s] to this vector
    pub fn add_concatenated(&mut self, delta: &Vector) {
        let nf = self.fluid.dim();
        for i in 0..nf {
            self.fluid[i] += delta[i];
        }
        for i in 0..self.solid.dim() {
            self.solid[i] += delta[nf + i];
        }
    }

    /// Writes the concatenated vector [α v_f, α v_s]
    pub fn to_concatenated(&self, out: &mut Vector, alpha: f64) {
        let nf = self.fluid.dim();
        for i in 0..nf {
            out[i] = alpha * self.fluid[i];
        }
        for i in 0..self.solid.dim() {
            out[nf + i] = alpha * self.solid[i];
        }
    }
}

/// Holds the block Jacobian matrix
///
/// ```text
/// ┌         ┐
/// │ Jff Jfs │
/// │ Jsf Jss │
/// └         ┘
/// ```
///
/// Each block is a COO matrix; repeated (i,j) entries are summed, as in finite element
/// assembly. The blocks are allocated anew for each tangent assembly because the
/// fluid-solid couplings follow the current position of the structure.
#[derive(Clone, Debug)]
pub struct BlockMatrix {
    /// Fluid-fluid block
    pub ff: CooMatrix,

    /// Fluid-solid block (fluid rows, solid columns)
    pub fs: CooMatrix,

    /// Solid-fluid block (solid rows, fluid columns)
    pub sf: CooMatrix,

    /// Solid-solid block
    pub ss: CooMatrix,
}

impl BlockMatrix {
    /// Allocates a new instance
    ///
    /// # Input
    ///
    /// * `n_fluid` -- number of fluid equations
    /// * `n_solid` -- number of solid equations
    /// * `max_nnz` -- maximum number of entries (including repeated ones) of ff, fs, sf, and ss
    pub fn new(n_fluid: usize, n_solid: usize, max_nnz: [usize; 4]) -> Result<Self, StrError> {
        let [nnz_ff, nnz_fs, nnz_sf, nnz_ss] = max_nnz.map(|n| usize::max(1, n));
        Ok(BlockMatrix {
            ff: CooMatrix::new(n_fluid, n_fluid, nnz_ff, Sym::No)?,
            fs: CooMatrix::new(n_fluid, n_solid, nnz_fs, Sym::No)?,
            sf: CooMatrix::new(n_solid, n_fluid, nnz_sf, Sym::No)?,
            ss: CooMatrix::new(n_solid, n_solid, nnz_ss, Sym::No)?,
        })
    }

    /// Returns the number of fluid equations
    pub fn n_fluid(&self) -> usize {
        self.ff.get_info().0
    }

    /// Returns the total dimension
    pub fn dim(&self) -> usize {
        self.ff.get_info().0 + self.ss.get_info().0
    }

    /// Returns the total number of (possibly repeated) entries
    pub fn nnz(&self) -> usize {
        self.ff.get_info().2 + self.fs.get_info().2 + self.sf.get_info().2 + self.ss.get_info().2
    }

    /// Executes a function for each entry (i, j, value) using the global (concatenated) indices
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(usize, usize, f64),
    {
        let nf = self.n_fluid();
        for (block, di, dj) in [(&self.ff, 0, 0), (&self.fs, 0, nf), (&self.sf, nf, 0), (&self.ss, nf, nf)] {
            let rows = block.get_row_indices();
            let columns = block.get_col_indices();
            for (k, value) in block.get_values().iter().enumerate() {
                f(di + rows[k] as usize, dj + columns[k] as usize, *value);
            }
        }
    }

    /// Returns the concatenated matrix as a single COO matrix
    pub fn to_coo(&self) -> Result<CooMatrix, StrError> {
        let n = self.dim();
        let mut coo = CooMatrix::new(n, n, usize::max(1, self.nnz()), Sym::No)?;
        let mut status = Ok(());
        self.for_each(|i, j, v| {
            if status.is_ok() {
                status = coo.put(i, j, v);
            }
        });
        status?;
        Ok(coo)
    }

    /// Returns the dense version of this matrix
    pub fn to_dense(&self) -> Matrix {
        let n = self.dim();
        let mut a = Matrix::new(n, n);
        self.for_each(|i, j, v| a.add(i, j, v));
        a
    }

    /// Computes v = J u with concatenated vectors
    pub fn mat_vec_mul(&self, v: &mut Vector, u: &Vector) {
        v.fill(0.0);
        self.for_each(|i, j, a| v[i] += a * u[j]);
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{BlockMatrix, BlockVector};
    use russell_lab::{approx_eq, Vector};

    #[test]
    fn block_vector_works() {
        let mut a = BlockVector::new(2, 1);
        assert_eq!(a.dim(), 3);
        a.fluid[0] = 3.0;
        a.solid[0] = 4.0;
        approx_eq(a.norm(), 5.0, 1e-15);
        let mut b = BlockVector::new(2, 1);
        b.set(&a);
        assert_eq!(b.fluid.as_data(), &[3.0, 0.0]);
        b.add_concatenated(&Vector::from(&[1.0, 2.0, 3.0]));
        assert_eq!(b.fluid.as_data(), &[4.0, 2.0]);
        assert_eq!(b.solid.as_data(), &[7.0]);
        let mut rate = BlockVector::new(2, 1);
        rate.set_rate(&b, &a, 0.5);
        assert_eq!(rate.fluid.as_data(), &[2.0, 4.0]);
        assert_eq!(rate.solid.as_data(), &[6.0]);
        let mut c = Vector::new(3);
        rate.to_concatenated(&mut c, -1.0);
        assert_eq!(c.as_data(), &[-2.0, -4.0, -6.0]);
        rate.fill(0.0);
        assert_eq!(rate.norm(), 0.0);
    }

    #[test]
    fn block_matrix_works() {
        // ┌           ┐
        // │ 1  0 │ 5  │
        // │ 0  2 │ 0  │
        // │──────┼────│
        // │ 0  6 │ 3  │
        // └           ┘
        let mut jj = BlockMatrix::new(2, 1, [3, 1, 1, 1]).unwrap();
        jj.ff.put(0, 0, 0.5).unwrap();
        jj.ff.put(0, 0, 0.5).unwrap(); // repeated entries are summed
        jj.ff.put(1, 1, 2.0).unwrap();
        jj.fs.put(0, 0, 5.0).unwrap();
        jj.sf.put(0, 1, 6.0).unwrap();
        jj.ss.put(0, 0, 3.0).unwrap();
        assert_eq!(jj.n_fluid(), 2);
        assert_eq!(jj.dim(), 3);
        assert_eq!(jj.nnz(), 6);
        let a = jj.to_dense();
        let correct = [[1.0, 0.0, 5.0], [0.0, 2.0, 0.0], [0.0, 6.0, 3.0]];
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(a.get(i, j), correct[i][j]);
            }
        }
        let mut v = Vector::new(3);
        jj.mat_vec_mul(&mut v, &Vector::from(&[1.0, 1.0, 1.0]));
        assert_eq!(v.as_data(), &[6.0, 2.0, 9.0]);
        let coo = jj.to_coo().unwrap();
        assert_eq!(coo.get_info().2, 6);
        let b = coo.as_dense();
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(b.get(i, j), correct[i][j]);
            }
        }
        assert_eq!(
            jj.ff.put(1, 0, 1.0).err(),
            Some("COO matrix: max number of items has been reached")
        );
    }
}
