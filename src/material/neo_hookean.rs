use super::{derivative_f_b_ft, StressModel};
use crate::StrError;
use russell_lab::{mat_inverse, Matrix};

/// Implements the model Pe = μ (F - F⁻ᵀ)
///
/// Note that Pe·Fᵀ = μ (F Fᵀ - I); hence, the stress vanishes in the reference configuration.
pub struct NeoHookean {
    mu: f64,
}

impl NeoHookean {
    /// Allocates a new instance
    pub fn new(mu: f64) -> Self {
        NeoHookean { mu }
    }
}

impl StressModel for NeoHookean {
    fn stress(&self, pe: &mut Matrix, ff: &Matrix, _x_ref: &[f64]) -> Result<(), StrError> {
        let ndim = ff.dims().0;
        let mut ff_inv = Matrix::new(ndim, ndim);
        let det = mat_inverse(&mut ff_inv, ff)?;
        if det <= 0.0 {
            return Err("the deformation gradient must have a positive determinant");
        }
        for i in 0..ndim {
            for j in 0..ndim {
                pe.set(i, j, self.mu * (ff.get(i, j) - ff_inv.get(j, i)));
            }
        }
        Ok(())
    }

    fn pe_ft_derivative(
        &self,
        dd: &mut Matrix,
        ff: &Matrix,
        _x_ref: &[f64],
        comp_k: usize,
        grad_k: &[f64],
    ) -> Result<(), StrError> {
        derivative_f_b_ft(dd, self.mu, ff, None, comp_k, grad_k);
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
