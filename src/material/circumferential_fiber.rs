use super::{derivative_f_b_ft, StressModel};
use crate::StrError;
use russell_lab::Matrix;

/// Implements circumferential fibers about a fixed center (2D only)
///
/// ```text
/// Pe = μ F E   with   E = eθ ⊗ eθ,   eθ = (-py, px) / ‖p‖,   p = X - center
/// ```
pub struct CircumferentialFiber {
    mu: f64,
    center: [f64; 2],
}

impl CircumferentialFiber {
    /// Allocates a new instance
    pub fn new(mu: f64, center: [f64; 2]) -> Self {
        CircumferentialFiber { mu, center }
    }

    /// Computes the fiber projector E = eθ ⊗ eθ at the reference position
    pub fn projector(&self, ee: &mut Matrix, x_ref: &[f64]) -> Result<(), StrError> {
        let px = x_ref[0] - self.center[0];
        let py = x_ref[1] - self.center[1];
        let norm = f64::sqrt(px * px + py * py);
        if norm <= f64::EPSILON {
            return Err("the fiber direction is undefined at the center");
        }
        let e = [-py / norm, px / norm];
        for i in 0..2 {
            for j in 0..2 {
                ee.set(i, j, e[i] * e[j]);
            }
        }
        Ok(())
    }
}

impl StressModel for CircumferentialFiber {
    fn stress(&self, pe: &mut Matrix, ff: &Matrix, x_ref: &[f64]) -> Result<(), StrError> {
        let mut ee = Matrix::new(2, 2);
        self.projector(&mut ee, x_ref)?;
        for i in 0..2 {
            for j in 0..2 {
                pe.set(i, j, self.mu * (ff.get(i, 0) * ee.get(0, j) + ff.get(i, 1) * ee.get(1, j)));
            }
        }
        Ok(())
    }

    fn pe_ft_derivative(
        &self,
        dd: &mut Matrix,
        ff: &Matrix,
        x_ref: &[f64],
        comp_k: usize,
        grad_k: &[f64],
    ) -> Result<(), StrError> {
        let mut ee = Matrix::new(2, 2);
        self.projector(&mut ee, x_ref)?;
        derivative_f_b_ft(dd, self.mu, ff, Some(&ee), comp_k, grad_k);
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
