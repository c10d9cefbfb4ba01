use super::{derivative_f_b_ft, StressModel};
use crate::StrError;
use russell_lab::Matrix;

/// Implements the model Pe = μ F
pub struct LinearInF {
    mu: f64,
}

impl LinearInF {
    /// Allocates a new instance
    pub fn new(mu: f64) -> Self {
        LinearInF { mu }
    }
}

impl StressModel for LinearInF {
    fn stress(&self, pe: &mut Matrix, ff: &Matrix, _x_ref: &[f64]) -> Result<(), StrError> {
        let ndim = ff.dims().0;
        for i in 0..ndim {
            for j in 0..ndim {
                pe.set(i, j, self.mu * ff.get(i, j));
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

#[cfg(test)]
mod tests {
    use super::LinearInF;
    use crate::material::testing::{check_derivative, sample_ff};
    use crate::material::StressModel;
    use russell_lab::{approx_eq, Matrix};

    #[test]
    fn stress_works() {
        let model = LinearInF::new(2.0);
        let ff = sample_ff(2);
        let mut pe = Matrix::new(2, 2);
        model.stress(&mut pe, &ff, &[0.0, 0.0]).unwrap();
        approx_eq(pe.get(0, 1), 0.4, 1e-15);
        approx_eq(pe.get(1, 0), -0.3, 1e-15);
    }

    #[test]
    fn derivative_matches_numerical() {
        let model = LinearInF::new(0.7);
        check_derivative(&model, &sample_ff(2), &[0.0, 0.0], 1e-8);
        check_derivative(&model, &sample_ff(3), &[0.0, 0.0, 0.0], 1e-8);
    }
}
