use super::{CircumferentialFiber, LinearInF, NeoHookean};
use crate::base::{IfemError, ParamStress};
use crate::StrError;
use russell_lab::Matrix;

/// Specifies the essential functions for the structure stress models
///
/// The models receive the deformation gradient F = I + ∇w (with respect to the reference
/// coordinates X) and the reference position of the integration point.
pub trait StressModel: Send {
    /// Computes the first Piola-Kirchhoff stress Pe(F)
    fn stress(&self, pe: &mut Matrix, ff: &Matrix, x_ref: &[f64]) -> Result<(), StrError>;

    /// Computes the derivative of Pe·Fᵀ with respect to one local displacement DOF
    ///
    /// The DOF has component `comp_k` and its interpolation function has the reference
    /// gradient `grad_k`; thus, the variation of F is δF = e(comp_k) ⊗ grad_k.
    fn pe_ft_derivative(
        &self,
        dd: &mut Matrix,
        ff: &Matrix,
        x_ref: &[f64],
        comp_k: usize,
        grad_k: &[f64],
    ) -> Result<(), StrError>;

    /// Computes Pe·Fᵀ
    fn stress_times_ft(&self, pe_ft: &mut Matrix, pe: &mut Matrix, ff: &Matrix, x_ref: &[f64]) -> Result<(), StrError> {
        self.stress(pe, ff, x_ref)?;
        let ndim = ff.dims().0;
        for i in 0..ndim {
            for j in 0..ndim {
                let mut sum = 0.0;
                for k in 0..ndim {
                    sum += pe.get(i, k) * ff.get(j, k);
                }
                pe_ft.set(i, j, sum);
            }
        }
        Ok(())
    }
}

/// Computes the derivative of μ·F·B·Fᵀ given the symmetric matrix B (None means identity)
///
/// ```text
/// dd[i][j] = μ (δ(i,k) (g·B)·F[j] + δ(j,k) (g·B)·F[i])
/// ```
pub(crate) fn derivative_f_b_ft(
    dd: &mut Matrix,
    mu: f64,
    ff: &Matrix,
    bb: Option<&Matrix>,
    comp_k: usize,
    grad_k: &[f64],
) {
    let ndim = ff.dims().0;
    let mut gb = [0.0; 3];
    for l in 0..ndim {
        gb[l] = match bb {
            Some(b) => (0..ndim).map(|m| grad_k[m] * b.get(m, l)).sum(),
            None => grad_k[l],
        };
    }
    let dot = |row: usize| -> f64 { (0..ndim).map(|l| gb[l] * ff.get(row, l)).sum() };
    dd.fill(0.0);
    for i in 0..ndim {
        for j in 0..ndim {
            let mut value = 0.0;
            if i == comp_k {
                value += dot(j);
            }
            if j == comp_k {
                value += dot(i);
            }
            dd.set(i, j, mu * value);
        }
    }
}

/// Holds the actual stress model implementation
pub struct ModelStress {
    /// Holds the actual model implementation
    pub actual: Box<dyn StressModel>,
}

impl ModelStress {
    /// Allocates a new instance
    pub fn new(ndim: usize, param: &ParamStress) -> Result<Self, IfemError> {
        if ndim != 2 && ndim != 3 {
            return Err(IfemError::Configuration(format!("ndim = {} is not supported", ndim)));
        }
        let actual: Box<dyn StressModel> = match *param {
            // Pe = μ (F - F⁻ᵀ)
            ParamStress::NeoHookean { mu } => Box::new(NeoHookean::new(mu)),

            // Pe = μ F
            ParamStress::LinearInF { mu } => Box::new(LinearInF::new(mu)),

            // Pe = μ F (eθ ⊗ eθ)
            ParamStress::CircumferentialFiber { mu, center } => {
                if ndim != 2 {
                    return Err(IfemError::Configuration(
                        "the circumferential fiber model requires ndim = 2".to_string(),
                    ));
                }
                Box::new(CircumferentialFiber::new(mu, center))
            }
        };
        Ok(ModelStress { actual })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
