use serde::{Deserialize, Serialize};

/// Holds parameters for the structure stress models
///
/// The first Piola-Kirchhoff stress Pe is a function of the deformation gradient F = I + ∇w.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub enum ParamStress {
    /// Incompressible neo-Hookean-like model
    ///
    /// ```text
    /// Pe = μ (F - F⁻ᵀ)
    /// ```
    NeoHookean {
        /// Shear modulus
        mu: f64,
    },

    /// Model linear in the deformation gradient
    ///
    /// ```text
    /// Pe = μ F
    /// ```
    LinearInF {
        /// Shear modulus
        mu: f64,
    },

    /// Circumferential fibers about a fixed center (2D only)
    ///
    /// ```text
    /// Pe = μ F (eθ ⊗ eθ)   with   eθ = (-py, px) / ‖p‖   and   p = X - center
    /// ```
    CircumferentialFiber {
        /// Shear modulus (fiber stiffness)
        mu: f64,

        /// Center of the fibers
        center: [f64; 2],
    },
}

impl ParamStress {
    /// Returns the shear modulus
    pub fn mu(&self) -> f64 {
        match self {
            ParamStress::NeoHookean { mu } => *mu,
            ParamStress::LinearInF { mu } => *mu,
            ParamStress::CircumferentialFiber { mu, .. } => *mu,
        }
    }
}

/// Holds the material constants of the fluid and the immersed structure
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct ParamImmersed {
    /// Density ρ (fluid and structure)
    pub rho: f64,

    /// Dynamic viscosity η
    pub eta: f64,

    /// Spreading coefficient Φ_B multiplying the structure kinematic equation
    pub phi_b: f64,

    /// Parameters for the structure stress
    pub stress: ParamStress,
}

impl ParamImmersed {
    /// Returns a sample set of parameters with the neo-Hookean-like model
    pub fn sample() -> Self {
        ParamImmersed {
            rho: 1.0,
            eta: 1.0,
            phi_b: 1.0,
            stress: ParamStress::NeoHookean { mu: 1.0 },
        }
    }

    /// Returns a sample set of parameters with the circumferential fiber model
    pub fn sample_ring(center: [f64; 2]) -> Self {
        ParamImmersed {
            rho: 1.0,
            eta: 1.0,
            phi_b: 1.0,
            stress: ParamStress::CircumferentialFiber { mu: 1.0, center },
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
