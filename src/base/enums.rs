use serde::{Deserialize, Serialize};

/// Defines the velocity degrees-of-freedom (DOF) that may receive essential boundary conditions
///
/// Note: The fixed numbering scheme corresponds to the velocity component.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Dof {
    /// Velocity along the first dimension
    Vx = 0,

    /// Velocity along the second dimension
    Vy = 1,

    /// Velocity along the third dimension
    Vz = 2,
}

impl Dof {
    /// Returns the velocity component index
    pub fn component(&self) -> usize {
        *self as usize
    }
}

/// Defines the quadrature rule used over the structure (solid) cells
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum SolidQuadrature {
    /// Tensor-product Gauss-Legendre rule with the given number of points per direction
    Gauss(usize),

    /// Iterated trapezoidal rule with the given number of subdivisions per direction
    ///
    /// The vertices of the sub-intervals are the integration points; thus, the rule
    /// samples the cell boundaries too.
    Trapezoid(usize),
}

/// Defines the interpolation of the fluid pressure
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum PressureSpace {
    /// Continuous pressure interpolated at the cell corners (bilinear or trilinear)
    Continuous,

    /// Discontinuous pressure with one set of coefficients per cell
    ///
    /// The pressure is a polynomial of total degree (velocity degree - 1) in the reference
    /// coordinates: constant over linear cells and {1, ξ₀, ξ₁(, ξ₂)} over quadratic cells.
    Discontinuous,
}

/// Defines the linear solver used in the Newton iterations
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum LinSol {
    /// Dense LU factorization (inverse) computed by russell_lab
    Dense,

    /// Sparse LU factorization computed by UMFPACK via russell_sparse
    Umfpack,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
