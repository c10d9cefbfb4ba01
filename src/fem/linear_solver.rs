use super::BlockMatrix;
use crate::base::{IfemError, LinSol};
use russell_lab::{mat_inverse, mat_vec_mul, Matrix, Vector};
use russell_sparse::{Genie, LinSolver};

/// Defines the solver of the linear systems J δ = -R arising in the Newton iterations
///
/// The vectors are concatenated: fluid block first, then solid block.
pub trait LinearSolver {
    /// Factorizes the Jacobian matrix
    fn factorize(&mut self, jacobian: &BlockMatrix) -> Result<(), IfemError>;

    /// Solves the system with the last factorized matrix
    fn solve(&mut self, x: &mut Vector, rhs: &Vector) -> Result<(), IfemError>;
}

/// Allocates the linear solver selected in the configuration
pub fn allocate_linear_solver(lin_sol: LinSol) -> Result<Box<dyn LinearSolver>, IfemError> {
    match lin_sol {
        LinSol::Dense => Ok(Box::new(DenseSolver::new())),
        LinSol::Umfpack => Ok(Box::new(UmfpackSolver::new()?)),
    }
}

/// Returns an error if any component is not finite
fn check_solution(x: &Vector) -> Result<(), IfemError> {
    if x.as_data().iter().any(|v| !v.is_finite()) {
        return Err(IfemError::SingularSystem(
            "the solution of the linear system is not finite".to_string(),
        ));
    }
    Ok(())
}

/// Solves the linear systems with the dense inverse computed by russell_lab
///
/// Only suitable for small problems (e.g., tests).
pub struct DenseSolver {
    inverse: Option<Matrix>,
}

impl DenseSolver {
    /// Allocates a new instance
    pub fn new() -> Self {
        DenseSolver { inverse: None }
    }
}

impl LinearSolver for DenseSolver {
    fn factorize(&mut self, jacobian: &BlockMatrix) -> Result<(), IfemError> {
        self.inverse = None;
        let a = jacobian.to_dense();
        let n = a.dims().0;
        let mut ai = Matrix::new(n, n);
        let det = mat_inverse(&mut ai, &a).map_err(|e| IfemError::SingularSystem(e.to_string()))?;
        if det == 0.0 || !det.is_finite() {
            return Err(IfemError::SingularSystem(
                "the Jacobian matrix has a zero determinant".to_string(),
            ));
        }
        self.inverse = Some(ai);
        Ok(())
    }

    fn solve(&mut self, x: &mut Vector, rhs: &Vector) -> Result<(), IfemError> {
        match &self.inverse {
            Some(ai) => {
                mat_vec_mul(x, 1.0, ai, rhs)?;
                check_solution(x)
            }
            None => Err(IfemError::SingularSystem(
                "the Jacobian matrix must be factorized first".to_string(),
            )),
        }
    }
}

/// Solves the linear systems with UMFPACK via russell_sparse
///
/// The blocks are concatenated into a single COO matrix. The sparsity pattern of the
/// coupling blocks changes with the structure position; thus, a new solver is allocated
/// for every factorization.
pub struct UmfpackSolver {
    solver: LinSolver<'static>,
    factorized: bool,
}

impl UmfpackSolver {
    /// Allocates a new instance
    pub fn new() -> Result<Self, IfemError> {
        Ok(UmfpackSolver {
            solver: LinSolver::new(Genie::Umfpack)?,
            factorized: false,
        })
    }
}

impl LinearSolver for UmfpackSolver {
    fn factorize(&mut self, jacobian: &BlockMatrix) -> Result<(), IfemError> {
        self.factorized = false;
        let kk = jacobian.to_coo()?;
        self.solver = LinSolver::new(Genie::Umfpack)?;
        self.solver
            .actual
            .factorize(&kk, None)
            .map_err(|e| IfemError::SingularSystem(e.to_string()))?;
        self.factorized = true;
        Ok(())
    }

    fn solve(&mut self, x: &mut Vector, rhs: &Vector) -> Result<(), IfemError> {
        if !self.factorized {
            return Err(IfemError::SingularSystem(
                "the Jacobian matrix must be factorized first".to_string(),
            ));
        }
        self.solver
            .actual
            .solve(x, rhs, false)
            .map_err(|e| IfemError::SingularSystem(e.to_string()))?;
        check_solution(x)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
