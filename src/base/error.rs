use crate::StrError;
use thiserror::Error;

/// Defines the errors raised by the immersed simulator
///
/// The configuration and geometry errors abort the setup or the assembly immediately.
/// A singular system is not retried on its own; it usually ends as a nonconvergence
/// error after the Jacobian refreshes fail to help.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum IfemError {
    /// Unsupported model, cell kind, or dimensionality combination
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A structure sample point maps outside the fluid domain
    #[error("geometry error: {0}")]
    Geometry(String),

    /// The factorization or the solution of the linear system failed
    #[error("singular system: {0}")]
    SingularSystem(String),

    /// The outer retry budget of the Newton iterations has been exceeded
    #[error("Newton iterations did not converge at t = {time:?} after {iterations} iterations and {retries} retries (‖R‖ = {norm_rr:e})")]
    Nonconvergence {
        /// Time of the failed step
        time: f64,

        /// Total number of iterations
        iterations: usize,

        /// Number of outer retries
        retries: usize,

        /// Last residual norm
        norm_rr: f64,
    },

    /// Failure reported by the finite element or linear algebra backends
    #[error("backend error: {0}")]
    Backend(&'static str),
}

impl From<StrError> for IfemError {
    fn from(err: StrError) -> Self {
        IfemError::Backend(err)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
