use thiserror::Error;

/// Recoverable failures raised by the numeric stages.
///
/// Degraded input (clamped eigenpair counts, partial convergence, degenerate triangles) is not an
/// error: it is logged and counted in [`crate::Diagnostics`]. Spectral-gap violations are contract
/// failures and panic instead of returning one of these.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HksError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
    #[error("eigensolver failure: {0}")]
    SolverFailure(String),
}

pub type HksResult<T> = std::result::Result<T, HksError>;
