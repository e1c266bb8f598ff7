use thiserror::Error;

/// A result type for GP regression algorithm
pub type Result<T> = std::result::Result<T, GpError>;

/// An error when using [`GaussianProcess`](crate::GaussianProcess) algorithm
#[derive(Error, Debug)]
pub enum GpError {
    /// When the requested kernel is not handled
    #[error("Unsupported kernel: {0}")]
    UnsupportedKernel(String),
    /// When the regularized covariance matrix cannot be Cholesky factorized
    #[error("Non positive definite covariance: {0}")]
    NonPositiveDefiniteCovariance(String),
    /// When every start of the hyperparameters optimization fails
    #[error("Optimization failure: {0}")]
    OptimizationFailure(String),
    /// When shapes of inputs, outputs or hyperparameters are inconsistent
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
    #[error(transparent)]
    /// When linear algebra computation fails
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// When a linfa error occurs
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
    /// When error due to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
}
