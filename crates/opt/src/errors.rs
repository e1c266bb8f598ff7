use thiserror::Error;

/// A result type for bayesian optimization errors
pub type Result<T> = std::result::Result<T, BoError>;

/// An error for bayesian optimization algorithm
#[derive(Error, Debug)]
pub enum BoError {
    /// When the GP surrogate fails to fit or to predict
    #[error("GP error: {0}")]
    GpError(#[from] gpbo_gp::GpError),
    /// When the acquisition criterion optimization fails
    #[error("Optimization failure: {0}")]
    OptimizationFailure(String),
    /// When black-box function output or starting point does not have the expected size
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
    /// When the optimizer configuration is not consistent
    #[error("Invalid configuration: {0}")]
    InvalidConfigError(String),
    /// When configuration (de)serialization fails
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}
