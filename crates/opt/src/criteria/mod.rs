//! Acquisition criteria which minimum location will determine the next point
//! to be evaluated by the bayesian optimization.
mod lcb;

pub use lcb::LowerConfidenceBound;

use crate::errors::Result;
use gpbo_gp::GaussianProcess;
use ndarray::{Array1, ArrayView1};

/// A trait for acquisition criterion which minimum location is
/// the next promising point to be evaluated
pub trait AcquisitionCriterion: Sync {
    /// Name of the criterion
    fn name(&self) -> &'static str;

    /// Criterion value at given point `x` with regards to given
    /// surrogate `model` of the black-box function
    fn value(&self, x: &ArrayView1<f64>, model: &GaussianProcess<f64>) -> Result<f64>;

    /// Derivatives wrt `x` components of the criterion value
    fn grad(&self, x: &ArrayView1<f64>, model: &GaussianProcess<f64>) -> Result<Array1<f64>>;
}
