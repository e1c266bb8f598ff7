use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// An interface for the black-box function under optimization
///
/// The function takes a point `x` (nx,) and returns its outputs (ny,),
/// the first one being the objective to be minimized.
pub trait BlackBoxFn: Fn(&ArrayView1<f64>) -> Array1<f64> {}
impl<T> BlackBoxFn for T where T: Fn(&ArrayView1<f64>) -> Array1<f64> {}

/// Record of one bayesian optimization iteration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Iteration number, starting from 0
    pub iter: usize,
    /// Point suggested by the acquisition criterion optimization
    pub x: Array1<f64>,
    /// Black-box outputs at `x`
    pub y: Array1<f64>,
    /// Acquisition criterion value at `x`
    pub acquisition: f64,
    /// GP hyperparameters (nx + 2, ny) after the model update
    pub hypopt: Array2<f64>,
}

/// Optimization result
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptimResult {
    /// Optimum x value
    pub x_opt: Array1<f64>,
    /// Optimum y value (e.g. f(x))
    pub y_opt: Array1<f64>,
    /// History of evaluated inputs, initial training data included
    pub x_doe: Array2<f64>,
    /// History of evaluated outputs, initial training data included
    pub y_doe: Array2<f64>,
    /// Records of the iterations
    pub history: Vec<IterationRecord>,
}
