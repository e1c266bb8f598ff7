//! This library implements [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process) regression
//! with a squared exponential covariance kernel.
//!
//! Each output of the training data is modeled by an independent GP over standardized inputs
//! and outputs. Kernel hyperparameters (lengthscales, signal and noise variances) are found
//! by minimizing the negative log marginal likelihood with a multistart SLSQP optimization.
//!
//! GP methods are implemented by [GaussianProcess] parameterized by [GpParams].
//!
//! ```no_run
//! use gpbo_gp::{GaussianProcess, Kernel};
//! use linfa::prelude::*;
//! use ndarray::{arr2, array};
//!
//! // one-dimensional training data
//! let xt = arr2(&[[0.0], [1.0], [2.0], [3.0], [4.0]]);
//! let yt = xt.mapv(|x: f64| x * x.sin());
//!
//! let gp = GaussianProcess::<f64>::params(Kernel::SquaredExponential)
//!     .fit(&Dataset::new(xt, yt))
//!     .expect("GP fitted");
//!
//! let xtest = array![2.5];
//! let (mean, variance) = gp.predict_valvar(&xtest).expect("GP inference");
//! let (dmean, dvar) = gp.predict_valvar_gradients(&xtest).expect("GP gradients");
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
mod errors;
mod hyperparameters;
pub mod kernels;
pub mod likelihood;
mod optimization;
mod parameters;
mod utils;

pub use algorithm::*;
pub use errors::*;
pub use hyperparameters::OutputGp;
pub use kernels::Kernel;
pub use likelihood::Hyperparameters;
pub use optimization::ObjFn;
pub use parameters::*;
pub use utils::{normalize, NormalizedData};
