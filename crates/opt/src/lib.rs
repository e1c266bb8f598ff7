//! This library implements a bayesian optimization loop driven by a
//! [Gaussian Process](gpbo_gp::GaussianProcess) surrogate of an expensive black-box function.
//!
//! At each iteration, the next point to evaluate is found by a local minimization
//! of the lower confidence bound criterion `mean(x) - b * variance(x)` of the surrogate
//! starting from the previous point, then the black-box function is evaluated there
//! and the surrogate is re-trained with the new sample.
//!
//! The optimizer is built with [BayesOptBuilder], configured with [BoConfig]
//! and run with [BayesOpt::run].
//!
//! ```no_run
//! use gpbo_opt::BayesOptBuilder;
//! use ndarray::{array, Array1, ArrayView1};
//!
//! let sine = |x: &ArrayView1<f64>| -> Array1<f64> { x.mapv(f64::sin) };
//! let xt = array![[-4.], [-1.], [1.], [2.]];
//!
//! let res = BayesOptBuilder::optimize(sine)
//!     .configure(|config| config.max_iters(5).risk_weight(3.).seed(42))
//!     .min_from_doe(&xt)
//!     .expect("optimizer built")
//!     .run()
//!     .expect("optimization run");
//! println!("min sin(x) = {} found at x = {}", res.y_opt, res.x_opt);
//! ```
//!
//! Single steps can also be driven by hand with [BayesOpt::suggest] and [BayesOpt::step].
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod bayesopt;
pub mod criteria;
mod errors;
mod optimizers;
mod solver;
mod types;

pub use bayesopt::*;
pub use criteria::{AcquisitionCriterion, LowerConfidenceBound};
pub use errors::*;
pub use solver::*;
pub use types::*;
