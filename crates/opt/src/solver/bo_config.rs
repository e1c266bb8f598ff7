//! Bayesian optimizer configuration.
use crate::errors::{BoError, Result};
use gpbo_gp::{Kernel, GP_OPTIM_N_START};
use ndarray::{Array1, Array2};

use serde::{Deserialize, Serialize};

/// Default number of iterations
pub const BO_MAX_ITERS: usize = 20;
/// Default weight of the variance in the lower confidence bound criterion
pub const BO_RISK_WEIGHT: f64 = 3.0;
/// Default tolerance on the acquisition criterion value
pub const BO_ACQ_FTOL: f64 = 1e-9;
/// Default max number of criterion evaluations during one acquisition optimization
pub const BO_ACQ_MAX_EVAL: usize = 2000;

/// Bayesian optimizer configuration
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct BoConfig {
    /// Number of iterations, one black-box evaluation per iteration
    pub(crate) max_iters: usize,
    /// Weight `b` of the variance in the acquisition criterion `mean - b * variance`
    pub(crate) risk_weight: f64,
    /// Covariance kernel of the GP surrogate
    pub(crate) kernel: Kernel,
    /// Number of starts for multistart approach used for hyperparameters optimization
    pub(crate) n_start: usize,
    /// Tolerance on acquisition criterion value used as stopping criterion
    pub(crate) ftol: f64,
    /// Max number of criterion evaluations during one acquisition optimization
    pub(crate) max_eval: usize,
    /// Starting point of the first acquisition optimization.
    /// When not specified, it is drawn among the training points.
    pub(crate) x0: Option<Array1<f64>>,
    /// Optional (nx, 2) matrix of [lower bound, upper bound] of the nx components of x
    /// used as bounds of the acquisition optimization, unbounded otherwise.
    pub(crate) xlimits: Option<Array2<f64>>,
    /// Seed of the random generator used to draw the first starting point
    pub(crate) seed: Option<u64>,
}

impl Default for BoConfig {
    fn default() -> Self {
        BoConfig {
            max_iters: BO_MAX_ITERS,
            risk_weight: BO_RISK_WEIGHT,
            kernel: Kernel::SquaredExponential,
            n_start: GP_OPTIM_N_START,
            ftol: BO_ACQ_FTOL,
            max_eval: BO_ACQ_MAX_EVAL,
            x0: None,
            xlimits: None,
            seed: None,
        }
    }
}

impl BoConfig {
    /// Sets max number of iterations
    pub fn max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Sets the weight of the variance in the acquisition criterion:
    /// larger values favor exploration, smaller ones exploitation
    pub fn risk_weight(mut self, risk_weight: f64) -> Self {
        self.risk_weight = risk_weight;
        self
    }

    /// Sets the GP covariance kernel
    pub fn kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    /// Sets the number of multistart of the GP hyperparameters optimization
    pub fn n_start(mut self, n_start: usize) -> Self {
        self.n_start = n_start;
        self
    }

    /// Sets the tolerance of the acquisition optimization
    pub fn ftol(mut self, ftol: f64) -> Self {
        self.ftol = ftol;
        self
    }

    /// Sets max number of criterion evaluations of the acquisition optimization
    pub fn max_eval(mut self, max_eval: usize) -> Self {
        self.max_eval = max_eval;
        self
    }

    /// Sets the starting point of the first acquisition optimization
    pub fn x0(mut self, x0: &Array1<f64>) -> Self {
        self.x0 = Some(x0.to_owned());
        self
    }

    /// Sets bounds of the acquisition optimization as a (nx, 2) matrix
    pub fn xlimits(mut self, xlimits: &Array2<f64>) -> Self {
        self.xlimits = Some(xlimits.to_owned());
        self
    }

    /// Sets a random seed for reproducibility
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Gets max number of iterations
    pub fn get_max_iters(&self) -> usize {
        self.max_iters
    }

    /// Gets the weight of the variance in the acquisition criterion
    pub fn get_risk_weight(&self) -> f64 {
        self.risk_weight
    }

    /// Checks configuration consistency
    pub fn check(&self) -> Result<()> {
        if !(self.risk_weight.is_finite() && self.risk_weight >= 0.) {
            return Err(BoError::InvalidConfigError(format!(
                "`risk_weight` should be a positive number, got {}",
                self.risk_weight
            )));
        }
        if self.n_start == 0 {
            return Err(BoError::InvalidConfigError(
                "`n_start` should be at least 1".to_string(),
            ));
        }
        if !(self.ftol.is_finite() && self.ftol >= 0.) {
            return Err(BoError::InvalidConfigError(format!(
                "`ftol` should be a positive number, got {}",
                self.ftol
            )));
        }
        if self.max_eval == 0 {
            return Err(BoError::InvalidConfigError(
                "`max_eval` should be at least 1".to_string(),
            ));
        }
        if let Some(x0) = &self.x0 {
            if x0.iter().any(|v| !v.is_finite()) {
                return Err(BoError::InvalidConfigError(format!(
                    "`x0` should be finite, got {x0}"
                )));
            }
        }
        if let Some(xlimits) = &self.xlimits {
            if xlimits.ncols() != 2 {
                return Err(BoError::InvalidConfigError(format!(
                    "`xlimits` should be a (nx, 2) matrix, got {:?}",
                    xlimits.dim()
                )));
            }
            let invalid = xlimits
                .rows()
                .into_iter()
                .any(|row| row[0].is_nan() || row[1].is_nan() || row[0] > row[1]);
            if invalid {
                return Err(BoError::InvalidConfigError(format!(
                    "`xlimits` should hold [lower, upper] bounds, got {xlimits}"
                )));
            }
            if let Some(x0) = &self.x0 {
                if x0.len() != xlimits.nrows() {
                    return Err(BoError::InvalidConfigError(format!(
                        "`x0` of size {} inconsistent with `xlimits` of size {}",
                        x0.len(),
                        xlimits.nrows()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Serializes the configuration as a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes a configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_default_config() {
        let config = BoConfig::default();
        assert_eq!(config.max_iters, 20);
        assert_eq!(config.risk_weight, 3.);
        assert_eq!(config.n_start, 10);
        assert_eq!(config.ftol, 1e-9);
        assert_eq!(config.kernel, Kernel::SquaredExponential);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            BoConfig::default().risk_weight(f64::NAN).check(),
            Err(BoError::InvalidConfigError(_))
        ));
        assert!(BoConfig::default().n_start(0).check().is_err());
        assert!(BoConfig::default().max_eval(0).check().is_err());
        assert!(BoConfig::default().ftol(-1.).check().is_err());
        assert!(BoConfig::default()
            .xlimits(&array![[1., -1.]])
            .check()
            .is_err());
        assert!(BoConfig::default()
            .xlimits(&array![[-1., 1.]])
            .x0(&array![0., 0.])
            .check()
            .is_err());
    }

    #[test]
    fn test_config_json() {
        let config = BoConfig::default()
            .max_iters(5)
            .risk_weight(1.5)
            .x0(&array![0.5])
            .xlimits(&array![[-5., 5.]])
            .seed(42);
        let json = config.to_json().unwrap();
        let loaded = BoConfig::from_json(&json).unwrap();
        assert_eq!(config, loaded);
        assert!(matches!(
            BoConfig::from_json("{\"max_iters\": \"five\"}"),
            Err(BoError::JsonError(_))
        ));
    }
}
