use crate::errors::{GpError, Result};
use crate::kernels::Kernel;
use crate::likelihood::GP_JITTER;
use crate::{GP_MAX_EVAL, GP_OPTIM_FTOL, GP_OPTIM_N_START};
use linfa::{Float, ParamGuard};

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A set of validated GP parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(deserialize = "F: Deserialize<'de>"))
)]
pub struct GpValidParams<F: Float> {
    /// Covariance kernel k(x, x')
    pub(crate) kernel: Kernel,
    /// Number of internal likelihood optimization starts
    pub(crate) n_start: usize,
    /// Whether inference returns the variance along with the mean
    pub(crate) variance_output: bool,
    /// Bounds of log-lengthscales and log-signal-variance hyperparameters
    pub(crate) hyper_bounds: (F, F),
    /// Bounds of log-noise-variance hyperparameter
    pub(crate) noise_bounds: (F, F),
    /// Max number of internal likelihood evaluation during one optimization
    pub(crate) max_eval: usize,
    /// Tolerance on likelihood value used as stopping criterion
    pub(crate) ftol: f64,
    /// Parameter to improve numerical stability
    pub(crate) jitter: F,
}

impl<F: Float> Default for GpValidParams<F> {
    fn default() -> GpValidParams<F> {
        GpValidParams {
            kernel: Kernel::default(),
            n_start: GP_OPTIM_N_START,
            variance_output: true,
            hyper_bounds: (F::cast(-4.), F::cast(4.)),
            noise_bounds: (F::cast(-8.), F::cast(-2.)),
            max_eval: GP_MAX_EVAL,
            ftol: GP_OPTIM_FTOL,
            jitter: F::cast(GP_JITTER),
        }
    }
}

impl<F: Float> GpValidParams<F> {
    /// Get covariance kernel
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Get the number of internal optimization starts
    pub fn n_start(&self) -> usize {
        self.n_start
    }

    /// Whether the variance is part of the inference result
    pub fn variance_output(&self) -> bool {
        self.variance_output
    }

    /// Get bounds of log-lengthscales and log-signal-variance
    pub fn hyper_bounds(&self) -> (F, F) {
        self.hyper_bounds
    }

    /// Get bounds of log-noise-variance
    pub fn noise_bounds(&self) -> (F, F) {
        self.noise_bounds
    }

    /// Get the max number of internal likelihood evaluations during one optimization
    pub fn max_eval(&self) -> usize {
        self.max_eval
    }

    /// Get the optimizer tolerance
    pub fn ftol(&self) -> f64 {
        self.ftol
    }

    /// Get jitter
    pub fn jitter(&self) -> F {
        self.jitter
    }

    /// Bounds of the `nx + 2` raw hyperparameters of a GP with `nx` input components
    pub(crate) fn bounds(&self, nx: usize) -> Vec<(F, F)> {
        let mut bounds = vec![self.hyper_bounds; nx + 1];
        bounds.push(self.noise_bounds);
        bounds
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [GP algorithm](crate::GaussianProcess).
pub struct GpParams<F: Float>(GpValidParams<F>);

impl<F: Float> GpParams<F> {
    /// A constructor for GP parameters given a covariance kernel
    pub fn new(kernel: Kernel) -> GpParams<F> {
        Self(GpValidParams {
            kernel,
            ..Default::default()
        })
    }

    /// A constructor for GP parameters given a kernel identifier
    /// (`"RBF"` or `"SquaredExponential"`).
    ///
    /// Fails with [`GpError::UnsupportedKernel`] for any other identifier.
    pub fn from_kernel_name(name: &str) -> Result<GpParams<F>> {
        Ok(Self::new(name.parse()?))
    }

    /// A constructor for GP parameters from validated parameters
    pub fn new_from_valid(params: &GpValidParams<F>) -> Self {
        Self(params.clone())
    }

    /// Set covariance kernel.
    pub fn kernel(mut self, kernel: Kernel) -> Self {
        self.0.kernel = kernel;
        self
    }

    /// Set the number of internal hyperparameters optimization starts
    pub fn n_start(mut self, n_start: usize) -> Self {
        self.0.n_start = n_start;
        self
    }

    /// Set whether inference returns the variance along with the mean.
    ///
    /// When false, inference only returns the mean of the first output.
    pub fn variance_output(mut self, variance_output: bool) -> Self {
        self.0.variance_output = variance_output;
        self
    }

    /// Set bounds of log-lengthscales and log-signal-variance hyperparameters
    pub fn hyper_bounds(mut self, bounds: (F, F)) -> Self {
        self.0.hyper_bounds = bounds;
        self
    }

    /// Set bounds of log-noise-variance hyperparameter
    pub fn noise_bounds(mut self, bounds: (F, F)) -> Self {
        self.0.noise_bounds = bounds;
        self
    }

    /// Set the max number of internal likelihood evaluations during one optimization
    pub fn max_eval(mut self, max_eval: usize) -> Self {
        self.0.max_eval = max_eval;
        self
    }

    /// Set the optimizer tolerance on likelihood value
    pub fn ftol(mut self, ftol: f64) -> Self {
        self.0.ftol = ftol;
        self
    }

    /// Set jitter.
    ///
    /// Jitter is added to the covariance diagonal to improve numerical stability
    pub fn jitter(mut self, jitter: F) -> Self {
        self.0.jitter = jitter;
        self
    }
}

impl<F: Float> From<GpValidParams<F>> for GpParams<F> {
    fn from(valid: GpValidParams<F>) -> Self {
        GpParams(valid)
    }
}

impl<F: Float> ParamGuard for GpParams<F> {
    type Checked = GpValidParams<F>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let p = &self.0;
        if p.n_start == 0 {
            return Err(GpError::InvalidValueError(
                "`n_start` should be at least 1".to_string(),
            ));
        }
        if p.max_eval == 0 {
            return Err(GpError::InvalidValueError(
                "`max_eval` should be at least 1".to_string(),
            ));
        }
        let bounds = [("hyper_bounds", p.hyper_bounds), ("noise_bounds", p.noise_bounds)];
        for (name, (lo, up)) in bounds {
            if !(lo.is_finite() && up.is_finite() && lo < up) {
                return Err(GpError::InvalidValueError(format!(
                    "`{name}` should be finite with lower < upper, got ({lo}, {up})"
                )));
            }
        }
        if !(p.ftol.is_finite() && p.ftol >= 0.) {
            return Err(GpError::InvalidValueError(format!(
                "`ftol` should be positive, got {}",
                p.ftol
            )));
        }
        if !(p.jitter.is_finite() && p.jitter >= F::zero()) {
            return Err(GpError::InvalidValueError(format!(
                "`jitter` should be positive, got {}",
                p.jitter
            )));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
