use crate::errors::{BoError, Result};
use crate::solver::{BayesOpt, BoConfig};
use crate::types::BlackBoxFn;

use gpbo_doe::{SamplingMethod, Sobol};
use gpbo_gp::GaussianProcess;
use linfa::prelude::{Dataset, Fit};
use log::info;
use ndarray::{Array2, ArrayBase, Data, Ix2};

/// Bayesian optimizer builder allowing to specify the function to be minimized
/// and the optimizer configuration
pub struct BayesOptBuilder<O: BlackBoxFn> {
    fobj: O,
    config: BoConfig,
}

impl<O: BlackBoxFn> BayesOptBuilder<O> {
    /// Function to be minimized, which first output is the objective
    pub fn optimize(fobj: O) -> Self {
        BayesOptBuilder {
            fobj,
            config: BoConfig::default(),
        }
    }

    /// Set configuration of the optimizer
    pub fn configure<F: FnOnce(BoConfig) -> BoConfig>(mut self, init: F) -> Self {
        self.config = init(self.config);
        self
    }

    /// Build an optimizer from already evaluated training data,
    /// `xt` (n, nx) inputs and `yt` (n, ny) outputs
    pub fn min_from(
        self,
        xt: &ArrayBase<impl Data<Elem = f64>, Ix2>,
        yt: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    ) -> Result<BayesOpt<O>> {
        self.config.check()?;
        if let Some(xlimits) = &self.config.xlimits {
            if xlimits.nrows() != xt.ncols() {
                return Err(BoError::InvalidConfigError(format!(
                    "`xlimits` of size {} inconsistent with inputs of size {}",
                    xlimits.nrows(),
                    xt.ncols()
                )));
            }
        }
        if let Some(x0) = &self.config.x0 {
            if x0.len() != xt.ncols() {
                return Err(BoError::DimensionMismatch(format!(
                    "starting point should have {} components, got {}",
                    xt.ncols(),
                    x0.len()
                )));
            }
        }
        let gp = GaussianProcess::<f64>::params(self.config.kernel)
            .n_start(self.config.n_start)
            .fit(&Dataset::new(xt.to_owned(), yt.to_owned()))?;
        info!("Initial surrogate: {gp}");
        Ok(BayesOpt::new(self.fobj, gp, self.config))
    }

    /// Build an optimizer after evaluating the function at the `xt` (n, nx) points
    pub fn min_from_doe(self, xt: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Result<BayesOpt<O>> {
        let yt = evaluate(&self.fobj, xt)?;
        self.min_from(xt, &yt)
    }

    /// Build an optimizer of the function within the `xlimits` (nx, 2) box:
    /// the function is first evaluated at `n_doe` points of a Sobol sequence
    /// and acquisition optimizations are bounded by `xlimits`.
    pub fn min_within(
        mut self,
        xlimits: &ArrayBase<impl Data<Elem = f64>, Ix2>,
        n_doe: usize,
    ) -> Result<BayesOpt<O>> {
        if xlimits.ncols() != 2 || xlimits.iter().any(|v| !v.is_finite()) {
            return Err(BoError::InvalidConfigError(format!(
                "`xlimits` should be a finite (nx, 2) matrix, got {xlimits}"
            )));
        }
        if xlimits.nrows() > Sobol::<f64>::MAX_DIM {
            return Err(BoError::InvalidConfigError(format!(
                "initial sampling supports up to {} dimensions, got {}",
                Sobol::<f64>::MAX_DIM,
                xlimits.nrows()
            )));
        }
        if n_doe == 0 {
            return Err(BoError::InvalidConfigError(
                "`n_doe` should be at least 1".to_string(),
            ));
        }
        self.config = self.config.xlimits(&xlimits.to_owned());
        self.config.check()?;
        let xt = Sobol::new(xlimits).sample(n_doe);
        self.min_from_doe(&xt)
    }
}

/// Evaluates the function at every row of `xt`
fn evaluate<O: BlackBoxFn>(
    fobj: &O,
    xt: &ArrayBase<impl Data<Elem = f64>, Ix2>,
) -> Result<Array2<f64>> {
    let ys: Vec<_> = xt.rows().into_iter().map(|x| fobj(&x)).collect();
    let ny = ys.first().map(|y| y.len()).unwrap_or(0);
    if ny == 0 {
        return Err(BoError::DimensionMismatch(
            "black-box function should return at least one output".to_string(),
        ));
    }
    let mut yt = Array2::zeros((xt.nrows(), ny));
    for (i, y) in ys.iter().enumerate() {
        if y.len() != ny {
            return Err(BoError::DimensionMismatch(format!(
                "black-box function returned {} outputs at point {i}, expected {ny}",
                y.len()
            )));
        }
        yt.row_mut(i).assign(y);
    }
    Ok(yt)
}
