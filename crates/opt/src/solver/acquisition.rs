use crate::criteria::{AcquisitionCriterion, LowerConfidenceBound};
use crate::errors::{BoError, Result};
use crate::optimizers::Optimizer;
use crate::solver::bo_config::{BO_ACQ_FTOL, BO_ACQ_MAX_EVAL};

use gpbo_gp::GaussianProcess;
use log::debug;
use ndarray::{Array1, Array2, ArrayView1, Zip};

/// Local minimization of an acquisition criterion over the GP surrogate
/// starting from a single point
pub struct AcquisitionOptimizer<'a, C: AcquisitionCriterion> {
    model: &'a GaussianProcess<f64>,
    criterion: C,
    bounds: Array2<f64>,
    ftol: f64,
    max_eval: usize,
}

impl<'a, C: AcquisitionCriterion> AcquisitionOptimizer<'a, C> {
    /// Unbounded optimizer of the `criterion` computed with the `model`
    pub fn new(model: &'a GaussianProcess<f64>, criterion: C) -> Self {
        let nx = model.dims().0;
        let mut bounds = Array2::from_elem((nx, 2), f64::INFINITY);
        bounds.column_mut(0).fill(f64::NEG_INFINITY);
        AcquisitionOptimizer {
            model,
            criterion,
            bounds,
            ftol: BO_ACQ_FTOL,
            max_eval: BO_ACQ_MAX_EVAL,
        }
    }

    /// Sets (nx, 2) box bounds of the optimization
    pub fn bounds(mut self, xlimits: &Array2<f64>) -> Self {
        self.bounds = xlimits.to_owned();
        self
    }

    /// Sets the tolerance on criterion value
    pub fn ftol(mut self, ftol: f64) -> Self {
        self.ftol = ftol;
        self
    }

    /// Sets the max number of criterion evaluations
    pub fn max_eval(mut self, max_eval: usize) -> Self {
        self.max_eval = max_eval;
        self
    }

    /// Minimizes the criterion starting from `x0`, clipped into bounds.
    /// Returns the location of the minimum and the criterion value.
    pub fn minimize(&self, x0: &ArrayView1<f64>) -> Result<(Array1<f64>, f64)> {
        let nx = self.bounds.nrows();
        if self.bounds.nrows() != self.model.dims().0 || self.bounds.ncols() != 2 {
            return Err(BoError::DimensionMismatch(format!(
                "acquisition bounds should be ({}, 2), got {:?}",
                self.model.dims().0,
                self.bounds.dim()
            )));
        }
        if x0.len() != nx {
            return Err(BoError::DimensionMismatch(format!(
                "starting point should have {nx} components, got {}",
                x0.len()
            )));
        }
        let mut xstart = x0.to_owned();
        Zip::from(&mut xstart)
            .and(self.bounds.rows())
            .for_each(|x, b| *x = x.max(b[0]).min(b[1]));

        let value0 = self.criterion.value(&xstart.view(), self.model).map_err(|err| {
            BoError::OptimizationFailure(format!(
                "{} criterion evaluation failed at {xstart}: {err}",
                self.criterion.name()
            ))
        })?;
        if !value0.is_finite() {
            return Err(BoError::OptimizationFailure(format!(
                "{} criterion is not finite at {xstart}",
                self.criterion.name()
            )));
        }

        let obj = |x: &[f64], gradient: Option<&mut [f64]>, _params: &mut ()| -> f64 {
            let x = ArrayView1::from(x);
            if let Some(grad) = gradient {
                match self.criterion.grad(&x, self.model) {
                    Ok(g) => grad.copy_from_slice(&g.to_vec()),
                    Err(_) => grad.iter_mut().for_each(|g| *g = 0.),
                }
            }
            self.criterion
                .value(&x, self.model)
                .unwrap_or(f64::INFINITY)
        };

        let (value, x_opt) = Optimizer::new(&obj, &self.bounds)
            .xinit(&xstart.view())
            .ftol_rel(self.ftol)
            .ftol_abs(self.ftol)
            .max_eval(self.max_eval)
            .minimize();
        if !value.is_finite() || x_opt.iter().any(|v| !v.is_finite()) {
            return Err(BoError::OptimizationFailure(format!(
                "{} criterion optimization from {xstart} failed",
                self.criterion.name()
            )));
        }
        debug!(
            "{} criterion minimized from {} (value={}) to {} (value={})",
            self.criterion.name(),
            xstart,
            value0,
            x_opt,
            value
        );
        Ok((x_opt, value))
    }
}

/// Minimizes the lower confidence bound `mean - risk_weight * variance` of the `model`
/// first output starting from `x0` with default unbounded optimization settings.
pub fn optimize_acquisition(
    model: &GaussianProcess<f64>,
    x0: &ArrayView1<f64>,
    risk_weight: f64,
) -> Result<Array1<f64>> {
    let (x_opt, _) = AcquisitionOptimizer::new(model, LowerConfidenceBound::new(risk_weight))
        .minimize(x0)?;
    Ok(x_opt)
}
