use crate::errors::{GpError, Result};
use crate::likelihood::{
    negative_log_likelihood, negative_log_likelihood_with_gradient, regularized_inverse,
    Hyperparameters,
};
use crate::optimization::{optimize_params, prepare_multistart, SlsqpParams};
use crate::parameters::GpValidParams;
use crate::utils::into_f64;

use linfa::Float;
use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Data, Ix2};
use rayon::prelude::*;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// GP model of a single output fitted by maximum likelihood
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(deserialize = "F: Deserialize<'de>"))
)]
pub struct OutputGp<F: Float> {
    /// Optimal raw log-scale hyperparameters (nx + 2,)
    pub(crate) raw: Array1<F>,
    /// Optimal hyperparameters
    pub(crate) hyperparameters: Hyperparameters<F>,
    /// Inverse of the regularized training covariance matrix (n, n)
    pub(crate) inv_k: Array2<F>,
    /// Negative log likelihood at optimum
    pub(crate) likelihood: F,
}

impl<F: Float> OutputGp<F> {
    /// Raw log-scale hyperparameters
    pub fn raw_hyperparameters(&self) -> &Array1<F> {
        &self.raw
    }

    /// Decoded hyperparameters
    pub fn hyperparameters(&self) -> &Hyperparameters<F> {
        &self.hyperparameters
    }

    /// Cached inverse of the regularized training covariance matrix
    pub fn inv_covariance(&self) -> &Array2<F> {
        &self.inv_k
    }

    /// Negative log likelihood value at optimum
    pub fn likelihood(&self) -> F {
        self.likelihood
    }
}

/// Fits one independent GP per column of normalized `y` outputs given normalized `x` inputs
pub(crate) fn fit_hyperparameters<F: Float>(
    params: &GpValidParams<F>,
    x: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Vec<OutputGp<F>>> {
    y.columns()
        .into_iter()
        .enumerate()
        .map(|(i, yi)| {
            let out = fit_output(params, x, &yi)?;
            debug!(
                "Output {i}: hyperparameters = {}, likelihood = {}",
                out.raw, out.likelihood
            );
            Ok(out)
        })
        .collect()
}

/// Multistart maximum likelihood fit of a single output
fn fit_output<F: Float>(
    params: &GpValidParams<F>,
    x: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
    y: &ArrayView1<F>,
) -> Result<OutputGp<F>> {
    let nx = x.ncols();
    let kernel = *params.kernel();
    let jitter = params.jitter();
    let bounds = params.bounds(nx);
    let starts = prepare_multistart(params.n_start(), &bounds)?;

    let objfn = |h: &[f64], gradient: Option<&mut [f64]>, _params: &mut ()| -> f64 {
        // optimizer may return nan values
        if h.iter().any(|v| v.is_nan()) {
            return f64::INFINITY;
        }
        let raw: Array1<F> = h.iter().map(|v| F::cast(*v)).collect();
        match gradient {
            Some(grad) => match negative_log_likelihood_with_gradient(&kernel, &raw, x, y, jitter)
            {
                Ok((nll, g)) if nll.is_finite() => {
                    grad.iter_mut()
                        .zip(g.iter())
                        .for_each(|(gi, v)| *gi = into_f64(*v));
                    into_f64(nll)
                }
                _ => {
                    grad.iter_mut().for_each(|gi| *gi = 0.);
                    f64::INFINITY
                }
            },
            None => match negative_log_likelihood(&kernel, &raw, x, y, jitter) {
                Ok(nll) if nll.is_finite() => into_f64(nll),
                _ => f64::INFINITY,
            },
        }
    };

    let slsqp = SlsqpParams {
        ftol_rel: params.ftol(),
        ftol_abs: params.ftol(),
        maxeval: params.max_eval(),
    };
    debug!("Optimize with multistart hyperparameters = {starts:?} and bounds = {bounds:?}");
    let now = Instant::now();
    let results: Vec<(f64, Array1<f64>)> = (0..starts.nrows())
        .into_par_iter()
        .map(|i| optimize_params(&objfn, &starts.row(i).to_owned(), &bounds, &slsqp))
        .collect();
    debug!("elapsed optim = {:?}", now.elapsed().as_millis());

    let (_, h_opt) = best_start(results).ok_or_else(|| {
        GpError::OptimizationFailure(format!(
            "likelihood is not finite for any of the {} starts",
            starts.nrows()
        ))
    })?;

    let raw = h_opt.mapv(|v| F::cast(v));
    let hyperparameters = Hyperparameters::from_raw(&raw, nx)?;
    let inv_k = regularized_inverse(&kernel, x, &hyperparameters, jitter)?;
    let likelihood = negative_log_likelihood(&kernel, &raw, x, y, jitter)?;
    Ok(OutputGp {
        raw,
        hyperparameters,
        inv_k,
        likelihood,
    })
}

/// Best `(likelihood, hyperparameters)` among multistart results, starts with
/// a non finite likelihood being excluded. Ties go to the lowest start index.
fn best_start(results: Vec<(f64, Array1<f64>)>) -> Option<(f64, Array1<f64>)> {
    results
        .into_iter()
        .enumerate()
        .filter(|(i, (fval, _))| {
            if !fval.is_finite() {
                warn!("Hyperparameters optimization start {i} excluded");
            }
            fval.is_finite()
        })
        .map(|(_, res)| res)
        .min_by(|a, b| a.0.total_cmp(&b.0))
}
