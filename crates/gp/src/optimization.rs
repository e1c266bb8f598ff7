use gpbo_doe::{SamplingMethod, Sobol};
use linfa::prelude::Float;
use ndarray::{arr1, Array1, Array2, Zip};

use crate::errors::{GpError, Result};
use crate::utils::into_f64;

/// An interface for objective function to be optimized by SLSQP:
/// given `x` returns the objective value and fills its `gradient` when required
pub trait ObjFn<U>: Fn(&[f64], Option<&mut [f64]>, &mut U) -> f64 {}
impl<T, U> ObjFn<U> for T where T: Fn(&[f64], Option<&mut [f64]>, &mut U) -> f64 {}

pub(crate) struct SlsqpParams {
    pub ftol_rel: f64,
    pub ftol_abs: f64,
    pub maxeval: usize,
}

impl Default for SlsqpParams {
    fn default() -> Self {
        SlsqpParams {
            ftol_rel: 1e-12,
            ftol_abs: 1e-12,
            maxeval: 10000,
        }
    }
}

/// Starting points of the multistart optimization: `n_start` points of the Sobol
/// sequence spread within `bounds`.
pub(crate) fn prepare_multistart<F: Float>(
    n_start: usize,
    bounds: &[(F, F)],
) -> Result<Array2<F>> {
    if bounds.len() > Sobol::<F>::MAX_DIM {
        return Err(GpError::InvalidValueError(format!(
            "Multistart supports up to {} hyperparameters, got {}",
            Sobol::<F>::MAX_DIM,
            bounds.len()
        )));
    }
    let mut xlimits: Array2<F> = Array2::zeros((bounds.len(), 2));
    Zip::from(xlimits.rows_mut())
        .and(bounds)
        .for_each(|mut row, limits| row.assign(&arr1(&[limits.0, limits.1])));
    Ok(Sobol::new(&xlimits).sample(n_start))
}

/// Optimize gp hyper parameters given an initial guess and bounds with SLSQP.
///
/// Returns the objective value and the last iterate. A solver failure keeps
/// the last iterate when its objective value is finite, otherwise the value is infinite.
pub(crate) fn optimize_params<ObjF, F>(
    objfn: ObjF,
    param0: &Array1<F>,
    bounds: &[(F, F)],
    params: &SlsqpParams,
) -> (f64, Array1<f64>)
where
    ObjF: Fn(&[f64], Option<&mut [f64]>, &mut ()) -> f64,
    F: Float,
{
    let cons: Vec<&dyn ObjFn<()>> = vec![];
    let param0: Vec<f64> = param0.iter().map(|v| into_f64(*v)).collect();
    let bounds: Vec<_> = bounds
        .iter()
        .map(|(lo, up)| (into_f64(*lo), into_f64(*up)))
        .collect();

    match slsqp::minimize(
        &objfn,
        &param0,
        &bounds,
        &cons,
        (),
        params.maxeval,
        Some(slsqp::StopTols {
            ftol_rel: params.ftol_rel,
            ftol_abs: params.ftol_abs,
            ..slsqp::StopTols::default()
        }),
    ) {
        Ok((_, x_opt, fval)) => {
            let fval = if fval.is_finite() { fval } else { f64::INFINITY };
            (fval, arr1(&x_opt))
        }
        Err((status, x_opt, _)) => {
            let fval = objfn(x_opt.as_slice(), None, &mut ());
            if fval.is_finite() {
                log::warn!("SLSQP optimizer in GP stopped with status={status:?}, last iterate kept");
                (fval, arr1(&x_opt))
            } else {
                log::warn!("SLSQP optimizer in GP failed with status={status:?}");
                (f64::INFINITY, arr1(&x_opt))
            }
        }
    }
}
