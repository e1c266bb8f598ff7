use crate::errors::{GpError, Result};
use crate::hyperparameters::{fit_hyperparameters, OutputGp};
use crate::kernels::Kernel;
use crate::likelihood::Hyperparameters;
use crate::parameters::{GpParams, GpValidParams};
use crate::utils::NormalizedData;

use linfa::prelude::{DatasetBase, Fit, Float};
use ndarray::{concatenate, Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2, Zip};

use log::{debug, info};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Default number of multistart for hyperparameters optimization
pub const GP_OPTIM_N_START: usize = 10;
/// Maximum of likelihood evaluations for one SLSQP optimization
pub const GP_MAX_EVAL: usize = 10000;
/// Tolerance on likelihood value for SLSQP optimizer
pub const GP_OPTIM_FTOL: f64 = 1e-12;

/// Result of the GP inference at a query point
#[derive(Clone, Debug, PartialEq)]
pub enum Prediction<F: Float> {
    /// Mean and variance of every output
    MeanVariance {
        /// Posterior means (m,)
        mean: Array1<F>,
        /// Posterior variances (m,), always non negative
        variance: Array1<F>,
    },
    /// Mean of the first output when the model is built without variance output
    Mean(F),
}

/// Fitted state of the model: normalization of training data and
/// one fitted GP per output.
///
/// It is rebuilt from scratch on every training data update.
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(deserialize = "F: Deserialize<'de>"))
)]
pub(crate) struct GpState<F: Float> {
    /// Training inputs
    xt_norm: NormalizedData<F>,
    /// Training outputs
    yt_norm: NormalizedData<F>,
    /// Fitted models, one per output
    outputs: Vec<OutputGp<F>>,
}

impl<F: Float> GpState<F> {
    fn build(
        params: &GpValidParams<F>,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Self> {
        let xt_norm = NormalizedData::new(x);
        let yt_norm = NormalizedData::new(y);
        let now = Instant::now();
        let outputs = fit_hyperparameters(params, &xt_norm.data, &yt_norm.data)?;
        debug!(
            "GP fitted on {} points in {:?}ms",
            x.nrows(),
            now.elapsed().as_millis()
        );
        Ok(GpState {
            xt_norm,
            yt_norm,
            outputs,
        })
    }
}

/// Gaussian Process surrogate model
///
/// Each of the `m` outputs is modeled by an independent GP with zero mean and a
/// squared exponential covariance `k(x, x') = sf2 * exp(-0.5 * sum_i (x_i - x'_i)^2 / W_i)`
/// plus a gaussian noise of variance `sn2`, both inputs and outputs being
/// standardized beforehand.
///
/// Hyperparameters `h = (0.5 * log(W), 0.5 * log(sf2), 0.5 * log(sn2))` are chosen by
/// minimizing the negative log marginal likelihood with a SLSQP optimizer started
/// from several points of a Sobol sequence.
///
/// # Example
///
/// ```no_run
/// use gpbo_gp::{GaussianProcess, Kernel};
/// use linfa::prelude::*;
/// use ndarray::array;
///
/// let xt = array![[-4.], [-1.], [1.], [2.]];
/// let yt = xt.mapv(f64::sin);
///
/// let gp = GaussianProcess::<f64>::params(Kernel::SquaredExponential)
///     .n_start(2)
///     .fit(&Dataset::new(xt, yt))
///     .expect("GP fitted");
///
/// let (mean, variance) = gp.predict_valvar(&array![0.5]).expect("GP inference");
/// println!("sin(0.5) ~ {} (variance {})", mean[0], variance[0]);
/// ```
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(deserialize = "F: Deserialize<'de>"))
)]
pub struct GaussianProcess<F: Float> {
    /// Fitted state
    state: GpState<F>,
    /// Training dataset (input, output)
    pub(crate) training_data: (Array2<F>, Array2<F>),
    /// Parameters used to fit this model
    pub(crate) params: GpValidParams<F>,
}

impl<F: Float> fmt::Display for GaussianProcess<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GP(kernel={}", self.params.kernel)?;
        for (i, out) in self.state.outputs.iter().enumerate() {
            let h = &out.hyperparameters;
            write!(
                f,
                ", output{i}=(lengthscales={}, signal_variance={}, noise_variance={}, likelihood={})",
                h.lengthscales, h.signal_variance, h.noise_variance, out.likelihood
            )?;
        }
        write!(f, ")")
    }
}

impl<F: Float> GaussianProcess<F> {
    /// Gp parameters contructor
    pub fn params(kernel: Kernel) -> GpParams<F> {
        GpParams::new(kernel)
    }

    fn check_point(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<()> {
        let nx = self.training_data.0.ncols();
        if x.len() != nx {
            return Err(GpError::DimensionMismatch(format!(
                "query point should have {nx} components, got {}",
                x.len()
            )));
        }
        Ok(())
    }

    /// Posterior means and variances of normalized outputs at a normalized point,
    /// variances are clamped to zero.
    fn normalized_valvar(&self, xnorm: &Array1<F>) -> (Array1<F>, Array1<F>) {
        let xt = &self.state.xt_norm.data;
        let yt = &self.state.yt_norm.data;
        let kernel = self.params.kernel;
        let ny = self.state.outputs.len();
        let mut mean = Array1::zeros(ny);
        let mut var = Array1::zeros(ny);
        for (i, out) in self.state.outputs.iter().enumerate() {
            let h = &out.hyperparameters;
            let k = kernel.cross_covariance(xnorm, xt, &h.lengthscales, h.signal_variance);
            let kt_invk = k.dot(&out.inv_k);
            mean[i] = kt_invk.dot(&yt.column(i));
            let v = h.signal_variance - kt_invk.dot(&k);
            // variance might be slightly negative depending on machine precision
            var[i] = if v < F::zero() { F::zero() } else { v };
        }
        (mean, var)
    }

    /// Predict both means and variances of the `m` outputs at a point `x` (nx,)
    pub fn predict_valvar(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<(Array1<F>, Array1<F>)> {
        self.check_point(x)?;
        let xnorm = self.state.xt_norm.normalize_point(x);
        let (mean, var) = self.normalized_valvar(&xnorm);
        let ystd = &self.state.yt_norm.std;
        let mean = mean * ystd + &self.state.yt_norm.mean;
        let var = var * &ystd.mapv(|v| v * v);
        Ok((mean, var))
    }

    /// Inference at a point `x` (nx,).
    ///
    /// Returns means and variances of every output, or only the mean of
    /// the first output when the model is configured without variance output.
    pub fn infer(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<Prediction<F>> {
        let (mean, variance) = self.predict_valvar(x)?;
        if self.params.variance_output {
            Ok(Prediction::MeanVariance { mean, variance })
        } else {
            Ok(Prediction::Mean(mean[0]))
        }
    }

    /// Predict output means at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns a (n, m) matrix of means.
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        Ok(self.predict_batch(x)?.0)
    }

    /// Predict variances at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns a (n, m) matrix of variances.
    pub fn predict_var(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        Ok(self.predict_batch(x)?.1)
    }

    fn predict_batch(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array2<F>, Array2<F>)> {
        let ny = self.state.outputs.len();
        let mut means = Array2::zeros((x.nrows(), ny));
        let mut vars = Array2::zeros((x.nrows(), ny));
        for (i, xi) in x.rows().into_iter().enumerate() {
            let (mean, var) = self.predict_valvar(&xi)?;
            means.row_mut(i).assign(&mean);
            vars.row_mut(i).assign(&var);
        }
        Ok((means, vars))
    }

    /// Predict gradients of means and variances of the `m` outputs at a point `x` (nx,)
    /// Returns two (m, nx) jacobian matrices.
    ///
    /// Variance gradient is zero where the variance is clamped to zero.
    pub fn predict_valvar_gradients(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<(Array2<F>, Array2<F>)> {
        self.check_point(x)?;
        let xt = &self.state.xt_norm.data;
        let yt = &self.state.yt_norm.data;
        let kernel = self.params.kernel;
        let nx = xt.ncols();
        let ny = self.state.outputs.len();
        let xnorm = self.state.xt_norm.normalize_point(x);

        let mut dmean = Array2::zeros((ny, nx));
        let mut dvar = Array2::zeros((ny, nx));
        for (i, out) in self.state.outputs.iter().enumerate() {
            let h = &out.hyperparameters;
            let k = kernel.cross_covariance(&xnorm, xt, &h.lengthscales, h.signal_variance);
            let dk = kernel.cross_covariance_jacobian(&xnorm, xt, &h.lengthscales, h.signal_variance);
            let invk_k = out.inv_k.dot(&k);
            dmean
                .row_mut(i)
                .assign(&dk.t().dot(&out.inv_k.dot(&yt.column(i))));
            if h.signal_variance - k.dot(&invk_k) > F::zero() {
                let invk_sym_k = &invk_k + &out.inv_k.t().dot(&k);
                dvar.row_mut(i).assign(&dk.t().dot(&invk_sym_k).mapv(|v| -v));
            }
        }

        // back to original scales
        let xstd = &self.state.xt_norm.std;
        let ystd = &self.state.yt_norm.std;
        Zip::from(dmean.rows_mut())
            .and(dvar.rows_mut())
            .and(ystd)
            .for_each(|mut dm, mut dv, &s| {
                dm.assign(&(&dm * s / xstd));
                dv.assign(&(&dv * (s * s) / xstd));
            });
        Ok((dmean, dvar))
    }

    /// Adds a training sample `(x_new, y_new)` then re-fits the model from scratch:
    /// normalization and hyperparameters are computed again over the whole training set.
    ///
    /// On failure the model is left unchanged.
    pub fn add_sample(
        &mut self,
        x_new: &ArrayBase<impl Data<Elem = F>, Ix1>,
        y_new: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<()> {
        let (nx, ny) = self.dims();
        if x_new.len() != nx || y_new.len() != ny {
            return Err(GpError::DimensionMismatch(format!(
                "sample should be of size ({nx}, {ny}), got ({}, {})",
                x_new.len(),
                y_new.len()
            )));
        }
        if x_new.iter().chain(y_new.iter()).any(|v| !v.is_finite()) {
            return Err(GpError::InvalidValueError(format!(
                "sample should be finite, got x = {x_new}, y = {y_new}"
            )));
        }
        let x = concatenate![
            Axis(0),
            self.training_data.0.view(),
            x_new.view().insert_axis(Axis(0))
        ];
        let y = concatenate![
            Axis(0),
            self.training_data.1.view(),
            y_new.view().insert_axis(Axis(0))
        ];
        let state = GpState::build(&self.params, &x, &y)?;
        self.state = state;
        self.training_data = (x, y);
        info!("GP updated with {} training points: {}", self.n_points(), self);
        Ok(())
    }

    /// Number of training points
    pub fn n_points(&self) -> usize {
        self.training_data.0.nrows()
    }

    /// Retrieve number of input and output dimensions
    pub fn dims(&self) -> (usize, usize) {
        (self.training_data.0.ncols(), self.training_data.1.ncols())
    }

    /// Covariance kernel
    pub fn kernel(&self) -> &Kernel {
        &self.params.kernel
    }

    /// Optimal raw log-scale hyperparameters as a (nx + 2, m) matrix,
    /// the ith column holding the hyperparameters of the ith output
    pub fn hypopt(&self) -> Array2<F> {
        let (nx, ny) = self.dims();
        let mut hyp = Array2::zeros((nx + 2, ny));
        for (mut col, out) in hyp.columns_mut().into_iter().zip(&self.state.outputs) {
            col.assign(&out.raw);
        }
        hyp
    }

    /// Optimal hyperparameters of every output
    pub fn hyperparameters(&self) -> Vec<&Hyperparameters<F>> {
        self.state
            .outputs
            .iter()
            .map(|out| &out.hyperparameters)
            .collect()
    }

    /// Cached inverses of the regularized training covariance matrices, one per output
    pub fn inverse_covariances(&self) -> Vec<&Array2<F>> {
        self.state.outputs.iter().map(|out| &out.inv_k).collect()
    }

    /// Negative log likelihood values at optimum, one per output
    pub fn likelihoods(&self) -> Array1<F> {
        self.state.outputs.iter().map(|out| out.likelihood).collect()
    }

    /// Fitted models of every output
    pub fn outputs(&self) -> &[OutputGp<F>] {
        &self.state.outputs
    }

    /// Raw training data (inputs (n, nx), outputs (n, m))
    pub fn training_data(&self) -> &(Array2<F>, Array2<F>) {
        &self.training_data
    }

    /// Normalization of training inputs
    pub fn x_normalization(&self) -> &NormalizedData<F> {
        &self.state.xt_norm
    }

    /// Normalization of training outputs
    pub fn y_normalization(&self) -> &NormalizedData<F> {
        &self.state.yt_norm
    }

    /// Parameters used to fit this model
    pub fn params_used(&self) -> &GpValidParams<F> {
        &self.params
    }
}

impl<F: Float, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>, GpError>
    for GpValidParams<F>
{
    type Object = GaussianProcess<F>;

    /// Fit GP parameters using maximum likelihood
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>>,
    ) -> Result<Self::Object> {
        let x = dataset.records();
        let y = dataset.targets();
        if x.nrows() == 0 || x.ncols() == 0 || y.ncols() == 0 {
            return Err(GpError::DimensionMismatch(format!(
                "training data should be non empty, got x {:?} and y {:?}",
                x.dim(),
                y.dim()
            )));
        }
        if x.nrows() != y.nrows() {
            return Err(GpError::DimensionMismatch(format!(
                "{} input points for {} output values",
                x.nrows(),
                y.nrows()
            )));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(GpError::InvalidValueError(
                "training data should be finite".to_string(),
            ));
        }

        let state = GpState::build(self, x, y)?;
        let gp = GaussianProcess {
            state,
            training_data: (x.to_owned(), y.to_owned()),
            params: self.clone(),
        };
        info!("GP fitted with {} training points: {}", gp.n_points(), gp);
        Ok(gp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use linfa::prelude::Dataset;
    use ndarray::{array, Array};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand_xoshiro::Xoshiro256Plus;

    fn sine_gp(n_start: usize) -> GaussianProcess<f64> {
        let xt = array![[-4.], [-1.], [1.], [2.]];
        let yt = xt.mapv(f64::sin);
        GaussianProcess::params(Kernel::SquaredExponential)
            .n_start(n_start)
            .fit(&Dataset::new(xt, yt))
            .expect("GP fit error")
    }

    #[test]
    fn test_sine_interpolation() {
        let gp = sine_gp(10);
        let xt = gp.training_data().0.to_owned();
        for x in xt.rows() {
            let (mean, var) = gp.predict_valvar(&x).unwrap();
            assert_abs_diff_eq!(mean[0], f64::sin(x[0]), epsilon = 5e-2);
            assert!(var[0] >= 0.);
        }
        let (_, var_train) = gp.predict_valvar(&array![1.]).unwrap();
        let (_, var_far) = gp.predict_valvar(&array![10.]).unwrap();
        assert!(var_train[0] < 0.1 * var_far[0]);
    }

    #[test]
    fn test_infer_variants() {
        let gp = sine_gp(4);
        let x = array![0.3];
        let p1 = gp.infer(&x).unwrap();
        let p2 = gp.infer(&x).unwrap();
        assert_eq!(p1, p2);
        let (mean, variance) = gp.predict_valvar(&x).unwrap();
        assert_eq!(p1, Prediction::MeanVariance { mean, variance });

        let xt = array![[-4.], [-1.], [1.], [2.]];
        let yt = xt.mapv(f64::sin);
        let gp_mean = GaussianProcess::params(Kernel::SquaredExponential)
            .n_start(4)
            .variance_output(false)
            .fit(&Dataset::new(xt, yt))
            .unwrap();
        match (gp_mean.infer(&x).unwrap(), p1) {
            (Prediction::Mean(m), Prediction::MeanVariance { mean, .. }) => {
                assert_abs_diff_eq!(m, mean[0], epsilon = 1e-12)
            }
            res => panic!("Unexpected predictions {res:?}"),
        }
    }

    #[test]
    fn test_variance_non_negative() {
        let gp = sine_gp(4);
        let xtest = Array::linspace(-10., 10., 201).insert_axis(Axis(1));
        let var = gp.predict_var(&xtest).unwrap();
        assert!(var.iter().all(|v| *v >= 0.));
        // variance at a training point is clamped at worst
        let (_, var) = gp.predict_valvar(&array![-1.]).unwrap();
        assert!(var[0] >= 0.);
    }

    #[test]
    fn test_dimension_mismatch() {
        let gp = sine_gp(2);
        assert!(matches!(
            gp.infer(&array![0., 1.]),
            Err(GpError::DimensionMismatch(_))
        ));

        let xt = array![[0.], [1.], [2.]];
        let yt = array![[0.], [1.]];
        let res = GaussianProcess::<f64>::params(Kernel::SquaredExponential)
            .fit(&Dataset::new(xt, yt));
        assert!(matches!(res, Err(GpError::DimensionMismatch(_))));
    }

    #[test]
    fn test_add_sample() {
        let mut gp = sine_gp(4);
        let hyp_before = gp.hypopt();
        gp.add_sample(&array![0.], &array![0.]).unwrap();
        assert_eq!(gp.n_points(), 5);
        assert_eq!(gp.training_data().0.row(4), array![0.]);
        assert_eq!(gp.training_data().1.row(4), array![0.]);
        assert_eq!(gp.inverse_covariances()[0].dim(), (5, 5));
        assert_eq!(gp.hypopt().dim(), hyp_before.dim());

        // normalization is recomputed over the whole training set
        let x = gp.training_data().0.to_owned();
        assert_abs_diff_eq!(gp.x_normalization().mean, x.mean_axis(Axis(0)).unwrap());
        assert_abs_diff_eq!(gp.x_normalization().std, x.std_axis(Axis(0), 0.));
    }

    #[test]
    fn test_add_sample_failure_keeps_model() {
        let mut gp = sine_gp(2);
        let before = gp.clone();
        assert!(matches!(
            gp.add_sample(&array![0., 1.], &array![0.]),
            Err(GpError::DimensionMismatch(_))
        ));
        assert!(matches!(
            gp.add_sample(&array![f64::NAN], &array![0.]),
            Err(GpError::InvalidValueError(_))
        ));
        assert_eq!(gp.n_points(), 4);
        assert_eq!(gp.hypopt(), before.hypopt());
        assert_eq!(gp.infer(&array![0.5]).unwrap(), before.infer(&array![0.5]).unwrap());
    }

    #[test]
    fn test_multi_outputs() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let xt = Array::random_using((15, 2), Uniform::new(-2f64, 2.), &mut rng);
        let yt = concatenate![
            Axis(1),
            xt.map_axis(Axis(1), |x| argmin_testfunctions::rosenbrock_ab(&x.to_vec(), 1., 100.))
                .insert_axis(Axis(1)),
            xt.map_axis(Axis(1), |x| x[0] - 2. * x[1]).insert_axis(Axis(1))
        ];
        let gp = GaussianProcess::params(Kernel::SquaredExponential)
            .n_start(4)
            .fit(&Dataset::new(xt.to_owned(), yt.to_owned()))
            .unwrap();
        assert_eq!(gp.dims(), (2, 2));
        assert_eq!(gp.hypopt().dim(), (4, 2));
        assert_eq!(gp.likelihoods().len(), 2);

        let means = gp.predict(&xt).unwrap();
        assert_abs_diff_eq!(means, yt, epsilon = 0.05 * max_elem(&yt.mapv(f64::abs)));
        let xtest = array![0.3, -0.7];
        let (mean, _) = gp.predict_valvar(&xtest).unwrap();
        assert_abs_diff_eq!(mean[1], 0.3 + 1.4, epsilon = 2e-1);
    }

    fn max_elem(a: &Array2<f64>) -> f64 {
        a.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }

    fn central_diff(f: impl Fn(&Array1<f64>) -> f64, x: &Array1<f64>, h: f64) -> Array1<f64> {
        let mut grad = Array1::zeros(x.len());
        for i in 0..x.len() {
            let mut xp = x.clone();
            let mut xm = x.clone();
            xp[i] += h;
            xm[i] -= h;
            grad[i] = (f(&xp) - f(&xm)) / (2. * h);
        }
        grad
    }

    #[test]
    fn test_predict_gradients() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let xt = Array::random_using((12, 2), Uniform::new(-1f64, 1.), &mut rng);
        let yt = xt
            .map_axis(Axis(1), |x| f64::sin(x[0]) * x[1] + 0.5 * x[0])
            .insert_axis(Axis(1));
        let gp = GaussianProcess::params(Kernel::SquaredExponential)
            .n_start(3)
            .fit(&Dataset::new(xt, yt))
            .unwrap();

        let fmean = |x: &Array1<f64>| gp.predict_valvar(x).unwrap().0[0];
        let fvar = |x: &Array1<f64>| gp.predict_valvar(x).unwrap().1[0];
        for x in [array![0.2, -0.3], array![0.85, 0.4], array![-1.4, 1.2]] {
            let (dmean, dvar) = gp.predict_valvar_gradients(&x).unwrap();
            let fd_mean = central_diff(fmean, &x, 1e-4);
            let fd_var = central_diff(fvar, &x, 1e-4);
            for i in 0..2 {
                let tol = 1e-3 * (1. + fd_mean[i].abs());
                assert_abs_diff_eq!(dmean[[0, i]], fd_mean[i], epsilon = tol);
                let tol = 1e-3 * (1. + fd_var[i].abs());
                assert_abs_diff_eq!(dvar[[0, i]], fd_var[i], epsilon = tol);
            }
        }
    }

    #[test]
    fn test_display() {
        let gp = sine_gp(2);
        let repr = gp.to_string();
        assert!(repr.starts_with("GP(kernel=SquaredExponential, output0=(lengthscales="));
    }

    #[cfg(feature = "serializable")]
    #[test]
    fn test_save_load() {
        let gp = sine_gp(2);
        let json = serde_json::to_string(&gp).unwrap();
        let loaded: GaussianProcess<f64> = serde_json::from_str(&json).unwrap();
        let x = array![0.7];
        assert_abs_diff_eq!(
            gp.predict_valvar(&x).unwrap().0,
            loaded.predict_valvar(&x).unwrap().0,
            epsilon = 1e-12
        );
    }
}
