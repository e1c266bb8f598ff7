//! Negative log marginal likelihood of GP hyperparameters given normalized training data.
//!
//! Hyperparameters are handled in their raw log-scale form `h` of length `nx + 2`
//! (see [`Hyperparameters`]) which is the search space of the optimizer.

use crate::errors::{GpError, Result};
use crate::kernels::Kernel;
use crate::utils::symmetrize;
use linfa::Float;
use linfa_linalg::{cholesky::*, triangular::*};
use ndarray::{s, Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Jitter added to the diagonal of covariance matrices before factorization
pub const GP_JITTER: f64 = 1e-8;

/// Decoded hyperparameters of a single output GP
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(deserialize = "F: Deserialize<'de>"))
)]
pub struct Hyperparameters<F: Float> {
    /// Squared lengthscales `W = exp(2 h[0..nx])`
    pub lengthscales: Array1<F>,
    /// Signal variance `sf2 = exp(2 h[nx])`
    pub signal_variance: F,
    /// Noise variance `sn2 = exp(2 h[nx + 1])`
    pub noise_variance: F,
}

impl<F: Float> Hyperparameters<F> {
    /// Decodes raw log-scale hyperparameters of a GP with `nx` input components
    pub fn from_raw(raw: &ArrayBase<impl Data<Elem = F>, Ix1>, nx: usize) -> Result<Self> {
        if raw.len() != nx + 2 {
            return Err(GpError::DimensionMismatch(format!(
                "hyperparameters length should be {} (nx + 2), got {}",
                nx + 2,
                raw.len()
            )));
        }
        let two = F::cast(2.);
        Ok(Hyperparameters {
            lengthscales: raw.slice(s![..nx]).mapv(|h| (two * h).exp()),
            signal_variance: (two * raw[nx]).exp(),
            noise_variance: (two * raw[nx + 1]).exp(),
        })
    }

    /// Encodes back to raw log-scale hyperparameters
    pub fn to_raw(&self) -> Array1<F> {
        let half = F::cast(0.5);
        let nx = self.lengthscales.len();
        let mut raw = Array1::zeros(nx + 2);
        raw.slice_mut(s![..nx])
            .assign(&self.lengthscales.mapv(|w| half * w.ln()));
        raw[nx] = half * self.signal_variance.ln();
        raw[nx + 1] = half * self.noise_variance.ln();
        raw
    }
}

/// Covariance matrix of `x` points regularized with noise variance and `jitter`:
/// `K + (sn2 + jitter) I`, made exactly symmetric.
pub fn regularized_covariance<F: Float>(
    kernel: &Kernel,
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    hyp: &Hyperparameters<F>,
    jitter: F,
) -> Array2<F> {
    let kxx = kernel.self_covariance(x, &hyp.lengthscales, hyp.signal_variance);
    regularize(&kxx, hyp.noise_variance + jitter)
}

fn regularize<F: Float>(kxx: &Array2<F>, reg: F) -> Array2<F> {
    let mut k = kxx.to_owned();
    k.diag_mut().mapv_inplace(|v| v + reg);
    symmetrize(&k)
}

/// Lower Cholesky factor `L` such that `k = L L^T`
pub(crate) fn cholesky<F: Float>(k: &Array2<F>) -> Result<Array2<F>> {
    k.cholesky()
        .map_err(|e| GpError::NonPositiveDefiniteCovariance(e.to_string()))
}

/// Solves `L L^T x = b` given the lower Cholesky factor `L`
pub(crate) fn cholesky_solve<F: Float>(
    l: &Array2<F>,
    b: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Array2<F>> {
    let v = l.solve_triangular(b, UPLO::Lower)?;
    Ok(l.t().solve_triangular(&v, UPLO::Upper)?)
}

fn log_det<F: Float>(l: &Array2<F>) -> F {
    F::cast(2.) * l.diag().mapv(|v| v.ln()).sum()
}

fn check_shapes<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(GpError::DimensionMismatch(format!(
            "{} input points for {} output values",
            x.nrows(),
            y.len()
        )));
    }
    Ok(())
}

/// Inverse of the regularized covariance matrix `K + (sn2 + jitter) I`
pub fn regularized_inverse<F: Float>(
    kernel: &Kernel,
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    hyp: &Hyperparameters<F>,
    jitter: F,
) -> Result<Array2<F>> {
    let k = regularized_covariance(kernel, x, hyp, jitter);
    let l = cholesky(&k)?;
    symmetric_inverse(&l)
}

fn symmetric_inverse<F: Float>(l: &Array2<F>) -> Result<Array2<F>> {
    let inv = cholesky_solve(l, &Array2::eye(l.nrows()))?;
    Ok(symmetrize(&inv))
}

/// Negative log marginal likelihood `y^T K^-1 y + log|K|` (constant term omitted)
/// of `raw` hyperparameters given normalized `x` inputs (n, nx) and `y` outputs (n,).
///
/// Smaller is better. Fails with [`GpError::NonPositiveDefiniteCovariance`]
/// when the regularized covariance matrix cannot be factorized.
pub fn negative_log_likelihood<F: Float>(
    kernel: &Kernel,
    raw: &ArrayBase<impl Data<Elem = F>, Ix1>,
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    jitter: F,
) -> Result<F> {
    check_shapes(x, y)?;
    let hyp = Hyperparameters::from_raw(raw, x.ncols())?;
    let k = regularized_covariance(kernel, x, &hyp, jitter);
    let l = cholesky(&k)?;
    let alpha = cholesky_solve(&l, &y.to_owned().insert_axis(Axis(1)))?;
    Ok(y.dot(&alpha.column(0)) + log_det(&l))
}

/// Negative log marginal likelihood and its gradient wrt `raw` hyperparameters.
///
/// `dNLL/dh_p = sum_ij (K^-1 - alpha alpha^T)_ij dK_ij/dh_p` with `alpha = K^-1 y`.
pub fn negative_log_likelihood_with_gradient<F: Float>(
    kernel: &Kernel,
    raw: &ArrayBase<impl Data<Elem = F>, Ix1>,
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    jitter: F,
) -> Result<(F, Array1<F>)> {
    check_shapes(x, y)?;
    let nx = x.ncols();
    let hyp = Hyperparameters::from_raw(raw, nx)?;
    let kxx = kernel.self_covariance(x, &hyp.lengthscales, hyp.signal_variance);
    let k = regularize(&kxx, hyp.noise_variance + jitter);
    let l = cholesky(&k)?;
    let alpha = cholesky_solve(&l, &y.to_owned().insert_axis(Axis(1)))?;
    let nll = y.dot(&alpha.column(0)) + log_det(&l);

    let q = symmetric_inverse(&l)? - alpha.dot(&alpha.t());
    let two = F::cast(2.);
    let mut grad = Array1::zeros(nx + 2);
    for i in 0..nx {
        let dk = kernel.covariance_dlog_lengthscale(x, &kxx, &hyp.lengthscales, i);
        grad[i] = (&q * &dk).sum();
    }
    grad[nx] = two * (&q * &kxx).sum();
    grad[nx + 1] = two * hyp.noise_variance * q.diag().sum();

    Ok((nll, grad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use finitediff::FiniteDiff;
    use ndarray::{array, Array};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn test_hyperparameters_decoding() {
        let raw = array![0., 0.5, 1., -3.];
        let hyp = Hyperparameters::from_raw(&raw, 2).unwrap();
        assert_abs_diff_eq!(hyp.lengthscales, array![1., f64::exp(1.)], epsilon = 1e-12);
        assert_abs_diff_eq!(hyp.signal_variance, f64::exp(2.), epsilon = 1e-12);
        assert_abs_diff_eq!(hyp.noise_variance, f64::exp(-6.), epsilon = 1e-12);
        assert_abs_diff_eq!(hyp.to_raw(), raw, epsilon = 1e-12);

        assert!(matches!(
            Hyperparameters::from_raw(&raw, 3),
            Err(GpError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_single_point_likelihood() {
        let x = array![[0.]];
        let y = array![1.];
        let raw = array![0., 0., -1.];
        let nll = negative_log_likelihood(&Kernel::SquaredExponential, &raw, &x, &y, GP_JITTER)
            .unwrap();
        let k = 1. + f64::exp(-2.) + GP_JITTER;
        assert_abs_diff_eq!(nll, 1. / k + k.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_likelihood_against_explicit_inverse() {
        let x = array![[-1.2], [0.1], [0.9]];
        let y = array![0.5, -1.0, 0.4];
        let raw = array![-0.3, 0.2, -2.5];
        let kernel = Kernel::SquaredExponential;
        let hyp = Hyperparameters::from_raw(&raw, 1).unwrap();
        let inv = regularized_inverse(&kernel, &x, &hyp, GP_JITTER).unwrap();
        let k = regularized_covariance(&kernel, &x, &hyp, GP_JITTER);
        assert_abs_diff_eq!(k.dot(&inv), Array2::eye(3), epsilon = 1e-10);

        let l = cholesky(&k).unwrap();
        let expected = y.dot(&inv.dot(&y)) + log_det(&l);
        let nll = negative_log_likelihood(&kernel, &raw, &x, &y, GP_JITTER).unwrap();
        assert_abs_diff_eq!(nll, expected, epsilon = 1e-10);
    }

    #[test]
    fn test_jittered_covariance_factorizable() {
        let kernel = Kernel::SquaredExponential;
        for seed in 0..5 {
            let mut rng = Xoshiro256Plus::seed_from_u64(seed);
            let x = Array::random_using((30, 2), Uniform::new(-1., 1.), &mut rng);
            // long lengthscales make the noise-free matrix nearly singular
            let hyp = Hyperparameters::from_raw(&array![4., 4., 4., -8.], 2).unwrap();
            let k = regularized_covariance(&kernel, &x, &hyp, GP_JITTER);
            assert_eq!(k, k.t());
            assert!(cholesky(&k).is_ok());
        }
    }

    #[test]
    fn test_non_positive_definite() {
        let k = array![[1., 2.], [2., 1.]];
        assert!(matches!(
            cholesky(&k),
            Err(GpError::NonPositiveDefiniteCovariance(_))
        ));
    }

    #[test]
    fn test_likelihood_shape_mismatch() {
        let x = array![[0.], [1.]];
        let y = array![1., 2., 3.];
        let res =
            negative_log_likelihood(&Kernel::SquaredExponential, &array![0., 0., -1.], &x, &y, 0.);
        assert!(matches!(res, Err(GpError::DimensionMismatch(_))));
    }

    #[test]
    fn test_likelihood_gradient() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let x = Array::random_using((10, 2), Uniform::new(-1.5f64, 1.5), &mut rng);
        let y = x.map_axis(Axis(1), |r| f64::sin(2. * r[0]) + r[1] * r[1]);
        let kernel = Kernel::SquaredExponential;

        for raw in [array![0.1, -0.4, 0.3, -2.], array![-1., 0.7, -0.2, -4.]] {
            let (nll, grad) =
                negative_log_likelihood_with_gradient(&kernel, &raw, &x, &y, GP_JITTER).unwrap();
            let expected = negative_log_likelihood(&kernel, &raw, &x, &y, GP_JITTER).unwrap();
            assert_abs_diff_eq!(nll, expected, epsilon = 1e-10);

            let f = |h: &Vec<f64>| -> f64 {
                negative_log_likelihood(&kernel, &Array1::from(h.clone()), &x, &y, GP_JITTER)
                    .unwrap()
            };
            let fdiff = Array1::from(raw.to_vec().central_diff(&f));
            let scale = fdiff.mapv(|v| v.abs().max(1.));
            assert_abs_diff_eq!(&grad / &scale, &fdiff / &scale, epsilon = 1e-4);
        }
    }
}
