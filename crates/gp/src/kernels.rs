//! A module for covariance kernels of the GP model.
//!
//! Only the squared exponential kernel (a.k.a. RBF) is implemented:
//!
//! `k(x, x') = sf2 * exp(-0.5 * sum_i (x_i - x'_i)^2 / W_i)`
//!
//! where `W` is the vector of squared lengthscales and `sf2` the signal variance.

use crate::errors::{GpError, Result};
use crate::utils::{differences, DiffMatrix};
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Ix2, Zip};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

/// Covariance kernels available to the GP model
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(into = "String"),
    serde(try_from = "String")
)]
pub enum Kernel {
    /// Squared exponential kernel with one lengthscale per input component
    #[default]
    SquaredExponential,
}

impl From<Kernel> for String {
    fn from(item: Kernel) -> String {
        item.to_string()
    }
}

impl FromStr for Kernel {
    type Err = GpError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RBF" | "SquaredExponential" | "squared_exponential" | "SE" => {
                Ok(Kernel::SquaredExponential)
            }
            _ => Err(GpError::UnsupportedKernel(format!(
                "'{s}', should be one of 'RBF', 'SquaredExponential'"
            ))),
        }
    }
}

impl TryFrom<String> for Kernel {
    type Error = GpError;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Kernel::SquaredExponential => write!(f, "SquaredExponential"),
        }
    }
}

impl Kernel {
    /// Kernel values given `d` differences (n, nx) between pairs of points,
    /// `lengthscales` W (nx,) and signal variance `sf2`. Returns (n,) values.
    pub fn value<F: Float>(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        lengthscales: &ArrayBase<impl Data<Elem = F>, Ix1>,
        sf2: F,
    ) -> Array1<F> {
        match self {
            Kernel::SquaredExponential => {
                let r = d.mapv(|v| v * v).dot(&lengthscales.mapv(|w| F::one() / w));
                r.mapv(|v| sf2 * F::exp(F::cast(-0.5) * v))
            }
        }
    }

    /// Covariance matrix (na, nb) between `xa` (na, nx) and `xb` (nb, nx) points
    pub fn covariance<F: Float>(
        &self,
        xa: &ArrayBase<impl Data<Elem = F>, Ix2>,
        xb: &ArrayBase<impl Data<Elem = F>, Ix2>,
        lengthscales: &ArrayBase<impl Data<Elem = F>, Ix1>,
        sf2: F,
    ) -> Array2<F> {
        let mut k = Array2::zeros((xa.nrows(), xb.nrows()));
        Zip::from(k.rows_mut())
            .and(xa.rows())
            .for_each(|mut krow, xi| {
                krow.assign(&self.value(&differences(&xi, xb), lengthscales, sf2));
            });
        k
    }

    /// Covariance matrix (n, n) of `x` (n, nx) points with itself.
    ///
    /// The result is exactly symmetric with `sf2` on its diagonal.
    pub fn self_covariance<F: Float>(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        lengthscales: &ArrayBase<impl Data<Elem = F>, Ix1>,
        sf2: F,
    ) -> Array2<F> {
        let dm = DiffMatrix::new(x);
        let kij = self.value(&dm.d, lengthscales, sf2);
        let mut k = Array2::from_diag(&Array1::from_elem(dm.n_obs, sf2));
        Zip::from(dm.d_indices.rows()).and(&kij).for_each(|ij, &v| {
            k[[ij[0], ij[1]]] = v;
            k[[ij[1], ij[0]]] = v;
        });
        k
    }

    /// Cross covariance vector (n,) between a single `x` point (nx,)
    /// and `xtrain` (n, nx) points
    pub fn cross_covariance<F: Float>(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xtrain: &ArrayBase<impl Data<Elem = F>, Ix2>,
        lengthscales: &ArrayBase<impl Data<Elem = F>, Ix1>,
        sf2: F,
    ) -> Array1<F> {
        self.value(&differences(x, xtrain), lengthscales, sf2)
    }

    /// Jacobian (n, nx) of the cross covariance vector wrt the `x` point components
    pub fn cross_covariance_jacobian<F: Float>(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xtrain: &ArrayBase<impl Data<Elem = F>, Ix2>,
        lengthscales: &ArrayBase<impl Data<Elem = F>, Ix1>,
        sf2: F,
    ) -> Array2<F> {
        match self {
            Kernel::SquaredExponential => {
                let d = differences(x, xtrain);
                let k = self.value(&d, lengthscales, sf2);
                let inv_w = lengthscales.mapv(|w| -F::one() / w);
                (d * &inv_w) * &k.insert_axis(ndarray::Axis(1))
            }
        }
    }

    /// Derivative of the covariance matrix `kxx` of `x` points wrt the log-lengthscale
    /// hyperparameter of the `i`th component (`W_i = exp(2 h_i)`)
    pub(crate) fn covariance_dlog_lengthscale<F: Float>(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        kxx: &Array2<F>,
        lengthscales: &ArrayBase<impl Data<Elem = F>, Ix1>,
        i: usize,
    ) -> Array2<F> {
        match self {
            Kernel::SquaredExponential => {
                let xi = x.column(i);
                let wi = lengthscales[i];
                let mut dk = kxx.to_owned();
                Zip::indexed(&mut dk).for_each(|(a, b), v| {
                    let dab = xi[a] - xi[b];
                    *v = *v * dab * dab / wi;
                });
                dk
            }
        }
    }
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
    fn test_kernel_parsing() {
        assert_eq!("RBF".parse::<Kernel>().unwrap(), Kernel::SquaredExponential);
        assert_eq!(
            Kernel::try_from("SquaredExponential".to_string()).unwrap(),
            Kernel::SquaredExponential
        );
        assert_eq!(String::from(Kernel::default()), "SquaredExponential");
    }

    #[test]
    fn test_unsupported_kernel() {
        for name in ["Matern52", "rbf ", ""] {
            match name.parse::<Kernel>() {
                Err(GpError::UnsupportedKernel(msg)) => assert!(msg.contains(name)),
                res => panic!("Expected UnsupportedKernel, got {res:?}"),
            }
        }
    }

    #[test]
    fn test_squared_exponential_value() {
        let d = array![[0., 0.], [1., 0.], [1., 2.]];
        let w = array![1., 4.];
        let k = Kernel::SquaredExponential.value(&d, &w, 2.);
        let expected = array![2., 2. * f64::exp(-0.5), 2. * f64::exp(-1.)];
        assert_abs_diff_eq!(k, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_covariance_symmetric() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let x = Array::random_using((12, 3), Uniform::new(-2., 2.), &mut rng);
        let w = array![0.5, 1.2, 3.];
        let sf2 = 1.7;

        let k = Kernel::SquaredExponential.covariance(&x, &x, &w, sf2);
        assert_abs_diff_eq!(k, k.t(), epsilon = 1e-14);
        assert_abs_diff_eq!(k.diag(), Array1::from_elem(12, sf2), epsilon = 1e-14);

        let kself = Kernel::SquaredExponential.self_covariance(&x, &w, sf2);
        assert_eq!(kself, kself.t());
        assert!(kself.diag().iter().all(|v| *v == sf2));
        assert_abs_diff_eq!(k, kself, epsilon = 1e-14);
    }

    #[test]
    fn test_cross_covariance() {
        let xt = array![[0., 0.], [1., 1.], [-1., 2.]];
        let x = array![0.5, 0.5];
        let w = array![1., 2.];
        let k = Kernel::SquaredExponential.cross_covariance(&x, &xt, &w, 1.5);
        let xmat = x.view().insert_axis(ndarray::Axis(0));
        let kmat = Kernel::SquaredExponential.covariance(&xmat, &xt, &w, 1.5);
        assert_abs_diff_eq!(k, kmat.row(0), epsilon = 1e-14);
    }

    #[test]
    fn test_cross_covariance_jacobian() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let xt = Array::random_using((6, 2), Uniform::new(-1., 1.), &mut rng);
        let w = array![0.3, 2.1];
        let x = array![0.1, -0.4];
        let jac = Kernel::SquaredExponential.cross_covariance_jacobian(&x, &xt, &w, 0.8);
        assert_eq!(jac.dim(), (6, 2));
        for j in 0..xt.nrows() {
            let xtj = xt.row(j).to_owned().insert_axis(ndarray::Axis(0));
            let f = |x: &Vec<f64>| -> f64 {
                let x = Array1::from(x.clone());
                Kernel::SquaredExponential.cross_covariance(&x, &xtj, &w, 0.8)[0]
            };
            let fdiff = x.to_vec().central_diff(&f);
            assert_abs_diff_eq!(jac.row(j), Array1::from(fdiff), epsilon = 1e-6);
        }
    }
}
