use linfa::Float;
use ndarray::{s, Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A structure to store (n, xdim) matrix data and its mean and standard deviation vectors.
///
/// Standard deviation is the population one (divisor `n`); a zero deviation
/// (constant column or single row) is replaced by one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct NormalizedData<F: Float> {
    /// normalized data
    pub data: Array2<F>,
    /// mean vector computed from data
    pub mean: Array1<F>,
    /// standard deviation vector computed from data
    pub std: Array1<F>,
}

impl<F: Float> NormalizedData<F> {
    /// Constructor
    pub fn new(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> NormalizedData<F> {
        let (data, mean, std) = normalize(x);
        NormalizedData { data, mean, std }
    }

    /// Dimension of data points
    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    /// Number of data points
    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    /// Normalizes a point with the stored statistics
    pub fn normalize_point(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Array1<F> {
        (x - &self.mean) / &self.std
    }

    /// Maps a normalized point back to the original scale
    pub fn denormalize_point(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Array1<F> {
        x * &self.std + &self.mean
    }
}

/// Standardizes `x` columns, returns normalized data, mean and standard deviation vectors
pub fn normalize<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> (Array2<F>, Array1<F>, Array1<F>) {
    let x_mean = x
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(x.ncols()));
    let mut x_std = x.std_axis(Axis(0), F::zero());
    x_std.mapv_inplace(|v| if v == F::zero() { F::one() } else { v });
    let xnorm = (x - &x_mean) / &x_std;

    (xnorm, x_mean, x_std)
}

/// Differences between every pair `(i, j)` of points with `i < j`
#[derive(Debug)]
pub struct DiffMatrix<F: Float> {
    /// Differences `x_i - x_j` as a (n_obs * (n_obs - 1) / 2, nx) array
    pub d: Array2<F>,
    /// Indices `(i, j)` of the pair of each row of `d`
    pub d_indices: Array2<usize>,
    /// Number of observations
    pub n_obs: usize,
}

impl<F: Float> DiffMatrix<F> {
    /// Compute differences given points given as an array (n_obs, nx)
    pub fn new(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> DiffMatrix<F> {
        let n_obs = x.nrows();
        let n_pairs = n_obs * n_obs.saturating_sub(1) / 2;
        let mut d = Array2::zeros((n_pairs, x.ncols()));
        let mut d_indices = Array2::<usize>::zeros((n_pairs, 2));
        let mut idx = 0;
        for i in 0..n_obs.saturating_sub(1) {
            let next = idx + n_obs - i - 1;
            d.slice_mut(s![idx..next, ..])
                .assign(&(&x.row(i) - &x.slice(s![i + 1.., ..])));
            for (r, j) in (idx..next).zip((i + 1)..n_obs) {
                d_indices[[r, 0]] = i;
                d_indices[[r, 1]] = j;
            }
            idx = next;
        }
        DiffMatrix {
            d,
            d_indices,
            n_obs,
        }
    }
}

/// Computes differences between x and each element of y
/// resulting in a 2d array of shape (nrows(y), ncols(x));
/// *Panics* if x and y have not the same number of components
pub fn differences<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix1>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array2<F> {
    assert!(x.len() == y.ncols());
    x.to_owned() - y
}

/// Makes a square matrix exactly symmetric: `(m + m^T) / 2`
pub fn symmetrize<F: Float>(m: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
    (m + &m.t()).mapv(|v| v * F::cast(0.5))
}

/// Converts a generic float to the f64 values handled by the optimizer
#[inline(always)]
pub(crate) fn into_f64<F: Float>(v: F) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}
