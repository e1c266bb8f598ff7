use crate::SamplingMethod;
use linfa::Float;
use ndarray::{Array2, ArrayBase, Data, Ix2};

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Number of bits of the generated integers
const BITS: usize = 32;

/// Joe and Kuo primitive polynomials `(s, a)` with initial direction numbers `m_1..m_s`
/// for dimensions 2 to 21 (dimension 1 uses the van der Corput sequence).
const JOE_KUO: [(usize, u32, &[u32]); 20] = [
    (1, 0, &[1]),
    (2, 1, &[1, 3]),
    (3, 1, &[1, 3, 1]),
    (3, 2, &[1, 1, 1]),
    (4, 1, &[1, 1, 3, 3]),
    (4, 4, &[1, 3, 5, 13]),
    (5, 2, &[1, 1, 5, 5, 17]),
    (5, 4, &[1, 1, 5, 5, 5]),
    (5, 7, &[1, 1, 7, 11, 19]),
    (5, 11, &[1, 1, 5, 1, 1]),
    (5, 13, &[1, 1, 1, 3, 11]),
    (5, 14, &[1, 3, 5, 5, 31]),
    (6, 1, &[1, 3, 3, 9, 7, 49]),
    (6, 13, &[1, 1, 1, 15, 21, 21]),
    (6, 16, &[1, 3, 1, 13, 27, 49]),
    (6, 19, &[1, 1, 1, 15, 7, 5]),
    (6, 22, &[1, 3, 1, 15, 13, 25]),
    (6, 25, &[1, 1, 5, 5, 19, 61]),
    (7, 1, &[1, 3, 7, 11, 23, 15, 103]),
    (7, 4, &[1, 3, 7, 13, 13, 15, 69]),
];

/// The Sobol design is a low-discrepancy quasi-random sequence.
///
/// Points are generated in Gray code order so that any prefix of the sequence
/// spreads evenly over the sample space. The sequence is deterministic: two designs
/// built on the same space give the same points.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Sobol<F: Float> {
    /// Sampling space definition as a (nx, 2) matrix
    /// The ith row is the [lower_bound, upper_bound] of xi, the ith component of x
    xlimits: Array2<F>,
    /// Index of the first generated point of the sequence
    skip: usize,
}

impl<F: Float> Sobol<F> {
    /// Maximum dimension of the sample space
    pub const MAX_DIM: usize = JOE_KUO.len() + 1;

    /// Constructor given a design space given a (nx, 2) matrix \[\[lower bound, upper bound\], ...\]
    ///
    /// The origin of the sequence is skipped, hence the first point is the center of the space.
    ///
    /// ```
    /// use gpbo_doe::{Sobol, SamplingMethod};
    /// use ndarray::arr2;
    ///
    /// let doe = Sobol::new(&arr2(&[[0.0, 1.0], [5.0, 10.0]])).sample(4);
    /// assert_eq!(doe.row(0), ndarray::aview1(&[0.5, 7.5]));
    /// ```
    ///
    /// **Panics** if xlimits number of columns is different from 2 or
    /// if the number of rows is not in `[1, Sobol::MAX_DIM]`.
    pub fn new(xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Self {
        if xlimits.ncols() != 2 {
            panic!("xlimits must have 2 columns (lower, upper)");
        }
        if xlimits.nrows() == 0 || xlimits.nrows() > Self::MAX_DIM {
            panic!(
                "Sobol sequence dimension should be in [1, {}], got {}",
                Self::MAX_DIM,
                xlimits.nrows()
            );
        }
        Sobol {
            xlimits: xlimits.to_owned(),
            skip: 1,
        }
    }

    /// Set the index of the first generated point (0 to include the origin)
    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }
}

/// Direction numbers `v_1..v_BITS` of the given 0-based dimension
fn direction_numbers(dim: usize) -> Vec<u32> {
    let mut v = vec![0u32; BITS];
    if dim == 0 {
        for (k, vk) in v.iter_mut().enumerate() {
            *vk = 1 << (BITS - 1 - k);
        }
        return v;
    }
    let (s, a, m) = JOE_KUO[dim - 1];
    for k in 0..BITS {
        if k < s {
            v[k] = m[k] << (BITS - 1 - k);
        } else {
            let mut vk = v[k - s] ^ (v[k - s] >> s);
            for i in 1..s {
                if (a >> (s - 1 - i)) & 1 == 1 {
                    vk ^= v[k - i];
                }
            }
            v[k] = vk;
        }
    }
    v
}

impl<F: Float> SamplingMethod<F> for Sobol<F> {
    fn sampling_space(&self) -> &Array2<F> {
        &self.xlimits
    }

    fn normalized_sample(&self, ns: usize) -> Array2<F> {
        let nx = self.xlimits.nrows();
        let directions: Vec<Vec<u32>> = (0..nx).map(direction_numbers).collect();
        let scale = (1u64 << BITS) as f64;

        let mut doe = Array2::zeros((ns, nx));
        let mut state = vec![0u32; nx];
        for i in 0..(self.skip + ns) {
            if i >= self.skip {
                let mut row = doe.row_mut(i - self.skip);
                for (xj, sj) in row.iter_mut().zip(state.iter()) {
                    *xj = F::cast(*sj as f64 / scale);
                }
            }
            // Gray code: flip the direction number of the rightmost zero bit of i
            let c = (!i).trailing_zeros() as usize;
            for (sj, dj) in state.iter_mut().zip(directions.iter()) {
                *sj ^= dj[c];
            }
        }
        doe
    }
}
