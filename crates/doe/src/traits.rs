use linfa::Float;
use ndarray::Array2;

/// Sampling method generating a set of points within a box
///
/// The sample space is defined by `[lower_bound_xi, upper_bound_xi]^nx`
/// where `nx` is the number of components of a sample.
pub trait SamplingMethod<F: Float> {
    /// Returns the bounds of the sample space as a (nx, 2) matrix
    /// where the ith row is the interval of the ith component.
    fn sampling_space(&self) -> &Array2<F>;

    /// Generates a (ns, nx)-shaped array of samples belonging to `[0., 1.]^nx`
    fn normalized_sample(&self, ns: usize) -> Array2<F>;

    /// Generates a (ns, nx)-shaped array of samples scaled to the sample space,
    /// each sample belongs to `[lower_bound_xi, upper_bound_xi]^nx`.
    fn sample(&self, ns: usize) -> Array2<F> {
        let xlimits = self.sampling_space();
        let lower = xlimits.column(0);
        let scaler = &xlimits.column(1) - &lower;
        self.normalized_sample(ns) * scaler + lower
    }
}
