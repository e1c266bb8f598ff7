/*!
This library implements the Design of Experiments (DoE) used to spread the starting
points of the gaussian process hyperparameters optimization, namely the
[Sobol sequence](https://en.wikipedia.org/wiki/Sobol_sequence), a deterministic
low-discrepancy sequence.

A DoE method is a way to generate a set of points (i.e. a DoE) within a design (or sample) space `xlimits`.
The design space is defined as a 2D ndarray `(nx, 2)`, specifying lower bound and upper bound
of each `nx` components of the samples `x`.

Example:
```
use gpbo_doe::{Sobol, SamplingMethod};
use ndarray::arr2;

// Design space is defined as [5., 10.] x [0., 1.], samples are 2-dimensional.
let xlimits = arr2(&[[5., 10.], [0., 1.]]);
// We generate five samples, the first one being the center of the design space.
let samples = Sobol::new(&xlimits).sample(5);
assert_eq!(samples.nrows(), 5);
```
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod sobol;
mod traits;

pub use sobol::*;
pub use traits::*;
