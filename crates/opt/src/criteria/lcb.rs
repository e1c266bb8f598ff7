use crate::criteria::AcquisitionCriterion;
use crate::errors::Result;

use gpbo_gp::GaussianProcess;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Lower confidence bound criterion `mean(x) - risk_weight * variance(x)`
/// computed on the first output of the model.
///
/// A large `risk_weight` favors exploration of uncertain regions,
/// a small one exploitation of the predicted minimum.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LowerConfidenceBound {
    /// Weight of the variance term
    pub risk_weight: f64,
}

impl LowerConfidenceBound {
    /// Constructor given the variance weight
    pub fn new(risk_weight: f64) -> Self {
        LowerConfidenceBound { risk_weight }
    }
}

impl AcquisitionCriterion for LowerConfidenceBound {
    fn name(&self) -> &'static str {
        "LCB"
    }

    fn value(&self, x: &ArrayView1<f64>, model: &GaussianProcess<f64>) -> Result<f64> {
        let (mean, var) = model.predict_valvar(x)?;
        Ok(mean[0] - self.risk_weight * var[0])
    }

    fn grad(&self, x: &ArrayView1<f64>, model: &GaussianProcess<f64>) -> Result<Array1<f64>> {
        let (dmean, dvar) = model.predict_valvar_gradients(x)?;
        Ok(&dmean.row(0) - &(&dvar.row(0) * self.risk_weight))
    }
}
