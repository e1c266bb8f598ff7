use crate::criteria::LowerConfidenceBound;
use crate::errors::{BoError, Result};
use crate::solver::acquisition::AcquisitionOptimizer;
use crate::solver::bo_config::BoConfig;
use crate::types::{BlackBoxFn, IterationRecord, OptimResult};

use gpbo_gp::GaussianProcess;
use log::{debug, info};
use ndarray::{Array1, ArrayView1, Axis};
use ndarray_rand::rand::{Rng, SeedableRng};
use ndarray_stats::QuantileExt;
use rand_xoshiro::Xoshiro256Plus;

/// Bayesian optimizer of a black-box function using a GP surrogate
///
/// Each iteration minimizes the lower confidence bound criterion of the surrogate,
/// evaluates the black-box function once at the found location and updates the
/// surrogate with the new sample.
pub struct BayesOpt<O: BlackBoxFn> {
    fobj: O,
    gp: GaussianProcess<f64>,
    config: BoConfig,
    rng: Xoshiro256Plus,
    history: Vec<IterationRecord>,
}

impl<O: BlackBoxFn> BayesOpt<O> {
    pub(crate) fn new(fobj: O, gp: GaussianProcess<f64>, config: BoConfig) -> Self {
        let rng = if let Some(seed) = config.seed {
            Xoshiro256Plus::seed_from_u64(seed)
        } else {
            Xoshiro256Plus::from_entropy()
        };
        BayesOpt {
            fobj,
            gp,
            config,
            rng,
            history: vec![],
        }
    }

    fn suggest_with_value(&self, x0: &ArrayView1<f64>) -> Result<(Array1<f64>, f64)> {
        let criterion = LowerConfidenceBound::new(self.config.risk_weight);
        let optimizer = AcquisitionOptimizer::new(&self.gp, criterion)
            .ftol(self.config.ftol)
            .max_eval(self.config.max_eval);
        match &self.config.xlimits {
            Some(xlimits) => optimizer.bounds(xlimits).minimize(x0),
            None => optimizer.minimize(x0),
        }
    }

    /// Next point to evaluate found by minimizing the acquisition criterion from `x0`
    pub fn suggest(&self, x0: &ArrayView1<f64>) -> Result<Array1<f64>> {
        Ok(self.suggest_with_value(x0)?.0)
    }

    /// Runs one iteration from `x0`: suggests a point, evaluates the black-box
    /// function there and adds the sample to the surrogate training data.
    pub fn step(&mut self, x0: &ArrayView1<f64>) -> Result<IterationRecord> {
        let (x, acquisition) = self.suggest_with_value(x0)?;
        let y = (self.fobj)(&x.view());
        let ny = self.gp.dims().1;
        if y.len() != ny {
            return Err(BoError::DimensionMismatch(format!(
                "black-box function should return {ny} outputs, got {}",
                y.len()
            )));
        }
        self.gp.add_sample(&x, &y)?;
        let record = IterationRecord {
            iter: self.history.len(),
            x,
            y,
            acquisition,
            hypopt: self.gp.hypopt(),
        };
        info!(
            "Iteration {}: x = {}, y = {}, acquisition = {}",
            record.iter, record.x, record.y, record.acquisition
        );
        self.history.push(record.clone());
        Ok(record)
    }

    /// Starting point of the first iteration: the configured one or
    /// a training point drawn at random
    fn initial_point(&mut self) -> Array1<f64> {
        match &self.config.x0 {
            Some(x0) => x0.to_owned(),
            None => {
                let xt = &self.gp.training_data().0;
                let i = self.rng.gen_range(0..xt.nrows());
                xt.row(i).to_owned()
            }
        }
    }

    /// Runs `max_iters` iterations, each one starting from the point found by the previous one.
    ///
    /// Returns the best point regarding the first output among all evaluated points.
    pub fn run(&mut self) -> Result<OptimResult> {
        info!("{:?}", self.config);
        let mut x0 = self.initial_point();
        for _ in 0..self.config.max_iters {
            let record = self.step(&x0.view())?;
            x0 = record.x;
        }
        let (x_doe, y_doe) = self.gp.training_data().clone();
        let best = y_doe
            .index_axis(Axis(1), 0)
            .argmin()
            .map_err(|err| BoError::OptimizationFailure(format!("no best point: {err}")))?;
        let res = OptimResult {
            x_opt: x_doe.row(best).to_owned(),
            y_opt: y_doe.row(best).to_owned(),
            x_doe,
            y_doe,
            history: self.history.clone(),
        };
        debug!("Data: x = {}, y = {}", res.x_doe, res.y_doe);
        info!("Optim Result: min f(x)={} at x={}", res.y_opt, res.x_opt);
        Ok(res)
    }

    /// GP surrogate trained on every evaluated point
    pub fn gp(&self) -> &GaussianProcess<f64> {
        &self.gp
    }

    /// Records of the iterations run so far
    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    /// Optimizer configuration
    pub fn config(&self) -> &BoConfig {
        &self.config
    }
}
