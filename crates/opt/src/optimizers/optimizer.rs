use gpbo_gp::ObjFn;
use log::warn;
use ndarray::{arr1, Array1, Array2, ArrayView1};

/// Facade of the SLSQP local optimizer used to minimize acquisition criteria
pub(crate) struct Optimizer<'a> {
    fun: &'a (dyn ObjFn<()> + Sync),
    bounds: Array2<f64>,
    max_eval: usize,
    xinit: Option<Array1<f64>>,
    ftol_abs: Option<f64>,
    ftol_rel: Option<f64>,
}

impl<'a> Optimizer<'a> {
    /// Optimizer of `fun` within (nx, 2) `bounds`, infinite bounds meaning unbounded
    pub fn new(fun: &'a (dyn ObjFn<()> + Sync), bounds: &Array2<f64>) -> Self {
        Optimizer {
            fun,
            bounds: bounds.clone(),
            max_eval: 200,
            xinit: None,
            ftol_abs: None,
            ftol_rel: None,
        }
    }

    pub fn ftol_abs(&mut self, ftol_abs: f64) -> &mut Self {
        self.ftol_abs = Some(ftol_abs);
        self
    }

    pub fn ftol_rel(&mut self, ftol_rel: f64) -> &mut Self {
        self.ftol_rel = Some(ftol_rel);
        self
    }

    pub fn max_eval(&mut self, max_eval: usize) -> &mut Self {
        self.max_eval = max_eval;
        self
    }

    pub fn xinit(&mut self, xinit: &ArrayView1<f64>) -> &mut Self {
        self.xinit = Some(xinit.to_owned());
        self
    }

    /// Returns the optimum value and location. When the solver fails, the last iterate
    /// is returned with its objective value if finite, with an infinite value otherwise.
    pub fn minimize(&self) -> (f64, Array1<f64>) {
        let nx = self.bounds.nrows();
        let xinit = self
            .xinit
            .as_ref()
            .map(|x| x.to_vec())
            .unwrap_or_else(|| vec![0.; nx]);
        let bounds: Vec<_> = self
            .bounds
            .outer_iter()
            .map(|row| (row[0], row[1]))
            .collect();
        let cons: Vec<&dyn ObjFn<()>> = vec![];
        let res = slsqp::minimize(
            self.fun,
            &xinit,
            &bounds,
            &cons,
            (),
            self.max_eval,
            Some(slsqp::StopTols {
                ftol_rel: self.ftol_rel.unwrap_or(0.0),
                ftol_abs: self.ftol_abs.unwrap_or(0.0),
                ..slsqp::StopTols::default()
            }),
        );
        match res {
            Ok((_, x_opt, y_opt)) => (y_opt, arr1(&x_opt)),
            Err((status, x_opt, _)) => {
                let y_opt = (self.fun)(x_opt.as_slice(), None, &mut ());
                if y_opt.is_finite() {
                    warn!("SLSQP optimizer stopped with status={status:?}, last iterate kept");
                    (y_opt, arr1(&x_opt))
                } else {
                    warn!("SLSQP optimizer failed with status={status:?}");
                    (f64::INFINITY, arr1(&x_opt))
                }
            }
        }
    }
}
