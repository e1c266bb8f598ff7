use approx::assert_abs_diff_eq;
use gpbo_opt::{BayesOptBuilder, BoError};
use ndarray::{array, Array1, ArrayView1};
use std::cell::Cell;

fn sine(x: &ArrayView1<f64>) -> Array1<f64> {
    x.mapv(f64::sin)
}

#[test]
fn test_sine_five_iterations() {
    let _ = env_logger::builder().is_test(true).try_init();
    let xt = array![[-4.], [-1.], [1.], [2.]];
    let mut bo = BayesOptBuilder::optimize(sine)
        .configure(|config| config.max_iters(5).risk_weight(3.).n_start(2).seed(42))
        .min_from_doe(&xt)
        .expect("optimizer built");
    assert_eq!(bo.gp().n_points(), 4);

    let res = bo.run().expect("optimization run");
    assert_eq!(res.x_doe.nrows(), 9);
    assert_eq!(res.y_doe.nrows(), 9);
    assert_eq!(bo.gp().n_points(), 9);
    assert_eq!(res.history.len(), 5);

    // every record holds the evaluated sample appended to the training data
    for (i, record) in res.history.iter().enumerate() {
        assert_eq!(record.iter, i);
        assert_eq!(res.x_doe.row(4 + i), record.x);
        assert_abs_diff_eq!(record.y, record.x.mapv(f64::sin), epsilon = 1e-12);
        assert_eq!(record.hypopt.dim(), (3, 1));
    }
    // hyperparameters are refitted at every iteration as data grows
    for records in res.history.windows(2) {
        assert_ne!(records[0].hypopt, records[1].hypopt);
    }

    // best point is the evaluated minimum
    let ymin = res.y_doe.iter().cloned().fold(f64::INFINITY, f64::min);
    assert_eq!(res.y_opt[0], ymin);
    assert!(res.y_opt[0] <= (-1f64).sin());
}

#[test]
fn test_step_evaluates_once() {
    let count = Cell::new(0);
    let f = |x: &ArrayView1<f64>| -> Array1<f64> {
        count.set(count.get() + 1);
        x.mapv(f64::sin)
    };
    let xt = array![[-4.], [-1.], [1.], [2.]];
    let yt = xt.mapv(f64::sin);
    let mut bo = BayesOptBuilder::optimize(f)
        .configure(|config| config.n_start(2))
        .min_from(&xt, &yt)
        .expect("optimizer built");
    assert_eq!(count.get(), 0);

    let x0 = array![-1.];
    let candidate = bo.suggest(&x0.view()).unwrap();
    assert_eq!(count.get(), 0);
    let record = bo.step(&x0.view()).unwrap();
    assert_eq!(count.get(), 1);
    assert_abs_diff_eq!(record.x, candidate, epsilon = 1e-12);
    assert_eq!(bo.gp().n_points(), 5);
    assert_eq!(bo.history().len(), 1);
}

#[test]
fn test_wrong_output_dimension() {
    let f = |x: &ArrayView1<f64>| -> Array1<f64> { array![x[0].sin(), x[0].cos()] };
    let xt = array![[-4.], [-1.], [1.], [2.]];
    let yt = xt.mapv(f64::sin);
    let mut bo = BayesOptBuilder::optimize(f)
        .configure(|config| config.n_start(2))
        .min_from(&xt, &yt)
        .expect("optimizer built");
    assert!(matches!(
        bo.step(&array![0.].view()),
        Err(BoError::DimensionMismatch(_))
    ));
    // model is left untouched
    assert_eq!(bo.gp().n_points(), 4);
}

#[test]
fn test_sphere_within_bounds() {
    let sphere = |x: &ArrayView1<f64>| -> Array1<f64> {
        array![argmin_testfunctions::sphere(&x.to_vec())]
    };
    let xlimits = array![[-2., 2.], [-2., 2.]];
    let res = BayesOptBuilder::optimize(sphere)
        .configure(|config| config.max_iters(6).risk_weight(1.).n_start(4).seed(0))
        .min_within(&xlimits, 8)
        .expect("optimizer built")
        .run()
        .expect("optimization run");
    assert_eq!(res.x_doe.nrows(), 14);
    for x in res.x_doe.rows() {
        assert!(x.iter().all(|v| (-2. ..=2.).contains(v)));
    }
    // the first Sobol point is the center of the box, hence the minimum
    assert_abs_diff_eq!(res.y_opt[0], 0., epsilon = 1e-12);
    assert_eq!(res.history.len(), 6);
}

#[test]
fn test_optim_result_json() {
    let xt = array![[-4.], [-1.], [1.], [2.]];
    let res = BayesOptBuilder::optimize(sine)
        .configure(|config| config.max_iters(1).n_start(2).x0(&array![-1.]))
        .min_from_doe(&xt)
        .expect("optimizer built")
        .run()
        .expect("optimization run");
    let json = serde_json::to_string(&res).unwrap();
    let loaded: gpbo_opt::OptimResult = serde_json::from_str(&json).unwrap();
    assert_eq!(loaded.x_doe, res.x_doe);
    assert_eq!(loaded.history, res.history);
}
