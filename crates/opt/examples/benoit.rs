use gpbo_gp::{GaussianProcess, Kernel};
use gpbo_opt::BayesOptBuilder;
use linfa::prelude::*;
use ndarray::{array, Array1, Array2, ArrayView1};
use ndarray_rand::rand::{rngs::StdRng, Rng, SeedableRng};
use ndarray_rand::rand_distr::Normal;
use std::cell::RefCell;

type PlantFn = fn(&ArrayView1<f64>) -> f64;

/// Noise variance of plant measurements, zero to disable
const NOISE: f64 = 1e-3;

/// Adds a gaussian noise of variance `noise` when not zero
fn measure(value: f64, noise: f64, rng: &RefCell<StdRng>) -> f64 {
    if noise > 0. {
        let normal = Normal::new(0., noise.sqrt()).expect("valid noise");
        value + rng.borrow_mut().sample(normal)
    } else {
        value
    }
}

/// Plant objective
fn plant_objective(u: &ArrayView1<f64>) -> f64 {
    u[0] * u[0] + u[1] * u[1] + u[0] * u[1]
}

/// Second plant objective
fn plant_objective_2(u: &ArrayView1<f64>) -> f64 {
    let c = 1. - u[0] * u[1];
    u[0] * u[0] + u[1] * u[1] + c * c
}

/// Plant constraint, feasible when positive
fn plant_constraint(u: &ArrayView1<f64>) -> f64 {
    -(1. - u[0] + u[1] * u[1] + 2. * u[1] - 2.)
}

/// Tighter plant constraint, feasible when positive
fn plant_constraint_tight(u: &ArrayView1<f64>) -> f64 {
    -(1. - u[0] + u[1] * u[1] + 2. * u[1])
}

/// Modifier correction of output `i` at the shifted point `u + d`
fn correction(modifier: Option<&GaussianProcess<f64>>, i: usize, ud: &Array1<f64>) -> f64 {
    modifier
        .map(|gp| gp.predict_valvar(ud).expect("GP inference").0[i])
        .unwrap_or(0.)
}

/// Model objective at `u` shifted by the disturbance `d`, corrected by the modifier if any
fn model_objective(
    theta: &[f64; 4],
    u: &ArrayView1<f64>,
    d: &[f64; 2],
    modifier: Option<&GaussianProcess<f64>>,
) -> f64 {
    let ud = array![u[0] + d[0], u[1] + d[1]];
    theta[0] * ud[0] * ud[0] + theta[1] * ud[1] * ud[1] + correction(modifier, 0, &ud)
}

/// Model constraint at `u` shifted by the disturbance `d`, feasible when positive.
/// The modifier correction applies before the sign change.
fn model_constraint(
    theta: &[f64; 4],
    u: &ArrayView1<f64>,
    d: &[f64; 2],
    modifier: Option<&GaussianProcess<f64>>,
) -> f64 {
    let ud = array![u[0] + d[0], u[1] + d[1]];
    -(1. - theta[2] * ud[0] + theta[3] * ud[1] * ud[1] + correction(modifier, 1, &ud))
}

fn main() {
    env_logger::init();

    let theta = [1., 1., 1., 1.];
    let d = [0., 0.];
    let rng = RefCell::new(StdRng::seed_from_u64(42));

    let systems: [(&str, PlantFn, PlantFn); 2] = [
        ("system 1", plant_objective, plant_constraint),
        ("system 2 (tight)", plant_objective_2, plant_constraint_tight),
    ];
    for (name, objective, constraint) in systems {
        println!("== {name}");

        // plant/model mismatch, the constraint one being taken before the sign change
        let mismatch = |u: &ArrayView1<f64>| -> Array1<f64> {
            array![
                measure(objective(u), NOISE, &rng) - model_objective(&theta, u, &d, None),
                model_constraint(&theta, u, &d, None) - measure(constraint(u), NOISE, &rng)
            ]
        };

        let ut = array![
            [1.4, -0.8],
            [1.2, -0.5],
            [1.0, -1.0],
            [1.6, -0.9],
            [1.3, -1.2]
        ];
        let mut yt = Array2::zeros((ut.nrows(), 2));
        for (i, u) in ut.rows().into_iter().enumerate() {
            yt.row_mut(i).assign(&mismatch(&u));
        }
        // the modifier is evaluated at u + d, so it is trained on shifted inputs
        let ud = &ut + &array![d[0], d[1]];

        let modifier = GaussianProcess::<f64>::params(Kernel::SquaredExponential)
            .n_start(4)
            .fit(&Dataset::new(ud, yt))
            .expect("GP modifier fitted");
        println!("{modifier}");

        for u in [array![1.1, -0.7], array![1.5, -1.0]] {
            let u = u.view();
            let variance = modifier
                .predict_valvar(&array![u[0] + d[0], u[1] + d[1]])
                .expect("GP inference")
                .1;
            println!(
                "u = {u}: plant (f, g) = ({:.4}, {:.4}), modified model (f, g) = ({:.4}, {:.4}), variance = {}",
                objective(&u),
                constraint(&u),
                model_objective(&theta, &u, &d, Some(&modifier)),
                model_constraint(&theta, &u, &d, Some(&modifier)),
                variance
            );
        }

        // bayesian optimization of the measured plant, the constraint is
        // only monitored as a second output
        let plant = |u: &ArrayView1<f64>| -> Array1<f64> {
            array![
                measure(objective(u), NOISE, &rng),
                measure(constraint(u), NOISE, &rng)
            ]
        };
        let xlimits = array![[-0.6, 1.5], [-2., 2.]];
        let res = BayesOptBuilder::optimize(plant)
            .configure(|config| config.max_iters(10).risk_weight(3.).n_start(4).seed(42))
            .min_within(&xlimits, 6)
            .expect("optimizer built")
            .run()
            .expect("optimization run");
        println!("min plant objective = {} at u = {}", res.y_opt[0], res.x_opt);
    }
}
