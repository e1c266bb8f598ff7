use gpbo_gp::Prediction;
use gpbo_opt::BayesOptBuilder;
use ndarray::{array, Array1, ArrayView1};

fn main() {
    env_logger::init();

    let sine = |x: &ArrayView1<f64>| -> Array1<f64> { x.mapv(f64::sin) };
    let xt = array![[-4.], [-1.], [1.], [2.]];

    let mut bo = BayesOptBuilder::optimize(sine)
        .configure(|config| config.max_iters(5).risk_weight(3.).n_start(2))
        .min_from_doe(&xt)
        .expect("optimizer built");
    let res = bo.run().expect("optimization run");

    for record in res.history.iter() {
        println!(
            "iter {}: x = {}, sin(x) = {}, acquisition = {:.4}",
            record.iter, record.x, record.y, record.acquisition
        );
    }
    println!("min sin(x) = {} at x = {}", res.y_opt, res.x_opt);

    for x in Array1::<f64>::linspace(-7., 5., 13) {
        if let Prediction::MeanVariance { mean, variance } =
            bo.gp().infer(&array![x]).expect("GP inference")
        {
            println!(
                "x = {x:6.2}  sin(x) = {:7.4}  mean = {:7.4}  std = {:7.4}",
                x.sin(),
                mean[0],
                variance[0].sqrt()
            );
        }
    }
}
