use gpbo_gp::{GaussianProcess, Kernel, Prediction};
use linfa::prelude::*;
use ndarray::{arr2, Array1};

fn main() {
    env_logger::init();

    let xt = arr2(&[[-4.0], [-1.0], [1.0], [2.0]]);
    let yt = xt.mapv(f64::sin);

    let mut gp = GaussianProcess::<f64>::params(Kernel::SquaredExponential)
        .fit(&Dataset::new(xt, yt))
        .expect("GP fitted");
    println!("{gp}");

    for x in Array1::<f64>::linspace(-5., 5., 11) {
        if let Prediction::MeanVariance { mean, variance } =
            gp.infer(&Array1::from_elem(1, x)).expect("GP inference")
        {
            println!(
                "x = {x:6.2}  sin(x) = {:7.4}  mean = {:7.4}  std = {:7.4}",
                x.sin(),
                mean[0],
                variance[0].sqrt()
            );
        }
    }

    gp.add_sample(&Array1::from_elem(1, 0.0), &Array1::from_elem(1, 0.0))
        .expect("GP updated");
    println!("After adding x = 0: {gp}");
}
