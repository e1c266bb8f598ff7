use gpbo_doe::{SamplingMethod, Sobol};
use ndarray::arr2;

fn main() {
    let xlimits = arr2(&[[-4., 4.], [-4., 4.], [-8., -2.]]);

    println!("Sobol multistart points within {xlimits}");
    let doe = Sobol::new(&xlimits).sample(8);
    println!("{doe}");

    println!("Same sequence including its origin");
    let doe = Sobol::new(&xlimits).with_skip(0).sample(8);
    println!("{doe}");
}
