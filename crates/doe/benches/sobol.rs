use criterion::{criterion_group, criterion_main, Criterion};
use gpbo_doe::{SamplingMethod, Sobol};
use ndarray::aview1;

fn criterion_sobol(c: &mut Criterion) {
    let dims = [2, 10, 21];
    let sizes = [10, 1000];

    let mut group = c.benchmark_group("doe");
    group.sample_size(10);
    let arr1 = aview1(&[0., 1.]);
    for dim in dims {
        for size in sizes {
            group.bench_function(format!("sobol-{dim}-dim-{size}-size"), |b| {
                let xlimits = arr1.broadcast((dim, 2)).unwrap();
                b.iter(|| std::hint::black_box(Sobol::new(&xlimits).sample(size)));
            });
        }
    }
    group.finish();
}

criterion_group!(benches, criterion_sobol);
criterion_main!(benches);
