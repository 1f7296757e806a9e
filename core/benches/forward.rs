#[macro_use]
extern crate criterion;
use criterion::Criterion;

use paddy_core::ops::array::Flatten;
use paddy_core::ops::cnn::{Conv2d, MaxPool, PaddingSpec, PoolSpec};
use paddy_core::ops::nn::{Activation, Dense};
use paddy_core::prelude::*;

fn mk(shape: &[usize]) -> Arc<Tensor> {
    let len = shape.iter().product::<usize>();
    let data = (0..len).map(|i| ((i % 17) as f32 - 8.0) / 64.0).collect::<Vec<f32>>();
    Arc::new(Tensor::from_shape(shape, &data).unwrap())
}

// two conv blocks and a classifier head, the usual leaf-disease layout
fn model(size: usize) -> ModelArtifact {
    let after_pools = size / 4;
    ModelArtifact::builder("bench", InputContract::new(size, size))
        .layer(Conv2d::new(mk(&[3, 3, 3, 16]), Some(mk(&[16])), tvec!(1, 1), PaddingSpec::SameUpper))
        .layer(Activation::Relu)
        .layer(MaxPool::new(PoolSpec::new(tvec!(2, 2), PaddingSpec::Valid, None)))
        .layer(Conv2d::new(mk(&[3, 3, 16, 32]), Some(mk(&[32])), tvec!(1, 1), PaddingSpec::SameUpper))
        .layer(Activation::Relu)
        .layer(MaxPool::new(PoolSpec::new(tvec!(2, 2), PaddingSpec::Valid, None)))
        .layer(Flatten::default())
        .layer(Dense::new(mk(&[after_pools * after_pools * 32, 10]), Some(mk(&[10]))))
        .layer(Activation::Softmax)
        .build()
        .unwrap()
}

fn forward(c: &mut Criterion, size: usize) {
    c.bench_function(&format!("forward_{size}x{size}"), move |be| {
        let runner = InferenceRunner::new(Arc::new(model(size)));
        let input = Tensor::clone(&mk(&[1, size, size, 3]));
        be.iter(|| runner.infer(&input).unwrap());
    });
}

fn bs(c: &mut Criterion) {
    forward(c, 32);
    forward(c, 64);
}

criterion_group!(benches, bs);
criterion_main!(benches);
