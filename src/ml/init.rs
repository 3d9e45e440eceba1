// ============================================================
// Layer 5 — Seeded Parameter Initialisation
// ============================================================
// Burn's own `*Config::init` draws weights from the backend's
// global RNG. Here the caller threads an explicit `rand::Rng`
// through construction instead, so two models built from the
// same seed are bitwise identical.
//
//   Linear     — weight [d_input, d_output] and bias [d_output],
//                uniform in ±sqrt(1 / d_input)
//   Embedding  — table [vocab, d_model], uniform in ±0.05
//
// Weights are sampled on the host and uploaded once with
// Param::from_tensor; from then on they are ordinary Burn
// parameters that the optimiser can update.

use burn::{
    module::Param,
    nn::{Embedding, Linear},
    prelude::*,
    tensor::TensorData,
};
use rand::Rng;

/// Embedding tables start small, like the Keras default.
const EMBEDDING_INIT_BOUND: f64 = 0.05;

/// Sample a tensor of the given shape uniformly from `[-bound, bound)`.
pub fn uniform_tensor<B: Backend, const D: usize, R: Rng + ?Sized>(
    shape:  [usize; D],
    bound:  f64,
    rng:    &mut R,
    device: &B::Device,
) -> Tensor<B, D> {
    let count: usize = shape.iter().product();
    let values: Vec<f32> = (0..count)
        .map(|_| rng.gen_range(-bound..bound) as f32)
        .collect();
    Tensor::from_data(TensorData::new(values, shape), device)
}

/// A dense layer `d_input → d_output` with weights drawn from `rng`.
pub fn seeded_linear<B: Backend, R: Rng + ?Sized>(
    d_input:  usize,
    d_output: usize,
    rng:      &mut R,
    device:   &B::Device,
) -> Linear<B> {
    let bound  = (1.0 / d_input as f64).sqrt();
    let weight = uniform_tensor::<B, 2, R>([d_input, d_output], bound, rng, device);
    let bias   = uniform_tensor::<B, 1, R>([d_output], bound, rng, device);
    Linear {
        weight: Param::from_tensor(weight),
        bias:   Some(Param::from_tensor(bias)),
    }
}

/// A `vocab_size × d_model` lookup table with weights drawn from `rng`.
pub fn seeded_embedding<B: Backend, R: Rng + ?Sized>(
    vocab_size: usize,
    d_model:    usize,
    rng:        &mut R,
    device:     &B::Device,
) -> Embedding<B> {
    let weight = uniform_tensor::<B, 2, R>([vocab_size, d_model], EMBEDDING_INIT_BOUND, rng, device);
    Embedding { weight: Param::from_tensor(weight) }
}
