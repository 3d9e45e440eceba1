// ============================================================
// Layer 4 — Toy Classification Dataset
// ============================================================
// Uniformly random token rows with uniformly random 0/1
// labels. There is no signal to learn beyond memorisation;
// the dataset exists to drive the encoder end to end through
// a real optimiser step.
//
// Defaults: 100 samples, 10 tokens each, vocabulary of 50.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::{sequence::LabeledSequence, traits::SampleSource};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToyDataset {
    pub num_samples: usize,
    pub seq_length:  usize,
    pub vocab_size:  usize,
    pub seed:        u64,
}

impl Default for ToyDataset {
    fn default() -> Self {
        Self {
            num_samples: 100,
            seq_length:  10,
            vocab_size:  50,
            seed:        0,
        }
    }
}

impl ToyDataset {
    pub fn new(num_samples: usize, seq_length: usize, vocab_size: usize, seed: u64) -> Self {
        Self { num_samples, seq_length, vocab_size, seed }
    }
}

impl SampleSource for ToyDataset {
    fn samples(&self) -> Vec<LabeledSequence> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let vocab   = self.vocab_size.max(1) as u32;
        (0..self.num_samples)
            .map(|_| {
                let tokens = (0..self.seq_length).map(|_| rng.gen_range(0..vocab)).collect();
                let label  = rng.gen_range(0..2u8);
                LabeledSequence::new(tokens, label)
            })
            .collect()
    }
}
