// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the toy classification run in order:
//
//   Step 1: Generate labelled sequences   (Layer 4 - data)
//   Step 2: Split train/validation        (Layer 4 - data)
//   Step 3: Save config                   (Layer 6 - infra)
//   Step 4: Run training loop             (Layer 5 - ml)
//   Step 5: Save final report             (Layer 6 - infra)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{ensure, Result};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::{splitter::split_train_val, toy::ToyDataset};
use crate::domain::traits::SampleSource;
use crate::infra::{metrics::MetricsLogger, run_store::RunStore};
use crate::ml::{
    encoder::TransformerEncoderConfig,
    trainer::{run_training, TrainReport},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Serialisable so it can be written next to the metrics it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub output_dir:       String,
    pub num_samples:      usize,
    pub seq_length:       usize,
    pub vocab_size:       usize,
    pub epochs:           usize,
    pub batch_size:       usize,
    pub validation_split: f64,
    pub lr:               f64,
    pub d_model:          usize,
    pub num_heads:        usize,
    pub n_blocks:         usize,
    pub d_ff:             usize,
    pub dropout:          f64,
    pub seed:             u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            output_dir:       "runs".to_string(),
            num_samples:      100,
            seq_length:       10,
            vocab_size:       50,
            epochs:           5,
            batch_size:       32,
            validation_split: 0.2,
            lr:               1e-3,
            d_model:          128,
            num_heads:        4,
            n_blocks:         2,
            d_ff:             256,
            dropout:          0.1,
            seed:             42,
        }
    }
}

impl TrainConfig {
    /// The encoder sized for this run; positions are bounded by `seq_length`.
    pub fn encoder_config(&self) -> TransformerEncoderConfig {
        TransformerEncoderConfig::new(self.vocab_size, self.seq_length)
            .with_d_model(self.d_model)
            .with_num_heads(self.num_heads)
            .with_n_blocks(self.n_blocks)
            .with_d_ff(self.d_ff)
            .with_dropout(self.dropout)
    }

    pub fn validate(&self) -> Result<()> {
        self.encoder_config().validate()?;
        ensure!(self.num_samples > 0, "num_samples must be positive");
        ensure!(self.epochs > 0, "epochs must be positive");
        ensure!(self.batch_size > 0, "batch_size must be positive");
        ensure!(
            (0.0..1.0).contains(&self.validation_split),
            "validation_split must be in [0, 1), got {}",
            self.validation_split
        );
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full run end to end
    pub fn execute(&self) -> Result<TrainReport> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Generate data ─────────────────────────────────────────────
        let dataset = ToyDataset::new(cfg.num_samples, cfg.seq_length, cfg.vocab_size, cfg.seed);
        let samples = dataset.samples();
        tracing::info!("Generated {} labelled sequences", samples.len());

        // ── Step 2: Train / validation split ──────────────────────────────────
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let (train, val) = split_train_val(samples.clone(), 1.0 - cfg.validation_split, &mut rng);
        tracing::info!("Split: {} train, {} validation", train.len(), val.len());

        // A sequence the model has never seen, for the final prediction
        let probe = ToyDataset::new(1, cfg.seq_length, cfg.vocab_size, cfg.seed.wrapping_add(1))
            .samples()
            .remove(0);

        // ── Step 3: Save config ───────────────────────────────────────────────
        let store  = RunStore::new(&cfg.output_dir)?;
        store.save_config(cfg)?;
        let logger = MetricsLogger::new(&cfg.output_dir)?;

        // ── Step 4: Run training loop (Layer 5) ───────────────────────────────
        let report = run_training(cfg, train, &val, &samples, &probe, &logger)?;

        // ── Step 5: Save report ───────────────────────────────────────────────
        store.save_report(&report)?;
        tracing::info!("Run artefacts written to '{}'", store.dir().display());

        Ok(report)
    }
}
