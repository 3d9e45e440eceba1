// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop for the sequence classifier with
// Burn's Adam optimiser.
//
//   - Training uses TrainBackend (Autodiff<NdArray>) for gradients
//   - model.valid() returns the model on EvalBackend (NdArray),
//     which also switches dropout off
//   - Validation and final evaluation batches use EvalBackend
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{ensure, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::data::batcher::SequenceBatcher;
use crate::domain::sequence::LabeledSequence;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::classifier::{binary_cross_entropy, correct_predictions, SequenceClassifier};

type TrainBackend = Autodiff<NdArray>;
type EvalBackend  = NdArray;

/// What a finished run reports back to the application layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainReport {
    pub epochs:        Vec<EpochMetrics>,
    /// None when the evaluation set is empty
    pub eval_loss:     Option<f64>,
    pub eval_accuracy: f64,
    /// Epoch with the lowest validation loss
    pub best_epoch:    Option<usize>,
    /// P(label = 1) for a freshly generated sequence
    pub prediction:    f64,
}

impl TrainReport {
    pub fn final_train_accuracy(&self) -> Option<f64> {
        self.epochs.last().map(|m| m.train_acc)
    }
}

/// Train on `train`, validate on `val` every epoch, then evaluate on
/// `eval` and score one `probe` sequence.
pub fn run_training(
    cfg:    &TrainConfig,
    train:  Vec<LabeledSequence>,
    val:    &[LabeledSequence],
    eval:   &[LabeledSequence],
    probe:  &LabeledSequence,
    logger: &MetricsLogger,
) -> Result<TrainReport> {
    ensure!(!train.is_empty(), "training set is empty");

    let device = NdArrayDevice::default();
    tracing::info!("Using NdArray device: {:?}", device);

    let mut rng = StdRng::seed_from_u64(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: SequenceClassifier<TrainBackend> =
        SequenceClassifier::new(&cfg.encoder_config(), &mut rng, &device)?;
    tracing::info!("Model ready: {} blocks, d_model={}", cfg.n_blocks, cfg.d_model);

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    let train_batcher = SequenceBatcher::<TrainBackend>::new(device.clone());
    let eval_batcher  = SequenceBatcher::<EvalBackend>::new(device.clone());

    let mut train  = train;
    let mut epochs = Vec::with_capacity(cfg.epochs);
    let mut best_val_loss = f64::INFINITY;
    let mut best_epoch    = None;

    for epoch in 1..=cfg.epochs {
        // ── Training phase ────────────────────────────────────────────────────
        train.shuffle(&mut rng);

        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        let mut correct  = 0usize;

        for chunk in train.chunks(cfg.batch_size.max(1)) {
            let batch = train_batcher.batch(chunk)?;
            let probs = model.forward(batch.tokens)?;
            let loss  = binary_cross_entropy(probs.clone(), batch.labels.clone());

            loss_sum += loss.clone().into_scalar().elem::<f64>();
            batches  += 1;
            correct  += correct_predictions(probs, batch.labels);

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let train_loss = loss_sum / batches as f64;
        let train_acc  = ratio(correct, train.len());

        // ── Validation phase ──────────────────────────────────────────────────
        let (val_loss, val_acc) = evaluate(&model.valid(), &eval_batcher, val, cfg.batch_size)?;

        let metrics = EpochMetrics::new(epoch, train_loss, train_acc, val_loss, val_acc);
        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.4} | train_acc={:.1}% | val_loss={} | val_acc={:.1}%",
            epoch, cfg.epochs, train_loss, train_acc * 100.0, fmt_loss(val_loss), val_acc * 100.0,
        );
        logger.log(&metrics)?;

        if let Some(loss) = val_loss.filter(|_| metrics.is_improvement(best_val_loss)) {
            best_val_loss = loss;
            best_epoch    = Some(epoch);
            tracing::info!("New best validation loss: {:.4}", loss);
        }
        epochs.push(metrics);
    }

    // ── Final evaluation + single prediction ──────────────────────────────────
    let trained = model.valid();
    let (eval_loss, eval_accuracy) = evaluate(&trained, &eval_batcher, eval, cfg.batch_size)?;

    let probe_batch = eval_batcher.batch(std::slice::from_ref(probe))?;
    let prediction  = trained
        .forward(probe_batch.tokens)?
        .into_scalar()
        .elem::<f64>();

    tracing::info!("Training complete!");
    Ok(TrainReport { epochs, eval_loss, eval_accuracy, best_epoch, prediction })
}

/// Mean loss and accuracy over `samples`, batched; (None, 0) when empty.
fn evaluate(
    model:      &SequenceClassifier<EvalBackend>,
    batcher:    &SequenceBatcher<EvalBackend>,
    samples:    &[LabeledSequence],
    batch_size: usize,
) -> Result<(Option<f64>, f64)> {
    let mut loss_sum = 0.0f64;
    let mut batches  = 0usize;
    let mut correct  = 0usize;

    for chunk in samples.chunks(batch_size.max(1)) {
        let batch = batcher.batch(chunk)?;
        let probs = model.forward(batch.tokens)?;
        loss_sum += binary_cross_entropy(probs.clone(), batch.labels.clone())
            .into_scalar()
            .elem::<f64>();
        batches  += 1;
        correct  += correct_predictions(probs, batch.labels);
    }

    let loss = (batches > 0).then(|| loss_sum / batches as f64);
    Ok((loss, ratio(correct, samples.len())))
}

fn fmt_loss(loss: Option<f64>) -> String {
    loss.map_or_else(|| "n/a".to_string(), |l| format!("{l:.4}"))
}

fn ratio(n: usize, total: usize) -> f64 {
    if total > 0 { n as f64 / total as f64 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::toy::ToyDataset;
    use crate::domain::traits::SampleSource;

    fn small_config(dir: &std::path::Path) -> TrainConfig {
        TrainConfig {
            output_dir: dir.display().to_string(),
            num_samples: 24,
            seq_length: 6,
            vocab_size: 20,
            epochs: 2,
            batch_size: 8,
            validation_split: 0.25,
            lr: 1e-3,
            d_model: 16,
            num_heads: 2,
            n_blocks: 1,
            d_ff: 32,
            dropout: 0.1,
            seed: 4,
        }
    }

    #[test]
    fn test_short_run_reports_every_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = small_config(dir.path());
        let samples = ToyDataset::new(cfg.num_samples, cfg.seq_length, cfg.vocab_size, 1).samples();
        let (train, val) = samples.split_at(18);
        let probe = ToyDataset::new(1, cfg.seq_length, cfg.vocab_size, 2).samples().remove(0);
        let logger = MetricsLogger::new(dir.path()).unwrap();

        let report = run_training(&cfg, train.to_vec(), val, &samples, &probe, &logger).unwrap();

        assert_eq!(report.epochs.len(), 2);
        assert!(report
            .epochs
            .iter()
            .all(|m| m.train_loss.is_finite() && m.val_loss.is_some_and(f64::is_finite)));
        assert!((0.0..=1.0).contains(&report.eval_accuracy));
        assert!((0.0..=1.0).contains(&report.prediction));
        assert!(report.final_train_accuracy().is_some());
        assert!(matches!(report.best_epoch, Some(1..=2)));

        let csv = std::fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_run_without_validation_set_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig { epochs: 1, ..small_config(dir.path()) };
        let samples = ToyDataset::new(cfg.num_samples, cfg.seq_length, cfg.vocab_size, 1).samples();
        let probe = samples[0].clone();
        let logger = MetricsLogger::new(dir.path()).unwrap();

        let report = run_training(&cfg, samples.clone(), &[], &samples, &probe, &logger).unwrap();
        assert_eq!(report.epochs[0].val_loss, None);
        assert_eq!(report.best_epoch, None);
        assert!(report.eval_loss.is_some());

        let store = crate::infra::run_store::RunStore::new(dir.path()).unwrap();
        store.save_report(&report).unwrap();
        let loaded: TrainReport = store.load_report().unwrap();
        assert_eq!(loaded.epochs, report.epochs);
        assert_eq!(loaded.best_epoch, None);
    }

    #[test]
    fn test_empty_training_set_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = small_config(dir.path());
        let probe = ToyDataset::new(1, cfg.seq_length, cfg.vocab_size, 2).samples().remove(0);
        let logger = MetricsLogger::new(dir.path()).unwrap();
        assert!(run_training(&cfg, Vec::new(), &[], &[], &probe, &logger).is_err());
    }

    #[test]
    fn test_evaluate_on_empty_set() {
        let device = NdArrayDevice::default();
        let cfg = small_config(std::path::Path::new("unused"));
        let model = SequenceClassifier::<EvalBackend>::new(
            &cfg.encoder_config(),
            &mut StdRng::seed_from_u64(0),
            &device,
        )
        .unwrap();
        let batcher = SequenceBatcher::<EvalBackend>::new(device);
        let (loss, acc) = evaluate(&model, &batcher, &[], 8).unwrap();
        assert!(loss.is_none());
        assert_eq!(acc, 0.0);
    }
}
