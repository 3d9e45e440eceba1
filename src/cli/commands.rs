// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `inspect` and `train`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{inspect_use_case::InspectConfig, train_use_case::TrainConfig};

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a freshly initialised encoder on one batch and print its attention
    Inspect(InspectArgs),

    /// Train a small classifier on random toy sequences
    Train(TrainArgs),
}

/// All arguments for the `inspect` command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Token ids, rows separated by ';' and ids by ','
    #[arg(long, default_value = "1,2,3;4,5,6")]
    pub tokens: String,

    /// Valid length per row, e.g. "3,2"; omit for no masking
    #[arg(long)]
    pub valid_lens: Option<String>,

    /// Number of distinct token ids
    #[arg(long, default_value_t = 1000)]
    pub vocab_size: usize,

    /// Longest sequence the positional table covers
    #[arg(long, default_value_t = 50)]
    pub max_len: usize,

    /// Width of every token representation
    #[arg(long, default_value_t = 128)]
    pub d_model: usize,

    /// Number of attention heads; must divide d_model
    #[arg(long, default_value_t = 4)]
    pub num_heads: usize,

    /// Number of stacked encoder blocks
    #[arg(long, default_value_t = 2)]
    pub n_blocks: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 256)]
    pub d_ff: usize,

    /// Dropout probability (inactive outside training)
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Seed for weight initialisation
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<InspectArgs> for InspectConfig {
    fn from(a: InspectArgs) -> Self {
        InspectConfig {
            tokens:     a.tokens,
            valid_lens: a.valid_lens,
            vocab_size: a.vocab_size,
            max_len:    a.max_len,
            d_model:    a.d_model,
            num_heads:  a.num_heads,
            n_blocks:   a.n_blocks,
            d_ff:       a.d_ff,
            dropout:    a.dropout,
            seed:       a.seed,
        }
    }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory for train_config.json, metrics.csv and report.json
    #[arg(long, default_value = "runs")]
    pub output_dir: String,

    /// Number of random sequences to generate
    #[arg(long, default_value_t = 100)]
    pub num_samples: usize,

    /// Tokens per sequence
    #[arg(long, default_value_t = 10)]
    pub seq_length: usize,

    /// Token ids are drawn from [0, vocab_size)
    #[arg(long, default_value_t = 50)]
    pub vocab_size: usize,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 5)]
    pub epochs: usize,

    /// Number of samples processed together in one forward pass
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Fraction of samples held out for validation
    #[arg(long, default_value_t = 0.2)]
    pub validation_split: f64,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    #[arg(long, default_value_t = 128)]
    pub d_model: usize,

    /// d_model must be divisible by num_heads
    #[arg(long, default_value_t = 4)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 2)]
    pub n_blocks: usize,

    #[arg(long, default_value_t = 256)]
    pub d_ff: usize,

    /// Dropout probability during training
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Seed for data generation, splitting, shuffling and initialisation
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            output_dir:       a.output_dir,
            num_samples:      a.num_samples,
            seq_length:       a.seq_length,
            vocab_size:       a.vocab_size,
            epochs:           a.epochs,
            batch_size:       a.batch_size,
            validation_split: a.validation_split,
            lr:               a.lr,
            d_model:          a.d_model,
            num_heads:        a.num_heads,
            n_blocks:         a.n_blocks,
            d_ff:             a.d_ff,
            dropout:          a.dropout,
            seed:             a.seed,
        }
    }
}
