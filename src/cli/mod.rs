// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `inspect` — runs the encoder on one batch and prints
//                  shapes and attention weights
//   2. `train`   — trains a toy sequence classifier
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InspectArgs, TrainArgs};

use crate::ml::{inspector::InspectReport, trainer::TrainReport};

#[derive(Parser, Debug)]
#[command(
    name = "transformer-encoder",
    version,
    about = "Run or train a Transformer encoder with multi-head self-attention."
)]
pub struct Cli {
    /// The subcommand to run (inspect or train)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Inspect(args) => run_inspect(args),
            Commands::Train(args)   => run_train(args),
        }
    }
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    use crate::application::inspect_use_case::InspectUseCase;

    let report = InspectUseCase::new(args.into()).execute()?;
    print_inspect(&report);
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training, artefacts go to: {}", args.output_dir);
    let report = TrainUseCase::new(args.into()).execute()?;
    print_train(&report);
    Ok(())
}

fn print_inspect(report: &InspectReport) {
    println!("Embedded:  {:?}", report.embedded_shape);
    println!("Encoded:   {:?}", report.encoded_shape);
    println!("Output:    {:?}  (L2 norm {:.4})", report.output_shape, report.output_l2_norm);

    for (i, block) in report.blocks.iter().enumerate() {
        println!("\nBlock {i}: attention weights {:?}", block.weight_shape);
        println!("  row sums in [{:.6}, {:.6}]", block.min_row_sum, block.max_row_sum);
        if let Some(w) = block.max_padding_weight {
            println!("  max weight on padding keys: {w:.3e}");
        }
        println!("  batch 0, head 0:");
        for row in &block.head0 {
            let cells: Vec<String> = row.iter().map(|w| format!("{w:.4}")).collect();
            println!("    [{}]", cells.join(", "));
        }
    }
}

fn print_train(report: &TrainReport) {
    if let Some(acc) = report.final_train_accuracy() {
        println!("Final train accuracy: {:.1}%", acc * 100.0);
    }
    if let Some(epoch) = report.best_epoch {
        println!("Best validation epoch: {epoch}");
    }
    if let Some(loss) = report.eval_loss {
        println!("Evaluation loss:      {loss:.4}");
    }
    println!("Evaluation accuracy:  {:.1}%", report.eval_accuracy * 100.0);
    println!("Prediction (P[label=1]) for a new sequence: {:.4}", report.prediction);
}
