// ============================================================
// Layer 1: CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands off to Layer 2.
//
//   1. `train`    - trains LeNet on CIFAR-10 with early stopping
//   2. `evaluate` - reloads the best model and scores it
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "lenet-cifar",
    version = "0.1.0",
    about = "Train a LeNet convolutional network on CIFAR-10 with SGD and early stopping."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let output_dir = args.output_dir.clone();
    let summary = TrainUseCase::new(args.into()).execute()?;

    println!("{summary}");
    println!("Outputs written to '{}'", output_dir.display());
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let report = EvaluateUseCase::new(args.output_dir, args.dataset_dir).execute()?;
    println!("{report}");
    Ok(())
}
