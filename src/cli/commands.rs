// ============================================================
// Layer 1: CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `evaluate`, and all
// their flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the LeNet model on CIFAR-10 with early stopping
    Train(TrainArgs),

    /// Score the best model of a finished run
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory holding data_batch_1.bin … data_batch_5.bin and test_batch.bin
    #[arg(long, default_value = "cifar-10-batches-bin")]
    pub dataset_dir: PathBuf,

    /// Where tables, charts, the config and the best model are written
    #[arg(long, default_value = "runs")]
    pub output_dir: PathBuf,

    /// Base SGD learning rate, before the epoch schedule applies
    #[arg(long, default_value_t = 0.15)]
    pub learning_rate: f64,

    /// Maximum number of epochs
    #[arg(long, default_value_t = 200)]
    pub epoch_limit: usize,

    /// Feature maps of the three convolution blocks, e.g. 32,32,64
    #[arg(long, value_delimiter = ',', default_values_t = vec![32, 32, 64])]
    pub kernel_counts: Vec<usize>,

    /// Images per mini-batch
    #[arg(long, default_value_t = 500)]
    pub batch_size: usize,

    /// Leading images of the training pool held out for validation
    #[arg(long, default_value_t = 7500)]
    pub validation_size: usize,

    /// Iterations trained before early stopping may trigger
    #[arg(long, default_value_t = 10_000)]
    pub initial_patience: usize,

    /// Seed for weight initialization
    #[arg(long, default_value_t = 23455)]
    pub seed: u64,
}

/// The only crossing point between clap types and the application layer.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            dataset_dir:      a.dataset_dir,
            output_dir:       a.output_dir,
            learning_rate:    a.learning_rate,
            epoch_limit:      a.epoch_limit,
            kernel_counts:    a.kernel_counts,
            batch_size:       a.batch_size,
            validation_size:  a.validation_size,
            initial_patience: a.initial_patience,
            seed:             a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Output directory of the training run
    #[arg(long, default_value = "runs")]
    pub output_dir: PathBuf,

    /// Dataset directory, if different from the one used for training
    #[arg(long)]
    pub dataset_dir: Option<PathBuf>,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config() {
        let cli = Cli::try_parse_from(["lenet-cifar", "train"]).unwrap();
        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        let cfg: TrainConfig = args.into();
        let default = TrainConfig::default();

        assert_eq!(cfg.kernel_counts, default.kernel_counts);
        assert_eq!(cfg.learning_rate, default.learning_rate);
        assert_eq!(cfg.validation_size, default.validation_size);
        assert_eq!(cfg.initial_patience, default.initial_patience);
        assert_eq!(cfg.dataset_dir, default.dataset_dir);
    }

    #[test]
    fn test_kernel_counts_parse_comma_list() {
        let cli = Cli::try_parse_from([
            "lenet-cifar", "train", "--kernel-counts", "8,16,24", "--batch-size", "50",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(args.kernel_counts, vec![8, 16, 24]);
        assert_eq!(args.batch_size, 50);
    }

    #[test]
    fn test_evaluate_dataset_override_is_optional() {
        let cli = Cli::try_parse_from(["lenet-cifar", "evaluate", "--output-dir", "r1"]).unwrap();
        let Commands::Evaluate(args) = cli.command else {
            panic!("expected evaluate");
        };
        assert_eq!(args.output_dir, PathBuf::from("r1"));
        assert!(args.dataset_dir.is_none());
    }
}
