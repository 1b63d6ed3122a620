use std::path::{Path, PathBuf};
use std::sync::Arc;

use blithe_config::{Task, TrainArgs};
use blithe_data::encode::{
    CausalEncoder, MaskedEncoder, Seq2SeqEncoder, SequenceEncoder, TaskEncoder,
};
use blithe_data::tokenizer::{Tokenizer, TokenizerTrait};
use blithe_data::{DataError, cache, prepare_train};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};

#[derive(Parser)]
#[command(
    name = "blithe",
    about = "Dataset preprocessing and cache tooling for blithe fine-tuning"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tokenize a dataset offline and save the partitions to disk
    Preprocess(PreprocessArgs),
    /// Show information about a preprocessed dataset directory
    Inspect {
        /// Preprocessed dataset directory
        dir: PathBuf,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Parser)]
struct PreprocessArgs {
    /// Input dataset file (.txt or .csv, depending on the task)
    input: PathBuf,

    /// Task the dataset is prepared for
    #[arg(long, default_value = "causal-lm")]
    task: Task,

    /// Optional separate eval dataset file; without it the input is split
    /// by --eval-ratio
    #[arg(long)]
    eval: Option<PathBuf>,

    /// Tokenizer: HuggingFace model name (e.g. "gpt2") or local file path
    #[arg(long, default_value = "gpt2")]
    tokenizer: String,

    /// Number of classes (sequence classification only)
    #[arg(long, default_value = "2")]
    num_labels: usize,

    /// Preprocessing parameters (lengths, ratio, cache paths)
    #[command(flatten)]
    args: TrainArgs,
}

fn run_preprocess<E: TaskEncoder>(
    encoder: &E,
    input: &Path,
    eval: Option<&Path>,
    args: &TrainArgs,
) -> Result<(), DataError> {
    let (train, eval) = prepare_train(encoder, input, eval, args)?;

    let out_dir = args
        .save_preprocessed_data_path
        .clone()
        .unwrap_or_else(|| cache::default_cache_dir(encoder.task()));
    println!(
        "Preprocessed {} train / {} eval examples into {}",
        train.len(),
        eval.len(),
        out_dir.display()
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Preprocess(cmd) => {
            let mut args = cmd.args;
            args.save_preprocessed_data = true;

            let tokenizer: Arc<dyn TokenizerTrait> = Arc::new(Tokenizer::load(&cmd.tokenizer));
            let input = &cmd.input;
            let eval = cmd.eval.as_deref();

            let result = match cmd.task {
                Task::CausalLm => run_preprocess(
                    &CausalEncoder::new(tokenizer, args.max_length),
                    input,
                    eval,
                    &args,
                ),
                Task::MaskedLm => run_preprocess(
                    &MaskedEncoder::new(tokenizer, args.max_length),
                    input,
                    eval,
                    &args,
                ),
                Task::Seq2Seq => run_preprocess(
                    &Seq2SeqEncoder::new(tokenizer, args.max_input_length, args.max_output_length),
                    input,
                    eval,
                    &args,
                ),
                Task::SequenceClassification => run_preprocess(
                    &SequenceEncoder::new(tokenizer, args.max_length, cmd.num_labels),
                    input,
                    eval,
                    &args,
                ),
            };

            if let Err(e) = result {
                eprintln!("Error preprocessing dataset: {e}");
                std::process::exit(1);
            }
        }
        Commands::Inspect { dir } => match cache::inspect(&dir) {
            Ok(summary) => {
                println!(
                    "Preprocessed dataset (version {}, task {})",
                    summary.version, summary.task
                );
                for (name, count) in summary.partitions {
                    println!("  {name}: {count} examples");
                }
            }
            Err(e) => {
                eprintln!("Error reading {}: {e}", dir.display());
                std::process::exit(1);
            }
        },
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "blithe", &mut std::io::stdout());
        }
    }
}
