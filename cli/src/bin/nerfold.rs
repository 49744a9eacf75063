use clap::{Args, Parser, Subcommand};
use nerfold::config::SaveConfig;
use nerfold::io::read_conll;
use nerfold::pipeline::{self, balance_files, balance_single_file, save_outcome};
use nerfold::{
    BalanceConfig, BalanceConfigBuilder, BalanceOutcome, CountMode, DatasetStats, NerfoldError,
    PipelineConfig, RecordIdAllocator, RecountPolicy, Scope, TagFormat,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "nerfold",
    version,
    about = "Prepare a NER corpus: stats, folds and entity balancing"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the whole pipeline described by a JSON settings file.
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides the save folder of the settings.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overrides the random state of the settings.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Balance an existing train/test split.
    Balance {
        #[arg(long)]
        train: PathBuf,
        #[arg(long)]
        test: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        balance: BalanceArgs,
    },
    /// Split a single corpus into train and test, then balance the split.
    Split {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long, default_value_t = 0.2)]
        test_size: f64,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[command(flatten)]
        balance: BalanceArgs,
    },
    /// Print the statistics of a corpus.
    Stats {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long, default_value_t = ' ')]
        separator: char,
        /// Print JSON instead of the plain-text report.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Debug, Args)]
struct BalanceArgs {
    #[arg(long, default_value_t = 0.75)]
    upper_limit: f64,
    #[arg(long, default_value_t = 0.10)]
    balancing_range: f64,
    /// `after-each-tier` or `snapshot`.
    #[arg(long, default_value = "after-each-tier")]
    recount: RecountPolicy,
    /// `records` or `mentions`.
    #[arg(long, default_value = "records")]
    count_mode: CountMode,
    #[arg(long, default_value_t = 1)]
    max_passes: usize,
    #[arg(long, default_value_t = ' ')]
    separator: char,
}

impl BalanceArgs {
    fn config(&self) -> Result<BalanceConfig, NerfoldError> {
        Ok(BalanceConfigBuilder::default()
            .upper_limit(self.upper_limit)
            .balancing_range(self.balancing_range)
            .recount(self.recount)
            .count_mode(self.count_mode)
            .max_passes(self.max_passes)
            .build()?)
    }
}

fn report(outcome: &BalanceOutcome) {
    info!(
        train = outcome.train.len(),
        test = outcome.test.len(),
        moved = outcome.report.moved(),
        converged = outcome.report.converged(),
        "balanced split"
    );
}

fn execute(command: Command) -> Result<(), NerfoldError> {
    match command {
        Command::Run {
            config,
            output,
            seed,
        } => {
            let content = std::fs::read_to_string(&config)?;
            let mut settings = PipelineConfig::from_json(&content)?;
            if let Some(output) = output {
                settings.save.save_folder = output;
            }
            if let Some(seed) = seed {
                settings.utils.random_state = seed;
            }
            let folds = pipeline::run(&settings)?;
            info!(folds = folds.len(), "done");
        }
        Command::Balance {
            train,
            test,
            output,
            balance,
        } => {
            let outcome = balance_files(&train, &test, balance.config()?, balance.separator)?;
            report(&outcome);
            save_outcome(
                &output,
                &outcome,
                &SaveConfig::default(),
                &TagFormat::default(),
                balance.separator,
            )?;
        }
        Command::Split {
            input,
            test_size,
            output,
            seed,
            balance,
        } => {
            let outcome =
                balance_single_file(&input, test_size, seed, balance.config()?, balance.separator)?;
            report(&outcome);
            save_outcome(
                &output,
                &outcome,
                &SaveConfig::default(),
                &TagFormat::default(),
                balance.separator,
            )?;
        }
        Command::Stats {
            input,
            separator,
            json,
        } => {
            let records = read_conll(&input, separator, &mut RecordIdAllocator::new())?;
            let stats = DatasetStats::compute(&records, &TagFormat::default(), Scope::Full);
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print!("{}", stats);
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
    let cli = Cli::parse();
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
