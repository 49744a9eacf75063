/*!
End-to-end preparation of a corpus: statistics, preprocessing, k-fold split and balancing of every
fold. Everything is written under the save folder of the `PipelineConfig`:

```text
save_folder/
    stats_full.txt
    stats_full.json
    fold-0/
        train.conll  dev.conll  train.jsonl  dev.jsonl
        stats.txt  stats.json  balance_report.json  preprocessing_snapshot.json
    fold-1/
        ...
```
*/
use crate::balance::{BalanceOutcome, BalanceReport, Balancer};
use crate::config::{BalanceConfig, PipelineConfig, SaveConfig};
use crate::corpus::{Partition, RecordIdAllocator, Role};
use crate::error::NerfoldError;
use crate::folds::{holdout, KFold};
use crate::io::{read_conll, write_conll, write_jsonl};
use crate::preprocessing;
use crate::stats::{DatasetStats, Scope};
use crate::tag::TagFormat;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

pub const TRAIN_CONLL: &str = "train.conll";
pub const TEST_CONLL: &str = "dev.conll";
pub const TRAIN_JSONL: &str = "train.jsonl";
pub const TEST_JSONL: &str = "dev.jsonl";

#[derive(Debug, Clone, Serialize)]
/// What was written for one fold.
pub struct FoldSummary {
    pub index: usize,
    pub dir: PathBuf,
    pub train: usize,
    pub test: usize,
    /// Present when the fold was balanced.
    pub report: Option<BalanceReport>,
}

fn write_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<(), NerfoldError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

fn write_stats(stats: &[DatasetStats], dir: &Path, name: &str) -> Result<(), NerfoldError> {
    let text: String = stats.iter().map(|s| s.to_string()).collect::<Vec<_>>().join("\n");
    fs::write(dir.join(format!("{}.txt", name)), text)?;
    write_json(&stats, dir.join(format!("{}.json", name)))
}

/// Writes the train and test partitions in the formats enabled by `save`.
pub fn save_split(
    dir: &Path,
    train: &Partition,
    test: &Partition,
    save: &SaveConfig,
    separator: char,
) -> Result<(), NerfoldError> {
    if save.save_into_conll {
        write_conll(train, dir.join(TRAIN_CONLL), separator)?;
        write_conll(test, dir.join(TEST_CONLL), separator)?;
    }
    if save.save_into_json {
        write_jsonl(train, dir.join(TRAIN_JSONL))?;
        write_jsonl(test, dir.join(TEST_JSONL))?;
    }
    Ok(())
}

/// Statistics of both sides of a split.
pub fn split_stats(
    train: &Partition,
    test: &Partition,
    format: &TagFormat,
    index: usize,
    balanced: bool,
) -> [DatasetStats; 2] {
    [(train, Role::Train), (test, Role::Test)].map(|(partition, role)| {
        DatasetStats::compute(
            partition.records(),
            format,
            Scope::Fold {
                index,
                role,
                balanced,
            },
        )
    })
}

/// Creates the directory, failing if it already exists.
fn create_fresh_dir(dir: &Path) -> Result<(), NerfoldError> {
    if dir.exists() {
        return Err(NerfoldError::OutputExists(dir.to_path_buf()));
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Runs the whole pipeline. The configuration is validated and the save folder must not exist
/// yet. Nothing is written before the corpus is loaded, preprocessed and split.
pub fn run(config: &PipelineConfig) -> Result<Vec<FoldSummary>, NerfoldError> {
    config.validate()?;
    let balancer = Balancer::new(config.balance.clone())?;
    let format = config.balance.format();
    let separator = config.dataset.separator;
    let output = &config.save.save_folder;
    if output.exists() {
        return Err(NerfoldError::OutputExists(output.to_path_buf()));
    }

    let dataset = config.dataset.path();
    info!(path = %dataset.display(), "loading dataset");
    let mut allocator = RecordIdAllocator::new();
    let records = read_conll(&dataset, separator, &mut allocator)?;
    let full = DatasetStats::compute(&records, format, Scope::Full);
    info!(sentences = full.sentences, classes = full.n_classes, "computed dataset stats");

    let mut rng = StdRng::seed_from_u64(config.utils.random_state);
    info!("preprocessing dataset");
    let records = preprocessing::apply(records, &config.preprocessing, format, &mut rng)?;

    let folds = KFold::new(config.kfold.n_fold, true).split(records.len(), &mut rng)?;
    create_fresh_dir(output)?;
    write_stats(&[full], output, "stats_full")?;
    let mut summaries = Vec::new();
    for fold in folds.iter() {
        let dir = output.join(format!("fold-{}", fold.index));
        fs::create_dir_all(&dir)?;
        let (train, test) = fold.partitions(&records);
        info!(fold = fold.index, train = train.len(), test = test.len(), "split fold");
        let mut stats = Vec::from(split_stats(&train, &test, format, fold.index, false));
        save_split(&dir, &train, &test, &config.save, separator)?;

        let (train, test, report) = if config.preprocessing.balance_folds {
            let outcome = balancer.balance_with_report(train, test);
            info!(
                fold = fold.index,
                moved = outcome.report.moved(),
                converged = outcome.report.converged(),
                "balanced fold"
            );
            save_split(&dir, &outcome.train, &outcome.test, &config.save, separator)?;
            stats.extend(split_stats(
                &outcome.train,
                &outcome.test,
                format,
                fold.index,
                true,
            ));
            write_json(&outcome.report, dir.join("balance_report.json"))?;
            (outcome.train, outcome.test, Some(outcome.report))
        } else {
            (train, test, None)
        };
        write_stats(&stats, &dir, "stats")?;
        write_json(&config.preprocessing, dir.join("preprocessing_snapshot.json"))?;
        info!(fold = fold.index, dir = %dir.display(), "saved fold");

        summaries.push(FoldSummary {
            index: fold.index,
            dir,
            train: train.len(),
            test: test.len(),
            report,
        });
        if config.save.save_only_first_fold {
            info!("saving only the first fold");
            break;
        }
    }
    Ok(summaries)
}

/// Reads a train and a test CoNLL file and balances them.
pub fn balance_files<P: AsRef<Path>>(
    train_path: P,
    test_path: P,
    config: BalanceConfig,
    separator: char,
) -> Result<BalanceOutcome, NerfoldError> {
    let balancer = Balancer::new(config)?;
    // Shared, so that identifiers are unique across both files.
    let mut allocator = RecordIdAllocator::new();
    let train = read_conll(train_path, separator, &mut allocator)?;
    let test = read_conll(test_path, separator, &mut allocator)?;
    Ok(balancer.balance_with_report(
        Partition::new(Role::Train, train),
        Partition::new(Role::Test, test),
    ))
}

/// Reads a single CoNLL file, sends `test_size` of it to a test partition and balances the split.
pub fn balance_single_file<P: AsRef<Path>>(
    path: P,
    test_size: f64,
    seed: u64,
    config: BalanceConfig,
    separator: char,
) -> Result<BalanceOutcome, NerfoldError> {
    let balancer = Balancer::new(config)?;
    let records = read_conll(path, separator, &mut RecordIdAllocator::new())?;
    let mut rng = StdRng::seed_from_u64(seed);
    let (train, test) = holdout(records, test_size, &mut rng)?;
    info!(train = train.len(), test = test.len(), "holdout split");
    Ok(balancer.balance_with_report(train, test))
}

/// Writes a balanced split and its statistics into a new directory.
pub fn save_outcome(
    dir: &Path,
    outcome: &BalanceOutcome,
    save: &SaveConfig,
    format: &TagFormat,
    separator: char,
) -> Result<(), NerfoldError> {
    create_fresh_dir(dir)?;
    save_split(dir, &outcome.train, &outcome.test, save, separator)?;
    write_stats(
        &split_stats(&outcome.train, &outcome.test, format, 0, true),
        dir,
        "stats",
    )?;
    write_json(&outcome.report, dir.join("balance_report.json"))
}
