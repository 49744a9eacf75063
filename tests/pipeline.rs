use nerfold::config::{DatasetConfig, KFoldConfig, SaveConfig, UtilsConfig};
use nerfold::io::{read_conll, read_jsonl};
use nerfold::pipeline::{run, TEST_CONLL, TEST_JSONL, TRAIN_CONLL, TRAIN_JSONL};
use nerfold::{
    ConfigError, NerfoldError, PipelineConfig, PreprocessingConfig, Record, RecordIdAllocator,
};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const N_SENTENCES: usize = 60;

fn data_folder() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("data")
}

fn settings(output: &Path) -> PipelineConfig {
    PipelineConfig {
        dataset: DatasetConfig {
            folder: data_folder(),
            filename: String::from("corpus.conll"),
            separator: ' ',
        },
        kfold: KFoldConfig { n_fold: 5 },
        save: SaveConfig {
            save_folder: output.to_path_buf(),
            ..Default::default()
        },
        utils: UtilsConfig { random_state: 13 },
        ..Default::default()
    }
}

fn read(path: PathBuf) -> Vec<Record> {
    read_conll(path, ' ', &mut RecordIdAllocator::new()).unwrap()
}

/// Sentences as strings, to compare records read from different files.
fn sentences(records: &[Record]) -> Vec<String> {
    let mut sentences: Vec<String> = records.iter().map(|r| r.tokens().join(" ")).collect();
    sentences.sort();
    sentences
}

#[test]
fn first_fold_only() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("output_folder");
    let config = settings(&output);
    let summaries = run(&config).unwrap();
    assert_eq!(summaries.len(), 1);
    assert!(output.join("stats_full.txt").exists());
    assert!(output.join("stats_full.json").exists());
    assert!(!output.join("fold-1").exists());

    let fold = output.join("fold-0");
    for name in [
        TRAIN_CONLL,
        TEST_CONLL,
        TRAIN_JSONL,
        TEST_JSONL,
        "stats.txt",
        "stats.json",
        "balance_report.json",
        "preprocessing_snapshot.json",
    ] {
        assert!(fold.join(name).exists(), "missing {}", name);
    }
    let train = read(fold.join(TRAIN_CONLL));
    let test = read(fold.join(TEST_CONLL));
    assert_eq!(train.len() + test.len(), N_SENTENCES);
    assert_eq!(summaries[0].train, train.len());
    assert_eq!(summaries[0].test, test.len());

    let all: Vec<Record> = read(data_folder().join("corpus.conll"));
    let written: Vec<Record> = train.iter().chain(test.iter()).cloned().collect();
    assert_eq!(sentences(&written), sentences(&all));

    let from_json = read_jsonl(fold.join(TRAIN_JSONL), &mut RecordIdAllocator::new()).unwrap();
    assert_eq!(sentences(&from_json), sentences(&train));

    let stats = std::fs::read_to_string(output.join("stats_full.txt")).unwrap();
    assert!(stats.contains("Sentences: 60"));
    assert!(stats.contains("Valor dano moral, 20"));
    let fold_stats = std::fs::read_to_string(fold.join("stats.txt")).unwrap();
    assert!(fold_stats.contains("fold 0 train (balanced)"));
}

#[test]
fn refuses_existing_output() {
    let dir = tempdir().unwrap();
    let config = settings(dir.path());
    assert!(matches!(run(&config), Err(NerfoldError::OutputExists(_))));
}

#[test]
fn missing_dataset_writes_nothing() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("output_folder");
    let mut config = settings(&output);
    config.dataset.filename = String::from("missing.conll");
    assert!(matches!(run(&config), Err(NerfoldError::Io(_))));
    assert!(!output.exists());
}

#[test]
fn too_many_folds_writes_nothing() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("output_folder");
    let mut config = settings(&output);
    config.kfold.n_fold = 100;
    assert!(matches!(
        run(&config),
        Err(NerfoldError::Config(ConfigError::InvalidFoldCount {
            n_splits: 100,
            n_samples: N_SENTENCES,
        }))
    ));
    assert!(!output.exists());
    // The folder is still free for the next run.
    config.kfold.n_fold = 5;
    assert!(run(&config).is_ok());
}

#[test]
fn unbalanced_folds_cover_the_corpus() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("folds");
    let mut config = settings(&output);
    config.save.save_only_first_fold = false;
    config.preprocessing = PreprocessingConfig {
        balance_folds: false,
        ..Default::default()
    };
    let summaries = run(&config).unwrap();
    assert_eq!(summaries.len(), 5);
    assert!(summaries.iter().all(|s| s.report.is_none()));

    let mut tests = Vec::new();
    for i in 0..5 {
        let fold = output.join(format!("fold-{}", i));
        let test = read(fold.join(TEST_CONLL));
        assert_eq!(test.len(), 12);
        assert!(!fold.join("balance_report.json").exists());
        tests.extend(test);
    }
    let all = read(data_folder().join("corpus.conll"));
    assert_eq!(sentences(&tests), sentences(&all));
}

#[test]
fn same_seed_same_folds() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first");
    let second = dir.path().join("second");
    run(&settings(&first)).unwrap();
    run(&settings(&second)).unwrap();
    for name in [TRAIN_CONLL, TEST_CONLL] {
        let a = std::fs::read_to_string(first.join("fold-0").join(name)).unwrap();
        let b = std::fs::read_to_string(second.join("fold-0").join(name)).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn preprocessing_is_applied_before_split() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("preprocessed");
    let mut config = settings(&output);
    config.preprocessing = PreprocessingConfig {
        remove_sentences_with: Some(String::from("CPF_do_réu")),
        fill_o_tags: vec![String::from("Data_dos_fatos")],
        max_length_sentence: 4,
        ..Default::default()
    };
    run(&config).unwrap();
    let fold = output.join("fold-0");
    let records: Vec<Record> = read(fold.join(TRAIN_CONLL))
        .into_iter()
        .chain(read(fold.join(TEST_CONLL)))
        .collect();
    assert_eq!(records.len(), N_SENTENCES - 10);
    assert!(records.iter().all(|r| r.len() <= 4));
    assert!(records
        .iter()
        .flat_map(|r| r.tags())
        .all(|t| !t.ends_with("Data_dos_fatos") && !t.ends_with("CPF_do_réu")));
    let snapshot = std::fs::read_to_string(fold.join("preprocessing_snapshot.json")).unwrap();
    assert!(snapshot.contains("\"max_length_sentence\": 4"));
}
