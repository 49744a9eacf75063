/*!
Splitting a corpus into train and test partitions, either with a k-fold cross-validation or with a
single holdout split.
*/
use crate::config::validate_ratio;
use crate::corpus::{Partition, Record, Role};
use crate::error::ConfigError;
use num::Integer;
use rand::seq::{index::sample, SliceRandom};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// K-fold cross-validator. Every record is in the test indices of exactly one fold.
pub struct KFold {
    pub n_splits: usize,
    /// Shuffle the indices before they are cut into folds.
    pub shuffle: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Indices of the records of a fold, both in ascending order.
pub struct Fold {
    pub index: usize,
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl KFold {
    pub fn new(n_splits: usize, shuffle: bool) -> Self {
        Self { n_splits, shuffle }
    }

    /// Cuts `0..n_samples` into `n_splits` folds. The first `n_samples % n_splits` folds receive
    /// one more test index than the others.
    pub fn split<R: Rng + ?Sized>(
        &self,
        n_samples: usize,
        rng: &mut R,
    ) -> Result<Vec<Fold>, ConfigError> {
        if self.n_splits < 2 || n_samples < self.n_splits {
            return Err(ConfigError::InvalidFoldCount {
                n_splits: self.n_splits,
                n_samples,
            });
        }
        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            indices.shuffle(rng);
        }
        let (size, remainder) = n_samples.div_rem(&self.n_splits);
        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for index in 0..self.n_splits {
            let len = if index < remainder { size + 1 } else { size };
            let mut in_test = vec![false; n_samples];
            for &i in &indices[start..start + len] {
                in_test[i] = true;
            }
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..n_samples).partition(|&i| in_test[i]);
            folds.push(Fold { index, train, test });
            start += len;
        }
        Ok(folds)
    }
}

impl Fold {
    /// Copies the records of the fold into a train and a test partition.
    pub fn partitions(&self, records: &[Record]) -> (Partition, Partition) {
        let pick = |indices: &[usize]| -> Vec<Record> {
            indices
                .iter()
                .filter_map(|&i| records.get(i).cloned())
                .collect()
        };
        (
            Partition::new(Role::Train, pick(&self.train)),
            Partition::new(Role::Test, pick(&self.test)),
        )
    }
}

/// Randomly sends `ceil(test_size * n)` records to the test partition. Both partitions keep the
/// order of `records`.
pub fn holdout<R: Rng + ?Sized>(
    records: Vec<Record>,
    test_size: f64,
    rng: &mut R,
) -> Result<(Partition, Partition), ConfigError> {
    validate_ratio("test_size", test_size)?;
    let n_test = ((test_size * records.len() as f64).ceil() as usize).min(records.len());
    let mut in_test = vec![false; records.len()];
    for i in sample(rng, records.len(), n_test) {
        in_test[i] = true;
    }
    let (test, train): (Vec<(usize, Record)>, Vec<(usize, Record)>) =
        records.into_iter().enumerate().partition(|(i, _)| in_test[*i]);
    let strip = |pairs: Vec<(usize, Record)>| -> Vec<Record> {
        pairs.into_iter().map(|(_, r)| r).collect()
    };
    Ok((
        Partition::new(Role::Train, strip(train)),
        Partition::new(Role::Test, strip(test)),
    ))
}
