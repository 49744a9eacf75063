/*!
Descriptive statistics of a corpus, or of one side of a split. The statistics can be rendered as a
plain-text report (`Display`) or serialized to JSON.
*/
use crate::corpus::{Record, Role};
use crate::tag::TagFormat;
use ahash::AHashMap;
use itertools::Itertools;
use ndarray::Array1;
use ndarray_stats::QuantileExt;
use serde::Serialize;
use std::fmt::Display;

/// Sentences longer than these lengths are counted apart, they usually exceed the context of the
/// model.
pub const LONG_SENTENCE: usize = 256;
pub const VERY_LONG_SENTENCE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "lowercase")]
/// Which records the statistics describe.
pub enum Scope {
    Full,
    Fold {
        index: usize,
        role: Role,
        balanced: bool,
    },
}

impl Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Full => write!(f, "full dataset"),
            Scope::Fold {
                index,
                role,
                balanced: false,
            } => write!(f, "fold {} {}", index, role),
            Scope::Fold {
                index,
                role,
                balanced: true,
            } => write!(f, "fold {} {} (balanced)", index, role),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassCount {
    /// Entity type, underscores replaced by spaces.
    pub label: String,
    pub count: usize,
    /// Share of all the mentions.
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub scope: Scope,
    pub sentences: usize,
    pub negative_sentences: usize,
    pub negative_ratio: f64,
    pub sentences_over_256: usize,
    pub sentences_over_512: usize,
    pub tokens: usize,
    pub min_length: usize,
    pub max_length: usize,
    /// Rounded to 2 decimals.
    pub mean_length: f64,
    pub mentions: usize,
    pub n_classes: usize,
    /// Sorted by decreasing count, then by label.
    pub classes: Vec<ClassCount>,
}

impl DatasetStats {
    pub fn compute(records: &[Record], format: &TagFormat, scope: Scope) -> Self {
        let lengths: Array1<usize> = records.iter().map(|r| r.len()).collect();
        let sentences = records.len();
        let negative_sentences = records.iter().filter(|r| r.is_negative(format)).count();
        let mean_length = lengths
            .mapv(|l| l as f64)
            .mean()
            .map(|m| (m * 100.0).round() / 100.0)
            .unwrap_or(0.0);

        let mut counts: AHashMap<&str, usize> = AHashMap::new();
        for tag in records.iter().flat_map(|r| r.tags()) {
            if format.starts_span(tag) {
                if let Some(entity) = format.entity_type(tag) {
                    *counts.entry(entity).or_insert(0) += 1;
                }
            }
        }
        let mentions: usize = counts.values().sum();
        let classes: Vec<ClassCount> = counts
            .into_iter()
            .sorted_by(|(a, ca), (b, cb)| cb.cmp(ca).then_with(|| a.cmp(b)))
            .map(|(entity, count)| ClassCount {
                label: entity.replace('_', " "),
                count,
                ratio: ratio(count, mentions),
            })
            .collect();

        Self {
            scope,
            sentences,
            negative_sentences,
            negative_ratio: ratio(negative_sentences, sentences),
            sentences_over_256: lengths.iter().filter(|&&l| l > LONG_SENTENCE).count(),
            sentences_over_512: lengths.iter().filter(|&&l| l > VERY_LONG_SENTENCE).count(),
            tokens: lengths.sum(),
            min_length: lengths.min().copied().unwrap_or(0),
            max_length: lengths.max().copied().unwrap_or(0),
            mean_length,
            mentions,
            n_classes: classes.len(),
            classes,
        }
    }

    /// Count of a class, looked up by its entity type (with underscores or spaces).
    pub fn class_count(&self, entity: &str) -> usize {
        let label = entity.replace('_', " ");
        self.classes
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.count)
            .unwrap_or(0)
    }
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

impl Display for DatasetStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "==== Stats of the {} ====", self.scope)?;
        writeln!(f, "Sentences: {}", self.sentences)?;
        writeln!(
            f,
            "Negative sentences: {} ({:.2}%)",
            self.negative_sentences,
            self.negative_ratio * 100.0
        )?;
        writeln!(f, "Sentences over {} tokens: {}", LONG_SENTENCE, self.sentences_over_256)?;
        writeln!(f, "Sentences over {} tokens: {}", VERY_LONG_SENTENCE, self.sentences_over_512)?;
        writeln!(f, "Tokens: {}", self.tokens)?;
        writeln!(
            f,
            "Sentence length: min {}, max {}, mean {:.2}",
            self.min_length, self.max_length, self.mean_length
        )?;
        writeln!(f, "Mentions: {}", self.mentions)?;
        writeln!(f, "Classes: {}", self.n_classes)?;
        writeln!(f, "Class, Count, Ratio")?;
        for class in self.classes.iter() {
            writeln!(f, "{}, {}, {:.4}", class.label, class.count, class.ratio)?;
        }
        Ok(())
    }
}
