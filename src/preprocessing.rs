/*!
Transformations applied to the whole corpus before it is split into folds. Every transformation
takes the records by value and returns the survivors, in their original order and with their
original identifiers.
*/
use crate::config::{validate_ratio, PreprocessingConfig};
use crate::corpus::{Record, RecordId};
use crate::error::ConfigError;
use crate::tag::{TagFormat, OUTSIDE};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use rand::seq::index::sample;
use rand::Rng;
use tracing::info;

/// Keeps at most `max_length` tokens of every record.
pub fn truncate(mut records: Vec<Record>, max_length: usize) -> Result<Vec<Record>, ConfigError> {
    if max_length == 0 {
        return Err(ConfigError::ZeroMaxLength);
    }
    let mut truncated = 0;
    for record in records.iter_mut().filter(|r| r.len() > max_length) {
        record.truncate(max_length);
        truncated += 1;
    }
    info!(max_length, truncated, "truncated long sentences");
    Ok(records)
}

/// Applies `f` to the entity type of every tag. `f` returns the new tag, or `None` to leave the
/// tag untouched.
fn map_tags<F>(records: &mut [Record], format: &TagFormat, mut f: F)
where
    F: FnMut(&str, &str) -> Option<String>,
{
    for record in records.iter_mut() {
        for tag in record.tags_mut().iter_mut() {
            let current: &str = tag.as_str();
            let replacement = format.entity_type(current).and_then(|entity| f(current, entity));
            if let Some(replacement) = replacement {
                *tag = replacement;
            }
        }
    }
}

/// Replaces the tags of the given entity types by `O`.
pub fn fill_o_tags<S: AsRef<str>>(
    mut records: Vec<Record>,
    entities: &[S],
    format: &TagFormat,
) -> Vec<Record> {
    let entities: AHashSet<&str> = entities.iter().map(|e| e.as_ref()).collect();
    map_tags(&mut records, format, |_, entity| {
        entities.contains(entity).then(|| String::from(OUTSIDE))
    });
    info!(entities = ?entities, "replaced entity types by O");
    records
}

/// Entity types whose share of all the entity tags is strictly below `minimum_ratio`, from the
/// rarest to the most frequent.
pub fn rare_entities(
    records: &[Record],
    minimum_ratio: f64,
    format: &TagFormat,
) -> Result<Vec<String>, ConfigError> {
    validate_ratio("minimum_entity_ratio", minimum_ratio)?;
    let mut counts: AHashMap<&str, usize> = AHashMap::new();
    for entity in records
        .iter()
        .flat_map(|r| r.tags())
        .filter_map(|t| format.entity_type(t))
    {
        *counts.entry(entity).or_insert(0) += 1;
    }
    let total: usize = counts.values().sum();
    Ok(counts
        .into_iter()
        .sorted_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| a.cmp(b)))
        .take_while(|(_, count)| (*count as f64 / total as f64) < minimum_ratio)
        .map(|(entity, _)| String::from(entity))
        .collect())
}

/// Replaces the rare entity types (see `rare_entities`) by `O`.
pub fn filter_rare_entities(
    records: Vec<Record>,
    minimum_ratio: f64,
    format: &TagFormat,
) -> Result<Vec<Record>, ConfigError> {
    let rare = rare_entities(&records, minimum_ratio, format)?;
    Ok(fill_o_tags(records, &rare, format))
}

/// Randomly removes `round(ratio * n)` of the `n` records matching `predicate`.
fn undersample<R, P>(records: Vec<Record>, ratio: f64, rng: &mut R, predicate: P) -> Vec<Record>
where
    R: Rng + ?Sized,
    P: Fn(&Record) -> bool,
{
    let candidates: Vec<RecordId> = records
        .iter()
        .filter(|r| predicate(r))
        .map(|r| r.id())
        .collect();
    let amount = ((ratio * candidates.len() as f64).round() as usize).min(candidates.len());
    let removed: AHashSet<RecordId> = sample(rng, candidates.len(), amount)
        .into_iter()
        .map(|i| candidates[i])
        .collect();
    info!(
        candidates = candidates.len(),
        removed = removed.len(),
        "undersampled records"
    );
    records
        .into_iter()
        .filter(|r| !removed.contains(&r.id()))
        .collect()
}

/// Randomly removes a `ratio` of the records without any entity.
pub fn undersample_negative_sentences<R: Rng + ?Sized>(
    records: Vec<Record>,
    ratio: f64,
    format: &TagFormat,
    rng: &mut R,
) -> Result<Vec<Record>, ConfigError> {
    validate_ratio("ratio_of_undersample_negative_sentences", ratio)?;
    Ok(undersample(records, ratio, rng, |r| r.is_negative(format)))
}

/// Randomly removes a `ratio` of the records containing any of the given entity types.
pub fn undersample_entities<R: Rng + ?Sized, S: AsRef<str>>(
    records: Vec<Record>,
    entities: &[S],
    ratio: f64,
    format: &TagFormat,
    rng: &mut R,
) -> Result<Vec<Record>, ConfigError> {
    validate_ratio("ratio_of_undersample_tags", ratio)?;
    Ok(undersample(records, ratio, rng, |r| {
        entities.iter().any(|e| r.contains_type(e.as_ref(), format))
    }))
}

/// Drops the records carrying the entity type.
pub fn remove_records_with(records: Vec<Record>, entity: &str, format: &TagFormat) -> Vec<Record> {
    let before = records.len();
    let kept: Vec<Record> = records
        .into_iter()
        .filter(|r| !r.contains_type(entity, format))
        .collect();
    info!(entity, removed = before - kept.len(), "removed sentences");
    kept
}

/// Renames the given entity types to `target`, e.g. `B-Data_dos_fatos` to `B-Datas`.
pub fn aggregate_entities<S: AsRef<str>>(
    mut records: Vec<Record>,
    entities: &[S],
    target: &str,
    format: &TagFormat,
) -> Vec<Record> {
    let entities: AHashSet<&str> = entities.iter().map(|e| e.as_ref()).collect();
    map_tags(&mut records, format, |tag, entity| {
        entities
            .contains(entity)
            .then(|| format.rename(tag, target))
    });
    info!(entities = ?entities, target, "aggregated entity types");
    records
}

/// Runs the enabled transformations in order: rare entities, fill-O, aggregation, removal,
/// truncation (always), negative undersampling and entity undersampling.
pub fn apply<R: Rng + ?Sized>(
    mut records: Vec<Record>,
    config: &PreprocessingConfig,
    format: &TagFormat,
    rng: &mut R,
) -> Result<Vec<Record>, ConfigError> {
    config.validate()?;
    if let Some(ratio) = config.minimum_entity_ratio {
        records = filter_rare_entities(records, ratio, format)?;
    }
    if !config.fill_o_tags.is_empty() {
        records = fill_o_tags(records, &config.fill_o_tags, format);
    }
    if !config.datas_aggregation.is_empty() {
        records = aggregate_entities(
            records,
            &config.datas_aggregation,
            &config.aggregation_target,
            format,
        );
    }
    if let Some(entity) = config.remove_sentences_with.as_deref() {
        records = remove_records_with(records, entity, format);
    }
    records = truncate(records, config.max_length_sentence)?;
    if config.undersampling_negative_sentences {
        records = undersample_negative_sentences(
            records,
            config.ratio_of_undersample_negative_sentences,
            format,
            rng,
        )?;
    }
    if !config.undersampling_tags.is_empty() {
        records = undersample_entities(
            records,
            &config.undersampling_tags,
            config.ratio_of_undersample_tags,
            format,
            rng,
        )?;
    }
    Ok(records)
}
