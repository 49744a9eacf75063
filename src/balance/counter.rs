/*!
Counts the occurrences of entity types in a partition.
*/
use crate::config::CountMode;
use crate::corpus::Partition;
use crate::tag::TagFormat;
use ndarray::Array1;

/// Number of occurrences of `entity` in the partition. With `CountMode::Records`, a record
/// containing the type at least once contributes 1, however many of its tags carry it. With
/// `CountMode::Mentions`, every span-starting tag of the type contributes 1.
pub fn count(partition: &Partition, entity: &str, format: &TagFormat, mode: CountMode) -> usize {
    match mode {
        CountMode::Records => partition
            .iter()
            .filter(|r| r.contains_type(entity, format))
            .count(),
        CountMode::Mentions => partition
            .iter()
            .map(|r| r.count_mentions(entity, format))
            .sum(),
    }
}

/// Counts every entity type of `entities`, in order.
pub fn count_all<S: AsRef<str>>(
    partition: &Partition,
    entities: &[S],
    format: &TagFormat,
    mode: CountMode,
) -> Array1<usize> {
    Array1::from_iter(
        entities
            .iter()
            .map(|e| count(partition, e.as_ref(), format, mode)),
    )
}
