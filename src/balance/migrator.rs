/*!
Moves whole records from one partition to the other.
*/
use crate::corpus::{Partition, RecordId};
use crate::tag::TagFormat;
use ahash::AHashSet;
use serde::Serialize;
use tracing::{trace, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Number of records asked for and actually moved by one migration.
pub struct MigrationCount {
    pub entity: String,
    pub requested: usize,
    pub moved: usize,
}

/// Result of a migration: both partitions and what was moved.
pub struct Migration {
    pub destination: Partition,
    pub source: Partition,
    pub count: MigrationCount,
}

/// Number of records to move. With `normalize`, the sign of `quantity` is dropped. Without it, a
/// negative `quantity` means "all the matching records but `|quantity|`".
///
/// With 7 matching records:
/// * `quantity = 2, normalize = true` -> 2
/// * `quantity = 2, normalize = false` -> 2
/// * `quantity = -2, normalize = true` -> 2
/// * `quantity = -2, normalize = false` -> 5
pub fn effective_quantity(quantity: i64, normalize: bool, matching: usize) -> usize {
    let magnitude = usize::try_from(quantity.unsigned_abs()).unwrap_or(usize::MAX);
    if normalize || quantity >= 0 {
        magnitude
    } else {
        matching.saturating_sub(magnitude)
    }
}

/// Moves records containing `entity` from `source` to the end of `destination`, keeping the
/// order in which they are found in `source`. Fewer records than asked are moved when `source`
/// does not hold enough of them.
///
/// Both partitions are taken by value and returned: the caller must use the returned partitions
/// as the new state.
pub fn transfer(
    destination: Partition,
    source: Partition,
    quantity: i64,
    entity: &str,
    normalize: bool,
    format: &TagFormat,
) -> (Partition, Partition) {
    let migration = migrate(destination, source, quantity, entity, normalize, format);
    (migration.destination, migration.source)
}

/// Same as `transfer`, but also reports how many records were moved.
pub fn migrate(
    mut destination: Partition,
    source: Partition,
    quantity: i64,
    entity: &str,
    normalize: bool,
    format: &TagFormat,
) -> Migration {
    let candidates: Vec<RecordId> = source
        .iter()
        .filter(|r| r.contains_type(entity, format))
        .map(|r| r.id())
        .collect();
    let requested = effective_quantity(quantity, normalize, candidates.len());
    // Identifiers are unique, so a record can be selected only once.
    let selected: AHashSet<RecordId> = candidates.into_iter().take(requested).collect();
    let (source, moved) = source.split_off_ids(&selected);
    for record in moved.iter() {
        trace!(
            record = %record.id(),
            entity,
            from = %source.role(),
            to = %destination.role(),
            "migrating record"
        );
    }
    let moved_count = moved.len();
    if moved_count < requested {
        warn!(
            entity,
            requested,
            moved = moved_count,
            from = %source.role(),
            "not enough records to migrate"
        );
    }
    destination.extend(moved);
    Migration {
        destination,
        source,
        count: MigrationCount {
            entity: String::from(entity),
            requested,
            moved: moved_count,
        },
    }
}
