/**
This module holds the records of the corpus and the partitions (train or test) owning them. Each
record receives a stable identifier when it is loaded. The identifier never changes, even when the
record moves from one partition to another, which lets the migrations select records by identity
instead of by position.
*/
use crate::error::NerfoldError;
use crate::tag::TagFormat;
use ahash::AHashSet;
use enum_iterator::Sequence;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Stable identifier of a record, assigned once by a `RecordIdAllocator`.
pub struct RecordId(pub u64);

impl Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default, Clone)]
/// Monotonic arena counter handing out record identifiers. A single allocator should be used for
/// every record of a corpus, so that no two records share an identifier.
pub struct RecordIdAllocator {
    next: u64,
}

impl RecordIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> RecordId {
        let id = RecordId(self.next);
        self.next += 1;
        id
    }

    /// Builds a record with a fresh identifier.
    pub fn record(
        &mut self,
        tokens: Vec<String>,
        tags: Vec<String>,
    ) -> Result<Record, NerfoldError> {
        Record::new(self.next_id(), tokens, tags)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A sentence of the corpus: tokens and their parallel tags.
pub struct Record {
    id: RecordId,
    tokens: Vec<String>,
    tags: Vec<String>,
}

impl Record {
    /// Fails if the tokens and the tags are not of the same length.
    pub fn new(id: RecordId, tokens: Vec<String>, tags: Vec<String>) -> Result<Self, NerfoldError> {
        if tokens.len() != tags.len() {
            return Err(NerfoldError::RecordLengthMismatch {
                tokens: tokens.len(),
                tags: tags.len(),
            });
        }
        Ok(Self { id, tokens, tags })
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub(crate) fn tags_mut(&mut self) -> &mut [String] {
        &mut self.tags
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Keeps at most `max_length` tokens (and tags).
    pub fn truncate(&mut self, max_length: usize) {
        self.tokens.truncate(max_length);
        self.tags.truncate(max_length);
    }

    /// A negative record only contains outside tags.
    pub fn is_negative(&self, format: &TagFormat) -> bool {
        self.tags.iter().all(|t| format.entity_type(t).is_none())
    }

    /// Does any tag of the record carry this entity type?
    pub fn contains_type(&self, entity: &str, format: &TagFormat) -> bool {
        self.tags.iter().any(|t| format.has_type(t, entity))
    }

    /// Distinct entity types of the record, in order of first appearance.
    pub fn entity_types<'a>(&'a self, format: &'a TagFormat) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter_map(move |t| format.entity_type(t))
            .unique()
    }

    /// Number of mentions (span-starting tags) of the entity type in the record.
    pub fn count_mentions(&self, entity: &str, format: &TagFormat) -> usize {
        self.tags
            .iter()
            .filter(|t| format.has_type(t, entity) && format.starts_span(t))
            .count()
    }

    pub fn into_parts(self) -> (RecordId, Vec<String>, Vec<String>) {
        (self.id, self.tokens, self.tags)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Sequence, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Role of a partition.
pub enum Role {
    Train,
    Test,
    /// The whole corpus, before any split.
    Full,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Train => write!(f, "train"),
            Role::Test => write!(f, "test"),
            Role::Full => write!(f, "full"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// An ordered collection of records owned by a train or test split.
pub struct Partition {
    role: Role,
    records: Vec<Record>,
}

impl Partition {
    pub fn new(role: Role, records: Vec<Record>) -> Self {
        Self { role, records }
    }

    pub fn empty(role: Role) -> Self {
        Self::new(role, Vec::new())
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.records.iter().map(|r| r.id())
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.records.iter().any(|r| r.id() == id)
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Appends the records at the end of the partition.
    pub fn extend<I: IntoIterator<Item = Record>>(&mut self, records: I) {
        self.records.extend(records)
    }

    /// Removes the records whose identifier is in `ids`. Returns the partition without them and the
    /// removed records, both in their original order.
    pub fn split_off_ids(self, ids: &AHashSet<RecordId>) -> (Self, Vec<Record>) {
        let role = self.role;
        let (taken, kept): (Vec<Record>, Vec<Record>) =
            self.records.into_iter().partition(|r| ids.contains(&r.id()));
        (Self::new(role, kept), taken)
    }
}

impl<'a> IntoIterator for &'a Partition {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;
    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Helper used by the tests of the crate to build records from string slices.
#[cfg(test)]
pub(crate) fn build_records(sentences: Vec<Vec<(&str, &str)>>) -> Vec<Record> {
    let mut allocator = RecordIdAllocator::new();
    sentences
        .into_iter()
        .map(|pairs| {
            let (tokens, tags): (Vec<String>, Vec<String>) = pairs
                .into_iter()
                .map(|(tok, tag)| (String::from(tok), String::from(tag)))
                .unzip();
            allocator.record(tokens, tags).unwrap()
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use enum_iterator::all;

    #[test]
    fn test_allocator_is_monotonic() {
        let mut allocator = RecordIdAllocator::new();
        let ids: Vec<_> = (0..4).map(|_| allocator.next_id()).collect();
        assert_eq!(ids, vec![RecordId(0), RecordId(1), RecordId(2), RecordId(3)]);
    }

    #[test]
    fn test_record_length_mismatch() {
        let res = Record::new(
            RecordId(0),
            vec![String::from("a"), String::from("b")],
            vec![String::from("O")],
        );
        assert!(matches!(
            res,
            Err(NerfoldError::RecordLengthMismatch { tokens: 2, tags: 1 })
        ));
    }

    #[test]
    fn test_record_queries() {
        let records = build_records(vec![
            vec![("Paulo", "B-PER"), ("Silva", "I-PER"), ("e", "O"), ("Ana", "B-PER")],
            vec![("nada", "O"), ("aqui", "O")],
        ]);
        let format = TagFormat::default();
        assert!(records[0].contains_type("PER", &format));
        assert!(!records[0].contains_type("LOC", &format));
        assert_eq!(records[0].count_mentions("PER", &format), 2);
        assert!(!records[0].is_negative(&format));
        assert!(records[1].is_negative(&format));
        let types: Vec<&str> = records[0].entity_types(&format).collect();
        assert_eq!(types, vec!["PER"]);
        assert_eq!(records[1].entity_types(&format).count(), 0);
    }

    #[test]
    fn test_truncate() {
        let mut records = build_records(vec![vec![("a", "O"), ("b", "B-X"), ("c", "I-X")]]);
        records[0].truncate(2);
        assert_eq!(records[0].len(), 2);
        assert_eq!(records[0].tags(), &[String::from("O"), String::from("B-X")]);
    }

    #[test]
    fn test_split_off_ids_preserves_order() {
        let records = build_records(vec![
            vec![("a", "O")],
            vec![("b", "O")],
            vec![("c", "O")],
            vec![("d", "O")],
        ]);
        let partition = Partition::new(Role::Train, records);
        let ids: AHashSet<RecordId> = [RecordId(3), RecordId(1)].into_iter().collect();
        let (kept, taken) = partition.split_off_ids(&ids);
        assert_eq!(kept.ids().collect::<Vec<_>>(), vec![RecordId(0), RecordId(2)]);
        assert_eq!(
            taken.iter().map(|r| r.id()).collect::<Vec<_>>(),
            vec![RecordId(1), RecordId(3)]
        );
        assert_eq!(kept.role(), Role::Train);
    }

    #[test]
    fn test_role_display() {
        let names: Vec<String> = all::<Role>().map(|r| r.to_string()).collect();
        assert_eq!(names, vec!["train", "test", "full"]);
    }
}
