/*!
This library prepares a named entity recognition (NER) corpus for training. It loads a CoNLL
corpus, computes descriptive statistics, applies filtering and undersampling transformations,
splits the corpus into cross-validation folds and balances the distribution of the entity types
between the train and test partitions of every fold.

# Balancing
For a given entity type, the share of its occurrences held by the train partition should fall in
the band `[upper_limit - balancing_range, upper_limit)`, by default `[0.65, 0.75)`. The balancer
moves whole records (never single tags) from one partition to the other until it does. Entity types
are processed by priority tiers: the `redator` tier first, then the `auxiliar` tier.

# Terminology
* A record is a sentence: a list of tokens and the parallel list of their tags.
* A tag is either `O` (outside of any entity) or a position marker and an entity type, such as
    `B-PER`. Only the entity type matters to the balancer.
* An occurrence of an entity type is, by default, a record containing it at least once. The
    `CountMode::Mentions` mode counts every span instead.
* A partition is the train or the test side of a split. Every record belongs to exactly one
    partition, and keeps its identifier (`RecordId`) when it moves.

# Example
```rust
use nerfold::{balance, Partition, RecordIdAllocator, Role};

let mut allocator = RecordIdAllocator::new();
let mut sentence = |tag: &str| {
    allocator
        .record(vec![String::from("Ana")], vec![String::from(tag)])
        .unwrap()
};
let train: Vec<_> = (0..90).map(|_| sentence("B-Valor_dano_moral")).collect();
let test: Vec<_> = (0..10).map(|_| sentence("B-Valor_dano_moral")).collect();
let (train, test) = balance(
    Partition::new(Role::Train, train),
    Partition::new(Role::Test, test),
);
assert_eq!(train.len(), 74);
assert_eq!(test.len(), 26);
```
*/

pub mod balance;
pub mod config;
pub mod corpus;
pub mod error;
pub mod folds;
pub mod io;
pub mod pipeline;
pub mod preprocessing;
pub mod stats;
pub mod tag;

// The public api starts here
pub use balance::{balance, BalanceOutcome, BalanceReport, Balancer, PassReport, TierReport};

pub use config::{
    BalanceConfig, BalanceConfigBuilder, CountMode, PipelineConfig, PreprocessingConfig,
    RecountPolicy, Tier,
};

pub use corpus::{Partition, Record, RecordId, RecordIdAllocator, Role};

pub use error::{ConfigError, NerfoldError};

pub use stats::{DatasetStats, Scope};

pub use tag::TagFormat;
