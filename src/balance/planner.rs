/*!
Decides how many occurrences of each entity type must move, and in which direction, for the train
share of every type to fall inside `[upper_limit - balancing_range, upper_limit)`.
*/
use crate::balance::distribution::Distribution;
use itertools::multizip;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
/// Direction of a planned transfer.
pub enum Direction {
    TrainToTest,
    TestToTrain,
    Stay,
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::TrainToTest => write!(f, "train -> test"),
            Direction::TestToTrain => write!(f, "test -> train"),
            Direction::Stay => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Signed number of occurrences of one entity type to move. Positive counts move from train to
/// test, negative counts from test to train.
pub struct PlannedTransfer {
    pub entity: String,
    pub count: i64,
}

impl PlannedTransfer {
    pub fn direction(&self) -> Direction {
        match self.count.cmp(&0) {
            Ordering::Greater => Direction::TrainToTest,
            Ordering::Less => Direction::TestToTrain,
            Ordering::Equal => Direction::Stay,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
/// Planned transfers of a tier, in the declared order of its entity types.
pub struct TransferPlan {
    transfers: Vec<PlannedTransfer>,
}

impl TransferPlan {
    /// Pairs every entity type with its count. Extra elements of the longer input are ignored.
    pub fn new<S: AsRef<str>>(entities: &[S], counts: &[i64]) -> Self {
        let transfers = entities
            .iter()
            .zip(counts)
            .map(|(entity, &count)| PlannedTransfer {
                entity: String::from(entity.as_ref()),
                count,
            })
            .collect();
        Self { transfers }
    }

    pub fn get(&self, entity: &str) -> Option<i64> {
        self.transfers
            .iter()
            .find(|t| t.entity == entity)
            .map(|t| t.count)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlannedTransfer> {
        self.transfers.iter()
    }

    pub fn counts(&self) -> Vec<i64> {
        self.transfers.iter().map(|t| t.count).collect()
    }

    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    /// No transfer is needed.
    pub fn is_balanced(&self) -> bool {
        self.transfers.iter().all(|t| t.count == 0)
    }
}

/// Simulates the transfers of a single entity type, one occurrence at a time, and returns the
/// signed number of occurrences moved.
///
/// The two loops are exclusive: the second one only runs when the first did not. After a
/// transfer toward test, the share is below `upper_limit`, even if a coarse step overshot
/// `lower_limit`.
///
/// The occurrence counts are rebuilt from the share and the weight, and the simulated share is the
/// ratio of two exact integers at every step. No rounding error accumulates and the `>=` boundary
/// is honoured: 90 of 100 occurrences stop at `c = 16`, and 358 of 364 at `c = 86`, since a share
/// of exactly `0.75` is not below the upper limit.
pub fn plan_entity(prop_train: f64, unit_weight: f64, upper_limit: f64, lower_limit: f64) -> i64 {
    // Entity type absent from both partitions: the step would be null and the loops infinite.
    if !(unit_weight > 0.0 && unit_weight.is_finite()) {
        return 0;
    }
    let total = (1.0 / unit_weight).round() as i64;
    let in_train = (prop_train * total as f64).round() as i64;
    let shifted = |c: i64| (in_train - c) as f64 / total as f64;
    let mut c: i64 = 0;
    if shifted(0) >= upper_limit {
        while shifted(c) >= upper_limit {
            c += 1;
        }
    } else {
        while shifted(c) < lower_limit {
            c -= 1;
        }
    }
    c
}

/// Plans the transfers of every entity type of the distribution, in order. The limits must have
/// been validated with `validate_limits`.
pub fn plan_counts(
    distribution: &Distribution,
    upper_limit: f64,
    balancing_range: f64,
) -> Vec<i64> {
    let lower_limit = upper_limit - balancing_range;
    multizip((
        distribution.prop_train.iter(),
        distribution.prop_test.iter(),
        distribution.unit_weight.iter(),
    ))
    .map(|(&prop_train, _prop_test, &unit_weight)| {
        plan_entity(prop_train, unit_weight, upper_limit, lower_limit)
    })
    .collect()
}

/// Plans the transfers of `entities`, whose distribution is `distribution`.
pub fn plan<S: AsRef<str>>(
    entities: &[S],
    distribution: &Distribution,
    upper_limit: f64,
    balancing_range: f64,
) -> TransferPlan {
    let counts = plan_counts(distribution, upper_limit, balancing_range);
    TransferPlan::new(entities, &counts)
}
