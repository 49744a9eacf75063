/*!
Entity balancing of a train/test split.

For every tier of entity types, in order, the balancer counts the occurrences of each type in both
partitions, converts the counts into shares, plans how many occurrences must move for the train
share to fall within `[upper_limit - balancing_range, upper_limit)` and moves whole records
accordingly. A record may carry several entity types: moving it for one type also changes the
counts of the others, and the plan of a tier is not revised after each migration. Some imbalance
can therefore remain after a single pass; `max_passes` re-runs the tiers until no transfer is
planned.
*/
pub mod counter;
pub mod distribution;
pub mod migrator;
pub mod planner;

use crate::config::{BalanceConfig, RecountPolicy, Tier};
use crate::corpus::Partition;
use crate::error::ConfigError;
use counter::count_all;
use distribution::analyze;
use migrator::{migrate, MigrationCount};
use planner::{plan, TransferPlan};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
/// What happened to one tier during one pass.
pub struct TierReport {
    pub tier: String,
    pub counts_train: Vec<usize>,
    pub counts_test: Vec<usize>,
    pub plan: TransferPlan,
    pub migrations: Vec<MigrationCount>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PassReport {
    pub tiers: Vec<TierReport>,
}

impl PassReport {
    /// No tier of the pass planned a transfer.
    pub fn is_balanced(&self) -> bool {
        self.tiers.iter().all(|t| t.plan.is_balanced())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BalanceReport {
    pub passes: Vec<PassReport>,
}

impl BalanceReport {
    /// The last pass did not plan any transfer.
    pub fn converged(&self) -> bool {
        self.passes.last().map(|p| p.is_balanced()).unwrap_or(true)
    }

    /// Total number of records moved, in both directions.
    pub fn moved(&self) -> usize {
        self.passes
            .iter()
            .flat_map(|p| p.tiers.iter())
            .flat_map(|t| t.migrations.iter())
            .map(|m| m.moved)
            .sum()
    }
}

#[derive(Debug)]
/// Balanced partitions and the report of the balancing.
pub struct BalanceOutcome {
    pub train: Partition,
    pub test: Partition,
    pub report: BalanceReport,
}

#[derive(Debug, Clone, Default)]
/// Runs the tiers of a validated `BalanceConfig` over train/test splits. The default balancer uses
/// the default configuration.
pub struct Balancer {
    config: BalanceConfig,
}

impl Balancer {
    /// Validates the configuration. An invalid configuration is rejected before any partition is
    /// handed to the balancer.
    pub fn new(config: BalanceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BalanceConfig {
        &self.config
    }

    /// Balances the two partitions. Records are only moved from one partition to the other.
    pub fn balance(&self, train: Partition, test: Partition) -> (Partition, Partition) {
        let outcome = self.balance_with_report(train, test);
        (outcome.train, outcome.test)
    }

    pub fn balance_with_report(&self, mut train: Partition, mut test: Partition) -> BalanceOutcome {
        let mut report = BalanceReport::default();
        for pass in 0..self.config.max_passes() {
            let mut snapshot_plans = match self.config.recount() {
                RecountPolicy::Snapshot => Some(
                    self.config
                        .tiers()
                        .iter()
                        .map(|tier| self.plan_tier(tier, &train, &test))
                        .collect::<Vec<_>>(),
                ),
                RecountPolicy::AfterEachTier => None,
            };
            let mut pass_report = PassReport::default();
            for (i, tier) in self.config.tiers().iter().enumerate() {
                let (counts_train, counts_test, plan) = match snapshot_plans.as_mut() {
                    Some(plans) => std::mem::take(&mut plans[i]),
                    None => self.plan_tier(tier, &train, &test),
                };
                let (balanced_train, balanced_test, migrations) = self.apply(train, test, &plan);
                train = balanced_train;
                test = balanced_test;
                info!(
                    pass,
                    tier = tier.name.as_str(),
                    moved = migrations.iter().map(|m| m.moved).sum::<usize>(),
                    train = train.len(),
                    test = test.len(),
                    "balanced tier"
                );
                pass_report.tiers.push(TierReport {
                    tier: tier.name.clone(),
                    counts_train,
                    counts_test,
                    plan,
                    migrations,
                });
            }
            let balanced = pass_report.is_balanced();
            report.passes.push(pass_report);
            if balanced {
                break;
            }
        }
        BalanceOutcome {
            train,
            test,
            report,
        }
    }

    /// Counts, analyzes and plans the entity types of a tier.
    fn plan_tier(
        &self,
        tier: &Tier,
        train: &Partition,
        test: &Partition,
    ) -> (Vec<usize>, Vec<usize>, TransferPlan) {
        let format = self.config.format();
        let mode = self.config.count_mode();
        let counts_train = count_all(train, &tier.entities, format, mode);
        let counts_test = count_all(test, &tier.entities, format, mode);
        let distribution = analyze(counts_train.view(), counts_test.view());
        let plan = plan(
            &tier.entities,
            &distribution,
            self.config.upper_limit(),
            self.config.balancing_range(),
        );
        (counts_train.to_vec(), counts_test.to_vec(), plan)
    }

    /// Applies the plan, one entity type after the other.
    fn apply(
        &self,
        mut train: Partition,
        mut test: Partition,
        plan: &TransferPlan,
    ) -> (Partition, Partition, Vec<MigrationCount>) {
        let format = self.config.format();
        let mut migrations = Vec::new();
        for transfer in plan.iter() {
            debug!(
                entity = transfer.entity.as_str(),
                count = transfer.count,
                direction = %transfer.direction(),
                "planned transfer"
            );
            match transfer.count.cmp(&0) {
                Ordering::Greater => {
                    let migration =
                        migrate(test, train, transfer.count, &transfer.entity, true, format);
                    test = migration.destination;
                    train = migration.source;
                    migrations.push(migration.count);
                }
                Ordering::Less => {
                    let migration =
                        migrate(train, test, transfer.count, &transfer.entity, true, format);
                    train = migration.destination;
                    test = migration.source;
                    migrations.push(migration.count);
                }
                Ordering::Equal => {}
            }
        }
        (train, test, migrations)
    }
}

/// Balances the partitions with the default configuration: upper limit 0.75, balancing range 0.10
/// and the `redator` then `auxiliar` tiers.
pub fn balance(train: Partition, test: Partition) -> (Partition, Partition) {
    Balancer::default().balance(train, test)
}
