use nerfold::balance::counter::count;
use nerfold::{
    balance, BalanceConfig, BalanceConfigBuilder, Balancer, ConfigError, CountMode, Partition,
    Record, RecordIdAllocator, RecountPolicy, Role, TagFormat, Tier,
};

fn records(allocator: &mut RecordIdAllocator, n: usize, tags: &[&str]) -> Vec<Record> {
    (0..n)
        .map(|i| {
            let tokens = tags.iter().map(|_| format!("tok{}", i)).collect();
            let tags = tags.iter().map(|t| String::from(*t)).collect();
            allocator.record(tokens, tags).unwrap()
        })
        .collect()
}

fn train_share(train: &Partition, test: &Partition, entity: &str) -> f64 {
    let format = TagFormat::default();
    let in_train = count(train, entity, &format, CountMode::Records);
    let in_test = count(test, entity, &format, CountMode::Records);
    in_train as f64 / (in_train + in_test) as f64
}

#[test]
fn default_balance_of_both_tiers() {
    let mut allocator = RecordIdAllocator::new();
    let mut train = records(
        &mut allocator,
        90,
        &["B-Valor_dano_moral", "I-Valor_dano_moral"],
    );
    train.extend(records(&mut allocator, 5, &["B-CPF"]));
    let mut test = records(&mut allocator, 10, &["B-Valor_dano_moral", "I-Valor_dano_moral"]);
    test.extend(records(&mut allocator, 15, &["B-CPF"]));
    let negatives = records(&mut allocator, 7, &["O"]);
    train.extend(negatives);

    let (train, test) = balance(
        Partition::new(Role::Train, train),
        Partition::new(Role::Test, test),
    );
    assert_eq!(train.len() + test.len(), 127);
    assert_eq!(
        count(&test, "Valor_dano_moral", &TagFormat::default(), CountMode::Records),
        26
    );
    // 5 of 20 CPF records in train: 8 are pulled back from test.
    assert_eq!(count(&train, "CPF", &TagFormat::default(), CountMode::Records), 13);
    assert_eq!(train.iter().filter(|r| r.tags() == ["O"]).count(), 7);
    let share = train_share(&train, &test, "Valor_dano_moral");
    assert!((0.65..0.75).contains(&share));
}

#[test]
fn mentions_count_mode() {
    let mut allocator = RecordIdAllocator::new();
    // Each record carries two mentions of PER.
    let train = records(&mut allocator, 45, &["B-PER", "O", "B-PER"]);
    let test = records(&mut allocator, 5, &["B-PER", "O", "B-PER"]);
    let config = BalanceConfigBuilder::default()
        .tiers(vec![Tier::new("people", ["PER"])])
        .count_mode(CountMode::Mentions)
        .build()
        .unwrap();
    let outcome = Balancer::new(config)
        .unwrap()
        .balance_with_report(Partition::new(Role::Train, train), Partition::new(Role::Test, test));
    // 90/10 mentions: 16 occurrences are planned, one record is moved per planned occurrence.
    let tier = &outcome.report.passes[0].tiers[0];
    assert_eq!(tier.counts_train, vec![90]);
    assert_eq!(tier.plan.get("PER"), Some(16));
    assert_eq!(outcome.test.len(), 21);
}

#[test]
fn report_serializes() {
    let mut allocator = RecordIdAllocator::new();
    let train = records(&mut allocator, 9, &["B-LOC"]);
    let test = records(&mut allocator, 1, &["B-LOC"]);
    let config = BalanceConfigBuilder::default()
        .tiers(vec![Tier::new("places", ["LOC"])])
        .recount(RecountPolicy::Snapshot)
        .max_passes(3)
        .build()
        .unwrap();
    let outcome = Balancer::new(config)
        .unwrap()
        .balance_with_report(Partition::new(Role::Train, train), Partition::new(Role::Test, test));
    assert!(outcome.report.converged());
    let json = serde_json::to_value(&outcome.report).unwrap();
    assert_eq!(json["passes"][0]["tiers"][0]["tier"], "places");
    assert_eq!(
        json["passes"][0]["tiers"][0]["plan"]["transfers"][0]["entity"],
        "LOC"
    );
}

#[test]
fn config_from_json_is_validated() {
    let config: BalanceConfig = serde_json::from_str(
        r#"{"upper_limit": 0.8, "balancing_range": 0.2, "tiers": [{"name": "t", "entities": []}]}"#,
    )
    .unwrap();
    assert_eq!(
        Balancer::new(config).unwrap_err(),
        ConfigError::EmptyTier(String::from("t"))
    );
    let config: BalanceConfig = serde_json::from_str(r#"{"upper_limit": 1.5}"#).unwrap();
    assert_eq!(
        Balancer::new(config).unwrap_err(),
        ConfigError::UpperLimitOutOfRange(1.5)
    );
}
