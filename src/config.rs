/*
 * This modules contains the configuration of the balancer and of the whole pipeline. Most
 * importantly, it contains the `BalanceConfig` struct, which implements the default trait and can
 * be customized through the `BalanceConfigBuilder`. The `PipelineConfig` is read from a JSON
 * settings file; every field of every section has a default.
*/
use crate::error::ConfigError;
use crate::tag::TagFormat;
use either::Either as LeftOrRight;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

/// Entity types of the first tier, balanced before any other.
pub const REDATOR: [&str; 4] = [
    "Valor_dano_moral",
    "Data_do_contrato",
    "CNPJ_do_réu",
    "CPF_do_réu",
];

/// Entity types of the second tier.
pub const AUXILIAR: [&str; 11] = [
    "Valor_danos_materiais/restituição_em_dobro",
    "Valor_da_causa",
    "Valor_da_multa_–_Tutela_provisória",
    "Valores",
    "Data_da_petição",
    "Data_dos_fatos",
    "Datas",
    "CNPJ_do_autor",
    "CNPJ",
    "CPF_do_autor",
    "CPF",
];

pub const DEFAULT_UPPER_LIMIT: f64 = 0.75;
pub const DEFAULT_BALANCING_RANGE: f64 = 0.10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A priority group of entity types. The types of a tier are processed in their declared order.
pub struct Tier {
    pub name: String,
    pub entities: Vec<String>,
}

impl Tier {
    pub fn new<S, I, E>(name: S, entities: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = E>,
        E: Into<String>,
    {
        Self {
            name: name.into(),
            entities: entities.into_iter().map(Into::into).collect(),
        }
    }
}

/// The `redator` tier followed by the `auxiliar` tier.
pub fn default_tiers() -> Vec<Tier> {
    vec![Tier::new("redator", REDATOR), Tier::new("auxiliar", AUXILIAR)]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Where do the counts of a tier come from?
pub enum RecountPolicy {
    /// Each tier counts the partitions as left by the previous tier.
    #[default]
    AfterEachTier,
    /// Every tier of a pass is planned from the counts taken before the pass started. The
    /// migrations are still applied one after the other.
    Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// What is an occurrence of an entity type?
pub enum CountMode {
    /// A record containing the type at least once counts as one occurrence.
    #[default]
    Records,
    /// Every span-starting tag of the type counts as one occurrence.
    Mentions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsingPolicyError(String);

impl Display for ParsingPolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Could not parse '{}' into a balancing option", self.0)
    }
}

impl std::error::Error for ParsingPolicyError {}

impl FromStr for RecountPolicy {
    type Err = ParsingPolicyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_ref() {
            "after-each-tier" | "aftereachtier" | "recount" => Ok(Self::AfterEachTier),
            "snapshot" => Ok(Self::Snapshot),
            _ => Err(ParsingPolicyError(String::from(s))),
        }
    }
}

impl FromStr for CountMode {
    type Err = ParsingPolicyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_ref() {
            "records" | "record" => Ok(Self::Records),
            "mentions" | "mention" => Ok(Self::Mentions),
            _ => Err(ParsingPolicyError(String::from(s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Configuration of the balancer. Use the `BalanceConfigBuilder` to build a validated
/// configuration.
pub struct BalanceConfig {
    /// Maximum share of the occurrences of an entity type the train partition may hold.
    upper_limit: f64,
    /// Width of the target band. The lower limit is `upper_limit - balancing_range`.
    balancing_range: f64,
    /// Ordered tiers of entity types.
    tiers: Vec<Tier>,
    recount: RecountPolicy,
    count_mode: CountMode,
    /// Number of orchestration passes. A value above 1 re-runs the tiers until no transfer is
    /// planned or the passes are exhausted.
    max_passes: usize,
    format: TagFormat,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            upper_limit: DEFAULT_UPPER_LIMIT,
            balancing_range: DEFAULT_BALANCING_RANGE,
            tiers: default_tiers(),
            recount: RecountPolicy::default(),
            count_mode: CountMode::default(),
            max_passes: 1,
            format: TagFormat::default(),
        }
    }
}

impl BalanceConfig {
    pub fn upper_limit(&self) -> f64 {
        self.upper_limit
    }
    pub fn balancing_range(&self) -> f64 {
        self.balancing_range
    }
    pub fn lower_limit(&self) -> f64 {
        self.upper_limit - self.balancing_range
    }
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }
    pub fn recount(&self) -> RecountPolicy {
        self.recount
    }
    pub fn count_mode(&self) -> CountMode {
        self.count_mode
    }
    pub fn max_passes(&self) -> usize {
        self.max_passes
    }
    pub fn format(&self) -> &TagFormat {
        &self.format
    }

    /// Checks the limits, the number of passes and the tiers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_limits(self.upper_limit, self.balancing_range)?;
        if self.max_passes == 0 {
            return Err(ConfigError::ZeroPasses);
        }
        if let Some(tier) = self.tiers.iter().find(|t| t.entities.is_empty()) {
            return Err(ConfigError::EmptyTier(tier.name.clone()));
        }
        Ok(())
    }
}

/// The band `[upper_limit - balancing_range, upper_limit)` must be non-empty and contained in
/// `(0, 1]`.
pub fn validate_limits(upper_limit: f64, balancing_range: f64) -> Result<(), ConfigError> {
    if !(upper_limit > 0.0 && upper_limit <= 1.0) {
        return Err(ConfigError::UpperLimitOutOfRange(upper_limit));
    }
    if !(balancing_range > 0.0 && balancing_range < upper_limit) {
        return Err(ConfigError::BalancingRangeOutOfRange {
            balancing_range,
            upper_limit,
        });
    }
    Ok(())
}

/// A ratio strictly between 0 and 1.
pub(crate) fn validate_ratio(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::RatioOutOfRange { name, value })
    }
}

impl Display for BalanceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tiers: Vec<&str> = self.tiers.iter().map(|t| t.name.as_str()).collect();
        write!(f, "Upper limit: {}\n Balancing range: {}\n Tiers: {:?}\n Recount policy: {:?}\n Count mode: {:?}\n Maximum passes: {}", self.upper_limit, self.balancing_range, tiers, self.recount, self.count_mode, self.max_passes)
    }
}

/// This builder can be used to build and customize a `BalanceConfig` structure.
pub struct BalanceConfigBuilder {
    upper_limit: f64,
    balancing_range: f64,
    tiers: LeftOrRight<Vec<Tier>, fn() -> Vec<Tier>>,
    recount: RecountPolicy,
    count_mode: CountMode,
    max_passes: usize,
    format: TagFormat,
}

impl Default for BalanceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceConfigBuilder {
    pub fn new() -> Self {
        Self {
            upper_limit: DEFAULT_UPPER_LIMIT,
            balancing_range: DEFAULT_BALANCING_RANGE,
            tiers: LeftOrRight::Right(default_tiers),
            recount: RecountPolicy::default(),
            count_mode: CountMode::default(),
            max_passes: 1,
            format: TagFormat::default(),
        }
    }
    pub fn upper_limit(mut self, upper_limit: f64) -> Self {
        self.upper_limit = upper_limit;
        self
    }
    pub fn balancing_range(mut self, balancing_range: f64) -> Self {
        self.balancing_range = balancing_range;
        self
    }
    /// Replaces the default tiers.
    pub fn tiers(mut self, tiers: Vec<Tier>) -> Self {
        self.tiers = LeftOrRight::Left(tiers);
        self
    }
    pub fn recount(mut self, recount: RecountPolicy) -> Self {
        self.recount = recount;
        self
    }
    pub fn count_mode(mut self, count_mode: CountMode) -> Self {
        self.count_mode = count_mode;
        self
    }
    pub fn max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }
    pub fn format(mut self, format: TagFormat) -> Self {
        self.format = format;
        self
    }
    pub fn build(self) -> Result<BalanceConfig, ConfigError> {
        let config = BalanceConfig {
            upper_limit: self.upper_limit,
            balancing_range: self.balancing_range,
            tiers: self.tiers.either(|tiers| tiers, |default| default()),
            recount: self.recount,
            count_mode: self.count_mode,
            max_passes: self.max_passes,
            format: self.format,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Transformations applied to the whole corpus before it is split.
pub struct PreprocessingConfig {
    /// Entity types replaced by `O`.
    pub fill_o_tags: Vec<String>,
    /// Entity types renamed to `aggregation_target`.
    pub datas_aggregation: Vec<String>,
    pub aggregation_target: String,
    /// Records carrying this entity type are removed.
    pub remove_sentences_with: Option<String>,
    /// Entity types whose share of all entity tags is below this ratio are replaced by `O`.
    pub minimum_entity_ratio: Option<f64>,
    pub max_length_sentence: usize,
    pub undersampling_negative_sentences: bool,
    pub ratio_of_undersample_negative_sentences: f64,
    pub undersampling_tags: Vec<String>,
    pub ratio_of_undersample_tags: f64,
    /// Balance each fold once it is split.
    pub balance_folds: bool,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            fill_o_tags: Vec::new(),
            datas_aggregation: Vec::new(),
            aggregation_target: String::from("Datas"),
            remove_sentences_with: None,
            minimum_entity_ratio: None,
            max_length_sentence: 256,
            undersampling_negative_sentences: false,
            ratio_of_undersample_negative_sentences: 0.8,
            undersampling_tags: Vec::new(),
            ratio_of_undersample_tags: 0.5,
            balance_folds: true,
        }
    }
}

impl PreprocessingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_length_sentence == 0 {
            return Err(ConfigError::ZeroMaxLength);
        }
        if let Some(ratio) = self.minimum_entity_ratio {
            validate_ratio("minimum_entity_ratio", ratio)?;
        }
        if self.undersampling_negative_sentences {
            validate_ratio(
                "ratio_of_undersample_negative_sentences",
                self.ratio_of_undersample_negative_sentences,
            )?;
        }
        if !self.undersampling_tags.is_empty() {
            validate_ratio("ratio_of_undersample_tags", self.ratio_of_undersample_tags)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub folder: PathBuf,
    pub filename: String,
    /// Field separator of the CoNLL file.
    pub separator: char,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("."),
            filename: String::from("dataset.conll"),
            separator: ' ',
        }
    }
}

impl DatasetConfig {
    pub fn path(&self) -> PathBuf {
        self.folder.join(&self.filename)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KFoldConfig {
    pub n_fold: usize,
}

impl Default for KFoldConfig {
    fn default() -> Self {
        Self { n_fold: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    pub save_folder: PathBuf,
    pub save_into_conll: bool,
    pub save_into_json: bool,
    pub save_only_first_fold: bool,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            save_folder: PathBuf::from("output_folder"),
            save_into_conll: true,
            save_into_json: true,
            save_only_first_fold: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilsConfig {
    /// Seed of the random generator shared by every sampling step.
    pub random_state: u64,
}

impl Default for UtilsConfig {
    fn default() -> Self {
        Self { random_state: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
/// Settings of a whole pipeline run, usually read from a JSON file.
pub struct PipelineConfig {
    pub dataset: DatasetConfig,
    pub kfold: KFoldConfig,
    pub save: SaveConfig,
    pub preprocessing: PreprocessingConfig,
    pub balance: BalanceConfig,
    pub utils: UtilsConfig,
}

impl PipelineConfig {
    /// Parses the settings from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kfold.n_fold < 2 {
            return Err(ConfigError::InvalidFoldCount {
                n_splits: self.kfold.n_fold,
                n_samples: 0,
            });
        }
        self.preprocessing.validate()?;
        self.balance.validate()
    }
}
