//! Step configuration.
//!
//! Every step takes an explicit configuration record. The records are built
//! from an [`EnvSource`], which is the process environment in the binary and
//! a plain map in tests, so library code never reads global state.
//!
//! | Variable | Step | Meaning |
//! |---|---|---|
//! | `TRAIN_FILE`, `TEST_FILE` | all | input CSV paths |
//! | `UNUSEFUL_COLUMNS` | prune | columns to drop |
//! | `FIELDS_TO_TRANSFORM` | transform | fields to impute/encode |
//! | `FIELD_TO_PREDICT` | train | label column |
//! | `FIELDS_TO_USE` | train | feature columns (optional) |
//! | `ALGORITHM` | train | `decision_tree` or forest |
//! | `N_ESTIMATORS`, `RANDOM_SEED` | train | forest size and seed (optional) |
//! | `MAX_DEPTH`, `MIN_SAMPLES_SPLIT`, `MIN_SAMPLES_LEAF` | train | tree growth limits (optional) |
//! | `MAX_FEATURES`, `BOOTSTRAP` | train | `sqrt`, `log2`, `all` or a count; forest resampling (optional) |
//! | `RESULT_MODE` | train | `file` or `memory` (optional) |
//! | `LIST_ENCODING` | all | `delimited` or `indexed` (optional) |
//! | `TESTING`, `STORAGE_ROOT` | all | where outputs are written |

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{Algorithm, MaxFeatures, ModelOptions};

/// Root directory for outputs in production.
pub const PRODUCTION_ROOT: &str = "/data";

// =============================================================================
// Environment Source
// =============================================================================

/// Where named string parameters come from.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;

    fn required(&self, key: &str) -> ConfigResult<String> {
        self.var(key)
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    fn parsed<T>(&self, key: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.var(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse().map(Some).map_err(|e: T::Err| {
                ConfigError::Invalid {
                    key: key.to_string(),
                    message: e.to_string(),
                }
            }),
        }
    }
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

// =============================================================================
// List Encoding
// =============================================================================

/// Wire format of list-valued parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListEncoding {
    /// One comma-joined value: `UNUSEFUL_COLUMNS=Cabin,Name`.
    #[default]
    Delimited,
    /// Legacy harness form: `UNUSEFUL_COLUMNS=2`, `UNUSEFUL_COLUMNS0=Cabin`,
    /// `UNUSEFUL_COLUMNS1=Name`.
    Indexed,
}

impl FromStr for ListEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "delimited" => Ok(ListEncoding::Delimited),
            "indexed" => Ok(ListEncoding::Indexed),
            other => Err(format!("unknown list encoding '{}'", other)),
        }
    }
}

impl ListEncoding {
    /// Read `LIST_ENCODING`, defaulting to [`ListEncoding::Delimited`].
    pub fn from_env(env: &impl EnvSource) -> ConfigResult<Self> {
        Ok(env.parsed("LIST_ENCODING")?.unwrap_or_default())
    }

    /// Read a required list parameter. An empty list counts as missing.
    pub fn read(&self, env: &impl EnvSource, key: &str) -> ConfigResult<Vec<String>> {
        let list = self.read_entries(env, key)?;
        if list.is_empty() {
            return Err(ConfigError::Missing(key.to_string()));
        }
        Ok(list)
    }

    /// Read an optional list parameter. Absent or empty means `None`.
    pub fn read_optional(
        &self,
        env: &impl EnvSource,
        key: &str,
    ) -> ConfigResult<Option<Vec<String>>> {
        match env.var(key) {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(_) => {
                let list = self.read_entries(env, key)?;
                Ok(Some(list).filter(|l| !l.is_empty()))
            }
        }
    }

    fn read_entries(&self, env: &impl EnvSource, key: &str) -> ConfigResult<Vec<String>> {
        match self {
            ListEncoding::Delimited => Ok(split_list(&env.required(key)?)),
            ListEncoding::Indexed => {
                let count: usize = env
                    .parsed(key)?
                    .ok_or_else(|| ConfigError::Missing(key.to_string()))?;
                (0..count)
                    .map(|i| env.required(&format!("{}{}", key, i)).map(|v| v.trim().to_string()))
                    .collect()
            }
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Storage
// =============================================================================

/// Where steps write their output files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `STORAGE_ROOT` if set, the working directory when `TESTING=1`,
    /// [`PRODUCTION_ROOT`] otherwise.
    pub fn from_env(env: &impl EnvSource) -> Self {
        if let Some(root) = env.var("STORAGE_ROOT").filter(|r| !r.is_empty()) {
            return Self::new(root);
        }
        if env.var("TESTING").as_deref() == Some("1") {
            return Self::new(PathBuf::new());
        }
        Self::new(PRODUCTION_ROOT)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PRODUCTION_ROOT)
    }
}

// =============================================================================
// Step Configuration
// =============================================================================

/// Parameters of the column pruning step.
#[derive(Debug, Clone)]
pub struct PruneConfig {
    pub train_file: PathBuf,
    pub test_file: PathBuf,
    /// Columns removed from both tables.
    pub columns: Vec<String>,
}

impl PruneConfig {
    pub fn from_env(env: &impl EnvSource, encoding: ListEncoding) -> ConfigResult<Self> {
        Ok(Self {
            train_file: env.required("TRAIN_FILE")?.into(),
            test_file: env.required("TEST_FILE")?.into(),
            columns: encoding.read(env, "UNUSEFUL_COLUMNS")?,
        })
    }
}

/// Parameters of the field transformation step.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    pub train_file: PathBuf,
    pub test_file: PathBuf,
    /// Requested field names; unrecognized names are ignored.
    pub fields: Vec<String>,
}

impl TransformConfig {
    pub fn from_env(env: &impl EnvSource, encoding: ListEncoding) -> ConfigResult<Self> {
        Ok(Self {
            train_file: env.required("TRAIN_FILE")?.into(),
            test_file: env.required("TEST_FILE")?.into(),
            fields: encoding.read(env, "FIELDS_TO_TRANSFORM")?,
        })
    }
}

/// How the training step hands back its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultMode {
    /// Write accuracy and predictions to a new file and return its name.
    #[default]
    File,
    /// Return accuracy and predictions directly.
    Memory,
}

impl FromStr for ResultMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(ResultMode::File),
            "memory" => Ok(ResultMode::Memory),
            other => Err(format!("unknown result mode '{}'", other)),
        }
    }
}

/// Parameters of the training and prediction step.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub train_file: PathBuf,
    pub test_file: PathBuf,
    /// Label column, present in the train table only.
    pub label: String,
    /// Feature columns; `None` uses every train column except the label.
    pub features: Option<Vec<String>>,
    pub algorithm: Algorithm,
    pub model: ModelOptions,
    pub result_mode: ResultMode,
}

impl TrainConfig {
    pub fn from_env(env: &impl EnvSource, encoding: ListEncoding) -> ConfigResult<Self> {
        let algorithm = Algorithm::from_name(&env.required("ALGORITHM")?);

        let mut model = ModelOptions::default();
        if let Some(n) = at_least(env, "N_ESTIMATORS", 1)? {
            model.n_estimators = n;
        }
        model.seed = env.parsed("RANDOM_SEED")?;
        model.max_depth = at_least(env, "MAX_DEPTH", 1)?;
        if let Some(n) = at_least(env, "MIN_SAMPLES_SPLIT", 2)? {
            model.min_samples_split = n;
        }
        if let Some(n) = at_least(env, "MIN_SAMPLES_LEAF", 1)? {
            model.min_samples_leaf = n;
        }
        model.max_features = env.parsed::<MaxFeatures>("MAX_FEATURES")?;
        if let Some(bootstrap) = env.parsed::<bool>("BOOTSTRAP")? {
            model.bootstrap = bootstrap;
        }

        Ok(Self {
            train_file: env.required("TRAIN_FILE")?.into(),
            test_file: env.required("TEST_FILE")?.into(),
            label: env.required("FIELD_TO_PREDICT")?,
            features: encoding.read_optional(env, "FIELDS_TO_USE")?,
            algorithm,
            model,
            result_mode: env.parsed("RESULT_MODE")?.unwrap_or_default(),
        })
    }
}

/// An optional count that must not fall below `min`.
fn at_least(env: &impl EnvSource, key: &str, min: usize) -> ConfigResult<Option<usize>> {
    match env.parsed::<usize>(key)? {
        Some(n) if n < min => Err(ConfigError::Invalid {
            key: key.to_string(),
            message: format!("must be at least {}", min),
        }),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_delimited_list() {
        let env = env(&[("UNUSEFUL_COLUMNS", "Cabin, Name,,Ticket")]);
        let list = ListEncoding::Delimited.read(&env, "UNUSEFUL_COLUMNS").unwrap();
        assert_eq!(list, vec!["Cabin", "Name", "Ticket"]);
    }

    #[test]
    fn test_indexed_list_matches_delimited() {
        let indexed = env(&[
            ("FIELDS_TO_USE", "3"),
            ("FIELDS_TO_USE0", "Pclass"),
            ("FIELDS_TO_USE1", "Sex"),
            ("FIELDS_TO_USE2", "Age"),
        ]);
        let delimited = env(&[("FIELDS_TO_USE", "Pclass,Sex,Age")]);

        let a = ListEncoding::Indexed.read(&indexed, "FIELDS_TO_USE").unwrap();
        let b = ListEncoding::Delimited.read(&delimited, "FIELDS_TO_USE").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_indexed_list_missing_entry() {
        let env = env(&[("UNUSEFUL_COLUMNS", "2"), ("UNUSEFUL_COLUMNS0", "Cabin")]);
        let err = ListEncoding::Indexed.read(&env, "UNUSEFUL_COLUMNS").unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref k) if k == "UNUSEFUL_COLUMNS1"));
    }

    #[test]
    fn test_indexed_list_bad_count() {
        // a delimited value is not silently accepted in indexed mode
        let env = env(&[("UNUSEFUL_COLUMNS", "Cabin,Name")]);
        let err = ListEncoding::Indexed.read(&env, "UNUSEFUL_COLUMNS").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_empty_required_list() {
        for raw in ["", " , ,"] {
            let vars = env(&[("UNUSEFUL_COLUMNS", raw)]);
            let err = ListEncoding::Delimited.read(&vars, "UNUSEFUL_COLUMNS").unwrap_err();
            assert!(matches!(err, ConfigError::Missing(ref k) if k == "UNUSEFUL_COLUMNS"));
        }

        let vars = env(&[("UNUSEFUL_COLUMNS", "0")]);
        let err = ListEncoding::Indexed.read(&vars, "UNUSEFUL_COLUMNS").unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));

        let vars = env(&[("FIELDS_TO_USE", ",")]);
        let list = ListEncoding::Delimited.read_optional(&vars, "FIELDS_TO_USE").unwrap();
        assert_eq!(list, None);
    }

    #[test]
    fn test_missing_required() {
        let env = env(&[("TRAIN_FILE", "train.csv")]);
        let err = PruneConfig::from_env(&env, ListEncoding::Delimited).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref k) if k == "TEST_FILE"));
    }

    #[test]
    fn test_storage_root_selection() {
        assert_eq!(StorageConfig::from_env(&env(&[])).root(), Path::new("/data"));
        assert_eq!(
            StorageConfig::from_env(&env(&[("TESTING", "1")])).root(),
            Path::new("")
        );
        assert_eq!(
            StorageConfig::from_env(&env(&[("TESTING", "1"), ("STORAGE_ROOT", "/tmp/x")])).root(),
            Path::new("/tmp/x")
        );
    }

    #[test]
    fn test_train_config() {
        let env = env(&[
            ("TRAIN_FILE", "a.csv"),
            ("TEST_FILE", "b.csv"),
            ("FIELD_TO_PREDICT", "Survived"),
            ("ALGORITHM", "decision_tree"),
            ("FIELDS_TO_USE", "Pclass,Sex"),
            ("RANDOM_SEED", "7"),
            ("RESULT_MODE", "memory"),
        ]);
        let config = TrainConfig::from_env(&env, ListEncoding::Delimited).unwrap();
        assert_eq!(config.label, "Survived");
        assert_eq!(config.algorithm, Algorithm::DecisionTree);
        assert_eq!(config.features, Some(vec!["Pclass".into(), "Sex".into()]));
        assert_eq!(config.model.seed, Some(7));
        assert_eq!(config.model.n_estimators, 100);
        assert_eq!(config.result_mode, ResultMode::Memory);
    }

    #[test]
    fn test_train_config_defaults_and_errors() {
        let mut vars = env(&[
            ("TRAIN_FILE", "a.csv"),
            ("TEST_FILE", "b.csv"),
            ("FIELD_TO_PREDICT", "Survived"),
            ("ALGORITHM", "random_forest"),
            ("FIELDS_TO_USE", ""),
        ]);
        let config = TrainConfig::from_env(&vars, ListEncoding::Delimited).unwrap();
        assert_eq!(config.algorithm, Algorithm::RandomForest);
        assert_eq!(config.features, None);
        assert_eq!(config.result_mode, ResultMode::File);

        vars.insert("N_ESTIMATORS".into(), "0".into());
        assert!(TrainConfig::from_env(&vars, ListEncoding::Delimited).is_err());

        vars.insert("N_ESTIMATORS".into(), "ten".into());
        let err = TrainConfig::from_env(&vars, ListEncoding::Delimited).unwrap_err();
        assert!(err.to_string().contains("N_ESTIMATORS"));
    }

    #[test]
    fn test_train_config_tree_options() {
        let mut vars = env(&[
            ("TRAIN_FILE", "a.csv"),
            ("TEST_FILE", "b.csv"),
            ("FIELD_TO_PREDICT", "Survived"),
            ("ALGORITHM", "random_forest"),
        ]);
        let config = TrainConfig::from_env(&vars, ListEncoding::Delimited).unwrap();
        assert_eq!(config.model, ModelOptions::default());

        vars.insert("MAX_DEPTH".into(), "4".into());
        vars.insert("MIN_SAMPLES_SPLIT".into(), "10".into());
        vars.insert("MIN_SAMPLES_LEAF".into(), "3".into());
        vars.insert("MAX_FEATURES".into(), "log2".into());
        vars.insert("BOOTSTRAP".into(), "false".into());
        let model = TrainConfig::from_env(&vars, ListEncoding::Delimited).unwrap().model;
        assert_eq!(model.max_depth, Some(4));
        assert_eq!(model.min_samples_split, 10);
        assert_eq!(model.min_samples_leaf, 3);
        assert_eq!(model.max_features, Some(MaxFeatures::Log2));
        assert!(!model.bootstrap);

        for (key, value) in [
            ("MAX_DEPTH", "0"),
            ("MIN_SAMPLES_SPLIT", "1"),
            ("MIN_SAMPLES_LEAF", "0"),
            ("MAX_FEATURES", "half"),
            ("BOOTSTRAP", "maybe"),
        ] {
            let mut bad = vars.clone();
            bad.insert(key.into(), value.into());
            let err = TrainConfig::from_env(&bad, ListEncoding::Delimited).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { key: ref k, .. } if k == key));
        }
    }
}
