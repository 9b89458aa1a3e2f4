//! # Titanic Steps - three-step survival prediction pipeline
//!
//! Each step reads the CSV files named by its configuration, writes fresh
//! files under the storage root and reports their identifiers, so the steps
//! can run as separate processes chained by a workflow engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ train/test  │────▶│    Prune    │────▶│  Transform  │────▶│ Train and   │
//! │    CSV      │     │  (columns)  │     │  (fields)   │     │  predict    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use titanic_steps::{prune, ListEncoding, ProcessEnv, PruneConfig, StorageConfig};
//!
//! let env = ProcessEnv;
//! let config = PruneConfig::from_env(&env, ListEncoding::from_env(&env)?)?;
//! let (train_id, test_id) = prune(&config, &StorageConfig::from_env(&env))?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`table`] - In-memory tables and CSV reading/writing
//! - [`storage`] - Reading inputs and writing uniquely named outputs
//! - [`config`] - Environment-driven step configuration
//! - [`model`] - Decision tree and random forest classifiers
//! - [`steps`] - The three pipeline steps

// Core modules
pub mod error;
pub mod table;

// I/O and configuration
pub mod config;
pub mod storage;

// Classifiers
pub mod model;

// Pipeline
pub mod steps;

#[cfg(test)]
mod test_support;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, CsvError, ErrorKind, ModelError, PipelineError, PipelineResult, TableError,
    TransformError,
};

// =============================================================================
// Re-exports - Tables
// =============================================================================

pub use table::{decode_content, read_csv, write_csv, Cell, Column, Table};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{
    EnvSource, ListEncoding, ProcessEnv, PruneConfig, ResultMode, StorageConfig, TrainConfig,
    TransformConfig,
};

// =============================================================================
// Re-exports - Classifiers
// =============================================================================

pub use model::{Algorithm, Classifier, DecisionTree, MaxFeatures, ModelOptions, RandomForest};

// =============================================================================
// Re-exports - Steps
// =============================================================================

pub use steps::{
    prune, train_and_predict, transform, Field, OutputValue, PredictOutcome, Prediction,
    StepOutput,
};
