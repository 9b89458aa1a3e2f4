//! The three pipeline steps and their shared result envelope.
//!
//! ```text
//! ┌──────────┐  ids  ┌───────────┐  ids  ┌───────────────────┐
//! │  prune   │──────▶│ transform │──────▶│ train_and_predict │──▶ accuracy +
//! │ columns  │       │  fields   │       │                   │    predictions
//! └──────────┘       └───────────┘       └───────────────────┘
//! ```
//!
//! Every step reads its inputs from disk and writes fresh files, so steps
//! only ever share file identifiers.

pub mod fields;
pub mod predict;
pub mod prune;

use serde::Serialize;
use std::path::PathBuf;

use crate::config::ListEncoding;
use crate::error::PipelineResult;
use crate::table::Cell;

pub use fields::{transform, transform_tables, Field};
pub use predict::{fit_and_predict, train_and_predict, PredictOutcome, Prediction};
pub use prune::{prune, prune_tables};

/// What a step prints: a mapping with the single key `output`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutput {
    pub output: OutputValue,
}

/// The value under `output`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputValue {
    /// One identifier, or identifiers joined with commas.
    Text(String),
    /// Identifiers as a sequence.
    Files(Vec<String>),
    /// Accuracy and predictions returned in memory.
    Scores {
        accuracy: f64,
        predictions: Vec<Cell>,
    },
}

impl StepOutput {
    /// Envelope for the train/test pair written by prune and transform. The
    /// shape follows the list encoding the caller speaks.
    pub fn files(ids: &(PathBuf, PathBuf), encoding: ListEncoding) -> Self {
        let names = vec![
            ids.0.display().to_string(),
            ids.1.display().to_string(),
        ];
        let output = match encoding {
            ListEncoding::Delimited => OutputValue::Text(names.join(",")),
            ListEncoding::Indexed => OutputValue::Files(names),
        };
        Self { output }
    }

    pub fn prediction(outcome: PredictOutcome) -> Self {
        let output = match outcome {
            PredictOutcome::File(path) => OutputValue::Text(path.display().to_string()),
            PredictOutcome::Scores(p) => OutputValue::Scores {
                accuracy: p.accuracy,
                predictions: p.predictions,
            },
        };
        Self { output }
    }

    pub fn to_yaml(&self) -> PipelineResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
