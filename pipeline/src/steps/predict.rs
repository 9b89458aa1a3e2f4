//! Training and prediction step.

use std::fs::OpenOptions;
use std::io::BufWriter;
use std::path::PathBuf;

use ndarray::Array2;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{ResultMode, StorageConfig, TrainConfig};
use crate::error::{CsvError, ModelError, ModelResult, PipelineResult, TableResult};
use crate::model::{accuracy, LabelEncoder};
use crate::storage::{new_file_id, read_tables};
use crate::table::{format_float, Cell, Table};

/// Training accuracy and one predicted label per test row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Percentage of train rows predicted correctly, two decimals.
    pub accuracy: f64,
    pub predictions: Vec<Cell>,
}

/// Where the prediction ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictOutcome {
    /// Identifier of the written prediction file.
    File(PathBuf),
    /// Returned to the caller without touching disk.
    Scores(Prediction),
}

/// Fit the configured classifier on the train table and label the test table.
pub fn train_and_predict(
    config: &TrainConfig,
    storage: &StorageConfig,
) -> PipelineResult<PredictOutcome> {
    let (train, test) = read_tables(&config.train_file, &config.test_file)?;

    let seed = config.model.seed.unwrap_or_else(rand::random);
    info!(
        algorithm = ?config.algorithm,
        n_estimators = config.model.n_estimators,
        seed,
        "Training classifier"
    );

    let prediction = fit_and_predict(&train, &test, config, seed)?;
    info!(accuracy = prediction.accuracy, "Training accuracy");

    match config.result_mode {
        ResultMode::File => Ok(PredictOutcome::File(write_prediction(&prediction, storage)?)),
        ResultMode::Memory => Ok(PredictOutcome::Scores(prediction)),
    }
}

/// Fit on `train` and predict `test` with an explicit seed.
pub fn fit_and_predict(
    train: &Table,
    test: &Table,
    config: &TrainConfig,
    seed: u64,
) -> ModelResult<Prediction> {
    let (encoder, y) = LabelEncoder::fit(train.column(&config.label)?)?;
    let names = feature_columns(train, test, &config.label, config.features.as_deref())?;

    let x_train = feature_matrix(train, &names)?;
    let x_test = feature_matrix(test, &names)?;

    let mut model = config.algorithm.build(&config.model, seed);
    model.fit(&x_train, &y, encoder.n_classes())?;

    if let Some(importances) = model.feature_importances() {
        let ranked: Vec<(&str, f64)> = names
            .iter()
            .map(String::as_str)
            .zip(importances)
            .collect();
        debug!(importances = ?ranked, "Feature importances");
    }

    let accuracy = accuracy(&model.predict(&x_train)?, &y);
    let predictions = model
        .predict(&x_test)?
        .into_iter()
        .map(|class| encoder.decode(class))
        .collect();

    Ok(Prediction {
        accuracy,
        predictions,
    })
}

/// Resolve the feature names used for both tables.
fn feature_columns(
    train: &Table,
    test: &Table,
    label: &str,
    features: Option<&[String]>,
) -> ModelResult<Vec<String>> {
    if let Some(features) = features {
        for name in features {
            train.column(name)?;
            test.column(name)?;
        }
        return Ok(features.to_vec());
    }

    let names: Vec<String> = train
        .headers()
        .into_iter()
        .filter(|name| *name != label)
        .map(str::to_string)
        .collect();
    for name in &names {
        test.column(name)?;
    }
    if test.n_cols() != names.len() {
        return Err(ModelError::ShapeMismatch {
            expected: format!("{} test columns", names.len()),
            actual: format!("{} test columns", test.n_cols()),
        });
    }
    Ok(names)
}

/// Row-major feature matrix. Every value must be present and numeric.
fn feature_matrix(table: &Table, names: &[String]) -> ModelResult<Array2<f64>> {
    let columns = names
        .iter()
        .map(|name| table.column(name))
        .collect::<TableResult<Vec<_>>>()?;

    let mut data = Vec::with_capacity(table.n_rows() * columns.len());
    for row in 0..table.n_rows() {
        for column in &columns {
            let value = match &column.cells()[row] {
                Cell::Int(v) => *v as f64,
                Cell::Float(v) => *v,
                Cell::Missing => {
                    return Err(ModelError::MissingValue {
                        column: column.name().to_string(),
                        row,
                    })
                }
                Cell::Text(v) => {
                    return Err(ModelError::NonNumeric {
                        column: column.name().to_string(),
                        row,
                        value: v.clone(),
                    })
                }
            };
            data.push(value);
        }
    }

    Array2::from_shape_vec((table.n_rows(), columns.len()), data).map_err(|e| {
        ModelError::ShapeMismatch {
            expected: format!("{}x{} matrix", table.n_rows(), columns.len()),
            actual: e.to_string(),
        }
    })
}

/// Write the accuracy followed by one prediction per line to a fresh file.
fn write_prediction(prediction: &Prediction, storage: &StorageConfig) -> PipelineResult<PathBuf> {
    let id = new_file_id(storage);
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&id)
        .map_err(|source| CsvError::Io {
            path: id.clone(),
            source,
        })?;

    let write_error = |e: csv::Error| CsvError::Write {
        path: id.clone(),
        message: e.to_string(),
    };

    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    writer
        .write_record([format_float(prediction.accuracy)])
        .map_err(write_error)?;
    for label in &prediction.predictions {
        writer.write_record([label.render()]).map_err(write_error)?;
    }
    writer.flush()?;

    info!(
        path = %id.display(),
        predictions = prediction.predictions.len(),
        "Wrote predictions"
    );
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PruneConfig, TransformConfig};
    use crate::error::ErrorKind;
    use crate::model::{Algorithm, ModelOptions};
    use crate::steps::{prune, transform};
    use crate::table::parse_bytes;
    use crate::test_support::{write_fixtures, TEST_ROWS};
    use std::path::Path;
    use tempfile::tempdir;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    /// Run prune and transform over the fixtures, as the first two steps would.
    fn prepared(dir: &Path) -> (PathBuf, PathBuf) {
        let storage = StorageConfig::new(dir);
        let (train_file, test_file) = write_fixtures(dir);

        let pruned = prune(
            &PruneConfig {
                train_file,
                test_file,
                columns: strings(&["Cabin", "Name", "Ticket", "PassengerId"]),
            },
            &storage,
        )
        .unwrap();

        transform(
            &TransformConfig {
                train_file: pruned.0,
                test_file: pruned.1,
                fields: strings(&["Age", "Sex", "Embarked", "Fsize"]),
            },
            &storage,
        )
        .unwrap()
    }

    fn config(files: (PathBuf, PathBuf), algorithm: Algorithm) -> TrainConfig {
        TrainConfig {
            train_file: files.0,
            test_file: files.1,
            label: "Survived".to_string(),
            features: Some(strings(&["Pclass", "Sex", "Age", "Age", "Embarked", "Fsize"])),
            algorithm,
            model: ModelOptions {
                n_estimators: 10,
                seed: Some(42),
                ..ModelOptions::default()
            },
            result_mode: ResultMode::Memory,
        }
    }

    #[test]
    fn test_end_to_end_memory() {
        let dir = tempdir().unwrap();
        let config = config(prepared(dir.path()), Algorithm::DecisionTree);

        let outcome = train_and_predict(&config, &StorageConfig::new(dir.path())).unwrap();
        let PredictOutcome::Scores(prediction) = outcome else {
            panic!("expected in-memory scores");
        };

        assert!((0.0..=100.0).contains(&prediction.accuracy));
        assert_eq!(prediction.predictions.len(), TEST_ROWS);
        for label in &prediction.predictions {
            assert!(matches!(label, Cell::Int(0) | Cell::Int(1)));
        }
    }

    #[test]
    fn test_end_to_end_file() {
        let dir = tempdir().unwrap();
        let mut config = config(prepared(dir.path()), Algorithm::RandomForest);
        config.result_mode = ResultMode::File;

        let outcome = train_and_predict(&config, &StorageConfig::new(dir.path())).unwrap();
        let PredictOutcome::File(path) = outcome else {
            panic!("expected a prediction file");
        };
        assert_eq!(path.parent(), Some(dir.path()));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), TEST_ROWS + 1);

        let accuracy: f64 = lines[0].parse().unwrap();
        assert!((0.0..=100.0).contains(&accuracy));
        for line in &lines[1..] {
            assert!(*line == "0" || *line == "1", "unexpected label {line}");
        }
    }

    #[test]
    fn test_same_seed_same_predictions() {
        let dir = tempdir().unwrap();
        let config = config(prepared(dir.path()), Algorithm::RandomForest);
        let (train, test) = read_tables(&config.train_file, &config.test_file).unwrap();

        let a = fit_and_predict(&train, &test, &config, 9).unwrap();
        let b = fit_and_predict(&train, &test, &config, 9).unwrap();
        assert_eq!(a, b);
    }

    fn tables(train: &str, test: &str) -> (Table, Table) {
        (
            parse_bytes(train.as_bytes()).unwrap(),
            parse_bytes(test.as_bytes()).unwrap(),
        )
    }

    fn simple_config(features: Option<&[&str]>) -> TrainConfig {
        TrainConfig {
            train_file: PathBuf::new(),
            test_file: PathBuf::new(),
            label: "y".to_string(),
            features: features.map(strings),
            algorithm: Algorithm::DecisionTree,
            model: ModelOptions::default(),
            result_mode: ResultMode::Memory,
        }
    }

    #[test]
    fn test_all_columns_as_features() {
        let (train, test) = tables(
            "a,b,y\n1,0,no\n2,0,no\n8,1,yes\n9,1,yes\n",
            "a,b\n1,0\n9,1\n",
        );
        let prediction = fit_and_predict(&train, &test, &simple_config(None), 0).unwrap();

        assert_eq!(prediction.accuracy, 100.0);
        assert_eq!(
            prediction.predictions,
            vec![Cell::Text("no".into()), Cell::Text("yes".into())]
        );
    }

    #[test]
    fn test_missing_label() {
        let (train, test) = tables("a,b\n1,0\n", "a,b\n1,0\n");
        let err = fit_and_predict(&train, &test, &simple_config(None), 0).unwrap_err();
        assert!(matches!(err, ModelError::Table(_)));
        assert_eq!(err.kind(), ErrorKind::ColumnNotFound);
    }

    #[test]
    fn test_feature_missing_from_test() {
        let (train, test) = tables("a,b,y\n1,0,1\n2,1,0\n", "a\n1\n");
        let err = fit_and_predict(&train, &test, &simple_config(Some(&["a", "b"])), 0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ColumnNotFound);
        assert!(err.to_string().contains('b'));
    }

    #[test]
    fn test_extra_test_column() {
        let (train, test) = tables("a,y\n1,1\n2,0\n", "a,c\n1,5\n");
        let err = fit_and_predict(&train, &test, &simple_config(None), 0).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { .. }));
        assert_eq!(err.kind(), ErrorKind::Value);
    }

    #[test]
    fn test_missing_feature_value() {
        let (train, test) = tables("a,y\n1,1\n2,0\n", "a,b\n,1\n");
        let err = fit_and_predict(&train, &test, &simple_config(Some(&["a"])), 0).unwrap_err();
        assert!(matches!(err, ModelError::MissingValue { row: 0, .. }));
        assert_eq!(err.kind(), ErrorKind::Value);
    }

    #[test]
    fn test_header_only_test_table() {
        let (train, test) = tables("a,y\n1,1\n2,0\n", "a\n");
        let prediction = fit_and_predict(&train, &test, &simple_config(None), 0).unwrap();
        assert!(prediction.predictions.is_empty());
    }

    #[test]
    fn test_text_feature() {
        let (train, test) = tables("a,y\nx,1\nz,0\n", "a\nx\n");
        let err = fit_and_predict(&train, &test, &simple_config(None), 0).unwrap_err();
        assert!(matches!(err, ModelError::NonNumeric { ref value, .. } if value == "x"));
    }

    #[test]
    fn test_empty_training_set() {
        let (train, test) = tables("a,y\n", "a\n1\n");
        let err = fit_and_predict(&train, &test, &simple_config(None), 0).unwrap_err();
        assert!(matches!(err, ModelError::EmptyTrainingSet));
    }
}
