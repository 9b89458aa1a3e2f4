//! Dataset I/O shared by the steps.
//!
//! Inputs are read from the paths the caller hands in. Outputs always go to
//! freshly named files under the storage root, so one step never overwrites
//! another step's output.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::CsvResult;
use crate::table::{read_csv, write_csv, Table};

/// Read the train and test tables.
pub fn read_tables(train_path: &Path, test_path: &Path) -> CsvResult<(Table, Table)> {
    let train = read_csv(train_path)?;
    debug!(
        path = %train_path.display(),
        rows = train.n_rows(),
        columns = train.n_cols(),
        "Read train table"
    );

    let test = read_csv(test_path)?;
    debug!(
        path = %test_path.display(),
        rows = test.n_rows(),
        columns = test.n_cols(),
        "Read test table"
    );

    Ok((train, test))
}

/// A new, unused file name under the storage root.
pub fn new_file_id(storage: &StorageConfig) -> PathBuf {
    storage.root().join(format!("{}.csv", Uuid::new_v4()))
}

/// Write both tables to fresh files and return their identifiers.
pub fn write_tables(
    train: &Table,
    test: &Table,
    storage: &StorageConfig,
) -> CsvResult<(PathBuf, PathBuf)> {
    let train_id = new_file_id(storage);
    write_csv(train, &train_id)?;

    let test_id = new_file_id(storage);
    write_csv(test, &test_id)?;

    info!(
        train = %train_id.display(),
        test = %test_id.display(),
        "Wrote tables"
    );
    Ok((train_id, test_id))
}
