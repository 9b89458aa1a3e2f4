//! Column pruning step.

use std::path::PathBuf;

use tracing::info;

use crate::config::{PruneConfig, StorageConfig};
use crate::error::{PipelineResult, TableResult};
use crate::storage::{read_tables, write_tables};
use crate::table::Table;

/// Drop the configured columns from both tables and write the results.
pub fn prune(config: &PruneConfig, storage: &StorageConfig) -> PipelineResult<(PathBuf, PathBuf)> {
    let (mut train, mut test) = read_tables(&config.train_file, &config.test_file)?;

    prune_tables(&mut train, &mut test, &config.columns)?;
    info!(columns = ?config.columns, "Dropped columns");

    Ok(write_tables(&train, &test, storage)?)
}

/// Remove every named column from both tables. Nothing is removed from
/// either table unless every name exists in both.
pub fn prune_tables(train: &mut Table, test: &mut Table, columns: &[String]) -> TableResult<()> {
    let mut probe = test.clone();
    probe.drop_columns(columns)?;
    train.drop_columns(columns)?;
    *test = probe;
    Ok(())
}
