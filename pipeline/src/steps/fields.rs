//! Field transformation step: impute, encode and derive Titanic fields.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::{StorageConfig, TransformConfig};
use crate::error::{PipelineResult, TransformError, TransformResult};
use crate::storage::{read_tables, write_tables};
use crate::table::{Cell, Column, Table};

const AGE: &str = "Age";
const SEX: &str = "Sex";
const EMBARKED: &str = "Embarked";
const FSIZE: &str = "Fsize";
const SIBSP: &str = "SibSp";
const PARCH: &str = "Parch";
const PCLASS: &str = "Pclass";

/// A recognized transformation. The derived order is the order they run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    /// Fill missing ages with the median of passengers in the same
    /// (SibSp, Parch, Pclass) group.
    Age,
    /// `male` → 1, anything else → 0.
    Sex,
    /// Missing → `C`, then `S`/`C`/`Q` → 0/1/2.
    Embarked,
    /// Family size `SibSp + Parch + 1`.
    Fsize,
}

impl Field {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            AGE => Some(Field::Age),
            SEX => Some(Field::Sex),
            EMBARKED => Some(Field::Embarked),
            FSIZE => Some(Field::Fsize),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::Age => AGE,
            Field::Sex => SEX,
            Field::Embarked => EMBARKED,
            Field::Fsize => FSIZE,
        }
    }

    /// Apply the transformation to one table.
    pub fn apply(self, table: &mut Table) -> TransformResult<()> {
        match self {
            Field::Age => {
                let filled = impute_age(table)?;
                debug!(filled, "Imputed missing ages");
            }
            Field::Sex => encode_sex(table)?,
            Field::Embarked => encode_embarked(table)?,
            Field::Fsize => derive_fsize(table)?,
        }
        Ok(())
    }
}

/// Recognized fields among `names`, deduplicated and in run order.
pub fn parse_fields(names: &[String]) -> BTreeSet<Field> {
    names
        .iter()
        .filter_map(|name| {
            let field = Field::from_name(name);
            if field.is_none() {
                debug!(name = %name, "Ignoring unrecognized field");
            }
            field
        })
        .collect()
}

/// Transform the train and test tables. Each table is transformed from its
/// own values only.
pub fn transform_tables(
    train: &mut Table,
    test: &mut Table,
    fields: &BTreeSet<Field>,
) -> TransformResult<()> {
    for field in fields {
        field.apply(train)?;
        field.apply(test)?;
        info!(field = field.name(), "Transformed field");
    }
    Ok(())
}

/// Read both tables, apply the configured fields and write the results.
pub fn transform(
    config: &TransformConfig,
    storage: &StorageConfig,
) -> PipelineResult<(PathBuf, PathBuf)> {
    let (mut train, mut test) = read_tables(&config.train_file, &config.test_file)?;

    let fields = parse_fields(&config.fields);
    transform_tables(&mut train, &mut test, &fields)?;

    Ok(write_tables(&train, &test, storage)?)
}

// =============================================================================
// Age
// =============================================================================

type GroupKey = [u64; 3];

/// Fill missing ages and return how many were filled. Group medians come
/// from the table's values before any row is filled.
fn impute_age(table: &mut Table) -> TransformResult<usize> {
    let ages = numeric_values(table.column(AGE)?)?;
    let missing: Vec<usize> = ages
        .iter()
        .enumerate()
        .filter(|(_, age)| age.is_none())
        .map(|(row, _)| row)
        .collect();
    if missing.is_empty() {
        return Ok(0);
    }

    let keys = group_keys(table)?;

    let mut groups: HashMap<GroupKey, Vec<f64>> = HashMap::new();
    for (age, key) in ages.iter().zip(&keys) {
        if let (Some(age), Some(key)) = (age, key) {
            groups.entry(*key).or_default().push(*age);
        }
    }
    let medians: HashMap<GroupKey, f64> = groups
        .into_iter()
        .filter_map(|(key, values)| median(values).map(|m| (key, m)))
        .collect();

    let overall = median(ages.iter().flatten().copied().collect())
        .ok_or_else(|| TransformError::NoMedian(AGE.to_string()))?;

    let mut cells = table.column(AGE)?.cells().to_vec();
    for &row in &missing {
        let value = keys[row]
            .and_then(|key| medians.get(&key).copied())
            .unwrap_or(overall);
        cells[row] = Cell::Float(value);
    }

    table.put_column(Column::new(AGE, cells).normalize_numeric())?;
    Ok(missing.len())
}

fn group_keys(table: &Table) -> TransformResult<Vec<Option<GroupKey>>> {
    let sibsp = numeric_values(table.column(SIBSP)?)?;
    let parch = numeric_values(table.column(PARCH)?)?;
    let pclass = numeric_values(table.column(PCLASS)?)?;

    Ok(sibsp
        .into_iter()
        .zip(parch)
        .zip(pclass)
        .map(|((s, p), c)| match (s, p, c) {
            (Some(s), Some(p), Some(c)) => Some([key_bits(s), key_bits(p), key_bits(c)]),
            _ => None,
        })
        .collect())
}

// -0.0 and 0.0 share a group
fn key_bits(value: f64) -> u64 {
    (value + 0.0).to_bits()
}

/// Middle value, or the mean of the two middle values for even counts.
fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

// =============================================================================
// Encodings
// =============================================================================

fn encode_sex(table: &mut Table) -> TransformResult<()> {
    let cells = table
        .column(SEX)?
        .cells()
        .iter()
        .map(|cell| Cell::Int(i64::from(cell.as_str() == Some("male"))))
        .collect();
    table.put_column(Column::new(SEX, cells))?;
    Ok(())
}

fn encode_embarked(table: &mut Table) -> TransformResult<()> {
    let cells = table
        .column(EMBARKED)?
        .cells()
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            let port = match cell {
                Cell::Missing => "C",
                Cell::Text(s) => s.as_str(),
                other => return Err(unmapped(row, other.render())),
            };
            match port {
                "S" => Ok(Cell::Int(0)),
                "C" => Ok(Cell::Int(1)),
                "Q" => Ok(Cell::Int(2)),
                other => Err(unmapped(row, other.to_string())),
            }
        })
        .collect::<TransformResult<Vec<_>>>()?;
    table.put_column(Column::new(EMBARKED, cells))?;
    Ok(())
}

fn unmapped(row: usize, value: String) -> TransformError {
    TransformError::Unmapped {
        column: EMBARKED.to_string(),
        row,
        value,
    }
}

fn derive_fsize(table: &mut Table) -> TransformResult<()> {
    let sibsp = table.column(SIBSP)?;
    let parch = table.column(PARCH)?;

    let cells = sibsp
        .cells()
        .iter()
        .zip(parch.cells())
        .enumerate()
        .map(|(row, (s, p))| {
            let s_value = numeric(SIBSP, s, row)?;
            let p_value = numeric(PARCH, p, row)?;
            Ok(match (s, p, s_value, p_value) {
                (Cell::Int(a), Cell::Int(b), _, _) => Cell::Int(a + b + 1),
                (_, _, Some(a), Some(b)) => Cell::Float(a + b + 1.0),
                _ => Cell::Missing,
            })
        })
        .collect::<TransformResult<Vec<_>>>()?;

    table.put_column(Column::new(FSIZE, cells).normalize_numeric())?;
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn numeric(column: &str, cell: &Cell, row: usize) -> TransformResult<Option<f64>> {
    match cell {
        Cell::Text(value) => Err(TransformError::NotNumeric {
            column: column.to_string(),
            row,
            value: value.clone(),
        }),
        other => Ok(other.as_f64().filter(|v| !v.is_nan())),
    }
}

fn numeric_values(column: &Column) -> TransformResult<Vec<Option<f64>>> {
    column
        .cells()
        .iter()
        .enumerate()
        .map(|(row, cell)| numeric(column.name(), cell, row))
        .collect()
}
