//! CSV codec for [`Table`].
//!
//! Reading decodes the raw bytes (UTF-8, or whatever `chardet` detects when
//! the bytes are not valid UTF-8), parses them with the `csv` crate and infers
//! one type per column. Writing always produces UTF-8 with a header row and
//! minimal quoting.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};

use super::{Cell, Column, Table};
use crate::error::{CsvError, CsvResult};

/// Field spellings read as missing values.
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// NA markers plus any other spelling `f64` parses as NaN (`NAN`, `Nan`).
fn is_na(value: &str) -> bool {
    NA_VALUES.contains(&value) || value.trim().parse::<f64>().map_or(false, f64::is_nan)
}

// =============================================================================
// Encoding
// =============================================================================

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode file content. Valid UTF-8 is taken as is; anything else goes
/// through encoding detection, with Windows-1252 as the last resort since it
/// maps every byte.
pub fn decode_content(bytes: &[u8]) -> String {
    let content = match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let encoding = detect_encoding(bytes);
            let decoder = match encoding.as_str() {
                "iso-8859-1" => encoding_rs::ISO_8859_15,
                other => encoding_rs::Encoding::for_label(other.as_bytes())
                    .filter(|e| *e != encoding_rs::UTF_8)
                    .unwrap_or(encoding_rs::WINDOWS_1252),
            };
            let (decoded, _, had_errors) = decoder.decode(bytes);
            if had_errors {
                encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
            } else {
                decoded.into_owned()
            }
        }
    };

    content.trim_start_matches('\u{feff}').to_string()
}

// =============================================================================
// Reading
// =============================================================================

/// Read a CSV file from disk into a table.
pub fn read_csv<P: AsRef<Path>>(path: P) -> CsvResult<Table> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| CsvError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_bytes(&bytes)
}

/// Parse CSV bytes into a table.
pub fn parse_bytes(bytes: &[u8]) -> CsvResult<Table> {
    let content = decode_content(bytes);
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers = dedup_headers(
        reader
            .headers()
            .map_err(parse_error)?
            .iter()
            .map(str::to_string)
            .collect(),
    );

    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(parse_error)?;
        for (i, field) in record.iter().enumerate() {
            raw[i].push(field.to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(name, values)| infer_column(name, values))
        .collect();

    Table::new(columns).map_err(|e| CsvError::Parse {
        line: 1,
        message: e.to_string(),
    })
}

fn parse_error(err: csv::Error) -> CsvError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    let message = match err.kind() {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => format!("expected {} fields, found {}", expected_len, len),
        _ => err.to_string(),
    };
    CsvError::Parse { line, message }
}

/// Repeated header names get a `.N` suffix (`Age`, `Age.1`, ...).
fn dedup_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(headers.len());

    for header in headers {
        let mut name = header.clone();
        while let Some(count) = seen.get_mut(&name) {
            *count += 1;
            name = format!("{}.{}", header, count);
        }
        seen.insert(name.clone(), 0);
        out.push(name);
    }
    out
}

/// Pick one type for the whole column.
fn infer_column(name: String, values: Vec<String>) -> Column {
    let any_missing = values.iter().any(|v| is_na(v));
    let all_int = values
        .iter()
        .all(|v| is_na(v) || v.trim().parse::<i64>().is_ok());
    let all_float = values
        .iter()
        .all(|v| is_na(v) || v.trim().parse::<f64>().is_ok());

    let cells = values
        .into_iter()
        .map(|v| {
            if is_na(&v) {
                Cell::Missing
            } else if all_int && !any_missing {
                Cell::Int(v.trim().parse().unwrap_or_default())
            } else if all_float {
                Cell::Float(v.trim().parse().unwrap_or(f64::NAN))
            } else {
                Cell::Text(v)
            }
        })
        .collect();

    Column::new(name, cells)
}

// =============================================================================
// Writing
// =============================================================================

/// Write a table to a new file. Fails if the file already exists.
pub fn write_csv<P: AsRef<Path>>(table: &Table, path: P) -> CsvResult<()> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|source| CsvError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    write_to(table, BufWriter::new(file)).map_err(|message| CsvError::Write {
        path: path.to_path_buf(),
        message,
    })
}

/// Serialize a table to any writer.
pub fn write_to<W: Write>(table: &Table, writer: W) -> Result<(), String> {
    let mut writer = WriterBuilder::new().from_writer(writer);

    writer
        .write_record(table.headers())
        .map_err(|e| e.to_string())?;

    for row in 0..table.n_rows() {
        let record: Vec<String> = table
            .columns()
            .iter()
            .map(|c| c.cells()[row].render())
            .collect();
        writer.write_record(&record).map_err(|e| e.to_string())?;
    }

    writer.flush().map_err(|e| e.to_string())
}
