//! CSV -> SQLite loader.
//!
//! Each dataset is read fully into memory, its column names normalized, cell
//! types inferred per column, and the result written as one table inside the
//! dataset's store file. An existing table of the same name is dropped first,
//! so reloading never accumulates rows.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use datawise_core::config::{DatasetEntry, table_name_for};
use datawise_core::error::{DatawiseError, Result};
use rusqlite::Connection;
use rusqlite::types::Value;

/// Cell texts read as missing values.
const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const TRUE_MARKERS: &[&str] = &["True", "TRUE", "true"];
const FALSE_MARKERS: &[&str] = &["False", "FALSE", "false"];

/// What happened to one dataset.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded {
        table: String,
        rows: usize,
        columns: Vec<String>,
    },
    /// Source file absent; nothing was touched.
    SkippedMissing,
    /// Source unreadable or malformed. Nothing is written, so an earlier copy
    /// of the table survives.
    Failed(DatawiseError),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }
}

#[derive(Debug)]
pub struct LoadReport {
    pub source: PathBuf,
    pub store: PathBuf,
    pub outcome: LoadOutcome,
}

/// Strip surrounding whitespace and turn spaces and hyphens into underscores.
pub fn normalize_column_name(name: &str) -> String {
    name.trim().replace([' ', '-'], "_")
}

/// Load `source` into `store` as `table` (default: the source file stem).
pub fn load(source: &Path, store: &Path, table: Option<&str>) -> LoadOutcome {
    if !source.is_file() {
        tracing::warn!(source = %source.display(), "CSV not found, skipping");
        return LoadOutcome::SkippedMissing;
    }

    let table = table
        .map(str::to_string)
        .unwrap_or_else(|| table_name_for(source));

    match load_table(source, store, &table) {
        Ok((rows, columns)) => {
            tracing::info!(
                source = %source.display(),
                store = %store.display(),
                %table,
                rows,
                "dataset loaded"
            );
            LoadOutcome::Loaded {
                table,
                rows,
                columns,
            }
        }
        Err(e) => {
            tracing::error!(source = %source.display(), error = %e, "dataset load failed");
            LoadOutcome::Failed(e)
        }
    }
}

/// Load every dataset in order, one at a time. A failure in one dataset does
/// not stop the others.
pub fn load_all(datasets: &[DatasetEntry]) -> Vec<LoadReport> {
    datasets
        .iter()
        .map(|entry| LoadReport {
            source: entry.source.clone(),
            store: entry.store.clone(),
            outcome: load(&entry.source, &entry.store, Some(&entry.table_name())),
        })
        .collect()
}

/// In-memory copy of a parsed CSV file. `None` cells are missing values.
struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Boolean,
    Integer,
    Real,
    Text,
}

impl ColumnType {
    fn sql(self) -> &'static str {
        match self {
            ColumnType::Boolean | ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

fn load_table(source: &Path, store: &Path, table: &str) -> Result<(usize, Vec<String>)> {
    let frame = read_frame(source)?;
    let types = infer_types(&frame);

    if let Some(parent) = store.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut conn = Connection::open(store)?;
    write_table(&mut conn, table, &frame, &types)?;

    Ok((frame.rows.len(), frame.columns))
}

fn read_frame(source: &Path) -> Result<Frame> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(source)?;

    let raw: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    let columns: Vec<String> = dedupe_header(&raw)
        .iter()
        .map(|name| normalize_column_name(name))
        .collect();

    if columns.is_empty() {
        return Err(DatawiseError::Load(format!(
            "{}: no columns to parse",
            source.display()
        )));
    }

    let mut seen = HashSet::new();
    for name in &columns {
        if !seen.insert(name.to_lowercase()) {
            return Err(DatawiseError::Load(format!(
                "{}: duplicate column name '{name}' after normalization",
                source.display()
            )));
        }
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() > columns.len() {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            return Err(DatawiseError::Load(format!(
                "{}: line {line}: expected {} fields, saw {}",
                source.display(),
                columns.len(),
                record.len()
            )));
        }
        let mut row: Vec<Option<String>> = record
            .iter()
            .map(|cell| (!NA_MARKERS.contains(&cell)).then(|| cell.to_string()))
            .collect();
        row.resize(columns.len(), None);
        rows.push(row);
    }

    Ok(Frame { columns, rows })
}

/// Name blank header cells `Unnamed: <index>` and suffix repeats with `.1`,
/// `.2`, ... skipping any suffixed name the header already uses.
fn dedupe_header(raw: &[String]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    raw.iter()
        .enumerate()
        .map(|(idx, cell)| {
            let mut name = if cell.is_empty() {
                format!("Unnamed: {idx}")
            } else {
                cell.clone()
            };
            let mut count = counts.get(&name).copied().unwrap_or(0);
            while count > 0 {
                counts.insert(name.clone(), count + 1);
                name = format!("{name}.{count}");
                count = counts.get(&name).copied().unwrap_or(0);
            }
            counts.insert(name.clone(), count + 1);
            name
        })
        .collect()
}

/// Integer only when every cell is present and integral; a gap turns an
/// integral column into REAL, as does a column whose cells are all missing.
/// A gap-free column of `True`/`False` cells is stored as 1/0.
/// A header-only file yields TEXT columns.
fn infer_types(frame: &Frame) -> Vec<ColumnType> {
    if frame.rows.is_empty() {
        return vec![ColumnType::Text; frame.columns.len()];
    }
    (0..frame.columns.len())
        .map(|idx| {
            let mut has_missing = false;
            let mut all_bool = true;
            let mut all_int = true;
            let mut all_real = true;
            for row in &frame.rows {
                match &row[idx] {
                    None => has_missing = true,
                    Some(cell) => {
                        let cell = cell.trim();
                        if all_bool && parse_bool(cell).is_none() {
                            all_bool = false;
                        }
                        if all_int && cell.parse::<i64>().is_err() {
                            all_int = false;
                        }
                        if all_real && cell.parse::<f64>().is_err() {
                            all_real = false;
                        }
                    }
                }
                if !all_real && !all_bool {
                    break;
                }
            }
            if all_bool && !has_missing {
                return ColumnType::Boolean;
            }
            match (all_int, all_real) {
                (_, false) => ColumnType::Text,
                (true, true) if !has_missing => ColumnType::Integer,
                _ => ColumnType::Real,
            }
        })
        .collect()
}

fn cell_value(cell: &Option<String>, ty: ColumnType) -> Value {
    let Some(cell) = cell else {
        return Value::Null;
    };
    match ty {
        ColumnType::Boolean => parse_bool(cell.trim())
            .map(|b| Value::Integer(i64::from(b)))
            .unwrap_or_else(|| Value::Text(cell.clone())),
        ColumnType::Integer => cell
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .unwrap_or_else(|_| Value::Text(cell.clone())),
        ColumnType::Real => cell
            .trim()
            .parse::<f64>()
            .map(Value::Real)
            .unwrap_or_else(|_| Value::Text(cell.clone())),
        ColumnType::Text => Value::Text(cell.clone()),
    }
}

fn parse_bool(cell: &str) -> Option<bool> {
    if TRUE_MARKERS.contains(&cell) {
        Some(true)
    } else if FALSE_MARKERS.contains(&cell) {
        Some(false)
    } else {
        None
    }
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn write_table(
    conn: &mut Connection,
    table: &str,
    frame: &Frame,
    types: &[ColumnType],
) -> Result<()> {
    let table_ident = quote_ident(table);
    let column_defs: Vec<String> = frame
        .columns
        .iter()
        .zip(types)
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.sql()))
        .collect();
    let placeholders = vec!["?"; frame.columns.len()].join(", ");

    let tx = conn.transaction()?;
    tx.execute(&format!("DROP TABLE IF EXISTS {table_ident}"), [])?;
    tx.execute(
        &format!("CREATE TABLE {table_ident} ({})", column_defs.join(", ")),
        [],
    )?;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {table_ident} VALUES ({placeholders})"
        ))?;
        for row in &frame.rows {
            let values = row.iter().zip(types).map(|(cell, ty)| cell_value(cell, *ty));
            stmt.execute(rusqlite::params_from_iter(values))?;
        }
    }
    tx.commit()?;
    Ok(())
}
