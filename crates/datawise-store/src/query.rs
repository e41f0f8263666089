//! Verbatim query execution against a dataset store.
//!
//! Trusted input only: the query text is run exactly as given, with no
//! validation or sandboxing. Mutating statements run too.

use std::path::Path;

use datawise_core::error::{DatawiseError, Result};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};

/// Rows returned by one statement, in result order.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryRows {
    /// Render as a list of tuples, e.g. `[(1, 'M', 17.99), (2, 'B', None)]`.
    pub fn render(&self) -> String {
        let rows: Vec<String> = self.rows.iter().map(|row| render_row(row)).collect();
        format!("[{}]", rows.join(", "))
    }
}

/// Open `store`, run `sql`, fetch every row, close the connection.
///
/// The store must already exist; a missing file is an error rather than a
/// fresh empty database.
pub fn execute(store: &Path, sql: &str) -> Result<QueryRows> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(store, flags).map_err(|e| {
        DatawiseError::Query(format!("cannot open store {}: {e}", store.display()))
    })?;

    let result = run(&conn, sql).map_err(|e| DatawiseError::Query(e.to_string()));
    if let Err(e) = conn.close() {
        tracing::warn!(store = %store.display(), error = %e.1, "store close failed");
    }
    let rows = result?;

    tracing::debug!(store = %store.display(), rows = rows.rows.len(), "query executed");
    Ok(rows)
}

fn run(conn: &Connection, sql: &str) -> rusqlite::Result<QueryRows> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let values = (0..width)
            .map(|i| row.get::<_, Value>(i))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.push(values);
    }

    Ok(QueryRows { columns, rows })
}

fn render_row(row: &[Value]) -> String {
    match row {
        [single] => format!("({},)", render_value(single)),
        _ => {
            let cells: Vec<String> = row.iter().map(render_value).collect();
            format!("({})", cells.join(", "))
        }
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => render_real(*f),
        Value::Text(s) => render_text(s),
        Value::Blob(b) => render_blob(b),
    }
}

/// Shortest round-trip form, always with a fractional part or an exponent;
/// exponents carry a sign and at least two digits (`1e+16`, `1e-05`).
fn render_real(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let repr = format!("{f:?}");
    let Some((mantissa, exponent)) = repr.split_once('e') else {
        return repr;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(d) => ('-', d),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

fn render_text(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn render_blob(bytes: &[u8]) -> String {
    let mut out = String::from("b'");
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out.push('\'');
    out
}
