//! Tabular (XLSX) snapshot codec.
//!
//! Layout: one worksheet per collection, named after the collection key and
//! truncated to 31 characters. Row 1 is the header (the union of field names
//! in first-seen order), each following row is one record. Nested arrays and
//! objects are written as compact JSON text. A record with nothing to show
//! gets a filler cell in the first column past the header, so every record
//! keeps its row. Text longer than Excel's cell limit is truncated.
//!
//! Decoding is lossy: every cell comes back as text, number, boolean or null.
//! No attempt is made to recover dates, ids or nested values from text.

use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx};
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use serde_json::{Map, Number, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::snapshot::{Record, Snapshot};

/// Excel's sheet name limit.
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Characters Excel refuses in a sheet name.
const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Excel's per-cell text limit, in characters.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Written into an unnamed column for records that leave every named cell
/// blank.
const ROW_FILLER: &str = "-";

/// Largest magnitude an f64 holds without losing integer precision.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Encode a snapshot as an XLSX workbook.
pub fn encode(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();

    for (key, rows) in snapshot.collections() {
        let name = sheet_name(key);
        if name.is_empty() {
            return Err(Error::Encode(format!(
                "collection key '{}' cannot be used as a sheet name",
                key
            )));
        }

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&name).map_err(|e| sheet_error(key, e))?;
        write_sheet(worksheet, key, rows).map_err(|e| sheet_error(key, e))?;
        debug!(collection = %key, sheet = %name, rows = rows.len(), "Wrote sheet");
    }

    workbook
        .save_to_buffer()
        .map_err(|e| Error::Encode(format!("failed to write workbook: {}", e)))
}

/// Decode an XLSX workbook into a snapshot.
pub fn decode(bytes: &[u8]) -> Result<Snapshot> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| Error::MalformedInput(format!("invalid XLSX workbook: {}", e)))?;

    let mut snapshot = Snapshot::new();
    for sheet in workbook.sheet_names() {
        let key = collection_key(&sheet);
        if key.is_empty() {
            warn!(sheet = %sheet, "Skipping sheet with empty name");
            continue;
        }

        let range = workbook.worksheet_range(&sheet).map_err(|e| {
            Error::MalformedInput(format!("cannot read sheet '{}': {}", sheet, e))
        })?;

        if snapshot.contains(&key) {
            warn!(sheet = %sheet, collection = %key, "Sheet replaces an earlier sheet with the same collection key");
        }
        let records = read_sheet(&range);
        debug!(sheet = %sheet, collection = %key, rows = records.len(), "Read sheet");
        snapshot.insert(key, records);
    }

    Ok(snapshot)
}

/// Sheet name for a collection key: invalid characters replaced, then
/// truncated to the Excel limit.
pub fn sheet_name(key: &str) -> String {
    key.chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_SHEET_NAME_LEN)
        .collect::<String>()
        .trim_matches('\'')
        .to_string()
}

/// Collection key for a sheet name: lowercased, all whitespace removed.
pub fn collection_key(sheet: &str) -> String {
    sheet
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn sheet_error(key: &str, e: XlsxError) -> Error {
    Error::Encode(format!("sheet for '{}': {}", key, e))
}

/// Union of field names across rows, first-seen order.
fn header(rows: &[Value]) -> Vec<&str> {
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        if let Value::Object(fields) = row {
            for name in fields.keys() {
                if !columns.contains(&name.as_str()) {
                    columns.push(name);
                }
            }
        }
    }
    columns
}

fn write_sheet(
    worksheet: &mut Worksheet,
    key: &str,
    rows: &[Value],
) -> std::result::Result<(), XlsxError> {
    let columns = header(rows);
    for (col, name) in columns.iter().enumerate() {
        worksheet.write_string(0, col as u16, *name)?;
    }
    // First column without a header cell.
    let filler_col = columns.len() as u16;

    for (index, row) in rows.iter().enumerate() {
        let row_index = index as u32 + 1;
        let mut written = false;
        if let Value::Object(fields) = row {
            for (col, name) in columns.iter().enumerate() {
                if let Some(value) = fields.get(*name) {
                    let cell = CellRef {
                        collection: key,
                        row: index + 1,
                        column: name,
                    };
                    written |= write_cell(worksheet, row_index, col as u16, value, &cell)?;
                }
            }
        }
        // Keeps the row inside the used range; decode ignores unnamed columns.
        if !written {
            worksheet.write_string(row_index, filler_col, ROW_FILLER)?;
        }
    }
    Ok(())
}

/// Where a cell sits, for log messages.
struct CellRef<'a> {
    collection: &'a str,
    row: usize,
    column: &'a str,
}

/// Write one cell. Returns whether anything landed in the sheet.
fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
    cell: &CellRef<'_>,
) -> std::result::Result<bool, XlsxError> {
    match value {
        Value::Null => return Ok(false),
        Value::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        Value::Number(n) => match n.as_f64() {
            Some(f) => {
                worksheet.write_number(row, col, f)?;
            }
            None => {
                worksheet.write_string(row, col, n.to_string())?;
            }
        },
        Value::String(s) => return write_text(worksheet, row, col, s, cell),
        Value::Array(_) | Value::Object(_) => {
            return write_text(worksheet, row, col, &value.to_string(), cell);
        }
    }
    Ok(true)
}

fn write_text(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    text: &str,
    cell: &CellRef<'_>,
) -> std::result::Result<bool, XlsxError> {
    // Empty strings never reach the file.
    if text.is_empty() {
        return Ok(false);
    }
    let length = text.chars().count();
    if length > MAX_CELL_CHARS {
        warn!(
            collection = %cell.collection,
            row = cell.row,
            column = %cell.column,
            length,
            "Truncating cell to {} characters",
            MAX_CELL_CHARS
        );
        let truncated: String = text.chars().take(MAX_CELL_CHARS).collect();
        worksheet.write_string(row, col, truncated)?;
    } else {
        worksheet.write_string(row, col, text)?;
    }
    Ok(true)
}

/// Records in a sheet. Row 1 is always the header; every later row up to the
/// end of the used range is a record, except rows with no content at all.
fn read_sheet(range: &Range<Data>) -> Vec<Record> {
    let (Some(start), Some(end)) = (range.start(), range.end()) else {
        return Vec::new();
    };

    // (column index, field name) for every header cell with visible text
    let columns: Vec<(u32, String)> = (start.1..=end.1)
        .filter_map(|col| {
            let name = range.get_value((0, col)).map(cell_text).unwrap_or_default();
            (!name.trim().is_empty()).then_some((col, name))
        })
        .collect();

    (start.0.max(1)..=end.0)
        .filter(|&row| (start.1..=end.1).any(|col| !is_empty(range.get_value((row, col)))))
        .map(|row| {
            columns
                .iter()
                .map(|(col, name)| {
                    let value = range.get_value((row, *col)).map(cell_value).unwrap_or(Value::Null);
                    (name.clone(), value)
                })
                .collect::<Map<String, Value>>()
        })
        .collect()
}

fn is_empty(cell: Option<&Data>) -> bool {
    matches!(cell, None | Some(Data::Empty))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => float_value(*f),
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::DateTime(dt) => float_value(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(e) => Value::String(e.to_string()),
    }
}

fn float_value(f: f64) -> Value {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < MAX_EXACT_INTEGER {
        Value::from(f as i64)
    } else {
        Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}
