use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use medreport_model::Value;
use tracing::{debug, info};

use crate::error::IngestError;
use crate::row::SourceRow;
use crate::schema::{field_kind, is_known_column, is_null_token};

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

fn normalize_cell(raw: &str) -> &str {
    raw.trim().trim_matches('\u{feff}')
}

/// Types one cell of `column` according to the field schema.
pub fn parse_cell(row: usize, column: &str, raw: &str) -> Result<Value, IngestError> {
    let cell = normalize_cell(raw);
    if is_null_token(cell) {
        return Ok(Value::Null);
    }
    let kind = field_kind(column);
    kind.parse(cell).ok_or_else(|| IngestError::InvalidValue {
        row,
        column: column.to_string(),
        value: cell.to_string(),
        kind,
    })
}

/// Reads every data row of a registry CSV export.
pub fn read_rows(path: &Path) -> Result<Vec<SourceRow>, IngestError> {
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|source| IngestError::csv(path, source))?;
    let rows = collect_rows(reader, path)?;
    info!(path = %path.display(), rows = rows.len(), "read source rows");
    Ok(rows)
}

/// Reads rows from any CSV source, e.g. standard input.
pub fn read_rows_from_reader<R: Read>(input: R) -> Result<Vec<SourceRow>, IngestError> {
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);
    collect_rows(reader, Path::new("<input>"))
}

fn collect_rows<R: Read>(
    mut reader: csv::Reader<R>,
    origin: &Path,
) -> Result<Vec<SourceRow>, IngestError> {
    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| IngestError::csv(origin, source))?
        .iter()
        .map(normalize_header)
        .collect();
    let unknown: BTreeSet<&str> = headers
        .iter()
        .map(String::as_str)
        .filter(|column| !is_known_column(column))
        .collect();
    if !unknown.is_empty() {
        debug!(columns = ?unknown, "columns outside the field schema are kept as text");
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| IngestError::csv(origin, source))?;
        if record.iter().all(|cell| normalize_cell(cell).is_empty()) {
            continue;
        }
        let number = rows.len() + 1;
        let mut row = SourceRow::new();
        for (idx, column) in headers.iter().enumerate() {
            if column.is_empty() {
                continue;
            }
            let raw = record.get(idx).unwrap_or("");
            row.insert(column.as_str(), parse_cell(number, column, raw)?);
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Sorted `subject_id` values present in `rows`.
pub fn subject_ids(rows: &[SourceRow]) -> Vec<i64> {
    let mut ids: Vec<i64> = rows.iter().filter_map(SourceRow::subject_id).collect();
    ids.sort_unstable();
    ids
}

/// Picks the `subject`-th row, counting from 1.
pub fn select_subject(mut rows: Vec<SourceRow>, subject: usize) -> Result<SourceRow, IngestError> {
    let available = rows.len();
    if subject == 0 || subject > available {
        return Err(IngestError::SubjectNotFound { subject, available });
    }
    Ok(rows.swap_remove(subject - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_are_typed_by_column() {
        assert_eq!(
            parse_cell(1, "door_to_needle", " 14.0 ").expect("int"),
            Value::Int(14)
        );
        assert_eq!(
            parse_cell(1, "occlusion_ba", "t").expect("bool"),
            Value::Bool(true)
        );
        assert_eq!(parse_cell(1, "age", "NA").expect("null"), Value::Null);
        assert_eq!(
            parse_cell(1, "notes", "free text").expect("text"),
            Value::from("free text")
        );
    }

    #[test]
    fn invalid_cell_names_row_and_column() {
        let err = parse_cell(3, "age", "old").unwrap_err();
        assert_eq!(
            err.to_string(),
            "row 3, column age: 'old' is not a valid int"
        );
    }

    #[test]
    fn select_subject_is_one_based() {
        let rows = vec![
            SourceRow::new().with("subject_id", 7),
            SourceRow::new().with("subject_id", 3),
        ];
        let row = select_subject(rows.clone(), 2).expect("second row");
        assert_eq!(row.subject_id(), Some(3));
        assert!(matches!(
            select_subject(rows.clone(), 0),
            Err(IngestError::SubjectNotFound { subject: 0, available: 2 })
        ));
        assert!(select_subject(rows, 3).is_err());
    }
}
