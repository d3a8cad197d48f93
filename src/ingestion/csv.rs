//! CSV extraction for the bronze source.

use std::io::Read;
use std::path::Path;

use rust_decimal::Decimal;

use crate::config::SourceEncoding;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, DataType, Schema, Value};

/// Read a CSV file into an in-memory [`DataSet`].
///
/// Rules:
///
/// - CSV must have headers.
/// - Headers must contain all schema fields (order can differ, extra columns are ignored).
/// - Bytes are decoded with `encoding` before parsing.
/// - Each value is parsed according to the schema field type; empty cells become
///   [`Value::Null`].
pub fn ingest_csv_from_path(
    path: impl AsRef<Path>,
    schema: &Schema,
    encoding: SourceEncoding,
) -> PipelineResult<DataSet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    ingest_csv_from_reader(&mut rdr, schema, encoding)
}

/// Read CSV data from an existing CSV reader.
pub fn ingest_csv_from_reader<R: Read>(
    rdr: &mut csv::Reader<R>,
    schema: &Schema,
    encoding: SourceEncoding,
) -> PipelineResult<DataSet> {
    let headers: Vec<String> = rdr
        .byte_headers()?
        .iter()
        .map(|h| decode(h, encoding).map(|s| s.trim().trim_start_matches('\u{feff}').to_string()))
        .collect::<PipelineResult<_>>()?;

    // Map schema fields -> CSV column indexes (allows re-ordered CSV columns).
    let mut col_idxs = Vec::with_capacity(schema.fields.len());
    for field in &schema.fields {
        match headers.iter().position(|h| *h == field.name) {
            Some(idx) => col_idxs.push(idx),
            None => {
                return Err(PipelineError::SchemaMismatch {
                    message: format!(
                        "missing required column '{field}'. headers={headers:?}",
                        field = field.name
                    ),
                });
            }
        }
    }

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (row_idx0, result) in rdr.byte_records().enumerate() {
        // Report 1-based row number for users; +1 again because header is row 1.
        let user_row = row_idx0 + 2;
        let record = result?;

        let mut row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for (field, &csv_idx) in schema.fields.iter().zip(col_idxs.iter()) {
            let raw = decode(record.get(csv_idx).unwrap_or(b""), encoding)?;
            row.push(parse_typed_value(user_row, &field.name, &field.data_type, &raw)?);
        }
        rows.push(row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

fn decode(bytes: &[u8], encoding: SourceEncoding) -> PipelineResult<String> {
    match encoding {
        SourceEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        SourceEncoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| PipelineError::SchemaMismatch {
            message: format!("input is not valid utf-8: {e}"),
        }),
    }
}

pub(crate) fn parse_typed_value(
    row: usize,
    column: &str,
    data_type: &DataType,
    raw: &str,
) -> PipelineResult<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    let parse_error = |message: String| PipelineError::ParseError {
        row,
        column: column.to_owned(),
        raw: raw.to_owned(),
        message,
    };

    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(trimmed.to_owned())),
        DataType::Int64 => parse_integer(trimmed).map(Value::Int64).map_err(parse_error),
        DataType::Decimal => trimmed
            .parse::<Decimal>()
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map(Value::Decimal)
            .map_err(|e| parse_error(e.to_string())),
    }
}

/// Integers may arrive float-formatted (`17850.0`) when the exporting tool widened a column
/// with missing values; those are accepted as long as there is no fractional part.
fn parse_integer(s: &str) -> Result<i64, String> {
    if let Ok(v) = s.parse::<i64>() {
        return Ok(v);
    }
    let d: Decimal = s.parse().map_err(|_| format!("expected integer, got '{s}'"))?;
    if d.fract().is_zero() {
        i64::try_from(d).map_err(|e| e.to_string())
    } else {
        Err(format!("expected integer, got fractional '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_decodes_high_bytes() {
        assert_eq!(decode(b"caf\xe9", SourceEncoding::Latin1).unwrap(), "café");
    }

    #[test]
    fn utf8_rejects_invalid_bytes() {
        assert!(decode(b"caf\xe9", SourceEncoding::Utf8).is_err());
        assert_eq!(decode("café".as_bytes(), SourceEncoding::Utf8).unwrap(), "café");
    }

    #[test]
    fn float_formatted_integers_are_accepted() {
        assert_eq!(parse_integer("17850.0"), Ok(17850));
        assert_eq!(parse_integer("-3"), Ok(-3));
        assert!(parse_integer("1.5").is_err());
        assert!(parse_integer("abc").is_err());
    }

    #[test]
    fn empty_cells_are_null() {
        let v = parse_typed_value(2, "CustomerID", &DataType::Int64, "  ").unwrap();
        assert_eq!(v, Value::Null);
    }

    #[test]
    fn decimals_are_exact() {
        let v = parse_typed_value(2, "UnitPrice", &DataType::Decimal, "2.55").unwrap();
        assert_eq!(v, Value::Decimal(Decimal::new(255, 2)));
    }
}
