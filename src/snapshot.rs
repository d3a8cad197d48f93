//! Silver snapshot: a Parquet file holding the cleaned rows.
//!
//! The snapshot is written after transformation for inspection and reprocessing. The loader
//! never reads it; [`read_silver_snapshot`] exists so a run can be replayed from the snapshot
//! without re-reading the bronze source.
//!
//! Decimals are stored as `DOUBLE` and timestamps as `YYYY-MM-DD HH:MM:SS` strings.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDateTime;
use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::file::properties::WriterProperties;
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::file::writer::SerializedFileWriter;
use parquet::record::Field;
use parquet::schema::parser::parse_message_type;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use tracing::info;

use crate::config::ensure_parent_dir;
use crate::error::{PipelineError, PipelineResult};
use crate::model::{SalesRecord, TIMESTAMP_FORMAT};

const SILVER_MESSAGE_TYPE: &str = r#"
message silver_sales {
  REQUIRED BINARY InvoiceNo (UTF8);
  REQUIRED BINARY StockCode (UTF8);
  REQUIRED BINARY Description (UTF8);
  REQUIRED INT64 Quantity;
  REQUIRED BINARY InvoiceDate (UTF8);
  REQUIRED DOUBLE UnitPrice;
  OPTIONAL INT64 CustomerID;
  REQUIRED BINARY Country (UTF8);
  REQUIRED DOUBLE total_amount;
}
"#;

enum ColumnData {
    Text(Vec<ByteArray>),
    Int(Vec<i64>),
    /// Non-null values plus one definition level per row.
    OptionalInt(Vec<i64>, Vec<i16>),
    Double(Vec<f64>),
}

/// Write `rows` to a Parquet file at `path`, replacing any existing file.
pub fn write_silver_snapshot(path: impl AsRef<Path>, rows: &[SalesRecord]) -> PipelineResult<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;

    let schema = Arc::new(parse_message_type(SILVER_MESSAGE_TYPE)?);
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path)?;
    let mut writer = SerializedFileWriter::new(file, schema, props)?;

    if !rows.is_empty() {
        let columns = columns_of(rows)?;
        let mut rg = writer.next_row_group()?;
        let mut data = columns.iter();
        while let Some(mut col) = rg.next_column()? {
            let Some(values) = data.next() else {
                return Err(PipelineError::snapshot("more parquet columns than snapshot fields"));
            };
            match (col.untyped(), values) {
                (ColumnWriter::ByteArrayColumnWriter(w), ColumnData::Text(v)) => {
                    w.write_batch(v, None, None)?;
                }
                (ColumnWriter::Int64ColumnWriter(w), ColumnData::Int(v)) => {
                    w.write_batch(v, None, None)?;
                }
                (ColumnWriter::Int64ColumnWriter(w), ColumnData::OptionalInt(v, def)) => {
                    w.write_batch(v, Some(def.as_slice()), None)?;
                }
                (ColumnWriter::DoubleColumnWriter(w), ColumnData::Double(v)) => {
                    w.write_batch(v, None, None)?;
                }
                _ => return Err(PipelineError::snapshot("snapshot column type mismatch")),
            }
            col.close()?;
        }
        rg.close()?;
    }
    writer.close()?;

    info!(path = %path.display(), rows = rows.len(), "wrote silver snapshot");
    Ok(())
}

fn columns_of(rows: &[SalesRecord]) -> PipelineResult<Vec<ColumnData>> {
    let text = |f: fn(&SalesRecord) -> String| ColumnData::Text(rows.iter().map(|r| ByteArray::from(f(r).as_str())).collect());
    let doubles = |f: fn(&SalesRecord) -> Decimal| -> PipelineResult<ColumnData> {
        rows.iter()
            .map(|r| {
                f(r).to_f64()
                    .ok_or_else(|| PipelineError::snapshot(format!("decimal out of range: {}", f(r))))
            })
            .collect::<PipelineResult<Vec<_>>>()
            .map(ColumnData::Double)
    };

    let customers: Vec<i64> = rows.iter().filter_map(|r| r.customer_id).collect();
    let customer_levels: Vec<i16> = rows.iter().map(|r| i16::from(r.customer_id.is_some())).collect();

    // Order must match SILVER_MESSAGE_TYPE.
    Ok(vec![
        text(|r| r.invoice_no.clone()),
        text(|r| r.stock_code.clone()),
        text(|r| r.description.clone()),
        ColumnData::Int(rows.iter().map(|r| r.quantity).collect()),
        text(|r| r.invoice_date.format(TIMESTAMP_FORMAT).to_string()),
        doubles(|r| r.unit_price)?,
        ColumnData::OptionalInt(customers, customer_levels),
        text(|r| r.country.clone()),
        doubles(|r| r.total_amount)?,
    ])
}

/// Read a snapshot written by [`write_silver_snapshot`] back into [`SalesRecord`]s.
pub fn read_silver_snapshot(path: impl AsRef<Path>) -> PipelineResult<Vec<SalesRecord>> {
    let path = path.as_ref();
    let reader = SerializedFileReader::try_from(path)?;

    let mut rows = Vec::new();
    for (idx0, row_res) in reader.into_iter().enumerate() {
        let row_num = idx0 + 1;
        let row = row_res?;

        let map: HashMap<&str, &Field> = row
            .get_column_iter()
            .map(|(name, field)| (name.as_str(), field))
            .collect();
        rows.push(record_from_fields(row_num, &map)?);
    }

    info!(path = %path.display(), rows = rows.len(), "read silver snapshot");
    Ok(rows)
}

fn field<'a>(map: &HashMap<&str, &'a Field>, row: usize, name: &str) -> PipelineResult<&'a Field> {
    map.get(name)
        .copied()
        .ok_or_else(|| PipelineError::snapshot(format!("row {row} missing column '{name}'")))
}

fn record_from_fields(row: usize, map: &HashMap<&str, &Field>) -> PipelineResult<SalesRecord> {
    let get = |name: &str| field(map, row, name);
    let string = |name: &str| -> PipelineResult<String> {
        match get(name)? {
            Field::Str(s) => Ok(s.clone()),
            other => Err(PipelineError::snapshot(format!("row {row} column '{name}': expected string, got {other}"))),
        }
    };
    let long = |name: &str| -> PipelineResult<Option<i64>> {
        match get(name)? {
            Field::Long(v) => Ok(Some(*v)),
            Field::Null => Ok(None),
            other => Err(PipelineError::snapshot(format!("row {row} column '{name}': expected integer, got {other}"))),
        }
    };
    let decimal = |name: &str| -> PipelineResult<Decimal> {
        match get(name)? {
            Field::Double(v) => Decimal::from_f64(*v)
                .ok_or_else(|| PipelineError::snapshot(format!("row {row} column '{name}': {v} is not a decimal"))),
            other => Err(PipelineError::snapshot(format!("row {row} column '{name}': expected double, got {other}"))),
        }
    };

    let raw_date = string("InvoiceDate")?;
    let invoice_date = NaiveDateTime::parse_from_str(&raw_date, TIMESTAMP_FORMAT)
        .map_err(|e| PipelineError::snapshot(format!("row {row} column 'InvoiceDate': {e}")))?;
    let quantity = long("Quantity")?
        .ok_or_else(|| PipelineError::snapshot(format!("row {row} column 'Quantity' is null")))?;

    Ok(SalesRecord {
        invoice_no: string("InvoiceNo")?,
        invoice_date,
        customer_id: long("CustomerID")?,
        stock_code: string("StockCode")?,
        description: string("Description")?,
        quantity,
        unit_price: decimal("UnitPrice")?,
        country: string("Country")?,
        total_amount: decimal("total_amount")?.round_dp(2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::record;

    #[test]
    fn snapshot_round_trips_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silver").join("cleaned.parquet");
        let mut rows = vec![
            record("536365", "85123A", Some(17850), 6, "2.55"),
            record("536366", "22633", None, 6, "1.85"),
        ];
        rows[1].description = "HAND WARMER UNION JACK".to_string();

        write_silver_snapshot(&path, &rows).unwrap();
        let back = read_silver_snapshot(&path).unwrap();

        assert_eq!(back, rows);
    }

    #[test]
    fn empty_snapshot_reads_back_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.parquet");
        write_silver_snapshot(&path, &[]).unwrap();
        assert!(read_silver_snapshot(&path).unwrap().is_empty());
    }

    #[test]
    fn missing_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_silver_snapshot(dir.path().join("nope.parquet")).is_err());
    }
}
