//! Bronze extraction.
//!
//! Most callers should use [`extract_bronze`], which reads the raw retail CSV with the
//! [`bronze_schema`] layout and the configured source encoding. The generic reader lives in
//! [`csv`].

pub mod csv;

use std::path::Path;

use tracing::{debug, info};

use crate::config::SourceEncoding;
use crate::error::PipelineResult;
use crate::types::{DataSet, DataType, Field, Schema};

pub const INVOICE_NO: &str = "InvoiceNo";
pub const STOCK_CODE: &str = "StockCode";
pub const DESCRIPTION: &str = "Description";
pub const QUANTITY: &str = "Quantity";
pub const INVOICE_DATE: &str = "InvoiceDate";
pub const UNIT_PRICE: &str = "UnitPrice";
pub const CUSTOMER_ID: &str = "CustomerID";
pub const COUNTRY: &str = "Country";

/// Column layout of the raw retail transactions file.
///
/// `InvoiceDate` stays a string here; the transformer parses it.
pub fn bronze_schema() -> Schema {
    Schema::new(vec![
        Field::new(INVOICE_NO, DataType::Utf8),
        Field::new(STOCK_CODE, DataType::Utf8),
        Field::new(DESCRIPTION, DataType::Utf8),
        Field::new(QUANTITY, DataType::Int64),
        Field::new(INVOICE_DATE, DataType::Utf8),
        Field::new(UNIT_PRICE, DataType::Decimal),
        Field::new(CUSTOMER_ID, DataType::Int64),
        Field::new(COUNTRY, DataType::Utf8),
    ])
}

/// Read the bronze CSV at `path`.
///
/// A missing or unreadable file is an [`crate::PipelineError::Csv`] wrapping the I/O error.
pub fn extract_bronze(path: impl AsRef<Path>, encoding: SourceEncoding) -> PipelineResult<DataSet> {
    let path = path.as_ref();
    debug!(path = %path.display(), exists = path.exists(), ?encoding, "resolving bronze source");
    let ds = csv::ingest_csv_from_path(path, &bronze_schema(), encoding)?;
    info!(path = %path.display(), rows = ds.row_count(), "extracted bronze data");
    Ok(ds)
}
