//! Bronze → silver transformation.
//!
//! [`bronze_to_silver`] applies, in order:
//!
//! - [`filter::clean_bronze`]: drop cancelled invoices (`C…`), non-positive quantities and
//!   rows without a customer id
//! - [`map::to_sales_records`]: typed conversion, timestamp parsing, `total_amount`
//!   derivation (`quantity × unit_price`, 2 decimal places)
//! - drop rows whose `total_amount` is not positive (e.g. zero-priced adjustments)
//! - [`dedup::dedup_invoice_lines`]: keep the first line per (invoice id, product code)
//!
//! ## Example
//!
//! ```rust
//! use retail_etl::ingestion::bronze_schema;
//! use retail_etl::processing::bronze_to_silver;
//! use retail_etl::types::{DataSet, Value};
//! use rust_decimal::Decimal;
//!
//! let row = |invoice: &str, qty: i64| {
//!     vec![
//!         Value::Utf8(invoice.to_string()),
//!         Value::Utf8("85123A".to_string()),
//!         Value::Utf8("WHITE HANGING HEART T-LIGHT HOLDER".to_string()),
//!         Value::Int64(qty),
//!         Value::Utf8("12/1/2010 8:26".to_string()),
//!         Value::Decimal(Decimal::new(255, 2)),
//!         Value::Int64(17850),
//!         Value::Utf8("United Kingdom".to_string()),
//!     ]
//! };
//! let bronze = DataSet::new(bronze_schema(), vec![row("536365", 6), row("536366", -1)]);
//!
//! let silver = bronze_to_silver(&bronze).unwrap();
//! assert_eq!(silver.len(), 1);
//! assert_eq!(silver[0].total_amount, Decimal::new(1530, 2));
//! ```

pub mod dedup;
pub mod filter;
pub mod map;

use tracing::debug;

use crate::error::PipelineResult;
use crate::model::SalesRecord;
use crate::types::DataSet;

pub use dedup::dedup_invoice_lines;
pub use filter::clean_bronze;
pub use map::{parse_invoice_date, to_sales_records};

/// Clean and enrich a bronze row set into silver [`SalesRecord`]s.
pub fn bronze_to_silver(bronze: &DataSet) -> PipelineResult<Vec<SalesRecord>> {
    let cleaned = clean_bronze(bronze)?;
    debug!(
        input = bronze.row_count(),
        kept = cleaned.row_count(),
        "applied cleaning rules"
    );

    let mut records = to_sales_records(&cleaned)?;
    let before = records.len();
    records.retain(|r| r.total_amount.is_sign_positive() && !r.total_amount.is_zero());
    debug!(dropped = before - records.len(), "dropped non-positive totals");

    let before = records.len();
    let records = dedup_invoice_lines(records);
    debug!(dropped = before - records.len(), "dropped duplicate invoice lines");

    Ok(records)
}
