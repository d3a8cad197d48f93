//! Bronze cleaning rules.

use crate::error::{PipelineError, PipelineResult};
use crate::ingestion::{CUSTOMER_ID, INVOICE_NO, QUANTITY};
use crate::types::{DataSet, Schema, Value};

/// Invoice numbers starting with this marker are cancellations.
pub const CANCELLED_INVOICE_PREFIX: char = 'C';

/// Drop cancelled invoices, returns (non-positive quantity) and rows without a customer.
///
/// This is a convenience wrapper around [`DataSet::filter_rows`].
pub fn clean_bronze(dataset: &DataSet) -> PipelineResult<DataSet> {
    let invoice_idx = column(&dataset.schema, INVOICE_NO)?;
    let quantity_idx = column(&dataset.schema, QUANTITY)?;
    let customer_idx = column(&dataset.schema, CUSTOMER_ID)?;

    Ok(dataset.filter_rows(|row| {
        !is_cancelled(&row[invoice_idx]) && is_positive(&row[quantity_idx]) && !row[customer_idx].is_null()
    }))
}

fn is_cancelled(invoice: &Value) -> bool {
    invoice
        .as_str()
        .is_some_and(|s| s.starts_with(CANCELLED_INVOICE_PREFIX))
}

fn is_positive(quantity: &Value) -> bool {
    matches!(quantity, Value::Int64(v) if *v > 0)
}

pub(crate) fn column(schema: &Schema, name: &str) -> PipelineResult<usize> {
    schema.index_of(name).ok_or_else(|| PipelineError::SchemaMismatch {
        message: format!("missing required column '{name}'"),
    })
}
