//! Typed conversion of cleaned bronze rows into [`SalesRecord`]s.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::error::{PipelineError, PipelineResult};
use crate::ingestion::{COUNTRY, CUSTOMER_ID, DESCRIPTION, INVOICE_DATE, INVOICE_NO, QUANTITY, STOCK_CODE, UNIT_PRICE};
use crate::model::{SalesRecord, total_amount};
use crate::types::{DataSet, Value};

use super::filter::column;

/// Accepted `InvoiceDate` layouts, tried in order.
const INVOICE_DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Convert every row of `dataset` into a [`SalesRecord`], deriving `total_amount`.
///
/// Missing descriptions and countries become empty strings; a missing invoice number, stock
/// code, quantity, unit price or date is a parse error.
pub fn to_sales_records(dataset: &DataSet) -> PipelineResult<Vec<SalesRecord>> {
    let idx = Columns {
        invoice: column(&dataset.schema, INVOICE_NO)?,
        stock: column(&dataset.schema, STOCK_CODE)?,
        description: column(&dataset.schema, DESCRIPTION)?,
        quantity: column(&dataset.schema, QUANTITY)?,
        date: column(&dataset.schema, INVOICE_DATE)?,
        price: column(&dataset.schema, UNIT_PRICE)?,
        customer: column(&dataset.schema, CUSTOMER_ID)?,
        country: column(&dataset.schema, COUNTRY)?,
    };

    dataset
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| to_record(i + 1, row, &idx))
        .collect()
}

struct Columns {
    invoice: usize,
    stock: usize,
    description: usize,
    quantity: usize,
    date: usize,
    price: usize,
    customer: usize,
    country: usize,
}

fn to_record(row_num: usize, row: &[Value], idx: &Columns) -> PipelineResult<SalesRecord> {
    let invoice_no = text(required(row, row_num, idx.invoice, INVOICE_NO)?);
    let stock_code = text(required(row, row_num, idx.stock, STOCK_CODE)?);
    let quantity = required(row, row_num, idx.quantity, QUANTITY)?.as_i64().unwrap_or_default();
    let unit_price: Decimal = required(row, row_num, idx.price, UNIT_PRICE)?.as_decimal().unwrap_or_default();
    let raw_date = text(required(row, row_num, idx.date, INVOICE_DATE)?);
    let invoice_date = parse_invoice_date(&raw_date).ok_or_else(|| PipelineError::ParseError {
        row: row_num,
        column: INVOICE_DATE.to_string(),
        raw: raw_date.clone(),
        message: "unrecognised timestamp".to_string(),
    })?;
    let total = total_amount(quantity, unit_price).ok_or_else(|| PipelineError::ParseError {
        row: row_num,
        column: "total_amount".to_string(),
        raw: format!("{quantity} x {unit_price}"),
        message: "amount overflows decimal range".to_string(),
    })?;

    Ok(SalesRecord {
        invoice_no,
        invoice_date,
        customer_id: row[idx.customer].as_i64(),
        stock_code,
        description: text(&row[idx.description]),
        quantity,
        unit_price,
        country: text(&row[idx.country]),
        total_amount: total,
    })
}

fn required<'a>(row: &'a [Value], row_num: usize, col: usize, name: &str) -> PipelineResult<&'a Value> {
    let v = &row[col];
    if v.is_null() {
        return Err(PipelineError::ParseError {
            row: row_num,
            column: name.to_string(),
            raw: String::new(),
            message: "required value is missing".to_string(),
        });
    }
    Ok(v)
}

fn text(v: &Value) -> String {
    match v {
        Value::Utf8(s) => s.clone(),
        Value::Int64(n) => n.to_string(),
        Value::Decimal(d) => d.to_string(),
        Value::Null => String::new(),
    }
}

/// Parse an invoice timestamp in any of the accepted layouts.
pub fn parse_invoice_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    INVOICE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}
