use std::collections::HashSet;

use retail_etl::config::SourceEncoding;
use retail_etl::ingestion::extract_bronze;
use retail_etl::processing::bronze_to_silver;
use retail_etl::SalesRecord;
use rust_decimal::Decimal;

mod common;
use common::SAMPLE_CSV;

fn silver() -> Vec<SalesRecord> {
    let bronze = extract_bronze(SAMPLE_CSV, SourceEncoding::Latin1).unwrap();
    bronze_to_silver(&bronze).unwrap()
}

#[test]
fn transform_keeps_only_clean_rows() {
    let rows = silver();
    assert_eq!(rows.len(), 7);

    for r in &rows {
        assert!(!r.invoice_no.starts_with('C'), "cancelled invoice {}", r.invoice_no);
        assert!(r.quantity > 0);
        assert!(r.total_amount > Decimal::ZERO);
        assert!(r.customer_id.is_some());
    }
}

#[test]
fn transform_derives_total_amount() {
    let rows = silver();
    let first = rows
        .iter()
        .find(|r| r.invoice_no == "536365" && r.stock_code == "85123A")
        .unwrap();
    assert_eq!(first.quantity, 6);
    assert_eq!(first.total_amount, Decimal::new(1530, 2));
    assert_eq!(first.invoice_date.to_string(), "2010-12-01 08:26:00");
}

#[test]
fn transform_drops_negative_quantity_and_zero_price() {
    let rows = silver();
    assert!(rows.iter().all(|r| r.invoice_no != "536367"));
    assert!(rows.iter().all(|r| r.invoice_no != "536374"));
    assert!(rows.iter().all(|r| r.invoice_no != "536368"));
}

#[test]
fn transform_output_has_unique_invoice_lines() {
    let rows = silver();
    let keys: HashSet<_> = rows.iter().map(|r| r.line_key()).collect();
    assert_eq!(keys.len(), rows.len());
}

#[test]
fn transform_keeps_first_seen_order() {
    let invoices: Vec<_> = silver().into_iter().map(|r| r.invoice_no).collect();
    assert_eq!(
        invoices,
        vec!["536365", "536365", "536366", "536370", "536370", "536371", "536373"]
    );
}
