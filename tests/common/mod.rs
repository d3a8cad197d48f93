#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use retail_etl::config::PipelineConfig;
use retail_etl::model::{SalesRecord, total_amount};
use rust_decimal::Decimal;

pub const SAMPLE_CSV: &str = "tests/fixtures/online_retail_sample.csv";

/// A silver row dated 2010-12-01 08:26 in the United Kingdom.
pub fn record(invoice: &str, stock: &str, customer: Option<i64>, qty: i64, price: &str) -> SalesRecord {
    let unit_price: Decimal = price.parse().unwrap();
    SalesRecord {
        invoice_no: invoice.to_string(),
        invoice_date: NaiveDate::from_ymd_opt(2010, 12, 1)
            .unwrap()
            .and_hms_opt(8, 26, 0)
            .unwrap(),
        customer_id: customer,
        stock_code: stock.to_string(),
        description: format!("item {stock}"),
        quantity: qty,
        unit_price,
        country: "United Kingdom".to_string(),
        total_amount: total_amount(qty, unit_price).unwrap(),
    }
}

/// A config rooted at `dir` whose bronze source is a copy of the sample fixture.
pub fn sample_config(dir: &Path) -> PipelineConfig {
    let config = PipelineConfig::in_dir(dir);
    std::fs::copy(SAMPLE_CSV, &config.bronze_path).unwrap();
    config
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
