use retail_etl::config::SourceEncoding;
use retail_etl::ingestion::csv::ingest_csv_from_reader;
use retail_etl::ingestion::{bronze_schema, extract_bronze};
use retail_etl::types::Value;
use retail_etl::PipelineError;
use rust_decimal::Decimal;

mod common;
use common::SAMPLE_CSV;

#[test]
fn extract_reads_every_bronze_row() {
    let ds = extract_bronze(SAMPLE_CSV, SourceEncoding::Latin1).unwrap();

    assert_eq!(ds.row_count(), 12);
    assert_eq!(
        ds.rows[0],
        vec![
            Value::Utf8("536365".to_string()),
            Value::Utf8("85123A".to_string()),
            Value::Utf8("WHITE HANGING HEART T-LIGHT HOLDER".to_string()),
            Value::Int64(6),
            Value::Utf8("12/1/2010 8:26".to_string()),
            Value::Decimal(Decimal::new(255, 2)),
            Value::Int64(17850),
            Value::Utf8("United Kingdom".to_string()),
        ]
    );
}

#[test]
fn extract_decodes_latin1_descriptions() {
    let ds = extract_bronze(SAMPLE_CSV, SourceEncoding::Latin1).unwrap();
    let desc = ds.schema.index_of("Description").unwrap();
    assert_eq!(ds.rows[10][desc], Value::Utf8("CAFÉ GLASS STAR".to_string()));
}

#[test]
fn extract_rejects_latin1_bytes_as_utf8() {
    let err = extract_bronze(SAMPLE_CSV, SourceEncoding::Utf8).unwrap_err();
    assert!(err.to_string().contains("not valid utf-8"));
}

#[test]
fn extract_keeps_missing_customer_as_null() {
    let ds = extract_bronze(SAMPLE_CSV, SourceEncoding::Latin1).unwrap();
    let customer = ds.schema.index_of("CustomerID").unwrap();
    assert_eq!(ds.rows[6][customer], Value::Null);
    // float-formatted id
    assert_eq!(ds.rows[7][customer], Value::Int64(12583));
}

#[test]
fn extract_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = extract_bronze(dir.path().join("nope.csv"), SourceEncoding::Latin1).unwrap_err();
    assert!(matches!(err, PipelineError::Csv(_)));
}

#[test]
fn extract_allows_reordered_columns() {
    let input = "Country,CustomerID,UnitPrice,InvoiceDate,Quantity,Description,StockCode,InvoiceNo\n\
                 France,12583,3.75,12/1/2010 8:45,24,ALARM CLOCK BAKELIKE PINK,22728,536370\n";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    let ds = ingest_csv_from_reader(&mut rdr, &bronze_schema(), SourceEncoding::Utf8).unwrap();
    assert_eq!(ds.rows[0][0], Value::Utf8("536370".to_string()));
    assert_eq!(ds.rows[0][7], Value::Utf8("France".to_string()));
}

#[test]
fn extract_errors_on_missing_required_column() {
    let input = "InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID\n";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    let err = ingest_csv_from_reader(&mut rdr, &bronze_schema(), SourceEncoding::Utf8).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("schema mismatch"));
    assert!(msg.contains("missing required column 'Country'"));
}

#[test]
fn extract_errors_on_unparseable_quantity() {
    let input = "InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country\n\
                 536365,85123A,HOLDER,six,12/1/2010 8:26,2.55,17850,United Kingdom\n";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    match ingest_csv_from_reader(&mut rdr, &bronze_schema(), SourceEncoding::Utf8) {
        Err(PipelineError::ParseError { row, column, raw, .. }) => {
            assert_eq!(row, 2);
            assert_eq!(column, "Quantity");
            assert_eq!(raw, "six");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}
