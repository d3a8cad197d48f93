use retail_etl::report::{
    ReportOutcome, ReportSource, UNNAMED_QUERY, default_reports, resolve_reports, run_reports,
};
use retail_etl::warehouse::{GoldLoader, Warehouse};
use retail_etl::SalesRecord;

mod common;
use common::{record, write_file};

fn loaded_warehouse(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("dwh.db");
    let mut france: SalesRecord = record("536370", "22728", Some(12583), 24, "3.75");
    france.country = "France".to_string();
    let mut january = record("536373", "21730", Some(17850), 6, "4.25");
    january.invoice_date = chrono::NaiveDate::from_ymd_opt(2011, 1, 4)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    GoldLoader::new(&path)
        .load(&[
            record("536365", "85123A", Some(17850), 6, "2.55"),
            record("536365", "71053", Some(17850), 6, "3.39"),
            france,
            january,
        ])
        .unwrap();
    path
}

#[test]
fn default_reports_aggregate_revenue() {
    let dir = tempfile::tempdir().unwrap();
    let path = loaded_warehouse(dir.path());
    let wh = Warehouse::open_read_only(&path).unwrap();

    let outcomes = run_reports(&wh, &default_reports());
    assert_eq!(outcomes.len(), 2);

    let by_country = outcomes[0].table().unwrap();
    assert_eq!(outcomes[0].name(), "Revenue by Country (Top 5)");
    assert_eq!(by_country.columns, vec!["Country", "revenue"]);
    assert_eq!(
        by_country.rows,
        vec![
            vec!["France".to_string(), "90.0".to_string()],
            vec!["United Kingdom".to_string(), "61.14".to_string()],
        ]
    );

    let monthly = outcomes[1].table().unwrap();
    assert_eq!(
        monthly.rows,
        vec![
            vec!["2010-12".to_string(), "125.64".to_string()],
            vec!["2011-01".to_string(), "25.5".to_string()],
        ]
    );
}

#[test]
fn analytics_script_queries_run_independently() {
    let dir = tempfile::tempdir().unwrap();
    let path = loaded_warehouse(dir.path());
    let script = write_file(
        dir.path(),
        "analytics.sql",
        "-- Top Products\n\
         SELECT StockCode, SUM(Quantity) AS units FROM fact_sales GROUP BY StockCode ORDER BY units DESC LIMIT 1;\n\
         -- Broken\n\
         SELECT * FROM no_such_table;\n\
         SELECT COUNT(*) AS n FROM dim_customer;\n",
    );

    let (source, queries) = resolve_reports(Some(&script));
    assert_eq!(source, ReportSource::Script(script.clone()));
    assert_eq!(
        serde_json::to_value(&source).unwrap(),
        serde_json::json!({ "script": script.display().to_string() })
    );

    let wh = Warehouse::open_read_only(&path).unwrap();
    let outcomes = run_reports(&wh, &queries);
    let names: Vec<_> = outcomes.iter().map(|o| o.name()).collect();
    assert_eq!(names, vec!["Top Products", "Broken", UNNAMED_QUERY]);

    assert_eq!(
        outcomes[0].table().unwrap().rows,
        vec![vec!["22728".to_string(), "24".to_string()]]
    );
    assert!(matches!(&outcomes[1], ReportOutcome::Failed { error, .. } if error.contains("no such table")));
    assert_eq!(outcomes[2].table().unwrap().rows, vec![vec!["2".to_string()]]);
}

#[test]
fn empty_result_renders_column_list() {
    let dir = tempfile::tempdir().unwrap();
    let path = loaded_warehouse(dir.path());
    let wh = Warehouse::open_read_only(&path).unwrap();

    let outcomes = run_reports(
        &wh,
        &[retail_etl::report::NamedQuery::new(
            "Nothing",
            "SELECT InvoiceNo, total_amount FROM fact_sales WHERE Quantity > 1000",
        )],
    );
    assert_eq!(
        outcomes[0].to_string(),
        "Nothing:\nEmpty result\nColumns: [InvoiceNo, total_amount]"
    );
}

#[test]
fn outcomes_serialise_with_status_tag() {
    let outcome = ReportOutcome::Failed {
        name: "Broken".to_string(),
        error: "no such table: x".to_string(),
    };
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "failed");
    assert_eq!(json["name"], "Broken");
}
