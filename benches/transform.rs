/// Benchmarks for the bronze → silver transform.
///
/// Run with: cargo bench --bench transform
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use retail_etl::ingestion::bronze_schema;
use retail_etl::processing::bronze_to_silver;
use retail_etl::types::{DataSet, Value};
use rust_decimal::Decimal;

/// `n` bronze rows: two lines per invoice, every tenth invoice cancelled and every
/// seventh line a duplicate of the previous one.
fn bronze_rows(n: usize) -> DataSet {
    let mut rows = Vec::with_capacity(n);
    for i in 0..n {
        let invoice = i / 2;
        let invoice_no = if invoice % 10 == 0 {
            format!("C{}", 536_000 + invoice)
        } else {
            format!("{}", 536_000 + invoice)
        };
        let stock = if i % 7 == 0 { i.saturating_sub(1) % 2 } else { i % 2 };
        rows.push(vec![
            Value::Utf8(invoice_no),
            Value::Utf8(format!("2{stock:04}")),
            Value::Utf8("WHITE HANGING HEART T-LIGHT HOLDER".to_string()),
            Value::Int64(6),
            Value::Utf8("12/1/2010 8:26".to_string()),
            Value::Decimal(Decimal::new(255, 2)),
            Value::Int64(17_850 + (invoice % 500) as i64),
            Value::Utf8("United Kingdom".to_string()),
        ]);
    }
    DataSet::new(bronze_schema(), rows)
}

fn bench_bronze_to_silver(c: &mut Criterion) {
    let mut group = c.benchmark_group("bronze_to_silver");
    for size in [1_000usize, 10_000, 100_000] {
        let bronze = bronze_rows(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &bronze, |b, ds| {
            b.iter(|| bronze_to_silver(black_box(ds)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_bronze_to_silver);
criterion_main!(benches);
