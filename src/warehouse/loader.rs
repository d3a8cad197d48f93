//! Incremental gold load.
//!
//! Each call to [`GoldLoader::load`] probes the warehouse catalog for `fact_sales`:
//!
//! - **absent** (first run): all three tables are dropped/recreated, every row is loaded and
//!   the single index pass runs after the fact write.
//! - **present** (incremental run): rows whose dedup key is already in `fact_sales` are
//!   skipped according to the [`DedupPolicy`]; if nothing is left the call returns with zero
//!   rows written and no index pass.
//!
//! Dimension rows are upserted on their natural key, so `dim_customer` and `dim_product`
//! hold every customer/product ever loaded with the latest attributes. Dimension upserts,
//! the fact write and the first-run index pass share one transaction: if it never commits,
//! `fact_sales` does not exist and the next load is a first run again, indexes included.
//! Individual index statements may still fail without aborting the load.

use std::fmt;
use std::path::PathBuf;

use rusqlite::{Connection, Transaction, params};
use tracing::{info, warn};

use crate::config::{DedupPolicy, PipelineConfig};
use crate::error::PipelineResult;
use crate::model::{CustomerDim, ProductDim, SalesRecord, TIMESTAMP_FORMAT, customer_dimension, product_dimension};

use super::schema::{
    self, CREATE_DIM_CUSTOMER, CREATE_DIM_PRODUCT, CREATE_FACT_SALES, IndexPass, apply_index_statements,
    resolve_index_statements,
};
use super::{Real, Warehouse};

/// Whether the run initialised the warehouse or appended to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// No `fact_sales` existed: tables were (re)created from scratch.
    Initialize,
    /// `fact_sales` existed: new rows were appended.
    Incremental,
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialize => f.write_str("initialize"),
            Self::Incremental => f.write_str("incremental"),
        }
    }
}

/// Counts and outcomes of one load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    pub mode: LoadMode,
    pub rows_received: usize,
    /// Rows skipped because their dedup key was already loaded.
    pub rows_skipped: usize,
    pub fact_rows_written: usize,
    pub customers_upserted: usize,
    pub products_upserted: usize,
    /// Present only on the first run.
    pub index_pass: Option<IndexPass>,
}

impl LoadResult {
    /// `true` when an incremental run found nothing new.
    pub fn is_noop(&self) -> bool {
        self.mode == LoadMode::Incremental && self.fact_rows_written == 0
    }
}

/// Loads silver rows into the gold warehouse.
#[derive(Debug, Clone)]
pub struct GoldLoader {
    warehouse_path: PathBuf,
    schema_script: Option<PathBuf>,
    dedup_policy: DedupPolicy,
}

impl GoldLoader {
    pub fn new(warehouse_path: impl Into<PathBuf>) -> Self {
        Self {
            warehouse_path: warehouse_path.into(),
            schema_script: None,
            dedup_policy: DedupPolicy::default(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            warehouse_path: config.warehouse_path.clone(),
            schema_script: config.schema_script.clone(),
            dedup_policy: config.dedup_policy,
        }
    }

    /// Apply a DDL script instead of the default indexes on first run.
    pub fn with_schema_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_script = Some(path.into());
        self
    }

    pub fn with_dedup_policy(mut self, policy: DedupPolicy) -> Self {
        self.dedup_policy = policy;
        self
    }

    pub fn dedup_policy(&self) -> DedupPolicy {
        self.dedup_policy
    }

    /// Open the configured warehouse, load `rows`, and close the connection on every path.
    pub fn load(&self, rows: &[SalesRecord]) -> PipelineResult<LoadResult> {
        let mut warehouse = Warehouse::open(&self.warehouse_path)?;
        let result = self.load_into(&mut warehouse, rows);
        let closed = warehouse.close();
        let result = result?;
        closed?;
        Ok(result)
    }

    /// Load `rows` into an already open warehouse.
    pub fn load_into(&self, warehouse: &mut Warehouse, rows: &[SalesRecord]) -> PipelineResult<LoadResult> {
        let first_run = !warehouse.table_exists(schema::FACT_SALES)?;

        let (mode, pending): (LoadMode, Vec<&SalesRecord>) = if first_run {
            info!("first run: creating warehouse tables");
            (LoadMode::Initialize, rows.iter().collect())
        } else {
            info!(policy = ?self.dedup_policy, "incremental run: checking for new data");
            (LoadMode::Incremental, self.new_rows(warehouse, rows)?)
        };

        let rows_skipped = rows.len() - pending.len();
        if mode == LoadMode::Incremental && pending.is_empty() {
            info!(rows_received = rows.len(), "no new data to load");
            return Ok(LoadResult {
                mode,
                rows_received: rows.len(),
                rows_skipped,
                fact_rows_written: 0,
                customers_upserted: 0,
                products_upserted: 0,
                index_pass: None,
            });
        }
        if mode == LoadMode::Incremental {
            info!(new_rows = pending.len(), skipped = rows_skipped, "loading new rows");
        }

        let customers = customer_dimension(pending.iter().copied());
        let products = product_dimension(pending.iter().copied());

        let tx = warehouse.connection_mut().transaction()?;
        if first_run {
            recreate_tables(&tx)?;
        }
        upsert_customers(&tx, &customers)?;
        upsert_products(&tx, &products)?;
        let written = insert_facts(&tx, &pending)?;
        let index_pass = if first_run {
            Some(self.create_indexes(&tx))
        } else {
            None
        };
        tx.commit()?;

        info!(
            %mode,
            fact_rows = written,
            customers = customers.len(),
            products = products.len(),
            "gold layer loaded"
        );

        Ok(LoadResult {
            mode,
            rows_received: rows.len(),
            rows_skipped,
            fact_rows_written: written,
            customers_upserted: customers.len(),
            products_upserted: products.len(),
            index_pass,
        })
    }

    fn new_rows<'a>(&self, warehouse: &Warehouse, rows: &'a [SalesRecord]) -> PipelineResult<Vec<&'a SalesRecord>> {
        let fresh = match self.dedup_policy {
            DedupPolicy::InvoiceLevel => {
                let existing = warehouse.existing_invoice_ids()?;
                rows.iter().filter(|r| !existing.contains(&r.invoice_no)).collect()
            }
            DedupPolicy::LineLevel => {
                let existing = warehouse.existing_invoice_lines()?;
                rows.iter().filter(|r| !existing.contains(&r.line_key())).collect()
            }
        };
        Ok(fresh)
    }

    fn create_indexes(&self, conn: &Connection) -> IndexPass {
        let (source, statements) = resolve_index_statements(self.schema_script.as_deref());
        let reports = apply_index_statements(conn, &statements);
        let pass = IndexPass { source, reports };
        if pass.failed() > 0 {
            warn!(
                source = %pass.source,
                failed = pass.failed(),
                "index pass finished with failures"
            );
        } else {
            info!(
                source = %pass.source,
                created = pass.created(),
                already_existed = pass.already_existed(),
                "index pass finished"
            );
        }
        pass
    }
}

fn recreate_tables(tx: &Transaction<'_>) -> PipelineResult<()> {
    tx.execute_batch(
        "DROP TABLE IF EXISTS fact_sales;
         DROP TABLE IF EXISTS dim_customer;
         DROP TABLE IF EXISTS dim_product;",
    )?;
    tx.execute_batch(CREATE_DIM_CUSTOMER)?;
    tx.execute_batch(CREATE_DIM_PRODUCT)?;
    tx.execute_batch(CREATE_FACT_SALES)?;
    Ok(())
}

fn upsert_customers(tx: &Transaction<'_>, customers: &[CustomerDim]) -> PipelineResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO dim_customer (CustomerID, Country) VALUES (?1, ?2)
         ON CONFLICT(CustomerID) DO UPDATE SET Country = excluded.Country",
    )?;
    for c in customers {
        stmt.execute(params![c.customer_id, c.country])?;
    }
    Ok(())
}

fn upsert_products(tx: &Transaction<'_>, products: &[ProductDim]) -> PipelineResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO dim_product (StockCode, Description) VALUES (?1, ?2)
         ON CONFLICT(StockCode) DO UPDATE SET Description = excluded.Description",
    )?;
    for p in products {
        stmt.execute(params![p.stock_code, p.description])?;
    }
    Ok(())
}

fn insert_facts(tx: &Transaction<'_>, rows: &[&SalesRecord]) -> PipelineResult<usize> {
    let mut stmt = tx.prepare(
        "INSERT INTO fact_sales
            (InvoiceNo, InvoiceDate, CustomerID, StockCode, Quantity, UnitPrice, total_amount)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    let mut written = 0;
    for r in rows {
        written += stmt.execute(params![
            r.invoice_no,
            r.invoice_date.format(TIMESTAMP_FORMAT).to_string(),
            r.customer_id,
            r.stock_code,
            r.quantity,
            Real(r.unit_price),
            Real(r.total_amount),
        ])?;
    }
    Ok(written)
}
