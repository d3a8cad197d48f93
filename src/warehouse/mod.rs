//! Gold warehouse: a single-file SQLite database with `dim_customer`, `dim_product` and
//! `fact_sales`.
//!
//! - [`Warehouse`]: an open connection plus the catalog and read helpers the loader and
//!   reporter need. Dropping it releases the connection; [`Warehouse::close`] does the same
//!   and surfaces close errors.
//! - [`loader::GoldLoader`]: first-run vs incremental load, dedup, dimension upserts and the
//!   one-time index pass.
//! - [`schema`]: DDL, default indexes and typed index outcomes.

pub mod loader;
pub mod schema;

use std::collections::HashSet;
use std::path::Path;

use rusqlite::types::{ToSqlOutput, Value as SqlValue};
use rusqlite::{Connection, OpenFlags, ToSql, params};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use crate::config::ensure_parent_dir;
use crate::error::PipelineResult;
use crate::model::InvoiceLine;

pub use loader::{GoldLoader, LoadMode, LoadResult};
pub use schema::{IndexOutcome, IndexPass, IndexReport, IndexSource};

/// An open warehouse connection.
#[derive(Debug)]
pub struct Warehouse {
    conn: Connection,
}

impl Warehouse {
    /// Open (or create) the warehouse file at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        ensure_parent_dir(path)?;
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened warehouse");
        Ok(Self { conn })
    }

    /// Open an existing warehouse without write access.
    pub fn open_read_only(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!(path = %path.display(), "opened warehouse read-only");
        Ok(Self { conn })
    }

    /// A private in-memory warehouse, gone once this value is dropped.
    pub fn open_in_memory() -> PipelineResult<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Close the connection, reporting any error SQLite returns on close.
    pub fn close(self) -> PipelineResult<()> {
        self.conn.close().map_err(|(_, e)| e)?;
        Ok(())
    }

    pub fn table_exists(&self, name: &str) -> PipelineResult<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            params![name],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Distinct invoice ids already present in `fact_sales`.
    pub fn existing_invoice_ids(&self) -> PipelineResult<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT DISTINCT InvoiceNo FROM fact_sales")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    /// Distinct (invoice id, product code) pairs already present in `fact_sales`.
    pub fn existing_invoice_lines(&self) -> PipelineResult<HashSet<InvoiceLine>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT InvoiceNo, StockCode FROM fact_sales")?;
        let lines = stmt
            .query_map([], |row| {
                Ok(InvoiceLine {
                    invoice_no: row.get(0)?,
                    stock_code: row.get(1)?,
                })
            })?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(lines)
    }

    pub fn row_count(&self, table: &str) -> PipelineResult<i64> {
        // Table names cannot be bound as parameters.
        let sql = format!("SELECT COUNT(*) FROM \"{}\"", table.replace('"', "\"\""));
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    /// Names of user-created indexes on `fact_sales`, sorted.
    pub fn fact_index_names(&self) -> PipelineResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'index' AND tbl_name = 'fact_sales' AND sql IS NOT NULL
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

/// Binds a [`Decimal`] as a SQLite `REAL`.
pub(crate) struct Real(pub Decimal);

impl ToSql for Real {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0
            .to_f64()
            .map(|v| ToSqlOutput::Owned(SqlValue::Real(v)))
            .ok_or_else(|| rusqlite::Error::ToSqlConversionFailure(format!("decimal {} has no f64 form", self.0).into()))
    }
}
