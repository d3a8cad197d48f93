//! `retail-etl` is a batch pipeline for retail transaction exports: a raw CSV (bronze) is
//! cleaned into typed sales rows (silver, also written as a Parquet snapshot), checked for
//! data quality, and loaded incrementally into a single-file SQLite warehouse (gold) with
//! two dimension tables and one fact table. Aggregate reports run against the warehouse.
//!
//! The primary entrypoint is [`pipeline::Pipeline`], configured by a
//! [`config::PipelineConfig`].
//!
//! ## Stages
//!
//! - **Extract**: [`ingestion::extract_bronze`] reads the CSV into a [`types::DataSet`]
//!   using [`ingestion::bronze_schema`], decoding latin-1 or UTF-8.
//! - **Transform**: [`processing::bronze_to_silver`] drops cancelled invoices, non-positive
//!   quantities and totals, rows without a customer, then deduplicates invoice lines.
//!   [`snapshot::write_silver_snapshot`] writes the result to Parquet.
//! - **Validate**: [`validation::run_quality_checks`] fails with every failed check named.
//! - **Load**: [`warehouse::GoldLoader`] creates the schema on first run, skips rows whose
//!   invoice is already loaded on later runs, upserts dimensions and appends facts in one
//!   transaction, and builds indexes exactly once.
//! - **Report**: [`report::run_reports`] runs the default or scripted queries.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use retail_etl::config::PipelineConfig;
//! use retail_etl::pipeline::{NarrativeObserver, Pipeline};
//!
//! # fn main() -> Result<(), retail_etl::PipelineError> {
//! let config = PipelineConfig::load(None)?;
//! let summary = Pipeline::new(config)
//!     .with_observer(Arc::new(NarrativeObserver::stdout()))
//!     .run()?;
//! println!("fact rows written: {}", summary.load.fact_rows_written);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: paths, encoding and dedup policy, with TOML and environment overrides
//! - [`ingestion`]: bronze CSV ingestion
//! - [`types`]: schema + in-memory dataset types
//! - [`model`]: typed silver rows and dimension projections
//! - [`processing`]: bronze → silver cleaning and deduplication
//! - [`validation`]: named data quality checks
//! - [`snapshot`]: silver Parquet snapshot
//! - [`warehouse`]: SQLite gold warehouse and the incremental loader
//! - [`report`]: aggregate reports
//! - [`pipeline`]: stage orchestration and observers
//! - [`logging`]: subscriber setup for the binary
//! - [`error`]: the crate error type

pub mod config;
pub mod error;
pub mod ingestion;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod processing;
pub mod report;
pub mod snapshot;
pub mod types;
pub mod validation;
pub mod warehouse;

pub use config::{DedupPolicy, PipelineConfig, SourceEncoding};
pub use error::{PipelineError, PipelineResult};
pub use model::SalesRecord;
pub use pipeline::{Pipeline, PipelineSummary};
