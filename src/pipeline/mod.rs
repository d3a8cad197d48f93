//! Pipeline runner: Extract → Transform (+ silver snapshot) → Validate → Load → Report.
//!
//! Every stage on the critical path (extract, transform, validate, load) is fail-fast: the
//! first error aborts the run and is reported to the observer with the stage it came from.
//! Reporting degrades per query and never fails the run once the warehouse is readable.

mod observer;

use std::sync::Arc;

use tracing::info_span;

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::ingestion::extract_bronze;
use crate::model::SalesRecord;
use crate::processing::bronze_to_silver;
use crate::report::{ReportOutcome, ReportSource, resolve_reports, run_reports};
use crate::snapshot::{read_silver_snapshot, write_silver_snapshot};
use crate::validation::run_quality_checks;
use crate::warehouse::{GoldLoader, LoadResult, Warehouse};

pub use observer::{
    CompositeObserver, NarrativeObserver, PipelineObserver, Stage, StageStats, TracingObserver,
};

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Bronze rows read; `None` when the run started from the silver snapshot.
    pub extracted_rows: Option<usize>,
    pub silver_rows: usize,
    pub load: LoadResult,
    pub report_source: ReportSource,
    pub reports: Vec<ReportOutcome>,
}

/// Reports produced by [`Pipeline::report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRun {
    pub source: ReportSource,
    pub outcomes: Vec<ReportOutcome>,
}

/// A configured pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    observer: Option<Arc<dyn PipelineObserver>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    /// Attach an observer for progress events.
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage from the bronze source.
    pub fn run(&self) -> PipelineResult<PipelineSummary> {
        let _span = info_span!("pipeline", bronze = %self.config.bronze_path.display()).entered();
        self.notify(|o| o.on_run_started());

        let bronze = self.stage(Stage::Extract, || {
            let ds = extract_bronze(&self.config.bronze_path, self.config.encoding)?;
            let n = ds.row_count();
            Ok((ds, StageStats::new(n, format!("Extracted {n} rows"))))
        })?;

        let silver = self.stage(Stage::Transform, || {
            let records = bronze_to_silver(&bronze)?;
            write_silver_snapshot(&self.config.silver_path, &records)?;
            let n = records.len();
            Ok((records, StageStats::new(n, format!("Transformed to {n} rows"))))
        })?;

        let summary = self.validate_load_report(Some(bronze.row_count()), silver)?;
        self.notify(|o| o.on_run_finished());
        Ok(summary)
    }

    /// Validate, load and report from the silver snapshot written by an earlier run.
    pub fn reload(&self) -> PipelineResult<PipelineSummary> {
        let _span = info_span!("pipeline", silver = %self.config.silver_path.display()).entered();
        self.notify(|o| o.on_run_started());

        let silver = self.stage(Stage::Transform, || {
            let records = read_silver_snapshot(&self.config.silver_path)?;
            let n = records.len();
            Ok((records, StageStats::new(n, format!("Read {n} rows from silver snapshot"))))
        })?;

        let summary = self.validate_load_report(None, silver)?;
        self.notify(|o| o.on_run_finished());
        Ok(summary)
    }

    /// Run only the reports against the existing warehouse.
    pub fn report(&self) -> PipelineResult<ReportRun> {
        let (source, outcomes) = self.stage(Stage::Report, || self.run_reports())?;
        Ok(ReportRun { source, outcomes })
    }

    fn validate_load_report(
        &self,
        extracted_rows: Option<usize>,
        silver: Vec<SalesRecord>,
    ) -> PipelineResult<PipelineSummary> {
        self.stage(Stage::Validate, || {
            run_quality_checks(&silver)?;
            Ok(((), StageStats::new(silver.len(), "Quality checks passed")))
        })?;

        let load = self.stage(Stage::Load, || {
            let result = GoldLoader::from_config(&self.config).load(&silver)?;
            let summary = if result.is_noop() {
                "No new data to load".to_string()
            } else {
                format!(
                    "Loaded {} rows to fact_sales ({})",
                    result.fact_rows_written, result.mode
                )
            };
            let n = result.fact_rows_written;
            Ok((result, StageStats::new(n, summary)))
        })?;

        let (report_source, reports) = self.stage(Stage::Report, || self.run_reports())?;

        Ok(PipelineSummary {
            extracted_rows,
            silver_rows: silver.len(),
            load,
            report_source,
            reports,
        })
    }

    fn run_reports(&self) -> PipelineResult<((ReportSource, Vec<ReportOutcome>), StageStats)> {
        let (source, queries) = resolve_reports(self.config.analytics_script.as_deref());
        let warehouse = Warehouse::open_read_only(&self.config.warehouse_path)?;
        let outcomes = run_reports(&warehouse, &queries);
        warehouse.close()?;
        for outcome in &outcomes {
            self.notify(|o| o.on_report(outcome));
        }

        let failed = outcomes
            .iter()
            .filter(|o| matches!(o, ReportOutcome::Failed { .. }))
            .count();
        let stats = StageStats::new(
            outcomes.len(),
            format!("Ran {} reports ({failed} failed)", outcomes.len()),
        );
        Ok(((source, outcomes), stats))
    }

    fn stage<T, F>(&self, stage: Stage, f: F) -> PipelineResult<T>
    where
        F: FnOnce() -> PipelineResult<(T, StageStats)>,
    {
        let _span = info_span!("stage", %stage).entered();
        self.notify(|o| o.on_stage_started(stage));
        match f() {
            Ok((value, stats)) => {
                self.notify(|o| o.on_stage_finished(stage, &stats));
                Ok(value)
            }
            Err(e) => {
                self.notify(|o| o.on_failure(stage, &e));
                Err(e)
            }
        }
    }

    fn notify(&self, f: impl FnOnce(&dyn PipelineObserver)) {
        if let Some(o) = &self.observer {
            f(o.as_ref());
        }
    }
}
