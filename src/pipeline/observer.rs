use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tracing::{error, info};

use crate::error::PipelineError;
use crate::report::ReportOutcome;

/// The linear stages of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Extract,
    Transform,
    Validate,
    Load,
    Report,
}

impl Stage {
    /// Progress headline used by [`NarrativeObserver`].
    pub fn headline(self) -> &'static str {
        match self {
            Self::Extract => "EXTRACTING BRONZE DATA",
            Self::Transform => "TRANSFORMING TO SILVER",
            Self::Validate => "RUNNING QUALITY CHECKS",
            Self::Load => "LOADING GOLD WAREHOUSE",
            Self::Report => "RUNNING ANALYTICS",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Extract => "extract",
            Self::Transform => "transform",
            Self::Validate => "validate",
            Self::Load => "load",
            Self::Report => "report",
        };
        f.write_str(s)
    }
}

/// What a finished stage reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageStats {
    /// Rows the stage produced (or wrote, for the load stage).
    pub rows: usize,
    /// One-line human summary, e.g. "Extracted 8 rows".
    pub summary: String,
}

impl StageStats {
    pub fn new(rows: usize, summary: impl Into<String>) -> Self {
        Self {
            rows,
            summary: summary.into(),
        }
    }
}

/// Observer interface for pipeline progress.
///
/// Implementors can record metrics, logs, or print progress.
pub trait PipelineObserver: Send + Sync {
    fn on_run_started(&self) {}

    fn on_stage_started(&self, _stage: Stage) {}

    fn on_stage_finished(&self, _stage: Stage, _stats: &StageStats) {}

    /// Called for each report as it completes, before the report stage finishes.
    fn on_report(&self, _outcome: &ReportOutcome) {}

    /// Called once, for the stage that aborted the run.
    fn on_failure(&self, _stage: Stage, _error: &PipelineError) {}

    fn on_run_finished(&self) {}
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_run_started(&self) {
        for o in &self.observers {
            o.on_run_started();
        }
    }

    fn on_stage_started(&self, stage: Stage) {
        for o in &self.observers {
            o.on_stage_started(stage);
        }
    }

    fn on_stage_finished(&self, stage: Stage, stats: &StageStats) {
        for o in &self.observers {
            o.on_stage_finished(stage, stats);
        }
    }

    fn on_report(&self, outcome: &ReportOutcome) {
        for o in &self.observers {
            o.on_report(outcome);
        }
    }

    fn on_failure(&self, stage: Stage, error: &PipelineError) {
        for o in &self.observers {
            o.on_failure(stage, error);
        }
    }

    fn on_run_finished(&self) {
        for o in &self.observers {
            o.on_run_finished();
        }
    }
}

/// Emits stage events as structured `tracing` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_stage_started(&self, stage: Stage) {
        info!(%stage, "stage started");
    }

    fn on_stage_finished(&self, stage: Stage, stats: &StageStats) {
        info!(%stage, rows = stats.rows, summary = %stats.summary, "stage finished");
    }

    fn on_failure(&self, stage: Stage, error: &PipelineError) {
        error!(%stage, error = %error, "stage failed");
    }
}

const BANNER_WIDTH: usize = 60;

/// Prints the operator-facing progress narrative (banner, numbered stages, check marks).
///
/// Writes are best-effort; a broken output stream never fails the run.
pub struct NarrativeObserver {
    out: Mutex<Box<dyn Write + Send>>,
}

impl NarrativeObserver {
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out: Mutex::new(out) }
    }

    fn emit(&self, text: &str) {
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{text}");
            let _ = out.flush();
        }
    }
}

impl fmt::Debug for NarrativeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarrativeObserver").finish_non_exhaustive()
    }
}

impl PipelineObserver for NarrativeObserver {
    fn on_run_started(&self) {
        let rule = "=".repeat(BANNER_WIDTH);
        self.emit(&format!("{rule}\nSTARTING RETAIL DATA PIPELINE\n{rule}"));
    }

    fn on_stage_started(&self, stage: Stage) {
        let n = stage as usize + 1;
        self.emit(&format!("\n{n}. {}...", stage.headline()));
    }

    fn on_stage_finished(&self, _stage: Stage, stats: &StageStats) {
        self.emit(&format!("   ✓ {}", stats.summary));
    }

    fn on_report(&self, outcome: &ReportOutcome) {
        self.emit(&format!("\n{outcome}"));
    }

    fn on_failure(&self, stage: Stage, error: &PipelineError) {
        self.emit(&format!("\nPIPELINE FAILED during {stage}: {error}"));
    }

    fn on_run_finished(&self) {
        let rule = "=".repeat(BANNER_WIDTH);
        self.emit(&format!("\n{rule}\nPIPELINE COMPLETED SUCCESSFULLY!\n{rule}"));
    }
}
