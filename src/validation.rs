//! Data quality checks run on silver rows before they reach the warehouse.

use std::collections::HashSet;
use std::fmt;

use tracing::{info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::model::SalesRecord;

/// A named invariant over a batch of [`SalesRecord`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityCheck {
    /// Every row has a customer id.
    NoNullCustomer,
    /// Every quantity is > 0.
    PositiveQuantity,
    /// Every total amount is > 0.
    PositiveRevenue,
    /// (invoice id, product code) is unique within the batch.
    UniqueInvoiceLine,
}

impl QualityCheck {
    /// All checks, in reporting order.
    pub const ALL: [QualityCheck; 4] = [
        Self::NoNullCustomer,
        Self::PositiveQuantity,
        Self::PositiveRevenue,
        Self::UniqueInvoiceLine,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::NoNullCustomer => "no_null_customer",
            Self::PositiveQuantity => "positive_quantity",
            Self::PositiveRevenue => "positive_revenue",
            Self::UniqueInvoiceLine => "unique_invoice_line",
        }
    }

    /// Returns `true` when the check holds for `rows`.
    pub fn evaluate(self, rows: &[SalesRecord]) -> bool {
        match self {
            Self::NoNullCustomer => rows.iter().all(|r| r.customer_id.is_some()),
            Self::PositiveQuantity => rows.iter().all(|r| r.quantity > 0),
            Self::PositiveRevenue => rows
                .iter()
                .all(|r| r.total_amount.is_sign_positive() && !r.total_amount.is_zero()),
            Self::UniqueInvoiceLine => {
                let mut seen = HashSet::with_capacity(rows.len());
                rows.iter().all(|r| seen.insert(r.line_key()))
            }
        }
    }
}

impl fmt::Display for QualityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of every check against one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityReport {
    pub results: Vec<(QualityCheck, bool)>,
}

impl QualityReport {
    pub fn failed(&self) -> Vec<QualityCheck> {
        self.results
            .iter()
            .filter(|(_, passed)| !passed)
            .map(|(check, _)| *check)
            .collect()
    }

    pub fn passed(&self) -> bool {
        self.results.iter().all(|(_, passed)| *passed)
    }
}

/// Evaluate every check without failing.
pub fn evaluate_quality(rows: &[SalesRecord]) -> QualityReport {
    QualityReport {
        results: QualityCheck::ALL
            .iter()
            .map(|check| (*check, check.evaluate(rows)))
            .collect(),
    }
}

/// Run every check and fail with [`PipelineError::DataQuality`] naming all failed checks.
pub fn run_quality_checks(rows: &[SalesRecord]) -> PipelineResult<QualityReport> {
    let report = evaluate_quality(rows);
    if report.passed() {
        info!(rows = rows.len(), "data quality checks passed");
        return Ok(report);
    }

    let failed: Vec<String> = report.failed().iter().map(|c| c.name().to_string()).collect();
    warn!(rows = rows.len(), ?failed, "data quality checks failed");
    Err(PipelineError::DataQuality { failed })
}
