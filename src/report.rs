//! Aggregate reports over the gold warehouse.
//!
//! Queries come from an analytics script (`;`-separated, each optionally named by a leading
//! `-- name` comment line) or, when no script is usable, from [`default_reports`]. Each
//! query runs on its own; one failing query never stops the others.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use serde::{Serialize, Serializer};
use tracing::{error, info, warn};

use crate::warehouse::Warehouse;
use crate::warehouse::schema::split_sql_script;

/// Name used for script queries without a leading comment.
pub const UNNAMED_QUERY: &str = "Query";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedQuery {
    pub name: String,
    pub sql: String,
}

impl NamedQuery {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// Revenue by country (top 5) and monthly revenue.
pub fn default_reports() -> Vec<NamedQuery> {
    vec![
        NamedQuery::new(
            "Revenue by Country (Top 5)",
            "SELECT c.Country, ROUND(SUM(f.total_amount), 2) AS revenue
             FROM fact_sales f
             JOIN dim_customer c ON f.CustomerID = c.CustomerID
             GROUP BY c.Country
             ORDER BY revenue DESC
             LIMIT 5",
        ),
        NamedQuery::new(
            "Monthly Revenue",
            "SELECT strftime('%Y-%m', InvoiceDate) AS month,
                    ROUND(SUM(total_amount), 2) AS revenue
             FROM fact_sales
             GROUP BY month
             ORDER BY month",
        ),
    ]
}

/// Parse an analytics script into named queries.
pub fn parse_analytics_script(script: &str) -> Vec<NamedQuery> {
    split_sql_script(script)
        .into_iter()
        .map(|sql| {
            let first = sql.lines().next().unwrap_or_default().trim();
            let name = match first.strip_prefix("--") {
                Some(rest) if !rest.trim().is_empty() => rest.trim().to_string(),
                _ => UNNAMED_QUERY.to_string(),
            };
            NamedQuery { name, sql }
        })
        .collect()
}

/// Where the report queries came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    Default,
    Script(#[serde(serialize_with = "serialize_display")] PathBuf),
}

impl fmt::Display for ReportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default reports"),
            Self::Script(p) => write!(f, "{}", p.display()),
        }
    }
}

fn serialize_display<S: Serializer>(path: &Path, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&path.display())
}

/// Resolve the queries to run: the script at `path` if it exists and is readable, otherwise
/// the defaults (an unreadable script is logged at error level).
pub fn resolve_reports(path: Option<&Path>) -> (ReportSource, Vec<NamedQuery>) {
    let Some(path) = path else {
        return (ReportSource::Default, default_reports());
    };
    if !path.exists() {
        info!(path = %path.display(), "analytics script not found, running default reports");
        return (ReportSource::Default, default_reports());
    }
    match fs::read_to_string(path) {
        Ok(text) => {
            let queries = parse_analytics_script(&text);
            if queries.is_empty() {
                warn!(path = %path.display(), "analytics script has no queries, running default reports");
                return (ReportSource::Default, default_reports());
            }
            (ReportSource::Script(path.to_path_buf()), queries)
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "error reading analytics script, running default reports");
            (ReportSource::Default, default_reports())
        }
    }
}

/// Result set rendered to strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Outcome of one named query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportOutcome {
    Ok { name: String, table: ReportTable },
    Failed { name: String, error: String },
}

impl ReportOutcome {
    pub fn name(&self) -> &str {
        match self {
            Self::Ok { name, .. } | Self::Failed { name, .. } => name,
        }
    }

    pub fn table(&self) -> Option<&ReportTable> {
        match self {
            Self::Ok { table, .. } => Some(table),
            Self::Failed { .. } => None,
        }
    }
}

/// Run every query, collecting an outcome per query.
pub fn run_reports(warehouse: &Warehouse, queries: &[NamedQuery]) -> Vec<ReportOutcome> {
    queries
        .iter()
        .map(|q| match query_table(warehouse, &q.sql) {
            Ok(table) => {
                info!(report = %q.name, rows = table.rows.len(), "report finished");
                ReportOutcome::Ok {
                    name: q.name.clone(),
                    table,
                }
            }
            Err(e) => {
                warn!(report = %q.name, error = %e, "report query failed");
                ReportOutcome::Failed {
                    name: q.name.clone(),
                    error: e.to_string(),
                }
            }
        })
        .collect()
}

fn query_table(warehouse: &Warehouse, sql: &str) -> rusqlite::Result<ReportTable> {
    let mut stmt = warehouse.connection().prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut out = Vec::with_capacity(width);
        for i in 0..width {
            out.push(render_cell(row.get_ref(i)?));
        }
        rows.push(out);
    }
    Ok(ReportTable { columns, rows })
}

fn render_cell(v: ValueRef<'_>) -> String {
    match v {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => {
            if f.fract() == 0.0 {
                format!("{f:.1}")
            } else {
                f.to_string()
            }
        }
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

impl fmt::Display for ReportTable {
    /// Right-aligned columns, header first, no index column.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let line = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, &w)| format!("{c:>w$}"))
                .collect::<Vec<_>>()
                .join(" ")
        };
        if self.rows.is_empty() {
            writeln!(f, "Empty result")?;
            return write!(f, "Columns: [{}]", self.columns.join(", "));
        }
        write!(f, "{}", line(&self.columns[..]))?;
        for row in &self.rows {
            write!(f, "\n{}", line(&row[..]))?;
        }
        Ok(())
    }
}

impl fmt::Display for ReportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok { name, table } => write!(f, "{name}:\n{table}"),
            Self::Failed { name, error } => write!(f, "{name}:\nError: {error}"),
        }
    }
}
