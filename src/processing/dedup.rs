//! Transform-time de-duplication of invoice lines.

use std::collections::HashSet;

use crate::model::SalesRecord;

/// Keep the first occurrence of each (invoice id, product code) pair.
pub fn dedup_invoice_lines(records: Vec<SalesRecord>) -> Vec<SalesRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|r| seen.insert(r.line_key()))
        .collect()
}
