//! Typed sales records and the dimension rows derived from them.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

/// Timestamp layout used for the warehouse and the silver snapshot.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One cleaned transaction line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesRecord {
    pub invoice_no: String,
    pub invoice_date: NaiveDateTime,
    /// `None` only before validation; the transformer drops rows without a customer.
    pub customer_id: Option<i64>,
    pub stock_code: String,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub country: String,
    pub total_amount: Decimal,
}

impl SalesRecord {
    /// Key that identifies one invoice line across the fact table's lifetime.
    pub fn line_key(&self) -> InvoiceLine {
        InvoiceLine {
            invoice_no: self.invoice_no.clone(),
            stock_code: self.stock_code.clone(),
        }
    }
}

/// (invoice id, product code) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvoiceLine {
    pub invoice_no: String,
    pub stock_code: String,
}

/// `quantity × unit_price`, rounded to 2 decimal places (half to even).
///
/// `None` when the product does not fit in a [`Decimal`].
pub fn total_amount(quantity: i64, unit_price: Decimal) -> Option<Decimal> {
    Decimal::from(quantity)
        .checked_mul(unit_price)
        .map(|total| total.round_dp(2))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerDim {
    pub customer_id: i64,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductDim {
    pub stock_code: String,
    pub description: String,
}

/// Project customers out of `rows`, unique by customer id.
///
/// When a customer appears with different countries, the last occurrence wins.
/// Rows without a customer id are skipped.
pub fn customer_dimension<'a>(rows: impl IntoIterator<Item = &'a SalesRecord>) -> Vec<CustomerDim> {
    dedup_last_wins(rows.into_iter().filter_map(|r| {
        r.customer_id.map(|id| {
            (
                id,
                CustomerDim {
                    customer_id: id,
                    country: r.country.clone(),
                },
            )
        })
    }))
}

/// Project products out of `rows`, unique by product code (last occurrence wins).
pub fn product_dimension<'a>(rows: impl IntoIterator<Item = &'a SalesRecord>) -> Vec<ProductDim> {
    dedup_last_wins(rows.into_iter().map(|r| {
        (
            r.stock_code.clone(),
            ProductDim {
                stock_code: r.stock_code.clone(),
                description: r.description.clone(),
            },
        )
    }))
}

// Keeps first-seen key order, last-seen value.
fn dedup_last_wins<K, V, I>(items: I) -> Vec<V>
where
    K: std::hash::Hash + Eq,
    I: IntoIterator<Item = (K, V)>,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut out: Vec<V> = Vec::new();
    for (key, value) in items {
        match slots.get(&key) {
            Some(&idx) => out[idx] = value,
            None => {
                slots.insert(key, out.len());
                out.push(value);
            }
        }
    }
    out
}


#[cfg(test)]
mod tests {
    use super::test_support::record;
    use super::*;

    #[test]
    fn total_amount_rounds_to_cents() {
        assert_eq!(total_amount(6, Decimal::new(255, 2)), Some(Decimal::new(1530, 2)));
        assert_eq!(total_amount(3, Decimal::new(3335, 3)), Some(Decimal::new(1000, 2)));
        // Half-to-even at the third decimal.
        assert_eq!(total_amount(1, Decimal::new(1125, 3)), Some(Decimal::new(112, 2)));
    }

    #[test]
    fn total_amount_overflow_is_none() {
        let price: Decimal = "79228162514.26".parse().unwrap();
        assert_eq!(total_amount(i64::MAX, price), None);
        assert_eq!(total_amount(i64::MAX, Decimal::MAX), None);
    }

    #[test]
    fn dimensions_accept_borrowed_rows() {
        let a = record("1", "A", Some(10), 1, "1.00");
        let b = record("2", "B", Some(10), 1, "1.00");
        let pending: Vec<&SalesRecord> = vec![&a, &b];
        assert_eq!(customer_dimension(pending.iter().copied()).len(), 1);
        assert_eq!(product_dimension(pending).len(), 2);
    }

    #[test]
    fn customer_dimension_is_unique_by_id_and_last_wins() {
        let mut a = record("1", "A", Some(10), 1, "1.00");
        let b = record("1", "B", Some(11), 1, "1.00");
        let mut c = record("2", "A", Some(10), 1, "1.00");
        a.country = "France".to_string();
        c.country = "Germany".to_string();
        let none = record("3", "C", None, 1, "1.00");

        let dims = customer_dimension(&[a, b, c, none]);
        assert_eq!(
            dims,
            vec![
                CustomerDim {
                    customer_id: 10,
                    country: "Germany".to_string()
                },
                CustomerDim {
                    customer_id: 11,
                    country: "United Kingdom".to_string()
                },
            ]
        );
    }

    #[test]
    fn product_dimension_is_unique_by_code() {
        let rows = vec![
            record("1", "85123A", Some(1), 1, "1.00"),
            record("2", "85123A", Some(1), 1, "1.00"),
            record("2", "71053", Some(1), 1, "1.00"),
        ];
        let dims = product_dimension(&rows);
        assert_eq!(dims.len(), 2);
        assert_eq!(dims[0].stock_code, "85123A");
        assert_eq!(dims[1].stock_code, "71053");
    }
}
