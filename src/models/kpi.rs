//! Fleet-wide indicators

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Publish rate and average return rate, rendered as percentages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    /// e.g. `"50.00%"`
    pub books_publish_rate: String,
    /// e.g. `"72.50%"`
    pub average_return_rate: String,
}

impl Kpis {
    pub fn compute(total_books: i64, published_books: i64, return_rates: &[i32]) -> Self {
        let publish_rate = if total_books > 0 {
            Some(published_books as f64 / total_books as f64 * 100.0)
        } else {
            None
        };

        let average_return = if return_rates.is_empty() {
            None
        } else {
            let sum: i64 = return_rates.iter().map(|r| *r as i64).sum();
            Some(sum as f64 / return_rates.len() as f64)
        };

        Self {
            books_publish_rate: percentage(publish_rate),
            average_return_rate: percentage(average_return),
        }
    }
}

/// Two decimals, or a bare `0%` when there was nothing to average
fn percentage(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v),
        None => "0%".to_string(),
    }
}
