//! Loan (borrow) model and related types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Lowest and highest return rate a member can have
pub const RETURN_RATE_MIN: i32 = 0;
pub const RETURN_RATE_MAX: i32 = 100;
/// Return rate change applied per return event
pub const RETURN_RATE_STEP: i32 = 5;

/// A loan still due less than this is flagged
const WARNING_WINDOW_MS: i64 = 12 * 60 * 60 * 1000;
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Active loan stored on the member document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanEntry {
    pub book_id: Uuid,
    pub borrowed_date: DateTime<Utc>,
    /// Due date
    pub return_date: DateTime<Utc>,
}

impl LoanEntry {
    pub fn open(book_id: Uuid, borrowable_days: i32, now: DateTime<Utc>) -> AppResult<Self> {
        let return_date = Duration::try_days(borrowable_days as i64)
            .and_then(|window| now.checked_add_signed(window))
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Borrow window of {} days for book {} is out of range",
                    borrowable_days, book_id
                ))
            })?;
        Ok(Self {
            book_id,
            borrowed_date: now,
            return_date,
        })
    }

    pub fn outcome_at(&self, now: DateTime<Utc>) -> ReturnOutcome {
        if now <= self.return_date {
            ReturnOutcome::OnTime
        } else {
            ReturnOutcome::Late
        }
    }
}

/// Whether a book came back before its due date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReturnOutcome {
    OnTime,
    Late,
}

/// Next return rate after a return event, clamped to 0..=100
pub fn score_return(current: i32, outcome: ReturnOutcome) -> i32 {
    let delta = match outcome {
        ReturnOutcome::OnTime => RETURN_RATE_STEP,
        ReturnOutcome::Late => -RETURN_RATE_STEP,
    };
    current
        .saturating_add(delta)
        .clamp(RETURN_RATE_MIN, RETURN_RATE_MAX)
}

/// Active loan as reported to the borrower
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanSummary {
    pub book_id: Uuid,
    /// English title, absent when the book was removed from the catalog
    pub title: Option<String>,
    pub return_date: DateTime<Utc>,
    /// Whole days until due, rounded up; negative once overdue
    pub days_left: i64,
    /// Less than 12 hours remain
    pub warning_flag: bool,
    /// Due date has passed
    pub expired_flag: bool,
}

impl LoanSummary {
    pub fn at(entry: &LoanEntry, title: Option<String>, now: DateTime<Utc>) -> Self {
        let remaining_ms = (entry.return_date - now).num_milliseconds();
        Self {
            book_id: entry.book_id,
            title,
            return_date: entry.return_date,
            days_left: ceil_div(remaining_ms, DAY_MS),
            warning_flag: remaining_ms < WARNING_WINDOW_MS,
            expired_flag: remaining_ms < 0,
        }
    }
}

fn ceil_div(value: i64, divisor: i64) -> i64 {
    let quotient = value / divisor;
    if value % divisor > 0 {
        quotient + 1
    } else {
        quotient
    }
}
