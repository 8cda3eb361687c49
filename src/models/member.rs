//! Member model and related types

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::book::Book;
use super::loan::{LoanEntry, RETURN_RATE_MIN};
use crate::error::{AppError, AppResult, Entity, ErrorCode};

/// Member document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub birth_date: NaiveDate,
    pub subscribed_books: Vec<Uuid>,
    pub borrowed_books: Vec<LoanEntry>,
    pub return_rate: i32,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn new(data: CreateMember, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: data.name,
            username: data.username,
            email: data.email,
            birth_date: data.birth_date,
            subscribed_books: Vec::new(),
            borrowed_books: Vec::new(),
            return_rate: RETURN_RATE_MIN,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Age in whole years on the given day
    pub fn age_on(&self, day: NaiveDate) -> i32 {
        let mut age = day.year() - self.birth_date.year();
        if (day.month(), day.day()) < (self.birth_date.month(), self.birth_date.day()) {
            age -= 1;
        }
        age
    }

    pub fn loan_for(&self, book_id: Uuid) -> Option<&LoanEntry> {
        self.borrowed_books.iter().find(|loan| loan.book_id == book_id)
    }

    /// Record a new loan of `book`; the caller takes the copy from the book
    pub fn open_loan(&mut self, book: &Book, now: DateTime<Utc>) -> AppResult<&LoanEntry> {
        if self.loan_for(book.id).is_some() {
            return Err(AppError::conflict(
                ErrorCode::AlreadyBorrowed,
                format!("Book {} is already borrowed by this member", book.id),
            ));
        }
        if self.age_on(now.date_naive()) < book.min_age {
            return Err(AppError::BusinessRule {
                code: ErrorCode::AgeRestricted,
                message: format!("Book {} requires a minimum age of {}", book.id, book.min_age),
            });
        }
        let entry = LoanEntry::open(book.id, book.number_of_borrowable_days, now)?;
        self.borrowed_books.push(entry);
        Ok(&self.borrowed_books[self.borrowed_books.len() - 1])
    }

    /// Remove the active loan on `book_id` and hand it back
    pub fn close_loan(&mut self, book_id: Uuid) -> AppResult<LoanEntry> {
        let position = self
            .borrowed_books
            .iter()
            .position(|loan| loan.book_id == book_id)
            .ok_or_else(|| AppError::not_found(Entity::Loan, book_id))?;
        Ok(self.borrowed_books.remove(position))
    }

    pub fn is_subscribed(&self, book_id: Uuid) -> bool {
        self.subscribed_books.contains(&book_id)
    }

    pub fn subscribe(&mut self, book_id: Uuid) -> AppResult<()> {
        if self.is_subscribed(book_id) {
            return Err(AppError::conflict(
                ErrorCode::AlreadySubscribed,
                "Already subscribed to this book.",
            ));
        }
        self.subscribed_books.push(book_id);
        Ok(())
    }

    /// Returns whether a subscription was removed
    pub fn unsubscribe(&mut self, book_id: Uuid) -> bool {
        let before = self.subscribed_books.len();
        self.subscribed_books.retain(|id| *id != book_id);
        before != self.subscribed_books.len()
    }

    pub fn apply(&mut self, update: UpdateMember) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(username) = update.username {
            self.username = username;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(birth_date) = update.birth_date {
            self.birth_date = birth_date;
        }
    }
}

/// Flat database row for a member
#[derive(Debug, Clone, FromRow)]
pub struct MemberRow {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub birth_date: NaiveDate,
    pub subscribed_books: Vec<Uuid>,
    pub borrowed_books: Json<Vec<LoanEntry>>,
    pub return_rate: i32,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            username: row.username,
            email: row.email,
            birth_date: row.birth_date,
            subscribed_books: row.subscribed_books,
            borrowed_books: row.borrowed_books.0,
            return_rate: row.return_rate,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Public member profile
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    pub name: String,
    pub username: String,
    pub email: String,
    pub birth_date: NaiveDate,
    pub subscribed_books: Vec<Uuid>,
    pub borrowed_books: Vec<LoanEntry>,
    pub return_rate: i32,
}

impl From<Member> for MemberProfile {
    fn from(member: Member) -> Self {
        Self {
            name: member.name,
            username: member.username,
            email: member.email,
            birth_date: member.birth_date,
            subscribed_books: member.subscribed_books,
            borrowed_books: member.borrowed_books,
            return_rate: member.return_rate,
        }
    }
}

/// Create member request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMember {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub birth_date: NaiveDate,
}

/// Update member request; loans, subscriptions and return rate are not writable here
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateMember {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::book::CreateBook;
    use crate::models::lang::{LocalizedNote, LocalizedText};

    fn member(birth: NaiveDate) -> Member {
        Member::new(
            CreateMember {
                name: "Layla".to_string(),
                username: "layla".to_string(),
                email: "layla@example.org".to_string(),
                birth_date: birth,
            },
            Utc::now(),
        )
    }

    fn book(min_age: i32) -> Book {
        Book::new(
            CreateBook {
                title: LocalizedText {
                    en: "Book".to_string(),
                    ar: "كتاب".to_string(),
                },
                description: LocalizedNote::default(),
                genre: "novel".to_string(),
                number_of_available_copies: 1,
                is_borrowable: None,
                number_of_borrowable_days: Some(7),
                is_open_to_reviews: None,
                min_age,
                author_id: Uuid::new_v4(),
            },
            "9780000000002".to_string(),
            Utc::now(),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        let m = member(date(2000, 6, 15));
        assert_eq!(m.age_on(date(2018, 6, 14)), 17);
        assert_eq!(m.age_on(date(2018, 6, 15)), 18);
    }

    #[test]
    fn test_open_loan_once_per_book() {
        let mut m = member(date(1990, 1, 1));
        let b = book(0);
        let now = Utc::now();

        let due = m.open_loan(&b, now).unwrap().return_date;
        assert_eq!(due, now + chrono::Duration::days(7));

        let err = m.open_loan(&b, now).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyBorrowed);
        assert_eq!(m.borrowed_books.len(), 1);
    }

    #[test]
    fn test_open_loan_checks_age() {
        let now = Utc::now();
        let mut m = member(now.date_naive() - chrono::Duration::days(365 * 10));
        let err = m.open_loan(&book(18), now).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AgeRestricted);
        assert!(m.borrowed_books.is_empty());
    }

    #[test]
    fn test_close_missing_loan_is_not_found() {
        let mut m = member(date(1990, 1, 1));
        let err = m.close_loan(Uuid::new_v4()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::LoanNotFound);
    }

    #[test]
    fn test_subscriptions() {
        let mut m = member(date(1990, 1, 1));
        let id = Uuid::new_v4();
        m.subscribe(id).unwrap();
        assert_eq!(m.subscribe(id).unwrap_err().code(), ErrorCode::AlreadySubscribed);
        assert!(m.unsubscribe(id));
        assert!(!m.unsubscribe(id));
        assert!(m.subscribed_books.is_empty());
    }
}
