//! Book (catalog entry) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::lang::{LocalizedNote, LocalizedText};
use crate::error::{AppError, AppResult, ErrorCode};

/// Default borrow window when none is given
pub const DEFAULT_BORROWABLE_DAYS: i32 = 14;
/// Longest borrow window a book can be configured with
pub const MAX_BORROWABLE_DAYS: i32 = 3650;

/// Book document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub title: LocalizedText,
    pub description: LocalizedNote,
    pub isbn: String,
    pub genre: String,
    pub number_of_available_copies: i32,
    pub is_borrowable: bool,
    /// Length of the borrow window in days
    pub number_of_borrowable_days: i32,
    pub is_open_to_reviews: bool,
    pub min_age: i32,
    pub author_id: Uuid,
    pub cover_image_url: Option<String>,
    pub is_published: bool,
    pub published_date: Option<DateTime<Utc>>,
    /// Optimistic concurrency counter, bumped on every save
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Build a new, unpublished book from a validated create request
    pub fn new(data: CreateBook, isbn: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            isbn,
            genre: data.genre,
            number_of_available_copies: data.number_of_available_copies,
            is_borrowable: data.is_borrowable.unwrap_or(true),
            number_of_borrowable_days: data
                .number_of_borrowable_days
                .unwrap_or(DEFAULT_BORROWABLE_DAYS),
            is_open_to_reviews: data.is_open_to_reviews.unwrap_or(true),
            min_age: data.min_age,
            author_id: data.author_id,
            cover_image_url: None,
            is_published: false,
            published_date: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Unpublished -> Published
    pub fn publish(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.is_published {
            return Err(AppError::conflict(
                ErrorCode::BookAlreadyPublished,
                "This book has already been published.",
            ));
        }
        self.is_published = true;
        self.published_date = Some(now);
        Ok(())
    }

    /// Published -> Unpublished
    pub fn unpublish(&mut self) -> AppResult<()> {
        if !self.is_published {
            return Err(AppError::conflict(
                ErrorCode::BookAlreadyUnpublished,
                "This book is already unpublished.",
            ));
        }
        self.is_published = false;
        Ok(())
    }

    /// Hand one copy out to a borrower
    pub fn take_copy(&mut self) -> AppResult<()> {
        if !self.is_borrowable {
            return Err(AppError::conflict(
                ErrorCode::NotBorrowable,
                format!("Book {} is not borrowable", self.id),
            ));
        }
        if self.number_of_available_copies <= 0 {
            return Err(AppError::conflict(
                ErrorCode::NoCopiesAvailable,
                format!("No copies of book {} are available", self.id),
            ));
        }
        self.number_of_available_copies -= 1;
        Ok(())
    }

    pub fn return_copy(&mut self) {
        self.number_of_available_copies += 1;
    }

    pub fn apply(&mut self, update: UpdateBook) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(genre) = update.genre {
            self.genre = genre;
        }
        if let Some(copies) = update.number_of_available_copies {
            self.number_of_available_copies = copies;
        }
        if let Some(borrowable) = update.is_borrowable {
            self.is_borrowable = borrowable;
        }
        if let Some(days) = update.number_of_borrowable_days {
            self.number_of_borrowable_days = days;
        }
        if let Some(open) = update.is_open_to_reviews {
            self.is_open_to_reviews = open;
        }
        if let Some(min_age) = update.min_age {
            self.min_age = min_age;
        }
        if let Some(author_id) = update.author_id {
            self.author_id = author_id;
        }
    }
}

/// Flat database row for a book
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub id: Uuid,
    pub title_en: String,
    pub title_ar: String,
    pub description_en: Option<String>,
    pub description_ar: Option<String>,
    pub isbn: String,
    pub genre: String,
    pub number_of_available_copies: i32,
    pub is_borrowable: bool,
    pub number_of_borrowable_days: i32,
    pub is_open_to_reviews: bool,
    pub min_age: i32,
    pub author_id: Uuid,
    pub cover_image_url: Option<String>,
    pub is_published: bool,
    pub published_date: Option<DateTime<Utc>>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Self {
            id: row.id,
            title: LocalizedText {
                en: row.title_en,
                ar: row.title_ar,
            },
            description: LocalizedNote {
                en: row.description_en,
                ar: row.description_ar,
            },
            isbn: row.isbn,
            genre: row.genre,
            number_of_available_copies: row.number_of_available_copies,
            is_borrowable: row.is_borrowable,
            number_of_borrowable_days: row.number_of_borrowable_days,
            is_open_to_reviews: row.is_open_to_reviews,
            min_age: row.min_age,
            author_id: row.author_id,
            cover_image_url: row.cover_image_url,
            is_published: row.is_published,
            published_date: row.published_date,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Book as shown in listings (no cover, no modification date)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: Uuid,
    pub title: LocalizedText,
    pub description: LocalizedNote,
    pub isbn: String,
    pub genre: String,
    pub number_of_available_copies: i32,
    pub is_borrowable: bool,
    pub number_of_borrowable_days: i32,
    pub is_open_to_reviews: bool,
    pub min_age: i32,
    pub author_id: Uuid,
    pub is_published: bool,
    pub published_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Book> for BookSummary {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            description: book.description,
            isbn: book.isbn,
            genre: book.genre,
            number_of_available_copies: book.number_of_available_copies,
            is_borrowable: book.is_borrowable,
            number_of_borrowable_days: book.number_of_borrowable_days,
            is_open_to_reviews: book.is_open_to_reviews,
            min_age: book.min_age,
            author_id: book.author_id,
            is_published: book.is_published,
            published_date: book.published_date,
            created_at: book.created_at,
        }
    }
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    #[validate(nested)]
    pub title: LocalizedText,
    #[serde(default)]
    pub description: LocalizedNote,
    #[validate(length(min = 1, message = "Genre is required"))]
    pub genre: String,
    #[validate(range(min = 0, message = "Available copies cannot be negative"))]
    pub number_of_available_copies: i32,
    pub is_borrowable: Option<bool>,
    #[validate(range(
        min = 1,
        max = 3650,
        message = "Borrow window must be between 1 and 3650 days"
    ))]
    pub number_of_borrowable_days: Option<i32>,
    pub is_open_to_reviews: Option<bool>,
    #[validate(range(min = 0, message = "Minimum age cannot be negative"))]
    pub min_age: i32,
    pub author_id: Uuid,
}

/// Update book request; publication state is not writable here
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateBook {
    #[validate(nested)]
    pub title: Option<LocalizedText>,
    pub description: Option<LocalizedNote>,
    #[validate(length(min = 1, message = "Genre cannot be empty"))]
    pub genre: Option<String>,
    #[validate(range(min = 0, message = "Available copies cannot be negative"))]
    pub number_of_available_copies: Option<i32>,
    pub is_borrowable: Option<bool>,
    #[validate(range(
        min = 1,
        max = 3650,
        message = "Borrow window must be between 1 and 3650 days"
    ))]
    pub number_of_borrowable_days: Option<i32>,
    pub is_open_to_reviews: Option<bool>,
    #[validate(range(min = 0, message = "Minimum age cannot be negative"))]
    pub min_age: Option<i32>,
    pub author_id: Option<Uuid>,
}

/// Book listing query parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub genre: Option<String>,
    /// Case-insensitive match on English title or ISBN
    pub search: Option<String>,
}

impl BookQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// Filter predicate, mirrors the SQL `WHERE` built by the Postgres store
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(ref genre) = self.genre {
            if &book.genre != genre {
                return false;
            }
        }
        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            return book.title.en.to_lowercase().contains(&needle)
                || book.isbn.to_lowercase().contains(&needle);
        }
        true
    }
}
