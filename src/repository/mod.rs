//! Repository layer for document persistence
//!
//! Services only see the store traits below. Two backends implement them:
//! PostgreSQL through sqlx, and an in-process memory store used for local
//! runs and tests.

pub mod authors;
pub mod books;
pub mod members;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use uuid::Uuid;

use crate::{
    config::{DatabaseConfig, StoreBackend},
    error::{AppError, AppResult, ErrorCode},
    models::{Author, Book, BookQuery, Member},
};

/// Turn a unique index violation into a duplicate conflict
fn unique_violation(err: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    let is_unique = err
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);
    if is_unique {
        AppError::conflict(ErrorCode::AlreadyExists, message())
    } else {
        AppError::Database(err)
    }
}

/// Book documents
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>>;
    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>>;
    /// Filtered page, newest first then by author
    async fn find(&self, query: &BookQuery) -> AppResult<Vec<Book>>;
    async fn insert(&self, book: &Book) -> AppResult<Book>;
    /// Versioned update; fails with a stale-version conflict when the stored
    /// document moved on since `book` was read
    async fn save(&self, book: &Book) -> AppResult<Book>;
    async fn delete_by_id(&self, id: Uuid) -> AppResult<bool>;
    /// Count all books, or only those with the given publication state
    async fn count(&self, published: Option<bool>) -> AppResult<i64>;
    async fn count_by_author(&self, author_id: Uuid) -> AppResult<i64>;
}

/// Member documents
#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Member>>;
    /// Any member other than `exclude` already using the username or email
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
        exclude: Option<Uuid>,
    ) -> AppResult<Option<Member>>;
    /// Members whose subscriptions contain the book
    async fn find_subscribers(&self, book_id: Uuid) -> AppResult<Vec<Member>>;
    async fn insert(&self, member: &Member) -> AppResult<Member>;
    async fn save(&self, member: &Member) -> AppResult<Member>;
    async fn delete_by_id(&self, id: Uuid) -> AppResult<bool>;
    /// Members currently holding a loan on the book
    async fn count_borrowers(&self, book_id: Uuid) -> AppResult<i64>;
    async fn return_rates(&self) -> AppResult<Vec<i32>>;
}

/// Author documents
#[async_trait]
pub trait AuthorStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Author>>;
    async fn find_by_email(&self, email: &str, exclude: Option<Uuid>) -> AppResult<Option<Author>>;
    async fn exists(&self, id: Uuid) -> AppResult<bool>;
    async fn insert(&self, author: &Author) -> AppResult<Author>;
    async fn save(&self, author: &Author) -> AppResult<Author>;
    async fn delete_by_id(&self, id: Uuid) -> AppResult<bool>;
}

/// Atomic persistence of a borrow or return
#[async_trait]
pub trait CirculationStore: Send + Sync {
    /// Save both documents with version checks; either both are written or neither is
    async fn commit(&self, member: &Member, book: &Book) -> AppResult<(Member, Book)>;
}

/// Store handle injected into every service
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookStore>,
    pub members: Arc<dyn MemberStore>,
    pub authors: Arc<dyn AuthorStore>,
    pub circulation: Arc<dyn CirculationStore>,
    pool: Option<Pool<Postgres>>,
}

impl Repository {
    /// Create a repository backed by PostgreSQL
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            members: Arc::new(members::MembersRepository::new(pool.clone())),
            authors: Arc::new(authors::AuthorsRepository::new(pool.clone())),
            circulation: Arc::new(members::MembersRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Create a repository backed by an empty in-memory store
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self {
            books: store.clone(),
            members: store.clone(),
            authors: store.clone(),
            circulation: store,
            pool: None,
        }
    }

    /// Open the configured backend, running migrations for PostgreSQL
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        match config.backend {
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store, data will not survive a restart");
                Ok(Self::in_memory())
            }
            StoreBackend::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .min_connections(config.min_connections)
                    .connect(&config.url)
                    .await?;
                tracing::info!("Connected to database");

                sqlx::migrate!("./migrations").run(&pool).await?;
                tracing::info!("Database migrations completed");

                Ok(Self::postgres(pool))
            }
        }
    }

    /// Check the backend answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(ref pool) = self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }

    /// Release pooled connections
    pub async fn close(&self) {
        if let Some(ref pool) = self.pool {
            pool.close().await;
            tracing::info!("Database pool closed");
        }
    }
}
