//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{postgres::PgExecutor, Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::BookStore;
use crate::{
    error::{AppError, AppResult, Entity},
    models::book::{Book, BookQuery, BookRow},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Versioned update usable inside a transaction. `None` means the id/version
/// pair did not match.
pub(crate) async fn update_versioned<'e, E>(executor: E, book: &Book) -> AppResult<Option<Book>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, BookRow>(
        r#"
        UPDATE books SET
            title_en = $3, title_ar = $4, description_en = $5, description_ar = $6,
            genre = $7, number_of_available_copies = $8, is_borrowable = $9,
            number_of_borrowable_days = $10, is_open_to_reviews = $11, min_age = $12,
            author_id = $13, cover_image_url = $14, is_published = $15, published_date = $16,
            version = version + 1, updated_at = NOW()
        WHERE id = $1 AND version = $2
        RETURNING *
        "#,
    )
    .bind(book.id)
    .bind(book.version)
    .bind(book.title.en.clone())
    .bind(book.title.ar.clone())
    .bind(book.description.en.clone())
    .bind(book.description.ar.clone())
    .bind(book.genre.clone())
    .bind(book.number_of_available_copies)
    .bind(book.is_borrowable)
    .bind(book.number_of_borrowable_days)
    .bind(book.is_open_to_reviews)
    .bind(book.min_age)
    .bind(book.author_id)
    .bind(book.cover_image_url.clone())
    .bind(book.is_published)
    .bind(book.published_date)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(Book::from))
}

/// Escape LIKE wildcards and wrap for a substring match
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Book::from))
    }

    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>("SELECT * FROM books WHERE isbn = $1")
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Book::from))
    }

    async fn find(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM books WHERE TRUE");

        if let Some(ref genre) = query.genre {
            builder.push(" AND genre = ").push_bind(genre.clone());
        }

        if let Some(ref search) = query.search {
            let pattern = like_pattern(search);
            builder
                .push(" AND (title_en ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR isbn ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        builder
            .push(" ORDER BY created_at DESC, author_id ASC LIMIT ")
            .push_bind(query.limit())
            .push(" OFFSET ")
            .push_bind(query.offset());

        let rows = builder
            .build_query_as::<BookRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Book::from).collect())
    }

    async fn insert(&self, book: &Book) -> AppResult<Book> {
        let row = sqlx::query_as::<_, BookRow>(
            r#"
            INSERT INTO books (
                id, title_en, title_ar, description_en, description_ar, isbn, genre,
                number_of_available_copies, is_borrowable, number_of_borrowable_days,
                is_open_to_reviews, min_age, author_id, cover_image_url,
                is_published, published_date, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, 0, $17, $17)
            RETURNING *
            "#,
        )
        .bind(book.id)
        .bind(&book.title.en)
        .bind(&book.title.ar)
        .bind(&book.description.en)
        .bind(&book.description.ar)
        .bind(&book.isbn)
        .bind(&book.genre)
        .bind(book.number_of_available_copies)
        .bind(book.is_borrowable)
        .bind(book.number_of_borrowable_days)
        .bind(book.is_open_to_reviews)
        .bind(book.min_age)
        .bind(book.author_id)
        .bind(&book.cover_image_url)
        .bind(book.is_published)
        .bind(book.published_date)
        .bind(book.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            super::unique_violation(e, || {
                format!("A book with ISBN {} already exists", book.isbn)
            })
        })?;

        Ok(row.into())
    }

    async fn save(&self, book: &Book) -> AppResult<Book> {
        match update_versioned(&self.pool, book).await? {
            Some(saved) => Ok(saved),
            None if self.find_by_id(book.id).await?.is_some() => {
                Err(AppError::stale(Entity::Book, book.id))
            }
            None => Err(AppError::not_found(Entity::Book, book.id)),
        }
    }

    async fn delete_by_id(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, published: Option<bool>) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM books WHERE ($1::boolean IS NULL OR is_published = $1)",
        )
        .bind(published)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_by_author(&self, author_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
