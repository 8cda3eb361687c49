//! Authors repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::AuthorStore;
use crate::{
    error::{AppError, AppResult, Entity},
    models::author::{Author, AuthorRow},
};

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorStore for AuthorsRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Author>> {
        let row = sqlx::query_as::<_, AuthorRow>("SELECT * FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Author::from))
    }

    async fn find_by_email(&self, email: &str, exclude: Option<Uuid>) -> AppResult<Option<Author>> {
        let row = sqlx::query_as::<_, AuthorRow>(
            "SELECT * FROM authors WHERE LOWER(email) = LOWER($1) AND ($2::uuid IS NULL OR id != $2) LIMIT 1",
        )
        .bind(email)
        .bind(exclude)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Author::from))
    }

    async fn exists(&self, id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM authors WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn insert(&self, author: &Author) -> AppResult<Author> {
        let row = sqlx::query_as::<_, AuthorRow>(
            r#"
            INSERT INTO authors (
                id, name_en, name_ar, email, biography_en, biography_ar,
                profile_image_url, birth_date, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $9)
            RETURNING *
            "#,
        )
        .bind(author.id)
        .bind(&author.name.en)
        .bind(&author.name.ar)
        .bind(&author.email)
        .bind(&author.biography.en)
        .bind(&author.biography.ar)
        .bind(&author.profile_image_url)
        .bind(author.birth_date)
        .bind(author.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            super::unique_violation(e, || {
                format!("An author with email {} already exists", author.email)
            })
        })?;

        Ok(row.into())
    }

    async fn save(&self, author: &Author) -> AppResult<Author> {
        let row = sqlx::query_as::<_, AuthorRow>(
            r#"
            UPDATE authors SET
                name_en = $3, name_ar = $4, email = $5, biography_en = $6,
                biography_ar = $7, profile_image_url = $8, birth_date = $9,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(author.id)
        .bind(author.version)
        .bind(&author.name.en)
        .bind(&author.name.ar)
        .bind(&author.email)
        .bind(&author.biography.en)
        .bind(&author.biography.ar)
        .bind(&author.profile_image_url)
        .bind(author.birth_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            super::unique_violation(e, || {
                format!("An author with email {} already exists", author.email)
            })
        })?;

        match row {
            Some(row) => Ok(row.into()),
            None if self.exists(author.id).await? => Err(AppError::stale(Entity::Author, author.id)),
            None => Err(AppError::not_found(Entity::Author, author.id)),
        }
    }

    async fn delete_by_id(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
