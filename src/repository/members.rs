//! Members repository for database operations

use async_trait::async_trait;
use sqlx::{postgres::PgExecutor, types::Json, Pool, Postgres};
use uuid::Uuid;

use super::{books, CirculationStore, MemberStore};
use crate::{
    error::{AppError, AppResult, Entity},
    models::{
        book::Book,
        member::{Member, MemberRow},
    },
};

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Postgres>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Versioned update usable inside a transaction
async fn update_versioned<'e, E>(executor: E, member: &Member) -> AppResult<Option<Member>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, MemberRow>(
        r#"
        UPDATE members SET
            name = $3, username = $4, email = $5, birth_date = $6,
            subscribed_books = $7, borrowed_books = $8, return_rate = $9,
            version = version + 1, updated_at = NOW()
        WHERE id = $1 AND version = $2
        RETURNING *
        "#,
    )
    .bind(member.id)
    .bind(member.version)
    .bind(member.name.clone())
    .bind(member.username.clone())
    .bind(member.email.clone())
    .bind(member.birth_date)
    .bind(member.subscribed_books.clone())
    .bind(Json(member.borrowed_books.clone()))
    .bind(member.return_rate)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(Member::from))
}

#[async_trait]
impl MemberStore for MembersRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Member>> {
        let row = sqlx::query_as::<_, MemberRow>("SELECT * FROM members WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Member::from))
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
        exclude: Option<Uuid>,
    ) -> AppResult<Option<Member>> {
        let row = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT * FROM members
            WHERE (LOWER(username) = LOWER($1) OR LOWER(email) = LOWER($2))
              AND ($3::uuid IS NULL OR id != $3)
            LIMIT 1
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(exclude)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Member::from))
    }

    async fn find_subscribers(&self, book_id: Uuid) -> AppResult<Vec<Member>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            "SELECT * FROM members WHERE $1 = ANY(subscribed_books) ORDER BY created_at",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Member::from).collect())
    }

    async fn insert(&self, member: &Member) -> AppResult<Member> {
        let row = sqlx::query_as::<_, MemberRow>(
            r#"
            INSERT INTO members (
                id, name, username, email, birth_date, subscribed_books,
                borrowed_books, return_rate, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $9)
            RETURNING *
            "#,
        )
        .bind(member.id)
        .bind(&member.name)
        .bind(&member.username)
        .bind(&member.email)
        .bind(member.birth_date)
        .bind(&member.subscribed_books)
        .bind(Json(&member.borrowed_books))
        .bind(member.return_rate)
        .bind(member.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            super::unique_violation(e, || {
                format!(
                    "A member with username {} or email {} already exists",
                    member.username, member.email
                )
            })
        })?;

        Ok(row.into())
    }

    async fn save(&self, member: &Member) -> AppResult<Member> {
        let saved = update_versioned(&self.pool, member).await.map_err(|e| match e {
            AppError::Database(db) => super::unique_violation(db, || {
                "Username or email is already in use".to_string()
            }),
            other => other,
        })?;

        match saved {
            Some(saved) => Ok(saved),
            None if self.find_by_id(member.id).await?.is_some() => {
                Err(AppError::stale(Entity::Member, member.id))
            }
            None => Err(AppError::not_found(Entity::Member, member.id)),
        }
    }

    async fn delete_by_id(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_borrowers(&self, book_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM members WHERE borrowed_books @> jsonb_build_array(jsonb_build_object('bookId', $1::text))",
        )
        .bind(book_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn return_rates(&self) -> AppResult<Vec<i32>> {
        let rates: Vec<i32> = sqlx::query_scalar("SELECT return_rate FROM members")
            .fetch_all(&self.pool)
            .await?;
        Ok(rates)
    }
}

#[async_trait]
impl CirculationStore for MembersRepository {
    async fn commit(&self, member: &Member, book: &Book) -> AppResult<(Member, Book)> {
        let mut tx = self.pool.begin().await?;

        // Dropping the transaction on an early return rolls it back
        let saved_member = update_versioned(&mut *tx, member)
            .await?
            .ok_or_else(|| AppError::stale(Entity::Member, member.id))?;
        let saved_book = books::update_versioned(&mut *tx, book)
            .await?
            .ok_or_else(|| AppError::stale(Entity::Book, book.id))?;

        tx.commit().await?;

        Ok((saved_member, saved_book))
    }
}
