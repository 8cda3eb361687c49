//! In-process document store
//!
//! All collections sit behind one mutex, so every operation (including the
//! paired member/book commit) is a single critical section. No lock is held
//! across an await point.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{AuthorStore, BookStore, CirculationStore, MemberStore};
use crate::{
    error::{AppError, AppResult, Entity, ErrorCode},
    models::{Author, Book, BookQuery, Member},
};

#[derive(Default)]
struct Collections {
    books: HashMap<Uuid, Book>,
    members: HashMap<Uuid, Member>,
    authors: HashMap<Uuid, Author>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

fn same(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

impl Collections {
    fn member_clash(&self, username: &str, email: &str, exclude: Option<Uuid>) -> Option<&Member> {
        self.members.values().find(|m| {
            Some(m.id) != exclude && (same(&m.username, username) || same(&m.email, email))
        })
    }

    fn author_clash(&self, email: &str, exclude: Option<Uuid>) -> Option<&Author> {
        self.authors
            .values()
            .find(|a| Some(a.id) != exclude && same(&a.email, email))
    }

    /// Version check shared by every save
    fn check_version(entity: Entity, id: Uuid, stored: Option<i32>, given: i32) -> AppResult<()> {
        match stored {
            None => Err(AppError::not_found(entity, id)),
            Some(version) if version != given => Err(AppError::stale(entity, id)),
            Some(_) => Ok(()),
        }
    }

    fn save_member(&mut self, member: &Member) -> AppResult<Member> {
        let stored = self.members.get(&member.id).map(|m| m.version);
        Self::check_version(Entity::Member, member.id, stored, member.version)?;
        if self.member_clash(&member.username, &member.email, Some(member.id)).is_some() {
            return Err(AppError::conflict(
                ErrorCode::AlreadyExists,
                "Username or email is already in use",
            ));
        }
        let mut saved = member.clone();
        saved.version += 1;
        saved.updated_at = Utc::now();
        self.members.insert(saved.id, saved.clone());
        Ok(saved)
    }

    fn save_book(&mut self, book: &Book) -> AppResult<Book> {
        let stored = self.books.get(&book.id).map(|b| b.version);
        Self::check_version(Entity::Book, book.id, stored, book.version)?;
        let mut saved = book.clone();
        saved.version += 1;
        saved.updated_at = Utc::now();
        self.books.insert(saved.id, saved.clone());
        Ok(saved)
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        Ok(self.inner.lock().books.get(&id).cloned())
    }

    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        let inner = self.inner.lock();
        Ok(inner.books.values().find(|b| b.isbn == isbn).cloned())
    }

    async fn find(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let inner = self.inner.lock();
        let mut books: Vec<Book> = inner
            .books
            .values()
            .filter(|b| query.matches(b))
            .cloned()
            .collect();
        drop(inner);

        books.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.author_id.cmp(&b.author_id))
        });

        Ok(books
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .collect())
    }

    async fn insert(&self, book: &Book) -> AppResult<Book> {
        let mut inner = self.inner.lock();
        if inner.books.values().any(|b| b.isbn == book.isbn) {
            return Err(AppError::conflict(
                ErrorCode::AlreadyExists,
                format!("A book with ISBN {} already exists", book.isbn),
            ));
        }
        let mut stored = book.clone();
        stored.version = 0;
        inner.books.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn save(&self, book: &Book) -> AppResult<Book> {
        self.inner.lock().save_book(book)
    }

    async fn delete_by_id(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.inner.lock().books.remove(&id).is_some())
    }

    async fn count(&self, published: Option<bool>) -> AppResult<i64> {
        let inner = self.inner.lock();
        let count = inner
            .books
            .values()
            .filter(|b| published.map_or(true, |p| b.is_published == p))
            .count();
        Ok(count as i64)
    }

    async fn count_by_author(&self, author_id: Uuid) -> AppResult<i64> {
        let inner = self.inner.lock();
        Ok(inner.books.values().filter(|b| b.author_id == author_id).count() as i64)
    }
}

#[async_trait]
impl MemberStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Member>> {
        Ok(self.inner.lock().members.get(&id).cloned())
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
        exclude: Option<Uuid>,
    ) -> AppResult<Option<Member>> {
        let inner = self.inner.lock();
        Ok(inner.member_clash(username, email, exclude).cloned())
    }

    async fn find_subscribers(&self, book_id: Uuid) -> AppResult<Vec<Member>> {
        let inner = self.inner.lock();
        let mut subscribers: Vec<Member> = inner
            .members
            .values()
            .filter(|m| m.is_subscribed(book_id))
            .cloned()
            .collect();
        subscribers.sort_by_key(|m| m.created_at);
        Ok(subscribers)
    }

    async fn insert(&self, member: &Member) -> AppResult<Member> {
        let mut inner = self.inner.lock();
        if inner.member_clash(&member.username, &member.email, None).is_some() {
            return Err(AppError::conflict(
                ErrorCode::AlreadyExists,
                format!(
                    "A member with username {} or email {} already exists",
                    member.username, member.email
                ),
            ));
        }
        let mut stored = member.clone();
        stored.version = 0;
        inner.members.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn save(&self, member: &Member) -> AppResult<Member> {
        self.inner.lock().save_member(member)
    }

    async fn delete_by_id(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.inner.lock().members.remove(&id).is_some())
    }

    async fn count_borrowers(&self, book_id: Uuid) -> AppResult<i64> {
        let inner = self.inner.lock();
        let count = inner
            .members
            .values()
            .filter(|m| m.loan_for(book_id).is_some())
            .count();
        Ok(count as i64)
    }

    async fn return_rates(&self) -> AppResult<Vec<i32>> {
        let inner = self.inner.lock();
        Ok(inner.members.values().map(|m| m.return_rate).collect())
    }
}

#[async_trait]
impl AuthorStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Author>> {
        Ok(self.inner.lock().authors.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str, exclude: Option<Uuid>) -> AppResult<Option<Author>> {
        Ok(self.inner.lock().author_clash(email, exclude).cloned())
    }

    async fn exists(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.inner.lock().authors.contains_key(&id))
    }

    async fn insert(&self, author: &Author) -> AppResult<Author> {
        let mut inner = self.inner.lock();
        if inner.author_clash(&author.email, None).is_some() {
            return Err(AppError::conflict(
                ErrorCode::AlreadyExists,
                format!("An author with email {} already exists", author.email),
            ));
        }
        let mut stored = author.clone();
        stored.version = 0;
        inner.authors.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn save(&self, author: &Author) -> AppResult<Author> {
        let mut inner = self.inner.lock();
        let stored = inner.authors.get(&author.id).map(|a| a.version);
        Collections::check_version(Entity::Author, author.id, stored, author.version)?;
        if inner.author_clash(&author.email, Some(author.id)).is_some() {
            return Err(AppError::conflict(
                ErrorCode::AlreadyExists,
                format!("An author with email {} already exists", author.email),
            ));
        }
        let mut saved = author.clone();
        saved.version += 1;
        saved.updated_at = Utc::now();
        inner.authors.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn delete_by_id(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.inner.lock().authors.remove(&id).is_some())
    }
}

#[async_trait]
impl CirculationStore for MemoryStore {
    async fn commit(&self, member: &Member, book: &Book) -> AppResult<(Member, Book)> {
        let mut inner = self.inner.lock();

        // Check both versions before writing either document
        let member_version = inner.members.get(&member.id).map(|m| m.version);
        Collections::check_version(Entity::Member, member.id, member_version, member.version)?;
        let book_version = inner.books.get(&book.id).map(|b| b.version);
        Collections::check_version(Entity::Book, book.id, book_version, book.version)?;

        let saved_member = inner.save_member(member)?;
        let saved_book = inner.save_book(book)?;
        Ok((saved_member, saved_book))
    }
}
