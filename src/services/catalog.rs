//! Catalog service for book management

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;
use validator::Validate;

use super::uploads::{ImageUpload, UploadService};
use crate::{
    error::{AppError, AppResult, Entity, ErrorCode},
    models::book::{Book, BookQuery, BookSummary, CreateBook, UpdateBook},
    repository::Repository,
};

/// Attempts at drawing an unused ISBN before giving up
const ISBN_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    uploads: UploadService,
}

impl CatalogService {
    pub fn new(repository: Repository, uploads: UploadService) -> Self {
        Self {
            repository,
            uploads,
        }
    }

    /// Add a book to the catalog. New books start unpublished.
    pub async fn create_book(&self, data: CreateBook) -> AppResult<Book> {
        data.validate()?;
        self.ensure_author(data.author_id).await?;

        let isbn = self.unused_isbn().await?;
        let book = self
            .repository
            .books
            .insert(&Book::new(data, isbn, Utc::now()))
            .await?;

        tracing::info!("Added book {} ({})", book.id, book.isbn);
        Ok(book)
    }

    /// List books, newest first
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<BookSummary>> {
        let books = self.repository.books.find(query).await?;
        Ok(books.into_iter().map(BookSummary::from).collect())
    }

    pub async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        self.repository
            .books
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(Entity::Book, id))
    }

    /// Update the mutable fields of a book
    pub async fn update_book(&self, id: Uuid, data: UpdateBook) -> AppResult<Book> {
        data.validate()?;

        let mut book = self.get_book(id).await?;
        if let Some(author_id) = data.author_id {
            if author_id != book.author_id {
                self.ensure_author(author_id).await?;
            }
        }

        book.apply(data);
        self.repository.books.save(&book).await
    }

    /// Delete a book nobody currently has on loan
    pub async fn delete_book(&self, id: Uuid) -> AppResult<()> {
        let book = self.get_book(id).await?;

        let borrowers = self.repository.members.count_borrowers(id).await?;
        if borrowers > 0 {
            return Err(AppError::conflict(
                ErrorCode::BookHasLoans,
                format!("Book {} is on loan to {} member(s)", id, borrowers),
            ));
        }

        if !self.repository.books.delete_by_id(id).await? {
            return Err(AppError::not_found(Entity::Book, id));
        }

        if let Some(ref cover) = book.cover_image_url {
            self.uploads.delete(cover).await;
        }

        tracing::info!("Deleted book {}", id);
        Ok(())
    }

    /// Replace the cover image of a book
    pub async fn set_cover(&self, id: Uuid, image: ImageUpload) -> AppResult<Book> {
        let mut book = self.get_book(id).await?;
        let url = self.uploads.store_image(image).await?;

        let previous = book.cover_image_url.replace(url.clone());
        match self.repository.books.save(&book).await {
            Ok(saved) => {
                if let Some(ref old) = previous {
                    self.uploads.delete(old).await;
                }
                Ok(saved)
            }
            Err(e) => {
                self.uploads.delete(&url).await;
                Err(e)
            }
        }
    }

    async fn ensure_author(&self, author_id: Uuid) -> AppResult<()> {
        if self.repository.authors.exists(author_id).await? {
            Ok(())
        } else {
            Err(AppError::not_found(Entity::Author, author_id))
        }
    }

    async fn unused_isbn(&self) -> AppResult<String> {
        for _ in 0..ISBN_ATTEMPTS {
            let isbn = generate_isbn();
            if self.repository.books.find_by_isbn(&isbn).await?.is_none() {
                return Ok(isbn);
            }
            tracing::debug!("Generated ISBN {} already taken, drawing again", isbn);
        }
        Err(AppError::conflict(
            ErrorCode::AlreadyExists,
            "Could not allocate a unique ISBN",
        ))
    }
}

/// Random ISBN-13 in the 978 prefix with a valid check digit
pub fn generate_isbn() -> String {
    let mut rng = rand::thread_rng();
    let mut digits: Vec<u32> = vec![9, 7, 8];
    digits.extend((0..9).map(|_| rng.gen_range(0..10)));
    digits.push(check_digit(&digits));
    digits.iter().map(|d| char::from_digit(*d, 10).unwrap_or('0')).collect()
}

/// EAN-13 check digit over the first twelve digits
fn check_digit(digits: &[u32]) -> u32 {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
        .sum();
    (10 - sum % 10) % 10
}
