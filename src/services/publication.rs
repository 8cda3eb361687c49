//! Book publication and subscriber notification

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{email::Mailer, subscriptions::SubscriptionsService};
use crate::{
    error::{AppError, AppResult, Entity},
    models::book::Book,
    repository::Repository,
};

pub const PUBLISHED_SUBJECT: &str = "Book Published";

#[derive(Clone)]
pub struct PublicationService {
    repository: Repository,
    subscriptions: SubscriptionsService,
    mailer: Arc<dyn Mailer>,
}

impl PublicationService {
    pub fn new(repository: Repository, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            subscriptions: SubscriptionsService::new(repository.clone()),
            repository,
            mailer,
        }
    }

    pub async fn publish(&self, book_id: Uuid) -> AppResult<Book> {
        self.publish_at(book_id, Utc::now()).await
    }

    /// Mark the book published, then notify its subscribers on a best-effort basis
    pub async fn publish_at(&self, book_id: Uuid, now: DateTime<Utc>) -> AppResult<Book> {
        let mut book = self.book(book_id).await?;
        book.publish(now)?;
        let book = self.repository.books.save(&book).await?;

        tracing::info!("Published book {}", book.id);
        self.notify_subscribers(&book).await;

        Ok(book)
    }

    pub async fn unpublish(&self, book_id: Uuid) -> AppResult<Book> {
        let mut book = self.book(book_id).await?;
        book.unpublish()?;
        let book = self.repository.books.save(&book).await?;

        tracing::info!("Unpublished book {}", book.id);
        Ok(book)
    }

    /// Failures here are logged and never surface to the caller
    async fn notify_subscribers(&self, book: &Book) {
        let recipients: Vec<String> = match self.subscriptions.subscribers(book.id).await {
            Ok(members) => members.into_iter().map(|m| m.email).collect(),
            Err(e) => {
                tracing::warn!("Could not load subscribers of book {}: {}", book.id, e);
                return;
            }
        };

        if recipients.is_empty() {
            tracing::debug!("Book {} has no subscribers to notify", book.id);
            return;
        }

        let body = format!("The book \"{}\" has been published.", book.title.en);
        if let Err(e) = self.mailer.send_email(&recipients, PUBLISHED_SUBJECT, &body) {
            tracing::warn!("Failed to notify subscribers of book {}: {}", book.id, e);
        }
    }

    async fn book(&self, id: Uuid) -> AppResult<Book> {
        self.repository
            .books
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(Entity::Book, id))
    }
}
