//! Subscription registry

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, Entity},
    models::member::Member,
    repository::Repository,
};

#[derive(Clone)]
pub struct SubscriptionsService {
    repository: Repository,
}

impl SubscriptionsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Register interest in a book. A second subscription to the same book is a conflict.
    pub async fn subscribe(&self, member_id: Uuid, book_id: Uuid) -> AppResult<()> {
        let mut member = self.member(member_id).await?;
        if self.repository.books.find_by_id(book_id).await?.is_none() {
            return Err(AppError::not_found(Entity::Book, book_id));
        }

        member.subscribe(book_id)?;
        self.repository.members.save(&member).await?;

        tracing::info!("Member {} subscribed to book {}", member_id, book_id);
        Ok(())
    }

    /// Drop a subscription; unknown subscriptions are ignored
    pub async fn unsubscribe(&self, member_id: Uuid, book_id: Uuid) -> AppResult<()> {
        let mut member = self.member(member_id).await?;

        if member.unsubscribe(book_id) {
            self.repository.members.save(&member).await?;
            tracing::info!("Member {} unsubscribed from book {}", member_id, book_id);
        } else {
            tracing::debug!("Member {} was not subscribed to book {}", member_id, book_id);
        }
        Ok(())
    }

    pub async fn subscribers(&self, book_id: Uuid) -> AppResult<Vec<Member>> {
        self.repository.members.find_subscribers(book_id).await
    }

    async fn member(&self, id: Uuid) -> AppResult<Member> {
        self.repository
            .members
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(Entity::Member, id))
    }
}
