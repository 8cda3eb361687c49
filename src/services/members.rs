//! Member directory service

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult, Entity, ErrorCode},
    models::member::{CreateMember, Member, MemberProfile, UpdateMember},
    repository::Repository,
};

#[derive(Clone)]
pub struct MembersService {
    repository: Repository,
}

impl MembersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Register a member with an empty loan history and a return rate of zero
    pub async fn add_member(&self, data: CreateMember) -> AppResult<Member> {
        data.validate()?;
        self.ensure_unique(&data.username, &data.email, None).await?;

        let member = self
            .repository
            .members
            .insert(&Member::new(data, Utc::now()))
            .await?;
        tracing::info!("Registered member {} ({})", member.id, member.username);
        Ok(member)
    }

    pub async fn update_member(&self, id: Uuid, data: UpdateMember) -> AppResult<Member> {
        data.validate()?;
        let mut member = self.get_member(id).await?;

        if data.username.is_some() || data.email.is_some() {
            let username = data.username.as_deref().unwrap_or(&member.username);
            let email = data.email.as_deref().unwrap_or(&member.email);
            self.ensure_unique(username, email, Some(id)).await?;
        }

        member.apply(data);
        self.repository.members.save(&member).await
    }

    /// Delete a member with no outstanding loans
    pub async fn delete_member(&self, id: Uuid) -> AppResult<()> {
        let member = self.get_member(id).await?;
        if !member.borrowed_books.is_empty() {
            return Err(AppError::conflict(
                ErrorCode::MemberHasLoans,
                format!(
                    "Member {} must return {} book(s) before leaving",
                    id,
                    member.borrowed_books.len()
                ),
            ));
        }

        if !self.repository.members.delete_by_id(id).await? {
            return Err(AppError::not_found(Entity::Member, id));
        }
        tracing::info!("Deleted member {}", id);
        Ok(())
    }

    pub async fn get_member(&self, id: Uuid) -> AppResult<Member> {
        self.repository
            .members
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(Entity::Member, id))
    }

    pub async fn get_profile(&self, id: Uuid) -> AppResult<MemberProfile> {
        Ok(self.get_member(id).await?.into())
    }

    async fn ensure_unique(&self, username: &str, email: &str, exclude: Option<Uuid>) -> AppResult<()> {
        if let Some(existing) = self
            .repository
            .members
            .find_by_username_or_email(username, email, exclude)
            .await?
        {
            let field = if existing.username.eq_ignore_ascii_case(username) {
                "username"
            } else {
                "email"
            };
            return Err(AppError::conflict(
                ErrorCode::AlreadyExists,
                format!("A member with this {} already exists", field),
            ));
        }
        Ok(())
    }
}
