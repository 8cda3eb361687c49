//! Author directory service

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::uploads::{ImageUpload, UploadService};
use crate::{
    error::{AppError, AppResult, Entity, ErrorCode},
    models::{
        author::{Author, AuthorProfile, CreateAuthor, UpdateAuthor},
        Lang,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthorsService {
    repository: Repository,
    uploads: UploadService,
}

impl AuthorsService {
    pub fn new(repository: Repository, uploads: UploadService) -> Self {
        Self {
            repository,
            uploads,
        }
    }

    pub async fn add_author(&self, data: CreateAuthor) -> AppResult<Author> {
        data.validate()?;
        self.ensure_email_free(&data.email, None).await?;

        let author = self
            .repository
            .authors
            .insert(&Author::new(data, Utc::now()))
            .await?;
        tracing::info!("Added author {}", author.id);
        Ok(author)
    }

    pub async fn update_author(&self, id: Uuid, data: UpdateAuthor) -> AppResult<Author> {
        data.validate()?;
        let mut author = self.get_author(id).await?;

        if let Some(ref email) = data.email {
            self.ensure_email_free(email, Some(id)).await?;
        }

        author.apply(data);
        self.repository.authors.save(&author).await
    }

    /// Delete an author no book refers to
    pub async fn delete_author(&self, id: Uuid) -> AppResult<()> {
        let author = self.get_author(id).await?;

        let books = self.repository.books.count_by_author(id).await?;
        if books > 0 {
            return Err(AppError::conflict(
                ErrorCode::AuthorHasBooks,
                format!("Author {} still has {} book(s) in the catalog", id, books),
            ));
        }

        if !self.repository.authors.delete_by_id(id).await? {
            return Err(AppError::not_found(Entity::Author, id));
        }
        if let Some(ref image) = author.profile_image_url {
            self.uploads.delete(image).await;
        }

        tracing::info!("Deleted author {}", id);
        Ok(())
    }

    pub async fn get_author(&self, id: Uuid) -> AppResult<Author> {
        self.repository
            .authors
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(Entity::Author, id))
    }

    /// Profile with name and biography in the requested language
    pub async fn get_profile(&self, id: Uuid, lang: Lang) -> AppResult<AuthorProfile> {
        Ok(self.get_author(id).await?.profile(lang))
    }

    pub async fn set_profile_image(&self, id: Uuid, image: ImageUpload) -> AppResult<Author> {
        let mut author = self.get_author(id).await?;
        let url = self.uploads.store_image(image).await?;

        let previous = author.profile_image_url.replace(url.clone());
        match self.repository.authors.save(&author).await {
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

    async fn ensure_email_free(&self, email: &str, exclude: Option<Uuid>) -> AppResult<()> {
        match self.repository.authors.find_by_email(email, exclude).await? {
            Some(_) => Err(AppError::conflict(
                ErrorCode::AlreadyExists,
                format!("An author with email {} already exists", email),
            )),
            None => Ok(()),
        }
    }
}
