//! Author model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::lang::{Lang, LocalizedNote, LocalizedText};

/// Author document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: Uuid,
    pub name: LocalizedText,
    pub email: String,
    pub biography: LocalizedNote,
    pub profile_image_url: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Author {
    pub fn new(data: CreateAuthor, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: data.name,
            email: data.email,
            biography: data.biography,
            profile_image_url: None,
            birth_date: data.birth_date,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn profile(&self, lang: Lang) -> AuthorProfile {
        AuthorProfile {
            name: self.name.get(lang).to_string(),
            biography: self.biography.get(lang).map(str::to_string),
            profile_image_url: self.profile_image_url.clone(),
        }
    }

    pub fn apply(&mut self, update: UpdateAuthor) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(biography) = update.biography {
            self.biography = biography;
        }
        if let Some(birth_date) = update.birth_date {
            self.birth_date = Some(birth_date);
        }
    }
}

/// Flat database row for an author
#[derive(Debug, Clone, FromRow)]
pub struct AuthorRow {
    pub id: Uuid,
    pub name_en: String,
    pub name_ar: String,
    pub email: String,
    pub biography_en: Option<String>,
    pub biography_ar: Option<String>,
    pub profile_image_url: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AuthorRow> for Author {
    fn from(row: AuthorRow) -> Self {
        Self {
            id: row.id,
            name: LocalizedText {
                en: row.name_en,
                ar: row.name_ar,
            },
            email: row.email,
            biography: LocalizedNote {
                en: row.biography_en,
                ar: row.biography_ar,
            },
            profile_image_url: row.profile_image_url,
            birth_date: row.birth_date,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Author profile resolved for one language
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorProfile {
    pub name: String,
    pub biography: Option<String>,
    pub profile_image_url: Option<String>,
}

/// Create author request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuthor {
    #[validate(nested)]
    pub name: LocalizedText,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[serde(default)]
    pub biography: LocalizedNote,
    pub birth_date: Option<NaiveDate>,
}

/// Update author request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateAuthor {
    #[validate(nested)]
    pub name: Option<LocalizedText>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub biography: Option<LocalizedNote>,
    pub birth_date: Option<NaiveDate>,
}
