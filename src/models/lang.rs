//! Languages and bilingual text fields

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Languages the catalog is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Ar,
}

impl Lang {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Ar => "ar",
        }
    }

    /// Pick the language from an `Accept-Language` header value.
    ///
    /// Only the primary subtag of each entry is considered, in the order the
    /// client listed them. Anything unsupported falls back to English.
    pub fn from_accept_language(header: &str) -> Self {
        header
            .split(',')
            .filter_map(|entry| entry.split(';').next())
            .filter_map(|tag| tag.trim().split('-').next())
            .find_map(|primary| primary.parse().ok())
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" => Ok(Lang::En),
            "ar" => Ok(Lang::Ar),
            _ => Err(format!("Unsupported language: {}", s)),
        }
    }
}

/// Text that must exist in both languages (titles, names)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct LocalizedText {
    #[validate(length(min = 1, message = "English text is required"))]
    pub en: String,
    #[validate(length(min = 1, message = "Arabic text is required"))]
    pub ar: String,
}

impl LocalizedText {
    pub fn get(&self, lang: Lang) -> &str {
        match lang {
            Lang::En => &self.en,
            Lang::Ar if !self.ar.is_empty() => &self.ar,
            Lang::Ar => &self.en,
        }
    }
}

/// Optional bilingual text (descriptions, biographies)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LocalizedNote {
    pub en: Option<String>,
    pub ar: Option<String>,
}

impl LocalizedNote {
    /// Requested language first, English as fallback
    pub fn get(&self, lang: Lang) -> Option<&str> {
        let preferred = match lang {
            Lang::En => self.en.as_deref(),
            Lang::Ar => self.ar.as_deref(),
        };
        preferred.or(self.en.as_deref())
    }
}
