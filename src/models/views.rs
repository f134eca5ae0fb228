//! Read models returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FilmList, ListStatus, Visibility};

/// Display metadata for a catalog film
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilmSummary {
    pub id: String,
    pub title: String,
    pub image_url: Option<String>,
}

/// User as known to the identity collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// Public face of a user: list owners, reviewers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl From<UserRecord> for UserSummary {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            name: user.name,
            avatar_url: user.avatar_url,
        }
    }
}

impl UserSummary {
    /// Stand-in for owners the identity collaborator no longer knows
    pub fn unknown(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            avatar_url: None,
        }
    }
}

/// A user's relationship to a film plus the film-wide aggregates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionView {
    pub film_id: String,
    pub user_rating: Option<i16>,
    pub user_comment: Option<String>,
    pub is_favorite: bool,
    pub average_rating: f64,
    pub total_ratings: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatedFilmSummary {
    pub film: FilmSummary,
    pub user_rating: i16,
    pub user_comment: Option<String>,
    pub rated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewView {
    pub user: UserSummary,
    pub rating: Option<i16>,
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Compact list card with a short film preview
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListSummary {
    pub list_id: String,
    pub name: String,
    pub tag: String,
    pub visibility: Visibility,
    pub film_count: usize,
    pub owner: UserSummary,
    pub films: Vec<FilmSummary>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListDetailView {
    pub list_id: String,
    pub name: String,
    pub description: Option<String>,
    pub tag: String,
    pub visibility: Visibility,
    pub status: ListStatus,
    pub owner: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub films: Vec<FilmSummary>,
}

impl ListDetailView {
    pub fn new(list: FilmList, owner: UserSummary, films: Vec<FilmSummary>) -> Self {
        Self {
            list_id: list.id,
            name: list.name,
            description: list.description,
            tag: list.tag,
            visibility: list.visibility,
            status: list.status,
            owner,
            created_at: list.created_at,
            updated_at: list.updated_at,
            films,
        }
    }
}
