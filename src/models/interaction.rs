use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 10;
pub const MAX_COMMENT_LEN: usize = 255;

/// Natural identity of an interaction row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InteractionKey {
    pub user_id: String,
    pub film_id: String,
}

impl InteractionKey {
    pub fn new(user_id: impl Into<String>, film_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            film_id: film_id.into(),
        }
    }
}

/// One user's rating, favorite flag and comment for one film
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Interaction {
    pub user_id: String,
    pub film_id: String,
    pub rating: Option<i16>,
    pub is_favorite: bool,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Rows written before update tracking may lack this
    pub updated_at: Option<DateTime<Utc>>,
}

impl Interaction {
    /// Fresh, unsaved row for a pair that has never been touched
    pub fn shell(key: &InteractionKey, now: DateTime<Utc>) -> Self {
        Self {
            user_id: key.user_id.clone(),
            film_id: key.film_id.clone(),
            rating: None,
            is_favorite: false,
            comment: None,
            created_at: now,
            updated_at: None,
        }
    }

    pub fn key(&self) -> InteractionKey {
        InteractionKey::new(&self.user_id, &self.film_id)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }

    /// Time of the most recent change, for "latest" orderings
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}

/// A single write against one interaction row
///
/// Stores apply a change to the current row atomically, creating the row when
/// the pair has never been touched. Fields the change does not name keep
/// whatever value is stored at the moment of the write.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionChange {
    Rate {
        rating: i16,
        comment: Option<String>,
    },
    ToggleFavorite,
    Comment(Option<String>),
}

impl Interaction {
    pub fn apply(&mut self, change: &InteractionChange, now: DateTime<Utc>) {
        match change {
            InteractionChange::Rate { rating, comment } => {
                self.rating = Some(*rating);
                self.comment = comment.clone();
            }
            InteractionChange::ToggleFavorite => self.is_favorite = !self.is_favorite,
            InteractionChange::Comment(comment) => self.comment = comment.clone(),
        }
        self.touch(now);
    }
}

/// Validates a raw rating and narrows it to the stored width
pub fn validate_rating(rating: i32) -> AppResult<i16> {
    if rating < MIN_RATING as i32 || rating > MAX_RATING as i32 {
        return Err(AppError::InvalidRating {
            got: rating,
            min: MIN_RATING as u8,
            max: MAX_RATING as u8,
        });
    }
    Ok(rating as i16)
}

/// Blank and absent comments both clear the stored comment.
pub fn normalize_comment(comment: Option<String>) -> AppResult<Option<String>> {
    let Some(comment) = comment else {
        return Ok(None);
    };

    let trimmed = comment.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if trimmed.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::InvalidInput(format!(
            "Comment must be at most {} characters",
            MAX_COMMENT_LEN
        )));
    }

    Ok(Some(trimmed.to_string()))
}

/// Sum and count of the non-null ratings for one film
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct RatingStats {
    pub sum: i64,
    pub count: i64,
}

impl RatingStats {
    /// Mean rounded half-up to one decimal place; 0.0 when nobody rated.
    pub fn average(&self) -> f64 {
        if self.count <= 0 {
            return 0.0;
        }
        // floor(10 * sum / count + 0.5) in integer arithmetic
        let tenths = (20 * self.sum + self.count) / (2 * self.count);
        tenths as f64 / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_touches_only_named_fields() {
        let now = Utc::now();
        let mut row = Interaction::shell(&InteractionKey::new("USR1", "FLM1"), now);
        row.comment = Some("Zither".to_string());

        row.apply(&InteractionChange::ToggleFavorite, now);
        assert!(row.is_favorite);
        assert_eq!(row.comment.as_deref(), Some("Zither"));
        assert_eq!(row.updated_at, Some(now));

        row.apply(
            &InteractionChange::Rate {
                rating: 7,
                comment: None,
            },
            now,
        );
        assert_eq!(row.rating, Some(7));
        assert_eq!(row.comment, None);
        assert!(row.is_favorite);
    }

    #[test]
    fn test_validate_rating_bounds() {
        assert_eq!(validate_rating(1).unwrap(), 1);
        assert_eq!(validate_rating(10).unwrap(), 10);
        assert!(matches!(
            validate_rating(0),
            Err(AppError::InvalidRating { got: 0, .. })
        ));
        assert!(matches!(
            validate_rating(11),
            Err(AppError::InvalidRating { got: 11, .. })
        ));
    }

    #[test]
    fn test_normalize_comment_clears_blank() {
        assert_eq!(normalize_comment(None).unwrap(), None);
        assert_eq!(normalize_comment(Some("   ".to_string())).unwrap(), None);
        assert_eq!(
            normalize_comment(Some("  great score ".to_string())).unwrap(),
            Some("great score".to_string())
        );
    }

    #[test]
    fn test_normalize_comment_rejects_overlong() {
        let long = "x".repeat(MAX_COMMENT_LEN + 1);
        assert!(matches!(
            normalize_comment(Some(long)),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_average_rounds_half_up() {
        let stats = RatingStats { sum: 23, count: 3 };
        assert_eq!(stats.average(), 7.7);

        // 7.65 -> 7.7
        let stats = RatingStats { sum: 153, count: 20 };
        assert_eq!(stats.average(), 7.7);

        // 7.64 -> 7.6
        let stats = RatingStats {
            sum: 191,
            count: 25,
        };
        assert_eq!(stats.average(), 7.6);
    }

    #[test]
    fn test_average_without_ratings_is_zero() {
        assert_eq!(RatingStats::default().average(), 0.0);
    }

    #[test]
    fn test_last_activity_falls_back_to_creation() {
        let created = Utc::now();
        let mut row = Interaction::shell(&InteractionKey::new("USR1", "FLM1"), created);
        assert_eq!(row.last_activity(), created);

        let later = created + chrono::Duration::minutes(5);
        row.touch(later);
        assert_eq!(row.last_activity(), later);
    }
}
