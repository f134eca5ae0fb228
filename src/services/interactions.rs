use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        interaction::{normalize_comment, validate_rating},
        FilmSummary, Interaction, InteractionChange, InteractionKey, InteractionView,
        RatedFilmSummary, ReviewView, UserSummary,
    },
    references::{FilmCatalog, IdentityReference},
    store::InteractionStore,
};

/// Bounds for `latest_rated`; out-of-range limits are clamped, not rejected
pub const MIN_LATEST_LIMIT: i64 = 1;
pub const MAX_LATEST_LIMIT: i64 = 20;

/// Ratings, favorites and comments of users on films
///
/// Rows are created lazily on the first write for a pair. Each write is one
/// `InteractionChange` the store applies atomically, so concurrent callers on
/// the same pair never overwrite each other.
pub struct InteractionService {
    interactions: Arc<dyn InteractionStore>,
    identity: Arc<dyn IdentityReference>,
    catalog: Arc<dyn FilmCatalog>,
}

impl InteractionService {
    pub fn new(
        interactions: Arc<dyn InteractionStore>,
        identity: Arc<dyn IdentityReference>,
        catalog: Arc<dyn FilmCatalog>,
    ) -> Self {
        Self {
            interactions,
            identity,
            catalog,
        }
    }

    /// Sets the caller's rating and comment for a film
    pub async fn rate(
        &self,
        user_id: &str,
        film_id: &str,
        rating: i32,
        comment: Option<String>,
    ) -> AppResult<InteractionView> {
        let rating = validate_rating(rating)?;
        let comment = normalize_comment(comment)?;
        self.ensure_user(user_id).await?;
        self.ensure_film(film_id).await?;

        let change = InteractionChange::Rate { rating, comment };
        let interaction = self.write(user_id, film_id, &change).await?;

        tracing::info!(user_id = %user_id, film_id = %film_id, rating, "Film rated");

        self.view(film_id, Some(interaction)).await
    }

    /// Flips the favorite flag; rating and comment are left alone
    pub async fn toggle_favorite(
        &self,
        user_id: &str,
        film_id: &str,
    ) -> AppResult<InteractionView> {
        self.ensure_user(user_id).await?;
        self.ensure_film(film_id).await?;

        let interaction = self
            .write(user_id, film_id, &InteractionChange::ToggleFavorite)
            .await?;

        tracing::info!(
            user_id = %user_id,
            film_id = %film_id,
            is_favorite = interaction.is_favorite,
            "Favorite toggled"
        );

        self.view(film_id, Some(interaction)).await
    }

    /// Sets the comment only; a blank or absent comment clears it
    pub async fn add_comment(
        &self,
        user_id: &str,
        film_id: &str,
        comment: Option<String>,
    ) -> AppResult<InteractionView> {
        let comment = normalize_comment(comment)?;
        self.ensure_user(user_id).await?;
        self.ensure_film(film_id).await?;

        let cleared = comment.is_none();
        let interaction = self
            .write(user_id, film_id, &InteractionChange::Comment(comment))
            .await?;

        tracing::info!(user_id = %user_id, film_id = %film_id, cleared, "Comment saved");

        self.view(film_id, Some(interaction)).await
    }

    /// The caller's own interaction with a film plus the film-wide rating aggregate
    pub async fn status(&self, user_id: &str, film_id: &str) -> AppResult<InteractionView> {
        self.ensure_film(film_id).await?;

        let key = InteractionKey::new(user_id, film_id);
        let interaction = self.interactions.find(&key).await?;
        self.view(film_id, interaction).await
    }

    /// Films the user marked as favorite, most recently touched first
    pub async fn favorites(&self, user_id: &str) -> AppResult<Vec<FilmSummary>> {
        self.ensure_user(user_id).await?;

        let film_ids: Vec<String> = self
            .interactions
            .favorites(user_id)
            .await?
            .into_iter()
            .map(|i| i.film_id)
            .collect();

        self.catalog.summarize_many(&film_ids).await
    }

    /// Most recently rated films; `limit` is clamped to [1, 20]
    pub async fn latest_rated(
        &self,
        user_id: &str,
        limit: i64,
    ) -> AppResult<Vec<RatedFilmSummary>> {
        self.ensure_user(user_id).await?;

        let limit = limit.clamp(MIN_LATEST_LIMIT, MAX_LATEST_LIMIT);
        let rated = self.interactions.latest_rated(user_id, limit).await?;

        let film_ids: Vec<String> = rated.iter().map(|i| i.film_id.clone()).collect();
        let mut films: HashMap<String, FilmSummary> = self
            .catalog
            .summarize_many(&film_ids)
            .await?
            .into_iter()
            .map(|film| (film.id.clone(), film))
            .collect();

        let mut summaries = Vec::with_capacity(rated.len());
        for interaction in rated {
            let Some(rating) = interaction.rating else {
                continue;
            };
            let Some(film) = films.remove(&interaction.film_id) else {
                tracing::warn!(
                    user_id = %user_id,
                    film_id = %interaction.film_id,
                    "Rated film no longer in catalog, skipping"
                );
                continue;
            };
            summaries.push(RatedFilmSummary {
                film,
                user_rating: rating,
                rated_at: interaction.last_activity(),
                user_comment: interaction.comment,
            });
        }

        Ok(summaries)
    }

    /// Every rating or comment left on a film, newest first
    pub async fn film_reviews(&self, film_id: &str) -> AppResult<Vec<ReviewView>> {
        self.ensure_film(film_id).await?;

        let reviews = self.interactions.reviews(film_id).await?;

        let mut user_ids: Vec<String> = reviews.iter().map(|r| r.user_id.clone()).collect();
        user_ids.sort();
        user_ids.dedup();
        let users: HashMap<String, UserSummary> = self
            .identity
            .summarize_many(&user_ids)
            .await?
            .into_iter()
            .map(|user| (user.id.clone(), user))
            .collect();

        Ok(reviews
            .into_iter()
            .map(|review| ReviewView {
                user: users
                    .get(&review.user_id)
                    .cloned()
                    .unwrap_or_else(|| UserSummary::unknown(&review.user_id)),
                rating: review.rating,
                text: review.comment,
                created_at: review.created_at,
            })
            .collect())
    }

    async fn write(
        &self,
        user_id: &str,
        film_id: &str,
        change: &InteractionChange,
    ) -> AppResult<Interaction> {
        let key = InteractionKey::new(user_id, film_id);
        self.interactions.apply(&key, change, Utc::now()).await
    }

    async fn view(
        &self,
        film_id: &str,
        interaction: Option<Interaction>,
    ) -> AppResult<InteractionView> {
        let stats = self.interactions.rating_stats(film_id).await?;

        Ok(match interaction {
            Some(i) => InteractionView {
                film_id: film_id.to_string(),
                user_rating: i.rating,
                user_comment: i.comment,
                is_favorite: i.is_favorite,
                average_rating: stats.average(),
                total_ratings: stats.count,
            },
            None => InteractionView {
                film_id: film_id.to_string(),
                user_rating: None,
                user_comment: None,
                is_favorite: false,
                average_rating: stats.average(),
                total_ratings: stats.count,
            },
        })
    }

    async fn ensure_user(&self, user_id: &str) -> AppResult<()> {
        if !self.identity.exists(user_id).await? {
            return Err(AppError::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    async fn ensure_film(&self, film_id: &str) -> AppResult<()> {
        if !self.catalog.exists(film_id).await? {
            return Err(AppError::FilmNotFound(film_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorKind,
        references::{MockFilmCatalog, MockIdentityReference, StaticCatalog, StaticIdentity},
        store::{MemoryInteractionStore, MockInteractionStore},
    };
    use chrono::DateTime;
    use std::time::Duration;
    use tokio::sync::Barrier;
    use tokio_test::assert_ok;

    /// Holds every write until two callers are in flight, then lets both through
    struct GatedStore {
        inner: MemoryInteractionStore,
        gate: Barrier,
    }

    #[async_trait::async_trait]
    impl InteractionStore for GatedStore {
        async fn find(&self, key: &InteractionKey) -> AppResult<Option<Interaction>> {
            self.inner.find(key).await
        }

        async fn apply(
            &self,
            key: &InteractionKey,
            change: &InteractionChange,
            now: DateTime<Utc>,
        ) -> AppResult<Interaction> {
            self.gate.wait().await;
            self.inner.apply(key, change, now).await
        }

        async fn rating_stats(&self, film_id: &str) -> AppResult<crate::models::RatingStats> {
            self.inner.rating_stats(film_id).await
        }

        async fn favorites(&self, user_id: &str) -> AppResult<Vec<Interaction>> {
            self.inner.favorites(user_id).await
        }

        async fn latest_rated(&self, user_id: &str, limit: i64) -> AppResult<Vec<Interaction>> {
            self.inner.latest_rated(user_id, limit).await
        }

        async fn reviews(&self, film_id: &str) -> AppResult<Vec<Interaction>> {
            self.inner.reviews(film_id).await
        }
    }

    fn gated_service() -> (Arc<GatedStore>, InteractionService) {
        let store = Arc::new(GatedStore {
            inner: MemoryInteractionStore::new(),
            gate: Barrier::new(2),
        });
        let service = InteractionService::new(
            store.clone(),
            Arc::new(StaticIdentity::new().with_user("U1", "Ada")),
            Arc::new(StaticCatalog::new().with_film("F1", "The Third Man")),
        );
        (store, service)
    }

    /// Keeps consecutive writes on distinct timestamps
    async fn tick() {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    fn fixtures() -> (Arc<MemoryInteractionStore>, InteractionService) {
        let store = Arc::new(MemoryInteractionStore::new());
        let identity = StaticIdentity::new()
            .with_user("U1", "Ada")
            .with_user("U2", "Grace")
            .with_user("U3", "Alan");
        let catalog = StaticCatalog::new()
            .with_film("F1", "The Third Man")
            .with_film("F2", "Double Indemnity")
            .with_film("F3", "Out of the Past");
        let service = InteractionService::new(store.clone(), Arc::new(identity), Arc::new(catalog));
        (store, service)
    }

    #[tokio::test]
    async fn test_rate_twice_keeps_one_row_with_latest_rating() {
        let (store, service) = fixtures();

        assert_ok!(service.rate("U1", "F1", 4, None).await);
        let view = service.rate("U1", "F1", 9, None).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(view.user_rating, Some(9));
        assert_eq!(view.total_ratings, 1);
        assert_eq!(view.average_rating, 9.0);
    }

    #[tokio::test]
    async fn test_unrated_film_averages_zero() {
        let (_, service) = fixtures();

        let view = service.status("U1", "F2").await.unwrap();

        assert_eq!(view.average_rating, 0.0);
        assert_eq!(view.total_ratings, 0);
        assert_eq!(view.user_rating, None);
        assert!(!view.is_favorite);
    }

    #[tokio::test]
    async fn test_average_rounds_half_up_to_one_decimal() {
        let (_, service) = fixtures();

        service.rate("U1", "F1", 8, None).await.unwrap();
        service.rate("U2", "F1", 6, None).await.unwrap();
        let view = service.rate("U3", "F1", 9, None).await.unwrap();

        assert_eq!(view.average_rating, 7.7);
        assert_eq!(view.total_ratings, 3);
    }

    #[tokio::test]
    async fn test_favorite_only_rows_do_not_count_as_ratings() {
        let (_, service) = fixtures();

        service.rate("U1", "F1", 7, None).await.unwrap();
        service.toggle_favorite("U2", "F1").await.unwrap();

        let view = service.status("U2", "F1").await.unwrap();
        assert_eq!(view.total_ratings, 1);
        assert_eq!(view.average_rating, 7.0);
        assert!(view.is_favorite);
    }

    #[tokio::test]
    async fn test_toggle_favorite_twice_restores_state_and_keeps_rating() {
        let (_, service) = fixtures();
        service
            .rate("U1", "F1", 8, Some("Zither score".to_string()))
            .await
            .unwrap();

        let on = service.toggle_favorite("U1", "F1").await.unwrap();
        let off = service.toggle_favorite("U1", "F1").await.unwrap();

        assert!(on.is_favorite);
        assert!(!off.is_favorite);
        assert_eq!(off.user_rating, Some(8));
        assert_eq!(off.user_comment.as_deref(), Some("Zither score"));
    }

    #[tokio::test]
    async fn test_invalid_rating_fails_before_any_lookup() {
        let store = Arc::new(MockInteractionStore::new());
        let mut identity = MockIdentityReference::new();
        identity.expect_exists().never();
        let mut catalog = MockFilmCatalog::new();
        catalog.expect_exists().never();
        let service = InteractionService::new(store, Arc::new(identity), Arc::new(catalog));

        for rating in [0, 11, -3] {
            let err = service.rate("U1", "F1", rating, None).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRating);
        }
    }

    #[tokio::test]
    async fn test_unknown_user_and_film_are_rejected_without_writes() {
        let (store, service) = fixtures();

        let err = service.rate("U404", "F1", 5, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserNotFound);

        let err = service.toggle_favorite("U1", "F404").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FilmNotFound);

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_status_of_unknown_film_fails_even_with_rows() {
        let (_, service) = fixtures();

        let err = service.status("U1", "F404").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FilmNotFound);
    }

    #[tokio::test]
    async fn test_blank_comment_clears_in_rate_and_add_comment() {
        let (_, service) = fixtures();

        service
            .add_comment("U1", "F1", Some("  Great ending ".to_string()))
            .await
            .unwrap();
        let view = service.status("U1", "F1").await.unwrap();
        assert_eq!(view.user_comment.as_deref(), Some("Great ending"));

        let view = service
            .add_comment("U1", "F1", Some("   ".to_string()))
            .await
            .unwrap();
        assert_eq!(view.user_comment, None);

        service
            .add_comment("U1", "F1", Some("Back again".to_string()))
            .await
            .unwrap();
        let view = service.rate("U1", "F1", 6, None).await.unwrap();
        assert_eq!(view.user_comment, None);
        assert_eq!(view.user_rating, Some(6));
    }

    #[tokio::test]
    async fn test_comment_only_row_has_no_rating() {
        let (_, service) = fixtures();

        let view = service
            .add_comment("U1", "F2", Some("Stanwyck".to_string()))
            .await
            .unwrap();

        assert_eq!(view.user_rating, None);
        assert_eq!(view.total_ratings, 0);
    }

    #[tokio::test]
    async fn test_overlong_comment_is_invalid_input() {
        let (store, service) = fixtures();

        let err = service
            .add_comment("U1", "F1", Some("x".repeat(256)))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_favorites_lists_only_favorited_films() {
        let (_, service) = fixtures();

        service.toggle_favorite("U1", "F1").await.unwrap();
        service.toggle_favorite("U1", "F2").await.unwrap();
        service.toggle_favorite("U1", "F2").await.unwrap();
        service.rate("U1", "F3", 5, None).await.unwrap();

        let favorites = service.favorites("U1").await.unwrap();
        let ids: Vec<&str> = favorites.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["F1"]);
    }

    #[tokio::test]
    async fn test_latest_rated_is_newest_first_and_clamped() {
        let (_, service) = fixtures();

        service.rate("U1", "F1", 5, None).await.unwrap();
        tick().await;
        service.rate("U1", "F2", 6, None).await.unwrap();
        service.toggle_favorite("U1", "F3").await.unwrap();

        let latest = service.latest_rated("U1", 50).await.unwrap();
        let ids: Vec<&str> = latest.iter().map(|r| r.film.id.as_str()).collect();
        assert_eq!(ids, vec!["F2", "F1"]);

        let latest = service.latest_rated("U1", 0).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].user_rating, 6);
    }

    #[tokio::test]
    async fn test_film_reviews_pair_rows_with_users() {
        let (_, service) = fixtures();

        service.rate("U1", "F1", 9, None).await.unwrap();
        tick().await;
        service
            .add_comment("U2", "F1", Some("Sewers!".to_string()))
            .await
            .unwrap();
        service.toggle_favorite("U3", "F1").await.unwrap();

        let reviews = service.film_reviews("F1").await.unwrap();

        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].user.name, "Grace");
        assert_eq!(reviews[0].text.as_deref(), Some("Sewers!"));
        assert_eq!(reviews[1].user.name, "Ada");
        assert_eq!(reviews[1].rating, Some(9));
    }

    #[tokio::test]
    async fn test_store_failure_is_retryable() {
        let mut store = MockInteractionStore::new();
        store
            .expect_apply()
            .returning(|_, _, _| Err(AppError::Store(sqlx::Error::PoolTimedOut)));
        let service = InteractionService::new(
            Arc::new(store),
            Arc::new(StaticIdentity::new().with_user("U1", "Ada")),
            Arc::new(StaticCatalog::new().with_film("F1", "The Third Man")),
        );

        let err = service.toggle_favorite("U1", "F1").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_interleaved_toggles_cancel_out() {
        let (store, service) = gated_service();

        let (a, b) = tokio::join!(
            service.toggle_favorite("U1", "F1"),
            service.toggle_favorite("U1", "F1")
        );
        assert_ok!(a);
        assert_ok!(b);

        let row = store.find(&InteractionKey::new("U1", "F1")).await.unwrap().unwrap();
        assert!(!row.is_favorite);
        assert_eq!(store.inner.len().await, 1);
    }

    #[tokio::test]
    async fn test_interleaved_rate_and_toggle_keep_both_changes() {
        let (store, service) = gated_service();

        let (rated, toggled) = tokio::join!(
            service.rate("U1", "F1", 8, None),
            service.toggle_favorite("U1", "F1")
        );
        assert_ok!(rated);
        assert_ok!(toggled);

        let row = store.find(&InteractionKey::new("U1", "F1")).await.unwrap().unwrap();
        assert_eq!(row.rating, Some(8));
        assert!(row.is_favorite);
    }
}
