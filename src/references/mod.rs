/// Collaborators the core consults but never mutates
///
/// Identity and catalog data are owned elsewhere. The services only ask whether
/// a user or film exists and how to display it. Backends are pluggable the same
/// way for every trait: Postgres tables, an HTTP service, a redis-cached wrapper
/// around either, or a static in-memory set.
use crate::{
    error::AppResult,
    models::{FilmSummary, UserRecord, UserSummary},
};

pub mod cached;
pub mod http;
pub mod memory;
pub mod postgres;

pub use cached::{CachedCatalog, CachedIdentity};
pub use http::HttpCatalog;
pub use memory::{StaticCatalog, StaticIdentity, UuidIdGenerator};
pub use postgres::{PgCatalog, PgIdGenerator, PgIdentity};

/// Read-only view of the film catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FilmCatalog: Send + Sync {
    async fn exists(&self, film_id: &str) -> AppResult<bool>;

    async fn summarize(&self, film_id: &str) -> AppResult<Option<FilmSummary>>;

    /// Summaries in the order of `film_ids`; unknown ids are skipped
    ///
    /// Default implementation looks up each id in turn. Backends with a bulk
    /// query should override it.
    async fn summarize_many(&self, film_ids: &[String]) -> AppResult<Vec<FilmSummary>> {
        let mut summaries = Vec::with_capacity(film_ids.len());
        for film_id in film_ids {
            if let Some(summary) = self.summarize(film_id).await? {
                summaries.push(summary);
            }
        }
        Ok(summaries)
    }

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Read-only view of user accounts
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait IdentityReference: Send + Sync {
    async fn exists(&self, user_id: &str) -> AppResult<bool>;

    async fn get(&self, user_id: &str) -> AppResult<Option<UserRecord>>;

    /// Summaries in the order of `user_ids`; unknown ids are skipped
    async fn summarize_many(&self, user_ids: &[String]) -> AppResult<Vec<UserSummary>> {
        let mut summaries = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            if let Some(user) = self.get(user_id).await? {
                summaries.push(user.into());
            }
        }
        Ok(summaries)
    }
}

/// Issues ids for new rows
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait IdGenerator: Send + Sync {
    /// Returns an id starting with `prefix` that was never issued before
    async fn next(&self, prefix: &str) -> AppResult<String>;
}
