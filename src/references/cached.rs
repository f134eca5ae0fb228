use std::sync::Arc;

use crate::{
    cached_some,
    db::redis::{Cache, CacheKey},
    error::AppResult,
    models::{FilmSummary, UserRecord},
};

use super::{FilmCatalog, IdentityReference};

/// Catalog lookups served from Redis when possible
///
/// Only found films are cached. `exists` goes through `summarize` so a cached
/// film answers both questions.
pub struct CachedCatalog {
    inner: Arc<dyn FilmCatalog>,
    cache: Cache,
}

impl CachedCatalog {
    pub fn new(inner: Arc<dyn FilmCatalog>, cache: Cache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait::async_trait]
impl FilmCatalog for CachedCatalog {
    async fn exists(&self, film_id: &str) -> AppResult<bool> {
        Ok(self.summarize(film_id).await?.is_some())
    }

    async fn summarize(&self, film_id: &str) -> AppResult<Option<FilmSummary>> {
        cached_some!(
            self.cache,
            CacheKey::FilmSummary(film_id.to_string()),
            self.inner.summarize(film_id)
        )
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Identity lookups served from Redis when possible
pub struct CachedIdentity {
    inner: Arc<dyn IdentityReference>,
    cache: Cache,
}

impl CachedIdentity {
    pub fn new(inner: Arc<dyn IdentityReference>, cache: Cache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait::async_trait]
impl IdentityReference for CachedIdentity {
    async fn exists(&self, user_id: &str) -> AppResult<bool> {
        Ok(self.get(user_id).await?.is_some())
    }

    async fn get(&self, user_id: &str) -> AppResult<Option<UserRecord>> {
        cached_some!(
            self.cache,
            CacheKey::UserRecord(user_id.to_string()),
            self.inner.get(user_id)
        )
    }
}
