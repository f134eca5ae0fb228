use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{FilmSummary, UserRecord},
};

use super::{FilmCatalog, IdGenerator, IdentityReference};

/// Fixed film catalog, for tests and local runs without a database
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    films: HashMap<String, FilmSummary>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_film(mut self, id: &str, title: &str) -> Self {
        self.films.insert(
            id.to_string(),
            FilmSummary {
                id: id.to_string(),
                title: title.to_string(),
                image_url: None,
            },
        );
        self
    }
}

#[async_trait::async_trait]
impl FilmCatalog for StaticCatalog {
    async fn exists(&self, film_id: &str) -> AppResult<bool> {
        Ok(self.films.contains_key(film_id))
    }

    async fn summarize(&self, film_id: &str) -> AppResult<Option<FilmSummary>> {
        Ok(self.films.get(film_id).cloned())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Fixed set of users
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    users: HashMap<String, UserRecord>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, id: &str, name: &str) -> Self {
        self.users.insert(
            id.to_string(),
            UserRecord {
                id: id.to_string(),
                name: name.to_string(),
                email: None,
                avatar_url: None,
            },
        );
        self
    }
}

#[async_trait::async_trait]
impl IdentityReference for StaticIdentity {
    async fn exists(&self, user_id: &str) -> AppResult<bool> {
        Ok(self.users.contains_key(user_id))
    }

    async fn get(&self, user_id: &str) -> AppResult<Option<UserRecord>> {
        Ok(self.users.get(user_id).cloned())
    }
}

/// Random ids, `{prefix}{32 hex digits}`
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

#[async_trait::async_trait]
impl IdGenerator for UuidIdGenerator {
    async fn next(&self, prefix: &str) -> AppResult<String> {
        Ok(format!("{}{}", prefix, Uuid::new_v4().simple()))
    }
}
