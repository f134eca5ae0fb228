use std::collections::HashMap;

use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{FilmSummary, UserRecord, UserSummary},
};

use super::{FilmCatalog, IdGenerator, IdentityReference};

/// Digits after the prefix in generated ids, e.g. `LST000000000042`
const ID_DIGITS: usize = 12;

pub(crate) fn film_image_url(base_url: &str, film_id: &str) -> String {
    format!("{}/api/v1/films/image/{}", base_url.trim_end_matches('/'), film_id)
}

pub(crate) fn avatar_url(base_url: &str, avatar_id: &str) -> String {
    format!("{}/api/v1/avatars/{}/image", base_url.trim_end_matches('/'), avatar_id)
}

#[derive(sqlx::FromRow)]
struct FilmRow {
    id: String,
    title: String,
}

/// Catalog reading the `films` table of the shared database
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
    image_base_url: String,
}

impl PgCatalog {
    pub fn new(pool: PgPool, image_base_url: String) -> Self {
        Self {
            pool,
            image_base_url,
        }
    }

    fn to_summary(&self, row: FilmRow) -> FilmSummary {
        FilmSummary {
            image_url: Some(film_image_url(&self.image_base_url, &row.id)),
            id: row.id,
            title: row.title,
        }
    }
}

#[async_trait::async_trait]
impl FilmCatalog for PgCatalog {
    async fn exists(&self, film_id: &str) -> AppResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM films WHERE id = $1)")
                .bind(film_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn summarize(&self, film_id: &str) -> AppResult<Option<FilmSummary>> {
        let row = sqlx::query_as::<_, FilmRow>("SELECT id, title FROM films WHERE id = $1")
            .bind(film_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| self.to_summary(row)))
    }

    async fn summarize_many(&self, film_ids: &[String]) -> AppResult<Vec<FilmSummary>> {
        if film_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, FilmRow>("SELECT id, title FROM films WHERE id = ANY($1)")
            .bind(film_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut by_id: HashMap<String, FilmRow> =
            rows.into_iter().map(|row| (row.id.clone(), row)).collect();

        if by_id.len() != film_ids.len() {
            tracing::warn!(
                expected = film_ids.len(),
                found = by_id.len(),
                "Some referenced films are missing from the catalog"
            );
        }

        Ok(film_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .map(|row| self.to_summary(row))
            .collect())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: Option<String>,
    avatar_id: Option<String>,
}

/// Identity reading the `users` table of the shared database
#[derive(Clone)]
pub struct PgIdentity {
    pool: PgPool,
    image_base_url: String,
}

impl PgIdentity {
    pub fn new(pool: PgPool, image_base_url: String) -> Self {
        Self {
            pool,
            image_base_url,
        }
    }

    fn to_record(&self, row: UserRow) -> UserRecord {
        UserRecord {
            avatar_url: row
                .avatar_id
                .as_deref()
                .map(|avatar_id| avatar_url(&self.image_base_url, avatar_id)),
            id: row.id,
            name: row.name,
            email: row.email,
        }
    }
}

#[async_trait::async_trait]
impl IdentityReference for PgIdentity {
    async fn exists(&self, user_id: &str) -> AppResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn get(&self, user_id: &str) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, avatar_id FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| self.to_record(row)))
    }

    async fn summarize_many(&self, user_ids: &[String]) -> AppResult<Vec<UserSummary>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, avatar_id FROM users WHERE id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_id: HashMap<String, UserRow> =
            rows.into_iter().map(|row| (row.id.clone(), row)).collect();

        // user_ids may repeat (one reviewer, many rows); keep the first lookup for each
        let mut summaries = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            if let Some(row) = by_id.remove(user_id) {
                summaries.push(self.to_record(row).into());
            }
        }
        Ok(summaries)
    }
}

/// Id generator backed by a Postgres sequence
#[derive(Clone)]
pub struct PgIdGenerator {
    pool: PgPool,
}

impl PgIdGenerator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn format_id(prefix: &str, sequence: i64) -> String {
    format!("{}{:0width$}", prefix, sequence, width = ID_DIGITS)
}

#[async_trait::async_trait]
impl IdGenerator for PgIdGenerator {
    async fn next(&self, prefix: &str) -> AppResult<String> {
        let sequence = sqlx::query_scalar::<_, i64>("SELECT nextval('entity_id_seq')")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, prefix = %prefix, "Id generation failed");
                AppError::Internal(format!("Could not generate {} id: {}", prefix, e))
            })?;

        Ok(format_id(prefix, sequence))
    }
}
