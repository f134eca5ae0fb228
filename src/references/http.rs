/// Film catalog served by a separate HTTP service
///
/// API Flow:
/// 1. Summary: GET {base}/films/{id} → 200 with `{id, title, image_url}`, 404 when unknown
/// 2. Existence is answered from the same call
use reqwest::{Client as HttpClient, StatusCode, Url};
use std::time::Duration;

use crate::{
    error::{AppError, AppResult},
    models::FilmSummary,
};

use super::FilmCatalog;

#[derive(Clone)]
pub struct HttpCatalog {
    http_client: HttpClient,
    api_url: Url,
}

impl HttpCatalog {
    pub fn new(api_url: String, timeout: Duration) -> AppResult<Self> {
        let api_url = Url::parse(&api_url)
            .map_err(|e| AppError::Internal(format!("Invalid catalog URL {}: {}", api_url, e)))?;
        if api_url.cannot_be_a_base() {
            return Err(AppError::Internal(format!(
                "Catalog URL {} cannot carry a path",
                api_url
            )));
        }

        let http_client = HttpClient::builder()
            .user_agent("filmshelf-api/0.1")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            api_url,
        })
    }

    /// `film_id` is pushed as one encoded path segment, never spliced in raw
    fn film_url(&self, film_id: &str) -> AppResult<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Internal(format!("Catalog URL {} has no path", self.api_url)))?
            .pop_if_empty()
            .push("films")
            .push(film_id);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl FilmCatalog for HttpCatalog {
    async fn exists(&self, film_id: &str) -> AppResult<bool> {
        Ok(self.summarize(film_id).await?.is_some())
    }

    async fn summarize(&self, film_id: &str) -> AppResult<Option<FilmSummary>> {
        let url = self.film_url(film_id)?;

        tracing::debug!(film_id = %film_id, "Fetching film from catalog service");

        let response = self.http_client.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                film_id = %film_id,
                status = %status,
                body = %body,
                "Catalog request failed"
            );
            return Err(AppError::ExternalApi(format!(
                "Catalog returned status {}: {}",
                status, body
            )));
        }

        let summary: FilmSummary = response.json().await?;
        Ok(Some(summary))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
