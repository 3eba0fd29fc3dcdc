/// TMDB API provider
///
/// Every request carries the API key, `include_adult=false` and the
/// configured language. Responses can be cached in Redis per endpoint.
use std::time::Duration;

use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    cached,
    config::Config,
    db::{
        redis::cache::{DETAILS_TTL, GENRES_TTL, LIST_TTL},
        Cache, CacheKey,
    },
    error::{AppError, AppResult},
    models::{DiscoverFilter, TmdbGenreList, TmdbMovie, TmdbPage},
    services::providers::CatalogProvider,
};

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    language: String,
    cache: Option<Cache>,
}

impl TmdbProvider {
    pub fn new(
        api_key: String,
        api_url: String,
        language: String,
        timeout: Duration,
        cache: Option<Cache>,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            language,
            cache,
        })
    }

    pub fn from_config(config: &Config, cache: Option<Cache>) -> AppResult<Self> {
        Self::new(
            config.tmdb_api_key.clone(),
            config.tmdb_api_url.clone(),
            config.tmdb_language.clone(),
            config.tmdb_timeout(),
            cache,
        )
    }

    /// Query pairs sent with every request; caller params come after and
    /// cannot replace these
    fn base_params(&self) -> [(&'static str, String); 3] {
        [
            ("api_key", self.api_key.clone()),
            ("include_adult", "false".to_string()),
            ("language", self.language.clone()),
        ]
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(&self.base_params())
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("TMDB resource {} not found", path)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Transport(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        decode(path, &body)
    }
}

/// Decodes a TMDB response body; a malformed payload is a transport failure
fn decode<T: DeserializeOwned>(path: &str, body: &str) -> AppResult<T> {
    serde_json::from_str(body)
        .map_err(|e| AppError::Transport(format!("Invalid TMDB response for {}: {}", path, e)))
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbProvider {
    async fn search(&self, query: &str, page: u32) -> AppResult<TmdbPage<TmdbMovie>> {
        let params = [("query", query.to_string()), ("page", page.to_string())];
        let results: TmdbPage<TmdbMovie> = cached!(
            self.cache,
            CacheKey::Search(query.to_string(), page),
            LIST_TTL,
            self.get_json("/search/movie", &params)
        )?;

        tracing::debug!(
            query = %query,
            page,
            results_count = results.results.len(),
            "TMDB search completed"
        );
        Ok(results)
    }

    async fn popular(&self, page: u32) -> AppResult<TmdbPage<TmdbMovie>> {
        let params = [("page", page.to_string())];
        cached!(
            self.cache,
            CacheKey::Popular(page),
            LIST_TTL,
            self.get_json("/movie/popular", &params)
        )
    }

    async fn genres(&self) -> AppResult<TmdbGenreList> {
        cached!(
            self.cache,
            CacheKey::Genres,
            GENRES_TTL,
            self.get_json("/genre/movie/list", &[])
        )
    }

    async fn details(&self, movie_id: i64) -> AppResult<TmdbMovie> {
        let path = format!("/movie/{}", movie_id);
        cached!(
            self.cache,
            CacheKey::Details(movie_id),
            DETAILS_TTL,
            self.get_json(&path, &[])
        )
    }

    async fn recommendations(&self, movie_id: i64) -> AppResult<TmdbPage<TmdbMovie>> {
        let path = format!("/movie/{}/recommendations", movie_id);
        cached!(
            self.cache,
            CacheKey::Recommendations(movie_id),
            LIST_TTL,
            self.get_json(&path, &[])
        )
    }

    async fn similar(&self, movie_id: i64, page: u32) -> AppResult<TmdbPage<TmdbMovie>> {
        let path = format!("/movie/{}/similar", movie_id);
        let params = [("page", page.to_string())];
        cached!(
            self.cache,
            CacheKey::Similar(movie_id, page),
            LIST_TTL,
            self.get_json(&path, &params)
        )
    }

    async fn discover(&self, filter: &DiscoverFilter) -> AppResult<TmdbPage<TmdbMovie>> {
        let params = filter.to_query();
        let key = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        cached!(
            self.cache,
            CacheKey::Discover(key),
            LIST_TTL,
            self.get_json("/discover/movie", &params)
        )
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> TmdbProvider {
        TmdbProvider::new(
            "test-key".to_string(),
            "https://api.themoviedb.org/3/".to_string(),
            "en-US".to_string(),
            Duration::from_secs(5),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_base_params_force_adult_off_and_locale() {
        let params = provider().base_params();
        assert!(params.contains(&("api_key", "test-key".to_string())));
        assert!(params.contains(&("include_adult", "false".to_string())));
        assert!(params.contains(&("language", "en-US".to_string())));
    }

    #[test]
    fn test_trailing_slash_trimmed_from_base_url() {
        assert_eq!(provider().api_url, "https://api.themoviedb.org/3");
    }

    #[test]
    fn test_decode_list_payload() {
        let body = r#"{
            "page": 1,
            "results": [
                {"id": 201, "title": "Alpha", "vote_average": 7.5, "popularity": 40.2,
                 "release_date": "2020-05-01", "adult": false, "genre_ids": [28, 12]},
                {"id": 202, "title": "Beta"}
            ],
            "total_pages": 3,
            "total_results": 55
        }"#;

        let page: TmdbPage<TmdbMovie> = decode("/movie/101/recommendations", body).unwrap();
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0].genre_ids, vec![28, 12]);
        assert_eq!(page.results[1].popularity, None);
        assert_eq!(page.total_results, 55);
    }

    #[test]
    fn test_decode_detail_payload_with_genres() {
        let body = r#"{"id": 550, "title": "Fight Club", "release_date": "",
                       "genres": [{"id": 18, "name": "Drama"}]}"#;

        let movie: TmdbMovie = decode("/movie/550", body).unwrap();
        assert_eq!(movie.genres[0].name, "Drama");
        assert_eq!(movie.release_date.as_deref(), Some(""));
    }

    #[test]
    fn test_malformed_payload_is_transport_failure() {
        let err = decode::<TmdbPage<TmdbMovie>>("/movie/popular", "<html>oops</html>").unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
        assert!(err.is_remote_miss());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_failure() {
        let provider = TmdbProvider::new(
            "k".to_string(),
            "http://127.0.0.1:1".to_string(),
            "en-US".to_string(),
            Duration::from_millis(500),
            None,
        )
        .unwrap();

        let err = provider.popular(1).await.unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
    }
}
