use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::error::AppResult;

/// One hour, for paged lists that shift during the day
pub const LIST_TTL: u64 = 60 * 60;
/// One day, for single-movie payloads
pub const DETAILS_TTL: u64 = 24 * 60 * 60;
/// One week; the genre list practically never changes
pub const GENRES_TTL: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Search(String, u32),
    Popular(u32),
    Genres,
    Details(i64),
    Recommendations(i64),
    Similar(i64, u32),
    /// Pre-rendered discover query string
    Discover(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Search(query, page) => {
                write!(f, "tmdb:search:{}:{}", query.trim().to_lowercase(), page)
            }
            CacheKey::Popular(page) => write!(f, "tmdb:popular:{}", page),
            CacheKey::Genres => write!(f, "tmdb:genres"),
            CacheKey::Details(id) => write!(f, "tmdb:movie:{}", id),
            CacheKey::Recommendations(id) => write!(f, "tmdb:recs:{}", id),
            CacheKey::Similar(id, page) => write!(f, "tmdb:similar:{}:{}", id, page),
            CacheKey::Discover(query) => write!(f, "tmdb:discover:{}", query),
        }
    }
}

/// Creates a Redis client for caching remote catalog responses
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// Redis-backed response cache with a background writer
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    /// Signals the writer task and waits until pending writes are flushed
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task failed");
        }
    }
}

impl Cache {
    /// Creates the cache and spawns its writer task
    ///
    /// Writes are queued on an unbounded channel so a slow Redis never holds
    /// up a response.
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        let task = tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            write_tx,
        };

        (cache, CacheWriterHandle { shutdown_tx, task })
    }

    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");
        let mut failed_writes: u64 = 0;

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    let key = msg.key.clone();
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        failed_writes += 1;
                        tracing::error!(error = %e, %key, failed_writes, "Failed to write to Redis cache");
                    }
                }
                _ = shutdown_rx.recv() => {
                    // Close the channel so the drain below terminates once
                    // every already-queued write has been handled
                    write_rx.close();
                    tracing::info!("Cache writer shutting down, flushing remaining writes");

                    while let Some(msg) = write_rx.recv().await {
                        if let Err(e) = Self::write_to_redis(&client, msg).await {
                            tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                        }
                    }

                    tracing::info!(failed_writes, "Cache writer task stopped");
                    break;
                }
            }
        }
    }

    async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }

    /// Retrieves and decodes a cached value, `None` on a miss
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Queues a value for writing; returns immediately
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: key.to_string(),
            value: json,
            ttl,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_search_normalizes_query() {
        let key = CacheKey::Search("  THE Matrix ".to_string(), 2);
        assert_eq!(key.to_string(), "tmdb:search:the matrix:2");
    }

    #[test]
    fn test_cache_key_search_pages_are_distinct() {
        let first = CacheKey::Search("alien".to_string(), 1);
        let second = CacheKey::Search("alien".to_string(), 2);
        assert_ne!(first.to_string(), second.to_string());
    }

    #[test]
    fn test_cache_key_movie_endpoints() {
        assert_eq!(CacheKey::Details(550).to_string(), "tmdb:movie:550");
        assert_eq!(CacheKey::Recommendations(550).to_string(), "tmdb:recs:550");
        assert_eq!(CacheKey::Similar(550, 3).to_string(), "tmdb:similar:550:3");
    }

    #[test]
    fn test_cache_key_lists() {
        assert_eq!(CacheKey::Popular(1).to_string(), "tmdb:popular:1");
        assert_eq!(CacheKey::Genres.to_string(), "tmdb:genres");
        assert_eq!(
            CacheKey::Discover("with_genres=28&page=1".to_string()).to_string(),
            "tmdb:discover:with_genres=28&page=1"
        );
    }

    #[test]
    fn test_ttls_are_ordered_by_volatility() {
        assert!(LIST_TTL < DETAILS_TTL);
        assert!(DETAILS_TTL < GENRES_TTL);
    }

    #[tokio::test]
    async fn test_unreachable_redis_read_is_an_error() {
        // Port 1 refuses connections; the read must surface an error rather
        // than hang or panic
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, handle) = Cache::new(client);

        let result: AppResult<Option<String>> = cache.get_from_cache(&CacheKey::Genres).await;
        assert!(result.is_err());

        handle.shutdown().await;
    }
}
