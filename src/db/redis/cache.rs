use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::error::AppResult;

/// Keys for cached catalog lookups
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Search { query: String, page: i32 },
    MovieDetails(i64),
    Similar { movie_id: i64, page: i32 },
    /// Canonical query string of a discover request
    Discover(String),
    Popular(i32),
    TopRated(i32),
    Keywords(i64),
    Videos(i64),
    WatchProviders { movie_id: i64, region: String },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Search { query, page } => {
                write!(f, "search:{}:{}", query.to_lowercase(), page)
            }
            CacheKey::MovieDetails(id) => write!(f, "movie:{}", id),
            CacheKey::Similar { movie_id, page } => write!(f, "similar:{}:{}", movie_id, page),
            CacheKey::Discover(query) => write!(f, "discover:{}", query),
            CacheKey::Popular(page) => write!(f, "popular:{}", page),
            CacheKey::TopRated(page) => write!(f, "top_rated:{}", page),
            CacheKey::Keywords(id) => write!(f, "keywords:{}", id),
            CacheKey::Videos(id) => write!(f, "videos:{}", id),
            CacheKey::WatchProviders { movie_id, region } => {
                write!(f, "providers:{}:{}", movie_id, region.to_lowercase())
            }
        }
    }
}

/// Creates a Redis client for caching
///
/// Establishes a connection to Redis for fast data caching.
/// Uses connection pooling via the connection-manager feature.
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

/// Cache handler for storing and retrieving data from Redis
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Initiates a graceful shutdown of the cache writer
    ///
    /// Sends a shutdown signal to the writer task and waits for it to flush
    /// all pending writes to Redis.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates a new Cache instance with an async write background task
    ///
    /// This spawns a background task that processes cache writes asynchronously,
    /// preventing cache operations from blocking API responses.
    pub async fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        // Spawn background task to process cache writes
        let client = redis_client.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            write_tx,
        };

        let handle = CacheWriterHandle { shutdown_tx };

        (cache, handle)
    }

    /// Background task that processes cache write messages
    ///
    /// Continuously receives cache write requests from the channel and writes them
    /// to Redis. On shutdown signal, flushes all remaining messages before exiting.
    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                // Process write messages
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        tracing::error!(error = %e, "Failed to write to Redis cache");
                    }
                }
                // Shutdown signal received
                _ = shutdown_rx.recv() => {
                    tracing::info!("Cache writer shutting down, flushing remaining writes");

                    // Flush all remaining messages
                    while let Ok(msg) = write_rx.try_recv() {
                        if let Err(e) = Self::write_to_redis(&client, msg).await {
                            tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                        }
                    }

                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    /// Writes a single message to Redis
    async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }

    /// Retrieves a value from the cache by key
    ///
    /// This function attempts to retrieve a cached value associated with the given key.
    /// If the key exists in the cache, the value is deserialized and returned.
    /// If the key does not exist, `None` is returned.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(format!("{}", key)).await?;

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

    /// Stores a value in the cache asynchronously without blocking
    ///
    /// This function serializes the value and sends it to a background worker
    /// via a channel. The actual Redis write happens asynchronously, so this
    /// method returns immediately without waiting for the write to complete.
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: format!("{}", key),
            value: json,
            ttl,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }
}
