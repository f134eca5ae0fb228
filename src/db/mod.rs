pub mod postgres;
pub mod redis;

pub use postgres::{create_pool, run_migrations};
pub use redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
