mod activity;
pub mod memory;
mod movies;
pub mod postgres;
pub mod redis;
mod store;
mod users;

pub use memory::InMemoryStore;
pub use postgres::{create_pool, PgStore};
pub use self::redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
pub use store::{ActivityStore, MovieStore, UserStore};
