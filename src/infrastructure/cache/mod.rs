//! Cache infrastructure - Cache implementations

mod factory;
mod in_memory;
mod redis;
mod result_cache;

pub use factory::{CacheConfig, CacheFactory, CacheType};
pub use in_memory::{InMemoryCache, InMemoryCacheConfig};
pub use redis::{RedisCache, RedisCacheConfig};
pub use result_cache::{
    CacheBackend, CacheStats, CacheStatus, CacheTtl, ResultCache, DEFAULT_CACHE_TIMEOUT,
    DEFAULT_TTL_SECS,
};
