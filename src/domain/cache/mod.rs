//! Cache domain - result caching abstraction layer

mod key;
mod repository;

pub use key::{glob_to_regex, SearchCacheKey, SEARCH_NAMESPACE};
pub use repository::{Cache, CacheBackendInfo, CacheExt};

#[cfg(test)]
pub use repository::mock::MockCache;
