//! Search cache keys and key patterns

use std::fmt;

use regex::Regex;

use crate::domain::DomainError;

/// Namespace shared by every cached search result
pub const SEARCH_NAMESPACE: &str = "search";

/// Canonical cache key for one search.
///
/// Two requests that differ only in query case, surrounding whitespace, or
/// coordinate digits beyond the fourth decimal map to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchCacheKey(String);

impl SearchCacheKey {
    pub fn new(query: &str, latitude: f64, longitude: f64, radius_km: u32) -> Self {
        Self(format!(
            "{}:{}:{:.4}:{:.4}:{}",
            SEARCH_NAMESPACE,
            query.trim().to_lowercase(),
            round4(latitude),
            round4(longitude),
            radius_km
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Pattern matching every cached search
    pub fn all_searches() -> String {
        format!("{}:*", SEARCH_NAMESPACE)
    }
}

impl fmt::Display for SearchCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn round4(value: f64) -> f64 {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    // -0.0 would render as "-0.0000"
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Compiles a glob-style key pattern (`*` any run, `?` one character) into an
/// anchored regex, escaping everything else
pub fn glob_to_regex(pattern: &str) -> Result<Regex, DomainError> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');

    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }

    expr.push('$');

    Regex::new(&expr).map_err(|e| DomainError::cache(format!("Invalid key pattern: {}", e)))
}
