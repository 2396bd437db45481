//! Request identity and its storage key.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Compute the storage key for a request identity.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Identity of a cached request: method plus absolute URL.
///
/// The query string is significant. Fragments are never part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: &str, url: &url::Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self { method: method.to_ascii_uppercase(), url: url.into() }
    }

    /// Key for a GET of `url`.
    pub fn get(url: &url::Url) -> Self {
        Self::new("GET", url)
    }

    /// The same identity with the query string removed.
    ///
    /// Keys whose URL does not parse are returned unchanged.
    pub fn without_query(&self) -> Self {
        match url::Url::parse(&self.url) {
            Ok(mut url) => {
                url.set_query(None);
                Self { method: self.method.clone(), url: url.into() }
            }
            Err(_) => self.clone(),
        }
    }

    /// Content-addressed storage key.
    pub fn hash(&self) -> String {
        compute_cache_key(&self.method, &self.url)
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> url::Url {
        url::Url::parse(s).unwrap()
    }

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_cache_key("GET", "https://example.com/");
        let hash2 = compute_cache_key("GET", "https://example.com/");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_different_method() {
        assert_ne!(compute_cache_key("GET", "https://example.com/"), compute_cache_key("HEAD", "https://example.com/"));
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_cache_key("GET", "https://example.com/");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_query_is_significant() {
        let a = RequestKey::get(&url("https://example.com/page?a=1"));
        let b = RequestKey::get(&url("https://example.com/page?a=2"));
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_key_drops_fragment() {
        let a = RequestKey::get(&url("https://example.com/page#top"));
        assert_eq!(a.url, "https://example.com/page");
    }

    #[test]
    fn test_key_method_uppercased() {
        let key = RequestKey::new("get", &url("https://example.com/"));
        assert_eq!(key.method, "GET");
        assert_eq!(key.to_string(), "GET https://example.com/");
    }

    #[test]
    fn test_without_query() {
        let key = RequestKey::get(&url("https://example.com/page?utm=x"));
        assert_eq!(key.without_query().url, "https://example.com/page");
    }
}
