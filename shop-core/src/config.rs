//! # Configuration
//!
//! A string key/value store mirroring Feathers' `app.set()` / `app.get()`.
//! Applications set defaults in code and layer environment overrides on top
//! with [`ShopConfig::load_env`]:
//!
//! ```rust
//! use shop_core::ShopConfig;
//!
//! let mut config = ShopConfig::new();
//! config.set("orders.perPage", "6");
//! assert_eq!(config.get("orders.perPage"), Some("6"));
//! ```
//!
//! `SHOP__ORDERS__PERPAGE=10` with prefix `SHOP__` becomes `orders.perpage`.
//! Keys are matched case-insensitively on lookup for that reason.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ShopConfig {
    values: HashMap<String, String>,
}

fn normalize_key(key: &str) -> String {
    key.to_ascii_lowercase()
}

impl ShopConfig {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(normalize_key(&key.into()), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(|s| s.as_str())
    }

    /// Apply every `PREFIX` + `A__B` variable from `vars` as key `a.b`.
    pub fn load_vars<I>(&mut self, prefix: &str, vars: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut applied = 0;
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                if normalized.is_empty() {
                    continue;
                }
                tracing::debug!(key = %normalized, "config override from environment");
                self.values.insert(normalized, value);
                applied += 1;
            }
        }
        applied
    }

    /// Apply overrides from the process environment.
    pub fn load_env(&mut self, prefix: &str) -> usize {
        self.load_vars(prefix, std::env::vars())
    }

    pub fn snapshot(&self) -> ShopConfigSnapshot {
        ShopConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShopConfigSnapshot {
    map: HashMap<String, String>,
}

impl ShopConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(&normalize_key(key)).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(|s| s.to_string())
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_replace_defaults() {
        let mut config = ShopConfig::new();
        config.set("orders.perPage", "6");
        config.set("http.port", "3030");

        let applied = config.load_vars(
            "SHOP__",
            vec![
                ("SHOP__ORDERS__PERPAGE".to_string(), "10".to_string()),
                ("OTHER__HTTP__PORT".to_string(), "1".to_string()),
            ],
        );

        assert_eq!(applied, 1);
        let snap = config.snapshot();
        assert_eq!(snap.get_usize("orders.perPage"), Some(10));
        assert_eq!(snap.get("http.port"), Some("3030"));
    }

    #[test]
    fn typed_getters_reject_garbage() {
        let mut config = ShopConfig::new();
        config.set("images.remoteTimeoutSecs", "soon");

        let snap = config.snapshot();
        assert_eq!(snap.get_u64("images.remoteTimeoutSecs"), None);
        assert_eq!(snap.get("IMAGES.remoteTimeoutSecs"), Some("soon"));
    }
}
