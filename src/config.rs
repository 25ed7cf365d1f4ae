use crate::error::ConfigError;
use crate::search::tantivy_index::IndexSettings;
use derive_getters::Getters;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings, read from the process environment.
#[derive(Debug, Clone, Getters)]
pub struct AppConfig {
    database_url: String,
    index_path: PathBuf,
    store_timeout: Duration,
    index_timeout: Duration,
    search_limit: usize,
    writer_heap_bytes: usize,
    reindex_on_startup: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            index_path: lookup("SEARCH_INDEX_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./search_index")),
            store_timeout: Duration::from_millis(parse_or(&lookup, "STORE_TIMEOUT_MS", 5_000)?),
            index_timeout: Duration::from_millis(parse_or(&lookup, "INDEX_TIMEOUT_MS", 2_000)?),
            search_limit: parse_or(&lookup, "SEARCH_LIMIT", 10)?,
            writer_heap_bytes: parse_or(&lookup, "INDEX_WRITER_HEAP_BYTES", 50_000_000)?,
            reindex_on_startup: parse_or(&lookup, "REINDEX_ON_STARTUP", false)?,
        })
    }

    pub fn index_settings(&self) -> IndexSettings {
        IndexSettings {
            writer_heap_bytes: self.writer_heap_bytes,
            search_limit: self.search_limit,
            timeout: self.index_timeout,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/notes")]))
                .unwrap();

        assert_eq!(config.database_url(), "postgres://localhost/notes");
        assert_eq!(config.index_path(), &PathBuf::from("./search_index"));
        assert_eq!(*config.store_timeout(), Duration::from_secs(5));
        assert_eq!(*config.index_timeout(), Duration::from_secs(2));
        assert_eq!(*config.search_limit(), 10);
        assert!(!*config.reindex_on_startup());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/notes"),
            ("SEARCH_INDEX_PATH", "/var/lib/notes/index"),
            ("STORE_TIMEOUT_MS", "250"),
            ("INDEX_TIMEOUT_MS", "100"),
            ("SEARCH_LIMIT", "25"),
            ("INDEX_WRITER_HEAP_BYTES", "20000000"),
            ("REINDEX_ON_STARTUP", "true"),
        ]))
        .unwrap();

        let settings = config.index_settings();
        assert_eq!(settings.timeout, Duration::from_millis(100));
        assert_eq!(settings.search_limit, 25);
        assert_eq!(settings.writer_heap_bytes, 20_000_000);
        assert_eq!(*config.store_timeout(), Duration::from_millis(250));
        assert!(*config.reindex_on_startup());
    }

    #[test]
    fn test_missing_database_url() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn test_invalid_number() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/notes"),
            ("SEARCH_LIMIT", "lots"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "SEARCH_LIMIT",
                value: "lots".to_string()
            }
        );
    }
}
