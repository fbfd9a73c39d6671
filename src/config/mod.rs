use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::net::SocketAddr;
use std::str::FromStr;

/// How relationship listings treat unusable query values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueryParsing {
    /// Replace unusable values with defaults or clamp them.
    #[default]
    Lenient,
    /// Reject unusable values with a validation error.
    Strict,
}

impl FromStr for QueryParsing {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "lenient" => Ok(QueryParsing::Lenient),
            "strict" => Ok(QueryParsing::Strict),
            other => Err(format!("expected lenient or strict, got {}", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "postgres" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("expected postgres or memory, got {}", other)),
        }
    }
}

/// Policy knobs for the relationship graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelationshipSettings {
    pub query_parsing: QueryParsing,
    pub bulk_check_max: usize,
}

impl Default for RelationshipSettings {
    fn default() -> Self {
        Self {
            query_parsing: QueryParsing::Lenient,
            bulk_check_max: 500,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub paseto_access_key: [u8; 32],
    pub access_ttl_minutes: u64,
    pub relationships: RelationshipSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let storage_backend: StorageBackend = env_or_parse("STORAGE_BACKEND", "postgres")?;
        let database_url = match storage_backend {
            StorageBackend::Postgres => Some(env_or_err("DATABASE_URL")?),
            StorageBackend::Memory => std::env::var("DATABASE_URL").ok(),
        };

        let bulk_check_max: usize = env_or_parse("BULK_CHECK_MAX", "500")?;
        if bulk_check_max == 0 {
            return Err(anyhow!("invalid BULK_CHECK_MAX: must be at least 1"));
        }

        Ok(Self {
            http_addr,
            storage_backend,
            database_url,
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            paseto_access_key: env_key_32("PASETO_ACCESS_KEY")?,
            access_ttl_minutes: env_or_parse("ACCESS_TTL_MINUTES", "15")?,
            relationships: RelationshipSettings {
                query_parsing: env_or_parse("QUERY_PARSING", "lenient")?,
                bulk_check_max,
            },
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn env_key_32(key: &str) -> Result<[u8; 32]> {
    let value = env_or_err(key)?;
    let decoded = STANDARD
        .decode(value.as_bytes())
        .map_err(|err| anyhow!("invalid {}: {}", key, err))?;
    if decoded.len() != 32 {
        return Err(anyhow!("invalid {}: expected 32 bytes", key));
    }
    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&decoded);
    Ok(key_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_parsing_modes() {
        assert_eq!("strict".parse::<QueryParsing>(), Ok(QueryParsing::Strict));
        assert_eq!("Lenient".parse::<QueryParsing>(), Ok(QueryParsing::Lenient));
        assert!("loose".parse::<QueryParsing>().is_err());
    }

    #[test]
    fn parses_backends() {
        assert_eq!("memory".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert_eq!("POSTGRES".parse::<StorageBackend>(), Ok(StorageBackend::Postgres));
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }
}
