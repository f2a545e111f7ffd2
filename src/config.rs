use crate::readiness::ReadinessConfig;
use crate::service::StoreDefinition;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub stores: Vec<String>,
    pub init_timeout: Duration,
    pub readiness: ReadinessConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let stores = parse_stores(&env_map)?;

        let init_timeout_ms = parse_u64(&env_map, "DB_INIT_TIMEOUT_MS", "10000")?;

        let max_attempts = env_map
            .get("READINESS_MAX_ATTEMPTS")
            .map(|s| s.as_str())
            .unwrap_or("3")
            .parse::<u32>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "READINESS_MAX_ATTEMPTS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let retry_delay_ms = parse_u64(&env_map, "READINESS_RETRY_DELAY_MS", "500")?;

        Ok(Config {
            database_path,
            stores,
            init_timeout: Duration::from_millis(init_timeout_ms),
            readiness: ReadinessConfig {
                max_attempts,
                retry_delay: Duration::from_millis(retry_delay_ms),
            },
        })
    }

    pub fn store_definitions(&self) -> Vec<StoreDefinition> {
        self.stores
            .iter()
            .map(|name| StoreDefinition::key_value(name.as_str()))
            .collect()
    }
}

fn parse_u64(env_map: &HashMap<String, String>, key: &str, default: &str) -> Result<u64, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.as_str())
        .unwrap_or(default)
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), "must be a valid u64".to_string()))
}

fn parse_stores(env_map: &HashMap<String, String>) -> Result<Vec<String>, ConfigError> {
    let Some(stores_str) = env_map.get("DB_STORES") else {
        return Ok(Vec::new());
    };

    let stores: Vec<String> = stores_str
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    // names end up in DDL
    if let Some(bad) = stores.iter().find(|s| !is_identifier(s)) {
        return Err(ConfigError::InvalidValue(
            "DB_STORES".to_string(),
            format!("store name must be alphanumeric or underscore, got {}", bad),
        ));
    }
    Ok(stores)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.database_path, "/tmp/test.db");
        assert!(config.stores.is_empty());
        assert_eq!(config.init_timeout, Duration::from_secs(10));
        assert_eq!(config.readiness, ReadinessConfig::default());
    }

    #[test]
    fn test_missing_database_path() {
        let result = Config::from_env_map(HashMap::new());
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_stores_parsed_and_trimmed() {
        let mut env_map = setup_required_env();
        env_map.insert("DB_STORES".to_string(), " settings, notes ,,".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.stores, vec!["settings", "notes"]);
        assert_eq!(config.store_definitions()[1].name, "notes");
    }

    #[test]
    fn test_invalid_store_name() {
        let mut env_map = setup_required_env();
        env_map.insert("DB_STORES".to_string(), "notes; DROP TABLE x".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "DB_STORES"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert("READINESS_MAX_ATTEMPTS".to_string(), "0".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "READINESS_MAX_ATTEMPTS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_retry_delay() {
        let mut env_map = setup_required_env();
        env_map.insert("READINESS_RETRY_DELAY_MS".to_string(), "soon".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "READINESS_RETRY_DELAY_MS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_custom_readiness_settings() {
        let mut env_map = setup_required_env();
        env_map.insert("READINESS_MAX_ATTEMPTS".to_string(), "5".to_string());
        env_map.insert("READINESS_RETRY_DELAY_MS".to_string(), "50".to_string());
        env_map.insert("DB_INIT_TIMEOUT_MS".to_string(), "2000".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.readiness.max_attempts, 5);
        assert_eq!(config.readiness.retry_delay, Duration::from_millis(50));
        assert_eq!(config.init_timeout, Duration::from_secs(2));
    }
}
