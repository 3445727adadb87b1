//! Server configuration read from the environment.

use std::net::SocketAddr;

use snapvault_repository::RepositoryConfig;
use thiserror::Error;

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default bind port.
pub const DEFAULT_PORT: u16 = 3000;

/// An environment variable holds a value that cannot be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The value does not parse as the expected type.
    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Runtime configuration for the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// PostgreSQL connection string. `None` runs on in-memory backends.
    pub database_url: Option<String>,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Repository tunables.
    pub repository: RepositoryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            repository: RepositoryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads `DATABASE_URL`, `HOST`, `PORT`, `SNAPVAULT_NOTIFIER_CAPACITY` and
    /// `SNAPVAULT_SERIALIZE_WRITES` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a set variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`AppConfig::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a set variable cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            ..Self::default()
        };
        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.port = parse("PORT", port)?;
        }
        if let Some(capacity) = lookup("SNAPVAULT_NOTIFIER_CAPACITY") {
            let capacity = parse("SNAPVAULT_NOTIFIER_CAPACITY", capacity)?;
            config.repository = config.repository.with_notifier_capacity(capacity);
        }
        if let Some(enabled) = lookup("SNAPVAULT_SERIALIZE_WRITES") {
            let enabled = parse("SNAPVAULT_SERIALIZE_WRITES", enabled)?;
            config.repository = config.repository.with_serialize_writes(enabled);
        }
        Ok(config)
    }

    /// The socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `host:port` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            name: "HOST",
            value: raw,
            reason: e.to_string(),
        })
    }
}

fn parse<T>(name: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.bind_addr().unwrap().port(), 3000);
    }

    #[test]
    fn test_reads_every_variable() {
        // Arrange
        let lookup = lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/snapvault"),
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("SNAPVAULT_NOTIFIER_CAPACITY", "16"),
            ("SNAPVAULT_SERIALIZE_WRITES", "false"),
        ]);

        // Act
        let config = AppConfig::from_lookup(lookup).unwrap();

        // Assert
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/snapvault")
        );
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(config.repository.notifier_capacity, 16);
        assert!(!config.repository.serialize_writes);
    }

    #[test]
    fn test_blank_database_url_means_in_memory() {
        let config = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "  ")])).unwrap();

        assert_eq!(config.database_url, None);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[("PORT", "eighty")]));

        match result.unwrap_err() {
            ConfigError::Invalid { name, value, .. } => {
                assert_eq!(name, "PORT");
                assert_eq!(value, "eighty");
            }
        }
    }
}
