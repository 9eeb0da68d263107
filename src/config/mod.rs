//! Configuration for sitescribe

mod crawl;
mod database;
mod logging;

pub use crawl::CrawlConfig;
pub use database::DatabaseConfig;
pub use logging::{LogLevel, LoggingConfig};

use anyhow::Result;

use crate::fetch::FetchMode;

/// Default user agent for all HTTP requests
pub const DEFAULT_USER_AGENT: &str = "sitescribe/0.1 (+https://github.com/sitescribe)";

/// Main configuration for a crawl
#[derive(Debug, Clone)]
pub struct Config {
    /// Crawl orchestration configuration
    pub crawl: CrawlConfig,
    /// Persistence store configuration
    pub database: DatabaseConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Build configuration from the environment plus CLI-provided values.
    pub fn from_env(max_pages: usize, fetch_mode: FetchMode, recrawl: bool) -> Result<Self> {
        let config = Self {
            crawl: CrawlConfig {
                max_pages,
                fetch_mode,
                recrawl,
                ..CrawlConfig::default()
            },
            database: DatabaseConfig::from_env()?,
            logging: LoggingConfig::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together so the user
    /// can fix everything in one pass.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.crawl.concurrency == 0 {
            errors.push("concurrency must be positive".to_string());
        }
        if self.crawl.concurrency > 256 {
            errors.push("concurrency must be <= 256".to_string());
        }
        if self.crawl.max_pages == 0 {
            errors.push("max_pages must be positive".to_string());
        }
        if self.crawl.request_timeout_secs == 0 {
            errors.push("request_timeout_secs must be positive".to_string());
        }
        if self.crawl.progress_interval == 0 {
            errors.push("progress_interval must be positive".to_string());
        }
        if self.crawl.user_agent.trim().is_empty() {
            errors.push("user_agent must not be empty".to_string());
        }

        if self.database.host.trim().is_empty() {
            errors.push("database host must not be empty".to_string());
        }
        if self.database.port == 0 {
            errors.push("database port must be between 1 and 65535".to_string());
        }
        if self.database.user.trim().is_empty() {
            errors.push("database user must not be empty".to_string());
        }
        if self.database.database.trim().is_empty() {
            errors.push("database name must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            crawl: CrawlConfig::default(),
            database: DatabaseConfig {
                host: "localhost".to_string(),
                port: 5432,
                user: "crawler".to_string(),
                password: "secret".to_string(),
                database: "sitescribe".to_string(),
            },
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn default_config_passes_validation() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut cfg = valid_config();
        cfg.crawl.concurrency = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("concurrency must be positive"));
    }

    #[test]
    fn validate_rejects_zero_max_pages() {
        let mut cfg = valid_config();
        cfg.crawl.max_pages = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("max_pages must be positive"));
    }

    #[test]
    fn validate_rejects_empty_database_host() {
        let mut cfg = valid_config();
        cfg.database.host = String::new();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("database host must not be empty"));
    }

    #[test]
    fn validate_collects_multiple_errors() {
        let mut cfg = valid_config();
        cfg.crawl.concurrency = 0;
        cfg.crawl.max_pages = 0;
        cfg.database.user = String::new();
        let err = cfg.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("concurrency must be positive"));
        assert!(msg.contains("max_pages must be positive"));
        assert!(msg.contains("database user must not be empty"));
    }
}
