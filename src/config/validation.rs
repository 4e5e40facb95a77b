use crate::config::types::{Config, ConnectionConfig, CrawlerConfig, SiteEntry};
use crate::url::registered_host;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_connection_config(&config.connection)?;
    validate_crawler_config(&config.crawler)?;

    if config.lemmatizer.languages.is_empty() {
        return Err(ConfigError::Validation(
            "at least one lemmatizer language is required".to_string(),
        ));
    }

    if config.output.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates connection settings
fn validate_connection_config(config: &ConnectionConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.referer)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid referer: {}", e)))?;

    if config.timeout_ms == 0 || config.timeout_ms > 120_000 {
        return Err(ConfigError::Validation(format!(
            "timeout_ms must be between 1 and 120000, got {}",
            config.timeout_ms
        )));
    }

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 256 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 256, got {}",
            config.max_concurrent_fetches
        )));
    }
    Ok(())
}

/// Validates site entries: parseable http(s) roots, non-empty names, no two
/// entries resolving to the same host
fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for site in sites {
        if site.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Site '{}' must have a name",
                site.url
            )));
        }

        let url = Url::parse(&site.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid site URL '{}': {}", site.url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Site URL '{}' must use HTTP or HTTPS",
                site.url
            )));
        }

        let host = registered_host(&url).ok_or_else(|| {
            ConfigError::InvalidUrl(format!("Site URL '{}' has no host", site.url))
        })?;

        if !seen.insert((host, url.port())) {
            return Err(ConfigError::Validation(format!(
                "Site URL '{}' duplicates another configured site",
                site.url
            )));
        }
    }

    Ok(())
}
