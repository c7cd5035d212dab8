use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, SiteConfig, ThrottleConfig, UserAgentConfig,
};
use crate::url::AllowedDomains;
use crate::ConfigError;
use url::Url;

/// Upper bound for `max-delay`: one hour
const MAX_DELAY_CEILING_MS: u64 = 60 * 60 * 1000;

/// Validates the entire configuration
///
/// Any error here is fatal: the crawl never starts on a bad config.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_throttle_config(&config.throttle)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_site_config(site: &SiteConfig) -> Result<(), ConfigError> {
    if site.allowed_domains.is_empty() {
        return Err(ConfigError::Validation(
            "allowed-domains must list at least one domain".to_string(),
        ));
    }

    for domain in &site.allowed_domains {
        validate_domain_pattern(domain)?;
    }

    let seed = Url::parse(&site.seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", site.seed, e)))?;

    if seed.scheme() != "http" && seed.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use HTTP or HTTPS",
            site.seed
        )));
    }

    let allowed = AllowedDomains::new(&site.allowed_domains);
    if !allowed.contains_url(&seed) {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' is outside the allowed domains {:?}",
            site.seed, site.allowed_domains
        )));
    }

    for dir in &site.document_dirs {
        if !dir.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "document-dirs entry '{}' must start with '/'",
                dir
            )));
        }
    }

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.request_timeout == 0 {
        return Err(ConfigError::Validation(
            "request-timeout must be at least 1 second".to_string(),
        ));
    }

    Ok(())
}

fn validate_throttle_config(config: &ThrottleConfig) -> Result<(), ConfigError> {
    if config.max_delay > MAX_DELAY_CEILING_MS {
        return Err(ConfigError::Validation(format!(
            "max-delay ({}ms) must not exceed {}ms",
            config.max_delay, MAX_DELAY_CEILING_MS
        )));
    }

    if config.min_delay > config.max_delay {
        return Err(ConfigError::Validation(format!(
            "min-delay ({}ms) must not exceed max-delay ({}ms)",
            config.min_delay, config.max_delay
        )));
    }

    if config.base_delay < config.min_delay || config.base_delay > config.max_delay {
        return Err(ConfigError::Validation(format!(
            "base-delay ({}ms) must lie within [{}ms, {}ms]",
            config.base_delay, config.min_delay, config.max_delay
        )));
    }

    if !config.target_concurrency.is_finite() || config.target_concurrency <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "target-concurrency must be a positive number, got {}",
            config.target_concurrency
        )));
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.store_root.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "store-root cannot be empty".to_string(),
        ));
    }

    if let Some(cache_dir) = &config.cache_dir {
        if cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "cache-dir cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates a domain pattern (an optional `*.` prefix is tolerated)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);
    validate_domain_string(domain)
}

fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}

fn validate_email(email: &str) -> Result<(), ConfigError> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
