use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// The site being harvested
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    /// URL the crawl starts from
    pub seed: String,

    /// Domains whose hosts may be visited; a host matches when it equals an
    /// entry or ends with `.` + entry. `*.` prefixes are accepted and ignored.
    pub allowed_domains: Vec<String>,

    /// Path segments that mark document directories (e.g. `/assets/media/`)
    #[serde(default = "default_document_dirs")]
    pub document_dirs: Vec<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of simultaneous fetches
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Maximum link depth from the seed; 0 means unlimited
    #[serde(default)]
    pub depth_limit: u32,

    /// Extra attempts after a retryable fetch failure
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,

    /// Maximum redirect hops per request
    #[serde(default = "default_redirect_limit")]
    pub redirect_limit: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Whether robots.txt directives are honored
    #[serde(default = "default_true")]
    pub obey_robots: bool,

    /// Skip documents already present under the store root
    #[serde(default = "default_true")]
    pub skip_existing: bool,
}

/// Rate governor bounds (milliseconds) and setpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ThrottleConfig {
    #[serde(default = "default_base_delay")]
    pub base_delay: u64,

    #[serde(default = "default_min_delay")]
    pub min_delay: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay: u64,

    /// Average number of requests the governor steers toward having in flight
    #[serde(default = "default_target_concurrency")]
    pub target_concurrency: f64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Email address for crawler-related contact
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Base directory for harvested PDFs
    pub store_root: PathBuf,

    /// Directory of the response cache; caching is disabled when absent
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Age in seconds after which cached responses are refetched; 0 never expires
    #[serde(default)]
    pub cache_expiration: u64,

    /// Optional markdown report written at the end of a run
    #[serde(default)]
    pub summary_path: Option<PathBuf>,
}

impl ThrottleConfig {
    pub fn base(&self) -> Duration {
        Duration::from_millis(self.base_delay)
    }

    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_delay)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_delay)
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            depth_limit: 0,
            retry_budget: default_retry_budget(),
            redirect_limit: default_redirect_limit(),
            request_timeout: default_request_timeout(),
            obey_robots: true,
            skip_existing: true,
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            base_delay: default_base_delay(),
            min_delay: default_min_delay(),
            max_delay: default_max_delay(),
            target_concurrency: default_target_concurrency(),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "pdf-harvester".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}

fn default_document_dirs() -> Vec<String> {
    vec!["/assets/media/".to_string()]
}

fn default_concurrency() -> u32 {
    8
}

fn default_retry_budget() -> u32 {
    2
}

fn default_redirect_limit() -> u32 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_base_delay() -> u64 {
    500
}

fn default_min_delay() -> u64 {
    250
}

fn default_max_delay() -> u64 {
    5000
}

fn default_target_concurrency() -> f64 {
    2.0
}
