//! Robots.txt parser implementation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate. The
//! non-standard `Crawl-delay` directive is extracted here, once, when the
//! file is parsed.

use robotstxt::DefaultMatcher;
use std::time::Duration;
use url::Url;

/// A `User-agent` group and the crawl delay it declares
#[derive(Debug, Clone, Default)]
struct AgentGroup {
    agents: Vec<String>,
    crawl_delay: Option<f64>,
}

/// Parsed robots.txt for one origin
#[derive(Debug, Clone, Default)]
pub struct ParsedRobots {
    /// Raw body; `None` means allow everything
    body: Option<String>,
    groups: Vec<AgentGroup>,
}

impl ParsedRobots {
    /// Parses raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            body: Some(content.to_string()),
            groups: parse_groups(content),
        }
    }

    /// A permissive robots.txt, used when the file is missing or unreadable
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Checks if `url` may be fetched by the crawler identified by `agent`
    ///
    /// `agent` is the product token (e.g. `pdf-harvester`), not the full
    /// User-Agent header.
    pub fn is_allowed(&self, url: &Url, agent: &str) -> bool {
        match self.body.as_deref() {
            Some(body) if !body.trim().is_empty() => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(body, agent, url.as_str())
            }
            _ => true,
        }
    }

    /// Returns the `Crawl-delay` for `agent`
    ///
    /// A group naming the agent's full product token (case-insensitively)
    /// wins over the `*` group. Values that are negative, not finite, or too
    /// large for a `Duration` are ignored.
    pub fn crawl_delay(&self, agent: &str) -> Option<Duration> {
        let agent = agent.to_lowercase();
        let named = self
            .groups
            .iter()
            .filter(|g| g.agents.iter().any(|a| *a == agent))
            .find_map(|g| g.crawl_delay);
        let wildcard = || {
            self.groups
                .iter()
                .filter(|g| g.agents.iter().any(|a| a == "*"))
                .find_map(|g| g.crawl_delay)
        };

        named
            .or_else(wildcard)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

/// Splits robots.txt into `User-agent` groups
///
/// Consecutive `User-agent` lines share a group; any other directive
/// closes the list of agents for the current group.
fn parse_groups(content: &str) -> Vec<AgentGroup> {
    let mut groups: Vec<AgentGroup> = Vec::new();
    let mut collecting_agents = false;

    for line in content.lines() {
        let line = line.split('#').next().unwrap_or_default().trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                if !collecting_agents {
                    groups.push(AgentGroup::default());
                    collecting_agents = true;
                }
                if let Some(group) = groups.last_mut() {
                    group.agents.push(value.to_lowercase());
                }
            }
            "crawl-delay" => {
                collecting_agents = false;
                if let (Some(group), Ok(delay)) = (groups.last_mut(), value.parse::<f64>()) {
                    group.crawl_delay.get_or_insert(delay);
                }
            }
            _ => collecting_agents = false,
        }
    }

    groups
}
