use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_OUTPUT_DIR: &str = "cloned_website";
pub const DEFAULT_DELAY_MS: u64 = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!(
    "page-mirror/",
    env!("CARGO_PKG_VERSION"),
    " (+offline single-page snapshot)"
);

/// A `(tag, attribute)` pair naming an element kind whose attribute points
/// at a resource worth mirroring.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRule {
    pub tag: String,
    pub attribute: String,
}

impl ResourceRule {
    pub fn new(tag: &str, attribute: &str) -> Self {
        Self {
            tag: tag.trim().to_ascii_lowercase(),
            attribute: attribute.trim().to_ascii_lowercase(),
        }
    }
}

impl FromStr for ResourceRule {
    type Err = String;

    /// Parses `TAG:ATTR`, e.g. `source:src`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, attribute) = s
            .split_once(':')
            .ok_or_else(|| format!("expected TAG:ATTR, got {s:?}"))?;
        let rule = Self::new(tag, attribute);
        if rule.tag.is_empty() || rule.attribute.is_empty() {
            return Err(format!("expected TAG:ATTR, got {s:?}"));
        }
        Ok(rule)
    }
}

impl fmt::Display for ResourceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tag, self.attribute)
    }
}

/// The ordered set of rules deciding which elements are resource references.
///
/// Order matters: for a given element the first rule for its tag whose
/// attribute is present wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRules {
    rules: Vec<ResourceRule>,
}

impl ResourceRules {
    /// Stylesheets and other `<link>` targets, images and scripts.
    pub fn standard() -> Self {
        Self {
            rules: vec![
                ResourceRule::new("link", "href"),
                ResourceRule::new("img", "src"),
                ResourceRule::new("script", "src"),
            ],
        }
    }

    /// [`standard`](Self::standard) plus audio, video and frames.
    pub fn with_media() -> Self {
        let mut rules = Self::standard();
        for tag in ["video", "audio", "iframe"] {
            rules.push(ResourceRule::new(tag, "src"));
        }
        rules
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule unless an identical one is already present.
    pub fn push(&mut self, rule: ResourceRule) {
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
    }

    /// Attributes to look at, in priority order, for elements named `tag`.
    pub fn attributes_for<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.rules
            .iter()
            .filter(move |rule| rule.tag == tag)
            .map(|rule| rule.attribute.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for ResourceRules {
    fn default() -> Self {
        Self::standard()
    }
}

/// Everything a run needs to know, threaded explicitly through the
/// orchestrator and the writer.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub output_dir: PathBuf,
    /// Minimum spacing between two outbound requests.
    pub politeness_delay: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub follow_redirects: bool,
    pub rules: ResourceRules,
    pub show_progress: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            politeness_delay: Duration::from_millis(DEFAULT_DELAY_MS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            follow_redirects: true,
            rules: ResourceRules::standard(),
            show_progress: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rule() {
        let rule: ResourceRule = "SOURCE: src".parse().unwrap();
        assert_eq!(rule, ResourceRule::new("source", "src"));
        assert_eq!(rule.to_string(), "source:src");
    }

    #[test]
    fn test_rule_display_parses_back() {
        for rule in ResourceRules::with_media().iter() {
            let reparsed: ResourceRule = rule.to_string().parse().unwrap();
            assert_eq!(&reparsed, rule);
        }
    }

    #[test]
    fn test_parse_rule_rejects_malformed() {
        assert!("source".parse::<ResourceRule>().is_err());
        assert!(":src".parse::<ResourceRule>().is_err());
        assert!("img:".parse::<ResourceRule>().is_err());
    }

    #[test]
    fn test_rule_priority_per_tag() {
        let mut rules = ResourceRules::standard();
        rules.push(ResourceRule::new("img", "data-src"));
        let attrs: Vec<_> = rules.attributes_for("img").collect();
        assert_eq!(attrs, vec!["src", "data-src"]);
        assert_eq!(rules.attributes_for("video").count(), 0);
    }

    #[test]
    fn test_media_rules_extend_standard() {
        let rules = ResourceRules::with_media();
        assert_eq!(rules.len(), 6);
        assert!(rules.iter().any(|r| r.tag == "iframe" && r.attribute == "src"));
    }

    #[test]
    fn test_push_ignores_duplicates() {
        let mut rules = ResourceRules::standard();
        rules.push(ResourceRule::new("img", "src"));
        assert_eq!(rules.len(), 3);
    }

    #[test]
    fn test_default_config() {
        let config = MirrorConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("cloned_website"));
        assert_eq!(config.politeness_delay, Duration::from_millis(100));
        assert!(config.follow_redirects);
        assert!(config.user_agent.starts_with("page-mirror/"));
    }
}
