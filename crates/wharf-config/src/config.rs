use std::{collections::HashSet, fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    access::{AccessPolicy, PackageAccess},
    error::{ConfigError, Result},
    time::parse_duration,
    uplink::UplinkConfig,
};

/// Process configuration for a wharf instance.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Configured uplink registries, in merge-precedence order.
    #[serde(default)]
    pub uplinks: Vec<UplinkConfig>,

    /// Per-package access rules, evaluated in order.
    #[serde(default)]
    pub packages: Vec<PackageAccess>,

    /// Recompute the `latest` dist-tag from known versions instead of
    /// trusting upstream's claim.
    /// Default: false
    pub ignore_latest_tag: Option<bool>,

    /// User agent sent on uplink requests.
    /// Default: "wharf"
    pub user_agent: Option<String>,
}

impl Config {
    /// Parses and validates a configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading configuration from {}", path.display());
        let content = fs::read_to_string(path).map_err(|err| ConfigError::IoError {
            action: format!("reading config file {}", path.display()),
            source: err,
        })?;
        Self::from_str(&content)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for uplink in &self.uplinks {
            if !seen.insert(uplink.name.as_str()) {
                return Err(ConfigError::DuplicateUplink(uplink.name.clone()));
            }
            for duration in [&uplink.max_age, &uplink.timeout].into_iter().flatten() {
                if parse_duration(duration).is_none() {
                    return Err(ConfigError::InvalidDuration(duration.clone()));
                }
            }
        }

        for rule in &self.packages {
            for uplink in &rule.proxy {
                if !seen.contains(uplink.as_str()) {
                    return Err(ConfigError::UnknownUplink {
                        pattern: rule.pattern.clone(),
                        uplink: uplink.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy::new(self.packages.clone())
    }

    pub fn ignore_latest_tag(&self) -> bool {
        self.ignore_latest_tag.unwrap_or(false)
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or("wharf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        ignore_latest_tag = true

        [[uplinks]]
        name = "npmjs"
        url = "https://registry.npmjs.org/"
        max_age = "10m"

        [[uplinks]]
        name = "corp"
        url = "https://npm.corp.example/"
        timeout = "5s"

        [[packages]]
        pattern = "@corp/*"
        proxy = ["corp"]
    "#;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_str(SAMPLE).unwrap();
        assert_eq!(config.uplinks.len(), 2);
        assert_eq!(config.uplinks[0].name, "npmjs");
        assert!(config.ignore_latest_tag());
        assert_eq!(config.user_agent(), "wharf");

        let policy = config.access_policy();
        assert!(policy.proxy_access("@corp/tool", "corp"));
        assert!(!policy.proxy_access("@corp/tool", "npmjs"));
    }

    #[test]
    fn test_duplicate_uplink_rejected() {
        let content = r#"
            [[uplinks]]
            name = "npmjs"
            url = "https://a.example/"

            [[uplinks]]
            name = "npmjs"
            url = "https://b.example/"
        "#;
        assert!(matches!(
            Config::from_str(content),
            Err(ConfigError::DuplicateUplink(_))
        ));
    }

    #[test]
    fn test_invalid_duration_rejected() {
        let content = r#"
            [[uplinks]]
            name = "npmjs"
            url = "https://registry.npmjs.org/"
            max_age = "10x"
        "#;
        assert!(matches!(
            Config::from_str(content),
            Err(ConfigError::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_unknown_uplink_in_rule_rejected() {
        let content = r#"
            [[packages]]
            pattern = "*"
            proxy = ["ghost"]
        "#;
        assert!(matches!(
            Config::from_str(content),
            Err(ConfigError::UnknownUplink { .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, SAMPLE).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.uplinks.len(), 2);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::from_str("").unwrap();
        assert!(config.uplinks.is_empty());
        assert!(!config.ignore_latest_tag());
    }
}
