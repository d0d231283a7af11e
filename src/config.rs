use crate::app_pfd::{AppPfd, AppPfdRegistry};
use crate::ipfilter::IpFilterRule;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppPfdConfig {
    pub app_id: String,
    #[serde(default)]
    pub flow_descriptions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub app_pfds: Vec<AppPfdConfig>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .context("Failed to read config file")?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for app in &self.app_pfds {
            if app.app_id.is_empty() {
                anyhow::bail!("app_id cannot be empty");
            }
            if !seen.insert(app.app_id.as_str()) {
                anyhow::bail!("duplicate app_id: {}", app.app_id);
            }
            for desc in &app.flow_descriptions {
                IpFilterRule::parse(desc, None).with_context(|| {
                    format!("invalid flow description for {}: {:?}", app.app_id, desc)
                })?;
            }
        }
        Ok(())
    }

    pub fn registry(&self) -> AppPfdRegistry {
        self.app_pfds
            .iter()
            .map(|app| AppPfd::new(app.app_id.clone(), app.flow_descriptions.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let config = Config::parse("{}").unwrap();
        assert_eq!(config.log_level, "info");
        assert!(config.app_pfds.is_empty());
        assert!(config.validate().is_ok());
        assert!(config.registry().is_empty());
    }

    #[test]
    fn test_parse_app_pfds() {
        let config = Config::parse(
            r#"
log_level: debug
app_pfds:
  - app_id: video
    flow_descriptions:
      - "permit out 6 from 198.51.100.0/24 443 to assigned"
      - "permit in 6 from assigned to 198.51.100.0/24 443"
  - app_id: dns
    flow_descriptions:
      - "permit out 17 from any 53 to assigned"
"#,
        )
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.log_level, "debug");
        let registry = config.registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("video").unwrap().flow_descs().len(), 2);
        assert_eq!(registry.get("dns").unwrap().app_id(), "dns");
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let config = Config::parse(
            r#"
app_pfds:
  - app_id: video
  - app_id: video
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_app_id() {
        let config = Config::parse("app_pfds:\n  - app_id: \"\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_flow_description() {
        let config = Config::parse(
            r#"
app_pfds:
  - app_id: video
    flow_descriptions:
      - "permit out 6 from 198.51.100.0/40 to assigned"
"#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("video"));
    }
}
