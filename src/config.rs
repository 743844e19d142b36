use std::{
    env,
    fs::{self, File},
    io::Write,
    path::PathBuf,
};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_yaml::Deserializer;

use crate::sources::{CustomSource, DEFAULT_CLIENT_ID};

const APP_NAME: &str = "viral";
const DEFAULT_DISPLAY_LIMIT: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub api_base: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub user_agent: Option<String>,
    pub article_filter: Option<bool>,
    pub display_limit: Option<usize>,
    #[serde(default)]
    pub custom_sources: Vec<CustomSource>,
}

pub struct EnsureOutcome {
    pub path: PathBuf,
    pub created: bool,
}

impl Config {
    pub fn ensure_user_config() -> Result<EnsureOutcome> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_NAME);

        if let Some(path) = xdg_dirs.find_config_file("config.yaml") {
            return Ok(EnsureOutcome {
                path,
                created: false,
            });
        }

        let config_path = xdg_dirs
            .place_config_file("config.yaml")
            .context("Cannot create configuration directory")?;
        let mut config_file = File::create(&config_path)?;

        write!(
            &mut config_file,
            r#"# viral config (YAML)
# api_key and model are required; everything else is optional.
# VIRAL_API_KEY, VIRAL_MODEL and VIRAL_API_BASE override the values below.

api_key: "<your OpenAI-compatible API key>"
model: "gpt-4o-2024-08-06"

# api_base: "https://api.openai.com/v1"
# output_dir: "/path/to/video/packages"
# user_agent: "{DEFAULT_CLIENT_ID}"

# Only keep links to known news publishers (same as --news)
# article_filter: false

# How many topics the menu shows
# display_limit: {DEFAULT_DISPLAY_LIMIT}

# Extra sources usable with --preset <name>
# custom_sources:
#   - name: "cats"
#     channels: ["cats", "aww"]
#     limit: 25
#     minimum_score: 300
"#
        )?;

        Ok(EnsureOutcome {
            path: config_path,
            created: true,
        })
    }

    pub fn get_user_config() -> Result<Config> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_NAME).find_config_file("config.yaml");

        let Some(existing_config) = &xdg_dirs else {
            return Err(anyhow!(
                "Could not read configuration file in config::get_user_config"
            ));
        };

        let raw = fs::read_to_string(existing_config)
            .with_context(|| format!("Failed to read {}", existing_config.display()))?;
        let mut config = Config::from_yaml(&raw)
            .with_context(|| format!("Invalid config at {}", existing_config.display()))?;
        config.apply_env_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Config> {
        let deserialized = Deserializer::from_str(raw);
        serde_path_to_error::deserialize(deserialized)
            .map_err(|e| anyhow!("Invalid YAML at `{}`: {}", e.path(), e.inner()))
    }

    /// Non-empty `VIRAL_*` variables win over the file.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup("VIRAL_API_KEY") {
            self.api_key = key;
        }
        if let Some(model) = lookup("VIRAL_MODEL") {
            self.model = model;
        }
        if let Some(base) = lookup("VIRAL_API_BASE") {
            self.api_base = Some(base);
        }
    }

    /// Only needed before model calls; `--no-ai` runs work without a key.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() || self.api_key.starts_with('<') {
            return Err(anyhow!(
                "api_key is not set. Edit the config file or export VIRAL_API_KEY."
            ));
        }
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must not be empty"));
        }
        Ok(())
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_CLIENT_ID)
    }

    pub fn display_limit(&self) -> usize {
        self.display_limit.unwrap_or(DEFAULT_DISPLAY_LIMIT).max(1)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "api_key: \"sk-test\"\nmodel: \"gpt-4o-mini\"\n";

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = Config::from_yaml(MINIMAL).unwrap();

        assert_eq!(cfg.user_agent(), DEFAULT_CLIENT_ID);
        assert_eq!(cfg.display_limit(), DEFAULT_DISPLAY_LIMIT);
        assert_eq!(cfg.output_dir(), PathBuf::from("."));
        assert!(cfg.custom_sources.is_empty());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn error_names_the_bad_path() {
        let raw = "api_key: x\nmodel: y\ncustom_sources:\n  - name: cats\n    channels: [cats]\n    limit: lots\n";
        let err = Config::from_yaml(raw).unwrap_err().to_string();
        assert!(err.contains("custom_sources[0].limit"), "{err}");
    }

    #[test]
    fn env_overrides_win_unless_blank() {
        let mut cfg = Config::from_yaml(MINIMAL).unwrap();
        cfg.apply_env_overrides(|key| match key {
            "VIRAL_API_KEY" => Some("sk-env".into()),
            "VIRAL_MODEL" => Some("  ".into()),
            "VIRAL_API_BASE" => Some("http://localhost:8080/v1".into()),
            _ => None,
        });

        assert_eq!(cfg.api_key, "sk-env");
        assert_eq!(cfg.model, "gpt-4o-mini");
        assert_eq!(cfg.api_base.as_deref(), Some("http://localhost:8080/v1"));
    }

    #[test]
    fn template_placeholder_key_is_rejected() {
        let cfg = Config::from_yaml("api_key: \"<your key>\"\nmodel: m\n").unwrap();
        assert!(cfg.validate().is_err());
    }
}
