mod defaults;
mod types;

pub use types::*;

use crate::error::ConfigError;
use defaults::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            council_models: default_council_models(),
            chairman_model: default_chairman_model(),
            provider: Provider::default(),
            providers: ProvidersConfig::default(),
            timeout_sec: default_timeout_sec(),
            chairman_timeout_sec: default_chairman_timeout_sec(),
            allow_unknown_models: false,
            report_dir: None,
            preview: PreviewConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load an explicitly requested file, or `council.yaml` when it exists,
    /// or fall back to built-in defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Validate the config
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.council_models.is_empty() {
            return Err(ConfigError::EmptyCouncil);
        }

        let mut seen = HashSet::new();
        for model in &self.council_models {
            if model.trim().is_empty() {
                return Err(ConfigError::EmptyModelId);
            }
            if !seen.insert(model.as_str()) {
                return Err(ConfigError::DuplicateModel(model.clone()));
            }
        }

        if self.chairman_model.trim().is_empty() {
            return Err(ConfigError::EmptyModelId);
        }

        if self.timeout_sec == 0 {
            return Err(ConfigError::ZeroTimeout("timeout_sec"));
        }
        if self.chairman_timeout_sec == 0 {
            return Err(ConfigError::ZeroTimeout("chairman_timeout_sec"));
        }

        if !self.allow_unknown_models {
            let known = self.provider.known_models();
            for model in self.council_models.iter().chain(Some(&self.chairman_model)) {
                if !known.contains(&model.as_str()) {
                    return Err(ConfigError::UnknownModel {
                        model: model.clone(),
                        provider: self.provider.to_string(),
                        known: known.join(", "),
                    });
                }
            }
        }

        Ok(())
    }

    /// False when the chairman only takes part in Stage 3.
    pub fn chairman_in_council(&self) -> bool {
        self.council_models.contains(&self.chairman_model)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec)
    }

    pub fn chairman_timeout(&self) -> Duration {
        Duration::from_secs(self.chairman_timeout_sec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.chairman_in_council());
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert_eq!(config.chairman_timeout(), Duration::from_secs(180));
    }

    #[test]
    fn test_parse_partial_yaml_fills_defaults() {
        let yaml = r#"
council_models: [opus-4.5, gpt-5]
chairman_model: opus-4.5
timeout_sec: 30
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.council_models, vec!["opus-4.5", "gpt-5"]);
        assert_eq!(config.chairman_model, "opus-4.5");
        assert_eq!(config.timeout_sec, 30);
        assert_eq!(config.chairman_timeout_sec, 180);
        assert_eq!(config.provider, Provider::CursorAgent);
        assert_eq!(config.preview.answer_chars, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_provider_section() {
        let yaml = r#"
provider: claude_cli
council_models: [sonnet, opus]
chairman_model: opus
providers:
  claude_cli:
    binary: /opt/claude
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider, Provider::ClaudeCli);
        assert_eq!(config.providers.claude_cli.binary, PathBuf::from("/opt/claude"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_council() {
        let config = Config {
            council_models: vec![],
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyCouncil)));
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let config = Config {
            council_models: vec!["gpt-5".to_string(), "gpt-5".to_string()],
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateModel(m)) if m == "gpt-5"
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_chairman() {
        let config = Config {
            chairman_model: "mystery-9".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownModel { model, .. }) if model == "mystery-9"
        ));
    }

    #[test]
    fn test_allow_unknown_models() {
        let config = Config {
            council_models: vec!["m1".to_string(), "m2".to_string()],
            chairman_model: "m1".to_string(),
            allow_unknown_models: true,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chairman_outside_council_is_implicit_participant() {
        let config = Config {
            chairman_model: "opus-4.5".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
        assert!(!config.chairman_in_council());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = Config {
            timeout_sec: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroTimeout("timeout_sec"))
        ));
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("cursor-agent".parse::<Provider>().unwrap(), Provider::CursorAgent);
        assert_eq!("claude".parse::<Provider>().unwrap(), Provider::ClaudeCli);
        assert!("bard".parse::<Provider>().is_err());
    }
}
