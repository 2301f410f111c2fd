use crate::features::FeatureConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// How long a run may stay in `PROCESSING` before the watchdog fails it.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60 * 30;

const DEFAULT_SEER_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Listener and admin listener cannot share {0}")]
    ListenerConflict(String),

    #[error("Unsupported seer URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("{0} cannot be 0")]
    ZeroDuration(&'static str),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for the autofix endpoints
    pub listener: Listener,
    /// Listener for health and readiness probes
    pub admin_listener: Listener,
    pub seer: SeerConfig,
    /// Seconds before a run that Seer never finished is marked as failed
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Feature name to rollout, e.g. `projects:ai-autofix`
    #[serde(default)]
    pub features: HashMap<String, FeatureConfig>,
    /// JSON file with groups, events and code mappings to serve from memory
    #[serde(default)]
    pub fixtures_path: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.listener == self.admin_listener {
            return Err(ValidationError::ListenerConflict(format!(
                "{}:{}",
                self.listener.host, self.listener.port
            )));
        }

        self.seer.validate()?;

        if self.timeout_secs == 0 {
            return Err(ValidationError::ZeroDuration("timeout_secs"));
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SeerConfig {
    /// Base URL of Seer; the autofix path is appended to it
    pub autofix_url: Url,
    #[serde(default = "default_seer_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_seer_request_timeout_secs() -> u64 {
    DEFAULT_SEER_REQUEST_TIMEOUT_SECS
}

impl SeerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self.autofix_url.scheme() {
            "http" | "https" => {}
            other => return Err(ValidationError::UnsupportedScheme(other.to_string())),
        }

        if self.request_timeout_secs == 0 {
            return Err(ValidationError::ZeroDuration("seer.request_timeout_secs"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::AI_AUTOFIX_FEATURE;
    use std::collections::HashSet;

    fn base_config() -> Config {
        Config {
            listener: Listener {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            admin_listener: Listener {
                host: "127.0.0.1".to_string(),
                port: 3001,
            },
            seer: SeerConfig {
                autofix_url: Url::parse("http://seer.internal:9091").unwrap(),
                request_timeout_secs: 30,
            },
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            features: HashMap::new(),
            fixtures_path: None,
        }
    }

    #[test]
    fn test_parse_valid_config() {
        let yaml = r#"
listener:
    host: "0.0.0.0"
    port: 3000
admin_listener:
    host: "127.0.0.1"
    port: 3001
seer:
    autofix_url: "http://seer.internal:9091"
features:
    projects:ai-autofix:
        projects: [1, 2]
fixtures_path: /etc/autofix/fixtures.json
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.timeout(), Duration::from_secs(1800));
        assert_eq!(config.seer.request_timeout(), Duration::from_secs(30));
        assert_eq!(
            config.features[AI_AUTOFIX_FEATURE],
            FeatureConfig {
                enabled: false,
                projects: HashSet::from([1, 2]),
            }
        );
        assert_eq!(
            config.fixtures_path,
            Some(PathBuf::from("/etc/autofix/fixtures.json"))
        );
    }

    #[test]
    fn test_validation_errors() {
        let mut config = base_config();
        config.listener.port = 0;
        assert!(matches!(
            config.validate().unwrap_err(),
            ValidationError::InvalidPort
        ));

        let mut config = base_config();
        config.admin_listener = config.listener.clone();
        assert!(matches!(
            config.validate().unwrap_err(),
            ValidationError::ListenerConflict(_)
        ));

        let mut config = base_config();
        config.seer.autofix_url = Url::parse("ftp://seer.internal").unwrap();
        assert!(matches!(
            config.validate().unwrap_err(),
            ValidationError::UnsupportedScheme(_)
        ));

        let mut config = base_config();
        config.timeout_secs = 0;
        assert!(matches!(
            config.validate().unwrap_err(),
            ValidationError::ZeroDuration("timeout_secs")
        ));

        let mut config = base_config();
        config.seer.request_timeout_secs = 0;
        assert!(matches!(
            config.validate().unwrap_err(),
            ValidationError::ZeroDuration(_)
        ));
    }

    #[test]
    fn test_deserialization_errors() {
        // Invalid URL
        assert!(
            serde_yaml::from_str::<Config>(
                r#"
listener: {host: "0.0.0.0", port: 3000}
admin_listener: {host: "127.0.0.1", port: 3001}
seer: {autofix_url: "not-a-url"}
"#
            )
            .is_err()
        );

        // Missing seer section
        assert!(
            serde_yaml::from_str::<Config>(
                r#"
listener: {host: "0.0.0.0", port: 3000}
admin_listener: {host: "127.0.0.1", port: 3001}
"#
            )
            .is_err()
        );
    }
}
