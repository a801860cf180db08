//! Process-wide configuration, loaded once at startup.
//!
//! Everything comes from environment variables so the service can be dropped
//! into a container platform without a config file. The auth token is the only
//! hard requirement; the language-model credentials are optional because the
//! execute path must keep working when keyword extraction is not provisioned.

use std::net::SocketAddr;
use std::time::Duration;

use crate::errors::CoreError;

/// Default execution timeout applied to browser launch, navigation waits and
/// per-operation waits alike.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

const DEFAULT_PORT: u16 = 4000;
const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub server: ServerSettings,
    pub browser: BrowserSettings,
    pub llm: LlmSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind_addr: SocketAddr,
    pub auth_token: String,
}

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Bounds browser launch, default navigation waits and default
    /// per-operation waits. One knob for all three.
    pub timeout: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load the configuration from the process environment.
    ///
    /// Recognized variables: `SECURE_TOKEN` (required), `PORT`,
    /// `EXEC_TIMEOUT_MS`, `OPENAI_API_KEY`, `OPENAI_API_BASE`, `OPENAI_MODEL`.
    pub fn from_env() -> Result<Self, CoreError> {
        let auth_token = required_var("SECURE_TOKEN")?;

        let port = match optional_var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| CoreError::Config(format!("invalid PORT '{}': {}", raw, e)))?,
            None => DEFAULT_PORT,
        };
        let bind_addr = SocketAddr::from(([0, 0, 0, 0], port));

        let timeout_ms = match optional_var("EXEC_TIMEOUT_MS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                CoreError::Config(format!("invalid EXEC_TIMEOUT_MS '{}': {}", raw, e))
            })?,
            None => DEFAULT_TIMEOUT_MS,
        };

        let llm_defaults = LlmSettings::default();
        let config = Self {
            server: ServerSettings {
                bind_addr,
                auth_token,
            },
            browser: BrowserSettings {
                timeout: Duration::from_millis(timeout_ms),
            },
            llm: LlmSettings {
                api_key: optional_var("OPENAI_API_KEY"),
                api_base: optional_var("OPENAI_API_BASE").unwrap_or(llm_defaults.api_base),
                model: optional_var("OPENAI_MODEL").unwrap_or(llm_defaults.model),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.server.auth_token.trim().is_empty() {
            return Err(CoreError::Config(
                "SECURE_TOKEN must not be empty".to_string(),
            ));
        }
        if self.browser.timeout.is_zero() {
            return Err(CoreError::Config(
                "EXEC_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn required_var(name: &str) -> Result<String, CoreError> {
    optional_var(name).ok_or_else(|| CoreError::Config(format!("{} must be set", name)))
}

fn optional_var(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [
            "SECURE_TOKEN",
            "PORT",
            "EXEC_TIMEOUT_MS",
            "OPENAI_API_KEY",
            "OPENAI_API_BASE",
            "OPENAI_MODEL",
        ] {
            std::env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn loads_defaults_when_only_token_is_set() {
        clear_env();
        std::env::set_var("SECURE_TOKEN", "s3cret");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.server.auth_token, "s3cret");
        assert_eq!(config.server.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(
            config.browser.timeout,
            Duration::from_millis(DEFAULT_TIMEOUT_MS)
        );
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.llm.model, DEFAULT_OPENAI_MODEL);
    }

    #[test]
    #[serial]
    fn missing_token_is_a_config_error() {
        clear_env();
        let err = ServiceConfig::from_env().unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    #[serial]
    fn rejects_unparseable_port_and_timeout() {
        clear_env();
        std::env::set_var("SECURE_TOKEN", "s3cret");
        std::env::set_var("PORT", "not-a-port");
        assert!(matches!(
            ServiceConfig::from_env(),
            Err(CoreError::Config(_))
        ));

        std::env::set_var("PORT", "8080");
        std::env::set_var("EXEC_TIMEOUT_MS", "soon");
        assert!(matches!(
            ServiceConfig::from_env(),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    #[serial]
    fn reads_overrides() {
        clear_env();
        std::env::set_var("SECURE_TOKEN", "s3cret");
        std::env::set_var("PORT", "9999");
        std::env::set_var("EXEC_TIMEOUT_MS", "1500");
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("OPENAI_MODEL", "gpt-4o");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.server.bind_addr.port(), 9999);
        assert_eq!(config.browser.timeout, Duration::from_millis(1500));
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.model, "gpt-4o");
    }

    #[test]
    #[serial]
    fn zero_timeout_fails_validation() {
        clear_env();
        std::env::set_var("SECURE_TOKEN", "s3cret");
        std::env::set_var("EXEC_TIMEOUT_MS", "0");
        assert!(matches!(
            ServiceConfig::from_env(),
            Err(CoreError::Config(_))
        ));
    }
}
