use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

pub const PRODUCTION_BASE_URL: &str = "https://api.sonicbilling.com";
pub const STAGING_BASE_URL: &str = "https://staging-api.sonicbilling.com";
pub const DEVELOPMENT_BASE_URL: &str = "http://localhost:8000";

/// Deployment the client talks to when no explicit base URL is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    #[default]
    Development,
}

impl Environment {
    pub fn base_url(self) -> &'static str {
        match self {
            Environment::Production => PRODUCTION_BASE_URL,
            Environment::Staging => STAGING_BASE_URL,
            Environment::Development => DEVELOPMENT_BASE_URL,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Development => "development",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            "development" => Ok(Environment::Development),
            other => Err(format!("Unknown Sonic environment: {}", other)),
        }
    }
}

/// Immutable configuration for one client instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_key: String,
    /// Takes precedence over `env` when non-empty.
    pub base_url: Option<String>,
    pub env: Option<Environment>,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = Some(env);
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Picks the base address for a client: explicit `base_url` first, then the
/// environment mapping (development when unset).
pub fn resolve_base_url(config: &ClientConfig) -> String {
    match config.base_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => config.env.unwrap_or_default().base_url().to_string(),
    }
}

/// Settings for the command-line front end, read from `SONIC_*` variables
/// (and a `.env` file when present).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api_key: String,
    pub base_url: Option<String>,
    pub env: Option<String>,
    pub user_email: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix("SONIC"))
            .build()?;

        Self::from_config(cfg)
    }

    pub fn from_config(cfg: config::Config) -> Result<Self, config::ConfigError> {
        let settings: Settings = cfg.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if let Some(env) = self.env.as_deref().filter(|e| !e.trim().is_empty()) {
            env.parse::<Environment>()
                .map_err(config::ConfigError::Message)?;
        }

        if let Some(url) = self.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
            let parsed = url::Url::parse(url.trim()).map_err(|e| {
                config::ConfigError::Message(format!("Invalid SONIC_BASE_URL {}: {}", url, e))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(config::ConfigError::Message(format!(
                    "SONIC_BASE_URL must use http or https, got {}",
                    parsed.scheme()
                )));
            }
        }

        if let Some(email) = self.user_email.as_deref().filter(|e| !e.trim().is_empty()) {
            if !looks_like_email(email) {
                return Err(config::ConfigError::Message(format!(
                    "Invalid SONIC_USER_EMAIL: {}",
                    email
                )));
            }
        }

        Ok(())
    }

    pub fn environment(&self) -> Option<Environment> {
        self.env
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .and_then(|e| e.parse().ok())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_key: self.api_key.trim().to_string(),
            base_url: self
                .base_url
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            env: self.environment(),
        }
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.trim().split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with(pairs: &[(&str, &str)]) -> Result<Settings, config::ConfigError> {
        let mut builder = config::Config::builder();
        for (key, value) in pairs {
            builder = builder.set_override(*key, *value)?;
        }
        Settings::from_config(builder.build()?)
    }

    #[test]
    fn explicit_base_url_wins_over_env() {
        let config = ClientConfig::new("key")
            .with_env(Environment::Production)
            .with_base_url("https://billing.internal.example");
        assert_eq!(resolve_base_url(&config), "https://billing.internal.example");
    }

    #[test]
    fn env_maps_to_known_addresses() {
        let prod = ClientConfig::new("key").with_env(Environment::Production);
        let staging = ClientConfig::new("key").with_env(Environment::Staging);
        assert_eq!(resolve_base_url(&prod), PRODUCTION_BASE_URL);
        assert_eq!(resolve_base_url(&staging), STAGING_BASE_URL);
    }

    #[test]
    fn defaults_to_development() {
        assert_eq!(resolve_base_url(&ClientConfig::new("key")), DEVELOPMENT_BASE_URL);

        let blank = ClientConfig::new("key").with_base_url("   ");
        assert_eq!(resolve_base_url(&blank), DEVELOPMENT_BASE_URL);
    }

    #[test]
    fn parses_environment_names_case_insensitively() {
        assert_eq!("Staging".parse::<Environment>(), Ok(Environment::Staging));
        assert_eq!(" production ".parse::<Environment>(), Ok(Environment::Production));
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn settings_build_client_config() {
        let settings = settings_with(&[
            ("api_key", " sk_test "),
            ("env", "staging"),
            ("user_email", "ops@example.com"),
        ])
        .unwrap();

        let config = settings.client_config();
        assert_eq!(config.api_key, "sk_test");
        assert_eq!(config.env, Some(Environment::Staging));
        assert_eq!(config.base_url, None);
        assert_eq!(settings.user_email.as_deref(), Some("ops@example.com"));
    }

    #[test]
    fn settings_reject_unknown_environment() {
        assert!(settings_with(&[("env", "qa")]).is_err());
    }

    #[test]
    fn settings_reject_bad_base_url() {
        assert!(settings_with(&[("base_url", "localhost:8000")]).is_err());
        assert!(settings_with(&[("base_url", "ftp://files.example.com")]).is_err());
    }

    #[test]
    fn settings_reject_malformed_email() {
        assert!(settings_with(&[("user_email", "not-an-email")]).is_err());
    }

    #[test]
    fn missing_api_key_defaults_to_empty() {
        let settings = settings_with(&[]).unwrap();
        assert!(!settings.client_config().has_api_key());
    }
}
