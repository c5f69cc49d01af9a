use crate::error::BridgeError;
use crate::models::{AppConfig, Scope};
use crate::models::config::{DEFAULT_MANIFEST_PATH, DEFAULT_REDIRECT_PATH};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Name lookup service passed to `handlePendingSignIn`
pub const DEFAULT_NAME_LOOKUP_URL: &str = "https://core.blockstack.org/v1/names/";

/// Hosted authenticator opened for sign-in
pub const DEFAULT_HOSTED_BROWSER_URL: &str = "https://browser.blockstack.org";

/// Bootstrap resource whose load completion marks the runtime ready
pub const DEFAULT_BOOTSTRAP_URL: &str = "file:///android_res/raw/webview.html";

/// User agent engines should present when fetching remote resources
pub const DEFAULT_USER_AGENT: &str = "blockstack-sdk";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct BridgeSettings {
    pub application: ApplicationSettings,
    pub network: NetworkSettings,
    pub runtime: RuntimeSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApplicationSettings {
    /// Origin of the app requesting sign-in; must be configured
    pub app_domain: String,
    pub redirect_path: String,
    pub manifest_path: String,
    pub scopes: Vec<Scope>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkSettings {
    pub name_lookup_url: String,
    pub hosted_browser_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeSettings {
    pub bootstrap_url: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            app_domain: String::new(),
            redirect_path: DEFAULT_REDIRECT_PATH.to_string(),
            manifest_path: DEFAULT_MANIFEST_PATH.to_string(),
            scopes: vec![Scope::StoreWrite],
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            name_lookup_url: DEFAULT_NAME_LOOKUP_URL.to_string(),
            hosted_browser_url: DEFAULT_HOSTED_BROWSER_URL.to_string(),
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            bootstrap_url: DEFAULT_BOOTSTRAP_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl BridgeSettings {
    /// Load settings from `.env`, `Settings.toml`, `$BRIDGE_CONFIG_DIR/Settings.toml`
    /// and environment overrides, in that order, then initialise logging
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_env_file();

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        settings.initialize_logging();
        Ok(settings)
    }

    fn initialize_logging(&self) {
        let env = env_logger::Env::default().default_filter_or(self.logging.level.as_str());
        if env_logger::Builder::from_env(env).try_init().is_err() {
            debug!("Logger already initialised, keeping existing configuration");
        }
    }

    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = Path::new("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(default_config_path)?;
            println!("✓ Loaded base settings from {}", default_config_path.display());
        }

        if let Ok(config_dir) = std::env::var("BRIDGE_CONFIG_DIR") {
            let override_path = Path::new(&config_dir).join("Settings.toml");
            if override_path.exists() {
                settings = Self::from_file(&override_path)?;
                println!("✓ Overriding settings from {}", override_path.display());
            } else {
                println!(
                    "ℹ BRIDGE_CONFIG_DIR set but no Settings.toml found at: {}",
                    override_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a settings file; missing sections and keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let toml_content = fs::read_to_string(path)?;
        Ok(basic_toml::from_str(&toml_content)?)
    }

    fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_string_env_override("NAME_LOOKUP_URL", &mut settings.network.name_lookup_url);
        Self::apply_string_env_override(
            "HOSTED_BROWSER_URL",
            &mut settings.network.hosted_browser_url,
        );
        Self::apply_string_env_override("BOOTSTRAP_URL", &mut settings.runtime.bootstrap_url);
        Self::apply_string_env_override("RUST_LOG", &mut settings.logging.level);
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        Self::apply_string_env_override("APP_DOMAIN", &mut app_settings.app_domain);
        Self::apply_string_env_override("REDIRECT_PATH", &mut app_settings.redirect_path);
        Self::apply_string_env_override("MANIFEST_PATH", &mut app_settings.manifest_path);

        if let Ok(scopes) = std::env::var("SCOPES") {
            app_settings.scopes = Self::parse_scopes(&scopes);
        }
    }

    fn apply_string_env_override(env_var: &str, target: &mut String) {
        if let Ok(value) = std::env::var(env_var) {
            if !value.is_empty() {
                *target = value;
            }
        }
    }

    fn parse_scopes(list: &str) -> Vec<Scope> {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .filter_map(|name| match name.parse::<Scope>() {
                Ok(scope) => Some(scope),
                Err(e) => {
                    warn!("Ignoring scope from SCOPES: {e}");
                    None
                }
            })
            .collect()
    }

    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                if line.trim_start().starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Application configuration sent with sign-in requests
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Configuration` if no app domain is configured or
    /// the domain and paths do not form valid URLs.
    pub fn app_config(&self) -> Result<AppConfig, BridgeError> {
        if self.application.app_domain.is_empty() {
            return Err(BridgeError::Configuration(
                "app_domain must be set in Settings.toml or APP_DOMAIN".to_string(),
            ));
        }
        AppConfig::new(
            &self.application.app_domain,
            &self.application.redirect_path,
            &self.application.manifest_path,
            self.application.scopes.iter().copied(),
        )
    }
}
