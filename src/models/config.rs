use crate::error::BridgeError;
use crate::models::scope::Scope;
use std::collections::BTreeSet;
use url::Url;

/// Default path of the sign-in redirect handler below the app domain
pub const DEFAULT_REDIRECT_PATH: &str = "/redirect";

/// Default path of the app manifest below the app domain
pub const DEFAULT_MANIFEST_PATH: &str = "/manifest.json";

/// Application identity sent with every sign-in request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub app_domain: Url,
    pub redirect_uri: Url,
    pub manifest_uri: Url,
    pub scopes: BTreeSet<Scope>,
}

impl AppConfig {
    /// Build a configuration, resolving the redirect and manifest paths against the domain
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Configuration` if the domain is not an absolute URL
    /// or a path cannot be joined onto it.
    pub fn new(
        app_domain: &str,
        redirect_path: &str,
        manifest_path: &str,
        scopes: impl IntoIterator<Item = Scope>,
    ) -> Result<Self, BridgeError> {
        let app_domain = Url::parse(app_domain).map_err(|e| {
            BridgeError::Configuration(format!("invalid app domain '{app_domain}': {e}"))
        })?;
        let redirect_uri = join(&app_domain, redirect_path)?;
        let manifest_uri = join(&app_domain, manifest_path)?;

        Ok(Self {
            app_domain,
            redirect_uri,
            manifest_uri,
            scopes: scopes.into_iter().collect(),
        })
    }

    /// Build a configuration using the default `/redirect` and `/manifest.json` paths
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Configuration` if the domain is not an absolute URL.
    pub fn from_domain(
        app_domain: &str,
        scopes: impl IntoIterator<Item = Scope>,
    ) -> Result<Self, BridgeError> {
        Self::new(app_domain, DEFAULT_REDIRECT_PATH, DEFAULT_MANIFEST_PATH, scopes)
    }

    /// The app domain as sent to the script: no trailing slash
    #[must_use]
    pub fn app_domain_str(&self) -> &str {
        self.app_domain.as_str().trim_end_matches('/')
    }

    #[must_use]
    pub fn scopes_json(&self) -> String {
        Scope::to_json_array(&self.scopes)
    }
}

fn join(base: &Url, path: &str) -> Result<Url, BridgeError> {
    base.join(path)
        .map_err(|e| BridgeError::Configuration(format!("cannot resolve '{path}' against {base}: {e}")))
}
