//! Navigation interceptor for the sign-in flow
//!
//! `redirectToSignIn` answers by navigating the runtime to a target of the
//! form `scheme:<auth request token>`. The embedded runtime must never follow
//! it: the handler always cancels the navigation and, when a browser is
//! available, opens the hosted authenticator with the token instead.

use crate::error::BridgeError;
use crate::redirect::launcher::{ExternalLauncher, LogNotifier, Notifier, SystemBrowserLauncher};
use crate::runtime::NavigationInterceptor;
use crate::settings::{BridgeSettings, DEFAULT_HOSTED_BROWSER_URL};
use crate::utils::logging::LoggingHelper;
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use url::Url;

// JWT segments are base64url; the token may also carry padding
static AUTH_REQUEST_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-]+(?:\.[A-Za-z0-9_\-]*)*=*$").unwrap());

/// Notice shown when sign-in cannot leave the embedded runtime
pub const NO_BROWSER_NOTICE: &str = "External browser support is required to sign in";

/// Extract the auth request token from a navigation target
///
/// The token is the text between the first and second `:`. Returns `None` if
/// it is empty or contains characters a JWT cannot.
#[must_use]
pub fn auth_request_token(target: &str) -> Option<&str> {
    let token = target.split(':').nth(1)?;
    if AUTH_REQUEST_TOKEN.is_match(token) {
        Some(token)
    } else {
        None
    }
}

/// Redirects sign-in navigations to the hosted authenticator
pub struct ExternalRedirectHandler {
    hosted_browser_url: Url,
    launcher: Arc<dyn ExternalLauncher>,
    notifier: Arc<dyn Notifier>,
}

impl ExternalRedirectHandler {
    /// # Errors
    ///
    /// Returns `BridgeError::Configuration` if `hosted_browser_url` is not an absolute URL.
    pub fn new(
        hosted_browser_url: &str,
        launcher: Arc<dyn ExternalLauncher>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, BridgeError> {
        let hosted_browser_url = Url::parse(hosted_browser_url).map_err(|e| {
            BridgeError::Configuration(format!(
                "invalid hosted browser URL '{hosted_browser_url}': {e}"
            ))
        })?;
        Ok(Self {
            hosted_browser_url,
            launcher,
            notifier,
        })
    }

    /// Handler using the system browser and log notices
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Configuration` if the default hosted browser URL is invalid.
    pub fn system_default() -> Result<Self, BridgeError> {
        Self::new(
            DEFAULT_HOSTED_BROWSER_URL,
            Arc::new(SystemBrowserLauncher::default()),
            Arc::new(LogNotifier),
        )
    }

    /// # Errors
    ///
    /// Returns `BridgeError::Configuration` if the configured hosted browser URL is invalid.
    pub fn from_settings(settings: &BridgeSettings) -> Result<Self, BridgeError> {
        Self::new(
            &settings.network.hosted_browser_url,
            Arc::new(SystemBrowserLauncher::default()),
            Arc::new(LogNotifier),
        )
    }

    /// URL of the hosted authenticator for `token`
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Configuration` if the result is not a valid URL.
    pub fn hosted_auth_url(&self, token: &str) -> Result<Url, BridgeError> {
        let base = self.hosted_browser_url.as_str().trim_end_matches('/');
        let url = format!("{base}/auth?authRequest={}", urlencoding::encode(token));
        Url::parse(&url).map_err(|e| BridgeError::Configuration(format!("invalid auth URL: {e}")))
    }

    fn redirect(&self, target: &str) {
        let Some(token) = auth_request_token(target) else {
            LoggingHelper::log_invalid_auth_request(target);
            return;
        };

        if !self.launcher.is_available() {
            LoggingHelper::log_external_unavailable();
            self.notifier.notify(NO_BROWSER_NOTICE);
            return;
        }

        let url = match self.hosted_auth_url(token) {
            Ok(url) => url,
            Err(e) => {
                warn!("Cannot build hosted sign-in URL: {e}");
                return;
            }
        };

        LoggingHelper::log_external_launch(url.as_str());
        if let Err(e) = self.launcher.launch(&url) {
            warn!("External browser launch failed: {e:#}");
            self.notifier.notify(NO_BROWSER_NOTICE);
        }
    }
}

impl NavigationInterceptor for ExternalRedirectHandler {
    fn should_override(&self, target: &str) -> bool {
        LoggingHelper::log_navigation_intercepted(target);
        self.redirect(target);
        true
    }
}
