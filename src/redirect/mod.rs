//! Sign-in redirection to an external browser
//!
//! # Modules
//!
//! - [`handler`] - Navigation interceptor that extracts the auth request
//! - [`launcher`] - Platform hooks for opening URLs and surfacing notices

pub mod handler;
pub mod launcher;

pub use handler::{auth_request_token, ExternalRedirectHandler};
pub use launcher::{ExternalLauncher, LogNotifier, Notifier, SystemBrowserLauncher};
