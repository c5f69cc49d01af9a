#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Client-side bridge and session core for an embedded decentralized-identity
//! script runtime.
//!
//! A [`BlockstackSession`] owns one script engine on a dedicated thread, calls
//! protocol functions inside it and routes the results back to host callbacks.
//! Sign-in requests leave the runtime through [`redirect::ExternalRedirectHandler`].

/// Version of the bridge crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod models;
pub mod outcome;
pub mod redirect;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use error::{BridgeError, EngineError};
pub use models::{
    AppConfig, CipherObject, Content, CryptoOptions, GetFileOptions, KeyOption, Profile,
    PutFileOptions, Scope, UserData,
};
pub use outcome::Outcome;
pub use runtime::{NavigationInterceptor, ScriptEngine};
pub use session::{BlockstackSession, SessionBuilder};
pub use settings::BridgeSettings;
