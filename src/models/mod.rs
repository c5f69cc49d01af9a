//! Data types exchanged with the embedded protocol script
//!
//! # Modules
//!
//! - [`config`] - Application configuration sent with sign-in requests
//! - [`scope`] - Permission scopes requested during sign-in
//! - [`content`] - Text or binary payloads for storage and encryption
//! - [`options`] - Option objects serialised into script calls
//! - [`user`] - Signed-in user record
//! - [`profile`] - Public profile record returned by name lookups
//! - [`cipher`] - Cipher objects produced by `encryptContent`

pub mod cipher;
pub mod config;
pub mod content;
pub mod options;
pub mod profile;
pub mod scope;
pub mod user;

pub use cipher::CipherObject;
pub use config::AppConfig;
pub use content::Content;
pub use options::{CryptoOptions, GetFileOptions, KeyOption, PutFileOptions};
pub use profile::Profile;
pub use scope::Scope;
pub use user::UserData;
