//! Option objects serialised into script calls
//!
//! All options are immutable value objects: fields are read through getters
//! and the `with_*` methods return a new value. They serialise to camelCase JSON objects with unset optionals omitted.

use serde::{Deserialize, Serialize};

/// A boolean switch that may instead carry an explicit key
///
/// `encrypt` accepts a public key and `decrypt` a private key in place of `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyOption {
    Enabled(bool),
    Key(String),
}

impl KeyOption {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        match self {
            KeyOption::Enabled(enabled) => *enabled,
            KeyOption::Key(_) => true,
        }
    }
}

impl From<bool> for KeyOption {
    fn from(enabled: bool) -> Self {
        KeyOption::Enabled(enabled)
    }
}

/// Options for `encryptContent` / `decryptContent`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    private_key: Option<String>,
}

impl CryptoOptions {
    #[must_use]
    pub fn with_public_key(self, public_key: impl Into<String>) -> Self {
        Self {
            public_key: Some(public_key.into()),
            ..self
        }
    }

    #[must_use]
    pub fn with_private_key(self, private_key: impl Into<String>) -> Self {
        Self {
            private_key: Some(private_key.into()),
            ..self
        }
    }

    #[must_use]
    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    #[must_use]
    pub fn private_key(&self) -> Option<&str> {
        self.private_key.as_deref()
    }
}

/// Options for `getFile`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFileOptions {
    decrypt: KeyOption,
    verify: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    app: Option<String>,
    #[serde(rename = "zoneFileLookupURL", skip_serializing_if = "Option::is_none")]
    zone_file_lookup_url: Option<String>,
}

impl Default for GetFileOptions {
    fn default() -> Self {
        Self {
            decrypt: KeyOption::Enabled(true),
            verify: false,
            username: None,
            app: None,
            zone_file_lookup_url: None,
        }
    }
}

impl GetFileOptions {
    #[must_use]
    pub fn new(decrypt: impl Into<KeyOption>) -> Self {
        Self {
            decrypt: decrypt.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_verify(self, verify: bool) -> Self {
        Self { verify, ..self }
    }

    /// Read the file from another user's storage for the given app origin
    #[must_use]
    pub fn with_user(self, username: impl Into<String>, app: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            app: Some(app.into()),
            ..self
        }
    }

    #[must_use]
    pub fn with_zone_file_lookup_url(self, url: impl Into<String>) -> Self {
        Self {
            zone_file_lookup_url: Some(url.into()),
            ..self
        }
    }

    #[must_use]
    pub fn decrypt(&self) -> &KeyOption {
        &self.decrypt
    }

    #[must_use]
    pub fn verify(&self) -> bool {
        self.verify
    }

    /// Owner of the file when reading another user's storage
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn app(&self) -> Option<&str> {
        self.app.as_deref()
    }

    #[must_use]
    pub fn zone_file_lookup_url(&self) -> Option<&str> {
        self.zone_file_lookup_url.as_deref()
    }
}

/// Options for `putFile`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutFileOptions {
    encrypt: KeyOption,
    sign: bool,
}

impl Default for PutFileOptions {
    fn default() -> Self {
        Self {
            encrypt: KeyOption::Enabled(true),
            sign: false,
        }
    }
}

impl PutFileOptions {
    #[must_use]
    pub fn new(encrypt: impl Into<KeyOption>) -> Self {
        Self {
            encrypt: encrypt.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_sign(self, sign: bool) -> Self {
        Self { sign, ..self }
    }

    #[must_use]
    pub fn encrypt(&self) -> &KeyOption {
        &self.encrypt
    }

    #[must_use]
    pub fn sign(&self) -> bool {
        self.sign
    }
}
