use crate::error::BridgeError;
use crate::models::content::Content;
use serde_json::Value;

/// Cipher object produced by `encryptContent`
///
/// Besides the ECIES fields the object records whether the plain text was a
/// string (`wasString`), which decides how a later decryption result is read.
#[derive(Debug, Clone, PartialEq)]
pub struct CipherObject {
    json: Value,
}

impl CipherObject {
    #[must_use]
    pub fn new(json: Value) -> Self {
        Self { json }
    }

    /// Parse the textual result of an `encryptContent` call
    ///
    /// Accepts the cipher either as a JSON object or as a JSON string that
    /// itself contains the object.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Parse` if the text is not JSON.
    pub fn from_script_result(text: &str) -> Result<Self, BridgeError> {
        match serde_json::from_str::<Value>(text)? {
            Value::String(inner) => Ok(Self::new(serde_json::from_str(&inner)?)),
            json => Ok(Self::new(json)),
        }
    }

    #[must_use]
    pub fn json(&self) -> &Value {
        &self.json
    }

    #[must_use]
    pub fn iv(&self) -> Option<&str> {
        self.json.get("iv").and_then(Value::as_str)
    }

    #[must_use]
    pub fn ephemeral_pk(&self) -> Option<&str> {
        self.json.get("ephemeralPK").and_then(Value::as_str)
    }

    #[must_use]
    pub fn cipher_text(&self) -> Option<&str> {
        self.json.get("cipherText").and_then(Value::as_str)
    }

    #[must_use]
    pub fn mac(&self) -> Option<&str> {
        self.json.get("mac").and_then(Value::as_str)
    }

    #[must_use]
    pub fn was_string(&self) -> Option<bool> {
        self.json.get("wasString").and_then(Value::as_bool)
    }

    /// JSON text suitable for passing back into `decryptContent`
    #[must_use]
    pub fn to_json_string(&self) -> String {
        self.json.to_string()
    }

    /// Read the `wasString` flag from a cipher supplied as text or UTF-8 bytes
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Parse` if the cipher is not JSON and
    /// `BridgeError::InvalidCipher` if the flag is absent or not a boolean.
    pub fn was_string_of(cipher: &Content) -> Result<bool, BridgeError> {
        let json: Value = match cipher {
            Content::Text(text) => serde_json::from_str(text)?,
            Content::Bytes(bytes) => serde_json::from_slice(bytes)?,
        };
        Self::new(json)
            .was_string()
            .ok_or_else(|| BridgeError::InvalidCipher("missing boolean 'wasString'".to_string()))
    }
}

impl From<CipherObject> for Content {
    fn from(cipher: CipherObject) -> Self {
        Content::Text(cipher.to_json_string())
    }
}
