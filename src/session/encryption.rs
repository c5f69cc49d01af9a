//! Content encryption
//!
//! Both operations return their result directly from the script. A cipher
//! object records whether the plain text was a string; decryption reads that
//! flag before calling the script and uses it to decide whether the result is
//! text or base64 bytes.

use crate::error::BridgeError;
use crate::models::{CipherObject, Content, CryptoOptions};
use crate::outcome::Outcome;
use crate::runtime::script_call::{non_null, unquote};
use crate::runtime::ScriptCall;
use crate::session::manager::BlockstackSession;

impl BlockstackSession {
    /// Encrypt text or bytes for the given public key, or the app key if none
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotInitialized` before the ready signal and
    /// `BridgeError::Parse` if the script returns something other than a
    /// cipher object.
    pub async fn encrypt_content(
        &self,
        content: impl Into<Content>,
        options: &CryptoOptions,
    ) -> Result<Outcome<CipherObject>, BridgeError> {
        self.ensure_loaded()?;
        let (payload, is_binary) = content.into().to_transport();
        let call = ScriptCall::new("encryptContent")
            .string(&payload)
            .json(options)?
            .boolean(is_binary);

        let Some(result) = non_null(self.evaluate(&call).await?) else {
            return Ok(Outcome::failure("failed to encrypt"));
        };
        Ok(Outcome::success(CipherObject::from_script_result(&result)?))
    }

    /// Decrypt a cipher object given as JSON text or UTF-8 bytes
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotInitialized` before the ready signal,
    /// `BridgeError::Parse` or `BridgeError::InvalidCipher` if the cipher
    /// carries no `wasString` flag, and `BridgeError::Encoding` if a binary
    /// result is not valid base64.
    pub async fn decrypt_content(
        &self,
        cipher: impl Into<Content>,
        options: &CryptoOptions,
    ) -> Result<Outcome<Content>, BridgeError> {
        self.ensure_loaded()?;
        let cipher = cipher.into();
        let was_string = CipherObject::was_string_of(&cipher)?;
        let (payload, is_binary) = cipher.to_transport();
        let call = ScriptCall::new("decryptContent")
            .string(&payload)
            .json(options)?
            .boolean(is_binary);

        let Some(result) = non_null(self.evaluate(&call).await?) else {
            return Ok(Outcome::failure("failed to decrypt"));
        };
        let plain = unquote(&result);
        if was_string {
            Ok(Outcome::success(Content::Text(plain)))
        } else {
            Ok(Outcome::success(Content::from_transport(&plain, true)?))
        }
    }
}
