//! File storage operations
//!
//! Reads and writes are matched to their answers by a fresh correlation token
//! per request, so any number of them can be in flight at once. A request the
//! engine fails to evaluate is answered with that failure under its token.

use crate::error::BridgeError;
use crate::models::{Content, GetFileOptions, PutFileOptions};
use crate::outcome::Outcome;
use crate::runtime::ScriptCall;
use crate::session::manager::BlockstackSession;
use crate::session::pending::{Callback, CorrelationTable, CorrelationToken};
use std::sync::Arc;

impl BlockstackSession {
    /// Read a file from the user's storage
    ///
    /// The callback receives text or bytes, whichever the script returned.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotInitialized` before the ready signal,
    /// `BridgeError::Parse` if the options cannot be serialised and
    /// `BridgeError::RuntimeClosed` after shutdown.
    pub fn get_file(
        &self,
        path: &str,
        options: &GetFileOptions,
        callback: impl FnOnce(Outcome<Content>) + Send + 'static,
    ) -> Result<(), BridgeError> {
        self.ensure_loaded()?;
        let token = CorrelationToken::issue();
        let call = ScriptCall::new("getFile")
            .string(path)
            .json(options)?
            .string(&token.to_string());
        self.submit_correlated(&self.state.get_file, token, Box::new(callback), &call)
    }

    /// Write a file to the user's storage
    ///
    /// The callback receives the URL the file was stored at.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotInitialized` before the ready signal,
    /// `BridgeError::Parse` if the options cannot be serialised and
    /// `BridgeError::RuntimeClosed` after shutdown.
    pub fn put_file(
        &self,
        path: &str,
        content: impl Into<Content>,
        options: &PutFileOptions,
        callback: impl FnOnce(Outcome<String>) + Send + 'static,
    ) -> Result<(), BridgeError> {
        self.ensure_loaded()?;
        let (payload, is_binary) = content.into().to_transport();
        let token = CorrelationToken::issue();
        let call = ScriptCall::new("putFile")
            .string(path)
            .string(&payload)
            .json(options)?
            .string(&token.to_string())
            .boolean(is_binary);
        self.submit_correlated(&self.state.put_file, token, Box::new(callback), &call)
    }

    fn submit_correlated<T: 'static>(
        &self,
        table: &Arc<CorrelationTable<CorrelationToken, T>>,
        token: CorrelationToken,
        callback: Callback<T>,
        call: &ScriptCall,
    ) -> Result<(), BridgeError> {
        table.register(token, callback);
        let pending = Arc::clone(table);
        self.submit(call, move |e| {
            pending.resolve(&token, Outcome::failure(e.to_string()));
        })
        .inspect_err(|_| {
            table.discard(&token);
        })
    }
}
