//! Result container for asynchronous bridge operations
//!
//! Every operation that the embedded script answers (directly or through a
//! host function) hands back an [`Outcome`]. It holds either a value, an error
//! message reported by the script, or nothing at all for operations without a
//! payload (signing out, a file URL that does not exist).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum State<T> {
    Value(T),
    Error(String),
    Empty,
}

/// Typed success/error wrapper; immutable once constructed
#[derive(Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    state: State<T>,
}

impl<T> Outcome<T> {
    /// Successful outcome carrying `value`
    #[must_use]
    pub fn success(value: T) -> Self {
        Self {
            state: State::Value(value),
        }
    }

    /// Failed outcome carrying the script-reported `error`
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            state: State::Error(error.into()),
        }
    }

    /// Successful outcome without payload
    #[must_use]
    pub fn empty() -> Self {
        Self { state: State::Empty }
    }

    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match &self.state {
            State::Value(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            State::Error(error) => Some(error),
            _ => None,
        }
    }

    #[must_use]
    pub fn has_value(&self) -> bool {
        matches!(self.state, State::Value(_))
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.state, State::Error(_))
    }

    /// Consume the outcome and return the value, if any
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self.state {
            State::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Convert into a standard `Result`, mapping the empty case to `Ok(None)`
    ///
    /// # Errors
    ///
    /// Returns the script-reported error message for failed outcomes.
    pub fn into_result(self) -> Result<Option<T>, String> {
        match self.state {
            State::Value(value) => Ok(Some(value)),
            State::Error(error) => Err(error),
            State::Empty => Ok(None),
        }
    }

    /// Transform the carried value, leaving errors and empty outcomes untouched
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self.state {
            State::Value(value) => Outcome::success(f(value)),
            State::Error(error) => Outcome::failure(error),
            State::Empty => Outcome::empty(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outcome")
            .field("value", &self.value())
            .field("error", &self.error())
            .finish()
    }
}

impl<T, E: fmt::Display> From<Result<T, E>> for Outcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(err) => Self::failure(err.to_string()),
        }
    }
}
