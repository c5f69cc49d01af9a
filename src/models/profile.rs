use crate::error::BridgeError;
use serde_json::Value;

/// Public profile of a registered name
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    json: Value,
}

impl Profile {
    #[must_use]
    pub fn new(json: Value) -> Self {
        Self { json }
    }

    /// Parse a profile from script output
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Parse` if the text is not JSON.
    pub fn from_json_str(text: &str) -> Result<Self, BridgeError> {
        Ok(Self::new(serde_json::from_str(text)?))
    }

    #[must_use]
    pub fn json(&self) -> &Value {
        &self.json
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.json.get("name").and_then(Value::as_str)
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.json.get("description").and_then(Value::as_str)
    }

    /// Content URL of the first profile image
    #[must_use]
    pub fn avatar_url(&self) -> Option<&str> {
        self.json
            .get("image")
            .and_then(Value::as_array)
            .and_then(|images| images.first())
            .and_then(|image| image.get("contentUrl"))
            .and_then(Value::as_str)
    }

    #[must_use]
    pub fn is_person(&self) -> bool {
        self.json.get("@type").and_then(Value::as_str) == Some("Person")
    }
}
