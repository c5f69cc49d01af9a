use crate::error::BridgeError;
use crate::models::profile::Profile;
use serde_json::Value;

/// Record of the signed-in user as returned by the protocol script
///
/// The bridge does not interpret the record beyond the accessors below; the
/// full JSON stays available through [`UserData::json`].
#[derive(Debug, Clone, PartialEq)]
pub struct UserData {
    json: Value,
}

impl UserData {
    #[must_use]
    pub fn new(json: Value) -> Self {
        Self { json }
    }

    /// Parse a user record from script output
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

    /// Decentralized identifier, e.g. `ID-1Jq...`
    #[must_use]
    pub fn decentralized_id(&self) -> Option<&str> {
        self.json.get("decentralizedID").and_then(Value::as_str)
    }

    #[must_use]
    pub fn app_private_key(&self) -> Option<&str> {
        self.json.get("appPrivateKey").and_then(Value::as_str)
    }

    /// URL of the user's storage hub
    #[must_use]
    pub fn hub_url(&self) -> Option<&str> {
        self.json.get("hubUrl").and_then(Value::as_str)
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.json.get("username").and_then(Value::as_str)
    }

    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        self.json
            .get("profile")
            .filter(|profile| profile.is_object())
            .cloned()
            .map(Profile::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_accessors() {
        let user = UserData::from_json_str(
            r#"{"decentralizedID":"ID-1abc","appPrivateKey":"a1b2","hubUrl":"https://hub.blockstack.org",
                "username":"alice.id","profile":{"@type":"Person","name":"Alice"}}"#,
        )
        .unwrap();

        assert_eq!(user.decentralized_id(), Some("ID-1abc"));
        assert_eq!(user.app_private_key(), Some("a1b2"));
        assert_eq!(user.hub_url(), Some("https://hub.blockstack.org"));
        assert_eq!(user.username(), Some("alice.id"));
        assert_eq!(user.profile().and_then(|p| p.name().map(str::to_string)), Some("Alice".to_string()));
    }

    #[test]
    fn test_missing_fields_are_none() {
        let user = UserData::from_json_str("{}").unwrap();
        assert!(user.decentralized_id().is_none());
        assert!(user.profile().is_none());
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(
            UserData::from_json_str("{not json"),
            Err(BridgeError::Parse(_))
        ));
    }
}
