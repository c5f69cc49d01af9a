use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Permission scope requested from the identity network during sign-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Read and write data to the user's storage hub
    StoreWrite,
    /// Publish data so that other users of the app can discover it
    PublishData,
    /// Request the user's email address
    Email,
}

impl Scope {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Scope::StoreWrite => "store_write",
            Scope::PublishData => "publish_data",
            Scope::Email => "email",
        }
    }

    /// Render a scope set as the JSON array literal expected by `redirectToSignIn`
    #[must_use]
    pub fn to_json_array(scopes: &BTreeSet<Scope>) -> String {
        let names: Vec<&str> = scopes.iter().map(|scope| scope.name()).collect();
        serde_json::Value::from(names).to_string()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "store_write" => Ok(Scope::StoreWrite),
            "publish_data" => Ok(Scope::PublishData),
            "email" => Ok(Scope::Email),
            other => Err(format!("unknown scope '{other}'")),
        }
    }
}
