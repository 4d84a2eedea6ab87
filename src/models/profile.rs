//! Profile model
//!
//! A profile is a schema.org style JSON document (`Person` or `Organization`).
//! It is kept as JSON so that fields the SDK does not know about survive a
//! round trip through a session store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::crypto::DecodedToken;

/// Schema.org context used by default profiles
pub const SCHEMA_ORG_CONTEXT: &str = "http://schema.org";

/// User profile backed by its JSON representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(Value);

impl Profile {
    /// Wrap a JSON document
    pub fn new(json: Value) -> Self {
        Profile(json)
    }

    /// The empty `Person` profile used when a user has published none
    pub fn default_person() -> Self {
        Profile(serde_json::json!({
            "@type": "Person",
            "@context": SCHEMA_ORG_CONTEXT,
        }))
    }

    fn is_person(&self) -> bool {
        self.0.get("@type").and_then(Value::as_str) == Some("Person")
    }

    /// Full name, only defined for `Person` profiles
    pub fn name(&self) -> Option<&str> {
        if self.is_person() {
            self.0.get("name").and_then(Value::as_str)
        } else {
            None
        }
    }

    /// Short bio of a person or tag line of an organization
    pub fn description(&self) -> Option<&str> {
        self.0.get("description").and_then(Value::as_str)
    }

    /// Map of app origins to the Gaia read URLs of their buckets
    pub fn apps(&self) -> Option<&Map<String, Value>> {
        self.0.get("apps").and_then(Value::as_object)
    }

    /// Read URL of the bucket the user keeps for `app_origin`
    pub fn app_bucket_url(&self, app_origin: &str) -> Option<&str> {
        self.apps()?.get(app_origin).and_then(Value::as_str)
    }

    pub fn json(&self) -> &Value {
        &self.0
    }

    pub fn into_json(self) -> Value {
        self.0
    }
}

impl Default for Profile {
    fn default() -> Self {
        Profile::default_person()
    }
}

impl From<Value> for Profile {
    fn from(json: Value) -> Self {
        Profile(json)
    }
}

/// Subject or issuer of a profile token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

impl Entity {
    pub fn new<S: Into<String>>(public_key: S) -> Self {
        Entity {
            public_key: public_key.into(),
        }
    }
}

/// A signed profile token together with its decoded form
///
/// Serializes to the `{token, decodedToken}` shape found in profile token files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileTokenPair {
    pub token: String,
    #[serde(rename = "decodedToken")]
    pub decoded_token: Value,
}

impl ProfileTokenPair {
    pub fn new(token: String, decoded: &DecodedToken) -> Self {
        ProfileTokenPair {
            token,
            decoded_token: decoded.to_json(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_person_profile() {
        let profile = Profile::new(json!({
            "@type": "Person",
            "name": "Friedger",
            "description": "Android developer",
        }));
        assert_eq!(profile.name(), Some("Friedger"));
        assert_eq!(profile.description(), Some("Android developer"));
    }

    #[test]
    fn test_organization_has_no_name() {
        let profile = Profile::new(json!({
            "@type": "Organization",
            "name": "Blockstack PBC",
            "description": "Decentralized computing",
        }));
        assert_eq!(profile.name(), None);
        assert_eq!(profile.description(), Some("Decentralized computing"));
    }

    #[test]
    fn test_apps() {
        let profile = Profile::new(json!({
            "@type": "Person",
            "apps": { "https://app.example.com": "https://gaia.example.com/hub/1Abc/" },
        }));
        assert_eq!(
            profile.app_bucket_url("https://app.example.com"),
            Some("https://gaia.example.com/hub/1Abc/")
        );
        assert_eq!(profile.app_bucket_url("https://other.example.com"), None);
    }

    #[test]
    fn test_token_file_wire_names() {
        let pair = ProfileTokenPair {
            token: "eyJ0".to_string(),
            decoded_token: json!({"payload": {"subject": Entity::new("02ab")}}),
        };
        let json = serde_json::to_value(&pair).unwrap();
        assert_eq!(json["decodedToken"]["payload"]["subject"]["publicKey"], "02ab");

        let parsed: ProfileTokenPair = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, pair);
    }

    #[test]
    fn test_default_person() {
        let json = serde_json::to_value(Profile::default()).unwrap();
        assert_eq!(json, json!({"@type": "Person", "@context": "http://schema.org"}));
    }
}
