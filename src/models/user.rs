//! User and session data
//!
//! `UserData` is produced by a successful sign-in and persisted through the
//! session store as part of `SessionData`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::collection::CollectionConfig;
use super::profile::Profile;
use crate::error::{SdkError, SdkResult};

/// Data about the signed-in user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    /// Blockstack ID, e.g. `alice.id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// `did:btc-addr:<identity address>`, uniquely identifies the user
    #[serde(default, rename = "decentralizedID", skip_serializing_if = "Option::is_none")]
    pub decentralized_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_address: Option<String>,

    /// Private key of the user for the signed-in app
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_private_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_session_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_response_token: Option<String>,

    /// The user's Gaia storage location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_node: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gaia_association_token: Option<String>,
}

impl UserData {
    /// App private key, required by every storage operation
    pub fn app_private_key(&self) -> SdkResult<&str> {
        self.app_private_key
            .as_deref()
            .ok_or_else(|| SdkError::MissingParameter("user has no app private key".to_string()))
    }

    pub fn decentralized_id(&self) -> Option<&str> {
        self.decentralized_id.as_deref()
    }

    pub fn hub_url(&self) -> Option<&str> {
        self.hub_url.as_deref()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }
}

/// Everything persisted for one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    /// Private key of the current sign-in attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transit_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<UserData>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub collection_configs: HashMap<String, CollectionConfig>,
}

impl SessionData {
    pub fn is_empty(&self) -> bool {
        self.transit_key.is_none() && self.user_data.is_none() && self.collection_configs.is_empty()
    }

    pub fn to_json(&self) -> SdkResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(json: serde_json::Value) -> SdkResult<Self> {
        Ok(serde_json::from_value(json)?)
    }
}
