//! Collection access configuration

use serde::{Deserialize, Serialize};

use crate::storage::GaiaHubConfig;

/// Name of the file that holds the collection keys in a user's bucket
pub const GAIA_HUB_COLLECTION_KEY_FILE_NAME: &str = ".collections.keys";

/// Prefix under which collection files are stored
pub const COLLECTION_PATH_PREFIX: &str = "collection/";

/// Hub connection and key granted to an app for one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionConfig {
    pub hub_config: GaiaHubConfig,
    /// Hex private key used to encrypt collection items
    pub encryption_key: String,
}
