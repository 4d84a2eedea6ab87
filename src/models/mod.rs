//! Data models shared by the auth, profile and storage modules

mod collection;
mod options;
mod profile;
mod user;

pub use collection::{CollectionConfig, COLLECTION_PATH_PREFIX, GAIA_HUB_COLLECTION_KEY_FILE_NAME};
pub use options::{DeleteFileOptions, GetFileOptions, PutFileOptions};
pub use profile::{Entity, Profile, ProfileTokenPair, SCHEMA_ORG_CONTEXT};
pub use user::{SessionData, UserData};
