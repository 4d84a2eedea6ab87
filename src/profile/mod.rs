//! Profiles: zone files, profile tokens and lookups by username

mod lookup;
mod tokens;
mod zone_file;

pub use lookup::{fetch_profile_from_token_file, lookup_profile, resolve_zone_file_to_profile};
pub use tokens::{
    extract_profile, sign_profile_token, verify_profile_token, wrap_profile_token,
    PROFILE_TOKEN_LIFETIME_SECS,
};
pub use zone_file::{parse_zone_file, UriRecord, ZoneFile};
