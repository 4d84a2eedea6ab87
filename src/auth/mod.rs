//! Sign-in protocol
//!
//! Auth requests, auth responses, their verification, DIDs and the name
//! lookups used to check who owns a username.

pub mod did;
pub mod request;
pub mod resolver;
pub mod response;
pub mod verification;

pub use did::{get_address_from_did, get_did_type, make_did_from_address};
pub use request::{generate_and_store_transit_key, make_auth_request, redirect_url};
#[cfg(test)]
pub use resolver::MockNameResolver;
pub use resolver::{HttpNameResolver, NameInfo, NameResolver};
pub use response::Authenticator;
pub use verification::{
    check_auth_response_format, verify_auth_request, verify_auth_response, verify_token,
};
