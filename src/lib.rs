//! Blockstack SDK: DID-based sign-in and Gaia storage for apps
//!
//! Apps sign users in through an authenticator, which hands back an app
//! private key scoped to the app's origin. That key encrypts and signs the
//! user's files in their Gaia hub bucket. Profiles are resolved through the
//! name service: name, zone file, profile token, verified profile.
//!
//! # Features
//!
//! - **Sign-in**: auth requests signed with a transit key, verified auth responses
//! - **Gaia storage**: encrypted and signed files, signature sidecars, paginated listing
//! - **Profiles**: zone file parsing, profile token signing and verification, lookups
//! - **Key hierarchy**: identity, app and collection keys derived from a seed
//!
//! # Examples
//!
//! ```no_run
//! use blockstack_sdk::{AppConfig, BlockstackSession, SessionOptions};
//! use blockstack_sdk::models::PutFileOptions;
//! use blockstack_sdk::error::SdkResult;
//!
//! async fn save_note(auth_response: &str) -> SdkResult<String> {
//!     let config = AppConfig::from_domain("https://notes.example.com")?;
//!     let session = BlockstackSession::new(config, SessionOptions::default())?;
//!
//!     session.handle_pending_sign_in(auth_response).await?;
//!     session
//!         .put_file("notes/today.txt", "buy milk", &PutFileOptions::default())
//!         .await
//! }
//! ```

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod error_macros;
pub mod executor;
pub mod models;
pub mod network;
pub mod profile;
pub mod session;
pub mod session_store;
pub mod storage;
pub mod utils;

pub use config::{AppConfig, AppDetails, Scope};
pub use error::{ErrorCode, SdkError, SdkResult};
pub use executor::{Executor, TokioExecutor};
pub use models::{
    DeleteFileOptions, GetFileOptions, Profile, PutFileOptions, SessionData, UserData,
};
pub use network::{ReqwestTransport, Transport};
pub use session::{BlockstackSession, SessionOptions};
pub use session_store::{FileSessionStore, InMemorySessionStore, SessionStore};
pub use storage::{GaiaClient, GaiaHubConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = "blockstack-sdk";
