//! Gaia storage
//!
//! `hub` speaks the Gaia wire protocol (hub info, auth tokens, store, delete,
//! list pages). `gaia` builds the file operations on top of it: optional
//! encryption, signatures and signature sidecar files, pagination and
//! reading from other users' buckets.

mod gaia;
mod hub;

pub use gaia::{
    bucket_address_from_read_url, get_full_read_url, get_user_app_file_url, normalize_bucket_url,
    GaiaClient, MAX_LIST_PAGES, SIGNATURE_FILE_SUFFIX,
};
pub use hub::{GaiaHub, HubInfo, ListFilesPage};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorCode;

/// Errors raised by the storage layer
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not connected to a Gaia hub")]
    NotConnected,

    #[error("Gaia hub returned HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Invalid hub info: {0}")]
    InvalidHubInfo(String),

    #[error("Invalid hub response: {0}")]
    InvalidResponse(String),
}

impl StorageError {
    pub fn code(&self) -> ErrorCode {
        match self {
            StorageError::NotConnected => ErrorCode::MissingParameter,
            StorageError::HttpStatus { .. }
            | StorageError::InvalidHubInfo(_)
            | StorageError::InvalidResponse(_) => ErrorCode::RemoteServiceError,
        }
    }

    /// Server errors and throttling may go away; everything else will not
    pub fn is_retryable(&self) -> bool {
        match self {
            StorageError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Capabilities needed to read and write one bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaiaHubConfig {
    /// Read URL prefix; files are readable at `url_prefix + address + "/" + path`
    pub url_prefix: String,
    /// Bucket address, the BTC address of the signing key
    pub address: String,
    /// `v1:` bearer token for writes
    pub token: String,
    /// Hub URL that accepts writes
    pub server: String,
}

/// Extra permission requested in a hub auth token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthScope {
    pub scope: String,
    pub domain: String,
}

impl AuthScope {
    pub fn new<S: Into<String>, D: Into<String>>(scope: S, domain: D) -> Self {
        AuthScope {
            scope: scope.into(),
            domain: domain.into(),
        }
    }

    /// Write access to the archival collection prefix
    pub fn collection() -> Self {
        AuthScope::new(COLLECTION_AUTH_SCOPE.0, COLLECTION_AUTH_SCOPE.1)
    }
}

/// `(scope, domain)` granting writes below `collection/`
pub const COLLECTION_AUTH_SCOPE: (&str, &str) = ("putFileArchivalPrefix", "collection");
