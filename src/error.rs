//! Error handling for the Blockstack SDK
//!
//! This module provides the centralized error type for the SDK. Every fallible
//! public operation returns [`SdkResult`], and every [`SdkError`] maps onto one
//! stable [`ErrorCode`] whose string form is shared with other Blockstack clients.
//!
//! Domain modules keep their own error enums (`CryptoError`, `StorageError`) and
//! convert into `SdkError` at their boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::crypto::token::TokenError;
use crate::crypto::CryptoError;
use crate::storage::StorageError;

/// Result type for SDK operations
pub type SdkResult<T> = Result<T, SdkError>;

/// Stable error codes reported to hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "missing_parameter")]
    MissingParameter,
    #[serde(rename = "remote_service_error")]
    RemoteServiceError,
    #[serde(rename = "failed_decryption_error")]
    FailedDecryptionError,
    #[serde(rename = "invalid_did_error")]
    InvalidDidError,
    #[serde(rename = "not_enough_error")]
    NotEnoughError,
    #[serde(rename = "invalid_amount_error")]
    InvalidAmountError,
    #[serde(rename = "login_failed_error")]
    LoginFailedError,
    #[serde(rename = "signature_verification_error")]
    SignatureVerificationError,
    #[serde(rename = "redirect_failed_error")]
    RedirectFailedError,
    #[serde(rename = "network_error")]
    NetworkError,
    #[serde(rename = "missing_read_url")]
    MissingReadUrl,
    #[serde(rename = "unknown")]
    UnknownError,
}

impl ErrorCode {
    /// The wire name of this code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingParameter => "missing_parameter",
            ErrorCode::RemoteServiceError => "remote_service_error",
            ErrorCode::FailedDecryptionError => "failed_decryption_error",
            ErrorCode::InvalidDidError => "invalid_did_error",
            ErrorCode::NotEnoughError => "not_enough_error",
            ErrorCode::InvalidAmountError => "invalid_amount_error",
            ErrorCode::LoginFailedError => "login_failed_error",
            ErrorCode::SignatureVerificationError => "signature_verification_error",
            ErrorCode::RedirectFailedError => "redirect_failed_error",
            ErrorCode::NetworkError => "network_error",
            ErrorCode::MissingReadUrl => "missing_read_url",
            ErrorCode::UnknownError => "unknown",
        }
    }

    /// Parse a wire name, falling back to `UnknownError`
    pub fn from_code(code: &str) -> Self {
        match code {
            "missing_parameter" => ErrorCode::MissingParameter,
            "remote_service_error" => ErrorCode::RemoteServiceError,
            "failed_decryption_error" => ErrorCode::FailedDecryptionError,
            "invalid_did_error" => ErrorCode::InvalidDidError,
            "not_enough_error" => ErrorCode::NotEnoughError,
            "invalid_amount_error" => ErrorCode::InvalidAmountError,
            "login_failed_error" => ErrorCode::LoginFailedError,
            "signature_verification_error" => ErrorCode::SignatureVerificationError,
            "redirect_failed_error" => ErrorCode::RedirectFailedError,
            "network_error" => ErrorCode::NetworkError,
            "missing_read_url" => ErrorCode::MissingReadUrl,
            _ => ErrorCode::UnknownError,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for SDK operations
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Remote service error: {0}")]
    RemoteServiceError(String),

    #[error("Failed to decrypt: {0}")]
    FailedDecryption(String),

    #[error("Invalid DID: {0}")]
    InvalidDid(String),

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Signature verification failed: {0}")]
    SignatureVerification(String),

    #[error("Redirect failed: {0}")]
    RedirectFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Name lookup failed: {0}")]
    NameLookup(String),

    #[error("Missing read URL: {0}")]
    MissingReadUrl(String),

    #[error("Partial failure: {completed} succeeded but {reason}")]
    PartialFailure { completed: String, reason: String },

    #[error("Unsupported Gaia hub: {0}")]
    UnsupportedHub(String),

    #[error("Too many entries: gave up after {0} pages")]
    TooManyEntries(usize),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Error category for classification and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Token, DID and sign-in failures
    Authentication,

    /// Input validation errors
    Validation,

    /// Decryption or signature failures on data
    Integrity,

    /// Temporary failures that may succeed on retry
    TemporaryFailure,

    /// Permanent failures that will not succeed on retry
    PermanentFailure,
}

impl SdkError {
    /// Get the stable error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            SdkError::MissingParameter(_) | SdkError::InvalidInput(_) => {
                ErrorCode::MissingParameter
            }
            SdkError::RemoteServiceError(_) => ErrorCode::RemoteServiceError,
            SdkError::FailedDecryption(_) => ErrorCode::FailedDecryptionError,
            SdkError::InvalidDid(_) => ErrorCode::InvalidDidError,
            SdkError::LoginFailed(_) | SdkError::InvalidToken(_) => ErrorCode::LoginFailedError,
            SdkError::SignatureVerification(_) => ErrorCode::SignatureVerificationError,
            SdkError::RedirectFailed(_) => ErrorCode::RedirectFailedError,
            SdkError::NetworkError(_) | SdkError::NameLookup(_) => ErrorCode::NetworkError,
            SdkError::MissingReadUrl(_) => ErrorCode::MissingReadUrl,
            SdkError::PartialFailure { .. }
            | SdkError::UnsupportedHub(_)
            | SdkError::TooManyEntries(_) => ErrorCode::RemoteServiceError,
            SdkError::Storage(err) => err.code(),
            SdkError::Crypto(_) | SdkError::SerializationError(_) | SdkError::Unknown(_) => {
                ErrorCode::UnknownError
            }
        }
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            SdkError::InvalidDid(_)
            | SdkError::LoginFailed(_)
            | SdkError::InvalidToken(_)
            | SdkError::RedirectFailed(_) => ErrorCategory::Authentication,
            SdkError::MissingParameter(_) | SdkError::InvalidInput(_) => {
                ErrorCategory::Validation
            }
            SdkError::FailedDecryption(_) | SdkError::SignatureVerification(_) => {
                ErrorCategory::Integrity
            }
            SdkError::NetworkError(_)
            | SdkError::NameLookup(_)
            | SdkError::RemoteServiceError(_) => ErrorCategory::TemporaryFailure,
            SdkError::Storage(err) => {
                if err.is_retryable() {
                    ErrorCategory::TemporaryFailure
                } else {
                    ErrorCategory::PermanentFailure
                }
            }
            SdkError::PartialFailure { .. } => ErrorCategory::TemporaryFailure,
            SdkError::MissingReadUrl(_)
            | SdkError::UnsupportedHub(_)
            | SdkError::TooManyEntries(_)
            | SdkError::Crypto(_)
            | SdkError::SerializationError(_)
            | SdkError::Unknown(_) => ErrorCategory::PermanentFailure,
        }
    }

    /// Whether the caller may reasonably retry the operation
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::TemporaryFailure
    }

    /// Add context to an error
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        let context_str = context.into();
        let prefix = |msg: String| format!("{}: {}", context_str, msg);
        match self {
            SdkError::MissingParameter(msg) => SdkError::MissingParameter(prefix(msg)),
            SdkError::InvalidInput(msg) => SdkError::InvalidInput(prefix(msg)),
            SdkError::RemoteServiceError(msg) => SdkError::RemoteServiceError(prefix(msg)),
            SdkError::FailedDecryption(msg) => SdkError::FailedDecryption(prefix(msg)),
            SdkError::InvalidDid(msg) => SdkError::InvalidDid(prefix(msg)),
            SdkError::LoginFailed(msg) => SdkError::LoginFailed(prefix(msg)),
            SdkError::InvalidToken(msg) => SdkError::InvalidToken(prefix(msg)),
            SdkError::SignatureVerification(msg) => SdkError::SignatureVerification(prefix(msg)),
            SdkError::RedirectFailed(msg) => SdkError::RedirectFailed(prefix(msg)),
            SdkError::NetworkError(msg) => SdkError::NetworkError(prefix(msg)),
            SdkError::NameLookup(msg) => SdkError::NameLookup(prefix(msg)),
            SdkError::MissingReadUrl(msg) => SdkError::MissingReadUrl(prefix(msg)),
            SdkError::Crypto(msg) => SdkError::Crypto(prefix(msg)),
            SdkError::SerializationError(msg) => SdkError::SerializationError(prefix(msg)),
            SdkError::Unknown(msg) => SdkError::Unknown(prefix(msg)),
            SdkError::PartialFailure { completed, reason } => SdkError::PartialFailure {
                completed,
                reason: prefix(reason),
            },
            SdkError::UnsupportedHub(msg) => SdkError::UnsupportedHub(prefix(msg)),
            // Structured variants keep their fields untouched
            SdkError::TooManyEntries(_) | SdkError::Storage(_) => self,
        }
    }

    /// Log this error with the specified log level
    pub fn log(&self, log_level: log::Level) {
        let code = self.code();
        match log_level {
            log::Level::Error => log::error!("[{}] {}", code, self),
            log::Level::Warn => log::warn!("[{}] {}", code, self),
            log::Level::Info => log::info!("[{}] {}", code, self),
            log::Level::Debug => log::debug!("[{}] {}", code, self),
            log::Level::Trace => log::trace!("[{}] {}", code, self),
        }
    }

    /// Get telemetry data for this error
    pub fn telemetry_data(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code().as_str(),
            "message": self.to_string(),
            "category": format!("{:?}", self.category()),
            "is_retryable": self.is_retryable(),
        })
    }

    /// Serializable view of this error
    pub fn to_result_error(&self) -> ResultError {
        ResultError {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Error description handed to hosts, e.g. through callbacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultError {
    pub code: ErrorCode,
    pub message: String,
}

impl fmt::Display for ResultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl From<&SdkError> for ResultError {
    fn from(error: &SdkError) -> Self {
        error.to_result_error()
    }
}

// Conversion implementations for external error types

impl From<url::ParseError> for SdkError {
    fn from(error: url::ParseError) -> Self {
        SdkError::InvalidInput(format!("Invalid URL: {}", error))
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(error: serde_json::Error) -> Self {
        SdkError::SerializationError(format!("JSON error: {}", error))
    }
}

impl From<std::string::FromUtf8Error> for SdkError {
    fn from(error: std::string::FromUtf8Error) -> Self {
        SdkError::SerializationError(format!("UTF-8 error: {}", error))
    }
}

impl From<hex::FromHexError> for SdkError {
    fn from(error: hex::FromHexError) -> Self {
        SdkError::InvalidInput(format!("Hex decode error: {}", error))
    }
}

impl From<std::io::Error> for SdkError {
    fn from(error: std::io::Error) -> Self {
        SdkError::Unknown(format!("I/O error: {}", error))
    }
}

impl From<CryptoError> for SdkError {
    fn from(error: CryptoError) -> Self {
        match error {
            CryptoError::InvalidPrivateKey(msg) => {
                SdkError::InvalidInput(format!("Invalid private key: {}", msg))
            }
            CryptoError::InvalidPublicKey(msg) => {
                SdkError::InvalidInput(format!("Invalid public key: {}", msg))
            }
            CryptoError::InvalidSignature(msg) => SdkError::SignatureVerification(msg),
            CryptoError::DecryptionFailed(msg) => SdkError::FailedDecryption(msg),
            CryptoError::EncryptionFailed(msg) => SdkError::Crypto(msg),
            CryptoError::KeyDerivation(msg) => {
                SdkError::Crypto(format!("Key derivation error: {}", msg))
            }
            CryptoError::InvalidAddress(msg) => {
                SdkError::InvalidInput(format!("Invalid address: {}", msg))
            }
        }
    }
}

impl From<TokenError> for SdkError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Malformed(msg) | TokenError::InvalidJson(msg) => SdkError::InvalidToken(msg),
            TokenError::InvalidSignature(msg) => SdkError::SignatureVerification(msg),
            TokenError::Crypto(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SdkError::LoginFailed("test".to_string()).code(),
            ErrorCode::LoginFailedError
        );
        assert_eq!(
            SdkError::InvalidToken("test".to_string()).code(),
            ErrorCode::LoginFailedError
        );
        assert_eq!(
            SdkError::NameLookup("test".to_string()).code(),
            ErrorCode::NetworkError
        );
        assert_eq!(
            SdkError::TooManyEntries(65536).code(),
            ErrorCode::RemoteServiceError
        );
        assert_eq!(
            SdkError::Storage(StorageError::NotConnected).code(),
            ErrorCode::MissingParameter
        );
        assert_eq!(
            SdkError::from(TokenError::Malformed("two segments".to_string())).code(),
            ErrorCode::LoginFailedError
        );
        assert_eq!(
            SdkError::from(CryptoError::DecryptionFailed("bad mac".to_string())).code(),
            ErrorCode::FailedDecryptionError
        );
    }

    #[test]
    fn test_error_code_wire_names() {
        assert_eq!(ErrorCode::UnknownError.as_str(), "unknown");
        assert_eq!(ErrorCode::NotEnoughError.as_str(), "not_enough_error");
        assert_eq!(
            serde_json::to_string(&ErrorCode::FailedDecryptionError).unwrap(),
            "\"failed_decryption_error\""
        );
        assert_eq!(
            ErrorCode::from_code("missing_read_url"),
            ErrorCode::MissingReadUrl
        );
        assert_eq!(ErrorCode::from_code("nope"), ErrorCode::UnknownError);
    }

    #[test]
    fn test_with_context() {
        let error = SdkError::InvalidInput("bad value".to_string());
        let with_context = error.with_context("putFile");

        match with_context {
            SdkError::InvalidInput(msg) => {
                assert!(msg.contains("putFile"));
                assert!(msg.contains("bad value"));
            }
            _ => panic!("Expected InvalidInput error"),
        }
    }

    #[test]
    fn test_categories() {
        assert!(SdkError::NetworkError("offline".to_string()).is_retryable());
        assert!(!SdkError::SignatureVerification("bad".to_string()).is_retryable());
        assert_eq!(
            SdkError::FailedDecryption("bad".to_string()).category(),
            ErrorCategory::Integrity
        );
    }

    #[test]
    fn test_result_error() {
        let error = SdkError::MissingReadUrl("no app bucket".to_string());
        let result_error = ResultError::from(&error);

        assert_eq!(result_error.code, ErrorCode::MissingReadUrl);
        assert!(result_error.message.contains("no app bucket"));

        let json = serde_json::to_value(&result_error).unwrap();
        assert_eq!(json["code"], "missing_read_url");
    }

    #[test]
    fn test_partial_failure_message() {
        let error = SdkError::PartialFailure {
            completed: "notes.txt".to_string(),
            reason: "signature sidecar upload failed".to_string(),
        };
        assert_eq!(error.code(), ErrorCode::RemoteServiceError);
        assert!(error.to_string().contains("notes.txt"));
        assert!(error.is_retryable());
    }

    #[test]
    fn test_telemetry_data() {
        let data = SdkError::RemoteServiceError("503".to_string()).telemetry_data();
        assert_eq!(data["code"], "remote_service_error");
        assert_eq!(data["is_retryable"], true);
    }
}
