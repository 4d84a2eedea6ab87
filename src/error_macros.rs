//! Error handling macros for the SDK
//!
//! These macros standardize how errors are created, logged and propagated
//! throughout the crate.

/// Try to execute an expression and convert any error to SdkError
///
/// Like the `?` operator, but logs the converted error and can attach context.
///
/// # Examples
///
/// ```
/// # use blockstack_sdk::sdk_try;
/// # use blockstack_sdk::error::{SdkResult, SdkError};
/// # fn example() -> SdkResult<()> {
/// let bytes = sdk_try!(hex::decode("00ff"), "Decoding key");
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! sdk_try {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(err) => {
                let sdk_err: $crate::error::SdkError = err.into();
                sdk_err.log(log::Level::Error);
                return Err(sdk_err);
            }
        }
    };
    ($expr:expr, $context:expr) => {
        match $expr {
            Ok(val) => val,
            Err(err) => {
                let sdk_err: $crate::error::SdkError = err.into();
                let contextual_err = sdk_err.with_context($context);
                contextual_err.log(log::Level::Error);
                return Err(contextual_err);
            }
        }
    };
}

/// Create a new SDK error and log it
///
/// # Examples
///
/// ```
/// # use blockstack_sdk::sdk_err;
/// # fn example() {
/// let error = sdk_err!(login_failed, "Token expired");
/// # }
/// ```
#[macro_export]
macro_rules! sdk_err {
    (missing_parameter, $message:expr) => {{
        let err = $crate::error::SdkError::MissingParameter($message.to_string());
        err.log(log::Level::Error);
        err
    }};
    (invalid_input, $message:expr) => {{
        let err = $crate::error::SdkError::InvalidInput($message.to_string());
        err.log(log::Level::Error);
        err
    }};
    (remote_service, $message:expr) => {{
        let err = $crate::error::SdkError::RemoteServiceError($message.to_string());
        err.log(log::Level::Error);
        err
    }};
    (failed_decryption, $message:expr) => {{
        let err = $crate::error::SdkError::FailedDecryption($message.to_string());
        err.log(log::Level::Error);
        err
    }};
    (invalid_did, $message:expr) => {{
        let err = $crate::error::SdkError::InvalidDid($message.to_string());
        err.log(log::Level::Error);
        err
    }};
    (login_failed, $message:expr) => {{
        let err = $crate::error::SdkError::LoginFailed($message.to_string());
        err.log(log::Level::Error);
        err
    }};
    (invalid_token, $message:expr) => {{
        let err = $crate::error::SdkError::InvalidToken($message.to_string());
        err.log(log::Level::Warn);
        err
    }};
    (signature_verification, $message:expr) => {{
        let err = $crate::error::SdkError::SignatureVerification($message.to_string());
        err.log(log::Level::Error);
        err
    }};
    (network_error, $message:expr) => {{
        let err = $crate::error::SdkError::NetworkError($message.to_string());
        err.log(log::Level::Error);
        err
    }};
    (missing_read_url, $message:expr) => {{
        let err = $crate::error::SdkError::MissingReadUrl($message.to_string());
        err.log(log::Level::Error);
        err
    }};
    (serialization_error, $message:expr) => {{
        let err = $crate::error::SdkError::SerializationError($message.to_string());
        err.log(log::Level::Error);
        err
    }};
}

/// Assert a condition or return an error
///
/// # Examples
///
/// ```
/// # use blockstack_sdk::sdk_assert;
/// # use blockstack_sdk::error::SdkResult;
/// # fn example(value: i32) -> SdkResult<()> {
/// sdk_assert!(value > 0, invalid_input, "Value must be positive");
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! sdk_assert {
    ($condition:expr, $error_type:ident, $message:expr) => {
        if !($condition) {
            return Err($crate::sdk_err!($error_type, $message));
        }
    };
}

/// Unwrap an Option or return an error
///
/// # Examples
///
/// ```
/// # use blockstack_sdk::sdk_ensure;
/// # use blockstack_sdk::error::SdkResult;
/// # fn example() -> SdkResult<()> {
/// let option_value: Option<String> = Some("hub".to_string());
/// let value = sdk_ensure!(option_value, missing_parameter, "hubUrl");
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! sdk_ensure {
    ($option:expr, $error_type:ident, $message:expr) => {
        match $option {
            Some(value) => value,
            None => return Err($crate::sdk_err!($error_type, $message)),
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::error::{SdkError, SdkResult};

    fn might_fail(should_fail: bool) -> Result<String, std::io::Error> {
        if should_fail {
            Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Test error",
            ))
        } else {
            Ok("success".to_string())
        }
    }

    #[test]
    fn test_sdk_try() {
        fn success_case() -> SdkResult<String> {
            let result = sdk_try!(might_fail(false));
            Ok(result)
        }
        assert!(success_case().is_ok());

        fn failure_case() -> SdkResult<String> {
            let result = sdk_try!(might_fail(true));
            Ok(result)
        }
        assert!(failure_case().is_err());

        // With context
        fn context_case() -> SdkResult<String> {
            let result = sdk_try!(might_fail(true), "Reading session");
            Ok(result)
        }
        let err = context_case().unwrap_err();
        match err {
            SdkError::Unknown(msg) => {
                assert!(msg.contains("Reading session"));
            }
            _ => panic!("Expected Unknown"),
        }
    }

    #[test]
    fn test_sdk_err() {
        let error = sdk_err!(login_failed, "Token expired");
        match error {
            SdkError::LoginFailed(msg) => {
                assert_eq!(msg, "Token expired");
            }
            _ => panic!("Expected LoginFailed"),
        }
    }

    #[test]
    fn test_sdk_assert() {
        fn success_case() -> SdkResult<()> {
            sdk_assert!(10 > 5, invalid_input, "Value must be greater than 5");
            Ok(())
        }
        assert!(success_case().is_ok());

        fn failure_case() -> SdkResult<()> {
            sdk_assert!(5 > 10, invalid_input, "Value must be greater than 10");
            Ok(())
        }
        assert!(matches!(failure_case(), Err(SdkError::InvalidInput(_))));
    }

    #[test]
    fn test_sdk_ensure() {
        fn success_case() -> SdkResult<String> {
            let option = Some("test".to_string());
            let value = sdk_ensure!(option, missing_parameter, "userData");
            Ok(value)
        }
        assert_eq!(success_case().unwrap(), "test");

        fn failure_case() -> SdkResult<String> {
            let option: Option<String> = None;
            let value = sdk_ensure!(option, missing_parameter, "userData");
            Ok(value)
        }
        assert!(matches!(
            failure_case(),
            Err(SdkError::MissingParameter(_))
        ));
    }
}
