//! Options for storage operations

use serde::{Deserialize, Serialize};

use crate::storage::GaiaHubConfig;

/// Options for `put_file`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutFileOptions {
    /// Encrypt with the app public key of the current user before writing
    pub encrypt: bool,

    /// Content type, only used when the file is not encrypted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Sign the content with the app private key
    pub sign: bool,
}

impl Default for PutFileOptions {
    fn default() -> Self {
        PutFileOptions {
            encrypt: true,
            content_type: None,
            sign: false,
        }
    }
}

impl PutFileOptions {
    /// Plain, unsigned upload
    pub fn plain() -> Self {
        PutFileOptions {
            encrypt: false,
            ..Self::default()
        }
    }

    pub fn with_encrypt(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    pub fn with_sign(mut self, sign: bool) -> Self {
        self.sign = sign;
        self
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Options for `get_file`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFileOptions {
    pub decrypt: bool,

    /// Check the signature written by a signed `put_file`
    pub verify: bool,

    /// Read from the bucket of another user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Origin of the app whose bucket is read; defaults to the current app
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,

    /// Name lookup endpoint used to resolve `username`
    #[serde(rename = "zoneFileLookupURL", default, skip_serializing_if = "Option::is_none")]
    pub zone_file_lookup_url: Option<String>,

    /// Directory prefix prepended to the path
    #[serde(default)]
    pub dir: String,
}

impl Default for GetFileOptions {
    fn default() -> Self {
        GetFileOptions {
            decrypt: true,
            verify: false,
            username: None,
            app: None,
            zone_file_lookup_url: None,
            dir: String::new(),
        }
    }
}

impl GetFileOptions {
    pub fn plain() -> Self {
        GetFileOptions {
            decrypt: false,
            ..Self::default()
        }
    }

    pub fn with_decrypt(mut self, decrypt: bool) -> Self {
        self.decrypt = decrypt;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_username<S: Into<String>>(mut self, username: S) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_app<S: Into<String>>(mut self, app: S) -> Self {
        self.app = Some(app.into());
        self
    }

    pub fn with_zone_file_lookup_url<S: Into<String>>(mut self, url: S) -> Self {
        self.zone_file_lookup_url = Some(url.into());
        self
    }

    pub fn with_dir<S: Into<String>>(mut self, dir: S) -> Self {
        self.dir = dir.into();
        self
    }

    /// Whether the file is read from someone else's bucket
    pub fn is_foreign(&self) -> bool {
        self.username.as_deref().map_or(false, |u| !u.is_empty())
    }
}

/// Options for `delete_file`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileOptions {
    /// Also delete the `.sig` file written by a signed `put_file`
    pub was_signed: bool,

    /// Hub to delete from instead of the session's hub
    #[serde(skip)]
    pub gaia_hub_config: Option<GaiaHubConfig>,
}

impl DeleteFileOptions {
    pub fn signed() -> Self {
        DeleteFileOptions {
            was_signed: true,
            gaia_hub_config: None,
        }
    }

    pub fn with_hub_config(mut self, config: GaiaHubConfig) -> Self {
        self.gaia_hub_config = Some(config);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let put = PutFileOptions::default();
        assert!(put.encrypt);
        assert!(!put.sign);

        let get = GetFileOptions::default();
        assert!(get.decrypt);
        assert!(!get.verify);
        assert!(!get.is_foreign());

        assert!(!DeleteFileOptions::default().was_signed);
    }

    #[test]
    fn test_json_names() {
        let put = PutFileOptions::plain().with_content_type("text/html").with_sign(true);
        assert_eq!(
            serde_json::to_value(&put).unwrap(),
            json!({"encrypt": false, "contentType": "text/html", "sign": true})
        );

        let get = GetFileOptions::default()
            .with_username("alice.id")
            .with_zone_file_lookup_url("https://core.blockstack.org/v1/names/");
        let value = serde_json::to_value(&get).unwrap();
        assert_eq!(value["zoneFileLookupURL"], "https://core.blockstack.org/v1/names/");
        assert_eq!(value["username"], "alice.id");
        assert!(get.is_foreign());

        assert_eq!(
            serde_json::to_value(DeleteFileOptions::signed()).unwrap(),
            json!({"wasSigned": true})
        );
    }
}
