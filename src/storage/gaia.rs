//! Gaia file operations

use std::sync::{Arc, RwLock};
use url::Url;

use super::hub::GaiaHub;
use super::{AuthScope, GaiaHubConfig, StorageError};
use crate::auth::{HttpNameResolver, NameResolver};
use crate::crypto::{
    decode_btc_address, decrypt_ecies, encrypt_ecies, get_public_key_from_private,
    public_key_to_address, sha256, sign_content, sign_encrypted_content, verify_signature,
    CipherObject, Payload, SignatureObject, SignedCipherObject,
};
use crate::error::{SdkError, SdkResult};
use crate::models::{DeleteFileOptions, GetFileOptions, PutFileOptions};
use crate::network::{HttpResponse, Transport};
use crate::profile::lookup_profile;

/// Suffix of the detached signature file written next to signed plain files
pub const SIGNATURE_FILE_SUFFIX: &str = ".sig";

/// Upper bound on `list-files` pages fetched by one listing
pub const MAX_LIST_PAGES: usize = 65536;

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";
const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

/// `url_prefix + address + "/" + path`
pub fn get_full_read_url(path: &str, config: &GaiaHubConfig) -> String {
    format!("{}{}/{}", config.url_prefix, config.address, path)
}

/// Collapse trailing slashes of a bucket URL into exactly one
pub fn normalize_bucket_url(url: &str) -> String {
    let (base, suffix) = match url.find(|c| c == '?' || c == '#') {
        Some(idx) => url.split_at(idx),
        None => (url, ""),
    };
    format!("{}/{}", base.trim_end_matches('/'), suffix)
}

/// Bucket address embedded in a Gaia read URL
///
/// Picks the last path segment that is a valid Base58Check address.
pub fn bucket_address_from_read_url(read_url: &str) -> Option<String> {
    let url = Url::parse(read_url).ok()?;
    let segments: Vec<String> = url.path_segments()?.map(String::from).collect();
    segments
        .into_iter()
        .rev()
        .find(|segment| decode_btc_address(segment).is_ok())
}

/// Read URL of `path` in the bucket `username` keeps for `app_origin`
pub async fn get_user_app_file_url(
    resolver: &dyn NameResolver,
    transport: &dyn Transport,
    path: &str,
    username: &str,
    app_origin: &str,
) -> SdkResult<String> {
    let profile = lookup_profile(resolver, transport, username).await?;
    match profile.app_bucket_url(app_origin) {
        Some(bucket) => Ok(format!("{}{}", normalize_bucket_url(bucket), path)),
        None => Err(SdkError::MissingReadUrl(format!(
            "{} has no bucket for {}",
            username, app_origin
        ))),
    }
}

fn join_dir(dir: &str, path: &str) -> String {
    if dir.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), path)
    }
}

fn signature_path(path: &str) -> String {
    format!("{}{}", path, SIGNATURE_FILE_SUFFIX)
}

/// Plain payload from a response, text when the content type says so
fn payload_from_response(response: HttpResponse) -> Payload {
    let is_text = response
        .content_type()
        .map(|ct| ct.starts_with("text/") || ct.starts_with(CONTENT_TYPE_JSON))
        .unwrap_or(false);
    if is_text {
        match String::from_utf8(response.body) {
            Ok(text) => Payload::Text(text),
            Err(e) => Payload::Binary(e.into_bytes()),
        }
    } else {
        Payload::Binary(response.body)
    }
}

fn check_signer(
    content_hash: &[u8],
    signature: &str,
    public_key: &str,
    expected_address: &str,
) -> SdkResult<()> {
    let signer_address = public_key_to_address(public_key)
        .map_err(|e| SdkError::SignatureVerification(e.to_string()))?;
    if signer_address != expected_address {
        return Err(SdkError::SignatureVerification(format!(
            "signer {} does not own bucket {}",
            signer_address, expected_address
        )));
    }
    let valid = verify_signature(content_hash, signature, public_key)
        .map_err(|e| SdkError::SignatureVerification(e.to_string()))?;
    if !valid {
        return Err(SdkError::SignatureVerification(
            "content does not match its signature".to_string(),
        ));
    }
    Ok(())
}

/// Reads and writes files in Gaia buckets
///
/// Holds the hub connection of the signed-in app. The connection is read
/// under a lock and cloned, so requests in flight keep the token they
/// started with.
pub struct GaiaClient {
    hub: GaiaHub,
    resolver: Arc<dyn NameResolver>,
    hub_config: RwLock<Option<GaiaHubConfig>>,
}

impl GaiaClient {
    pub fn new(transport: Arc<dyn Transport>, resolver: Arc<dyn NameResolver>) -> Self {
        GaiaClient {
            hub: GaiaHub::new(transport),
            resolver,
            hub_config: RwLock::new(None),
        }
    }

    pub fn hub(&self) -> &GaiaHub {
        &self.hub
    }

    /// Connect to `hub_url` with the app key and remember the connection
    pub async fn connect(
        &self,
        hub_url: &str,
        app_private_key: &str,
        association_token: Option<&str>,
        scopes: &[AuthScope],
    ) -> SdkResult<GaiaHubConfig> {
        let config = self
            .hub
            .connect(hub_url, app_private_key, association_token, scopes)
            .await?;
        self.set_hub_config(config.clone())?;
        Ok(config)
    }

    pub fn set_hub_config(&self, config: GaiaHubConfig) -> SdkResult<()> {
        let mut guard = self
            .hub_config
            .write()
            .map_err(|_| SdkError::Unknown("hub config lock poisoned".to_string()))?;
        *guard = Some(config);
        Ok(())
    }

    /// Current connection
    pub fn hub_config(&self) -> SdkResult<GaiaHubConfig> {
        self.hub_config
            .read()
            .map_err(|_| SdkError::Unknown("hub config lock poisoned".to_string()))?
            .clone()
            .ok_or_else(|| StorageError::NotConnected.into())
    }

    pub fn is_connected(&self) -> bool {
        self.hub_config
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Forget the current connection
    pub fn clear_hub_config(&self) {
        if let Ok(mut guard) = self.hub_config.write() {
            *guard = None;
        }
    }

    /// Store `content` at `path`, returning its read URL
    ///
    /// If a signed plain file is stored but its `.sig` file is not, the
    /// result is `PartialFailure`.
    pub async fn put_file(
        &self,
        path: &str,
        content: Payload,
        app_private_key: &str,
        options: &PutFileOptions,
    ) -> SdkResult<String> {
        let config = self.hub_config()?;

        if options.encrypt {
            let public_key = get_public_key_from_private(app_private_key)?;
            let cipher = encrypt_ecies(&public_key, &content)?.to_json_string();
            let body = if options.sign {
                serde_json::to_vec(&sign_encrypted_content(&cipher, app_private_key)?)?
            } else {
                cipher.into_bytes()
            };
            let url = self.hub.upload(&config, path, body, CONTENT_TYPE_JSON).await?;
            log::info!("Stored encrypted file {}", path);
            return Ok(url);
        }

        let content_type = options.content_type.clone().unwrap_or_else(|| {
            if content.is_text() {
                CONTENT_TYPE_TEXT.to_string()
            } else {
                CONTENT_TYPE_BINARY.to_string()
            }
        });
        let signature = if options.sign {
            Some(sign_content(content.as_bytes(), app_private_key)?)
        } else {
            None
        };

        let url = self
            .hub
            .upload(&config, path, content.into_bytes(), &content_type)
            .await?;

        if let Some(signature) = signature {
            let sidecar = serde_json::to_vec(&signature)?;
            if let Err(e) = self
                .hub
                .upload(&config, &signature_path(path), sidecar, CONTENT_TYPE_JSON)
                .await
            {
                log::warn!("Stored {} but not its signature: {}", path, e);
                return Err(SdkError::PartialFailure {
                    completed: format!("upload of {}", url),
                    reason: format!("signature upload failed: {}", e),
                });
            }
        }

        log::info!("Stored file {}", path);
        Ok(url)
    }

    /// Read URL of `path`, in the user's own bucket or in another user's
    pub async fn get_file_url(&self, path: &str, options: &GetFileOptions) -> SdkResult<String> {
        let path = join_dir(&options.dir, path);
        match options.username.as_deref().filter(|u| !u.is_empty()) {
            None => Ok(get_full_read_url(&path, &self.hub_config()?)),
            Some(username) => {
                let app = options.app.as_deref().ok_or_else(|| {
                    SdkError::MissingParameter("app origin is required to read another user's file".to_string())
                })?;
                match options.zone_file_lookup_url.as_deref() {
                    Some(lookup_url) => {
                        let resolver =
                            HttpNameResolver::new(self.hub.transport().clone(), lookup_url);
                        get_user_app_file_url(&resolver, self.hub.transport().as_ref(), &path, username, app)
                            .await
                    }
                    None => {
                        get_user_app_file_url(
                            self.resolver.as_ref(),
                            self.hub.transport().as_ref(),
                            &path,
                            username,
                            app,
                        )
                        .await
                    }
                }
            }
        }
    }

    /// Read `path`; `None` if the hub has no such file
    pub async fn get_file(
        &self,
        path: &str,
        app_private_key: &str,
        options: &GetFileOptions,
    ) -> SdkResult<Option<Payload>> {
        let read_url = self.get_file_url(path, options).await?;
        let response = self.hub.fetch(&read_url).await?;
        if response.status == 404 {
            log::debug!("File {} not found", path);
            return Ok(None);
        }
        let response = response.error_for_status("getFile")?;

        let expected_signer = if options.verify {
            Some(self.expected_signer_address(&read_url, options)?)
        } else {
            None
        };

        match (options.decrypt, expected_signer) {
            (true, Some(address)) => {
                let signed: SignedCipherObject = serde_json::from_slice(&response.body)
                    .map_err(|e| {
                        SdkError::SignatureVerification(format!(
                            "file is not a signed cipher object: {}",
                            e
                        ))
                    })?;
                check_signer(
                    &sha256(signed.cipher_text.as_bytes()),
                    &signed.signature,
                    &signed.public_key,
                    &address,
                )?;
                let cipher = CipherObject::from_json_str(&signed.cipher_text)?;
                Ok(Some(decrypt_ecies(app_private_key, &cipher)?))
            }
            (true, None) => {
                let cipher = CipherObject::from_json_str(&String::from_utf8(response.body)?)?;
                Ok(Some(decrypt_ecies(app_private_key, &cipher)?))
            }
            (false, Some(address)) => {
                let sig_url = format!("{}{}", read_url, SIGNATURE_FILE_SUFFIX);
                let sig_response = self.hub.fetch(&sig_url).await?;
                if !sig_response.is_success() {
                    return Err(SdkError::SignatureVerification(format!(
                        "no signature file for {} (HTTP {})",
                        path, sig_response.status
                    )));
                }
                let signature: SignatureObject = serde_json::from_slice(&sig_response.body)
                    .map_err(|e| {
                        SdkError::SignatureVerification(format!("invalid signature file: {}", e))
                    })?;
                check_signer(
                    &sha256(&response.body),
                    &signature.signature,
                    &signature.public_key,
                    &address,
                )?;
                Ok(Some(payload_from_response(response)))
            }
            (false, None) => Ok(Some(payload_from_response(response))),
        }
    }

    fn expected_signer_address(&self, read_url: &str, options: &GetFileOptions) -> SdkResult<String> {
        if options.is_foreign() {
            bucket_address_from_read_url(read_url).ok_or_else(|| {
                SdkError::SignatureVerification(format!(
                    "no bucket address in read URL {}",
                    read_url
                ))
            })
        } else {
            Ok(self.hub_config()?.address)
        }
    }

    /// Delete `path`, and its `.sig` file when `was_signed` is set
    pub async fn delete_file(&self, path: &str, options: &DeleteFileOptions) -> SdkResult<()> {
        let config = match &options.gaia_hub_config {
            Some(config) => config.clone(),
            None => self.hub_config()?,
        };

        self.hub.delete(&config, path).await?;
        log::info!("Deleted file {}", path);

        if options.was_signed {
            if let Err(e) = self.hub.delete(&config, &signature_path(path)).await {
                return Err(SdkError::PartialFailure {
                    completed: format!("delete of {}", path),
                    reason: format!("signature delete failed: {}", e),
                });
            }
        }
        Ok(())
    }

    /// List the files of the bucket, returning how many were passed to `callback`
    ///
    /// Stops early when `callback` returns `false`.
    pub async fn list_files<F>(&self, mut callback: F) -> SdkResult<usize>
    where
        F: FnMut(&str) -> bool + Send,
    {
        self.list_files_with_prefix("", &mut callback).await
    }

    /// List only the files whose name starts with `prefix`
    pub async fn list_files_with_prefix<F>(&self, prefix: &str, callback: &mut F) -> SdkResult<usize>
    where
        F: FnMut(&str) -> bool + Send,
    {
        let config = self.hub_config()?;
        let mut page: Option<String> = None;
        let mut count = 0;

        for _ in 0..MAX_LIST_PAGES {
            let result = self.hub.list_files_page(&config, page.as_deref()).await?;
            for entry in result.entries.iter().filter(|e| e.starts_with(prefix)) {
                count += 1;
                if !callback(entry) {
                    return Ok(count);
                }
            }
            match result.page {
                Some(next) if !next.is_empty() => page = Some(next),
                _ => return Ok(count),
            }
        }

        log::error!("Gave up listing files after {} pages", MAX_LIST_PAGES);
        Err(SdkError::TooManyEntries(MAX_LIST_PAGES))
    }
}
