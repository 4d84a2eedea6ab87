//! The session of a signed-in app
//!
//! `BlockstackSession` owns the collaborators (transport, session store,
//! executor, name resolver) and exposes sign-in, encryption, storage and
//! profile operations for the user stored in the session.

use futures::FutureExt;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::auth::{self, HttpNameResolver, NameResolver};
use crate::config::{AppConfig, DEFAULT_GAIA_HUB_URL};
use crate::crypto::{
    decrypt_ecies, encrypt_ecies, get_public_key_from_private, public_key_to_address, CipherObject,
    CryptoOptions, Payload,
};
use crate::error::{SdkError, SdkResult};
use crate::executor::{Executor, TokioExecutor};
use crate::models::{
    CollectionConfig, DeleteFileOptions, GetFileOptions, Profile, PutFileOptions, UserData,
};
use crate::network::{ReqwestTransport, Transport};
use crate::profile::{fetch_profile_from_token_file, lookup_profile};
use crate::session_store::{InMemorySessionStore, SessionStore};
use crate::storage::{get_user_app_file_url, GaiaClient};
use crate::utils::{log_url_safely, normalize_origin};
use crate::{sdk_ensure, sdk_err, sdk_try};

/// Collaborators of a session; anything left out gets its default
#[derive(Default)]
pub struct SessionOptions {
    pub transport: Option<Arc<dyn Transport>>,
    pub session_store: Option<Arc<dyn SessionStore>>,
    pub executor: Option<Arc<dyn Executor>>,
    pub name_resolver: Option<Arc<dyn NameResolver>>,
}

impl SessionOptions {
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_name_resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.name_resolver = Some(resolver);
        self
    }
}

/// Decrypt a hex encoded `CipherObject` JSON with the transit key
fn decrypt_hex_cipher(hex_cipher: &str, transit_key: &str) -> SdkResult<String> {
    let json = String::from_utf8(hex::decode(hex_cipher)?)?;
    let cipher = CipherObject::from_json_str(&json)?;
    match decrypt_ecies(transit_key, &cipher)? {
        Payload::Text(text) => Ok(text),
        Payload::Binary(bytes) => Ok(String::from_utf8(bytes)?),
    }
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Session of one app on behalf of one user
pub struct BlockstackSession {
    config: AppConfig,
    transport: Arc<dyn Transport>,
    store: Arc<dyn SessionStore>,
    executor: Arc<dyn Executor>,
    resolver: Arc<dyn NameResolver>,
    gaia: GaiaClient,
}

impl BlockstackSession {
    /// Create a session; must be called within a tokio runtime unless an
    /// executor is supplied
    pub fn new(config: AppConfig, options: SessionOptions) -> SdkResult<Self> {
        let transport = options
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()));
        let store = options
            .session_store
            .unwrap_or_else(|| Arc::new(InMemorySessionStore::new()));
        let executor: Arc<dyn Executor> = match options.executor {
            Some(executor) => executor,
            None => Arc::new(TokioExecutor::current()?),
        };
        let resolver = options.name_resolver.unwrap_or_else(|| {
            Arc::new(HttpNameResolver::for_core_node(
                transport.clone(),
                config.core_node(),
            ))
        });
        let gaia = GaiaClient::new(transport.clone(), resolver.clone());

        log::debug!("Created session for {}", config.app_domain);
        Ok(BlockstackSession {
            config,
            transport,
            store,
            executor,
            resolver,
            gaia,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn gaia(&self) -> &GaiaClient {
        &self.gaia
    }

    // Sign-in

    pub fn generate_and_store_transit_key(&self) -> SdkResult<String> {
        auth::generate_and_store_transit_key(self.store.as_ref())
    }

    /// Auth request for this app signed with `transit_private_key`
    pub fn make_auth_request(
        &self,
        transit_private_key: &str,
        expires_at: Option<u64>,
        send_to_sign_in: bool,
        extra_params: Option<&Map<String, Value>>,
    ) -> SdkResult<String> {
        auth::make_auth_request(
            &self.config,
            transit_private_key,
            expires_at,
            send_to_sign_in,
            extra_params,
        )
    }

    /// Start a sign-in: hands the authenticator URL to `open_url` on the main thread
    ///
    /// Returns the same URL.
    pub fn redirect_user_to_sign_in<F>(&self, send_to_sign_in: bool, open_url: F) -> SdkResult<String>
    where
        F: FnOnce(String) + Send + 'static,
    {
        let request = self
            .generate_and_store_transit_key()
            .and_then(|transit_key| self.make_auth_request(&transit_key, None, send_to_sign_in, None))
            .map_err(|e| SdkError::RedirectFailed(e.to_string()))?;

        let url = auth::redirect_url(self.config.authenticator_url.as_deref(), &request, send_to_sign_in);
        log_url_safely("Redirecting to authenticator", &url);
        let target = url.clone();
        self.executor.on_main_thread(Box::new(move || open_url(target)));
        Ok(url)
    }

    /// Finish a sign-in with the auth response from the authenticator
    ///
    /// The session store is only written once every step succeeded.
    #[tracing::instrument(skip_all)]
    pub async fn handle_pending_sign_in(&self, auth_response: &str) -> SdkResult<UserData> {
        let transit_key = sdk_ensure!(
            self.store.session_data()?.transit_key,
            login_failed,
            "no transit key in session, start the sign-in again"
        );

        let decoded = auth::verify_auth_response(auth_response, self.resolver.as_ref()).await?;
        let payload = &decoded.payload;

        let encrypted_key = sdk_ensure!(
            payload.get("private_key").and_then(Value::as_str),
            login_failed,
            "auth response carries no private key"
        );
        let app_private_key = decrypt_hex_cipher(encrypted_key, &transit_key).map_err(|e| {
            sdk_err!(
                login_failed,
                format!("failed decrypting app private key, transit key has changed? {}", e)
            )
        })?;

        let core_session_token = match non_empty(payload.get("core_token")) {
            Some(token) => match decrypt_hex_cipher(&token, &transit_key) {
                Ok(token) => Some(token),
                Err(e) => {
                    log::warn!("Ignoring core token that failed to decrypt: {}", e);
                    None
                }
            },
            None => None,
        };

        let profile = match payload.get("profile").filter(|p| p.is_object()) {
            Some(profile) => Profile::new(profile.clone()),
            None => self.fetch_profile_url(payload.get("profile_url")).await,
        };

        let issuer = decoded.claim_str("iss").map(String::from);
        let identity_address = match &issuer {
            Some(did) => auth::get_address_from_did(did)?,
            None => None,
        };

        let user_data = UserData {
            username: non_empty(payload.get("username")),
            profile: Some(profile),
            email: non_empty(payload.get("email")),
            decentralized_id: issuer,
            identity_address,
            app_private_key: Some(app_private_key),
            core_session_token,
            auth_response_token: Some(auth_response.to_string()),
            hub_url: Some(
                non_empty(payload.get("hubUrl")).unwrap_or_else(|| DEFAULT_GAIA_HUB_URL.to_string()),
            ),
            core_node: Some(
                non_empty(payload.get("blockstackAPIUrl"))
                    .unwrap_or_else(|| self.config.core_node().to_string()),
            ),
            gaia_association_token: non_empty(payload.get("associationToken")),
        };

        let mut data = self.store.session_data()?;
        data.user_data = Some(user_data.clone());
        sdk_try!(self.store.set_session_data(data), "Persisting user data");
        self.gaia.clear_hub_config();

        log::info!("Signed in {}", user_data.decentralized_id().unwrap_or_default());
        Ok(user_data)
    }

    async fn fetch_profile_url(&self, profile_url: Option<&Value>) -> Profile {
        let url = match profile_url.and_then(Value::as_str) {
            Some(url) => url,
            None => return Profile::default_person(),
        };
        match fetch_profile_from_token_file(self.transport.as_ref(), url, None).await {
            Ok(Some(profile)) => profile,
            Ok(None) => Profile::default_person(),
            Err(e) => {
                log::warn!("Could not load profile from profile_url: {}", e);
                Profile::default_person()
            }
        }
    }

    /// `handle_pending_sign_in` on the network thread, reporting on the main thread
    pub fn handle_pending_sign_in_with_callback<F>(self: &Arc<Self>, auth_response: String, callback: F)
    where
        F: FnOnce(SdkResult<UserData>) + Send + 'static,
    {
        let session = Arc::clone(self);
        let executor = Arc::clone(&self.executor);
        self.executor.on_network_thread(
            async move {
                let result = session.handle_pending_sign_in(&auth_response).await;
                executor.on_main_thread(Box::new(move || callback(result)));
            }
            .boxed(),
        );
    }

    // Session state

    /// Data of the signed-in user, if any
    pub fn load_user_data(&self) -> SdkResult<Option<UserData>> {
        Ok(self.store.session_data()?.user_data)
    }

    pub fn is_user_signed_in(&self) -> bool {
        matches!(self.load_user_data(), Ok(Some(_)))
    }

    /// Forget the user and the hub connection
    pub fn sign_user_out(&self) -> SdkResult<()> {
        self.store.delete_session_data()?;
        self.gaia.clear_hub_config();
        log::info!("Signed user out");
        Ok(())
    }

    fn signed_in_user(&self) -> SdkResult<UserData> {
        self.load_user_data()?
            .ok_or_else(|| SdkError::MissingParameter("no user is signed in".to_string()))
    }

    fn app_private_key(&self) -> SdkResult<String> {
        Ok(self.signed_in_user()?.app_private_key()?.to_string())
    }

    /// Encrypt to `options.public_key`, or to the user's app key
    pub fn encrypt_content<P: Into<Payload>>(&self, content: P, options: &CryptoOptions) -> SdkResult<CipherObject> {
        let public_key = match &options.public_key {
            Some(public_key) => public_key.clone(),
            None => get_public_key_from_private(&self.app_private_key()?)?,
        };
        Ok(encrypt_ecies(&public_key, &content.into())?)
    }

    /// Decrypt with `options.private_key`, or with the user's app key
    pub fn decrypt_content(&self, cipher: &CipherObject, options: &CryptoOptions) -> SdkResult<Payload> {
        let private_key = match &options.private_key {
            Some(private_key) => private_key.clone(),
            None => self.app_private_key()?,
        };
        Ok(decrypt_ecies(&private_key, cipher)?)
    }

    /// Hub connection and keys of a collection granted at sign-in
    pub fn get_collection_config(&self, name: &str) -> SdkResult<Option<CollectionConfig>> {
        Ok(self.store.session_data()?.collection_configs.get(name).cloned())
    }

    /// Persist the hub connection and key of collection `name`
    ///
    /// Sign-in never grants collections on its own; hosts store the config
    /// they obtained for the collection here.
    pub fn set_collection_config(&self, name: &str, config: CollectionConfig) -> SdkResult<()> {
        let mut data = self.store.session_data()?;
        data.collection_configs.insert(name.to_string(), config);
        sdk_try!(self.store.set_session_data(data), "Persisting collection config");
        Ok(())
    }

    // Storage

    /// App key of the user, connecting to their hub first if needed
    async fn connected_app_key(&self) -> SdkResult<String> {
        let user = self.signed_in_user()?;
        let app_key = user.app_private_key()?.to_string();
        if !self.gaia.is_connected() {
            let hub_url = user.hub_url().unwrap_or(DEFAULT_GAIA_HUB_URL);
            self.gaia
                .connect(hub_url, &app_key, user.gaia_association_token.as_deref(), &[])
                .await?;
        }
        Ok(app_key)
    }

    fn with_current_app(&self, options: &GetFileOptions) -> SdkResult<GetFileOptions> {
        let mut options = options.clone();
        if options.is_foreign() && options.app.is_none() {
            options.app = Some(normalize_origin(&self.config.app_domain)?);
        }
        Ok(options)
    }

    #[tracing::instrument(skip(self, content, options))]
    pub async fn put_file<P: Into<Payload> + Send>(
        &self,
        path: &str,
        content: P,
        options: &PutFileOptions,
    ) -> SdkResult<String> {
        let app_key = self.connected_app_key().await?;
        self.gaia.put_file(path, content.into(), &app_key, options).await
    }

    /// Read a file; `None` if it does not exist
    #[tracing::instrument(skip(self, options))]
    pub async fn get_file(&self, path: &str, options: &GetFileOptions) -> SdkResult<Option<Payload>> {
        let options = self.with_current_app(options)?;
        let app_key = if options.is_foreign() {
            self.app_private_key()?
        } else {
            self.connected_app_key().await?
        };
        self.gaia.get_file(path, &app_key, &options).await
    }

    #[tracing::instrument(skip(self, options))]
    pub async fn delete_file(&self, path: &str, options: &DeleteFileOptions) -> SdkResult<()> {
        if options.gaia_hub_config.is_none() {
            self.connected_app_key().await?;
        }
        self.gaia.delete_file(path, options).await
    }

    /// List the user's files; see `GaiaClient::list_files`
    #[tracing::instrument(skip_all)]
    pub async fn list_files<F>(&self, callback: F) -> SdkResult<usize>
    where
        F: FnMut(&str) -> bool + Send,
    {
        self.connected_app_key().await?;
        self.gaia.list_files(callback).await
    }

    #[tracing::instrument(skip(self, options))]
    pub async fn get_file_url(&self, path: &str, options: &GetFileOptions) -> SdkResult<String> {
        let options = self.with_current_app(options)?;
        if !options.is_foreign() {
            self.connected_app_key().await?;
        }
        self.gaia.get_file_url(path, &options).await
    }

    /// Bucket URL the hub at `hub_url` assigns to `app_private_key`
    #[tracing::instrument(skip(self, app_private_key))]
    pub async fn get_app_bucket_url(&self, hub_url: &str, app_private_key: &str) -> SdkResult<String> {
        let hub_info = self.gaia.hub().hub_info(hub_url).await?;
        let address = public_key_to_address(&get_public_key_from_private(app_private_key)?)?;
        Ok(format!("{}{}/", hub_info.read_url_prefix, address))
    }

    fn resolver_for(&self, lookup_url: Option<&str>) -> Arc<dyn NameResolver> {
        match lookup_url {
            Some(url) => Arc::new(HttpNameResolver::new(self.transport.clone(), url)),
            None => self.resolver.clone(),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_user_app_file_url(
        &self,
        path: &str,
        username: &str,
        app_origin: &str,
        lookup_url: Option<&str>,
    ) -> SdkResult<String> {
        let resolver = self.resolver_for(lookup_url);
        get_user_app_file_url(resolver.as_ref(), self.transport.as_ref(), path, username, app_origin).await
    }

    // Profiles

    #[tracing::instrument(skip(self))]
    pub async fn lookup_profile(&self, username: &str, lookup_url: Option<&str>) -> SdkResult<Profile> {
        let resolver = self.resolver_for(lookup_url);
        lookup_profile(resolver.as_ref(), self.transport.as_ref(), username).await
    }
}
