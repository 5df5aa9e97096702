use anyhow::{Result, anyhow};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::client_secrets::{ClientSecrets, load_client_secrets};
use crate::auth::oauth::{self, Tokens};
use crate::auth::token_store;
use crate::auth::tokens_file::{self, TokensFile};
use crate::config::Config;

/// Assumed lifetime when Google omits `expires_in`
const FALLBACK_LIFETIME_SECS: i64 = 3500;

/// Storage and Google round-trips behind [`TokenManager`].
pub trait AuthBackend {
    fn load_cache(&self) -> Result<Option<TokensFile>>;
    fn save_cache(&self, tf: &TokensFile) -> Result<()>;
    fn load_refresh_token(&self, key: &str) -> Result<Option<String>>;
    fn save_refresh_token(&self, key: &str, token: &str) -> Result<()>;
    fn delete_refresh_token(&self, key: &str) -> Result<()>;
    fn refresh(&self, refresh_token: &str) -> Result<Tokens>;
    fn authorize(&self, scope: &str, user_email: &str) -> Result<Tokens>;
}

/// tokens.json, the OS keyring and the real Google endpoints.
#[derive(Clone)]
pub struct GoogleAuth {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
}

impl AuthBackend for GoogleAuth {
    fn load_cache(&self) -> Result<Option<TokensFile>> {
        tokens_file::load_tokens()
    }

    fn save_cache(&self, tf: &TokensFile) -> Result<()> {
        tokens_file::save_tokens_at(&tokens_file::tokens_path()?, tf)
    }

    fn load_refresh_token(&self, key: &str) -> Result<Option<String>> {
        token_store::load_refresh_token(key)
    }

    fn save_refresh_token(&self, key: &str, token: &str) -> Result<()> {
        token_store::save_refresh_token(key, token)
    }

    fn delete_refresh_token(&self, key: &str) -> Result<()> {
        token_store::delete_refresh_token(key)
    }

    fn refresh(&self, refresh_token: &str) -> Result<Tokens> {
        oauth::refresh_access_token(&self.client_id, self.client_secret.as_deref(), refresh_token)
    }

    fn authorize(&self, scope: &str, user_email: &str) -> Result<Tokens> {
        oauth::perform_pkce_flow(
            &self.client_id,
            self.client_secret.as_deref(),
            &self.redirect_uri,
            scope,
            user_email,
        )
    }
}

/// Keyring entry for a refresh token, one per account and scope.
pub fn refresh_key(user_email: &str, scope: &str) -> String {
    format!("{user_email} {scope}")
}

/// Whether a granted scope list covers `wanted`. Google may omit the list;
/// then the grant is taken to be what was asked for.
fn grants(granted: Option<&str>, wanted: &str) -> bool {
    granted.is_none_or(|g| g.split_whitespace().any(|s| s == wanted))
}

pub struct TokenManager<B = GoogleAuth> {
    backend: B,
    pub user_email: String,
    pub scope: String,
}

impl TokenManager<GoogleAuth> {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let file_secrets: Option<ClientSecrets> = cfg
            .credentials_file
            .as_deref()
            .map(|p| load_client_secrets(Path::new(p)))
            .transpose()?;

        let client_id = cfg
            .client_id
            .clone()
            .or_else(|| file_secrets.as_ref().map(|s| s.client_id.clone()))
            .ok_or_else(|| anyhow!("client_id not set in config and no credentials_file given"))?;
        let user_email = cfg
            .user_email
            .clone()
            .ok_or_else(|| anyhow!("user_email not set in config"))?;

        let client_secret = token_store::load_client_secret(&client_id)
            .unwrap_or_else(|e| {
                log::warn!("keyring lookup for client secret failed: {e}");
                None
            })
            .or_else(|| file_secrets.and_then(|s| s.client_secret))
            .or_else(|| std::env::var("OAUTH_CLIENT_SECRET").ok());

        let backend = GoogleAuth {
            client_id,
            client_secret,
            redirect_uri: cfg.redirect_uri().to_string(),
        };
        Ok(Self::with_backend(backend, user_email, cfg.scope()))
    }
}

impl<B: AuthBackend> TokenManager<B> {
    pub fn with_backend(backend: B, user_email: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            backend,
            user_email: user_email.into(),
            scope: scope.into(),
        }
    }

    /// Returns a valid access token; refreshes/PKCE if needed.
    pub fn get_access_token(&self) -> Result<String> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;
        self.access_token_at(now)
    }

    pub fn access_token_at(&self, now: i64) -> Result<String> {
        // 1) cached, not expired, same scope
        if let Some(tf) = self.backend.load_cache()?
            && let Some(at) = tf.usable_token(&self.scope, now)
        {
            log::debug!("using cached access token");
            return Ok(at.to_string());
        }

        // 2) refresh if possible
        let key = refresh_key(&self.user_email, &self.scope);
        if let Some(rt) = self.backend.load_refresh_token(&key)? {
            match self.backend.refresh(&rt) {
                Ok(t) if grants(t.scope.as_deref(), &self.scope) => return self.remember(t, now),
                Ok(t) => {
                    log::warn!(
                        "refreshed token only grants '{}', reauthorizing for {}",
                        t.scope.as_deref().unwrap_or_default(),
                        self.scope
                    );
                    let _ = self.backend.delete_refresh_token(&key);
                }
                Err(e) => {
                    log::warn!("refresh failed, falling back to interactive auth: {e}");
                    let _ = self.backend.delete_refresh_token(&key);
                }
            }
        }

        // 3) otherwise PKCE
        let t = self.backend.authorize(&self.scope, &self.user_email)?;
        if !grants(t.scope.as_deref(), &self.scope) {
            return Err(anyhow!(
                "authorization did not grant {}; allow it on the consent screen",
                self.scope
            ));
        }
        self.remember(t, now)
    }

    fn remember(&self, t: Tokens, now: i64) -> Result<String> {
        let exp = t
            .expires_in
            .map(|s| now + s as i64)
            .unwrap_or(now + FALLBACK_LIFETIME_SECS);
        let key = refresh_key(&self.user_email, &self.scope);
        if let Some(rt) = &t.refresh_token
            && let Err(e) = self.backend.save_refresh_token(&key, rt)
        {
            log::warn!("could not store refresh token in keyring: {e}");
        }
        let cache = TokensFile {
            access_token: Some(t.access_token.clone()),
            expires_at_epoch: Some(exp),
            scope: Some(self.scope.clone()),
        };
        if let Err(e) = self.backend.save_cache(&cache) {
            log::warn!("couldn't save token metadata: {e}");
        }
        Ok(t.access_token)
    }
}
