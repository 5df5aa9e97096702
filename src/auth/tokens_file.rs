use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::app_dir;

/// Non-secret token metadata stored in ~/.config/mailface/tokens.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokensFile {
    pub access_token: Option<String>,
    pub expires_at_epoch: Option<i64>, // epoch seconds
    /// Scope the access token was granted for
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokensFile {
    /// The cached access token, if it is still valid at `now` and was issued for `scope`.
    pub fn usable_token(&self, scope: &str, now: i64) -> Option<&str> {
        if self.scope.as_deref() != Some(scope) {
            return None;
        }
        match (&self.access_token, self.expires_at_epoch) {
            (Some(at), Some(exp)) if now < exp => Some(at.as_str()),
            _ => None,
        }
    }
}

pub fn tokens_path() -> Result<PathBuf> {
    Ok(app_dir()?.join("tokens.json"))
}

pub fn save_tokens_at(path: &Path, tf: &TokensFile) -> Result<()> {
    let s = serde_json::to_string_pretty(tf)?;
    fs::write(path, s)?;
    Ok(())
}

pub fn load_tokens_at(path: &Path) -> Result<Option<TokensFile>> {
    if !path.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(path)?;
    let tf: TokensFile = serde_json::from_str(&s)?;
    Ok(Some(tf))
}

/// Load tokens file if present
pub fn load_tokens() -> Result<Option<TokensFile>> {
    load_tokens_at(&tokens_path()?)
}
