use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};

const SERVICE: &str = "mailface";

fn entry(key: &str) -> Result<Entry> {
    Entry::new(SERVICE, key).map_err(|e| anyhow!("keyring unavailable: {e}"))
}

fn load(key: &str) -> Result<Option<String>> {
    match entry(key)?.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}

fn save(key: &str, secret: &str) -> Result<()> {
    entry(key)?
        .set_password(secret)
        .map_err(|e| anyhow!(e.to_string()))
}

/// Save a refresh token into the OS keyring under `key` (account and scope)
pub fn save_refresh_token(key: &str, refresh_token: &str) -> Result<()> {
    save(key, refresh_token)
}

/// Load the refresh token stored under `key`
pub fn load_refresh_token(key: &str) -> Result<Option<String>> {
    load(key)
}

/// Drop a refresh token that Google no longer accepts
pub fn delete_refresh_token(key: &str) -> Result<()> {
    match entry(key)?.delete_credential() {
        Ok(()) | Err(KeyringError::NoEntry) => Ok(()),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}

/// Save a client secret into the keyring, keyed by client_id
pub fn save_client_secret(client_id: &str, client_secret: &str) -> Result<()> {
    save(client_id, client_secret)
}

/// Load client secret from keyring by client_id
pub fn load_client_secret(client_id: &str) -> Result<Option<String>> {
    load(client_id)
}
