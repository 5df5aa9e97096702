use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// OAuth client as downloaded from the Google Cloud console (`credentials.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

pub fn parse_client_secrets(s: &str) -> Result<ClientSecrets> {
    let file: SecretsFile = serde_json::from_str(s)?;
    file.installed
        .or(file.web)
        .ok_or_else(|| anyhow!("client secrets file has neither an 'installed' nor a 'web' entry"))
}

pub fn load_client_secrets(path: &Path) -> Result<ClientSecrets> {
    let s = fs::read_to_string(path)
        .map_err(|e| anyhow!("cannot read client secrets {}: {e}", path.display()))?;
    parse_client_secrets(&s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installed_app_secrets() {
        let s = r#"{"installed":{"client_id":"123.apps.googleusercontent.com",
            "project_id":"p","client_secret":"shh",
            "redirect_uris":["http://localhost"]}}"#;
        let cs = parse_client_secrets(s).unwrap();
        assert_eq!(cs.client_id, "123.apps.googleusercontent.com");
        assert_eq!(cs.client_secret.as_deref(), Some("shh"));
        assert_eq!(cs.redirect_uris, vec!["http://localhost".to_string()]);
    }

    #[test]
    fn web_app_secrets_without_secret() {
        let cs = parse_client_secrets(r#"{"web":{"client_id":"abc"}}"#).unwrap();
        assert_eq!(cs.client_id, "abc");
        assert!(cs.client_secret.is_none());
        assert!(cs.redirect_uris.is_empty());
    }

    #[test]
    fn unknown_layout_is_an_error() {
        assert!(parse_client_secrets(r#"{"other":{}}"#).is_err());
    }
}
