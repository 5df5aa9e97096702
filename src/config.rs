use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/callback";
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    pub client_id: Option<String>,
    pub user_email: Option<String>,
    pub redirect_uri: Option<String>,
    /// Google client secrets JSON ("installed" or "web" app)
    pub credentials_file: Option<String>,
    pub scope: Option<String>,

    /// Directory holding the handoff files (image_meta.json, cropped_meta.json, ...)
    pub work_dir: Option<String>,
    pub download_dir: Option<String>,
    pub faces_dir: Option<String>,

    pub gmail_api_base: Option<String>,
    pub max_messages: Option<usize>,

    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub faces: FaceConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct UploadConfig {
    pub form_url: String,
    pub webdriver_url: String,
    pub headless: bool,
    pub fill_time: bool,
    /// Type `a@b` instead of the full `Name <a@b>` header
    pub address_only: bool,
    pub load_wait_ms: u64,
    pub file_wait_ms: u64,
    pub submit_wait_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            form_url: "https://face-recognise.vercel.app/add-image".to_string(),
            webdriver_url: "http://localhost:4444".to_string(),
            headless: true,
            fill_time: false,
            address_only: false,
            load_wait_ms: 2000,
            file_wait_ms: 1000,
            submit_wait_ms: 2000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct FaceConfig {
    /// SeetaFace frontal model (seeta_fd_frontal_v1.0.bin)
    pub model_path: Option<String>,
    pub min_face_size: u32,
    pub score_thresh: f64,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            min_face_size: 20,
            score_thresh: 2.0,
        }
    }
}

/// Locations of every file the pipeline stages hand to each other.
#[derive(Debug, Clone)]
pub struct Paths {
    pub work_dir: PathBuf,
    pub download_dir: PathBuf,
    pub faces_dir: PathBuf,
    pub image_meta: PathBuf,
    pub cropped_meta: PathBuf,
    pub excel: PathBuf,
}

impl Paths {
    pub fn from_config(cfg: &Config) -> Self {
        let work_dir = PathBuf::from(cfg.work_dir.as_deref().unwrap_or("."));
        let download_dir = work_dir.join(cfg.download_dir.as_deref().unwrap_or("downloads"));
        let faces_dir = work_dir.join(cfg.faces_dir.as_deref().unwrap_or("cropped_faces"));
        Self {
            image_meta: work_dir.join("image_meta.json"),
            cropped_meta: work_dir.join("cropped_meta.json"),
            excel: work_dir.join("email_images.xlsx"),
            work_dir,
            download_dir,
            faces_dir,
        }
    }
}

impl Config {
    pub fn redirect_uri(&self) -> &str {
        self.redirect_uri.as_deref().unwrap_or(DEFAULT_REDIRECT_URI)
    }

    pub fn scope(&self) -> &str {
        self.scope.as_deref().unwrap_or(DEFAULT_SCOPE)
    }
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("mailface"))
}

pub fn app_dir() -> Result<PathBuf> {
    let p = config_dir()?;
    fs::create_dir_all(&p)?;
    Ok(p)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(app_dir()?.join("config.toml"))
}

fn sample_config() -> Config {
    Config {
        client_id: Some("YOUR_CLIENT_ID.apps.googleusercontent.com".to_string()),
        user_email: Some("you@example.com".to_string()),
        redirect_uri: Some(DEFAULT_REDIRECT_URI.to_string()),
        credentials_file: None,
        scope: Some(DEFAULT_SCOPE.to_string()),
        work_dir: Some(".".to_string()),
        download_dir: Some("downloads".to_string()),
        faces_dir: Some("cropped_faces".to_string()),
        gmail_api_base: None,
        max_messages: None,
        upload: UploadConfig::default(),
        faces: FaceConfig {
            model_path: Some("seeta_fd_frontal_v1.0.bin".to_string()),
            ..FaceConfig::default()
        },
    }
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

/// Reads the config at `path`, writing a template there first if it is missing.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        // create a template config for users to edit
        let tom = toml::to_string_pretty(&sample_config())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, tom)?;
        return Err(anyhow::anyhow!(
            "Created template config at {}, edit it and run again",
            path.display()
        ));
    }
    let s = fs::read_to_string(path)?;
    parse_config(&s)
}

pub fn parse_config(s: &str) -> Result<Config> {
    Ok(toml::from_str(s)?)
}
