use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fs;
use std::path::{Path, PathBuf};

/// One saved image attachment and the headers of the email it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub filepath: PathBuf,
    pub sender: String,
    pub date: String,
    pub subject: String,
}

/// A face cropped out of an [`ImageRecord`]'s image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRecord {
    pub face_path: PathBuf,
    pub sender: String,
    pub date: String,
    pub subject: String,
}

impl FaceRecord {
    pub fn from_image(image: &ImageRecord, face_path: PathBuf) -> Self {
        Self {
            face_path,
            sender: image.sender.clone(),
            date: image.date.clone(),
            subject: image.subject.clone(),
        }
    }
}

/// A spreadsheet row: one per unread email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmailRow {
    pub sender: String,
    pub date: String,
    pub subject: String,
    pub images: String,
}

pub const NO_IMAGE: &str = "No image";

impl EmailRow {
    pub fn new(sender: &str, date: &str, subject: &str, images: &[PathBuf]) -> Self {
        let images = if images.is_empty() {
            NO_IMAGE.to_string()
        } else {
            images
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        Self {
            sender: sender.to_string(),
            date: date.to_string(),
            subject: subject.to_string(),
            images,
        }
    }
}

/// Write `items` as a pretty-printed JSON array, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let s = serde_json::to_string_pretty(items)?;
    fs::write(path, s)?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let s = fs::read_to_string(path).map_err(|e| {
        anyhow!(
            "cannot read {}: {e} (did the previous stage run?)",
            path.display()
        )
    })?;
    serde_json::from_str(&s).map_err(|e| anyhow!("malformed {}: {e}", path.display()))
}
