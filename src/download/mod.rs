use anyhow::{Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Paths;
use crate::domain::records::{ImageRecord, write_json};
use crate::gmail::MailApi;
use crate::gmail::decoders::{decode_body_data, sanitize_filename};
use crate::gmail::message::{Message, MessagePart};

pub const DEFAULT_QUERY: &str = "has:attachment is:unread";

/// `dir/name`, or `dir/stem_N.ext` for the first N that is not taken yet.
pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
    unique_path_by(dir, name, |p| p.exists())
}

/// Like [`unique_path`], with `taken` deciding which candidates are in use.
pub fn unique_path_by(dir: &Path, name: &str, taken: impl Fn(&Path) -> bool) -> PathBuf {
    let candidate = dir.join(name);
    if !taken(&candidate) {
        return candidate;
    }
    let p = Path::new(name);
    let stem = p.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
    let ext = p.extension().and_then(|e| e.to_str());
    (1..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{stem}_{n}.{ext}")),
            None => dir.join(format!("{stem}_{n}")),
        })
        .find(|c| !taken(c))
        .unwrap_or(candidate)
}

fn attachment_bytes(api: &dyn MailApi, message_id: &str, part: &MessagePart) -> Result<Vec<u8>> {
    let data = match part.body.data.as_deref().filter(|d| !d.is_empty()) {
        Some(d) => d.to_string(),
        None => {
            let att_id = part.body.attachment_id.as_deref().ok_or_else(|| {
                anyhow!(
                    "part '{}' of message {message_id} has neither data nor attachmentId",
                    part.filename
                )
            })?;
            api.get_attachment(message_id, att_id)?
        }
    };
    decode_body_data(&data)
}

/// Save every image attachment of `message` into `dir`, returning the written paths.
pub fn save_image_attachments(
    api: &dyn MailApi,
    message: &Message,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut saved = Vec::new();
    for part in message.image_parts() {
        let bytes = attachment_bytes(api, &message.id, part)?;
        let filepath = unique_path(dir, &sanitize_filename(&part.filename));
        fs::write(&filepath, bytes)?;
        saved.push(filepath);
    }
    Ok(saved)
}

/// Download image attachments of all messages matching `query` into `dir`.
pub fn download_images(api: &dyn MailApi, query: &str, dir: &Path) -> Result<Vec<ImageRecord>> {
    println!("Searching for emails with query: {query}");
    let refs = api.list_messages(query)?;
    println!("Found {} matching emails.", refs.len());

    fs::create_dir_all(dir)?;
    let mut meta = Vec::new();

    for r in &refs {
        let message = api.get_message(&r.id)?;
        let (sender, date, subject) = (message.sender(), message.date(), message.subject());

        let saved = save_image_attachments(api, &message, dir)?;
        if saved.is_empty() {
            println!("No image attachments found in email from {sender} with subject '{subject}'");
            continue;
        }
        for filepath in saved {
            println!(
                "Downloaded: {} | From: {sender} | Date: {date} | Subject: {subject}",
                filepath.display()
            );
            meta.push(ImageRecord {
                filepath,
                sender: sender.to_string(),
                date: date.to_string(),
                subject: subject.to_string(),
            });
        }
    }

    Ok(meta)
}

/// Stage 1: download and write `image_meta.json`.
pub fn run_download(api: &dyn MailApi, query: &str, paths: &Paths) -> Result<Vec<ImageRecord>> {
    let meta = download_images(api, query, &paths.download_dir)?;
    if meta.is_empty() {
        println!("No unread emails with image attachments found.");
    }
    write_json(&paths.image_meta, &meta)?;
    println!(
        "Saved metadata for {} images to {}.",
        meta.len(),
        paths.image_meta.display()
    );
    Ok(meta)
}
