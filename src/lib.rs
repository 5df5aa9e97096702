//! Gmail image attachments to cropped faces to a web form.
//!
//! Each stage reads the previous stage's JSON file and writes its own:
//! [`download`] produces `image_meta.json`, [`faces`] produces `cropped_meta.json`,
//! [`upload`] submits it. [`export`] is a side branch that summarizes unread mail
//! into a spreadsheet.

pub mod auth;
pub mod config;
pub mod domain;
pub mod download;
pub mod export;
pub mod faces;
pub mod gmail;
pub mod upload;
