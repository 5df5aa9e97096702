//! In-memory [`MailApi`] for unit tests.

use anyhow::{Result, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::HashMap;

use crate::gmail::client::MailApi;
use crate::gmail::message::{Message, MessageRef};

#[derive(Default)]
pub struct FakeMail {
    pub messages: Vec<Message>,
    pub attachments: HashMap<(String, String), String>,
    pub marked_read: RefCell<Vec<String>>,
}

impl FakeMail {
    /// Adds a message; `images` are (filename, contents, inline?) triples.
    pub fn add(&mut self, id: &str, from: &str, subject: &str, images: &[(&str, &str, bool)]) {
        let mut parts: Vec<Value> = vec![json!({
            "mimeType": "text/plain", "filename": "", "body": {"size": 2, "data": "aGk"}
        })];
        for (i, (name, contents, inline)) in images.iter().enumerate() {
            let bytes = contents.as_bytes();
            let data = URL_SAFE_NO_PAD.encode(bytes);
            if *inline {
                parts.push(json!({
                    "mimeType": "image/jpeg", "filename": name,
                    "body": {"size": bytes.len(), "data": data}
                }));
            } else {
                let att_id = format!("att{i}");
                self.attachments
                    .insert((id.to_string(), att_id.clone()), data);
                parts.push(json!({
                    "mimeType": "image/jpeg", "filename": name,
                    "body": {"size": bytes.len(), "attachmentId": att_id}
                }));
            }
        }
        let msg = json!({
            "id": id,
            "payload": {
                "mimeType": "multipart/mixed",
                "filename": "",
                "headers": [
                    {"name": "From", "value": from},
                    {"name": "Subject", "value": subject},
                    {"name": "Date", "value": "Tue, 5 Mar 2024 10:15:00 +0000"}
                ],
                "parts": parts
            }
        });
        self.messages.push(serde_json::from_value(msg).unwrap());
    }
}

impl MailApi for FakeMail {
    fn list_messages(&self, _query: &str) -> Result<Vec<MessageRef>> {
        Ok(self
            .messages
            .iter()
            .map(|m| MessageRef {
                id: m.id.clone(),
                thread_id: None,
            })
            .collect())
    }

    fn get_message(&self, id: &str) -> Result<Message> {
        self.messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| anyhow!("no message {id}"))
    }

    fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<String> {
        self.attachments
            .get(&(message_id.to_string(), attachment_id.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("no attachment {attachment_id}"))
    }

    fn mark_read(&self, id: &str) -> Result<()> {
        self.marked_read.borrow_mut().push(id.to_string());
        Ok(())
    }
}
