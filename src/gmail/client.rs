use anyhow::{Result, anyhow};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::gmail::message::{AttachmentBody, ListResponse, Message, MessageRef};

pub const DEFAULT_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// The slice of the Gmail API the pipeline needs.
pub trait MailApi {
    fn list_messages(&self, query: &str) -> Result<Vec<MessageRef>>;
    fn get_message(&self, id: &str) -> Result<Message>;
    /// Raw base64url `data` of an attachment.
    fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<String>;
    fn mark_read(&self, id: &str) -> Result<()>;
}

pub struct GmailClient {
    http: Client,
    base: String,
    access_token: String,
    max_messages: Option<usize>,
}

impl GmailClient {
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        Self::with_base(DEFAULT_API_BASE, access_token)
    }

    pub fn with_base(base: &str, access_token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("mailface/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            max_messages: None,
        })
    }

    /// Stop listing once this many ids have been collected.
    pub fn max_messages(mut self, max: Option<usize>) -> Self {
        self.max_messages = max;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/users/me/{}", self.base, path)
    }

    fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let resp = req.bearer_auth(&self.access_token).send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(anyhow!("Gmail API returned {status}: {body}"));
        }
        Ok(resp.json()?)
    }
}

impl MailApi for GmailClient {
    fn list_messages(&self, query: &str) -> Result<Vec<MessageRef>> {
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self.http.get(self.url("messages")).query(&[("q", query)]);
            if let Some(t) = &page_token {
                req = req.query(&[("pageToken", t.as_str())]);
            }
            let page: ListResponse = self.send_json(req)?;
            out.extend(page.messages);

            if let Some(max) = self.max_messages
                && out.len() >= max
            {
                out.truncate(max);
                break;
            }
            match page.next_page_token {
                Some(t) if !t.is_empty() => page_token = Some(t),
                _ => break,
            }
        }

        Ok(out)
    }

    fn get_message(&self, id: &str) -> Result<Message> {
        let req = self
            .http
            .get(self.url(&format!("messages/{id}")))
            .query(&[("format", "full")]);
        self.send_json(req)
    }

    fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<String> {
        let req = self.http.get(self.url(&format!(
            "messages/{message_id}/attachments/{attachment_id}"
        )));
        let att: AttachmentBody = self.send_json(req)?;
        Ok(att.data)
    }

    fn mark_read(&self, id: &str) -> Result<()> {
        let req = self
            .http
            .post(self.url(&format!("messages/{id}/modify")))
            .json(&json!({ "removeLabelIds": ["UNREAD"] }));
        let _: serde_json::Value = self.send_json(req)?;
        Ok(())
    }
}
