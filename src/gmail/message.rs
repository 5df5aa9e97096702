use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AttachmentBody {
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBody {
    pub attachment_id: Option<String>,
    pub data: Option<String>,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: PartBody,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl MessagePart {
    pub fn is_image_attachment(&self) -> bool {
        !self.filename.is_empty() && self.mime_type.contains("image")
    }

    fn collect_images<'a>(&'a self, out: &mut Vec<&'a MessagePart>) {
        if self.is_image_attachment() {
            out.push(self);
        }
        for p in &self.parts {
            p.collect_images(out);
        }
    }
}

/// A `users.messages.get` resource (format=full).
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub payload: MessagePart,
}

impl Message {
    /// First header with exactly this name, or "" when absent.
    pub fn header(&self, name: &str) -> &str {
        self.payload
            .headers
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
            .unwrap_or("")
    }

    pub fn subject(&self) -> &str {
        self.header("Subject")
    }

    pub fn sender(&self) -> &str {
        self.header("From")
    }

    pub fn date(&self) -> &str {
        self.header("Date")
    }

    /// Image attachments anywhere in the MIME tree, in document order.
    pub fn image_parts(&self) -> Vec<&MessagePart> {
        let mut out = Vec::new();
        self.payload.collect_images(&mut out);
        out
    }
}
