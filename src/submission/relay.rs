//! The form-relay boundary: a single multipart POST.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use thiserror::Error;

pub const ATTACHMENT_FIELD: &str = "agreement_pdf";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("relay request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("relay rejected the submission with status {0}")]
    Rejected(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayAttachment {
    pub field: String,
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl RelayAttachment {
    pub fn pdf(filename: &str, bytes: Vec<u8>) -> Self {
        Self {
            field: ATTACHMENT_FIELD.to_string(),
            filename: filename.to_string(),
            content_type: PDF_CONTENT_TYPE.to_string(),
            bytes,
        }
    }
}

/// Text fields in form order, then the generated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPayload {
    pub fields: Vec<(String, String)>,
    pub attachment: RelayAttachment,
}

impl RelayPayload {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// The relay counts a submission as delivered on any 2xx, and on status 0, which
/// some relays report for opaque cross-origin responses.
pub fn is_accepted_status(status: u16) -> bool {
    status == 0 || (200..300).contains(&status)
}

#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// POST the payload and return the response status.
    async fn post(&self, payload: RelayPayload) -> Result<u16, TransportError>;
}

pub struct HttpRelay {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRelay {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    fn form(payload: RelayPayload) -> Result<Form, TransportError> {
        let mut form = Form::new();
        for (name, value) in payload.fields {
            form = form.text(name, value);
        }
        let attachment = payload.attachment;
        let part = Part::bytes(attachment.bytes)
            .file_name(attachment.filename)
            .mime_str(&attachment.content_type)?;
        Ok(form.part(attachment.field, part))
    }
}

#[async_trait]
impl RelayTransport for HttpRelay {
    async fn post(&self, payload: RelayPayload) -> Result<u16, TransportError> {
        let form = Self::form(payload)?;
        log::info!("Posting agreement to {}", self.endpoint);
        let response = self.client.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status().as_u16();
        log::info!("Relay responded with status {}", status);
        Ok(status)
    }
}
