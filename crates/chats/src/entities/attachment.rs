use serde::{Deserialize, Serialize};

/// A file attached to a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Server identifier of the upload
    pub id: String,
    /// Original filename
    pub file_name: String,
    /// URL to access the file
    pub url: String,
    /// MIME type, when the server reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// File size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// Attachment kind derived from the MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Document,
    Audio,
    Video,
    File,
}

impl From<&str> for AttachmentKind {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            s if s.starts_with("image/") => AttachmentKind::Image,
            s if s.starts_with("audio/") => AttachmentKind::Audio,
            s if s.starts_with("video/") => AttachmentKind::Video,
            s if s.contains("pdf") || s.contains("doc") || s.contains("text") => AttachmentKind::Document,
            _ => AttachmentKind::File,
        }
    }
}

impl Attachment {
    /// Classify the attachment; unknown MIME types count as plain files
    pub fn kind(&self) -> AttachmentKind {
        self.content_type
            .as_deref()
            .map(AttachmentKind::from)
            .unwrap_or(AttachmentKind::File)
    }

    /// Check if the attachment is an image
    pub fn is_image(&self) -> bool {
        self.kind() == AttachmentKind::Image
    }
}
