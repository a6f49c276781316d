//! Report attachments

use serde::Serialize;

use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Png,
    Html,
    Text,
    Json,
}

impl MediaKind {
    pub fn mime(&self) -> &'static str {
        match self {
            MediaKind::Png => "image/png",
            MediaKind::Html => "text/html",
            MediaKind::Text => "text/plain",
            MediaKind::Json => "application/json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Png => "png",
            MediaKind::Html => "html",
            MediaKind::Text => "txt",
            MediaKind::Json => "json",
        }
    }
}

/// Named content attached to the current report case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub content: Vec<u8>,
    pub media_kind: MediaKind,
}

impl Attachment {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>, media_kind: MediaKind) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            media_kind,
        }
    }

    pub fn text(name: impl Into<String>, text: &str) -> Self {
        Self::new(name, text.as_bytes(), MediaKind::Text)
    }

    pub fn html(name: impl Into<String>, html: &str) -> Self {
        Self::new(name, html.as_bytes(), MediaKind::Html)
    }

    pub fn png(name: impl Into<String>, png: Vec<u8>) -> Self {
        Self::new(name, png, MediaKind::Png)
    }

    /// Pretty-printed JSON of any serialisable value
    pub fn json<T: Serialize + ?Sized>(name: impl Into<String>, value: &T) -> Result<Self> {
        let content = serde_json::to_vec_pretty(value)?;
        Ok(Self::new(name, content, MediaKind::Json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_attachment_is_pretty() {
        let attachment = Attachment::json("body", &json!({"code": 0})).unwrap();
        assert_eq!(attachment.media_kind.mime(), "application/json");
        assert!(String::from_utf8(attachment.content).unwrap().contains("\n"));
    }

    #[test]
    fn test_extensions() {
        assert_eq!(MediaKind::Png.extension(), "png");
        assert_eq!(MediaKind::Text.extension(), "txt");
    }
}
