// Message content — the union serialized into `Message::content`

use crate::Result;
use serde::{Deserialize, Serialize};

/// Payload kinds a message can carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageContent {
    /// Plain text, optionally titled
    Text { text: String, title: Option<String> },
    /// A link the client opens on tap
    Link { url: String, title: Option<String> },
    /// File attachment metadata; the file body travels separately
    File { name: String, size: u64 },
    /// Image thumbnail dimensions, as reported by the host's image decoder
    Image { width: u32, height: u32 },
}

impl MessageContent {
    pub fn text(text: &str) -> Self {
        MessageContent::Text {
            text: text.to_string(),
            title: None,
        }
    }

    /// Short kind label, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            MessageContent::Text { .. } => "text",
            MessageContent::Link { .. } => "link",
            MessageContent::File { .. } => "file",
            MessageContent::Image { .. } => "image",
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GateError;

    #[test]
    fn test_kinds() {
        assert_eq!(MessageContent::text("x").kind(), "text");
        assert_eq!(
            MessageContent::Image {
                width: 1,
                height: 2
            }
            .kind(),
            "image"
        );
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let content = MessageContent::Link {
            url: "https://example.com".into(),
            title: Some("Example".into()),
        };
        assert_eq!(content.encode().unwrap(), content.encode().unwrap());
        assert_eq!(MessageContent::decode(&content.encode().unwrap()).unwrap(), content);
    }

    #[test]
    fn test_garbage_does_not_decode() {
        let result = MessageContent::decode(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(result, Err(GateError::Serialization(_))));
    }
}
