// Message types — what the relay hands to delivery

use super::content::MessageContent;
use crate::crypto::{self, ChannelKey};
use crate::request::{file_base_name, sanitize_log};
use crate::token::Token;
use crate::Result;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Notification sound attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sound {
    pub name: String,
}

/// A publish message, built per request from an authorized token.
///
/// `content` and `ciphertext` are never both non-empty: sealing the content
/// clears it, and setting new content drops a stale ciphertext.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Issuing node ID (empty when anonymized)
    from: Vec<u8>,
    /// Channel ID (empty when anonymized)
    channel: Vec<u8>,
    /// Serialized `MessageContent`, plaintext
    content: Vec<u8>,
    /// `seal_content` output for `content`
    ciphertext: Vec<u8>,
    /// Optional notification sound
    sound: Option<Sound>,
    /// Delivery priority (0 = normal)
    priority: i32,
}

impl Message {
    /// Start a message for the token's node and channel
    pub fn new(token: &Token) -> Self {
        Self {
            from: token.node_id.clone(),
            channel: token.channel.clone(),
            ..Default::default()
        }
    }

    /// Drop the identity fields, for anonymized delivery paths
    pub fn disable_token(&mut self) -> &mut Self {
        self.from.clear();
        self.channel.clear();
        self
    }

    /// Set any content kind
    pub fn set_content(&mut self, content: &MessageContent) -> Result<&mut Self> {
        self.content.zeroize();
        self.ciphertext.clear();
        self.content = content.encode()?;
        Ok(self)
    }

    pub fn text_content(&mut self, text: &str) -> Result<&mut Self> {
        self.set_content(&MessageContent::text(text))
    }

    pub fn titled_text_content(&mut self, title: &str, text: &str) -> Result<&mut Self> {
        self.set_content(&MessageContent::Text {
            text: text.to_string(),
            title: Some(title.to_string()).filter(|t| !t.is_empty()),
        })
    }

    pub fn link_content(&mut self, url: &str, title: Option<&str>) -> Result<&mut Self> {
        self.set_content(&MessageContent::Link {
            url: url.to_string(),
            title: title.map(str::to_string),
        })
    }

    /// File metadata; only the base name of `path` is kept
    pub fn file_content(&mut self, path: &str, size: u64) -> Result<&mut Self> {
        self.set_content(&MessageContent::File {
            name: file_base_name(path),
            size,
        })
    }

    pub fn image_content(&mut self, width: u32, height: u32) -> Result<&mut Self> {
        self.set_content(&MessageContent::Image { width, height })
    }

    /// Attach a sound. An empty name leaves the message unchanged.
    pub fn sound_name(&mut self, name: &str) -> &mut Self {
        if !name.is_empty() {
            tracing::debug!(sound = %sanitize_log(name), "Sound attached");
            self.sound = Some(Sound {
                name: name.to_string(),
            });
        }
        self
    }

    pub fn priority(&mut self, priority: i32) -> &mut Self {
        self.priority = priority;
        self
    }

    /// Seal the content under the channel key with a random nonce.
    ///
    /// No-op when there is no content. Afterwards `content` is empty and
    /// `ciphertext` holds `nonce || sealed`.
    pub fn encrypt_content(&mut self, key: &ChannelKey) -> Result<()> {
        if self.content.is_empty() {
            return Ok(());
        }
        self.ciphertext = crypto::seal_content(key, &self.content)?;
        self.content.zeroize();
        Ok(())
    }

    /// Reverse of [`encrypt_content`](Self::encrypt_content), for receivers.
    /// No-op when there is no ciphertext.
    pub fn decrypt_content(&mut self, key: &ChannelKey) -> Result<()> {
        if self.ciphertext.is_empty() {
            return Ok(());
        }
        self.content = crypto::open_content(key, &self.ciphertext)?;
        self.ciphertext.clear();
        Ok(())
    }

    /// Canonical serialized form. Same state, same bytes.
    pub fn marshal(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn unmarshal(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Seal the whole serialized message for delivery.
    ///
    /// `timestamp` must be unique per channel key; see
    /// [`crypto::seal_envelope`].
    pub fn seal(&self, key: &ChannelKey, timestamp: u64) -> Result<Vec<u8>> {
        crypto::seal_envelope(key, timestamp, &self.marshal()?)
    }

    /// Open a sealed envelope, returning its timestamp and the message
    pub fn open(key: &ChannelKey, sealed: &[u8]) -> Result<(u64, Self)> {
        let (timestamp, bytes) = crypto::open_envelope(key, sealed)?;
        Ok((timestamp, Self::unmarshal(&bytes)?))
    }

    /// Decode the plaintext content, if any
    pub fn decode_content(&self) -> Result<Option<MessageContent>> {
        if self.content.is_empty() {
            return Ok(None);
        }
        MessageContent::decode(&self.content).map(Some)
    }

    /// Issuing node ID
    pub fn sender(&self) -> &[u8] {
        &self.from
    }

    pub fn channel(&self) -> &[u8] {
        &self.channel
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn sound(&self) -> Option<&Sound> {
        self.sound.as_ref()
    }

    pub fn priority_level(&self) -> i32 {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Capabilities;
    use crate::GateError;

    fn token() -> Token {
        Token {
            user_id: "user".into(),
            node_id: b"node-1".to_vec(),
            channel: b"chan-1".to_vec(),
            expires_at: 0,
            capabilities: Capabilities::publisher(),
        }
    }

    #[test]
    fn test_new_copies_identity() {
        let msg = Message::new(&token());
        assert_eq!(msg.sender(), b"node-1");
        assert_eq!(msg.channel(), b"chan-1");
        assert!(msg.content().is_empty());
        assert!(msg.ciphertext().is_empty());
    }

    #[test]
    fn test_disable_token() {
        let mut msg = Message::new(&token());
        msg.disable_token();
        assert!(msg.sender().is_empty());
        assert!(msg.channel().is_empty());
    }

    #[test]
    fn test_text_content() {
        let mut msg = Message::new(&token());
        msg.text_content("hello").unwrap();
        assert_eq!(
            msg.decode_content().unwrap(),
            Some(MessageContent::text("hello"))
        );
    }

    #[test]
    fn test_sound_name() {
        let mut msg = Message::new(&token());
        msg.sound_name("");
        assert!(msg.sound().is_none());

        msg.sound_name("bell");
        assert_eq!(msg.sound().unwrap().name, "bell");

        // Empty does not clear an existing sound
        msg.sound_name("");
        assert_eq!(msg.sound().unwrap().name, "bell");
    }

    #[test]
    fn test_file_content_keeps_base_name() {
        let mut msg = Message::new(&token());
        msg.file_content("/var/tmp/report.pdf", 1024).unwrap();
        assert_eq!(
            msg.decode_content().unwrap(),
            Some(MessageContent::File {
                name: "report.pdf".into(),
                size: 1024
            })
        );
    }

    #[test]
    fn test_encrypt_content_moves_to_ciphertext() {
        let key = ChannelKey::generate();
        let mut msg = Message::new(&token());
        msg.text_content("secret").unwrap();
        let plaintext = msg.content().to_vec();

        msg.encrypt_content(&key).unwrap();
        assert!(msg.content().is_empty());
        assert!(!msg.ciphertext().is_empty());

        msg.decrypt_content(&key).unwrap();
        assert_eq!(msg.content(), plaintext.as_slice());
        assert!(msg.ciphertext().is_empty());
    }

    #[test]
    fn test_encrypt_empty_content_is_noop() {
        let key = ChannelKey::generate();
        let mut msg = Message::new(&token());
        msg.encrypt_content(&key).unwrap();
        assert!(msg.content().is_empty());
        assert!(msg.ciphertext().is_empty());
    }

    #[test]
    fn test_new_content_drops_stale_ciphertext() {
        let key = ChannelKey::generate();
        let mut msg = Message::new(&token());
        msg.text_content("first").unwrap();
        msg.encrypt_content(&key).unwrap();

        msg.text_content("second").unwrap();
        assert!(!msg.content().is_empty());
        assert!(msg.ciphertext().is_empty());
    }

    #[test]
    fn test_decrypt_with_wrong_key_leaves_message() {
        let mut msg = Message::new(&token());
        msg.text_content("secret").unwrap();
        msg.encrypt_content(&ChannelKey::generate()).unwrap();
        let sealed = msg.ciphertext().to_vec();

        assert_eq!(
            msg.decrypt_content(&ChannelKey::generate()),
            Err(GateError::Decrypt)
        );
        assert_eq!(msg.ciphertext(), sealed.as_slice());
        assert!(msg.content().is_empty());
    }

    #[test]
    fn test_marshal_is_deterministic() {
        let mut msg = Message::new(&token());
        msg.text_content("hi").unwrap().sound_name("bell").priority(5);

        let a = msg.marshal().unwrap();
        let b = msg.clone().marshal().unwrap();
        assert_eq!(a, b);
        assert_eq!(Message::unmarshal(&a).unwrap(), msg);
    }

    #[test]
    fn test_seal_and_open() {
        let key = ChannelKey::generate();
        let mut msg = Message::new(&token());
        msg.text_content("hi").unwrap();
        msg.encrypt_content(&key).unwrap();

        let sealed = msg.seal(&key, 1_700_000_000_123).unwrap();
        let (ts, opened) = Message::open(&key, &sealed).unwrap();

        assert_eq!(ts, 1_700_000_000_123);
        assert_eq!(opened, msg);
    }
}
