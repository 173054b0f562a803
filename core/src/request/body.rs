// Request bodies — transport decryption with the wire bytes kept intact

use crate::config::GateConfig;
use crate::{GateError, Result};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

/// The parts of an inbound publish request this crate looks at.
///
/// Routing has already happened by the time one of these is built. Header
/// names are matched case-insensitively; query names are not.
#[derive(Debug, Clone, Default)]
pub struct PublishRequest {
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
    path_token: Option<String>,
    content_type: String,
    body: Vec<u8>,
}

impl PublishRequest {
    pub fn new(content_type: &str, body: Vec<u8>) -> Self {
        Self {
            content_type: content_type.to_string(),
            body,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query.insert(name.to_string(), value.to_string());
        self
    }

    /// The raw `token` path segment, leading separator included if the
    /// router leaves one.
    pub fn with_path_token(mut self, segment: &str) -> Self {
        self.path_token = Some(segment.to_string());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn path_token(&self) -> Option<&str> {
        self.path_token.as_deref()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Body bytes exactly as received
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// A request body after transport decoding.
///
/// `raw()` always returns the wire bytes, which are what signatures cover.
/// `canonical()` returns what should be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBody {
    raw: Vec<u8>,
    decrypted: Option<Vec<u8>>,
}

impl DecodedBody {
    /// A body that was not transport-encrypted
    pub fn plain(raw: Vec<u8>) -> Self {
        Self {
            raw,
            decrypted: None,
        }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn canonical(&self) -> &[u8] {
        self.decrypted.as_deref().unwrap_or(&self.raw)
    }

    pub fn was_encrypted(&self) -> bool {
        self.decrypted.is_some()
    }

    /// Parse the canonical bytes as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(self.canonical())?)
    }
}

/// Transport decrypt capability for marked bodies. Provided by the host.
#[cfg_attr(test, mockall::automock)]
pub trait BodyDecryptor: Send + Sync {
    fn decrypt(&self, body: &[u8]) -> anyhow::Result<Vec<u8>>;
}

/// Strips transport encryption from request bodies.
#[derive(Clone)]
pub struct BodyCodec {
    marker: String,
    max_body_size: usize,
    decryptor: Arc<dyn BodyDecryptor>,
}

impl BodyCodec {
    pub fn new(config: &GateConfig, decryptor: Arc<dyn BodyDecryptor>) -> Self {
        Self {
            marker: config.encrypted_marker.to_ascii_lowercase(),
            max_body_size: config.max_body_size,
            decryptor,
        }
    }

    /// Does this content type mark a transport-encrypted body?
    pub fn is_encrypted(&self, content_type: &str) -> bool {
        content_type
            .trim_start()
            .to_ascii_lowercase()
            .starts_with(&self.marker)
    }

    /// Decode `raw` according to `content_type`.
    ///
    /// Unmarked bodies pass through untouched. Marked bodies go through the
    /// decrypt capability; if it refuses, the request stops here, before
    /// anything tries to parse the body.
    pub fn decode(&self, content_type: &str, raw: Vec<u8>) -> Result<DecodedBody> {
        if raw.len() > self.max_body_size {
            return Err(GateError::BodyTooLarge(raw.len(), self.max_body_size));
        }

        if !self.is_encrypted(content_type) {
            return Ok(DecodedBody::plain(raw));
        }

        let decrypted = self.decryptor.decrypt(&raw).map_err(|e| {
            tracing::warn!("Transport decryption failed: {}", e);
            GateError::TransportDecrypt
        })?;

        Ok(DecodedBody {
            raw,
            decrypted: Some(decrypted),
        })
    }

    /// Decode the body of `request`
    pub fn decode_request(&self, request: &PublishRequest) -> Result<DecodedBody> {
        self.decode(request.content_type(), request.body().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        text: String,
    }

    fn codec_with(mock: MockBodyDecryptor) -> BodyCodec {
        BodyCodec::new(&GateConfig::default(), Arc::new(mock))
    }

    #[test]
    fn test_unmarked_body_passes_through() {
        let mut mock = MockBodyDecryptor::new();
        mock.expect_decrypt().never();
        let codec = codec_with(mock);

        for content_type in ["application/json", "text/plain", "", "application/x-chsec"] {
            let body = codec.decode(content_type, b"raw bytes".to_vec()).unwrap();
            assert_eq!(body.canonical(), b"raw bytes");
            assert_eq!(body.raw(), b"raw bytes");
            assert!(!body.was_encrypted());
        }
    }

    #[test]
    fn test_marked_body_is_decrypted_and_raw_kept() {
        let mut mock = MockBodyDecryptor::new();
        mock.expect_decrypt()
            .withf(|body| body.to_vec() == b"ciphertext".to_vec())
            .times(1)
            .returning(|_| Ok(br#"{"text":"hello"}"#.to_vec()));
        let codec = codec_with(mock);

        let body = codec
            .decode("application/x-chsec-json; charset=utf-8", b"ciphertext".to_vec())
            .unwrap();

        assert!(body.was_encrypted());
        assert_eq!(body.raw(), b"ciphertext");
        let parsed: Payload = body.json().unwrap();
        assert_eq!(parsed.text, "hello");
    }

    #[test]
    fn test_marker_is_case_insensitive() {
        let codec = codec_with(MockBodyDecryptor::new());
        assert!(codec.is_encrypted("Application/X-CHSEC-JSON"));
        assert!(!codec.is_encrypted("application/json"));
    }

    #[test]
    fn test_rejected_decrypt_aborts() {
        let mut mock = MockBodyDecryptor::new();
        mock.expect_decrypt()
            .returning(|_| Err(anyhow::anyhow!("bad transport key")));
        let codec = codec_with(mock);

        let result = codec.decode("application/x-chsec-json", b"garbage".to_vec());
        assert_eq!(result, Err(GateError::TransportDecrypt));
    }

    #[test]
    fn test_oversized_body_rejected_before_decrypt() {
        let mut mock = MockBodyDecryptor::new();
        mock.expect_decrypt().never();
        let config = GateConfig {
            max_body_size: 8,
            ..GateConfig::default()
        };
        let codec = BodyCodec::new(&config, Arc::new(mock));

        let result = codec.decode("application/x-chsec-json", vec![0u8; 9]);
        assert_eq!(result, Err(GateError::BodyTooLarge(9, 8)));
    }

    #[test]
    fn test_invalid_json_is_serialization_error() {
        let body = DecodedBody::plain(b"not json".to_vec());
        let result: Result<Payload> = body.json();
        assert!(matches!(result, Err(GateError::Serialization(_))));
    }

    #[test]
    fn test_request_headers_case_insensitive() {
        let request = PublishRequest::new("application/json", Vec::new())
            .with_header("CHUserSign", "abc")
            .with_query("token", "q");

        assert_eq!(request.header("chusersign"), Some("abc"));
        assert_eq!(request.header("CHUSERSIGN"), Some("abc"));
        assert_eq!(request.query("token"), Some("q"));
        assert_eq!(request.query("TOKEN"), None);
    }
}
