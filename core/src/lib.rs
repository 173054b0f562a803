// PushGate Core — publish-path crypto for the push relay
//
// Authenticates inbound publish requests, strips transport encryption from
// request bodies, and seals messages for the delivery subsystem. Routing,
// token policy, key storage and delivery live outside this crate.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod message;
pub mod publish;
pub mod request;
pub mod token;

use thiserror::Error;

pub use auth::{verify_signature, PublicKey, SignerRole};
pub use config::GateConfig;
pub use crypto::{ChannelKey, ENVELOPE_NONCE_PREFIX};
pub use message::{Message, MessageContent, Sound};
pub use publish::{Delivery, MonotonicTimestamps, PublishBody, Publisher, TimestampSource};
pub use request::{BodyCodec, BodyDecryptor, DecodedBody, PublishRequest};
pub use token::{Capabilities, KeyDirectory, Token, TokenDecoder, TokenGate, TokenPolicy};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Errors surfaced by the publish path.
///
/// Signature checks never produce one of these: they collapse to a plain
/// `false` so callers cannot tell a bad key from a bad signature.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("Malformed input: {0}")]
    Decode(String),
    #[error("Cipher setup failed: {0}")]
    CryptoSetup(String),
    #[error("Transport decryption rejected the request body")]
    TransportDecrypt,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Missing token")]
    MissingToken,
    #[error("No key registered for this identity")]
    UnknownKey,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Request body too large: {0} bytes (max {1})")]
    BodyTooLarge(usize, usize),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Decryption failed")]
    Decrypt,
}

impl GateError {
    /// Collapse the error into what an HTTP client is allowed to see.
    ///
    /// A missing key and a bad signature look the same from outside.
    pub fn public_view(&self) -> GateError {
        match self {
            GateError::UnknownKey | GateError::Unauthorized => GateError::Unauthorized,
            other => other.clone(),
        }
    }
}

impl From<bincode::Error> for GateError {
    fn from(err: bincode::Error) -> Self {
        GateError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for GateError {
    fn from(err: serde_json::Error) -> Self {
        GateError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_view_hides_missing_keys() {
        assert_eq!(GateError::InvalidToken.public_view(), GateError::InvalidToken);
        assert_eq!(GateError::UnknownKey.public_view(), GateError::Unauthorized);
        assert_eq!(GateError::Decrypt.public_view(), GateError::Decrypt);
    }

    #[test]
    fn test_error_display() {
        let err = GateError::BodyTooLarge(10, 5);
        assert_eq!(err.to_string(), "Request body too large: 10 bytes (max 5)");
    }
}
