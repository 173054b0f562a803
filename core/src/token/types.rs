// Token types and the collaborator traits the host provides

use crate::auth::SignerRole;
use crate::crypto::ChannelKey;
use serde::{Deserialize, Serialize};

/// What a token holder may do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// May publish messages to the channel
    pub can_publish: bool,
    /// May authenticate with a device key instead of the user key
    pub can_sign_as_device: bool,
}

impl Capabilities {
    /// A publish-only token
    pub fn publisher() -> Self {
        Self {
            can_publish: true,
            can_sign_as_device: false,
        }
    }

    /// A token bound to a registered device
    pub fn device() -> Self {
        Self {
            can_publish: true,
            can_sign_as_device: true,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::publisher()
    }
}

/// A decoded credential. Read-only once decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Owning user
    pub user_id: String,
    /// Node that issued the token
    pub node_id: Vec<u8>,
    /// Channel the token publishes to
    pub channel: Vec<u8>,
    /// Unix timestamp (seconds) after which the token is void, 0 = never
    pub expires_at: u64,
    /// Granted capabilities
    pub capabilities: Capabilities,
}

impl Token {
    /// Has the token expired at `now` (Unix seconds)?
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at != 0 && now >= self.expires_at
    }
}

/// Turns a token string into a [`Token`]. Signature and format checks on
/// the token itself live here.
#[cfg_attr(test, mockall::automock)]
pub trait TokenDecoder: Send + Sync {
    fn decode(&self, raw: &str) -> anyhow::Result<Token>;
}

/// Authorization policy for decoded tokens (revocation, quotas, ...).
/// Only consulted for tokens that have not expired.
#[cfg_attr(test, mockall::automock)]
pub trait TokenPolicy: Send + Sync {
    fn verify(&self, token: &Token) -> bool;
}

/// Key storage. Keys are only requested for tokens that passed the gate.
#[cfg_attr(test, mockall::automock)]
pub trait KeyDirectory: Send + Sync {
    /// The 64-byte key of the token's channel
    fn channel_key(&self, token: &Token) -> Option<ChannelKey>;

    /// Standard-base64 public key that signs for `role` on behalf of the
    /// token's identity
    fn public_key(&self, role: SignerRole, token: &Token) -> Option<String>;
}
