// Channel key material

use crate::{GateError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Secret material for one notification channel.
///
/// Layout (64 bytes):
/// [32] AES-256 key
/// [32] binding material, fed to AES-GCM as associated data
///
/// The binding half is not secret to whoever verifies a sealed message, but
/// it must match byte for byte or opening fails.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ChannelKey([u8; ChannelKey::LEN]);

impl ChannelKey {
    /// Total key length in bytes
    pub const LEN: usize = 64;

    /// Length of the AES-256 half
    pub const CIPHER_KEY_LEN: usize = 32;

    /// Generate a fresh random channel key
    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        let key = Self(bytes);
        bytes.zeroize();
        key
    }

    /// Wrap raw key bytes.
    ///
    /// Anything other than exactly 64 bytes cannot back a cipher, so this
    /// fails with `CryptoSetup` rather than padding or truncating.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; Self::LEN] = bytes.try_into().map_err(|_| {
            GateError::CryptoSetup(format!(
                "channel key must be {} bytes, got {}",
                Self::LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    /// Decode a standard-base64 channel key
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            BASE64
                .decode(encoded.trim())
                .map_err(|_| GateError::Decode("channel key is not valid base64".into()))?,
        );
        Self::from_slice(&bytes)
    }

    /// Encode as standard base64. The returned string wipes itself on drop.
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(BASE64.encode(self.0))
    }

    /// The AES-256 key half (bytes 0..32)
    pub fn cipher_key(&self) -> &[u8] {
        &self.0[..Self::CIPHER_KEY_LEN]
    }

    /// The associated-data half (bytes 32..64)
    pub fn binding(&self) -> &[u8] {
        &self.0[Self::CIPHER_KEY_LEN..]
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl fmt::Debug for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChannelKey(<redacted>)")
    }
}

impl PartialEq for ChannelKey {
    fn eq(&self, other: &Self) -> bool {
        // Non-short-circuiting compare
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Eq for ChannelKey {}
