// Signature verification
//
// A public key arrives as standard base64. Its length picks the algorithm:
//
//   32 bytes      Ed25519 (strict verification)
//   33/65 bytes   SEC1 P-256 point, ECDSA over SHA-256
//
// Every failure path returns `false`. Callers learn that a request is not
// authentic, never why.

use crate::config::GateConfig;
use crate::request::{DecodedBody, PublishRequest};
use crate::{GateError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::fmt;

/// Who signed the request body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignerRole {
    /// The owning user's identity key
    User,
    /// A registered device key
    Device,
}

impl SignerRole {
    /// Header carrying this role's signature
    pub fn header_name<'a>(&self, config: &'a GateConfig) -> &'a str {
        match self {
            SignerRole::User => &config.user_signature_header,
            SignerRole::Device => &config.device_signature_header,
        }
    }
}

impl fmt::Display for SignerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignerRole::User => f.write_str("user"),
            SignerRole::Device => f.write_str("device"),
        }
    }
}

/// A loaded verification key.
pub trait PublicKey: Send + Sync {
    /// Short algorithm label, for logs
    fn algorithm(&self) -> &'static str;

    /// Check `signature` over `data`. Malformed signatures verify as false.
    fn verify(&self, data: &[u8], signature: &[u8]) -> bool;
}

/// Ed25519 verification key
pub struct Ed25519PublicKey(ed25519_dalek::VerifyingKey);

impl PublicKey for Ed25519PublicKey {
    fn algorithm(&self) -> &'static str {
        "ed25519"
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        let Ok(sig) = ed25519_dalek::Signature::from_slice(signature) else {
            return false;
        };
        self.0.verify_strict(data, &sig).is_ok()
    }
}

/// NIST P-256 ECDSA verification key, as held by device secure hardware
pub struct P256PublicKey(p256::ecdsa::VerifyingKey);

impl PublicKey for P256PublicKey {
    fn algorithm(&self) -> &'static str {
        "p256"
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        use p256::ecdsa::signature::Verifier;

        // Fixed-width r||s, otherwise DER
        let sig = if signature.len() == 64 {
            p256::ecdsa::Signature::from_slice(signature)
        } else {
            p256::ecdsa::Signature::from_der(signature)
        };
        match sig {
            Ok(sig) => self.0.verify(data, &sig).is_ok(),
            Err(_) => false,
        }
    }
}

/// Load raw public key bytes, selecting the algorithm from their format.
pub fn load_public_key(bytes: &[u8]) -> Result<Box<dyn PublicKey>> {
    match bytes.len() {
        32 => {
            let array: [u8; 32] = bytes
                .try_into()
                .map_err(|_| GateError::Decode("invalid Ed25519 key".into()))?;
            let key = ed25519_dalek::VerifyingKey::from_bytes(&array)
                .map_err(|_| GateError::Decode("invalid Ed25519 key".into()))?;
            Ok(Box::new(Ed25519PublicKey(key)))
        }
        33 | 65 => {
            let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
                .map_err(|_| GateError::Decode("invalid P-256 key".into()))?;
            Ok(Box::new(P256PublicKey(key)))
        }
        other => Err(GateError::Decode(format!(
            "unsupported public key length: {}",
            other
        ))),
    }
}

/// Verify a base64 detached signature over `raw_body`.
///
/// `raw_body` must be the bytes exactly as received on the wire, before any
/// transport decryption. The signature covers what was transmitted, so a
/// party able to decrypt the body still cannot re-sign altered content.
pub fn verify_signature(
    role: SignerRole,
    signature_b64: &str,
    raw_body: &[u8],
    public_key_b64: &str,
) -> bool {
    let Ok(key_bytes) = BASE64.decode(public_key_b64) else {
        tracing::debug!(%role, "signature check failed");
        return false;
    };
    let Ok(signature) = BASE64.decode(signature_b64) else {
        tracing::debug!(%role, "signature check failed");
        return false;
    };
    let Ok(key) = load_public_key(&key_bytes) else {
        tracing::debug!(%role, "signature check failed");
        return false;
    };

    let valid = key.verify(raw_body, &signature);
    if !valid {
        tracing::debug!(%role, "signature check failed");
    }
    valid
}

/// Checks the role-specific signature header of a publish request.
pub struct RequestAuthenticator<'a> {
    config: &'a GateConfig,
}

impl<'a> RequestAuthenticator<'a> {
    pub fn new(config: &'a GateConfig) -> Self {
        Self { config }
    }

    /// Verify `role`'s signature header against the body's raw wire bytes.
    /// A missing header fails closed.
    pub fn verify(
        &self,
        role: SignerRole,
        request: &PublishRequest,
        body: &DecodedBody,
        public_key_b64: &str,
    ) -> bool {
        let Some(signature) = request.header(role.header_name(self.config)) else {
            tracing::debug!(%role, "signature header missing");
            return false;
        };
        verify_signature(role, signature, body.raw(), public_key_b64)
    }
}
