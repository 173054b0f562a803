//! Publish pipeline — from raw request to sealed delivery payload
//!
//! Order of checks:
//! 1. Body decode (transport decryption, raw bytes retained)
//! 2. Token resolve, decode and policy check
//! 3. Signature over the raw body, when required or supplied
//! 4. Channel key release
//! 5. Body parse, message build, content sealing, envelope sealing
//!
//! Nothing is parsed before step 1 succeeds, and no channel key leaves the
//! directory before step 3 succeeds.

use crate::auth::{RequestAuthenticator, SignerRole};
use crate::config::GateConfig;
use crate::message::Message;
use crate::request::{deserialize_priority, BodyCodec, BodyDecryptor, JsonFlag, PublishRequest};
use crate::token::{KeyDirectory, TokenDecoder, TokenGate, TokenPolicy};
use crate::{GateError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies envelope-sealing timestamps.
///
/// Implementations must never hand out the same value twice for one
/// channel key, since the envelope nonce is derived from it.
pub trait TimestampSource: Send + Sync {
    fn next_timestamp(&self, channel: &[u8]) -> u64;
}

/// Strictly increasing microsecond timestamps for this process.
///
/// Follows the wall clock while it moves forward; on a tie or a clock step
/// backwards it hands out `last + 1`. Uniqueness holds across all channels,
/// which is stronger than the per-key requirement. It does not survive a
/// restart; a host that restarts faster than its clock advances needs a
/// persisted counter instead.
#[derive(Debug, Default)]
pub struct MonotonicTimestamps {
    last: AtomicU64,
}

impl MonotonicTimestamps {
    pub fn new() -> Self {
        Self::default()
    }

    fn now_micros() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as u64
    }
}

impl TimestampSource for MonotonicTimestamps {
    fn next_timestamp(&self, _channel: &[u8]) -> u64 {
        let now = Self::now_micros();
        let mut prev = self.last.load(Ordering::Acquire);
        loop {
            let next = now.max(prev.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// JSON body of a publish request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishBody {
    pub text: String,
    pub title: String,
    pub link: String,
    pub sound: JsonFlag,
    #[serde(deserialize_with = "deserialize_priority")]
    pub priority: i32,
}

impl PublishBody {
    /// Copy the body's fields onto `message`. A link takes precedence over
    /// text; a body with neither is rejected.
    pub fn apply(&self, message: &mut Message) -> Result<()> {
        if !self.link.is_empty() {
            let title = Some(self.title.as_str()).filter(|t| !t.is_empty());
            message.link_content(&self.link, title)?;
        } else if !self.text.is_empty() {
            message.titled_text_content(&self.title, &self.text)?;
        } else {
            return Err(GateError::Decode("publish body has no text or link".into()));
        }

        if self.sound.is_set() {
            message.sound_name(self.sound.as_str());
        }
        message.priority(self.priority);
        Ok(())
    }
}

/// What the publish path hands to delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Channel the message belongs to
    pub channel: Vec<u8>,
    /// Message with sealed content
    pub message: Message,
    /// Timestamp the envelope nonce was derived from
    pub timestamp: u64,
    /// `seal_envelope` output over the marshalled message
    pub sealed: Vec<u8>,
}

pub struct Publisher {
    config: GateConfig,
    codec: BodyCodec,
    gate: TokenGate,
    clock: Arc<dyn TimestampSource>,
}

impl Publisher {
    pub fn new(
        config: GateConfig,
        decryptor: Arc<dyn BodyDecryptor>,
        decoder: Arc<dyn TokenDecoder>,
        policy: Arc<dyn TokenPolicy>,
        keys: Arc<dyn KeyDirectory>,
        clock: Arc<dyn TimestampSource>,
    ) -> Self {
        let codec = BodyCodec::new(&config, decryptor);
        let gate = TokenGate::new(&config, decoder, policy, keys);
        Self {
            config,
            codec,
            gate,
            clock,
        }
    }

    /// Run a publish request through the full pipeline.
    ///
    /// `role` is the signer the route expects. The signature is checked when
    /// `require_signature` is set or when the role's header is present; a
    /// present but invalid signature always rejects.
    pub fn publish(&self, request: &PublishRequest, role: SignerRole) -> Result<Delivery> {
        let body = self.codec.decode_request(request)?;
        let token = self.gate.authorize(request)?;

        if !token.capabilities.can_publish {
            tracing::warn!(user = %token.user_id, "Token lacks publish capability");
            return Err(GateError::Unauthorized);
        }

        let signed = request.header(role.header_name(&self.config)).is_some();
        if self.config.require_signature || signed {
            if role == SignerRole::Device && !token.capabilities.can_sign_as_device {
                tracing::warn!(user = %token.user_id, "Token may not sign as device");
                return Err(GateError::Unauthorized);
            }
            let public_key = self.gate.public_key(role, &token)?;
            let authenticator = RequestAuthenticator::new(&self.config);
            if !authenticator.verify(role, request, &body, &public_key) {
                tracing::warn!(user = %token.user_id, %role, "Request signature rejected");
                return Err(GateError::Unauthorized);
            }
        }

        let key = self.gate.channel_key(&token)?;

        let params: PublishBody = body.json()?;
        let mut message = Message::new(&token);
        params.apply(&mut message)?;
        let kind = message.decode_content()?.map_or("none", |c| c.kind());
        message.encrypt_content(&key)?;

        let timestamp = self.clock.next_timestamp(&token.channel);
        let sealed = message.seal(&key, timestamp)?;

        tracing::debug!(
            user = %token.user_id,
            kind,
            encrypted_body = body.was_encrypted(),
            bytes = sealed.len(),
            "Message sealed for delivery"
        );

        Ok(Delivery {
            channel: token.channel.clone(),
            message,
            timestamp,
            sealed,
        })
    }
}
