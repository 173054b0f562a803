// Token gate — finds the token in a request and checks it before any key
// material is handed out

use super::types::{KeyDirectory, Token, TokenDecoder, TokenPolicy};
use crate::auth::SignerRole;
use crate::config::GateConfig;
use crate::crypto::ChannelKey;
use crate::request::PublishRequest;
use crate::{GateError, Result};
use std::ops::Deref;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Short, log-safe identifier for a raw token string.
pub fn token_fingerprint(raw: &str) -> String {
    let hash = blake3::hash(raw.as_bytes());
    hex::encode(&hash.as_bytes()[..4])
}

/// A token that decoded and passed policy.
///
/// Only [`TokenGate::authorize`] constructs one, and key lookups require
/// one, so keys cannot be fetched for an unchecked token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedToken(Token);

impl Deref for AuthorizedToken {
    type Target = Token;

    fn deref(&self) -> &Token {
        &self.0
    }
}

pub struct TokenGate {
    header: String,
    query: String,
    decoder: Arc<dyn TokenDecoder>,
    policy: Arc<dyn TokenPolicy>,
    keys: Arc<dyn KeyDirectory>,
    clock: fn() -> u64,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl TokenGate {
    pub fn new(
        config: &GateConfig,
        decoder: Arc<dyn TokenDecoder>,
        policy: Arc<dyn TokenPolicy>,
        keys: Arc<dyn KeyDirectory>,
    ) -> Self {
        Self {
            header: config.token_header.clone(),
            query: config.token_query.clone(),
            decoder,
            policy,
            keys,
            clock: unix_now,
        }
    }

    /// Replace the wall clock used for expiry checks (Unix seconds)
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    /// Find the token string: header first, then query parameter, then the
    /// path segment with one leading `/` removed. Empty values count as
    /// absent.
    pub fn resolve<'r>(&self, request: &'r PublishRequest) -> Option<&'r str> {
        if let Some(token) = request.header(&self.header).filter(|t| !t.is_empty()) {
            return Some(token);
        }
        if let Some(token) = request.query(&self.query).filter(|t| !t.is_empty()) {
            return Some(token);
        }
        request
            .path_token()
            .map(|t| t.strip_prefix('/').unwrap_or(t))
            .filter(|t| !t.is_empty())
    }

    /// Decode, expiry-check and policy-check a raw token string.
    ///
    /// Decode failures, expired tokens and policy rejections all come back
    /// as `InvalidToken`; only the log line tells them apart. Expired tokens
    /// never reach the policy.
    pub fn check(&self, raw: &str) -> Result<AuthorizedToken> {
        let token = self.decoder.decode(raw).map_err(|e| {
            tracing::warn!(token = %token_fingerprint(raw), "Token decode failed: {}", e);
            GateError::InvalidToken
        })?;

        if token.is_expired_at((self.clock)()) {
            tracing::warn!(token = %token_fingerprint(raw), "Token expired");
            return Err(GateError::InvalidToken);
        }

        if !self.policy.verify(&token) {
            tracing::warn!(token = %token_fingerprint(raw), "Token rejected by policy");
            return Err(GateError::InvalidToken);
        }

        tracing::debug!(token = %token_fingerprint(raw), user = %token.user_id, "Token accepted");
        Ok(AuthorizedToken(token))
    }

    /// Resolve the request's token and check it
    pub fn authorize(&self, request: &PublishRequest) -> Result<AuthorizedToken> {
        let raw = self.resolve(request).ok_or(GateError::MissingToken)?;
        self.check(raw)
    }

    /// Release the channel key for an authorized token
    pub fn channel_key(&self, token: &AuthorizedToken) -> Result<ChannelKey> {
        self.keys.channel_key(token).ok_or_else(|| {
            tracing::warn!(user = %token.user_id, "No channel key registered");
            GateError::UnknownKey
        })
    }

    /// Look up the public key that signs for `role` on the token's behalf
    pub fn public_key(&self, role: SignerRole, token: &AuthorizedToken) -> Result<String> {
        self.keys.public_key(role, token).ok_or_else(|| {
            tracing::warn!(user = %token.user_id, %role, "No public key registered");
            GateError::UnknownKey
        })
    }
}
