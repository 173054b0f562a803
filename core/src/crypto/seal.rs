// Message sealing: AES-256-GCM under a channel key
//
// Two modes share one wire framing:
//
//   [12] nonce
//   [N]  AES-GCM output (ciphertext + 16-byte tag)
//
// Content mode draws the nonce from the OS CSPRNG. Envelope mode derives it
// from a caller-supplied timestamp:
//
//   [4] ENVELOPE_NONCE_PREFIX (format, version, type, length)
//   [8] timestamp, big-endian
//
// Both modes bind the second half of the channel key as associated data.
// The framing does not say which mode produced it; receivers know from the
// message field the bytes arrived in.

use super::keys::ChannelKey;
use crate::{GateError, Result};
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::RngCore;

/// AES-GCM nonce length (96 bits)
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length
pub const TAG_LEN: usize = 16;

/// Leading nonce bytes for envelope sealing: format 0x01, version 0x01,
/// type 0x00, length of the timestamp field (8).
///
/// Random content nonces may collide with this prefix by chance; the prefix
/// marks intent, not a guaranteed-disjoint nonce space.
pub const ENVELOPE_NONCE_PREFIX: [u8; 4] = [0x01, 0x01, 0x00, 0x08];

fn cipher(key: &ChannelKey) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key.cipher_key())
        .map_err(|e| GateError::CryptoSetup(format!("AES-256-GCM key rejected: {}", e)))
}

fn seal_with_nonce(key: &ChannelKey, nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher(key)?;

    let payload = Payload {
        msg: plaintext,
        aad: key.binding(),
    };

    let sealed = cipher
        .encrypt(Nonce::from_slice(nonce), payload)
        .map_err(|_| GateError::CryptoSetup("AES-GCM refused to seal payload".into()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

fn split_frame(framed: &[u8]) -> Result<([u8; NONCE_LEN], &[u8])> {
    if framed.len() < NONCE_LEN + TAG_LEN {
        return Err(GateError::Decode(format!(
            "sealed payload too short: {} bytes (min {})",
            framed.len(),
            NONCE_LEN + TAG_LEN
        )));
    }
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&framed[..NONCE_LEN]);
    Ok((nonce, &framed[NONCE_LEN..]))
}

fn open_with_nonce(key: &ChannelKey, nonce: &[u8; NONCE_LEN], sealed: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher(key)?;

    let payload = Payload {
        msg: sealed,
        aad: key.binding(),
    };

    cipher
        .decrypt(Nonce::from_slice(nonce), payload)
        .map_err(|_| GateError::Decrypt)
}

/// Seal message content under a fresh random nonce.
///
/// Safe to call repeatedly with one key up to the usual random-nonce bound
/// for a 96-bit nonce (about 2^32 messages).
pub fn seal_content(key: &ChannelKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    seal_with_nonce(key, &nonce, plaintext)
}

/// Open the output of [`seal_content`].
pub fn open_content(key: &ChannelKey, framed: &[u8]) -> Result<Vec<u8>> {
    let (nonce, sealed) = split_frame(framed)?;
    open_with_nonce(key, &nonce, sealed)
}

/// The deterministic nonce used by [`seal_envelope`] for `timestamp`.
pub fn envelope_nonce(timestamp: u64) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    nonce[..4].copy_from_slice(&ENVELOPE_NONCE_PREFIX);
    nonce[4..].copy_from_slice(&timestamp.to_be_bytes());
    nonce
}

/// Seal a serialized envelope with a nonce derived from `timestamp`.
///
/// # Nonce reuse
/// The nonce is a pure function of the timestamp. Sealing two different
/// envelopes under the same key and timestamp reuses the nonce, which leaks
/// the XOR of the plaintexts and lets an attacker forge tags. This function
/// does not track timestamps; the caller must never repeat one per key
/// (see `publish::MonotonicTimestamps`).
///
/// There is no random component to fall back on if the caller gets this
/// wrong. Mixing one in would change the wire format, so it is left as a
/// hardening item for a future format version.
pub fn seal_envelope(key: &ChannelKey, timestamp: u64, envelope: &[u8]) -> Result<Vec<u8>> {
    seal_with_nonce(key, &envelope_nonce(timestamp), envelope)
}

/// Open the output of [`seal_envelope`], returning the embedded timestamp
/// along with the envelope bytes.
pub fn open_envelope(key: &ChannelKey, framed: &[u8]) -> Result<(u64, Vec<u8>)> {
    let (nonce, sealed) = split_frame(framed)?;

    if nonce[..4] != ENVELOPE_NONCE_PREFIX {
        return Err(GateError::Decode("envelope nonce prefix mismatch".into()));
    }

    let mut ts_bytes = [0u8; 8];
    ts_bytes.copy_from_slice(&nonce[4..]);
    let timestamp = u64::from_be_bytes(ts_bytes);

    let plaintext = open_with_nonce(key, &nonce, sealed)?;
    Ok((timestamp, plaintext))
}
