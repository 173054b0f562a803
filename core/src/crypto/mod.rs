// Cryptography module — channel keys and message sealing

pub mod keys;
pub mod seal;

pub use keys::ChannelKey;
pub use seal::{
    envelope_nonce, open_content, open_envelope, seal_content, seal_envelope,
    ENVELOPE_NONCE_PREFIX, NONCE_LEN, TAG_LEN,
};
