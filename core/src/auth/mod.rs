// Request authentication — detached signatures over raw request bodies

pub mod verify;

pub use verify::{
    load_public_key, verify_signature, Ed25519PublicKey, P256PublicKey, PublicKey,
    RequestAuthenticator, SignerRole,
};
