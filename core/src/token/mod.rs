// Token module — identity credentials and the gate that checks them

pub mod gate;
pub mod types;

pub use gate::{token_fingerprint, AuthorizedToken, TokenGate};
pub use types::{Capabilities, KeyDirectory, Token, TokenDecoder, TokenPolicy};

#[cfg(test)]
pub use types::{MockKeyDirectory, MockTokenDecoder, MockTokenPolicy};
