// Message module — the publish envelope and its content union

pub mod content;
pub mod types;

pub use content::MessageContent;
pub use types::{Message, Sound};
