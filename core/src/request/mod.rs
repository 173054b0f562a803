// Request module — inbound publish request parts and body handling

pub mod body;
pub mod fields;

pub use body::{BodyCodec, BodyDecryptor, DecodedBody, PublishRequest};
pub use fields::{deserialize_priority, file_base_name, parse_priority, sanitize_log, JsonFlag};
