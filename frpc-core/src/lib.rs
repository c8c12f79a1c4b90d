pub mod codec;
pub mod error;
pub mod fault;
pub mod value;

pub use codec::{binary_available, Codec, XmlDialect, XmlRpcCodec, CONTENT_TYPE_FRPC, CONTENT_TYPE_XML, MAX_DEPTH};
#[cfg(feature = "binary")]
pub use codec::FastRpcCodec;
pub use error::CodecError;
pub use fault::Fault;
pub use value::Value;

// Re-exported so callers can build struct and datetime values without
// depending on the exact versions themselves
pub use chrono;
pub use indexmap::IndexMap;
