//! Picks the wire codec and the matching content negotiation headers.

use frpc_core::{Codec, XmlRpcCodec, CONTENT_TYPE_FRPC, CONTENT_TYPE_XML};
use std::sync::Arc;

use crate::error::ConfigError;

/// `Accept` sent whenever the binary protocol is compiled in
pub const ACCEPT_FRPC: &str = "application/x-frpc, text/xml";

/// Builds the FastRPC codec, binary or XML flavoured.
pub type BinaryCodecFactory = fn(bool) -> Arc<dyn Codec>;

/// The codec a proxy uses for its whole lifetime.
#[derive(Debug, Clone)]
pub struct CodecSelection {
    codec: Arc<dyn Codec>,
    content_type: &'static str,
    accept: &'static str,
}

impl CodecSelection {
    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn accept(&self) -> &'static str {
        self.accept
    }

    pub fn into_codec(self) -> Arc<dyn Codec> {
        self.codec
    }
}

/// Select the codec for this build.
pub fn select_codec(use_binary: bool) -> Result<CodecSelection, ConfigError> {
    select_with(use_binary, binary_codec_factory())
}

/// Select the codec, with `binary` standing in for the compiled-in binary
/// support (`None` when it is unavailable).
pub fn select_with(
    use_binary: bool,
    binary: Option<BinaryCodecFactory>,
) -> Result<CodecSelection, ConfigError> {
    match binary {
        Some(factory) => Ok(CodecSelection {
            codec: factory(use_binary),
            content_type: if use_binary {
                CONTENT_TYPE_FRPC
            } else {
                CONTENT_TYPE_XML
            },
            accept: ACCEPT_FRPC,
        }),
        None if use_binary => Err(ConfigError::BinaryNotSupported),
        None => Ok(CodecSelection {
            codec: Arc::new(XmlRpcCodec),
            content_type: CONTENT_TYPE_XML,
            accept: CONTENT_TYPE_XML,
        }),
    }
}

#[cfg(feature = "binary")]
fn fastrpc_codec(binary: bool) -> Arc<dyn Codec> {
    Arc::new(frpc_core::FastRpcCodec::new(binary))
}

pub fn binary_codec_factory() -> Option<BinaryCodecFactory> {
    #[cfg(feature = "binary")]
    {
        Some(fastrpc_codec)
    }
    #[cfg(not(feature = "binary"))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(feature = "binary")]
    use frpc_core::Value;

    #[test]
    fn test_plain_xml_without_binary() {
        let selection = select_with(false, None).unwrap();
        assert_eq!(selection.codec().name(), "xml-rpc");
        assert_eq!(selection.content_type(), "text/xml");
        assert_eq!(selection.accept(), "text/xml");
    }

    #[test]
    fn test_binary_requested_but_unavailable() {
        let err = select_with(true, None).unwrap_err();
        assert!(matches!(err, ConfigError::BinaryNotSupported));
        assert_eq!(err.to_string(), "FastRPC is not supported");
    }

    #[cfg(feature = "binary")]
    #[test]
    fn test_fastrpc_xml_dialect() {
        let selection = select_codec(false).unwrap();
        assert_eq!(selection.content_type(), "text/xml");
        assert_eq!(selection.accept(), "application/x-frpc, text/xml");

        let body = selection.codec().encode("foo", &[Value::from(1)]).unwrap();
        assert!(body.starts_with(b"<?xml version=\"1.0\"?>\n<!--protocolVersion=\"2.1\"-->\n"));
    }

    #[cfg(feature = "binary")]
    #[test]
    fn test_fastrpc_binary() {
        let selection = select_codec(true).unwrap();
        assert_eq!(selection.content_type(), "application/x-frpc");
        assert_eq!(selection.accept(), "application/x-frpc, text/xml");

        let body = selection
            .codec()
            .encode("foo", &[Value::from(1), Value::from("abc")])
            .unwrap();
        assert_eq!(&body[..], b"\xca\x11\x02\x01h\x03foo8\x01 \x03abc");
    }

    #[cfg(not(feature = "binary"))]
    #[test]
    fn test_build_without_binary() {
        assert!(binary_codec_factory().is_none());
        assert!(matches!(select_codec(true), Err(ConfigError::BinaryNotSupported)));
        assert_eq!(select_codec(false).unwrap().accept(), "text/xml");
    }
}
