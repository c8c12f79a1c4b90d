use frpc_core::{Codec, CodecError, Fault, Value};
use tracing::trace;

use crate::error::Error;

/// Turns a response body into the call's value or its fault.
#[derive(Debug, Clone, Copy)]
pub struct ResponseDecoder<'a> {
    codec: &'a dyn Codec,
}

impl<'a> ResponseDecoder<'a> {
    pub fn new(codec: &'a dyn Codec) -> Self {
        ResponseDecoder { codec }
    }

    /// The first response param. Server faults become [`Error::Fault`];
    /// any other decoding failure is passed through as [`Error::Codec`].
    pub fn decode(&self, body: &[u8]) -> Result<Value, Error> {
        let params = match self.codec.decode(body) {
            Ok(params) => params,
            Err(CodecError::Fault { code, message }) => {
                return Err(Error::Fault(Fault::new(code, message)))
            }
            Err(other) => return Err(Error::Codec(other)),
        };

        if params.len() > 1 {
            trace!(extra = params.len() - 1, "Ignoring extra response params");
        }
        params
            .into_iter()
            .next()
            .ok_or(Error::Codec(CodecError::EmptyResponse))
    }
}
