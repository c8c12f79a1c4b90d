use thiserror::Error;

/// Errors raised while encoding or decoding an RPC body.
///
/// [`CodecError::Fault`] is special: the body was well formed and the server
/// reported an application error. Everything else means the payload itself
/// could not be produced or understood.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("server fault {code}: {message}")]
    Fault { code: i64, message: String },

    #[error("XML error: {0}")]
    Xml(#[from] xml::reader::Error),

    #[error("invalid XML-RPC document: {0}")]
    InvalidXml(String),

    #[error("unexpected end of data while reading {0}")]
    UnexpectedEof(&'static str),

    #[error("not a FastRPC message (magic {0:02x?})")]
    BadMagic([u8; 2]),

    #[error("unsupported FastRPC protocol version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("unknown FastRPC type code {0}")]
    UnknownType(u8),

    #[error("malformed fault: {0}")]
    MalformedFault(String),

    #[error("unexpected {0} message")]
    UnexpectedMessage(&'static str),

    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    #[error("invalid integer: {0}")]
    InvalidInt(String),

    #[error("invalid double: {0}")]
    InvalidDouble(String),

    #[error("invalid datetime: {0}")]
    InvalidDateTime(String),

    #[error("invalid base64 data: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("method name is {0} bytes long, at most 255 are allowed")]
    MethodNameTooLong(usize),

    #[error("struct member name is {0} bytes long, at most 255 are allowed")]
    MemberNameTooLong(usize),

    #[error("values nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("response contains no value")]
    EmptyResponse,

    #[error("trailing data after message ({0} bytes)")]
    TrailingData(usize),
}

impl CodecError {
    pub fn fault(code: i64, message: impl Into<String>) -> Self {
        CodecError::Fault {
            code,
            message: message.into(),
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, CodecError::Fault { .. })
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
