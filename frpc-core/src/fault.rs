use serde::{Deserialize, Serialize};
use std::fmt;

/// Application-level error reported by the remote server.
///
/// Both wire formats carry faults as a numeric code plus a message; codecs
/// report them as [`CodecError::Fault`](crate::CodecError::Fault) and the
/// client turns that into this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fault {
    pub code: i64,
    pub message: String,
}

impl Fault {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Fault {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Fault {}: {}>", self.code, self.message)
    }
}

impl std::error::Error for Fault {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_display() {
        let fault = Fault::new(-123, "Some error");
        assert_eq!(fault.to_string(), "<Fault -123: Some error>");
    }

    #[test]
    fn test_fault_serialization() {
        let fault = Fault::new(500, "Internal");
        let json = serde_json::to_string(&fault).unwrap();
        let back: Fault = serde_json::from_str(&json).unwrap();
        assert_eq!(fault, back);
    }
}
