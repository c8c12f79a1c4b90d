use frpc_core::{Fault, Value};

use crate::error::Error;

/// Outcome of a quiet call: the failure is captured instead of returned.
#[derive(Debug)]
pub struct CallResult {
    pub success: bool,
    pub value: Option<Value>,
    pub exception: Option<Error>,
}

impl CallResult {
    pub fn ok(value: Value) -> Self {
        CallResult {
            success: true,
            value: Some(value),
            exception: None,
        }
    }

    pub fn err(error: Error) -> Self {
        CallResult {
            success: false,
            value: None,
            exception: Some(error),
        }
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.exception.as_ref().and_then(Error::fault)
    }

    pub fn into_result(self) -> Result<Value, Error> {
        match self.exception {
            Some(error) => Err(error),
            None => Ok(self.value.unwrap_or(Value::Nil)),
        }
    }
}

impl From<Result<Value, Error>> for CallResult {
    fn from(result: Result<Value, Error>) -> Self {
        match result {
            Ok(value) => CallResult::ok(value),
            Err(error) => CallResult::err(error),
        }
    }
}
