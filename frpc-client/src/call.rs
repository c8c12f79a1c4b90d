//! Dotted method paths and the single dispatch entry point behind them.

use async_trait::async_trait;
use frpc_core::Value;
use std::fmt;

use crate::error::{ArgumentError, Error};
use crate::result::CallResult;

/// Keyword options of a call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Capture failures in a [`CallResult`] instead of returning them
    pub quiet: bool,
}

impl CallOptions {
    pub fn quiet() -> Self {
        CallOptions { quiet: true }
    }

    /// Parse keyword arguments. `quiet` is the only keyword recognised.
    pub fn from_kwargs<I, K>(kwargs: I) -> Result<Self, ArgumentError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut options = CallOptions::default();
        for (name, value) in kwargs {
            match name.as_ref() {
                "quiet" => {
                    options.quiet = value
                        .as_bool()
                        .ok_or(ArgumentError::InvalidQuiet(value.type_name()))?;
                }
                other => return Err(ArgumentError::UnexpectedKeyword(other.to_string())),
            }
        }
        Ok(options)
    }
}

/// What a dispatched call hands back, depending on [`CallOptions::quiet`].
#[derive(Debug)]
pub enum Reply {
    Value(Value),
    Quiet(CallResult),
}

impl Reply {
    pub fn into_result(self) -> Result<Value, Error> {
        match self {
            Reply::Value(value) => Ok(value),
            Reply::Quiet(result) => result.into_result(),
        }
    }

    pub fn into_call_result(self) -> CallResult {
        match self {
            Reply::Value(value) => CallResult::ok(value),
            Reply::Quiet(result) => result,
        }
    }
}

/// Anything that can execute a remote call by its full method name.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(
        &self,
        method: String,
        args: Vec<Value>,
        options: CallOptions,
    ) -> Result<Reply, Error>;
}

/// A method path under construction, e.g. `system.methodHelp`.
///
/// Each [`attr`](RpcCall::attr) appends a segment; invoking the call joins
/// the segments with `.` and dispatches exactly once.
pub struct RpcCall<'a> {
    dispatcher: &'a dyn Dispatch,
    path: Vec<String>,
}

impl<'a> RpcCall<'a> {
    pub fn new(dispatcher: &'a dyn Dispatch, name: impl Into<String>) -> Self {
        RpcCall {
            dispatcher,
            path: vec![name.into()],
        }
    }

    pub fn attr(mut self, name: impl Into<String>) -> Self {
        self.path.push(name.into());
        self
    }

    pub fn method_name(&self) -> String {
        self.path.join(".")
    }

    pub async fn call(self, args: Vec<Value>) -> Result<Value, Error> {
        self.dispatch(args, CallOptions::default())
            .await?
            .into_result()
    }

    pub async fn call_quiet(self, args: Vec<Value>) -> CallResult {
        match self.dispatch(args, CallOptions::quiet()).await {
            Ok(reply) => reply.into_call_result(),
            Err(error) => CallResult::err(error),
        }
    }

    /// Call with keyword arguments. Unknown keywords fail before dispatch.
    pub async fn call_with<I, K>(self, args: Vec<Value>, kwargs: I) -> Result<Reply, Error>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let options = CallOptions::from_kwargs(kwargs)?;
        self.dispatch(args, options).await
    }

    async fn dispatch(self, args: Vec<Value>, options: CallOptions) -> Result<Reply, Error> {
        let method = self.method_name();
        self.dispatcher.dispatch(method, args, options).await
    }
}

impl fmt::Debug for RpcCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcCall")
            .field("method", &self.method_name())
            .finish_non_exhaustive()
    }
}
