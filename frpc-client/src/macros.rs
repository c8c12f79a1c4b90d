//! Macros for building call arguments with less boilerplate

/// Positional call arguments, each converted with `Value::from`.
///
/// # Example
///
/// ```rust
/// use frpc_client::args;
/// let args = args![5, "hello", true];
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    [$($expr:expr),* $(,)?] => {
        vec![$($crate::Value::from($expr)),*]
    };
}

/// A struct value with members in the order written.
///
/// # Example
///
/// ```rust
/// use frpc_client::rpc_struct;
/// let user = rpc_struct! {
///     "name" => "alice",
///     "age" => 30,
/// };
/// assert_eq!(user.get("age").and_then(|v| v.as_i64()), Some(30));
/// ```
#[macro_export]
macro_rules! rpc_struct {
    { $($key:expr => $value:expr),* $(,)? } => {{
        let mut members = $crate::IndexMap::new();
        $(
            members.insert($key.to_string(), $crate::Value::from($value));
        )*
        $crate::Value::Struct(members)
    }};
}
