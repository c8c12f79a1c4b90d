// Basic FastRPC / XML-RPC calls against a running server.
//
//   FRPC_URL=http://localhost:8080/RPC2 cargo run --example basic_client
//
// Set FRPC_BINARY=1 to talk the binary protocol.

use anyhow::Result;
use frpc_client::{args, rpc_struct, ProxyOptions, ServerProxy, Value};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,frpc_client=debug".into()),
        )
        .init();

    let url = std::env::var("FRPC_URL").unwrap_or_else(|_| "http://localhost:8080/RPC2".into());
    let use_binary = std::env::var("FRPC_BINARY").is_ok_and(|v| v == "1");

    let proxy = ServerProxy::with_options(
        ProxyOptions::new(url)
            .with_binary(use_binary)
            .with_keep_alive(true)
            .with_timeout(10.0),
    )?;
    info!(codec = proxy.codec().name(), "proxy ready");

    // Plain call, errors propagate
    match proxy.method("system").attr("listMethods").call(args![]).await {
        Ok(methods) => info!("methods: {}", methods),
        Err(e) if e.is_fault() => info!("server refused: {}", e),
        Err(e) => return Err(e.into()),
    }

    // Quiet call, failures are captured
    let result = proxy
        .call_quiet("user.create", args![rpc_struct! { "name" => "alice", "age" => 30 }])
        .await;
    if result.success {
        info!("created: {}", result.value.unwrap_or(frpc_client::Value::Nil));
    } else if let Some(fault) = result.fault() {
        info!(code = fault.code, "create failed: {}", fault.message);
    } else if let Some(e) = result.exception {
        info!("create failed: {}", e);
    }

    // Keyword form
    let reply = proxy
        .call_func("system.methodHelp", args!["user.create"], [("quiet", Value::Bool(true))])
        .await?;
    info!("help: {:?}", reply.into_call_result().value);

    Ok(())
}
