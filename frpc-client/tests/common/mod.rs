use tracing_subscriber::EnvFilter;

/// Route `tracing` output through the test harness, once per binary.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("frpc_client=debug,frpc_transport=debug,frpc_core=debug,warn")
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

pub const RESPONSE_123: &str = "<?xml version='1.0'?>
<methodResponse>
<params>
<param>
<value><int>123</int></value>
</param>
</params>
</methodResponse>
";

pub const FAULT_123: &str = "<?xml version='1.0'?>
<methodResponse>
<fault>
<value><struct>
<member>
<name>faultCode</name>
<value><int>-123</int></value>
</member>
<member>
<name>faultString</name>
<value><string>Foo</string></value>
</member>
</struct></value>
</fault>
</methodResponse>
";
