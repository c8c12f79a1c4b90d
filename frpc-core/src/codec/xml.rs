//! XML-RPC wire format.
//!
//! The writer reproduces the line layout used by the common XML-RPC
//! implementations (one element per line, scalars inline inside `<value>`),
//! so request bodies are byte-for-byte predictable. The parser is built on the
//! `xml` event reader and accepts both dialects.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat};
use indexmap::IndexMap;
use tracing::trace;
use ::xml::reader::{EventReader, ParserConfig, XmlEvent};

use super::MAX_DEPTH;
use crate::error::{CodecError, Result};
use crate::value::Value;

/// Element nesting allowed in a document: the envelope plus three elements
/// (`value`, `array`/`struct`, `data`/`member`) per container level.
const MAX_ELEMENT_DEPTH: usize = 3 * MAX_DEPTH + 8;

/// Flavour of XML produced by the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XmlDialect {
    /// Plain XML-RPC: `<int>` integers, compact ISO 8601 datetimes
    #[default]
    Standard,
    /// XML as written by FastRPC peers: protocol version comment, `<i4>`
    /// integers and RFC 3339 datetimes with offset
    FastRpc,
}

impl XmlDialect {
    fn prolog(self) -> &'static str {
        match self {
            XmlDialect::Standard => "<?xml version='1.0'?>\n",
            XmlDialect::FastRpc => "<?xml version=\"1.0\"?>\n<!--protocolVersion=\"2.1\"-->\n",
        }
    }

    fn int_tag(self, v: i64) -> &'static str {
        if i32::try_from(v).is_err() {
            return "i8";
        }
        match self {
            XmlDialect::Standard => "int",
            XmlDialect::FastRpc => "i4",
        }
    }

    fn format_datetime(self, dt: &DateTime<FixedOffset>) -> String {
        match self {
            // No offset on the wire: the local time is written as is and
            // read back as UTC, so non-UTC datetimes shift on a round trip
            XmlDialect::Standard => dt.format("%Y%m%dT%H:%M:%S").to_string(),
            XmlDialect::FastRpc => dt.to_rfc3339_opts(SecondsFormat::Secs, false),
        }
    }
}

// ============================================================================
// WRITER
// ============================================================================

/// Serialize a `<methodCall>` document.
pub fn write_call(dialect: XmlDialect, method: &str, args: &[Value]) -> Bytes {
    let mut out = String::with_capacity(128);
    out.push_str(dialect.prolog());
    out.push_str("<methodCall>\n<methodName>");
    escape_into(&mut out, method);
    out.push_str("</methodName>\n");
    write_params(&mut out, dialect, args);
    out.push_str("</methodCall>\n");
    Bytes::from(out)
}

/// Serialize a successful `<methodResponse>` carrying one value.
pub fn write_response(dialect: XmlDialect, value: &Value) -> Bytes {
    let mut out = String::with_capacity(128);
    out.push_str(dialect.prolog());
    out.push_str("<methodResponse>\n");
    write_params(&mut out, dialect, std::slice::from_ref(value));
    out.push_str("</methodResponse>\n");
    Bytes::from(out)
}

/// Serialize a `<fault>` response.
pub fn write_fault(dialect: XmlDialect, code: i64, message: &str) -> Bytes {
    let fault: Value = [
        ("faultCode".to_string(), Value::Int(code)),
        ("faultString".to_string(), Value::from(message)),
    ]
    .into_iter()
    .collect();

    let mut out = String::with_capacity(256);
    out.push_str(dialect.prolog());
    out.push_str("<methodResponse>\n<fault>\n");
    write_value(&mut out, dialect, &fault);
    out.push_str("</fault>\n</methodResponse>\n");
    Bytes::from(out)
}

fn write_params(out: &mut String, dialect: XmlDialect, args: &[Value]) {
    out.push_str("<params>\n");
    for arg in args {
        out.push_str("<param>\n");
        write_value(out, dialect, arg);
        out.push_str("</param>\n");
    }
    out.push_str("</params>\n");
}

fn write_value(out: &mut String, dialect: XmlDialect, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Int(v) => {
            let tag = dialect.int_tag(*v);
            out.push_str(&format!("<{tag}>{v}</{tag}>"));
        }
        Value::Bool(v) => {
            out.push_str(if *v {
                "<boolean>1</boolean>"
            } else {
                "<boolean>0</boolean>"
            });
        }
        Value::Double(v) => out.push_str(&format!("<double>{v:?}</double>")),
        Value::String(v) => {
            out.push_str("<string>");
            escape_into(out, v);
            out.push_str("</string>");
        }
        Value::DateTime(v) => {
            out.push_str("<dateTime.iso8601>");
            out.push_str(&dialect.format_datetime(v));
            out.push_str("</dateTime.iso8601>");
        }
        Value::Binary(v) => {
            out.push_str("<base64>\n");
            out.push_str(&BASE64.encode(v));
            out.push_str("\n</base64>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>\n");
            for (name, member) in members {
                out.push_str("<member>\n<name>");
                escape_into(out, name);
                out.push_str("</name>\n");
                write_value(out, dialect, member);
                out.push_str("</member>\n");
            }
            out.push_str("</struct>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>\n");
            for item in items {
                write_value(out, dialect, item);
            }
            out.push_str("</data></array>");
        }
        Value::Nil => out.push_str("<nil/>"),
    }
    out.push_str("</value>\n");
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

// ============================================================================
// PARSER
// ============================================================================

#[derive(Debug, Default)]
struct Element {
    name: String,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn child(&self, name: &str) -> Result<&Element> {
        self.children
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| CodecError::InvalidXml(format!("<{}> without <{}>", self.name, name)))
    }

    fn only_child(&self) -> Result<&Element> {
        match self.children.as_slice() {
            [child] => Ok(child),
            _ => Err(CodecError::InvalidXml(format!(
                "<{}> must contain exactly one element, found {}",
                self.name,
                self.children.len()
            ))),
        }
    }
}

fn parse_document(body: &[u8]) -> Result<Element> {
    let config = ParserConfig::new()
        .trim_whitespace(false)
        .whitespace_to_characters(true)
        .cdata_to_characters(true)
        .ignore_comments(true);
    let reader = EventReader::new_with_config(body, config);

    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    for event in reader {
        match event? {
            XmlEvent::StartElement { name, .. } => {
                if root.is_some() {
                    return Err(CodecError::InvalidXml("multiple root elements".into()));
                }
                if stack.len() >= MAX_ELEMENT_DEPTH {
                    return Err(CodecError::TooDeep(MAX_DEPTH));
                }
                stack.push(Element {
                    name: name.local_name,
                    ..Default::default()
                });
            }
            XmlEvent::EndElement { .. } => {
                let element = stack
                    .pop()
                    .ok_or_else(|| CodecError::InvalidXml("unbalanced end tag".into()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            XmlEvent::Characters(text) | XmlEvent::CData(text) | XmlEvent::Whitespace(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            _ => {}
        }
    }

    root.ok_or_else(|| CodecError::InvalidXml("empty document".into()))
}

/// Parse a `<methodResponse>`.
///
/// Returns every `<param>` value in order; a `<fault>` response is reported
/// as [`CodecError::Fault`].
pub fn parse_response(body: &[u8]) -> Result<Vec<Value>> {
    let root = parse_document(body)?;
    if root.name != "methodResponse" {
        return Err(CodecError::InvalidXml(format!(
            "expected <methodResponse>, found <{}>",
            root.name
        )));
    }

    let body = root.only_child()?;
    match body.name.as_str() {
        "params" => parse_params(body),
        "fault" => {
            let fault = parse_value(body.child("value")?, 0)?;
            let code = fault
                .get("faultCode")
                .and_then(Value::as_i64)
                .ok_or_else(|| CodecError::InvalidXml("fault without integer faultCode".into()))?;
            let message = fault
                .get("faultString")
                .and_then(Value::as_str)
                .ok_or_else(|| CodecError::InvalidXml("fault without faultString".into()))?;
            trace!(code, message, "XML-RPC fault response");
            Err(CodecError::fault(code, message))
        }
        other => Err(CodecError::InvalidXml(format!(
            "unexpected <{}> in <methodResponse>",
            other
        ))),
    }
}

/// Parse a `<methodCall>` into its method name and arguments.
pub fn parse_call(body: &[u8]) -> Result<(String, Vec<Value>)> {
    let root = parse_document(body)?;
    if root.name != "methodCall" {
        return Err(CodecError::InvalidXml(format!(
            "expected <methodCall>, found <{}>",
            root.name
        )));
    }

    let method = root.child("methodName")?.text.trim().to_string();
    let args = match root.children.iter().find(|c| c.name == "params") {
        Some(params) => parse_params(params)?,
        None => Vec::new(),
    };
    Ok((method, args))
}

fn parse_params(params: &Element) -> Result<Vec<Value>> {
    params
        .children
        .iter()
        .map(|param| {
            if param.name != "param" {
                return Err(CodecError::InvalidXml(format!(
                    "unexpected <{}> in <params>",
                    param.name
                )));
            }
            parse_value(param.child("value")?, 0)
        })
        .collect()
}

/// `depth` counts the containers enclosing `value`.
fn parse_value(value: &Element, depth: usize) -> Result<Value> {
    // An untyped <value> holds a string
    if value.children.is_empty() {
        return Ok(Value::String(value.text.clone()));
    }

    let typed = value.only_child()?;
    if matches!(typed.name.as_str(), "struct" | "array") && depth >= MAX_DEPTH {
        return Err(CodecError::TooDeep(MAX_DEPTH));
    }
    let text = typed.text.as_str();
    match typed.name.as_str() {
        "int" | "i4" | "i8" => text
            .trim()
            .parse()
            .map(Value::Int)
            .map_err(|_| CodecError::InvalidInt(text.to_string())),
        "boolean" => match text.trim() {
            "1" | "true" => Ok(Value::Bool(true)),
            "0" | "false" => Ok(Value::Bool(false)),
            other => Err(CodecError::InvalidXml(format!("invalid boolean '{}'", other))),
        },
        "double" => text
            .trim()
            .parse()
            .map(Value::Double)
            .map_err(|_| CodecError::InvalidDouble(text.to_string())),
        "string" => Ok(Value::String(text.to_string())),
        "dateTime.iso8601" => parse_datetime(text.trim()).map(Value::DateTime),
        "base64" => {
            let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            Ok(Value::Binary(Bytes::from(BASE64.decode(compact)?)))
        }
        "struct" => {
            let mut members = IndexMap::with_capacity(typed.children.len());
            for member in &typed.children {
                let name = member.child("name")?.text.clone();
                let value = parse_value(member.child("value")?, depth + 1)?;
                members.insert(name, value);
            }
            Ok(Value::Struct(members))
        }
        "array" => typed
            .child("data")?
            .children
            .iter()
            .map(|item| parse_value(item, depth + 1))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        "nil" => Ok(Value::Nil),
        other => Err(CodecError::InvalidXml(format!(
            "unknown value type <{}>",
            other
        ))),
    }
}

fn parse_datetime(text: &str) -> Result<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y%m%dT%H:%M:%S%z") {
        return Ok(dt);
    }
    // Zone-less forms are taken as UTC
    for format in ["%Y%m%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y%m%dT%H%M%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    Err(CodecError::InvalidDateTime(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_write_call_standard_layout() {
        let body = write_call(
            XmlDialect::Standard,
            "foo",
            &[Value::Int(1), Value::from("abc")],
        );
        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            "<?xml version='1.0'?>\n\
             <methodCall>\n\
             <methodName>foo</methodName>\n\
             <params>\n\
             <param>\n\
             <value><int>1</int></value>\n\
             </param>\n\
             <param>\n\
             <value><string>abc</string></value>\n\
             </param>\n\
             </params>\n\
             </methodCall>\n"
        );
    }

    #[test]
    fn test_write_call_fastrpc_layout() {
        let body = write_call(
            XmlDialect::FastRpc,
            "foo",
            &[Value::Int(1), Value::from("abc")],
        );
        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            "<?xml version=\"1.0\"?>\n\
             <!--protocolVersion=\"2.1\"-->\n\
             <methodCall>\n\
             <methodName>foo</methodName>\n\
             <params>\n\
             <param>\n\
             <value><i4>1</i4></value>\n\
             </param>\n\
             <param>\n\
             <value><string>abc</string></value>\n\
             </param>\n\
             </params>\n\
             </methodCall>\n"
        );
    }

    #[test]
    fn test_nil_arguments_are_encoded() {
        let body = write_call(XmlDialect::Standard, "store", &[Value::Nil, Value::Int(2)]);
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.contains("<value><nil/></value>"));

        let (_, args) = parse_call(&body).unwrap();
        assert_eq!(args, vec![Value::Nil, Value::Int(2)]);
    }

    #[test]
    fn test_large_ints_use_i8() {
        let body = write_call(XmlDialect::Standard, "big", &[Value::Int(1 << 40)]);
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.contains("<i8>1099511627776</i8>"));
    }

    #[test]
    fn test_escaping() {
        let body = write_call(XmlDialect::Standard, "echo", &[Value::from("a<b & c>d")]);
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.contains("<string>a&lt;b &amp; c&gt;d</string>"));

        let (_, args) = parse_call(&body).unwrap();
        assert_eq!(args, vec![Value::from("a<b & c>d")]);
    }

    #[test]
    fn test_parse_response() {
        let body = b"<?xml version='1.0'?>\n\
            <methodResponse>\n\
            <params>\n\
            <param>\n\
            <value><int>123</int></value>\n\
            </param>\n\
            </params>\n\
            </methodResponse>\n";
        assert_eq!(parse_response(body).unwrap(), vec![Value::Int(123)]);
    }

    #[test]
    fn test_parse_fastrpc_response() {
        let body = b"<?xml version=\"1.0\"?>\n\
            <!--protocolVersion=\"2.1\"-->\n\
            <methodResponse>\n\
            <params>\n\
            <param>\n\
            <value><i4>456</i4></value>\n\
            </param>\n</params>\n\
            </methodResponse>\n";
        assert_eq!(parse_response(body).unwrap(), vec![Value::Int(456)]);
    }

    #[test]
    fn test_parse_fault() {
        let body = b"<?xml version='1.0'?>\n\
            <methodResponse>\n\
            <fault>\n\
            <value><struct>\n\
            <member>\n\
            <name>faultCode</name>\n\
            <value><int>-123</int></value>\n\
            </member>\n\
            <member>\n\
            <name>faultString</name>\n\
            <value><string>Foo</string></value>\n\
            </member>\n\
            </struct></value>\n\
            </fault>\n\
            </methodResponse>\n";

        match parse_response(body) {
            Err(CodecError::Fault { code, message }) => {
                assert_eq!(code, -123);
                assert_eq!(message, "Foo");
            }
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn test_written_fault_parses_back() {
        let body = write_fault(XmlDialect::FastRpc, 404, "not found");
        let err = parse_response(&body).unwrap_err();
        assert!(matches!(err, CodecError::Fault { code: 404, ref message } if message == "not found"));
    }

    #[test]
    fn test_parse_untyped_value_is_string() {
        let body = b"<methodResponse><params><param><value>  hi there </value></param></params></methodResponse>";
        assert_eq!(
            parse_response(body).unwrap(),
            vec![Value::from("  hi there ")]
        );
    }

    #[test]
    fn test_parse_nested_values() {
        let mut members = IndexMap::new();
        members.insert("ok".to_string(), Value::Bool(true));
        members.insert(
            "items".to_string(),
            Value::Array(vec![Value::Double(1.5), Value::Nil]),
        );
        members.insert(
            "blob".to_string(),
            Value::Binary(Bytes::from_static(b"\x00\x01binary")),
        );
        let value = Value::Struct(members);

        let body = write_response(XmlDialect::Standard, &value);
        assert_eq!(parse_response(&body).unwrap(), vec![value]);
    }

    #[test]
    fn test_datetime_dialects() {
        let dt = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 9, 8, 5, 2)
            .unwrap();

        let body = write_response(XmlDialect::FastRpc, &Value::DateTime(dt));
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.contains("<dateTime.iso8601>2024-03-09T08:05:02+01:00</dateTime.iso8601>"));
        assert_eq!(parse_response(&body).unwrap(), vec![Value::DateTime(dt)]);

        let body = write_response(XmlDialect::Standard, &Value::DateTime(dt));
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.contains("<dateTime.iso8601>20240309T08:05:02</dateTime.iso8601>"));
    }

    #[test]
    fn test_standard_datetime_drops_the_offset() {
        let dt = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 9, 8, 5, 2)
            .unwrap();
        let body = write_response(XmlDialect::Standard, &Value::DateTime(dt));

        let parsed = parse_response(&body).unwrap().remove(0);
        let expected = chrono::Utc
            .with_ymd_and_hms(2024, 3, 9, 8, 5, 2)
            .unwrap()
            .fixed_offset();
        assert_eq!(parsed, Value::DateTime(expected));
        assert_ne!(parsed, Value::DateTime(dt));
    }

    /// A response whose single param is `levels` nested arrays around an int.
    fn nested_arrays(levels: usize) -> Vec<u8> {
        let mut body = String::from("<methodResponse><params><param><value>");
        body.push_str(&"<array><data><value>".repeat(levels));
        body.push_str("<int>1</int>");
        body.push_str(&"</value></data></array>".repeat(levels));
        body.push_str("</value></param></params></methodResponse>");
        body.into_bytes()
    }

    #[test]
    fn test_nesting_up_to_the_limit() {
        let values = parse_response(&nested_arrays(MAX_DEPTH)).unwrap();
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_hostile_nesting_is_rejected() {
        assert!(matches!(
            parse_response(&nested_arrays(MAX_DEPTH + 1)),
            Err(CodecError::TooDeep(MAX_DEPTH))
        ));
        assert!(matches!(
            parse_response(&nested_arrays(200_000)),
            Err(CodecError::TooDeep(_))
        ));
    }

    #[test]
    fn test_deep_structs_are_rejected() {
        let levels = MAX_DEPTH + 1;
        let mut body = String::from("<methodResponse><params><param><value>");
        body.push_str(&"<struct><member><name>m</name><value>".repeat(levels));
        body.push_str("<nil/>");
        body.push_str(&"</value></member></struct>".repeat(levels));
        body.push_str("</value></param></params></methodResponse>");
        assert!(matches!(
            parse_response(body.as_bytes()),
            Err(CodecError::TooDeep(_))
        ));
    }

    #[test]
    fn test_multiple_params_are_all_returned() {
        let body = b"<methodResponse><params>\
            <param><value><int>1</int></value></param>\
            <param><value><int>2</int></value></param>\
            </params></methodResponse>";
        assert_eq!(
            parse_response(body).unwrap(),
            vec![Value::Int(1), Value::Int(2)]
        );
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            parse_response(b"<methodResponse><params>"),
            Err(CodecError::Xml(_))
        ));
        assert!(matches!(
            parse_response(b"<methodCall></methodCall>"),
            Err(CodecError::InvalidXml(_))
        ));
        assert!(matches!(
            parse_response(
                b"<methodResponse><params><param><value><int>x</int></value></param></params></methodResponse>"
            ),
            Err(CodecError::InvalidInt(_))
        ));
    }
}
