// Codec round-trip and interoperability tests

use frpc_core::codec::xml::{self, XmlDialect};
use frpc_core::{Codec, CodecError, Value, XmlRpcCodec};
use proptest::prelude::*;

#[cfg(feature = "binary")]
use frpc_core::FastRpcCodec;

fn codecs() -> Vec<Box<dyn Codec>> {
    #[allow(unused_mut)]
    let mut codecs: Vec<Box<dyn Codec>> = vec![Box::new(XmlRpcCodec)];
    #[cfg(feature = "binary")]
    {
        codecs.push(Box::new(FastRpcCodec::new(false)));
        codecs.push(Box::new(FastRpcCodec::new(true)));
    }
    codecs
}

#[test]
fn test_representative_arguments_round_trip() {
    let args = vec![
        Value::Int(1),
        Value::from("abc"),
        Value::Int(-42),
        Value::from(""),
        Value::Bool(false),
        Value::Double(2.5),
        Value::Nil,
    ];

    for codec in codecs() {
        let body = codec.encode("a.b.c", &args).unwrap();
        let (method, decoded) = codec.decode_call(&body).unwrap();
        assert_eq!(method, "a.b.c", "codec {}", codec.name());
        assert_eq!(decoded, args, "codec {}", codec.name());
    }
}

#[test]
fn test_null_arguments_are_accepted() {
    for codec in codecs() {
        let body = codec
            .encode("store", &[Value::Nil, Value::from(Option::<i64>::None)])
            .unwrap_or_else(|e| panic!("codec {} rejected nil: {}", codec.name(), e));
        assert!(!body.is_empty());
    }
}

#[test]
fn test_xml_fault_maps_to_fault_error() {
    let body = xml::write_fault(XmlDialect::Standard, -123, "Foo");
    for codec in codecs() {
        match codec.decode(&body) {
            Err(CodecError::Fault { code, message }) => {
                assert_eq!(code, -123);
                assert_eq!(message, "Foo");
            }
            other => panic!("codec {}: expected fault, got {:?}", codec.name(), other),
        }
    }
}

#[cfg(feature = "binary")]
#[test]
fn test_binary_fault_maps_to_fault_error() {
    let body = frpc_core::codec::binary::encode_fault(-123, "Foo").unwrap();
    let err = FastRpcCodec::new(true).decode(&body).unwrap_err();
    assert!(matches!(err, CodecError::Fault { code: -123, ref message } if message == "Foo"));
}

#[test]
fn test_garbage_is_not_a_fault() {
    for codec in codecs() {
        let err = codec.decode(b"this is not rpc").unwrap_err();
        assert!(!err.is_fault(), "codec {}: {:?}", codec.name(), err);
    }
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Int),
        any::<bool>().prop_map(Value::Bool),
        (-1.0e9f64..1.0e9).prop_map(Value::Double),
        "[a-zA-Z0-9 <>&.,_-]{0,40}".prop_map(Value::String),
        Just(Value::Nil),
    ]
}

proptest! {
    #[test]
    fn test_scalar_round_trip(args in proptest::collection::vec(scalar(), 0..8)) {
        for codec in codecs() {
            let body = codec.encode("prop.test", &args).unwrap();
            let (method, decoded) = codec.decode_call(&body).unwrap();
            prop_assert_eq!(method, "prop.test");
            prop_assert_eq!(&decoded, &args);
        }
    }
}
