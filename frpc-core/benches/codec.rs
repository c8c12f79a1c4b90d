use criterion::{criterion_group, criterion_main, Criterion};
use frpc_core::{Codec, IndexMap, Value, XmlRpcCodec};
use std::hint::black_box;

fn sample_args() -> Vec<Value> {
    let mut user = IndexMap::new();
    user.insert("id".to_string(), Value::Int(1234567));
    user.insert("name".to_string(), Value::from("Jane Doe"));
    user.insert(
        "tags".to_string(),
        Value::Array(vec![Value::from("a"), Value::from("b"), Value::Nil]),
    );
    vec![Value::Struct(user), Value::Double(0.75), Value::Bool(true)]
}

fn bench_codecs(c: &mut Criterion) {
    let args = sample_args();

    let xml = XmlRpcCodec;
    let xml_body = xml.encode("user.update", &args).unwrap();
    c.bench_function("xml_encode_call", |b| {
        b.iter(|| xml.encode(black_box("user.update"), black_box(&args)))
    });
    c.bench_function("xml_decode_call", |b| {
        b.iter(|| xml.decode_call(black_box(&xml_body)))
    });

    #[cfg(feature = "binary")]
    {
        let frpc = frpc_core::FastRpcCodec::new(true);
        let frpc_body = frpc.encode("user.update", &args).unwrap();
        c.bench_function("frpc_encode_call", |b| {
            b.iter(|| frpc.encode(black_box("user.update"), black_box(&args)))
        });
        c.bench_function("frpc_decode_call", |b| {
            b.iter(|| frpc.decode_call(black_box(&frpc_body)))
        });
    }
}

criterion_group!(benches, bench_codecs);
criterion_main!(benches);
