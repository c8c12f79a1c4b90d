//! FastRPC binary wire format, protocol version 2.1.
//!
//! Every message starts with the magic `CA 11` followed by the protocol
//! version. Each value is introduced by a type byte `type << 3 | extra`
//! where `extra` carries either a small payload (bool) or the number of
//! bytes used by the following little-endian length or magnitude, minus one.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Timelike};
use indexmap::IndexMap;
use tracing::trace;

use super::MAX_DEPTH;
use crate::error::{CodecError, Result};
use crate::value::Value;

pub const MAGIC: [u8; 2] = [0xCA, 0x11];
pub const VERSION_MAJOR: u8 = 2;
pub const VERSION_MINOR: u8 = 1;

const TYPE_INT_LEGACY: u8 = 1;
const TYPE_BOOL: u8 = 2;
const TYPE_DOUBLE: u8 = 3;
const TYPE_STRING: u8 = 4;
const TYPE_DATETIME: u8 = 5;
const TYPE_BINARY: u8 = 6;
const TYPE_INT_POSITIVE: u8 = 7;
const TYPE_INT_NEGATIVE: u8 = 8;
const TYPE_STRUCT: u8 = 10;
const TYPE_ARRAY: u8 = 11;
const TYPE_NULL: u8 = 12;
const TYPE_METHOD_CALL: u8 = 13;
const TYPE_METHOD_RESPONSE: u8 = 14;
const TYPE_FAULT: u8 = 15;

// Years are stored as an 11 bit offset from 1600
const YEAR_BASE: i32 = 1600;
const YEAR_MAX_OFFSET: i32 = 0x7ff;

/// Whether `body` looks like a FastRPC binary message.
pub fn is_binary(body: &[u8]) -> bool {
    body.len() >= 2 && body[..2] == MAGIC
}

pub fn encode_call(method: &str, args: &[Value]) -> Result<Bytes> {
    let mut writer = Writer::new();
    writer.type_byte(TYPE_METHOD_CALL, 0);
    writer.short_name(method, CodecError::MethodNameTooLong)?;
    for arg in args {
        writer.value(arg)?;
    }
    Ok(writer.finish())
}

pub fn encode_response(value: &Value) -> Result<Bytes> {
    let mut writer = Writer::new();
    writer.type_byte(TYPE_METHOD_RESPONSE, 0);
    writer.value(value)?;
    Ok(writer.finish())
}

pub fn encode_fault(code: i64, message: &str) -> Result<Bytes> {
    let mut writer = Writer::new();
    writer.type_byte(TYPE_FAULT, 0);
    writer.int(code);
    writer.sized(TYPE_STRING, message.as_bytes());
    Ok(writer.finish())
}

/// Decode a method response. A fault message is reported as
/// [`CodecError::Fault`].
pub fn decode_response(body: &[u8]) -> Result<Value> {
    let mut reader = Reader::new(body)?;
    let (ty, _) = reader.type_byte()?;
    let value = match ty {
        TYPE_METHOD_RESPONSE => reader.value()?,
        TYPE_FAULT => {
            let code = match reader.value()? {
                Value::Int(code) => code,
                other => {
                    return Err(CodecError::MalformedFault(format!(
                        "code is {}",
                        other.type_name()
                    )))
                }
            };
            let message = match reader.value()? {
                Value::String(message) => message,
                other => {
                    return Err(CodecError::MalformedFault(format!(
                        "message is {}",
                        other.type_name()
                    )))
                }
            };
            trace!(code, %message, "FastRPC fault response");
            return Err(CodecError::fault(code, message));
        }
        TYPE_METHOD_CALL => return Err(CodecError::UnexpectedMessage("method call")),
        other => return Err(CodecError::UnknownType(other)),
    };
    reader.finish()?;
    Ok(value)
}

/// Decode a method call into its name and arguments.
pub fn decode_call(body: &[u8]) -> Result<(String, Vec<Value>)> {
    let mut reader = Reader::new(body)?;
    match reader.type_byte()?.0 {
        TYPE_METHOD_CALL => {}
        TYPE_METHOD_RESPONSE => return Err(CodecError::UnexpectedMessage("method response")),
        TYPE_FAULT => return Err(CodecError::UnexpectedMessage("fault")),
        other => return Err(CodecError::UnknownType(other)),
    }
    let method = reader.short_name("method name")?;
    let mut args = Vec::new();
    while reader.has_remaining() {
        args.push(reader.value()?);
    }
    Ok((method, args))
}

/// Minimal number of bytes needed to hold `v`, at least one.
fn byte_len(v: u64) -> usize {
    let bits = 64 - v.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

struct Writer {
    buf: BytesMut,
}

impl Writer {
    fn new() -> Self {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_slice(&MAGIC);
        buf.put_u8(VERSION_MAJOR);
        buf.put_u8(VERSION_MINOR);
        Writer { buf }
    }

    fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    fn type_byte(&mut self, ty: u8, extra: u8) {
        self.buf.put_u8((ty << 3) | (extra & 0x07));
    }

    fn short_name(&mut self, name: &str, too_long: fn(usize) -> CodecError) -> Result<()> {
        let len = u8::try_from(name.len()).map_err(|_| too_long(name.len()))?;
        self.buf.put_u8(len);
        self.buf.put_slice(name.as_bytes());
        Ok(())
    }

    fn int(&mut self, v: i64) {
        let (ty, magnitude) = if v >= 0 {
            (TYPE_INT_POSITIVE, v.unsigned_abs())
        } else {
            (TYPE_INT_NEGATIVE, v.unsigned_abs())
        };
        let n = byte_len(magnitude);
        self.type_byte(ty, (n - 1) as u8);
        self.buf.put_uint_le(magnitude, n);
    }

    fn sized(&mut self, ty: u8, data: &[u8]) {
        let n = byte_len(data.len() as u64);
        self.type_byte(ty, (n - 1) as u8);
        self.buf.put_uint_le(data.len() as u64, n);
        self.buf.put_slice(data);
    }

    fn count(&mut self, ty: u8, count: usize) {
        let n = byte_len(count as u64);
        self.type_byte(ty, (n - 1) as u8);
        self.buf.put_uint_le(count as u64, n);
    }

    fn datetime(&mut self, dt: &DateTime<FixedOffset>) -> Result<()> {
        let local = dt.naive_local();
        let year = local.year() - YEAR_BASE;
        if !(0..=YEAR_MAX_OFFSET).contains(&year) {
            return Err(CodecError::InvalidDateTime(format!(
                "year {} is outside the FastRPC range",
                local.year()
            )));
        }
        let year = year as u32;

        let zone = (dt.offset().local_minus_utc() / 900) as i8;
        // Out of range timestamps are stored as -1, the packed fields are authoritative
        let timestamp = i32::try_from(dt.timestamp()).unwrap_or(-1);

        let weekday = local.weekday().num_days_from_sunday();
        let (sec, min, hour) = (local.second(), local.minute(), local.hour());
        let (day, month) = (local.day(), local.month());

        self.type_byte(TYPE_DATETIME, 0);
        self.buf.put_i8(zone);
        self.buf.put_i32_le(timestamp);
        self.buf.put_u8((((sec & 0x1f) << 3) | (weekday & 0x07)) as u8);
        self.buf
            .put_u8((((min & 0x3f) << 1) | ((sec & 0x20) >> 5) | ((hour & 0x01) << 7)) as u8);
        self.buf.put_u8((((hour & 0x1e) >> 1) | ((day & 0x0f) << 4)) as u8);
        self.buf
            .put_u8((((day & 0x10) >> 4) | ((month & 0x0f) << 1) | ((year & 0x07) << 5)) as u8);
        self.buf.put_u8(((year & 0x07f8) >> 3) as u8);
        Ok(())
    }

    fn value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Int(v) => self.int(*v),
            Value::Bool(v) => self.type_byte(TYPE_BOOL, u8::from(*v)),
            Value::Double(v) => {
                self.type_byte(TYPE_DOUBLE, 0);
                self.buf.put_f64_le(*v);
            }
            Value::String(v) => self.sized(TYPE_STRING, v.as_bytes()),
            Value::DateTime(v) => self.datetime(v)?,
            Value::Binary(v) => self.sized(TYPE_BINARY, v),
            Value::Struct(members) => {
                self.count(TYPE_STRUCT, members.len());
                for (name, member) in members {
                    self.short_name(name, CodecError::MemberNameTooLong)?;
                    self.value(member)?;
                }
            }
            Value::Array(items) => {
                self.count(TYPE_ARRAY, items.len());
                for item in items {
                    self.value(item)?;
                }
            }
            Value::Nil => self.type_byte(TYPE_NULL, 0),
        }
        Ok(())
    }
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(body: &'a [u8]) -> Result<Self> {
        if body.len() < 4 {
            return Err(CodecError::UnexpectedEof("header"));
        }
        if !is_binary(body) {
            return Err(CodecError::BadMagic([body[0], body[1]]));
        }
        let (major, minor) = (body[2], body[3]);
        if !(1..=2).contains(&major) {
            return Err(CodecError::UnsupportedVersion { major, minor });
        }
        Ok(Reader { buf: &body[4..] })
    }

    fn has_remaining(&self) -> bool {
        self.buf.has_remaining()
    }

    fn finish(&self) -> Result<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(CodecError::TrailingData(self.buf.len()))
        }
    }

    fn need(&self, n: usize, what: &'static str) -> Result<()> {
        if self.buf.remaining() < n {
            Err(CodecError::UnexpectedEof(what))
        } else {
            Ok(())
        }
    }

    fn type_byte(&mut self) -> Result<(u8, u8)> {
        self.need(1, "type")?;
        let byte = self.buf.get_u8();
        Ok((byte >> 3, byte & 0x07))
    }

    fn uint(&mut self, n: usize, what: &'static str) -> Result<u64> {
        self.need(n, what)?;
        Ok(self.buf.get_uint_le(n))
    }

    fn data(&mut self, extra: u8, what: &'static str) -> Result<&'a [u8]> {
        let len = self.uint(usize::from(extra) + 1, what)?;
        let len = usize::try_from(len).map_err(|_| CodecError::UnexpectedEof(what))?;
        self.need(len, what)?;
        let (data, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(data)
    }

    fn short_name(&mut self, what: &'static str) -> Result<String> {
        self.need(1, what)?;
        let len = usize::from(self.buf.get_u8());
        self.need(len, what)?;
        let (name, rest) = self.buf.split_at(len);
        self.buf = rest;
        String::from_utf8(name.to_vec()).map_err(|_| CodecError::InvalidUtf8(what))
    }

    fn value(&mut self) -> Result<Value> {
        self.value_at(0)
    }

    /// `depth` counts the containers enclosing the value being read.
    fn value_at(&mut self, depth: usize) -> Result<Value> {
        let (ty, extra) = self.type_byte()?;
        if matches!(ty, TYPE_STRUCT | TYPE_ARRAY) && depth >= MAX_DEPTH {
            return Err(CodecError::TooDeep(MAX_DEPTH));
        }
        let n = usize::from(extra) + 1;
        match ty {
            TYPE_INT_POSITIVE => {
                let magnitude = self.uint(n, "integer")?;
                i64::try_from(magnitude)
                    .map(Value::Int)
                    .map_err(|_| CodecError::InvalidInt(magnitude.to_string()))
            }
            TYPE_INT_NEGATIVE => {
                let magnitude = self.uint(n, "integer")?;
                0i64.checked_sub_unsigned(magnitude)
                    .map(Value::Int)
                    .ok_or_else(|| CodecError::InvalidInt(format!("-{}", magnitude)))
            }
            TYPE_INT_LEGACY => {
                let raw = self.uint(n, "integer")?;
                // Sign-extend from the stored width
                let shift = 64 - 8 * n as u32;
                Ok(Value::Int(((raw << shift) as i64) >> shift))
            }
            TYPE_BOOL => Ok(Value::Bool(extra & 0x01 == 1)),
            TYPE_DOUBLE => {
                self.need(8, "double")?;
                Ok(Value::Double(self.buf.get_f64_le()))
            }
            TYPE_STRING => {
                let data = self.data(extra, "string")?;
                String::from_utf8(data.to_vec())
                    .map(Value::String)
                    .map_err(|_| CodecError::InvalidUtf8("string"))
            }
            TYPE_BINARY => Ok(Value::Binary(Bytes::copy_from_slice(
                self.data(extra, "binary")?,
            ))),
            TYPE_DATETIME => self.datetime().map(Value::DateTime),
            TYPE_STRUCT => {
                let count = self.uint(n, "struct")? as usize;
                let mut members = IndexMap::with_capacity(count.min(1024));
                for _ in 0..count {
                    let name = self.short_name("struct member name")?;
                    let value = self.value_at(depth + 1)?;
                    members.insert(name, value);
                }
                Ok(Value::Struct(members))
            }
            TYPE_ARRAY => {
                let count = self.uint(n, "array")? as usize;
                let mut items = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    items.push(self.value_at(depth + 1)?);
                }
                Ok(Value::Array(items))
            }
            TYPE_NULL => Ok(Value::Nil),
            other => Err(CodecError::UnknownType(other)),
        }
    }

    fn datetime(&mut self) -> Result<DateTime<FixedOffset>> {
        self.need(10, "datetime")?;
        let zone = self.buf.get_i8();
        let _timestamp = self.buf.get_i32_le();
        let mut b = [0u8; 5];
        self.buf.copy_to_slice(&mut b);

        let sec = u32::from((b[0] >> 3) | ((b[1] & 0x01) << 5));
        let min = u32::from((b[1] >> 1) & 0x3f);
        let hour = u32::from((b[1] >> 7) | ((b[2] & 0x0f) << 1));
        let day = u32::from((b[2] >> 4) | ((b[3] & 0x01) << 4));
        let month = u32::from((b[3] >> 1) & 0x0f);
        let year = i32::from(b[3] >> 5) | (i32::from(b[4]) << 3);
        let year = year + YEAR_BASE;

        let invalid = || {
            CodecError::InvalidDateTime(format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02} zone {}",
                year, month, day, hour, min, sec, zone
            ))
        };
        let offset = FixedOffset::east_opt(i32::from(zone) * 900).ok_or_else(invalid)?;
        let naive = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, min, sec))
            .ok_or_else(invalid)?;
        offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(invalid)
    }
}
