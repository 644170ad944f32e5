// src/line_protocol.rs
//! InfluxDB line protocol encoding with millisecond timestamps.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt::Write as _;

use crate::point::{FieldValue, MetricPoint};

/// Timestamp precision written into every line; must match the `precision`
/// query parameter of the write request.
pub const PRECISION: &str = "ms";

fn escape_into(out: &mut BytesMut, s: &str, special: &[char]) {
    for c in s.chars() {
        if c == '\n' {
            out.put_slice(b"\\n");
            continue;
        }
        if special.contains(&c) {
            out.put_u8(b'\\');
        }
        let mut buf = [0u8; 4];
        out.put_slice(c.encode_utf8(&mut buf).as_bytes());
    }
}

fn write_measurement(out: &mut BytesMut, s: &str) {
    escape_into(out, s, &[',', ' ']);
}

/// Tag keys, tag values and field keys share one escaping rule.
/// A bare trailing `\` would otherwise swallow the following separator.
fn write_key(out: &mut BytesMut, s: &str) {
    escape_into(out, s, &[',', '=', ' ', '\\']);
}

fn write_field_value(out: &mut BytesMut, value: &FieldValue) {
    match value {
        FieldValue::Integer(i) => {
            let _ = write!(out, "{}i", i);
        }
        FieldValue::Float(f) => {
            let _ = write!(out, "{}", f);
        }
        FieldValue::Boolean(b) => out.put_slice(if *b { b"true" } else { b"false" }),
        FieldValue::String(s) => {
            out.put_u8(b'"');
            escape_into(out, s, &['"', '\\']);
            out.put_u8(b'"');
        }
    }
}

/// Append one point as a single line (no trailing newline)
pub fn encode_point(point: &MetricPoint, out: &mut BytesMut) {
    write_measurement(out, point.measurement());

    for (key, value) in point.tags() {
        // Line protocol has no representation for an empty tag value
        if value.is_empty() {
            continue;
        }
        out.put_u8(b',');
        write_key(out, key);
        out.put_u8(b'=');
        write_key(out, value);
    }

    let mut first = true;
    for (key, value) in point.fields() {
        out.put_u8(if first { b' ' } else { b',' });
        first = false;
        write_key(out, key);
        out.put_u8(b'=');
        write_field_value(out, value);
    }

    let _ = write!(out, " {}", point.timestamp_ms());
}

/// Encode a single point into an owned string
pub fn to_line(point: &MetricPoint) -> String {
    let mut buf = BytesMut::new();
    encode_point(point, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Build newline-separated bodies, starting a new one when the next line
/// would push the current body past `max_size`. Every body holds at least
/// one line.
pub fn build_line_batches(points: &[MetricPoint], max_size: usize) -> Vec<Bytes> {
    let mut batches = Vec::new();
    let mut current_buf = BytesMut::new();
    let mut line = BytesMut::new();

    for point in points {
        line.clear();
        encode_point(point, &mut line);

        let first_in_batch = current_buf.is_empty();
        let line_size = if first_in_batch {
            line.len()
        } else {
            line.len() + 1
        };

        if !first_in_batch && current_buf.len() + line_size > max_size {
            batches.push(current_buf.split().freeze());
        }

        if !current_buf.is_empty() {
            current_buf.put_u8(b'\n');
        }
        current_buf.extend_from_slice(&line);
    }

    if !current_buf.is_empty() {
        batches.push(current_buf.freeze());
    }

    batches
}
