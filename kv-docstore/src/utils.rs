use std::fmt::Write;

pub(crate) const CONFIG_PATH: &str = "config:main";

pub(crate) fn document_path(collection: &str, id: &str) -> String {
    format!("{}:{}", collection, id)
}

pub(crate) fn index_path(collection: &str) -> String {
    format!("index:{}", collection)
}

pub(crate) fn counter_path(url: &str) -> String {
    format!("counter:{}", encode_uri_component(url))
}

/// Percent-encodes everything except ASCII alphanumerics and `-_.!~*'()`.
pub fn encode_uri_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => {
                let _ = write!(out, "%{:02X}", byte);
            }
        }
    }
    out
}

/// 32 lowercase hex chars. Collisions are unlikely, not impossible.
pub(crate) fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
