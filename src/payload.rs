//! Outbound publish payload values.
//!
//! The facade does not serialize structured data; callers pre-encode anything
//! richer than the scalar forms below.

/// Value published on an MQTT topic.
///
/// Mirrors the payload forms the Airzone API works with: nothing, text, or a
/// scalar number. [`Payload::into_bytes`] renders the exact bytes handed to
/// the transport - an empty payload, the UTF-8 text, or the decimal string of
/// the number. No other transcoding happens.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    /// Zero-length payload.
    #[default]
    Empty,
    /// UTF-8 text, sent as-is.
    Text(String),
    /// Integer, sent as its decimal string.
    Integer(i64),
    /// Floating-point number, sent as its decimal string.
    Float(f64),
}

impl Payload {
    /// Render the wire bytes for this payload.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Payload::Empty => Vec::new(),
            Payload::Text(text) => text.into_bytes(),
            Payload::Integer(value) => value.to_string().into_bytes(),
            Payload::Float(value) => value.to_string().into_bytes(),
        }
    }

    /// Short form tag for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Empty => "empty",
            Payload::Text(_) => "text",
            Payload::Integer(_) => "integer",
            Payload::Float(_) => "float",
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Self {
        Payload::Integer(value)
    }
}

impl From<f64> for Payload {
    fn from(value: f64) -> Self {
        Payload::Float(value)
    }
}
