//! Error types for the JSON wire codec.

/// Errors that can occur while encoding or decoding the wire format.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// A message or envelope carried the wrong protocol version.
    #[error("bad version: {0}")]
    BadVersion(String),

    /// A syntactic violation: unexpected punctuation, an unknown envelope
    /// key, a malformed escape or surrogate pair, an unparseable number.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// An integer read from the wire exceeds the target range (container
    /// sizes, field ids, sequence ids).
    #[error("size limit exceeded: {0}")]
    SizeLimit(String),

    /// An unrecognized type tag.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// The transport was exhausted mid-value.
    #[error("unexpected end of input")]
    Eof,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
