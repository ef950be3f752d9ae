//! jsonwire — a typed JSON wire codec for RPC type systems.
//!
//! Two interoperable encodings share one contextual grammar engine:
//!
//! - [`JsonProtocol`] — self-describing messages as ordered JSON arrays:
//!   `[version, name, type, seqid, payload...]`, with structs keyed by field
//!   id and every value tagged by a short type identifier.
//! - [`JsonRpcProtocol`] — the same payload conventions inside a strict
//!   JSON-RPC 2.0 envelope (`jsonrpc`, `method`, `params`, `id`, `result`,
//!   `error`).
//!
//! # Architecture
//!
//! - **`transport`** — blocking byte sink/source contract, in-memory buffer,
//!   `std::io` adapter, and the one-byte lookahead reader
//! - **`context`** — the grammar engine: nested syntactic contexts that emit
//!   and consume JSON punctuation and decide number quoting
//! - **`channel`** — primitive readers/writers (strings with escape and
//!   surrogate handling, numbers, Base64 binary, type tags) plus the shared
//!   container grammar, driven by one context stack per byte stream
//! - **`types`** — field types, message kinds, and their wire tags
//! - **`protocol`** — the two codecs behind a common [`Protocol`] trait
//!
//! The wire format is compatible with the Apache Thrift JSON protocol; the
//! RPC variant additionally tolerates unordered envelope fields by staging
//! the inner payload in a scratch buffer.

pub mod channel;
pub mod context;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod types;

mod base64;

pub use error::WireError;
pub use protocol::{
    JsonProtocol, JsonProtocolFactory, JsonRpcProtocol, JsonRpcProtocolFactory, Protocol,
    ProtocolFactory,
};
pub use transport::{IoTransport, MemoryBuffer, Transport};
pub use types::{FieldHeader, FieldType, ListHeader, MapHeader, MessageHeader, MessageType};
