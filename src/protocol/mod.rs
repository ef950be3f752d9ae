//! The two wire codecs and their shared operation surface.

pub mod json;
pub mod jsonrpc;

pub use json::{JsonProtocol, JsonProtocolFactory};
pub use jsonrpc::{JsonRpcProtocol, JsonRpcProtocolFactory};

use crate::error::WireError;
use crate::transport::Transport;
use crate::types::{FieldHeader, FieldType, ListHeader, MapHeader, MessageHeader, MessageType};

/// The operation surface shared by both codecs.
///
/// Generated struct readers and writers are written against this trait, so a
/// service can swap the envelope style without touching payload code.
pub trait Protocol {
    // -- Writing --

    fn write_message_begin(
        &mut self,
        name: &str,
        kind: MessageType,
        seqid: i32,
    ) -> Result<(), WireError>;
    fn write_message_end(&mut self) -> Result<(), WireError>;

    fn write_struct_begin(&mut self) -> Result<(), WireError>;
    fn write_struct_end(&mut self) -> Result<(), WireError>;

    fn write_field_begin(&mut self, kind: FieldType, id: i16) -> Result<(), WireError>;
    fn write_field_end(&mut self) -> Result<(), WireError>;
    /// The enclosing struct's `}` terminates the field list; nothing is
    /// emitted.
    fn write_field_stop(&mut self) -> Result<(), WireError> {
        Ok(())
    }

    fn write_map_begin(
        &mut self,
        key: FieldType,
        value: FieldType,
        size: u32,
    ) -> Result<(), WireError>;
    fn write_map_end(&mut self) -> Result<(), WireError>;

    fn write_list_begin(&mut self, elem: FieldType, size: u32) -> Result<(), WireError>;
    fn write_list_end(&mut self) -> Result<(), WireError>;

    fn write_set_begin(&mut self, elem: FieldType, size: u32) -> Result<(), WireError>;
    fn write_set_end(&mut self) -> Result<(), WireError>;

    fn write_bool(&mut self, value: bool) -> Result<(), WireError>;
    fn write_byte(&mut self, value: i8) -> Result<(), WireError>;
    fn write_i16(&mut self, value: i16) -> Result<(), WireError>;
    fn write_i32(&mut self, value: i32) -> Result<(), WireError>;
    fn write_i64(&mut self, value: i64) -> Result<(), WireError>;
    fn write_double(&mut self, value: f64) -> Result<(), WireError>;
    fn write_string(&mut self, value: &str) -> Result<(), WireError>;
    fn write_binary(&mut self, value: &[u8]) -> Result<(), WireError>;

    // -- Reading --

    fn read_message_begin(&mut self) -> Result<MessageHeader, WireError>;
    fn read_message_end(&mut self) -> Result<(), WireError>;

    fn read_struct_begin(&mut self) -> Result<(), WireError>;
    fn read_struct_end(&mut self) -> Result<(), WireError>;

    /// `None` signals the last field (the struct's `}` is next).
    fn read_field_begin(&mut self) -> Result<Option<FieldHeader>, WireError>;
    fn read_field_end(&mut self) -> Result<(), WireError>;

    fn read_map_begin(&mut self) -> Result<MapHeader, WireError>;
    fn read_map_end(&mut self) -> Result<(), WireError>;

    fn read_list_begin(&mut self) -> Result<ListHeader, WireError>;
    fn read_list_end(&mut self) -> Result<(), WireError>;

    fn read_set_begin(&mut self) -> Result<ListHeader, WireError>;
    fn read_set_end(&mut self) -> Result<(), WireError>;

    fn read_bool(&mut self) -> Result<bool, WireError>;
    fn read_byte(&mut self) -> Result<i8, WireError>;
    fn read_i16(&mut self) -> Result<i16, WireError>;
    fn read_i32(&mut self) -> Result<i32, WireError>;
    fn read_i64(&mut self) -> Result<i64, WireError>;
    fn read_double(&mut self) -> Result<f64, WireError>;
    fn read_string(&mut self) -> Result<String, WireError>;
    fn read_binary(&mut self) -> Result<Vec<u8>, WireError>;
}

/// Constructs a protocol instance per accepted transport.
pub trait ProtocolFactory<T: Transport> {
    type Protocol: Protocol;

    fn protocol(&self, trans: T) -> Self::Protocol;
}
