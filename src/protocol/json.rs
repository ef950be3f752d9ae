//! The base codec: self-describing messages as ordered JSON arrays.
//!
//! A message is `[version, name, type, seqid, payload...]`. Structs are
//! objects keyed by field id, each value wrapped in a single-pair object
//! tagging its type; lists and sets are arrays headed by element tag and
//! count; maps add a key tag and wrap their entries in an object.

use crate::channel::Channel;
use crate::context::Context;
use crate::error::WireError;
use crate::transport::Transport;
use crate::types::{FieldHeader, FieldType, ListHeader, MapHeader, MessageHeader, MessageType};

use super::{Protocol, ProtocolFactory};

/// Wire protocol version, the first element of every message array.
const WIRE_VERSION: u64 = 1;

/// The self-describing JSON codec.
#[derive(Debug)]
pub struct JsonProtocol<T> {
    chan: Channel<T>,
}

impl<T: Transport> JsonProtocol<T> {
    pub fn new(trans: T) -> Self {
        Self {
            chan: Channel::new(trans),
        }
    }

    pub fn transport(&self) -> &T {
        self.chan.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.chan.transport_mut()
    }

    pub fn into_transport(self) -> T {
        self.chan.into_transport()
    }
}

impl<T: Transport> Protocol for JsonProtocol<T> {
    fn write_message_begin(
        &mut self,
        name: &str,
        kind: MessageType,
        seqid: i32,
    ) -> Result<(), WireError> {
        tracing::trace!(method = name, ?kind, seqid, "write message");
        self.chan.push_write(Context::list())?;
        self.chan.write_integer(WIRE_VERSION as i64)?;
        self.chan.write_string(name)?;
        self.chan.write_integer(kind as i64)?;
        self.chan.write_integer(i64::from(seqid))
    }

    fn write_message_end(&mut self) -> Result<(), WireError> {
        self.chan.pop_write()
    }

    fn write_struct_begin(&mut self) -> Result<(), WireError> {
        self.chan.write_struct_begin()
    }

    fn write_struct_end(&mut self) -> Result<(), WireError> {
        self.chan.write_struct_end()
    }

    fn write_field_begin(&mut self, kind: FieldType, id: i16) -> Result<(), WireError> {
        self.chan.write_field_begin(kind, id)
    }

    fn write_field_end(&mut self) -> Result<(), WireError> {
        self.chan.write_field_end()
    }

    fn write_map_begin(
        &mut self,
        key: FieldType,
        value: FieldType,
        size: u32,
    ) -> Result<(), WireError> {
        self.chan.write_map_begin(key, value, size)
    }

    fn write_map_end(&mut self) -> Result<(), WireError> {
        self.chan.write_map_end()
    }

    fn write_list_begin(&mut self, elem: FieldType, size: u32) -> Result<(), WireError> {
        self.chan.write_list_begin(elem, size)
    }

    fn write_list_end(&mut self) -> Result<(), WireError> {
        self.chan.write_list_end()
    }

    fn write_set_begin(&mut self, elem: FieldType, size: u32) -> Result<(), WireError> {
        self.chan.write_list_begin(elem, size)
    }

    fn write_set_end(&mut self) -> Result<(), WireError> {
        self.chan.write_list_end()
    }

    fn write_bool(&mut self, value: bool) -> Result<(), WireError> {
        self.chan.write_bool(value)
    }

    fn write_byte(&mut self, value: i8) -> Result<(), WireError> {
        self.chan.write_byte(value)
    }

    fn write_i16(&mut self, value: i16) -> Result<(), WireError> {
        self.chan.write_integer(i64::from(value))
    }

    fn write_i32(&mut self, value: i32) -> Result<(), WireError> {
        self.chan.write_integer(i64::from(value))
    }

    fn write_i64(&mut self, value: i64) -> Result<(), WireError> {
        self.chan.write_integer(value)
    }

    fn write_double(&mut self, value: f64) -> Result<(), WireError> {
        self.chan.write_double(value)
    }

    fn write_string(&mut self, value: &str) -> Result<(), WireError> {
        self.chan.write_string(value)
    }

    fn write_binary(&mut self, value: &[u8]) -> Result<(), WireError> {
        self.chan.write_base64(value)
    }

    fn read_message_begin(&mut self) -> Result<MessageHeader, WireError> {
        self.chan.push_read(Context::list())?;
        let version: u64 = self.chan.read_integer()?;
        if version != WIRE_VERSION {
            return Err(WireError::BadVersion(format!(
                "message version {version}, expected {WIRE_VERSION}"
            )));
        }
        let name = self.chan.read_string()?;
        let raw_kind: i64 = self.chan.read_integer()?;
        let kind = MessageType::from_i64(raw_kind)
            .ok_or_else(|| WireError::InvalidData(format!("invalid message type {raw_kind}")))?;
        let raw_seqid: u64 = self.chan.read_integer()?;
        let seqid = i32::try_from(raw_seqid)
            .map_err(|_| WireError::SizeLimit(format!("sequence id {raw_seqid} out of range")))?;
        tracing::trace!(method = %name, ?kind, seqid, "read message");
        Ok(MessageHeader { name, kind, seqid })
    }

    fn read_message_end(&mut self) -> Result<(), WireError> {
        self.chan.pop_read()
    }

    fn read_struct_begin(&mut self) -> Result<(), WireError> {
        self.chan.read_struct_begin()
    }

    fn read_struct_end(&mut self) -> Result<(), WireError> {
        self.chan.read_struct_end()
    }

    fn read_field_begin(&mut self) -> Result<Option<FieldHeader>, WireError> {
        self.chan.read_field_begin()
    }

    fn read_field_end(&mut self) -> Result<(), WireError> {
        self.chan.read_field_end()
    }

    fn read_map_begin(&mut self) -> Result<MapHeader, WireError> {
        self.chan.read_map_begin()
    }

    fn read_map_end(&mut self) -> Result<(), WireError> {
        self.chan.read_map_end()
    }

    fn read_list_begin(&mut self) -> Result<ListHeader, WireError> {
        self.chan.read_list_begin()
    }

    fn read_list_end(&mut self) -> Result<(), WireError> {
        self.chan.read_list_end()
    }

    fn read_set_begin(&mut self) -> Result<ListHeader, WireError> {
        self.chan.read_list_begin()
    }

    fn read_set_end(&mut self) -> Result<(), WireError> {
        self.chan.read_list_end()
    }

    fn read_bool(&mut self) -> Result<bool, WireError> {
        self.chan.read_bool()
    }

    fn read_byte(&mut self) -> Result<i8, WireError> {
        self.chan.read_byte()
    }

    fn read_i16(&mut self) -> Result<i16, WireError> {
        self.chan.read_integer()
    }

    fn read_i32(&mut self) -> Result<i32, WireError> {
        self.chan.read_integer()
    }

    fn read_i64(&mut self) -> Result<i64, WireError> {
        self.chan.read_integer()
    }

    fn read_double(&mut self) -> Result<f64, WireError> {
        self.chan.read_double()
    }

    fn read_string(&mut self) -> Result<String, WireError> {
        self.chan.read_string()
    }

    fn read_binary(&mut self) -> Result<Vec<u8>, WireError> {
        self.chan.read_base64()
    }
}

/// Constructs [`JsonProtocol`] instances.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonProtocolFactory;

impl<T: Transport> ProtocolFactory<T> for JsonProtocolFactory {
    type Protocol = JsonProtocol<T>;

    fn protocol(&self, trans: T) -> JsonProtocol<T> {
        JsonProtocol::new(trans)
    }
}
