//! The JSON-RPC 2.0 envelope codec.
//!
//! The payload keeps the base codec's conventions, but the outer framing is
//! a strict JSON-RPC 2.0 object. Because JSON objects are unordered, the
//! read side scans the complete envelope first, staging any `params`,
//! `result`, or `data` payload verbatim into a scratch buffer; struct reads
//! then run against that buffer. I/O is therefore split across two channels
//! behind an explicit mode switch.

use bitflags::bitflags;

use crate::channel::Channel;
use crate::context::{OBJECT_END, OBJECT_START};
use crate::error::WireError;
use crate::transport::{MemoryBuffer, Transport};
use crate::types::{FieldHeader, FieldType, ListHeader, MapHeader, MessageHeader, MessageType};

use super::{Protocol, ProtocolFactory};

const KEY_JSONRPC: &str = "jsonrpc";
const KEY_METHOD: &str = "method";
const KEY_PARAMS: &str = "params";
const KEY_ID: &str = "id";
const KEY_RESULT: &str = "result";
const KEY_ERROR: &str = "error";
const KEY_CODE: &str = "code";
const KEY_MESSAGE: &str = "message";
const KEY_DATA: &str = "data";

const RPC_VERSION: &str = "2.0";

/// Fixed error object for exception replies; the application exception is
/// serialized into `data`.
const EXCEPTION_CODE: i32 = -32000;
const EXCEPTION_MESSAGE: &str = "Thrift exception";

bitflags! {
    /// Envelope fields seen so far in the current message.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct RpcFlags: u8 {
        const VERSION  = 1 << 0;
        const METHOD   = 1 << 1;
        const ID       = 1 << 2;
        const PARAMS   = 1 << 3;
        const RESULT   = 1 << 4;
        const ERR_CODE = 1 << 5;
        const ERR_MSG  = 1 << 6;
        const ERR_DATA = 1 << 7;

        // The recognized complete envelopes.
        const REQUEST = Self::VERSION.bits() | Self::ID.bits() | Self::METHOD.bits();
        const FULL_REQUEST = Self::REQUEST.bits() | Self::PARAMS.bits();
        const NOTIFICATION = Self::VERSION.bits() | Self::METHOD.bits();
        const FULL_NOTIFICATION = Self::NOTIFICATION.bits() | Self::PARAMS.bits();
        const RESPONSE = Self::VERSION.bits() | Self::ID.bits() | Self::RESULT.bits();
        const ERROR = Self::VERSION.bits()
            | Self::ID.bits()
            | Self::ERR_CODE.bits()
            | Self::ERR_MSG.bits();
        const FULL_ERROR = Self::ERROR.bits() | Self::ERR_DATA.bits();
    }
}

/// Envelope fields recorded while writing or scanning a message.
#[derive(Debug, Default, Clone)]
struct RpcMessage {
    method: String,
    id: i32,
    error_code: i32,
    error_message: String,
}

/// Which channel the primitive operations drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RwMode {
    Transport,
    Buffered,
}

/// Runs a channel operation against whichever channel the mode selects.
macro_rules! chan {
    ($self:ident, $chan:ident => $op:expr) => {
        match $self.mode {
            RwMode::Transport => {
                let $chan = &mut $self.transport;
                $op
            }
            RwMode::Buffered => {
                let $chan = &mut $self.scratch;
                $op
            }
        }
    };
}

/// The JSON-RPC 2.0 codec.
#[derive(Debug)]
pub struct JsonRpcProtocol<T> {
    mode: RwMode,
    flags: RpcFlags,
    message: RpcMessage,
    /// Error envelopes defer the `data` key until the payload struct begins.
    data_pending: bool,
    transport: Channel<T>,
    scratch: Channel<MemoryBuffer>,
}

impl<T: Transport> JsonRpcProtocol<T> {
    pub fn new(trans: T) -> Self {
        Self {
            mode: RwMode::Transport,
            flags: RpcFlags::empty(),
            message: RpcMessage::default(),
            data_pending: false,
            transport: Channel::new(trans),
            scratch: Channel::new(MemoryBuffer::new()),
        }
    }

    pub fn transport(&self) -> &T {
        self.transport.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.transport.transport_mut()
    }

    pub fn into_transport(self) -> T {
        self.transport.into_transport()
    }

    fn reset_scratch(&mut self) {
        self.scratch.reset();
        self.scratch.transport_mut().reset();
        self.flags = RpcFlags::empty();
        self.data_pending = false;
    }

    /// Failure cleanup so the instance is reusable at the next message
    /// boundary.
    fn reset_after_failure(&mut self) {
        self.reset_scratch();
        self.transport.reset();
        self.mode = RwMode::Transport;
    }

    fn write_message_begin_inner(
        &mut self,
        name: &str,
        kind: MessageType,
        seqid: i32,
    ) -> Result<(), WireError> {
        tracing::trace!(method = name, ?kind, seqid, "write envelope");
        self.mode = RwMode::Transport;
        self.reset_scratch();
        self.message = RpcMessage::default();
        self.flags = RpcFlags::VERSION;

        self.write_struct_begin()?;
        self.write_string(KEY_JSONRPC)?;
        self.write_string(RPC_VERSION)?;

        match kind {
            MessageType::Call => {
                self.message.method = name.to_string();
                self.message.id = seqid;
                self.flags = RpcFlags::REQUEST;
                self.write_string(KEY_METHOD)?;
                self.write_string(name)?;
                self.write_string(KEY_PARAMS)?;
            }
            MessageType::Oneway => {
                self.message.method = name.to_string();
                self.flags = RpcFlags::NOTIFICATION;
                self.write_string(KEY_METHOD)?;
                self.write_string(name)?;
                self.write_string(KEY_PARAMS)?;
            }
            MessageType::Reply => {
                self.message.id = seqid;
                self.flags = RpcFlags::RESPONSE;
                self.write_string(KEY_RESULT)?;
            }
            MessageType::Exception => {
                self.message.id = seqid;
                self.message.error_code = EXCEPTION_CODE;
                self.message.error_message = EXCEPTION_MESSAGE.to_string();
                self.flags = RpcFlags::ERROR;
                self.write_string(KEY_ERROR)?;
                self.write_struct_begin()?;
                self.write_string(KEY_CODE)?;
                self.write_i32(EXCEPTION_CODE)?;
                self.write_string(KEY_MESSAGE)?;
                self.write_string(EXCEPTION_MESSAGE)?;
                // "data" is deferred until the caller opens its payload
                // struct; a dataless exception gets an empty object at
                // message end.
                self.data_pending = true;
            }
        }
        Ok(())
    }

    fn write_message_end_inner(&mut self) -> Result<(), WireError> {
        let id = self.message.id;
        match self.flags {
            f if f == RpcFlags::REQUEST
                || f == RpcFlags::FULL_REQUEST
                || f == RpcFlags::RESPONSE =>
            {
                self.write_string(KEY_ID)?;
                self.write_i32(id)?;
            }
            f if f == RpcFlags::FULL_ERROR => {
                self.write_struct_end()?;
                self.write_string(KEY_ID)?;
                self.write_i32(id)?;
            }
            f if f == RpcFlags::ERROR => {
                // The caller never wrote a payload.
                self.data_pending = false;
                self.write_string(KEY_DATA)?;
                self.write_struct_begin()?;
                self.write_struct_end()?;
                self.write_struct_end()?;
                self.write_string(KEY_ID)?;
                self.write_i32(id)?;
            }
            f if f == RpcFlags::NOTIFICATION || f == RpcFlags::FULL_NOTIFICATION => {}
            _ => {
                self.reset_scratch();
                return Err(WireError::InvalidData(
                    "invalid JSON-RPC message state".into(),
                ));
            }
        }
        self.write_struct_end()?;
        self.reset_scratch();
        Ok(())
    }

    fn read_message_begin_inner(&mut self) -> Result<MessageHeader, WireError> {
        self.mode = RwMode::Transport;
        self.reset_scratch();
        self.message = RpcMessage::default();

        // JSON objects are unordered: scan the complete envelope before
        // interpreting it, staging any payload into the scratch buffer.
        self.read_struct_begin()?;
        while self.transport.peek()? != OBJECT_END {
            self.read_envelope_field()?;
        }
        self.read_struct_end()?;

        let header = match self.flags {
            f if f == RpcFlags::REQUEST || f == RpcFlags::FULL_REQUEST => {
                if f == RpcFlags::REQUEST {
                    self.synthesize_empty_payload()?;
                }
                MessageHeader {
                    name: self.message.method.clone(),
                    kind: MessageType::Call,
                    seqid: self.message.id,
                }
            }
            f if f == RpcFlags::NOTIFICATION || f == RpcFlags::FULL_NOTIFICATION => {
                if f == RpcFlags::NOTIFICATION {
                    self.synthesize_empty_payload()?;
                }
                MessageHeader {
                    name: self.message.method.clone(),
                    kind: MessageType::Oneway,
                    // Notifications carry no id.
                    seqid: 0,
                }
            }
            f if f == RpcFlags::RESPONSE => MessageHeader {
                // Responses carry no method name; replies match by seqid.
                name: String::new(),
                kind: MessageType::Reply,
                seqid: self.message.id,
            },
            f if f == RpcFlags::ERROR || f == RpcFlags::FULL_ERROR => {
                if f == RpcFlags::ERROR {
                    self.synthesize_empty_payload()?;
                }
                MessageHeader {
                    name: String::new(),
                    kind: MessageType::Exception,
                    seqid: self.message.id,
                }
            }
            f => {
                return Err(WireError::InvalidData(format!(
                    "invalid JSON-RPC field combination: {f:?}"
                )));
            }
        };

        tracing::trace!(
            method = %header.name,
            kind = ?header.kind,
            seqid = header.seqid,
            "read envelope"
        );
        self.mode = RwMode::Buffered;
        Ok(header)
    }

    /// Reads one envelope key and its value, recording what was seen.
    fn read_envelope_field(&mut self) -> Result<(), WireError> {
        let key = self.read_string()?;
        match key.as_str() {
            KEY_JSONRPC => {
                let version = self.read_string()?;
                if version != RPC_VERSION {
                    return Err(WireError::BadVersion(format!(
                        "jsonrpc version {version:?}, expected \"2.0\""
                    )));
                }
                self.flags |= RpcFlags::VERSION;
            }
            KEY_METHOD => {
                self.message.method = self.read_string()?;
                self.flags |= RpcFlags::METHOD;
            }
            KEY_ID => {
                self.message.id = self.read_i32()?;
                self.flags |= RpcFlags::ID;
            }
            KEY_PARAMS => {
                self.capture_payload()?;
                self.flags |= RpcFlags::PARAMS;
            }
            KEY_RESULT => {
                self.capture_payload()?;
                self.flags |= RpcFlags::RESULT;
            }
            KEY_ERROR => {
                self.read_struct_begin()?;
                // The nested error object (code, message, data) is unordered
                // too; it must not be empty.
                loop {
                    self.read_envelope_field()?;
                    if self.transport.peek()? == OBJECT_END {
                        break;
                    }
                }
                self.read_struct_end()?;
            }
            KEY_CODE => {
                self.message.error_code = self.read_i32()?;
                self.flags |= RpcFlags::ERR_CODE;
            }
            KEY_MESSAGE => {
                self.message.error_message = self.read_string()?;
                self.flags |= RpcFlags::ERR_MSG;
            }
            KEY_DATA => {
                self.capture_payload()?;
                self.flags |= RpcFlags::ERR_DATA;
            }
            other => {
                return Err(WireError::InvalidData(format!(
                    "unknown JSON-RPC keyword {other:?}"
                )));
            }
        }
        Ok(())
    }

    /// Copies the next object literal from the transport into the scratch
    /// buffer without parsing it.
    fn capture_payload(&mut self) -> Result<(), WireError> {
        let Self {
            transport, scratch, ..
        } = self;
        transport.read_object_into(scratch.transport_mut())
    }

    /// Downstream struct readers need a valid empty struct when the envelope
    /// left the payload out.
    fn synthesize_empty_payload(&mut self) -> Result<(), WireError> {
        self.scratch
            .transport_mut()
            .write(&[OBJECT_START, OBJECT_END])
    }
}

impl<T: Transport> Protocol for JsonRpcProtocol<T> {
    fn write_message_begin(
        &mut self,
        name: &str,
        kind: MessageType,
        seqid: i32,
    ) -> Result<(), WireError> {
        let result = self.write_message_begin_inner(name, kind, seqid);
        if result.is_err() {
            self.reset_after_failure();
        }
        result
    }

    fn write_message_end(&mut self) -> Result<(), WireError> {
        let result = self.write_message_end_inner();
        if result.is_err() {
            self.reset_after_failure();
        }
        result
    }

    fn write_struct_begin(&mut self) -> Result<(), WireError> {
        if self.data_pending {
            self.data_pending = false;
            self.write_string(KEY_DATA)?;
            self.flags = RpcFlags::FULL_ERROR;
        }
        chan!(self, c => c.write_struct_begin())
    }

    fn write_struct_end(&mut self) -> Result<(), WireError> {
        chan!(self, c => c.write_struct_end())
    }

    fn write_field_begin(&mut self, kind: FieldType, id: i16) -> Result<(), WireError> {
        chan!(self, c => c.write_field_begin(kind, id))
    }

    fn write_field_end(&mut self) -> Result<(), WireError> {
        chan!(self, c => c.write_field_end())
    }

    fn write_map_begin(
        &mut self,
        key: FieldType,
        value: FieldType,
        size: u32,
    ) -> Result<(), WireError> {
        chan!(self, c => c.write_map_begin(key, value, size))
    }

    fn write_map_end(&mut self) -> Result<(), WireError> {
        chan!(self, c => c.write_map_end())
    }

    fn write_list_begin(&mut self, elem: FieldType, size: u32) -> Result<(), WireError> {
        chan!(self, c => c.write_list_begin(elem, size))
    }

    fn write_list_end(&mut self) -> Result<(), WireError> {
        chan!(self, c => c.write_list_end())
    }

    fn write_set_begin(&mut self, elem: FieldType, size: u32) -> Result<(), WireError> {
        chan!(self, c => c.write_list_begin(elem, size))
    }

    fn write_set_end(&mut self) -> Result<(), WireError> {
        chan!(self, c => c.write_list_end())
    }

    fn write_bool(&mut self, value: bool) -> Result<(), WireError> {
        chan!(self, c => c.write_bool(value))
    }

    fn write_byte(&mut self, value: i8) -> Result<(), WireError> {
        chan!(self, c => c.write_byte(value))
    }

    fn write_i16(&mut self, value: i16) -> Result<(), WireError> {
        chan!(self, c => c.write_integer(i64::from(value)))
    }

    fn write_i32(&mut self, value: i32) -> Result<(), WireError> {
        chan!(self, c => c.write_integer(i64::from(value)))
    }

    fn write_i64(&mut self, value: i64) -> Result<(), WireError> {
        chan!(self, c => c.write_integer(value))
    }

    fn write_double(&mut self, value: f64) -> Result<(), WireError> {
        chan!(self, c => c.write_double(value))
    }

    fn write_string(&mut self, value: &str) -> Result<(), WireError> {
        chan!(self, c => c.write_string(value))
    }

    fn write_binary(&mut self, value: &[u8]) -> Result<(), WireError> {
        chan!(self, c => c.write_base64(value))
    }

    fn read_message_begin(&mut self) -> Result<MessageHeader, WireError> {
        let result = self.read_message_begin_inner();
        if result.is_err() {
            self.reset_after_failure();
        }
        result
    }

    fn read_message_end(&mut self) -> Result<(), WireError> {
        self.reset_scratch();
        self.mode = RwMode::Transport;
        Ok(())
    }

    fn read_struct_begin(&mut self) -> Result<(), WireError> {
        chan!(self, c => c.read_struct_begin())
    }

    fn read_struct_end(&mut self) -> Result<(), WireError> {
        chan!(self, c => c.read_struct_end())
    }

    fn read_field_begin(&mut self) -> Result<Option<FieldHeader>, WireError> {
        chan!(self, c => c.read_field_begin())
    }

    fn read_field_end(&mut self) -> Result<(), WireError> {
        chan!(self, c => c.read_field_end())
    }

    fn read_map_begin(&mut self) -> Result<MapHeader, WireError> {
        chan!(self, c => c.read_map_begin())
    }

    fn read_map_end(&mut self) -> Result<(), WireError> {
        chan!(self, c => c.read_map_end())
    }

    fn read_list_begin(&mut self) -> Result<ListHeader, WireError> {
        chan!(self, c => c.read_list_begin())
    }

    fn read_list_end(&mut self) -> Result<(), WireError> {
        chan!(self, c => c.read_list_end())
    }

    fn read_set_begin(&mut self) -> Result<ListHeader, WireError> {
        chan!(self, c => c.read_list_begin())
    }

    fn read_set_end(&mut self) -> Result<(), WireError> {
        chan!(self, c => c.read_list_end())
    }

    fn read_bool(&mut self) -> Result<bool, WireError> {
        chan!(self, c => c.read_bool())
    }

    fn read_byte(&mut self) -> Result<i8, WireError> {
        chan!(self, c => c.read_byte())
    }

    fn read_i16(&mut self) -> Result<i16, WireError> {
        chan!(self, c => c.read_integer())
    }

    fn read_i32(&mut self) -> Result<i32, WireError> {
        chan!(self, c => c.read_integer())
    }

    fn read_i64(&mut self) -> Result<i64, WireError> {
        chan!(self, c => c.read_integer())
    }

    fn read_double(&mut self) -> Result<f64, WireError> {
        chan!(self, c => c.read_double())
    }

    fn read_string(&mut self) -> Result<String, WireError> {
        chan!(self, c => c.read_string())
    }

    fn read_binary(&mut self) -> Result<Vec<u8>, WireError> {
        chan!(self, c => c.read_base64())
    }
}

/// Constructs [`JsonRpcProtocol`] instances.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRpcProtocolFactory;

impl<T: Transport> ProtocolFactory<T> for JsonRpcProtocolFactory {
    type Protocol = JsonRpcProtocol<T>;

    fn protocol(&self, trans: T) -> JsonRpcProtocol<T> {
        JsonRpcProtocol::new(trans)
    }
}
