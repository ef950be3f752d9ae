//! Wire type system: field types, message kinds, and their JSON tags.

use crate::error::WireError;

/// Short JSON identifiers for each field type.
pub mod tag {
    pub const BOOL: &str = "tf";
    pub const BYTE: &str = "i8";
    pub const I16: &str = "i16";
    pub const I32: &str = "i32";
    pub const I64: &str = "i64";
    pub const DOUBLE: &str = "dbl";
    pub const STRING: &str = "str";
    pub const STRUCT: &str = "rec";
    pub const MAP: &str = "map";
    pub const LIST: &str = "lst";
    pub const SET: &str = "set";
}

/// The type of a struct field or container element.
///
/// Field stop has no wire identifier (a closing `}` terminates the field
/// list) and is represented by `None` from `read_field_begin` rather than a
/// variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    String,
    Struct,
    Map,
    Set,
    List,
}

impl FieldType {
    /// Returns the JSON tag identifier for this type.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Bool => tag::BOOL,
            Self::Byte => tag::BYTE,
            Self::I16 => tag::I16,
            Self::I32 => tag::I32,
            Self::I64 => tag::I64,
            Self::Double => tag::DOUBLE,
            Self::String => tag::STRING,
            Self::Struct => tag::STRUCT,
            Self::Map => tag::MAP,
            Self::Set => tag::SET,
            Self::List => tag::LIST,
        }
    }

    /// Parses a JSON tag identifier back into a field type.
    pub fn from_tag(name: &str) -> Result<Self, WireError> {
        match name {
            tag::BOOL => Ok(Self::Bool),
            tag::BYTE => Ok(Self::Byte),
            tag::I16 => Ok(Self::I16),
            tag::I32 => Ok(Self::I32),
            tag::I64 => Ok(Self::I64),
            tag::DOUBLE => Ok(Self::Double),
            tag::STRING => Ok(Self::String),
            tag::STRUCT => Ok(Self::Struct),
            tag::MAP => Ok(Self::Map),
            tag::SET => Ok(Self::Set),
            tag::LIST => Ok(Self::List),
            _ => Err(WireError::NotImplemented(format!(
                "unrecognized type tag: {name:?}"
            ))),
        }
    }
}

/// The kind of an RPC message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum MessageType {
    Call = 1,
    Reply = 2,
    Exception = 3,
    Oneway = 4,
}

impl MessageType {
    /// Try to convert from the wire integer encoding.
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Call),
            2 => Some(Self::Reply),
            3 => Some(Self::Exception),
            4 => Some(Self::Oneway),
            _ => None,
        }
    }
}

/// Parsed message header.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageHeader {
    pub name: String,
    pub kind: MessageType,
    pub seqid: i32,
}

/// Parsed field header; `read_field_begin` yields `None` at the last field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHeader {
    pub id: i16,
    pub kind: FieldType,
}

/// Parsed map header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapHeader {
    pub key: FieldType,
    pub value: FieldType,
    pub size: u32,
}

/// Parsed list or set header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListHeader {
    pub elem: FieldType,
    pub size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        let all = [
            FieldType::Bool,
            FieldType::Byte,
            FieldType::I16,
            FieldType::I32,
            FieldType::I64,
            FieldType::Double,
            FieldType::String,
            FieldType::Struct,
            FieldType::Map,
            FieldType::Set,
            FieldType::List,
        ];
        for kind in all {
            assert_eq!(FieldType::from_tag(kind.tag()).unwrap(), kind);
        }
    }

    #[test]
    fn tag_identifiers_are_wire_exact() {
        assert_eq!(FieldType::Bool.tag(), "tf");
        assert_eq!(FieldType::Byte.tag(), "i8");
        assert_eq!(FieldType::Double.tag(), "dbl");
        assert_eq!(FieldType::Struct.tag(), "rec");
        assert_eq!(FieldType::List.tag(), "lst");
    }

    #[test]
    fn unknown_tag_is_not_implemented() {
        assert!(matches!(
            FieldType::from_tag("i128"),
            Err(WireError::NotImplemented(_))
        ));
        assert!(matches!(
            FieldType::from_tag(""),
            Err(WireError::NotImplemented(_))
        ));
    }

    #[test]
    fn message_type_from_wire_integer() {
        assert_eq!(MessageType::from_i64(1), Some(MessageType::Call));
        assert_eq!(MessageType::from_i64(4), Some(MessageType::Oneway));
        assert_eq!(MessageType::from_i64(0), None);
        assert_eq!(MessageType::from_i64(5), None);
    }
}
