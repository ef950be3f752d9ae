//! A grammar channel: one context stack plus the byte stream it drives.
//!
//! Every primitive read or write flows through here. Each operation first
//! ticks the innermost context, so the correct JSON punctuation surrounds
//! the value, then encodes or decodes the value itself. The container
//! grammar shared by both codecs (structs, fields, maps, lists, sets) also
//! lives here; the codecs differ only in message framing.

use std::str::FromStr;

use crate::base64;
use crate::context::{
    expect_syntax, Context, ContextStack, BACKSLASH, OBJECT_END, OBJECT_START, STRING_DELIMITER,
};
use crate::error::WireError;
use crate::transport::{LookaheadReader, Transport};
use crate::types::{FieldHeader, FieldType, ListHeader, MapHeader};

// Handling for string bytes below 0x30:
//   0     escape as "\u00xx"
//   1     output verbatim
//   other output as '\' followed by the table value
#[rustfmt::skip]
const ESCAPE_TABLE: [u8; 0x30] = [
    //  0  1  2     3  4  5  6  7  8     9     A     B  C     D     E  F
        0, 0, 0,    0, 0, 0, 0, 0, b'b', b't', b'n', 0, b'f', b'r', 0, 0, // 0x00
        0, 0, 0,    0, 0, 0, 0, 0, 0,    0,    0,    0, 0,    0,    0, 0, // 0x10
        1, 1, b'"', 1, 1, 1, 1, 1, 1,    1,    1,    1, 1,    1,    1, 1, // 0x20
];

// Escape characters legal after '\' and the bytes they stand for.
// '/' is absent: it appears on json.org but not in the RFC.
const ESCAPE_CHARS: &[u8; 7] = b"\"\\bfnrt";
const ESCAPE_CHAR_VALS: [u8; 7] = [b'"', b'\\', 0x08, 0x0C, b'\n', b'\r', b'\t'];

const NAN_TOKEN: &str = "NaN";
const INFINITY_TOKEN: &str = "Infinity";
const NEG_INFINITY_TOKEN: &str = "-Infinity";

fn is_numeric(ch: u8) -> bool {
    matches!(ch, b'+' | b'-' | b'.' | b'0'..=b'9' | b'E' | b'e')
}

fn hex_char(val: u8) -> u8 {
    let val = val & 0x0F;
    if val < 10 {
        val + b'0'
    } else {
        val - 10 + b'a'
    }
}

fn hex_val(ch: u8) -> Result<u8, WireError> {
    match ch {
        b'0'..=b'9' => Ok(ch - b'0'),
        b'a'..=b'f' => Ok(ch - b'a' + 10),
        _ => Err(WireError::InvalidData(format!(
            "expected hex digit ([0-9a-f]), got {:?}",
            ch as char
        ))),
    }
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

fn missing_low_surrogate() -> WireError {
    WireError::InvalidData("missing UTF-16 low surrogate pair".into())
}

fn push_code_point(out: &mut Vec<u8>, cp: u32) -> Result<(), WireError> {
    let c = char::from_u32(cp)
        .ok_or_else(|| WireError::InvalidData(format!("invalid Unicode code point {cp:#06x}")))?;
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    Ok(())
}

fn write_escape_char<T: Transport>(trans: &mut T, ch: u8) -> Result<(), WireError> {
    trans.write(br"\u00")?;
    trans.write(&[hex_char(ch >> 4), hex_char(ch)])
}

fn write_char<T: Transport>(trans: &mut T, ch: u8) -> Result<(), WireError> {
    if ch >= 0x30 {
        // The only special character at or above 0x30 is '\'.
        if ch == BACKSLASH {
            trans.write(&[BACKSLASH, BACKSLASH])
        } else {
            trans.write(&[ch])
        }
    } else {
        match ESCAPE_TABLE[ch as usize] {
            1 => trans.write(&[ch]),
            0 => write_escape_char(trans, ch),
            esc => trans.write(&[BACKSLASH, esc]),
        }
    }
}

fn parse_double(text: &str) -> Result<f64, WireError> {
    text.parse()
        .map_err(|_| WireError::InvalidData(format!("expected numeric value, got {text:?}")))
}

/// A context stack bound to one byte stream.
#[derive(Debug)]
pub struct Channel<T> {
    io: LookaheadReader<T>,
    stack: ContextStack,
}

impl<T: Transport> Channel<T> {
    pub fn new(trans: T) -> Self {
        Self {
            io: LookaheadReader::new(trans),
            stack: ContextStack::new(),
        }
    }

    pub fn transport(&self) -> &T {
        self.io.get_ref()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.io.get_mut()
    }

    pub fn into_transport(self) -> T {
        self.io.into_inner()
    }

    /// Resets the grammar state: context stack to root, lookahead dropped.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.io.clear();
    }

    /// Nesting depth of the context stack (1 = root only).
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Peeks the next byte on the wire without consuming it.
    pub fn peek(&mut self) -> Result<u8, WireError> {
        self.io.peek()
    }

    pub(crate) fn push_write(&mut self, ctx: Context) -> Result<(), WireError> {
        self.stack.push_write(ctx, self.io.get_mut())
    }

    pub(crate) fn pop_write(&mut self) -> Result<(), WireError> {
        self.stack.pop_write(self.io.get_mut())
    }

    pub(crate) fn push_read(&mut self, ctx: Context) -> Result<(), WireError> {
        self.stack.push_read(ctx, &mut self.io)
    }

    pub(crate) fn pop_read(&mut self) -> Result<(), WireError> {
        self.stack.pop_read(&mut self.io)
    }

    // -- Primitive writers --

    pub fn write_string(&mut self, s: &str) -> Result<(), WireError> {
        self.stack.current().write_next(self.io.get_mut())?;
        let trans = self.io.get_mut();
        trans.write(&[STRING_DELIMITER])?;
        for &ch in s.as_bytes() {
            write_char(trans, ch)?;
        }
        trans.write(&[STRING_DELIMITER])
    }

    pub fn write_base64(&mut self, data: &[u8]) -> Result<(), WireError> {
        self.stack.current().write_next(self.io.get_mut())?;
        let trans = self.io.get_mut();
        trans.write(&[STRING_DELIMITER])?;
        let mut out = [0u8; 4];
        for group in data.chunks(3) {
            let n = base64::encode_group(group, &mut out);
            trans.write(&out[..n])?;
        }
        trans.write(&[STRING_DELIMITER])
    }

    pub fn write_integer(&mut self, value: i64) -> Result<(), WireError> {
        self.stack.current().write_next(self.io.get_mut())?;
        let quote = self.stack.escape_num();
        let trans = self.io.get_mut();
        if quote {
            trans.write(&[STRING_DELIMITER])?;
        }
        trans.write(value.to_string().as_bytes())?;
        if quote {
            trans.write(&[STRING_DELIMITER])?;
        }
        Ok(())
    }

    pub fn write_double(&mut self, value: f64) -> Result<(), WireError> {
        self.stack.current().write_next(self.io.get_mut())?;
        let (text, special) = if value.is_nan() {
            (NAN_TOKEN.to_string(), true)
        } else if value.is_infinite() {
            if value.is_sign_negative() {
                (NEG_INFINITY_TOKEN.to_string(), true)
            } else {
                (INFINITY_TOKEN.to_string(), true)
            }
        } else {
            // Canonical shortest round-trip decimal form, '.' separator.
            (value.to_string(), false)
        };
        let quote = special || self.stack.escape_num();
        let trans = self.io.get_mut();
        if quote {
            trans.write(&[STRING_DELIMITER])?;
        }
        trans.write(text.as_bytes())?;
        if quote {
            trans.write(&[STRING_DELIMITER])?;
        }
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<(), WireError> {
        self.write_integer(i64::from(value))
    }

    pub fn write_byte(&mut self, value: i8) -> Result<(), WireError> {
        self.write_integer(i64::from(value))
    }

    pub fn write_type_tag(&mut self, kind: FieldType) -> Result<(), WireError> {
        self.write_string(kind.tag())
    }

    // -- Primitive readers --

    pub fn read_string(&mut self) -> Result<String, WireError> {
        self.stack.current().read_next(&mut self.io)?;
        self.read_quoted_string()
    }

    /// Reads a quoted string without consuming a separator first.
    fn read_quoted_string(&mut self) -> Result<String, WireError> {
        let bytes = self.read_quoted_bytes()?;
        String::from_utf8(bytes)
            .map_err(|e| WireError::InvalidData(format!("invalid UTF-8 in string: {e}")))
    }

    /// Reads the raw unescaped contents of a quoted string.
    ///
    /// `\u` escapes decode as UTF-16 code units: a high surrogate is
    /// buffered until its low partner arrives, and any unpaired surrogate
    /// rejects. All other bytes pass through unchanged.
    fn read_quoted_bytes(&mut self) -> Result<Vec<u8>, WireError> {
        expect_syntax(&mut self.io, STRING_DELIMITER)?;
        let mut out = Vec::new();
        let mut pending: Option<u16> = None;
        loop {
            let mut ch = self.io.read()?;
            if ch == STRING_DELIMITER {
                break;
            }
            if ch == BACKSLASH {
                ch = self.io.read()?;
                if ch == b'u' {
                    let unit = self.read_code_unit()?;
                    if is_high_surrogate(unit) {
                        if pending.replace(unit).is_some() {
                            return Err(missing_low_surrogate());
                        }
                    } else if is_low_surrogate(unit) {
                        match pending.take() {
                            Some(high) => {
                                let cp = 0x10000
                                    + (u32::from(high - 0xD800) << 10)
                                    + u32::from(unit - 0xDC00);
                                push_code_point(&mut out, cp)?;
                            }
                            None => {
                                return Err(WireError::InvalidData(
                                    "missing UTF-16 high surrogate pair".into(),
                                ));
                            }
                        }
                    } else {
                        if pending.is_some() {
                            return Err(missing_low_surrogate());
                        }
                        push_code_point(&mut out, u32::from(unit))?;
                    }
                    continue;
                }
                ch = match ESCAPE_CHARS.iter().position(|&e| e == ch) {
                    Some(pos) => ESCAPE_CHAR_VALS[pos],
                    None => {
                        return Err(WireError::InvalidData(format!(
                            "unknown escape character {:?}",
                            ch as char
                        )));
                    }
                };
            }
            if pending.is_some() {
                return Err(missing_low_surrogate());
            }
            out.push(ch);
        }
        if pending.is_some() {
            return Err(missing_low_surrogate());
        }
        Ok(out)
    }

    /// Reads the four hex digits of a `\u` escape into a UTF-16 code unit.
    fn read_code_unit(&mut self) -> Result<u16, WireError> {
        let mut unit = 0u16;
        for _ in 0..4 {
            unit = (unit << 4) | u16::from(hex_val(self.io.read()?)?);
        }
        Ok(unit)
    }

    pub fn read_base64(&mut self) -> Result<Vec<u8>, WireError> {
        self.stack.current().read_next(&mut self.io)?;
        let mut text = self.read_quoted_bytes()?;

        // Tolerate padded input.
        let mut len = text.len();
        for _ in 0..2 {
            if len > 0 && text[len - 1] == b'=' {
                len -= 1;
            } else {
                break;
            }
        }
        text.truncate(len);

        let mut out = Vec::with_capacity(len / 4 * 3 + 2);
        let mut group = [0u8; 3];
        for chunk in text.chunks(4) {
            if chunk.len() < 2 {
                // A lone trailing byte carries no full octet; drop it so
                // binary reads can skip over plain string fields.
                break;
            }
            let n = base64::decode_group(chunk, &mut group);
            out.extend_from_slice(&group[..n]);
        }
        Ok(out)
    }

    pub fn read_integer<N: FromStr>(&mut self) -> Result<N, WireError> {
        self.stack.current().read_next(&mut self.io)?;
        let quoted = self.stack.escape_num();
        if quoted {
            expect_syntax(&mut self.io, STRING_DELIMITER)?;
        }
        let text = self.read_numeric_chars()?;
        let num = text
            .parse()
            .map_err(|_| WireError::InvalidData(format!("expected numeric value, got {text:?}")))?;
        if quoted {
            expect_syntax(&mut self.io, STRING_DELIMITER)?;
        }
        Ok(num)
    }

    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        match self.read_integer::<i64>()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WireError::InvalidData(format!(
                "expected boolean 0 or 1, got {other}"
            ))),
        }
    }

    pub fn read_byte(&mut self) -> Result<i8, WireError> {
        // Travels as its 16-bit decimal form; reject anything that does not
        // narrow.
        let wide: i16 = self.read_integer()?;
        i8::try_from(wide)
            .map_err(|_| WireError::InvalidData(format!("byte value {wide} out of range")))
    }

    pub fn read_double(&mut self) -> Result<f64, WireError> {
        self.stack.current().read_next(&mut self.io)?;
        if self.io.peek()? == STRING_DELIMITER {
            let text = self.read_quoted_string()?;
            return match text.as_str() {
                NAN_TOKEN => Ok(f64::NAN),
                INFINITY_TOKEN => Ok(f64::INFINITY),
                NEG_INFINITY_TOKEN => Ok(f64::NEG_INFINITY),
                _ => {
                    if !self.stack.escape_num() {
                        return Err(WireError::InvalidData(
                            "numeric data unexpectedly quoted".into(),
                        ));
                    }
                    parse_double(&text)
                }
            };
        }
        if self.stack.escape_num() {
            return Err(WireError::InvalidData(
                "expected quoted number in key position".into(),
            ));
        }
        let text = self.read_numeric_chars()?;
        parse_double(&text)
    }

    pub fn read_type_tag(&mut self) -> Result<FieldType, WireError> {
        let name = self.read_string()?;
        FieldType::from_tag(&name)
    }

    /// Consumes the maximal run of JSON numeric characters.
    fn read_numeric_chars(&mut self) -> Result<String, WireError> {
        let mut text = String::new();
        loop {
            let ch = self.io.peek()?;
            if !is_numeric(ch) {
                break;
            }
            self.io.read()?;
            text.push(ch as char);
        }
        Ok(text)
    }

    /// Copies a complete JSON object literal, from its `{` through the
    /// balanced `}`, verbatim into `buf`.
    ///
    /// Braces inside string literals do not count toward nesting, and escape
    /// sequences within strings are honored.
    pub fn read_object_into<W: Transport>(&mut self, buf: &mut W) -> Result<(), WireError> {
        self.stack.current().read_next(&mut self.io)?;
        expect_syntax(&mut self.io, OBJECT_START)?;
        buf.write(&[OBJECT_START])?;
        let mut nesting = 1u32;
        let mut in_string = false;
        let mut escaped = false;
        while nesting > 0 {
            let ch = self.io.read()?;
            buf.write(&[ch])?;
            if escaped {
                escaped = false;
            } else if in_string {
                match ch {
                    BACKSLASH => escaped = true,
                    STRING_DELIMITER => in_string = false,
                    _ => {}
                }
            } else {
                match ch {
                    STRING_DELIMITER => in_string = true,
                    OBJECT_START => nesting += 1,
                    OBJECT_END => nesting -= 1,
                    _ => {}
                }
            }
        }
        Ok(())
    }

    // -- Container grammar shared by both codecs --

    pub fn write_struct_begin(&mut self) -> Result<(), WireError> {
        self.push_write(Context::pair())
    }

    pub fn write_struct_end(&mut self) -> Result<(), WireError> {
        self.pop_write()
    }

    pub fn read_struct_begin(&mut self) -> Result<(), WireError> {
        self.push_read(Context::pair())
    }

    pub fn read_struct_end(&mut self) -> Result<(), WireError> {
        self.pop_read()
    }

    /// Field id as an object key (auto-quoted), then the tagged value
    /// wrapper.
    pub fn write_field_begin(&mut self, kind: FieldType, id: i16) -> Result<(), WireError> {
        self.write_integer(i64::from(id))?;
        self.push_write(Context::pair())?;
        self.write_type_tag(kind)
    }

    pub fn write_field_end(&mut self) -> Result<(), WireError> {
        self.pop_write()
    }

    /// Returns `None` when the enclosing struct's `}` is next, consuming
    /// nothing.
    pub fn read_field_begin(&mut self) -> Result<Option<FieldHeader>, WireError> {
        if self.peek()? == OBJECT_END {
            return Ok(None);
        }
        let raw: u64 = self.read_integer()?;
        let id = i16::try_from(raw)
            .map_err(|_| WireError::SizeLimit(format!("field id {raw} out of range")))?;
        self.push_read(Context::pair())?;
        let kind = self.read_type_tag()?;
        Ok(Some(FieldHeader { id, kind }))
    }

    pub fn read_field_end(&mut self) -> Result<(), WireError> {
        self.pop_read()
    }

    pub fn write_map_begin(
        &mut self,
        key: FieldType,
        value: FieldType,
        size: u32,
    ) -> Result<(), WireError> {
        self.push_write(Context::list())?;
        self.write_type_tag(key)?;
        self.write_type_tag(value)?;
        self.write_integer(i64::from(size))?;
        self.push_write(Context::pair())
    }

    pub fn write_map_end(&mut self) -> Result<(), WireError> {
        self.pop_write()?;
        self.pop_write()
    }

    pub fn read_map_begin(&mut self) -> Result<MapHeader, WireError> {
        self.push_read(Context::list())?;
        let key = self.read_type_tag()?;
        let value = self.read_type_tag()?;
        let size = self.read_size()?;
        self.push_read(Context::pair())?;
        Ok(MapHeader { key, value, size })
    }

    pub fn read_map_end(&mut self) -> Result<(), WireError> {
        self.pop_read()?;
        self.pop_read()
    }

    pub fn write_list_begin(&mut self, elem: FieldType, size: u32) -> Result<(), WireError> {
        self.push_write(Context::list())?;
        self.write_type_tag(elem)?;
        self.write_integer(i64::from(size))
    }

    pub fn write_list_end(&mut self) -> Result<(), WireError> {
        self.pop_write()
    }

    pub fn read_list_begin(&mut self) -> Result<ListHeader, WireError> {
        self.push_read(Context::list())?;
        let elem = self.read_type_tag()?;
        let size = self.read_size()?;
        Ok(ListHeader { elem, size })
    }

    pub fn read_list_end(&mut self) -> Result<(), WireError> {
        self.pop_read()
    }

    fn read_size(&mut self) -> Result<u32, WireError> {
        let size: u64 = self.read_integer()?;
        u32::try_from(size)
            .map_err(|_| WireError::SizeLimit(format!("container size {size} exceeds limit")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryBuffer;

    fn channel() -> Channel<MemoryBuffer> {
        Channel::new(MemoryBuffer::new())
    }

    fn channel_with(input: &[u8]) -> Channel<MemoryBuffer> {
        let mut buf = MemoryBuffer::new();
        buf.write(input).unwrap();
        Channel::new(buf)
    }

    fn written(chan: &Channel<MemoryBuffer>) -> &str {
        std::str::from_utf8(chan.transport().bytes()).unwrap()
    }

    #[test]
    fn write_string_plain() {
        let mut chan = channel();
        chan.write_string("hello").unwrap();
        assert_eq!(written(&chan), "\"hello\"");
    }

    #[test]
    fn write_string_escapes() {
        let mut chan = channel();
        chan.write_string("a\"b\\c\nd\t").unwrap();
        assert_eq!(written(&chan), r#""a\"b\\c\nd\t""#);
    }

    #[test]
    fn write_string_control_chars_as_hex() {
        let mut chan = channel();
        chan.write_string("\u{1}\u{1f}").unwrap();
        assert_eq!(written(&chan), r#""\u0001\u001f""#);
    }

    #[test]
    fn write_string_space_verbatim() {
        let mut chan = channel();
        chan.write_string("a b").unwrap();
        assert_eq!(written(&chan), "\"a b\"");
    }

    #[test]
    fn write_string_passes_utf8_bytes_through() {
        let mut chan = channel();
        chan.write_string("héllo").unwrap();
        assert_eq!(written(&chan), "\"héllo\"");
    }

    #[test]
    fn read_string_unescapes() {
        let mut chan = channel_with(br#""a\"b\\c\nd\t\u0001""#);
        assert_eq!(chan.read_string().unwrap(), "a\"b\\c\nd\t\u{1}");
    }

    #[test]
    fn read_string_surrogate_pair() {
        // U+1D11E (musical G clef) as a surrogate pair.
        let mut chan = channel_with(br#""\ud834\udd1e""#);
        assert_eq!(chan.read_string().unwrap(), "\u{1D11E}");
    }

    #[test]
    fn read_string_rejects_lone_high_surrogate() {
        for input in [&br#""\ud834""#[..], br#""\ud834x""#, br#""\ud834\n""#] {
            let mut chan = channel_with(input);
            assert!(matches!(
                chan.read_string(),
                Err(WireError::InvalidData(_))
            ));
        }
    }

    #[test]
    fn read_string_rejects_lone_low_surrogate() {
        let mut chan = channel_with(br#""\udd1e""#);
        assert!(matches!(chan.read_string(), Err(WireError::InvalidData(_))));
    }

    #[test]
    fn read_string_rejects_unknown_escape() {
        let mut chan = channel_with(br#""\q""#);
        assert!(matches!(chan.read_string(), Err(WireError::InvalidData(_))));
    }

    #[test]
    fn read_string_rejects_bad_hex() {
        let mut chan = channel_with(br#""\u00G1""#);
        assert!(matches!(chan.read_string(), Err(WireError::InvalidData(_))));
    }

    #[test]
    fn base64_emits_without_padding() {
        let mut chan = channel();
        chan.write_base64(b"Ma").unwrap();
        assert_eq!(written(&chan), "\"TWE\"");
    }

    #[test]
    fn base64_round_trip() {
        let payload = b"\x00\x01\xFE\xFF binary!";
        let mut chan = channel();
        chan.write_base64(payload).unwrap();
        let wire = chan.transport().bytes().to_vec();

        let mut chan = channel_with(&wire);
        assert_eq!(chan.read_base64().unwrap(), payload);
    }

    #[test]
    fn base64_accepts_padded_input() {
        let mut chan = channel_with(b"\"TWE=\"");
        assert_eq!(chan.read_base64().unwrap(), b"Ma");

        let mut chan = channel_with(b"\"TQ==\"");
        assert_eq!(chan.read_base64().unwrap(), b"M");
    }

    #[test]
    fn base64_drops_lone_trailing_byte() {
        // 5 chars: one full group plus an undecodable single byte.
        let mut chan = channel_with(b"\"TWFuQ\"");
        assert_eq!(chan.read_base64().unwrap(), b"Man");
    }

    #[test]
    fn integer_unquoted_at_root() {
        let mut chan = channel();
        chan.write_integer(-42).unwrap();
        assert_eq!(written(&chan), "-42");
    }

    #[test]
    fn integer_quoted_in_key_position() {
        let mut chan = channel();
        chan.write_struct_begin().unwrap();
        chan.write_integer(7).unwrap();
        chan.write_integer(8).unwrap();
        chan.write_struct_end().unwrap();
        assert_eq!(written(&chan), "{\"7\":8}");
    }

    #[test]
    fn integer_read_round_trip_in_pairs() {
        let mut chan = channel_with(b"{\"7\":8}");
        chan.read_struct_begin().unwrap();
        assert_eq!(chan.read_integer::<i64>().unwrap(), 7);
        assert_eq!(chan.read_integer::<i64>().unwrap(), 8);
        chan.read_struct_end().unwrap();
    }

    #[test]
    fn integer_rejects_garbage() {
        let mut chan = channel_with(b"1.5e,");
        assert!(matches!(
            chan.read_integer::<i64>(),
            Err(WireError::InvalidData(_))
        ));
    }

    #[test]
    fn byte_rejects_out_of_range() {
        let mut chan = channel_with(b"200,");
        assert!(matches!(chan.read_byte(), Err(WireError::InvalidData(_))));

        let mut chan = channel_with(b"-128,");
        assert_eq!(chan.read_byte().unwrap(), -128);
    }

    #[test]
    fn bool_travels_as_integer() {
        let mut chan = channel();
        chan.write_bool(true).unwrap();
        assert_eq!(written(&chan), "1");

        let mut chan = channel_with(b"0,");
        assert!(!chan.read_bool().unwrap());
        let mut chan = channel_with(b"2,");
        assert!(matches!(chan.read_bool(), Err(WireError::InvalidData(_))));
    }

    #[test]
    fn double_special_tokens() {
        let mut chan = channel();
        chan.write_double(f64::NAN).unwrap();
        assert_eq!(written(&chan), "\"NaN\"");

        let mut chan = channel();
        chan.write_double(f64::INFINITY).unwrap();
        assert_eq!(written(&chan), "\"Infinity\"");

        let mut chan = channel();
        chan.write_double(f64::NEG_INFINITY).unwrap();
        assert_eq!(written(&chan), "\"-Infinity\"");
    }

    #[test]
    fn double_reads_special_tokens() {
        let mut chan = channel_with(b"\"NaN\"");
        assert!(chan.read_double().unwrap().is_nan());

        let mut chan = channel_with(b"\"-Infinity\"");
        assert_eq!(chan.read_double().unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn double_round_trips_finite_values() {
        for value in [0.0, -1.5, 3.141592653589793, 1.0e-300, 1.7976931348623157e308] {
            let mut chan = channel();
            chan.write_double(value).unwrap();
            let mut wire = chan.transport().bytes().to_vec();
            // Terminate the numeric literal the way a container would.
            wire.push(b',');
            let mut chan = channel_with(&wire);
            assert_eq!(chan.read_double().unwrap(), value, "wire: {wire:?}");
        }
    }

    #[test]
    fn double_rejects_quoted_finite_in_value_position() {
        let mut chan = channel_with(b"\"1.5\"");
        assert!(matches!(
            chan.read_double(),
            Err(WireError::InvalidData(_))
        ));
    }

    #[test]
    fn double_quoted_in_key_position() {
        let mut chan = channel();
        chan.write_struct_begin().unwrap();
        chan.write_double(1.5).unwrap();
        chan.write_double(2.5).unwrap();
        chan.write_struct_end().unwrap();
        assert_eq!(written(&chan), "{\"1.5\":2.5}");

        let mut chan = channel_with(b"{\"1.5\":2.5}");
        chan.read_struct_begin().unwrap();
        assert_eq!(chan.read_double().unwrap(), 1.5);
        assert_eq!(chan.read_double().unwrap(), 2.5);
        chan.read_struct_end().unwrap();
    }

    #[test]
    fn read_object_copies_nested_object() {
        let mut chan = channel_with(b"{\"1\":{\"i32\":5}},rest");
        let mut buf = MemoryBuffer::new();
        chan.read_object_into(&mut buf).unwrap();
        assert_eq!(buf.bytes(), b"{\"1\":{\"i32\":5}}");
        assert_eq!(chan.peek().unwrap(), b',');
    }

    #[test]
    fn read_object_ignores_braces_inside_strings() {
        let mut chan = channel_with(br#"{"1":{"str":"a{b}c\"}"}}X"#);
        let mut buf = MemoryBuffer::new();
        chan.read_object_into(&mut buf).unwrap();
        assert_eq!(buf.bytes(), &br#"{"1":{"str":"a{b}c\"}"}}"#[..]);
        assert_eq!(chan.peek().unwrap(), b'X');
    }

    #[test]
    fn field_wire_shape() {
        let mut chan = channel();
        chan.write_struct_begin().unwrap();
        chan.write_field_begin(FieldType::I32, 1).unwrap();
        chan.write_integer(21).unwrap();
        chan.write_field_end().unwrap();
        chan.write_struct_end().unwrap();
        assert_eq!(written(&chan), "{\"1\":{\"i32\":21}}");
    }

    #[test]
    fn field_read_and_stop() {
        let mut chan = channel_with(b"{\"1\":{\"i32\":21}}");
        chan.read_struct_begin().unwrap();
        let field = chan.read_field_begin().unwrap().unwrap();
        assert_eq!(field.id, 1);
        assert_eq!(field.kind, FieldType::I32);
        assert_eq!(chan.read_integer::<i32>().unwrap(), 21);
        chan.read_field_end().unwrap();
        assert!(chan.read_field_begin().unwrap().is_none());
        chan.read_struct_end().unwrap();
        assert_eq!(chan.depth(), 1);
    }

    #[test]
    fn field_id_over_i16_is_size_limit() {
        let mut chan = channel_with(b"{\"40000\":{\"i32\":1}}");
        chan.read_struct_begin().unwrap();
        assert!(matches!(
            chan.read_field_begin(),
            Err(WireError::SizeLimit(_))
        ));
    }

    #[test]
    fn map_wire_shape() {
        let mut chan = channel();
        chan.write_map_begin(FieldType::String, FieldType::I32, 2).unwrap();
        chan.write_string("a").unwrap();
        chan.write_integer(1).unwrap();
        chan.write_string("b").unwrap();
        chan.write_integer(2).unwrap();
        chan.write_map_end().unwrap();
        assert_eq!(written(&chan), "[\"str\",\"i32\",2,{\"a\":1,\"b\":2}]");
    }

    #[test]
    fn map_numeric_keys_are_quoted() {
        let mut chan = channel();
        chan.write_map_begin(FieldType::I32, FieldType::I32, 1).unwrap();
        chan.write_integer(5).unwrap();
        chan.write_integer(7).unwrap();
        chan.write_map_end().unwrap();
        assert_eq!(written(&chan), "[\"i32\",\"i32\",1,{\"5\":7}]");
    }

    #[test]
    fn map_read_round_trip() {
        let mut chan = channel_with(b"[\"i32\",\"i32\",1,{\"5\":7}]");
        let header = chan.read_map_begin().unwrap();
        assert_eq!(header.key, FieldType::I32);
        assert_eq!(header.value, FieldType::I32);
        assert_eq!(header.size, 1);
        assert_eq!(chan.read_integer::<i32>().unwrap(), 5);
        assert_eq!(chan.read_integer::<i32>().unwrap(), 7);
        chan.read_map_end().unwrap();
        assert_eq!(chan.depth(), 1);
    }

    #[test]
    fn list_wire_shape_and_read() {
        let mut chan = channel();
        chan.write_list_begin(FieldType::I16, 3).unwrap();
        for v in [1i64, 2, 3] {
            chan.write_integer(v).unwrap();
        }
        chan.write_list_end().unwrap();
        assert_eq!(written(&chan), "[\"i16\",3,1,2,3]");

        let wire = chan.transport().bytes().to_vec();
        let mut chan = channel_with(&wire);
        let header = chan.read_list_begin().unwrap();
        assert_eq!(header.elem, FieldType::I16);
        assert_eq!(header.size, 3);
        for expected in [1i16, 2, 3] {
            assert_eq!(chan.read_integer::<i16>().unwrap(), expected);
        }
        chan.read_list_end().unwrap();
    }

    #[test]
    fn container_size_over_u32_is_size_limit() {
        let mut chan = channel_with(b"[\"i32\",5000000000]");
        assert!(matches!(
            chan.read_list_begin(),
            Err(WireError::SizeLimit(_))
        ));
    }
}
