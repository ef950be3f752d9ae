//! Byte transports beneath the codec.
//!
//! The codec is synchronous: every primitive operation blocks until its bytes
//! have been written or read. Anything that can sink and source bytes with
//! those semantics can carry the wire format.

use std::io;

use bytes::BytesMut;

use crate::error::WireError;

/// A blocking byte sink/source.
pub trait Transport {
    /// Writes all of `buf`.
    fn write(&mut self, buf: &[u8]) -> Result<(), WireError>;

    /// Fills `buf` completely, failing with [`WireError::Eof`] when the
    /// stream is exhausted first.
    fn read_all(&mut self, buf: &mut [u8]) -> Result<(), WireError>;
}

/// An in-memory transport: writes append, reads consume from the front.
///
/// Also serves as the scratch buffer of the JSON-RPC codec, which stages the
/// inner payload here between envelope parsing and struct reading.
#[derive(Debug, Default)]
pub struct MemoryBuffer {
    buf: BytesMut,
    pos: usize,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards all buffered data and rewinds the read position.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.pos = 0;
    }

    /// Returns the written bytes that have not been consumed yet.
    pub fn bytes(&self) -> &[u8] {
        &self.buf[self.pos..]
    }
}

impl Transport for MemoryBuffer {
    fn write(&mut self, buf: &[u8]) -> Result<(), WireError> {
        self.buf.extend_from_slice(buf);
        Ok(())
    }

    fn read_all(&mut self, buf: &mut [u8]) -> Result<(), WireError> {
        let available = self.buf.len() - self.pos;
        if available < buf.len() {
            return Err(WireError::Eof);
        }
        buf.copy_from_slice(&self.buf[self.pos..self.pos + buf.len()]);
        self.pos += buf.len();
        Ok(())
    }
}

/// Adapts any `Read + Write` stream (a `TcpStream`, a file, a cursor) to the
/// codec's transport contract.
#[derive(Debug)]
pub struct IoTransport<S> {
    stream: S,
}

impl<S> IoTransport<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: io::Read + io::Write> Transport for IoTransport<S> {
    fn write(&mut self, buf: &[u8]) -> Result<(), WireError> {
        self.stream.write_all(buf)?;
        Ok(())
    }

    fn read_all(&mut self, buf: &mut [u8]) -> Result<(), WireError> {
        self.stream.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => WireError::Eof,
            _ => WireError::Io(e),
        })
    }
}

/// Single-byte lookahead over a transport's read side.
///
/// The grammar is LL(1) at every separator, so one byte of buffered
/// lookahead is all the codec ever needs.
#[derive(Debug)]
pub struct LookaheadReader<T> {
    trans: T,
    peeked: Option<u8>,
}

impl<T: Transport> LookaheadReader<T> {
    pub fn new(trans: T) -> Self {
        Self { trans, peeked: None }
    }

    /// Consumes and returns the next byte.
    pub fn read(&mut self) -> Result<u8, WireError> {
        match self.peeked.take() {
            Some(byte) => Ok(byte),
            None => self.read_raw(),
        }
    }

    /// Returns the next byte without consuming it.
    pub fn peek(&mut self) -> Result<u8, WireError> {
        if let Some(byte) = self.peeked {
            return Ok(byte);
        }
        let byte = self.read_raw()?;
        self.peeked = Some(byte);
        Ok(byte)
    }

    fn read_raw(&mut self) -> Result<u8, WireError> {
        let mut byte = [0u8; 1];
        self.trans.read_all(&mut byte)?;
        Ok(byte[0])
    }

    /// Drops any buffered lookahead byte.
    pub fn clear(&mut self) {
        self.peeked = None;
    }

    pub fn get_ref(&self) -> &T {
        &self.trans
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.trans
    }

    pub fn into_inner(self) -> T {
        self.trans
    }
}
