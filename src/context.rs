//! JSON grammar contexts: the separator and quoting engine.
//!
//! A [`Context`] is a node tracking the syntactic position inside one JSON
//! container. Before every primitive emission or consumption the innermost
//! context gets a "next" tick, which emits or expects the punctuation due at
//! that position. The [`ContextStack`] keeps the nesting, its top always
//! mirroring the innermost currently open container.

use crate::error::WireError;
use crate::transport::{LookaheadReader, Transport};

// JSON punctuation.
pub(crate) const OBJECT_START: u8 = b'{';
pub(crate) const OBJECT_END: u8 = b'}';
pub(crate) const ARRAY_START: u8 = b'[';
pub(crate) const ARRAY_END: u8 = b']';
pub(crate) const PAIR_SEPARATOR: u8 = b':';
pub(crate) const ELEM_SEPARATOR: u8 = b',';
pub(crate) const STRING_DELIMITER: u8 = b'"';
pub(crate) const BACKSLASH: u8 = b'\\';

/// Reads one byte and verifies it is the expected punctuation character.
pub(crate) fn expect_syntax<T: Transport>(
    io: &mut LookaheadReader<T>,
    expected: u8,
) -> Result<(), WireError> {
    let got = io.read()?;
    if got != expected {
        return Err(WireError::InvalidData(format!(
            "expected {:?}, got {:?}",
            expected as char, got as char
        )));
    }
    Ok(())
}

/// A grammar node with three behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// Root context: never separates, never quotes.
    Bare,
    /// Object members: alternates `:` and `,`; numbers in key position are
    /// quoted.
    Pair { first: bool, colon: bool },
    /// Array elements: `,` between successive elements.
    List { first: bool },
}

impl Context {
    pub fn pair() -> Self {
        Self::Pair {
            first: true,
            colon: true,
        }
    }

    pub fn list() -> Self {
        Self::List { first: true }
    }

    /// The opening delimiter of this container.
    pub fn open(&self) -> u8 {
        match self {
            Self::Bare | Self::Pair { .. } => OBJECT_START,
            Self::List { .. } => ARRAY_START,
        }
    }

    /// The closing delimiter of this container.
    pub fn close(&self) -> u8 {
        match self {
            Self::Bare | Self::Pair { .. } => OBJECT_END,
            Self::List { .. } => ARRAY_END,
        }
    }

    /// Emits the separator due before the next element at this level.
    pub fn write_next<T: Transport>(&mut self, trans: &mut T) -> Result<(), WireError> {
        match self {
            Self::Bare => Ok(()),
            Self::Pair { first, colon } => {
                if *first {
                    *first = false;
                    *colon = true;
                    Ok(())
                } else {
                    let sep = if *colon { PAIR_SEPARATOR } else { ELEM_SEPARATOR };
                    *colon = !*colon;
                    trans.write(&[sep])
                }
            }
            Self::List { first } => {
                if *first {
                    *first = false;
                    Ok(())
                } else {
                    trans.write(&[ELEM_SEPARATOR])
                }
            }
        }
    }

    /// Consumes the separator due before the next element at this level.
    pub fn read_next<T: Transport>(
        &mut self,
        io: &mut LookaheadReader<T>,
    ) -> Result<(), WireError> {
        match self {
            Self::Bare => Ok(()),
            Self::Pair { first, colon } => {
                if *first {
                    *first = false;
                    *colon = true;
                    Ok(())
                } else {
                    let sep = if *colon { PAIR_SEPARATOR } else { ELEM_SEPARATOR };
                    *colon = !*colon;
                    expect_syntax(io, sep)
                }
            }
            Self::List { first } => {
                if *first {
                    *first = false;
                    Ok(())
                } else {
                    expect_syntax(io, ELEM_SEPARATOR)
                }
            }
        }
    }

    /// Whether the next number at this position must be quoted.
    ///
    /// True only in object-key position: the separator due after it is `:`.
    pub fn escape_num(&self) -> bool {
        matches!(self, Self::Pair { colon: true, .. })
    }
}

/// LIFO of contexts with a distinguished current slot.
#[derive(Debug)]
pub struct ContextStack {
    parents: Vec<Context>,
    current: Context,
}

impl Default for ContextStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStack {
    /// A stack rooted at a single bare context.
    pub fn new() -> Self {
        Self {
            parents: Vec::new(),
            current: Context::Bare,
        }
    }

    pub fn current(&mut self) -> &mut Context {
        &mut self.current
    }

    /// Whether the next number in the current context must be quoted.
    pub fn escape_num(&self) -> bool {
        self.current.escape_num()
    }

    /// Nesting depth including the root context.
    pub fn depth(&self) -> usize {
        self.parents.len() + 1
    }

    /// Resets to a single root context.
    pub fn clear(&mut self) {
        self.parents.clear();
        self.current = Context::Bare;
    }

    /// Opens `ctx` on the write side: ticks the parent, emits the opener.
    pub fn push_write<T: Transport>(
        &mut self,
        ctx: Context,
        trans: &mut T,
    ) -> Result<(), WireError> {
        self.current.write_next(trans)?;
        trans.write(&[ctx.open()])?;
        self.push(ctx);
        Ok(())
    }

    /// Closes the current container on the write side.
    pub fn pop_write<T: Transport>(&mut self, trans: &mut T) -> Result<(), WireError> {
        trans.write(&[self.current.close()])?;
        self.pop();
        Ok(())
    }

    /// Opens `ctx` on the read side: ticks the parent, expects the opener.
    pub fn push_read<T: Transport>(
        &mut self,
        ctx: Context,
        io: &mut LookaheadReader<T>,
    ) -> Result<(), WireError> {
        self.current.read_next(io)?;
        expect_syntax(io, ctx.open())?;
        self.push(ctx);
        Ok(())
    }

    /// Closes the current container on the read side.
    pub fn pop_read<T: Transport>(&mut self, io: &mut LookaheadReader<T>) -> Result<(), WireError> {
        expect_syntax(io, self.current.close())?;
        self.pop();
        Ok(())
    }

    fn push(&mut self, ctx: Context) {
        self.parents.push(std::mem::replace(&mut self.current, ctx));
    }

    fn pop(&mut self) {
        debug_assert!(!self.parents.is_empty(), "context stack underflow");
        self.current = self.parents.pop().unwrap_or(Context::Bare);
    }
}
