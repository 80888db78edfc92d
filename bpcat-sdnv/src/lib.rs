/*!
A codec for the BPv6 self-delimiting numeric value (SDNV): an unsigned
integer encoded big-endian as a sequence of 7-bit groups, with the high bit
set on every byte except the last.

Unlike a plain varint codec, callers need two extra things the wire format
relies on:

- [`Sdnv::encode_padded`] lets a field reserve a *fixed* number of bytes up
  front (by padding with leading `0x80` continuation bytes encoding zero),
  so a later rewrite can overwrite the field in place without shifting any
  byte that follows it.
- [`decode_at`] returns a [`Descriptor`] recording where the value started
  and how wide it was, so [`rewrite`] can later write a new value into
  exactly that slot.

The decoder never panics: malformed or truncated input produces an [`Error`]
variant instead.
*/

mod decode;
mod encode;


pub use decode::{decode, decode_at};
pub use encode::{encode, encode_padded, natural_width};

/// Errors produced while encoding, decoding, or rewriting an SDNV field.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The buffer ended before a terminating byte (high bit clear) was seen.
    #[error("truncated SDNV: need at least {0} more byte(s)")]
    Incomplete(usize),

    /// The accumulated value would not fit in a `u64`.
    #[error("SDNV value overflows 64 bits")]
    Overflow,

    /// [`Sdnv::encode_padded`]/[`rewrite`] was asked to fit a value into
    /// fewer bytes than it needs.
    #[error("value {value} does not fit in {width} byte(s)")]
    WidthTooSmall { value: u64, width: usize },

    /// [`rewrite`] was given a descriptor pointing outside the buffer.
    #[error("SDNV descriptor {0:?} does not fit within the buffer")]
    OutOfBounds(Descriptor),
}

/// Records where a decoded SDNV field lives in its source buffer, so that
/// the field can later be rewritten in place (e.g. `createsec`/`createseq`
/// on origination, or a CTEB's `cid` once custody is accepted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Descriptor {
    /// Byte offset of the first byte of the encoded value within the buffer
    /// it was decoded from.
    pub offset: usize,
    /// Number of bytes the encoded value occupies.
    pub width: usize,
}

impl Descriptor {
    pub fn new(offset: usize, width: usize) -> Self {
        Self { offset, width }
    }

    fn end(&self) -> usize {
        self.offset + self.width
    }
}

/// Re-emits `value` into the byte range described by `descriptor` within
/// `buf`. Fails without modifying `buf` if `value` no longer fits in
/// `descriptor.width` bytes, or if the descriptor does not fit in `buf`.
pub fn rewrite(buf: &mut [u8], descriptor: Descriptor, value: u64) -> Result<(), Error> {
    if descriptor.end() > buf.len() {
        return Err(Error::OutOfBounds(descriptor));
    }
    let encoded = encode::encode_padded(value, descriptor.width)?;
    buf[descriptor.offset..descriptor.end()].copy_from_slice(&encoded);
    Ok(())
}
