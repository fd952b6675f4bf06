//! Compact binary encoding of frames.
//!
//! A frame is written as a big-endian `u32` slot count followed by each slot:
//! a `u16`-length-prefixed UTF-8 relation, a `u16`-length-prefixed UTF-8
//! value and a single flag byte. A *record* prefixes the frame with its
//! big-endian `u64` id; a record stream is records back to back.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::str::Utf8Error;

use nom::bytes::complete::take;
use nom::combinator::map_res;
use nom::error::{ErrorKind, FromExternalError, ParseError};
use nom::multi::count;
use nom::number::complete::{be_u16, be_u32, be_u64, u8 as byte};
use nom::IResult;

use crate::ids::FrameId;
use crate::model::{Frame, Slot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer ended before the declared content.
    Truncated,
    /// A string field was not valid UTF-8.
    InvalidUtf8,
    /// A flag byte other than 0 or 1.
    InvalidFlag(u8),
    /// Bytes left over after a complete frame.
    TrailingBytes(usize),
    /// A string too long for its 16-bit length prefix.
    StringTooLong(usize),
    /// More slots than a 32-bit count can describe.
    TooManySlots(usize),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Truncated => write!(f, "Frame buffer is truncated"),
            CodecError::InvalidUtf8 => write!(f, "Slot string is not valid UTF-8"),
            CodecError::InvalidFlag(b) => write!(f, "Invalid proper-noun flag byte: {}", b),
            CodecError::TrailingBytes(n) => write!(f, "{} trailing bytes after frame", n),
            CodecError::StringTooLong(n) => write!(f, "Slot string of {} bytes exceeds 65535", n),
            CodecError::TooManySlots(n) => write!(f, "{} slots exceed the 32-bit slot count", n),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CodecError {}

impl<'a> ParseError<&'a [u8]> for CodecError {
    fn from_error_kind(_input: &'a [u8], _kind: ErrorKind) -> Self {
        CodecError::Truncated
    }

    fn append(_input: &'a [u8], _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a> FromExternalError<&'a [u8], Utf8Error> for CodecError {
    fn from_external_error(_input: &'a [u8], _kind: ErrorKind, _e: Utf8Error) -> Self {
        CodecError::InvalidUtf8
    }
}

impl<'a> FromExternalError<&'a [u8], CodecError> for CodecError {
    fn from_external_error(_input: &'a [u8], _kind: ErrorKind, e: CodecError) -> Self {
        e
    }
}

type Parsed<'a, T> = IResult<&'a [u8], T, CodecError>;

fn flatten(err: nom::Err<CodecError>) -> CodecError {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => e,
        nom::Err::Incomplete(_) => CodecError::Truncated,
    }
}

// ----------------------------------------------------------------------------
// Encoding
// ----------------------------------------------------------------------------

fn put_str(out: &mut Vec<u8>, s: &str) -> Result<(), CodecError> {
    let len = u16::try_from(s.len()).map_err(|_| CodecError::StringTooLong(s.len()))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

impl Frame {
    /// Appends the encoded frame (without its id) to `out`.
    ///
    /// On error `out` is left exactly as it was.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let start = out.len();
        let result = self.encode_slots(out);
        if result.is_err() {
            out.truncate(start);
        }
        result
    }

    fn encode_slots(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let n = u32::try_from(self.len()).map_err(|_| CodecError::TooManySlots(self.len()))?;
        out.extend_from_slice(&n.to_be_bytes());
        for slot in self.slots() {
            put_str(out, &slot.relation)?;
            put_str(out, &slot.value)?;
            out.push(slot.is_proper_noun as u8);
        }
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        self.encode_into(&mut out)?;
        Ok(out)
    }

    /// Appends `id` followed by the encoded frame.
    pub fn encode_record_into(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let start = out.len();
        out.extend_from_slice(&self.id.get().to_be_bytes());
        if let Err(e) = self.encode_slots(out) {
            out.truncate(start);
            return Err(e);
        }
        Ok(())
    }

    /// Decodes a frame body produced by [`Frame::encode`]. The whole buffer
    /// must be consumed.
    pub fn decode(id: FrameId, bytes: &[u8]) -> Result<Frame, CodecError> {
        let (rest, slots) = slot_list(bytes).map_err(flatten)?;
        if !rest.is_empty() {
            return Err(CodecError::TrailingBytes(rest.len()));
        }
        Ok(Frame::with_slots(id, slots))
    }
}

pub fn encode_records<'a, I>(frames: I) -> Result<Vec<u8>, CodecError>
where
    I: IntoIterator<Item = &'a Frame>,
{
    let mut out = Vec::new();
    for frame in frames {
        frame.encode_record_into(&mut out)?;
    }
    Ok(out)
}

// ----------------------------------------------------------------------------
// Decoding
// ----------------------------------------------------------------------------

fn utf8_string(input: &[u8]) -> Parsed<'_, String> {
    let (input, len) = be_u16(input)?;
    let (input, raw) = map_res(take(len as usize), core::str::from_utf8)(input)?;
    Ok((input, String::from(raw)))
}

fn flag(input: &[u8]) -> Parsed<'_, bool> {
    map_res(byte, |b| match b {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(CodecError::InvalidFlag(other)),
    })(input)
}

fn slot(input: &[u8]) -> Parsed<'_, Slot> {
    let (input, relation) = utf8_string(input)?;
    let (input, value) = utf8_string(input)?;
    let (input, is_proper_noun) = flag(input)?;
    Ok((input, Slot { relation, value, is_proper_noun }))
}

fn slot_list(input: &[u8]) -> Parsed<'_, Vec<Slot>> {
    let (input, n) = be_u32(input)?;
    // Each slot takes at least five bytes; reject impossible counts before
    // allocating.
    if n as usize > input.len() / 5 {
        return Err(nom::Err::Error(CodecError::Truncated));
    }
    count(slot, n as usize)(input)
}

fn record(input: &[u8]) -> Parsed<'_, Frame> {
    let (input, id) = be_u64(input)?;
    let (input, slots) = slot_list(input)?;
    Ok((input, Frame::with_slots(FrameId(id), slots)))
}

/// Decodes a stream of records until the buffer is exhausted.
pub fn decode_records(mut bytes: &[u8]) -> Result<Vec<Frame>, CodecError> {
    let mut frames = Vec::new();
    while !bytes.is_empty() {
        let (rest, frame) = record(bytes).map_err(flatten)?;
        frames.push(frame);
        bytes = rest;
    }
    Ok(frames)
}
