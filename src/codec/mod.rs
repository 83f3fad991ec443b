//! Message <-> frame bit stream.
//!
//! A frame is `START_MARKER ‖ manchester(utf8(message)) ‖ END_MARKER`, bytes
//! expanded most significant bit first. Markers are plain literals and are
//! searched for as raw substrings of the stream, without regard to
//! Manchester pair alignment. Noise ahead of a frame that happens to contain
//! the start literal makes the decoder lock onto the wrong position.

use bitvec::prelude::*;
use once_cell::sync::Lazy;

use crate::error::DecodeError;

mod manchester;

pub type BitSequence = BitVec<u8, Msb0>;

pub const START_MARKER: u8 = 0b1111_0000;
pub const END_MARKER: u8 = 0b0000_1111;
pub const MARKER_BITS: usize = 8;

/// Both markers, nothing can be a frame below this.
pub const MIN_FRAME_BITS: usize = MARKER_BITS * 2;

static START_MARKER_BITS: Lazy<BitSequence> =
    Lazy::new(|| BitSequence::from_element(START_MARKER));
static END_MARKER_BITS: Lazy<BitSequence> =
    Lazy::new(|| BitSequence::from_element(END_MARKER));

pub fn encode(message: &str) -> BitSequence {
    let raw = BitSequence::from_slice(message.as_bytes());

    let mut frame = BitSequence::with_capacity(frame_length(message));
    frame.extend_from_bitslice(START_MARKER_BITS.as_bitslice());
    frame.extend_from_bitslice(&manchester::encode(&raw));
    frame.extend_from_bitslice(END_MARKER_BITS.as_bitslice());
    frame
}

/// Extracts the first frame found in `bits`.
///
/// Leftmost start marker, then the leftmost end marker after it. No other
/// start position is tried when that span fails to decode.
pub fn decode(bits: &BitSlice<u8, Msb0>) -> Result<String, DecodeError> {
    let start = find_marker(bits, START_MARKER_BITS.as_bitslice())
        .ok_or(DecodeError::MissingStartMarker)?;
    let payload_start = start + MARKER_BITS;

    let end = find_marker(&bits[payload_start..], END_MARKER_BITS.as_bitslice())
        .map(|offset| payload_start + offset)
        .ok_or(DecodeError::MissingEndMarker)?;

    let raw = manchester::decode(&bits[payload_start..end])?;
    if raw.len() % 8 != 0 {
        return Err(DecodeError::NotByteAligned(raw.len()));
    }

    String::from_utf8(raw.into_vec()).map_err(|_| DecodeError::InvalidUtf8)
}

/// Total bits on the wire for `message`: two markers plus two line bits per
/// source bit.
pub fn frame_length(message: &str) -> usize {
    MIN_FRAME_BITS + 2 * 8 * message.len()
}

fn find_marker(bits: &BitSlice<u8, Msb0>, marker: &BitSlice<u8, Msb0>) -> Option<usize> {
    bits.windows(marker.len()).position(|window| window == marker)
}

pub fn bits_from_str(text: &str) -> Result<BitSequence, DecodeError> {
    text.chars()
        .enumerate()
        .map(|(index, symbol)| match symbol {
            '0' => Ok(false),
            '1' => Ok(true),
            _ => Err(DecodeError::InvalidSymbol(index)),
        })
        .collect()
}

pub fn bits_to_string(bits: &BitSlice<u8, Msb0>) -> String {
    bits.iter()
        .by_vals()
        .map(|bit| if bit { '1' } else { '0' })
        .collect()
}
