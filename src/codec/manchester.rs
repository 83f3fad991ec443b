use bitvec::prelude::*;

use super::BitSequence;
use crate::error::DecodeError;

/// Each source bit becomes a pair with a level transition: 0 -> 10, 1 -> 01.
pub(super) fn encode(bits: &BitSlice<u8, Msb0>) -> BitSequence {
    let mut out = BitSequence::with_capacity(bits.len() * 2);
    bits.iter().by_vals().for_each(|bit| {
        out.push(!bit);
        out.push(bit);
    });
    out
}

pub(super) fn decode(line_bits: &BitSlice<u8, Msb0>) -> Result<BitSequence, DecodeError> {
    if line_bits.len() % 2 != 0 {
        return Err(DecodeError::OddPayloadLength(line_bits.len()));
    }

    let mut out = BitSequence::with_capacity(line_bits.len() / 2);
    for (index, pair) in line_bits.chunks_exact(2).enumerate() {
        match (pair[0], pair[1]) {
            (true, false) => out.push(false),
            (false, true) => out.push(true),
            _ => return Err(DecodeError::InvalidPair(index * 2)),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manchester_pairs() {
        let raw = bitvec![u8, Msb0; 0, 1, 1, 0];
        let coded = encode(&raw);
        assert_eq!(coded, bitvec![u8, Msb0; 1, 0, 0, 1, 0, 1, 1, 0]);
        assert_eq!(decode(&coded).unwrap(), raw);
    }

    #[test]
    fn test_manchester_rejects_flat_pairs() {
        let coded = bitvec![u8, Msb0; 1, 0, 0, 0];
        assert_eq!(decode(&coded), Err(DecodeError::InvalidPair(2)));

        let coded = bitvec![u8, Msb0; 1, 1];
        assert_eq!(decode(&coded), Err(DecodeError::InvalidPair(0)));
    }

    #[test]
    fn test_manchester_odd_length() {
        let coded = bitvec![u8, Msb0; 1, 0, 1];
        assert_eq!(decode(&coded), Err(DecodeError::OddPayloadLength(3)));
    }
}
