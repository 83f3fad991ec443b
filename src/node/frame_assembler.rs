use bitvec::prelude::*;

use crate::codec::{self, BitSequence, MIN_FRAME_BITS};

pub const BUFFER_CAPACITY: usize = 10000;

/// Rolling buffer of recovered bits, scanned for a frame after every append.
///
/// A decoded frame clears the whole buffer, including any bits that already
/// belong to the next frame. Overflow keeps only the newest half, which can
/// cut a frame that is still arriving.
pub struct FrameAssembler {
    buffer: BitSequence,
    capacity: usize,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new(BUFFER_CAPACITY)
    }
}

impl FrameAssembler {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: BitSequence::new(),
            capacity,
        }
    }

    pub fn push(&mut self, bit: bool) -> Option<String> {
        self.append(bit);
        self.extract()
    }

    /// Appends without looking for a frame. Must be followed by `extract`,
    /// which also restores the capacity bound.
    pub fn append(&mut self, bit: bool) {
        self.buffer.push(bit);
    }

    pub fn extract(&mut self) -> Option<String> {
        let message = self.try_extract();
        self.enforce_capacity();
        message
    }

    /// Appends a burst of bits and makes a single extraction attempt at the
    /// end of it.
    pub fn extend(&mut self, bits: &BitSlice<u8, Msb0>) -> Option<String> {
        bits.iter().by_vals().for_each(|bit| {
            self.buffer.push(bit);
            self.enforce_capacity();
        });
        self.try_extract()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn bits(&self) -> &BitSlice<u8, Msb0> {
        &self.buffer
    }

    fn try_extract(&mut self) -> Option<String> {
        if self.buffer.len() < MIN_FRAME_BITS {
            return None;
        }

        match codec::decode(&self.buffer) {
            Ok(message) => {
                debug!("Frame decoded from {} buffered bits", self.buffer.len());
                self.buffer.clear();
                Some(message)
            }
            Err(_) => None,
        }
    }

    fn enforce_capacity(&mut self) {
        if self.buffer.len() > self.capacity {
            let keep = self.capacity / 2;
            let dropped = self.buffer.len() - keep;
            self.buffer = self.buffer.split_off(dropped);
            debug!("Bit buffer overflow, dropped {} oldest bits", dropped);
        }
    }
}
