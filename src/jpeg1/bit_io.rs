//! MSB-first bit packing and unpacking for JPEG entropy-coded segments.
//!
//! Both directions apply the JPEG byte-stuffing rule: a data byte of 0xFF is
//! always followed by a 0x00 in the stream so it can't be mistaken for a marker.

use crate::constants::UNPACKER_COMPACT_THRESHOLD;
use crate::error::CodecError;
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JPEG_STUFFING_BYTE};

/// Packs bits into a growable byte buffer with JPEG byte stuffing (FF00).
#[derive(Debug, Default)]
pub struct BitPacker {
    data: Vec<u8>,
    bit_buffer: u32,
    bits_in_buffer: u32,
    bits_written: usize,
}

impl BitPacker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            data: Vec::with_capacity(bytes),
            ..Self::default()
        }
    }

    /// Writes the `length` low-order bits of `value`, most significant first.
    pub fn put_bits(&mut self, value: u32, length: u8) {
        debug_assert!(length <= 16, "at most 16 bits per call");
        if length == 0 {
            return;
        }
        let length = length as u32;
        let mask = (1u32 << length) - 1;
        self.bit_buffer = (self.bit_buffer << length) | (value & mask);
        self.bits_in_buffer += length;
        self.bits_written += length as usize;

        while self.bits_in_buffer >= 8 {
            let shift = self.bits_in_buffer - 8;
            let byte = ((self.bit_buffer >> shift) & 0xFF) as u8;
            self.emit_byte(byte);
            self.bits_in_buffer = shift;
            self.bit_buffer &= (1u32 << shift) - 1;
        }
    }

    fn emit_byte(&mut self, byte: u8) {
        self.data.push(byte);
        if byte == JPEG_MARKER_START_BYTE {
            self.data.push(JPEG_STUFFING_BYTE);
        }
    }

    /// Pads a partially filled byte with 1 bits and returns the finished buffer.
    /// The packer is left empty.
    pub fn finish(&mut self) -> Vec<u8> {
        if self.bits_in_buffer > 0 {
            let pad_bits = 8 - self.bits_in_buffer;
            self.put_bits((1u32 << pad_bits) - 1, pad_bits as u8);
        }
        self.bits_written = 0;
        std::mem::take(&mut self.data)
    }

    /// Clears all accumulated state, keeping the allocation.
    pub fn restart(&mut self) {
        self.data.clear();
        self.bit_buffer = 0;
        self.bits_in_buffer = 0;
        self.bits_written = 0;
    }

    pub fn reserve(&mut self, bytes: usize) {
        self.data.reserve(bytes);
    }

    /// Completed bytes, stuffing included.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.bits_in_buffer == 0
    }

    /// Number of payload bits written since the last restart, stuffing excluded.
    pub fn bits_written(&self) -> usize {
        self.bits_written
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Saved read position of a [`BitUnpacker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnpackerCheckpoint {
    position: usize,
    bit_buffer: u8,
    bits_left: u8,
}

/// Reads bits MSB-first from entropy-coded data fed in one or more chunks,
/// removing stuffed bytes and stopping at markers.
#[derive(Debug, Default)]
pub struct BitUnpacker {
    data: Vec<u8>,
    position: usize,
    bit_buffer: u8,
    bits_left: u8,
}

impl BitUnpacker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: bytes.to_vec(),
            ..Self::default()
        }
    }

    /// Appends more compressed data behind what is already buffered.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn read_bit(&mut self) -> Result<u8, CodecError> {
        if self.bits_left == 0 {
            self.fill()?;
        }
        self.bits_left -= 1;
        Ok((self.bit_buffer >> self.bits_left) & 1)
    }

    pub fn read_bits(&mut self, count: u8) -> Result<u16, CodecError> {
        debug_assert!(count <= 16, "at most 16 bits per call");
        let mut value = 0u16;
        for _ in 0..count {
            value = (value << 1) | self.read_bit()? as u16;
        }
        Ok(value)
    }

    fn fill(&mut self) -> Result<(), CodecError> {
        loop {
            let byte = *self.data.get(self.position).ok_or(CodecError::NeedMoreData)?;
            if byte != JPEG_MARKER_START_BYTE {
                self.position += 1;
                self.bit_buffer = byte;
                self.bits_left = 8;
                return Ok(());
            }

            let next = *self
                .data
                .get(self.position + 1)
                .ok_or(CodecError::NeedMoreData)?;
            match next {
                JPEG_STUFFING_BYTE => {
                    self.position += 2;
                    self.bit_buffer = byte;
                    self.bits_left = 8;
                    return Ok(());
                }
                // Fill byte in front of a marker.
                JPEG_MARKER_START_BYTE => self.position += 1,
                marker => return Err(CodecError::MarkerReached(marker)),
            }
        }
    }

    /// Consumes the marker at the read position, if there is one, and
    /// discards any bits left over from the previous byte.
    pub fn skip_marker(&mut self) -> Option<u8> {
        let mut position = self.position;
        while self.data.get(position) == Some(&JPEG_MARKER_START_BYTE)
            && self.data.get(position + 1) == Some(&JPEG_MARKER_START_BYTE)
        {
            position += 1;
        }
        match (self.data.get(position), self.data.get(position + 1)) {
            (Some(&JPEG_MARKER_START_BYTE), Some(&code)) if code != JPEG_STUFFING_BYTE => {
                self.position = position + 2;
                self.align_to_byte();
                Some(code)
            }
            _ => None,
        }
    }

    pub fn align_to_byte(&mut self) {
        self.bits_left = 0;
    }

    pub fn checkpoint(&self) -> UnpackerCheckpoint {
        UnpackerCheckpoint {
            position: self.position,
            bit_buffer: self.bit_buffer,
            bits_left: self.bits_left,
        }
    }

    pub fn rewind(&mut self, checkpoint: UnpackerCheckpoint) {
        self.position = checkpoint.position;
        self.bit_buffer = checkpoint.bit_buffer;
        self.bits_left = checkpoint.bits_left;
    }

    /// Drops consumed input. Invalidates earlier checkpoints.
    pub fn compact(&mut self) {
        if self.position >= UNPACKER_COMPACT_THRESHOLD {
            self.data.drain(..self.position);
            self.position = 0;
        }
    }

    /// Buffered bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn restart(&mut self) {
        self.data.clear();
        self.position = 0;
        self.bit_buffer = 0;
        self.bits_left = 0;
    }
}
