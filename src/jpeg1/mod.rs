//! JPEG 1 (Baseline) quantization and entropy coding (ISO/IEC 10918-1 / ITU-T T.81)
//!
//! This module implements the parts of the classic DCT-based baseline JPEG
//! standard that sit between the DCT and the byte stream.
//!
//! Features:
//! - Canonical Huffman tables from DHT lengths/values, Annex K defaults.
//! - MSB-first bit packing with byte stuffing and marker detection.
//! - Per-block DC differencing, zigzag run-length AC coding.
//! - Quantization and dequantization of MCU blocks.

pub mod bit_io;
pub mod entropy_decoder;
pub mod entropy_encoder;
pub mod huffman;
pub mod quantization;

pub use bit_io::{BitPacker, BitUnpacker};
pub use entropy_decoder::decode_block;
pub use entropy_encoder::encode_block;
pub use huffman::{HuffmanCode, HuffmanTable, HuffmanTableStore};
pub use quantization::{dequantize, quantize, QuantizationTable, QuantizationTableStore};
