pub const BLOCK_SIZE: usize = 8;
pub const BLOCK_DIM: usize = BLOCK_SIZE * BLOCK_SIZE;

// One block per channel per MCU: Y, Cb, Cr.
pub const CHANNEL_COUNT: usize = 3;

// Huffman codes are limited to 16 bits (ISO/IEC 10918-1, C.2).
pub const MAX_CODE_LENGTH: usize = 16;
pub const MAX_HUFFMAN_SYMBOLS: usize = 256;

pub const HUFFMAN_CLASS_DC: u8 = 0;
pub const HUFFMAN_CLASS_AC: u8 = 1;

/// AC symbol that ends a block.
pub const END_OF_BLOCK: u8 = 0x00;
/// AC symbol for a run of 16 zero coefficients (ZRL).
pub const ZERO_RUN_LENGTH: u8 = 0xF0;
pub const ZERO_RUN_SPAN: usize = 16;

// Magnitude categories above 15 cannot be expressed in a symbol nibble.
pub const MAX_CATEGORY: u8 = 15;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

// Initial reservation for the entropy-coded output of one scan, per MCU.
pub const PACKER_BYTES_PER_MCU: usize = 48;

// The unpacker drops already consumed input once this many bytes are behind it.
pub const UNPACKER_COMPACT_THRESHOLD: usize = 4096;

/// Zigzag scan order: entry `k` is the natural (row-major) index of the
/// `k`-th coefficient in scan order.
pub const ZIGZAG_ORDER: [usize; BLOCK_DIM] = [
    0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];
