//! Quantization implementation for JPEG 1.
//! Handles quantization tables and the scaling of MCU coefficient blocks.
//!
//! Tables and blocks are both kept in natural (row-major) order; zigzag order
//! only matters to the entropy coder.

use crate::constants::BLOCK_DIM;
use crate::error::CodecError;
use crate::header::Header;
use crate::mcu::{Block, Channel, Mcu};
use crate::messages::QuantizationTableMessage;

/// Standard JPEG luminance quantization table (Quality 50).
pub const STD_LUMINANCE_QUANT_TABLE: [u8; BLOCK_DIM] = [
    16, 11, 10, 16, 24, 40, 51, 61,
    12, 12, 14, 19, 26, 58, 60, 55,
    14, 13, 16, 24, 40, 57, 69, 56,
    14, 17, 22, 29, 51, 87, 80, 62,
    18, 22, 37, 56, 68, 109, 103, 77,
    24, 35, 55, 64, 81, 104, 113, 92,
    49, 64, 78, 87, 103, 121, 120, 101,
    72, 92, 95, 98, 112, 100, 103, 99,
];

/// Standard JPEG chrominance quantization table (Quality 50).
pub const STD_CHROMINANCE_QUANT_TABLE: [u8; BLOCK_DIM] = [
    17, 18, 24, 47, 99, 99, 99, 99,
    18, 21, 26, 66, 99, 99, 99, 99,
    24, 26, 56, 99, 99, 99, 99, 99,
    47, 66, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizationTable {
    table_id: u8,
    /// 0 = 8-bit entries, 1 = 16-bit entries.
    precision: u8,
    table: [u16; BLOCK_DIM],
}

impl QuantizationTable {
    pub fn new(table_id: u8, table: [u16; BLOCK_DIM]) -> Result<Self, CodecError> {
        if table.contains(&0) {
            return Err(CodecError::InvalidMessage("quantization table entry is zero"));
        }
        let precision = u8::from(table.iter().any(|&q| q > u8::MAX as u16));
        Ok(Self {
            table_id,
            precision,
            table,
        })
    }

    pub fn from_message(message: &QuantizationTableMessage) -> Result<Self, CodecError> {
        if message.precision > 1 {
            return Err(CodecError::InvalidMessage("quantization table precision must be 0 or 1"));
        }
        let table: [u16; BLOCK_DIM] = message
            .table
            .as_slice()
            .try_into()
            .map_err(|_| CodecError::InvalidMessage("quantization table must have 64 entries"))?;
        let mut quantization_table = Self::new(message.table_id, table)?;
        if message.precision == 0 && quantization_table.precision != 0 {
            return Err(CodecError::InvalidMessage("8-bit quantization table holds 16-bit entries"));
        }
        quantization_table.precision = message.precision;
        Ok(quantization_table)
    }

    /// Standard luminance table scaled to `quality` (1-100).
    pub fn standard_luminance(table_id: u8, quality: u32) -> Self {
        Self::scaled(table_id, &STD_LUMINANCE_QUANT_TABLE, quality)
    }

    /// Standard chrominance table scaled to `quality` (1-100).
    pub fn standard_chrominance(table_id: u8, quality: u32) -> Self {
        Self::scaled(table_id, &STD_CHROMINANCE_QUANT_TABLE, quality)
    }

    fn scaled(table_id: u8, base_table: &[u8; BLOCK_DIM], quality: u32) -> Self {
        Self {
            table_id,
            precision: 0,
            table: get_scaled_quant_table(base_table, quality),
        }
    }

    pub fn table_id(&self) -> u8 {
        self.table_id
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn values(&self) -> &[u16; BLOCK_DIM] {
        &self.table
    }
}

// Baseline streams use destinations 0..=3.
const TABLE_DESTINATIONS: usize = 4;

/// Quantization tables of one image, indexed by table ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuantizationTableStore {
    tables: [Option<QuantizationTable>; TABLE_DESTINATIONS],
}

impl QuantizationTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Luminance table 0 and chrominance table 1 at the given quality.
    pub fn standard(quality: u32) -> Self {
        let mut store = Self::new();
        store.tables[0] = Some(QuantizationTable::standard_luminance(0, quality));
        store.tables[1] = Some(QuantizationTable::standard_chrominance(1, quality));
        store
    }

    pub fn insert(&mut self, table: QuantizationTable) -> Result<(), CodecError> {
        let slot = self
            .tables
            .get_mut(table.table_id as usize)
            .ok_or(CodecError::InvalidMessage("quantization table ID out of range"))?;
        *slot = Some(table);
        Ok(())
    }

    pub fn get(&self, table_id: u8) -> Result<&QuantizationTable, CodecError> {
        self.tables
            .get(table_id as usize)
            .and_then(Option::as_ref)
            .ok_or(CodecError::UnknownTable { kind: "quantization", table_id })
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuantizationTable> {
        self.tables.iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

fn saturate(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Divides each coefficient by its table entry, rounding half away from zero.
pub fn quantize_block(block: &mut Block, quant_table: &QuantizationTable) {
    for (coeff, &q) in block.iter_mut().zip(quant_table.table.iter()) {
        let q = q as i32;
        let value = *coeff as i32;
        let magnitude = (value.abs() + q / 2) / q;
        *coeff = saturate(if value < 0 { -magnitude } else { magnitude });
    }
}

/// Multiplies each coefficient by its table entry.
pub fn dequantize_block(block: &mut Block, quant_table: &QuantizationTable) {
    for (coeff, &q) in block.iter_mut().zip(quant_table.table.iter()) {
        *coeff = saturate(*coeff as i32 * q as i32);
    }
}

/// Scales every channel of `mcu` by the quantization table of its component.
pub fn dequantize(mcu: &mut Mcu, header: &Header) -> Result<(), CodecError> {
    for channel in Channel::ALL {
        let table_id = header.component(channel).quantization_table_id;
        let quant_table = header.quantization_tables.get(table_id)?;
        dequantize_block(mcu.block_mut(channel), quant_table);
    }
    Ok(())
}

/// Inverse of [`dequantize`], up to rounding.
pub fn quantize(mcu: &mut Mcu, header: &Header) -> Result<(), CodecError> {
    for channel in Channel::ALL {
        let table_id = header.component(channel).quantization_table_id;
        let quant_table = header.quantization_tables.get(table_id)?;
        quantize_block(mcu.block_mut(channel), quant_table);
    }
    Ok(())
}

/// Scales a quantization table by a quality factor (1-100).
pub fn get_scaled_quant_table(base_table: &[u8; BLOCK_DIM], quality: u32) -> [u16; BLOCK_DIM] {
    let quality = quality.clamp(1, 100);
    let mut scaled_table = [0u16; BLOCK_DIM];
    let s = if quality < 50 { 5000 / quality } else { 200 - 2 * quality };

    for i in 0..BLOCK_DIM {
        let val = (base_table[i] as u32 * s + 50) / 100;
        scaled_table[i] = val.clamp(1, 255) as u16;
    }
    scaled_table
}
