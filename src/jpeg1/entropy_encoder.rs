//! Baseline Huffman encoding of one coefficient block (ISO/IEC 10918-1, F.1.2).

use crate::constants::{BLOCK_DIM, END_OF_BLOCK, MAX_CATEGORY, ZERO_RUN_LENGTH, ZERO_RUN_SPAN, ZIGZAG_ORDER};
use crate::error::CodecError;
use crate::jpeg1::bit_io::BitPacker;
use crate::jpeg1::huffman::HuffmanTable;
use crate::mcu::Block;

/// Computes the magnitude category of an integer (ISO/IEC 10918-1 F.1.2.1):
/// the number of bits needed for `|value|`.
pub fn magnitude_category(value: i32) -> u8 {
    if value == 0 {
        return 0;
    }
    (32 - value.unsigned_abs().leading_zeros()) as u8
}

/// Encodes the bits for a given category and value (ISO/IEC 10918-1 F.1.2.1.1).
/// Negative values are sent as `value + 2^category - 1`.
pub fn magnitude_bits(value: i32, category: u8) -> u32 {
    if category == 0 {
        return 0;
    }
    if value >= 0 {
        value as u32
    } else {
        (value + (1 << category) - 1) as u32
    }
}

fn emit_symbol(packer: &mut BitPacker, table: &HuffmanTable, symbol: u8) -> Result<(), CodecError> {
    let code = table.code_for(symbol)?;
    packer.put_bits(code.value as u32, code.length);
    Ok(())
}

fn checked_category(value: i32) -> Result<u8, CodecError> {
    let category = magnitude_category(value);
    if category > MAX_CATEGORY {
        return Err(CodecError::CoefficientOutOfRange(value));
    }
    Ok(category)
}

/// Huffman codes one block against its DC predictor.
///
/// The predictor always takes the block's DC value, even when coding fails,
/// so later blocks in the scan stay consistent with what a decoder expects.
pub fn encode_block(
    packer: &mut BitPacker,
    dc_prev: &mut i16,
    block: &Block,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
) -> Result<(), CodecError> {
    // 1. DC difference
    let diff = block[0] as i32 - *dc_prev as i32;
    *dc_prev = block[0];
    let category = checked_category(diff)?;
    emit_symbol(packer, dc_table, category)?;
    packer.put_bits(magnitude_bits(diff, category), category);

    // 2. AC coefficients in zigzag order
    let mut run = 0usize;
    for &natural in &ZIGZAG_ORDER[1..BLOCK_DIM] {
        let coeff = block[natural] as i32;
        if coeff == 0 {
            run += 1;
            continue;
        }
        while run >= ZERO_RUN_SPAN {
            emit_symbol(packer, ac_table, ZERO_RUN_LENGTH)?;
            run -= ZERO_RUN_SPAN;
        }
        let category = checked_category(coeff)?;
        let symbol = ((run as u8) << 4) | category;
        emit_symbol(packer, ac_table, symbol)?;
        packer.put_bits(magnitude_bits(coeff, category), category);
        run = 0;
    }

    if run > 0 {
        emit_symbol(packer, ac_table, END_OF_BLOCK)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg1::bit_io::BitUnpacker;

    #[test]
    fn test_magnitude_category() {
        assert_eq!(magnitude_category(0), 0);
        assert_eq!(magnitude_category(1), 1);
        assert_eq!(magnitude_category(-1), 1);
        assert_eq!(magnitude_category(4), 3);
        assert_eq!(magnitude_category(-5), 3);
        assert_eq!(magnitude_category(100), 7);
        assert_eq!(magnitude_category(2047), 11);
        assert_eq!(magnitude_category(-2048), 12);
    }

    #[test]
    fn test_magnitude_bits() {
        assert_eq!(magnitude_bits(-5, 3), 2);
        assert_eq!(magnitude_bits(5, 3), 5);
        assert_eq!(magnitude_bits(-1, 1), 0);
        assert_eq!(magnitude_bits(-7, 3), 0);
        assert_eq!(magnitude_bits(0, 0), 0);
    }

    #[test]
    fn test_dc_differencing() {
        let dc_table = HuffmanTable::standard_luminance_dc();
        let ac_table = HuffmanTable::standard_luminance_ac();
        let mut packer = BitPacker::new();
        let mut dc_prev = 0i16;

        let mut block = [0i16; 64];
        block[0] = 100;
        encode_block(&mut packer, &mut dc_prev, &block, &dc_table, &ac_table).unwrap();
        assert_eq!(dc_prev, 100);
        block[0] = 95;
        encode_block(&mut packer, &mut dc_prev, &block, &dc_table, &ac_table).unwrap();
        assert_eq!(dc_prev, 95);

        let mut unpacker = BitUnpacker::from_bytes(&packer.finish());
        // diff 100: category 7, literal 100
        assert_eq!(unpacker.read_bits(5).unwrap(), 0b11110);
        assert_eq!(unpacker.read_bits(7).unwrap(), 100);
        assert_eq!(unpacker.read_bits(4).unwrap(), 0b1010);
        // diff -5: category 3, literal -5 + 7 = 2
        assert_eq!(unpacker.read_bits(3).unwrap(), 0b100);
        assert_eq!(unpacker.read_bits(3).unwrap(), 2);
        assert_eq!(unpacker.read_bits(4).unwrap(), 0b1010);
    }

    #[test]
    fn test_zero_run_uses_zrl() {
        let dc_table = HuffmanTable::standard_luminance_dc();
        let ac_table = HuffmanTable::standard_luminance_ac();
        let mut block = [0i16; 64];
        // 20 zero AC terms, then a 3 at zigzag position 21.
        block[ZIGZAG_ORDER[21]] = 3;

        let mut packer = BitPacker::new();
        let mut dc_prev = 0i16;
        encode_block(&mut packer, &mut dc_prev, &block, &dc_table, &ac_table).unwrap();

        let zrl = ac_table.code_for(ZERO_RUN_LENGTH).unwrap();
        let run4 = ac_table.code_for(0x42).unwrap();
        let eob = ac_table.code_for(END_OF_BLOCK).unwrap();
        let expected_bits = 2 + zrl.length as usize + run4.length as usize + 2 + eob.length as usize;
        assert_eq!(packer.bits_written(), expected_bits);

        let mut unpacker = BitUnpacker::from_bytes(&packer.finish());
        assert_eq!(dc_table.decode(&mut unpacker).unwrap(), 0);
        assert_eq!(ac_table.decode(&mut unpacker).unwrap(), ZERO_RUN_LENGTH);
        assert_eq!(ac_table.decode(&mut unpacker).unwrap(), 0x42);
        assert_eq!(unpacker.read_bits(2).unwrap(), 3);
        assert_eq!(ac_table.decode(&mut unpacker).unwrap(), END_OF_BLOCK);
    }

    #[test]
    fn test_exactly_sixteen_zeros() {
        let dc_table = HuffmanTable::standard_luminance_dc();
        let ac_table = HuffmanTable::standard_luminance_ac();
        let mut block = [0i16; 64];
        block[ZIGZAG_ORDER[17]] = -1;

        let mut packer = BitPacker::new();
        encode_block(&mut packer, &mut 0, &block, &dc_table, &ac_table).unwrap();

        let mut unpacker = BitUnpacker::from_bytes(&packer.finish());
        assert_eq!(dc_table.decode(&mut unpacker).unwrap(), 0);
        assert_eq!(ac_table.decode(&mut unpacker).unwrap(), ZERO_RUN_LENGTH);
        assert_eq!(ac_table.decode(&mut unpacker).unwrap(), 0x01);
        assert_eq!(unpacker.read_bits(1).unwrap(), 0);
    }

    #[test]
    fn test_all_zero_ac_emits_single_eob() {
        let dc_table = HuffmanTable::standard_luminance_dc();
        let ac_table = HuffmanTable::standard_luminance_ac();
        let block = [0i16; 64];
        let mut packer = BitPacker::new();
        encode_block(&mut packer, &mut 0, &block, &dc_table, &ac_table).unwrap();

        // DC category 0 (2 bits) and one EOB (4 bits), nothing else.
        assert_eq!(packer.bits_written(), 2 + 4);
        assert_eq!(packer.finish(), vec![0b0010_1011]);
    }

    #[test]
    fn test_no_eob_when_last_coefficient_is_set() {
        let dc_table = HuffmanTable::standard_luminance_dc();
        let ac_table = HuffmanTable::standard_luminance_ac();
        let mut block = [1i16; 64];
        block[0] = 0;
        let mut packer = BitPacker::new();
        encode_block(&mut packer, &mut 0, &block, &dc_table, &ac_table).unwrap();

        // DC category 0, then 63 symbols 0x01 each followed by one literal bit.
        let one = ac_table.code_for(0x01).unwrap();
        assert_eq!(packer.bits_written(), 2 + 63 * (one.length as usize + 1));
    }

    #[test]
    fn test_missing_symbol_fails_but_updates_predictor() {
        let dc_table = HuffmanTable::standard_luminance_dc();
        let ac_table = HuffmanTable::standard_luminance_ac();
        let mut block = [0i16; 64];
        block[0] = 2047;
        let mut dc_prev = -2047i16;
        let result = encode_block(&mut BitPacker::new(), &mut dc_prev, &block, &dc_table, &ac_table);
        // A difference of 4094 needs category 12, which the table lacks.
        assert_eq!(result, Err(CodecError::Encode { symbol: 12 }));
        assert_eq!(dc_prev, 2047);
    }

    #[test]
    fn test_out_of_range_difference() {
        let dc_table = HuffmanTable::standard_luminance_dc();
        let ac_table = HuffmanTable::standard_luminance_ac();
        let mut block = [0i16; 64];
        block[0] = i16::MAX;
        let mut dc_prev = i16::MIN;
        let result = encode_block(&mut BitPacker::new(), &mut dc_prev, &block, &dc_table, &ac_table);
        assert_eq!(result, Err(CodecError::CoefficientOutOfRange(65535)));
    }
}
