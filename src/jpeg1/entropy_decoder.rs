//! Baseline Huffman decoding of one coefficient block (ISO/IEC 10918-1, F.2.2).

use crate::constants::{BLOCK_DIM, END_OF_BLOCK, MAX_CATEGORY, ZERO_RUN_LENGTH, ZERO_RUN_SPAN, ZIGZAG_ORDER};
use crate::error::CodecError;
use crate::jpeg1::bit_io::BitUnpacker;
use crate::jpeg1::huffman::HuffmanTable;
use crate::mcu::Block;

/// Decodes the value from bits given its category (ISO/IEC 10918-1 F.2.2.1).
pub fn extend_magnitude(bits: u16, category: u8) -> i32 {
    if category == 0 {
        return 0;
    }
    let threshold = 1i32 << (category - 1);
    if (bits as i32) < threshold {
        bits as i32 - (1 << category) + 1
    } else {
        bits as i32
    }
}

fn read_magnitude(unpacker: &mut BitUnpacker, category: u8) -> Result<i32, CodecError> {
    if category > MAX_CATEGORY {
        return Err(CodecError::Decode("magnitude category out of range"));
    }
    let bits = unpacker.read_bits(category)?;
    Ok(extend_magnitude(bits, category))
}

/// Decodes one block into `output` (natural order), updating the DC predictor.
pub fn decode_block(
    unpacker: &mut BitUnpacker,
    dc_prev: &mut i16,
    output: &mut Block,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
) -> Result<(), CodecError> {
    output.fill(0);

    // 1. Decode DC
    let dc_category = dc_table.decode(unpacker)?;
    let dc_diff = read_magnitude(unpacker, dc_category)?;
    let dc_val = i16::try_from(*dc_prev as i32 + dc_diff)
        .map_err(|_| CodecError::Decode("DC value out of range"))?;
    *dc_prev = dc_val;
    output[0] = dc_val;

    // 2. Decode AC
    let mut k = 1;
    while k < BLOCK_DIM {
        let symbol = ac_table.decode(unpacker)?;
        if symbol == END_OF_BLOCK {
            break;
        }
        if symbol == ZERO_RUN_LENGTH {
            // A zero run is always followed by a non-zero coefficient.
            k += ZERO_RUN_SPAN;
            if k >= BLOCK_DIM {
                return Err(CodecError::Decode("run past the end of the block"));
            }
            continue;
        }

        let run = (symbol >> 4) as usize;
        let category = symbol & 0x0F;
        k += run;
        if k >= BLOCK_DIM {
            return Err(CodecError::Decode("run past the end of the block"));
        }

        let value = read_magnitude(unpacker, category)?;
        output[ZIGZAG_ORDER[k]] = value as i16;
        k += 1;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg1::bit_io::BitPacker;
    use crate::jpeg1::entropy_encoder::{encode_block, magnitude_bits, magnitude_category};

    #[test]
    fn test_extend_magnitude() {
        assert_eq!(extend_magnitude(0, 0), 0);
        assert_eq!(extend_magnitude(2, 3), -5);
        assert_eq!(extend_magnitude(5, 3), 5);
        assert_eq!(extend_magnitude(0, 1), -1);
        assert_eq!(extend_magnitude(1, 1), 1);
        for value in -2047..=2047 {
            let category = magnitude_category(value);
            assert_eq!(extend_magnitude(magnitude_bits(value, category) as u16, category), value);
        }
    }

    #[test]
    fn test_decode_predicts_dc() {
        let dc_table = HuffmanTable::standard_chrominance_dc();
        let ac_table = HuffmanTable::standard_chrominance_ac();
        let mut packer = BitPacker::new();
        let mut encoder_dc = 0i16;
        let mut first = [0i16; 64];
        first[0] = 100;
        let mut second = [0i16; 64];
        second[0] = 95;
        second[1] = -3;
        encode_block(&mut packer, &mut encoder_dc, &first, &dc_table, &ac_table).unwrap();
        encode_block(&mut packer, &mut encoder_dc, &second, &dc_table, &ac_table).unwrap();

        let mut unpacker = BitUnpacker::from_bytes(&packer.finish());
        let mut decoder_dc = 0i16;
        let mut output = [7i16; 64];
        decode_block(&mut unpacker, &mut decoder_dc, &mut output, &dc_table, &ac_table).unwrap();
        assert_eq!(output, first);
        assert_eq!(decoder_dc, 100);
        decode_block(&mut unpacker, &mut decoder_dc, &mut output, &dc_table, &ac_table).unwrap();
        assert_eq!(output, second);
        assert_eq!(decoder_dc, 95);
    }

    #[test]
    fn test_run_past_end_is_decode_error() {
        let dc_table = HuffmanTable::standard_luminance_dc();
        let ac_table = HuffmanTable::standard_luminance_ac();
        let mut packer = BitPacker::new();
        let dc = dc_table.code_for(0).unwrap();
        packer.put_bits(dc.value as u32, dc.length);
        for _ in 0..3 {
            let zrl = ac_table.code_for(ZERO_RUN_LENGTH).unwrap();
            packer.put_bits(zrl.value as u32, zrl.length);
        }
        // 48 zeros skipped, a run of 15 lands on index 64.
        let symbol = ac_table.code_for(0xF1).unwrap();
        packer.put_bits(symbol.value as u32, symbol.length);
        packer.put_bits(1, 1);

        let mut unpacker = BitUnpacker::from_bytes(&packer.finish());
        let mut output = [0i16; 64];
        let result = decode_block(&mut unpacker, &mut 0, &mut output, &dc_table, &ac_table);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_zero_runs_past_end_are_decode_error() {
        let dc_table = HuffmanTable::standard_luminance_dc();
        let ac_table = HuffmanTable::standard_luminance_ac();
        let dc = dc_table.code_for(0).unwrap();
        let zrl = ac_table.code_for(ZERO_RUN_LENGTH).unwrap();
        let one = ac_table.code_for(0x01).unwrap();

        // Four ZRLs from index 1 end at 65.
        let mut packer = BitPacker::new();
        packer.put_bits(dc.value as u32, dc.length);
        for _ in 0..4 {
            packer.put_bits(zrl.value as u32, zrl.length);
        }
        let mut unpacker = BitUnpacker::from_bytes(&packer.finish());
        let mut output = [0i16; 64];
        let result = decode_block(&mut unpacker, &mut 0, &mut output, &dc_table, &ac_table);
        assert_eq!(result, Err(CodecError::Decode("run past the end of the block")));

        // One coefficient, then four ZRLs from index 2 end at 66.
        let mut packer = BitPacker::new();
        packer.put_bits(dc.value as u32, dc.length);
        packer.put_bits(one.value as u32, one.length);
        packer.put_bits(1, 1);
        for _ in 0..4 {
            packer.put_bits(zrl.value as u32, zrl.length);
        }
        let mut unpacker = BitUnpacker::from_bytes(&packer.finish());
        let result = decode_block(&mut unpacker, &mut 0, &mut output, &dc_table, &ac_table);
        assert_eq!(result, Err(CodecError::Decode("run past the end of the block")));
    }

    #[test]
    fn test_truncated_data_needs_more() {
        let dc_table = HuffmanTable::standard_luminance_dc();
        let ac_table = HuffmanTable::standard_luminance_ac();
        let mut block = [0i16; 64];
        for (i, coeff) in block.iter_mut().enumerate() {
            *coeff = (i as i16 % 7) - 3;
        }
        let mut packer = BitPacker::new();
        encode_block(&mut packer, &mut 0, &block, &dc_table, &ac_table).unwrap();
        let data = packer.finish();

        let mut unpacker = BitUnpacker::from_bytes(&data[..data.len() / 2]);
        let mut output = [0i16; 64];
        let result = decode_block(&mut unpacker, &mut 0, &mut output, &dc_table, &ac_table);
        assert_eq!(result, Err(CodecError::NeedMoreData));
    }
}
