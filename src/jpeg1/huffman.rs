//! Huffman coding tables for JPEG 1 Baseline.
//! Builds canonical codes from DHT lengths and values (ISO/IEC 10918-1 Annex C)
//! and provides symbol → code lookup for encoding and code → symbol decoding.

use crate::constants::{HUFFMAN_CLASS_AC, HUFFMAN_CLASS_DC, MAX_CODE_LENGTH, MAX_HUFFMAN_SYMBOLS};
use crate::error::CodecError;
use crate::jpeg1::bit_io::BitUnpacker;
use crate::messages::HuffmanTableMessage;

/// Represents a Huffman code with its bit value and length.
/// A length of 0 marks a symbol the table has no code for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HuffmanCode {
    pub value: u16,
    pub length: u8,
}

/// Standard JPEG DC luminance Huffman table lengths (Table K.3 in ISO/IEC 10918-1).
pub const STD_LUMINANCE_DC_LENGTHS: [u8; 16] = [
    0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0
];

/// Standard JPEG DC luminance Huffman table values (Table K.3 in ISO/IEC 10918-1).
pub const STD_LUMINANCE_DC_VALUES: [u8; 12] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11
];

/// Standard JPEG DC chrominance Huffman table lengths (Table K.4 in ISO/IEC 10918-1).
pub const STD_CHROMINANCE_DC_LENGTHS: [u8; 16] = [
    0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0
];

pub const STD_CHROMINANCE_DC_VALUES: [u8; 12] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11
];

/// Standard JPEG AC luminance Huffman table (Table K.5 in ISO/IEC 10918-1).
pub const STD_LUMINANCE_AC_LENGTHS: [u8; 16] = [
    0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 125
];

pub const STD_LUMINANCE_AC_VALUES: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12,
    0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07,
    0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xa1, 0x08,
    0x23, 0x42, 0xb1, 0xc1, 0x15, 0x52, 0xd1, 0xf0,
    0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0a, 0x16,
    0x17, 0x18, 0x19, 0x1a, 0x25, 0x26, 0x27, 0x28,
    0x29, 0x2a, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39,
    0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
    0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59,
    0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69,
    0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79,
    0x7a, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
    0x8a, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98,
    0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0xa7,
    0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4, 0xb5, 0xb6,
    0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3, 0xc4, 0xc5,
    0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2, 0xd3, 0xd4,
    0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda, 0xe1, 0xe2,
    0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea,
    0xf1, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8,
    0xf9, 0xfa,
];

/// Standard JPEG AC chrominance Huffman table (Table K.6 in ISO/IEC 10918-1).
pub const STD_CHROMINANCE_AC_LENGTHS: [u8; 16] = [
    0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 119
];

pub const STD_CHROMINANCE_AC_VALUES: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21,
    0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61, 0x71,
    0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91,
    0xa1, 0xb1, 0xc1, 0x09, 0x23, 0x33, 0x52, 0xf0,
    0x15, 0x62, 0x72, 0xd1, 0x0a, 0x16, 0x24, 0x34,
    0xe1, 0x25, 0xf1, 0x17, 0x18, 0x19, 0x1a, 0x26,
    0x27, 0x28, 0x29, 0x2a, 0x35, 0x36, 0x37, 0x38,
    0x39, 0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48,
    0x49, 0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58,
    0x59, 0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68,
    0x69, 0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78,
    0x79, 0x7a, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87,
    0x88, 0x89, 0x8a, 0x92, 0x93, 0x94, 0x95, 0x96,
    0x97, 0x98, 0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5,
    0xa6, 0xa7, 0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4,
    0xb5, 0xb6, 0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3,
    0xc4, 0xc5, 0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2,
    0xd3, 0xd4, 0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda,
    0xe2, 0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9,
    0xea, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8,
    0xf9, 0xfa,
];

/// Canonical Huffman table, usable for both encoding and decoding.
///
/// `table_id` is the DHT `Tc/Th` byte: the high nibble is the table class
/// (0 = DC, 1 = AC), the low nibble the destination identifier.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    table_id: u8,
    lengths: [u8; 16],
    values: Vec<u8>,
    codes: [HuffmanCode; MAX_HUFFMAN_SYMBOLS],

    // Decoding fields (ISO/IEC 10918-1, F.2.2.3)
    min_code: [i32; 16],
    max_code: [i32; 16],
    val_ptr: [i32; 16],
}

impl HuffmanTable {
    /// Builds a table from JPEG DHT lengths and values.
    pub fn build_from_dht(table_id: u8, lengths: &[u8; 16], values: &[u8]) -> Result<Self, CodecError> {
        let malformed = |reason| CodecError::MalformedTable { table_id, reason };

        let total: usize = lengths.iter().map(|&n| n as usize).sum();
        if total > MAX_HUFFMAN_SYMBOLS {
            return Err(malformed("more than 256 symbols"));
        }
        if total != values.len() {
            return Err(malformed("symbol count does not match length histogram"));
        }

        let mut table = Self {
            table_id,
            lengths: *lengths,
            values: values.to_vec(),
            codes: [HuffmanCode::default(); MAX_HUFFMAN_SYMBOLS],
            min_code: [0; 16],
            max_code: [-1; 16],
            val_ptr: [0; 16],
        };

        let mut code = 0u32;
        let mut val_idx = 0;

        for i in 0..MAX_CODE_LENGTH {
            let n_codes = lengths[i] as u32;
            let length = (i + 1) as u32;
            if code + n_codes > 1 << length {
                return Err(malformed("over-subscribed code length"));
            }
            if n_codes > 0 {
                table.val_ptr[i] = val_idx as i32;
                table.min_code[i] = code as i32;
                for _ in 0..n_codes {
                    let symbol = values[val_idx] as usize;
                    if table.codes[symbol].length != 0 {
                        return Err(malformed("duplicate symbol"));
                    }
                    table.codes[symbol] = HuffmanCode {
                        value: code as u16,
                        length: length as u8,
                    };
                    code += 1;
                    val_idx += 1;
                }
                table.max_code[i] = code as i32 - 1;
            }
            code <<= 1;
        }
        Ok(table)
    }

    pub fn from_message(message: &HuffmanTableMessage) -> Result<Self, CodecError> {
        Self::build_from_dht(message.table_id, &message.lengths, &message.table)
    }

    fn standard(table_id: u8, lengths: &[u8; 16], values: &[u8]) -> Self {
        Self::build_from_dht(table_id, lengths, values).expect("Annex K tables are well formed")
    }

    /// Returns the standard Luminance DC Huffman table as table 0x00.
    pub fn standard_luminance_dc() -> Self {
        Self::standard(0x00, &STD_LUMINANCE_DC_LENGTHS, &STD_LUMINANCE_DC_VALUES)
    }

    /// Returns the standard Luminance AC Huffman table as table 0x10.
    pub fn standard_luminance_ac() -> Self {
        Self::standard(0x10, &STD_LUMINANCE_AC_LENGTHS, &STD_LUMINANCE_AC_VALUES)
    }

    /// Returns the standard Chrominance DC Huffman table as table 0x01.
    pub fn standard_chrominance_dc() -> Self {
        Self::standard(0x01, &STD_CHROMINANCE_DC_LENGTHS, &STD_CHROMINANCE_DC_VALUES)
    }

    /// Returns the standard Chrominance AC Huffman table as table 0x11.
    pub fn standard_chrominance_ac() -> Self {
        Self::standard(0x11, &STD_CHROMINANCE_AC_LENGTHS, &STD_CHROMINANCE_AC_VALUES)
    }

    pub fn table_id(&self) -> u8 {
        self.table_id
    }

    pub fn class(&self) -> u8 {
        self.table_id >> 4
    }

    pub fn destination(&self) -> u8 {
        self.table_id & 0x0F
    }

    pub fn lengths(&self) -> &[u8; 16] {
        &self.lengths
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Looks up the code assigned to `symbol`.
    pub fn code_for(&self, symbol: u8) -> Result<HuffmanCode, CodecError> {
        let code = self.codes[symbol as usize];
        if code.length == 0 {
            Err(CodecError::Encode { symbol })
        } else {
            Ok(code)
        }
    }

    /// All (symbol, code) pairs in canonical order: by length, then list position.
    pub fn codes(&self) -> impl Iterator<Item = (u8, HuffmanCode)> + '_ {
        self.values.iter().map(|&symbol| (symbol, self.codes[symbol as usize]))
    }

    /// Decodes the next symbol, extending the candidate code one bit at a time.
    pub fn decode(&self, unpacker: &mut BitUnpacker) -> Result<u8, CodecError> {
        let mut code = 0i32;
        for i in 0..MAX_CODE_LENGTH {
            let bit = unpacker.read_bit()? as i32;
            code = (code << 1) | bit;
            if code <= self.max_code[i] {
                let idx = self.val_ptr[i] + (code - self.min_code[i]);
                return Ok(self.values[idx as usize]);
            }
        }
        Err(CodecError::Decode("no code matched within 16 bits"))
    }
}

// Baseline streams use destinations 0..=3 per class.
const TABLE_DESTINATIONS: usize = 4;

/// DC and AC Huffman tables of one image, indexed by destination.
#[derive(Debug, Clone, Default)]
pub struct HuffmanTableStore {
    dc: [Option<HuffmanTable>; TABLE_DESTINATIONS],
    ac: [Option<HuffmanTable>; TABLE_DESTINATIONS],
}

impl HuffmanTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Annex K tables: luminance at destination 0, chrominance at destination 1.
    pub fn standard() -> Self {
        let mut store = Self::new();
        store.dc[0] = Some(HuffmanTable::standard_luminance_dc());
        store.ac[0] = Some(HuffmanTable::standard_luminance_ac());
        store.dc[1] = Some(HuffmanTable::standard_chrominance_dc());
        store.ac[1] = Some(HuffmanTable::standard_chrominance_ac());
        store
    }

    /// Stores `table`, replacing any table with the same class and destination.
    pub fn insert(&mut self, table: HuffmanTable) -> Result<(), CodecError> {
        let destination = table.destination() as usize;
        if destination >= TABLE_DESTINATIONS {
            return Err(CodecError::InvalidMessage("Huffman table destination out of range"));
        }
        match table.class() {
            HUFFMAN_CLASS_DC => self.dc[destination] = Some(table),
            HUFFMAN_CLASS_AC => self.ac[destination] = Some(table),
            _ => return Err(CodecError::InvalidMessage("Huffman table class out of range")),
        }
        Ok(())
    }

    pub fn insert_message(&mut self, message: &HuffmanTableMessage) -> Result<(), CodecError> {
        self.insert(HuffmanTable::from_message(message)?)
    }

    pub fn dc(&self, destination: u8) -> Result<&HuffmanTable, CodecError> {
        self.dc
            .get(destination as usize)
            .and_then(Option::as_ref)
            .ok_or(CodecError::UnknownTable { kind: "DC Huffman", table_id: destination })
    }

    pub fn ac(&self, destination: u8) -> Result<&HuffmanTable, CodecError> {
        self.ac
            .get(destination as usize)
            .and_then(Option::as_ref)
            .ok_or(CodecError::UnknownTable { kind: "AC Huffman", table_id: destination })
    }

    /// Present tables, DC first.
    pub fn iter(&self) -> impl Iterator<Item = &HuffmanTable> {
        self.dc.iter().chain(self.ac.iter()).flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg1::bit_io::BitPacker;

    fn lengths(pairs: &[(usize, u8)]) -> [u8; 16] {
        let mut lengths = [0u8; 16];
        for &(length, count) in pairs {
            lengths[length - 1] = count;
        }
        lengths
    }

    #[test]
    fn test_canonical_codes_follow_length_order() {
        let table = HuffmanTable::build_from_dht(0, &lengths(&[(3, 2), (4, 3)]), &[7, 3, 9, 1, 4]).unwrap();

        assert_eq!(table.code_for(7).unwrap(), HuffmanCode { value: 0b000, length: 3 });
        assert_eq!(table.code_for(3).unwrap(), HuffmanCode { value: 0b001, length: 3 });
        // First length-4 code follows (last length-3 code + 1) << 1.
        assert_eq!(table.code_for(9).unwrap(), HuffmanCode { value: (0b001 + 1) << 1, length: 4 });
        assert_eq!(table.code_for(1).unwrap().value, 0b0101);
        assert_eq!(table.code_for(4).unwrap().value, 0b0110);
    }

    #[test]
    fn test_standard_luminance_dc_codes() {
        let table = HuffmanTable::standard_luminance_dc();
        assert_eq!(table.code_for(0).unwrap(), HuffmanCode { value: 0b00, length: 2 });
        assert_eq!(table.code_for(1).unwrap(), HuffmanCode { value: 0b010, length: 3 });
        assert_eq!(table.code_for(5).unwrap(), HuffmanCode { value: 0b110, length: 3 });
        assert_eq!(table.code_for(6).unwrap(), HuffmanCode { value: 0b1110, length: 4 });
        assert_eq!(table.code_for(11).unwrap(), HuffmanCode { value: 0b1_1111_1110, length: 9 });
    }

    #[test]
    fn test_standard_luminance_ac_special_symbols() {
        let table = HuffmanTable::standard_luminance_ac();
        assert_eq!(table.code_for(0x00).unwrap(), HuffmanCode { value: 0b1010, length: 4 });
        assert_eq!(table.code_for(0xF0).unwrap(), HuffmanCode { value: 0b111_1111_1001, length: 11 });
        assert_eq!(table.class(), HUFFMAN_CLASS_AC);
        assert_eq!(table.destination(), 0);
    }

    #[test]
    fn test_codes_are_unique() {
        for table in HuffmanTableStore::standard().iter() {
            let mut seen = std::collections::HashSet::new();
            for (_, code) in table.codes() {
                assert!(seen.insert((code.length, code.value)));
            }
        }
    }

    #[test]
    fn test_over_subscribed_table_is_rejected() {
        // Only two 1-bit codes exist.
        let result = HuffmanTable::build_from_dht(0x10, &lengths(&[(1, 3)]), &[0, 1, 2]);
        assert!(matches!(result, Err(CodecError::MalformedTable { table_id: 0x10, .. })));

        // Two 1-bit codes leave nothing for length 2.
        let result = HuffmanTable::build_from_dht(0, &lengths(&[(1, 2), (2, 1)]), &[0, 1, 2]);
        assert!(matches!(result, Err(CodecError::MalformedTable { .. })));
    }

    #[test]
    fn test_complete_code_space_is_accepted() {
        let table = HuffmanTable::build_from_dht(0, &lengths(&[(1, 1), (2, 2)]), &[5, 6, 7]).unwrap();
        assert_eq!(table.code_for(7).unwrap(), HuffmanCode { value: 0b11, length: 2 });
    }

    #[test]
    fn test_inconsistent_tables_are_rejected() {
        let result = HuffmanTable::build_from_dht(0, &lengths(&[(2, 3)]), &[0, 1]);
        assert!(matches!(result, Err(CodecError::MalformedTable { .. })));

        let result = HuffmanTable::build_from_dht(0, &lengths(&[(2, 2)]), &[4, 4]);
        assert!(matches!(result, Err(CodecError::MalformedTable { .. })));
    }

    #[test]
    fn test_missing_symbol_is_encode_error() {
        let table = HuffmanTable::standard_luminance_dc();
        assert_eq!(table.code_for(12), Err(CodecError::Encode { symbol: 12 }));
    }

    #[test]
    fn test_decode_symbols() {
        let table = HuffmanTable::standard_luminance_ac();
        let mut packer = BitPacker::new();
        for symbol in [0x01, 0xF0, 0x32, 0x00] {
            let code = table.code_for(symbol).unwrap();
            packer.put_bits(code.value as u32, code.length);
        }
        let mut unpacker = BitUnpacker::from_bytes(&packer.finish());
        for symbol in [0x01, 0xF0, 0x32, 0x00] {
            assert_eq!(table.decode(&mut unpacker).unwrap(), symbol);
        }
    }

    #[test]
    fn test_decode_unassigned_code_fails() {
        // Only code 0 of length 1 exists; a run of 1 bits never matches.
        let table = HuffmanTable::build_from_dht(0, &lengths(&[(1, 1)]), &[3]).unwrap();
        let mut unpacker = BitUnpacker::from_bytes(&[0x7F, 0x7F, 0x7F]);
        assert_eq!(table.decode(&mut unpacker).unwrap(), 3);
        assert!(matches!(table.decode(&mut unpacker), Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_store_routes_by_class_and_destination() {
        let mut store = HuffmanTableStore::new();
        assert!(store.is_empty());
        let message = HuffmanTableMessage {
            table_id: 0x12,
            lengths: STD_CHROMINANCE_AC_LENGTHS,
            table: STD_CHROMINANCE_AC_VALUES.to_vec(),
        };
        store.insert_message(&message).unwrap();
        assert_eq!(store.ac(2).unwrap().table_id(), 0x12);
        assert!(matches!(store.dc(2), Err(CodecError::UnknownTable { .. })));
        assert!(matches!(store.ac(9), Err(CodecError::UnknownTable { .. })));

        let bad_class = HuffmanTable::build_from_dht(0x21, &lengths(&[(1, 1)]), &[0]).unwrap();
        assert!(matches!(store.insert(bad_class), Err(CodecError::InvalidMessage(_))));
    }
}
