//! Typed messages exchanged between pipeline stages.
//!
//! Upstream parsers publish headers, components, tables and compressed data;
//! the encode path receives raw MCU coefficient blocks instead of compressed
//! data. Numeric message tags are converted once, at the pipeline boundary,
//! into [`MessageKind`].

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::mcu::Mcu;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MessageKind {
    Header = 1,
    ColorComponent = 2,
    CompressedData = 3,
    HuffmanTable = 4,
    QuantizationTable = 5,
    Mcu = 6,
    PixelRow = 7,
}

impl MessageKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Header => "Header",
            Self::ColorComponent => "ColorComponent",
            Self::CompressedData => "CompressedData",
            Self::HuffmanTable => "HuffmanTable",
            Self::QuantizationTable => "QuantizationTable",
            Self::Mcu => "MCU",
            Self::PixelRow => "PixelRow",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMessage {
    pub height: u32,
    pub width: u32,
    pub filename: String,
    pub frame_type: String,
    pub precision: u8,
    // Progressive scan parameters; carried but unused by baseline coding.
    pub start_of_selection: u8,
    pub end_of_selection: u8,
    pub successive_approximation: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorComponentMessage {
    pub component_id: u8,
    pub horizontal_sampling_factor: u8,
    pub vertical_sampling_factor: u8,
    pub quantization_table_id: u8,
    pub huffman_ac_table_id: u8,
    pub huffman_dc_table_id: u8,
}

/// A DHT table: `table_id` is the `Tc/Th` byte (class in the high nibble).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTableMessage {
    pub table_id: u8,
    pub lengths: [u8; 16],
    pub table: Vec<u8>,
}

/// A quantization table in natural (row-major) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizationTableMessage {
    pub table_id: u8,
    pub precision: u8,
    pub table: Vec<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressedDataMessage {
    pub data: Vec<u8>,
}

impl CompressedDataMessage {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelRowMessage {
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Header(HeaderMessage),
    ColorComponent(ColorComponentMessage),
    CompressedData(CompressedDataMessage),
    HuffmanTable(HuffmanTableMessage),
    QuantizationTable(QuantizationTableMessage),
    Mcu(Box<Mcu>),
    PixelRow(PixelRowMessage),
    /// Sentinel: the producer is done, stages finish and exit.
    EndOfStream,
}

impl Message {
    pub fn kind(&self) -> Option<MessageKind> {
        match self {
            Self::Header(_) => Some(MessageKind::Header),
            Self::ColorComponent(_) => Some(MessageKind::ColorComponent),
            Self::CompressedData(_) => Some(MessageKind::CompressedData),
            Self::HuffmanTable(_) => Some(MessageKind::HuffmanTable),
            Self::QuantizationTable(_) => Some(MessageKind::QuantizationTable),
            Self::Mcu(_) => Some(MessageKind::Mcu),
            Self::PixelRow(_) => Some(MessageKind::PixelRow),
            Self::EndOfStream => None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().map_or("EndOfStream", MessageKind::name)
    }
}

impl From<Mcu> for Message {
    fn from(mcu: Mcu) -> Self {
        Self::Mcu(Box::new(mcu))
    }
}
