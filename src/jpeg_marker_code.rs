use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum JpegMarkerCode {
    /// SOF0: Marks the start of a baseline DCT frame.
    StartOfFrameBaseline = 0xC0,

    /// DHT: Defines one or more Huffman tables.
    DefineHuffmanTable = 0xC4,

    /// RST0..RST7: Restart markers inside entropy-coded data.
    Restart0 = 0xD0,
    Restart1 = 0xD1,
    Restart2 = 0xD2,
    Restart3 = 0xD3,
    Restart4 = 0xD4,
    Restart5 = 0xD5,
    Restart6 = 0xD6,
    Restart7 = 0xD7,

    /// SOI: Marks the start of an image.
    StartOfImage = 0xD8,

    /// EOI: Marks the end of an image.
    EndOfImage = 0xD9,

    /// SOS: Marks the start of scan.
    StartOfScan = 0xDA,

    /// DQT: Defines one or more quantization tables.
    DefineQuantizationTable = 0xDB,

    /// DNL: Defines the number of lines in a scan.
    DefineNumberOfLines = 0xDC,

    /// DRI: Defines the restart interval used in succeeding scans.
    DefineRestartInterval = 0xDD,

    /// APP0: Application data 0: used for JFIF header.
    ApplicationData0 = 0xE0,

    /// COM: Comment block.
    Comment = 0xFE,
}

impl JpegMarkerCode {
    pub fn is_restart(self) -> bool {
        let code = self as u8;
        (JPEG_RESTART_MARKER_BASE..JPEG_RESTART_MARKER_BASE + JPEG_RESTART_MARKER_RANGE)
            .contains(&code)
    }
}

pub const JPEG_MARKER_START_BYTE: u8 = 0xFF;
pub const JPEG_STUFFING_BYTE: u8 = 0x00;
pub const JPEG_RESTART_MARKER_BASE: u8 = 0xD0;
pub const JPEG_RESTART_MARKER_RANGE: u8 = 8;
