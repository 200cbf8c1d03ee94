//! Scan controller for the encode direction.
//!
//! Owns the per-scan state (DC predictors, MCU counters, bit buffer) of one
//! image stream and turns a sequence of header, table and MCU messages into a
//! finished entropy-coded segment.

use log::{debug, error, info, warn};

use crate::constants::{CHANNEL_COUNT, PACKER_BYTES_PER_MCU};
use crate::error::CodecError;
use crate::header::{ColorComponent, Header};
use crate::jpeg1::bit_io::BitPacker;
use crate::jpeg1::entropy_encoder::encode_block;
use crate::jpeg1::huffman::HuffmanTableStore;
use crate::jpeg1::quantization::QuantizationTable;
use crate::mcu::{Channel, Mcu};
use crate::messages::Message;

// Cap on the up-front reservation; the buffer still grows past it.
const MAX_INITIAL_RESERVATION: usize = 1 << 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    ScanActive,
}

impl ScanState {
    pub(crate) fn describe(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ScanActive => "a scan is active",
        }
    }
}

/// Entropy-coded data of one completed scan, ready for final JPEG assembly.
#[derive(Debug, Clone)]
pub struct EncodedScan {
    pub header: Header,
    pub huffman_tables: HuffmanTableStore,
    pub data: Vec<u8>,
    pub mcu_count: usize,
    pub corrupt_blocks: usize,
}

pub struct ScanEncoder {
    state: ScanState,
    header: Option<Header>,
    huffman_tables: HuffmanTableStore,
    previous_dc: [i16; CHANNEL_COUNT],
    mcus_encoded: usize,
    expected_mcus: usize,
    corrupt_blocks: usize,
    packer: BitPacker,
}

impl Default for ScanEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanEncoder {
    /// Starts with the Annex K tables; Huffman table messages replace them.
    pub fn new() -> Self {
        Self::with_tables(HuffmanTableStore::standard())
    }

    pub fn with_tables(huffman_tables: HuffmanTableStore) -> Self {
        Self {
            state: ScanState::Idle,
            header: None,
            huffman_tables,
            previous_dc: [0; CHANNEL_COUNT],
            mcus_encoded: 0,
            expected_mcus: 0,
            corrupt_blocks: 0,
            packer: BitPacker::new(),
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn previous_dc(&self) -> [i16; CHANNEL_COUNT] {
        self.previous_dc
    }

    pub fn mcus_encoded(&self) -> usize {
        self.mcus_encoded
    }

    pub fn expected_mcus(&self) -> usize {
        self.expected_mcus
    }

    pub fn huffman_tables(&self) -> &HuffmanTableStore {
        &self.huffman_tables
    }

    /// Handles one message. Returns the finished scan once its last MCU is coded.
    ///
    /// Errors are fatal for this stream: malformed or missing tables, invalid
    /// headers and protocol violations. Per-block coding failures are logged
    /// and counted instead.
    pub fn process(&mut self, message: Message) -> Result<Option<EncodedScan>, CodecError> {
        match message {
            Message::Header(header_message) => {
                if self.state == ScanState::ScanActive {
                    warn!(
                        "New header while {} of {} MCUs were encoded; discarding the scan",
                        self.mcus_encoded, self.expected_mcus
                    );
                }
                self.start_scan(Header::from_message(header_message)?);
            }
            Message::ColorComponent(component) => {
                self.configurable_header("ColorComponent")?
                    .add_component(ColorComponent::from(&component));
            }
            Message::QuantizationTable(table) => {
                let table = QuantizationTable::from_message(&table)?;
                self.configurable_header("QuantizationTable")?
                    .quantization_tables
                    .insert(table)?;
            }
            Message::HuffmanTable(table) => {
                if self.state == ScanState::ScanActive && self.mcus_encoded > 0 {
                    return Err(self.protocol_violation("HuffmanTable"));
                }
                self.huffman_tables.insert_message(&table)?;
            }
            Message::Mcu(mcu) => {
                if self.state != ScanState::ScanActive {
                    return Err(self.protocol_violation("MCU"));
                }
                self.encode_mcu(&mcu)?;
                self.mcus_encoded += 1;
                if self.mcus_encoded >= self.expected_mcus {
                    return Ok(Some(self.finish_scan()));
                }
            }
            Message::EndOfStream => {
                if self.state == ScanState::ScanActive {
                    warn!(
                        "Stream ended after {} of {} MCUs; discarding the scan",
                        self.mcus_encoded, self.expected_mcus
                    );
                    self.state = ScanState::Idle;
                    self.header = None;
                }
            }
            other => return Err(self.protocol_violation(other.name())),
        }
        Ok(None)
    }

    fn start_scan(&mut self, header: Header) {
        self.expected_mcus = header.expected_mcus();
        self.mcus_encoded = 0;
        self.corrupt_blocks = 0;
        self.previous_dc = [0; CHANNEL_COUNT];
        self.packer.restart();
        self.packer
            .reserve((self.expected_mcus * PACKER_BYTES_PER_MCU).min(MAX_INITIAL_RESERVATION));
        info!(
            "Encoding scan for {:?}: {}x{}, {} MCUs",
            header.filename, header.width, header.height, self.expected_mcus
        );
        self.header = Some(header);
        self.state = ScanState::ScanActive;
    }

    /// The header of the active scan, while it can still change.
    fn configurable_header(&mut self, received: &'static str) -> Result<&mut Header, CodecError> {
        if self.state != ScanState::ScanActive || self.mcus_encoded > 0 {
            return Err(self.protocol_violation(received));
        }
        self.header
            .as_mut()
            .ok_or(CodecError::InvalidHeader("no header for the active scan"))
    }

    fn encode_mcu(&mut self, mcu: &Mcu) -> Result<(), CodecError> {
        let header = self
            .header
            .as_ref()
            .ok_or(CodecError::InvalidHeader("no header for the active scan"))?;

        for channel in Channel::ALL {
            let component = header.component(channel);
            let dc_table = self.huffman_tables.dc(component.huffman_dc_table_id)?;
            let ac_table = self.huffman_tables.ac(component.huffman_ac_table_id)?;
            let dc_prev = &mut self.previous_dc[channel.index()];

            match encode_block(&mut self.packer, dc_prev, mcu.block(channel), dc_table, ac_table) {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => {
                    warn!(
                        "Error during {} component Huffman coding of MCU {}: {}",
                        channel.name(),
                        self.mcus_encoded,
                        e
                    );
                    self.corrupt_blocks += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn finish_scan(&mut self) -> EncodedScan {
        self.state = ScanState::Idle;
        let data = self.packer.finish();
        let header = self.header.take().unwrap_or_default();
        debug!(
            "Scan complete: {} MCUs, {} bytes, {} corrupt blocks",
            self.mcus_encoded,
            data.len(),
            self.corrupt_blocks
        );
        EncodedScan {
            header,
            huffman_tables: self.huffman_tables.clone(),
            data,
            mcu_count: self.mcus_encoded,
            corrupt_blocks: self.corrupt_blocks,
        }
    }

    fn protocol_violation(&self, received: &'static str) -> CodecError {
        let state = self.state.describe();
        error!("Huffman encoder received {} message while {}; requesting shutdown", received, state);
        CodecError::ProtocolViolation { received, state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg1::huffman::HuffmanTable;
    use crate::messages::{ColorComponentMessage, CompressedDataMessage, HeaderMessage, HuffmanTableMessage};

    fn header_message(width: u32, height: u32) -> Message {
        Message::Header(HeaderMessage {
            width,
            height,
            filename: "test.jpg".to_string(),
            ..HeaderMessage::default()
        })
    }

    fn mcu_with_dc(y: i16, cb: i16, cr: i16) -> Message {
        let mut mcu = Mcu::default();
        mcu.y[0] = y;
        mcu.cb[0] = cb;
        mcu.cr[0] = cr;
        Message::from(mcu)
    }

    #[test]
    fn test_scan_completes_after_expected_mcus() {
        let mut encoder = ScanEncoder::new();
        assert_eq!(encoder.state(), ScanState::Idle);
        assert!(encoder.process(header_message(16, 9)).unwrap().is_none());
        assert_eq!(encoder.expected_mcus(), 4);
        assert_eq!(encoder.state(), ScanState::ScanActive);

        for _ in 0..3 {
            assert!(encoder.process(mcu_with_dc(1, 2, 3)).unwrap().is_none());
        }
        let scan = encoder.process(mcu_with_dc(1, 2, 3)).unwrap().unwrap();
        assert_eq!(scan.mcu_count, 4);
        assert_eq!(scan.corrupt_blocks, 0);
        assert_eq!(scan.header.filename, "test.jpg");
        assert!(!scan.data.is_empty());
        assert_eq!(encoder.state(), ScanState::Idle);
    }

    #[test]
    fn test_header_resets_predictors() {
        let mut encoder = ScanEncoder::new();
        encoder.process(header_message(8, 8)).unwrap();
        let scan = encoder.process(mcu_with_dc(100, -20, 7)).unwrap();
        assert!(scan.is_some());
        assert_eq!(encoder.previous_dc(), [100, -20, 7]);

        encoder.process(header_message(8, 8)).unwrap();
        assert_eq!(encoder.previous_dc(), [0, 0, 0]);
        assert_eq!(encoder.mcus_encoded(), 0);
    }

    #[test]
    fn test_header_mid_scan_starts_over() {
        let mut encoder = ScanEncoder::new();
        encoder.process(header_message(16, 8)).unwrap();
        assert!(encoder.process(mcu_with_dc(100, -20, 7)).unwrap().is_none());
        assert_eq!(encoder.previous_dc(), [100, -20, 7]);

        encoder.process(header_message(16, 8)).unwrap();
        assert_eq!(encoder.previous_dc(), [0, 0, 0]);
        assert_eq!(encoder.mcus_encoded(), 0);
        assert_eq!(encoder.state(), ScanState::ScanActive);
        encoder.process(mcu_with_dc(50, 3, -3)).unwrap();
        let restarted = encoder.process(mcu_with_dc(-50, 0, 9)).unwrap().unwrap();

        let mut fresh = ScanEncoder::new();
        fresh.process(header_message(16, 8)).unwrap();
        fresh.process(mcu_with_dc(50, 3, -3)).unwrap();
        let expected = fresh.process(mcu_with_dc(-50, 0, 9)).unwrap().unwrap();
        assert_eq!(restarted.data, expected.data);
        assert_eq!(restarted.mcu_count, 2);
    }

    #[test]
    fn test_identical_scans_produce_identical_data() {
        let mut encoder = ScanEncoder::new();
        let mut outputs = Vec::new();
        for _ in 0..2 {
            encoder.process(header_message(16, 8)).unwrap();
            encoder.process(mcu_with_dc(50, 3, -3)).unwrap();
            outputs.push(encoder.process(mcu_with_dc(-50, 0, 9)).unwrap().unwrap().data);
        }
        assert_eq!(outputs[0], outputs[1]);
    }

    #[test]
    fn test_mcu_while_idle_is_protocol_violation() {
        let mut encoder = ScanEncoder::new();
        let result = encoder.process(mcu_with_dc(0, 0, 0));
        assert_eq!(
            result.unwrap_err(),
            CodecError::ProtocolViolation { received: "MCU", state: "idle" }
        );
    }

    #[test]
    fn test_unexpected_message_kinds() {
        let mut encoder = ScanEncoder::new();
        encoder.process(header_message(8, 8)).unwrap();
        let result = encoder.process(Message::CompressedData(CompressedDataMessage::default()));
        assert!(matches!(result, Err(CodecError::ProtocolViolation { received: "CompressedData", .. })));

        let component = Message::ColorComponent(ColorComponentMessage::default());
        encoder.process(header_message(16, 8)).unwrap();
        encoder.process(mcu_with_dc(0, 0, 0)).unwrap();
        let result = encoder.process(component);
        assert!(matches!(result, Err(CodecError::ProtocolViolation { received: "ColorComponent", .. })));
    }

    #[test]
    fn test_table_messages_configure_the_scan() {
        let mut encoder = ScanEncoder::with_tables(HuffmanTableStore::new());
        encoder.process(header_message(8, 8)).unwrap();
        // Without tables the scan cannot be coded at all.
        assert!(matches!(
            encoder.process(mcu_with_dc(0, 0, 0)),
            Err(CodecError::UnknownTable { .. })
        ));

        encoder.process(header_message(8, 8)).unwrap();
        for table in [HuffmanTable::standard_luminance_dc(), HuffmanTable::standard_luminance_ac()] {
            encoder
                .process(Message::HuffmanTable(HuffmanTableMessage {
                    table_id: table.table_id(),
                    lengths: *table.lengths(),
                    table: table.values().to_vec(),
                }))
                .unwrap();
        }
        for component_id in 1..=3 {
            encoder
                .process(Message::ColorComponent(ColorComponentMessage {
                    component_id,
                    horizontal_sampling_factor: 1,
                    vertical_sampling_factor: 1,
                    ..ColorComponentMessage::default()
                }))
                .unwrap();
        }
        let scan = encoder.process(mcu_with_dc(5, 5, 5)).unwrap().unwrap();
        assert_eq!(scan.header.color_components.len(), 3);
        assert_eq!(scan.corrupt_blocks, 0);
    }

    #[test]
    fn test_malformed_table_is_fatal() {
        let mut encoder = ScanEncoder::new();
        let mut lengths = [0u8; 16];
        lengths[0] = 3;
        let result = encoder.process(Message::HuffmanTable(HuffmanTableMessage {
            table_id: 0x00,
            lengths,
            table: vec![0, 1, 2],
        }));
        assert!(matches!(result, Err(CodecError::MalformedTable { .. })));
    }

    #[test]
    fn test_corrupt_blocks_are_counted_and_scan_continues() {
        let mut encoder = ScanEncoder::new();
        encoder.process(header_message(16, 8)).unwrap();
        // The Y difference of 4000 needs category 12, missing from the DC table.
        encoder.process(mcu_with_dc(2000, 0, 0)).unwrap();
        let scan = encoder.process(mcu_with_dc(-2000, 0, 0)).unwrap().unwrap();
        assert_eq!(scan.mcu_count, 2);
        assert_eq!(scan.corrupt_blocks, 1);
    }

    #[test]
    fn test_end_of_stream_discards_partial_scan() {
        let mut encoder = ScanEncoder::new();
        encoder.process(header_message(16, 16)).unwrap();
        encoder.process(mcu_with_dc(1, 1, 1)).unwrap();
        assert!(encoder.process(Message::EndOfStream).unwrap().is_none());
        assert_eq!(encoder.state(), ScanState::Idle);
    }
}
