//! Scan controller for the decode direction.
//!
//! Compressed data arrives in arbitrary chunks. MCUs are decoded as soon as
//! enough bits are buffered; an MCU cut off by the end of a chunk is retried
//! from its first bit once the next chunk arrives.

use log::{debug, error, info, warn};

use crate::constants::CHANNEL_COUNT;
use crate::error::CodecError;
use crate::header::{ColorComponent, Header};
use crate::jpeg_marker_code::JpegMarkerCode;
use crate::jpeg1::bit_io::BitUnpacker;
use crate::jpeg1::entropy_decoder::decode_block;
use crate::jpeg1::huffman::HuffmanTableStore;
use crate::jpeg1::quantization::{dequantize, QuantizationTable};
use crate::mcu::{Channel, Mcu};
use crate::messages::{CompressedDataMessage, Message};
use crate::scan_encoder::ScanState;

/// Outcome of one decoded scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub filename: String,
    pub mcus_decoded: usize,
    pub expected_mcus: usize,
    pub corrupt_blocks: usize,
    /// The data ended (end of stream or a marker) before the last MCU.
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutput {
    /// The finished header of the scan, emitted when its data begins.
    Header(Header),
    /// A dequantized MCU, in raster order.
    Mcu(Box<Mcu>),
    ScanComplete(ScanSummary),
    /// Forwarded by the decoder stage once its input has ended.
    EndOfStream,
}

enum McuOutcome {
    /// The MCU and the per-block errors hit while decoding it.
    Decoded(Mcu, Vec<(Channel, CodecError)>),
    Stalled,
    Marker(u8),
}

pub struct ScanDecoder {
    state: ScanState,
    header: Option<Header>,
    huffman_tables: HuffmanTableStore,
    previous_dc: [i16; CHANNEL_COUNT],
    mcus_decoded: usize,
    expected_mcus: usize,
    corrupt_blocks: usize,
    data_started: bool,
    unpacker: BitUnpacker,
}

impl Default for ScanDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanDecoder {
    /// Starts with the Annex K tables, as used by streams that carry no DHT.
    pub fn new() -> Self {
        Self::with_tables(HuffmanTableStore::standard())
    }

    pub fn with_tables(huffman_tables: HuffmanTableStore) -> Self {
        Self {
            state: ScanState::Idle,
            header: None,
            huffman_tables,
            previous_dc: [0; CHANNEL_COUNT],
            mcus_decoded: 0,
            expected_mcus: 0,
            corrupt_blocks: 0,
            data_started: false,
            unpacker: BitUnpacker::new(),
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn previous_dc(&self) -> [i16; CHANNEL_COUNT] {
        self.previous_dc
    }

    pub fn mcus_decoded(&self) -> usize {
        self.mcus_decoded
    }

    pub fn expected_mcus(&self) -> usize {
        self.expected_mcus
    }

    /// Handles one message and returns everything it completed, in order.
    pub fn process(&mut self, message: Message) -> Result<Vec<DecodeOutput>, CodecError> {
        let mut output = Vec::new();
        match message {
            Message::Header(header_message) => {
                if self.state == ScanState::ScanActive {
                    warn!(
                        "New header while {} of {} MCUs were decoded; discarding the scan",
                        self.mcus_decoded, self.expected_mcus
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
                if self.state == ScanState::ScanActive && self.data_started {
                    return Err(self.protocol_violation("HuffmanTable"));
                }
                self.huffman_tables.insert_message(&table)?;
            }
            Message::CompressedData(data) => self.consume(data, &mut output)?,
            Message::EndOfStream => {
                if self.state == ScanState::ScanActive {
                    warn!(
                        "Stream ended after {} of {} MCUs",
                        self.mcus_decoded, self.expected_mcus
                    );
                    output.push(self.finish_scan(true));
                }
            }
            other => return Err(self.protocol_violation(other.name())),
        }
        Ok(output)
    }

    fn start_scan(&mut self, header: Header) {
        self.expected_mcus = header.expected_mcus();
        self.mcus_decoded = 0;
        self.corrupt_blocks = 0;
        self.previous_dc = [0; CHANNEL_COUNT];
        self.data_started = false;
        self.unpacker.restart();
        info!(
            "Decoding scan for {:?}: {}x{}, {} MCUs",
            header.filename, header.width, header.height, self.expected_mcus
        );
        self.header = Some(header);
        self.state = ScanState::ScanActive;
    }

    fn configurable_header(&mut self, received: &'static str) -> Result<&mut Header, CodecError> {
        if self.state != ScanState::ScanActive || self.data_started {
            return Err(self.protocol_violation(received));
        }
        self.header
            .as_mut()
            .ok_or(CodecError::InvalidHeader("no header for the active scan"))
    }

    fn consume(&mut self, data: CompressedDataMessage, output: &mut Vec<DecodeOutput>) -> Result<(), CodecError> {
        if self.state != ScanState::ScanActive {
            return Err(self.protocol_violation("CompressedData"));
        }
        if !self.data_started {
            self.data_started = true;
            if let Some(header) = &self.header {
                output.push(DecodeOutput::Header(header.clone()));
            }
        }
        self.unpacker.extend(&data.data);

        while self.mcus_decoded < self.expected_mcus {
            self.unpacker.compact();
            let checkpoint = self.unpacker.checkpoint();
            let saved_dc = self.previous_dc;

            match self.decode_mcu()? {
                McuOutcome::Decoded(mut mcu, failures) => {
                    for (channel, e) in &failures {
                        warn!(
                            "Error during {} component Huffman decoding of MCU {}: {}",
                            channel.name(),
                            self.mcus_decoded,
                            e
                        );
                    }
                    let header = self
                        .header
                        .as_ref()
                        .ok_or(CodecError::InvalidHeader("no header for the active scan"))?;
                    dequantize(&mut mcu, header)?;
                    self.corrupt_blocks += failures.len();
                    self.mcus_decoded += 1;
                    output.push(DecodeOutput::Mcu(Box::new(mcu)));
                }
                McuOutcome::Stalled => {
                    self.unpacker.rewind(checkpoint);
                    self.previous_dc = saved_dc;
                    return Ok(());
                }
                McuOutcome::Marker(code) => {
                    self.previous_dc = saved_dc;
                    self.unpacker.skip_marker();
                    match JpegMarkerCode::try_from(code) {
                        Ok(marker) if marker.is_restart() => {
                            debug!("{:?} after MCU {}; resetting predictors", marker, self.mcus_decoded);
                            self.previous_dc = [0; CHANNEL_COUNT];
                        }
                        _ => {
                            warn!(
                                "Marker 0xFF{:02X} ended the scan after {} of {} MCUs",
                                code, self.mcus_decoded, self.expected_mcus
                            );
                            output.push(self.finish_scan(true));
                            return Ok(());
                        }
                    }
                }
            }
        }

        output.push(self.finish_scan(false));
        Ok(())
    }

    fn decode_mcu(&mut self) -> Result<McuOutcome, CodecError> {
        let header = self
            .header
            .as_ref()
            .ok_or(CodecError::InvalidHeader("no header for the active scan"))?;
        let mut mcu = Mcu::default();
        let mut failures = Vec::new();

        for channel in Channel::ALL {
            let component = header.component(channel);
            let dc_table = self.huffman_tables.dc(component.huffman_dc_table_id)?;
            let ac_table = self.huffman_tables.ac(component.huffman_ac_table_id)?;
            let dc_prev = &mut self.previous_dc[channel.index()];

            match decode_block(&mut self.unpacker, dc_prev, mcu.block_mut(channel), dc_table, ac_table) {
                Ok(()) => {}
                Err(CodecError::NeedMoreData) => return Ok(McuOutcome::Stalled),
                Err(CodecError::MarkerReached(code)) => return Ok(McuOutcome::Marker(code)),
                Err(e) if e.is_recoverable() => failures.push((channel, e)),
                Err(e) => return Err(e),
            }
        }
        Ok(McuOutcome::Decoded(mcu, failures))
    }

    fn finish_scan(&mut self, truncated: bool) -> DecodeOutput {
        self.state = ScanState::Idle;
        let filename = self.header.take().map(|h| h.filename).unwrap_or_default();
        debug!(
            "Scan complete: {} of {} MCUs, {} corrupt blocks",
            self.mcus_decoded, self.expected_mcus, self.corrupt_blocks
        );
        DecodeOutput::ScanComplete(ScanSummary {
            filename,
            mcus_decoded: self.mcus_decoded,
            expected_mcus: self.expected_mcus,
            corrupt_blocks: self.corrupt_blocks,
            truncated,
        })
    }

    fn protocol_violation(&self, received: &'static str) -> CodecError {
        let state = self.state.describe();
        error!("Huffman decoder received {} message while {}; requesting shutdown", received, state);
        CodecError::ProtocolViolation { received, state }
    }
}
