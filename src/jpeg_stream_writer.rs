//! Baseline JPEG file assembly.
//!
//! `JpegStreamWriter` emits the markers and segments around an entropy-coded
//! scan (SOI, APP0, DQT, SOF0, DHT, SOS, EOI). `JpegFileSink` plugs it into
//! the encoder stage and collects one complete file per scan.

use crate::constants::{BLOCK_DIM, ZIGZAG_ORDER};
use crate::error::CodecError;
use crate::header::{ColorComponent, Header};
use crate::jpeg1::huffman::{HuffmanTable, HuffmanTableStore};
use crate::jpeg1::quantization::QuantizationTable;
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JpegMarkerCode};
use crate::mcu::Channel;
use crate::pipeline::ScanSink;
use crate::scan_encoder::EncodedScan;

const DEFAULT_SAMPLE_PRECISION: u8 = 8;

/// A writer for JPEG codestreams that manages marker and segment emission.
#[derive(Debug, Default)]
pub struct JpegStreamWriter {
    destination: Vec<u8>,
}

impl JpegStreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.destination.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destination.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.destination
    }

    pub fn write_byte(&mut self, value: u8) {
        self.destination.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.destination.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.destination.extend_from_slice(bytes);
    }

    pub fn write_marker(&mut self, marker: JpegMarkerCode) {
        self.write_byte(JPEG_MARKER_START_BYTE);
        self.write_byte(marker.into());
    }

    /// Writes a marker followed by the length field of a segment with
    /// `payload` bytes after it.
    fn write_segment_header(&mut self, marker: JpegMarkerCode, payload: usize) -> Result<(), CodecError> {
        let length = u16::try_from(payload + 2).map_err(|_| CodecError::InvalidMessage("segment too long"))?;
        self.write_marker(marker);
        self.write_u16(length);
        Ok(())
    }

    pub fn write_start_of_image(&mut self) {
        self.write_marker(JpegMarkerCode::StartOfImage);
    }

    pub fn write_end_of_image(&mut self) {
        self.write_marker(JpegMarkerCode::EndOfImage);
    }

    /// JFIF 1.01 APP0 segment, square pixels, no thumbnail.
    pub fn write_jfif_segment(&mut self) -> Result<(), CodecError> {
        self.write_segment_header(JpegMarkerCode::ApplicationData0, 14)?;
        self.write_bytes(b"JFIF\0");
        self.write_byte(1);
        self.write_byte(1);
        self.write_byte(0); // density units: aspect ratio only
        self.write_u16(1);
        self.write_u16(1);
        self.write_byte(0);
        self.write_byte(0);
        Ok(())
    }

    /// DQT segment; the table is stored in zigzag order.
    pub fn write_dqt(&mut self, table: &QuantizationTable) -> Result<(), CodecError> {
        let precision = table.precision();
        let entry_size = if precision == 0 { 1 } else { 2 };
        self.write_segment_header(JpegMarkerCode::DefineQuantizationTable, 1 + BLOCK_DIM * entry_size)?;
        self.write_byte((precision << 4) | (table.table_id() & 0x0F));
        let values = table.values();
        for &natural in &ZIGZAG_ORDER {
            if precision == 0 {
                self.write_byte(values[natural] as u8);
            } else {
                self.write_u16(values[natural]);
            }
        }
        Ok(())
    }

    pub fn write_dht(&mut self, table: &HuffmanTable) -> Result<(), CodecError> {
        let values = table.values();
        self.write_segment_header(JpegMarkerCode::DefineHuffmanTable, 1 + 16 + values.len())?;
        self.write_byte(table.table_id());
        self.write_bytes(table.lengths());
        self.write_bytes(values);
        Ok(())
    }

    pub fn write_sof0_segment(&mut self, header: &Header, components: &[ColorComponent]) -> Result<(), CodecError> {
        let height = u16::try_from(header.height).map_err(|_| CodecError::InvalidHeader("height exceeds 65535"))?;
        let width = u16::try_from(header.width).map_err(|_| CodecError::InvalidHeader("width exceeds 65535"))?;
        let precision = if header.precision == 0 {
            DEFAULT_SAMPLE_PRECISION
        } else {
            header.precision
        };

        self.write_segment_header(JpegMarkerCode::StartOfFrameBaseline, 6 + components.len() * 3)?;
        self.write_byte(precision);
        self.write_u16(height);
        self.write_u16(width);
        self.write_byte(components.len() as u8);
        for component in components {
            self.write_byte(component.component_id);
            self.write_byte((component.horizontal_sampling_factor << 4) | (component.vertical_sampling_factor & 0x0F));
            self.write_byte(component.quantization_table_id);
        }
        Ok(())
    }

    pub fn write_sos_segment(&mut self, components: &[ColorComponent]) -> Result<(), CodecError> {
        self.write_segment_header(JpegMarkerCode::StartOfScan, 1 + components.len() * 2 + 3)?;
        self.write_byte(components.len() as u8);
        for component in components {
            self.write_byte(component.component_id);
            self.write_byte((component.huffman_dc_table_id << 4) | (component.huffman_ac_table_id & 0x0F));
        }
        self.write_byte(0); // Ss
        self.write_byte(63); // Se
        self.write_byte(0); // Ah/Al
        Ok(())
    }

    /// Assembles a complete baseline JPEG file around `scan`.
    pub fn write_image(&mut self, scan: &EncodedScan) -> Result<(), CodecError> {
        let components: Vec<ColorComponent> = Channel::ALL
            .iter()
            .map(|&channel| scan.header.component(channel))
            .collect();

        self.write_start_of_image();
        self.write_jfif_segment()?;
        for table in scan.header.quantization_tables.iter() {
            self.write_dqt(table)?;
        }
        self.write_sof0_segment(&scan.header, &components)?;
        write_used_tables(self, &scan.huffman_tables, &components)?;
        self.write_sos_segment(&components)?;
        self.write_bytes(&scan.data);
        self.write_end_of_image();
        Ok(())
    }
}

fn write_used_tables(
    writer: &mut JpegStreamWriter,
    tables: &HuffmanTableStore,
    components: &[ColorComponent],
) -> Result<(), CodecError> {
    let mut written: Vec<u8> = Vec::new();
    for component in components {
        for table in [
            tables.dc(component.huffman_dc_table_id)?,
            tables.ac(component.huffman_ac_table_id)?,
        ] {
            if !written.contains(&table.table_id()) {
                writer.write_dht(table)?;
                written.push(table.table_id());
            }
        }
    }
    Ok(())
}

/// One assembled JPEG file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JpegImage {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Scan sink that assembles each finished scan into a JPEG file in memory.
#[derive(Debug, Default)]
pub struct JpegFileSink {
    images: Vec<JpegImage>,
}

impl JpegFileSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn images(&self) -> &[JpegImage] {
        &self.images
    }

    pub fn into_images(self) -> Vec<JpegImage> {
        self.images
    }
}

impl ScanSink for JpegFileSink {
    fn write_scan(&mut self, scan: EncodedScan) -> Result<(), CodecError> {
        if scan.corrupt_blocks > 0 {
            log::warn!(
                "{}: writing scan with {} corrupt blocks",
                scan.header.filename,
                scan.corrupt_blocks
            );
        }
        let mut writer = JpegStreamWriter::new();
        writer.write_image(&scan)?;
        self.images.push(JpegImage {
            filename: scan.header.filename,
            bytes: writer.into_bytes(),
        });
        Ok(())
    }
}
