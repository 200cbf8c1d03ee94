//! Quantization and entropy-coding core of a baseline JPEG pipeline.
//!
//! Upstream stages publish headers, tables and coefficient data as
//! [`Message`]s. The [`ScanEncoder`] Huffman codes raw MCUs into an
//! entropy-coded segment; the [`ScanDecoder`] turns compressed data back into
//! dequantized MCUs. [`pipeline`] runs either controller as a threaded stage.

pub mod constants;
pub mod error;
pub mod header;
pub mod jpeg1;
pub mod jpeg_marker_code;
pub mod jpeg_stream_writer;
pub mod mcu;
pub mod messages;
pub mod pipeline;
pub mod scan_decoder;
pub mod scan_encoder;

pub use error::CodecError;
pub use header::{ColorComponent, Header};
pub use jpeg_stream_writer::{JpegFileSink, JpegImage, JpegStreamWriter};
pub use mcu::{Block, Channel, Mcu};
pub use messages::{Message, MessageKind};
pub use pipeline::{PipelineConfig, ScanSink};
pub use scan_decoder::{DecodeOutput, ScanDecoder, ScanSummary};
pub use scan_encoder::{EncodedScan, ScanEncoder, ScanState};
