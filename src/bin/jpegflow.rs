//! jpegflow CLI - drives the baseline JPEG entropy-coding pipeline.
//!
//! Synthesizes coefficient-domain test images, runs them through the encoder
//! and decoder stages and writes baseline JPEG files.

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;

use jpegflow::jpeg1::huffman::HuffmanTable;
use jpegflow::jpeg1::quantization::{dequantize, quantize, QuantizationTableStore};
use jpegflow::messages::{CompressedDataMessage, HeaderMessage, QuantizationTableMessage};
use jpegflow::pipeline::{self, spawn_encoder_stage};
use jpegflow::{DecodeOutput, Header, JpegFileSink, Mcu, Message, PipelineConfig};

/// Baseline JPEG quantization and Huffman coding pipeline
#[derive(Parser)]
#[command(name = "jpegflow")]
#[command(version)]
#[command(about = "Runs MCU coefficient data through the baseline JPEG entropy coder", long_about = None)]
#[command(after_help = "EXAMPLES:
    jpegflow encode -o gradient.jpg -w 256 -H 128
    jpegflow encode -o checker.jpg -w 64 -H 64 -p checker -q 50
    jpegflow roundtrip -w 320 -H 240 --chunk-size 7
    jpegflow codes -t luminance-ac")]
struct Cli {
    /// Log scan lifecycle events (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Messages buffered between pipeline stages
    #[arg(long, global = true, default_value_t = PipelineConfig::default().channel_capacity)]
    capacity: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a synthesized test image into a baseline JPEG file
    #[command(visible_alias = "e")]
    Encode {
        /// Output JPEG file
        #[arg(short, long)]
        output: PathBuf,

        /// Image width in pixels
        #[arg(short, long, default_value = "256")]
        width: u32,

        /// Image height in pixels
        #[arg(short = 'H', long, default_value = "256")]
        height: u32,

        /// Test pattern to synthesize
        #[arg(short, long, default_value = "gradient", value_enum)]
        pattern: Pattern,

        /// Quality level (1-100) used to scale the standard quantization tables
        #[arg(short, long, default_value = "75")]
        quality: u32,
    },

    /// Encode, then decode in chunks, and compare the coefficients
    #[command(visible_alias = "r")]
    Roundtrip {
        /// Image width in pixels
        #[arg(short, long, default_value = "256")]
        width: u32,

        /// Image height in pixels
        #[arg(short = 'H', long, default_value = "256")]
        height: u32,

        /// Test pattern to synthesize
        #[arg(short, long, default_value = "checker", value_enum)]
        pattern: Pattern,

        /// Quality level (1-100)
        #[arg(short, long, default_value = "75")]
        quality: u32,

        /// Size of the compressed data chunks fed to the decoder
        #[arg(long, default_value = "4096")]
        chunk_size: usize,
    },

    /// Print the canonical codes of a standard Huffman table
    Codes {
        /// Annex K table to print
        #[arg(short, long, default_value = "luminance-dc", value_enum)]
        table: StandardTable,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Pattern {
    /// Diagonal brightness ramp with a mild horizontal texture
    Gradient,
    /// Alternating bright and dark blocks with colored edges
    Checker,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StandardTable {
    LuminanceDc,
    LuminanceAc,
    ChrominanceDc,
    ChrominanceAc,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let config = PipelineConfig {
        channel_capacity: cli.capacity,
    };

    let result = match cli.command {
        Commands::Encode {
            output,
            width,
            height,
            pattern,
            quality,
        } => encode_image(&output, width, height, pattern, quality, &config),
        Commands::Roundtrip {
            width,
            height,
            pattern,
            quality,
            chunk_size,
        } => roundtrip(width, height, pattern, quality, chunk_size, &config),
        Commands::Codes { table } => print_codes(table),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// A synthesized image: the messages that configure the scan and its
/// quantized MCUs in raster order.
struct TestImage {
    header: Header,
    configuration: Vec<Message>,
    mcus: Vec<Mcu>,
}

fn synthesize(width: u32, height: u32, pattern: Pattern, quality: u32, filename: &str) -> Result<TestImage, Box<dyn std::error::Error>> {
    let header_message = HeaderMessage {
        height,
        width,
        filename: filename.to_string(),
        frame_type: "baseline".to_string(),
        precision: 8,
        start_of_selection: 0,
        end_of_selection: 63,
        successive_approximation: 0,
    };
    let mut header = Header::from_message(header_message.clone())?;
    header.quantization_tables = QuantizationTableStore::standard(quality);

    let mut configuration = vec![Message::Header(header_message)];
    for table in header.quantization_tables.iter() {
        configuration.push(Message::QuantizationTable(QuantizationTableMessage {
            table_id: table.table_id(),
            precision: table.precision(),
            table: table.values().to_vec(),
        }));
    }

    let columns = header.mcus_per_row();
    let rows = header.mcu_rows();
    let mut mcus = Vec::with_capacity(header.expected_mcus());
    for row in 0..rows {
        for column in 0..columns {
            let mut mcu = pattern_mcu(pattern, column, row, columns, rows);
            quantize(&mut mcu, &header)?;
            mcus.push(mcu);
        }
    }

    Ok(TestImage {
        header,
        configuration,
        mcus,
    })
}

/// DCT coefficients of one MCU of the pattern (level-shifted, unquantized).
fn pattern_mcu(pattern: Pattern, column: usize, row: usize, columns: usize, rows: usize) -> Mcu {
    let mut mcu = Mcu::default();
    match pattern {
        Pattern::Gradient => {
            let span = (columns + rows).saturating_sub(2).max(1);
            let level = ((column + row) * 255 / span) as i16;
            mcu.y[0] = (level - 128) * 8;
            mcu.y[1] = -40;
            mcu.y[8] = 12;
            mcu.cb[0] = ((column * 255 / columns.max(1)) as i16 - 128) * 2;
            mcu.cr[0] = ((row * 255 / rows.max(1)) as i16 - 128) * 2;
        }
        Pattern::Checker => {
            let bright = (column + row) % 2 == 0;
            mcu.y[0] = if bright { 800 } else { -800 };
            mcu.y[1] = if bright { 120 } else { -120 };
            mcu.y[9] = 60;
            mcu.y[63] = 16;
            mcu.cb[0] = if bright { -200 } else { 200 };
            mcu.cr[2] = 90;
        }
    }
    mcu
}

fn encode_image(
    output: &PathBuf,
    width: u32,
    height: u32,
    pattern: Pattern,
    quality: u32,
    config: &PipelineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let filename = output.display().to_string();
    let image = synthesize(width, height, pattern, quality, &filename)?;

    let (sender, receiver) = config.channel();
    let stage = spawn_encoder_stage(receiver, JpegFileSink::new());
    for message in image.configuration {
        sender.send(message)?;
    }
    for mcu in image.mcus {
        sender.send(Message::from(mcu))?;
    }
    sender.send(Message::EndOfStream)?;

    let images = stage.join()?.into_images();
    let jpeg = images.first().ok_or("encoder produced no image")?;
    fs::write(output, &jpeg.bytes)?;
    println!(
        "✓ Encoded {}x{} {:?} pattern ({} MCUs) to {:?}, {} bytes",
        width,
        height,
        pattern,
        image.header.expected_mcus(),
        output,
        jpeg.bytes.len()
    );
    Ok(())
}

fn roundtrip(
    width: u32,
    height: u32,
    pattern: Pattern,
    quality: u32,
    chunk_size: usize,
    config: &PipelineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = synthesize(width, height, pattern, quality, "roundtrip")?;

    let mut messages = image.configuration.clone();
    messages.extend(image.mcus.iter().cloned().map(Message::from));
    let scans = pipeline::run_encoder(messages, config)?;
    let scan = scans.first().ok_or("encoder produced no scan")?;

    let mut messages = image.configuration.clone();
    messages.extend(
        scan.data
            .chunks(chunk_size.max(1))
            .map(|chunk| Message::CompressedData(CompressedDataMessage { data: chunk.to_vec() })),
    );
    let outputs = pipeline::run_decoder(messages, config)?;

    let mut mismatches = 0;
    let mut decoded = 0;
    for output in &outputs {
        match output {
            DecodeOutput::Mcu(mcu) => {
                let mut expected = image.mcus.get(decoded).cloned().ok_or("decoder produced extra MCUs")?;
                dequantize(&mut expected, &image.header)?;
                if **mcu != expected {
                    mismatches += 1;
                }
                decoded += 1;
            }
            DecodeOutput::ScanComplete(summary) => {
                println!(
                    "Scan {:?}: {} of {} MCUs, {} corrupt blocks{}",
                    summary.filename,
                    summary.mcus_decoded,
                    summary.expected_mcus,
                    summary.corrupt_blocks,
                    if summary.truncated { ", truncated" } else { "" }
                );
            }
            DecodeOutput::Header(_) | DecodeOutput::EndOfStream => {}
        }
    }

    println!(
        "Encoded {} MCUs into {} bytes, decoded {} in {}-byte chunks",
        image.mcus.len(),
        scan.data.len(),
        decoded,
        chunk_size.max(1)
    );
    if mismatches > 0 || decoded != image.mcus.len() {
        return Err(format!("{} of {} MCUs differ after the round trip", mismatches, image.mcus.len()).into());
    }
    println!("✓ All MCUs match");
    Ok(())
}

fn print_codes(table: StandardTable) -> Result<(), Box<dyn std::error::Error>> {
    let table = match table {
        StandardTable::LuminanceDc => HuffmanTable::standard_luminance_dc(),
        StandardTable::LuminanceAc => HuffmanTable::standard_luminance_ac(),
        StandardTable::ChrominanceDc => HuffmanTable::standard_chrominance_dc(),
        StandardTable::ChrominanceAc => HuffmanTable::standard_chrominance_ac(),
    };

    println!("Table {:#04x} ({} symbols)", table.table_id(), table.values().len());
    println!("{:<8} {:<6} Code", "Symbol", "Length");
    println!("{}", "-".repeat(32));
    for (symbol, code) in table.codes() {
        println!(
            "{:#04x}     {:<6} {:0width$b}",
            symbol,
            code.length,
            code.value,
            width = code.length as usize
        );
    }
    Ok(())
}
