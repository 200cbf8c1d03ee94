//! Threaded pipeline stages around the scan controllers.
//!
//! Each stage owns one controller and runs it on its own thread. Stages talk
//! through bounded channels, so a slow consumer blocks its producer. A stage
//! finishes when it receives [`Message::EndOfStream`] (forwarding it where it
//! has a downstream channel) and shuts down on the first fatal error.

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use crate::constants::DEFAULT_CHANNEL_CAPACITY;
use crate::error::CodecError;
use crate::messages::Message;
use crate::scan_decoder::{DecodeOutput, ScanDecoder};
use crate::scan_encoder::{EncodedScan, ScanEncoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Messages buffered between two stages before the producer blocks.
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl PipelineConfig {
    pub fn channel<T>(&self) -> (SyncSender<T>, Receiver<T>) {
        mpsc::sync_channel(self.channel_capacity.max(1))
    }
}

/// Receives each finished scan from the encoder stage.
pub trait ScanSink {
    fn write_scan(&mut self, scan: EncodedScan) -> Result<(), CodecError>;
}

impl ScanSink for Vec<EncodedScan> {
    fn write_scan(&mut self, scan: EncodedScan) -> Result<(), CodecError> {
        self.push(scan);
        Ok(())
    }
}

/// Handle of a running stage.
pub struct Stage<T> {
    handle: JoinHandle<Result<T, CodecError>>,
}

impl<T> Stage<T> {
    /// Waits for the stage to exit. Panics in the stage are propagated.
    pub fn join(self) -> Result<T, CodecError> {
        match self.handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

fn receive(input: &Receiver<Message>, stage: &str) -> Message {
    input.recv().unwrap_or_else(|_| {
        log::warn!("{stage} input closed without an end-of-stream message");
        Message::EndOfStream
    })
}

/// Runs a [`ScanEncoder`] over `input`, handing finished scans to `sink`.
/// The sink is returned when the stream ends.
pub fn spawn_encoder_stage<S>(input: Receiver<Message>, mut sink: S) -> Stage<S>
where
    S: ScanSink + Send + 'static,
{
    let handle = thread::spawn(move || -> Result<S, CodecError> {
        let mut encoder = ScanEncoder::new();
        loop {
            let message = receive(&input, "Encoder stage");
            let end_of_stream = message == Message::EndOfStream;
            match encoder.process(message) {
                Ok(Some(scan)) => sink.write_scan(scan)?,
                Ok(None) => {}
                Err(e) => {
                    log::error!("Encoder stage shutting down: {e}");
                    return Err(e);
                }
            }
            if end_of_stream {
                log::debug!("Encoder stage finished");
                return Ok(sink);
            }
        }
    });
    Stage { handle }
}

/// Runs a [`ScanDecoder`] over `input`, sending headers, MCUs and scan
/// summaries to `output`.
pub fn spawn_decoder_stage(input: Receiver<Message>, output: SyncSender<DecodeOutput>) -> Stage<()> {
    let handle = thread::spawn(move || -> Result<(), CodecError> {
        let mut decoder = ScanDecoder::new();
        loop {
            let message = receive(&input, "Decoder stage");
            let end_of_stream = message == Message::EndOfStream;
            let decoded = decoder.process(message).inspect_err(|e| {
                log::error!("Decoder stage shutting down: {e}");
            })?;
            for item in decoded {
                output.send(item).map_err(|_| CodecError::ChannelClosed)?;
            }
            if end_of_stream {
                output
                    .send(DecodeOutput::EndOfStream)
                    .map_err(|_| CodecError::ChannelClosed)?;
                log::debug!("Decoder stage finished");
                return Ok(());
            }
        }
    });
    Stage { handle }
}

fn spawn_feeder<I>(messages: I, sender: SyncSender<Message>) -> JoinHandle<()>
where
    I: IntoIterator<Item = Message> + Send + 'static,
{
    thread::spawn(move || {
        for message in messages {
            // A closed channel means the stage already shut down.
            if sender.send(message).is_err() {
                return;
            }
        }
        let _ = sender.send(Message::EndOfStream);
    })
}

/// Encodes a whole message stream on an encoder stage and collects its scans.
pub fn run_encoder<I>(messages: I, config: &PipelineConfig) -> Result<Vec<EncodedScan>, CodecError>
where
    I: IntoIterator<Item = Message> + Send + 'static,
{
    let (sender, receiver) = config.channel();
    let stage = spawn_encoder_stage(receiver, Vec::new());
    let feeder = spawn_feeder(messages, sender);
    let scans = stage.join();
    if let Err(panic) = feeder.join() {
        std::panic::resume_unwind(panic);
    }
    scans
}

/// Decodes a whole message stream on a decoder stage and collects its output,
/// without the trailing end-of-stream marker.
pub fn run_decoder<I>(messages: I, config: &PipelineConfig) -> Result<Vec<DecodeOutput>, CodecError>
where
    I: IntoIterator<Item = Message> + Send + 'static,
{
    let (sender, receiver) = config.channel();
    let (output_sender, output_receiver) = config.channel();
    let stage = spawn_decoder_stage(receiver, output_sender);
    let feeder = spawn_feeder(messages, sender);

    let mut outputs = Vec::new();
    for item in output_receiver.iter() {
        if item == DecodeOutput::EndOfStream {
            break;
        }
        outputs.push(item);
    }
    // Unblocks the stage if it is still sending after a fatal error elsewhere.
    drop(output_receiver);

    let result = stage.join();
    if let Err(panic) = feeder.join() {
        std::panic::resume_unwind(panic);
    }
    result.map(|()| outputs)
}
