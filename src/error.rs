use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    // Table errors: fatal for the image that carries the table
    #[error("Malformed Huffman table {table_id:#04x}: {reason}")]
    MalformedTable { table_id: u8, reason: &'static str },
    #[error("Unknown {kind} table {table_id}")]
    UnknownTable { kind: &'static str, table_id: u8 },

    // Per-block errors: logged, block counted as corrupt, scan continues
    #[error("No Huffman code for symbol {symbol:#04x}")]
    Encode { symbol: u8 },
    #[error("Huffman decoding failed: {0}")]
    Decode(&'static str),
    #[error("Coefficient difference {0} exceeds the largest magnitude category")]
    CoefficientOutOfRange(i32),

    // Bit stream state
    #[error("Need more data")]
    NeedMoreData,
    #[error("Marker 0xFF{0:02X} reached inside entropy-coded data")]
    MarkerReached(u8),

    // Stream protocol
    #[error("Protocol violation: {received} message while {state}")]
    ProtocolViolation {
        received: &'static str,
        state: &'static str,
    },
    #[error("Invalid header: {0}")]
    InvalidHeader(&'static str),
    #[error("Invalid message: {0}")]
    InvalidMessage(&'static str),
    #[error("Pipeline channel closed")]
    ChannelClosed,
}

impl CodecError {
    /// Per-block errors never abort a scan.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Encode { .. } | Self::Decode(_) | Self::CoefficientOutOfRange(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_block_errors_are_recoverable() {
        assert!(CodecError::Encode { symbol: 0xF1 }.is_recoverable());
        assert!(CodecError::Decode("run past the end of the block").is_recoverable());
        assert!(CodecError::CoefficientOutOfRange(40000).is_recoverable());
        assert!(!CodecError::NeedMoreData.is_recoverable());
        assert!(!CodecError::MarkerReached(0xD9).is_recoverable());
        assert!(!CodecError::UnknownTable { kind: "DC", table_id: 2 }.is_recoverable());
        assert!(!CodecError::InvalidHeader("width is zero").is_recoverable());
    }
}
