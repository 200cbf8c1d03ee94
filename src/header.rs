//! Image header and per-component table references, assembled from
//! header, component and quantization table messages.

use crate::constants::BLOCK_SIZE;
use crate::error::CodecError;
use crate::jpeg1::quantization::QuantizationTableStore;
use crate::mcu::Channel;
use crate::messages::{ColorComponentMessage, HeaderMessage};

/// Which tables a channel's blocks are coded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorComponent {
    pub component_id: u8,
    pub horizontal_sampling_factor: u8,
    pub vertical_sampling_factor: u8,
    pub quantization_table_id: u8,
    pub huffman_dc_table_id: u8,
    pub huffman_ac_table_id: u8,
}

impl ColorComponent {
    /// Baseline YCbCr layout: luminance tables 0, chrominance tables 1, 1x1 sampling.
    pub fn default_for(channel: Channel) -> Self {
        let table_id = if channel == Channel::Y { 0 } else { 1 };
        Self {
            component_id: channel.index() as u8 + 1,
            horizontal_sampling_factor: 1,
            vertical_sampling_factor: 1,
            quantization_table_id: table_id,
            huffman_dc_table_id: table_id,
            huffman_ac_table_id: table_id,
        }
    }
}

impl From<&ColorComponentMessage> for ColorComponent {
    fn from(message: &ColorComponentMessage) -> Self {
        Self {
            component_id: message.component_id,
            horizontal_sampling_factor: message.horizontal_sampling_factor,
            vertical_sampling_factor: message.vertical_sampling_factor,
            quantization_table_id: message.quantization_table_id,
            huffman_dc_table_id: message.huffman_dc_table_id,
            huffman_ac_table_id: message.huffman_ac_table_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    pub height: u32,
    pub width: u32,
    pub filename: String,
    pub frame_type: String,
    pub precision: u8,
    pub start_of_selection: u8,
    pub end_of_selection: u8,
    pub successive_approximation: u8,
    pub color_components: Vec<ColorComponent>,
    pub quantization_tables: QuantizationTableStore,
}

impl Header {
    pub fn from_message(message: HeaderMessage) -> Result<Self, CodecError> {
        if message.width == 0 {
            return Err(CodecError::InvalidHeader("width is zero"));
        }
        if message.height == 0 {
            return Err(CodecError::InvalidHeader("height is zero"));
        }
        Ok(Self {
            height: message.height,
            width: message.width,
            filename: message.filename,
            frame_type: message.frame_type,
            precision: message.precision,
            start_of_selection: message.start_of_selection,
            end_of_selection: message.end_of_selection,
            successive_approximation: message.successive_approximation,
            color_components: Vec::new(),
            quantization_tables: QuantizationTableStore::new(),
        })
    }

    pub fn mcus_per_row(&self) -> usize {
        (self.width as usize).div_ceil(BLOCK_SIZE)
    }

    pub fn mcu_rows(&self) -> usize {
        (self.height as usize).div_ceil(BLOCK_SIZE)
    }

    /// Number of MCUs in one scan: `ceil(height / 8) * ceil(width / 8)`.
    pub fn expected_mcus(&self) -> usize {
        self.mcu_rows() * self.mcus_per_row()
    }

    /// Adds a component, replacing one with the same identifier.
    pub fn add_component(&mut self, component: ColorComponent) {
        match self
            .color_components
            .iter_mut()
            .find(|c| c.component_id == component.component_id)
        {
            Some(existing) => *existing = component,
            None => self.color_components.push(component),
        }
    }

    /// The component coding `channel`: components are matched to Y, Cb, Cr
    /// in the order they were declared.
    pub fn component(&self, channel: Channel) -> ColorComponent {
        self.color_components
            .get(channel.index())
            .copied()
            .unwrap_or_else(|| ColorComponent::default_for(channel))
    }
}
