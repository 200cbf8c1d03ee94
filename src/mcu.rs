use crate::constants::BLOCK_DIM;

/// A coefficient block in natural (row-major) order.
pub type Block = [i16; BLOCK_DIM];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Y = 0,
    Cb = 1,
    Cr = 2,
}

impl Channel {
    /// Coding order inside an MCU.
    pub const ALL: [Channel; 3] = [Channel::Y, Channel::Cb, Channel::Cr];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Y => "Y",
            Self::Cb => "Cb",
            Self::Cr => "Cr",
        }
    }
}

/// Minimum coded unit: one 8x8 coefficient block per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mcu {
    pub y: Block,
    pub cb: Block,
    pub cr: Block,
}

impl Default for Mcu {
    fn default() -> Self {
        Self {
            y: [0; BLOCK_DIM],
            cb: [0; BLOCK_DIM],
            cr: [0; BLOCK_DIM],
        }
    }
}

impl Mcu {
    pub fn block(&self, channel: Channel) -> &Block {
        match channel {
            Channel::Y => &self.y,
            Channel::Cb => &self.cb,
            Channel::Cr => &self.cr,
        }
    }

    pub fn block_mut(&mut self, channel: Channel) -> &mut Block {
        match channel {
            Channel::Y => &mut self.y,
            Channel::Cb => &mut self.cb,
            Channel::Cr => &mut self.cr,
        }
    }
}
