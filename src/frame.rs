//! Reusable transmit and receive descriptors.
use bxcan::{Data, Fifo, Frame, Id, StandardId};

/// Classic CAN payload size. Every transmitted frame declares this length.
pub const PAYLOAD_LEN: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdType {
    Standard,
    Extended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameType {
    Data,
    Remote,
}

/// Header written before each transmission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxHeader {
    pub id: StandardId,
    pub dlc: u8,
    pub frame_type: FrameType,
    pub id_type: IdType,
    /// bxCAN can replace the last two data bytes with a timestamp. Never set.
    pub transmit_global_time: bool,
}

impl TxHeader {
    pub const fn new() -> Self {
        Self::standard(StandardId::ZERO)
    }

    /// Data frame, standard identifier, 8 bytes, no timestamp.
    pub const fn standard(id: StandardId) -> Self {
        TxHeader {
            id,
            dlc: PAYLOAD_LEN as u8,
            frame_type: FrameType::Data,
            id_type: IdType::Standard,
            transmit_global_time: false,
        }
    }

    /// Rewrites the header in place for a new transmission.
    pub fn prepare(&mut self, id: StandardId) {
        *self = Self::standard(id);
    }

    pub fn to_frame(&self, data: &[u8; PAYLOAD_LEN]) -> Frame {
        Frame::new_data(self.id, Data::from(*data))
    }
}

impl Default for TxHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Header of the last frame read from a receive FIFO.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RxHeader {
    pub id: Id,
    pub id_type: IdType,
    pub dlc: u8,
    pub frame_type: FrameType,
    pub fifo: Fifo,
}

/// Receive descriptor and payload buffer, overwritten by every read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RxSlot {
    pub header: Option<RxHeader>,
    pub data: [u8; PAYLOAD_LEN],
}

impl RxSlot {
    pub const fn new() -> Self {
        RxSlot {
            header: None,
            data: [0; PAYLOAD_LEN],
        }
    }

    /// Copies `frame` into the slot. Bytes past the frame's DLC are zeroed.
    pub fn store(&mut self, frame: &Frame, fifo: Fifo) {
        let frame_type = if frame.is_remote_frame() {
            FrameType::Remote
        } else {
            FrameType::Data
        };

        let id_type = match frame.id() {
            Id::Standard(_) => IdType::Standard,
            Id::Extended(_) => IdType::Extended,
        };

        self.header = Some(RxHeader {
            id: frame.id(),
            id_type,
            dlc: frame.dlc(),
            frame_type,
            fifo,
        });

        self.data = [0; PAYLOAD_LEN];
        if let Some(data) = frame.data() {
            self.data[..data.len()].copy_from_slice(data);
        }
    }

    /// Valid payload bytes of the last frame. Empty for remote frames.
    pub fn payload(&self) -> &[u8] {
        match self.header {
            Some(RxHeader {
                frame_type: FrameType::Data,
                dlc,
                ..
            }) => &self.data[..dlc as usize],
            _ => &[],
        }
    }
}

impl Default for RxSlot {
    fn default() -> Self {
        Self::new()
    }
}
