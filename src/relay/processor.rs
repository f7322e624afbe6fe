//! Decode/encode processors used when frames must be re-encoded
//!
//! Codec work is delegated; the relay only owns the handles.

use bytes::Bytes;

use crate::rtp::{DataPacket, PacketKind};

/// A decoded audio or video frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDataPacket {
    pub kind: PacketKind,
    /// Frame timestamp in RTP clock units
    pub timestamp: u32,
    pub data: Bytes,
}

impl RawDataPacket {
    pub fn new(kind: PacketKind, timestamp: u32, data: Bytes) -> Self {
        Self {
            kind,
            timestamp,
            data,
        }
    }
}

/// Depacketizes and decodes publisher RTP into raw frames
pub trait InputProcessor: Send {
    /// Feed one RTP packet; returns a frame once one is complete
    fn decode(&mut self, packet: &DataPacket) -> Option<RawDataPacket>;
}

/// Encodes and packetizes raw frames back into RTP
pub trait OutputProcessor: Send {
    /// Encode one frame into zero or more RTP packets
    fn encode(&mut self, frame: &RawDataPacket) -> Vec<Bytes>;
}
