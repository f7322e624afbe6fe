//! RTP/RTCP wire handling
//!
//! This module provides:
//! - Packet classification and bounds-checked RTP header access
//! - RTCP compound-packet traversal and sub-packet field access
//! - VP8 payload descriptor parsing

pub mod packet;
pub mod rtcp;
pub mod vp8;

pub use packet::{classify, is_rtcp, ByteView, Classified, DataPacket, PacketKind, RtpHeader};
pub use rtcp::{RtcpHeader, SubPackets};
pub use vp8::{RtpVp8Parser, Vp8Descriptor, Vp8Packet};
