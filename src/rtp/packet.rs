//! Packet containers, bounded field access and RTP/RTCP classification
//!
//! Classification looks at the second byte of the packet. In RTCP this is
//! the packet type; in RTP it carries the marker bit and payload type, and
//! the RTCP range (194..=224) never collides with a sane RTP payload type.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=2|P|X|  CC   |M|     PT      |       sequence number         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           timestamp                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |           synchronization source (SSRC) identifier            |
//! +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
//! ```

use bytes::{Buf, Bytes};

use crate::error::PacketError;

use super::rtcp::RtcpHeader;

/// Lowest packet type treated as RTCP
pub const RTCP_MIN_PT: u8 = 194;
/// Highest packet type treated as RTCP
pub const RTCP_MAX_PT: u8 = 224;

/// Fixed RTP header size without CSRCs or extensions
pub const RTP_HEADER_LEN: usize = 12;

/// Media kind a packet belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Audio,
    Video,
    Other,
}

/// A packet travelling through the pipeline
///
/// Cheap to clone: the payload is reference counted, so fan-out never
/// copies the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPacket {
    /// Media kind
    pub kind: PacketKind,
    /// Raw wire bytes
    pub data: Bytes,
}

impl DataPacket {
    pub fn new(kind: PacketKind, data: Bytes) -> Self {
        Self { kind, data }
    }

    pub fn audio(data: Bytes) -> Self {
        Self::new(PacketKind::Audio, data)
    }

    pub fn video(data: Bytes) -> Self {
        Self::new(PacketKind::Video, data)
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the wire bytes classify as RTCP
    pub fn is_rtcp(&self) -> bool {
        is_rtcp(&self.data)
    }
}

/// Bounds-checked big-endian field reader over a borrowed buffer
///
/// Every accessor checks `offset + size <= len` before touching memory.
#[derive(Debug, Clone, Copy)]
pub struct ByteView<'a> {
    buf: &'a [u8],
}

impl<'a> ByteView<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &'a [u8] {
        self.buf
    }

    /// Borrow `needed` bytes starting at `offset`
    pub fn range(&self, offset: usize, needed: usize) -> Result<&'a [u8], PacketError> {
        let truncated = PacketError::Truncated {
            offset,
            needed,
            len: self.buf.len(),
        };
        let end = offset.checked_add(needed).ok_or(truncated.clone())?;
        self.buf.get(offset..end).ok_or(truncated)
    }

    pub fn u8_at(&self, offset: usize) -> Result<u8, PacketError> {
        Ok(self.range(offset, 1)?.get_u8())
    }

    pub fn u16_at(&self, offset: usize) -> Result<u16, PacketError> {
        Ok(self.range(offset, 2)?.get_u16())
    }

    /// Read a 24-bit unsigned field
    pub fn u24_at(&self, offset: usize) -> Result<u32, PacketError> {
        let mut field = self.range(offset, 3)?;
        Ok((u32::from(field.get_u8()) << 16) | u32::from(field.get_u16()))
    }

    pub fn u32_at(&self, offset: usize) -> Result<u32, PacketError> {
        Ok(self.range(offset, 4)?.get_u32())
    }

    pub fn u64_at(&self, offset: usize) -> Result<u64, PacketError> {
        Ok(self.range(offset, 8)?.get_u64())
    }
}

/// Check whether a buffer holds RTCP (by the packet type byte)
pub fn is_rtcp(buf: &[u8]) -> bool {
    matches!(buf.get(1), Some(pt) if (RTCP_MIN_PT..=RTCP_MAX_PT).contains(pt))
}

/// Typed view over an RTP header
#[derive(Debug, Clone, Copy)]
pub struct RtpHeader<'a> {
    view: ByteView<'a>,
}

impl<'a> RtpHeader<'a> {
    /// Overlay a header view; fails if the fixed header does not fit
    pub fn parse(buf: &'a [u8]) -> Result<Self, PacketError> {
        let view = ByteView::new(buf);
        view.range(0, RTP_HEADER_LEN)?;
        Ok(Self { view })
    }

    pub fn version(&self) -> u8 {
        self.first_byte() >> 6
    }

    pub fn has_padding(&self) -> bool {
        self.first_byte() & 0x20 != 0
    }

    pub fn has_extension(&self) -> bool {
        self.first_byte() & 0x10 != 0
    }

    pub fn csrc_count(&self) -> u8 {
        self.first_byte() & 0x0F
    }

    pub fn marker(&self) -> bool {
        self.second_byte() & 0x80 != 0
    }

    pub fn payload_type(&self) -> u8 {
        self.second_byte() & 0x7F
    }

    pub fn sequence_number(&self) -> u16 {
        self.view.u16_at(2).unwrap_or_default()
    }

    pub fn timestamp(&self) -> u32 {
        self.view.u32_at(4).unwrap_or_default()
    }

    pub fn ssrc(&self) -> u32 {
        self.view.u32_at(8).unwrap_or_default()
    }

    /// Full header length including CSRCs and the extension block
    pub fn header_len(&self) -> Result<usize, PacketError> {
        let mut len = RTP_HEADER_LEN + 4 * usize::from(self.csrc_count());
        if self.has_extension() {
            let words = usize::from(self.view.u16_at(len + 2)?);
            len += 4 + 4 * words;
        }
        self.view.range(0, len)?;
        Ok(len)
    }

    /// Payload following the header
    pub fn payload(&self) -> Result<&'a [u8], PacketError> {
        let start = self.header_len()?;
        self.view.range(start, self.view.len() - start)
    }

    // The fixed header was validated in `parse`, so these reads cannot fail.
    fn first_byte(&self) -> u8 {
        self.view.u8_at(0).unwrap_or_default()
    }

    fn second_byte(&self) -> u8 {
        self.view.u8_at(1).unwrap_or_default()
    }
}

/// Result of classifying a wire packet
#[derive(Debug, Clone, Copy)]
pub enum Classified<'a> {
    Rtp(RtpHeader<'a>),
    /// First sub-packet of an RTCP compound packet
    Rtcp(RtcpHeader<'a>),
}

/// Classify a wire packet and overlay the matching header view
pub fn classify(buf: &[u8]) -> Result<Classified<'_>, PacketError> {
    if is_rtcp(buf) {
        let first = super::rtcp::SubPackets::new(buf)
            .next()
            .unwrap_or(Err(PacketError::Truncated {
                offset: 0,
                needed: 4,
                len: buf.len(),
            }))?;
        Ok(Classified::Rtcp(first))
    } else {
        Ok(Classified::Rtp(RtpHeader::parse(buf)?))
    }
}
