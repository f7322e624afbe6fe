//! VP8 RTP payload descriptor parsing (RFC 7741)
//!
//! ```text
//!       0 1 2 3 4 5 6 7
//!      +-+-+-+-+-+-+-+-+
//!      |X|R|N|S|R| PID | (REQUIRED)
//!      +-+-+-+-+-+-+-+-+
//! X:   |I|L|T|K| RSV   | (OPTIONAL)
//!      +-+-+-+-+-+-+-+-+
//! I:   |M| PictureID   | (OPTIONAL, 7 or 15 bits)
//!      +-+-+-+-+-+-+-+-+
//! L:   |   TL0PICIDX   | (OPTIONAL)
//!      +-+-+-+-+-+-+-+-+
//! T/K: |TID|Y| KEYIDX  | (OPTIONAL)
//!      +-+-+-+-+-+-+-+-+
//! ```
//!
//! The first payload byte after the descriptor is the VP8 frame tag; its
//! low bit (P) is 0 for keyframes.

use crate::error::PacketError;

use super::packet::{ByteView, RtpHeader};

/// Parsed VP8 payload descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vp8Descriptor {
    /// Frame is not used as a reference
    pub non_reference: bool,
    /// First packet of a VP8 partition
    pub start_of_partition: bool,
    /// Partition index
    pub partition_id: u8,
    /// 7 or 15-bit picture ID
    pub picture_id: Option<u16>,
    /// Temporal layer zero index
    pub tl0_pic_idx: Option<u8>,
    /// Temporal layer index
    pub temporal_id: Option<u8>,
    /// Layer sync bit
    pub layer_sync: bool,
    /// Temporal key frame index
    pub key_idx: Option<u8>,
    /// Descriptor length in bytes
    pub len: usize,
}

impl Vp8Descriptor {
    /// Parse the descriptor at the start of an RTP payload
    pub fn parse(payload: &[u8]) -> Result<Self, PacketError> {
        let view = ByteView::new(payload);
        let first = view.u8_at(0)?;

        let mut desc = Vp8Descriptor {
            non_reference: first & 0x20 != 0,
            start_of_partition: first & 0x10 != 0,
            partition_id: first & 0x07,
            ..Default::default()
        };
        let mut offset = 1;

        if first & 0x80 != 0 {
            let ext = view.u8_at(offset)?;
            offset += 1;

            if ext & 0x80 != 0 {
                let pic = view.u8_at(offset)?;
                if pic & 0x80 != 0 {
                    desc.picture_id = Some(view.u16_at(offset)? & 0x7FFF);
                    offset += 2;
                } else {
                    desc.picture_id = Some(u16::from(pic));
                    offset += 1;
                }
            }

            if ext & 0x40 != 0 {
                desc.tl0_pic_idx = Some(view.u8_at(offset)?);
                offset += 1;
            }

            let has_tid = ext & 0x20 != 0;
            let has_key_idx = ext & 0x10 != 0;
            if has_tid || has_key_idx {
                let byte = view.u8_at(offset)?;
                if has_tid {
                    desc.temporal_id = Some(byte >> 6);
                    desc.layer_sync = byte & 0x20 != 0;
                }
                if has_key_idx {
                    desc.key_idx = Some(byte & 0x1F);
                }
                offset += 1;
            }
        }

        desc.len = offset;
        Ok(desc)
    }

    /// Whether this packet begins a new VP8 frame
    pub fn is_frame_start(&self) -> bool {
        self.start_of_partition && self.partition_id == 0
    }
}

/// A VP8 RTP packet with its descriptor resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vp8Packet {
    pub descriptor: Vp8Descriptor,
    /// First packet of a keyframe
    pub keyframe_start: bool,
    /// Offset of the VP8 bitstream within the RTP packet
    pub payload_offset: usize,
}

/// Parses VP8 RTP packets for the relay
#[derive(Debug, Clone, Copy, Default)]
pub struct RtpVp8Parser;

impl RtpVp8Parser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a full RTP packet carrying VP8
    pub fn parse(&self, packet: &[u8]) -> Result<Vp8Packet, PacketError> {
        let rtp = RtpHeader::parse(packet)?;
        let header_len = rtp.header_len()?;
        let payload = rtp.payload()?;
        let descriptor = Vp8Descriptor::parse(payload)?;

        let keyframe_start = descriptor.is_frame_start()
            && ByteView::new(payload)
                .u8_at(descriptor.len)
                .map(|tag| tag & 0x01 == 0)
                .unwrap_or(false);

        Ok(Vp8Packet {
            descriptor,
            keyframe_start,
            payload_offset: header_len + descriptor.len,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use bytes::{BufMut, BytesMut};

    use super::*;

    pub(crate) fn vp8_rtp(seq: u16, ts: u32, ssrc: u32, keyframe_start: bool) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_u8(0x80);
        buf.put_u8(100);
        buf.put_u16(seq);
        buf.put_u32(ts);
        buf.put_u32(ssrc);
        // X=1, S=1, PID=0; I=1 with a 15-bit picture ID
        buf.put_u8(0x90);
        buf.put_u8(0x80);
        buf.put_u16(0x8000 | seq);
        buf.put_u8(if keyframe_start { 0x10 } else { 0x11 });
        buf.put_slice(&[0x9D, 0x01, 0x2A]);
        buf
    }

    #[test]
    fn test_minimal_descriptor() {
        let desc = Vp8Descriptor::parse(&[0x10, 0x00]).unwrap();
        assert!(desc.start_of_partition);
        assert!(desc.is_frame_start());
        assert_eq!(desc.picture_id, None);
        assert_eq!(desc.len, 1);
    }

    #[test]
    fn test_extended_descriptor() {
        // X, N, S, PID=1; I, L, T, K; 7-bit picture ID; TL0PICIDX; TID/Y/KEYIDX
        let desc = Vp8Descriptor::parse(&[0xB1, 0xF0, 0x05, 0x09, 0b1010_0011]).unwrap();

        assert!(desc.non_reference);
        assert_eq!(desc.partition_id, 1);
        assert!(!desc.is_frame_start());
        assert_eq!(desc.picture_id, Some(5));
        assert_eq!(desc.tl0_pic_idx, Some(9));
        assert_eq!(desc.temporal_id, Some(2));
        assert!(desc.layer_sync);
        assert_eq!(desc.key_idx, Some(3));
        assert_eq!(desc.len, 5);
    }

    #[test]
    fn test_truncated_descriptor() {
        assert!(Vp8Descriptor::parse(&[]).is_err());
        // X set but extension byte missing
        assert!(Vp8Descriptor::parse(&[0x80]).is_err());
        // M set but second picture ID byte missing
        assert!(Vp8Descriptor::parse(&[0x80, 0x80, 0x81]).is_err());
    }

    #[test]
    fn test_parse_rtp_keyframe() {
        let parser = RtpVp8Parser::new();

        let key = parser.parse(&vp8_rtp(7, 0, 1, true)).unwrap();
        assert!(key.keyframe_start);
        assert_eq!(key.descriptor.picture_id, Some(7));
        assert_eq!(key.payload_offset, 12 + 4);

        let delta = parser.parse(&vp8_rtp(8, 0, 1, false)).unwrap();
        assert!(!delta.keyframe_start);
    }
}
