//! RTCP sub-packet views and compound-packet traversal
//!
//! Common header shared by every RTCP sub-packet:
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=2|P| RC/FMT  |      PT       |             length            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     SSRC of packet sender                     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     SSRC of media source / first report block (feedback, RR)  |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! The length field counts 32-bit words minus one, so a sub-packet spans
//! `(length + 1) * 4` bytes including its header.

use crate::error::PacketError;

use super::packet::ByteView;

/// Sender Report
pub const RTCP_SENDER_PT: u8 = 200;
/// Receiver Report
pub const RTCP_RECEIVER_PT: u8 = 201;
/// Source Description
pub const RTCP_SDES_PT: u8 = 202;
/// Goodbye
pub const RTCP_BYE_PT: u8 = 203;
/// Application-defined
pub const RTCP_APP_PT: u8 = 204;
/// Transport-layer feedback (NACK)
pub const RTCP_RTP_FEEDBACK_PT: u8 = 205;
/// Payload-specific feedback
pub const RTCP_PS_FEEDBACK_PT: u8 = 206;

/// Generic NACK format of transport-layer feedback
pub const RTCP_NACK_FMT: u8 = 1;
/// Picture Loss Indication
pub const RTCP_PLI_FMT: u8 = 1;
/// Slice Loss Indication
pub const RTCP_SLI_FMT: u8 = 2;
/// Full Intra Request
pub const RTCP_FIR_FMT: u8 = 4;
/// Application-layer feedback (REMB)
pub const RTCP_AFB_FMT: u8 = 15;

/// Unique identifier carried by REMB application feedback
pub const REMB_UNIQUE_ID: &[u8; 4] = b"REMB";

/// Bounded view over one RTCP sub-packet
///
/// The view never extends past the sub-packet's declared length, so field
/// reads cannot spill into the next sub-packet or past the datagram.
#[derive(Debug, Clone, Copy)]
pub struct RtcpHeader<'a> {
    view: ByteView<'a>,
}

impl<'a> RtcpHeader<'a> {
    /// Overlay a view on an already length-checked sub-packet
    fn new(buf: &'a [u8]) -> Self {
        Self {
            view: ByteView::new(buf),
        }
    }

    /// Raw bytes of this sub-packet
    pub fn as_slice(&self) -> &'a [u8] {
        self.view.as_slice()
    }

    pub fn version(&self) -> u8 {
        self.first_byte() >> 6
    }

    pub fn has_padding(&self) -> bool {
        self.first_byte() & 0x20 != 0
    }

    /// Report count, or the feedback message type (FMT) for feedback packets
    pub fn block_count(&self) -> u8 {
        self.first_byte() & 0x1F
    }

    pub fn packet_type(&self) -> u8 {
        self.view.u8_at(1).unwrap_or_default()
    }

    /// Raw length field (32-bit words minus one)
    pub fn length_field(&self) -> u16 {
        self.view.u16_at(2).unwrap_or_default()
    }

    /// Length of this sub-packet in bytes, header included
    pub fn packet_len(&self) -> usize {
        (usize::from(self.length_field()) + 1) * 4
    }

    /// Whether the packet reports about a stream we send
    ///
    /// For these the stream of interest is the source SSRC, not the sender.
    pub fn is_feedback(&self) -> bool {
        matches!(
            self.packet_type(),
            RTCP_RECEIVER_PT | RTCP_RTP_FEEDBACK_PT | RTCP_PS_FEEDBACK_PT
        )
    }

    /// SSRC of the packet sender
    pub fn ssrc(&self) -> Result<u32, PacketError> {
        self.view.u32_at(4)
    }

    /// Media source SSRC (feedback) or first report block SSRC (RR)
    pub fn source_ssrc(&self) -> Result<u32, PacketError> {
        self.view.u32_at(8)
    }

    /// SSRC identifying the stream this sub-packet is about
    pub fn stream_ssrc(&self) -> Result<u32, PacketError> {
        if self.is_feedback() {
            self.source_ssrc()
        } else {
            self.ssrc()
        }
    }

    // Receiver report block

    pub fn fraction_lost(&self) -> Result<u8, PacketError> {
        self.view.u8_at(12)
    }

    /// Cumulative number of packets lost (24 bits)
    pub fn lost_packets(&self) -> Result<u32, PacketError> {
        self.view.u24_at(13)
    }

    pub fn highest_seq_num(&self) -> Result<u32, PacketError> {
        self.view.u32_at(16)
    }

    pub fn jitter(&self) -> Result<u32, PacketError> {
        self.view.u32_at(20)
    }

    // Sender info

    pub fn ntp_timestamp(&self) -> Result<u64, PacketError> {
        self.view.u64_at(8)
    }

    pub fn rtp_timestamp(&self) -> Result<u32, PacketError> {
        self.view.u32_at(16)
    }

    pub fn packets_sent(&self) -> Result<u32, PacketError> {
        self.view.u32_at(20)
    }

    pub fn octets_sent(&self) -> Result<u32, PacketError> {
        self.view.u32_at(24)
    }

    // Generic NACK (first FCI entry)

    pub fn nack_pid(&self) -> Result<u16, PacketError> {
        self.view.u16_at(12)
    }

    pub fn nack_blp(&self) -> Result<u16, PacketError> {
        self.view.u16_at(14)
    }

    // REMB

    /// Whether the application feedback carries the "REMB" identifier
    pub fn is_remb(&self) -> bool {
        matches!(self.view.range(12, 4), Ok(id) if id == REMB_UNIQUE_ID)
    }

    pub fn remb_num_ssrc(&self) -> Result<u8, PacketError> {
        self.view.u8_at(16)
    }

    /// 6-bit bitrate exponent
    pub fn remb_exponent(&self) -> Result<u8, PacketError> {
        Ok(self.view.u8_at(17)? >> 2)
    }

    /// 18-bit bitrate mantissa
    pub fn remb_mantissa(&self) -> Result<u32, PacketError> {
        Ok(self.view.u24_at(17)? & 0x3FFFF)
    }

    /// Estimated bitrate in bits per second (`mantissa << exponent`)
    ///
    /// Saturates at `u64::MAX` for exponents that would shift bits out.
    pub fn remb_bitrate(&self) -> Result<u64, PacketError> {
        let mantissa = u64::from(self.remb_mantissa()?);
        let exponent = u32::from(self.remb_exponent()?);
        if mantissa != 0 && exponent > mantissa.leading_zeros() {
            return Ok(u64::MAX);
        }
        Ok(mantissa << exponent)
    }

    fn first_byte(&self) -> u8 {
        self.view.u8_at(0).unwrap_or_default()
    }
}

/// Iterator over the sub-packets of an RTCP compound packet
///
/// Yields `Err` once and then stops if a sub-packet header is cut short or
/// declares a length larger than the bytes left in the buffer.
#[derive(Debug, Clone)]
pub struct SubPackets<'a> {
    buf: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> SubPackets<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            offset: 0,
            done: false,
        }
    }

    /// Bytes consumed so far
    pub fn consumed(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for SubPackets<'a> {
    type Item = Result<RtcpHeader<'a>, PacketError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.buf.len() {
            return None;
        }

        let rest = ByteView::new(self.buf.get(self.offset..)?);
        let length_field = match rest.u16_at(2) {
            Ok(field) => field,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        let declared = (usize::from(length_field) + 1) * 4;
        let sub = match rest.range(0, declared) {
            Ok(sub) => sub,
            Err(_) => {
                self.done = true;
                return Some(Err(PacketError::InvalidLength {
                    declared,
                    remaining: rest.len(),
                }));
            }
        };

        self.offset += declared;
        Some(Ok(RtcpHeader::new(sub)))
    }
}

/// Encode a REMB bitrate as (exponent, mantissa) with an 18-bit mantissa
pub fn remb_encode(bitrate: u64) -> (u8, u32) {
    let mut exponent = 0u8;
    let mut mantissa = bitrate;
    while mantissa > 0x3FFFF {
        mantissa >>= 1;
        exponent += 1;
    }
    (exponent, mantissa as u32)
}
