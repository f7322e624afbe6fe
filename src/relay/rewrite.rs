//! RTP continuity across publisher changes
//!
//! Subscribers see one SSRC per media kind with contiguous sequence numbers
//! and increasing timestamps, even when the publisher behind the relay is
//! replaced. While the publisher stays the same, packets pass through
//! untouched and are never copied.

use bytes::{BufMut, Bytes, BytesMut};

use crate::rtp::{DataPacket, PacketKind, RtpHeader};

/// Outgoing header fields after rewriting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewrittenFields {
    pub ssrc: u32,
    pub sequence_number: u16,
    pub timestamp: u32,
}

/// Continuity state for one outgoing stream
#[derive(Debug, Default)]
pub struct StreamRewriter {
    out_ssrc: Option<u32>,
    in_ssrc: Option<u32>,
    seq_offset: u16,
    ts_offset: u32,
    last: Option<RewrittenFields>,
    rebase_pending: bool,
}

impl StreamRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the next packet to continue from the last one sent
    pub fn rebase(&mut self) {
        self.rebase_pending = true;
    }

    /// Map incoming header fields to outgoing ones
    pub fn rewrite(&mut self, ssrc: u32, sequence_number: u16, timestamp: u32) -> RewrittenFields {
        match self.in_ssrc {
            None => {
                self.out_ssrc = Some(ssrc);
                self.in_ssrc = Some(ssrc);
            }
            Some(previous) if previous != ssrc => {
                self.in_ssrc = Some(ssrc);
                self.rebase_pending = true;
            }
            Some(_) => {}
        }

        if self.rebase_pending {
            self.rebase_pending = false;
            if let Some(last) = self.last {
                self.seq_offset = last.sequence_number.wrapping_add(1).wrapping_sub(sequence_number);
                // Continue one clock tick after the last timestamp sent
                self.ts_offset = last.timestamp.wrapping_add(1).wrapping_sub(timestamp);
            }
        }

        let fields = RewrittenFields {
            ssrc: self.out_ssrc.unwrap_or(ssrc),
            sequence_number: sequence_number.wrapping_add(self.seq_offset),
            timestamp: timestamp.wrapping_add(self.ts_offset),
        };
        self.last = Some(fields);
        fields
    }
}

/// Rewrites relay output for every media kind
#[derive(Debug)]
pub struct RtpRewriter {
    audio: StreamRewriter,
    video: StreamRewriter,
    scratch: BytesMut,
    scratch_size: usize,
}

impl RtpRewriter {
    pub fn new(scratch_size: usize) -> Self {
        Self {
            audio: StreamRewriter::new(),
            video: StreamRewriter::new(),
            scratch: BytesMut::with_capacity(scratch_size),
            scratch_size,
        }
    }

    /// Mark both streams for rebasing (publisher replaced)
    pub fn rebase(&mut self) {
        self.audio.rebase();
        self.video.rebase();
    }

    /// Rewrite a packet if its header needs to change
    ///
    /// Returns the original packet when nothing changes; otherwise the
    /// patched copy is assembled in the scratch buffer.
    pub fn process(&mut self, packet: DataPacket) -> DataPacket {
        let Ok(header) = RtpHeader::parse(&packet.data) else {
            return packet;
        };

        let incoming = RewrittenFields {
            ssrc: header.ssrc(),
            sequence_number: header.sequence_number(),
            timestamp: header.timestamp(),
        };
        let stream = match packet.kind {
            PacketKind::Audio => &mut self.audio,
            PacketKind::Video | PacketKind::Other => &mut self.video,
        };
        let outgoing = stream.rewrite(incoming.ssrc, incoming.sequence_number, incoming.timestamp);

        if outgoing == incoming {
            return packet;
        }

        DataPacket::new(packet.kind, self.patch(&packet.data, outgoing))
    }

    fn patch(&mut self, data: &[u8], fields: RewrittenFields) -> Bytes {
        if self.scratch.capacity() < self.scratch_size {
            self.scratch.reserve(self.scratch_size);
        }
        self.scratch.clear();

        // Fixed header already validated; the first two bytes are kept
        self.scratch.put_slice(data.get(..2).unwrap_or_default());
        self.scratch.put_u16(fields.sequence_number);
        self.scratch.put_u32(fields.timestamp);
        self.scratch.put_u32(fields.ssrc);
        self.scratch.put_slice(data.get(12..).unwrap_or_default());

        self.scratch.split().freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rtp(ssrc: u32, seq: u16, ts: u32) -> DataPacket {
        let mut buf = BytesMut::new();
        buf.put_u8(0x80);
        buf.put_u8(100);
        buf.put_u16(seq);
        buf.put_u32(ts);
        buf.put_u32(ssrc);
        buf.put_slice(b"payload");
        DataPacket::video(buf.freeze())
    }

    fn fields(packet: &DataPacket) -> (u32, u16, u32) {
        let header = RtpHeader::parse(&packet.data).unwrap();
        (header.ssrc(), header.sequence_number(), header.timestamp())
    }

    #[test]
    fn test_passthrough_is_not_copied() {
        let mut rewriter = RtpRewriter::new(2000);
        let packet = rtp(1, 10, 1000);
        let out = rewriter.process(packet.clone());

        assert_eq!(out, packet);
        assert_eq!(out.data.as_ptr(), packet.data.as_ptr());
    }

    #[test]
    fn test_publisher_switch_keeps_continuity() {
        let mut rewriter = RtpRewriter::new(2000);
        rewriter.process(rtp(1, 10, 1000));
        rewriter.process(rtp(1, 11, 4000));

        let switched = rewriter.process(rtp(2, 500, 90_000));
        assert_eq!(fields(&switched), (1, 12, 4001));
        assert!(switched.data.ends_with(b"payload"));

        let next = rewriter.process(rtp(2, 501, 93_000));
        assert_eq!(fields(&next), (1, 13, 7001));
    }

    #[test]
    fn test_sequence_wraps() {
        let mut stream = StreamRewriter::new();
        stream.rewrite(1, u16::MAX, u32::MAX);

        let out = stream.rewrite(2, 7, 0);
        assert_eq!(out.sequence_number, 0);
        assert_eq!(out.timestamp, 0);
    }

    #[test]
    fn test_explicit_rebase_same_ssrc() {
        let mut stream = StreamRewriter::new();
        stream.rewrite(1, 100, 1000);

        stream.rebase();
        let out = stream.rewrite(1, 3, 50);
        assert_eq!(out.sequence_number, 101);
        assert_eq!(out.timestamp, 1001);
    }

    #[test]
    fn test_audio_and_video_are_independent() {
        let mut rewriter = RtpRewriter::new(2000);
        rewriter.process(rtp(1, 10, 1000));

        let audio = DataPacket::audio(rtp(7, 300, 48_000).data);
        let out = rewriter.process(audio.clone());
        assert_eq!(out, audio);
    }

    #[test]
    fn test_non_rtp_passes_through() {
        let mut rewriter = RtpRewriter::new(16);
        let packet = DataPacket::video(Bytes::from_static(&[0x80, 100]));
        assert_eq!(rewriter.process(packet.clone()), packet);
    }
}
