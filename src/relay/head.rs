//! Head buffer for late-joining subscribers
//!
//! A subscriber joining mid-stream cannot decode video until the next
//! keyframe. The head buffer keeps the packets of the most recent keyframe
//! onwards so a new subscriber can start decoding straight away:
//! 1. A keyframe start clears the buffer and opens a new head
//! 2. Following packets are appended until a limit is reached; after that
//!    nothing more is buffered until the next keyframe start
//! 3. Packets before the first keyframe are never buffered

use std::collections::VecDeque;

use crate::rtp::DataPacket;

/// Bounded buffer of the packets since the latest keyframe
#[derive(Debug)]
pub struct HeadBuffer {
    /// Maximum number of packets
    max_packets: usize,
    /// Maximum buffer size in bytes
    max_bytes: usize,
    /// Current buffer size in bytes
    current_size: usize,
    /// Buffered packets, keyframe start first
    packets: VecDeque<DataPacket>,
    /// Whether the head starts with a keyframe
    has_keyframe: bool,
    /// A limit was hit; the head stays as is until the next keyframe
    full: bool,
}

impl HeadBuffer {
    pub fn new(max_packets: usize, max_bytes: usize) -> Self {
        Self {
            max_packets,
            max_bytes,
            current_size: 0,
            packets: VecDeque::new(),
            has_keyframe: false,
            full: false,
        }
    }

    /// Offer a packet to the buffer
    ///
    /// A keyframe start replaces the current head. Returns false when the
    /// packet was not kept (no keyframe yet, or a limit was reached).
    pub fn push(&mut self, packet: DataPacket, keyframe_start: bool) -> bool {
        if keyframe_start {
            self.clear();
            self.has_keyframe = true;
        }

        if !self.has_keyframe || self.full {
            return false;
        }

        let size = packet.len();
        if self.packets.len() >= self.max_packets || self.current_size + size > self.max_bytes {
            self.full = true;
            return false;
        }

        self.packets.push_back(packet);
        self.current_size += size;
        true
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.packets.clear();
        self.current_size = 0;
        self.has_keyframe = false;
        self.full = false;
    }

    /// Packets to replay to a new subscriber, oldest first
    pub fn catchup(&self) -> Vec<DataPacket> {
        self.packets.iter().cloned().collect()
    }

    pub fn packet_count(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Current size in bytes
    pub fn size(&self) -> usize {
        self.current_size
    }

    pub fn has_keyframe(&self) -> bool {
        self.has_keyframe
    }

    /// Byte utilization as a percentage
    pub fn utilization(&self) -> f32 {
        if self.max_bytes > 0 {
            (self.current_size as f32 / self.max_bytes as f32) * 100.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn packet(tag: u8, size: usize) -> DataPacket {
        let mut data = vec![0u8; size];
        data[0] = tag;
        DataPacket::video(Bytes::from(data))
    }

    #[test]
    fn test_head_waits_for_keyframe() {
        let mut head = HeadBuffer::new(16, 4096);

        assert!(!head.push(packet(1, 100), false));
        assert!(head.is_empty());

        assert!(head.push(packet(2, 100), true));
        assert!(head.push(packet(3, 100), false));

        assert!(head.has_keyframe());
        assert_eq!(head.packet_count(), 2);
        assert_eq!(head.size(), 200);
    }

    #[test]
    fn test_keyframe_replaces_head() {
        let mut head = HeadBuffer::new(16, 4096);

        head.push(packet(1, 100), true);
        head.push(packet(2, 100), false);
        head.push(packet(3, 100), false);
        assert_eq!(head.packet_count(), 3);

        head.push(packet(4, 50), true);
        assert_eq!(head.packet_count(), 1);
        assert_eq!(head.size(), 50);
        assert_eq!(head.catchup()[0].data[0], 4);
    }

    #[test]
    fn test_packet_limit_keeps_keyframe() {
        let mut head = HeadBuffer::new(2, 4096);

        assert!(head.push(packet(1, 10), true));
        assert!(head.push(packet(2, 10), false));
        assert!(!head.push(packet(3, 10), false));

        let tags: Vec<u8> = head.catchup().iter().map(|p| p.data[0]).collect();
        assert_eq!(tags, vec![1, 2]);
    }

    #[test]
    fn test_byte_limit() {
        let mut head = HeadBuffer::new(16, 250);

        assert!(head.push(packet(1, 200), true));
        assert!(!head.push(packet(2, 100), false));
        // A smaller packet would fit, but the run is already broken
        assert!(!head.push(packet(3, 50), false));

        let tags: Vec<u8> = head.catchup().iter().map(|p| p.data[0]).collect();
        assert_eq!(tags, vec![1]);
        assert_eq!(head.size(), 200);
        assert!((head.utilization() - 80.0).abs() < 0.01);
    }

    #[test]
    fn test_keyframe_reopens_full_head() {
        let mut head = HeadBuffer::new(2, 4096);

        head.push(packet(1, 10), true);
        head.push(packet(2, 10), false);
        assert!(!head.push(packet(3, 10), false));

        assert!(head.push(packet(4, 10), true));
        assert!(head.push(packet(5, 10), false));
        let tags: Vec<u8> = head.catchup().iter().map(|p| p.data[0]).collect();
        assert_eq!(tags, vec![4, 5]);
    }

    #[test]
    fn test_disabled_head() {
        let mut head = HeadBuffer::new(0, 4096);
        assert!(!head.push(packet(1, 10), true));
        assert!(head.is_empty());
        assert_eq!(head.utilization(), 0.0);
    }

    #[test]
    fn test_clear() {
        let mut head = HeadBuffer::new(16, 4096);
        head.push(packet(1, 10), true);
        head.clear();

        assert!(head.is_empty());
        assert!(!head.has_keyframe());
        assert!(!head.push(packet(2, 10), false));
    }
}
