//! Media sink and source contracts
//!
//! Publisher and subscriber connections live outside this crate; the relay
//! only pushes packets into sinks and hands sources a sink to push into.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

use tokio::sync::mpsc;

use crate::rtp::{DataPacket, PacketKind};

/// Something that accepts media packets
///
/// Delivery must not block: it runs on the media thread.
pub trait MediaSink: Send + Sync {
    fn deliver_audio_data(&self, packet: DataPacket);

    fn deliver_video_data(&self, packet: DataPacket);
}

/// Something that produces media packets
pub trait MediaSource: Send + Sync {
    /// Where to push produced packets
    fn set_sink(&self, sink: Weak<dyn MediaSink>);
}

/// Deliver a packet to the sink entry point matching its kind
pub fn deliver(sink: &dyn MediaSink, packet: DataPacket) {
    match packet.kind {
        PacketKind::Audio => sink.deliver_audio_data(packet),
        PacketKind::Video | PacketKind::Other => sink.deliver_video_data(packet),
    }
}

/// Sink backed by a bounded channel
///
/// Packets are dropped (and counted) when the channel is full rather than
/// stalling the relay.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<DataPacket>,
    dropped: AtomicU64,
}

impl ChannelSink {
    /// Create a sink and the receiver draining it
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DataPacket>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Packets dropped because the receiver fell behind
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn push(&self, packet: DataPacket) {
        match self.tx.try_send(packet) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(dropped = dropped, "Subscriber channel full, dropping packet");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Subscriber channel closed");
            }
        }
    }
}

impl MediaSink for ChannelSink {
    fn deliver_audio_data(&self, packet: DataPacket) {
        self.push(packet);
    }

    fn deliver_video_data(&self, packet: DataPacket) {
        self.push(packet);
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new(8);

        deliver(&sink, DataPacket::audio(Bytes::from_static(b"a")));
        deliver(&sink, DataPacket::video(Bytes::from_static(b"v")));

        assert_eq!(rx.try_recv().unwrap().data, Bytes::from_static(b"a"));
        assert_eq!(rx.try_recv().unwrap().kind, PacketKind::Video);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_drops_when_full() {
        let (sink, _rx) = ChannelSink::new(1);

        sink.deliver_video_data(DataPacket::video(Bytes::from_static(b"1")));
        sink.deliver_video_data(DataPacket::video(Bytes::from_static(b"2")));
        sink.deliver_video_data(DataPacket::video(Bytes::from_static(b"3")));

        assert_eq!(sink.dropped(), 2);
    }

    #[test]
    fn test_channel_sink_closed_receiver() {
        let (sink, rx) = ChannelSink::new(1);
        drop(rx);

        sink.deliver_audio_data(DataPacket::audio(Bytes::from_static(b"x")));
        assert_eq!(sink.dropped(), 0);
    }

    #[tokio::test]
    async fn test_channel_sink_async_receive() {
        let (sink, mut rx) = ChannelSink::new(4);

        tokio::spawn(async move {
            sink.deliver_video_data(DataPacket::video(Bytes::from_static(b"frame")));
        });

        let packet = rx.recv().await.unwrap();
        assert_eq!(packet.data, Bytes::from_static(b"frame"));
    }
}
