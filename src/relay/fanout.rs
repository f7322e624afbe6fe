//! One-to-many relay
//!
//! The relay owns one publisher handle and a named set of subscriber sinks.
//! Everything the publisher produces is replicated to every subscriber.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::rtp::{is_rtcp, DataPacket, PacketKind, RtpHeader, RtpVp8Parser};

use super::config::RelayConfig;
use super::head::HeadBuffer;
use super::processor::{InputProcessor, OutputProcessor, RawDataPacket};
use super::rewrite::RtpRewriter;
use super::sink::{deliver, ChannelSink, MediaSink, MediaSource};

/// Media-plane state, serialized per relay
struct MediaState {
    head: HeadBuffer,
    rewriter: RtpRewriter,
    parser: RtpVp8Parser,
}

/// Replicates one publisher's media to many subscribers
///
/// Subscriber membership may change from any thread while media flows.
/// Each delivery fans out to a snapshot of the subscriber set: a subscriber
/// added mid-delivery may miss that packet, one removed mid-delivery may
/// still get it.
pub struct OneToManyRelay {
    config: RelayConfig,
    publisher: RwLock<Option<Arc<dyn MediaSource>>>,
    subscribers: RwLock<HashMap<String, Arc<dyn MediaSink>>>,
    media: Mutex<MediaState>,
    input: Mutex<Option<Box<dyn InputProcessor>>>,
    output: Mutex<Option<Box<dyn OutputProcessor>>>,
    closed: AtomicBool,
    sent_packets: AtomicU64,
}

impl OneToManyRelay {
    pub fn new() -> Self {
        Self::with_config(RelayConfig::default())
    }

    pub fn with_config(config: RelayConfig) -> Self {
        let media = MediaState {
            head: HeadBuffer::new(config.head_max_packets, config.head_max_bytes),
            rewriter: RtpRewriter::new(config.scratch_buffer_size),
            parser: RtpVp8Parser::new(),
        };

        Self {
            config,
            publisher: RwLock::new(None),
            subscribers: RwLock::new(HashMap::new()),
            media: Mutex::new(media),
            input: Mutex::new(None),
            output: Mutex::new(None),
            closed: AtomicBool::new(false),
            sent_packets: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Install the decoder used for publisher video
    pub fn set_input_processor(&self, processor: Box<dyn InputProcessor>) {
        *lock(&self.input) = Some(processor);
    }

    /// Install the encoder used for raw frames
    pub fn set_output_processor(&self, processor: Box<dyn OutputProcessor>) {
        *lock(&self.output) = Some(processor);
    }

    /// Set the publisher, replacing any previous one
    ///
    /// The publisher is handed a weak reference to this relay to push into.
    /// A replaced publisher is detached. Existing subscribers stay connected.
    pub fn set_publisher(self: &Arc<Self>, source: Arc<dyn MediaSource>) -> Result<()> {
        if self.is_closed() {
            tracing::warn!("Ignoring publisher on closed relay");
            return Err(Error::RelayClosed);
        }

        let sink: Arc<dyn MediaSink> = Arc::clone(self) as Arc<dyn MediaSink>;
        let replaced = {
            let mut publisher = write(&self.publisher);
            let previous = publisher.take();
            if let Some(old) = &previous {
                old.set_sink(detached());
            }
            source.set_sink(Arc::downgrade(&sink));
            *publisher = Some(source);
            previous.is_some()
        };

        if replaced {
            lock(&self.media).rewriter.rebase();
        }

        tracing::info!(
            replaced = replaced,
            subscribers = self.subscriber_count(),
            "Publisher set"
        );
        Ok(())
    }

    pub fn has_publisher(&self) -> bool {
        read(&self.publisher).is_some()
    }

    /// Add a subscriber, replacing any existing one with the same id
    ///
    /// The buffered head is replayed to the new subscriber before it can
    /// see any live packet.
    pub fn add_subscriber(&self, sink: Arc<dyn MediaSink>, id: impl Into<String>) -> Result<()> {
        let id = id.into();
        if self.is_closed() {
            tracing::warn!(subscriber = %id, "Ignoring subscriber on closed relay");
            return Err(Error::RelayClosed);
        }

        // Holding the media lock keeps live packets from overtaking the replay
        let media = lock(&self.media);
        let catchup = media.head.catchup();
        for packet in &catchup {
            deliver(sink.as_ref(), packet.clone());
        }

        let replaced = write(&self.subscribers).insert(id.clone(), sink).is_some();
        drop(media);

        tracing::info!(
            subscriber = %id,
            replaced = replaced,
            subscribers = self.subscriber_count(),
            catchup_packets = catchup.len(),
            "Subscriber added"
        );
        Ok(())
    }

    /// Add a channel-backed subscriber sized from the relay config
    pub fn add_channel_subscriber(
        &self,
        id: impl Into<String>,
    ) -> Result<mpsc::Receiver<DataPacket>> {
        let (sink, rx) = ChannelSink::new(self.config.sink_channel_capacity);
        self.add_subscriber(Arc::new(sink), id)?;
        Ok(rx)
    }

    /// Remove a subscriber; unknown ids are ignored
    ///
    /// Returns whether a subscriber was removed.
    pub fn remove_subscriber(&self, id: &str) -> bool {
        let removed = write(&self.subscribers).remove(id).is_some();

        if removed {
            tracing::info!(
                subscriber = %id,
                subscribers = self.subscriber_count(),
                "Subscriber removed"
            );
        } else {
            tracing::debug!(subscriber = %id, "Remove for unknown subscriber");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        read(&self.subscribers).len()
    }

    pub fn has_subscriber(&self, id: &str) -> bool {
        read(&self.subscribers).contains_key(id)
    }

    /// Deliver a decoded frame: encode it and fan out the resulting packets
    pub fn receive_raw_data(&self, frame: &RawDataPacket) {
        if self.is_closed() {
            return;
        }

        let packets = match lock(&self.output).as_mut() {
            Some(output) => output.encode(frame),
            None => {
                tracing::debug!(kind = ?frame.kind, "No output processor, dropping raw frame");
                return;
            }
        };

        for data in packets {
            self.receive_rtp_data(data);
        }
    }

    /// Deliver a packet from the publisher to every subscriber
    ///
    /// RTP is rewritten for continuity and fed to the head buffer. RTCP is
    /// forwarded untouched. With one publishing thread every subscriber
    /// sees packets in publish order; packets from concurrent callers may
    /// interleave differently at each subscriber.
    pub fn receive_rtp_data(&self, data: Bytes) {
        if self.is_closed() {
            return;
        }

        if is_rtcp(&data) {
            let (packet, targets) = {
                let _media = lock(&self.media);
                (DataPacket::new(PacketKind::Other, data), self.targets())
            };
            self.fan_out(packet, &targets);
            return;
        }

        let payload_type = match RtpHeader::parse(&data) {
            Ok(header) => header.payload_type(),
            Err(e) => {
                tracing::debug!(error = %e, "Dropping invalid RTP packet");
                return;
            }
        };

        let kind = if self.config.is_video_payload(payload_type) {
            PacketKind::Video
        } else {
            PacketKind::Audio
        };

        let (packet, targets) = {
            let mut media = lock(&self.media);
            let packet = media.rewriter.process(DataPacket::new(kind, data));

            if kind == PacketKind::Video && self.config.head_enabled() {
                let keyframe_start = payload_type == self.config.vp8_payload_type
                    && media
                        .parser
                        .parse(&packet.data)
                        .map(|vp8| vp8.keyframe_start)
                        .unwrap_or(false);
                media.head.push(packet.clone(), keyframe_start);
            }

            (packet, self.targets())
        };

        self.fan_out(packet, &targets);
    }

    /// Snapshot of the current subscribers; taken under the media lock
    fn targets(&self) -> Vec<Arc<dyn MediaSink>> {
        read(&self.subscribers).values().cloned().collect()
    }

    fn fan_out(&self, packet: DataPacket, targets: &[Arc<dyn MediaSink>]) {
        for sink in targets {
            deliver(sink.as_ref(), packet.clone());
        }
        self.sent_packets.fetch_add(1, Ordering::Relaxed);
    }

    /// Release the publisher and every subscriber
    ///
    /// The relay is inert afterwards.
    pub fn close_all(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let had_publisher = match write(&self.publisher).take() {
            Some(publisher) => {
                publisher.set_sink(detached());
                true
            }
            None => false,
        };
        let subscribers = {
            let mut subscribers = write(&self.subscribers);
            let count = subscribers.len();
            subscribers.clear();
            count
        };
        lock(&self.media).head.clear();
        lock(&self.input).take();
        lock(&self.output).take();

        tracing::info!(
            had_publisher = had_publisher,
            subscribers = subscribers,
            sent_packets = self.sent_packets(),
            "Relay closed"
        );
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Packets fanned out so far
    pub fn sent_packets(&self) -> u64 {
        self.sent_packets.load(Ordering::Relaxed)
    }

    /// Packets currently held for late joiners
    pub fn head_packet_count(&self) -> usize {
        lock(&self.media).head.packet_count()
    }
}

impl Default for OneToManyRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaSink for OneToManyRelay {
    fn deliver_audio_data(&self, packet: DataPacket) {
        self.receive_rtp_data(packet.data);
    }

    fn deliver_video_data(&self, packet: DataPacket) {
        if self.is_closed() {
            return;
        }

        let decoded = lock(&self.input)
            .as_mut()
            .map(|input| input.decode(&packet));

        match decoded {
            Some(Some(frame)) => self.receive_raw_data(&frame),
            Some(None) => {}
            None => self.receive_rtp_data(packet.data),
        }
    }
}

/// Sink reference that never upgrades, handed to released publishers
fn detached() -> Weak<dyn MediaSink> {
    Weak::<OneToManyRelay>::new()
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(rw: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    rw.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(rw: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    rw.write().unwrap_or_else(PoisonError::into_inner)
}
