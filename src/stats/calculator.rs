//! Per-packet stats extraction
//!
//! RTP packets feed the per-stream and session-wide bitrate accumulators.
//! RTCP compound packets are walked sub-packet by sub-packet and their
//! report fields and feedback counts are recorded under the stream they
//! describe.

use std::sync::{Arc, OnceLock};

use crate::error::Error;
use crate::pipeline::MediaSession;
use crate::rtp::packet::{DataPacket, RtpHeader};
use crate::rtp::rtcp::{
    RtcpHeader, SubPackets, RTCP_AFB_FMT, RTCP_BYE_PT, RTCP_FIR_FMT, RTCP_PLI_FMT,
    RTCP_PS_FEEDBACK_PT, RTCP_RECEIVER_PT, RTCP_RTP_FEEDBACK_PT, RTCP_SDES_PT, RTCP_SENDER_PT,
    RTCP_SLI_FMT,
};

use super::config::StatsConfig;
use super::node::{StatNode, StringStat};
use super::store::{ssrc_key, StatsStore, TOTAL_SCOPE};

/// Bitrate accumulator key
pub const BITRATE_CALCULATED: &str = "bitrateCalculated";

struct Binding {
    session: Arc<dyn MediaSession>,
    stats: Arc<StatsStore>,
}

/// Extracts stats from packets flowing through a session's pipeline
///
/// Binds once to its session and store via [`update`](Self::update);
/// the binding is permanent.
pub struct StatsCalculator {
    binding: OnceLock<Binding>,
    config: StatsConfig,
}

impl StatsCalculator {
    pub fn new() -> Self {
        Self::with_config(StatsConfig::default())
    }

    pub fn with_config(config: StatsConfig) -> Self {
        Self {
            binding: OnceLock::new(),
            config,
        }
    }

    /// Bind to a session and its stats store; no-op once bound
    pub fn update(&self, session: Arc<dyn MediaSession>, stats: Arc<StatsStore>) {
        if self.binding.set(Binding { session, stats }).is_err() {
            return;
        }

        if let Some(binding) = self.binding.get() {
            let result = binding
                .stats
                .with_scope(TOTAL_SCOPE, |node| self.ensure_bitrate(node));
            if let Err(e) = result {
                tracing::warn!(error = %e, "Failed to initialise total bitrate");
            }
        }
    }

    pub fn is_bound(&self) -> bool {
        self.binding.get().is_some()
    }

    /// The bound stats store
    pub fn stats(&self) -> Option<&Arc<StatsStore>> {
        self.binding.get().map(|binding| &binding.stats)
    }

    /// Route a packet to RTP or RTCP handling
    pub fn process_packet(&self, packet: &DataPacket) {
        if packet.is_rtcp() {
            self.process_rtcp_packet(packet);
        } else {
            self.process_rtp_packet(packet);
        }
    }

    /// Account an RTP packet against its stream and the session total
    pub fn process_rtp_packet(&self, packet: &DataPacket) {
        let Some(binding) = self.bound() else {
            return;
        };

        let header = match RtpHeader::parse(&packet.data) {
            Ok(header) => header,
            Err(e) => {
                tracing::debug!(error = %e, "Dropping truncated RTP packet");
                return;
            }
        };

        let ssrc = header.ssrc();
        let session = &binding.session;
        if !session.is_sink_ssrc(ssrc) && !session.is_source_ssrc(ssrc) {
            tracing::debug!(
                ssrc = ssrc,
                payload_type = header.payload_type(),
                "Unknown SSRC in RTP packet"
            );
            return;
        }

        let len = packet.len() as u64;
        let result = binding
            .stats
            .with_scope(&ssrc_key(ssrc), |node| {
                if !node.has_child(BITRATE_CALCULATED) {
                    if session.is_video_ssrc(ssrc) {
                        node.insert_stat("type", StringStat::new("video"))?;
                    } else if session.is_audio_ssrc(ssrc) {
                        node.insert_stat("type", StringStat::new("audio"))?;
                    }
                    node.insert_stat(BITRATE_CALCULATED, self.config.bitrate_stat())?;
                }
                node.add_rate(BITRATE_CALCULATED, len)
            })
            .and_then(|_| {
                binding.stats.with_scope(TOTAL_SCOPE, |node| {
                    self.ensure_bitrate(node)?;
                    node.add_rate(BITRATE_CALCULATED, len)
                })
            });

        if let Err(e) = result {
            tracing::warn!(ssrc = ssrc, error = %e, "Failed to record RTP bitrate");
        }
    }

    /// Walk an RTCP compound packet and record what it reports
    pub fn process_rtcp_packet(&self, packet: &DataPacket) {
        let Some(binding) = self.bound() else {
            return;
        };

        let chain = SubPackets::new(&packet.data);
        let first = match chain.clone().next() {
            Some(Ok(first)) => first,
            Some(Err(e)) => {
                tracing::debug!(error = %e, "Dropping malformed RTCP packet");
                return;
            }
            None => return,
        };

        let ssrc = match first.stream_ssrc() {
            Ok(ssrc) => ssrc,
            Err(e) => {
                tracing::debug!(error = %e, "Dropping RTCP packet without SSRC");
                return;
            }
        };

        let known = if first.is_feedback() {
            binding.session.is_sink_ssrc(ssrc)
        } else {
            binding.session.is_source_ssrc(ssrc)
        };
        if !known {
            tracing::debug!(
                ssrc = ssrc,
                packet_type = first.packet_type(),
                "Unknown SSRC in RTCP packet"
            );
            return;
        }

        tracing::debug!(
            packet_type = first.packet_type(),
            size = first.packet_len(),
            packet_length = packet.len(),
            "RTCP packet received"
        );

        let key = ssrc_key(ssrc);
        let mut processed = 0usize;
        for sub in chain {
            let sub = match sub {
                Ok(sub) => sub,
                Err(e) => {
                    tracing::debug!(ssrc = ssrc, error = %e, "Malformed RTCP compound packet");
                    break;
                }
            };

            match self.apply_sub_packet(&binding.stats, &key, ssrc, &sub) {
                Ok(()) => processed += 1,
                Err(Error::Packet(e)) => {
                    tracing::debug!(
                        ssrc = ssrc,
                        packet_type = sub.packet_type(),
                        error = %e,
                        "Malformed RTCP sub-packet"
                    );
                    break;
                }
                Err(e) => {
                    processed += 1;
                    tracing::warn!(ssrc = ssrc, error = %e, "Failed to record RTCP stat");
                }
            }
        }

        if processed > 0 {
            binding.stats.notify_update();
        }
    }

    /// Create or increment a named counter under a stream
    pub fn incr_stat(&self, ssrc: u32, name: &str) {
        let Some(binding) = self.bound() else {
            return;
        };

        if let Err(e) = binding.stats.with_scope(&ssrc_key(ssrc), |node| node.incr(name)) {
            tracing::warn!(ssrc = ssrc, stat = name, error = %e, "Failed to increment stat");
        }
    }

    /// Record one sub-packet; the stream scope is only touched when a
    /// stat actually changes
    fn apply_sub_packet(
        &self,
        stats: &StatsStore,
        key: &str,
        ssrc: u32,
        sub: &RtcpHeader<'_>,
    ) -> Result<(), Error> {
        match sub.packet_type() {
            RTCP_SDES_PT => {
                tracing::debug!(ssrc = ssrc, "SDES");
            }
            RTCP_BYE_PT => {
                tracing::debug!(ssrc = ssrc, "RTCP BYE");
            }
            RTCP_RECEIVER_PT => {
                let fraction_lost = sub.fraction_lost()?;
                let packets_lost = sub.lost_packets()?;
                let jitter = sub.jitter()?;
                tracing::debug!(
                    ssrc = ssrc,
                    fraction_lost = fraction_lost,
                    packets_lost = packets_lost,
                    "RTCP RR"
                );
                stats.with_scope(key, |node| {
                    node.set_cumulative("fractionLost", u64::from(fraction_lost))?;
                    node.set_cumulative("packetsLost", u64::from(packets_lost))?;
                    node.set_cumulative("jitter", u64::from(jitter))?;
                    node.set_cumulative("sourceSsrc", u64::from(ssrc))
                })?;
            }
            RTCP_SENDER_PT => {
                let packets_sent = sub.packets_sent()?;
                let octets_sent = sub.octets_sent()?;
                tracing::debug!(
                    ssrc = ssrc,
                    packets_sent = packets_sent,
                    octets_sent = octets_sent,
                    "RTCP SR"
                );
                stats.with_scope(key, |node| {
                    node.set_cumulative("packetsSent", u64::from(packets_sent))?;
                    node.set_cumulative("bytesSent", u64::from(octets_sent))
                })?;
            }
            RTCP_RTP_FEEDBACK_PT => {
                tracing::debug!(
                    ssrc = ssrc,
                    fmt = sub.block_count(),
                    pid = sub.nack_pid().ok(),
                    blp = sub.nack_blp().ok(),
                    "RTCP RTP feedback"
                );
                stats.with_scope(key, |node| node.incr("NACK"))?;
            }
            RTCP_PS_FEEDBACK_PT => self.apply_payload_feedback(stats, key, ssrc, sub)?,
            other => {
                tracing::debug!(ssrc = ssrc, packet_type = other, "Unknown RTCP packet");
            }
        }
        Ok(())
    }

    fn apply_payload_feedback(
        &self,
        stats: &StatsStore,
        key: &str,
        ssrc: u32,
        sub: &RtcpHeader<'_>,
    ) -> Result<(), Error> {
        let counter = match sub.block_count() {
            RTCP_PLI_FMT => "PLI",
            RTCP_SLI_FMT => "SLI",
            RTCP_FIR_FMT => "FIR",
            RTCP_AFB_FMT => {
                if sub.is_remb() {
                    let bitrate = sub.remb_bitrate()?;
                    tracing::debug!(ssrc = ssrc, bitrate = bitrate, "REMB");
                    stats.with_scope(key, |node| node.set_cumulative("bandwidth", bitrate))?;
                } else {
                    tracing::debug!(ssrc = ssrc, "Unsupported AFB packet, not REMB");
                }
                return Ok(());
            }
            fmt => {
                tracing::warn!(ssrc = ssrc, fmt = fmt, "Unsupported RTCP PS feedback type");
                return Ok(());
            }
        };

        tracing::debug!(ssrc = ssrc, "{}", counter);
        stats.with_scope(key, |node| node.incr(counter))?;
        Ok(())
    }

    fn ensure_bitrate(&self, node: &mut StatNode) -> Result<(), crate::error::StatsError> {
        if node.has_child(BITRATE_CALCULATED) {
            return Ok(());
        }
        node.insert_stat(BITRATE_CALCULATED, self.config.bitrate_stat())
    }

    fn bound(&self) -> Option<&Binding> {
        let binding = self.binding.get();
        if binding.is_none() {
            tracing::error!("Stats calculator used before a session was bound");
        }
        binding
    }
}

impl Default for StatsCalculator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use bytes::{BufMut, Bytes, BytesMut};

    use super::*;
    use crate::pipeline::StreamRoles;
    use crate::rtp::rtcp::tests::{feedback, receiver_report, remb, sender_report};
    use crate::stats::node::{RateStat, StatValue};

    const AUDIO_SOURCE: u32 = 0x1000;
    const VIDEO_SOURCE: u32 = 0x2000;
    const AUDIO_SINK: u32 = 0x3000;
    const VIDEO_SINK: u32 = 0x4000;
    const REMOTE: u32 = 0x9999;

    fn bound_calculator() -> (StatsCalculator, Arc<StatsStore>) {
        let roles = StreamRoles::new()
            .audio_source(AUDIO_SOURCE)
            .video_source(VIDEO_SOURCE)
            .audio_sink(AUDIO_SINK)
            .video_sink(VIDEO_SINK);
        let stats = Arc::new(StatsStore::new());
        let calculator = StatsCalculator::new();
        calculator.update(Arc::new(roles), Arc::clone(&stats));
        (calculator, stats)
    }

    fn rtp_packet(ssrc: u32, payload_len: usize) -> DataPacket {
        let mut buf = BytesMut::new();
        buf.put_u8(0x80);
        buf.put_u8(100);
        buf.put_u16(1);
        buf.put_u32(0);
        buf.put_u32(ssrc);
        buf.put_bytes(0, payload_len);
        DataPacket::video(buf.freeze())
    }

    fn rtcp_packet(buf: BytesMut) -> DataPacket {
        DataPacket::video(buf.freeze())
    }

    fn bitrate_total(stats: &StatsStore, scope: &str) -> Option<u64> {
        stats
            .read_scope(scope, |node| {
                node.value(BITRATE_CALCULATED)
                    .and_then(StatValue::as_rate)
                    .map(RateStat::total)
            })
            .flatten()
    }

    fn counter(stats: &StatsStore, ssrc: u32, name: &str) -> Option<u64> {
        stats
            .read_scope(&ssrc_key(ssrc), |node| {
                node.value(name).and_then(StatValue::as_cumulative)
            })
            .flatten()
    }

    fn label(stats: &StatsStore, ssrc: u32, name: &str) -> Option<String> {
        stats
            .read_scope(&ssrc_key(ssrc), |node| {
                node.value(name).and_then(StatValue::as_str).map(str::to_string)
            })
            .flatten()
    }

    #[test]
    fn test_update_binds_once() {
        let (calculator, stats) = bound_calculator();
        assert!(calculator.is_bound());
        assert_eq!(bitrate_total(&stats, TOTAL_SCOPE), Some(0));

        let other = Arc::new(StatsStore::new());
        calculator.update(Arc::new(StreamRoles::new()), Arc::clone(&other));

        assert!(Arc::ptr_eq(calculator.stats().unwrap(), &stats));
        assert!(other.is_empty());
    }

    #[test]
    fn test_unbound_calculator_drops_packets() {
        let calculator = StatsCalculator::new();
        calculator.process_packet(&rtp_packet(VIDEO_SOURCE, 100));
        calculator.incr_stat(VIDEO_SOURCE, "PLI");
        assert!(!calculator.is_bound());
    }

    #[test]
    fn test_rtp_bitrate_accumulates() {
        let (calculator, stats) = bound_calculator();

        let first = rtp_packet(VIDEO_SOURCE, 988);
        let second = rtp_packet(VIDEO_SINK, 488);
        calculator.process_packet(&first);
        calculator.process_packet(&second);
        calculator.process_packet(&first);

        assert_eq!(bitrate_total(&stats, &ssrc_key(VIDEO_SOURCE)), Some(2000));
        assert_eq!(bitrate_total(&stats, &ssrc_key(VIDEO_SINK)), Some(500));
        assert_eq!(bitrate_total(&stats, TOTAL_SCOPE), Some(2500));
    }

    #[test]
    fn test_rtp_stream_type() {
        let (calculator, stats) = bound_calculator();

        calculator.process_packet(&rtp_packet(VIDEO_SOURCE, 10));
        calculator.process_packet(&rtp_packet(AUDIO_SINK, 10));

        assert_eq!(label(&stats, VIDEO_SOURCE, "type").as_deref(), Some("video"));
        assert_eq!(label(&stats, AUDIO_SINK, "type").as_deref(), Some("audio"));
    }

    #[test]
    fn test_rtp_unknown_ssrc_is_ignored() {
        let (calculator, stats) = bound_calculator();

        calculator.process_packet(&rtp_packet(REMOTE, 500));

        assert!(!stats.has_scope(&ssrc_key(REMOTE)));
        assert_eq!(bitrate_total(&stats, TOTAL_SCOPE), Some(0));
        assert_eq!(stats.len(), 1);
    }

    #[test]
    fn test_rtp_truncated_is_ignored() {
        let (calculator, stats) = bound_calculator();
        calculator.process_packet(&DataPacket::video(Bytes::from_static(&[0x80, 100, 0, 1])));
        assert_eq!(bitrate_total(&stats, TOTAL_SCOPE), Some(0));
    }

    #[test]
    fn test_compound_sr_rr_pli() {
        let (calculator, stats) = bound_calculator();

        let mut buf = sender_report(VIDEO_SOURCE, 120, 96_000);
        buf.extend_from_slice(&receiver_report(VIDEO_SOURCE, REMOTE, 12, 34, 56));
        buf.extend_from_slice(&feedback(RTCP_PS_FEEDBACK_PT, RTCP_PLI_FMT, VIDEO_SOURCE, REMOTE, &[]));
        calculator.process_packet(&rtcp_packet(buf));

        assert_eq!(counter(&stats, VIDEO_SOURCE, "packetsSent"), Some(120));
        assert_eq!(counter(&stats, VIDEO_SOURCE, "bytesSent"), Some(96_000));
        assert_eq!(counter(&stats, VIDEO_SOURCE, "fractionLost"), Some(12));
        assert_eq!(counter(&stats, VIDEO_SOURCE, "packetsLost"), Some(34));
        assert_eq!(counter(&stats, VIDEO_SOURCE, "jitter"), Some(56));
        assert_eq!(
            counter(&stats, VIDEO_SOURCE, "sourceSsrc"),
            Some(u64::from(VIDEO_SOURCE))
        );
        assert_eq!(counter(&stats, VIDEO_SOURCE, "PLI"), Some(1));
        assert_eq!(stats.update_count(), 1);
    }

    #[test]
    fn test_receiver_report_resolves_reported_stream() {
        let (calculator, stats) = bound_calculator();

        let buf = receiver_report(REMOTE, VIDEO_SINK, 5, 7, 9);
        calculator.process_packet(&rtcp_packet(buf));

        assert_eq!(counter(&stats, VIDEO_SINK, "packetsLost"), Some(7));
        assert_eq!(
            counter(&stats, VIDEO_SINK, "sourceSsrc"),
            Some(u64::from(VIDEO_SINK))
        );
        assert!(!stats.has_scope(&ssrc_key(REMOTE)));
    }

    #[test]
    fn test_receiver_report_is_absolute() {
        let (calculator, stats) = bound_calculator();

        calculator.process_packet(&rtcp_packet(receiver_report(REMOTE, VIDEO_SINK, 5, 70, 9)));
        calculator.process_packet(&rtcp_packet(receiver_report(REMOTE, VIDEO_SINK, 1, 20, 3)));

        assert_eq!(counter(&stats, VIDEO_SINK, "packetsLost"), Some(20));
        assert_eq!(counter(&stats, VIDEO_SINK, "jitter"), Some(3));
        assert_eq!(stats.update_count(), 2);
    }

    #[test]
    fn test_feedback_counters() {
        let (calculator, stats) = bound_calculator();

        let mut buf = feedback(RTCP_RTP_FEEDBACK_PT, 1, REMOTE, VIDEO_SINK, &[0, 1, 0, 0, 0, 5, 0, 0]);
        buf.extend_from_slice(&feedback(RTCP_PS_FEEDBACK_PT, RTCP_SLI_FMT, REMOTE, VIDEO_SINK, &[0; 4]));
        buf.extend_from_slice(&feedback(RTCP_PS_FEEDBACK_PT, RTCP_FIR_FMT, REMOTE, VIDEO_SINK, &[0; 8]));
        buf.extend_from_slice(&feedback(RTCP_PS_FEEDBACK_PT, RTCP_PLI_FMT, REMOTE, VIDEO_SINK, &[]));
        calculator.process_packet(&rtcp_packet(buf.clone()));
        calculator.process_packet(&rtcp_packet(buf));

        // One NACK per sub-packet, regardless of how many FCI entries it carries
        assert_eq!(counter(&stats, VIDEO_SINK, "NACK"), Some(2));
        assert_eq!(counter(&stats, VIDEO_SINK, "SLI"), Some(2));
        assert_eq!(counter(&stats, VIDEO_SINK, "FIR"), Some(2));
        assert_eq!(counter(&stats, VIDEO_SINK, "PLI"), Some(2));
    }

    #[test]
    fn test_feedback_for_unknown_sink_is_ignored() {
        let (calculator, stats) = bound_calculator();

        // Feedback about a source stream is not ours to count
        let buf = feedback(RTCP_PS_FEEDBACK_PT, RTCP_PLI_FMT, REMOTE, VIDEO_SOURCE, &[]);
        calculator.process_packet(&rtcp_packet(buf));

        assert!(!stats.has_scope(&ssrc_key(VIDEO_SOURCE)));
        assert_eq!(stats.update_count(), 0);
    }

    #[test]
    fn test_sender_report_from_unknown_source_is_ignored() {
        let (calculator, stats) = bound_calculator();
        calculator.process_packet(&rtcp_packet(sender_report(REMOTE, 1, 1)));
        assert!(!stats.has_scope(&ssrc_key(REMOTE)));
        assert_eq!(stats.update_count(), 0);
    }

    #[test]
    fn test_remb_bandwidth() {
        let (calculator, stats) = bound_calculator();

        calculator.process_packet(&rtcp_packet(remb(REMOTE, VIDEO_SINK, 6, 15_625)));
        assert_eq!(counter(&stats, VIDEO_SINK, "bandwidth"), Some(1_000_000));

        calculator.process_packet(&rtcp_packet(remb(REMOTE, VIDEO_SINK, 3, 0x20000)));
        assert_eq!(counter(&stats, VIDEO_SINK, "bandwidth"), Some(1_048_576));
    }

    #[test]
    fn test_non_remb_afb_and_unknown_fmt_are_skipped() {
        let (calculator, stats) = bound_calculator();

        let mut fci = BytesMut::new();
        fci.put_slice(b"GOOG");
        fci.put_u32(0);
        let mut buf = feedback(RTCP_PS_FEEDBACK_PT, RTCP_AFB_FMT, REMOTE, VIDEO_SINK, &fci);
        buf.extend_from_slice(&feedback(RTCP_PS_FEEDBACK_PT, 9, REMOTE, VIDEO_SINK, &[]));
        buf.extend_from_slice(&feedback(RTCP_PS_FEEDBACK_PT, RTCP_PLI_FMT, REMOTE, VIDEO_SINK, &[]));
        calculator.process_packet(&rtcp_packet(buf));

        assert_eq!(counter(&stats, VIDEO_SINK, "bandwidth"), None);
        // Later sub-packets in the chain are still processed
        assert_eq!(counter(&stats, VIDEO_SINK, "PLI"), Some(1));
        assert_eq!(stats.update_count(), 1);
    }

    #[test]
    fn test_ignored_feedback_creates_no_scope() {
        let (calculator, stats) = bound_calculator();

        let mut buf = feedback(RTCP_PS_FEEDBACK_PT, 9, REMOTE, VIDEO_SINK, &[]);
        buf.extend_from_slice(&feedback(RTCP_PS_FEEDBACK_PT, RTCP_AFB_FMT, REMOTE, VIDEO_SINK, b"GOOG"));
        calculator.process_packet(&rtcp_packet(buf));

        assert!(!stats.has_scope(&ssrc_key(VIDEO_SINK)));
        let json: serde_json::Value = serde_json::from_str(&stats.to_json().unwrap()).unwrap();
        assert!(json.get(ssrc_key(VIDEO_SINK)).is_none());
    }

    #[test]
    fn test_overrun_stops_chain_after_first() {
        let (calculator, stats) = bound_calculator();

        let mut buf = sender_report(VIDEO_SOURCE, 10, 1000);
        let mut bad = feedback(RTCP_PS_FEEDBACK_PT, RTCP_PLI_FMT, VIDEO_SOURCE, VIDEO_SINK, &[]);
        bad[2] = 0xFF;
        buf.extend_from_slice(&bad);
        calculator.process_packet(&rtcp_packet(buf));

        assert_eq!(counter(&stats, VIDEO_SOURCE, "packetsSent"), Some(10));
        assert_eq!(counter(&stats, VIDEO_SOURCE, "PLI"), None);

        // The stream keeps flowing after a malformed packet
        calculator.process_packet(&rtcp_packet(sender_report(VIDEO_SOURCE, 11, 1100)));
        assert_eq!(counter(&stats, VIDEO_SOURCE, "packetsSent"), Some(11));
    }

    #[test]
    fn test_first_sub_packet_overrun_is_discarded() {
        let (calculator, stats) = bound_calculator();

        let mut buf = sender_report(VIDEO_SOURCE, 10, 1000);
        buf[3] = 20;
        calculator.process_packet(&rtcp_packet(buf));

        assert!(!stats.has_scope(&ssrc_key(VIDEO_SOURCE)));
        assert_eq!(stats.update_count(), 0);
    }

    #[test]
    fn test_short_receiver_report_is_malformed() {
        let (calculator, stats) = bound_calculator();

        // RR header with a source SSRC but no room for the report block
        let mut buf = BytesMut::new();
        buf.put_u8(0x81);
        buf.put_u8(RTCP_RECEIVER_PT);
        buf.put_u16(2);
        buf.put_u32(REMOTE);
        buf.put_u32(VIDEO_SINK);
        calculator.process_packet(&rtcp_packet(buf));

        assert_eq!(counter(&stats, VIDEO_SINK, "packetsLost"), None);
        assert_eq!(stats.update_count(), 0);
    }

    #[test]
    fn test_sdes_and_bye_only_notify() {
        let (calculator, stats) = bound_calculator();

        let mut buf = BytesMut::new();
        buf.put_u8(0x81);
        buf.put_u8(RTCP_SDES_PT);
        buf.put_u16(1);
        buf.put_u32(VIDEO_SOURCE);
        buf.put_u8(0x81);
        buf.put_u8(RTCP_BYE_PT);
        buf.put_u16(1);
        buf.put_u32(VIDEO_SOURCE);
        calculator.process_packet(&rtcp_packet(buf));

        assert!(!stats.has_scope(&ssrc_key(VIDEO_SOURCE)));
        assert_eq!(stats.update_count(), 1);
    }

    #[test]
    fn test_incr_stat() {
        let (calculator, stats) = bound_calculator();

        calculator.incr_stat(VIDEO_SINK, "NACK");
        assert_eq!(counter(&stats, VIDEO_SINK, "NACK"), Some(1));

        calculator.incr_stat(VIDEO_SINK, "NACK");
        calculator.incr_stat(VIDEO_SINK, "NACK");
        assert_eq!(counter(&stats, VIDEO_SINK, "NACK"), Some(3));
    }
}
