//! Relay configuration

/// VP8 payload type
pub const VP8_PT: u8 = 100;
/// VP9 payload type
pub const VP9_PT: u8 = 101;
/// H.264 payload type
pub const H264_PT: u8 = 127;

/// Configuration for a one-to-many relay
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Maximum packets kept in the head buffer (0 disables it)
    pub head_max_packets: usize,

    /// Maximum bytes kept in the head buffer
    pub head_max_bytes: usize,

    /// Payload types treated as video; everything else is audio
    pub video_payload_types: Vec<u8>,

    /// Payload type carrying VP8, used for keyframe detection
    pub vp8_payload_type: u8,

    /// Initial capacity of the scratch buffer used for rewriting
    pub scratch_buffer_size: usize,

    /// Capacity of channel-backed subscriber sinks
    pub sink_channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            head_max_packets: 256,
            head_max_bytes: 1024 * 1024, // 1MB
            video_payload_types: vec![VP8_PT, VP9_PT, H264_PT],
            vp8_payload_type: VP8_PT,
            scratch_buffer_size: 2000,
            sink_channel_capacity: 1024,
        }
    }
}

impl RelayConfig {
    /// Set the head buffer packet limit
    pub fn head_max_packets(mut self, max: usize) -> Self {
        self.head_max_packets = max;
        self
    }

    /// Set the head buffer byte limit
    pub fn head_max_bytes(mut self, max: usize) -> Self {
        self.head_max_bytes = max;
        self
    }

    /// Disable head buffering
    pub fn disable_head_buffer(mut self) -> Self {
        self.head_max_packets = 0;
        self
    }

    /// Set the payload types treated as video
    pub fn video_payload_types(mut self, types: impl Into<Vec<u8>>) -> Self {
        self.video_payload_types = types.into();
        self
    }

    /// Set the VP8 payload type
    pub fn vp8_payload_type(mut self, pt: u8) -> Self {
        self.vp8_payload_type = pt;
        self
    }

    /// Set the subscriber channel capacity
    pub fn sink_channel_capacity(mut self, capacity: usize) -> Self {
        self.sink_channel_capacity = capacity.max(1);
        self
    }

    pub fn is_video_payload(&self, pt: u8) -> bool {
        self.video_payload_types.contains(&pt)
    }

    pub fn head_enabled(&self) -> bool {
        self.head_max_packets > 0 && self.head_max_bytes > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();

        assert_eq!(config.head_max_packets, 256);
        assert_eq!(config.scratch_buffer_size, 2000);
        assert!(config.is_video_payload(VP8_PT));
        assert!(!config.is_video_payload(111));
        assert!(config.head_enabled());
    }

    #[test]
    fn test_builder_chaining() {
        let config = RelayConfig::default()
            .head_max_packets(8)
            .head_max_bytes(4096)
            .video_payload_types([96, 97])
            .vp8_payload_type(96)
            .sink_channel_capacity(0);

        assert_eq!(config.head_max_packets, 8);
        assert_eq!(config.head_max_bytes, 4096);
        assert!(config.is_video_payload(96));
        assert!(!config.is_video_payload(VP8_PT));
        assert_eq!(config.vp8_payload_type, 96);
        assert_eq!(config.sink_channel_capacity, 1);
    }

    #[test]
    fn test_disable_head_buffer() {
        let config = RelayConfig::default().disable_head_buffer();
        assert!(!config.head_enabled());
    }
}
