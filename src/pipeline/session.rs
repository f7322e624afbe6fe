//! Stream-role queries about the owning session

/// What the stats calculator needs to know about its session
///
/// Sources are streams the remote peer sends to us; sinks are streams we
/// send to the remote peer. Feedback from the peer is about a sink.
pub trait MediaSession: Send + Sync {
    fn is_source_ssrc(&self, ssrc: u32) -> bool;

    fn is_sink_ssrc(&self, ssrc: u32) -> bool;

    fn audio_source_ssrc(&self) -> Option<u32>;

    fn video_source_ssrc(&self) -> Option<u32>;

    fn audio_sink_ssrc(&self) -> Option<u32>;

    fn video_sink_ssrc(&self) -> Option<u32>;

    /// Whether the SSRC is one of the session's video streams
    fn is_video_ssrc(&self, ssrc: u32) -> bool {
        self.video_source_ssrc() == Some(ssrc) || self.video_sink_ssrc() == Some(ssrc)
    }

    /// Whether the SSRC is one of the session's audio streams
    fn is_audio_ssrc(&self, ssrc: u32) -> bool {
        self.audio_source_ssrc() == Some(ssrc) || self.audio_sink_ssrc() == Some(ssrc)
    }
}

/// Fixed SSRC assignment for a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamRoles {
    pub audio_source: Option<u32>,
    pub video_source: Option<u32>,
    pub audio_sink: Option<u32>,
    pub video_sink: Option<u32>,
}

impl StreamRoles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn audio_source(mut self, ssrc: u32) -> Self {
        self.audio_source = Some(ssrc);
        self
    }

    pub fn video_source(mut self, ssrc: u32) -> Self {
        self.video_source = Some(ssrc);
        self
    }

    pub fn audio_sink(mut self, ssrc: u32) -> Self {
        self.audio_sink = Some(ssrc);
        self
    }

    pub fn video_sink(mut self, ssrc: u32) -> Self {
        self.video_sink = Some(ssrc);
        self
    }
}

impl MediaSession for StreamRoles {
    fn is_source_ssrc(&self, ssrc: u32) -> bool {
        self.audio_source == Some(ssrc) || self.video_source == Some(ssrc)
    }

    fn is_sink_ssrc(&self, ssrc: u32) -> bool {
        self.audio_sink == Some(ssrc) || self.video_sink == Some(ssrc)
    }

    fn audio_source_ssrc(&self) -> Option<u32> {
        self.audio_source
    }

    fn video_source_ssrc(&self) -> Option<u32> {
        self.video_source
    }

    fn audio_sink_ssrc(&self) -> Option<u32> {
        self.audio_sink
    }

    fn video_sink_ssrc(&self) -> Option<u32> {
        self.video_sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_roles() {
        let roles = StreamRoles::new()
            .audio_source(1)
            .video_source(2)
            .audio_sink(3)
            .video_sink(4);

        assert!(roles.is_source_ssrc(1));
        assert!(roles.is_source_ssrc(2));
        assert!(!roles.is_source_ssrc(3));
        assert!(roles.is_sink_ssrc(4));
        assert!(!roles.is_sink_ssrc(99));

        assert!(roles.is_audio_ssrc(3));
        assert!(roles.is_video_ssrc(2));
        assert!(!roles.is_video_ssrc(1));
    }

    #[test]
    fn test_unset_roles_match_nothing() {
        let roles = StreamRoles::new();
        assert!(!roles.is_source_ssrc(0));
        assert!(!roles.is_sink_ssrc(0));
        assert!(!roles.is_audio_ssrc(0));
    }
}
