//! RTP/RTCP statistics and one-to-many relaying for SFU media servers
//!
//! - [`rtp`]: packet classification and RTCP/VP8 parsing
//! - [`stats`]: per-stream statistics gathered from the media pipeline
//! - [`pipeline`]: the contract stats stages expect from their pipeline
//! - [`relay`]: publisher to many-subscriber fan-out

pub mod error;
pub mod pipeline;
pub mod relay;
pub mod rtp;
pub mod stats;

pub use error::{Error, PacketError, Result, StatsError};
pub use pipeline::{MediaSession, PipelineServices, ServiceRegistry, StreamRoles};
pub use relay::{MediaSink, MediaSource, OneToManyRelay, RelayConfig};
pub use rtp::{DataPacket, PacketKind};
pub use stats::{IncomingStatsHandler, OutgoingStatsHandler, StatsCalculator, StatsConfig, StatsStore};
