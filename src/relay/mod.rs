//! One-to-many media relay
//!
//! A relay takes the media of a single publisher and replicates it to any
//! number of subscribers, the core operation of an SFU.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<OneToManyRelay>
//!                  ┌──────────────────────────┐
//!   [Publisher] ──►│ media: Mutex<{           │
//!   set_sink(Weak) │   rewriter, head_buffer, │
//!                  │ }>                       │
//!                  │ subscribers: RwLock<     │
//!                  │   HashMap<Id, Sink>      │
//!                  │ >                        │
//!                  └────────────┬─────────────┘
//!                               │ snapshot
//!          ┌────────────────────┼────────────────────┐
//!          ▼                    ▼                    ▼
//!    [Subscriber]         [Subscriber]         [Subscriber]
//!    deliver_*_data()     deliver_*_data()     deliver_*_data()
//! ```
//!
//! # Zero-Copy Design
//!
//! Packets are `bytes::Bytes`, so every subscriber shares one allocation.
//! A copy is only made when the header has to be rewritten after the
//! publisher changed.

pub mod config;
pub mod fanout;
pub mod head;
pub mod processor;
pub mod rewrite;
pub mod sink;

pub use config::{RelayConfig, H264_PT, VP8_PT, VP9_PT};
pub use fanout::OneToManyRelay;
pub use head::HeadBuffer;
pub use processor::{InputProcessor, OutputProcessor, RawDataPacket};
pub use rewrite::{RewrittenFields, RtpRewriter, StreamRewriter};
pub use sink::{deliver, ChannelSink, MediaSink, MediaSource};
