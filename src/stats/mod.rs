//! Per-session RTP/RTCP statistics
//!
//! # Architecture
//!
//! ```text
//!   network ──► IncomingStatsHandler ──► fire_read ──► ...
//!                      │
//!                      ▼
//!               StatsCalculator ──► StatsStore { "total", "<ssrc>", ... }
//!                      ▲                  │
//!                      │                  └──► watch::Receiver (consumer)
//!   ... ──► OutgoingStatsHandler ──► fire_write ──► network
//! ```
//!
//! The store is a tree: top-level scopes ("total" plus one per SSRC) hold
//! typed leaves. Each scope has its own lock so the two directions only
//! contend when they touch the same stream.

pub mod calculator;
pub mod config;
pub mod handler;
pub mod node;
pub mod store;

pub use calculator::{StatsCalculator, BITRATE_CALCULATED};
pub use config::StatsConfig;
pub use handler::{IncomingStatsHandler, OutgoingStatsHandler};
pub use node::{CumulativeStat, RateStat, StatNode, StatSnapshot, StatValue, StringStat};
pub use store::{ssrc_key, StatsStore, TOTAL_SCOPE};
