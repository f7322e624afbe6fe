//! Error types
//!
//! None of these cross the packet-processing boundary: the stats calculator
//! and the relay log them and move on to the next packet.

use thiserror::Error;

/// Errors raised while reading RTP/RTCP wire structures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    /// A field read would run past the end of the buffer
    #[error("truncated packet: need {needed} bytes at offset {offset}, have {len}")]
    Truncated {
        offset: usize,
        needed: usize,
        len: usize,
    },

    /// An RTCP sub-packet declares more bytes than remain in the buffer
    #[error("RTCP sub-packet declares {declared} bytes but only {remaining} remain")]
    InvalidLength { declared: usize, remaining: usize },
}

/// Errors raised by the stats tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    /// A leaf was updated with a different kind than it was created with
    #[error("stat {key} is a {existing} leaf, cannot update as {requested}")]
    KindMismatch {
        key: String,
        existing: &'static str,
        requested: &'static str,
    },

    /// A leaf was used where a container was expected
    #[error("stat {0} is a leaf, not a container")]
    NotAContainer(String),

    /// A container was used where a leaf was expected
    #[error("stat {0} is a container, not a leaf")]
    NotALeaf(String),

    /// No stat exists at the given key
    #[error("stat {0} does not exist")]
    Missing(String),
}

/// Crate-level error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Packet(#[from] PacketError),

    #[error(transparent)]
    Stats(#[from] StatsError),

    /// The relay has been torn down by `close_all`
    #[error("relay is closed")]
    RelayClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
