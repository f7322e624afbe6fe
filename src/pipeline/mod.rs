//! Pipeline contract consumed by the stats stages
//!
//! The surrounding media pipeline (transport, DTLS, SRTP) is not part of
//! this crate. Stages only need three things from it:
//! - stream-role queries about the owning session ([`MediaSession`])
//! - a lookup for the session and its stats store ([`PipelineServices`])
//! - a way to forward a packet to the next stage ([`HandlerContext`])

pub mod session;

use std::sync::{Arc, PoisonError, RwLock};

use crate::rtp::DataPacket;
use crate::stats::StatsStore;

pub use session::{MediaSession, StreamRoles};

/// Forwarding primitives offered to a stage
pub trait HandlerContext {
    /// Pass a packet to the next inbound stage (towards the application)
    fn fire_read(&mut self, packet: DataPacket);

    /// Pass a packet to the next outbound stage (towards the network)
    fn fire_write(&mut self, packet: DataPacket);
}

/// Behaviour common to every pipeline stage
pub trait Handler: Send + Sync {
    /// Stage name, used in logs
    fn name(&self) -> &'static str;

    fn enable(&self);

    fn disable(&self);

    /// Called by the pipeline when its services change
    fn notify_update(&self, services: &dyn PipelineServices);
}

/// Stage that sees packets coming from the network
pub trait InboundHandler: Handler {
    fn read(&self, ctx: &mut dyn HandlerContext, packet: DataPacket);
}

/// Stage that sees packets going to the network
pub trait OutboundHandler: Handler {
    fn write(&self, ctx: &mut dyn HandlerContext, packet: DataPacket);
}

/// Service lookup offered by the pipeline
pub trait PipelineServices {
    fn session(&self) -> Option<Arc<dyn MediaSession>>;

    fn stats(&self) -> Option<Arc<StatsStore>>;
}

/// Simple service registry a pipeline owner fills in
#[derive(Default)]
pub struct ServiceRegistry {
    session: RwLock<Option<Arc<dyn MediaSession>>>,
    stats: RwLock<Option<Arc<StatsStore>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with both services already present
    pub fn with_services(session: Arc<dyn MediaSession>, stats: Arc<StatsStore>) -> Self {
        let registry = Self::new();
        registry.set_session(session);
        registry.set_stats(stats);
        registry
    }

    pub fn set_session(&self, session: Arc<dyn MediaSession>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    pub fn set_stats(&self, stats: Arc<StatsStore>) {
        *self.stats.write().unwrap_or_else(PoisonError::into_inner) = Some(stats);
    }
}

impl PipelineServices for ServiceRegistry {
    fn session(&self) -> Option<Arc<dyn MediaSession>> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn stats(&self) -> Option<Arc<StatsStore>> {
        self.stats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_starts_empty() {
        let registry = ServiceRegistry::new();
        assert!(registry.session().is_none());
        assert!(registry.stats().is_none());
    }

    #[test]
    fn test_registry_with_services() {
        let stats = Arc::new(StatsStore::new());
        let session: Arc<dyn MediaSession> = Arc::new(StreamRoles::new().video_source(7));
        let registry = ServiceRegistry::with_services(session, Arc::clone(&stats));

        assert!(registry.session().unwrap().is_source_ssrc(7));
        assert!(Arc::ptr_eq(&registry.stats().unwrap(), &stats));
    }
}
