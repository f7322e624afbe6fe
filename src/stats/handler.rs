//! Pass-through pipeline stages that feed the stats calculator
//!
//! Both stages observe every packet in their direction and forward it
//! unchanged. Neither has an on/off state of its own.

use std::sync::Arc;

use crate::pipeline::{
    Handler, HandlerContext, InboundHandler, MediaSession, OutboundHandler, PipelineServices,
};
use crate::rtp::DataPacket;

use super::calculator::StatsCalculator;
use super::config::StatsConfig;
use super::store::StatsStore;

/// Resolve session and store from the pipeline, once
fn bind_from_services(name: &str, calculator: &StatsCalculator, services: &dyn PipelineServices) {
    if calculator.is_bound() {
        return;
    }

    match (services.session(), services.stats()) {
        (Some(session), Some(stats)) => {
            calculator.update(session, stats);
            tracing::debug!(handler = name, "Stats handler bound to session");
        }
        _ => {
            tracing::debug!(handler = name, "Session services not available yet");
        }
    }
}

/// Observes packets arriving from the network
pub struct IncomingStatsHandler {
    calculator: StatsCalculator,
}

impl IncomingStatsHandler {
    pub fn new() -> Self {
        Self::with_config(StatsConfig::default())
    }

    pub fn with_config(config: StatsConfig) -> Self {
        Self {
            calculator: StatsCalculator::with_config(config),
        }
    }

    /// Bind directly, bypassing service lookup
    pub fn bind(&self, session: Arc<dyn MediaSession>, stats: Arc<StatsStore>) {
        self.calculator.update(session, stats);
    }

    pub fn calculator(&self) -> &StatsCalculator {
        &self.calculator
    }
}

impl Default for IncomingStatsHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for IncomingStatsHandler {
    fn name(&self) -> &'static str {
        "incoming-stats"
    }

    fn enable(&self) {}

    fn disable(&self) {}

    fn notify_update(&self, services: &dyn PipelineServices) {
        bind_from_services(self.name(), &self.calculator, services);
    }
}

impl InboundHandler for IncomingStatsHandler {
    fn read(&self, ctx: &mut dyn HandlerContext, packet: DataPacket) {
        self.calculator.process_packet(&packet);
        ctx.fire_read(packet);
    }
}

/// Observes packets leaving for the network
pub struct OutgoingStatsHandler {
    calculator: StatsCalculator,
}

impl OutgoingStatsHandler {
    pub fn new() -> Self {
        Self::with_config(StatsConfig::default())
    }

    pub fn with_config(config: StatsConfig) -> Self {
        Self {
            calculator: StatsCalculator::with_config(config),
        }
    }

    /// Bind directly, bypassing service lookup
    pub fn bind(&self, session: Arc<dyn MediaSession>, stats: Arc<StatsStore>) {
        self.calculator.update(session, stats);
    }

    pub fn calculator(&self) -> &StatsCalculator {
        &self.calculator
    }
}

impl Default for OutgoingStatsHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for OutgoingStatsHandler {
    fn name(&self) -> &'static str {
        "outgoing-stats"
    }

    fn enable(&self) {}

    fn disable(&self) {}

    fn notify_update(&self, services: &dyn PipelineServices) {
        bind_from_services(self.name(), &self.calculator, services);
    }
}

impl OutboundHandler for OutgoingStatsHandler {
    fn write(&self, ctx: &mut dyn HandlerContext, packet: DataPacket) {
        self.calculator.process_packet(&packet);
        ctx.fire_write(packet);
    }
}
