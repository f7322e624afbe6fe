//! Stat tree nodes and typed leaf values
//!
//! A node is either a container of named children or a leaf holding one
//! typed value. Leaf kinds are fixed at creation: a path created as a rate
//! accumulator stays a rate accumulator.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::StatsError;

/// Number of slots a rate window is split into
const RATE_SLOTS: u32 = 100;

/// Windowed accumulator producing a rate over a trailing period
///
/// `add` records units now; `rate` sums the units inside the window,
/// multiplies by `scale` (8.0 turns bytes into bits) and divides by the
/// period in seconds. Units are summed into fixed-width slots, so memory
/// depends on the window and not on the packet rate.
#[derive(Debug, Clone)]
pub struct RateStat {
    period: Duration,
    slot: Duration,
    scale: f64,
    total: u64,
    /// Slot start and units summed in that slot, oldest first
    samples: VecDeque<(Instant, u64)>,
}

impl RateStat {
    pub fn new(period: Duration, scale: f64) -> Self {
        Self {
            period,
            slot: period / RATE_SLOTS,
            scale,
            total: 0,
            samples: VecDeque::new(),
        }
    }

    /// Add units at the current instant
    pub fn add(&mut self, units: u64) {
        self.add_at(units, Instant::now());
    }

    /// Add units observed at `now`
    pub fn add_at(&mut self, units: u64, now: Instant) {
        self.total = self.total.saturating_add(units);
        match self.samples.back_mut() {
            Some((start, sum)) if now.saturating_duration_since(*start) < self.slot => {
                *sum = sum.saturating_add(units);
            }
            _ => self.samples.push_back((now, units)),
        }
        self.prune(now);
    }

    /// Units added over the lifetime of the stat
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Current rate in scaled units per second
    pub fn rate(&self) -> u64 {
        self.rate_at(Instant::now())
    }

    /// Rate over the window ending at `now`
    pub fn rate_at(&self, now: Instant) -> u64 {
        let secs = self.period.as_secs_f64();
        if secs <= 0.0 {
            return 0;
        }

        let in_window: u64 = self
            .samples
            .iter()
            .filter(|(at, _)| now.saturating_duration_since(*at) < self.period)
            .map(|(_, units)| *units)
            .sum();

        (in_window as f64 * self.scale / secs) as u64
    }

    fn prune(&mut self, now: Instant) {
        while let Some((at, _)) = self.samples.front() {
            if now.saturating_duration_since(*at) < self.period {
                break;
            }
            self.samples.pop_front();
        }
    }
}

/// Counter that is either set to an absolute value or incremented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CumulativeStat {
    value: u64,
}

impl CumulativeStat {
    pub fn new(value: u64) -> Self {
        Self { value }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn set(&mut self, value: u64) {
        self.value = value;
    }

    /// Increment by one, returning the new value
    pub fn incr(&mut self) -> u64 {
        self.value = self.value.saturating_add(1);
        self.value
    }
}

/// Assignable label such as "audio" or "video"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringStat {
    value: String,
}

impl StringStat {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }
}

/// Typed leaf value
#[derive(Debug, Clone)]
pub enum StatValue {
    Rate(RateStat),
    Cumulative(CumulativeStat),
    String(StringStat),
}

impl StatValue {
    /// Name of the leaf kind, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            StatValue::Rate(_) => "rate",
            StatValue::Cumulative(_) => "cumulative",
            StatValue::String(_) => "string",
        }
    }

    pub fn as_rate(&self) -> Option<&RateStat> {
        match self {
            StatValue::Rate(rate) => Some(rate),
            _ => None,
        }
    }

    pub fn as_cumulative(&self) -> Option<u64> {
        match self {
            StatValue::Cumulative(counter) => Some(counter.value()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StatValue::String(label) => Some(label.value()),
            _ => None,
        }
    }
}

impl From<RateStat> for StatValue {
    fn from(rate: RateStat) -> Self {
        StatValue::Rate(rate)
    }
}

impl From<CumulativeStat> for StatValue {
    fn from(counter: CumulativeStat) -> Self {
        StatValue::Cumulative(counter)
    }
}

impl From<StringStat> for StatValue {
    fn from(label: StringStat) -> Self {
        StatValue::String(label)
    }
}

/// Serialisable view of a stat tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StatSnapshot {
    Scope(BTreeMap<String, StatSnapshot>),
    Number(u64),
    Text(String),
}

impl StatSnapshot {
    /// Look up a direct child of a scope snapshot
    pub fn get(&self, key: &str) -> Option<&StatSnapshot> {
        match self {
            StatSnapshot::Scope(children) => children.get(key),
            _ => None,
        }
    }
}

/// Node of the stats tree
#[derive(Debug, Clone)]
pub enum StatNode {
    Container(HashMap<String, StatNode>),
    Leaf(StatValue),
}

impl StatNode {
    /// Create an empty container
    pub fn new() -> Self {
        StatNode::Container(HashMap::new())
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, StatNode::Leaf(_))
    }

    pub fn has_child(&self, key: &str) -> bool {
        self.child(key).is_some()
    }

    pub fn child(&self, key: &str) -> Option<&StatNode> {
        match self {
            StatNode::Container(children) => children.get(key),
            StatNode::Leaf(_) => None,
        }
    }

    /// Number of direct children
    pub fn len(&self) -> usize {
        match self {
            StatNode::Container(children) => children.len(),
            StatNode::Leaf(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Leaf value stored directly under `key`
    pub fn value(&self, key: &str) -> Option<&StatValue> {
        match self.child(key)? {
            StatNode::Leaf(value) => Some(value),
            StatNode::Container(_) => None,
        }
    }

    /// Get or create a child container
    pub fn scope_mut(&mut self, key: &str) -> Result<&mut StatNode, StatsError> {
        let children = self.children_mut(key)?;
        let node = children.entry(key.to_string()).or_insert_with(StatNode::new);
        if node.is_leaf() {
            return Err(StatsError::NotAContainer(key.to_string()));
        }
        Ok(node)
    }

    /// Insert or replace a leaf, keeping its kind stable
    pub fn insert_stat(&mut self, key: &str, value: impl Into<StatValue>) -> Result<(), StatsError> {
        let value = value.into();
        let children = self.children_mut(key)?;

        match children.get(key) {
            Some(StatNode::Leaf(existing))
                if std::mem::discriminant(existing) != std::mem::discriminant(&value) =>
            {
                return Err(StatsError::KindMismatch {
                    key: key.to_string(),
                    existing: existing.kind(),
                    requested: value.kind(),
                });
            }
            Some(StatNode::Container(_)) => return Err(StatsError::NotALeaf(key.to_string())),
            _ => {}
        }

        children.insert(key.to_string(), StatNode::Leaf(value));
        Ok(())
    }

    /// Add units to an existing rate leaf
    pub fn add_rate(&mut self, key: &str, units: u64) -> Result<(), StatsError> {
        match self.leaf_mut(key)? {
            StatValue::Rate(rate) => {
                rate.add(units);
                Ok(())
            }
            other => Err(StatsError::KindMismatch {
                key: key.to_string(),
                existing: other.kind(),
                requested: "rate",
            }),
        }
    }

    /// Set a cumulative leaf to an absolute value, creating it if needed
    pub fn set_cumulative(&mut self, key: &str, value: u64) -> Result<(), StatsError> {
        self.insert_stat(key, CumulativeStat::new(value))
    }

    /// Increment a cumulative leaf, starting at 1 when it does not exist
    pub fn incr(&mut self, key: &str) -> Result<u64, StatsError> {
        if !self.has_child(key) {
            self.insert_stat(key, CumulativeStat::new(1))?;
            return Ok(1);
        }

        match self.leaf_mut(key)? {
            StatValue::Cumulative(counter) => Ok(counter.incr()),
            other => Err(StatsError::KindMismatch {
                key: key.to_string(),
                existing: other.kind(),
                requested: "cumulative",
            }),
        }
    }

    /// Render this node for export
    pub fn snapshot(&self) -> StatSnapshot {
        match self {
            StatNode::Container(children) => StatSnapshot::Scope(
                children
                    .iter()
                    .map(|(key, node)| (key.clone(), node.snapshot()))
                    .collect(),
            ),
            StatNode::Leaf(StatValue::Rate(rate)) => StatSnapshot::Number(rate.rate()),
            StatNode::Leaf(StatValue::Cumulative(counter)) => {
                StatSnapshot::Number(counter.value())
            }
            StatNode::Leaf(StatValue::String(label)) => {
                StatSnapshot::Text(label.value().to_string())
            }
        }
    }

    fn children_mut(&mut self, key: &str) -> Result<&mut HashMap<String, StatNode>, StatsError> {
        match self {
            StatNode::Container(children) => Ok(children),
            StatNode::Leaf(_) => Err(StatsError::NotAContainer(key.to_string())),
        }
    }

    fn leaf_mut(&mut self, key: &str) -> Result<&mut StatValue, StatsError> {
        match self.children_mut(key)?.get_mut(key) {
            Some(StatNode::Leaf(value)) => Ok(value),
            Some(StatNode::Container(_)) => Err(StatsError::NotALeaf(key.to_string())),
            None => Err(StatsError::Missing(key.to_string())),
        }
    }
}

impl Default for StatNode {
    fn default() -> Self {
        Self::new()
    }
}
