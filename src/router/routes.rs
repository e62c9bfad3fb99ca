// Route types
// This file defines the arena identifiers, edges, routes and LP entries
// that the routing tables store and the resolver produces
//
// Numan Thabit 2025 Nov

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of an asset in the directory arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub u32);

/// Index of a venue (pool, pair, vault) in the directory arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VenueId(pub u32);

/// Numeric protocol identifier. Zero means "unset".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProtocolId(pub u32);

impl ProtocolId {
    pub const UNSET: ProtocolId = ProtocolId(0);

    pub fn is_set(self) -> bool {
        self != Self::UNSET
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset#{}", self.0)
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "venue#{}", self.0)
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One elementary swap step through a protocol venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub protocol: ProtocolId,
    pub venue: VenueId,
    pub from: AssetId,
    pub to: AssetId,
}

impl Edge {
    pub fn new(protocol: ProtocolId, venue: VenueId, from: AssetId, to: AssetId) -> Self {
        Self {
            protocol,
            venue,
            from,
            to,
        }
    }

    /// Same venue traversed the other way. Adapters must accept both directions.
    pub fn reversed(&self) -> Self {
        Self {
            protocol: self.protocol,
            venue: self.venue,
            from: self.to,
            to: self.from,
        }
    }

    pub fn is_loop(&self) -> bool {
        self.from == self.to
    }
}

/// Ordered, chained sequence of edges.
pub type Route = Vec<Edge>;

/// Protocol and venue an LP receipt asset is minted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRef {
    pub protocol: ProtocolId,
    pub venue: VenueId,
}

/// LP receipt asset entry: the assets that can enter or exit it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LpEntry {
    pub protocol: ProtocolId,
    pub venue: VenueId,
    pub underlying: Vec<AssetId>,
}

impl LpEntry {
    pub fn accepts(&self, asset: AssetId) -> bool {
        self.underlying.contains(&asset)
    }

    pub fn pool(&self) -> PoolRef {
        PoolRef {
            protocol: self.protocol,
            venue: self.venue,
        }
    }
}

/// A single step of an execution plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Native value becomes wrapped native.
    Wrap { from: AssetId, to: AssetId },
    Swap(Edge),
    Enter { lp: AssetId, pool: PoolRef, asset: AssetId },
    Exit { lp: AssetId, pool: PoolRef, asset: AssetId },
    /// Wrapped native becomes native value.
    Unwrap { from: AssetId, to: AssetId },
}

impl Step {
    /// Asset the step consumes.
    pub fn input(&self) -> AssetId {
        match self {
            Step::Wrap { from, .. } => *from,
            Step::Swap(edge) => edge.from,
            Step::Enter { asset, .. } => *asset,
            Step::Exit { lp, .. } => *lp,
            Step::Unwrap { from, .. } => *from,
        }
    }

    /// Protocol and venue the step calls, if any.
    pub fn pool(&self) -> Option<PoolRef> {
        match self {
            Step::Swap(edge) => Some(PoolRef {
                protocol: edge.protocol,
                venue: edge.venue,
            }),
            Step::Enter { pool, .. } | Step::Exit { pool, .. } => Some(*pool),
            Step::Wrap { .. } | Step::Unwrap { .. } => None,
        }
    }

    /// Asset the step produces.
    pub fn output(&self) -> AssetId {
        match self {
            Step::Wrap { to, .. } => *to,
            Step::Swap(edge) => edge.to,
            Step::Enter { lp, .. } => *lp,
            Step::Exit { asset, .. } => *asset,
            Step::Unwrap { to, .. } => *to,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Step::Wrap { .. } => "wrap",
            Step::Swap(_) => "swap",
            Step::Enter { .. } => "enter",
            Step::Exit { .. } => "exit",
            Step::Unwrap { .. } => "unwrap",
        }
    }
}

/// Ordered steps for one exchange, produced against a single table snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    pub steps: Vec<Step>,
}

impl ExecutionPlan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_edge_keeps_protocol_and_venue() {
        let edge = Edge::new(ProtocolId(2), VenueId(7), AssetId(1), AssetId(3));
        let rev = edge.reversed();
        assert_eq!(rev.protocol, ProtocolId(2));
        assert_eq!(rev.venue, VenueId(7));
        assert_eq!((rev.from, rev.to), (AssetId(3), AssetId(1)));
        assert_eq!(rev.reversed(), edge);
    }

    #[test]
    fn unset_protocol_is_zero() {
        assert!(!ProtocolId::UNSET.is_set());
        assert!(ProtocolId(1).is_set());
    }
}
