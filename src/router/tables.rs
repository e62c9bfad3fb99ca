// Routing tables
// Major asset set and major routes, minor edges, LP entries, the protocol
// adapter registry and the allowance cache, stored as one cloneable snapshot
//
// Numan Thabit 2025 Nov

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::errors::ValidationError;
use crate::router::routes::{AssetId, Edge, LpEntry, PoolRef, ProtocolId, Route, VenueId};
use crate::router::validation::{ensure_same_len, validate_edge, validate_lp_entry, validate_route};
use crate::venues::adapter::SwapAdapter;

/// `(spender venue, asset)` pair the router has approved.
pub type AllowancePair = (VenueId, AssetId);

/// Snapshot of every routing table. Mutators validate the whole batch first
/// and only then write, so an `Err` leaves the snapshot untouched.
#[derive(Clone, Default)]
pub struct RoutingTables {
    majors: HashSet<AssetId>,
    major_routes: HashMap<(AssetId, AssetId), Route>,
    minor_edges: HashMap<AssetId, Edge>,
    lp_entries: HashMap<AssetId, LpEntry>,
    adapters: HashMap<ProtocolId, Arc<dyn SwapAdapter>>,
    allowances: HashSet<AllowancePair>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct TableCounts {
    pub major_assets: usize,
    pub major_routes: usize,
    pub minor_edges: usize,
    pub lp_entries: usize,
    pub adapters: usize,
    pub allowances: usize,
}

impl RoutingTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_major(&self, asset: AssetId) -> bool {
        self.majors.contains(&asset)
    }

    pub fn major_route(&self, from: AssetId, to: AssetId) -> Option<&Route> {
        self.major_routes.get(&(from, to))
    }

    pub fn minor_edge(&self, asset: AssetId) -> Option<&Edge> {
        self.minor_edges.get(&asset)
    }

    pub fn lp_entry(&self, asset: AssetId) -> Option<&LpEntry> {
        self.lp_entries.get(&asset)
    }

    pub fn adapter(&self, protocol: ProtocolId) -> Option<&Arc<dyn SwapAdapter>> {
        self.adapters.get(&protocol)
    }

    pub fn allowance_granted(&self, venue: VenueId, asset: AssetId) -> bool {
        self.allowances.contains(&(venue, asset))
    }

    pub fn major_assets(&self) -> Vec<AssetId> {
        let mut majors: Vec<_> = self.majors.iter().copied().collect();
        majors.sort();
        majors
    }

    pub fn counts(&self) -> TableCounts {
        TableCounts {
            major_assets: self.majors.len(),
            major_routes: self.major_routes.len(),
            minor_edges: self.minor_edges.len(),
            lp_entries: self.lp_entries.len(),
            adapters: self.adapters.len(),
            allowances: self.allowances.len(),
        }
    }

    /// Store routes keyed by their endpoints and mark both endpoints major.
    /// Returns the allowance pairs seen for the first time.
    pub fn create_major_routes(
        &mut self,
        routes: Vec<Route>,
    ) -> Result<Vec<AllowancePair>, ValidationError> {
        for route in &routes {
            validate_route(route)?;
        }

        let mut granted = Vec::new();
        for route in routes {
            for edge in &route {
                self.cache_allowance(edge.venue, edge.from, &mut granted);
            }
            let start = route[0].from;
            let end = route[route.len() - 1].to;
            self.majors.insert(start);
            self.majors.insert(end);
            self.major_routes.insert((start, end), route);
        }
        Ok(granted)
    }

    /// Remove stored routes. With `unmark`, endpoints no longer referenced by
    /// any remaining route lose their major marking. Returns the pairs removed.
    pub fn delete_major_routes(
        &mut self,
        pairs: &[(AssetId, AssetId)],
        unmark: bool,
    ) -> Vec<(AssetId, AssetId)> {
        let removed: Vec<_> = pairs
            .iter()
            .filter(|pair| self.major_routes.remove(*pair).is_some())
            .copied()
            .collect();

        if unmark {
            for (start, end) in pairs {
                for asset in [*start, *end] {
                    let referenced = self
                        .major_routes
                        .keys()
                        .any(|(s, e)| *s == asset || *e == asset);
                    if !referenced {
                        self.majors.remove(&asset);
                    }
                }
            }
        }
        removed
    }

    /// Minor edges are also traversed in reverse, so both endpoints get approved.
    pub fn create_minor_edges(
        &mut self,
        edges: Vec<Edge>,
    ) -> Result<Vec<AllowancePair>, ValidationError> {
        for edge in &edges {
            validate_edge(edge)?;
        }

        let mut granted = Vec::new();
        for edge in edges {
            self.cache_allowance(edge.venue, edge.from, &mut granted);
            self.cache_allowance(edge.venue, edge.to, &mut granted);
            self.minor_edges.insert(edge.from, edge);
        }
        Ok(granted)
    }

    pub fn delete_minor_edges(&mut self, assets: &[AssetId]) -> Vec<AssetId> {
        assets
            .iter()
            .filter(|asset| self.minor_edges.remove(*asset).is_some())
            .copied()
            .collect()
    }

    pub fn create_lp_entries(
        &mut self,
        lps: Vec<AssetId>,
        pools: Vec<PoolRef>,
        underlying: Vec<Vec<AssetId>>,
    ) -> Result<Vec<AllowancePair>, ValidationError> {
        ensure_same_len(lps.len(), pools.len())?;
        ensure_same_len(lps.len(), underlying.len())?;

        let mut entries = Vec::with_capacity(lps.len());
        for ((lp, pool), assets) in lps.into_iter().zip(pools).zip(underlying) {
            let mut set: Vec<AssetId> = Vec::with_capacity(assets.len());
            for asset in assets {
                if !set.contains(&asset) {
                    set.push(asset);
                }
            }
            let entry = LpEntry {
                protocol: pool.protocol,
                venue: pool.venue,
                underlying: set,
            };
            validate_lp_entry(&entry)?;
            entries.push((lp, entry));
        }

        let mut granted = Vec::new();
        for (lp, entry) in entries {
            for asset in &entry.underlying {
                self.cache_allowance(entry.venue, *asset, &mut granted);
            }
            self.lp_entries.insert(lp, entry);
        }
        Ok(granted)
    }

    pub fn delete_lp_entries(&mut self, assets: &[AssetId]) -> Vec<AssetId> {
        assets
            .iter()
            .filter(|asset| self.lp_entries.remove(*asset).is_some())
            .copied()
            .collect()
    }

    pub fn register_adapters(
        &mut self,
        protocols: Vec<ProtocolId>,
        handles: Vec<Arc<dyn SwapAdapter>>,
    ) -> Result<(), ValidationError> {
        ensure_same_len(protocols.len(), handles.len())?;
        if protocols.iter().any(|p| !p.is_set()) {
            return Err(ValidationError::ProtocolUnset);
        }
        for (protocol, handle) in protocols.into_iter().zip(handles) {
            self.adapters.insert(protocol, handle);
        }
        Ok(())
    }

    pub fn unregister_adapters(&mut self, protocols: &[ProtocolId]) -> Vec<ProtocolId> {
        protocols
            .iter()
            .filter(|p| self.adapters.remove(*p).is_some())
            .copied()
            .collect()
    }

    /// Explicit approvals for spenders the automatic registration does not cover.
    pub fn grant_allowances(
        &mut self,
        venues: &[VenueId],
        assets: &[AssetId],
    ) -> Result<Vec<AllowancePair>, ValidationError> {
        ensure_same_len(venues.len(), assets.len())?;
        let mut granted = Vec::new();
        for (venue, asset) in venues.iter().zip(assets) {
            self.cache_allowance(*venue, *asset, &mut granted);
        }
        Ok(granted)
    }

    /// Returns the pairs that were cached before the call.
    pub fn revoke_allowances(
        &mut self,
        venues: &[VenueId],
        assets: &[AssetId],
    ) -> Result<Vec<AllowancePair>, ValidationError> {
        ensure_same_len(venues.len(), assets.len())?;
        Ok(venues
            .iter()
            .zip(assets)
            .map(|(venue, asset)| (*venue, *asset))
            .filter(|pair| self.allowances.remove(pair))
            .collect())
    }

    fn cache_allowance(&mut self, venue: VenueId, asset: AssetId, granted: &mut Vec<AllowancePair>) {
        if self.allowances.insert((venue, asset)) {
            granted.push((venue, asset));
        }
    }
}
