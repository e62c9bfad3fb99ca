// Asset and venue directory
// Interns external labels (addresses, tickers, pool names) into the dense
// ids the routing tables use, and knows which assets are native aliases
//
// Numan Thabit 2025 Nov

use std::collections::HashMap;

use serde::Serialize;

use crate::router::routes::{AssetId, Edge, ProtocolId, VenueId};

// Stand-ins for labels that were never interned; the arena never reaches them.
const UNLISTED_FROM: AssetId = AssetId(u32::MAX);
const UNLISTED_TO: AssetId = AssetId(u32::MAX - 1);

#[derive(Debug, Default, Clone)]
struct Interner {
    ids: HashMap<String, u32>,
    labels: Vec<String>,
}

impl Interner {
    fn intern(&mut self, label: &str) -> u32 {
        let label = normalize(label);
        if let Some(id) = self.ids.get(&label) {
            return *id;
        }
        // ids start at 1 so zero never names anything
        let id = self.labels.len() as u32 + 1;
        self.labels.push(label.clone());
        self.ids.insert(label, id);
        id
    }

    fn lookup(&self, label: &str) -> Option<u32> {
        self.ids.get(&normalize(label)).copied()
    }

    fn label(&self, id: u32) -> Option<&str> {
        id.checked_sub(1)
            .and_then(|idx| self.labels.get(idx as usize))
            .map(String::as_str)
    }
}

/// Hex addresses compare case-insensitively; everything else is kept as given.
fn normalize(label: &str) -> String {
    let label = label.trim();
    if label.starts_with("0x") || label.starts_with("0X") {
        label.to_ascii_lowercase()
    } else {
        label.to_string()
    }
}

/// Native-value aliases and the wrapped token that stands in for them on venues.
/// Native balances are held on the ledger under the first alias.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NativeAssets {
    pub aliases: Vec<AssetId>,
    pub wrapped: Option<AssetId>,
}

impl NativeAssets {
    pub fn is_native(&self, asset: AssetId) -> bool {
        self.aliases.contains(&asset)
    }

    /// Ledger asset that holds value for `asset`: every alias maps to the first one.
    pub fn custody_asset(&self, asset: AssetId) -> AssetId {
        match self.aliases.first() {
            Some(canonical) if self.is_native(asset) => *canonical,
            _ => asset,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Directory {
    assets: Interner,
    venues: Interner,
    native: NativeAssets,
}

impl Directory {
    pub fn new<S: AsRef<str>>(native_aliases: &[S], wrapped_native: Option<&str>) -> Self {
        let mut directory = Self::default();
        for alias in native_aliases {
            let id = directory.asset(alias.as_ref());
            if !directory.native.is_native(id) {
                directory.native.aliases.push(id);
            }
        }
        let wrapped = wrapped_native.map(|label| directory.asset(label));
        directory.native.wrapped = wrapped;
        directory
    }

    /// Id for `label`, allocating one on first sight.
    pub fn asset(&mut self, label: &str) -> AssetId {
        AssetId(self.assets.intern(label))
    }

    pub fn venue(&mut self, label: &str) -> VenueId {
        VenueId(self.venues.intern(label))
    }

    /// Edge between labelled assets through a labelled venue.
    pub fn edge(&mut self, protocol: u32, venue: &str, from: &str, to: &str) -> Edge {
        Edge::new(
            ProtocolId(protocol),
            self.venue(venue),
            self.asset(from),
            self.asset(to),
        )
    }

    pub fn find_asset(&self, label: &str) -> Option<AssetId> {
        self.assets.lookup(label).map(AssetId)
    }

    /// Ids for a queried pair without interning. An unknown label gets a
    /// stand-in id that names no table entry, so it resolves like any asset
    /// with neither a major route nor a minor edge.
    pub fn lookup_pair(&self, from: &str, to: &str) -> (AssetId, AssetId) {
        if normalize(from) == normalize(to) {
            let id = self.find_asset(from).unwrap_or(UNLISTED_FROM);
            return (id, id);
        }
        (
            self.find_asset(from).unwrap_or(UNLISTED_FROM),
            self.find_asset(to).unwrap_or(UNLISTED_TO),
        )
    }

    pub fn find_venue(&self, label: &str) -> Option<VenueId> {
        self.venues.lookup(label).map(VenueId)
    }

    pub fn asset_label(&self, id: AssetId) -> Option<&str> {
        self.assets.label(id.0)
    }

    pub fn venue_label(&self, id: VenueId) -> Option<&str> {
        self.venues.label(id.0)
    }

    pub fn native(&self) -> &NativeAssets {
        &self.native
    }
}
