// Bootstrap seeding
//
// Reads a YAML file declaring adapters, routing tables, explicit approvals
// and seed balances, and applies it through the regular admin operations.
//
// Numan Thabit 2025 Nov

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::router::api::{intern_edge, parse_account, EdgeBody};
use crate::router::routes::{PoolRef, ProtocolId, Route};
use crate::router::{Directory, Router};
use crate::venues::adapter::AdapterSpec;

#[derive(Debug, Clone, Deserialize)]
pub struct AdapterDecl {
    pub protocol: u32,
    pub adapter: AdapterSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LpDecl {
    pub lp: String,
    pub protocol: u32,
    pub venue: String,
    pub underlying: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalDecl {
    pub venue: String,
    pub asset: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceDecl {
    pub account: String,
    pub asset: String,
    pub amount: u128,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Bootstrap {
    /// Actor the admin operations run as; defaults to the first configured admin.
    pub actor: Option<String>,
    pub adapters: Vec<AdapterDecl>,
    pub major_routes: Vec<Vec<EdgeBody>>,
    pub minor_edges: Vec<EdgeBody>,
    pub lp_entries: Vec<LpDecl>,
    pub approvals: Vec<ApprovalDecl>,
    pub balances: Vec<BalanceDecl>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapSummary {
    pub adapters: usize,
    pub major_routes: usize,
    pub minor_edges: usize,
    pub lp_entries: usize,
    pub approvals: usize,
    pub balances: usize,
}

impl Bootstrap {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parse bootstrap yaml")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read bootstrap file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("load bootstrap file {}", path.display()))
    }

    /// Apply every section in order. Each section is one admin batch, so a
    /// rejected section leaves the earlier ones in place.
    pub async fn apply(
        self,
        router: &Router,
        directory: &mut Directory,
        default_actor: Option<&str>,
    ) -> Result<BootstrapSummary> {
        let actor = self
            .actor
            .as_deref()
            .or(default_actor)
            .context("bootstrap needs an actor: set `actor` or configure APP__ADMINS")?
            .to_string();
        let mut summary = BootstrapSummary::default();

        if !self.adapters.is_empty() {
            let protocols = self.adapters.iter().map(|a| ProtocolId(a.protocol)).collect();
            let handles = self.adapters.iter().map(|a| a.adapter.build()).collect();
            router
                .register_adapters(&actor, protocols, handles)
                .await
                .context("register adapters")?;
            summary.adapters = self.adapters.len();
        }

        if !self.major_routes.is_empty() {
            let routes: Vec<Route> = self
                .major_routes
                .iter()
                .map(|route| route.iter().map(|e| intern_edge(directory, e)).collect())
                .collect();
            summary.major_routes = routes.len();
            router
                .create_major_routes(&actor, routes)
                .await
                .context("create major routes")?;
        }

        if !self.minor_edges.is_empty() {
            let edges: Vec<_> = self
                .minor_edges
                .iter()
                .map(|e| intern_edge(directory, e))
                .collect();
            summary.minor_edges = edges.len();
            router
                .create_minor_edges(&actor, edges)
                .await
                .context("create minor edges")?;
        }

        if !self.lp_entries.is_empty() {
            let mut lps = Vec::with_capacity(self.lp_entries.len());
            let mut pools = Vec::with_capacity(self.lp_entries.len());
            let mut underlying: Vec<Vec<_>> = Vec::with_capacity(self.lp_entries.len());
            for decl in &self.lp_entries {
                lps.push(directory.asset(&decl.lp));
                pools.push(PoolRef {
                    protocol: ProtocolId(decl.protocol),
                    venue: directory.venue(&decl.venue),
                });
                underlying.push(decl.underlying.iter().map(|a| directory.asset(a)).collect());
            }
            summary.lp_entries = lps.len();
            router
                .create_lp_entries(&actor, lps, pools, underlying)
                .await
                .context("create lp entries")?;
        }

        if !self.approvals.is_empty() {
            let venues = self.approvals.iter().map(|a| directory.venue(&a.venue)).collect();
            let assets = self.approvals.iter().map(|a| directory.asset(&a.asset)).collect();
            summary.approvals = router
                .grant_allowance(&actor, venues, assets)
                .await
                .context("grant approvals")?
                .len();
        }

        for decl in &self.balances {
            let account = parse_account(directory, &decl.account);
            let asset = directory.asset(&decl.asset);
            router
                .credit(&actor, account, asset, decl.amount)
                .await
                .with_context(|| format!("credit {} {}", decl.account, decl.asset))?;
            summary.balances += 1;
        }

        info!(
            adapters = summary.adapters,
            major_routes = summary.major_routes,
            minor_edges = summary.minor_edges,
            lp_entries = summary.lp_entries,
            approvals = summary.approvals,
            balances = summary.balances,
            "bootstrap applied"
        );
        Ok(summary)
    }
}
