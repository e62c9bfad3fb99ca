// Router - exchange orchestration and table administration
// This file ties the routing tables, the planner, the execution engine and
// the ledger together behind the exchange and admin operations
//
// Numan Thabit 2025 Nov

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{info, warn};

use crate::control::{AccessList, AdmissionControl};
use crate::errors::{ExchangeError, NativeAssetError, ResolutionError, ValidationError};
use crate::events::{EventBus, RouterEvent, TableKind};
use crate::ledger::{Account, Ledger, UNLIMITED};
use crate::metrics::{ADMIN_OPS, EXCHANGES_TOTAL, RESOLUTION_FAILURES};
use crate::router::directory::NativeAssets;
use crate::router::execution::{plan_exchange, ExecutionEngine};
use crate::router::resolver::resolve;
use crate::router::routes::{AssetId, Edge, LpEntry, PoolRef, ProtocolId, Route, Step, VenueId};
use crate::router::tables::{AllowancePair, RoutingTables, TableCounts};
use crate::venues::adapter::SwapAdapter;

#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub hop_timeout: Duration,
    pub max_inflight: usize,
    pub rate_per_sec: Option<u32>,
    pub event_buffer: usize,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            hop_timeout: Duration::from_secs(5),
            max_inflight: 64,
            rate_per_sec: None,
            event_buffer: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExchangeRequest {
    pub caller: String,
    pub from: AssetId,
    pub to: AssetId,
    pub amount_in: u128,
    pub min_amount_out: u128,
    /// Native value sent along with the call.
    #[serde(default)]
    pub attached_native: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeReceipt {
    pub amount_out: u128,
    pub steps: Vec<Step>,
}

/// Result of one table edit, before it is published.
struct Change<T> {
    value: T,
    granted: Vec<AllowancePair>,
    revoked: Vec<AllowancePair>,
    table: Option<(TableKind, usize, usize)>,
}

impl<T> Change<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            granted: Vec::new(),
            revoked: Vec::new(),
            table: None,
        }
    }

    fn granted(mut self, granted: Vec<AllowancePair>) -> Self {
        self.granted = granted;
        self
    }

    fn revoked(mut self, revoked: Vec<AllowancePair>) -> Self {
        self.revoked = revoked;
        self
    }

    fn table(mut self, table: TableKind, created: usize, deleted: usize) -> Self {
        self.table = Some((table, created, deleted));
        self
    }
}

/// Exchange router. Tables are swapped copy-on-write so readers always see a
/// whole snapshot; exchanges run against a working copy of the ledger.
pub struct Router {
    tables: RwLock<Arc<RoutingTables>>,
    admin: Mutex<()>,
    ledger: Mutex<Ledger>,
    executor: Arc<ExecutionEngine>,
    access: AccessList,
    admission: AdmissionControl,
    events: EventBus,
}

impl Router {
    pub fn new(settings: RouterSettings, native: NativeAssets, access: AccessList) -> Self {
        Self {
            tables: RwLock::new(Arc::new(RoutingTables::new())),
            admin: Mutex::new(()),
            ledger: Mutex::new(Ledger::new()),
            executor: Arc::new(ExecutionEngine::new(settings.hop_timeout, native)),
            access,
            admission: AdmissionControl::new(settings.max_inflight, settings.rate_per_sec),
            events: EventBus::new(settings.event_buffer),
        }
    }

    /// Get access to the execution engine (for stats)
    pub fn executor(&self) -> &Arc<ExecutionEngine> {
        &self.executor
    }

    pub fn native(&self) -> &NativeAssets {
        self.executor.native()
    }

    pub fn access(&self) -> &AccessList {
        &self.access
    }

    /// Refuse new exchanges; ones already running finish normally.
    pub fn shutdown(&self) {
        self.admission.close();
        info!("router stopped admitting exchanges");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> Arc<RoutingTables> {
        self.tables.read().await.clone()
    }

    /// Exchange `amount_in` of `from` held by the caller for at least
    /// `min_amount_out` of `to`. Any failure leaves every balance unchanged.
    #[tracing::instrument(skip_all, fields(caller = %req.caller, from = %req.from, to = %req.to))]
    pub async fn exchange(&self, req: ExchangeRequest) -> Result<ExchangeReceipt, ExchangeError> {
        let result = self.exchange_inner(&req).await;
        match &result {
            Ok(receipt) => {
                EXCHANGES_TOTAL.with_label_values(&["ok"]).inc();
                info!(amount_in = %req.amount_in, amount_out = %receipt.amount_out, steps = receipt.steps.len(), "exchange executed");
                self.events.publish(RouterEvent::Exchanged {
                    caller: req.caller.clone(),
                    from: req.from,
                    to: req.to,
                    amount_in: req.amount_in,
                    amount_out: receipt.amount_out,
                });
            }
            Err(err) => {
                EXCHANGES_TOTAL.with_label_values(&[err.kind()]).inc();
                if let ExchangeError::Resolution(res) = err {
                    record_resolution_failure(res);
                }
                warn!(error = %err, kind = err.kind(), "exchange failed");
            }
        }
        result
    }

    async fn exchange_inner(&self, req: &ExchangeRequest) -> Result<ExchangeReceipt, ExchangeError> {
        let _permit = self.admission.acquire().await?;
        let native = self.native();
        check_native(native, req)?;

        let tables = self.snapshot().await;
        let plan = plan_exchange(&tables, native, req.from, req.to)?;

        let caller = Account::wallet(req.caller.as_str());
        let mut ledger = self.ledger.lock().await;
        let mut working = ledger.clone();

        working.transfer(&caller, &Account::Router, native.custody_asset(req.from), req.amount_in)?;
        let amount_out = self
            .executor
            .run(&tables, &mut working, &plan, req.amount_in)
            .await?;
        if amount_out < req.min_amount_out {
            return Err(ExchangeError::Slippage {
                min: req.min_amount_out,
                actual: amount_out,
            });
        }
        working.transfer(&Account::Router, &caller, native.custody_asset(req.to), amount_out)?;

        *ledger = working;
        Ok(ExchangeReceipt {
            amount_out,
            steps: plan.steps,
        })
    }

    /// Resolve `from -> to` against the current tables without executing.
    pub async fn build_route(&self, from: AssetId, to: AssetId) -> Result<Route, ResolutionError> {
        let tables = self.snapshot().await;
        resolve(&tables, from, to).map_err(|err| {
            record_resolution_failure(&err);
            err
        })
    }

    pub async fn is_major_asset(&self, asset: AssetId) -> bool {
        self.snapshot().await.is_major(asset)
    }

    pub async fn major_route(&self, from: AssetId, to: AssetId) -> Option<Route> {
        self.snapshot().await.major_route(from, to).cloned()
    }

    pub async fn minor_edge_of(&self, asset: AssetId) -> Option<Edge> {
        self.snapshot().await.minor_edge(asset).copied()
    }

    pub async fn lp_entry_of(&self, asset: AssetId) -> Option<LpEntry> {
        self.snapshot().await.lp_entry(asset).cloned()
    }

    pub async fn adapter_of(&self, protocol: ProtocolId) -> Option<Arc<dyn SwapAdapter>> {
        self.snapshot().await.adapter(protocol).cloned()
    }

    pub async fn allowance_granted(&self, venue: VenueId, asset: AssetId) -> bool {
        self.snapshot().await.allowance_granted(venue, asset)
    }

    pub async fn counts(&self) -> TableCounts {
        self.snapshot().await.counts()
    }

    pub async fn balance_of(&self, account: &Account, asset: AssetId) -> u128 {
        let asset = self.native().custody_asset(asset);
        self.ledger.lock().await.balance_of(account, asset)
    }

    pub async fn allowance_of(&self, venue: VenueId, asset: AssetId) -> u128 {
        self.ledger
            .lock()
            .await
            .allowance(&Account::Router, &Account::Venue(venue), asset)
    }

    /// Seed balances (venue reserves, wallet funds). Admin only.
    pub async fn credit(
        &self,
        actor: &str,
        account: Account,
        asset: AssetId,
        amount: u128,
    ) -> Result<(), ExchangeError> {
        self.access.authorize(actor)?;
        let asset = self.native().custody_asset(asset);
        self.ledger.lock().await.mint(&account, asset, amount)?;
        info!(%actor, %account, %asset, %amount, "balance credited");
        Ok(())
    }

    pub async fn create_major_routes(&self, actor: &str, routes: Vec<Route>) -> Result<(), ExchangeError> {
        self.apply(actor, "create_major_routes", |tables| {
            let created = routes.len();
            let granted = tables.create_major_routes(routes)?;
            Ok(Change::new(())
                .granted(granted)
                .table(TableKind::MajorRoutes, created, 0))
        })
        .await
    }

    pub async fn delete_major_routes(
        &self,
        actor: &str,
        pairs: Vec<(AssetId, AssetId)>,
        unmark_major: bool,
    ) -> Result<Vec<(AssetId, AssetId)>, ExchangeError> {
        self.apply(actor, "delete_major_routes", |tables| {
            let removed = tables.delete_major_routes(&pairs, unmark_major);
            let deleted = removed.len();
            Ok(Change::new(removed).table(TableKind::MajorRoutes, 0, deleted))
        })
        .await
    }

    pub async fn create_minor_edges(&self, actor: &str, edges: Vec<Edge>) -> Result<(), ExchangeError> {
        self.apply(actor, "create_minor_edges", |tables| {
            let created = edges.len();
            let granted = tables.create_minor_edges(edges)?;
            Ok(Change::new(())
                .granted(granted)
                .table(TableKind::MinorEdges, created, 0))
        })
        .await
    }

    pub async fn delete_minor_edges(
        &self,
        actor: &str,
        assets: Vec<AssetId>,
    ) -> Result<Vec<AssetId>, ExchangeError> {
        self.apply(actor, "delete_minor_edges", |tables| {
            let removed = tables.delete_minor_edges(&assets);
            let deleted = removed.len();
            Ok(Change::new(removed).table(TableKind::MinorEdges, 0, deleted))
        })
        .await
    }

    pub async fn create_lp_entries(
        &self,
        actor: &str,
        lps: Vec<AssetId>,
        pools: Vec<PoolRef>,
        underlying: Vec<Vec<AssetId>>,
    ) -> Result<(), ExchangeError> {
        self.apply(actor, "create_lp_entries", |tables| {
            let created = lps.len();
            let granted = tables.create_lp_entries(lps, pools, underlying)?;
            Ok(Change::new(())
                .granted(granted)
                .table(TableKind::LpEntries, created, 0))
        })
        .await
    }

    pub async fn delete_lp_entries(
        &self,
        actor: &str,
        assets: Vec<AssetId>,
    ) -> Result<Vec<AssetId>, ExchangeError> {
        self.apply(actor, "delete_lp_entries", |tables| {
            let removed = tables.delete_lp_entries(&assets);
            let deleted = removed.len();
            Ok(Change::new(removed).table(TableKind::LpEntries, 0, deleted))
        })
        .await
    }

    pub async fn register_adapters(
        &self,
        actor: &str,
        protocols: Vec<ProtocolId>,
        handles: Vec<Arc<dyn SwapAdapter>>,
    ) -> Result<(), ExchangeError> {
        self.apply(actor, "register_adapters", |tables| {
            let created = protocols.len();
            tables.register_adapters(protocols, handles)?;
            Ok(Change::new(()).table(TableKind::Adapters, created, 0))
        })
        .await
    }

    pub async fn unregister_adapters(
        &self,
        actor: &str,
        protocols: Vec<ProtocolId>,
    ) -> Result<Vec<ProtocolId>, ExchangeError> {
        self.apply(actor, "unregister_adapters", |tables| {
            let removed = tables.unregister_adapters(&protocols);
            let deleted = removed.len();
            Ok(Change::new(removed).table(TableKind::Adapters, 0, deleted))
        })
        .await
    }

    /// Approve venues to pull assets from the router, beyond what table
    /// registration approves on its own.
    pub async fn grant_allowance(
        &self,
        actor: &str,
        venues: Vec<VenueId>,
        assets: Vec<AssetId>,
    ) -> Result<Vec<AllowancePair>, ExchangeError> {
        self.apply(actor, "grant_allowance", |tables| {
            let granted = tables.grant_allowances(&venues, &assets)?;
            Ok(Change::new(granted.clone()).granted(granted))
        })
        .await
    }

    pub async fn revoke_allowance(
        &self,
        actor: &str,
        venues: Vec<VenueId>,
        assets: Vec<AssetId>,
    ) -> Result<Vec<AllowancePair>, ExchangeError> {
        self.apply(actor, "revoke_allowance", |tables| {
            let revoked = tables.revoke_allowances(&venues, &assets)?;
            Ok(Change::new(revoked.clone()).revoked(revoked))
        })
        .await
    }

    async fn apply<T, F>(&self, actor: &str, operation: &'static str, edit: F) -> Result<T, ExchangeError>
    where
        F: FnOnce(&mut RoutingTables) -> Result<Change<T>, ValidationError>,
    {
        let result = self.apply_inner(actor, operation, edit).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(err) => err.kind(),
        };
        ADMIN_OPS.with_label_values(&[operation, outcome]).inc();
        if let Err(err) = &result {
            warn!(%actor, operation, error = %err, "admin operation rejected");
        }
        result
    }

    async fn apply_inner<T, F>(&self, actor: &str, operation: &'static str, edit: F) -> Result<T, ExchangeError>
    where
        F: FnOnce(&mut RoutingTables) -> Result<Change<T>, ValidationError>,
    {
        self.access.authorize(actor)?;
        let _admin = self.admin.lock().await;

        let mut next = RoutingTables::clone(&*self.snapshot().await);
        let change = edit(&mut next)?;

        if !change.granted.is_empty() || !change.revoked.is_empty() {
            let mut ledger = self.ledger.lock().await;
            for (venue, asset) in &change.granted {
                ledger.approve(&Account::Router, &Account::Venue(*venue), *asset, UNLIMITED);
            }
            for (venue, asset) in &change.revoked {
                ledger.approve(&Account::Router, &Account::Venue(*venue), *asset, 0);
            }
        }
        *self.tables.write().await = Arc::new(next);

        let granted = change
            .granted
            .iter()
            .map(|(venue, asset)| RouterEvent::AllowanceGranted {
                venue: *venue,
                asset: *asset,
            });
        let revoked = change
            .revoked
            .iter()
            .map(|(venue, asset)| RouterEvent::AllowanceRevoked {
                venue: *venue,
                asset: *asset,
            });
        let table = change
            .table
            .map(|(table, created, deleted)| RouterEvent::TablesChanged {
                table,
                created,
                deleted,
            });
        self.events.publish_all(granted.chain(revoked).chain(table));

        info!(
            %actor,
            operation,
            granted = change.granted.len(),
            revoked = change.revoked.len(),
            "admin operation applied"
        );
        Ok(change.value)
    }
}

fn check_native(native: &NativeAssets, req: &ExchangeRequest) -> Result<(), NativeAssetError> {
    if req.from == req.to {
        return Err(NativeAssetError::SameAsset);
    }
    let from_native = native.is_native(req.from);
    if from_native && native.is_native(req.to) {
        return Err(NativeAssetError::NativeToNative);
    }
    let expected = if from_native { req.amount_in } else { 0 };
    if req.attached_native != expected {
        return Err(NativeAssetError::ValueMismatch {
            attached: req.attached_native,
            amount: req.amount_in,
        });
    }
    Ok(())
}

fn record_resolution_failure(err: &ResolutionError) {
    RESOLUTION_FAILURES
        .with_label_values(&[&err.case().number().to_string(), err.missing()])
        .inc();
}
