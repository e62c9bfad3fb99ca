// Router HTTP API implementation
// This file provides HTTP endpoints for exchanges, route queries and the
// administrative table operations. Callers authenticate with a bearer token;
// only admin mutations intern new labels into the Directory.
//
// Numan Thabit 2025 Nov

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::Json,
    routing::{get, post},
    Router as AxumRouter,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{Directory, ExchangeRequest, ExecutionStats, Router};
use crate::control::Credentials;
use crate::errors::ExchangeError;
use crate::ledger::Account;
use crate::metrics;
use crate::router::routes::{AssetId, Edge, PoolRef, ProtocolId, Route, Step, VenueId};
use crate::router::tables::TableCounts;
use crate::venues::adapter::AdapterSpec;

#[derive(Clone)]
pub struct ApiState {
    pub router: Arc<Router>,
    pub directory: Arc<RwLock<Directory>>,
    pub credentials: Arc<Credentials>,
}

impl ApiState {
    pub fn new(router: Arc<Router>, directory: Directory, credentials: Credentials) -> Self {
        Self {
            router,
            directory: Arc::new(RwLock::new(directory)),
            credentials: Arc::new(credentials),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn status_for(err: &ExchangeError) -> StatusCode {
    match err {
        ExchangeError::Validation(_) | ExchangeError::Native(_) => StatusCode::BAD_REQUEST,
        ExchangeError::Unauthorized(_) => StatusCode::FORBIDDEN,
        ExchangeError::Resolution(_) => StatusCode::NOT_FOUND,
        ExchangeError::Slippage { .. } => StatusCode::CONFLICT,
        ExchangeError::Ledger(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ExchangeError::Adapter(_) => StatusCode::BAD_GATEWAY,
        ExchangeError::AdmissionClosed => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn api_error(err: ExchangeError) -> ApiError {
    (
        status_for(&err),
        Json(ErrorResponse {
            error: err.to_string(),
            kind: err.kind().to_string(),
        }),
    )
}

fn not_found(what: String) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: what,
            kind: "not_found".to_string(),
        }),
    )
}

/// Actor authenticated by the request's bearer token.
pub struct Caller(pub String);

#[async_trait]
impl FromRequestParts<ApiState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ApiState) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(|token| state.credentials.actor_for(token.trim()));
        match actor {
            Some(actor) => Ok(Caller(actor.to_string())),
            None => Err(api_error(ExchangeError::Unauthorized("anonymous".to_string()))),
        }
    }
}

/// Authenticated caller that is also on the admin access list.
pub struct Admin(pub String);

#[async_trait]
impl FromRequestParts<ApiState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ApiState) -> Result<Self, Self::Rejection> {
        let Caller(actor) = Caller::from_request_parts(parts, state).await?;
        state.router.access().authorize(&actor).map_err(api_error)?;
        Ok(Admin(actor))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeBody {
    pub protocol: u32,
    pub venue: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolBody {
    pub protocol: u32,
    pub venue: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub step: &'static str,
    pub protocol: Option<ProtocolId>,
    pub venue: Option<String>,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LpView {
    pub protocol: ProtocolId,
    pub venue: String,
    pub underlying: Vec<String>,
}

fn asset_name(dir: &Directory, id: AssetId) -> String {
    dir.asset_label(id)
        .map(str::to_string)
        .unwrap_or_else(|| id.to_string())
}

fn venue_name(dir: &Directory, id: VenueId) -> String {
    dir.venue_label(id)
        .map(str::to_string)
        .unwrap_or_else(|| id.to_string())
}

fn edge_body(dir: &Directory, edge: &Edge) -> EdgeBody {
    EdgeBody {
        protocol: edge.protocol.0,
        venue: venue_name(dir, edge.venue),
        from: asset_name(dir, edge.from),
        to: asset_name(dir, edge.to),
    }
}

fn step_view(dir: &Directory, step: &Step) -> StepView {
    let pool = step.pool();
    StepView {
        step: step.label(),
        protocol: pool.map(|p| p.protocol),
        venue: pool.map(|p| venue_name(dir, p.venue)),
        from: asset_name(dir, step.input()),
        to: asset_name(dir, step.output()),
    }
}

pub(crate) fn intern_edge(dir: &mut Directory, body: &EdgeBody) -> Edge {
    dir.edge(body.protocol, &body.venue, &body.from, &body.to)
}

pub(crate) fn parse_account(dir: &mut Directory, label: &str) -> Account {
    if label == "router" {
        Account::Router
    } else if let Some(venue) = label.strip_prefix("venue:") {
        Account::Venue(dir.venue(venue))
    } else {
        Account::wallet(label.strip_prefix("wallet:").unwrap_or(label))
    }
}

/// Like `parse_account`, but an unknown venue yields `None`.
pub(crate) fn find_account(dir: &Directory, label: &str) -> Option<Account> {
    if label == "router" {
        Some(Account::Router)
    } else if let Some(venue) = label.strip_prefix("venue:") {
        dir.find_venue(venue).map(Account::Venue)
    } else {
        Some(Account::wallet(label.strip_prefix("wallet:").unwrap_or(label)))
    }
}

/// Create the HTTP router with API endpoints
pub fn create_api_router(state: ApiState) -> AxumRouter {
    AxumRouter::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_text))
        .route("/api/v1/stats", get(get_stats))
        .route("/api/v1/exchange", post(exchange))
        .route("/api/v1/route", get(build_route))
        .route("/api/v1/major-route", get(major_route))
        .route("/api/v1/assets/:asset", get(asset_info))
        .route("/api/v1/adapters/:protocol", get(adapter_info))
        .route("/api/v1/allowance", get(allowance))
        .route("/api/v1/balance", get(balance))
        .route("/api/v1/admin/major-routes", post(create_major_routes))
        .route("/api/v1/admin/major-routes/delete", post(delete_major_routes))
        .route("/api/v1/admin/minor-edges", post(create_minor_edges))
        .route("/api/v1/admin/minor-edges/delete", post(delete_minor_edges))
        .route("/api/v1/admin/lp-entries", post(create_lp_entries))
        .route("/api/v1/admin/lp-entries/delete", post(delete_lp_entries))
        .route("/api/v1/admin/adapters", post(register_adapters))
        .route("/api/v1/admin/adapters/delete", post(unregister_adapters))
        .route("/api/v1/admin/allowances/grant", post(grant_allowance))
        .route("/api/v1/admin/allowances/revoke", post(revoke_allowance))
        .route("/api/v1/admin/balances", post(credit_balance))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> StatusCode {
    StatusCode::OK
}

async fn metrics_text() -> String {
    metrics::render()
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub execution: ExecutionStats,
    pub tables: TableCounts,
}

async fn get_stats(State(state): State<ApiState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        execution: state.router.executor().get_stats(),
        tables: state.router.counts().await,
    })
}

#[derive(Debug, Deserialize)]
pub struct ExchangeBody {
    pub from: String,
    pub to: String,
    pub amount_in: u128,
    pub min_amount_out: u128,
    #[serde(default)]
    pub attached_native: u128,
}

#[derive(Debug, Serialize)]
pub struct ExchangeResponse {
    pub amount_out: u128,
    pub steps: Vec<StepView>,
}

/// Exchange endpoint - resolves, executes and settles for the authenticated caller
async fn exchange(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Json(body): Json<ExchangeBody>,
) -> ApiResult<ExchangeResponse> {
    let (from, to) = state.directory.read().await.lookup_pair(&body.from, &body.to);
    let receipt = state
        .router
        .exchange(ExchangeRequest {
            caller,
            from,
            to,
            amount_in: body.amount_in,
            min_amount_out: body.min_amount_out,
            attached_native: body.attached_native,
        })
        .await
        .map_err(api_error)?;

    let dir = state.directory.read().await;
    Ok(Json(ExchangeResponse {
        amount_out: receipt.amount_out,
        steps: receipt.steps.iter().map(|s| step_view(&dir, s)).collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct PairQuery {
    pub from: String,
    pub to: String,
}

async fn build_route(
    State(state): State<ApiState>,
    Query(q): Query<PairQuery>,
) -> ApiResult<Vec<EdgeBody>> {
    let (from, to) = state.directory.read().await.lookup_pair(&q.from, &q.to);
    let route = state
        .router
        .build_route(from, to)
        .await
        .map_err(|e| api_error(e.into()))?;
    let dir = state.directory.read().await;
    Ok(Json(route.iter().map(|e| edge_body(&dir, e)).collect()))
}

async fn major_route(
    State(state): State<ApiState>,
    Query(q): Query<PairQuery>,
) -> ApiResult<Vec<EdgeBody>> {
    let dir = state.directory.read().await;
    let (Some(from), Some(to)) = (dir.find_asset(&q.from), dir.find_asset(&q.to)) else {
        return Err(not_found(format!("no major route {} -> {}", q.from, q.to)));
    };
    match state.router.major_route(from, to).await {
        Some(route) => Ok(Json(route.iter().map(|e| edge_body(&dir, e)).collect())),
        None => Err(not_found(format!("no major route {} -> {}", q.from, q.to))),
    }
}

#[derive(Debug, Serialize)]
pub struct AssetResponse {
    pub asset: String,
    pub major: bool,
    pub native: bool,
    pub minor_edge: Option<EdgeBody>,
    pub lp_entry: Option<LpView>,
}

async fn asset_info(
    State(state): State<ApiState>,
    Path(label): Path<String>,
) -> ApiResult<AssetResponse> {
    let dir = state.directory.read().await;
    let Some(asset) = dir.find_asset(&label) else {
        return Err(not_found(format!("unknown asset {label}")));
    };
    let minor_edge = state.router.minor_edge_of(asset).await;
    let lp_entry = state.router.lp_entry_of(asset).await;
    Ok(Json(AssetResponse {
        asset: asset_name(&dir, asset),
        major: state.router.is_major_asset(asset).await,
        native: state.router.native().is_native(asset),
        minor_edge: minor_edge.map(|e| edge_body(&dir, &e)),
        lp_entry: lp_entry.map(|lp| LpView {
            protocol: lp.protocol,
            venue: venue_name(&dir, lp.venue),
            underlying: lp.underlying.iter().map(|a| asset_name(&dir, *a)).collect(),
        }),
    }))
}

#[derive(Debug, Serialize)]
pub struct AdapterResponse {
    pub protocol: ProtocolId,
    pub name: String,
}

async fn adapter_info(
    State(state): State<ApiState>,
    Path(protocol): Path<u32>,
) -> ApiResult<AdapterResponse> {
    let protocol = ProtocolId(protocol);
    match state.router.adapter_of(protocol).await {
        Some(adapter) => Ok(Json(AdapterResponse {
            protocol,
            name: adapter.name().to_string(),
        })),
        None => Err(not_found(format!("no adapter for protocol {protocol}"))),
    }
}

#[derive(Debug, Deserialize)]
pub struct AllowanceQuery {
    pub venue: String,
    pub asset: String,
}

#[derive(Debug, Serialize)]
pub struct AllowanceResponse {
    pub granted: bool,
    pub amount: u128,
}

async fn allowance(
    State(state): State<ApiState>,
    Query(q): Query<AllowanceQuery>,
) -> Json<AllowanceResponse> {
    let ids = {
        let dir = state.directory.read().await;
        dir.find_venue(&q.venue).zip(dir.find_asset(&q.asset))
    };
    match ids {
        Some((venue, asset)) => Json(AllowanceResponse {
            granted: state.router.allowance_granted(venue, asset).await,
            amount: state.router.allowance_of(venue, asset).await,
        }),
        None => Json(AllowanceResponse {
            granted: false,
            amount: 0,
        }),
    }
}

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub account: String,
    pub asset: String,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub account: String,
    pub asset: String,
    pub balance: u128,
}

async fn balance(
    State(state): State<ApiState>,
    Query(q): Query<BalanceQuery>,
) -> Json<BalanceResponse> {
    let ids = {
        let dir = state.directory.read().await;
        find_account(&dir, &q.account).zip(dir.find_asset(&q.asset))
    };
    let balance = match ids {
        Some((account, asset)) => state.router.balance_of(&account, asset).await,
        None => 0,
    };
    Json(BalanceResponse {
        account: q.account,
        asset: q.asset,
        balance,
    })
}

#[derive(Debug, Serialize)]
pub struct AppliedResponse {
    pub applied: usize,
}

#[derive(Debug, Deserialize)]
pub struct MajorRoutesBody {
    pub routes: Vec<Vec<EdgeBody>>,
}

async fn create_major_routes(
    State(state): State<ApiState>,
    Admin(actor): Admin,
    Json(body): Json<MajorRoutesBody>,
) -> ApiResult<AppliedResponse> {
    let routes: Vec<Route> = {
        let mut dir = state.directory.write().await;
        body.routes
            .iter()
            .map(|route| route.iter().map(|e| intern_edge(&mut dir, e)).collect())
            .collect()
    };
    let applied = routes.len();
    state
        .router
        .create_major_routes(&actor, routes)
        .await
        .map_err(api_error)?;
    Ok(Json(AppliedResponse { applied }))
}

#[derive(Debug, Deserialize)]
pub struct DeleteMajorRoutesBody {
    pub pairs: Vec<PairQuery>,
    #[serde(default)]
    pub unmark_major: bool,
}

async fn delete_major_routes(
    State(state): State<ApiState>,
    Admin(actor): Admin,
    Json(body): Json<DeleteMajorRoutesBody>,
) -> ApiResult<AppliedResponse> {
    let pairs = {
        let mut dir = state.directory.write().await;
        body.pairs
            .iter()
            .map(|p| (dir.asset(&p.from), dir.asset(&p.to)))
            .collect()
    };
    let removed = state
        .router
        .delete_major_routes(&actor, pairs, body.unmark_major)
        .await
        .map_err(api_error)?;
    Ok(Json(AppliedResponse {
        applied: removed.len(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct MinorEdgesBody {
    pub edges: Vec<EdgeBody>,
}

async fn create_minor_edges(
    State(state): State<ApiState>,
    Admin(actor): Admin,
    Json(body): Json<MinorEdgesBody>,
) -> ApiResult<AppliedResponse> {
    let edges: Vec<Edge> = {
        let mut dir = state.directory.write().await;
        body.edges.iter().map(|e| intern_edge(&mut dir, e)).collect()
    };
    let applied = edges.len();
    state
        .router
        .create_minor_edges(&actor, edges)
        .await
        .map_err(api_error)?;
    Ok(Json(AppliedResponse { applied }))
}

#[derive(Debug, Deserialize)]
pub struct AssetsBody {
    pub assets: Vec<String>,
}

async fn interned_assets(state: &ApiState, labels: &[String]) -> Vec<AssetId> {
    let mut dir = state.directory.write().await;
    labels.iter().map(|label| dir.asset(label)).collect()
}

async fn delete_minor_edges(
    State(state): State<ApiState>,
    Admin(actor): Admin,
    Json(body): Json<AssetsBody>,
) -> ApiResult<AppliedResponse> {
    let assets = interned_assets(&state, &body.assets).await;
    let removed = state
        .router
        .delete_minor_edges(&actor, assets)
        .await
        .map_err(api_error)?;
    Ok(Json(AppliedResponse {
        applied: removed.len(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct LpEntriesBody {
    pub lps: Vec<String>,
    pub pools: Vec<PoolBody>,
    pub underlying: Vec<Vec<String>>,
}

async fn create_lp_entries(
    State(state): State<ApiState>,
    Admin(actor): Admin,
    Json(body): Json<LpEntriesBody>,
) -> ApiResult<AppliedResponse> {
    let (lps, pools, underlying) = {
        let mut dir = state.directory.write().await;
        let lps: Vec<_> = body.lps.iter().map(|l| dir.asset(l)).collect();
        let pools: Vec<_> = body
            .pools
            .iter()
            .map(|p| PoolRef {
                protocol: ProtocolId(p.protocol),
                venue: dir.venue(&p.venue),
            })
            .collect();
        let underlying: Vec<Vec<_>> = body
            .underlying
            .iter()
            .map(|set| set.iter().map(|a| dir.asset(a)).collect())
            .collect();
        (lps, pools, underlying)
    };
    let applied = lps.len();
    state
        .router
        .create_lp_entries(&actor, lps, pools, underlying)
        .await
        .map_err(api_error)?;
    Ok(Json(AppliedResponse { applied }))
}

async fn delete_lp_entries(
    State(state): State<ApiState>,
    Admin(actor): Admin,
    Json(body): Json<AssetsBody>,
) -> ApiResult<AppliedResponse> {
    let assets = interned_assets(&state, &body.assets).await;
    let removed = state
        .router
        .delete_lp_entries(&actor, assets)
        .await
        .map_err(api_error)?;
    Ok(Json(AppliedResponse {
        applied: removed.len(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct AdaptersBody {
    pub protocols: Vec<u32>,
    pub adapters: Vec<AdapterSpec>,
}

async fn register_adapters(
    State(state): State<ApiState>,
    Admin(actor): Admin,
    Json(body): Json<AdaptersBody>,
) -> ApiResult<AppliedResponse> {
    let protocols: Vec<_> = body.protocols.into_iter().map(ProtocolId).collect();
    let handles = body.adapters.iter().map(AdapterSpec::build).collect();
    let applied = protocols.len();
    state
        .router
        .register_adapters(&actor, protocols, handles)
        .await
        .map_err(api_error)?;
    Ok(Json(AppliedResponse { applied }))
}

#[derive(Debug, Deserialize)]
pub struct ProtocolsBody {
    pub protocols: Vec<u32>,
}

async fn unregister_adapters(
    State(state): State<ApiState>,
    Admin(actor): Admin,
    Json(body): Json<ProtocolsBody>,
) -> ApiResult<AppliedResponse> {
    let protocols = body.protocols.into_iter().map(ProtocolId).collect();
    let removed = state
        .router
        .unregister_adapters(&actor, protocols)
        .await
        .map_err(api_error)?;
    Ok(Json(AppliedResponse {
        applied: removed.len(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct AllowancesBody {
    pub venues: Vec<String>,
    pub assets: Vec<String>,
}

async fn allowance_ids(state: &ApiState, body: &AllowancesBody) -> (Vec<VenueId>, Vec<AssetId>) {
    let mut dir = state.directory.write().await;
    let venues = body.venues.iter().map(|v| dir.venue(v)).collect();
    let assets = body.assets.iter().map(|a| dir.asset(a)).collect();
    (venues, assets)
}

async fn grant_allowance(
    State(state): State<ApiState>,
    Admin(actor): Admin,
    Json(body): Json<AllowancesBody>,
) -> ApiResult<AppliedResponse> {
    let (venues, assets) = allowance_ids(&state, &body).await;
    let granted = state
        .router
        .grant_allowance(&actor, venues, assets)
        .await
        .map_err(api_error)?;
    Ok(Json(AppliedResponse {
        applied: granted.len(),
    }))
}

async fn revoke_allowance(
    State(state): State<ApiState>,
    Admin(actor): Admin,
    Json(body): Json<AllowancesBody>,
) -> ApiResult<AppliedResponse> {
    let (venues, assets) = allowance_ids(&state, &body).await;
    let revoked = state
        .router
        .revoke_allowance(&actor, venues, assets)
        .await
        .map_err(api_error)?;
    Ok(Json(AppliedResponse {
        applied: revoked.len(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreditBody {
    pub account: String,
    pub asset: String,
    pub amount: u128,
}

async fn credit_balance(
    State(state): State<ApiState>,
    Admin(actor): Admin,
    Json(body): Json<CreditBody>,
) -> ApiResult<AppliedResponse> {
    let (account, asset) = {
        let mut dir = state.directory.write().await;
        (parse_account(&mut dir, &body.account), dir.asset(&body.asset))
    };
    state
        .router
        .credit(&actor, account, asset, body.amount)
        .await
        .map_err(api_error)?;
    Ok(Json(AppliedResponse { applied: 1 }))
}
