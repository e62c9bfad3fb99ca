// Execution engine - plans exchanges and drives adapters hop by hop
// This file turns a (from, to) pair into an ordered step plan (native
// wrapping, LP enter/exit, resolved swaps) and executes it against a working ledger
//
// Numan Thabit 2025 Nov

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::errors::{AdapterError, ExchangeError, NativeAssetError};
use crate::ledger::{Account, Ledger};
use crate::metrics::STEP_LATENCY;
use crate::router::directory::NativeAssets;
use crate::router::resolver::resolve;
use crate::router::routes::{AssetId, ExecutionPlan, ProtocolId, Step};
use crate::router::tables::RoutingTables;
use crate::venues::adapter::{HopContext, SwapAdapter};

/// Build the step plan for `from -> to` against one table snapshot.
/// Callers check `from != to` and the native pairing rules first.
pub fn plan_exchange(
    tables: &RoutingTables,
    native: &NativeAssets,
    from: AssetId,
    to: AssetId,
) -> Result<ExecutionPlan, ExchangeError> {
    let mut steps = Vec::new();
    let mut src = from;
    let mut dst = to;

    if native.is_native(from) {
        let wrapped = native.wrapped.ok_or(NativeAssetError::WrappedNativeUnset)?;
        steps.push(Step::Wrap { from, to: wrapped });
        src = wrapped;
    }
    if native.is_native(to) {
        dst = native.wrapped.ok_or(NativeAssetError::WrappedNativeUnset)?;
    }

    if src != dst {
        steps.extend(plan_between(tables, src, dst)?);
    }

    if dst != to {
        steps.push(Step::Unwrap { from: dst, to });
    }
    Ok(ExecutionPlan { steps })
}

fn plan_between(tables: &RoutingTables, from: AssetId, to: AssetId) -> Result<Vec<Step>, ExchangeError> {
    if let Some(step) = direct_lp_step(tables, from, to) {
        return Ok(vec![step]);
    }
    match resolve(tables, from, to) {
        Ok(route) => Ok(route.into_iter().map(Step::Swap).collect()),
        Err(err) => match bridge_lp(tables, from, to) {
            Some(bridged) => bridged,
            None => Err(err.into()),
        },
    }
}

fn direct_lp_step(tables: &RoutingTables, from: AssetId, to: AssetId) -> Option<Step> {
    if let Some(entry) = tables.lp_entry(to).filter(|e| e.accepts(from)) {
        return Some(Step::Enter {
            lp: to,
            pool: entry.pool(),
            asset: from,
        });
    }
    if let Some(entry) = tables.lp_entry(from).filter(|e| e.accepts(to)) {
        return Some(Step::Exit {
            lp: from,
            pool: entry.pool(),
            asset: to,
        });
    }
    None
}

/// Route through an LP's underlying set when neither side resolves on its own.
/// `None` when neither side is an LP receipt asset.
fn bridge_lp(tables: &RoutingTables, from: AssetId, to: AssetId) -> Option<Result<Vec<Step>, ExchangeError>> {
    let entering = tables.lp_entry(to);
    let exiting = tables.lp_entry(from);
    if entering.is_none() && exiting.is_none() {
        return None;
    }

    if let Some(entry) = entering {
        for asset in &entry.underlying {
            if *asset == from {
                continue;
            }
            if let Ok(route) = resolve(tables, from, *asset) {
                let mut steps: Vec<Step> = route.into_iter().map(Step::Swap).collect();
                steps.push(Step::Enter {
                    lp: to,
                    pool: entry.pool(),
                    asset: *asset,
                });
                return Some(Ok(steps));
            }
        }
    }

    if let Some(entry) = exiting {
        for asset in &entry.underlying {
            if *asset == from {
                continue;
            }
            let tail = match direct_lp_step(tables, *asset, to) {
                Some(step) => Some(vec![step]),
                None => resolve(tables, *asset, to)
                    .ok()
                    .map(|route| route.into_iter().map(Step::Swap).collect()),
            };
            if let Some(tail) = tail {
                let mut steps = Vec::with_capacity(tail.len() + 1);
                steps.push(Step::Exit {
                    lp: from,
                    pool: entry.pool(),
                    asset: *asset,
                });
                steps.extend(tail);
                return Some(Ok(steps));
            }
        }
        return Some(Err(AdapterError::CantExit { lp: from, asset: to }.into()));
    }

    Some(Err(AdapterError::CantEnter { lp: to, asset: from }.into()))
}

/// Execution statistics for monitoring
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecutionStats {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub total_steps: u64,
    pub avg_execution_time_ms: Option<f64>,
    pub success_rate: f64,
}

/// Runs plans step by step. Each adapter call is bounded by `hop_timeout`.
pub struct ExecutionEngine {
    hop_timeout: Duration,
    native: NativeAssets,
    total_executions: AtomicU64,
    successful_executions: AtomicU64,
    failed_executions: AtomicU64,
    total_steps: AtomicU64,
    total_execution_time_us: AtomicU64,
}

impl ExecutionEngine {
    pub fn new(hop_timeout: Duration, native: NativeAssets) -> Self {
        Self {
            hop_timeout,
            native,
            total_executions: AtomicU64::new(0),
            successful_executions: AtomicU64::new(0),
            failed_executions: AtomicU64::new(0),
            total_steps: AtomicU64::new(0),
            total_execution_time_us: AtomicU64::new(0),
        }
    }

    pub fn native(&self) -> &NativeAssets {
        &self.native
    }

    /// Get execution statistics
    pub fn get_stats(&self) -> ExecutionStats {
        let total = self.total_executions.load(Ordering::Relaxed);
        let successful = self.successful_executions.load(Ordering::Relaxed);
        let failed = self.failed_executions.load(Ordering::Relaxed);
        let total_ms = self.total_execution_time_us.load(Ordering::Relaxed) as f64 / 1000.0;

        ExecutionStats {
            total_executions: total,
            successful_executions: successful,
            failed_executions: failed,
            total_steps: self.total_steps.load(Ordering::Relaxed),
            avg_execution_time_ms: if successful > 0 {
                Some(total_ms / successful as f64)
            } else {
                None
            },
            success_rate: if total > 0 {
                successful as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    /// Execute `plan` with `amount_in` already held by the router account on
    /// `ledger`. Returns the amount of the final step's output asset.
    #[tracing::instrument(skip_all, fields(steps = plan.len(), amount_in = %amount_in))]
    pub async fn run(
        &self,
        tables: &RoutingTables,
        ledger: &mut Ledger,
        plan: &ExecutionPlan,
        amount_in: u128,
    ) -> Result<u128, ExchangeError> {
        self.total_executions.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();

        let mut ctx = HopContext::new(ledger);
        let mut amount = amount_in;
        for (index, step) in plan.steps.iter().enumerate() {
            match self.run_step(tables, &mut ctx, step, amount).await {
                Ok(out) => {
                    debug!(index, step = step.label(), amount_in = amount, amount_out = out, "step done");
                    amount = out;
                }
                Err(err) => {
                    self.failed_executions.fetch_add(1, Ordering::Relaxed);
                    warn!(index, step = step.label(), error = %err, "step failed");
                    return Err(err);
                }
            }
        }

        self.successful_executions.fetch_add(1, Ordering::Relaxed);
        self.total_steps
            .fetch_add(plan.len() as u64, Ordering::Relaxed);
        self.total_execution_time_us
            .fetch_add(started.elapsed().as_micros() as u64, Ordering::Relaxed);
        Ok(amount)
    }

    async fn run_step(
        &self,
        tables: &RoutingTables,
        ctx: &mut HopContext<'_>,
        step: &Step,
        amount: u128,
    ) -> Result<u128, ExchangeError> {
        match step {
            Step::Wrap { from, to } => {
                let native = self.native.custody_asset(*from);
                ctx.ledger().burn(&Account::Router, native, amount)?;
                ctx.ledger().mint(&Account::Router, *to, amount)?;
                Ok(amount)
            }
            Step::Unwrap { from, to } => {
                let native = self.native.custody_asset(*to);
                ctx.ledger().burn(&Account::Router, *from, amount)?;
                ctx.ledger().mint(&Account::Router, native, amount)?;
                Ok(amount)
            }
            Step::Swap(edge) => {
                let adapter = lookup(tables, edge.protocol)?;
                let call = adapter.swap(ctx, edge.venue, edge.from, edge.to, amount);
                self.bounded(edge.protocol, "swap", call).await
            }
            Step::Enter { lp, pool, asset } => {
                let adapter = lookup(tables, pool.protocol)?;
                let call = adapter.enter(ctx, pool.venue, *lp, *asset, amount);
                self.bounded(pool.protocol, "enter", call).await
            }
            Step::Exit { lp, pool, asset } => {
                let adapter = lookup(tables, pool.protocol)?;
                let call = adapter.exit(ctx, pool.venue, *lp, *asset, amount);
                self.bounded(pool.protocol, "exit", call).await
            }
        }
    }

    async fn bounded<F>(&self, protocol: ProtocolId, step: &str, call: F) -> Result<u128, ExchangeError>
    where
        F: std::future::Future<Output = Result<u128, AdapterError>>,
    {
        let started = Instant::now();
        let result = tokio::time::timeout(self.hop_timeout, call).await;
        STEP_LATENCY
            .with_label_values(&[&protocol.to_string(), step])
            .observe(started.elapsed().as_secs_f64());

        let out = result.map_err(|_| AdapterError::Timeout { protocol })??;
        if out == 0 {
            return Err(AdapterError::Venue(format!("protocol {protocol} returned zero output")).into());
        }
        Ok(out)
    }
}

fn lookup(tables: &RoutingTables, protocol: ProtocolId) -> Result<&dyn SwapAdapter, AdapterError> {
    tables
        .adapter(protocol)
        .map(|adapter| adapter.as_ref())
        .ok_or(AdapterError::AdapterNotFound(protocol))
}
