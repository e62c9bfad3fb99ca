#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use exchange_router::control::AccessList;
use exchange_router::ledger::Account;
use exchange_router::router::{AssetId, Directory, Edge, PoolRef, ProtocolId, Router, RouterSettings, VenueId};
use exchange_router::venues::{ConstantProductAdapter, StablePoolAdapter, SwapAdapter};

pub const ADMIN: &str = "ops";
pub const ALICE: &str = "alice";
pub const ZERO: &str = "0x0000000000000000000000000000000000000000";
pub const EEEE: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";

/// Pool depth on both sides of every seeded venue.
pub const DEEP: u128 = 1_000_000_000;

pub const CP: ProtocolId = ProtocolId(1);
pub const STABLE: ProtocolId = ProtocolId(2);

pub struct Fixture {
    pub router: Arc<Router>,
    pub dir: Directory,
    pub eth: AssetId,
    pub eeee: AssetId,
    pub weth: AssetId,
    pub usdt: AssetId,
    pub usdc: AssetId,
    pub dai: AssetId,
    pub cvx: AssetId,
    pub crv: AssetId,
    pub shib: AssetId,
    pub three_crv: AssetId,
    pub renbtc: VenueId,
    pub three_pool: VenueId,
    pub cvx_pool: VenueId,
    pub crv_pool: VenueId,
    pub shib_pool: VenueId,
}

impl Fixture {
    pub fn alice(&self) -> Account {
        Account::wallet(ALICE)
    }

    pub async fn balance(&self, account: &Account, asset: AssetId) -> u128 {
        self.router.balance_of(account, asset).await
    }

    pub fn edge(&self, protocol: ProtocolId, venue: VenueId, from: AssetId, to: AssetId) -> Edge {
        Edge::new(protocol, venue, from, to)
    }

    pub fn major_routes(&self) -> Vec<Vec<Edge>> {
        let (weth, usdt, usdc, dai) = (self.weth, self.usdt, self.usdc, self.dai);
        let ren = |from, to| Edge::new(CP, self.renbtc, from, to);
        let three = |from, to| Edge::new(STABLE, self.three_pool, from, to);
        vec![
            vec![ren(weth, usdt)],
            vec![ren(weth, usdt), three(usdt, usdc)],
            vec![ren(weth, usdt), three(usdt, dai)],
            vec![ren(usdt, weth)],
            vec![three(usdt, usdc)],
            vec![three(usdt, dai)],
            vec![three(usdc, usdt), ren(usdt, weth)],
            vec![three(usdc, usdt)],
            vec![three(usdc, dai)],
            vec![three(dai, usdc)],
            vec![three(dai, usdt)],
            vec![three(dai, usdt), ren(usdt, weth)],
        ]
    }

    pub fn minor_edges(&self) -> Vec<Edge> {
        vec![
            Edge::new(CP, self.cvx_pool, self.cvx, self.weth),
            Edge::new(CP, self.crv_pool, self.crv, self.weth),
            Edge::new(STABLE, self.shib_pool, self.shib, self.dai),
        ]
    }
}

pub fn settings(hop_timeout: Duration) -> RouterSettings {
    RouterSettings {
        hop_timeout,
        max_inflight: 16,
        rate_per_sec: Some(10_000),
        event_buffer: 256,
    }
}

/// Router with no tables, adapters or balances.
pub fn empty_fixture(hop_timeout: Duration) -> Fixture {
    let mut dir = Directory::new(&[ZERO, EEEE], Some("WETH"));
    let router = Arc::new(Router::new(
        settings(hop_timeout),
        dir.native().clone(),
        AccessList::new([ADMIN]),
    ));
    Fixture {
        eth: dir.asset(ZERO),
        eeee: dir.asset(EEEE),
        weth: dir.asset("WETH"),
        usdt: dir.asset("USDT"),
        usdc: dir.asset("USDC"),
        dai: dir.asset("DAI"),
        cvx: dir.asset("CVX"),
        crv: dir.asset("CRV"),
        shib: dir.asset("SHIB"),
        three_crv: dir.asset("3CRV"),
        renbtc: dir.venue("renbtc"),
        three_pool: dir.venue("3pool"),
        cvx_pool: dir.venue("cvx-pool"),
        crv_pool: dir.venue("crv-pool"),
        shib_pool: dir.venue("shib-pool"),
        router,
        dir,
    }
}

/// Fully seeded router: adapters, every table, pool reserves and alice's wallet.
pub async fn fixture() -> Fixture {
    fixture_with_timeout(Duration::from_secs(2)).await
}

pub async fn fixture_with_timeout(hop_timeout: Duration) -> Fixture {
    let fx = empty_fixture(hop_timeout);
    let router = &fx.router;

    let handles: Vec<Arc<dyn SwapAdapter>> = vec![
        Arc::new(ConstantProductAdapter::new(0)),
        Arc::new(StablePoolAdapter::new(0)),
    ];
    router
        .register_adapters(ADMIN, vec![CP, STABLE], handles)
        .await
        .unwrap();
    router.create_major_routes(ADMIN, fx.major_routes()).await.unwrap();
    router.create_minor_edges(ADMIN, fx.minor_edges()).await.unwrap();
    router
        .create_lp_entries(
            ADMIN,
            vec![fx.three_crv],
            vec![PoolRef {
                protocol: STABLE,
                venue: fx.three_pool,
            }],
            vec![vec![fx.dai, fx.usdc, fx.usdt]],
        )
        .await
        .unwrap();

    let reserves = [
        (fx.renbtc, fx.weth, DEEP),
        (fx.renbtc, fx.usdt, DEEP),
        (fx.three_pool, fx.usdt, DEEP),
        (fx.three_pool, fx.usdc, DEEP),
        (fx.three_pool, fx.dai, DEEP),
        (fx.cvx_pool, fx.cvx, DEEP),
        (fx.cvx_pool, fx.weth, DEEP),
        (fx.crv_pool, fx.crv, DEEP),
        (fx.crv_pool, fx.weth, DEEP),
        (fx.shib_pool, fx.shib, DEEP),
        (fx.shib_pool, fx.dai, DEEP),
    ];
    for (venue, asset, amount) in reserves {
        router
            .credit(ADMIN, Account::Venue(venue), asset, amount)
            .await
            .unwrap();
    }

    let wallet = [
        (fx.dai, 1_000_000),
        (fx.usdc, 1_000_000),
        (fx.crv, 1_000_000),
        (fx.shib, 1_000_000),
        (fx.weth, 1_000_000),
        (fx.eth, 1_000_000),
    ];
    for (asset, amount) in wallet {
        router
            .credit(ADMIN, fx.alice(), asset, amount)
            .await
            .unwrap();
    }
    fx
}
