#![allow(dead_code)]

use costake_lending::{
    access_control::Role,
    interfaces::PoolId,
    math::WAD,
    mock::{MockNftRegistry, MockOracle, MockStaking},
    state::{NftCollectionConfig, PoolConfig, ReserveConfig, ReserveKind, StakingConfig},
    LendingPool,
};
use solana_program::pubkey::Pubkey;

pub type TestPool = LendingPool<MockOracle, MockStaking, MockNftRegistry>;

pub const MAYC_POOL: PoolId = PoolId(2);
pub const BAYC_POOL: PoolId = PoolId(1);
pub const COMPANION_POOL: PoolId = PoolId(3);

/// Whole APE tokens
pub fn ape(amount: u128) -> u128 {
    amount * WAD
}

pub fn eth(amount: u128) -> u128 {
    amount * WAD
}

pub struct TestEnv {
    pub pool: TestPool,
    pub admin: Pubkey,
    pub ape: Pubkey,
    pub weth: Pubkey,
    pub mayc: Pubkey,
    pub bayc: Pubkey,
    pub companion: Pubkey,
    pub depositor: Pubkey,
    pub user1: Pubkey,
    pub user2: Pubkey,
    pub liquidator: Pubkey,
}

impl TestEnv {
    /// APE at 0.001 ETH, MAYC/BAYC floor at 50 ETH, 20000 APE and 100 WETH
    /// of reserve liquidity
    pub fn new() -> Self {
        let admin = Pubkey::new_unique();
        let ape_asset = Pubkey::new_unique();
        let weth = Pubkey::new_unique();
        let mayc = Pubkey::new_unique();
        let bayc = Pubkey::new_unique();
        let companion = Pubkey::new_unique();

        let mut oracle = MockOracle::default();
        oracle.set_price(ape_asset, WAD / 1_000);
        oracle.set_price(weth, WAD);
        oracle.set_price(mayc, eth(50));
        oracle.set_price(bayc, eth(50));

        let staking = StakingConfig::default(ape_asset, 18, companion, COMPANION_POOL)
            .expect("staking config");
        let mut pool = TestPool::new(
            Pubkey::new_unique(),
            admin,
            PoolConfig::default(staking),
            oracle,
            MockStaking::default(),
            MockNftRegistry::default(),
        )
        .expect("pool");

        pool.grant_role(&admin, Role::RiskAdmin, admin).unwrap();
        pool.grant_role(&admin, Role::EmergencyAdmin, admin).unwrap();
        pool.init_reserve(
            &admin,
            ape_asset,
            ReserveConfig::default(2_000, 3_500, 18),
            ReserveKind::Standard,
        )
        .unwrap();
        pool.init_reserve(
            &admin,
            weth,
            ReserveConfig::default(8_000, 8_500, 18),
            ReserveKind::Standard,
        )
        .unwrap();
        pool.list_collection(
            &admin,
            mayc,
            NftCollectionConfig {
                ltv_bps: 3_250,
                liquidation_threshold_bps: 7_000,
                staking_pool: Some(MAYC_POOL),
            },
        )
        .unwrap();
        pool.list_collection(
            &admin,
            bayc,
            NftCollectionConfig {
                ltv_bps: 4_000,
                liquidation_threshold_bps: 7_000,
                staking_pool: Some(BAYC_POOL),
            },
        )
        .unwrap();

        let depositor = Pubkey::new_unique();
        pool.wallets.credit(&ape_asset, &depositor, ape(20_000)).unwrap();
        pool.wallets.credit(&weth, &depositor, eth(100)).unwrap();
        pool.supply(&depositor, &ape_asset, ape(20_000), &depositor).unwrap();
        pool.supply(&depositor, &weth, eth(100), &depositor).unwrap();

        let user1 = Pubkey::new_unique();
        let user2 = Pubkey::new_unique();
        let liquidator = Pubkey::new_unique();
        let custody = pool.address;
        for user in [user1, user2, liquidator] {
            pool.nfts.set_approval_for_all(user, custody, true);
        }

        Self {
            pool,
            admin,
            ape: ape_asset,
            weth,
            mayc,
            bayc,
            companion,
            depositor,
            user1,
            user2,
            liquidator,
        }
    }

    /// Mint `token_id` of `collection` to `owner` and supply it as collateral
    pub fn supply_nft(&mut self, owner: Pubkey, collection: Pubkey, token_id: u64) {
        self.pool.nfts.mint(collection, token_id, owner);
        self.pool
            .supply_nft(&owner, &collection, token_id, true)
            .unwrap();
    }

    /// Mint companion tokens straight to `owner`'s wallet
    pub fn mint_companions(&mut self, owner: Pubkey, token_ids: &[u64]) {
        let companion = self.companion;
        for &token_id in token_ids {
            self.pool.nfts.mint(companion, token_id, owner);
        }
    }

    pub fn fund_ape(&mut self, owner: Pubkey, amount: u128) {
        let asset = self.ape;
        self.pool.wallets.credit(&asset, &owner, amount).unwrap();
    }

    pub fn set_price(&mut self, asset: Pubkey, price: u128) {
        self.pool.oracle.set_price(asset, price);
    }

    pub fn ape_debt(&self, user: &Pubkey) -> u128 {
        self.pool
            .balance_of(&self.ape, costake_lending::state::LedgerSide::Debt, user)
            .unwrap()
    }

    pub fn ape_supply(&self, user: &Pubkey) -> u128 {
        self.pool
            .balance_of(&self.ape, costake_lending::state::LedgerSide::Supply, user)
            .unwrap()
    }
}
