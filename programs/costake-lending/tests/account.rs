mod common;

use common::*;
use costake_lending::{
    engine::{MainStakeOp, StakeFunding},
    LendingError,
};
use solana_program::program_error::ProgramError;

/// user1: MAYC #0, 10 WETH supplied, 1000 APE staked, 5 WETH borrowed
fn mixed_collateral() -> TestEnv {
    let mut env = TestEnv::new();
    let (user1, mayc, weth) = (env.user1, env.mayc, env.weth);
    env.supply_nft(user1, mayc, 0);
    env.pool.wallets.credit(&weth, &user1, eth(10)).unwrap();
    env.pool.supply(&user1, &weth, eth(10), &user1).unwrap();
    env.fund_ape(user1, ape(1_000));
    env.pool
        .stake_and_borrow(
            &user1,
            &mayc,
            StakeFunding {
                borrow_amount: 0,
                cash_amount: ape(1_000),
            },
            &[MainStakeOp {
                token_id: 0,
                amount: ape(1_000),
            }],
            &[],
        )
        .unwrap();
    env.pool.borrow(&user1, &weth, eth(5)).unwrap();
    env
}

#[test]
fn test_account_data_weighs_each_collateral_class() {
    let env = mixed_collateral();
    let account = env.pool.get_user_account_data(&env.user1).unwrap();

    // 50 ETH NFT + 10 ETH supply + 1 ETH derivative
    assert_eq!(account.total_collateral_base, eth(61));
    assert_eq!(account.total_debt_base, eth(5));
    // 16.25 + 8 + 0.2 - 5
    assert_eq!(account.available_borrows_base, 19_450_000_000_000_000_000);
    assert_eq!(account.ltv, 4_008);
    assert_eq!(account.current_liquidation_threshold, 7_245);
    // (35 + 8.5 + 0.7) / 5
    assert_eq!(account.health_factor, 8_840_000_000_000_000_000);
}

#[test]
fn test_disabled_reserve_is_not_collateral() {
    let mut env = mixed_collateral();
    let (user1, weth) = (env.user1, env.weth);

    env.pool
        .set_use_reserve_as_collateral(&user1, &weth, false)
        .unwrap();
    let account = env.pool.get_user_account_data(&user1).unwrap();
    assert_eq!(account.total_collateral_base, eth(51));

    env.pool
        .set_use_reserve_as_collateral(&user1, &weth, true)
        .unwrap();
    assert_eq!(
        env.pool.get_user_account_data(&user1).unwrap().total_collateral_base,
        eth(61)
    );
}

#[test]
fn test_zero_price_is_rejected() {
    let mut env = mixed_collateral();
    let (user1, mayc) = (env.user1, env.mayc);
    env.set_price(mayc, 0);

    assert_eq!(
        env.pool.get_user_account_data(&user1).unwrap_err(),
        ProgramError::from(LendingError::InvalidOraclePrice)
    );
}

#[test]
fn test_unclaimed_rewards_are_not_valued() {
    let mut env = mixed_collateral();
    let user1 = env.user1;
    let before = env.pool.get_user_account_data(&user1).unwrap();

    env.pool.staking.accrue_rewards(
        costake_lending::interfaces::StakePosition::Main {
            pool: MAYC_POOL,
            token_id: 0,
        },
        ape(500),
    );
    assert_eq!(env.pool.get_user_account_data(&user1).unwrap(), before);
}
