mod common;

use common::*;
use costake_lending::{
    math::{scale, Rounding, RAY, SECONDS_PER_YEAR, WAD},
    state::{IndexSnapshot, LedgerSide, ReserveConfig, ReserveKind, ScaledBalanceLedger},
    LendingError,
};
use proptest::prelude::*;
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

fn snapshot(index: u128, external_index: Option<u128>) -> IndexSnapshot {
    IndexSnapshot {
        index,
        external_index,
    }
}

proptest! {
    #[test]
    fn test_scaled_balance_tracks_real_balance(
        index in RAY..3 * RAY,
        amount_a in 1_000u128..1_000_000 * WAD,
        amount_b in 1_000u128..1_000_000 * WAD,
    ) {
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let mut ledger = ScaledBalanceLedger::new(LedgerSide::Supply);
        let at = snapshot(index, None);
        ledger.mint(&a, amount_a, &at).unwrap();
        ledger.mint(&b, amount_b, &at).unwrap();

        for holder in [a, b] {
            let real = ledger.balance_of(&holder, &at).unwrap();
            let rescaled = scale(real, index, Rounding::Down).unwrap();
            prop_assert!(ledger.scaled_balance_of(&holder).abs_diff(rescaled) <= 1);
        }
        prop_assert_eq!(
            ledger.scaled_total_supply(),
            ledger.scaled_balance_of(&a) + ledger.scaled_balance_of(&b)
        );
    }

    #[test]
    fn test_transfer_conserves_total(
        index in RAY..3 * RAY,
        amount in 1_000u128..1_000_000 * WAD,
        share in 1u128..100,
    ) {
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let mut ledger = ScaledBalanceLedger::new(LedgerSide::Supply);
        let at = snapshot(index, None);
        ledger.mint(&a, amount, &at).unwrap();
        ledger.mint(&b, amount / 3 + 1_000, &at).unwrap();

        let before = ledger.balance_of(&a, &at).unwrap() + ledger.balance_of(&b, &at).unwrap();
        let moved = ledger.balance_of(&a, &at).unwrap() * share / 100;
        prop_assume!(moved > 0);
        ledger.transfer(&a, &b, moved, &at).unwrap();
        let after = ledger.balance_of(&a, &at).unwrap() + ledger.balance_of(&b, &at).unwrap();

        prop_assert!(before.abs_diff(after) <= 2);
    }

    #[test]
    fn test_external_index_growth_without_writes(
        index in RAY..2 * RAY,
        amount in 1_000u128..1_000_000 * WAD,
        growth in RAY / 100..RAY,
    ) {
        let holder = Pubkey::new_unique();
        let mut ledger = ScaledBalanceLedger::new(LedgerSide::Supply);
        ledger.mint(&holder, amount, &snapshot(index, Some(RAY))).unwrap();

        let scaled = ledger.scaled_balance_of(&holder);
        let before = ledger.balance_of(&holder, &snapshot(index, Some(RAY))).unwrap();
        let after = ledger
            .balance_of(&holder, &snapshot(index, Some(RAY + growth)))
            .unwrap();

        prop_assert!(after > before);
        prop_assert_eq!(
            after,
            costake_lending::math::mul_div(before, RAY + growth, RAY, Rounding::Down).unwrap()
        );
        prop_assert_eq!(ledger.scaled_balance_of(&holder), scaled);
    }
}

/// A rebasing reserve listed on the shared fixture
fn rebasing_env() -> (TestEnv, Pubkey) {
    let mut env = TestEnv::new();
    let steth = Pubkey::new_unique();
    let admin = env.admin;
    env.pool
        .init_reserve(
            &admin,
            steth,
            ReserveConfig::default(7_000, 8_000, 18),
            ReserveKind::Rebasing {
                external_index: RAY,
            },
        )
        .unwrap();
    env.set_price(steth, WAD);
    (env, steth)
}

#[test]
fn test_rebasing_reserve_grows_with_external_index() {
    let (mut env, steth) = rebasing_env();
    let (user1, user2) = (env.user1, env.user2);
    env.pool.wallets.credit(&steth, &user1, eth(100)).unwrap();
    env.pool.supply(&user1, &steth, eth(100), &user1).unwrap();

    env.pool.set_external_index(&steth, RAY * 11 / 10).unwrap();
    assert_eq!(
        env.pool.balance_of(&steth, LedgerSide::Supply, &user1).unwrap(),
        eth(110)
    );
    assert_eq!(
        env.pool.scaled_balance_of(&steth, LedgerSide::Supply, &user1).unwrap(),
        eth(100)
    );
    assert_eq!(env.pool.total_supply(&steth, LedgerSide::Supply).unwrap(), eth(110));

    // the transfer folds the growth into both holders at one snapshot
    env.pool
        .transfer_supply(&user1, &steth, &user2, eth(55))
        .unwrap();
    assert_eq!(
        env.pool.balance_of(&steth, LedgerSide::Supply, &user1).unwrap(),
        eth(55)
    );
    assert_eq!(
        env.pool.balance_of(&steth, LedgerSide::Supply, &user2).unwrap(),
        eth(55)
    );
    assert_eq!(
        env.pool.scaled_total_supply(&steth, LedgerSide::Supply).unwrap(),
        eth(110)
    );
    assert!(env.pool.is_using_as_collateral(&user2, &steth));
    assert_eq!(
        env.pool.get_user_account_data(&user2).unwrap().total_collateral_base,
        eth(55)
    );
}

#[test]
fn test_external_index_updates_are_checked() {
    let (mut env, steth) = rebasing_env();
    let ape_asset = env.ape;

    assert_eq!(
        env.pool.set_external_index(&ape_asset, RAY).unwrap_err(),
        ProgramError::from(LendingError::InvalidReserveKind)
    );
    assert_eq!(
        env.pool.set_external_index(&steth, 0).unwrap_err(),
        ProgramError::from(LendingError::InvalidConfig)
    );
    assert_eq!(
        env.pool.set_external_index(&Pubkey::new_unique(), RAY).unwrap_err(),
        ProgramError::from(LendingError::ReserveNotFound)
    );
}

#[test]
fn test_interest_accrues_on_both_sides() {
    let mut env = TestEnv::new();
    let (user1, depositor, mayc, weth) = (env.user1, env.depositor, env.mayc, env.weth);
    env.supply_nft(user1, mayc, 0);
    env.pool.borrow(&user1, &weth, eth(10)).unwrap();

    // 5% borrow rate at 10% utilization
    env.pool.advance_time(SECONDS_PER_YEAR as i64);
    assert_eq!(
        env.pool.balance_of(&weth, LedgerSide::Debt, &user1).unwrap(),
        eth(10) + eth(1) / 2
    );
    assert_eq!(
        env.pool.balance_of(&weth, LedgerSide::Supply, &depositor).unwrap(),
        eth(100) + eth(1) / 2
    );
    assert_eq!(
        env.pool.scaled_balance_of(&weth, LedgerSide::Debt, &user1).unwrap(),
        eth(10)
    );

    env.pool.wallets.credit(&weth, &user1, eth(1)).unwrap();
    let repaid = env.pool.repay(&user1, &weth, u128::MAX, &user1).unwrap();
    assert_eq!(repaid, eth(10) + eth(1) / 2);
    assert_eq!(env.pool.balance_of(&weth, LedgerSide::Debt, &user1).unwrap(), 0);
}

#[test]
fn test_supply_withdraw_liquidity_bounds() {
    let mut env = TestEnv::new();
    let (user1, depositor, mayc, weth) = (env.user1, env.depositor, env.mayc, env.weth);
    env.supply_nft(user1, mayc, 0);
    env.pool.borrow(&user1, &weth, eth(10)).unwrap();

    let err = env.pool.withdraw(&depositor, &weth, eth(95)).unwrap_err();
    assert_eq!(err, ProgramError::from(LendingError::InsufficientLiquidity));

    let err = env.pool.withdraw(&depositor, &weth, eth(101)).unwrap_err();
    assert_eq!(err, ProgramError::from(LendingError::InsufficientBalance));

    assert_eq!(env.pool.withdraw(&depositor, &weth, eth(90)).unwrap(), eth(90));
    assert_eq!(env.pool.wallet_balance(&weth, &depositor), eth(90));
    assert_eq!(env.pool.reserve(&weth).unwrap().available_liquidity().unwrap(), 0);
}

#[test]
fn test_rebased_supply_is_fully_withdrawable() {
    let (mut env, steth) = rebasing_env();
    let user1 = env.user1;
    env.pool.wallets.credit(&steth, &user1, eth(100)).unwrap();
    env.pool.supply(&user1, &steth, eth(100), &user1).unwrap();

    env.pool.set_external_index(&steth, 2 * RAY).unwrap();
    assert_eq!(
        env.pool.reserve(&steth).unwrap().available_liquidity().unwrap(),
        eth(200)
    );

    assert_eq!(env.pool.withdraw(&user1, &steth, u128::MAX).unwrap(), eth(200));
    assert_eq!(env.pool.wallet_balance(&steth, &user1), eth(200));
    assert_eq!(env.pool.balance_of(&steth, LedgerSide::Supply, &user1).unwrap(), 0);
    assert_eq!(env.pool.reserve(&steth).unwrap().scaled_liquidity, 0);
}
