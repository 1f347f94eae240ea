use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::LendingError,
    math::{checked_add, checked_sub, mul_div, scale, unscale, Rounding},
};

/// Which side of a reserve a ledger tracks
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerSide {
    Supply,
    Debt,
}

impl LedgerSide {
    /// Rounding when crediting a holder: never over-credit supply, never under-charge debt
    fn mint_rounding(self) -> Rounding {
        match self {
            LedgerSide::Supply => Rounding::Down,
            LedgerSide::Debt => Rounding::Up,
        }
    }

    fn burn_rounding(self) -> Rounding {
        match self {
            LedgerSide::Supply => Rounding::Up,
            LedgerSide::Debt => Rounding::Down,
        }
    }

    fn balance_rounding(self) -> Rounding {
        self.mint_rounding()
    }
}

/// Index values a ledger operation runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSnapshot {
    /// Protocol index (liquidity index for supply, borrow index for debt)
    pub index: u128,
    /// Current index of a rebasing underlying, if any
    pub external_index: Option<u128>,
}

/// Per-holder ledger entry
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScaledBalance {
    pub scaled_amount: u128,
    /// External index the scaled amount was last expressed against; zero on standard reserves
    pub external_index_at_sync: u128,
}

/// Scaled balance token for one side of one reserve
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct ScaledBalanceLedger {
    pub side: LedgerSide,
    pub holders: BTreeMap<Pubkey, ScaledBalance>,
    pub scaled_total_supply: u128,
}

impl ScaledBalanceLedger {
    pub fn new(side: LedgerSide) -> Self {
        Self {
            side,
            holders: BTreeMap::new(),
            scaled_total_supply: 0,
        }
    }

    /// Fold external-index growth since the holder's last sync into its scaled amount.
    fn sync(&mut self, owner: &Pubkey, snapshot: &IndexSnapshot) -> Result<(), ProgramError> {
        let external_now = match snapshot.external_index {
            Some(index) => index,
            None => return Ok(()),
        };
        let rounding = self.side.balance_rounding();
        let entry = self.holders.entry(*owner).or_default();

        if entry.external_index_at_sync != 0
            && entry.external_index_at_sync != external_now
            && entry.scaled_amount > 0
        {
            let synced = mul_div(
                entry.scaled_amount,
                external_now,
                entry.external_index_at_sync,
                rounding,
            )?;
            self.scaled_total_supply = if synced >= entry.scaled_amount {
                checked_add(self.scaled_total_supply, synced - entry.scaled_amount)?
            } else {
                checked_sub(self.scaled_total_supply, entry.scaled_amount - synced)?
            };
            entry.scaled_amount = synced;
        }
        entry.external_index_at_sync = external_now;
        Ok(())
    }

    fn entry(&self, owner: &Pubkey) -> ScaledBalance {
        self.holders.get(owner).copied().unwrap_or_default()
    }

    fn real_of(
        &self,
        entry: &ScaledBalance,
        snapshot: &IndexSnapshot,
    ) -> Result<u128, ProgramError> {
        let rounding = self.side.balance_rounding();
        let real = unscale(entry.scaled_amount, snapshot.index, rounding)?;
        match snapshot.external_index {
            Some(external_now) if entry.external_index_at_sync != 0 => {
                mul_div(real, external_now, entry.external_index_at_sync, rounding)
            }
            _ => Ok(real),
        }
    }

    /// Credit `amount` real units to `owner`; returns the scaled units added
    pub fn mint(
        &mut self,
        owner: &Pubkey,
        amount: u128,
        snapshot: &IndexSnapshot,
    ) -> Result<u128, ProgramError> {
        if amount == 0 {
            return Err(LendingError::InvalidAmount.into());
        }
        self.sync(owner, snapshot)?;

        let scaled = scale(amount, snapshot.index, self.side.mint_rounding())?;
        if scaled == 0 {
            return Err(LendingError::InvalidAmount.into());
        }

        let entry = self.holders.entry(*owner).or_default();
        entry.scaled_amount = checked_add(entry.scaled_amount, scaled)?;
        self.scaled_total_supply = checked_add(self.scaled_total_supply, scaled)?;
        Ok(scaled)
    }

    /// Remove `amount` real units from `owner`; returns the scaled units removed
    pub fn burn(
        &mut self,
        owner: &Pubkey,
        amount: u128,
        snapshot: &IndexSnapshot,
    ) -> Result<u128, ProgramError> {
        if amount == 0 {
            return Err(LendingError::InvalidAmount.into());
        }
        self.sync(owner, snapshot)?;

        let entry = self.entry(owner);
        let balance = self.real_of(&entry, snapshot)?;
        if amount > balance {
            return Err(LendingError::InsufficientBalance.into());
        }

        let scaled = if amount == balance {
            entry.scaled_amount
        } else {
            scale(amount, snapshot.index, self.side.burn_rounding())?.min(entry.scaled_amount)
        };

        let entry = self.holders.entry(*owner).or_default();
        entry.scaled_amount -= scaled;
        self.scaled_total_supply = checked_sub(self.scaled_total_supply, scaled)?;
        Ok(scaled)
    }

    /// Move `amount` real units between holders at a single index snapshot
    pub fn transfer(
        &mut self,
        from: &Pubkey,
        to: &Pubkey,
        amount: u128,
        snapshot: &IndexSnapshot,
    ) -> Result<u128, ProgramError> {
        if amount == 0 {
            return Err(LendingError::InvalidAmount.into());
        }
        self.sync(from, snapshot)?;
        self.sync(to, snapshot)?;

        let sender = self.entry(from);
        let balance = self.real_of(&sender, snapshot)?;
        if amount > balance {
            return Err(LendingError::InsufficientBalance.into());
        }
        if from == to {
            return Ok(0);
        }

        let scaled = if amount == balance {
            sender.scaled_amount
        } else {
            scale(amount, snapshot.index, Rounding::Up)?.min(sender.scaled_amount)
        };

        if let Some(entry) = self.holders.get_mut(from) {
            entry.scaled_amount -= scaled;
        }
        let receiver = self.holders.entry(*to).or_default();
        receiver.scaled_amount = checked_add(receiver.scaled_amount, scaled)?;
        Ok(scaled)
    }

    /// Live real balance; never cached
    pub fn balance_of(
        &self,
        owner: &Pubkey,
        snapshot: &IndexSnapshot,
    ) -> Result<u128, ProgramError> {
        self.real_of(&self.entry(owner), snapshot)
    }

    pub fn scaled_balance_of(&self, owner: &Pubkey) -> u128 {
        self.entry(owner).scaled_amount
    }

    pub fn total_supply(&self, snapshot: &IndexSnapshot) -> Result<u128, ProgramError> {
        match snapshot.external_index {
            None => unscale(
                self.scaled_total_supply,
                snapshot.index,
                self.side.balance_rounding(),
            ),
            Some(_) => self.holders.values().try_fold(0u128, |total, entry| {
                checked_add(total, self.real_of(entry, snapshot)?)
            }),
        }
    }

    pub fn scaled_total_supply(&self) -> u128 {
        self.scaled_total_supply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{RAY, WAD};

    fn standard(index: u128) -> IndexSnapshot {
        IndexSnapshot { index, external_index: None }
    }

    fn rebasing(index: u128, external: u128) -> IndexSnapshot {
        IndexSnapshot { index, external_index: Some(external) }
    }

    #[test]
    fn test_mint_and_balance_track_index() {
        let mut ledger = ScaledBalanceLedger::new(LedgerSide::Supply);
        let alice = Pubkey::new_unique();

        ledger.mint(&alice, 100 * WAD, &standard(RAY)).unwrap();
        assert_eq!(ledger.scaled_balance_of(&alice), 100 * WAD);

        // index grows 10%, no write
        let grown = standard(RAY + RAY / 10);
        assert_eq!(ledger.balance_of(&alice, &grown).unwrap(), 110 * WAD);
        assert_eq!(ledger.scaled_balance_of(&alice), 100 * WAD);
        assert_eq!(ledger.total_supply(&grown).unwrap(), 110 * WAD);
    }

    #[test]
    fn test_burn_more_than_balance_fails() {
        let mut ledger = ScaledBalanceLedger::new(LedgerSide::Supply);
        let alice = Pubkey::new_unique();
        ledger.mint(&alice, 10 * WAD, &standard(RAY)).unwrap();

        let err = ledger.burn(&alice, 10 * WAD + 1, &standard(RAY)).unwrap_err();
        assert_eq!(err, ProgramError::from(LendingError::InsufficientBalance));

        ledger.burn(&alice, 10 * WAD, &standard(RAY)).unwrap();
        assert_eq!(ledger.scaled_balance_of(&alice), 0);
        assert_eq!(ledger.scaled_total_supply(), 0);
        // entry persists at zero
        assert!(ledger.holders.contains_key(&alice));
    }

    #[test]
    fn test_debt_rounds_against_borrower() {
        let mut ledger = ScaledBalanceLedger::new(LedgerSide::Debt);
        let bob = Pubkey::new_unique();
        let index = RAY + RAY / 2;

        ledger.mint(&bob, 10, &standard(index)).unwrap();
        // 10 / 1.5 = 6.67 -> 7 scaled, owed back as ceil(7 * 1.5) = 11
        assert_eq!(ledger.scaled_balance_of(&bob), 7);
        assert!(ledger.balance_of(&bob, &standard(index)).unwrap() >= 10);
    }

    #[test]
    fn test_transfer_preserves_scaled_total() {
        let mut ledger = ScaledBalanceLedger::new(LedgerSide::Supply);
        let (alice, bob) = (Pubkey::new_unique(), Pubkey::new_unique());
        let snap = standard(RAY + RAY / 3);

        ledger.mint(&alice, 50 * WAD, &snap).unwrap();
        let total_before = ledger.scaled_total_supply();
        ledger.transfer(&alice, &bob, WAD, &snap).unwrap();

        assert_eq!(ledger.scaled_total_supply(), total_before);
        assert_eq!(
            ledger.scaled_balance_of(&alice) + ledger.scaled_balance_of(&bob),
            total_before
        );
        assert!(ledger.transfer(&bob, &alice, 2 * WAD, &snap).is_err());
    }

    #[test]
    fn test_external_index_moves_balance_without_write() {
        let mut ledger = ScaledBalanceLedger::new(LedgerSide::Supply);
        let alice = Pubkey::new_unique();
        let first_year = 1_080_000_000_000_000_000_000_000_000u128;

        ledger.mint(&alice, 100 * WAD, &rebasing(RAY, first_year)).unwrap();
        let scaled = ledger.scaled_balance_of(&alice);

        // external index +10%
        let second_year = first_year + first_year / 10;
        let after = rebasing(RAY, second_year);
        assert_eq!(ledger.balance_of(&alice, &after).unwrap(), 110 * WAD);
        assert_eq!(ledger.scaled_balance_of(&alice), scaled);
        assert_eq!(ledger.scaled_total_supply(), scaled);
        assert_eq!(ledger.total_supply(&after).unwrap(), 110 * WAD);
    }

    #[test]
    fn test_rebasing_transfer_syncs_both_holders() {
        let mut ledger = ScaledBalanceLedger::new(LedgerSide::Supply);
        let (alice, bob) = (Pubkey::new_unique(), Pubkey::new_unique());

        ledger.mint(&alice, 100 * WAD, &rebasing(RAY, RAY)).unwrap();
        ledger.mint(&bob, 10 * WAD, &rebasing(RAY, 2 * RAY)).unwrap();

        // alice synced at 1.0, bob at 2.0; both read at 2.0
        let now = rebasing(RAY, 2 * RAY);
        let alice_before = ledger.balance_of(&alice, &now).unwrap();
        let bob_before = ledger.balance_of(&bob, &now).unwrap();
        assert_eq!(alice_before, 200 * WAD);
        assert_eq!(bob_before, 10 * WAD);

        ledger.transfer(&alice, &bob, 5 * WAD, &now).unwrap();

        assert_eq!(ledger.balance_of(&alice, &now).unwrap(), 195 * WAD);
        assert_eq!(ledger.balance_of(&bob, &now).unwrap(), 15 * WAD);
        assert_eq!(ledger.holders[&alice].external_index_at_sync, 2 * RAY);
        assert_eq!(ledger.holders[&bob].external_index_at_sync, 2 * RAY);
    }
}
