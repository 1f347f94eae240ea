use std::collections::BTreeSet;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};

use crate::error::LendingError;

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    /// Lists reserves and collections, manages roles
    PoolAdmin,
    /// Tunes risk parameters
    RiskAdmin,
    /// Pauses the pool
    EmergencyAdmin,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Default)]
pub struct AccessControl {
    pub members: BTreeSet<(Role, Pubkey)>,
}

impl AccessControl {
    pub fn new(admin: Pubkey) -> Self {
        let mut members = BTreeSet::new();
        members.insert((Role::PoolAdmin, admin));
        Self { members }
    }

    pub fn has_role(&self, role: Role, account: &Pubkey) -> bool {
        self.members.contains(&(role, *account))
    }

    pub fn check_role(&self, role: Role, account: &Pubkey) -> Result<(), ProgramError> {
        if !self.has_role(role, account) {
            msg!("{} lacks role {:?}", account, role);
            return Err(LendingError::Unauthorized.into());
        }
        Ok(())
    }

    pub fn grant_role(
        &mut self,
        caller: &Pubkey,
        role: Role,
        account: Pubkey,
    ) -> Result<(), ProgramError> {
        self.check_role(Role::PoolAdmin, caller)?;
        self.members.insert((role, account));
        msg!("Granted {:?} to {}", role, account);
        Ok(())
    }

    pub fn revoke_role(
        &mut self,
        caller: &Pubkey,
        role: Role,
        account: &Pubkey,
    ) -> Result<(), ProgramError> {
        self.check_role(Role::PoolAdmin, caller)?;
        self.members.remove(&(role, *account));
        msg!("Revoked {:?} from {}", role, account);
        Ok(())
    }
}
