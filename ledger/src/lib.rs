//! An address-keyed, transactional account store.
//!
//! Programs are registered under fixed addresses and invoked one
//! transaction at a time. Each transaction executes against a staged copy
//! of the accounts it references; the stage commits as a single unit or is
//! dropped without trace. `&mut self` execution keeps any two transactions
//! touching the same address totally ordered.

mod account;
mod address;
mod error;
mod transaction;

use std::cell::RefCell;
use std::collections::HashMap;

use borsh::BorshDeserialize;
use tracing::debug;

pub use crate::account::{next_account, Account, AccountMeta, AccountView};
pub use crate::address::{
    derive_address, find_derived_address, Address, DeriveError, Keypair, ParseAddressError,
    FEE_COLLECTOR, SYSTEM_ID,
};
pub use crate::error::{ProgramResult, TransactionError};
pub use crate::transaction::Transaction;

/// Flat fee per transaction, charged to the fee payer whether or not the
/// instruction succeeds.
pub const TRANSACTION_FEE: u64 = 5_000;

/// Per-byte cost of keeping account data allocated. Paid when a record is
/// created, reclaimed when it is destroyed.
pub const BYTE_ALLOCATION_COST: u64 = 6_960;

pub fn allocation_cost(data_len: usize) -> u64 {
    data_len as u64 * BYTE_ALLOCATION_COST
}

/// A program entrypoint: validates the accounts it was handed and mutates
/// them through their views. Must not assume any effect persists on error.
pub type ProcessFn = fn(&Address, &[AccountView], &[u8]) -> ProgramResult;

pub struct Ledger {
    accounts: HashMap<Address, Account>,
    programs: HashMap<Address, ProcessFn>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Ledger {
            accounts: HashMap::new(),
            programs: HashMap::new(),
        }
    }

    pub fn register_program(&mut self, id: Address, entrypoint: ProcessFn) {
        self.programs.insert(id, entrypoint);
    }

    /// Test and bootstrap faucet: mints `amount` to `address`.
    pub fn airdrop(&mut self, address: &Address, amount: u64) {
        let account = self
            .accounts
            .entry(*address)
            .or_insert_with(Account::empty);
        account.balance = account.balance.saturating_add(amount);
        debug!(%address, amount, "airdrop");
    }

    /// Balance of `address`, zero if the account does not exist.
    pub fn balance(&self, address: &Address) -> u64 {
        self.accounts
            .get(address)
            .map(|account| account.balance)
            .unwrap_or(0)
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Executes one transaction atomically. On error nothing changed,
    /// except that the fee was charged once the fee payer was resolved.
    pub fn execute(&mut self, transaction: &Transaction) -> ProgramResult {
        let entrypoint = *self
            .programs
            .get(&transaction.program_id)
            .ok_or(TransactionError::UnknownProgram)?;

        for meta in &transaction.accounts {
            if meta.is_signer && !transaction.is_signed_by(&meta.address) {
                return Err(TransactionError::MissingRequiredSignature);
            }
        }

        let payer = *transaction
            .fee_payer()
            .ok_or(TransactionError::MissingRequiredSignature)?;
        self.charge_fee(&payer)?;

        // Stage one private copy of every referenced account; duplicate
        // metas share a slot. Absent addresses stage as empty placeholders.
        let mut indices: HashMap<Address, usize> = HashMap::new();
        let mut staged: Vec<(Address, Account)> = Vec::new();
        for meta in &transaction.accounts {
            if !indices.contains_key(&meta.address) {
                indices.insert(meta.address, staged.len());
                let account = self
                    .accounts
                    .get(&meta.address)
                    .cloned()
                    .unwrap_or_else(Account::empty);
                staged.push((meta.address, account));
            }
        }
        let cells: Vec<RefCell<Account>> = staged
            .iter()
            .map(|(_, account)| RefCell::new(account.clone()))
            .collect();
        let views: Vec<AccountView> = transaction
            .accounts
            .iter()
            .map(|meta| {
                let index = indices[&meta.address];
                AccountView::new(
                    &staged[index].0,
                    meta.is_signer,
                    meta.is_writable,
                    &cells[index],
                )
            })
            .collect();

        if let Err(error) = entrypoint(&transaction.program_id, &views, &transaction.data) {
            debug!(program = %transaction.program_id, %error, "transaction rejected");
            return Err(error);
        }
        drop(views);

        self.validate(transaction, &staged, &cells)?;

        for ((address, _), cell) in staged.iter().zip(cells) {
            let account = cell.into_inner();
            if account.is_empty() {
                self.accounts.remove(address);
            } else {
                self.accounts.insert(*address, account);
            }
        }
        debug!(
            program = %transaction.program_id,
            accounts = transaction.accounts.len(),
            "transaction committed"
        );
        Ok(())
    }

    /// Checks the staged effects against the store's access discipline
    /// before anything is committed.
    fn validate(
        &self,
        transaction: &Transaction,
        staged: &[(Address, Account)],
        cells: &[RefCell<Account>],
    ) -> ProgramResult {
        let mut writable: HashMap<Address, bool> = HashMap::new();
        for meta in &transaction.accounts {
            let entry = writable.entry(meta.address).or_insert(false);
            *entry = *entry || meta.is_writable;
        }

        let mut total_before: u128 = 0;
        let mut total_after: u128 = 0;
        for ((address, before), cell) in staged.iter().zip(cells) {
            let after = cell.borrow();
            total_before += u128::from(before.balance);
            total_after += u128::from(after.balance);
            if *after == *before {
                continue;
            }
            if !writable[address] {
                return Err(TransactionError::ReadonlyAccountModified);
            }
            let program_owned = before.owner == transaction.program_id;
            if after.balance < before.balance
                && !program_owned
                && !transaction.is_signed_by(address)
            {
                return Err(TransactionError::UnauthorizedSpend);
            }
            if (after.data != before.data || after.owner != before.owner)
                && !program_owned
                && !before.is_empty()
            {
                return Err(TransactionError::ModifiedForeignAccount);
            }
            if !after.data.is_empty() && after.balance < allocation_cost(after.data.len()) {
                return Err(TransactionError::InsufficientAllocation);
            }
        }
        if total_before != total_after {
            return Err(TransactionError::UnbalancedTransaction);
        }
        Ok(())
    }

    fn charge_fee(&mut self, payer: &Address) -> ProgramResult {
        let account = self
            .accounts
            .get_mut(payer)
            .ok_or(TransactionError::InsufficientFunds)?;
        account.balance = account
            .balance
            .checked_sub(TRANSACTION_FEE)
            .ok_or(TransactionError::InsufficientFunds)?;
        let collector = self
            .accounts
            .entry(FEE_COLLECTOR)
            .or_insert_with(Account::empty);
        collector.balance = collector.balance.saturating_add(TRANSACTION_FEE);
        Ok(())
    }

    /// Borsh snapshot of the account map, for persistence between runs.
    /// Registered programs are not included; re-register after `restore`.
    pub fn snapshot(&self) -> std::io::Result<Vec<u8>> {
        borsh::to_vec(&self.accounts)
    }

    pub fn restore(bytes: &[u8]) -> std::io::Result<Self> {
        let accounts: HashMap<Address, Account> = BorshDeserialize::try_from_slice(bytes)?;
        Ok(Ledger {
            accounts,
            programs: HashMap::new(),
        })
    }
}
