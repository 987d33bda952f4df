use borsh::{BorshDeserialize, BorshSerialize};
use ledger::{find_derived_address, AccountMeta, Address, Transaction, SYSTEM_ID};

use crate::processor::{RECORD_SEED, VAULT_SEED};

#[derive(BorshSerialize, BorshDeserialize, Debug)]
pub enum Instruction {
    /// Opens an escrow: deposits `amount` into a program-controlled vault
    /// that only `taker` (via Take) or the maker (via Refund) can drain.
    ///
    /// Accounts expected:
    ///
    /// 0. `[signer, writable]` The maker, debited for the amount and the record's allocation
    /// 1. `[writable]` The escrow record, at derive("escrow", maker); created here
    /// 2. `[writable]` The vault, at derive("escrow_vault", record); created here
    /// 3. `[]` The allocation service
    Make { amount: u64, taker: Address },

    /// Releases an open escrow to its taker, destroying record and vault.
    ///
    /// Accounts expected:
    ///
    /// 0. `[signer, writable]` The taker, credited with the vault balance and reclaimed allocation
    /// 1. `[writable]` The vault, drained
    /// 2. `[writable]` The escrow record, closed
    /// 3. `[]` The allocation service
    Take,

    /// Returns an open escrow to its maker, destroying record and vault.
    ///
    /// Accounts expected:
    ///
    /// 0. `[signer, writable]` The maker, credited with the vault balance and reclaimed allocation
    /// 1. `[writable]` The vault, drained
    /// 2. `[writable]` The escrow record, closed
    /// 3. `[]` The allocation service
    Refund,
}

/// Builds an unsigned `make` transaction, resolving the record and vault
/// addresses from the maker.
pub fn make(maker: &Address, taker: &Address, amount: u64) -> Transaction {
    let (record, _) = find_derived_address(RECORD_SEED, maker, &crate::id());
    let (vault, _) = find_derived_address(VAULT_SEED, &record, &crate::id());
    Transaction::new(
        crate::id(),
        &Instruction::Make {
            amount,
            taker: *taker,
        },
        vec![
            AccountMeta::new(*maker, true),
            AccountMeta::new(record, false),
            AccountMeta::new(vault, false),
            AccountMeta::new_readonly(SYSTEM_ID, false),
        ],
    )
}

/// Builds an unsigned `take` transaction against the escrow opened by `maker`.
pub fn take(taker: &Address, maker: &Address) -> Transaction {
    let (record, _) = find_derived_address(RECORD_SEED, maker, &crate::id());
    let (vault, _) = find_derived_address(VAULT_SEED, &record, &crate::id());
    Transaction::new(
        crate::id(),
        &Instruction::Take,
        vec![
            AccountMeta::new(*taker, true),
            AccountMeta::new(vault, false),
            AccountMeta::new(record, false),
            AccountMeta::new_readonly(SYSTEM_ID, false),
        ],
    )
}

/// Builds an unsigned `refund` transaction for `maker`'s open escrow.
pub fn refund(maker: &Address) -> Transaction {
    let (record, _) = find_derived_address(RECORD_SEED, maker, &crate::id());
    let (vault, _) = find_derived_address(VAULT_SEED, &record, &crate::id());
    Transaction::new(
        crate::id(),
        &Instruction::Refund,
        vec![
            AccountMeta::new(*maker, true),
            AccountMeta::new(vault, false),
            AccountMeta::new(record, false),
            AccountMeta::new_readonly(SYSTEM_ID, false),
        ],
    )
}
