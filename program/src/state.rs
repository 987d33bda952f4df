use borsh::{BorshDeserialize, BorshSerialize};
use ledger::Address;

/// One open escrow. All fields are write-once at `make`; the record exists
/// only while the paired vault holds exactly `amount`, and both are
/// destroyed together by `take` or `refund`.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Escrow {
    pub maker: Address,
    pub taker: Address,
    pub amount: u64,
    /// Tags that reproduced the record and vault addresses; persisted so
    /// both derivations can be re-verified on take/refund.
    pub record_tag: u8,
    pub vault_tag: u8,
}

impl Escrow {
    /// Serialized size: two addresses, the amount, two derivation tags.
    pub const LEN: usize = 32 + 32 + 8 + 1 + 1;
}
