mod error;
mod instruction;
mod processor;
mod state;

pub use error::Error;
pub use instruction::{make, refund, take, Instruction};
pub use processor::{process, RECORD_SEED, VAULT_SEED};
pub use state::Escrow;

use ledger::{Address, Ledger};

/// The escrow program's ledger address.
pub const ID: Address = Address::new(*b"escrow-program-1................");

pub fn id() -> Address {
    ID
}

/// Installs the escrow entrypoint so the ledger can dispatch to it.
pub fn register(ledger: &mut Ledger) {
    ledger.register_program(ID, processor::process);
}
