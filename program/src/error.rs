use ledger::TransactionError;
use num_derive::FromPrimitive;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, Error, FromPrimitive, PartialEq)]
pub enum Error {
    #[error("Invalid instruction")]
    InvalidInstruction,
    #[error("Escrow amount must be greater than zero")]
    InvalidAmount,
    #[error("An escrow is already open for this maker")]
    AlreadyOpen,
    #[error("Signer is not the required party for this transition")]
    Unauthorized,
    #[error("Escrow record does not exist or is not open")]
    NotOpen,
    #[error("Escrow record account does not match its derivation")]
    InvalidEscrowAccount,
    #[error("Vault account does not match its derivation")]
    InvalidVaultAccount,
}

impl From<Error> for TransactionError {
    fn from(error: Error) -> Self {
        TransactionError::Custom(error as u32)
    }
}
