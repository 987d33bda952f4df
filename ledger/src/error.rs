use thiserror::Error;

/// Why a transaction was rejected. Every rejection is atomic: the store is
/// exactly as it was before the attempt, apart from the fee.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction targets an unregistered program")]
    UnknownProgram,
    #[error("a required signature is missing")]
    MissingRequiredSignature,
    #[error("instruction expected more accounts than the transaction supplied")]
    NotEnoughAccounts,
    #[error("account balance too low")]
    InsufficientFunds,
    #[error("account data is missing or malformed")]
    InvalidAccountData,
    #[error("account is not the expected service account")]
    IncorrectProgramId,
    #[error("balance overflow")]
    BalanceOverflow,
    #[error("transaction modified an account it declared read-only")]
    ReadonlyAccountModified,
    #[error("transaction spent from an account it does not control")]
    UnauthorizedSpend,
    #[error("transaction rewrote an account owned by another program")]
    ModifiedForeignAccount,
    #[error("account balance no longer covers its allocation cost")]
    InsufficientAllocation,
    #[error("transaction created or destroyed funds")]
    UnbalancedTransaction,
    #[error("program error code {0}")]
    Custom(u32),
}

pub type ProgramResult = Result<(), TransactionError>;
