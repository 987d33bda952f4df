use crate::instruction::Instruction;
use crate::{error::Error, state::Escrow};

use borsh::BorshDeserialize;
use ledger::{
    allocation_cost, derive_address, find_derived_address, next_account, AccountView, Address,
    ProgramResult, TransactionError, SYSTEM_ID,
};
use tracing::info;

pub const RECORD_SEED: &[u8] = b"escrow";
pub const VAULT_SEED: &[u8] = b"escrow_vault";

pub fn process(
    program_id: &Address,
    accounts: &[AccountView],
    instruction_data: &[u8],
) -> ProgramResult {
    let instruction =
        Instruction::try_from_slice(instruction_data).map_err(|_| Error::InvalidInstruction)?;

    match instruction {
        Instruction::Make { amount, taker } => process_make(program_id, accounts, amount, taker),
        Instruction::Take => process_take(program_id, accounts),
        Instruction::Refund => process_refund(program_id, accounts),
    }
}

fn process_make(
    program_id: &Address,
    accounts: &[AccountView],
    amount: u64,
    taker: Address,
) -> ProgramResult {
    info!("instruction: make");

    //
    // resolve accounts
    //
    let accounts_iter = &mut accounts.iter();

    let maker = next_account(accounts_iter)?;
    if !maker.is_signer {
        return Err(TransactionError::MissingRequiredSignature);
    }

    let record_account = next_account(accounts_iter)?;
    let vault_account = next_account(accounts_iter)?;

    let allocator = next_account(accounts_iter)?;
    if *allocator.address != SYSTEM_ID {
        return Err(TransactionError::IncorrectProgramId);
    }

    //
    // validate the transition
    //
    if amount == 0 {
        return Err(Error::InvalidAmount.into());
    }

    let (record_address, record_tag) = find_derived_address(RECORD_SEED, maker.address, program_id);
    if *record_account.address != record_address {
        return Err(Error::InvalidEscrowAccount.into());
    }
    let (vault_address, vault_tag) = find_derived_address(VAULT_SEED, &record_address, program_id);
    if *vault_account.address != vault_address {
        return Err(Error::InvalidVaultAccount.into());
    }

    if !record_account.data_is_empty() {
        return Err(Error::AlreadyOpen.into());
    }

    //
    // fund and claim record and vault
    //
    let record = Escrow {
        maker: *maker.address,
        taker,
        amount,
        record_tag,
        vault_tag,
    };

    let cost = allocation_cost(Escrow::LEN);
    maker.debit(cost)?;
    record_account.credit(cost)?;
    record_account.assign(*program_id);
    record_account
        .set_data(borsh::to_vec(&record).map_err(|_| TransactionError::InvalidAccountData)?);

    maker.debit(amount)?;
    vault_account.credit(amount)?;
    vault_account.assign(*program_id);

    Ok(())
}

fn process_take(program_id: &Address, accounts: &[AccountView]) -> ProgramResult {
    info!("instruction: take");

    let accounts_iter = &mut accounts.iter();

    let taker = next_account(accounts_iter)?;
    if !taker.is_signer {
        return Err(TransactionError::MissingRequiredSignature);
    }

    let vault_account = next_account(accounts_iter)?;
    let record_account = next_account(accounts_iter)?;

    let allocator = next_account(accounts_iter)?;
    if *allocator.address != SYSTEM_ID {
        return Err(TransactionError::IncorrectProgramId);
    }

    let record = open_record(program_id, record_account, vault_account)?;
    if record.taker != *taker.address {
        return Err(Error::Unauthorized.into());
    }

    close(record_account, vault_account, taker)
}

fn process_refund(program_id: &Address, accounts: &[AccountView]) -> ProgramResult {
    info!("instruction: refund");

    let accounts_iter = &mut accounts.iter();

    let maker = next_account(accounts_iter)?;
    if !maker.is_signer {
        return Err(TransactionError::MissingRequiredSignature);
    }

    let vault_account = next_account(accounts_iter)?;
    let record_account = next_account(accounts_iter)?;

    let allocator = next_account(accounts_iter)?;
    if *allocator.address != SYSTEM_ID {
        return Err(TransactionError::IncorrectProgramId);
    }

    let record = open_record(program_id, record_account, vault_account)?;
    if record.maker != *maker.address {
        return Err(Error::Unauthorized.into());
    }

    close(record_account, vault_account, maker)
}

/// Loads an open escrow record and re-verifies that the supplied record and
/// vault accounts match the derivations pinned at `make`.
fn open_record(
    program_id: &Address,
    record_account: &AccountView,
    vault_account: &AccountView,
) -> Result<Escrow, TransactionError> {
    if record_account.owner() != *program_id || record_account.data_is_empty() {
        return Err(Error::NotOpen.into());
    }
    let record = Escrow::try_from_slice(&record_account.data())
        .map_err(|_| Error::InvalidEscrowAccount)?;

    let expected_record = derive_address(RECORD_SEED, &record.maker, record.record_tag, program_id)
        .map_err(|_| Error::InvalidEscrowAccount)?;
    if *record_account.address != expected_record {
        return Err(Error::InvalidEscrowAccount.into());
    }
    let expected_vault = derive_address(VAULT_SEED, &expected_record, record.vault_tag, program_id)
        .map_err(|_| Error::InvalidVaultAccount)?;
    if *vault_account.address != expected_vault {
        return Err(Error::InvalidVaultAccount.into());
    }
    Ok(record)
}

/// Drains the vault and the record's reclaimed allocation into `recipient`
/// and clears the record; the ledger reaps both accounts at commit.
fn close(
    record_account: &AccountView,
    vault_account: &AccountView,
    recipient: &AccountView,
) -> ProgramResult {
    let vault_balance = vault_account.balance();
    vault_account.debit(vault_balance)?;
    recipient.credit(vault_balance)?;
    vault_account.assign(SYSTEM_ID);

    let record_balance = record_account.balance();
    record_account.debit(record_balance)?;
    recipient.credit(record_balance)?;
    record_account.set_data(Vec::new());
    record_account.assign(SYSTEM_ID);

    Ok(())
}
