use std::cell::{Ref, RefCell};

use borsh::{BorshDeserialize, BorshSerialize};

use crate::address::{Address, SYSTEM_ID};
use crate::error::{ProgramResult, TransactionError};

/// One record in the store: a balance, an owner tag, and opaque data.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub balance: u64,
    pub owner: Address,
    pub data: Vec<u8>,
}

impl Account {
    pub fn empty() -> Self {
        Account {
            balance: 0,
            owner: SYSTEM_ID,
            data: Vec::new(),
        }
    }

    /// Empty accounts are unowned: they may be claimed by a program, and
    /// are reaped from the store at commit.
    pub fn is_empty(&self) -> bool {
        self.balance == 0 && self.data.is_empty()
    }
}

/// Declares how a transaction intends to use one account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountMeta {
    pub address: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn new(address: Address, is_signer: bool) -> Self {
        AccountMeta {
            address,
            is_signer,
            is_writable: true,
        }
    }

    pub fn new_readonly(address: Address, is_signer: bool) -> Self {
        AccountMeta {
            address,
            is_signer,
            is_writable: false,
        }
    }
}

/// A program's window onto one account during execution. All mutations land
/// in the transaction's staging area and persist only if the whole
/// transaction commits.
pub struct AccountView<'a> {
    pub address: &'a Address,
    pub is_signer: bool,
    pub is_writable: bool,
    inner: &'a RefCell<Account>,
}

impl<'a> AccountView<'a> {
    pub(crate) fn new(
        address: &'a Address,
        is_signer: bool,
        is_writable: bool,
        inner: &'a RefCell<Account>,
    ) -> Self {
        AccountView {
            address,
            is_signer,
            is_writable,
            inner,
        }
    }

    pub fn balance(&self) -> u64 {
        self.inner.borrow().balance
    }

    pub fn owner(&self) -> Address {
        self.inner.borrow().owner
    }

    pub fn data(&self) -> Ref<'_, [u8]> {
        Ref::map(self.inner.borrow(), |account| account.data.as_slice())
    }

    pub fn data_is_empty(&self) -> bool {
        self.inner.borrow().data.is_empty()
    }

    pub fn credit(&self, amount: u64) -> ProgramResult {
        let mut account = self.inner.borrow_mut();
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(TransactionError::BalanceOverflow)?;
        Ok(())
    }

    pub fn debit(&self, amount: u64) -> ProgramResult {
        let mut account = self.inner.borrow_mut();
        account.balance = account
            .balance
            .checked_sub(amount)
            .ok_or(TransactionError::InsufficientFunds)?;
        Ok(())
    }

    pub fn assign(&self, owner: Address) {
        self.inner.borrow_mut().owner = owner;
    }

    pub fn set_data(&self, data: Vec<u8>) {
        self.inner.borrow_mut().data = data;
    }
}

/// Pulls the next account off an instruction's account list.
pub fn next_account<'a, 'b>(
    iter: &mut std::slice::Iter<'a, AccountView<'b>>,
) -> Result<&'a AccountView<'b>, TransactionError> {
    iter.next().ok_or(TransactionError::NotEnoughAccounts)
}
