use borsh::BorshSerialize;

use crate::account::AccountMeta;
use crate::address::{Address, Keypair};

/// One atomic request against the ledger: a single program invocation, the
/// accounts it may touch, and the signatures backing it.
pub struct Transaction {
    pub program_id: Address,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
    signatures: Vec<Address>,
}

impl Transaction {
    pub fn new(
        program_id: Address,
        instruction: &impl BorshSerialize,
        accounts: Vec<AccountMeta>,
    ) -> Self {
        let mut data = Vec::new();
        instruction
            .serialize(&mut data)
            .expect("writing to a Vec cannot fail");
        Transaction {
            program_id,
            accounts,
            data,
            signatures: Vec::new(),
        }
    }

    /// Records the keypair's address as a proven signer.
    pub fn sign(&mut self, keypair: &Keypair) {
        let address = keypair.address();
        if !self.signatures.contains(&address) {
            self.signatures.push(address);
        }
    }

    pub fn is_signed_by(&self, address: &Address) -> bool {
        self.signatures.contains(address)
    }

    /// The first signer account pays the transaction fee.
    pub fn fee_payer(&self) -> Option<&Address> {
        self.accounts
            .iter()
            .find(|meta| meta.is_signer)
            .map(|meta| &meta.address)
    }
}
