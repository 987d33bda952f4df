use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Domain markers keep keypair-backed and derived addresses in disjoint
/// images of the hash; neither can collide with the other.
const KEYPAIR_MARKER: &[u8] = b"ledger:keypair";
const DERIVED_MARKER: &[u8] = b"ledger:derived";

/// Owner tag for ordinary externally-controlled accounts; also the id of
/// the allocation service referenced by transactions that create records.
pub const SYSTEM_ID: Address = Address([0u8; 32]);

/// Transaction fees accumulate here.
pub const FEE_COLLECTOR: Address = {
    let mut bytes = [0u8; 32];
    bytes[31] = 1;
    Address(bytes)
};

#[derive(
    BorshSerialize, BorshDeserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Address([u8; 32]);

impl Address {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Addresses with a leading zero byte are reserved for built-in
    /// service accounts; derivation and keypair generation never yield one.
    pub fn is_reserved(&self) -> bool {
        self.0[0] == 0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseAddressError {
    #[error("address is not valid hex")]
    Hex(#[from] hex::FromHexError),
    #[error("address must be exactly 32 bytes")]
    Length,
}

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ParseAddressError::Length)?;
        Ok(Address(bytes))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeriveError {
    #[error("derivation landed in the reserved address namespace")]
    ReservedAddress,
}

/// Computes the program-controlled address for `(seed, input, tag)`. Pure:
/// the same inputs always yield the same address. No keypair maps to the
/// result, so only program logic can move funds held there.
pub fn derive_address(
    seed: &[u8],
    input: &Address,
    tag: u8,
    program_id: &Address,
) -> Result<Address, DeriveError> {
    let mut hasher = Sha256::new();
    hasher.update(seed);
    hasher.update(input.as_bytes());
    hasher.update([tag]);
    hasher.update(program_id.as_bytes());
    hasher.update(DERIVED_MARKER);
    let address = Address(hasher.finalize().into());
    if address.is_reserved() {
        return Err(DeriveError::ReservedAddress);
    }
    Ok(address)
}

/// Scans tags from 255 downward and returns the first derivation outside
/// the reserved namespace, together with the tag that produced it. Callers
/// persist the tag so the address can be re-verified later.
pub fn find_derived_address(seed: &[u8], input: &Address, program_id: &Address) -> (Address, u8) {
    for tag in (0..=u8::MAX).rev() {
        if let Ok(address) = derive_address(seed, input, tag, program_id) {
            return (address, tag);
        }
    }
    // 256 consecutive reserved digests would require a 2^-2048 fluke.
    unreachable!("no viable derivation tag for seed {:?}", seed);
}

/// An externally-held signing capability. Possession of the value is the
/// authorization: `Transaction::sign` records the keypair's address as
/// proven, standing in for the wallet layer of a full deployment.
pub struct Keypair {
    secret: [u8; 32],
}

impl Keypair {
    pub fn generate() -> Self {
        loop {
            let mut secret = [0u8; 32];
            OsRng.fill_bytes(&mut secret);
            let keypair = Keypair { secret };
            if !keypair.address().is_reserved() {
                return keypair;
            }
        }
    }

    pub fn from_bytes(secret: [u8; 32]) -> Self {
        Keypair { secret }
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.secret
    }

    pub fn address(&self) -> Address {
        let mut hasher = Sha256::new();
        hasher.update(KEYPAIR_MARKER);
        hasher.update(self.secret);
        Address(hasher.finalize().into())
    }
}
