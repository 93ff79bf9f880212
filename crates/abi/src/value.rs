//! Typed ABI values.

use alloy_primitives::{Address, I256, U256};

/// A value that can be ABI encoded.
///
/// Fixed and dynamic arrays share the `Array` variant; the type decides how it is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    /// Unsigned integer of any width.
    Uint(U256),
    /// Signed integer of any width.
    Int(I256),
    /// 20-byte address.
    Address(Address),
    /// Boolean.
    Bool(bool),
    /// `bytesM` contents, exactly M bytes long.
    FixedBytes(Vec<u8>),
    /// Dynamic byte string.
    Bytes(Vec<u8>),
    /// UTF-8 string.
    String(String),
    /// Elements of a fixed or dynamic array.
    Array(Vec<AbiValue>),
    /// Tuple components.
    Tuple(Vec<AbiValue>),
}

impl AbiValue {
    /// Unsigned integer from a `u64`.
    pub fn uint(value: u64) -> Self {
        Self::Uint(U256::from(value))
    }
}

impl From<Address> for AbiValue {
    fn from(value: Address) -> Self {
        Self::Address(value)
    }
}

impl From<U256> for AbiValue {
    fn from(value: U256) -> Self {
        Self::Uint(value)
    }
}

impl From<bool> for AbiValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<u8>> for AbiValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}
