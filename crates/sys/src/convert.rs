use std::{fmt, str::FromStr};

use alloy_primitives::{Address, B256, U256};
use evmc_common::utils::strings::{decode_hex_array, encode_hex};

use crate::{evmc_address, evmc_bytes32};

macro_rules! impl_fixed_bytes {
    ($name:ident, $len:expr) => {
        impl $name {
            /// The all-zero value, used as the canonical null value.
            pub const ZERO: $name = $name { bytes: [0u8; $len] };

            /// Wraps the given bytes.
            pub const fn new(bytes: [u8; $len]) -> Self {
                $name { bytes }
            }

            /// Returns true if every byte is zero.
            pub fn is_zero(&self) -> bool {
                self.bytes.iter().all(|b| *b == 0)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                $name { bytes }
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.bytes
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", encode_hex(&self.bytes))
            }
        }

        impl fmt::LowerHex for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if f.alternate() {
                    write!(f, "0x")?;
                }
                write!(f, "{}", encode_hex(&self.bytes))
            }
        }

        impl FromStr for $name {
            type Err = eyre::Report;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok($name { bytes: decode_hex_array::<$len>(s)? })
            }
        }
    };
}

impl_fixed_bytes!(evmc_address, 20);
impl_fixed_bytes!(evmc_bytes32, 32);

impl evmc_address {
    /// Builds an address whose low 8 bytes hold `value`, big-endian. Handy for precompile-range
    /// addresses such as `0x...0001`.
    pub fn from_low_u64_be(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        evmc_address { bytes }
    }
}

impl evmc_bytes32 {
    /// Builds a 256-bit big-endian integer holding `value`.
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        evmc_bytes32 { bytes }
    }
}

impl From<Address> for evmc_address {
    fn from(address: Address) -> Self {
        evmc_address { bytes: address.0.0 }
    }
}

impl From<evmc_address> for Address {
    fn from(address: evmc_address) -> Self {
        Address::from(address.bytes)
    }
}

impl From<B256> for evmc_bytes32 {
    fn from(word: B256) -> Self {
        evmc_bytes32 { bytes: word.0 }
    }
}

impl From<evmc_bytes32> for B256 {
    fn from(word: evmc_bytes32) -> Self {
        B256::from(word.bytes)
    }
}

impl From<U256> for evmc_bytes32 {
    fn from(value: U256) -> Self {
        evmc_bytes32 { bytes: value.to_be_bytes::<32>() }
    }
}

impl From<evmc_bytes32> for U256 {
    fn from(word: evmc_bytes32) -> Self {
        U256::from_be_bytes(word.bytes)
    }
}
