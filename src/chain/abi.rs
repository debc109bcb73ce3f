//! Minimal Solidity ABI support for the staking and token contracts.
//!
//! Only static words plus a single trailing `bytes` argument are needed, so
//! encoding is done by hand rather than through a full ABI codec.

use alloy_primitives::{keccak256, Address, Bytes, U256};

const WORD: usize = 32;

// Staking contract views.
pub const IS_OPEN: &str = "isOpen()";
pub const IS_ACTIVE: &str = "isActive()";
pub const GET_MAX_POOL_SIZE: &str = "getMaxPoolSize()";
pub const GET_TOTAL_PRINCIPAL: &str = "getTotalPrincipal()";
pub const GET_CHAINLINK_TOKEN: &str = "getChainlinkToken()";

// ERC-677 token.
pub const BALANCE_OF: &str = "balanceOf(address)";
pub const TRANSFER_AND_CALL: &str = "transferAndCall(address,uint256,bytes)";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    #[error("{signature}: expected at least {expected} bytes of return data, got {actual}")]
    ShortReturn {
        signature: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{signature}: invalid {kind} word 0x{word}")]
    InvalidWord {
        signature: &'static str,
        kind: &'static str,
        word: String,
    },
}

/// First four bytes of `keccak256(signature)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Calldata for a function with no arguments.
pub fn encode_call(signature: &str) -> Bytes {
    Bytes::copy_from_slice(&selector(signature))
}

pub fn encode_balance_of(owner: Address) -> Bytes {
    let mut out = Vec::with_capacity(4 + WORD);
    out.extend_from_slice(&selector(BALANCE_OF));
    out.extend_from_slice(&address_word(owner));
    out.into()
}

/// `transferAndCall(to, amount, data)`.
///
/// Head: `to`, `amount`, offset of `data` (three words in). Tail: length of
/// `data` followed by its bytes right-padded to a word boundary.
pub fn encode_transfer_and_call(to: Address, amount: U256, data: &[u8]) -> Bytes {
    let padded_len = data.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(4 + WORD * 4 + padded_len);
    out.extend_from_slice(&selector(TRANSFER_AND_CALL));
    out.extend_from_slice(&address_word(to));
    out.extend_from_slice(&amount.to_be_bytes::<WORD>());
    out.extend_from_slice(&U256::from(3 * WORD).to_be_bytes::<WORD>());
    out.extend_from_slice(&U256::from(data.len()).to_be_bytes::<WORD>());
    out.extend_from_slice(data);
    out.resize(out.len() + (padded_len - data.len()), 0);
    out.into()
}

pub fn decode_bool(signature: &'static str, ret: &[u8]) -> Result<bool, AbiError> {
    let word = first_word(signature, ret)?;
    match decode_uint_word(word) {
        w if w == U256::ZERO => Ok(false),
        w if w == U256::from(1u8) => Ok(true),
        _ => Err(invalid(signature, "bool", word)),
    }
}

pub fn decode_uint256(signature: &'static str, ret: &[u8]) -> Result<U256, AbiError> {
    first_word(signature, ret).map(decode_uint_word)
}

pub fn decode_address(signature: &'static str, ret: &[u8]) -> Result<Address, AbiError> {
    let word = first_word(signature, ret)?;
    if word[..12].iter().any(|b| *b != 0) {
        return Err(invalid(signature, "address", word));
    }
    Ok(Address::from_slice(&word[12..]))
}

fn address_word(address: Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_slice());
    word
}

fn first_word<'a>(signature: &'static str, ret: &'a [u8]) -> Result<&'a [u8], AbiError> {
    if ret.len() < WORD {
        return Err(AbiError::ShortReturn {
            signature,
            expected: WORD,
            actual: ret.len(),
        });
    }
    Ok(&ret[..WORD])
}

fn decode_uint_word(word: &[u8]) -> U256 {
    U256::from_be_slice(word)
}

fn invalid(signature: &'static str, kind: &'static str, word: &[u8]) -> AbiError {
    AbiError::InvalidWord {
        signature,
        kind,
        word: hex::encode(word),
    }
}
