//! Transaction building and signing.
//!
//! Stake transactions are legacy (gas price) transactions with EIP-155
//! replay protection, RLP-encoded by hand against `alloy_rlp` and signed
//! locally with the operator's secp256k1 key.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{length_of_length, BufMut, Encodable, Header};
use k256::ecdsa::SigningKey;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// The operator account. The key stays wrapped in `SecretString` and is
/// only exposed to build the signing key.
pub struct Account {
    private_key: SecretString,
    address: Address,
}

impl Account {
    /// Load from a `0x`-prefixed 32-byte hex key.
    pub fn from_private_key(private_key: SecretString) -> Result<Self, String> {
        let signing_key = signing_key(&private_key)?;
        let address = address_of(&signing_key);
        Ok(Self {
            private_key,
            address,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign `tx`, returning the raw bytes ready for broadcast.
    pub fn sign(&self, tx: &LegacyTransaction) -> Result<SignedTransaction, String> {
        let key = signing_key(&self.private_key)?;
        let sighash = keccak256(alloy_rlp::encode(UnsignedPayload(tx)));
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(sighash.as_slice())
            .map_err(|e| format!("ecdsa signing failed: {e}"))?;

        let bytes = signature.to_bytes();
        let r = U256::from_be_slice(&bytes[..32]);
        let s = U256::from_be_slice(&bytes[32..]);
        let v = u64::from(recovery_id.to_byte()) + 35 + tx.chain_id * 2;

        let raw = alloy_rlp::encode(SignedPayload { tx, v, r, s });
        let hash = keccak256(&raw);
        Ok(SignedTransaction {
            raw: raw.into(),
            hash,
        })
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

fn signing_key(private_key: &SecretString) -> Result<SigningKey, String> {
    let hex_key: &str = private_key.expose_secret();
    let stripped = hex_key.strip_prefix("0x").unwrap_or(hex_key);
    let bytes = hex::decode(stripped).map_err(|_| "private key is not valid hex".to_string())?;
    if bytes.len() != 32 {
        return Err(format!("private key must be 32 bytes, got {}", bytes.len()));
    }
    SigningKey::from_slice(&bytes).map_err(|_| "private key is not a valid secp256k1 scalar".to_string())
}

/// Ethereum address: last 20 bytes of keccak256 of the uncompressed public
/// key without its `0x04` tag.
fn address_of(key: &SigningKey) -> Address {
    let point = key.verifying_key().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// A fully specified legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl LegacyTransaction {
    fn fields_length(&self) -> usize {
        self.nonce.length()
            + self.gas_price.length()
            + self.gas_limit.length()
            + self.to.length()
            + self.value.length()
            + self.data.length()
    }

    fn encode_fields(&self, out: &mut dyn BufMut) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        self.to.encode(out);
        self.value.encode(out);
        self.data.encode(out);
    }
}

/// Raw signed bytes and the resulting transaction hash.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub hash: B256,
}

/// EIP-155 signing payload: the six fields followed by `chain_id, 0, 0`.
struct UnsignedPayload<'a>(&'a LegacyTransaction);

impl UnsignedPayload<'_> {
    fn payload_length(&self) -> usize {
        self.0.fields_length() + self.0.chain_id.length() + 0u8.length() * 2
    }
}

impl Encodable for UnsignedPayload<'_> {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        self.0.encode_fields(out);
        self.0.chain_id.encode(out);
        0u8.encode(out);
        0u8.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + length_of_length(payload_length)
    }
}

struct SignedPayload<'a> {
    tx: &'a LegacyTransaction,
    v: u64,
    r: U256,
    s: U256,
}

impl SignedPayload<'_> {
    fn payload_length(&self) -> usize {
        self.tx.fields_length() + self.v.length() + self.r.length() + self.s.length()
    }
}

impl Encodable for SignedPayload<'_> {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        self.tx.encode_fields(out);
        self.v.encode(out);
        self.r.encode(out);
        self.s.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + length_of_length(payload_length)
    }
}
