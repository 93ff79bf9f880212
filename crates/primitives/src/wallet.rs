//! Signing identities.

use alloy_consensus::{SignableTransaction, Signed, TxEnvelope};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, B256, Bytes, Signature, keccak256};
use k256::ecdsa::SigningKey;
use rand::{CryptoRng, RngCore};
use sha3::{Digest as _, Keccak256};

use crate::WalletError;

/// Derives the Ethereum address of a secp256k1 key.
pub fn address_from_key(key: &SigningKey) -> Address {
    let encoded = key.verifying_key().to_encoded_point(false);
    let pubkey = encoded.as_bytes();
    let hash = keccak256(&pubkey[1..]);
    Address::from_slice(&hash[12..])
}

/// A secp256k1 private key together with its address.
#[derive(Clone)]
pub struct Wallet {
    key: SigningKey,
    address: Address,
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet").field("address", &self.address).finish_non_exhaustive()
    }
}

impl PartialEq for Wallet {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Wallet {}

impl Wallet {
    /// Wraps an existing signing key.
    pub fn new(key: SigningKey) -> Self {
        let address = address_from_key(&key);
        Self { key, address }
    }

    /// Generates a fresh key from the given random source.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::new(SigningKey::random(rng))
    }

    /// Deterministic development key whose scalar is the given seed.
    ///
    /// Seed zero is not a valid scalar and is mapped to one.
    pub fn from_seed(seed: u8) -> Self {
        let mut secret = [0u8; 32];
        secret[31] = seed.max(1);
        Self::from_bytes(&secret).unwrap_or_else(|_| unreachable!("small scalars are valid keys"))
    }

    /// Parses a 32-byte big-endian private key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        if bytes.len() != 32 {
            return Err(WalletError::InvalidLength(bytes.len()));
        }
        let key = SigningKey::from_slice(bytes).map_err(|_| WalletError::InvalidKey)?;
        Ok(Self::new(key))
    }

    /// Parses a hex private key, with or without a `0x` prefix.
    pub fn from_hex(hex_key: &str) -> Result<Self, WalletError> {
        let trimmed = hex_key.trim();
        let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(stripped)?;
        Self::from_bytes(&bytes)
    }

    /// Address controlled by this key.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Underlying signing key.
    pub const fn signing_key(&self) -> &SigningKey {
        &self.key
    }

    /// Hex encoding of the private key with a `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.key.to_bytes()))
    }

    /// Signs a 32-byte prehash and returns a recoverable signature.
    pub fn sign_hash(&self, hash: &B256) -> Result<Signature, WalletError> {
        let (sig, recid) = self
            .key
            .sign_prehash_recoverable(hash.as_slice())
            .map_err(|e| WalletError::Signing(e.to_string()))?;
        Ok(Signature::from((sig, recid)))
    }

    /// Signs a transaction and returns its EIP-2718 encoding.
    pub fn sign_transaction<T>(&self, tx: T) -> Result<SignedTx, WalletError>
    where
        T: SignableTransaction<Signature>,
        TxEnvelope: From<Signed<T>>,
    {
        let digest = Keccak256::new_with_prefix(tx.encoded_for_signing());
        let (sig, recid) = self
            .key
            .sign_digest_recoverable(digest)
            .map_err(|e| WalletError::Signing(e.to_string()))?;
        let signature = Signature::from((sig, recid));
        let envelope = TxEnvelope::from(tx.into_signed(signature));
        let hash = *envelope.tx_hash();
        let raw = Bytes::from(envelope.encoded_2718());
        Ok(SignedTx { hash, raw, envelope })
    }
}

/// A signed transaction ready for submission.
#[derive(Debug, Clone)]
pub struct SignedTx {
    /// Transaction hash.
    pub hash: B256,
    /// EIP-2718 encoded bytes, including any blob sidecar.
    pub raw: Bytes,
    /// Decoded envelope.
    pub envelope: TxEnvelope,
}

impl SignedTx {
    /// Raw bytes as a `0x`-prefixed hex string.
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }
}

#[cfg(test)]
mod tests {
    use alloy_consensus::{Transaction as _, TxEip1559, TxLegacy};
    use alloy_primitives::{TxKind, U256};
    use rand::{SeedableRng as _, rngs::StdRng};

    use super::*;

    #[test]
    fn test_known_address_for_key_one() {
        let wallet = Wallet::from_seed(1);
        assert_eq!(
            wallet.address().to_string().to_lowercase(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_from_hex_accepts_prefix() {
        let key = "0x0000000000000000000000000000000000000000000000000000000000000002";
        let with = Wallet::from_hex(key).expect("with prefix");
        let without = Wallet::from_hex(&key[2..]).expect("without prefix");
        assert_eq!(with, without);
        assert_eq!(with.to_hex(), key);
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert!(matches!(Wallet::from_hex("0x1234"), Err(WalletError::InvalidLength(2))));
        assert!(matches!(Wallet::from_hex("zz"), Err(WalletError::InvalidHex(_))));
        assert!(matches!(Wallet::from_bytes(&[0u8; 32]), Err(WalletError::InvalidKey)));
    }

    #[test]
    fn test_seeded_random_is_deterministic() {
        let a = Wallet::random(&mut StdRng::seed_from_u64(7));
        let b = Wallet::random(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_sign_eip1559_roundtrips_fields() {
        let wallet = Wallet::from_seed(5);
        let tx = TxEip1559 {
            chain_id: 1337,
            nonce: 4,
            gas_limit: 21_000,
            max_fee_per_gas: 2_000_000_000,
            max_priority_fee_per_gas: 1_000_000_000,
            to: TxKind::Call(Address::repeat_byte(0xbb)),
            value: U256::from(1u64),
            access_list: Default::default(),
            input: Bytes::new(),
        };
        let signed = wallet.sign_transaction(tx).expect("sign");
        assert_eq!(signed.envelope.nonce(), 4);
        assert_eq!(signed.envelope.chain_id(), Some(1337));
        assert_eq!(signed.raw[0], 0x02);
        assert!(signed.raw_hex().starts_with("0x02"));
    }

    #[test]
    fn test_sign_legacy_hash_matches_keccak_of_raw() {
        let wallet = Wallet::from_seed(6);
        let tx = TxLegacy {
            chain_id: Some(1),
            nonce: 0,
            gas_price: 1,
            gas_limit: 21_000,
            to: TxKind::Call(Address::ZERO),
            value: U256::ZERO,
            input: Bytes::new(),
        };
        let signed = wallet.sign_transaction(tx).expect("sign");
        assert_eq!(signed.hash, keccak256(&signed.raw));
    }

    #[test]
    fn test_debug_hides_key() {
        let debug = format!("{:?}", Wallet::from_seed(9));
        assert!(debug.contains("address"));
        assert!(!debug.contains("key:"));
    }
}
