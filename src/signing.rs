use bitcoin::ecdsa::Signature;
use bitcoin::hashes::Hash;
use bitcoin::script::Script;
use bitcoin::secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use bitcoin::sighash::{EcdsaSighashType, SegwitV0Sighash, SighashCache};
use bitcoin::{Amount, Transaction};
use tracing::warn;

use crate::errors::{Error, Result};

// ============================================================================
// SIGNING CAPABILITY
// ============================================================================
//
// Transaction code computes sighashes and assembles witnesses; holding the
// secret and producing the signature is delegated to a TransactionSigner so a
// remote or hardware signer can stand in for the in-memory one.

/// Signs segwit v0 sighashes with a single per-commitment key.
pub trait TransactionSigner {
    /// Public key matching the signing secret.
    fn pubkey(&self) -> PublicKey;

    /// Produce a `SIGHASH_ALL` signature over `sighash`.
    fn sign_sighash(&self, sighash: &SegwitV0Sighash) -> Result<Signature>;
}

/// Signer holding the secret key in process memory.
pub struct InMemorySigner {
    secret_key: SecretKey,
    pubkey: PublicKey,
    secp_ctx: Secp256k1<All>,
}

impl InMemorySigner {
    pub fn new(secret_key: SecretKey) -> Self {
        let secp_ctx = Secp256k1::new();
        let pubkey = PublicKey::from_secret_key(&secp_ctx, &secret_key);
        Self {
            secret_key,
            pubkey,
            secp_ctx,
        }
    }
}

impl TransactionSigner for InMemorySigner {
    fn pubkey(&self) -> PublicKey {
        self.pubkey
    }

    /// Low-S, RFC6979 deterministic ECDSA.
    fn sign_sighash(&self, sighash: &SegwitV0Sighash) -> Result<Signature> {
        let msg = Message::from_digest(sighash.to_byte_array());
        let sig = self.secp_ctx.sign_ecdsa(&msg, &self.secret_key);
        Ok(Signature::sighash_all(sig))
    }
}

/// BIP143 signature hash for a P2WSH input, always `SIGHASH_ALL`.
pub fn p2wsh_sighash(
    tx: &Transaction,
    input_index: usize,
    witness_script: &Script,
    value_satoshi: u64,
) -> Result<SegwitV0Sighash> {
    SighashCache::new(tx)
        .p2wsh_signature_hash(
            input_index,
            witness_script,
            Amount::from_sat(value_satoshi),
            EcdsaSighashType::All,
        )
        .map_err(|_| Error::InvalidShape {
            inputs: tx.input.len(),
            outputs: tx.output.len(),
        })
}

/// Verify a `SIGHASH_ALL` signature over `sighash`.
///
/// Signatures carrying any other sighash type are rejected.
pub fn verify_signature(sighash: &SegwitV0Sighash, sig: &Signature, pubkey: &PublicKey) -> bool {
    if sig.sighash_type != EcdsaSighashType::All {
        warn!(sighash_type = ?sig.sighash_type, "rejecting non SIGHASH_ALL signature");
        return false;
    }

    let secp_ctx = Secp256k1::verification_only();
    let msg = Message::from_digest(sighash.to_byte_array());
    secp_ctx.verify_ecdsa(&msg, &sig.signature, pubkey).is_ok()
}
