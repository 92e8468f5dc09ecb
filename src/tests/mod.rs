
use std::str::FromStr;

use bitcoin::ecdsa::Signature;
use bitcoin::hashes::sha256::Hash as Sha256;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{PublicKey, SecretKey};
use bitcoin::sighash::SegwitV0Sighash;
use bitcoin::{OutPoint, Txid};

use crate::*;

// Shared parameters of BOLT3 Appendix C:
// https://github.com/lightning/bolts/blob/master/03-transactions.md#appendix-c-commitment-and-htlc-transaction-test-vectors
//
//   funding_tx_id: 8984484a580b825b9972d7adb15050b3ab624ccd731946b3eeddb92f4e7ef6be
//   funding_output_index: 0
//   funding_amount_satoshi: 10000000
//   commitment_number: 42
//   local_delay: 144 blocks
//   local_dust_limit_satoshi: 546

pub(crate) const FUNDING_TXID: &str =
    "8984484a580b825b9972d7adb15050b3ab624ccd731946b3eeddb92f4e7ef6be";
pub(crate) const FUNDING_AMOUNT_SATOSHI: u64 = 10_000_000;
pub(crate) const LOCAL_FUNDING_PRIVKEY: &str =
    "30ff4956bbdd3222d44cc5e8a1261dab1e07957bdac5ae88fe3261ef321f3749";
pub(crate) const REMOTE_FUNDING_PUBKEY: &str =
    "030e9f7b623d2ccc7c9bd44d66d5ce21ce504c0acf6385a132cec6d3c39fa711c1";
pub(crate) const FUNDING_WITNESS_SCRIPT: &str = "5221023da092f6980e58d2c037173180e9a465476026ee50f96695963e8efe436f54eb21030e9f7b623d2ccc7c9bd44d66d5ce21ce504c0acf6385a132cec6d3c39fa711c152ae";

pub(crate) const LOCAL_PAYMENT_BASEPOINT: &str =
    "034f355bdcb7cc0af728ef3cceb9615d90684bb5b2ca5f859ab0f0b704075871aa";
pub(crate) const REMOTE_PAYMENT_BASEPOINT: &str =
    "032c0b7cf95324a07d05398b240174dc0c2be444d96b159aa6c7f7b1e668680991";
pub(crate) const REMOTE_PUBKEY: &str =
    "032c0b7cf95324a07d05398b240174dc0c2be444d96b159aa6c7f7b1e668680991";
pub(crate) const LOCAL_HTLC_PUBKEY: &str =
    "030d417a46946384f88d5f3337267c5e579765875dc4daca813e21734b140639e7";
pub(crate) const REMOTE_HTLC_PUBKEY: &str =
    "0394854aa6eab5b2a8122cc726e9dded053a2184d88256816826d6231c068d4a5b";
pub(crate) const LOCAL_REVOCATION_PUBKEY: &str =
    "0212a140cd0c6539d07cd08dfe09984dec3251ea808b892efeac3ede9402bf2b19";
pub(crate) const LOCAL_DELAYED_PUBKEY: &str =
    "03fd5960528dc152014952efdb702a88f71e3c1653b2314431701ec77e57fde83c";
pub(crate) const LOCAL_DELAY: u16 = 144;
pub(crate) const DUST_LIMIT_SATOSHI: u64 = 546;
pub(crate) const COMMITMENT_NUMBER: u64 = 42;

pub(crate) fn pubkey(hex_str: &str) -> PublicKey {
    PublicKey::from_slice(&hex::decode(hex_str).unwrap()).unwrap()
}

/// Parse a DER signature from the vectors and append `SIGHASH_ALL`.
pub(crate) fn signature(der_hex: &str) -> Signature {
    let mut bytes = hex::decode(der_hex).unwrap();
    bytes.push(0x01);
    Signature::from_slice(&bytes).unwrap()
}

pub(crate) fn payment_hash(preimage_byte: u8) -> [u8; 32] {
    Sha256::hash(&[preimage_byte; 32]).to_byte_array()
}

pub(crate) fn bolt3_keys() -> CommitmentKeys {
    // Only the local side's revocation and delayed keys are listed in the
    // vectors; the remote side reuses them as placeholders.
    CommitmentKeys::new(
        SideKeys {
            htlc_pubkey: pubkey(LOCAL_HTLC_PUBKEY),
            revocation_pubkey: pubkey(LOCAL_REVOCATION_PUBKEY),
            delayed_pubkey: pubkey(LOCAL_DELAYED_PUBKEY),
        },
        SideKeys {
            htlc_pubkey: pubkey(REMOTE_HTLC_PUBKEY),
            revocation_pubkey: pubkey(LOCAL_REVOCATION_PUBKEY),
            delayed_pubkey: pubkey(LOCAL_DELAYED_PUBKEY),
        },
    )
}

pub(crate) fn bolt3_to_local_script() -> bitcoin::ScriptBuf {
    build_to_local_script(
        &pubkey(LOCAL_REVOCATION_PUBKEY),
        &pubkey(LOCAL_DELAYED_PUBKEY),
        u32::from(LOCAL_DELAY),
    )
}

pub(crate) fn bolt3_local_funding_signer() -> InMemorySigner {
    let secret =
        SecretKey::from_slice(&hex::decode(LOCAL_FUNDING_PRIVKEY).unwrap()).unwrap();
    InMemorySigner::new(secret)
}

pub(crate) fn bolt3_obscured_number() -> u64 {
    let factor = obscured_factor(
        &pubkey(LOCAL_PAYMENT_BASEPOINT),
        &pubkey(REMOTE_PAYMENT_BASEPOINT),
    );
    obscure_commitment_number(factor, COMMITMENT_NUMBER)
}

/// Commitment inputs for the local side's commitment in the vectors.
pub(crate) fn bolt3_inputs(
    to_local_msat: u64,
    to_remote_msat: u64,
    feerate_per_kw: u32,
    htlcs: Vec<HtlcInfo>,
) -> CommitmentInputs {
    let signer = bolt3_local_funding_signer();
    let witness_script = build_funding_script(&signer.pubkey(), &pubkey(REMOTE_FUNDING_PUBKEY));

    CommitmentInputs {
        funding: FundingInput {
            outpoint: OutPoint {
                txid: Txid::from_str(FUNDING_TXID).unwrap(),
                vout: 0,
            },
            value_satoshi: FUNDING_AMOUNT_SATOSHI,
            witness_script,
        },
        local: LocalOutput {
            value_satoshi: to_local_msat / 1000,
            script: bolt3_to_local_script(),
        },
        remote: RemoteOutput {
            value_satoshi: to_remote_msat / 1000,
            pubkey: pubkey(REMOTE_PUBKEY),
        },
        htlcs,
        fee_info: FeeInfo {
            feerate_per_kw,
            dust_limit_satoshi: DUST_LIMIT_SATOSHI,
            ..FeeInfo::default()
        },
        commitment_format: CommitmentFormat::Legacy,
        obscured_number: bolt3_obscured_number(),
        is_local: true,
    }
}

/// The five HTLCs of the "all five HTLCs untrimmed" vectors, in index order.
pub(crate) fn bolt3_htlcs() -> Vec<HtlcInfo> {
    let keys = bolt3_keys();
    [
        (HtlcKind::Received, 1_000_000, 500, 0x00),
        (HtlcKind::Received, 2_000_000, 501, 0x01),
        (HtlcKind::Offered, 2_000_000, 502, 0x02),
        (HtlcKind::Offered, 3_000_000, 503, 0x03),
        (HtlcKind::Received, 4_000_000, 504, 0x04),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (kind, amount_msat, expiry, preimage))| {
        HtlcInfo::new(kind, i as u16, expiry, amount_msat, payment_hash(preimage), &keys)
    })
    .collect()
}

/// Signer that returns a signature fixed in advance, for vectors whose
/// secret keys are not published.
pub(crate) struct FixedSigner {
    pub pubkey: PublicKey,
    pub signature: Signature,
}

impl TransactionSigner for FixedSigner {
    fn pubkey(&self) -> PublicKey {
        self.pubkey
    }

    fn sign_sighash(&self, _sighash: &SegwitV0Sighash) -> Result<Signature> {
        Ok(self.signature)
    }
}

/// Signer that always fails, standing in for an unavailable remote signer.
pub(crate) struct FailingSigner;

impl TransactionSigner for FailingSigner {
    fn pubkey(&self) -> PublicKey {
        pubkey(LOCAL_HTLC_PUBKEY)
    }

    fn sign_sighash(&self, _sighash: &SegwitV0Sighash) -> Result<Signature> {
        Err(Error::SigningFailed("signer unavailable".to_owned()))
    }
}
