use bitcoin::ecdsa::Signature;
use bitcoin::hashes::hash160::Hash as Hash160;
use bitcoin::hashes::Hash;
use bitcoin::locktime::absolute::LockTime;
use bitcoin::script::{Script, ScriptBuf};
use bitcoin::secp256k1::PublicKey;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, Sequence, Transaction, TxIn, TxOut, Witness};
use tracing::{debug, warn};

use crate::errors::{Error, Result};
use crate::scripts::{
    classify_htlc_script, htlc_script_payment_hash160, htlc_script_revocation_hash160,
};
use crate::signing::{p2wsh_sighash, verify_signature, TransactionSigner};
use crate::types::HtlcKind;

// ============================================================================
// HTLC TRANSACTIONS
// ============================================================================

/// Create the second-stage transaction spending one HTLC output.
///
/// For an offered HTLC this is the HTLC-timeout transaction, locked until
/// `cltv_expiry`; for a received HTLC it is the HTLC-success transaction with
/// no locktime. `value` is the output amount after the second-stage fee.
pub fn build_htlc_tx(
    value: u64,
    output_witness_script: &Script,
    kind: HtlcKind,
    cltv_expiry: u32,
    outpoint: OutPoint,
) -> Transaction {
    let lock_time = match kind {
        HtlcKind::Offered => LockTime::from_consensus(cltv_expiry),
        HtlcKind::Received => LockTime::ZERO,
    };

    Transaction {
        version: Version::TWO,
        lock_time,
        input: vec![TxIn {
            previous_output: outpoint,
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ZERO,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(value),
            script_pubkey: output_witness_script.to_p2wsh(),
        }],
    }
}

// ============================================================================
// HTLC WITNESSES
// ============================================================================

/// How an HTLC output is being spent, with exactly the data each path needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignVariant {
    /// Our HTLC-success (received) or HTLC-timeout (offered) transaction,
    /// spent through the 2-of-2 path. Without `remote_sig` no witness is built.
    ToSuccess {
        remote_sig: Option<Signature>,
        preimage: Option<[u8; 32]>,
    },
    /// The peer's offered HTLC claimed directly with the preimage.
    OfferedWithPreimage { preimage: [u8; 32] },
    /// The peer's received HTLC reclaimed after its CLTV expiry.
    ReceivedTimeout,
    /// A revoked received HTLC swept with the revocation key.
    RevokedReceived,
    /// A revoked offered HTLC swept with the revocation key.
    RevokedOffered,
}

impl SignVariant {
    pub fn name(&self) -> &'static str {
        match self {
            SignVariant::ToSuccess { .. } => "to_success",
            SignVariant::OfferedWithPreimage { .. } => "offered_with_preimage",
            SignVariant::ReceivedTimeout => "received_timeout",
            SignVariant::RevokedReceived => "revoked_received",
            SignVariant::RevokedOffered => "revoked_offered",
        }
    }

    fn preimage(&self) -> Option<&[u8; 32]> {
        match self {
            SignVariant::ToSuccess { preimage, .. } => preimage.as_ref(),
            SignVariant::OfferedWithPreimage { preimage } => Some(preimage),
            _ => None,
        }
    }

    fn accepts(&self, script_kind: HtlcKind) -> bool {
        match (self, script_kind) {
            (SignVariant::ToSuccess { preimage, .. }, HtlcKind::Offered) => preimage.is_none(),
            (SignVariant::ToSuccess { preimage, .. }, HtlcKind::Received) => preimage.is_some(),
            (SignVariant::OfferedWithPreimage { .. }, kind) => kind == HtlcKind::Offered,
            (SignVariant::RevokedOffered, kind) => kind == HtlcKind::Offered,
            (SignVariant::ReceivedTimeout, kind) => kind == HtlcKind::Received,
            (SignVariant::RevokedReceived, kind) => kind == HtlcKind::Received,
        }
    }
}

/// The preimage must hash to the script's payment hash, and a revocation
/// spend must be signed by the key the script commits to.
fn witness_data_matches_script(
    variant: &SignVariant,
    signer: &impl TransactionSigner,
    htlc_script: &Script,
) -> bool {
    if let Some(preimage) = variant.preimage() {
        let hash = Hash160::hash(preimage).to_byte_array();
        if htlc_script_payment_hash160(htlc_script) != Some(hash) {
            warn!(variant = variant.name(), "preimage does not match payment hash");
            return false;
        }
    }
    if matches!(
        variant,
        SignVariant::RevokedReceived | SignVariant::RevokedOffered
    ) {
        let hash = Hash160::hash(&signer.pubkey().serialize()).to_byte_array();
        if htlc_script_revocation_hash160(htlc_script) != Some(hash) {
            warn!(variant = variant.name(), "signer is not the revocation key");
            return false;
        }
    }
    true
}

fn require_single_io(tx: &Transaction) -> Result<()> {
    if tx.input.len() != 1 || tx.output.len() != 1 {
        return Err(Error::InvalidShape {
            inputs: tx.input.len(),
            outputs: tx.output.len(),
        });
    }
    Ok(())
}

/// Sign the single input of `tx`, which spends an HTLC output worth `value`
/// locked by `htlc_script`, and attach the witness for `variant`.
///
/// Returns our signature and the witness that was set on the input. A variant
/// that does not fit the script fails with [`Error::InvalidSignVariant`] before
/// signing, including a preimage that does not hash to the script's payment
/// hash and a revocation spend by any key other than the script's revocation key.
pub fn sign_htlc_tx(
    tx: &mut Transaction,
    value: u64,
    signer: &impl TransactionSigner,
    htlc_script: &Script,
    variant: &SignVariant,
) -> Result<(Signature, Witness)> {
    require_single_io(tx)?;

    let script_kind = classify_htlc_script(htlc_script).ok_or(Error::UnknownHtlcScript)?;
    if !variant.accepts(script_kind) || !witness_data_matches_script(variant, signer, htlc_script) {
        return Err(Error::InvalidSignVariant {
            variant: variant.name(),
            script_kind,
        });
    }

    let sighash = p2wsh_sighash(tx, 0, htlc_script, value)?;
    let local_sig = signer.sign_sighash(&sighash)?;
    let local = local_sig.to_vec();
    let script = htlc_script.as_bytes();

    let witness = match variant {
        SignVariant::ToSuccess {
            remote_sig: None, ..
        } => Witness::new(),
        SignVariant::ToSuccess {
            remote_sig: Some(remote_sig),
            preimage,
        } => {
            let remote = remote_sig.to_vec();
            let preimage: &[u8] = match preimage {
                Some(preimage) => preimage,
                None => &[],
            };
            // Leading empty element for the CHECKMULTISIG extra pop.
            Witness::from_slice(&[&[][..], &remote[..], &local[..], preimage, script])
        }
        SignVariant::OfferedWithPreimage { preimage } => {
            Witness::from_slice(&[&local[..], &preimage[..], script])
        }
        SignVariant::ReceivedTimeout => Witness::from_slice(&[&local[..], &[][..], script]),
        SignVariant::RevokedReceived | SignVariant::RevokedOffered => {
            let revocation_pubkey = signer.pubkey().serialize();
            Witness::from_slice(&[&local[..], &revocation_pubkey[..], script])
        }
    };

    debug!(
        variant = variant.name(),
        ?script_kind,
        witness_items = witness.len(),
        "signed htlc transaction"
    );

    tx.input[0].witness = witness.clone();
    Ok((local_sig, witness))
}

/// Check the signatures on an HTLC transaction.
///
/// Every signature that is present must verify against its public key, and at
/// least one must be present. Any shape other than one input and one output
/// fails.
pub fn verify_htlc_tx(
    tx: &Transaction,
    value: u64,
    local_pubkey: Option<&PublicKey>,
    remote_pubkey: Option<&PublicKey>,
    local_sig: Option<&Signature>,
    remote_sig: Option<&Signature>,
    htlc_script: &Script,
) -> bool {
    if require_single_io(tx).is_err() {
        warn!(
            inputs = tx.input.len(),
            outputs = tx.output.len(),
            "htlc transaction has the wrong shape"
        );
        return false;
    }
    if local_sig.is_none() && remote_sig.is_none() {
        return false;
    }

    let sighash = match p2wsh_sighash(tx, 0, htlc_script, value) {
        Ok(sighash) => sighash,
        Err(_) => return false,
    };

    let check = |sig: Option<&Signature>, pubkey: Option<&PublicKey>, role: &str| match (sig, pubkey) {
        (None, _) => true,
        (Some(sig), Some(pubkey)) => {
            let ok = verify_signature(&sighash, sig, pubkey);
            if !ok {
                warn!(role, "htlc signature failed to verify");
            }
            ok
        }
        (Some(_), None) => false,
    };

    check(local_sig, local_pubkey, "local") && check(remote_sig, remote_pubkey, "remote")
}
