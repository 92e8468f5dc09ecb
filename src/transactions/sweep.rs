use bitcoin::ecdsa::Signature;
use bitcoin::locktime::absolute::LockTime;
use bitcoin::script::{Script, ScriptBuf};
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, Sequence, Transaction, TxIn, TxOut, Witness};

use crate::errors::{Error, Result};
use crate::signing::{p2wsh_sighash, TransactionSigner};

/// Spend a `to_local` output (or an HTLC transaction output) to `script_pubkey`.
///
/// The delayed path needs `sequence = to_self_delay` for CSV; the revocation
/// path can spend immediately.
pub fn build_to_local_sweep_tx(
    value: u64,
    script_pubkey: ScriptBuf,
    to_self_delay: u16,
    outpoint: OutPoint,
    revoked: bool,
) -> Transaction {
    let sequence = if revoked {
        Sequence::MAX
    } else {
        Sequence::from_height(to_self_delay)
    };

    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: outpoint,
            script_sig: ScriptBuf::new(),
            sequence,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(value),
            script_pubkey,
        }],
    }
}

/// Sign a sweep built by [`build_to_local_sweep_tx`] and attach its witness.
///
/// `signer` holds the delayed key, or the revocation key when `revoked`.
pub fn sign_to_local_sweep(
    tx: &mut Transaction,
    value: u64,
    signer: &impl TransactionSigner,
    to_local_script: &Script,
    revoked: bool,
) -> Result<(Signature, Witness)> {
    if tx.input.len() != 1 || tx.output.len() != 1 {
        return Err(Error::InvalidShape {
            inputs: tx.input.len(),
            outputs: tx.output.len(),
        });
    }

    let sighash = p2wsh_sighash(tx, 0, to_local_script, value)?;
    let sig = signer.sign_sighash(&sighash)?;
    let sig_bytes = sig.to_vec();

    // Non-empty selects the OP_IF revocation branch.
    let branch: &[u8] = if revoked { &[1] } else { &[] };
    let witness = Witness::from_slice(&[&sig_bytes[..], branch, to_local_script.as_bytes()]);

    tx.input[0].witness = witness.clone();
    Ok((sig, witness))
}
