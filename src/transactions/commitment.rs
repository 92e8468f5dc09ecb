use bitcoin::ecdsa::Signature;
use bitcoin::hashes::sha256::Hash as Sha256;
use bitcoin::hashes::{Hash, HashEngine};
use bitcoin::locktime::absolute::LockTime;
use bitcoin::script::ScriptBuf;
use bitcoin::secp256k1::PublicKey;
use bitcoin::transaction::Version;
use bitcoin::{Amount, Sequence, Transaction, TxIn, TxOut, Witness};
use tracing::debug;

use crate::config::FeeWeights;
use crate::errors::Result;
use crate::scripts::build_to_remote_script;
use crate::signing::{p2wsh_sighash, TransactionSigner};
use crate::transactions::fees::compute_fees;
use crate::types::{CommitmentInputs, FeeInfo, OutputOrigin, OutputWithMetadata};

/// Obscured commitment numbers are 48 bits wide.
pub const OBSCURED_NUMBER_MASK: u64 = 0xFFFF_FFFF_FFFF;

const SEQUENCE_MARKER: u32 = 0x8000_0000;
const LOCKTIME_MARKER: u32 = 0x2000_0000;
const LOW_24_BITS: u64 = 0xFF_FFFF;

// ============================================================================
// OBSCURED COMMITMENT NUMBER
// ============================================================================

/// Per-channel obscuring factor: the low 48 bits of
/// `SHA256(open_payment_basepoint || accept_payment_basepoint)`, big-endian.
pub fn obscured_factor(
    open_payment_basepoint: &PublicKey,
    accept_payment_basepoint: &PublicKey,
) -> u64 {
    let mut sha = Sha256::engine();
    sha.input(&open_payment_basepoint.serialize());
    sha.input(&accept_payment_basepoint.serialize());
    let res = Sha256::from_engine(sha).to_byte_array();

    res[26..]
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | *byte as u64)
}

pub fn obscure_commitment_number(factor: u64, commitment_number: u64) -> u64 {
    (factor ^ commitment_number) & OBSCURED_NUMBER_MASK
}

/// Funding input sequence carrying the upper 24 bits of the obscured number.
pub fn commitment_sequence(obscured_number: u64) -> Sequence {
    Sequence(SEQUENCE_MARKER | ((obscured_number >> 24) & LOW_24_BITS) as u32)
}

/// Transaction locktime carrying the lower 24 bits of the obscured number.
pub fn commitment_locktime(obscured_number: u64) -> LockTime {
    LockTime::from_consensus(LOCKTIME_MARKER | (obscured_number & LOW_24_BITS) as u32)
}

/// Recover the obscured number from a commitment's sequence and locktime.
///
/// Returns `None` if either field lacks its marker byte.
pub fn decode_obscured_number(sequence: Sequence, lock_time: LockTime) -> Option<u64> {
    let lock_time = lock_time.to_consensus_u32();
    if sequence.0 >> 24 != SEQUENCE_MARKER >> 24 || lock_time >> 24 != LOCKTIME_MARKER >> 24 {
        return None;
    }
    let upper = (sequence.0 as u64) & LOW_24_BITS;
    let lower = (lock_time as u64) & LOW_24_BITS;
    Some((upper << 24) | lower)
}

// ============================================================================
// OUTPUT ORDERING
// ============================================================================

/// Sort outputs according to BOLT 3 (BIP69-style):
/// first by value, then by scriptPubKey, then by CLTV expiry.
pub fn sort_outputs(outputs: &mut [OutputWithMetadata]) {
    outputs.sort_by(|a, b| {
        a.value
            .cmp(&b.value)
            .then(a.script.cmp(&b.script))
            .then(a.cltv_expiry.cmp(&b.cltv_expiry))
    });
}

// ============================================================================
// COMMITMENT ASSEMBLY
// ============================================================================

/// An output left off the commitment because it did not clear the dust threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimmedOutput {
    pub origin: OutputOrigin,
    pub value_satoshi: u64,
}

/// A commitment transaction with our detached signature over its funding input.
///
/// The witness is left empty: completing it requires the peer's signature.
#[derive(Debug, Clone)]
pub struct SignedCommitment {
    pub tx: Transaction,
    pub signature: Signature,
    /// Fees as recomputed for this commitment.
    pub fee_info: FeeInfo,
    /// Output index of each `CommitmentInputs::htlcs` entry, `None` if trimmed.
    pub htlc_output_indices: Vec<Option<u32>>,
    pub trimmed: Vec<TrimmedOutput>,
}

impl SignedCommitment {
    /// True if any output was below dust and its value folded into the fee.
    pub fn dust_folded(&self) -> bool {
        !self.trimmed.is_empty()
    }
}

/// Collects outputs that pass the dust test and records the ones that don't.
struct OutputSet {
    dust_limit_satoshi: u64,
    outputs: Vec<OutputWithMetadata>,
    trimmed: Vec<TrimmedOutput>,
}

impl OutputSet {
    fn new(dust_limit_satoshi: u64) -> Self {
        OutputSet {
            dust_limit_satoshi,
            outputs: Vec::new(),
            trimmed: Vec::new(),
        }
    }

    /// Add the output if `value >= dust_limit + fee`. `deduct` selects whether
    /// the fee is taken out of the output or only used as a threshold.
    fn offer(
        &mut self,
        origin: OutputOrigin,
        value: u64,
        fee: u64,
        deduct: bool,
        script: ScriptBuf,
        cltv_expiry: Option<u32>,
    ) {
        let threshold = self.dust_limit_satoshi.saturating_add(fee);
        if value < threshold {
            debug!(?origin, value, threshold, "trimmed output below dust");
            self.trimmed.push(TrimmedOutput {
                origin,
                value_satoshi: value,
            });
            return;
        }

        let value = if deduct { value - fee } else { value };
        debug!(?origin, value, "added output");
        self.outputs.push(OutputWithMetadata {
            value,
            script,
            cltv_expiry,
            origin,
        });
    }
}

/// Assemble and sign the commitment transaction described by `inputs`.
///
/// Fees are recomputed from `inputs.fee_info.feerate_per_kw` and the weights of
/// `inputs.commitment_format`. The funder (`is_local` selects which side that
/// is) pays the commitment fee out of its own output; HTLC outputs only use
/// their second-stage fee as an inclusion threshold.
pub fn build_commitment(
    inputs: &CommitmentInputs,
    signer: &impl TransactionSigner,
) -> Result<SignedCommitment> {
    let weights = FeeWeights::for_format(inputs.commitment_format);
    let fee_info = compute_fees(
        inputs.fee_info.feerate_per_kw,
        inputs.fee_info.dust_limit_satoshi,
        &inputs.htlcs,
        &weights,
    );

    let (fee_local, fee_remote) = if inputs.is_local {
        (fee_info.commit_fee, 0)
    } else {
        (0, fee_info.commit_fee)
    };

    let mut set = OutputSet::new(fee_info.dust_limit_satoshi);

    set.offer(
        OutputOrigin::ToRemote,
        inputs.remote.value_satoshi,
        fee_remote,
        true,
        build_to_remote_script(&inputs.remote.pubkey),
        None,
    );

    set.offer(
        OutputOrigin::ToLocal,
        inputs.local.value_satoshi,
        fee_local,
        true,
        inputs.local.script.to_p2wsh(),
        None,
    );

    for (i, htlc) in inputs.htlcs.iter().enumerate() {
        set.offer(
            OutputOrigin::Htlc(i),
            htlc.amount_satoshi(),
            fee_info.htlc_fee(htlc.kind),
            false,
            htlc.script.to_p2wsh(),
            Some(htlc.expiry),
        );
    }

    let OutputSet {
        mut outputs,
        trimmed,
        ..
    } = set;
    sort_outputs(&mut outputs);

    let mut htlc_output_indices = vec![None; inputs.htlcs.len()];
    for (index, output) in outputs.iter().enumerate() {
        if let OutputOrigin::Htlc(i) = output.origin {
            htlc_output_indices[i] = Some(index as u32);
        }
    }

    let tx = Transaction {
        version: Version::TWO,
        lock_time: commitment_locktime(inputs.obscured_number),
        input: vec![TxIn {
            previous_output: inputs.funding.outpoint,
            script_sig: ScriptBuf::new(),
            sequence: commitment_sequence(inputs.obscured_number),
            witness: Witness::new(),
        }],
        output: outputs
            .iter()
            .map(|meta| TxOut {
                value: Amount::from_sat(meta.value),
                script_pubkey: meta.script.clone(),
            })
            .collect(),
    };

    let sighash = p2wsh_sighash(
        &tx,
        0,
        &inputs.funding.witness_script,
        inputs.funding.value_satoshi,
    )?;
    let signature = signer.sign_sighash(&sighash)?;

    debug!(
        txid = %tx.compute_txid(),
        outputs = tx.output.len(),
        trimmed = trimmed.len(),
        commit_fee = fee_info.commit_fee,
        "built commitment transaction"
    );

    Ok(SignedCommitment {
        tx,
        signature,
        fee_info,
        htlc_output_indices,
        trimmed,
    })
}

/// Complete the funding input witness of a commitment once both signatures are known.
///
/// `local_first` is true when our funding key sorts first in the 2-of-2 script.
pub fn finalize_commitment(
    commitment: &SignedCommitment,
    remote_signature: &Signature,
    funding_witness_script: &ScriptBuf,
    local_first: bool,
) -> Transaction {
    let local = commitment.signature.to_vec();
    let remote = remote_signature.to_vec();
    let (first, second) = if local_first {
        (&local, &remote)
    } else {
        (&remote, &local)
    };

    let mut tx = commitment.tx.clone();
    // Leading empty element for the CHECKMULTISIG extra pop.
    tx.input[0].witness = Witness::from_slice(&[
        &[][..],
        &first[..],
        &second[..],
        funding_witness_script.as_bytes(),
    ]);
    tx
}
