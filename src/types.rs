use bitcoin::script::ScriptBuf;
use bitcoin::secp256k1::PublicKey;
use bitcoin::OutPoint;
use serde::Serialize;

use crate::config::CommitmentFormat;
use crate::scripts::build_htlc_script;

// ============================================================================
// HTLC STRUCTURES
// ============================================================================

/// Direction of an HTLC relative to the owner of the commitment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HtlcKind {
    /// We offered it: claimable by the peer with the preimage, by us after timeout.
    Offered,
    /// We received it: claimable by us with the preimage, by the peer after timeout.
    Received,
}

/// One pending HTLC as it appears on a commitment transaction.
///
/// `script` is the witness script for the HTLC output. It is regenerated every
/// time a commitment is built and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtlcInfo {
    pub kind: HtlcKind,
    pub htlc_index: u16,
    pub expiry: u32,
    pub amount_msat: u64,
    pub payment_hash: [u8; 32],
    pub script: ScriptBuf,
}

impl HtlcInfo {
    /// Creates the HTLC and builds its witness script from the commitment keys.
    pub fn new(
        kind: HtlcKind,
        htlc_index: u16,
        expiry: u32,
        amount_msat: u64,
        payment_hash: [u8; 32],
        keys: &CommitmentKeys,
    ) -> Self {
        let script = build_htlc_script(kind, keys, &payment_hash, expiry);
        HtlcInfo {
            kind,
            htlc_index,
            expiry,
            amount_msat,
            payment_hash,
            script,
        }
    }

    /// Amount in whole satoshis, truncating sub-satoshi msat.
    pub fn amount_satoshi(&self) -> u64 {
        self.amount_msat / 1000
    }
}

// ============================================================================
// FEE STRUCTURES
// ============================================================================

/// Fees for one commitment, derived from `feerate_per_kw`.
///
/// Only `feerate_per_kw` and `dust_limit_satoshi` are inputs; the three fee
/// fields are recomputed by [`crate::compute_fees`] every time a commitment is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeeInfo {
    pub feerate_per_kw: u32,
    pub dust_limit_satoshi: u64,
    pub htlc_success_fee: u64,
    pub htlc_timeout_fee: u64,
    pub commit_fee: u64,
}

impl FeeInfo {
    /// Fee that an HTLC of the given kind must cover on top of the dust limit.
    pub fn htlc_fee(&self, kind: HtlcKind) -> u64 {
        match kind {
            HtlcKind::Offered => self.htlc_timeout_fee,
            HtlcKind::Received => self.htlc_success_fee,
        }
    }

    /// Returns true if an HTLC output of `amount_satoshi` survives the dust test.
    pub fn is_htlc_untrimmed(&self, kind: HtlcKind, amount_satoshi: u64) -> bool {
        amount_satoshi >= self.dust_limit_satoshi.saturating_add(self.htlc_fee(kind))
    }
}

// ============================================================================
// KEY STRUCTURES
// ============================================================================

/// Per-commitment public keys of one side of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideKeys {
    pub htlc_pubkey: PublicKey,
    pub revocation_pubkey: PublicKey,
    pub delayed_pubkey: PublicKey,
}

/// Keys for one commitment, as supplied by the per-commitment key schedule.
///
/// `local` is the side whose commitment transaction is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitmentKeys {
    pub local: SideKeys,
    pub remote: SideKeys,
}

impl CommitmentKeys {
    pub fn new(local: SideKeys, remote: SideKeys) -> Self {
        CommitmentKeys { local, remote }
    }

    /// The same keys seen from the peer, used to build the peer's view of a commitment.
    pub fn swapped(&self) -> Self {
        CommitmentKeys {
            local: self.remote,
            remote: self.local,
        }
    }
}

// ============================================================================
// COMMITMENT INPUTS
// ============================================================================

/// The 2-of-2 funding output spent by every commitment transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingInput {
    pub outpoint: OutPoint,
    pub value_satoshi: u64,
    /// The 2-of-2 multisig witness script, used as the sighash script code.
    pub witness_script: ScriptBuf,
}

/// The delayed `to_local` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalOutput {
    pub value_satoshi: u64,
    /// Witness script from [`crate::build_to_local_script`].
    pub script: ScriptBuf,
}

/// The immediately spendable P2WPKH `to_remote` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteOutput {
    pub value_satoshi: u64,
    pub pubkey: PublicKey,
}

/// Everything needed to assemble one commitment transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitmentInputs {
    pub funding: FundingInput,
    pub local: LocalOutput,
    pub remote: RemoteOutput,
    pub htlcs: Vec<HtlcInfo>,
    /// Only `feerate_per_kw` and `dust_limit_satoshi` are read; the fees are
    /// recomputed with the weights of `commitment_format`.
    pub fee_info: FeeInfo,
    pub commitment_format: CommitmentFormat,
    /// 48-bit obscured commitment number.
    pub obscured_number: u64,
    /// True if the local side is the funder and pays the commitment fee.
    pub is_local: bool,
}

// ============================================================================
// OUTPUT SORTING STRUCTURES
// ============================================================================

/// What a commitment output pays to, tracked through BIP69 sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputOrigin {
    ToRemote,
    ToLocal,
    /// Position of the HTLC in `CommitmentInputs::htlcs`.
    Htlc(usize),
}

#[derive(Debug, Clone)]
pub struct OutputWithMetadata {
    pub value: u64,
    pub script: ScriptBuf,
    pub cltv_expiry: Option<u32>,
    pub origin: OutputOrigin,
}
