// ============================================================================
// FEE CALCULATIONS
// ============================================================================

use tracing::debug;

use crate::config::FeeWeights;
use crate::types::{FeeInfo, HtlcInfo, HtlcKind};

/// Fee in satoshis for `weight` units at `feerate_per_kw`, truncated.
fn weight_to_fee(weight: u64, feerate_per_kw: u32) -> u64 {
    weight * feerate_per_kw as u64 / 1000
}

/// Compute the fees for one commitment.
///
/// Second-stage fees come first; each HTLC is then dust-tested against them at
/// the current feerate, and only the surviving HTLCs add weight to the
/// commitment fee. This is a fixed two-step procedure, not an iteration.
pub fn compute_fees(
    feerate_per_kw: u32,
    dust_limit_satoshi: u64,
    htlcs: &[HtlcInfo],
    weights: &FeeWeights,
) -> FeeInfo {
    compute_fees_for_amounts(
        feerate_per_kw,
        dust_limit_satoshi,
        htlcs.iter().map(|htlc| (htlc.kind, htlc.amount_satoshi())),
        weights,
    )
}

/// [`compute_fees`] over bare `(kind, amount_satoshi)` pairs.
pub fn compute_fees_for_amounts(
    feerate_per_kw: u32,
    dust_limit_satoshi: u64,
    htlcs: impl IntoIterator<Item = (HtlcKind, u64)>,
    weights: &FeeWeights,
) -> FeeInfo {
    let mut fee_info = FeeInfo {
        feerate_per_kw,
        dust_limit_satoshi,
        htlc_success_fee: weight_to_fee(weights.htlc_success, feerate_per_kw),
        htlc_timeout_fee: weight_to_fee(weights.htlc_timeout, feerate_per_kw),
        commit_fee: 0,
    };

    let counted_htlcs = htlcs
        .into_iter()
        .filter(|&(kind, amount)| fee_info.is_htlc_untrimmed(kind, amount))
        .count() as u64;

    let weight = weights.commit_base + weights.commit_per_htlc * counted_htlcs;
    fee_info.commit_fee = weight_to_fee(weight, feerate_per_kw);

    debug!(
        feerate_per_kw,
        counted_htlcs,
        commit_fee = fee_info.commit_fee,
        htlc_success_fee = fee_info.htlc_success_fee,
        htlc_timeout_fee = fee_info.htlc_timeout_fee,
        "computed commitment fees"
    );

    fee_info
}

/// Total value of HTLCs that fall below the dust threshold.
pub fn trimmed_htlc_total(fee_info: &FeeInfo, htlcs: &[HtlcInfo]) -> u64 {
    htlcs
        .iter()
        .filter(|htlc| !fee_info.is_htlc_untrimmed(htlc.kind, htlc.amount_satoshi()))
        .map(HtlcInfo::amount_satoshi)
        .sum()
}

/// The funder's effective cost: commitment fee plus every trimmed HTLC.
pub fn total_commit_cost(fee_info: &FeeInfo, htlcs: &[HtlcInfo]) -> u64 {
    fee_info.commit_fee + trimmed_htlc_total(fee_info, htlcs)
}
