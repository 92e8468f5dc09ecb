use bitcoin::blockdata::opcodes::all as opcodes;
use bitcoin::hashes::hash160::Hash as Hash160;
use bitcoin::hashes::ripemd160::Hash as Ripemd160;
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, Script, ScriptBuf};
use bitcoin::secp256k1::PublicKey;

use crate::types::{CommitmentKeys, HtlcKind};

// Byte offsets into the HTLC script templates.
const REVOCATION_HASH_START: usize = 3;
const REMOTE_KEY_START: usize = 28;
const BRANCH_OPCODE: usize = 66;
const OFFERED_PAYMENT_HASH_START: usize = 109;
const RECEIVED_PAYMENT_HASH_START: usize = 69;
const OFFERED_LEN: usize = 133;
// `<cltv_expiry>` is a minimal push of 1 to 6 bytes.
const RECEIVED_LEN: std::ops::RangeInclusive<usize> = 136..=141;

/// Create the offered HTLC witness script.
///
/// Spendable by the revocation key, by both HTLC keys through the HTLC-timeout
/// transaction (witness element is not 32 bytes), or by the remote HTLC key
/// with a preimage whose HASH160 is `payment_hash160`.
pub fn build_offered_htlc_script(
    local_htlc_pubkey: &PublicKey,
    local_revocation_pubkey: &PublicKey,
    payment_hash160: &[u8; 20],
    remote_htlc_pubkey: &PublicKey,
) -> ScriptBuf {
    let revocation_pubkey_hash = Hash160::hash(&local_revocation_pubkey.serialize());

    // OP_DUP OP_HASH160 <HASH160(revocationpubkey)> OP_EQUAL
    // OP_IF
    //     OP_CHECKSIG
    // OP_ELSE
    //     <remote_htlcpubkey> OP_SWAP OP_SIZE 32 OP_EQUAL
    //     OP_NOTIF
    //         OP_DROP 2 OP_SWAP <local_htlcpubkey> 2 OP_CHECKMULTISIG
    //     OP_ELSE
    //         OP_HASH160 <RIPEMD160(payment_hash)> OP_EQUALVERIFY
    //         OP_CHECKSIG
    //     OP_ENDIF
    // OP_ENDIF
    Builder::new()
        .push_opcode(opcodes::OP_DUP)
        .push_opcode(opcodes::OP_HASH160)
        .push_slice(revocation_pubkey_hash.as_byte_array())
        .push_opcode(opcodes::OP_EQUAL)
        .push_opcode(opcodes::OP_IF)
        .push_opcode(opcodes::OP_CHECKSIG)
        .push_opcode(opcodes::OP_ELSE)
        .push_slice(remote_htlc_pubkey.serialize())
        .push_opcode(opcodes::OP_SWAP)
        .push_opcode(opcodes::OP_SIZE)
        .push_int(32)
        .push_opcode(opcodes::OP_EQUAL)
        .push_opcode(opcodes::OP_NOTIF)
        .push_opcode(opcodes::OP_DROP)
        .push_int(2)
        .push_opcode(opcodes::OP_SWAP)
        .push_slice(local_htlc_pubkey.serialize())
        .push_int(2)
        .push_opcode(opcodes::OP_CHECKMULTISIG)
        .push_opcode(opcodes::OP_ELSE)
        .push_opcode(opcodes::OP_HASH160)
        .push_slice(payment_hash160)
        .push_opcode(opcodes::OP_EQUALVERIFY)
        .push_opcode(opcodes::OP_CHECKSIG)
        .push_opcode(opcodes::OP_ENDIF)
        .push_opcode(opcodes::OP_ENDIF)
        .into_script()
}

/// Create the received HTLC witness script.
///
/// Spendable by the revocation key, by both HTLC keys with the preimage through
/// the HTLC-success transaction, or by the remote HTLC key after `cltv_expiry`.
pub fn build_received_htlc_script(
    local_htlc_pubkey: &PublicKey,
    local_revocation_pubkey: &PublicKey,
    remote_htlc_pubkey: &PublicKey,
    payment_hash160: &[u8; 20],
    cltv_expiry: u32,
) -> ScriptBuf {
    let revocation_pubkey_hash = Hash160::hash(&local_revocation_pubkey.serialize());

    // OP_DUP OP_HASH160 <HASH160(revocationpubkey)> OP_EQUAL
    // OP_IF
    //     OP_CHECKSIG
    // OP_ELSE
    //     <remote_htlcpubkey> OP_SWAP OP_SIZE 32 OP_EQUAL
    //     OP_IF
    //         OP_HASH160 <RIPEMD160(payment_hash)> OP_EQUALVERIFY
    //         2 OP_SWAP <local_htlcpubkey> 2 OP_CHECKMULTISIG
    //     OP_ELSE
    //         OP_DROP <cltv_expiry> OP_CHECKLOCKTIMEVERIFY OP_DROP
    //         OP_CHECKSIG
    //     OP_ENDIF
    // OP_ENDIF
    Builder::new()
        .push_opcode(opcodes::OP_DUP)
        .push_opcode(opcodes::OP_HASH160)
        .push_slice(revocation_pubkey_hash.as_byte_array())
        .push_opcode(opcodes::OP_EQUAL)
        .push_opcode(opcodes::OP_IF)
        .push_opcode(opcodes::OP_CHECKSIG)
        .push_opcode(opcodes::OP_ELSE)
        .push_slice(remote_htlc_pubkey.serialize())
        .push_opcode(opcodes::OP_SWAP)
        .push_opcode(opcodes::OP_SIZE)
        .push_int(32)
        .push_opcode(opcodes::OP_EQUAL)
        .push_opcode(opcodes::OP_IF)
        .push_opcode(opcodes::OP_HASH160)
        .push_slice(payment_hash160)
        .push_opcode(opcodes::OP_EQUALVERIFY)
        .push_int(2)
        .push_opcode(opcodes::OP_SWAP)
        .push_slice(local_htlc_pubkey.serialize())
        .push_int(2)
        .push_opcode(opcodes::OP_CHECKMULTISIG)
        .push_opcode(opcodes::OP_ELSE)
        .push_opcode(opcodes::OP_DROP)
        .push_int(cltv_expiry as i64)
        .push_opcode(opcodes::OP_CLTV)
        .push_opcode(opcodes::OP_DROP)
        .push_opcode(opcodes::OP_CHECKSIG)
        .push_opcode(opcodes::OP_ENDIF)
        .push_opcode(opcodes::OP_ENDIF)
        .into_script()
}

/// Build the witness script for an HTLC on the commitment owned by `keys.local`.
///
/// `payment_hash` is the SHA256 of the preimage; the script commits to its RIPEMD160.
pub fn build_htlc_script(
    kind: HtlcKind,
    keys: &CommitmentKeys,
    payment_hash: &[u8; 32],
    expiry: u32,
) -> ScriptBuf {
    let payment_hash160 = Ripemd160::hash(payment_hash).to_byte_array();

    match kind {
        HtlcKind::Offered => build_offered_htlc_script(
            &keys.local.htlc_pubkey,
            &keys.local.revocation_pubkey,
            &payment_hash160,
            &keys.remote.htlc_pubkey,
        ),
        HtlcKind::Received => build_received_htlc_script(
            &keys.local.htlc_pubkey,
            &keys.local.revocation_pubkey,
            &keys.remote.htlc_pubkey,
            &payment_hash160,
            expiry,
        ),
    }
}

/// Recognise an HTLC witness script built by this module.
///
/// Both templates share the revocation and remote-key prefix; the opcode after
/// `OP_SIZE 32 OP_EQUAL` is `OP_NOTIF` for offered and `OP_IF` for received.
pub fn classify_htlc_script(script: &Script) -> Option<HtlcKind> {
    let b = script.as_bytes();
    if b.len() <= BRANCH_OPCODE {
        return None;
    }

    let prefix_ok = b[0] == opcodes::OP_DUP.to_u8()
        && b[1] == opcodes::OP_HASH160.to_u8()
        && b[2] == 20
        && b[REVOCATION_HASH_START + 20] == opcodes::OP_EQUAL.to_u8()
        && b[24] == opcodes::OP_IF.to_u8()
        && b[25] == opcodes::OP_CHECKSIG.to_u8()
        && b[26] == opcodes::OP_ELSE.to_u8()
        && b[27] == 33
        && b[REMOTE_KEY_START + 33] == opcodes::OP_SWAP.to_u8()
        && b[62] == opcodes::OP_SIZE.to_u8()
        && b[63] == 1
        && b[64] == 32
        && b[65] == opcodes::OP_EQUAL.to_u8();
    if !prefix_ok {
        return None;
    }

    let branch = b[BRANCH_OPCODE];
    if branch == opcodes::OP_NOTIF.to_u8() && b.len() == OFFERED_LEN {
        Some(HtlcKind::Offered)
    } else if branch == opcodes::OP_IF.to_u8()
        && RECEIVED_LEN.contains(&b.len())
        && has_received_timeout_branch(b)
    {
        Some(HtlcKind::Received)
    } else {
        None
    }
}

/// `OP_ELSE OP_DROP <cltv_expiry> OP_CLTV OP_DROP OP_CHECKSIG OP_ENDIF OP_ENDIF`
fn has_received_timeout_branch(b: &[u8]) -> bool {
    let tail = [
        opcodes::OP_CLTV.to_u8(),
        opcodes::OP_DROP.to_u8(),
        opcodes::OP_CHECKSIG.to_u8(),
        opcodes::OP_ENDIF.to_u8(),
        opcodes::OP_ENDIF.to_u8(),
    ];
    b[127] == opcodes::OP_CHECKMULTISIG.to_u8()
        && b[128] == opcodes::OP_ELSE.to_u8()
        && b[129] == opcodes::OP_DROP.to_u8()
        && b.ends_with(&tail)
}

/// Extract the HASH160 of the revocation pubkey committed to by an HTLC
/// witness script.
pub fn htlc_script_revocation_hash160(script: &Script) -> Option<[u8; 20]> {
    classify_htlc_script(script)?;
    let mut hash = [0u8; 20];
    hash.copy_from_slice(
        script
            .as_bytes()
            .get(REVOCATION_HASH_START..REVOCATION_HASH_START + 20)?,
    );
    Some(hash)
}

/// Extract the RIPEMD160 payment hash committed to by an HTLC witness script.
pub fn htlc_script_payment_hash160(script: &Script) -> Option<[u8; 20]> {
    let start = match classify_htlc_script(script)? {
        HtlcKind::Offered => OFFERED_PAYMENT_HASH_START,
        HtlcKind::Received => RECEIVED_PAYMENT_HASH_START,
    };
    let mut hash = [0u8; 20];
    hash.copy_from_slice(script.as_bytes().get(start..start + 20)?);
    Some(hash)
}
