use bitcoin::blockdata::opcodes::all as opcodes;
use bitcoin::hashes::Hash;
use bitcoin::script::{Script, ScriptBuf};
use bitcoin::{PubkeyHash, ScriptHash, WPubkeyHash, WScriptHash};
use serde::Serialize;

use crate::errors::{Error, Result};

/// The four standard output templates a channel ever pays to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScriptPubKeyKind {
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
}

impl ScriptPubKeyKind {
    /// Length of the hash committed to by this template.
    pub fn hash_len(self) -> usize {
        match self {
            ScriptPubKeyKind::P2wsh => 32,
            _ => 20,
        }
    }
}

/// Build the scriptPubKey for `kind` paying to an already-computed hash.
pub fn build_scriptpubkey_from_hash(hash: &[u8], kind: ScriptPubKeyKind) -> Result<ScriptBuf> {
    if hash.len() != kind.hash_len() {
        return Err(Error::InvalidHashLength {
            kind,
            expected: kind.hash_len(),
            len: hash.len(),
        });
    }

    let script = match kind {
        ScriptPubKeyKind::P2pkh => ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(to_array(hash))),
        ScriptPubKeyKind::P2sh => ScriptBuf::new_p2sh(&ScriptHash::from_byte_array(to_array(hash))),
        ScriptPubKeyKind::P2wpkh => {
            ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array(to_array(hash)))
        }
        ScriptPubKeyKind::P2wsh => {
            ScriptBuf::new_p2wsh(&WScriptHash::from_byte_array(to_array(hash)))
        }
    };
    Ok(script)
}

/// Hash a public key or witness script and build the `kind` scriptPubKey for it.
///
/// HASH160 is used for P2PKH, P2SH and P2WPKH; SHA256 for P2WSH.
pub fn build_scriptpubkey_from_data(data: &[u8], kind: ScriptPubKeyKind) -> ScriptBuf {
    match kind {
        ScriptPubKeyKind::P2pkh => ScriptBuf::new_p2pkh(&PubkeyHash::hash(data)),
        ScriptPubKeyKind::P2sh => ScriptBuf::new_p2sh(&ScriptHash::hash(data)),
        ScriptPubKeyKind::P2wpkh => ScriptBuf::new_p2wpkh(&WPubkeyHash::hash(data)),
        ScriptPubKeyKind::P2wsh => ScriptBuf::new_p2wsh(&WScriptHash::hash(data)),
    }
}

/// Recognise one of the four standard templates and return the hash it commits to.
///
/// Only exact canonical forms are recognised; anything else yields `None`.
pub fn classify_scriptpubkey(script: &Script) -> Option<(ScriptPubKeyKind, &[u8])> {
    let p = script.as_bytes();
    match p.len() {
        // OP_DUP OP_HASH160 20 <20-bytes> OP_EQUALVERIFY OP_CHECKSIG
        25 if p[0] == opcodes::OP_DUP.to_u8()
            && p[1] == opcodes::OP_HASH160.to_u8()
            && p[2] == 20
            && p[23] == opcodes::OP_EQUALVERIFY.to_u8()
            && p[24] == opcodes::OP_CHECKSIG.to_u8() =>
        {
            Some((ScriptPubKeyKind::P2pkh, &p[3..23]))
        }
        // OP_HASH160 20 <20-bytes> OP_EQUAL
        23 if p[0] == opcodes::OP_HASH160.to_u8()
            && p[1] == 20
            && p[22] == opcodes::OP_EQUAL.to_u8() =>
        {
            Some((ScriptPubKeyKind::P2sh, &p[2..22]))
        }
        // OP_0 20 <20-bytes>
        22 if p[0] == opcodes::OP_PUSHBYTES_0.to_u8() && p[1] == 20 => {
            Some((ScriptPubKeyKind::P2wpkh, &p[2..22]))
        }
        // OP_0 32 <32-bytes>
        34 if p[0] == opcodes::OP_PUSHBYTES_0.to_u8() && p[1] == 32 => {
            Some((ScriptPubKeyKind::P2wsh, &p[2..34]))
        }
        _ => None,
    }
}

fn to_array<const N: usize>(hash: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(hash);
    out
}
