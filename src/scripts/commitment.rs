use bitcoin::blockdata::opcodes::all as opcodes;
use bitcoin::hashes::hash160::Hash as Hash160;
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, ScriptBuf};
use bitcoin::secp256k1::PublicKey;

/// Create the `to_remote` scriptPubKey (P2WPKH).
pub fn build_to_remote_script(remote_pubkey: &PublicKey) -> ScriptBuf {
    let pubkey_hash = Hash160::hash(&remote_pubkey.serialize());

    // OP_0 <20-byte-pubkey-hash>
    Builder::new()
        .push_int(0)
        .push_slice(pubkey_hash.as_byte_array())
        .into_script()
}

/// Create the `to_local` witness script: revocable immediately, or spendable
/// by the delayed key after `delay` blocks.
pub fn build_to_local_script(
    revocation_pubkey: &PublicKey,
    delayed_pubkey: &PublicKey,
    delay: u32,
) -> ScriptBuf {
    // OP_IF
    //     <revocationpubkey>
    // OP_ELSE
    //     <to_self_delay>
    //     OP_CHECKSEQUENCEVERIFY
    //     OP_DROP
    //     <local_delayedpubkey>
    // OP_ENDIF
    // OP_CHECKSIG
    Builder::new()
        .push_opcode(opcodes::OP_IF)
        .push_slice(revocation_pubkey.serialize())
        .push_opcode(opcodes::OP_ELSE)
        .push_int(delay as i64)
        .push_opcode(opcodes::OP_CSV)
        .push_opcode(opcodes::OP_DROP)
        .push_slice(delayed_pubkey.serialize())
        .push_opcode(opcodes::OP_ENDIF)
        .push_opcode(opcodes::OP_CHECKSIG)
        .into_script()
}
