use bitcoin::blockdata::opcodes::all as opcodes;
use bitcoin::script::{Builder, ScriptBuf};
use bitcoin::secp256k1::PublicKey;

/// Create the 2-of-2 funding witness script.
///
/// Keys are sorted by their compressed serialization so both peers produce the
/// same script regardless of argument order.
pub fn build_funding_script(pubkey1: &PublicKey, pubkey2: &PublicKey) -> ScriptBuf {
    let (pubkey_lesser, pubkey_larger) = if pubkey1.serialize() < pubkey2.serialize() {
        (pubkey1, pubkey2)
    } else {
        (pubkey2, pubkey1)
    };
    Builder::new()
        .push_int(2)
        .push_slice(pubkey_lesser.serialize())
        .push_slice(pubkey_larger.serialize())
        .push_int(2)
        .push_opcode(opcodes::OP_CHECKMULTISIG)
        .into_script()
}
