use thiserror::Error;

use crate::scripts::ScriptPubKeyKind;
use crate::types::HtlcKind;

/// Errors produced while building, signing or verifying channel transactions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A second-stage transaction must have exactly one input and one output.
    #[error("invalid transaction shape: {inputs} inputs, {outputs} outputs (expected 1/1)")]
    InvalidShape { inputs: usize, outputs: usize },

    /// The requested witness variant does not fit the HTLC script being spent.
    #[error("sign variant {variant} cannot spend a {script_kind:?} HTLC script")]
    InvalidSignVariant {
        variant: &'static str,
        script_kind: HtlcKind,
    },

    /// The script handed to the HTLC signer is neither an offered nor a received HTLC script.
    #[error("witness script is not an HTLC script")]
    UnknownHtlcScript,

    /// The signing capability refused or failed to produce a signature.
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// A signature did not verify against its public key.
    #[error("signature verification failed")]
    VerificationFailed,

    #[error("{kind:?} requires a {expected}-byte hash, got {len}")]
    InvalidHashLength {
        kind: ScriptPubKeyKind,
        expected: usize,
        len: usize,
    },

    /// `init` was received in a state that does not accept it.
    #[error("feature handshake cannot accept init in state {state}")]
    HandshakeState { state: &'static str },

    /// The peer requires a feature we do not support.
    #[error("peer requires unsupported feature bit {bit} in {bitmap} features")]
    IncompatibleFeatures { bit: usize, bitmap: &'static str },

    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
