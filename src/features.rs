use std::fmt;

use tracing::{debug, warn};

use crate::errors::{Error, Result};

// ============================================================================
// FEATURE BITS
// ============================================================================

/// `option_data_loss_protect`, local bitmap.
pub const DATA_LOSS_PROTECT_BIT: usize = 0;
/// `initial_routing_sync`, local bitmap.
pub const INITIAL_ROUTING_SYNC_BIT: usize = 3;

/// A raw feature bitmap as carried in `init`.
///
/// Bytes are big-endian: bit 0 is the least significant bit of the last byte.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FeatureBits(Vec<u8>);

impl FeatureBits {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        FeatureBits(bytes)
    }

    pub fn from_bits(bits: &[usize]) -> Self {
        let mut features = FeatureBits::default();
        for &bit in bits {
            features.set(bit);
        }
        features
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_set(&self, bit: usize) -> bool {
        let byte_index = bit / 8;
        if byte_index >= self.0.len() {
            return false;
        }
        let byte = self.0[self.0.len() - 1 - byte_index];
        (byte >> (bit % 8)) & 1 == 1
    }

    /// Set `bit`, growing the bitmap at the front if it is too short.
    pub fn set(&mut self, bit: usize) {
        let needed = bit / 8 + 1;
        if needed > self.0.len() {
            let mut grown = vec![0u8; needed - self.0.len()];
            grown.extend_from_slice(&self.0);
            self.0 = grown;
        }
        let len = self.0.len();
        self.0[len - 1 - bit / 8] |= 1 << (bit % 8);
    }

    /// All set bits in ascending order.
    pub fn set_bits(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.0.len() * 8).filter(move |&bit| self.is_set(bit))
    }

    /// The lowest set odd bit that `supported` does not have.
    fn first_unsupported_required(&self, supported: &FeatureBits) -> Option<usize> {
        self.set_bits()
            .find(|&bit| bit % 2 == 1 && !supported.is_set(bit))
    }
}

impl fmt::Display for FeatureBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// The two bitmaps of an `init` message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitFeatures {
    pub global: FeatureBits,
    pub local: FeatureBits,
}

/// Feature bits this node understands, per bitmap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportedFeatures {
    global: FeatureBits,
    local: FeatureBits,
}

impl SupportedFeatures {
    pub fn new(global: &[usize], local: &[usize]) -> Self {
        SupportedFeatures {
            global: FeatureBits::from_bits(global),
            local: FeatureBits::from_bits(local),
        }
    }

    /// The bitmaps we advertise in our own `init`.
    pub fn to_init(&self) -> InitFeatures {
        InitFeatures {
            global: self.global.clone(),
            local: self.local.clone(),
        }
    }
}

// ============================================================================
// HANDSHAKE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    NotStarted,
    AwaitingPeer,
    Negotiated,
    Rejected,
}

impl HandshakeState {
    pub fn as_str(self) -> &'static str {
        match self {
            HandshakeState::NotStarted => "not_started",
            HandshakeState::AwaitingPeer => "awaiting_peer",
            HandshakeState::Negotiated => "negotiated",
            HandshakeState::Rejected => "rejected",
        }
    }
}

/// Per-connection feature negotiation, owned by the caller.
#[derive(Debug, Clone)]
pub struct FeatureHandshake {
    supported: SupportedFeatures,
    state: HandshakeState,
    peer: Option<InitFeatures>,
}

impl FeatureHandshake {
    pub fn new(supported: SupportedFeatures) -> Self {
        FeatureHandshake {
            supported,
            state: HandshakeState::NotStarted,
            peer: None,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Peer bitmaps exactly as received, once negotiated.
    pub fn peer_features(&self) -> Option<&InitFeatures> {
        self.peer.as_ref()
    }

    /// Send our `init`: returns the bitmaps to advertise.
    pub fn start(&mut self) -> Result<InitFeatures> {
        if self.state != HandshakeState::NotStarted {
            return Err(Error::HandshakeState {
                state: self.state.as_str(),
            });
        }
        self.state = HandshakeState::AwaitingPeer;
        Ok(self.supported.to_init())
    }

    /// Process the peer's `init`.
    ///
    /// Odd bits are required and must be supported; even bits are optional.
    /// On success the bitmaps are stored and `notify` is called with them and
    /// the `initial_routing_sync` flag.
    pub fn recv_init<F>(&mut self, peer: InitFeatures, notify: F) -> Result<HandshakeState>
    where
        F: FnOnce(&InitFeatures, bool),
    {
        match self.state {
            HandshakeState::NotStarted | HandshakeState::AwaitingPeer => {}
            state => {
                return Err(Error::HandshakeState {
                    state: state.as_str(),
                })
            }
        }

        let unsupported = peer
            .global
            .first_unsupported_required(&self.supported.global)
            .map(|bit| (bit, "global"))
            .or_else(|| {
                peer.local
                    .first_unsupported_required(&self.supported.local)
                    .map(|bit| (bit, "local"))
            });

        if let Some((bit, bitmap)) = unsupported {
            warn!(
                bit,
                bitmap,
                global = %peer.global,
                local = %peer.local,
                "peer requires unsupported feature"
            );
            self.state = HandshakeState::Rejected;
            return Err(Error::IncompatibleFeatures { bit, bitmap });
        }

        let routing_sync = peer.local.is_set(INITIAL_ROUTING_SYNC_BIT);
        debug!(
            global = %peer.global,
            local = %peer.local,
            routing_sync,
            "feature handshake negotiated"
        );

        self.state = HandshakeState::Negotiated;
        let stored = self.peer.insert(peer);
        notify(stored, routing_sync);
        Ok(self.state)
    }
}
