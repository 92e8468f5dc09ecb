use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::features::{SupportedFeatures, DATA_LOSS_PROTECT_BIT, INITIAL_ROUTING_SYNC_BIT};

/// Commitment transaction format. Fee weights are tied to a format and are
/// never used without one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentFormat {
    /// Pre-anchor BOLT3 commitments.
    #[default]
    Legacy,
}

/// Weight units used to derive commitment and second-stage fees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeWeights {
    pub commit_base: u64,
    pub commit_per_htlc: u64,
    pub htlc_success: u64,
    pub htlc_timeout: u64,
}

impl FeeWeights {
    pub const LEGACY: FeeWeights = FeeWeights {
        commit_base: 724,
        commit_per_htlc: 172,
        htlc_success: 703,
        htlc_timeout: 663,
    };

    pub const fn for_format(format: CommitmentFormat) -> FeeWeights {
        match format {
            CommitmentFormat::Legacy => FeeWeights::LEGACY,
        }
    }
}

/// Feature bits we advertise and accept from peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub global: Vec<usize>,
    pub local: Vec<usize>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            global: Vec::new(),
            local: vec![DATA_LOSS_PROTECT_BIT, INITIAL_ROUTING_SYNC_BIT],
        }
    }
}

/// Negotiated per-channel parameters consumed when building commitments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub commitment_format: CommitmentFormat,
    pub dust_limit_satoshi: u64,
    pub feerate_per_kw: u32,
    pub to_self_delay: u16,
    pub features: FeatureConfig,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            commitment_format: CommitmentFormat::Legacy,
            dust_limit_satoshi: 546,
            feerate_per_kw: 253,
            to_self_delay: 144,
            features: FeatureConfig::default(),
        }
    }
}

impl ChannelConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn fee_weights(&self) -> FeeWeights {
        FeeWeights::for_format(self.commitment_format)
    }

    pub fn supported_features(&self) -> SupportedFeatures {
        SupportedFeatures::new(&self.features.global, &self.features.local)
    }
}
