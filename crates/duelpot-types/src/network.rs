//! Chains and networks an escrow can live on.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::DuelpotError;

/// A chain family. Each family has its own adapter implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Tron,
    Tezos,
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tron => write!(f, "tron"),
            Self::Tezos => write!(f, "tezos"),
        }
    }
}

/// A concrete network of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    TronMainnet,
    TronShasta,
    TronNile,
    TezosMainnet,
    TezosGhostnet,
}

impl Network {
    pub const ALL: [Self; 5] = [
        Self::TronMainnet,
        Self::TronShasta,
        Self::TronNile,
        Self::TezosMainnet,
        Self::TezosGhostnet,
    ];

    /// The chain family this network belongs to.
    #[must_use]
    pub fn chain(self) -> Chain {
        match self {
            Self::TronMainnet | Self::TronShasta | Self::TronNile => Chain::Tron,
            Self::TezosMainnet | Self::TezosGhostnet => Chain::Tezos,
        }
    }

    /// Whether real value moves on this network.
    #[must_use]
    pub fn is_mainnet(self) -> bool {
        matches!(self, Self::TronMainnet | Self::TezosMainnet)
    }

    /// Stable string form, also accepted by [`FromStr`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TronMainnet => "tron-mainnet",
            Self::TronShasta => "tron-shasta",
            Self::TronNile => "tron-nile",
            Self::TezosMainnet => "tezos-mainnet",
            Self::TezosGhostnet => "tezos-ghostnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = DuelpotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|n| n.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DuelpotError::Configuration(format!("unknown network: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_chain_mapping() {
        assert_eq!(Network::TronNile.chain(), Chain::Tron);
        assert_eq!(Network::TezosGhostnet.chain(), Chain::Tezos);
        assert!(Network::TronMainnet.is_mainnet());
        assert!(!Network::TronShasta.is_mainnet());
    }

    #[test]
    fn network_parse_display_agree() {
        for n in Network::ALL {
            assert_eq!(n.to_string().parse::<Network>().unwrap(), n);
        }
        assert!("solana-mainnet".parse::<Network>().is_err());
    }

    #[test]
    fn network_serde_uses_kebab_case() {
        let json = serde_json::to_string(&Network::TezosGhostnet).unwrap();
        assert_eq!(json, "\"tezos-ghostnet\"");
    }
}
