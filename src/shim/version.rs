// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt;

pub use fvm_shared4::version::NetworkVersion;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator as _};

/// Built-in actor code generations. Network versions 0 to 3 ran the first
/// generation; the second generation arrived with network version 4.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, Serialize, Deserialize,
)]
#[serde(into = "u64", try_from = "u64")]
pub enum ActorVersion {
    V0,
    V2,
    V3,
    V4,
    V5,
    V6,
    V7,
    V8,
    V9,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VersionError {
    /// The network runs an actor generation newer than any decoded here.
    #[error("unsupported actor version for network version {network}")]
    UnsupportedActorVersion { network: u32 },
    #[error("unknown actor version {0}")]
    UnknownActorVersion(u64),
}

impl ActorVersion {
    /// Maps a network version to the actor generation that executes under it.
    pub fn from_network_version(nv: NetworkVersion) -> Result<Self, VersionError> {
        let nv = u32::from(nv);
        Ok(match nv {
            0..=3 => Self::V0,
            4..=9 => Self::V2,
            10..=11 => Self::V3,
            12 => Self::V4,
            13 => Self::V5,
            14 => Self::V6,
            15 => Self::V7,
            16 => Self::V8,
            17 => Self::V9,
            _ => return Err(VersionError::UnsupportedActorVersion { network: nv }),
        })
    }

    pub fn number(self) -> u64 {
        match self {
            Self::V0 => 0,
            Self::V2 => 2,
            Self::V3 => 3,
            Self::V4 => 4,
            Self::V5 => 5,
            Self::V6 => 6,
            Self::V7 => 7,
            Self::V8 => 8,
            Self::V9 => 9,
        }
    }

    /// Generations before v3 used the legacy HAMT pointer layout and the
    /// fixed width AMT.
    pub fn uses_legacy_adt(self) -> bool {
        self < Self::V3
    }

    /// Generations before v8 identify actors with well-known identity
    /// multihash codes rather than bundle manifests.
    pub fn uses_legacy_codes(self) -> bool {
        self < Self::V8
    }

    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}

impl From<ActorVersion> for u64 {
    fn from(value: ActorVersion) -> Self {
        value.number()
    }
}

impl TryFrom<u64> for ActorVersion {
    type Error = VersionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::iter()
            .find(|v| v.number() == value)
            .ok_or(VersionError::UnknownActorVersion(value))
    }
}

impl fmt::Display for ActorVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, ActorVersion::V0)]
    #[case(3, ActorVersion::V0)]
    #[case(4, ActorVersion::V2)]
    #[case(9, ActorVersion::V2)]
    #[case(10, ActorVersion::V3)]
    #[case(12, ActorVersion::V4)]
    #[case(14, ActorVersion::V6)]
    #[case(16, ActorVersion::V8)]
    #[case(17, ActorVersion::V9)]
    fn network_to_actor_version(#[case] nv: u32, #[case] expected: ActorVersion) {
        assert_eq!(
            ActorVersion::from_network_version(NetworkVersion::from(nv)),
            Ok(expected)
        );
    }

    #[test]
    fn later_networks_are_unsupported() {
        assert_eq!(
            ActorVersion::from_network_version(NetworkVersion::from(18)),
            Err(VersionError::UnsupportedActorVersion { network: 18 })
        );
    }

    #[test]
    fn numbers_round_trip() {
        for v in ActorVersion::all() {
            assert_eq!(ActorVersion::try_from(v.number()), Ok(v));
        }
        assert_eq!(
            ActorVersion::try_from(1),
            Err(VersionError::UnknownActorVersion(1))
        );
    }
}
