// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Generic diff primitives over content-addressed arrays and maps.

mod amt;
mod hamt;

use std::fmt;

use fvm_ipld_encoding::strict_bytes;
use fvm_ipld_encoding::tuple::*;
use ipld_core::ipld::Ipld;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

pub use amt::{AmtShape, amt_shape, diff_array, load_array_entries};
pub use hamt::{
    HamtLayout, HamtShape, diff_map, diff_map_naive, hamt_get, hamt_layout, load_map_entries,
};

/// Errors raised by the diff primitives.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Both maps must share bit-width; differing shapes cannot be walked in lockstep.
    #[error("map shape mismatch: previous {previous:?}, current {current:?}")]
    ShapeMismatch {
        previous: HamtShape,
        current: HamtShape,
    },
    /// A node did not decode as a HAMT node of the expected layout.
    #[error("malformed HAMT node: {0}")]
    MalformedNode(String),
}

/// Kind of change observed for a key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(into = "u8", try_from = "u8")]
pub enum ChangeKind {
    #[default]
    Unknown,
    Add,
    Remove,
    Modify,
}

impl From<ChangeKind> for u8 {
    fn from(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::Unknown => 0,
            ChangeKind::Add => 1,
            ChangeKind::Remove => 2,
            ChangeKind::Modify => 3,
        }
    }
}

impl TryFrom<u8> for ChangeKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Unknown,
            1 => Self::Add,
            2 => Self::Remove,
            3 => Self::Modify,
            other => return Err(format!("invalid change kind {other}")),
        })
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Modify => "modify",
        };
        f.write_str(s)
    }
}

/// An encoded CBOR value whose decoding is deferred to the consumer, which
/// knows the layout it expects.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deferred(#[serde(with = "strict_bytes")] Vec<u8>);

impl Deferred {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_ipld(ipld: &Ipld) -> anyhow::Result<Self> {
        Ok(Self(fvm_ipld_encoding::to_vec(ipld)?))
    }

    pub fn encode<T: Serialize>(value: &T) -> anyhow::Result<Self> {
        Ok(Self(fvm_ipld_encoding::to_vec(value)?))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn decode<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        Ok(fvm_ipld_encoding::from_slice(&self.0)?)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Deferred({})", hex::encode(&self.0))
    }
}

/// Change of an array entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct ArrayChange {
    pub key: u64,
    pub kind: ChangeKind,
    pub previous: Option<Deferred>,
    pub current: Option<Deferred>,
}

/// Change of a map entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct MapChange {
    #[serde(with = "strict_bytes")]
    pub key: Vec<u8>,
    pub kind: ChangeKind,
    pub previous: Option<Deferred>,
    pub current: Option<Deferred>,
}

/// Changes of a map, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapChanges {
    pub added: Vec<MapChange>,
    pub modified: Vec<MapChange>,
    pub removed: Vec<MapChange>,
}

impl MapChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }

    /// All changes, in added, modified, removed order.
    pub fn into_changes(self) -> impl Iterator<Item = MapChange> {
        self.added
            .into_iter()
            .chain(self.modified)
            .chain(self.removed)
    }

    fn push(&mut self, change: MapChange) {
        match change.kind {
            ChangeKind::Add => self.added.push(change),
            ChangeKind::Remove => self.removed.push(change),
            ChangeKind::Modify | ChangeKind::Unknown => self.modified.push(change),
        }
    }
}

/// Compares two sorted key/value listings and emits one change per differing key.
fn compare_sorted<K: Ord + Clone>(
    previous: std::collections::BTreeMap<K, Ipld>,
    current: std::collections::BTreeMap<K, Ipld>,
    mut emit: impl FnMut(K, ChangeKind, Option<&Ipld>, Option<&Ipld>) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    use itertools::{EitherOrBoth, Itertools as _};
    for entry in previous
        .iter()
        .merge_join_by(current.iter(), |(a, _), (b, _)| a.cmp(b))
    {
        match entry {
            EitherOrBoth::Left((k, prev)) => emit(k.clone(), ChangeKind::Remove, Some(prev), None)?,
            EitherOrBoth::Right((k, curr)) => emit(k.clone(), ChangeKind::Add, None, Some(curr))?,
            EitherOrBoth::Both((k, prev), (_, curr)) => {
                if prev != curr {
                    emit(k.clone(), ChangeKind::Modify, Some(prev), Some(curr))?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_kind_encodes_as_integer() {
        let bytes = fvm_ipld_encoding::to_vec(&ChangeKind::Modify).unwrap();
        assert_eq!(bytes, vec![0x03]);
        let decoded: ChangeKind = fvm_ipld_encoding::from_slice(&bytes).unwrap();
        assert_eq!(decoded, ChangeKind::Modify);
        assert!(fvm_ipld_encoding::from_slice::<ChangeKind>(&[0x09]).is_err());
    }

    #[test]
    fn deferred_keeps_encoding() {
        let value = (1u64, "two".to_string(), vec![3u8]);
        let deferred = Deferred::encode(&value).unwrap();
        let decoded: (u64, String, Vec<u8>) = deferred.decode().unwrap();
        assert_eq!(decoded, value);
        let ipld: Ipld = deferred.decode().unwrap();
        assert_eq!(Deferred::from_ipld(&ipld).unwrap(), deferred);
    }

    #[test]
    fn map_changes_group_by_kind() {
        let mut changes = MapChanges::default();
        for (key, kind) in [
            (1u8, ChangeKind::Add),
            (2, ChangeKind::Remove),
            (3, ChangeKind::Modify),
        ] {
            changes.push(MapChange {
                key: vec![key],
                kind,
                previous: None,
                current: None,
            });
        }
        assert_eq!(changes.len(), 3);
        let order: Vec<_> = changes.into_changes().map(|c| c.key[0]).collect();
        assert_eq!(order, vec![1, 3, 2]);
    }
}
