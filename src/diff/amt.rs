// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::BTreeMap;

use cid::Cid;
use fil_actors_shared::fvm_ipld_amt::{self, Amt, Amtv0, ChangeType};
use fvm_ipld_blockstore::Blockstore;
use ipld_core::ipld::Ipld;

use super::{ArrayChange, ChangeKind, Deferred, compare_sorted};
use crate::utils::db::BlockstoreExt as _;

/// How an array was built: the legacy fixed-width layout or the current
/// layout with an explicit bit-width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmtShape {
    Legacy,
    BitWidth(u32),
}

/// Reads the layout of an array from its root node: legacy roots hold
/// `[height, count, node]`, current ones prefix the bit-width.
pub fn amt_shape<BS: Blockstore>(store: &BS, root: &Cid) -> anyhow::Result<AmtShape> {
    match store.get_cbor_required::<Ipld>(root)? {
        Ipld::List(fields) if fields.len() == 3 => Ok(AmtShape::Legacy),
        Ipld::List(fields) if fields.len() == 4 => match fields.first() {
            Some(Ipld::Integer(bw)) => Ok(AmtShape::BitWidth(u32::try_from(*bw)?)),
            other => anyhow::bail!("invalid array bit-width {other:?}"),
        },
        other => anyhow::bail!("array root {root} is not a list: {other:?}"),
    }
}

/// Loads every entry of an array into key order.
pub fn load_array_entries<BS: Blockstore>(
    store: &BS,
    root: &Cid,
    shape: AmtShape,
) -> anyhow::Result<BTreeMap<u64, Ipld>> {
    let mut entries = BTreeMap::new();
    match shape {
        AmtShape::Legacy => Amtv0::<Ipld, _>::load(root, store)?.for_each(|k, v| {
            entries.insert(k, v.clone());
            Ok(())
        })?,
        AmtShape::BitWidth(_) => Amt::<Ipld, _>::load(root, store)?.for_each(|k, v| {
            entries.insert(k, v.clone());
            Ok(())
        })?,
    }
    Ok(entries)
}

/// Diffs two arrays. Arrays of the same current-layout shape are compared
/// structurally, visiting only the nodes that differ; anything else falls
/// back to a full scan of both sides.
pub fn diff_array<BS: Blockstore>(
    store: &BS,
    previous: &Cid,
    previous_shape: AmtShape,
    current: &Cid,
    current_shape: AmtShape,
) -> anyhow::Result<Vec<ArrayChange>> {
    if previous == current && previous_shape == current_shape {
        return Ok(Vec::new());
    }
    match (previous_shape, current_shape) {
        (AmtShape::BitWidth(a), AmtShape::BitWidth(b)) if a == b => {
            diff_structural(store, previous, current)
        }
        _ => diff_naive(store, previous, previous_shape, current, current_shape),
    }
}

fn diff_structural<BS: Blockstore>(
    store: &BS,
    previous: &Cid,
    current: &Cid,
) -> anyhow::Result<Vec<ArrayChange>> {
    let prev = Amt::<Ipld, _>::load(previous, store)?;
    let curr = Amt::<Ipld, _>::load(current, store)?;
    fvm_ipld_amt::diff(&prev, &curr)?
        .into_iter()
        .map(|change| {
            let kind = match change.change_type() {
                ChangeType::Add => ChangeKind::Add,
                ChangeType::Remove => ChangeKind::Remove,
                ChangeType::Modify => ChangeKind::Modify,
            };
            Ok(ArrayChange {
                key: change.key,
                kind,
                previous: change.before.as_ref().map(Deferred::from_ipld).transpose()?,
                current: change.after.as_ref().map(Deferred::from_ipld).transpose()?,
            })
        })
        .collect()
}

fn diff_naive<BS: Blockstore>(
    store: &BS,
    previous: &Cid,
    previous_shape: AmtShape,
    current: &Cid,
    current_shape: AmtShape,
) -> anyhow::Result<Vec<ArrayChange>> {
    let prev = load_array_entries(store, previous, previous_shape)?;
    let curr = load_array_entries(store, current, current_shape)?;
    let mut changes = Vec::new();
    compare_sorted(prev, curr, |key, kind, before, after| {
        changes.push(ArrayChange {
            key,
            kind,
            previous: before.map(Deferred::from_ipld).transpose()?,
            current: after.map(Deferred::from_ipld).transpose()?,
        });
        Ok(())
    })?;
    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDB;
    use itertools::Itertools as _;
    use quickcheck_macros::quickcheck;
    use std::collections::BTreeMap;

    fn build(store: &MemoryDB, bit_width: u32, entries: &BTreeMap<u64, String>) -> Cid {
        let mut amt = Amt::<String, _>::new_with_bit_width(store, bit_width);
        for (k, v) in entries {
            amt.set(*k, v.clone()).unwrap();
        }
        amt.flush().unwrap()
    }

    fn sorted(mut changes: Vec<ArrayChange>) -> Vec<ArrayChange> {
        changes.sort_by_key(|c| c.key);
        changes
    }

    #[test]
    fn identical_roots_have_no_changes() {
        let store = MemoryDB::default();
        let root = build(&store, 5, &BTreeMap::from([(1, "a".to_string())]));
        let shape = AmtShape::BitWidth(5);
        assert!(diff_array(&store, &root, shape, &root, shape).unwrap().is_empty());
    }

    #[test]
    fn add_modify_remove() {
        let store = MemoryDB::default();
        let prev = build(
            &store,
            5,
            &BTreeMap::from([(1, "a".to_string()), (2, "b".to_string())]),
        );
        let curr = build(
            &store,
            5,
            &BTreeMap::from([(2, "B".to_string()), (9, "c".to_string())]),
        );
        let shape = AmtShape::BitWidth(5);
        let changes = sorted(diff_array(&store, &prev, shape, &curr, shape).unwrap());
        let kinds = changes.iter().map(|c| (c.key, c.kind)).collect_vec();
        assert_eq!(
            kinds,
            vec![
                (1, ChangeKind::Remove),
                (2, ChangeKind::Modify),
                (9, ChangeKind::Add)
            ]
        );
        let modified: String = changes[1].current.as_ref().unwrap().decode().unwrap();
        assert_eq!(modified, "B");
    }

    #[quickcheck]
    fn structural_matches_naive(prev: BTreeMap<u16, u8>, curr: BTreeMap<u16, u8>) -> bool {
        let store = MemoryDB::default();
        let to_entries = |m: &BTreeMap<u16, u8>| {
            m.iter()
                .map(|(k, v)| (u64::from(*k), v.to_string()))
                .collect::<BTreeMap<_, _>>()
        };
        let prev = build(&store, 3, &to_entries(&prev));
        let curr = build(&store, 3, &to_entries(&curr));
        let shape = AmtShape::BitWidth(3);
        let structural = sorted(diff_structural(&store, &prev, &curr).unwrap());
        let naive = sorted(diff_naive(&store, &prev, shape, &curr, shape).unwrap());
        structural == naive
    }

    #[test]
    fn shape_is_read_from_root() {
        let store = MemoryDB::default();
        let root = build(&store, 6, &BTreeMap::from([(1, "a".to_string())]));
        assert_eq!(amt_shape(&store, &root).unwrap(), AmtShape::BitWidth(6));
        let mut legacy = Amtv0::<String, _>::new(&store);
        legacy.set(1, "a".to_string()).unwrap();
        let root = legacy.flush().unwrap();
        assert_eq!(amt_shape(&store, &root).unwrap(), AmtShape::Legacy);
    }

    #[test]
    fn differing_bit_widths_use_full_scan() {
        let store = MemoryDB::default();
        let prev = build(&store, 3, &BTreeMap::from([(4, "x".to_string())]));
        let curr = build(&store, 6, &BTreeMap::from([(4, "y".to_string())]));
        let changes = diff_array(
            &store,
            &prev,
            AmtShape::BitWidth(3),
            &curr,
            AmtShape::BitWidth(6),
        )
        .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Modify);
    }
}
