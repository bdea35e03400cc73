// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! HAMT reads and diffs. Current-layout maps go through
//! [`fvm_ipld_hamt`]. The legacy layout, which wraps every link and bucket in
//! a single-entry map keyed `"0"` or `"1"`, is walked here at the IPLD level.
//! Keys are placed by the SHA-256 digest of their bytes, consumed most
//! significant bit first, `bit_width` bits per level.

use std::collections::BTreeMap;

use cid::Cid;
use fil_actors_shared::fvm_ipld_hamt::{BytesKey, Hamt};
use fvm_ipld_blockstore::Blockstore;
use ipld_core::ipld::Ipld;
use multihash_codetable::{Code, MultihashDigest as _};

use super::{ChangeKind, Deferred, Error, MapChange, MapChanges, compare_sorted};
use crate::utils::db::BlockstoreExt as _;

/// Parameters a map was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HamtShape {
    pub bit_width: u32,
}

impl Default for HamtShape {
    fn default() -> Self {
        Self { bit_width: 5 }
    }
}

/// Pointer encoding of a map's nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HamtLayout {
    /// Actors v0 and v2.
    Legacy,
    Current,
}

/// Reads the layout of a map from its root node. Empty maps encode the same
/// way in both layouts and are reported as current.
pub fn hamt_layout<BS: Blockstore>(store: &BS, root: &Cid) -> anyhow::Result<HamtLayout> {
    match store.get_cbor_required::<Ipld>(root)? {
        Ipld::List(parts) if parts.len() == 2 => match parts.get(1) {
            Some(Ipld::List(pointers)) if pointers.iter().any(|p| matches!(p, Ipld::Map(_))) => {
                Ok(HamtLayout::Legacy)
            }
            Some(Ipld::List(_)) => Ok(HamtLayout::Current),
            _ => Err(legacy::malformed("node pointers are not a list").into()),
        },
        _ => Err(legacy::malformed(format!("map root {root} is not a two-field list")).into()),
    }
}

fn load_current<'a, BS: Blockstore>(
    store: &'a BS,
    root: &Cid,
    shape: HamtShape,
) -> anyhow::Result<Hamt<&'a BS, Ipld>> {
    Ok(Hamt::load_with_bit_width(root, store, shape.bit_width)?)
}

/// Looks up a single key.
pub fn hamt_get<BS: Blockstore>(
    store: &BS,
    root: &Cid,
    shape: HamtShape,
    key: &[u8],
) -> anyhow::Result<Option<Ipld>> {
    match hamt_layout(store, root)? {
        HamtLayout::Legacy => legacy::get(store, root, shape, key),
        HamtLayout::Current => Ok(load_current(store, root, shape)?
            .get(&BytesKey(key.to_vec()))?
            .cloned()),
    }
}

/// Loads every entry of a map, in key order.
pub fn load_map_entries<BS: Blockstore>(
    store: &BS,
    root: &Cid,
    shape: HamtShape,
) -> anyhow::Result<BTreeMap<Vec<u8>, Ipld>> {
    match hamt_layout(store, root)? {
        HamtLayout::Legacy => legacy::entries(store, root),
        HamtLayout::Current => {
            let mut out = BTreeMap::new();
            load_current(store, root, shape)?.for_each(|key, value| {
                out.insert(key.0.clone(), value.clone());
                Ok(())
            })?;
            Ok(out)
        }
    }
}

fn record(
    changes: &mut MapChanges,
    key: Vec<u8>,
    kind: ChangeKind,
    previous: Option<&Ipld>,
    current: Option<&Ipld>,
) -> anyhow::Result<()> {
    changes.push(MapChange {
        key,
        kind,
        previous: previous.map(Deferred::from_ipld).transpose()?,
        current: current.map(Deferred::from_ipld).transpose()?,
    });
    Ok(())
}

/// Diffs two maps sharing the same shape. Two legacy maps are walked in
/// lockstep, descending only into subtrees whose links differ; any other
/// pair is compared entry by entry.
pub fn diff_map<BS: Blockstore>(
    store: &BS,
    previous: &Cid,
    previous_shape: HamtShape,
    current: &Cid,
    current_shape: HamtShape,
) -> anyhow::Result<MapChanges> {
    if previous_shape != current_shape {
        return Err(Error::ShapeMismatch {
            previous: previous_shape,
            current: current_shape,
        }
        .into());
    }
    if previous == current {
        return Ok(MapChanges::default());
    }
    let layouts = (hamt_layout(store, previous)?, hamt_layout(store, current)?);
    if layouts == (HamtLayout::Legacy, HamtLayout::Legacy) {
        let mut changes = MapChanges::default();
        legacy::diff(store, previous, current, current_shape, &mut changes)?;
        return Ok(changes);
    }
    diff_entries(store, previous, current, current_shape)
}

/// Diffs two maps by loading both completely.
pub fn diff_map_naive<BS: Blockstore>(
    store: &BS,
    previous: &Cid,
    current: &Cid,
) -> anyhow::Result<MapChanges> {
    if previous == current {
        return Ok(MapChanges::default());
    }
    diff_entries(store, previous, current, HamtShape::default())
}

fn diff_entries<BS: Blockstore>(
    store: &BS,
    previous: &Cid,
    current: &Cid,
    shape: HamtShape,
) -> anyhow::Result<MapChanges> {
    let mut changes = MapChanges::default();
    let before = load_map_entries(store, previous, shape)?;
    let after = load_map_entries(store, current, shape)?;
    compare_sorted(before, after, |k, kind, p, c| record(&mut changes, k, kind, p, c))?;
    Ok(changes)
}

/// Reader for the legacy pointer layout.
mod legacy {
    use super::*;

    enum Pointer {
        Link(Cid),
        Bucket(Vec<(Vec<u8>, Ipld)>),
    }

    struct Node {
        bitmap: Vec<u8>,
        pointers: Vec<Pointer>,
    }

    pub(super) fn malformed(what: impl Into<String>) -> Error {
        Error::MalformedNode(what.into())
    }

    fn parse_bucket(items: Vec<Ipld>) -> Result<Vec<(Vec<u8>, Ipld)>, Error> {
        items
            .into_iter()
            .map(|kv| match kv {
                Ipld::List(mut pair) if pair.len() == 2 => {
                    let value = pair.pop().unwrap_or(Ipld::Null);
                    match pair.pop() {
                        Some(Ipld::Bytes(key)) => Ok((key, value)),
                        _ => Err(malformed("bucket key is not bytes")),
                    }
                }
                _ => Err(malformed("bucket entry is not a key/value pair")),
            })
            .collect()
    }

    fn parse_pointer(ipld: Ipld) -> Result<Pointer, Error> {
        let Ipld::Map(mut map) = ipld else {
            return Err(malformed("legacy pointer is not a map"));
        };
        if let Some(Ipld::Link(cid)) = map.remove("0") {
            Ok(Pointer::Link(cid))
        } else if let Some(Ipld::List(items)) = map.remove("1") {
            Ok(Pointer::Bucket(parse_bucket(items)?))
        } else {
            Err(malformed("legacy pointer has neither link nor bucket"))
        }
    }

    fn parse_node(ipld: Ipld) -> Result<Node, Error> {
        let Ipld::List(mut parts) = ipld else {
            return Err(malformed("node is not a list"));
        };
        if parts.len() != 2 {
            return Err(malformed(format!("node has {} fields", parts.len())));
        }
        let (Some(Ipld::List(pointers)), Some(Ipld::Bytes(bitmap))) = (parts.pop(), parts.pop())
        else {
            return Err(malformed("node fields have unexpected types"));
        };
        let pointers = pointers
            .into_iter()
            .map(parse_pointer)
            .collect::<Result<Vec<_>, _>>()?;
        let set_bits: u32 = bitmap.iter().map(|b| b.count_ones()).sum();
        if set_bits as usize != pointers.len() {
            return Err(malformed(format!(
                "bitmap has {set_bits} bits set for {} pointers",
                pointers.len()
            )));
        }
        Ok(Node { bitmap, pointers })
    }

    fn load_node<BS: Blockstore>(store: &BS, cid: &Cid) -> anyhow::Result<Node> {
        let ipld: Ipld = store.get_cbor_required(cid)?;
        Ok(parse_node(ipld)?)
    }

    /// Bitmaps are big-endian integers with leading zero bytes stripped.
    pub(super) fn bit_set(bitmap: &[u8], idx: usize) -> bool {
        let byte = idx / 8;
        match bitmap.len().checked_sub(byte + 1) {
            Some(pos) => bitmap.get(pos).is_some_and(|b| (b >> (idx % 8)) & 1 == 1),
            None => false,
        }
    }

    impl Node {
        /// Pointers laid out by slot index.
        fn slots(&self, width: usize) -> Vec<Option<&Pointer>> {
            let mut next = self.pointers.iter();
            (0..width)
                .map(|idx| {
                    if bit_set(&self.bitmap, idx) {
                        next.next()
                    } else {
                        None
                    }
                })
                .collect()
        }
    }

    fn flatten<BS: Blockstore>(
        store: &BS,
        pointer: &Pointer,
        out: &mut BTreeMap<Vec<u8>, Ipld>,
    ) -> anyhow::Result<()> {
        match pointer {
            Pointer::Bucket(entries) => {
                for (k, v) in entries {
                    out.insert(k.clone(), v.clone());
                }
            }
            Pointer::Link(cid) => {
                let node = load_node(store, cid)?;
                for child in &node.pointers {
                    flatten(store, child, out)?;
                }
            }
        }
        Ok(())
    }

    pub(super) fn entries<BS: Blockstore>(
        store: &BS,
        root: &Cid,
    ) -> anyhow::Result<BTreeMap<Vec<u8>, Ipld>> {
        let mut out = BTreeMap::new();
        flatten(store, &Pointer::Link(*root), &mut out)?;
        Ok(out)
    }

    pub(super) fn hash_bits(digest: &[u8], consumed: usize, count: u32) -> Option<usize> {
        let mut idx = 0usize;
        for bit in consumed..consumed + count as usize {
            let byte = digest.get(bit / 8)?;
            idx = (idx << 1) | usize::from((byte >> (7 - bit % 8)) & 1);
        }
        Some(idx)
    }

    pub(super) fn get<BS: Blockstore>(
        store: &BS,
        root: &Cid,
        shape: HamtShape,
        key: &[u8],
    ) -> anyhow::Result<Option<Ipld>> {
        let digest = Code::Sha2_256.digest(key);
        let digest = digest.digest();
        let width = 1usize << shape.bit_width;
        let mut node = load_node(store, root)?;
        let mut consumed = 0;
        loop {
            let Some(idx) = hash_bits(digest, consumed, shape.bit_width) else {
                return Ok(None);
            };
            consumed += shape.bit_width as usize;
            let next = match node.slots(width).get(idx).copied().flatten() {
                None => return Ok(None),
                Some(Pointer::Bucket(entries)) => {
                    return Ok(entries
                        .iter()
                        .find(|(k, _)| k.as_slice() == key)
                        .map(|(_, v)| v.clone()));
                }
                Some(Pointer::Link(cid)) => *cid,
            };
            node = load_node(store, &next)?;
        }
    }

    fn diff_nodes<BS: Blockstore>(
        store: &BS,
        previous: &Node,
        current: &Node,
        width: usize,
        changes: &mut MapChanges,
    ) -> anyhow::Result<()> {
        let prev_slots = previous.slots(width);
        let curr_slots = current.slots(width);
        for (prev, curr) in prev_slots.into_iter().zip(curr_slots) {
            match (prev, curr) {
                (None, None) => {}
                (Some(Pointer::Link(a)), Some(Pointer::Link(b))) if a == b => {}
                (Some(Pointer::Link(a)), Some(Pointer::Link(b))) => {
                    let a = load_node(store, a)?;
                    let b = load_node(store, b)?;
                    diff_nodes(store, &a, &b, width, changes)?;
                }
                (prev, curr) => {
                    let mut before = BTreeMap::new();
                    let mut after = BTreeMap::new();
                    if let Some(p) = prev {
                        flatten(store, p, &mut before)?;
                    }
                    if let Some(c) = curr {
                        flatten(store, c, &mut after)?;
                    }
                    compare_sorted(before, after, |k, kind, p, c| {
                        record(changes, k, kind, p, c)
                    })?;
                }
            }
        }
        Ok(())
    }

    pub(super) fn diff<BS: Blockstore>(
        store: &BS,
        previous: &Cid,
        current: &Cid,
        shape: HamtShape,
        changes: &mut MapChanges,
    ) -> anyhow::Result<()> {
        let width = 1usize << shape.bit_width;
        let prev = load_node(store, previous)?;
        let curr = load_node(store, current)?;
        diff_nodes(store, &prev, &curr, width, changes)
    }
}

#[cfg(test)]
mod tests {
    use super::legacy::{bit_set, hash_bits};
    use super::*;
    use crate::db::MemoryDB;
    use crate::utils::db::CborStoreExt as _;
    use multihash_codetable::MultihashDigest as _;
    use quickcheck_macros::quickcheck;

    fn build(store: &MemoryDB, entries: &BTreeMap<Vec<u8>, u64>) -> Cid {
        let mut hamt = Hamt::<_, u64>::new_with_bit_width(store, 5);
        for (k, v) in entries {
            hamt.set(BytesKey(k.clone()), *v).unwrap();
        }
        hamt.flush().unwrap()
    }

    type Item = (Vec<u8>, u64, Vec<u8>);

    /// Writes a legacy-layout map, pushing buckets of more than three
    /// entries down a level.
    fn build_legacy(store: &MemoryDB, entries: &BTreeMap<Vec<u8>, u64>) -> Cid {
        let items: Vec<Item> = entries
            .iter()
            .map(|(k, v)| (k.clone(), *v, Code::Sha2_256.digest(k).digest().to_vec()))
            .collect();
        legacy_node(store, &items, 0)
    }

    fn legacy_node(store: &MemoryDB, items: &[Item], depth: usize) -> Cid {
        let mut slots: BTreeMap<usize, Vec<Item>> = BTreeMap::new();
        for item in items {
            let idx = hash_bits(&item.2, depth * 5, 5).unwrap();
            slots.entry(idx).or_default().push(item.clone());
        }
        let mut bitmap = 0u32;
        let mut pointers = Vec::new();
        for (idx, bucket) in slots {
            bitmap |= 1 << idx;
            let (tag, pointer) = if bucket.len() > 3 {
                ("0", Ipld::Link(legacy_node(store, &bucket, depth + 1)))
            } else {
                let kvs = bucket
                    .into_iter()
                    .map(|(k, v, _)| Ipld::List(vec![Ipld::Bytes(k), Ipld::Integer(v.into())]))
                    .collect();
                ("1", Ipld::List(kvs))
            };
            pointers.push(Ipld::Map(BTreeMap::from([(tag.to_string(), pointer)])));
        }
        let bitmap: Vec<u8> = bitmap
            .to_be_bytes()
            .into_iter()
            .skip_while(|b| *b == 0)
            .collect();
        store
            .put_cbor_default(&Ipld::List(vec![Ipld::Bytes(bitmap), Ipld::List(pointers)]))
            .unwrap()
    }

    fn numbered(n: u64) -> BTreeMap<Vec<u8>, u64> {
        (0..n).map(|i| (i.to_be_bytes().to_vec(), i * 10)).collect()
    }

    fn sorted(changes: MapChanges) -> Vec<MapChange> {
        let mut all: Vec<_> = changes.into_changes().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }

    fn widen(m: BTreeMap<Vec<u8>, u8>) -> BTreeMap<Vec<u8>, u64> {
        m.into_iter().map(|(k, v)| (k, u64::from(v))).collect()
    }

    #[test]
    fn bitmap_bits_are_big_endian() {
        assert!(bit_set(&[0b0000_0001], 0));
        assert!(!bit_set(&[0b0000_0001], 1));
        assert!(bit_set(&[0b0000_0001, 0b0000_0000], 8));
        assert!(!bit_set(&[], 0));
        assert!(!bit_set(&[0xff], 8));
    }

    #[test]
    fn layout_is_read_from_the_root() {
        let store = MemoryDB::default();
        let entries = numbered(50);
        let current = build(&store, &entries);
        let legacy = build_legacy(&store, &entries);
        assert_eq!(hamt_layout(&store, &current).unwrap(), HamtLayout::Current);
        assert_eq!(hamt_layout(&store, &legacy).unwrap(), HamtLayout::Legacy);
        let empty = build(&store, &BTreeMap::new());
        assert_eq!(hamt_layout(&store, &empty).unwrap(), HamtLayout::Current);
    }

    #[test]
    fn lookup_finds_inserted_keys() {
        let store = MemoryDB::default();
        let entries = numbered(200);
        let shape = HamtShape::default();
        for root in [build(&store, &entries), build_legacy(&store, &entries)] {
            for (k, v) in &entries {
                let found = hamt_get(&store, &root, shape, k).unwrap();
                assert_eq!(found, Some(Ipld::Integer(i128::from(*v))));
            }
            assert_eq!(hamt_get(&store, &root, shape, b"absent").unwrap(), None);
        }
    }

    #[test]
    fn all_entries_are_loaded() {
        let store = MemoryDB::default();
        let entries: BTreeMap<Vec<u8>, u64> =
            (0u64..100).map(|i| (vec![i as u8; 3], i)).collect();
        let shape = HamtShape::default();
        let current = load_map_entries(&store, &build(&store, &entries), shape).unwrap();
        let legacy = load_map_entries(&store, &build_legacy(&store, &entries), shape).unwrap();
        assert_eq!(current.len(), 100);
        assert_eq!(current, legacy);
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let store = MemoryDB::default();
        let root = build(&store, &BTreeMap::new());
        let err = diff_map(
            &store,
            &root,
            HamtShape { bit_width: 5 },
            &root,
            HamtShape { bit_width: 8 },
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn current_pointers_are_malformed_in_a_legacy_walk() {
        let store = MemoryDB::default();
        let root = build(&store, &numbered(3));
        let err = legacy::entries(&store, &root).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::MalformedNode(_))
        ));
    }

    #[quickcheck]
    fn legacy_structural_matches_naive(
        prev: BTreeMap<Vec<u8>, u8>,
        curr: BTreeMap<Vec<u8>, u8>,
    ) -> bool {
        let store = MemoryDB::default();
        let prev = build_legacy(&store, &widen(prev));
        let curr = build_legacy(&store, &widen(curr));
        let shape = HamtShape::default();
        let structural = sorted(diff_map(&store, &prev, shape, &curr, shape).unwrap());
        let naive = sorted(diff_map_naive(&store, &prev, &curr).unwrap());
        structural == naive
    }

    #[quickcheck]
    fn layouts_diff_alike(prev: BTreeMap<Vec<u8>, u8>, curr: BTreeMap<Vec<u8>, u8>) -> bool {
        let store = MemoryDB::default();
        let (prev, curr) = (widen(prev), widen(curr));
        let shape = HamtShape::default();
        let legacy = diff_map(
            &store,
            &build_legacy(&store, &prev),
            shape,
            &build_legacy(&store, &curr),
            shape,
        )
        .unwrap();
        let current = diff_map(
            &store,
            &build(&store, &prev),
            shape,
            &build(&store, &curr),
            shape,
        )
        .unwrap();
        sorted(legacy) == sorted(current)
    }

    #[test]
    fn detects_each_kind() {
        let store = MemoryDB::default();
        let prev_entries = BTreeMap::from([(b"a".to_vec(), 1), (b"b".to_vec(), 2)]);
        let curr_entries = BTreeMap::from([(b"b".to_vec(), 3), (b"c".to_vec(), 4)]);
        let shape = HamtShape::default();
        let pairs = [
            (build(&store, &prev_entries), build(&store, &curr_entries)),
            (
                build_legacy(&store, &prev_entries),
                build_legacy(&store, &curr_entries),
            ),
            // Across the layout upgrade.
            (
                build_legacy(&store, &prev_entries),
                build(&store, &curr_entries),
            ),
        ];
        for (prev, curr) in pairs {
            let changes = diff_map(&store, &prev, shape, &curr, shape).unwrap();
            assert_eq!(changes.added.len(), 1);
            assert_eq!(changes.added[0].key, b"c".to_vec());
            assert_eq!(changes.modified.len(), 1);
            assert_eq!(changes.modified[0].key, b"b".to_vec());
            let prev_value: u64 = changes.modified[0]
                .previous
                .as_ref()
                .unwrap()
                .decode()
                .unwrap();
            assert_eq!(prev_value, 2);
            assert_eq!(changes.removed.len(), 1);
            assert_eq!(changes.removed[0].key, b"a".to_vec());
        }
    }
}
