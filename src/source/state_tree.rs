// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::Context as _;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;
use ipld_core::ipld::Ipld;

use super::types::{ActorChange, ActorDelta, ActorState};
use crate::diff::{ChangeKind, HamtShape, MapChange, diff_map, hamt_get, load_map_entries};
use crate::shim::actors::{INIT_ACTOR_ADDR, init};
use crate::shim::address::{Address, Protocol};
use crate::utils::db::BlockstoreExt as _;

/// Versioned state tree root, used from state tree version 1 onwards.
#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq)]
pub struct StateRoot {
    pub version: u64,
    pub actors: Cid,
    pub info: Cid,
}

/// Read-only view of a state tree.
pub struct StateTree<'a, BS> {
    store: &'a BS,
    version: u64,
    actors: Cid,
}

impl<'a, BS: Blockstore> StateTree<'a, BS> {
    /// Opens the tree at `root`. Version 0 trees have no root envelope: the
    /// root is the actors map itself.
    pub fn new(store: &'a BS, root: &Cid) -> anyhow::Result<Self> {
        let ipld: Ipld = store.get_cbor_required(root)?;
        match ipld {
            Ipld::List(ref fields) if fields.len() == 3 => {
                let root: StateRoot = fvm_ipld_encoding::from_slice(&store.get_required(root)?)
                    .context("failed to decode state root")?;
                Ok(Self {
                    store,
                    version: root.version,
                    actors: root.actors,
                })
            }
            _ => Ok(Self {
                store,
                version: 0,
                actors: *root,
            }),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn actors_root(&self) -> &Cid {
        &self.actors
    }

    /// Gets the actor stored under an id address.
    pub fn get_actor_by_id(&self, addr: &Address) -> anyhow::Result<Option<ActorState>> {
        hamt_get(self.store, &self.actors, HamtShape::default(), &addr.to_bytes())?
            .map(|ipld| ActorState::decode(&fvm_ipld_encoding::to_vec(&ipld)?))
            .transpose()
    }

    /// Resolves any address to its id address through the init actor.
    pub fn lookup_id(&self, addr: &Address) -> anyhow::Result<Option<Address>> {
        if addr.protocol() == Protocol::ID {
            return Ok(Some(*addr));
        }
        let init_actor = self
            .get_actor_by_id(&INIT_ACTOR_ADDR)?
            .context("init actor not found")?;
        let state = init::State::load(self.store, &init_actor.head)?;
        match hamt_get(
            self.store,
            &state.address_map,
            HamtShape::default(),
            &addr.to_bytes(),
        )? {
            Some(Ipld::Integer(id)) => Ok(Some(Address::new_id(
                u64::try_from(id).context("actor id out of range")?,
            ))),
            Some(other) => anyhow::bail!("unexpected address map entry {other:?}"),
            None => Ok(None),
        }
    }

    pub fn get_actor(&self, addr: &Address) -> anyhow::Result<Option<ActorState>> {
        match self.lookup_id(addr)? {
            Some(id) => self.get_actor_by_id(&id),
            None => Ok(None),
        }
    }

    /// Visits every actor in the tree.
    pub fn for_each(
        &self,
        mut f: impl FnMut(Address, ActorState) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        for (key, value) in load_map_entries(self.store, &self.actors, HamtShape::default())? {
            let addr = Address::from_bytes(&key)?;
            let actor = ActorState::decode(&fvm_ipld_encoding::to_vec(&value)?)?;
            f(addr, actor)?;
        }
        Ok(())
    }
}

fn decode_entry(change: &MapChange) -> anyhow::Result<ActorChange> {
    let address = Address::from_bytes(&change.key)?;
    let decode = |payload: Option<&crate::diff::Deferred>| {
        payload.map(|p| ActorState::decode(p.bytes())).transpose()
    };
    let previous = decode(change.previous.as_ref())?;
    let current = decode(change.current.as_ref())?;
    let delta = match (change.kind, previous, current) {
        (ChangeKind::Add, None, Some(current)) => ActorDelta::Added { current },
        (ChangeKind::Remove, Some(previous), None) => ActorDelta::Removed { previous },
        (ChangeKind::Modify, Some(previous), Some(current)) => {
            ActorDelta::Modified { previous, current }
        }
        (kind, ..) => anyhow::bail!("inconsistent {kind} change for actor {address}"),
    };
    Ok(ActorChange { address, delta })
}

/// Lists the actors whose entries differ between two state roots.
pub fn diff_state_trees<BS: Blockstore>(
    store: &BS,
    previous_root: &Cid,
    current_root: &Cid,
) -> anyhow::Result<Vec<ActorChange>> {
    if previous_root == current_root {
        return Ok(Vec::new());
    }
    let previous = StateTree::new(store, previous_root)?;
    let current = StateTree::new(store, current_root)?;
    let shape = HamtShape::default();
    diff_map(store, previous.actors_root(), shape, current.actors_root(), shape)?
        .into_changes()
        .map(|change| decode_entry(&change))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDB;
    use crate::shim::econ::TokenAmount;
    use crate::source::types::ActorStateV4;
    use crate::utils::db::CborStoreExt as _;
    use crate::utils::encoding::raw_cid;
    use fil_actors_shared::fvm_ipld_hamt::{BytesKey, Hamt};

    fn actor(head: &[u8], balance: u64) -> ActorState {
        ActorState::new(
            raw_cid(b"code"),
            raw_cid(head),
            TokenAmount::from_atto(balance),
            0,
        )
    }

    fn tree(store: &MemoryDB, actors: &[(u64, ActorState)], versioned: bool) -> Cid {
        let mut hamt = Hamt::<_, ActorStateV4>::new_with_bit_width(store, 5);
        for (id, state) in actors {
            hamt.set(
                BytesKey(Address::new_id(*id).to_bytes()),
                state.clone().into(),
            )
            .unwrap();
        }
        let actors = hamt.flush().unwrap();
        if versioned {
            let info = store.put_cbor_default(&Vec::<u8>::new()).unwrap();
            store
                .put_cbor_default(&StateRoot {
                    version: 4,
                    actors,
                    info,
                })
                .unwrap()
        } else {
            actors
        }
    }

    #[test]
    fn reads_both_root_layouts() {
        let store = MemoryDB::default();
        for versioned in [false, true] {
            let root = tree(&store, &[(1000, actor(b"a", 5))], versioned);
            let tree = StateTree::new(&store, &root).unwrap();
            assert_eq!(tree.version(), if versioned { 4 } else { 0 });
            assert_eq!(
                tree.get_actor_by_id(&Address::new_id(1000)).unwrap(),
                Some(actor(b"a", 5))
            );
            assert_eq!(tree.get_actor_by_id(&Address::new_id(1001)).unwrap(), None);
        }
    }

    #[test]
    fn diff_reports_each_kind() {
        let store = MemoryDB::default();
        let prev = tree(
            &store,
            &[(1000, actor(b"a", 5)), (1001, actor(b"b", 5))],
            true,
        );
        let curr = tree(
            &store,
            &[(1001, actor(b"b2", 5)), (1002, actor(b"c", 5))],
            true,
        );
        let mut changes = diff_state_trees(&store, &prev, &curr).unwrap();
        changes.sort_by_key(|c| c.address.id().unwrap());
        let kinds: Vec<_> = changes
            .iter()
            .map(|c| (c.address.id().unwrap(), c.kind()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (1000, ChangeKind::Remove),
                (1001, ChangeKind::Modify),
                (1002, ChangeKind::Add)
            ]
        );
        assert_eq!(changes[1].previous().unwrap().head, raw_cid(b"b"));
        assert_eq!(changes[1].actor().head, raw_cid(b"b2"));
        assert_eq!(changes[0].actor().head, raw_cid(b"a"));
    }

    #[test]
    fn same_root_has_no_changes() {
        let store = MemoryDB::default();
        let root = tree(&store, &[(1000, actor(b"a", 5))], true);
        assert!(diff_state_trees(&store, &root, &root).unwrap().is_empty());
    }
}
