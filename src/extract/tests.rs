// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::*;
use crate::db::MemoryDB;
use crate::shim::actors::init;
use crate::shim::econ::TokenAmount;
use crate::source::{ActorDelta, ActorState};
use crate::test_utils::tipset_at;
use crate::utils::db::CborStoreExt as _;
use crate::utils::encoding::raw_cid;
use fil_actors_shared::fvm_ipld_hamt::{BytesKey, Hamt};
use strum::IntoEnumIterator as _;

fn code(family: ActorFamily) -> Cid {
    ActorCodeRegistry::default()
        .code_for(family, ActorVersion::V7)
        .unwrap()
}

fn init_state(store: &MemoryDB, ids: &[(Address, u64)]) -> Cid {
    let mut map = Hamt::<_, u64>::new_with_bit_width(store, 5);
    for (address, id) in ids {
        map.set(BytesKey(address.to_bytes()), *id).unwrap();
    }
    let address_map = map.flush().unwrap();
    store
        .put_cbor_default(&init::State {
            address_map,
            next_id: 1000 + ids.len() as u64,
            network_name: "testnet".into(),
        })
        .unwrap()
}

fn actor(code: Cid, head: Cid) -> ActorState {
    ActorState::new(code, head, TokenAmount::from_atto(0), 0)
}

fn run(
    store: &MemoryDB,
    changes: &[ActorChange],
    families: impl IntoIterator<Item = DiffFamily>,
) -> anyhow::Result<DiffContainer> {
    extract_state(
        store,
        &ActorCodeRegistry::default(),
        &tipset_at(11, 0),
        &tipset_at(10, 0),
        ActorVersion::V7,
        changes,
        &families.into_iter().collect(),
    )
}

#[test]
fn raw_only_does_not_resolve_codes() {
    let store = MemoryDB::default();
    let head = store.put_cbor_default(&(1u8, 2u8)).unwrap();
    let change = ActorChange {
        address: Address::new_id(1234),
        delta: ActorDelta::Added {
            current: actor(raw_cid(b"not a builtin"), head),
        },
    };
    let container = run(&store, &[change], [DiffFamily::Raw]).unwrap();
    let raw = &container.raw[&Address::new_id(1234)];
    assert_eq!(raw.kind, ChangeKind::Add);
    assert_eq!(raw.head, head);
    assert!(raw.state.is_some());
}

#[test]
fn unknown_code_fails_typed_extraction() {
    let store = MemoryDB::default();
    let head = store.put_cbor_default(&(1u8, 2u8)).unwrap();
    let unknown = raw_cid(b"not a builtin");
    let change = ActorChange {
        address: Address::new_id(1234),
        delta: ActorDelta::Added {
            current: actor(unknown, head),
        },
    };
    let err = run(&store, &[change], DiffFamily::iter()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::MissingActorCode(c)) if *c == unknown
    ));
}

#[test]
fn removed_raw_actor_has_no_state() {
    let store = MemoryDB::default();
    let change = ActorChange {
        address: Address::new_id(77),
        delta: ActorDelta::Removed {
            previous: actor(code(ActorFamily::Account), raw_cid(b"gone")),
        },
    };
    let container = run(&store, &[change], DiffFamily::iter()).unwrap();
    let raw = &container.raw[&Address::new_id(77)];
    assert_eq!(raw.kind, ChangeKind::Remove);
    assert_eq!(raw.state, None);
}

#[test]
fn singleton_removal_is_an_error() {
    let store = MemoryDB::default();
    let change = ActorChange {
        address: crate::shim::actors::REWARD_ACTOR_ADDR,
        delta: ActorDelta::Removed {
            previous: actor(code(ActorFamily::Reward), raw_cid(b"reward")),
        },
    };
    let err = run(&store, &[change], [DiffFamily::Reward]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::UnexpectedRemoval(ActorFamily::Reward))
    ));
}

#[test]
fn init_address_changes_are_collected() {
    let store = MemoryDB::default();
    let alice = Address::new_secp256k1(&[1; 65]).unwrap();
    let bob = Address::new_secp256k1(&[2; 65]).unwrap();
    let previous = init_state(&store, &[(alice, 1000)]);
    let current = init_state(&store, &[(alice, 1000), (bob, 1001)]);
    let change = ActorChange {
        address: crate::shim::actors::INIT_ACTOR_ADDR,
        delta: ActorDelta::Modified {
            previous: actor(code(ActorFamily::Init), previous),
            current: actor(code(ActorFamily::Init), current),
        },
    };
    let container = run(&store, &[change], [DiffFamily::Init]).unwrap();
    assert!(container.raw.is_empty());
    assert_eq!(container.init.len(), 1);
    let added = &container.init[0];
    assert_eq!(added.kind, ChangeKind::Add);
    assert_eq!(added.key, bob.to_bytes());
    let id: u64 = added.current.as_ref().unwrap().decode().unwrap();
    assert_eq!(id, 1001);
}

#[test]
fn disabled_family_only_gets_raw_diff() {
    let store = MemoryDB::default();
    let head = init_state(&store, &[]);
    let change = ActorChange {
        address: crate::shim::actors::INIT_ACTOR_ADDR,
        delta: ActorDelta::Added {
            current: actor(code(ActorFamily::Init), head),
        },
    };
    let container = run(&store, &[change], [DiffFamily::Raw, DiffFamily::Miner]).unwrap();
    assert_eq!(container.raw.len(), 1);
    assert!(container.init.is_empty());
}

#[test]
fn container_carries_tipset_pair() {
    let store = MemoryDB::default();
    let container = run(&store, &[], DiffFamily::iter()).unwrap();
    assert_eq!(container.current_height, 11);
    assert_eq!(container.executed_height, 10);
    assert_eq!(container.actor_version, ActorVersion::V7);
    assert!(container.miners.is_empty());
}
