// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use ahash::HashMap;
use cid::{Cid, multihash::Multihash};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator as _};

use crate::shim::version::ActorVersion;
use crate::utils::encoding::RAW;

const IDENTITY: u64 = 0x00;

/// Built-in actor families, named as in the actor bundle manifests.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActorFamily {
    Account,
    Cron,
    Init,
    Multisig,
    #[strum(serialize = "paymentchannel")]
    #[serde(rename = "paymentchannel")]
    PaymentChannel,
    Reward,
    #[strum(serialize = "storagemarket")]
    #[serde(rename = "storagemarket")]
    StorageMarket,
    #[strum(serialize = "storageminer")]
    #[serde(rename = "storageminer")]
    StorageMiner,
    #[strum(serialize = "storagepower")]
    #[serde(rename = "storagepower")]
    StoragePower,
    System,
    #[strum(serialize = "verifiedregistry")]
    #[serde(rename = "verifiedregistry")]
    VerifiedRegistry,
    Datacap,
}

/// A resolved actor code: which family and generation it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuiltinActor {
    pub family: ActorFamily,
    pub version: ActorVersion,
}

impl BuiltinActor {
    /// Human readable actor name, e.g. `fil/2/storageminer`. The first
    /// generation is published under the `fil/1` prefix.
    pub fn name(&self) -> String {
        format!("fil/{}/{}", legacy_prefix(self.version), self.family)
    }
}

fn legacy_prefix(version: ActorVersion) -> u64 {
    match version {
        ActorVersion::V0 => 1,
        v => v.number(),
    }
}

/// Well-known code of a pre-bundle actor: a raw CID over an identity
/// multihash of its name.
pub fn legacy_code(family: ActorFamily, version: ActorVersion) -> Option<Cid> {
    if !version.uses_legacy_codes() || family == ActorFamily::Datacap {
        return None;
    }
    let name = BuiltinActor { family, version }.name();
    Multihash::<64>::wrap(IDENTITY, name.as_bytes())
        .ok()
        .map(|mh| Cid::new_v1(RAW, mh))
}

/// Resolves actor code CIDs to their family and generation. Legacy codes
/// are known statically; bundle codes (v8 onwards) are registered from the
/// node's manifests.
#[derive(Debug, Clone)]
pub struct ActorCodeRegistry {
    by_code: HashMap<Cid, BuiltinActor>,
}

impl Default for ActorCodeRegistry {
    fn default() -> Self {
        let mut by_code = HashMap::default();
        for version in ActorVersion::all().filter(|v| v.uses_legacy_codes()) {
            for family in ActorFamily::iter() {
                if let Some(code) = legacy_code(family, version) {
                    by_code.insert(code, BuiltinActor { family, version });
                }
            }
        }
        Self { by_code }
    }
}

impl ActorCodeRegistry {
    /// Registers a bundle code for `family` at `version`.
    pub fn register(&mut self, code: Cid, family: ActorFamily, version: ActorVersion) {
        self.by_code.insert(code, BuiltinActor { family, version });
    }

    pub fn lookup(&self, code: &Cid) -> Option<BuiltinActor> {
        self.by_code.get(code).copied()
    }

    pub fn code_for(&self, family: ActorFamily, version: ActorVersion) -> Option<Cid> {
        self.by_code
            .iter()
            .find(|(_, actor)| actor.family == family && actor.version == version)
            .map(|(code, _)| *code)
    }
}
