// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::Context as _;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::CborStore;
use multihash_codetable::Code;
use serde::de::DeserializeOwned;

/// Extension methods for reading blocks that must be present.
pub trait BlockstoreExt: Blockstore {
    fn get_required(&self, cid: &Cid) -> anyhow::Result<Vec<u8>> {
        self.get(cid)?
            .with_context(|| format!("Entry not found in block store: cid={cid}"))
    }

    fn get_cbor_required<T: DeserializeOwned>(&self, cid: &Cid) -> anyhow::Result<T>
    where
        Self: Sized,
    {
        self.get_cbor(cid)?
            .with_context(|| format!("Entry not found in block store: cid={cid}"))
    }
}

impl<T: Blockstore> BlockstoreExt for T {}

/// Extension methods for inserting CBOR objects with the Filecoin defaults.
pub trait CborStoreExt: Blockstore + Sized {
    /// Default multihash code is [`Code::Blake2b256`]
    /// See <https://github.com/ipfs/go-ipld-cbor/blob/v0.0.6/store.go#L92>
    fn default_code() -> Code {
        Code::Blake2b256
    }

    /// A wrapper of [`CborStore::put_cbor`] that omits code parameter to match store API in go
    fn put_cbor_default<S: serde::ser::Serialize>(&self, obj: &S) -> anyhow::Result<Cid> {
        self.put_cbor(obj, Self::default_code())
    }

    /// Stores an opaque blob under the raw codec.
    fn put_raw(&self, bytes: &[u8]) -> anyhow::Result<Cid> {
        let cid = crate::utils::encoding::raw_cid(bytes);
        self.put_keyed(&cid, bytes)?;
        Ok(cid)
    }
}

impl<T: Blockstore> CborStoreExt for T {}
