// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use ahash::HashMap;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use parking_lot::RwLock;

/// Thread-safe in-memory block store. Used as the task-local store for diff
/// containers and as the backing store of test fixtures.
#[derive(Debug, Default)]
pub struct MemoryDB {
    blocks: RwLock<HashMap<Cid, Vec<u8>>>,
}

impl MemoryDB {
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }
}

impl Blockstore for MemoryDB {
    fn get(&self, k: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.blocks.read().get(k).cloned())
    }

    fn put_keyed(&self, k: &Cid, block: &[u8]) -> anyhow::Result<()> {
        self.blocks.write().insert(*k, block.to_vec());
        Ok(())
    }

    fn has(&self, k: &Cid) -> anyhow::Result<bool> {
        Ok(self.blocks.read().contains_key(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::db::CborStoreExt as _;
    use fvm_ipld_encoding::CborStore as _;

    #[test]
    fn put_then_get() {
        let db = MemoryDB::default();
        let cid = db.put_cbor_default(&(1u64, "two".to_string())).unwrap();
        assert!(db.has(&cid).unwrap());
        let value: (u64, String) = db.get_cbor(&cid).unwrap().unwrap();
        assert_eq!(value, (1, "two".to_string()));
        assert_eq!(db.len(), 1);
    }
}
