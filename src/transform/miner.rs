// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::BTreeMap;

use fil_actors_shared::fvm_ipld_bitfield::BitField;

use super::RowKey;
use crate::container::MinerDiff;
use crate::diff::{ArrayChange, ChangeKind};
use crate::extract::{FundsChange, MinerInfoChange, SectorStatusChange};
use crate::model::{self, Rows, SectorEvent};
use crate::shim::actors::miner::{MinerInfo, SectorOnChainInfo, SectorPreCommitOnChainInfo};
use crate::shim::address::Address;
use crate::shim::clock::EPOCH_UNDEFINED;
use crate::shim::version::ActorVersion;

pub(super) fn transform(
    key: &RowKey,
    version: ActorVersion,
    miners: &BTreeMap<Address, MinerDiff>,
) -> Rows {
    let mut rows = Rows::default();
    for (address, diff) in miners {
        let miner = Miner {
            key,
            id: address.to_string(),
            version,
        };
        if let Some(info) = &diff.info {
            rows.push_result(format!("miner {} info", miner.id), miner.info(info));
        }
        for change in &diff.sectors {
            if let Err(e) = miner.sector(change, &mut rows) {
                rows.error(format!("miner {} sector {}: {e:#}", miner.id, change.key));
            }
        }
        for change in &diff.pre_commits {
            if let Err(e) = miner.pre_commit(change, &mut rows) {
                rows.error(format!("miner {} pre-commit {}: {e:#}", miner.id, change.key));
            }
        }
        if let Some(status) = &diff.sector_status {
            miner.sector_status(status, &mut rows);
        }
        if let Some(funds) = &diff.funds {
            miner.funds(funds, &mut rows);
        }
    }
    rows
}

struct Miner<'a> {
    key: &'a RowKey,
    id: String,
    version: ActorVersion,
}

impl Miner<'_> {
    fn info(&self, change: &MinerInfoChange) -> anyhow::Result<model::MinerInfo> {
        let info = MinerInfo::decode(change.info.bytes(), self.version)?;
        Ok(model::MinerInfo {
            height: self.key.height,
            miner_id: self.id.clone(),
            state_root: self.key.state_root.clone(),
            owner_id: info.owner.to_string(),
            worker_id: info.worker.to_string(),
            new_worker: info
                .pending_worker_key
                .as_ref()
                .map(|k| k.new_worker.to_string()),
            worker_change_epoch: info
                .pending_worker_key
                .as_ref()
                .map_or(EPOCH_UNDEFINED, |k| k.effective_at),
            consensus_faulted_elapsed: info.consensus_fault_elapsed,
            peer_id: (!info.peer_id.is_empty()).then(|| hex::encode(&info.peer_id)),
            control_addresses: info
                .control_addresses
                .iter()
                .map(ToString::to_string)
                .collect(),
            multi_addresses: info.multi_addresses.iter().map(hex::encode).collect(),
            sector_size: info.sector_size,
        })
    }

    fn event(&self, sector_id: u64, event: SectorEvent) -> model::MinerSectorEvent {
        model::MinerSectorEvent {
            height: self.key.height,
            miner_id: self.id.clone(),
            sector_id,
            state_root: self.key.state_root.clone(),
            event,
        }
    }

    fn deals(&self, sector: &SectorOnChainInfo, rows: &mut Rows) {
        rows.extend(sector.deal_ids.iter().map(|deal_id| model::MinerSectorDeal {
            height: self.key.height,
            miner_id: self.id.clone(),
            sector_id: sector.sector_number,
            deal_id: *deal_id,
        }));
    }

    /// Removed sectors surface through the sector status bitfields.
    fn sector(&self, change: &ArrayChange, rows: &mut Rows) -> anyhow::Result<()> {
        let Some(current) = &change.current else {
            return Ok(());
        };
        let sector = SectorOnChainInfo::decode(current.bytes(), self.version)?;
        match change.kind {
            ChangeKind::Add => {
                let event = if sector.deal_ids.is_empty() {
                    SectorEvent::CommitCapacityAdded
                } else {
                    SectorEvent::SectorAdded
                };
                rows.push(self.event(sector.sector_number, event));
                self.deals(&sector, rows);
            }
            ChangeKind::Modify => {
                // An upgrade may have rewritten the sector in a newer layout.
                let previous = change
                    .previous
                    .as_ref()
                    .map(|p| SectorOnChainInfo::decode_any(p.bytes()))
                    .transpose()?;
                if let Some(previous) = previous {
                    if previous.expiration != sector.expiration {
                        rows.push(self.event(sector.sector_number, SectorEvent::SectorExtended));
                    }
                    if self.version >= ActorVersion::V7
                        && previous.sector_key_cid.is_none()
                        && sector.sector_key_cid.is_some()
                    {
                        rows.push(self.event(sector.sector_number, SectorEvent::SectorSnapped));
                        self.deals(&sector, rows);
                    }
                }
            }
            ChangeKind::Remove | ChangeKind::Unknown => return Ok(()),
        }
        if self.version < ActorVersion::V7 {
            rows.push(model::MinerSectorInfo {
                height: self.key.height,
                miner_id: self.id.clone(),
                sector_id: sector.sector_number,
                state_root: self.key.state_root.clone(),
                sealed_cid: sector.sealed_cid.to_string(),
                activation_epoch: sector.activation,
                expiration_epoch: sector.expiration,
                deal_weight: sector.deal_weight.to_string(),
                verified_deal_weight: sector.verified_deal_weight.to_string(),
                initial_pledge: sector.initial_pledge.atto().to_string(),
                expected_day_reward: sector.expected_day_reward.atto().to_string(),
                expected_storage_pledge: sector.expected_storage_pledge.atto().to_string(),
            });
        } else {
            rows.push(model::MinerSectorInfoV7 {
                height: self.key.height,
                miner_id: self.id.clone(),
                sector_id: sector.sector_number,
                state_root: self.key.state_root.clone(),
                sealed_cid: sector.sealed_cid.to_string(),
                activation_epoch: sector.activation,
                expiration_epoch: sector.expiration,
                deal_weight: sector.deal_weight.to_string(),
                verified_deal_weight: sector.verified_deal_weight.to_string(),
                initial_pledge: sector.initial_pledge.atto().to_string(),
                expected_day_reward: sector.expected_day_reward.atto().to_string(),
                expected_storage_pledge: sector.expected_storage_pledge.atto().to_string(),
                sector_key_cid: sector.sector_key_cid.map(|c| c.to_string()),
            });
        }
        Ok(())
    }

    fn pre_commit(&self, change: &ArrayChange, rows: &mut Rows) -> anyhow::Result<()> {
        let (ChangeKind::Add, Some(current)) = (change.kind, &change.current) else {
            return Ok(());
        };
        let pre_commit = SectorPreCommitOnChainInfo::decode(current.bytes(), self.version)?;
        let info = &pre_commit.info;
        rows.push(self.event(info.sector_number, SectorEvent::PreCommitAdded));
        if self.version >= ActorVersion::V9 {
            rows.push(model::MinerPreCommitInfoV9 {
                height: self.key.height,
                miner_id: self.id.clone(),
                sector_id: info.sector_number,
                state_root: self.key.state_root.clone(),
                pre_commit_deposit: pre_commit.pre_commit_deposit.atto().to_string(),
                pre_commit_epoch: pre_commit.pre_commit_epoch,
                sealed_cid: info.sealed_cid.to_string(),
                seal_rand_epoch: info.seal_rand_epoch,
                expiration_epoch: info.expiration,
                deal_ids: info.deal_ids.clone(),
                unsealed_cid: info.unsealed_cid.map(|c| c.to_string()),
            });
        } else {
            let replace = info.replace_capacity;
            rows.push(model::MinerPreCommitInfo {
                height: self.key.height,
                miner_id: self.id.clone(),
                sector_id: info.sector_number,
                state_root: self.key.state_root.clone(),
                sealed_cid: info.sealed_cid.to_string(),
                seal_rand_epoch: info.seal_rand_epoch,
                expiration_epoch: info.expiration,
                pre_commit_deposit: pre_commit.pre_commit_deposit.atto().to_string(),
                pre_commit_epoch: pre_commit.pre_commit_epoch,
                deal_weight: pre_commit
                    .deal_weight
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                verified_deal_weight: pre_commit
                    .verified_deal_weight
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                is_replace_capacity: replace.is_some(),
                replace_sector_deadline: replace.map(|r| r.deadline),
                replace_sector_partition: replace.map(|r| r.partition),
                replace_sector_number: replace.map(|r| r.sector),
            });
        }
        Ok(())
    }

    fn sector_status(&self, status: &SectorStatusChange, rows: &mut Rows) {
        let sets: [(&BitField, SectorEvent); 4] = [
            (&status.terminated, SectorEvent::SectorTerminated),
            (&status.faulted, SectorEvent::SectorFaulted),
            (&status.recovering, SectorEvent::SectorRecovering),
            (&status.recovered, SectorEvent::SectorRecovered),
        ];
        for (sectors, event) in sets {
            rows.extend(sectors.iter().map(|sector| self.event(sector, event)));
        }
    }

    fn funds(&self, funds: &FundsChange, rows: &mut Rows) {
        rows.push(model::MinerLockedFund {
            height: self.key.height,
            miner_id: self.id.clone(),
            state_root: self.key.state_root.clone(),
            locked_funds: funds.locked_funds.atto().to_string(),
            initial_pledge: funds.initial_pledge.atto().to_string(),
            pre_commit_deposits: funds.pre_commit_deposits.atto().to_string(),
        });
        rows.push(model::MinerFeeDebt {
            height: self.key.height,
            miner_id: self.id.clone(),
            state_root: self.key.state_root.clone(),
            fee_debt: funds.fee_debt.atto().to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Deferred;
    use crate::shim::actors::miner::{SectorOnChainInfoV2, SectorOnChainInfoV7};
    use crate::shim::bigint::BigInt;
    use crate::shim::econ::TokenAmount;
    use crate::tasks::Table;
    use crate::transform::test_support::written;
    use crate::utils::encoding::raw_cid;
    use pretty_assertions::assert_eq;

    fn key() -> RowKey {
        RowKey {
            height: 100,
            state_root: "root".into(),
        }
    }

    fn sector_v7(number: u64, expiration: i64, deals: Vec<u64>, key_cid: bool) -> Deferred {
        Deferred::encode(&SectorOnChainInfoV7 {
            sector_number: number,
            seal_proof: 8,
            sealed_cid: raw_cid(b"sealed"),
            deal_ids: deals,
            activation: 10,
            expiration,
            deal_weight: BigInt::from(0),
            verified_deal_weight: BigInt::from(0),
            initial_pledge: TokenAmount::from_atto(1),
            expected_day_reward: TokenAmount::from_atto(2),
            expected_storage_pledge: TokenAmount::from_atto(3),
            replaced_sector_age: 0,
            replaced_day_reward: TokenAmount::from_atto(0),
            sector_key_cid: key_cid.then(|| raw_cid(b"key")),
        })
        .unwrap()
    }

    fn change(
        key: u64,
        kind: ChangeKind,
        previous: Option<Deferred>,
        current: Option<Deferred>,
    ) -> ArrayChange {
        ArrayChange {
            key,
            kind,
            previous,
            current,
        }
    }

    fn events(writer: &crate::sink::BatchWriter) -> Vec<(u64, String)> {
        writer
            .rows(Table::MinerSectorEvents)
            .into_iter()
            .map(|r| {
                (
                    r["sector_id"].as_u64().unwrap(),
                    r["event"].as_str().unwrap().to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn sector_events_from_changes() {
        let mut terminated = BitField::new();
        terminated.set(5);
        let diff = MinerDiff {
            sectors: vec![
                change(1, ChangeKind::Add, None, Some(sector_v7(1, 500, vec![], false))),
                change(2, ChangeKind::Add, None, Some(sector_v7(2, 500, vec![7, 8], false))),
                change(
                    3,
                    ChangeKind::Modify,
                    Some(sector_v7(3, 500, vec![], false)),
                    Some(sector_v7(3, 900, vec![], false)),
                ),
                change(
                    4,
                    ChangeKind::Modify,
                    Some(sector_v7(4, 500, vec![], false)),
                    Some(sector_v7(4, 500, vec![9], true)),
                ),
                change(5, ChangeKind::Remove, Some(sector_v7(5, 500, vec![], false)), None),
            ],
            sector_status: Some(SectorStatusChange {
                terminated,
                faulted: BitField::new(),
                recovering: BitField::new(),
                recovered: BitField::new(),
            }),
            ..Default::default()
        };
        let miners = BTreeMap::from([(Address::new_id(1000), diff)]);
        let rows = transform(&key(), ActorVersion::V7, &miners);
        assert!(rows.errors().is_empty());
        let writer = written(&rows);
        assert_eq!(
            events(&writer),
            vec![
                (1, "COMMIT_CAPACITY_ADDED".to_string()),
                (2, "SECTOR_ADDED".to_string()),
                (3, "SECTOR_EXTENDED".to_string()),
                (4, "SECTOR_SNAPPED".to_string()),
                (5, "SECTOR_TERMINATED".to_string()),
            ]
        );
        assert_eq!(rows.count(Table::MinerSectorInfosV7), 4);
        assert_eq!(rows.count(Table::MinerSectorInfos), 0);
        assert_eq!(rows.count(Table::MinerSectorDeals), 3);
        let snapped = writer.rows(Table::MinerSectorInfosV7)[3];
        assert_eq!(snapped["sector_key_cid"], raw_cid(b"key").to_string());
        assert_eq!(snapped["height"], 100);
        assert_eq!(snapped["state_root"], "root");
    }

    #[test]
    fn early_versions_use_legacy_sector_table() {
        let sector = Deferred::encode(&SectorOnChainInfoV2 {
            sector_number: 9,
            seal_proof: 3,
            sealed_cid: raw_cid(b"sealed"),
            deal_ids: vec![],
            activation: 1,
            expiration: 2,
            deal_weight: BigInt::from(0),
            verified_deal_weight: BigInt::from(0),
            initial_pledge: TokenAmount::from_atto(0),
            expected_day_reward: TokenAmount::from_atto(0),
            expected_storage_pledge: TokenAmount::from_atto(0),
            replaced_sector_age: 0,
            replaced_day_reward: TokenAmount::from_atto(0),
        })
        .unwrap();
        let diff = MinerDiff {
            sectors: vec![change(9, ChangeKind::Add, None, Some(sector))],
            ..Default::default()
        };
        let miners = BTreeMap::from([(Address::new_id(1000), diff)]);
        let rows = transform(&key(), ActorVersion::V4, &miners);
        assert_eq!(rows.count(Table::MinerSectorInfos), 1);
        assert_eq!(rows.count(Table::MinerSectorInfosV7), 0);
    }

    #[test]
    fn v9_pre_commits_record_unsealed_cid() {
        use fil_actor_miner_state::v9;

        let pre_commit = Deferred::encode(&v9::SectorPreCommitOnChainInfo {
            info: v9::SectorPreCommitInfo {
                seal_proof: fvm_shared2::sector::RegisteredSealProof::from(8),
                sector_number: 12,
                sealed_cid: raw_cid(b"sealed"),
                seal_rand_epoch: 40,
                deal_ids: vec![1, 2],
                expiration: 1000,
                unsealed_cid: v9::CompactCommD(Some(raw_cid(b"unsealed"))),
            },
            pre_commit_deposit: fvm_shared2::econ::TokenAmount::from_atto(77),
            pre_commit_epoch: 50,
        })
        .unwrap();
        let diff = MinerDiff {
            pre_commits: vec![change(12, ChangeKind::Add, None, Some(pre_commit))],
            ..Default::default()
        };
        let miners = BTreeMap::from([(Address::new_id(1000), diff)]);
        let rows = transform(&key(), ActorVersion::V9, &miners);
        let writer = written(&rows);
        let row = writer.rows(Table::MinerPreCommitInfosV9)[0];
        assert_eq!(row["unsealed_cid"], raw_cid(b"unsealed").to_string());
        assert_eq!(row["deal_ids"], serde_json::json!([1, 2]));
        assert_eq!(row["pre_commit_deposit"], "77");
        assert_eq!(events(&writer), vec![(12, "PRECOMMIT_ADDED".to_string())]);
    }

    #[test]
    fn undecodable_sector_is_reported() {
        let diff = MinerDiff {
            sectors: vec![change(
                1,
                ChangeKind::Add,
                None,
                Some(Deferred::encode(&(1u8, 2u8)).unwrap()),
            )],
            ..Default::default()
        };
        let miners = BTreeMap::from([(Address::new_id(1000), diff)]);
        let rows = transform(&key(), ActorVersion::V7, &miners);
        assert!(rows.is_empty());
        assert_eq!(rows.errors().len(), 1);
        assert!(rows.errors()[0].starts_with("miner f01000 sector 1"));
    }

    #[test]
    fn funds_emit_locked_funds_and_fee_debt() {
        let diff = MinerDiff {
            funds: Some(FundsChange {
                locked_funds: TokenAmount::from_atto(10),
                initial_pledge: TokenAmount::from_atto(20),
                pre_commit_deposits: TokenAmount::from_atto(30),
                fee_debt: TokenAmount::from_atto(40),
            }),
            ..Default::default()
        };
        let miners = BTreeMap::from([(Address::new_id(1000), diff)]);
        let writer = written(&transform(&key(), ActorVersion::V7, &miners));
        assert_eq!(writer.rows(Table::MinerLockedFunds)[0]["initial_pledge"], "20");
        assert_eq!(writer.rows(Table::MinerFeeDebts)[0]["fee_debt"], "40");
        assert_eq!(writer.rows(Table::MinerFeeDebts)[0]["miner_id"], "f01000");
    }
}
