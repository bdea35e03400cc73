// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::RowKey;
use crate::container::PowerDiff;
use crate::diff::{ChangeKind, Deferred};
use crate::model::{ChainPower, PowerActorClaim, Rows};
use crate::shim::actors::power::{Claim, State};
use crate::shim::address::Address;
use crate::shim::version::ActorVersion;

pub(super) fn transform(key: &RowKey, version: ActorVersion, diff: &PowerDiff) -> Rows {
    let mut rows = Rows::default();
    if let Some(state) = &diff.state {
        rows.push_result("power state", chain_power(key, version, state));
    }
    for change in &diff.claims {
        let (ChangeKind::Add | ChangeKind::Modify, Some(current)) = (change.kind, &change.current)
        else {
            continue;
        };
        rows.push_result(
            format!("power claim {}", hex::encode(&change.key)),
            Address::from_bytes(&change.key)
                .map_err(anyhow::Error::from)
                .and_then(|miner| {
                    let claim = Claim::decode(current.bytes(), version)?;
                    Ok(PowerActorClaim {
                        height: key.height,
                        miner_id: miner.to_string(),
                        state_root: key.state_root.clone(),
                        raw_byte_power: claim.raw_byte_power.to_string(),
                        quality_adj_power: claim.quality_adj_power.to_string(),
                    })
                }),
        );
    }
    rows
}

fn chain_power(
    key: &RowKey,
    version: ActorVersion,
    state: &Deferred,
) -> anyhow::Result<ChainPower> {
    let s = State::decode(state.bytes(), version)?;
    Ok(ChainPower {
        height: key.height,
        state_root: key.state_root.clone(),
        total_raw_bytes_power: s.total_raw_byte_power.to_string(),
        total_raw_bytes_committed: s.total_bytes_committed.to_string(),
        total_qa_bytes_power: s.total_quality_adj_power.to_string(),
        total_qa_bytes_committed: s.total_qa_bytes_committed.to_string(),
        total_pledge_collateral: s.total_pledge_collateral.atto().to_string(),
        qa_smoothed_position_estimate: s.this_epoch_qa_power_smoothed.position.to_string(),
        qa_smoothed_velocity_estimate: s.this_epoch_qa_power_smoothed.velocity.to_string(),
        miner_count: s.miner_count,
        participating_miner_count: s.miner_above_min_power_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::MapChange;
    use crate::shim::actors::power::ClaimV2;
    use crate::shim::bigint::BigInt;
    use crate::tasks::Table;
    use crate::transform::test_support::written;

    #[test]
    fn claims_become_rows() {
        let claim = Deferred::encode(&ClaimV2 {
            window_post_proof_type: 8,
            raw_byte_power: BigInt::from(32),
            quality_adj_power: BigInt::from(320),
        })
        .unwrap();
        let diff = PowerDiff {
            claims: vec![
                MapChange {
                    key: Address::new_id(1000).to_bytes(),
                    kind: ChangeKind::Add,
                    previous: None,
                    current: Some(claim.clone()),
                },
                MapChange {
                    key: Address::new_id(1001).to_bytes(),
                    kind: ChangeKind::Remove,
                    previous: Some(claim),
                    current: None,
                },
            ],
            state: None,
        };
        let key = RowKey {
            height: 3,
            state_root: "root".into(),
        };
        let rows = transform(&key, ActorVersion::V7, &diff);
        assert!(rows.errors().is_empty());
        let writer = written(&rows);
        let claims = writer.rows(Table::PowerActorClaims);
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0]["miner_id"], "f01000");
        assert_eq!(claims[0]["quality_adj_power"], "320");
        assert!(writer.rows(Table::ChainPowers).is_empty());
    }

    #[test]
    fn undecodable_state_is_reported() {
        let diff = PowerDiff {
            claims: Vec::new(),
            state: Some(Deferred::encode(&(1u8,)).unwrap()),
        };
        let key = RowKey {
            height: 3,
            state_root: "root".into(),
        };
        let rows = transform(&key, ActorVersion::V7, &diff);
        assert!(rows.is_empty());
        assert!(rows.errors()[0].starts_with("power state"));
    }
}
