// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use base64::{Engine as _, prelude::BASE64_STANDARD};

use super::RowKey;
use crate::container::MarketDiff;
use crate::diff::{ArrayChange, ChangeKind, Deferred};
use crate::model::{MarketDealProposal, MarketDealState, Rows};
use crate::shim::actors::market::{DealLabel, DealProposal, DealState};
use crate::shim::version::ActorVersion;

pub(super) fn transform(key: &RowKey, version: ActorVersion, diff: &MarketDiff) -> Rows {
    let mut rows = Rows::default();
    for (deal_id, current) in live(&diff.deal_proposals) {
        rows.push_result(
            format!("deal proposal {deal_id}"),
            proposal(key, version, deal_id, current),
        );
    }
    for (deal_id, current) in live(&diff.deal_states) {
        rows.push_result(
            format!("deal state {deal_id}"),
            DealState::decode(current.bytes(), version).map(|s| MarketDealState {
                height: key.height,
                deal_id,
                state_root: key.state_root.clone(),
                sector_start_epoch: s.sector_start_epoch,
                last_update_epoch: s.last_updated_epoch,
                slash_epoch: s.slash_epoch,
            }),
        );
    }
    rows
}

/// Added and modified entries; deals leave the market by expiring or
/// being slashed, which the state rows already record.
fn live(changes: &[ArrayChange]) -> impl Iterator<Item = (u64, &Deferred)> {
    changes.iter().filter_map(|c| match (c.kind, &c.current) {
        (ChangeKind::Add | ChangeKind::Modify, Some(current)) => Some((c.key, current)),
        _ => None,
    })
}

/// Makes a label storable in a text column: invalid UTF-8 sequences are
/// replaced and NUL characters removed.
fn sanitize_label(label: &DealLabel) -> String {
    String::from_utf8_lossy(label.as_bytes()).replace('\0', "")
}

fn proposal(
    key: &RowKey,
    version: ActorVersion,
    deal_id: u64,
    current: &Deferred,
) -> anyhow::Result<MarketDealProposal> {
    let p = DealProposal::decode(current.bytes(), version)?;
    let sanitized = sanitize_label(&p.label);
    let (label, is_string) = if version >= ActorVersion::V8 {
        (
            BASE64_STANDARD.encode(sanitized.as_bytes()),
            Some(p.label.is_string()),
        )
    } else {
        (sanitized, None)
    };
    Ok(MarketDealProposal {
        height: key.height,
        deal_id,
        state_root: key.state_root.clone(),
        piece_cid: p.piece_cid.to_string(),
        padded_piece_size: p.piece_size,
        unpadded_piece_size: p.unpadded_piece_size(),
        is_verified: p.verified_deal,
        client_id: p.client.to_string(),
        provider_id: p.provider.to_string(),
        start_epoch: p.start_epoch,
        end_epoch: p.end_epoch,
        storage_price_per_epoch: p.storage_price_per_epoch.atto().to_string(),
        provider_collateral: p.provider_collateral.atto().to_string(),
        client_collateral: p.client_collateral.atto().to_string(),
        label,
        is_string,
    })
}
