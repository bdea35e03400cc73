// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::Context as _;

use crate::blocks::Tipset;
use crate::model::{ChainEconomics, Rows};
use crate::source::DataSource;

pub(super) async fn extract<S: DataSource>(source: &S, current: &Tipset) -> anyhow::Result<Rows> {
    let supply = source
        .circulating_supply(current)
        .await
        .context("failed to get circulating supply")?;
    let mut rows = Rows::default();
    rows.push(ChainEconomics {
        height: current.epoch(),
        parent_state_root: current.parent_state().to_string(),
        circulating_fil: supply.fil_circulating.atto().to_string(),
        vested_fil: supply.fil_vested.atto().to_string(),
        mined_fil: supply.fil_mined.atto().to_string(),
        burnt_fil: supply.fil_burnt.atto().to_string(),
        locked_fil: supply.fil_locked.atto().to_string(),
        fil_reserve_disbursed: supply.fil_reserve_disbursed.atto().to_string(),
    });
    Ok(rows)
}
