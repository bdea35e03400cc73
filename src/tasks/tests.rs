// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;

use cid::Cid;
use fil_actors_shared::fvm_ipld_hamt::{BytesKey, Hamt};
use fvm_ipld_encoding::RawBytes;
use integer_encoding::VarInt as _;
use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;
use crate::blocks::{BeaconEntry, BlockHeader};
use crate::shim::actors::multisig::{
    self, ApproveReturn, METHOD_APPROVE, METHOD_PROPOSE, ProposeParams, ProposeReturn,
    Transaction, TxnIdParams,
};
use crate::shim::actors::{ActorCodeRegistry, ActorFamily};
use crate::shim::address::Address;
use crate::shim::econ::TokenAmount;
use crate::shim::message::Message;
use crate::shim::version::ActorVersion;
use crate::source::{
    ActorState, BlockMessages, ChainMessage, CirculatingSupply, ExecutedMessage, ExecutionTrace,
    MessageExecution, Receipt,
};
use crate::test_utils::{MemorySource, state_tree, tipset_at, tipset_with};
use crate::transform::test_support::written;
use crate::utils::db::CborStoreExt as _;
use crate::utils::encoding::raw_cid;

fn code(family: ActorFamily) -> Cid {
    ActorCodeRegistry::default()
        .code_for(family, ActorVersion::V7)
        .unwrap()
}

fn message(from: u64, to: u64, nonce: u64, method: u64, params: RawBytes) -> ChainMessage {
    ChainMessage::unsigned(Message {
        version: 0,
        from: Address::new_id(from),
        to: Address::new_id(to),
        sequence: nonce,
        value: TokenAmount::from_atto(1),
        method_num: method,
        params,
        gas_limit: 1_000_000,
        gas_fee_cap: TokenAmount::from_atto(200),
        gas_premium: TokenAmount::from_atto(10),
    })
    .unwrap()
}

fn executed(block: Cid, index: u64, message: ChainMessage, receipt: Receipt) -> ExecutedMessage {
    ExecutedMessage {
        block,
        index,
        message,
        receipt,
    }
}

#[tokio::test]
async fn blocks_rows() {
    let mut header = BlockHeader::default();
    header.epoch = 7;
    header.beacon_entries = vec![
        BeaconEntry {
            round: 100,
            data: vec![1],
        },
        BeaconEntry {
            round: 101,
            data: vec![2],
        },
    ];
    header.parents = tipset_at(6, 0).key().clone();
    let ts = Tipset::new(vec![header]).unwrap();
    let source = MemorySource::default();
    let rows = extract(Task::Blocks, &source, &ts, &ts).await.unwrap();
    assert_eq!(rows.count(Table::BlockHeaders), 1);
    assert_eq!(rows.count(Table::BlockParents), 1);
    assert_eq!(rows.count(Table::DrandBlockEntries), 2);
    let writer = written(&rows);
    assert_eq!(writer.rows(Table::BlockHeaders)[0]["height"], 7);
    assert_eq!(writer.rows(Table::DrandBlockEntries)[1]["round"], 101);
}

#[tokio::test]
async fn consensus_records_null_rounds() {
    let source = MemorySource::default();
    let executed = tipset_at(10, 0);
    let current = tipset_at(14, 0);
    let rows = extract(Task::Consensus, &source, &current, &executed)
        .await
        .unwrap();
    let writer = written(&rows);
    let heights: Vec<_> = writer
        .rows(Table::ChainConsensus)
        .iter()
        .map(|r| (r["height"].as_i64().unwrap(), r["tipset"].is_null()))
        .collect();
    assert_eq!(
        heights,
        vec![(14, false), (11, true), (12, true), (13, true)]
    );
}

#[tokio::test]
async fn economics_from_supply() {
    let source = MemorySource {
        supply: CirculatingSupply {
            fil_circulating: TokenAmount::from_atto(42),
            fil_burnt: TokenAmount::from_atto(7),
            ..Default::default()
        },
        ..Default::default()
    };
    let ts = tipset_at(3, 0);
    let rows = extract(Task::ChainEconomics, &source, &ts, &ts)
        .await
        .unwrap();
    let writer = written(&rows);
    let row = writer.rows(Table::ChainEconomics)[0];
    assert_eq!(row["circulating_fil"], "42");
    assert_eq!(row["burnt_fil"], "7");
    assert_eq!(row["parent_state_root"], ts.parent_state().to_string());
}

#[tokio::test]
async fn messages_and_gas() {
    let mut source = MemorySource::default();
    let miner = Address::new_id(1000);
    let root = state_tree(
        &source.store,
        &[(
            miner,
            ActorState::new(
                code(ActorFamily::StorageMiner),
                raw_cid(b"miner"),
                TokenAmount::default(),
                0,
            ),
        )],
    );
    let executed_ts = tipset_at(10, 0);
    let current = tipset_with(11, 0, executed_ts.key().clone(), root);

    let to_miner = message(100, 1000, 0, 5, RawBytes::default());
    let to_unknown = message(100, 999, 1, 0, RawBytes::default());
    let block = executed_ts.cids()[0];
    source.block_messages.insert(
        executed_ts.key().clone(),
        vec![
            BlockMessages {
                block,
                messages: vec![to_miner.clone(), to_unknown.clone()],
            },
            BlockMessages {
                block: raw_cid(b"other block"),
                messages: vec![to_miner.clone()],
            },
        ],
    );
    let receipt = Receipt {
        exit_code: 0,
        return_data: RawBytes::default(),
        gas_used: 500_000,
    };
    source.receipts.insert(
        executed_ts.key().clone(),
        vec![
            executed(block, 0, to_miner.clone(), receipt.clone()),
            executed(block, 1, to_unknown.clone(), receipt),
        ],
    );

    let rows = extract(Task::Messages, &source, &current, &executed_ts)
        .await
        .unwrap();
    assert!(rows.errors().is_empty());
    assert_eq!(rows.count(Table::Messages), 2);
    assert_eq!(rows.count(Table::BlockMessages), 3);
    assert_eq!(rows.count(Table::Receipts), 2);

    let writer = written(&rows);
    let gas = writer.rows(Table::DerivedGasOutputs);
    assert_eq!(gas[0]["actor_family"], "storageminer");
    assert_eq!(gas[0]["actor_name"], "fil/7/storageminer");
    assert_eq!(gas[1]["actor_family"], "<unknown>");
    // 100 atto base fee over 500k gas.
    assert_eq!(gas[0]["base_fee_burn"], "50000000");

    let economy = writer.rows(Table::MessageGasEconomy)[0];
    assert_eq!(economy["gas_limit_total"], 3_000_000);
    assert_eq!(economy["gas_limit_unique_total"], 2_000_000);
    assert_eq!(economy["base_fee_change_log"], 0.0);
    assert_eq!(economy["gas_waste_ratio"], 1_000_000.0 / 5e9);
}

fn call(to: u64, code: Option<Cid>, subcalls: Vec<ExecutionTrace>) -> ExecutionTrace {
    ExecutionTrace {
        from: Address::new_id(0),
        to: Address::new_id(to),
        value: TokenAmount::default(),
        method: 1,
        params: RawBytes::default(),
        code,
        receipt: Receipt::default(),
        subcalls,
    }
}

#[tokio::test]
async fn implicit_messages_and_nested_calls() {
    let mut source = MemorySource::default();
    let executed_ts = tipset_at(10, 0);
    let current = tipset_at(11, 0);
    source.executions.insert(
        executed_ts.key().clone(),
        vec![
            MessageExecution {
                cid: raw_cid(b"cron tick"),
                implicit: true,
                trace: call(
                    3,
                    Some(code(ActorFamily::Cron)),
                    vec![call(4, None, vec![call(1000, None, Vec::new())])],
                ),
            },
            MessageExecution {
                cid: raw_cid(b"user message"),
                implicit: false,
                trace: call(1001, None, vec![call(5, None, Vec::new())]),
            },
        ],
    );
    let rows = extract(Task::ImplicitMessage, &source, &current, &executed_ts)
        .await
        .unwrap();
    let writer = written(&rows);
    let internal = writer.rows(Table::InternalMessages);
    assert_eq!(internal.len(), 1);
    assert_eq!(internal[0]["actor_name"], "fil/7/cron");
    let depths: Vec<_> = writer
        .rows(Table::VmMessages)
        .iter()
        .map(|r| (r["to"].as_str().unwrap().to_string(), r["index"].as_u64().unwrap()))
        .collect();
    assert_eq!(
        depths,
        vec![
            ("f04".to_string(), 1),
            ("f01000".to_string(), 2),
            ("f05".to_string(), 1)
        ]
    );
}

#[tokio::test]
async fn applied_multisig_calls() {
    let mut source = MemorySource::default();
    let store = source.store.clone();
    let pending_tx = Transaction {
        to: Address::new_id(300),
        value: TokenAmount::from_atto(77),
        method: 0,
        params: RawBytes::default(),
        approved: vec![Address::new_id(100)],
    };
    let mut pending = Hamt::<_, Transaction>::new_with_bit_width(store.as_ref(), 5);
    pending
        .set(BytesKey(3i64.encode_var_vec()), pending_tx)
        .unwrap();
    let head = store
        .put_cbor_default(&multisig::State {
            signers: vec![Address::new_id(100), Address::new_id(101)],
            num_approvals_threshold: 2,
            next_tx_id: 4,
            initial_balance: TokenAmount::from_atto(1000),
            start_epoch: 0,
            unlock_duration: 0,
            pending_txs: pending.flush().unwrap(),
        })
        .unwrap();
    let wallet = Address::new_id(1001);
    let root = state_tree(
        &store,
        &[(
            wallet,
            ActorState::new(code(ActorFamily::Multisig), head, TokenAmount::default(), 0),
        )],
    );
    let executed_ts = tipset_with(10, 0, tipset_at(9, 0).key().clone(), root);
    let current = tipset_at(11, 0);

    let propose = |applied: bool, nonce: u64| {
        let params = RawBytes::serialize(ProposeParams {
            to: Address::new_id(200),
            value: TokenAmount::from_atto(5),
            method: 0,
            params: RawBytes::default(),
        })
        .unwrap();
        let ret = RawBytes::serialize(ProposeReturn {
            txn_id: 9,
            applied,
            code: 0,
            ret: RawBytes::default(),
        })
        .unwrap();
        (
            message(100, 1001, nonce, METHOD_PROPOSE, params),
            Receipt {
                exit_code: 0,
                return_data: ret,
                gas_used: 10,
            },
        )
    };
    let approve = {
        let params = RawBytes::serialize(TxnIdParams {
            id: 3,
            proposal_hash: Vec::new(),
        })
        .unwrap();
        let ret = RawBytes::serialize(ApproveReturn {
            applied: true,
            code: 0,
            ret: RawBytes::default(),
        })
        .unwrap();
        (
            message(101, 1001, 0, METHOD_APPROVE, params),
            Receipt {
                exit_code: 0,
                return_data: ret,
                gas_used: 20,
            },
        )
    };
    let block = executed_ts.cids()[0];
    let messages = [propose(true, 0), propose(false, 1), approve]
        .into_iter()
        .enumerate()
        .map(|(i, (m, r))| executed(block, i as u64, m, r))
        .collect();
    source.receipts.insert(executed_ts.key().clone(), messages);

    let rows = extract(Task::MsApprovals, &source, &current, &executed_ts)
        .await
        .unwrap();
    assert!(rows.errors().is_empty());
    let writer = written(&rows);
    let approvals = writer.rows(Table::MultisigApprovals);
    assert_eq!(approvals.len(), 2);
    assert_eq!(approvals[0]["transaction_id"], 9);
    assert_eq!(approvals[0]["to"], "f0200");
    assert_eq!(approvals[1]["transaction_id"], 3);
    assert_eq!(approvals[1]["value"], "77");
    assert_eq!(approvals[1]["approver"], "f0101");
    assert_eq!(approvals[1]["threshold"], 2);
    assert_eq!(approvals[1]["signers"], serde_json::json!(["f0100", "f0101"]));
}

#[test]
fn actor_state_tasks_read_no_chain_data() {
    let source = Arc::new(MemorySource::default());
    let ts = tipset_at(1, 0);
    let rows = futures::executor::block_on(extract(Task::ActorStatesMiner, &*source, &ts, &ts));
    assert!(rows.unwrap().is_empty());
}

#[rstest]
#[case("actorstatesraw", &[Table::Actors, Table::ActorStates])]
#[case("actorstatesreward", &[Table::ChainRewards])]
#[case("consensus", &[Table::ChainConsensus])]
#[case("implicitmessage", &[Table::InternalMessages, Table::VmMessages])]
#[case("miner_sector_infos_v7", &[Table::MinerSectorInfosV7])]
#[case(" blocks ", &[Table::BlockHeaders, Table::BlockParents, Table::DrandBlockEntries])]
fn aliases_expand(#[case] token: &str, #[case] expected: &[Table]) {
    let tables = expand(&[token]).unwrap();
    assert_eq!(tables, expected.iter().copied().collect());
}

#[rstest]
#[case("actorstates")]
#[case("visor_processing_reports")]
#[case("")]
fn unknown_tokens_fail(#[case] token: &str) {
    assert_eq!(
        expand(&[token]),
        Err(Error::UnknownTask(token.to_string()))
    );
}

#[test]
fn every_table_but_reports_has_a_task() {
    let all = expand(&all_tasks()).unwrap();
    assert_eq!(all.len(), Table::iter().count() - 1);
    assert!(!all.contains(&Table::ProcessingReports));
}

#[test]
fn miner_task_owns_nine_tables() {
    assert_eq!(Task::ActorStatesMiner.tables().count(), 9);
    assert_eq!(Task::ActorStatesMiner.to_string(), "actorstatesminer");
    assert_eq!(Task::MsApprovals.to_string(), "msapprovals");
}

#[test]
fn enabled_tasks_follow_tables() {
    let tables = expand(&["receipts", "chain_rewards"]).unwrap();
    assert_eq!(
        enabled_tasks(&tables),
        BTreeSet::from([Task::Messages, Task::ActorStatesReward])
    );
}
