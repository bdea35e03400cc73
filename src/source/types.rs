// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_encoding::RawBytes;
use fvm_ipld_encoding::tuple::*;

use crate::diff::ChangeKind;
use crate::shim::actors::decode_by_arity;
use crate::shim::{address::Address, econ::TokenAmount, message::Message};
use crate::utils::encoding::cid_from_cbor;

/// State tree entry of an actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorState {
    /// Link to the code of the actor.
    pub code: Cid,
    /// Link to the state of the actor.
    pub head: Cid,
    /// Sequence of the actor.
    pub nonce: u64,
    /// Tokens available to the actor.
    pub balance: TokenAmount,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq)]
pub struct ActorStateV4 {
    pub code: Cid,
    pub head: Cid,
    pub nonce: u64,
    pub balance: TokenAmount,
}

#[derive(Serialize_tuple, Deserialize_tuple, Debug, Clone, PartialEq, Eq)]
pub struct ActorStateV5 {
    pub code: Cid,
    pub head: Cid,
    pub nonce: u64,
    pub balance: TokenAmount,
    pub delegated_address: Option<Address>,
}

impl From<ActorStateV4> for ActorState {
    fn from(a: ActorStateV4) -> Self {
        Self {
            code: a.code,
            head: a.head,
            nonce: a.nonce,
            balance: a.balance,
        }
    }
}

impl From<ActorStateV5> for ActorState {
    fn from(a: ActorStateV5) -> Self {
        Self {
            code: a.code,
            head: a.head,
            nonce: a.nonce,
            balance: a.balance,
        }
    }
}

impl From<ActorState> for ActorStateV4 {
    fn from(a: ActorState) -> Self {
        Self {
            code: a.code,
            head: a.head,
            nonce: a.nonce,
            balance: a.balance,
        }
    }
}

impl ActorState {
    pub fn new(code: Cid, head: Cid, balance: TokenAmount, nonce: u64) -> Self {
        Self {
            code,
            head,
            nonce,
            balance,
        }
    }

    pub fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        decode_by_arity!("actor", bytes, {
            4 => ActorStateV4,
            5 => ActorStateV5,
        })
    }
}

/// How an actor's state tree entry changed between two state roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorDelta {
    Added {
        current: ActorState,
    },
    Removed {
        previous: ActorState,
    },
    Modified {
        previous: ActorState,
        current: ActorState,
    },
}

/// One actor whose state tree entry differs between the executed parent
/// and the current tipset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorChange {
    pub address: Address,
    pub delta: ActorDelta,
}

impl ActorChange {
    pub fn kind(&self) -> ChangeKind {
        match self.delta {
            ActorDelta::Added { .. } => ChangeKind::Add,
            ActorDelta::Removed { .. } => ChangeKind::Remove,
            ActorDelta::Modified { .. } => ChangeKind::Modify,
        }
    }

    /// The actor descriptor: the current entry, or the last known one for
    /// removed actors.
    pub fn actor(&self) -> &ActorState {
        match &self.delta {
            ActorDelta::Added { current } | ActorDelta::Modified { current, .. } => current,
            ActorDelta::Removed { previous } => previous,
        }
    }

    pub fn current(&self) -> Option<&ActorState> {
        match &self.delta {
            ActorDelta::Added { current } | ActorDelta::Modified { current, .. } => Some(current),
            ActorDelta::Removed { .. } => None,
        }
    }

    pub fn previous(&self) -> Option<&ActorState> {
        match &self.delta {
            ActorDelta::Removed { previous } | ActorDelta::Modified { previous, .. } => {
                Some(previous)
            }
            ActorDelta::Added { .. } => None,
        }
    }
}

/// A message as included on chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainMessage {
    pub cid: Cid,
    pub message: Message,
    /// Size of the signed encoding for signed messages, otherwise of the
    /// unsigned encoding.
    pub size_bytes: u64,
}

impl ChainMessage {
    /// Wraps an unsigned message, deriving its identifier and size from
    /// its encoding.
    pub fn unsigned(message: Message) -> anyhow::Result<Self> {
        let bytes = fvm_ipld_encoding::to_vec(&message)?;
        Ok(Self {
            cid: cid_from_cbor(&message)?,
            size_bytes: bytes.len() as u64,
            message,
        })
    }
}

/// Messages of one block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMessages {
    pub block: Cid,
    pub messages: Vec<ChainMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Receipt {
    pub exit_code: u32,
    pub return_data: RawBytes,
    pub gas_used: u64,
}

/// A message of the executed tipset with its receipt, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedMessage {
    /// First block of the tipset that included the message.
    pub block: Cid,
    pub index: u64,
    pub message: ChainMessage,
    pub receipt: Receipt,
}

/// A call made during message execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionTrace {
    pub from: Address,
    pub to: Address,
    pub value: TokenAmount,
    pub method: u64,
    pub params: RawBytes,
    /// Code of the callee, when it could be resolved.
    pub code: Option<Cid>,
    pub receipt: Receipt,
    pub subcalls: Vec<ExecutionTrace>,
}

impl ExecutionTrace {
    /// Identifier of the call, derived from the message it corresponds to.
    pub fn message_cid(&self) -> anyhow::Result<Cid> {
        cid_from_cbor(&Message {
            version: 0,
            from: self.from,
            to: self.to,
            sequence: 0,
            value: self.value.clone(),
            method_num: self.method,
            params: self.params.clone(),
            gas_limit: 0,
            gas_fee_cap: TokenAmount::default(),
            gas_premium: TokenAmount::default(),
        })
    }
}

/// Execution of a top level message, including implicit ones issued by the
/// system actors.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageExecution {
    pub cid: Cid,
    pub implicit: bool,
    pub trace: ExecutionTrace,
}

/// Token supply breakdown at a tipset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CirculatingSupply {
    pub fil_vested: TokenAmount,
    pub fil_mined: TokenAmount,
    pub fil_burnt: TokenAmount,
    pub fil_locked: TokenAmount,
    pub fil_circulating: TokenAmount,
    pub fil_reserve_disbursed: TokenAmount,
}
