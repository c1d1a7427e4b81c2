// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! End-batch transactions (spec §3) and the chain-facing publish/failure
//! callback payloads (spec §6).

use serde::{Deserialize, Serialize};

use crate::ids::{BatchIndex, BlockHeight, CallId, ContractKey, ExecutorKey, Signature, StorageHash, TransactionHash};
use crate::opinion::{CallExecutorParticipation, SuccessfulBatchInfo};
use crate::proof::Proofs;

/// One executor's reported participation in a specific call, as aggregated
/// into the end-batch transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallParticipationEntry {
    pub executor_key: ExecutorKey,
    pub participation: CallExecutorParticipation,
}

/// A single call's agreed outcome, with every cosigning executor's
/// reported participation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTransactionInfo {
    pub call_id: CallId,
    pub is_manual: bool,
    pub block_height: BlockHeight,
    pub success: bool,
    pub released_transaction: TransactionHash,
    pub participations: Vec<CallParticipationEntry>,
}

/// The chain-publishable artifact for a successful batch: cosigners are
/// sorted by key, and `signatures[i]`/`proofs[i]` correspond to
/// `cosigners[i]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessfulEndBatchExecutionTransactionInfo {
    pub contract_key: ContractKey,
    pub batch_index: BatchIndex,
    pub automatic_checked_up_to: u64,
    pub successful_batch_info: SuccessfulBatchInfo,
    pub calls: Vec<CallTransactionInfo>,
    pub cosigners: Vec<ExecutorKey>,
    pub signatures: Vec<Signature>,
    pub proofs: Vec<Proofs>,
}

/// The chain-publishable artifact for an unsuccessful batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsuccessfulEndBatchExecutionTransactionInfo {
    pub contract_key: ContractKey,
    pub batch_index: BatchIndex,
    pub automatic_checked_up_to: u64,
    pub cosigners: Vec<ExecutorKey>,
    pub signatures: Vec<Signature>,
    pub proofs: Vec<Proofs>,
}

/// What `BatchExecutionTask` hands to the blockchain client once threshold
/// is met (spec §6, `endBatchTransactionIsReady`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndBatchExecutionTransaction {
    Successful(SuccessfulEndBatchExecutionTransactionInfo),
    Unsuccessful(UnsuccessfulEndBatchExecutionTransactionInfo),
}

impl EndBatchExecutionTransaction {
    pub fn batch_index(&self) -> BatchIndex {
        match self {
            EndBatchExecutionTransaction::Successful(t) => t.batch_index,
            EndBatchExecutionTransaction::Unsuccessful(t) => t.batch_index,
        }
    }
}

/// What the blockchain client delivers back once it published an
/// end-batch transaction (spec §4.2 AWAIT_PUBLISHED).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedEndBatchExecutionInfo {
    pub contract_key: ContractKey,
    pub batch_index: BatchIndex,
    pub batch_success: bool,
    pub drive_state: StorageHash,
    pub cosigners: Vec<ExecutorKey>,
}

/// What the blockchain client delivers when it could not assemble an
/// end-batch transaction for this batch at all (spec §4.2 branch 3).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEndBatchExecutionInfo {
    pub contract_key: ContractKey,
    pub batch_index: BatchIndex,
}
