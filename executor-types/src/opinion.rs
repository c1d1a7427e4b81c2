// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! Gossiped, signed opinions (spec §3 "Opinions"). An opinion is an
//! executor's signed claim about a batch's outcome; `BatchExecutionTask`
//! exchanges these with peers until a threshold of matching opinions is
//! reached (spec §4.2).

use serde::{Deserialize, Serialize};

use crate::ids::{BatchIndex, BlockHeight, CallId, ContractKey, ExecutorKey, Signature, StorageHash, TransactionHash};
use crate::proof::{CurvePointBytes, Proofs};

/// What an executor reports it contributed to one call's execution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallExecutorParticipation {
    pub execution_payment_used: u64,
    pub download_payment_used: u64,
}

/// One call's outcome, as seen by a single executor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallExecutionOpinion {
    pub call_id: CallId,
    pub is_manual: bool,
    pub block_height: BlockHeight,
    pub success: bool,
    pub released_transaction: TransactionHash,
    pub participation: CallExecutorParticipation,
}

/// Resulting drive state an executor claims after running a batch
/// successfully, plus the per-call PoEx verification info (one curve
/// point per call executed this batch, in call order) so peers can check
/// agreement without re-running the calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessfulBatchInfo {
    pub storage_hash: StorageHash,
    pub used_drive_size: u64,
    pub meta_files_size: u64,
    pub poex_verification_info: Vec<CurvePointBytes>,
}

/// An executor's signed claim that batch `batch_index` executed
/// successfully and produced `successful_batch_info`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessfulEndBatchExecutionOpinion {
    pub contract_key: ContractKey,
    pub batch_index: BatchIndex,
    pub automatic_checked_up_to: u64,
    pub executor_key: ExecutorKey,
    pub calls_execution_info: Vec<CallExecutionOpinion>,
    pub successful_batch_info: SuccessfulBatchInfo,
    pub proofs: Proofs,
    pub signature: Signature,
}

/// An executor's signed claim that batch `batch_index` could not execute
/// successfully. Carries the *previous* proof (i.e. the proof as of
/// before this batch's calls were appended) rather than the batch info.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsuccessfulEndBatchExecutionOpinion {
    pub contract_key: ContractKey,
    pub batch_index: BatchIndex,
    pub automatic_checked_up_to: u64,
    pub executor_key: ExecutorKey,
    pub previous_proof: Proofs,
    pub signature: Signature,
}

/// Either kind of opinion, as received off the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndBatchExecutionOpinion {
    Successful(SuccessfulEndBatchExecutionOpinion),
    Unsuccessful(UnsuccessfulEndBatchExecutionOpinion),
}

impl EndBatchExecutionOpinion {
    pub fn executor_key(&self) -> ExecutorKey {
        match self {
            EndBatchExecutionOpinion::Successful(o) => o.executor_key,
            EndBatchExecutionOpinion::Unsuccessful(o) => o.executor_key,
        }
    }

    pub fn batch_index(&self) -> BatchIndex {
        match self {
            EndBatchExecutionOpinion::Successful(o) => o.batch_index,
            EndBatchExecutionOpinion::Unsuccessful(o) => o.batch_index,
        }
    }

    pub fn contract_key(&self) -> ContractKey {
        match self {
            EndBatchExecutionOpinion::Successful(o) => o.contract_key,
            EndBatchExecutionOpinion::Unsuccessful(o) => o.contract_key,
        }
    }

    pub fn signature(&self) -> Signature {
        match self {
            EndBatchExecutionOpinion::Successful(o) => o.signature,
            EndBatchExecutionOpinion::Unsuccessful(o) => o.signature,
        }
    }

    /// The bytes the signature is computed over: the whole opinion minus
    /// the signature field itself (spec §6 "Opinion wire format").
    pub fn signing_bytes(&self) -> Vec<u8> {
        match self {
            EndBatchExecutionOpinion::Successful(o) => {
                let mut unsigned = o.clone();
                unsigned.signature = Signature::zero();
                bcs::to_bytes(&unsigned).expect("opinion serialization is infallible")
            }
            EndBatchExecutionOpinion::Unsuccessful(o) => {
                let mut unsigned = o.clone();
                unsigned.signature = Signature::zero();
                bcs::to_bytes(&unsigned).expect("opinion serialization is infallible")
            }
        }
    }
}
