// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! Shared wire types for the contract-executor pipeline: identifiers, call
//! requests, batches, storage state, PoEx proofs, opinions, and end-batch
//! transactions. Mirrors the role of `consensus-types` in the teacher
//! workspace: a dependency-light crate that both the engine and its peers
//! (gossip wire format) can agree on.

pub mod batch;
pub mod call_request;
pub mod ids;
pub mod opinion;
pub mod proof;
pub mod storage;
pub mod transaction;

pub use batch::Batch;
pub use call_request::{AutomaticCallRequest, CallRequest, CallRequestApi, ManualCallRequest, ServicePayment};
pub use ids::{
    BatchIndex, BlockHash, BlockHeight, CallId, CallerKey, ContractKey, DriveKey, ExecutorKey, ModificationId,
    MosaicId, Signature, StorageHash, TransactionHash,
};
pub use opinion::{
    CallExecutionOpinion, CallExecutorParticipation, EndBatchExecutionOpinion, SuccessfulBatchInfo,
    SuccessfulEndBatchExecutionOpinion, UnsuccessfulEndBatchExecutionOpinion,
};
pub use proof::{BatchProof, CurvePointBytes, ExecutorInfo, Proofs, ScalarBytes, TProof};
pub use storage::StorageState;
pub use transaction::{
    CallParticipationEntry, CallTransactionInfo, EndBatchExecutionTransaction, FailedEndBatchExecutionInfo,
    PublishedEndBatchExecutionInfo, SuccessfulEndBatchExecutionTransactionInfo,
    UnsuccessfulEndBatchExecutionTransactionInfo,
};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn manual_at(block_height: BlockHeight, arrival_seq: u64) -> CallRequest {
        CallRequest::Manual(
            ManualCallRequest::new(CallId::zero(), String::new(), String::new(), 0, 0, CallerKey::zero(), block_height, vec![], vec![])
                .with_arrival_seq(arrival_seq),
        )
    }

    proptest! {
        /// Any batch built from manual calls already sorted by
        /// `(block_height, arrival_seq)`, with no automatic call or one
        /// appended last, is well-ordered — independent of how many
        /// calls or which heights/sequences are involved.
        #[test]
        fn sorted_manual_prefix_plus_optional_trailing_automatic_is_well_ordered(
            mut pairs in proptest::collection::vec((1u64..20, 0u64..1000), 0..12),
            with_automatic in any::<bool>(),
        ) {
            pairs.sort();
            pairs.dedup_by_key(|(_, seq)| *seq);
            let mut call_requests: Vec<CallRequest> = pairs.iter().map(|(h, s)| manual_at(*h, *s)).collect();
            if with_automatic {
                call_requests.push(CallRequest::Automatic(AutomaticCallRequest {
                    call_id: CallId::zero(),
                    file: String::new(),
                    function: String::new(),
                    execution_payment: 0,
                    download_payment: 0,
                    block_height: pairs.last().map(|(h, _)| *h).unwrap_or(1),
                    arguments: vec![],
                    service_payments: vec![],
                }));
            }
            let batch = Batch::new(1, 1, call_requests);
            prop_assert!(batch.is_well_ordered());
        }
    }

    #[test]
    fn batch_well_ordered_rejects_manual_after_automatic() {
        let auto = CallRequest::Automatic(AutomaticCallRequest {
            call_id: CallId::zero(),
            file: String::new(),
            function: String::new(),
            execution_payment: 0,
            download_payment: 0,
            block_height: 1,
            arguments: vec![],
            service_payments: vec![],
        });
        let manual = CallRequest::Manual(ManualCallRequest::new(
            CallId::zero(),
            String::new(),
            String::new(),
            0,
            0,
            CallerKey::zero(),
            1,
            vec![],
            vec![],
        ));
        let batch = Batch::new(1, 1, vec![auto, manual]);
        assert!(!batch.is_well_ordered());
    }

    #[test]
    fn batch_well_ordered_accepts_manual_then_automatic() {
        let manual_a = CallRequest::Manual(ManualCallRequest::new(
            CallId::zero(),
            String::new(),
            String::new(),
            0,
            0,
            CallerKey::zero(),
            1,
            vec![],
            vec![],
        ).with_arrival_seq(0));
        let manual_b = CallRequest::Manual(ManualCallRequest::new(
            CallId::zero(),
            String::new(),
            String::new(),
            0,
            0,
            CallerKey::zero(),
            2,
            vec![],
            vec![],
        ).with_arrival_seq(1));
        let auto = CallRequest::Automatic(AutomaticCallRequest {
            call_id: CallId::zero(),
            file: String::new(),
            function: String::new(),
            execution_payment: 0,
            download_payment: 0,
            block_height: 2,
            arguments: vec![],
            service_payments: vec![],
        });
        let batch = Batch::new(1, 2, vec![manual_a, manual_b, auto]);
        assert!(batch.is_well_ordered());
    }

    #[test]
    fn opinion_signing_bytes_excludes_signature() {
        let mut opinion = UnsuccessfulEndBatchExecutionOpinion {
            contract_key: ContractKey::zero(),
            batch_index: 5,
            automatic_checked_up_to: 5,
            executor_key: ExecutorKey::zero(),
            previous_proof: Proofs {
                initial_batch: 0,
                batch_proof: BatchProof::default(),
                t_proof: TProof {
                    f: CurvePointBytes([0u8; 32]),
                    k: ScalarBytes([0u8; 32]),
                },
            },
            signature: Signature::zero(),
        };
        let bytes_a = EndBatchExecutionOpinion::Unsuccessful(opinion.clone()).signing_bytes();
        opinion.signature = Signature([7u8; 64]);
        let bytes_b = EndBatchExecutionOpinion::Unsuccessful(opinion).signing_bytes();
        assert_eq!(bytes_a, bytes_b);
    }
}
