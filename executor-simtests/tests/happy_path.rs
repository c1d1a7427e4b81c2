// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! Scenario 1 (spec §8): three executors, one batch with two manual calls
//! plus a firing automatic call, VM succeeds for all three, and the
//! committee reaches threshold on a successful opinion.

mod common;

use executor_core::Storage as _;
use executor_types::{
    AutomaticCallRequest, Batch, CallId, CallRequest, CallerKey, ContractKey, DriveKey, EndBatchExecutionTransaction,
    ManualCallRequest, ModificationId, PublishedEndBatchExecutionInfo,
};

fn three_call_batch() -> Batch {
    let c1 = ManualCallRequest::new(CallId([1; 32]), "a.wasm".into(), "main".into(), 10, 5, CallerKey::zero(), 1, vec![], vec![])
        .with_arrival_seq(0);
    let c2 = ManualCallRequest::new(CallId([2; 32]), "b.wasm".into(), "main".into(), 10, 5, CallerKey::zero(), 2, vec![], vec![])
        .with_arrival_seq(1);
    let auto = AutomaticCallRequest {
        call_id: AutomaticCallRequest::deterministic_call_id(1, 2),
        file: String::new(),
        function: String::new(),
        execution_payment: 0,
        download_payment: 0,
        block_height: 2,
        arguments: vec![],
        service_payments: vec![],
    };
    Batch::new(1, 2, vec![CallRequest::Manual(c1), CallRequest::Manual(c2), CallRequest::Automatic(auto)])
}

#[tokio::test]
async fn happy_path_reaches_threshold_and_publishes_success() {
    let batch = three_call_batch();
    let harness = common::build_harness(3, batch).await;

    for handle in &harness.executors {
        let tx = tokio::time::timeout(std::time::Duration::from_secs(5), handle.blockchain.wait_for_end_batch_transaction())
            .await
            .expect("threshold should be reached within 5s");
        match tx {
            EndBatchExecutionTransaction::Successful(info) => {
                let mut sorted = info.cosigners.clone();
                sorted.sort();
                assert_eq!(info.cosigners, sorted, "cosigners must be sorted by key");
                assert_eq!(info.calls.len(), 3);
            }
            EndBatchExecutionTransaction::Unsuccessful(_) => panic!("expected a successful end-batch transaction"),
        }
    }

    let published_hash = harness.executors[0].storage.current_hash();
    for handle in &harness.executors {
        assert_eq!(handle.storage.current_hash(), published_hash);
    }
}

/// Scenario 1's post-conditions on publication: `apply_storage_modifications(true)`
/// is called exactly once, and PoEx's `build_actual_proof` is unchanged
/// by a publication that confirms the locally computed drive state.
#[tokio::test]
async fn publishing_with_matching_hash_applies_once_and_preserves_poex() {
    let batch = three_call_batch();
    let harness = common::build_harness(1, batch).await;
    let handle = &harness.executors[0];

    let tx = tokio::time::timeout(std::time::Duration::from_secs(5), handle.blockchain.wait_for_end_batch_transaction())
        .await
        .expect("single-executor committee reaches threshold on its own opinion");
    let EndBatchExecutionTransaction::Successful(_) = tx else {
        panic!("expected success");
    };

    let drive_state = handle.storage.current_hash();
    let proof_before = handle.poex.lock().build_actual_proof();

    let storage_modification = handle
        .storage
        .initiate_modifications(DriveKey::zero(), ModificationId::zero())
        .await
        .expect("fake storage never fails");
    let info = PublishedEndBatchExecutionInfo {
        contract_key: ContractKey::zero(),
        batch_index: 1,
        batch_success: true,
        drive_state,
        cosigners: vec![],
    };
    let accepted = handle.task.lock().await.on_end_batch_execution_published(info, storage_modification.as_ref()).await;
    assert!(accepted);
    assert_eq!(handle.storage.applied_log(), vec![true]);

    let proof_after = handle.poex.lock().build_actual_proof();
    assert_eq!(proof_before.initial_batch, proof_after.initial_batch);
}
