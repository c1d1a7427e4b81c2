// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! Scenario 2 (spec §8): the chain publishes an `EndBatchExecutionInfo`
//! whose `drive_state` does not match the drive state the executor itself
//! computed. The executor must discard its own modification, request a
//! synchronization to the published drive state, and reset its PoEx
//! accumulator to the batch boundary (spec §4.2 AWAIT_PUBLISHED branch 2).

mod common;

use executor_core::Storage as _;
use executor_types::{
    AutomaticCallRequest, Batch, CallId, CallRequest, CallerKey, ContractKey, DriveKey, EndBatchExecutionTransaction,
    ManualCallRequest, ModificationId, PublishedEndBatchExecutionInfo, StorageHash,
};

fn single_call_batch() -> Batch {
    let c1 = ManualCallRequest::new(CallId([1; 32]), "a.wasm".into(), "main".into(), 10, 5, CallerKey::zero(), 1, vec![], vec![])
        .with_arrival_seq(0);
    let auto = AutomaticCallRequest {
        call_id: AutomaticCallRequest::deterministic_call_id(1, 1),
        file: String::new(),
        function: String::new(),
        execution_payment: 0,
        download_payment: 0,
        block_height: 1,
        arguments: vec![],
        service_payments: vec![],
    };
    Batch::new(1, 1, vec![CallRequest::Manual(c1), CallRequest::Automatic(auto)])
}

#[tokio::test]
async fn mismatched_drive_state_discards_and_resynchronizes() {
    let batch = single_call_batch();
    let harness = common::build_harness(1, batch).await;
    let handle = &harness.executors[0];

    let tx = tokio::time::timeout(std::time::Duration::from_secs(5), handle.blockchain.wait_for_end_batch_transaction())
        .await
        .expect("single-executor committee reaches threshold on its own opinion");
    let EndBatchExecutionTransaction::Successful(_) = tx else {
        panic!("expected success");
    };

    let proof_before = handle.poex.lock().build_actual_proof();

    let published_drive_state = StorageHash([7; 32]);
    assert_ne!(published_drive_state, handle.storage.current_hash(), "test needs a genuinely different published hash");

    let storage_modification = handle
        .storage
        .initiate_modifications(DriveKey::zero(), ModificationId::zero())
        .await
        .expect("fake storage never fails");
    let info = PublishedEndBatchExecutionInfo {
        contract_key: ContractKey::zero(),
        batch_index: 1,
        batch_success: true,
        drive_state: published_drive_state,
        cosigners: vec![],
    };
    let accepted = handle.task.lock().await.on_end_batch_execution_published(info, storage_modification.as_ref()).await;
    assert!(accepted);

    assert_eq!(handle.storage.applied_log(), vec![false], "mismatched drive state must be discarded, not applied");
    assert_eq!(handle.storage.current_hash(), published_drive_state, "synchronize_storage must bring the drive to the published state");

    let proof_after = handle.poex.lock().build_actual_proof();
    assert_eq!(proof_after.initial_batch, 1, "PoEx must be reset to the batch boundary");
    assert_ne!(proof_before.batch_proof, proof_after.batch_proof, "reset must clear the accumulator built for the discarded batch");
}
