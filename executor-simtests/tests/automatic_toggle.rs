// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! Scenario 4 (spec §8): automatic execution is enabled, then disabled,
//! then re-enabled across a run of blocks, with a freeze partway through
//! that must make the disable/enable toggle a no-op for already-frozen
//! heights.

use executor_core::{BatchesManager, ExecutorMetrics};
use executor_types::CallerKey;

fn manual(id: u8, height: u64) -> executor_types::ManualCallRequest {
    executor_types::ManualCallRequest::new(
        executor_types::CallId([id; 32]),
        "f.wasm".into(),
        "main".into(),
        10,
        5,
        CallerKey::zero(),
        height,
        vec![],
        vec![],
    )
}

#[test]
fn toggling_automatic_execution_mid_stream_respects_the_freeze() {
    let mut mgr = BatchesManager::new(1, 8, ExecutorMetrics::new_for_test());
    mgr.set_automatic_executions_enabled_since(Some(0));

    // Blocks 1-4: automatic enabled, always fires.
    for h in 1..=4 {
        mgr.add_manual_call(manual(h as u8, h));
        mgr.add_block(h, |_| Some(true)).unwrap();
    }
    for _ in 1..=4 {
        let batch = mgr.next_batch().unwrap();
        assert!(batch.automatic_call().is_some(), "automatic should have fired for blocks 1-4");
    }

    // Freeze everything up to and including height 5, then disable
    // automatic execution. The freeze must shield height 5's already
    // decided (or about-to-be-decided) outcome from the disable.
    mgr.add_manual_call(manual(5, 5));
    mgr.add_block(5, |_| Some(true)).unwrap();
    mgr.set_unmodifiable_up_to(5);
    mgr.set_automatic_executions_enabled_since(None);

    let frozen_batch = mgr.next_batch().unwrap();
    assert!(frozen_batch.automatic_call().is_some(), "height 5 was frozen before the disable, so its automatic call must survive");

    // Blocks 6-12: automatic now disabled, none should fire even though
    // the evaluator would otherwise say yes.
    for h in 6..=12 {
        mgr.add_manual_call(manual(h as u8, h));
        mgr.add_block(h, |_| Some(true)).unwrap();
    }
    let mut disabled_batches = Vec::new();
    while mgr.has_next_batch() {
        disabled_batches.push(mgr.next_batch().unwrap());
    }
    assert_eq!(disabled_batches.len(), 7, "one batch per block 6..=12");
    for batch in &disabled_batches {
        assert!(batch.automatic_call().is_none(), "automatic execution is disabled for blocks 6-12");
    }

    // Re-enabling from height 13 onward must resume firing.
    mgr.set_automatic_executions_enabled_since(Some(13));
    mgr.add_manual_call(manual(13, 13));
    mgr.add_block(13, |_| Some(true)).unwrap();
    let reenabled_batch = mgr.next_batch().unwrap();
    assert!(reenabled_batch.automatic_call().is_some());
}
