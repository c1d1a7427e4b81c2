// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! Partitions the interleaved stream of manual calls and block
//! announcements into indexed batches (spec §4.1). Touched only from
//! the core thread (spec §5): no internal locking.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use executor_types::{AutomaticCallRequest, Batch, BatchIndex, BlockHeight, CallId, CallRequest, ManualCallRequest};
use tracing::{debug, warn};

use crate::errors::BatchesManagerError;
use crate::metrics::ExecutorMetrics;

/// Outcome of running the automatic-execution evaluator for one block
/// height, cached so a closing decision never re-runs the VM call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EvaluatorResult {
    Fires,
    DoesNotFire,
}

/// Per-block bookkeeping the manager keeps until the block has been
/// folded into an emitted batch.
struct BlockRecord {
    height: BlockHeight,
    automatic_enabled: bool,
    evaluator_result: Option<EvaluatorResult>,
    evaluator_attempts: u32,
}

pub struct BatchesManager {
    next_batch_index: BatchIndex,
    unmodifiable_up_to: Option<BlockHeight>,
    automatic_enabled_since: Option<BlockHeight>,
    last_block_height: Option<BlockHeight>,

    pending_manual: BTreeMap<CallId, ManualCallRequest>,
    next_arrival_seq: u64,
    pending_blocks: VecDeque<BlockRecord>,

    ready_batches: VecDeque<Batch>,
    max_evaluator_retries: u32,
    metrics: Arc<ExecutorMetrics>,
}

impl BatchesManager {
    pub fn new(start_batch_index: BatchIndex, max_evaluator_retries: u32, metrics: Arc<ExecutorMetrics>) -> Self {
        Self {
            next_batch_index: start_batch_index,
            unmodifiable_up_to: None,
            automatic_enabled_since: None,
            last_block_height: None,
            pending_manual: BTreeMap::new(),
            next_arrival_seq: 0,
            pending_blocks: VecDeque::new(),
            ready_batches: VecDeque::new(),
            max_evaluator_retries,
            metrics,
        }
    }

    /// `add_manual_call(req)` (spec §4.1): enqueue in arrival order,
    /// idempotent on duplicate `call_id`, silently dropped if it
    /// targets a frozen block height.
    pub fn add_manual_call(&mut self, req: ManualCallRequest) {
        if let Some(frozen) = self.unmodifiable_up_to {
            if req.block_height <= frozen {
                debug!(
                    block_height = req.block_height,
                    frozen, "dropping manual call targeting a frozen block height"
                );
                return;
            }
        }
        if self.pending_manual.contains_key(&req.call_id) {
            return;
        }
        let seq = self.next_arrival_seq;
        self.next_arrival_seq += 1;
        self.pending_manual.insert(req.call_id, req.with_arrival_seq(seq));
    }

    /// `add_block(h)` (spec §4.1): heights must be monotonic; triggers
    /// evaluation of the automatic trigger at `h` and an attempt to
    /// close a batch.
    pub fn add_block(&mut self, height: BlockHeight, automatic_should_fire: impl Fn(BlockHeight) -> Option<bool>) -> Result<(), BatchesManagerError> {
        if let Some(last) = self.last_block_height {
            if height <= last {
                return Err(BatchesManagerError::NonMonotonicBlockHeight);
            }
        }
        self.last_block_height = Some(height);

        let automatic_enabled = self.automatic_enabled_since.is_some_and(|since| height >= since);
        let evaluator_result = if automatic_enabled {
            automatic_should_fire(height).map(|fires| if fires { EvaluatorResult::Fires } else { EvaluatorResult::DoesNotFire })
        } else {
            Some(EvaluatorResult::DoesNotFire)
        };

        self.pending_blocks.push_back(BlockRecord {
            height,
            automatic_enabled,
            evaluator_result,
            evaluator_attempts: 0,
        });

        self.try_close_batches();
        Ok(())
    }

    /// Record the (possibly delayed) result of the automatic evaluator
    /// for `height`, then retry closing. Used when
    /// `automatic_should_fire` initially returned `None`
    /// (`vm_unavailable`, spec §4.1 edge cases).
    pub fn record_evaluator_result(&mut self, height: BlockHeight, fires: bool) {
        for record in self.pending_blocks.iter_mut() {
            if record.height == height && record.evaluator_result.is_none() {
                record.evaluator_result = Some(if fires { EvaluatorResult::Fires } else { EvaluatorResult::DoesNotFire });
                break;
            }
        }
        self.try_close_batches();
    }

    /// Blocks whose automatic evaluator is still pending and has not
    /// exhausted its retry budget, for the caller to re-schedule with
    /// backoff (SPEC_FULL.md §2.4).
    pub fn blocks_awaiting_evaluation(&mut self) -> Vec<BlockHeight> {
        let mut out = Vec::new();
        for record in self.pending_blocks.iter_mut() {
            if record.evaluator_result.is_none() && record.automatic_enabled {
                if record.evaluator_attempts < self.max_evaluator_retries {
                    record.evaluator_attempts += 1;
                    self.metrics.automatic_evaluation_retries.inc();
                    out.push(record.height);
                } else {
                    warn!(height = record.height, "automatic evaluator retries exhausted, block remains open");
                }
            }
        }
        out
    }

    /// `set_automatic_executions_enabled_since(maybe_h)` (spec §4.1):
    /// observed only for blocks not yet frozen by
    /// `set_unmodifiable_up_to`.
    pub fn set_automatic_executions_enabled_since(&mut self, since: Option<BlockHeight>) {
        self.automatic_enabled_since = since;
        let frozen = self.unmodifiable_up_to;
        for record in self.pending_blocks.iter_mut() {
            if frozen.is_some_and(|f| record.height <= f) {
                continue;
            }
            let now_enabled = since.is_some_and(|s| record.height >= s);
            if now_enabled != record.automatic_enabled {
                record.automatic_enabled = now_enabled;
                record.evaluator_result = None;
                record.evaluator_attempts = 0;
            }
        }
        self.try_close_batches();
    }

    /// `set_unmodifiable_up_to(h)` (spec §4.1): freezes decisions for
    /// blocks `<= h`.
    pub fn set_unmodifiable_up_to(&mut self, height: BlockHeight) {
        self.unmodifiable_up_to = Some(match self.unmodifiable_up_to {
            Some(existing) => existing.max(height),
            None => height,
        });
    }

    /// `cancel_batches_till(idx)` (spec §4.1): discard ready batches
    /// below `idx` and reindex emission to resume at `idx`.
    pub fn cancel_batches_till(&mut self, idx: BatchIndex) {
        self.ready_batches.retain(|b| b.batch_index >= idx);
        if self.next_batch_index < idx {
            self.next_batch_index = idx;
        }
    }

    /// `delay_batch(batch)` (spec §4.1): return a previously issued
    /// batch to the head of the queue, preserving `batch_index`.
    pub fn delay_batch(&mut self, batch: Batch) {
        self.metrics.batches_delayed.inc();
        self.ready_batches.push_front(batch);
    }

    pub fn has_next_batch(&self) -> bool {
        !self.ready_batches.is_empty()
    }

    /// `next_batch() -> Batch` (spec §4.1). Fails the caller if none
    /// ready.
    pub fn next_batch(&mut self) -> Result<Batch, BatchesManagerError> {
        self.ready_batches.pop_front().ok_or(BatchesManagerError::NoBatchReady)
    }

    /// `is_batch_valid(batch)` (spec §4.1): true iff membership and
    /// index still match what this manager would now emit for that
    /// slot. Since emitted batches are immutable once queued, this
    /// reduces to "still present in the ready queue with identical
    /// contents".
    pub fn is_batch_valid(&self, batch: &Batch) -> bool {
        self.ready_batches
            .iter()
            .any(|b| b.batch_index == batch.batch_index && b.call_requests.len() == batch.call_requests.len())
    }

    fn try_close_batches(&mut self) {
        loop {
            let Some(front) = self.pending_blocks.front() else { return };
            let Some(evaluator_result) = front.evaluator_result else { return };

            let h_close = front.height;
            let automatic_fires = evaluator_result == EvaluatorResult::Fires;

            let mut manual: Vec<ManualCallRequest> = self
                .pending_manual
                .values()
                .filter(|c| c.block_height <= h_close)
                .cloned()
                .collect();
            manual.sort_by_key(|c| (c.block_height, c.arrival_seq));

            if manual.is_empty() && !automatic_fires {
                // spec §4.1 edge case: no batch is emitted for an empty closing.
                self.pending_blocks.pop_front();
                continue;
            }

            for call in &manual {
                self.pending_manual.remove(&call.call_id);
            }

            let mut call_requests: Vec<CallRequest> = manual.into_iter().map(CallRequest::Manual).collect();
            let position = call_requests.len() as u64;
            if automatic_fires {
                let batch_index = self.next_batch_index;
                let call_id = AutomaticCallRequest::deterministic_call_id(batch_index, position);
                call_requests.push(CallRequest::Automatic(AutomaticCallRequest {
                    call_id,
                    file: String::new(),
                    function: String::new(),
                    execution_payment: 0,
                    download_payment: 0,
                    block_height: h_close,
                    arguments: Vec::new(),
                    service_payments: Vec::new(),
                }));
            }

            let batch = Batch::new(self.next_batch_index, h_close, call_requests);
            debug!(batch_index = batch.batch_index, h_close, "closing batch");
            self.next_batch_index += 1;
            self.metrics.batches_emitted.inc();
            self.ready_batches.push_back(batch);
            self.pending_blocks.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use executor_types::{CallerKey, ServicePayment};

    fn manual(call_id: u8, block_height: BlockHeight) -> ManualCallRequest {
        ManualCallRequest::new(
            CallId([call_id; 32]),
            "file.wasm".to_string(),
            "main".to_string(),
            10,
            5,
            CallerKey::zero(),
            block_height,
            vec![],
            Vec::<ServicePayment>::new(),
        )
    }

    #[test]
    fn empty_closing_emits_no_batch() {
        let mut mgr = BatchesManager::new(1, 8, ExecutorMetrics::new_for_test());
        mgr.add_block(1, |_| Some(false)).unwrap();
        assert!(!mgr.has_next_batch());
    }

    #[test]
    fn manual_calls_close_a_batch_without_automatic() {
        let mut mgr = BatchesManager::new(1, 8, ExecutorMetrics::new_for_test());
        mgr.add_manual_call(manual(1, 1));
        mgr.add_manual_call(manual(2, 1));
        mgr.add_block(1, |_| Some(false)).unwrap();
        assert!(mgr.has_next_batch());
        let batch = mgr.next_batch().unwrap();
        assert_eq!(batch.batch_index, 1);
        assert_eq!(batch.call_requests.len(), 2);
        assert!(batch.automatic_call().is_none());
    }

    #[test]
    fn automatic_call_is_last_when_it_fires() {
        let mut mgr = BatchesManager::new(1, 8, ExecutorMetrics::new_for_test());
        mgr.set_automatic_executions_enabled_since(Some(0));
        mgr.add_manual_call(manual(1, 1));
        mgr.add_block(1, |_| Some(true)).unwrap();
        let batch = mgr.next_batch().unwrap();
        assert_eq!(batch.call_requests.len(), 2);
        assert!(batch.automatic_call().is_some());
        assert!(batch.is_well_ordered());
    }

    #[test]
    fn duplicate_call_id_is_idempotent() {
        let mut mgr = BatchesManager::new(1, 8, ExecutorMetrics::new_for_test());
        mgr.add_manual_call(manual(1, 1));
        mgr.add_manual_call(manual(1, 1));
        mgr.add_block(1, |_| Some(false)).unwrap();
        let batch = mgr.next_batch().unwrap();
        assert_eq!(batch.call_requests.len(), 1);
    }

    #[test]
    fn frozen_block_height_rejects_new_manual_calls() {
        let mut mgr = BatchesManager::new(1, 8, ExecutorMetrics::new_for_test());
        mgr.set_unmodifiable_up_to(5);
        mgr.add_manual_call(manual(1, 3));
        mgr.add_block(3, |_| Some(false)).unwrap();
        assert!(!mgr.has_next_batch());
    }

    #[test]
    fn non_monotonic_block_height_is_rejected() {
        let mut mgr = BatchesManager::new(1, 8, ExecutorMetrics::new_for_test());
        mgr.add_block(5, |_| Some(false)).unwrap();
        assert!(matches!(mgr.add_block(3, |_| Some(false)), Err(BatchesManagerError::NonMonotonicBlockHeight)));
    }

    #[test]
    fn cancel_batches_till_reindexes_emission() {
        let mut mgr = BatchesManager::new(1, 8, ExecutorMetrics::new_for_test());
        mgr.add_manual_call(manual(1, 1));
        mgr.add_block(1, |_| Some(false)).unwrap();
        mgr.add_manual_call(manual(2, 2));
        mgr.add_block(2, |_| Some(false)).unwrap();
        mgr.cancel_batches_till(2);
        assert!(mgr.next_batch().unwrap().batch_index >= 2);
    }

    #[test]
    fn delay_batch_preserves_index_and_contents() {
        let mut mgr = BatchesManager::new(1, 8, ExecutorMetrics::new_for_test());
        mgr.add_manual_call(manual(1, 1));
        mgr.add_block(1, |_| Some(false)).unwrap();
        let batch = mgr.next_batch().unwrap();
        let idx = batch.batch_index;
        let len = batch.call_requests.len();
        mgr.delay_batch(batch);
        let again = mgr.next_batch().unwrap();
        assert_eq!(again.batch_index, idx);
        assert_eq!(again.call_requests.len(), len);
    }

    #[test]
    fn evaluator_pending_holds_batch_until_resolved() {
        let mut mgr = BatchesManager::new(1, 8, ExecutorMetrics::new_for_test());
        mgr.set_automatic_executions_enabled_since(Some(0));
        mgr.add_manual_call(manual(1, 1));
        mgr.add_block(1, |_| None).unwrap();
        assert!(!mgr.has_next_batch());
        mgr.record_evaluator_result(1, true);
        assert!(mgr.has_next_batch());
    }

    #[test]
    fn emitted_ordering_is_independent_of_insertion_order() {
        use rand::prelude::StdRng;
        use rand::seq::SliceRandom;
        use rand::SeedableRng;

        let mut calls: Vec<ManualCallRequest> = (0u8..10).map(|i| manual(i, 1 + (i % 3) as u64)).collect();

        for seed in 0..20u8 {
            calls.shuffle(&mut StdRng::from_seed([seed; 32]));

            let mut mgr = BatchesManager::new(1, 8, ExecutorMetrics::new_for_test());
            for call in &calls {
                mgr.add_manual_call(call.clone());
            }
            mgr.add_block(1, |_| Some(false)).unwrap();
            mgr.add_block(2, |_| Some(false)).unwrap();
            mgr.add_block(3, |_| Some(false)).unwrap();

            let mut seen_heights = Vec::new();
            while mgr.has_next_batch() {
                let batch = mgr.next_batch().unwrap();
                assert!(batch.is_well_ordered(), "insertion order must not affect within-batch ordering");
                seen_heights.push(batch.automatic_checked_up_to);
            }
            assert_eq!(seen_heights, vec![1, 2, 3], "batches must close in block order regardless of call arrival order");
        }
    }
}
