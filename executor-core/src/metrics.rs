// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! Metrics registered against a `prometheus::Registry` passed in by the
//! host process. Scope is deliberately small (see SPEC_FULL.md §1
//! "Metrics"): enough to observe the pipeline, not a full surface.

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

pub struct ExecutorMetrics {
    pub batches_emitted: IntCounter,
    pub batches_delayed: IntCounter,
    pub calls_executed: IntCounterVec,
    pub opinions_sent: IntCounterVec,
    pub opinions_received: IntCounterVec,
    pub threshold_reached: IntCounterVec,
    pub poex_resets: IntCounter,
    pub automatic_evaluation_retries: IntCounter,
    pub active_batch_index: IntGauge,
}

impl ExecutorMetrics {
    pub fn new(registry: &Registry) -> Self {
        let metrics = Self {
            batches_emitted: IntCounter::new(
                "executor_batches_emitted_total",
                "Batches released by the batches manager",
            )
            .unwrap(),
            batches_delayed: IntCounter::new(
                "executor_batches_delayed_total",
                "Batches returned to the queue via delay_batch",
            )
            .unwrap(),
            calls_executed: IntCounterVec::new(
                Opts::new("executor_calls_executed_total", "Calls executed by the VM, labeled by outcome"),
                &["outcome"],
            )
            .unwrap(),
            opinions_sent: IntCounterVec::new(
                Opts::new("executor_opinions_sent_total", "Opinions sent to peers, labeled by kind"),
                &["kind"],
            )
            .unwrap(),
            opinions_received: IntCounterVec::new(
                Opts::new("executor_opinions_received_total", "Opinions received from peers, labeled by kind"),
                &["kind"],
            )
            .unwrap(),
            threshold_reached: IntCounterVec::new(
                Opts::new("executor_threshold_reached_total", "Times a batch task reached threshold, labeled by kind"),
                &["kind"],
            )
            .unwrap(),
            poex_resets: IntCounter::new(
                "executor_poex_resets_total",
                "Times the proof-of-execution accumulator was reset",
            )
            .unwrap(),
            automatic_evaluation_retries: IntCounter::new(
                "executor_automatic_evaluation_retries_total",
                "Retries of the automatic-execution evaluator after vm_unavailable",
            )
            .unwrap(),
            active_batch_index: IntGauge::new(
                "executor_active_batch_index",
                "batch_index of the currently running BatchExecutionTask, or -1 if idle",
            )
            .unwrap(),
        };

        let register = |r: &Registry| -> prometheus::Result<()> {
            r.register(Box::new(metrics.batches_emitted.clone()))?;
            r.register(Box::new(metrics.batches_delayed.clone()))?;
            r.register(Box::new(metrics.calls_executed.clone()))?;
            r.register(Box::new(metrics.opinions_sent.clone()))?;
            r.register(Box::new(metrics.opinions_received.clone()))?;
            r.register(Box::new(metrics.threshold_reached.clone()))?;
            r.register(Box::new(metrics.poex_resets.clone()))?;
            r.register(Box::new(metrics.automatic_evaluation_retries.clone()))?;
            r.register(Box::new(metrics.active_batch_index.clone()))?;
            Ok(())
        };
        // Registering twice (e.g. two contracts sharing a process-wide
        // registry in tests) is harmless; the host process owns one
        // registry per executor so this only fires once in production.
        let _ = register(registry);

        metrics.active_batch_index.set(-1);
        metrics
    }

    /// Convenience constructor for tests and benches that don't care
    /// about the backing registry.
    pub fn new_for_test() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::new(&Registry::new()))
    }
}
