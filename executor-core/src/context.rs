// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! Per-contract configuration and metrics shared by every component of
//! the pipeline (`BatchesManager`, `BatchExecutionTask`,
//! `ProofOfExecution`). Mirrors the teacher's `consensus/core::Context`:
//! one `Arc<Context>` handed to every component at construction instead
//! of threading individual config/metrics arguments through each call.

use std::sync::Arc;

use executor_config::{Committee, ContractConfig, ExecutorConfig, ExecutorKeyPair};
use executor_types::ContractKey;

use crate::metrics::ExecutorMetrics;

pub struct Context {
    /// This executor's identity and signing key for the contract.
    pub own_key_pair: ExecutorKeyPair,
    /// The contract this pipeline instance serves.
    pub contract_key: ContractKey,
    /// The executor cohort assigned to this contract.
    pub committee: Committee,
    /// Process-wide executor configuration.
    pub executor_config: ExecutorConfig,
    /// Per-contract configuration.
    pub contract_config: ContractConfig,
    /// Metrics shared by every component in this pipeline.
    pub metrics: Arc<ExecutorMetrics>,
}

impl Context {
    pub fn new(
        own_key_pair: ExecutorKeyPair,
        contract_key: ContractKey,
        committee: Committee,
        executor_config: ExecutorConfig,
        contract_config: ContractConfig,
        metrics: Arc<ExecutorMetrics>,
    ) -> Self {
        Self {
            own_key_pair,
            contract_key,
            committee,
            executor_config,
            contract_config,
            metrics,
        }
    }

    /// `⌈2N/3⌉` of the contract's executor cohort, including self (spec
    /// §4.2 THRESHOLD_MET).
    pub fn threshold(&self) -> usize {
        self.committee.threshold()
    }

    #[cfg(test)]
    pub fn new_for_test() -> (Self, executor_config::ExecutorKeyPair) {
        let own = ExecutorKeyPair::generate();
        let peer_a = ExecutorKeyPair::generate();
        let peer_b = ExecutorKeyPair::generate();
        let committee = Committee::new([own.public_key(), peer_a.public_key(), peer_b.public_key()]);
        let context = Self::new(
            own,
            ContractKey::zero(),
            committee,
            ExecutorConfig::default(),
            ContractConfig::default(),
            ExecutorMetrics::new_for_test(),
        );
        (context, peer_a)
    }
}
