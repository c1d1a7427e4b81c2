// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! Operational configuration (spec §6 "Config"). All fields tolerate
//! inconsistencies between executors without affecting safety: they tune
//! timing and gas accounting, not consensus membership. Follows the
//! teacher's `consensus-config::Parameters` shape: every field has a
//! `#[serde(default = ...)]` pointing at a named constant function, and a
//! `Default` impl whose values match those same constants.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-executor-process configuration, shared by every contract this
/// executor participates in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// How long to wait, once threshold-many matching successful opinions
    /// have arrived, before assembling the end-batch transaction.
    #[serde(default = "ExecutorConfig::default_successful_execution_delay_ms")]
    pub successful_execution_delay_ms: u64,

    /// Same, for the unsuccessful path.
    #[serde(default = "ExecutorConfig::default_unsuccessful_execution_delay_ms")]
    pub unsuccessful_execution_delay_ms: u64,

    /// How often to re-send our opinion to peers while awaiting threshold.
    #[serde(default = "ExecutorConfig::default_share_opinion_timeout_ms")]
    pub share_opinion_timeout_ms: u64,

    /// Converts an `execution_payment` cap (in currency units) into a VM
    /// gas budget.
    #[serde(default = "ExecutorConfig::default_execution_payment_to_gas_multiplier")]
    pub execution_payment_to_gas_multiplier: u64,

    /// Converts a `download_payment` cap into a VM I/O gas budget.
    #[serde(default = "ExecutorConfig::default_download_payment_to_gas_multiplier")]
    pub download_payment_to_gas_multiplier: u64,

    /// Cap on concurrent internet connections the VM sandbox may open.
    #[serde(default = "ExecutorConfig::default_max_internet_connections")]
    pub max_internet_connections: u32,

    /// Logical network this executor is serving (mainnet/testnet/devnet);
    /// used only for metrics labels and log context.
    #[serde(default = "ExecutorConfig::default_network_identifier")]
    pub network_identifier: String,

    /// Initial backoff before retrying a call after a `vm_unavailable`
    /// error (spec §4.2 Failure semantics).
    #[serde(default = "ExecutorConfig::default_vm_failure_backoff_ms")]
    pub vm_failure_backoff_ms: u64,

    /// Bound on retries of a single call before it is marked
    /// `success=false` (spec §4.2 Failure semantics).
    #[serde(default = "ExecutorConfig::default_max_call_retries")]
    pub max_call_retries: u32,

    /// Bound on retries of the automatic-execution evaluator before a
    /// batch stalls (spec §4.1 edge cases).
    #[serde(default = "ExecutorConfig::default_max_automatic_evaluation_retries")]
    pub max_automatic_evaluation_retries: u32,
}

impl ExecutorConfig {
    pub fn default_successful_execution_delay_ms() -> u64 {
        500
    }
    pub fn default_unsuccessful_execution_delay_ms() -> u64 {
        500
    }
    pub fn default_share_opinion_timeout_ms() -> u64 {
        2_000
    }
    pub fn default_execution_payment_to_gas_multiplier() -> u64 {
        1
    }
    pub fn default_download_payment_to_gas_multiplier() -> u64 {
        1
    }
    pub fn default_max_internet_connections() -> u32 {
        16
    }
    pub fn default_network_identifier() -> String {
        "default".to_string()
    }
    pub fn default_vm_failure_backoff_ms() -> u64 {
        200
    }
    pub fn default_max_call_retries() -> u32 {
        5
    }
    pub fn default_max_automatic_evaluation_retries() -> u32 {
        8
    }

    pub fn successful_execution_delay(&self) -> Duration {
        Duration::from_millis(self.successful_execution_delay_ms)
    }
    pub fn unsuccessful_execution_delay(&self) -> Duration {
        Duration::from_millis(self.unsuccessful_execution_delay_ms)
    }
    pub fn share_opinion_timeout(&self) -> Duration {
        Duration::from_millis(self.share_opinion_timeout_ms)
    }
    pub fn vm_failure_backoff(&self) -> Duration {
        Duration::from_millis(self.vm_failure_backoff_ms)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            successful_execution_delay_ms: Self::default_successful_execution_delay_ms(),
            unsuccessful_execution_delay_ms: Self::default_unsuccessful_execution_delay_ms(),
            share_opinion_timeout_ms: Self::default_share_opinion_timeout_ms(),
            execution_payment_to_gas_multiplier: Self::default_execution_payment_to_gas_multiplier(),
            download_payment_to_gas_multiplier: Self::default_download_payment_to_gas_multiplier(),
            max_internet_connections: Self::default_max_internet_connections(),
            network_identifier: Self::default_network_identifier(),
            vm_failure_backoff_ms: Self::default_vm_failure_backoff_ms(),
            max_call_retries: Self::default_max_call_retries(),
            max_automatic_evaluation_retries: Self::default_max_automatic_evaluation_retries(),
        }
    }
}

/// Per-contract configuration, narrower than `ExecutorConfig`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Extra delay before accepting an unsuccessful batch as approved,
    /// giving slow peers a chance to catch up before the chain commits to
    /// failure.
    #[serde(default = "ContractConfig::default_unsuccessful_approval_delay_ms")]
    pub unsuccessful_approval_delay_ms: u64,
}

impl ContractConfig {
    pub fn default_unsuccessful_approval_delay_ms() -> u64 {
        1_000
    }

    pub fn unsuccessful_approval_delay(&self) -> Duration {
        Duration::from_millis(self.unsuccessful_approval_delay_ms)
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            unsuccessful_approval_delay_ms: Self::default_unsuccessful_approval_delay_ms(),
        }
    }
}
