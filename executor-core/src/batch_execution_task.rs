// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! The state machine that carries one batch from "ready to run" to
//! "finalized on chain" (spec §4.2). Exactly one instance is alive per
//! contract at a time; it is driven entirely from the core thread
//! (spec §5) — every `pub async fn` here is itself a suspension point,
//! not a spawned background task, so the caller controls concurrency.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use executor_types::{
    Batch, BatchIndex, CallExecutionOpinion, CallExecutorParticipation, CallParticipationEntry, CallRequestApi,
    CallTransactionInfo, EndBatchExecutionOpinion, EndBatchExecutionTransaction, ExecutorInfo, ExecutorKey,
    FailedEndBatchExecutionInfo, Proofs, PublishedEndBatchExecutionInfo, StorageHash, SuccessfulBatchInfo,
    SuccessfulEndBatchExecutionOpinion, SuccessfulEndBatchExecutionTransactionInfo, TransactionHash,
    UnsuccessfulEndBatchExecutionOpinion, UnsuccessfulEndBatchExecutionTransactionInfo,
};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::context::Context;
use crate::errors::{TaskError, VmError};
use crate::interfaces::{BlockchainClient, GasLimits, Messenger, MessageTag, SandboxModification, Storage, StorageModification, VirtualMachine};
use crate::proof_of_execution::ProofOfExecution;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    InitiateModifications,
    ExecuteCalls,
    EvaluateHash,
    ShareOpinions,
    ThresholdMet,
    AssembleTx,
    AwaitPublished,
    Terminal,
}

fn ceil_div(numerator: u64, denominator: u64) -> u64 {
    if denominator == 0 {
        return numerator;
    }
    numerator.div_ceil(denominator)
}

pub struct BatchExecutionTask {
    context: Arc<Context>,
    batch: Batch,
    vm: Arc<dyn VirtualMachine>,
    storage: Arc<dyn Storage>,
    messenger: Arc<dyn Messenger>,
    blockchain: Arc<dyn BlockchainClient>,
    poex: Arc<Mutex<ProofOfExecution>>,

    state: TaskState,
    terminated: Arc<AtomicBool>,
    storage_quarantined: bool,

    is_batch_successful: bool,
    calls_execution_info: Vec<CallExecutionOpinion>,
    per_call_participation: Vec<CallExecutorParticipation>,
    poex_verification_info: Vec<executor_types::CurvePointBytes>,
    storage_hash: StorageHash,
    drive: executor_types::DriveKey,
    modification_id: executor_types::ModificationId,

    local_opinion: Option<EndBatchExecutionOpinion>,
    peer_checkpoints: HashMap<ExecutorKey, ExecutorInfo>,
    received_opinions: HashMap<ExecutorKey, EndBatchExecutionOpinion>,
    matching_successful: HashSet<ExecutorKey>,
    matching_unsuccessful: HashSet<ExecutorKey>,
    assembling: bool,
}

impl BatchExecutionTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: Arc<Context>,
        batch: Batch,
        vm: Arc<dyn VirtualMachine>,
        storage: Arc<dyn Storage>,
        messenger: Arc<dyn Messenger>,
        blockchain: Arc<dyn BlockchainClient>,
        poex: Arc<Mutex<ProofOfExecution>>,
        mut peer_checkpoints: HashMap<ExecutorKey, ExecutorInfo>,
    ) -> Self {
        let initial_batch = poex.lock().initial_batch();
        for peer in context.committee.members() {
            peer_checkpoints
                .entry(*peer)
                .or_insert_with(|| crate::proof_of_execution::genesis_checkpoint(initial_batch));
        }
        Self {
            context,
            batch,
            vm,
            storage,
            messenger,
            blockchain,
            poex,
            state: TaskState::InitiateModifications,
            terminated: Arc::new(AtomicBool::new(false)),
            storage_quarantined: false,
            is_batch_successful: true,
            calls_execution_info: Vec::new(),
            per_call_participation: Vec::new(),
            poex_verification_info: Vec::new(),
            storage_hash: StorageHash::zero(),
            drive: executor_types::DriveKey::zero(),
            modification_id: executor_types::ModificationId::zero(),
            local_opinion: None,
            peer_checkpoints,
            received_opinions: HashMap::new(),
            matching_successful: HashSet::new(),
            matching_unsuccessful: HashSet::new(),
            assembling: false,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn batch_index(&self) -> BatchIndex {
        self.batch.batch_index
    }

    pub fn peer_checkpoints(&self) -> &HashMap<ExecutorKey, ExecutorInfo> {
        &self.peer_checkpoints
    }

    fn is_live(&self) -> bool {
        self.state != TaskState::Terminal && !self.terminated.load(Ordering::Acquire) && !self.storage_quarantined
    }

    /// Stops scheduling further work, ignores subsequent opinions and
    /// callbacks (spec §4.2 "terminate()"). Outstanding suspensions
    /// observe `is_live() == false` on resumption and bail (spec §5
    /// "still live" check).
    pub fn terminate(&mut self) {
        self.terminated.store(true, Ordering::Release);
        self.state = TaskState::Terminal;
        self.context.metrics.active_batch_index.set(-1);
    }

    /// Drives `INITIATE_MODIFICATIONS` through the first `SHARE_OPINIONS`
    /// send. Does not block waiting for threshold: peers' opinions and
    /// the re-send timer arrive through `receive_opinion` /
    /// `resend_opinion`, each its own suspension point.
    pub async fn run(
        &mut self,
        drive: executor_types::DriveKey,
        modification_id: executor_types::ModificationId,
    ) -> Result<(), TaskError> {
        if !self.is_live() {
            return Err(TaskError::Terminal);
        }
        self.drive = drive;
        self.modification_id = modification_id;
        self.context.metrics.active_batch_index.set(self.batch.batch_index as i64);
        self.state = TaskState::InitiateModifications;
        let modification = self
            .storage
            .initiate_modifications(drive, modification_id)
            .await
            .map_err(|_| self.quarantine_storage())?;

        self.state = TaskState::ExecuteCalls;
        self.execute_calls(modification.as_ref()).await?;
        if !self.is_live() {
            return Err(TaskError::Terminal);
        }

        self.state = TaskState::EvaluateHash;
        let storage_state = modification
            .evaluate_storage_hash()
            .await
            .map_err(|_| self.quarantine_storage())?;
        self.storage_hash = storage_state.storage_hash;

        self.state = TaskState::ShareOpinions;
        self.build_and_send_local_opinion().await;
        Ok(())
    }

    fn quarantine_storage(&mut self) -> TaskError {
        warn!(batch_index = self.batch.batch_index, "storage reported unavailable; quarantining task");
        self.storage_quarantined = true;
        TaskError::StorageUnavailable
    }

    async fn execute_calls(&mut self, modification: &dyn StorageModification) -> Result<(), TaskError> {
        let max_retries = self.context.executor_config.max_call_retries;
        let backoff = self.context.executor_config.vm_failure_backoff();
        let execution_multiplier = self.context.executor_config.execution_payment_to_gas_multiplier;
        let download_multiplier = self.context.executor_config.download_payment_to_gas_multiplier;

        for call in self.batch.call_requests.clone() {
            if !self.is_live() {
                return Err(TaskError::Terminal);
            }
            let sandbox = modification
                .initiate_sandbox_modification()
                .await
                .map_err(|_| self.quarantine_storage())?;

            let gas_limits = GasLimits {
                execution_gas: call.execution_payment().saturating_mul(execution_multiplier),
                download_gas: call.download_payment().saturating_mul(download_multiplier),
            };

            let mut attempt = 0u32;
            let outcome = loop {
                match self.vm.execute_call(&call, gas_limits, sandbox.as_ref()).await {
                    Ok(result) => break Some(result),
                    Err(VmError::VmUnavailable) => {
                        attempt += 1;
                        self.context.metrics.calls_executed.with_label_values(&["vm_unavailable"]).inc();
                        if attempt > max_retries {
                            break None;
                        }
                        tokio::time::sleep(backoff).await;
                    }
                }
            };

            let (success, execution_gas_used, download_gas_used, secret) = match outcome {
                Some(result) => (result.success, result.execution_gas_consumed, result.download_gas_consumed, result.proof_of_execution_secret_data),
                None => (false, 0, 0, 0),
            };

            sandbox
                .apply_sandbox_modification(success)
                .await
                .map_err(|_| self.quarantine_storage())?;

            let execution_gas_used = execution_gas_used.min(gas_limits.execution_gas);
            let download_gas_used = download_gas_used.min(gas_limits.download_gas);
            let participation = CallExecutorParticipation {
                execution_payment_used: ceil_div(execution_gas_used, execution_multiplier.max(1)),
                download_payment_used: ceil_div(download_gas_used, download_multiplier.max(1)),
            };

            let verification_info = if success {
                Some(self.poex.lock().add_to_proof(self.batch.batch_index, secret))
            } else {
                None
            };

            if let Some(info) = verification_info {
                self.poex_verification_info.push(info);
            }

            self.context
                .metrics
                .calls_executed
                .with_label_values(&[if success { "success" } else { "failure" }])
                .inc();

            self.is_batch_successful &= success;
            self.calls_execution_info.push(CallExecutionOpinion {
                call_id: call.call_id(),
                is_manual: call.is_manual(),
                block_height: call.block_height(),
                success,
                released_transaction: TransactionHash::zero(),
                participation,
            });
            self.per_call_participation.push(participation);
        }
        Ok(())
    }

    async fn build_and_send_local_opinion(&mut self) {
        let opinion = if self.is_batch_successful {
            let proofs = self.poex.lock().build_actual_proof();
            EndBatchExecutionOpinion::Successful(self.sign_successful(proofs))
        } else {
            // Previous-proof path: side-effect-free, read-only (SPEC_FULL.md
            // §2.2). PoEx is rewound only when the chain publishes failure.
            let proofs = self.poex.lock().build_previous_proof();
            EndBatchExecutionOpinion::Unsuccessful(self.sign_unsuccessful(proofs))
        };
        self.local_opinion = Some(opinion.clone());
        self.send_opinion(&opinion).await;
        // A committee of size 1 (or a threshold already met by peer
        // opinions that arrived before ours, e.g. during replay/tests)
        // reaches threshold on our own opinion alone.
        self.maybe_reach_threshold().await;
    }

    fn sign_successful(&self, proofs: Proofs) -> SuccessfulEndBatchExecutionOpinion {
        let mut unsigned = SuccessfulEndBatchExecutionOpinion {
            contract_key: self.context.contract_key,
            batch_index: self.batch.batch_index,
            automatic_checked_up_to: self.batch.automatic_checked_up_to,
            executor_key: self.context.own_key_pair.public_key(),
            calls_execution_info: self.calls_execution_info.clone(),
            successful_batch_info: SuccessfulBatchInfo {
                storage_hash: self.storage_hash,
                used_drive_size: 0,
                meta_files_size: 0,
                poex_verification_info: self.poex_verification_info.clone(),
            },
            proofs,
            signature: executor_types::Signature::zero(),
        };
        let bytes = EndBatchExecutionOpinion::Successful(unsigned.clone()).signing_bytes();
        unsigned.signature = self.context.own_key_pair.sign(&bytes);
        unsigned
    }

    fn sign_unsuccessful(&self, previous_proof: Proofs) -> UnsuccessfulEndBatchExecutionOpinion {
        let mut unsigned = UnsuccessfulEndBatchExecutionOpinion {
            contract_key: self.context.contract_key,
            batch_index: self.batch.batch_index,
            automatic_checked_up_to: self.batch.automatic_checked_up_to,
            executor_key: self.context.own_key_pair.public_key(),
            previous_proof,
            signature: executor_types::Signature::zero(),
        };
        let bytes = EndBatchExecutionOpinion::Unsuccessful(unsigned.clone()).signing_bytes();
        unsigned.signature = self.context.own_key_pair.sign(&bytes);
        unsigned
    }

    async fn send_opinion(&self, opinion: &EndBatchExecutionOpinion) {
        let tag = match opinion {
            EndBatchExecutionOpinion::Successful(_) => MessageTag::SuccessfulEndBatch,
            EndBatchExecutionOpinion::Unsuccessful(_) => MessageTag::UnsuccessfulEndBatch,
        };
        let Ok(content) = bcs::to_bytes(opinion) else {
            warn!("failed to serialize local opinion");
            return;
        };
        for peer in self.context.committee.members() {
            if *peer == self.context.own_key_pair.public_key() {
                continue;
            }
            if let Err(err) = self.messenger.send_message(*peer, tag, content.clone()).await {
                debug!(?err, "failed to send opinion to peer, will retry on next tick");
            }
        }
        self.context
            .metrics
            .opinions_sent
            .with_label_values(&[if matches!(tag, MessageTag::SuccessfulEndBatch) { "successful" } else { "unsuccessful" }])
            .inc();
    }

    /// Called on `share_opinion_timeout_ms` by the core thread's timer
    /// (spec §4.2 "Repeat every `share_opinion_timeout_ms`").
    pub async fn resend_opinion(&self) {
        if !self.is_live() || self.state != TaskState::ShareOpinions {
            return;
        }
        if let Some(opinion) = &self.local_opinion {
            self.send_opinion(opinion).await;
        }
    }

    /// A peer's opinion arrived off the wire (spec §4.2 "Opinion
    /// reception"). Returns `false` if the task is terminal or the
    /// opinion was rejected (P8); `true` if it was accepted and
    /// recorded.
    pub async fn receive_opinion(&mut self, opinion: EndBatchExecutionOpinion) -> bool {
        if !self.is_live() {
            return false;
        }
        if opinion.batch_index() != self.batch.batch_index {
            return false;
        }
        if !self.context.committee.contains(&opinion.executor_key()) {
            return false;
        }
        let signing_bytes = opinion.signing_bytes();
        if executor_config::verify(opinion.executor_key(), &signing_bytes, opinion.signature()).is_err() {
            warn!(executor = ?opinion.executor_key(), "rejecting opinion with invalid signature");
            return false;
        }

        let peer = opinion.executor_key();
        let batch_index = self.batch.batch_index;
        let peer_checkpoint = self
            .peer_checkpoints
            .entry(peer)
            .or_insert_with(|| crate::proof_of_execution::genesis_checkpoint(batch_index));

        let accepted = match &opinion {
            EndBatchExecutionOpinion::Successful(o) => {
                if o.successful_batch_info.storage_hash != self.storage_hash {
                    false
                } else if o.successful_batch_info.poex_verification_info != self.poex_verification_info {
                    false
                } else {
                    // Our own ledger already holds a `Y` for every batch we
                    // ourselves have executed, including this one (recorded
                    // during `execute_calls`); since the agreement check
                    // above confirmed the opinion's `poex_verification_info`
                    // is byte-identical to ours for this batch, there is
                    // nothing new to learn from the peer's claim here.
                    let verified = {
                        let guard = self.poex.lock();
                        let latest_y = o
                            .successful_batch_info
                            .poex_verification_info
                            .last()
                            .copied()
                            .unwrap_or(executor_types::CurvePointBytes([0u8; 32]));
                        guard.verify_proof(
                            peer,
                            peer_checkpoint.batch_proof,
                            peer_checkpoint.initial_batch,
                            &o.proofs,
                            self.batch.batch_index,
                            latest_y,
                        )
                    };
                    if verified {
                        self.matching_successful.insert(peer);
                        *peer_checkpoint = ExecutorInfo {
                            next_batch_to_approve: self.batch.batch_index + 1,
                            initial_batch: o.proofs.initial_batch,
                            batch_proof: o.proofs.batch_proof,
                        };
                    }
                    verified
                }
            }
            EndBatchExecutionOpinion::Unsuccessful(o) => {
                self.matching_unsuccessful.insert(peer);
                *peer_checkpoint = ExecutorInfo {
                    next_batch_to_approve: self.batch.batch_index,
                    initial_batch: o.previous_proof.initial_batch,
                    batch_proof: o.previous_proof.batch_proof,
                };
                true
            }
        };
        if !accepted {
            return false;
        }

        self.received_opinions.insert(peer, opinion);
        self.context
            .metrics
            .opinions_received
            .with_label_values(&[if self.matching_successful.contains(&peer) { "successful" } else { "unsuccessful" }])
            .inc();

        self.maybe_reach_threshold().await;
        true
    }

    async fn maybe_reach_threshold(&mut self) {
        if self.assembling || self.state != TaskState::ShareOpinions {
            return;
        }
        let threshold = self.context.threshold();
        let own_key = self.context.own_key_pair.public_key();
        let self_counts_successful = self.is_batch_successful && self.local_opinion.is_some();

        let successful_count = self.matching_successful.len() + usize::from(self_counts_successful && !self.matching_successful.contains(&own_key));
        let unsuccessful_count = self.matching_unsuccessful.len() + usize::from(!self.is_batch_successful && self.local_opinion.is_some() && !self.matching_unsuccessful.contains(&own_key));

        if successful_count >= threshold {
            self.assembling = true;
            self.state = TaskState::ThresholdMet;
            self.context.metrics.threshold_reached.with_label_values(&["successful"]).inc();
            tokio::time::sleep(self.context.executor_config.successful_execution_delay()).await;
            if self.is_live() {
                self.assemble_successful_tx().await;
            }
        } else if unsuccessful_count >= threshold {
            self.assembling = true;
            self.state = TaskState::ThresholdMet;
            self.context.metrics.threshold_reached.with_label_values(&["unsuccessful"]).inc();
            tokio::time::sleep(self.context.executor_config.unsuccessful_execution_delay()).await;
            if self.is_live() {
                self.assemble_unsuccessful_tx().await;
            }
        }
    }

    async fn assemble_successful_tx(&mut self) {
        self.state = TaskState::AssembleTx;
        let mut cosigners: Vec<ExecutorKey> = self.matching_successful.iter().copied().collect();
        let own_key = self.context.own_key_pair.public_key();
        if !cosigners.contains(&own_key) {
            cosigners.push(own_key);
        }
        cosigners.sort();

        let mut signatures = Vec::with_capacity(cosigners.len());
        let mut proofs = Vec::with_capacity(cosigners.len());
        for signer in &cosigners {
            if *signer == own_key {
                if let Some(EndBatchExecutionOpinion::Successful(o)) = &self.local_opinion {
                    signatures.push(o.signature);
                    proofs.push(o.proofs);
                }
            } else if let Some(EndBatchExecutionOpinion::Successful(o)) = self.received_opinions.get(signer) {
                signatures.push(o.signature);
                proofs.push(o.proofs);
            }
        }

        let mut calls = Vec::with_capacity(self.calls_execution_info.len());
        for (idx, info) in self.calls_execution_info.iter().enumerate() {
            let mut participations = Vec::with_capacity(cosigners.len());
            for signer in &cosigners {
                let participation = if *signer == own_key {
                    self.per_call_participation.get(idx).copied().unwrap_or_default()
                } else if let Some(EndBatchExecutionOpinion::Successful(o)) = self.received_opinions.get(signer) {
                    o.calls_execution_info.get(idx).map(|c| c.participation).unwrap_or_default()
                } else {
                    CallExecutorParticipation::default()
                };
                participations.push(CallParticipationEntry { executor_key: *signer, participation });
            }
            calls.push(CallTransactionInfo {
                call_id: info.call_id,
                is_manual: info.is_manual,
                block_height: info.block_height,
                success: info.success,
                released_transaction: info.released_transaction,
                participations,
            });
        }

        let transaction = EndBatchExecutionTransaction::Successful(SuccessfulEndBatchExecutionTransactionInfo {
            contract_key: self.context.contract_key,
            batch_index: self.batch.batch_index,
            automatic_checked_up_to: self.batch.automatic_checked_up_to,
            successful_batch_info: SuccessfulBatchInfo {
                storage_hash: self.storage_hash,
                used_drive_size: 0,
                meta_files_size: 0,
                poex_verification_info: self.poex_verification_info.clone(),
            },
            calls,
            cosigners,
            signatures,
            proofs,
        });
        self.state = TaskState::AwaitPublished;
        self.blockchain.end_batch_transaction_is_ready(self.context.contract_key, transaction).await;
    }

    async fn assemble_unsuccessful_tx(&mut self) {
        self.state = TaskState::AssembleTx;
        let mut cosigners: Vec<ExecutorKey> = self.matching_unsuccessful.iter().copied().collect();
        let own_key = self.context.own_key_pair.public_key();
        if !cosigners.contains(&own_key) {
            cosigners.push(own_key);
        }
        cosigners.sort();

        let mut signatures = Vec::with_capacity(cosigners.len());
        let mut proofs = Vec::with_capacity(cosigners.len());
        for signer in &cosigners {
            if *signer == own_key {
                if let Some(EndBatchExecutionOpinion::Unsuccessful(o)) = &self.local_opinion {
                    signatures.push(o.signature);
                    proofs.push(o.previous_proof);
                }
            } else if let Some(EndBatchExecutionOpinion::Unsuccessful(o)) = self.received_opinions.get(signer) {
                signatures.push(o.signature);
                proofs.push(o.previous_proof);
            }
        }

        let transaction = EndBatchExecutionTransaction::Unsuccessful(UnsuccessfulEndBatchExecutionTransactionInfo {
            contract_key: self.context.contract_key,
            batch_index: self.batch.batch_index,
            automatic_checked_up_to: self.batch.automatic_checked_up_to,
            cosigners,
            signatures,
            proofs,
        });
        self.state = TaskState::AwaitPublished;
        self.blockchain.end_batch_transaction_is_ready(self.context.contract_key, transaction).await;
    }

    /// `on_end_batch_execution_published(info)`, branch 1/2 (spec §4.2
    /// AWAIT_PUBLISHED). Returns `false` if the task is already terminal
    /// (P8).
    pub async fn on_end_batch_execution_published(
        &mut self,
        info: PublishedEndBatchExecutionInfo,
        storage: &dyn StorageModification,
    ) -> bool {
        if !self.is_live() || info.batch_index != self.batch.batch_index {
            return false;
        }
        if info.drive_state == self.storage_hash {
            let _ = storage.apply_storage_modification(true).await;
            self.poex.lock().clear_pending();
        } else {
            let _ = storage.apply_storage_modification(false).await;
            let _ = self.storage.synchronize_storage(self.drive, self.modification_id, info.drive_state).await;
            self.poex.lock().reset(self.batch.batch_index);
            self.context.metrics.poex_resets.inc();
        }
        self.terminate();
        true
    }

    /// `on_end_batch_execution_failed(info)` (spec §4.2 AWAIT_PUBLISHED
    /// branch 3): pop PoEx once per call appended this batch, in
    /// reverse order, then discard the sandbox (SPEC_FULL.md §2.2).
    pub async fn on_end_batch_execution_failed(&mut self, info: FailedEndBatchExecutionInfo, storage: &dyn StorageModification) -> bool {
        if !self.is_live() || info.batch_index != self.batch.batch_index {
            return false;
        }
        {
            let mut guard = self.poex.lock();
            for _ in 0..self.calls_execution_info.iter().filter(|c| c.success).count() {
                let _ = guard.pop_from_proof();
            }
            guard.clear_pending();
        }
        let _ = storage.apply_storage_modification(false).await;
        self.terminate();
        true
    }
}
