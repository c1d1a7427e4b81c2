// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! A blockchain-client fake that just records what the pipeline handed
//! it. The actual "chain" in these tests is the test body: it reads the
//! last recorded transaction and drives `on_end_batch_execution_published`
//! / `on_end_batch_execution_failed` back into the task itself, since a
//! real chain's commit protocol is explicitly out of scope (spec.md §1
//! Non-goals).

use async_trait::async_trait;
use executor_core::BlockchainClient;
use executor_types::{
    CallTransactionInfo, ContractKey, DriveKey, EndBatchExecutionTransaction, ModificationId, StorageHash,
    TransactionHash,
};
use parking_lot::Mutex;
use tokio::sync::Notify;

#[derive(Default)]
struct State {
    end_batch_transactions: Vec<(ContractKey, EndBatchExecutionTransaction)>,
    single_transactions: Vec<(ContractKey, CallTransactionInfo)>,
    synchronizations: Vec<(ContractKey, DriveKey, ModificationId, StorageHash)>,
    released: Vec<(ContractKey, Vec<TransactionHash>)>,
}

#[derive(Default)]
pub struct FakeBlockchainClient {
    state: Mutex<State>,
    notify: Notify,
}

impl FakeBlockchainClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until at least one end-batch transaction has been recorded,
    /// then returns the most recent one.
    pub async fn wait_for_end_batch_transaction(&self) -> EndBatchExecutionTransaction {
        loop {
            if let Some((_, tx)) = self.state.lock().end_batch_transactions.last() {
                return tx.clone();
            }
            self.notify.notified().await;
        }
    }

    pub fn end_batch_transaction_count(&self) -> usize {
        self.state.lock().end_batch_transactions.len()
    }

    pub fn synchronizations(&self) -> Vec<(ContractKey, DriveKey, ModificationId, StorageHash)> {
        self.state.lock().synchronizations.clone()
    }
}

#[async_trait]
impl BlockchainClient for FakeBlockchainClient {
    async fn end_batch_transaction_is_ready(&self, contract_key: ContractKey, transaction: EndBatchExecutionTransaction) {
        self.state.lock().end_batch_transactions.push((contract_key, transaction));
        self.notify.notify_waiters();
    }

    async fn end_batch_single_transaction_is_ready(&self, contract_key: ContractKey, transaction_info: CallTransactionInfo) {
        self.state.lock().single_transactions.push((contract_key, transaction_info));
    }

    async fn synchronization_single_transaction_is_ready(
        &self,
        contract_key: ContractKey,
        drive: DriveKey,
        modification_id: ModificationId,
        storage_hash: StorageHash,
    ) {
        self.state.lock().synchronizations.push((contract_key, drive, modification_id, storage_hash));
    }

    async fn released_transactions_are_ready(&self, contract_key: ContractKey, released: Vec<TransactionHash>) {
        self.state.lock().released.push((contract_key, released));
    }
}
