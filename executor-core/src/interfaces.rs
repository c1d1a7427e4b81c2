// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! Capability traits for the core's external collaborators (spec §6).
//! Each is an `async_trait` rather than an explicit callback type: the
//! core already runs every suspension point through the single core
//! thread (see `core_thread.rs`), so an `async fn` that completes by
//! posting its result back onto that thread is the natural Rust shape
//! for what the spec calls a "single-shot callback". Cancellation is
//! expressed the idiomatic way: dropping the future drops the request.

use async_trait::async_trait;
use executor_types::{CallRequest, ContractKey, DriveKey, ExecutorKey, ModificationId, StorageHash, StorageState};

use crate::errors::{MessengerError, StorageError, VmError};

/// What the virtual machine reports after running one call (spec §6
/// `CallExecutionResult`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallExecutionResult {
    pub success: bool,
    pub return_code: i32,
    pub execution_gas_consumed: u64,
    pub download_gas_consumed: u64,
    pub proof_of_execution_secret_data: u64,
}

/// Gas caps handed to the VM for one call, already converted from
/// payment units via the configured multipliers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasLimits {
    pub execution_gas: u64,
    pub download_gas: u64,
}

/// Runs one WASM call against the drive (spec §6 "VirtualMachine").
#[async_trait]
pub trait VirtualMachine: Send + Sync {
    async fn execute_call(
        &self,
        request: &CallRequest,
        gas_limits: GasLimits,
        sandbox: &dyn SandboxModification,
    ) -> Result<CallExecutionResult, VmError>;
}

/// Opens and manages a drive transaction (spec §6 "Storage").
#[async_trait]
pub trait Storage: Send + Sync {
    async fn synchronize_storage(
        &self,
        drive: DriveKey,
        modification_id: ModificationId,
        storage_hash: StorageHash,
    ) -> Result<(), StorageError>;

    async fn initiate_modifications(
        &self,
        drive: DriveKey,
        modification_id: ModificationId,
    ) -> Result<Box<dyn StorageModification>, StorageError>;
}

/// A drive transaction opened by `Storage::initiate_modifications`
/// (spec §6 "On StorageModification").
#[async_trait]
pub trait StorageModification: Send + Sync {
    async fn initiate_sandbox_modification(&self) -> Result<Box<dyn SandboxModification>, StorageError>;

    async fn evaluate_storage_hash(&self) -> Result<StorageState, StorageError>;

    async fn apply_storage_modification(&self, success: bool) -> Result<(), StorageError>;
}

/// Digest returned when a sandbox modification is applied (spec §6
/// `apply_sandbox_modification`'s `cb<SandboxModificationDigest>`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SandboxModificationDigest {
    pub modification_id: ModificationId,
}

/// Scoped, discardable filesystem mutation layer over a drive
/// modification (spec §6 "On SandboxModification").
#[async_trait]
pub trait SandboxModification: Send + Sync {
    async fn open_file(&self, path: &str, mode: FileOpenMode) -> Result<u64, StorageError>;
    async fn read_file(&self, handle: u64, len: u64) -> Result<Vec<u8>, StorageError>;
    async fn write_file(&self, handle: u64, data: &[u8]) -> Result<(), StorageError>;
    async fn flush_file(&self, handle: u64) -> Result<(), StorageError>;
    async fn close_file(&self, handle: u64) -> Result<(), StorageError>;
    async fn create_directories(&self, path: &str) -> Result<(), StorageError>;
    async fn directory_iterator_create(&self, path: &str) -> Result<u64, StorageError>;
    async fn directory_iterator_has_next(&self, iterator: u64) -> Result<bool, StorageError>;
    async fn directory_iterator_next(&self, iterator: u64) -> Result<String, StorageError>;
    async fn directory_iterator_destroy(&self, iterator: u64) -> Result<(), StorageError>;
    async fn remove_filesystem_entry(&self, path: &str) -> Result<(), StorageError>;
    async fn move_filesystem_entry(&self, from: &str, to: &str) -> Result<(), StorageError>;
    async fn path_exist(&self, path: &str) -> Result<bool, StorageError>;
    async fn is_file(&self, path: &str) -> Result<bool, StorageError>;
    async fn file_size(&self, path: &str) -> Result<u64, StorageError>;
    async fn apply_sandbox_modification(&self, success: bool) -> Result<SandboxModificationDigest, StorageError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileOpenMode {
    Read,
    Write,
    ReadWrite,
}

/// Tags the core gossips opinions under (spec §6 "Messenger").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageTag {
    SuccessfulEndBatch,
    UnsuccessfulEndBatch,
}

/// Fire-and-forget peer messaging (spec §6 "Messenger").
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(
        &self,
        receiver: ExecutorKey,
        tag: MessageTag,
        content: Vec<u8>,
    ) -> Result<(), MessengerError>;
}

/// Outbound calls the core makes into the blockchain client (spec §6
/// "Consumes from the core").
#[async_trait]
pub trait BlockchainClient: Send + Sync {
    async fn end_batch_transaction_is_ready(
        &self,
        contract_key: ContractKey,
        transaction: executor_types::EndBatchExecutionTransaction,
    );

    async fn end_batch_single_transaction_is_ready(
        &self,
        contract_key: ContractKey,
        transaction_info: executor_types::CallTransactionInfo,
    );

    async fn synchronization_single_transaction_is_ready(
        &self,
        contract_key: ContractKey,
        drive: DriveKey,
        modification_id: ModificationId,
        storage_hash: StorageHash,
    );

    async fn released_transactions_are_ready(&self, contract_key: ContractKey, released: Vec<executor_types::TransactionHash>);
}

/// Sink for the four ready-transaction events the core produces (spec
/// §6 "ExecutorEventHandler"); kept distinct from `BlockchainClient` so
/// a host can route them to different subsystems (e.g. the transport
/// layer vs. local bookkeeping) without the core caring.
pub trait ExecutorEventHandler: Send + Sync {
    fn on_end_batch_transaction_ready(&self, contract_key: ContractKey, transaction: &executor_types::EndBatchExecutionTransaction);
    fn on_end_batch_single_transaction_ready(&self, contract_key: ContractKey, transaction_info: &executor_types::CallTransactionInfo);
    fn on_synchronization_single_transaction_ready(&self, contract_key: ContractKey, drive: DriveKey, storage_hash: StorageHash);
    fn on_released_transactions_ready(&self, contract_key: ContractKey, released: &[executor_types::TransactionHash]);
}
