// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! The contract-executor pipeline: turns closed batches of calls into
//! signed, committee-agreed end-batch execution transactions. Mirrors
//! the role of `consensus-core` in the teacher workspace: the types
//! crate defines what goes over the wire, the config crate defines who
//! is allowed to sign it, and this crate drives the state machine that
//! produces it.

pub mod batch_execution_task;
pub mod batches_manager;
pub mod constants;
pub mod context;
pub mod core_thread;
pub mod errors;
pub mod interfaces;
pub mod metrics;
pub mod proof_of_execution;

pub use batch_execution_task::{BatchExecutionTask, TaskState};
pub use batches_manager::BatchesManager;
pub use context::Context;
pub use core_thread::{CoreThreadError, ThreadManager, ThreadManagerHandle};
pub use errors::{
    BatchesManagerError, ExecutorError, ExecutorResult, FatalError, MessengerError, PoexError, StorageError,
    TaskError, VmError,
};
pub use interfaces::{
    BlockchainClient, CallExecutionResult, ExecutorEventHandler, FileOpenMode, GasLimits, MessageTag, Messenger,
    SandboxModification, SandboxModificationDigest, Storage, StorageModification, VirtualMachine,
};
pub use metrics::ExecutorMetrics;
pub use proof_of_execution::ProofOfExecution;
