// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! An in-memory drive fake. There is no real filesystem: `FakeStorage`
//! just tracks a current `StorageHash` and records whether the last
//! sandbox modification was applied as a success or discarded, which is
//! all the scenario tests in §8 need to observe.

use std::sync::Arc;

use async_trait::async_trait;
use executor_core::{SandboxModificationDigest, Storage, StorageError, StorageModification};
use executor_types::{DriveKey, ModificationId, StorageHash, StorageState};
use parking_lot::Mutex;

/// Shared drive state a test can inspect after driving a task to
/// completion.
#[derive(Default)]
struct DriveState {
    storage_hash: StorageHash,
    applied: Vec<bool>,
}

pub struct FakeStorage {
    state: Arc<Mutex<DriveState>>,
}

impl FakeStorage {
    pub fn new(initial_hash: StorageHash) -> Self {
        Self {
            state: Arc::new(Mutex::new(DriveState { storage_hash: initial_hash, applied: Vec::new() })),
        }
    }

    pub fn current_hash(&self) -> StorageHash {
        self.state.lock().storage_hash
    }

    /// Every `apply_storage_modification(success)` call made against any
    /// `StorageModification` this fake has handed out, in call order.
    pub fn applied_log(&self) -> Vec<bool> {
        self.state.lock().applied.clone()
    }

    /// The hash the *next* `evaluate_storage_hash` will report, set by a
    /// test to simulate "this batch's calls changed the drive to X".
    pub fn set_next_hash(&self, hash: StorageHash) {
        self.state.lock().storage_hash = hash;
    }
}

impl Default for FakeStorage {
    fn default() -> Self {
        Self::new(StorageHash::zero())
    }
}

#[async_trait]
impl Storage for FakeStorage {
    async fn synchronize_storage(
        &self,
        _drive: DriveKey,
        _modification_id: ModificationId,
        storage_hash: StorageHash,
    ) -> Result<(), StorageError> {
        self.state.lock().storage_hash = storage_hash;
        Ok(())
    }

    async fn initiate_modifications(
        &self,
        _drive: DriveKey,
        _modification_id: ModificationId,
    ) -> Result<Box<dyn StorageModification>, StorageError> {
        let hash = self.state.lock().storage_hash;
        Ok(Box::new(FakeStorageModification { hash, state: self.state.clone() }))
    }
}

pub struct FakeStorageModification {
    hash: StorageHash,
    state: Arc<Mutex<DriveState>>,
}

#[async_trait]
impl StorageModification for FakeStorageModification {
    async fn initiate_sandbox_modification(&self) -> Result<Box<dyn executor_core::SandboxModification>, StorageError> {
        Ok(Box::new(FakeSandboxModification::default()))
    }

    async fn evaluate_storage_hash(&self) -> Result<StorageState, StorageError> {
        Ok(StorageState::new(self.hash, 0, 0, 0))
    }

    async fn apply_storage_modification(&self, success: bool) -> Result<(), StorageError> {
        self.state.lock().applied.push(success);
        Ok(())
    }
}

/// A scoped sandbox fake: every filesystem operation succeeds and is a
/// no-op, since no WASM semantics are in scope here (spec.md §1
/// Non-goals).
#[derive(Default)]
pub struct FakeSandboxModification;

#[async_trait]
impl executor_core::SandboxModification for FakeSandboxModification {
    async fn open_file(&self, _path: &str, _mode: executor_core::FileOpenMode) -> Result<u64, StorageError> {
        Ok(1)
    }
    async fn read_file(&self, _handle: u64, _len: u64) -> Result<Vec<u8>, StorageError> {
        Ok(Vec::new())
    }
    async fn write_file(&self, _handle: u64, _data: &[u8]) -> Result<(), StorageError> {
        Ok(())
    }
    async fn flush_file(&self, _handle: u64) -> Result<(), StorageError> {
        Ok(())
    }
    async fn close_file(&self, _handle: u64) -> Result<(), StorageError> {
        Ok(())
    }
    async fn create_directories(&self, _path: &str) -> Result<(), StorageError> {
        Ok(())
    }
    async fn directory_iterator_create(&self, _path: &str) -> Result<u64, StorageError> {
        Ok(1)
    }
    async fn directory_iterator_has_next(&self, _iterator: u64) -> Result<bool, StorageError> {
        Ok(false)
    }
    async fn directory_iterator_next(&self, _iterator: u64) -> Result<String, StorageError> {
        Ok(String::new())
    }
    async fn directory_iterator_destroy(&self, _iterator: u64) -> Result<(), StorageError> {
        Ok(())
    }
    async fn remove_filesystem_entry(&self, _path: &str) -> Result<(), StorageError> {
        Ok(())
    }
    async fn move_filesystem_entry(&self, _from: &str, _to: &str) -> Result<(), StorageError> {
        Ok(())
    }
    async fn path_exist(&self, _path: &str) -> Result<bool, StorageError> {
        Ok(false)
    }
    async fn is_file(&self, _path: &str) -> Result<bool, StorageError> {
        Ok(false)
    }
    async fn file_size(&self, _path: &str) -> Result<u64, StorageError> {
        Ok(0)
    }
    async fn apply_sandbox_modification(&self, _success: bool) -> Result<SandboxModificationDigest, StorageError> {
        Ok(SandboxModificationDigest::default())
    }
}
