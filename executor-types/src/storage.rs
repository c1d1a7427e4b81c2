// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::ids::StorageHash;

/// Identifies a drive snapshot and the accounting sizes that go with it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageState {
    pub storage_hash: StorageHash,
    pub used_drive_size: u64,
    pub meta_files_size: u64,
    pub file_structure_size: u64,
}

impl StorageState {
    pub fn new(
        storage_hash: StorageHash,
        used_drive_size: u64,
        meta_files_size: u64,
        file_structure_size: u64,
    ) -> Self {
        Self {
            storage_hash,
            used_drive_size,
            meta_files_size,
            file_structure_size,
        }
    }
}
