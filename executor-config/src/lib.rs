// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! Configuration and cryptographic identity for the contract-executor
//! pipeline. Mirrors the role of `consensus-config` in the teacher
//! workspace.

pub mod committee;
pub mod crypto;
pub mod parameters;

pub use committee::Committee;
pub use crypto::{verify, CryptoError, ExecutorKeyPair};
pub use parameters::{ContractConfig, ExecutorConfig};
