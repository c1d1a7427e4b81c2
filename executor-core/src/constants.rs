// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! Fixed, non-configurable constants. Tunable knobs live in
//! `executor_config::ExecutorConfig`/`ContractConfig` instead.

/// Channel depth for the single core-thread command queue (teacher:
/// `CORE_THREAD_COMMANDS_CHANNEL_SIZE` in `core_thread.rs`).
pub const CORE_THREAD_COMMANDS_CHANNEL_SIZE: usize = 128;

/// Domain separation tag hashed into the PoEx scalar derivation `d = H(...)`.
pub const POEX_SECRET_DOMAIN: &[u8] = b"contract-executor/poex/secret-v1";

/// Domain separation tag hashed into the PoEx challenge `c = H(beta || Y || pk)`.
pub const POEX_CHALLENGE_DOMAIN: &[u8] = b"contract-executor/poex/challenge-v1";

/// Domain separation tag for the Schnorr `T`-proof challenge `d = H(F || T || pk)`.
pub const POEX_TPROOF_DOMAIN: &[u8] = b"contract-executor/poex/tproof-v1";
