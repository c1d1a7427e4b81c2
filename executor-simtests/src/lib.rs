// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! Hand-written, mockall-free fakes for the four external-collaborator
//! traits (`executor_core::interfaces`), used by the scenario tests under
//! `tests/`. Mirrors the teacher's own `MemStore` / `test_network.rs`
//! style: a small struct holding `Arc<Mutex<..>>` state plus a trait impl,
//! no mock-generation macros.

pub mod blockchain;
pub mod messenger;
pub mod storage;
pub mod vm;

pub use blockchain::FakeBlockchainClient;
pub use messenger::FakeNetwork;
pub use storage::{FakeSandboxModification, FakeStorage, FakeStorageModification};
pub use vm::FakeVirtualMachine;
