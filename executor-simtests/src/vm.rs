// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! A virtual machine fake whose outcome for the next call is taken off a
//! shared queue, falling back to an always-succeeds default. Lets a test
//! script exact sequences like "fail four times with vm_unavailable, then
//! recover" (spec §8 scenario 5).

use std::collections::VecDeque;

use async_trait::async_trait;
use executor_core::{CallExecutionResult, GasLimits, SandboxModification, VirtualMachine, VmError};
use executor_types::CallRequest;
use parking_lot::Mutex;

#[derive(Default)]
struct State {
    queued_outcomes: VecDeque<Result<CallExecutionResult, VmError>>,
    calls_seen: Vec<executor_types::CallId>,
}

pub struct FakeVirtualMachine {
    state: Mutex<State>,
}

impl FakeVirtualMachine {
    pub fn new() -> Self {
        Self { state: Mutex::new(State::default()) }
    }

    /// Pushes an outcome to be returned by the next `execute_call`, in
    /// FIFO order. Once the queue is drained, calls default to success
    /// with zero gas consumption and `proof_of_execution_secret_data`
    /// derived from the call count, so tests that don't care about VM
    /// behavior still get a distinct secret per call.
    pub fn push_outcome(&self, outcome: Result<CallExecutionResult, VmError>) {
        self.state.lock().queued_outcomes.push_back(outcome);
    }

    pub fn calls_seen(&self) -> Vec<executor_types::CallId> {
        self.state.lock().calls_seen.clone()
    }
}

impl Default for FakeVirtualMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VirtualMachine for FakeVirtualMachine {
    async fn execute_call(
        &self,
        request: &CallRequest,
        gas_limits: GasLimits,
        _sandbox: &dyn SandboxModification,
    ) -> Result<CallExecutionResult, VmError> {
        use executor_types::CallRequestApi;
        let mut state = self.state.lock();
        let seen_count = state.calls_seen.len() as u64;
        state.calls_seen.push(request.call_id());
        match state.queued_outcomes.pop_front() {
            Some(outcome) => outcome,
            None => Ok(CallExecutionResult {
                success: true,
                return_code: 0,
                execution_gas_consumed: gas_limits.execution_gas.min(1),
                download_gas_consumed: gas_limits.download_gas.min(1),
                proof_of_execution_secret_data: seen_count + 1,
            }),
        }
    }
}
