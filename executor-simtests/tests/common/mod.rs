// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! Shared three-executor test harness for the §8 end-to-end scenarios.

use std::sync::Arc;

use executor_config::{Committee, ContractConfig, ExecutorConfig, ExecutorKeyPair};
use executor_core::{
    BatchExecutionTask, BlockchainClient, Context, ExecutorMetrics, Messenger, ProofOfExecution, Storage,
    VirtualMachine,
};
use executor_simtests::{FakeBlockchainClient, FakeNetwork, FakeStorage, FakeVirtualMachine};
use executor_types::{Batch, ContractKey, DriveKey, EndBatchExecutionOpinion, ExecutorKey, ModificationId};
use parking_lot::Mutex as PlMutex;
use prometheus::Registry;
use tokio::sync::Mutex as TokioMutex;
use tokio::sync::mpsc::UnboundedReceiver;

pub struct ExecutorHandle {
    pub key: ExecutorKey,
    pub task: Arc<TokioMutex<BatchExecutionTask>>,
    pub vm: Arc<FakeVirtualMachine>,
    pub storage: Arc<FakeStorage>,
    pub blockchain: Arc<FakeBlockchainClient>,
    pub poex: Arc<PlMutex<ProofOfExecution>>,
}

pub struct Harness {
    pub executors: Vec<ExecutorHandle>,
}

/// Spins up `n` executors sharing one committee and one batch, wires them
/// together over a `FakeNetwork`, and spawns each executor's gossip
/// receive loop. Returns once every executor has called `run()`.
pub async fn build_harness(n: usize, batch: Batch) -> Harness {
    build_harness_with_vm_setup(n, batch, |_| {}).await
}

/// Like [`build_harness`], but `vm_setup` runs against each executor's
/// `FakeVirtualMachine` before its task's `run()` is called, so a test can
/// queue outcomes (e.g. `vm_unavailable`, `success: false`) that the
/// executor observes on its first pass through `execute_calls`.
pub async fn build_harness_with_vm_setup(n: usize, batch: Batch, vm_setup: impl Fn(&FakeVirtualMachine)) -> Harness {
    let contract_key = ContractKey::zero();
    let keypairs: Vec<ExecutorKeyPair> = (0..n).map(|_| ExecutorKeyPair::generate()).collect();
    let committee = Committee::new(keypairs.iter().map(|k| k.public_key()));
    let network = FakeNetwork::new();

    let mut executors = Vec::with_capacity(n);
    let mut receivers = Vec::with_capacity(n);

    for keypair in keypairs {
        let own_key = keypair.public_key();
        let (messenger, receiver) = network.register(own_key);
        let metrics = ExecutorMetrics::new(&Registry::new());
        let context = Arc::new(Context::new(
            keypair,
            contract_key,
            committee.clone(),
            ExecutorConfig {
                successful_execution_delay_ms: 10,
                unsuccessful_execution_delay_ms: 10,
                share_opinion_timeout_ms: 50_000,
                ..ExecutorConfig::default()
            },
            ContractConfig::default(),
            Arc::new(metrics),
        ));
        let vm = Arc::new(FakeVirtualMachine::new());
        vm_setup(&vm);
        let storage = Arc::new(FakeStorage::default());
        let blockchain = Arc::new(FakeBlockchainClient::new());
        let poex = Arc::new(PlMutex::new(ProofOfExecution::new(own_key, batch.batch_index)));

        let task = BatchExecutionTask::new(
            context,
            batch.clone(),
            vm.clone() as Arc<dyn VirtualMachine>,
            storage.clone() as Arc<dyn Storage>,
            Arc::new(messenger) as Arc<dyn Messenger>,
            blockchain.clone() as Arc<dyn BlockchainClient>,
            poex.clone(),
            Default::default(),
        );
        let task = Arc::new(TokioMutex::new(task));

        executors.push(ExecutorHandle { key: own_key, task, vm, storage, blockchain, poex });
        receivers.push(receiver);
    }

    for (handle, receiver) in executors.iter().zip(receivers.into_iter()) {
        spawn_gossip_loop(handle.task.clone(), receiver);
    }

    for handle in &executors {
        handle.task.lock().await.run(DriveKey::zero(), ModificationId::zero()).await.expect("run should succeed against fakes");
    }

    Harness { executors }
}

fn spawn_gossip_loop(task: Arc<TokioMutex<BatchExecutionTask>>, mut receiver: UnboundedReceiver<(executor_core::MessageTag, Vec<u8>)>) {
    tokio::spawn(async move {
        while let Some((_tag, content)) = receiver.recv().await {
            let Ok(opinion) = bcs::from_bytes::<EndBatchExecutionOpinion>(&content) else { continue };
            task.lock().await.receive_opinion(opinion).await;
        }
    });
}
