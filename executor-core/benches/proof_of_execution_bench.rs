// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use executor_core::ProofOfExecution;
use executor_types::ExecutorKey;

fn append_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("ProofOfExecution::add_to_proof");
    group.throughput(Throughput::Elements(1));
    group.bench_function("single_call_append", |b| {
        b.iter_batched(
            || ProofOfExecution::new(ExecutorKey::zero(), 0),
            |mut poex| {
                poex.add_to_proof(0, 7);
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn build_proof_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("ProofOfExecution::build_actual_proof");
    group.throughput(Throughput::Elements(1));
    group.bench_function("after_one_hundred_calls", |b| {
        b.iter_batched(
            || {
                let mut poex = ProofOfExecution::new(ExecutorKey::zero(), 0);
                for secret in 0..100u64 {
                    poex.add_to_proof(0, secret);
                }
                poex
            },
            |poex| poex.build_actual_proof(),
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn verify_proof_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("ProofOfExecution::verify_proof");
    group.throughput(Throughput::Elements(1));
    group.bench_function("one_batch_many_calls", |b| {
        let pk = ExecutorKey::zero();
        let mut poex = ProofOfExecution::new(pk, 0);
        let prev_proof = poex.build_previous_proof();
        let mut last_y = executor_types::CurvePointBytes([0u8; 32]);
        for secret in 0..50u64 {
            last_y = poex.add_to_proof(0, secret);
        }
        let proof = poex.build_actual_proof();
        b.iter(|| poex.verify_proof(pk, prev_proof.batch_proof, 0, &proof, 0, last_y));
    });
    group.finish();
}

criterion_group!(benches, append_throughput, build_proof_throughput, verify_proof_throughput);
criterion_main!(benches);
