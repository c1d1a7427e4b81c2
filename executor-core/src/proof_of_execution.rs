// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! The Schnorr-style accumulator (spec §4.3). Owned one-per-executor-
//! identity-per-contract, for the lifetime of the contract; no
//! internal locking needed since it is only ever touched from the core
//! thread (spec §5).

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use executor_types::{BatchIndex, CurvePointBytes, ExecutorInfo, ExecutorKey, Proofs, ScalarBytes};
use rand_core::RngCore;
use sha3::{Digest, Sha3_512};
use std::collections::BTreeMap;

use crate::constants::{POEX_CHALLENGE_DOMAIN, POEX_SECRET_DOMAIN, POEX_TPROOF_DOMAIN};
use crate::errors::PoexError;

fn hash_to_scalar(domain: &[u8], parts: &[&[u8]]) -> Scalar {
    let mut hasher = Sha3_512::new();
    hasher.update(domain);
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut wide = [0u8; 64];
    wide.copy_from_slice(&digest);
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// Executor-private accumulator state plus the local `batch_index -> Y`
/// map needed to incrementally verify peers' (and replay our own)
/// batch proofs (SPEC_FULL.md §2.1, grounded on
/// `libs/executor/test/testProofOfExecution.cpp`).
pub struct ProofOfExecution {
    pk: ExecutorKey,
    x: Scalar,
    x_prev: Scalar,
    initial_batch: BatchIndex,
    /// Per-batch verification info (`Y_i`), one entry per call appended
    /// that batch, in call order — this accumulator has either produced
    /// them itself (`add_to_proof`) or learned them from a peer's
    /// opinion (`record_verification_info`), keyed by `batch_index`.
    verification_info: BTreeMap<BatchIndex, Vec<CurvePointBytes>>,
    /// Calls appended to the *current* in-flight batch, in order, so
    /// `pop_from_proof` can be issued once per call on failure.
    pending_appends: Vec<Scalar>,
}

impl ProofOfExecution {
    pub fn new(pk: ExecutorKey, initial_batch: BatchIndex) -> Self {
        Self {
            pk,
            x: Scalar::zero(),
            x_prev: Scalar::zero(),
            initial_batch,
            verification_info: BTreeMap::new(),
            pending_appends: Vec::new(),
        }
    }

    pub fn initial_batch(&self) -> BatchIndex {
        self.initial_batch
    }

    /// `add_to_proof(secret) -> Y` (spec §4.3).
    pub fn add_to_proof(&mut self, batch_index: BatchIndex, secret: u64) -> CurvePointBytes {
        let d = hash_to_scalar(POEX_SECRET_DOMAIN, &[&secret.to_le_bytes()]);
        let y_point = d * ED25519_BASEPOINT_POINT;
        let y_bytes = CurvePointBytes::from_compressed(y_point.compress());
        let c = hash_to_scalar(
            POEX_CHALLENGE_DOMAIN,
            &[ED25519_BASEPOINT_POINT.compress().as_bytes(), &y_bytes.0, self.pk.as_bytes()],
        );
        self.x_prev = self.x;
        self.x += c * d;
        self.pending_appends.push(d);
        self.record_verification_info(batch_index, y_bytes);
        y_bytes
    }

    /// Learn a `Y_i` produced for `batch_index`, whether from our own
    /// `add_to_proof` or from a peer's `poex_verification_info` once
    /// incorporated into our own ledger (SPEC_FULL.md §2.1). Call once
    /// per call appended that batch, in call order; re-recording the
    /// same batch from scratch (e.g. on re-delivery) should be preceded
    /// by `forget_batch`.
    pub fn record_verification_info(&mut self, batch_index: BatchIndex, y: CurvePointBytes) {
        self.verification_info.entry(batch_index).or_default().push(y);
    }

    /// Drop any previously recorded `Y`s for `batch_index`, so a
    /// re-delivered opinion can be recorded from scratch instead of
    /// appending duplicates.
    pub fn forget_batch(&mut self, batch_index: BatchIndex) {
        self.verification_info.remove(&batch_index);
    }

    /// `pop_from_proof()` (spec §4.3): rewinds the most recent append.
    /// Only ever called once per call appended this batch, in reverse
    /// order, from `on_end_batch_execution_failed`
    /// (SPEC_FULL.md §2.2 — not from the opinion-build path).
    pub fn pop_from_proof(&mut self) -> Result<(), PoexError> {
        if self.pending_appends.pop().is_none() {
            return Err(PoexError::NothingToPop);
        }
        self.x = self.x_prev;
        Ok(())
    }

    /// Call once a batch's outcome is finalized (success or failure) so
    /// the next batch's appends start with a clean `pending_appends`.
    pub fn clear_pending(&mut self) {
        self.pending_appends.clear();
    }

    fn build_proof_against(&self, x: Scalar) -> Proofs {
        let mut rng = rand_core::OsRng;
        let v = Scalar::random(&mut rng);
        let t_point = v * ED25519_BASEPOINT_POINT;
        let r = v - x;

        let w = Scalar::random(&mut rng);
        let f_point = w * ED25519_BASEPOINT_POINT;
        let d = hash_to_scalar(
            POEX_TPROOF_DOMAIN,
            &[f_point.compress().as_bytes(), t_point.compress().as_bytes(), self.pk.as_bytes()],
        );
        let k = w - d * v;

        Proofs {
            initial_batch: self.initial_batch,
            batch_proof: executor_types::BatchProof {
                t: CurvePointBytes::from_compressed(t_point.compress()),
                r: ScalarBytes::from_scalar(r),
            },
            t_proof: executor_types::TProof {
                f: CurvePointBytes::from_compressed(f_point.compress()),
                k: ScalarBytes::from_scalar(k),
            },
        }
    }

    /// `build_actual_proof() -> Proofs` (spec §4.3).
    pub fn build_actual_proof(&self) -> Proofs {
        self.build_proof_against(self.x)
    }

    /// `build_previous_proof()` (spec §4.3): against `x_prev`, read-only.
    pub fn build_previous_proof(&self) -> Proofs {
        self.build_proof_against(self.x_prev)
    }

    /// `reset(new_initial_batch)` (spec §4.3): used after drive
    /// synchronization; drops the verification-info ledger for batches
    /// below the new base, since they are no longer verifiable against
    /// the fresh checkpoint.
    pub fn reset(&mut self, new_initial_batch: BatchIndex) {
        self.x = Scalar::zero();
        self.x_prev = Scalar::zero();
        self.initial_batch = new_initial_batch;
        self.pending_appends.clear();
        self.verification_info.retain(|&idx, _| idx >= new_initial_batch);
    }

    /// `verify_proof(peer_pk, peer_prev_info, submitted, last_batch_index,
    /// latest_Y) -> bool` (spec §4.3). Sums every recorded `Y_i` for
    /// batches in `[peer_prev_info.initial_batch, last_batch_index]`
    /// (inclusive, since a batch may contribute more than one call's
    /// worth of `Y`, SPEC_FULL.md §2.1). The caller is expected to have
    /// already recorded every `Y` for `last_batch_index` via
    /// `record_verification_info`; `latest_y` is used only as a
    /// fallback when that batch has no recorded entries yet, covering
    /// the common single-call-batch case without a redundant call.
    pub fn verify_proof(
        &self,
        peer_pk: ExecutorKey,
        peer_prev_batch_proof: executor_types::BatchProof,
        peer_prev_initial_batch: BatchIndex,
        submitted: &Proofs,
        last_batch_index: BatchIndex,
        latest_y: CurvePointBytes,
    ) -> bool {
        let f_point = submitted.t_proof.f.to_compressed();
        let t_point = submitted.batch_proof.t.to_compressed();
        let k = submitted.t_proof.k.to_scalar();
        let d = hash_to_scalar(POEX_TPROOF_DOMAIN, &[f_point.as_bytes(), t_point.as_bytes(), peer_pk.as_bytes()]);

        let Some(f_decompressed) = f_point.decompress() else {
            return false;
        };
        let Some(t_decompressed) = t_point.decompress() else {
            return false;
        };
        let lhs = f_decompressed;
        let rhs = k * ED25519_BASEPOINT_POINT + d * t_decompressed;
        if lhs != rhs {
            return false;
        }

        let Some(t_new) = submitted.batch_proof.t.to_compressed().decompress() else {
            return false;
        };
        let Some(t_prev) = peer_prev_batch_proof.t.to_compressed().decompress() else {
            return false;
        };
        let r_new = submitted.batch_proof.r.to_scalar();
        let r_prev = peer_prev_batch_proof.r.to_scalar();

        let empty = Vec::new();
        let mut y_sum = EdwardsPoint::identity();
        for idx in peer_prev_initial_batch..=last_batch_index {
            let mut ys = self.verification_info.get(&idx).unwrap_or(&empty).as_slice();
            let fallback;
            if idx == last_batch_index && ys.is_empty() {
                fallback = [latest_y];
                ys = &fallback;
            }
            for y in ys {
                let Some(y_point) = y.to_compressed().decompress() else {
                    return false;
                };
                let c = hash_to_scalar(
                    POEX_CHALLENGE_DOMAIN,
                    &[ED25519_BASEPOINT_POINT.compress().as_bytes(), &y.0, peer_pk.as_bytes()],
                );
                y_sum += c * y_point;
            }
        }

        let lhs = t_new - t_prev;
        let rhs = (r_new - r_prev) * ED25519_BASEPOINT_POINT + y_sum;
        lhs == rhs
    }
}

/// A peer checkpoint standing for `x = 0`, usable the first time a peer
/// is observed with no prior checkpoint on record. Any two
/// accumulators that agree no batch has been appended yet produce a
/// `{T, r}` pair satisfying `T == r·β` no matter whose random `v` built
/// it (`verify_proof`'s batch equation cancels `v` out entirely at
/// `x_prev = 0`), so this can be built locally, with no input from the
/// peer it stands in for. Contrast with `ExecutorInfo::default()`,
/// whose all-zero `batch_proof` is not a point on the curve at
/// `x = 0` and fails every verification against it.
pub fn genesis_checkpoint(initial_batch: BatchIndex) -> ExecutorInfo {
    let proof = ProofOfExecution::new(ExecutorKey::zero(), initial_batch).build_previous_proof();
    ExecutorInfo {
        next_batch_to_approve: initial_batch,
        initial_batch: proof.initial_batch,
        batch_proof: proof.batch_proof,
    }
}

/// Deterministic per-call secret-to-`u64` conversion used when a fresh
/// random secret is needed outside of VM execution (e.g. in tests).
/// Not used on the hot path: the VM itself returns
/// `proof_of_execution_secret_data`.
#[cfg(test)]
pub fn random_secret() -> u64 {
    let mut rng = rand_core::OsRng;
    rng.next_u64()
}
