// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! Wire types for the Proof-of-Execution accumulator (spec §4.3). The
//! accumulator's arithmetic lives in `executor-core::proof_of_execution`;
//! this crate only carries the serializable shapes that travel in opinions,
//! end-batch transactions, and `ExecutorInfo` checkpoints.

use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::scalar::Scalar;
use serde::{Deserialize, Serialize};

use crate::ids::BatchIndex;

/// A point on the Edwards curve, serialized in compressed (32-byte) form.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurvePointBytes(pub [u8; 32]);

impl CurvePointBytes {
    pub fn from_compressed(point: CompressedEdwardsY) -> Self {
        Self(point.to_bytes())
    }

    pub fn to_compressed(self) -> CompressedEdwardsY {
        CompressedEdwardsY(self.0)
    }
}

impl std::fmt::Debug for CurvePointBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CurvePoint({})", hex::encode(self.0))
    }
}

/// A scalar of the Edwards curve's scalar field, serialized canonically.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarBytes(pub [u8; 32]);

impl ScalarBytes {
    pub fn from_scalar(scalar: Scalar) -> Self {
        Self(scalar.to_bytes())
    }

    pub fn to_scalar(self) -> Scalar {
        Scalar::from_bits(self.0)
    }
}

impl std::fmt::Debug for ScalarBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Scalar({})", hex::encode(self.0))
    }
}

/// `{ T, r }`: proves the batch-contribution relation (see spec §4.3's
/// batch-proof equation).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProof {
    pub t: CurvePointBytes,
    pub r: ScalarBytes,
}

/// `{ F, k }`: a Schnorr proof of knowledge of the discrete log of `T`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TProof {
    pub f: CurvePointBytes,
    pub k: ScalarBytes,
}

/// The full proof an executor attaches to an opinion or end-batch
/// transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proofs {
    pub initial_batch: BatchIndex,
    pub batch_proof: BatchProof,
    pub t_proof: TProof,
}

/// Per-peer, per-contract checkpoint: the last proof this executor
/// verified from that peer, used to verify the peer's *next* proof
/// incrementally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorInfo {
    pub next_batch_to_approve: BatchIndex,
    pub initial_batch: BatchIndex,
    pub batch_proof: BatchProof,
}

impl Default for BatchProof {
    fn default() -> Self {
        Self {
            t: CurvePointBytes([0u8; 32]),
            r: ScalarBytes([0u8; 32]),
        }
    }
}
