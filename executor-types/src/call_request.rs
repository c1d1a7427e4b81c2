// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! Call requests, polymorphic over {Manual, Automatic}. We follow the same
//! pattern the teacher uses for its own polymorphic wire type (`Block` /
//! `BlockAPI` in `consensus-core`): a tagged enum dispatched through a
//! shared trait via `enum_dispatch`, rather than a virtual base class.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use crate::ids::{BlockHeight, CallId, CallerKey, MosaicId};

/// A service payment attached to a call: `(mosaic_id, amount)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePayment {
    pub mosaic_id: MosaicId,
    pub amount: u64,
}

#[enum_dispatch]
pub trait CallRequestApi {
    fn call_id(&self) -> CallId;
    fn file(&self) -> &str;
    fn function(&self) -> &str;
    fn execution_payment(&self) -> u64;
    fn download_payment(&self) -> u64;
    fn caller_key(&self) -> CallerKey;
    fn block_height(&self) -> BlockHeight;
    fn arguments(&self) -> &[u8];
    fn service_payments(&self) -> &[ServicePayment];
    fn is_manual(&self) -> bool;
    /// Arrival order stamped by `BatchesManager::add_manual_call`; zero for
    /// automatic calls, which are always ordered last within a batch.
    fn arrival_seq(&self) -> u64;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[enum_dispatch(CallRequestApi)]
pub enum CallRequest {
    Manual(ManualCallRequest),
    Automatic(AutomaticCallRequest),
}

impl CallRequest {
    /// Total ordering used when laying out a batch: manual calls sort by
    /// `(block_height, arrival_seq)`; any automatic call sorts last.
    pub fn batch_order_key(&self) -> (bool, u64, u64) {
        match self {
            CallRequest::Manual(m) => (false, m.block_height, m.arrival_seq),
            CallRequest::Automatic(_) => (true, 0, 0),
        }
    }
}

/// A call placed by a caller via a blockchain transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManualCallRequest {
    pub call_id: CallId,
    pub file: String,
    pub function: String,
    pub execution_payment: u64,
    pub download_payment: u64,
    pub caller_key: CallerKey,
    pub block_height: BlockHeight,
    pub arguments: Vec<u8>,
    pub service_payments: Vec<ServicePayment>,
    pub arrival_seq: u64,
}

impl ManualCallRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        call_id: CallId,
        file: String,
        function: String,
        execution_payment: u64,
        download_payment: u64,
        caller_key: CallerKey,
        block_height: BlockHeight,
        arguments: Vec<u8>,
        service_payments: Vec<ServicePayment>,
    ) -> Self {
        Self {
            call_id,
            file,
            function,
            execution_payment,
            download_payment,
            caller_key,
            block_height,
            arguments,
            service_payments,
            arrival_seq: 0,
        }
    }

    /// Stamped exactly once, by `BatchesManager::add_manual_call`, in
    /// arrival order.
    pub fn with_arrival_seq(mut self, seq: u64) -> Self {
        self.arrival_seq = seq;
        self
    }
}

impl CallRequestApi for ManualCallRequest {
    fn call_id(&self) -> CallId {
        self.call_id
    }
    fn file(&self) -> &str {
        &self.file
    }
    fn function(&self) -> &str {
        &self.function
    }
    fn execution_payment(&self) -> u64 {
        self.execution_payment
    }
    fn download_payment(&self) -> u64 {
        self.download_payment
    }
    fn caller_key(&self) -> CallerKey {
        self.caller_key
    }
    fn block_height(&self) -> BlockHeight {
        self.block_height
    }
    fn arguments(&self) -> &[u8] {
        &self.arguments
    }
    fn service_payments(&self) -> &[ServicePayment] {
        &self.service_payments
    }
    fn is_manual(&self) -> bool {
        true
    }
    fn arrival_seq(&self) -> u64 {
        self.arrival_seq
    }
}

/// A call triggered by the automatic-execution evaluator at a block height,
/// rather than by a caller. Its `call_id` is the deterministic hash of
/// `(batch_index, position)`; `caller_key` is always zero.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AutomaticCallRequest {
    pub call_id: CallId,
    pub file: String,
    pub function: String,
    pub execution_payment: u64,
    pub download_payment: u64,
    pub block_height: BlockHeight,
    pub arguments: Vec<u8>,
    pub service_payments: Vec<ServicePayment>,
}

impl AutomaticCallRequest {
    /// `call_id` is derived deterministically so every honest executor
    /// produces the same identifier for "the automatic call that closed
    /// batch `batch_index`".
    pub fn deterministic_call_id(batch_index: u64, position: u64) -> CallId {
        use sha3::{Digest, Sha3_256};
        let mut hasher = Sha3_256::new();
        hasher.update(b"automatic-call");
        hasher.update(batch_index.to_le_bytes());
        hasher.update(position.to_le_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        CallId(bytes)
    }
}

impl CallRequestApi for AutomaticCallRequest {
    fn call_id(&self) -> CallId {
        self.call_id
    }
    fn file(&self) -> &str {
        &self.file
    }
    fn function(&self) -> &str {
        &self.function
    }
    fn execution_payment(&self) -> u64 {
        self.execution_payment
    }
    fn download_payment(&self) -> u64 {
        self.download_payment
    }
    fn caller_key(&self) -> CallerKey {
        CallerKey::zero()
    }
    fn block_height(&self) -> BlockHeight {
        self.block_height
    }
    fn arguments(&self) -> &[u8] {
        &self.arguments
    }
    fn service_payments(&self) -> &[ServicePayment] {
        &self.service_payments
    }
    fn is_manual(&self) -> bool {
        false
    }
    fn arrival_seq(&self) -> u64 {
        0
    }
}
