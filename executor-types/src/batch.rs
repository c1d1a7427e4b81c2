// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::call_request::{CallRequest, CallRequestApi};
use crate::ids::BatchIndex;

/// An indexed, ordered group of calls executed as a single drive
/// transaction. See spec §3 `Batch` and §4.1 invariant: manual calls
/// precede any automatic call, manual calls are ordered by
/// `(block_height, arrival)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Batch {
    pub batch_index: BatchIndex,
    pub automatic_checked_up_to: u64,
    pub call_requests: Vec<CallRequest>,
}

impl Batch {
    pub fn new(batch_index: BatchIndex, automatic_checked_up_to: u64, call_requests: Vec<CallRequest>) -> Self {
        Self {
            batch_index,
            automatic_checked_up_to,
            call_requests,
        }
    }

    /// True iff the batch obeys its §4 ordering invariant: manual calls in
    /// `(block_height, arrival_seq)` order, at most one automatic call,
    /// always last.
    pub fn is_well_ordered(&self) -> bool {
        let mut seen_automatic = false;
        let mut last_key: Option<(bool, u64, u64)> = None;
        for call in &self.call_requests {
            if seen_automatic {
                // nothing may follow an automatic call
                return false;
            }
            if !call.is_manual() {
                seen_automatic = true;
                continue;
            }
            let key = call.batch_order_key();
            if let Some(last) = last_key {
                if key < last {
                    return false;
                }
            }
            last_key = Some(key);
        }
        true
    }

    pub fn automatic_call(&self) -> Option<&CallRequest> {
        self.call_requests.last().filter(|c| !c.is_manual())
    }
}
