// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! The cohort of executors assigned to a contract, and the `⌈2N/3⌉`
//! threshold arithmetic `BatchExecutionTask` uses to decide when enough
//! matching opinions have arrived (spec §4.2 THRESHOLD_MET). Modeled after
//! `consensus-config::Committee`'s role as the single source of truth for
//! quorum math, simplified to unweighted membership (the chain assigns
//! each executor equal voting weight, unlike stake-weighted consensus).

use std::collections::BTreeSet;

use executor_types::ExecutorKey;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Committee {
    executors: BTreeSet<ExecutorKey>,
}

impl Committee {
    pub fn new(executors: impl IntoIterator<Item = ExecutorKey>) -> Self {
        Self {
            executors: executors.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }

    pub fn contains(&self, executor: &ExecutorKey) -> bool {
        self.executors.contains(executor)
    }

    pub fn members(&self) -> impl Iterator<Item = &ExecutorKey> {
        self.executors.iter()
    }

    /// `⌈2N/3⌉` of the cohort size, including self, per spec §4.2.
    pub fn threshold(&self) -> usize {
        ceil_two_thirds(self.executors.len())
    }
}

fn ceil_two_thirds(n: usize) -> usize {
    (2 * n + 2) / 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_matches_ceil_2n_over_3() {
        assert_eq!(ceil_two_thirds(1), 1);
        assert_eq!(ceil_two_thirds(3), 2);
        assert_eq!(ceil_two_thirds(4), 3);
        assert_eq!(ceil_two_thirds(6), 4);
        assert_eq!(ceil_two_thirds(7), 5);
    }

    #[test]
    fn committee_threshold_accounts_for_self() {
        let committee = Committee::new((0..7u8).map(|i| ExecutorKey([i; 32])));
        assert_eq!(committee.len(), 7);
        assert_eq!(committee.threshold(), 5);
    }
}
