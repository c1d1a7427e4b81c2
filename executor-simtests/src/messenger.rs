// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! An in-process gossip fake connecting every executor in a test
//! committee. Each `FakeMessenger::send_message` looks the receiver up by
//! key in a shared routing table and forwards the content over an
//! unbounded channel; the opinion itself already carries the sender's
//! `executor_key` (spec §6 "Opinion wire format"), so the channel payload
//! does not need to repeat it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use executor_core::{MessageTag, Messenger, MessengerError};
use executor_types::ExecutorKey;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

type Routes = Arc<Mutex<HashMap<ExecutorKey, UnboundedSender<(MessageTag, Vec<u8>)>>>>;

/// Owns the routing table for one test committee. `register` must be
/// called once per executor before any `send_message` targeting it.
#[derive(Clone, Default)]
pub struct FakeNetwork {
    routes: Routes,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, key: ExecutorKey) -> (FakeMessenger, UnboundedReceiver<(MessageTag, Vec<u8>)>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.routes.lock().insert(key, sender);
        (FakeMessenger { routes: self.routes.clone() }, receiver)
    }
}

pub struct FakeMessenger {
    routes: Routes,
}

#[async_trait]
impl Messenger for FakeMessenger {
    async fn send_message(&self, receiver: ExecutorKey, tag: MessageTag, content: Vec<u8>) -> Result<(), MessengerError> {
        let sender = self.routes.lock().get(&receiver).cloned();
        match sender {
            Some(sender) => sender.send((tag, content)).map_err(|_| MessengerError::ConnectionAborted),
            None => Err(MessengerError::ConnectionAborted),
        }
    }
}
