use std::collections::HashMap;

use log::debug;
use rainboard_shared::ServerMessage;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Per-connection outbound queue depth. A connection whose queue is full is
/// skipped rather than waited on.
pub const OUTBOUND_QUEUE: usize = 1024;

pub type PeerSender = mpsc::Sender<ServerMessage>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Skipped,
    Closed,
}

/// Live set of connections. A connection is open while its writer task still
/// holds the receiving half of its queue.
#[derive(Default)]
pub struct ConnectionRegistry {
    peers: HashMap<Uuid, PeerSender>,
}

impl ConnectionRegistry {
    pub fn register(&mut self, id: Uuid, tx: PeerSender) {
        self.peers.insert(id, tx);
    }

    pub fn unregister(&mut self, id: Uuid) -> bool {
        self.peers.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.peers.contains_key(&id)
    }

    pub fn for_each_open<F: FnMut(Uuid, &PeerSender)>(&self, mut f: F) {
        for (id, tx) in &self.peers {
            if !tx.is_closed() {
                f(*id, tx);
            }
        }
    }

    pub fn send_to(&self, id: Uuid, message: ServerMessage) -> Delivery {
        match self.peers.get(&id) {
            Some(tx) => deliver(id, tx, message),
            None => Delivery::Closed,
        }
    }

    pub fn broadcast_all(&mut self, message: &ServerMessage) {
        self.fan_out(None, message);
    }

    pub fn broadcast_except(&mut self, sender: Uuid, message: &ServerMessage) {
        self.fan_out(Some(sender), message);
    }

    fn fan_out(&mut self, skip: Option<Uuid>, message: &ServerMessage) {
        self.for_each_open(|id, tx| {
            if Some(id) != skip {
                deliver(id, tx, message.clone());
            }
        });
        self.peers.retain(|_, tx| !tx.is_closed());
    }
}

fn deliver(id: Uuid, tx: &PeerSender, message: ServerMessage) -> Delivery {
    match tx.try_send(message) {
        Ok(()) => Delivery::Sent,
        Err(TrySendError::Full(_)) => {
            debug!("WS queue full, skipping conn={id}");
            Delivery::Skipped
        }
        Err(TrySendError::Closed(_)) => Delivery::Closed,
    }
}
