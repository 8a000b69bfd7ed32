//! Signed, hash-chained event log

use crate::{crypto, Hash32};
use serde::{Deserialize, Serialize};
use ed25519_dalek::{Signature, VerifyingKey, Verifier as _};

/// Notice requested alongside a transition; sealed into a [`NoticeEvent`]
/// before the commitment moves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub topic: String,
    pub principal: Hash32,
    pub amount: Option<u64>,
}

impl Notice {
    pub fn new(topic: impl Into<String>, principal: Hash32, amount: Option<u64>) -> Self {
        Self {
            topic: topic.into(),
            principal,
            amount,
        }
    }
}

/// A committed leaf overwrite
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub operation: String,
    pub index: u64,
    pub old_leaf: Hash32,
    pub new_leaf: Hash32,
    pub prev_event_hash: Hash32,
    pub state_root: Hash32,
    pub timestamp: u64,
}

/// Notification for external observers (ownership changes, payments, ...)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NoticeEvent {
    pub topic: String,
    pub principal: Hash32,
    pub amount: Option<u64>,
    pub prev_event_hash: Hash32,
    pub state_root: Hash32,
    pub timestamp: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Event {
    Transition(TransitionEvent),
    Notice(NoticeEvent),
}

impl Event {
    pub fn prev_event_hash(&self) -> Hash32 {
        match self {
            Event::Transition(e) => e.prev_event_hash,
            Event::Notice(e) => e.prev_event_hash,
        }
    }

    pub fn state_root(&self) -> Hash32 {
        match self {
            Event::Transition(e) => e.state_root,
            Event::Notice(e) => e.state_root,
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            Event::Transition(e) => e.timestamp,
            Event::Notice(e) => e.timestamp,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogEntry {
    pub event_hash: Hash32,
    pub event: Event,
    pub signature: Vec<u8>, // signature over event_bytes
}

pub struct EventLog {
    pub entries: Vec<LogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn latest_hash(&self) -> Hash32 {
        self.entries.last().map(|e| e.event_hash).unwrap_or([0u8; 32])
    }

    pub fn verify_chain_and_sigs(&self, vk: &VerifyingKey) -> bool {
        let mut prev = [0u8; 32];

        for e in &self.entries {
            // chain link
            if e.event.prev_event_hash() != prev {
                return false;
            }

            // hash correctness
            let event_bytes = match bincode::serialize(&e.event) {
                Ok(b) => b,
                Err(_) => return false,
            };
            if crypto::hash_event(&event_bytes) != e.event_hash {
                return false;
            }

            // signature correctness
            let sig = match Signature::from_slice(&e.signature) {
                Ok(s) => s,
                Err(_) => return false,
            };
            if vk.verify(&event_bytes, &sig).is_err() {
                return false;
            }

            prev = e.event_hash;
        }

        true
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
