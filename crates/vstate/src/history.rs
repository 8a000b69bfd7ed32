//! Bounded root history

use std::collections::VecDeque;

use crate::Hash32;

#[derive(Clone, Debug)]
pub struct RootPoint {
    pub event_hash: Hash32,
    pub state_root: Hash32,
    pub timestamp: u64,
}

/// Bounded history of committed roots, oldest first.
pub struct StateHistory {
    points: VecDeque<RootPoint>,
    max: usize,
}

impl StateHistory {
    pub fn new(max: usize) -> Self {
        Self { points: VecDeque::with_capacity(max), max }
    }

    pub fn record(&mut self, p: RootPoint) {
        if self.max == 0 {
            return;
        }
        if self.points.len() == self.max {
            self.points.pop_front();
        }
        self.points.push_back(p);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest_root(&self) -> Option<Hash32> {
        self.points.back().map(|p| p.state_root)
    }

    pub fn root_by_event(&self, event_hash: Hash32) -> Option<Hash32> {
        self.points.iter().rev().find(|p| p.event_hash == event_hash).map(|p| p.state_root)
    }

    pub fn root_at_or_before(&self, timestamp: u64) -> Option<Hash32> {
        self.points.iter().rev().find(|p| p.timestamp <= timestamp).map(|p| p.state_root)
    }
}
