//! Authenticated State Ledger
//!
//! A fixed-depth Merkle tree kept off-chain, a single committed root kept in
//! a [`CommitmentStore`], and a transition engine that moves the root only
//! when the caller proves the old leaf against it.

mod commitment;
mod config;
pub mod crypto;
mod events;
mod history;
mod storage;
mod transition;
mod tree;
mod treestore;
mod types;

pub use commitment::{CommitmentStore, InMemoryCommitmentStore};
pub use config::LedgerConfig;
pub use events::{Event, LogEntry, Notice, NoticeEvent, TransitionEvent};
pub use history::{RootPoint, StateHistory};
pub use storage::{leaf_key, parse_leaf_key, FileBackedStorage, InMemoryStorage, Storage};
pub use transition::{Transition, TransitionEngine};
pub use tree::{MerkleTree, MAX_DEPTH};
pub use treestore::{InMemoryTreeStore, NodeId, TreeStore};
pub use types::{AuthenticationPath, Checkpoint, CompressedPath, Hash32, StoredLeaf, TransitionReceipt};

use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use events::EventLog;
use rand_core::OsRng;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Leaf index {index} out of range (capacity {capacity})")]
    IndexOutOfRange { index: u64, capacity: u64 },

    #[error("Stale or invalid witness")]
    StaleOrInvalidWitness,

    #[error("Invalid tree depth: {0}")]
    InvalidDepth(u8),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid proof")]
    InvalidProof,

    #[error("Off-chain tree diverged from the committed root")]
    TreeDiverged,
}

pub type Result<T> = std::result::Result<T, StateError>;

/// Off-chain side of the ledger: the tree, the authoritative records, and a
/// signed log of every transition committed through it.
///
/// The committed root itself lives in a separate [`CommitmentStore`] passed
/// to [`StateLedger::commit`].
pub struct StateLedger<S: Storage, N: TreeStore = InMemoryTreeStore> {
    storage: S,
    tree: MerkleTree<N>,
    engine: TransitionEngine,
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    event_log: EventLog,
    history: StateHistory,
}

impl<S: Storage> StateLedger<S, InMemoryTreeStore> {
    /// Create an empty ledger with a fresh signing key
    pub fn new(storage: S, config: LedgerConfig) -> Result<Self> {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self::with_store_and_key(storage, InMemoryTreeStore::new(), signing_key, config)
    }

    /// Rebuild the tree from the leaves already held in `storage`.
    pub fn restore(storage: S, signing_key: SigningKey, config: LedgerConfig) -> Result<Self> {
        let stored = storage.entries()?;
        let mut ledger = Self::with_store_and_key(storage, InMemoryTreeStore::new(), signing_key, config)?;

        for (key, value) in stored {
            let Some(index) = parse_leaf_key(&key) else { continue };
            let leaf: StoredLeaf = bincode::deserialize(&value)
                .map_err(|e| StateError::Serialization(e.to_string()))?;
            ledger.tree.set_leaf(index, leaf.leaf)?;
        }

        debug!(root = %hex::encode(ledger.tree.root()), "ledger restored from storage");
        Ok(ledger)
    }
}

impl<S: Storage, N: TreeStore> StateLedger<S, N> {
    /// Create with a specific node store and signing key (for testing/recovery)
    pub fn with_store_and_key(
        storage: S,
        node_store: N,
        signing_key: SigningKey,
        config: LedgerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let verifying_key = signing_key.verifying_key();

        Ok(Self {
            storage,
            tree: MerkleTree::with_store(config.depth, node_store)?,
            engine: TransitionEngine::new(config.depth)?,
            signing_key,
            verifying_key,
            event_log: EventLog::new(),
            history: StateHistory::new(config.history_size),
        })
    }

    /// Root of the off-chain tree
    pub fn root(&self) -> Hash32 {
        self.tree.root()
    }

    pub fn depth(&self) -> u8 {
        self.tree.depth()
    }

    pub fn capacity(&self) -> u64 {
        self.tree.capacity()
    }

    /// Root of an all-empty tree of this depth
    pub fn empty_root(&self) -> Hash32 {
        self.tree.empty_root()
    }

    pub fn engine(&self) -> TransitionEngine {
        self.engine
    }

    pub fn witness(&self, index: u64) -> Result<AuthenticationPath> {
        self.tree.witness(index)
    }

    pub fn leaf(&self, index: u64) -> Result<Hash32> {
        self.tree.leaf(index)
    }

    /// Record bytes committed at `index`, if any
    pub fn record(&self, index: u64) -> Result<Option<Vec<u8>>> {
        if index >= self.tree.capacity() {
            return Err(StateError::IndexOutOfRange { index, capacity: self.tree.capacity() });
        }
        match self.storage.get(&leaf_key(index))? {
            Some(bytes) => {
                let stored: StoredLeaf = bincode::deserialize(&bytes)
                    .map_err(|e| StateError::Serialization(e.to_string()))?;
                Ok(Some(stored.record))
            }
            None => Ok(None),
        }
    }

    /// Verify `old_leaf` under `path` against the committed root, then move
    /// the commitment to the root with `new_leaf` in its place.
    ///
    /// Nothing is changed unless both the witness check and the
    /// compare-and-set succeed; `record` becomes the stored copy of the leaf.
    pub fn commit<C: CommitmentStore + ?Sized>(
        &mut self,
        commitment: &C,
        operation: &str,
        path: &AuthenticationPath,
        old_leaf: Hash32,
        new_leaf: Hash32,
        record: &[u8],
    ) -> Result<TransitionReceipt> {
        self.commit_with_notice(commitment, operation, path, old_leaf, new_leaf, record, None)
    }

    /// [`commit`](Self::commit), also logging `notice` right after the
    /// transition event.
    ///
    /// Both events are sealed before the commitment moves, so a committed
    /// transition always carries its notice.
    ///
    /// `commitment` must have this ledger as its only writer. Once another
    /// writer moves it, the off-chain tree no longer matches and every
    /// commit fails with `TreeDiverged`.
    #[allow(clippy::too_many_arguments)]
    pub fn commit_with_notice<C: CommitmentStore + ?Sized>(
        &mut self,
        commitment: &C,
        operation: &str,
        path: &AuthenticationPath,
        old_leaf: Hash32,
        new_leaf: Hash32,
        record: &[u8],
        notice: Option<&Notice>,
    ) -> Result<TransitionReceipt> {
        let old_root = commitment.read();

        let new_root = self
            .engine
            .verify_and_transition(old_root, path, old_leaf, new_leaf)
            .inspect_err(|_| {
                warn!(operation, "transition rejected: witness does not match committed root");
            })?;
        let index = path.leaf_index();

        if self.tree.root() != old_root {
            warn!(
                operation,
                index,
                tree_root = %hex::encode(self.tree.root()),
                committed_root = %hex::encode(old_root),
                "off-chain tree diverged from commitment"
            );
            return Err(StateError::TreeDiverged);
        }

        let timestamp = now();
        let transition = self.seal(Event::Transition(TransitionEvent {
            operation: operation.to_string(),
            index,
            old_leaf,
            new_leaf,
            prev_event_hash: self.event_log.latest_hash(),
            state_root: new_root,
            timestamp,
        }))?;
        let notice = match notice {
            Some(n) => Some(self.seal(Event::Notice(NoticeEvent {
                topic: n.topic.clone(),
                principal: n.principal,
                amount: n.amount,
                prev_event_hash: transition.event_hash,
                state_root: new_root,
                timestamp,
            }))?),
            None => None,
        };

        let key = leaf_key(index);
        let previous = self.storage.get(&key)?;
        let stored = bincode::serialize(&StoredLeaf { leaf: new_leaf, record: record.to_vec() })
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        self.storage.put(&key, &stored)?;

        if !commitment.compare_and_set(old_root, new_root) {
            match previous {
                Some(bytes) => self.storage.put(&key, &bytes)?,
                None => self.storage.delete(&key)?,
            }
            warn!(operation, index, "transition lost compare-and-set race");
            return Err(StateError::StaleOrInvalidWitness);
        }

        // the tree matched old_root and the path verified, so it lands on new_root
        self.tree.set_leaf(index, new_leaf)?;

        let event_hash = transition.event_hash;
        let signature = transition.signature.clone();
        self.event_log.append(transition);
        self.history.record(RootPoint { event_hash, state_root: new_root, timestamp });
        if let Some(entry) = notice {
            self.event_log.append(entry);
        }

        debug!(operation, index, root = %hex::encode(new_root), "transition committed");

        Ok(TransitionReceipt {
            index,
            old_leaf,
            new_leaf,
            old_root,
            new_root,
            event_hash,
            signature,
        })
    }

    /// Append a signed notification to the event log
    pub fn notify(&mut self, topic: &str, principal: Hash32, amount: Option<u64>) -> Result<Hash32> {
        let event = Event::Notice(NoticeEvent {
            topic: topic.to_string(),
            principal,
            amount,
            prev_event_hash: self.event_log.latest_hash(),
            state_root: self.tree.root(),
            timestamp: now(),
        });
        let entry = self.seal(event)?;
        let event_hash = entry.event_hash;
        self.event_log.append(entry);
        Ok(event_hash)
    }

    fn seal(&self, event: Event) -> Result<LogEntry> {
        let event_bytes = bincode::serialize(&event)
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        let event_hash = crypto::hash_event(&event_bytes);
        let signature = self.signing_key.sign(&event_bytes);

        Ok(LogEntry {
            event_hash,
            event,
            signature: signature.to_bytes().to_vec(),
        })
    }

    pub fn verify_path(path: &AuthenticationPath, leaf: Hash32, root: Hash32) -> bool {
        path.verify(leaf, root)
    }

    /// Get verifying key for signature verification
    pub fn verifying_key(&self) -> VerifyingKey {
        self.verifying_key
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            state_root: self.root(),
            latest_event_hash: self.event_log.latest_hash(),
        }
    }

    pub fn events(&self) -> &[LogEntry] {
        &self.event_log.entries
    }

    // Verification helper for tests/clients
    pub fn verify_event_log(&self, vk: &VerifyingKey) -> bool {
        self.event_log.verify_chain_and_sigs(vk)
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    #[doc(hidden)]
    pub fn tamper_last_signature_for_test(&mut self) {
        if let Some(last) = self.event_log.entries.last_mut() {
            if !last.signature.is_empty() {
                last.signature[0] ^= 0x01;
            }
        }
    }

    // ---------------- Path Compression Helpers ---------------- //

    pub fn compress_path(&self, path: &AuthenticationPath) -> Result<CompressedPath> {
        if !path.is_well_formed() || path.depth() != self.tree.depth() as usize {
            return Err(StateError::InvalidProof);
        }

        let zeros = self.tree.zero_hashes();
        let mut bitmap = vec![0u8; path.depth().div_ceil(8)];
        let mut siblings = Vec::new();

        for (h, sibling) in path.siblings.iter().enumerate() {
            if zeros.get(h) != Some(sibling) {
                bitmap[h / 8] |= 1 << (h % 8);
                siblings.push(*sibling);
            }
        }

        Ok(CompressedPath {
            depth: self.tree.depth(),
            index: path.leaf_index(),
            bitmap,
            siblings,
        })
    }

    pub fn decompress_path(&self, compressed: &CompressedPath) -> Result<AuthenticationPath> {
        let depth = self.tree.depth();
        if compressed.depth != depth
            || compressed.bitmap.len() != (depth as usize).div_ceil(8)
            || compressed.index >= self.tree.capacity()
        {
            return Err(StateError::InvalidProof);
        }

        let zeros = self.tree.zero_hashes();
        let mut siblings = Vec::with_capacity(depth as usize);
        let mut is_left = Vec::with_capacity(depth as usize);
        let mut sib_iter = compressed.siblings.iter();

        for h in 0..depth as usize {
            let present = (compressed.bitmap[h / 8] >> (h % 8)) & 1 == 1;
            if present {
                siblings.push(*sib_iter.next().ok_or(StateError::InvalidProof)?);
            } else {
                siblings.push(zeros[h]);
            }
            is_left.push((compressed.index >> h) & 1 == 0);
        }

        if sib_iter.next().is_some() {
            return Err(StateError::InvalidProof); // Too many siblings
        }

        Ok(AuthenticationPath { siblings, is_left })
    }
}

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
