//! The ledger: entry log, Merkle history tree and secondary indexes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard};

use cairn_merkle::{ConsistencyProof, HistoryTree, InclusionProof};
use cairn_types::{Digest, Root, ScanMode, Score, StructuredValue, Value};
use tracing::{debug, error, info, warn};

use crate::config::{LedgerConfig, StorageBackend};
use crate::entry::{Entry, Item, Payload, ProvenItem, SortedMember, WriteProof};
use crate::error::LedgerError;
use crate::index::{KeyIndex, SortedIndex};
use crate::store::LedgerStore;

type Result<T> = std::result::Result<T, LedgerError>;

/// Everything derived from the committed log. Rebuilt on open.
#[derive(Default)]
struct LedgerState {
    tree: HistoryTree,
    keys: KeyIndex,
    sorted: SortedIndex,
}

impl LedgerState {
    fn apply(&mut self, entry: &Entry, leaf: Digest) {
        self.tree.append(leaf);
        match &entry.payload {
            Payload::Raw(_) | Payload::Structured(_) => {
                self.keys.record(&entry.key, entry.index, true);
            }
            Payload::Reference { .. } => self.keys.record(&entry.key, entry.index, false),
            Payload::Sorted { score, member } => {
                self.keys.skip(entry.index);
                self.sorted.insert(&entry.key, *score, member, entry.index);
            }
        }
    }
}

/// A batch that made it to storage.
struct Commit {
    root: Root,
    entries: Vec<Entry>,
}

/// Tamper-evident key-value ledger.
///
/// Every write appends entries to the log and grows the Merkle history tree;
/// every entry can be proven against any root taken at or after its index.
///
/// **Concurrency**: one writer at a time, any number of readers. A writer
/// persists its entries and then the commit checkpoint before publishing
/// them, so readers only ever see committed entries and a crash mid-batch
/// loses the whole batch.
pub struct Ledger {
    config: LedgerConfig,
    store: LedgerStore,
    state: RwLock<LedgerState>,
    writer: Mutex<()>,
    poisoned: AtomicBool,
}

impl Ledger {
    /// Open the ledger described by `config`, recovering from storage.
    pub fn open(config: LedgerConfig) -> Result<Self> {
        let store = match config.backend {
            StorageBackend::Fjall => LedgerStore::open(&config.data_dir)?,
            StorageBackend::Memory => LedgerStore::in_memory(),
        };
        Self::with_store(store, config)
    }

    /// Empty in-memory ledger with default limits.
    pub fn in_memory() -> Self {
        Self::from_parts(
            LedgerStore::in_memory(),
            LedgerConfig::in_memory(),
            LedgerState::default(),
        )
    }

    /// Open a ledger over an existing store.
    ///
    /// Replays every committed entry, checks the recomputed root against the
    /// checkpoint, and drops entries written past it.
    pub fn with_store(store: LedgerStore, config: LedgerConfig) -> Result<Self> {
        let state = recover(&store)?;
        info!(
            size = state.tree.size(),
            root = %state.tree.root().digest,
            in_memory = store.is_memory(),
            "opened ledger"
        );
        Ok(Self::from_parts(store, config, state))
    }

    fn from_parts(store: LedgerStore, config: LedgerConfig, state: LedgerState) -> Self {
        Self {
            config,
            store,
            state: RwLock::new(state),
            writer: Mutex::new(()),
            poisoned: AtomicBool::new(false),
        }
    }

    /// Configuration the ledger was opened with.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Number of entries in the log.
    pub fn size(&self) -> u64 {
        self.read_state().tree.size()
    }

    /// Flush to stable storage and release the ledger.
    pub fn close(self) -> Result<()> {
        self.store.persist()?;
        info!(size = self.size(), "closed ledger");
        Ok(())
    }

    // ----- Writes -----

    /// Append `value` under `key`. Returns the new index.
    pub fn set(&self, key: &[u8], value: impl Into<Value>) -> Result<u64> {
        let value: Value = value.into();
        let payload = Payload::from(value);
        let commit = self.commit(|_| Ok(vec![(key.to_vec(), payload)]))?;
        Ok(commit.root.index)
    }

    /// Like [`set`](Self::set), also proving the write against the new root
    /// and, if `prior` is given, the new root against `prior`.
    pub fn set_with_proof(
        &self,
        key: &[u8],
        value: impl Into<Value>,
        prior: Option<&Root>,
    ) -> Result<WriteProof> {
        self.check_prior(prior)?;
        let value: Value = value.into();
        let payload = Payload::from(value);
        let commit = self.commit(|_| Ok(vec![(key.to_vec(), payload)]))?;
        self.write_proof(commit, prior)
    }

    /// Append several key/value pairs under contiguous indices, all or
    /// nothing. Returns the first and last index.
    pub fn set_batch<K, V>(&self, items: impl IntoIterator<Item = (K, V)>) -> Result<(u64, u64)>
    where
        K: AsRef<[u8]>,
        V: Into<Value>,
    {
        let drafts: Vec<(Vec<u8>, Payload)> = items
            .into_iter()
            .map(|(key, value)| {
                let value: Value = value.into();
                (key.as_ref().to_vec(), Payload::from(value))
            })
            .collect();

        let commit = self.commit(|_| Ok(drafts))?;
        let first = commit.entries.first().map_or(commit.root.index, |e| e.index);
        Ok((first, commit.root.index))
    }

    /// Make `alias` resolve to the current value of `target`.
    pub fn reference(&self, alias: &[u8], target: &[u8]) -> Result<u64> {
        Ok(self.commit_reference(alias, target)?.root.index)
    }

    /// [`reference`](Self::reference) with proofs.
    pub fn reference_with_proof(
        &self,
        alias: &[u8],
        target: &[u8],
        prior: Option<&Root>,
    ) -> Result<WriteProof> {
        self.check_prior(prior)?;
        let commit = self.commit_reference(alias, target)?;
        self.write_proof(commit, prior)
    }

    /// Add `member` to sorted set `set` with `score`.
    pub fn sorted_add(&self, set: &[u8], score: f64, member: &[u8]) -> Result<u64> {
        Ok(self.commit_sorted(set, score, member)?.root.index)
    }

    /// [`sorted_add`](Self::sorted_add) with proofs.
    pub fn sorted_add_with_proof(
        &self,
        set: &[u8],
        score: f64,
        member: &[u8],
        prior: Option<&Root>,
    ) -> Result<WriteProof> {
        self.check_prior(prior)?;
        let commit = self.commit_sorted(set, score, member)?;
        self.write_proof(commit, prior)
    }

    fn commit_reference(&self, alias: &[u8], target: &[u8]) -> Result<Commit> {
        self.validate_key(target)?;
        self.commit(|state| {
            let head = state
                .keys
                .head(target)
                .ok_or_else(|| LedgerError::KeyNotFound(target.to_vec()))?;

            let (target_key, target_index) = if head.latest_value == Some(head.latest) {
                (target.to_vec(), head.latest)
            } else {
                // Latest entry is itself a reference: point at its target.
                match self.fetch(head.latest)?.payload {
                    Payload::Reference { target_key, .. } => {
                        let index = state
                            .keys
                            .head(&target_key)
                            .and_then(|h| h.latest_value)
                            .ok_or_else(|| LedgerError::KeyNotFound(target_key.clone()))?;
                        (target_key, index)
                    }
                    _ => {
                        return Err(LedgerError::corruption(
                            head.latest,
                            "key map points at a sorted-set entry",
                        ));
                    }
                }
            };

            Ok(vec![(
                alias.to_vec(),
                Payload::Reference {
                    target_key,
                    target_index,
                },
            )])
        })
    }

    fn commit_sorted(&self, set: &[u8], score: f64, member: &[u8]) -> Result<Commit> {
        let score = Score::new(score).ok_or(LedgerError::InvalidScore(score))?;
        self.validate_key(member)?;
        let payload = Payload::Sorted {
            score,
            member: member.to_vec(),
        };
        self.commit(|_| Ok(vec![(set.to_vec(), payload)]))
    }

    /// Append the entries produced by `build` as one batch.
    ///
    /// `build` runs under the writer lock against the current state, so
    /// whatever it reads cannot change before the batch lands.
    fn commit<F>(&self, build: F) -> Result<Commit>
    where
        F: FnOnce(&LedgerState) -> Result<Vec<(Vec<u8>, Payload)>>,
    {
        let _writer = self.writer.lock().expect("writer lock poisoned");
        if self.poisoned.load(Ordering::Acquire) {
            return Err(LedgerError::Poisoned);
        }

        let (mut frontier, drafts) = {
            let state = self.read_state();
            (state.tree.frontier(), build(&*state)?)
        };
        self.check_batch(&drafts)?;

        let first = frontier.size() + 1;
        let entries: Vec<Entry> = drafts
            .into_iter()
            .zip(first..)
            .map(|((key, payload), index)| Entry {
                index,
                key,
                payload,
            })
            .collect();
        let leaves = entries
            .iter()
            .map(Entry::leaf_digest)
            .collect::<Result<Vec<_>>>()?;

        for leaf in &leaves {
            frontier.push(*leaf);
        }
        let root = frontier.root();

        for entry in &entries {
            self.store.put_entry(entry)?;
        }
        self.store.put_checkpoint(&root)?;

        {
            let mut state = self.state.write().expect("state lock poisoned");
            for (entry, leaf) in entries.iter().zip(leaves) {
                state.apply(entry, leaf);
            }
            debug_assert_eq!(state.tree.root(), root);
        }

        debug!(first, last = root.index, root = %root.digest, "appended entries");
        Ok(Commit { root, entries })
    }

    fn check_batch(&self, drafts: &[(Vec<u8>, Payload)]) -> Result<()> {
        if drafts.is_empty() {
            return Err(LedgerError::EmptyBatch);
        }
        if drafts.len() > self.config.max_batch_size {
            return Err(LedgerError::BatchTooLarge {
                len: drafts.len(),
                max: self.config.max_batch_size,
            });
        }
        for (key, _) in drafts {
            self.validate_key(key)?;
        }
        Ok(())
    }

    fn validate_key(&self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(LedgerError::InvalidKey("key is empty".into()));
        }
        if key.len() > self.config.max_key_size {
            return Err(LedgerError::InvalidKey(format!(
                "{} bytes exceeds the maximum of {}",
                key.len(),
                self.config.max_key_size
            )));
        }
        Ok(())
    }

    /// Reject a pinned root that is not a root of this ledger.
    fn check_prior(&self, prior: Option<&Root>) -> Result<()> {
        let Some(prior) = prior else {
            return Ok(());
        };
        let actual = self.root_at(prior.index)?;
        if actual.digest != prior.digest {
            return Err(LedgerError::RootMismatch(*prior));
        }
        Ok(())
    }

    fn write_proof(&self, commit: Commit, prior: Option<&Root>) -> Result<WriteProof> {
        let Commit { root, mut entries } = commit;
        let entry = entries.pop().ok_or(LedgerError::EmptyBatch)?;

        let inclusion = self.inclusion_at(entry.index, root.index)?;
        let consistency = match prior {
            Some(prior) if prior.index > 0 => {
                Some(self.consistency_between(prior.index, root.index)?)
            }
            _ => None,
        };

        Ok(WriteProof {
            index: entry.index,
            entry,
            root,
            inclusion,
            consistency,
        })
    }

    // ----- Reads -----

    /// The stored entry at `index`, unresolved.
    pub fn get_entry(&self, index: u64) -> Result<Entry> {
        if index == 0 || index > self.size() {
            return Err(LedgerError::IndexNotFound(index));
        }
        self.fetch(index)
    }

    /// The stored entry at `key`'s latest index, unresolved.
    pub fn get_entry_by_key(&self, key: &[u8]) -> Result<Entry> {
        let latest = self
            .read_state()
            .keys
            .head(key)
            .map(|head| head.latest)
            .ok_or_else(|| LedgerError::KeyNotFound(key.to_vec()))?;
        self.fetch(latest)
    }

    /// Latest item for `key`, following a reference if there is one.
    pub fn get(&self, key: &[u8]) -> Result<Item> {
        let entry = self.get_entry_by_key(key)?;
        self.resolve(&entry)
    }

    /// Item at `index`. References and sorted-set entries resolve to the
    /// current value of their target or member key.
    pub fn get_at_index(&self, index: u64) -> Result<Item> {
        let entry = self.get_entry(index)?;
        self.resolve(&entry)
    }

    /// [`get`](Self::get) for each key, failing on the first missing one.
    pub fn get_batch<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<Vec<Item>> {
        keys.iter().map(|key| self.get(key.as_ref())).collect()
    }

    /// [`get`](Self::get) plus an inclusion proof against the current root.
    pub fn get_with_proof(&self, key: &[u8]) -> Result<ProvenItem> {
        let item = self.get(key)?;
        self.prove(item)
    }

    /// [`get_at_index`](Self::get_at_index) plus an inclusion proof against
    /// the current root.
    pub fn get_at_index_with_proof(&self, index: u64) -> Result<ProvenItem> {
        let item = self.get_at_index(index)?;
        self.prove(item)
    }

    /// Latest value of `key` as a structured value.
    pub fn get_structured(&self, key: &[u8]) -> Result<StructuredValue> {
        structured(self.get(key)?)
    }

    /// Value at `index` as a structured value.
    pub fn get_structured_at(&self, index: u64) -> Result<StructuredValue> {
        structured(self.get_at_index(index)?)
    }

    fn prove(&self, item: Item) -> Result<ProvenItem> {
        let root = self.current_root();
        let entry = self.fetch(item.index)?;
        let inclusion = self.inclusion_at(item.index, root.index)?;
        Ok(ProvenItem {
            item,
            entry,
            root,
            inclusion,
        })
    }

    fn resolve(&self, entry: &Entry) -> Result<Item> {
        match &entry.payload {
            Payload::Raw(bytes) => Ok(direct_item(entry, Value::Raw(bytes.clone()))),
            Payload::Structured(sv) => Ok(direct_item(entry, Value::Structured(sv.clone()))),
            Payload::Reference { target_key, .. } => {
                let target = self.current_value(target_key)?.ok_or_else(|| {
                    LedgerError::corruption(entry.index, "reference target has no value")
                })?;
                resolved_item(entry.index, target_key, &target)
            }
            Payload::Sorted { member, .. } => match self.current_value(member)? {
                Some(target) => resolved_item(entry.index, member, &target),
                None => Ok(Item {
                    index: entry.index,
                    key: member.clone(),
                    value: None,
                    target_index: None,
                }),
            },
        }
    }

    /// Most recent raw or structured entry for `key`.
    fn current_value(&self, key: &[u8]) -> Result<Option<Entry>> {
        let index = self.read_state().keys.head(key).and_then(|h| h.latest_value);
        index.map(|index| self.fetch(index)).transpose()
    }

    /// Load a committed entry. A missing or undecodable record is corruption.
    fn fetch(&self, index: u64) -> Result<Entry> {
        let bytes = self
            .store
            .get_raw_entry(index)?
            .ok_or_else(|| LedgerError::corruption(index, "committed entry missing"))?;
        decode_entry(index, &bytes)
    }

    fn fetch_all(&self, indices: Vec<u64>) -> Result<Vec<Entry>> {
        indices.into_iter().map(|index| self.fetch(index)).collect()
    }

    fn resolve_all(&self, indices: Vec<u64>) -> Result<Vec<Item>> {
        indices
            .into_iter()
            .map(|index| self.fetch(index).and_then(|entry| self.resolve(&entry)))
            .collect()
    }

    // ----- Proofs -----

    /// Root over the whole log.
    pub fn current_root(&self) -> Root {
        self.read_state().tree.root()
    }

    /// Root as it was when the log had `size` entries.
    pub fn root_at(&self, size: u64) -> Result<Root> {
        Ok(self.read_state().tree.root_at(size)?)
    }

    /// Inclusion of entry `index` in the current tree.
    pub fn inclusion(&self, index: u64) -> Result<InclusionProof> {
        let state = self.read_state();
        Ok(state.tree.inclusion_proof(index, state.tree.size())?)
    }

    /// Inclusion of entry `index` in the tree of size `size`.
    pub fn inclusion_at(&self, index: u64, size: u64) -> Result<InclusionProof> {
        Ok(self.read_state().tree.inclusion_proof(index, size)?)
    }

    /// Consistency of the tree at `first` with the current tree.
    pub fn consistency(&self, first: u64) -> Result<ConsistencyProof> {
        let state = self.read_state();
        Ok(state.tree.consistency_proof(first, state.tree.size())?)
    }

    /// Consistency of the tree at `first` with the tree at `second`.
    pub fn consistency_between(&self, first: u64, second: u64) -> Result<ConsistencyProof> {
        Ok(self.read_state().tree.consistency_proof(first, second)?)
    }

    /// Stored digests of complete subtrees, leaves first.
    pub fn tree_levels(&self) -> Vec<Vec<Digest>> {
        self.read_state().tree.levels().to_vec()
    }

    // ----- Traversal -----

    /// Keys starting with `prefix`, in key order, strictly after `offset`.
    ///
    /// [`ScanMode::Latest`] yields one item per key; [`ScanMode::AllVersions`]
    /// yields every version, oldest first within a key. `limit` counts items.
    pub fn scan_prefix(
        &self,
        prefix: &[u8],
        offset: Option<&[u8]>,
        limit: usize,
        mode: ScanMode,
    ) -> Result<Vec<Item>> {
        let indices: Vec<u64> = {
            let state = self.read_state();
            let keys = state.keys.range(prefix, offset);
            match mode {
                ScanMode::Latest => keys.take(limit).map(|(_, head)| head.latest).collect(),
                ScanMode::AllVersions => keys
                    .flat_map(|(key, _)| state.keys.history(key))
                    .take(limit)
                    .collect(),
            }
        };
        self.resolve_all(indices)
    }

    /// Page `page_number` (1-based) of `page_size` keys over the whole key
    /// space, latest item per key. Pages past the end are empty.
    pub fn paginated_scan(&self, page_number: u64, page_size: u64) -> Result<Vec<Item>> {
        if page_number == 0 || page_size == 0 {
            return Err(LedgerError::InvalidPage {
                page: page_number,
                size: page_size,
            });
        }
        let Some(skip) = (page_number - 1).checked_mul(page_size) else {
            return Ok(Vec::new());
        };
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let take = usize::try_from(page_size).unwrap_or(usize::MAX);

        let indices: Vec<u64> = self
            .read_state()
            .keys
            .range(&[], None)
            .skip(skip)
            .take(take)
            .map(|(_, head)| head.latest)
            .collect();
        self.resolve_all(indices)
    }

    /// Every entry written for `key`, oldest first.
    pub fn history(&self, key: &[u8]) -> Result<Vec<Entry>> {
        let indices = self.read_state().keys.history(key);
        if indices.is_empty() {
            return Err(LedgerError::KeyNotFound(key.to_vec()));
        }
        self.fetch_all(indices)
    }

    /// Number of distinct keys starting with `prefix`.
    pub fn count(&self, prefix: &[u8]) -> u64 {
        self.read_state().keys.count(prefix)
    }

    /// Up to `limit` members of `set` strictly after `offset` in
    /// `(score, member)` order, or strictly before it if `reverse`.
    pub fn sorted_scan(
        &self,
        set: &[u8],
        offset: Option<(f64, &[u8])>,
        limit: usize,
        reverse: bool,
    ) -> Result<Vec<SortedMember>> {
        let offset = offset
            .map(|(score, member)| {
                Score::new(score)
                    .map(|score| (score, member))
                    .ok_or(LedgerError::InvalidScore(score))
            })
            .transpose()?;

        let members = self.read_state().sorted.scan(set, offset, limit, reverse);
        members
            .into_iter()
            .map(|m| {
                let item = self
                    .current_value(&m.member)?
                    .and_then(|entry| entry.payload.value().map(|v| direct_item(&entry, v)));
                Ok(SortedMember {
                    set: set.to_vec(),
                    score: m.score,
                    member: m.member,
                    index: m.index,
                    item,
                })
            })
            .collect()
    }

    // ----- Integrity -----

    /// Re-read every committed entry and check it against the tree and the
    /// checkpoint. On any mismatch the ledger stops accepting writes.
    pub fn verify_integrity(&self) -> Result<Root> {
        let writer = self.writer.lock().expect("writer lock poisoned");
        self.verify_holding(&writer)
    }

    /// [`verify_integrity`](Self::verify_integrity) for a caller that
    /// already holds the writer lock.
    pub(crate) fn verify_holding(&self, _writer: &MutexGuard<'_, ()>) -> Result<Root> {
        let result = self.check_integrity();
        if let Err(e) = &result
            && e.kind() == crate::error::ErrorKind::Corruption
        {
            self.poisoned.store(true, Ordering::Release);
            error!(%e, "integrity check failed, refusing further writes");
        }
        result
    }

    fn check_integrity(&self) -> Result<Root> {
        let state = self.read_state();
        let root = state.tree.root();

        for index in 1..=root.index {
            let entry = self.fetch(index)?;
            let leaf = entry.leaf_digest()?;
            if state.tree.leaf(index) != Some(leaf) {
                return Err(LedgerError::corruption(index, "leaf digest mismatch"));
            }
        }

        let checkpoint = self.store.get_checkpoint()?;
        let expected = (root.index > 0).then_some(root);
        if checkpoint != expected {
            return Err(LedgerError::corruption(
                root.index,
                format!("checkpoint {checkpoint:?} does not match tree root {root}"),
            ));
        }

        debug!(size = root.index, root = %root.digest, "integrity check passed");
        Ok(root)
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &LedgerStore {
        &self.store
    }

    #[cfg(test)]
    pub(crate) fn writer_lock(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().expect("writer lock poisoned")
    }

    fn read_state(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().expect("state lock poisoned")
    }
}

fn direct_item(entry: &Entry, value: Value) -> Item {
    Item {
        index: entry.index,
        key: entry.key.clone(),
        value: Some(value),
        target_index: None,
    }
}

/// Item for the entry at `index` carrying the value stored in `target`.
fn resolved_item(index: u64, key: &[u8], target: &Entry) -> Result<Item> {
    let value = target
        .payload
        .value()
        .ok_or_else(|| LedgerError::corruption(target.index, "expected a value entry"))?;
    Ok(Item {
        index,
        key: key.to_vec(),
        value: Some(value),
        target_index: Some(target.index),
    })
}

fn structured(item: Item) -> Result<StructuredValue> {
    match item.value {
        Some(Value::Structured(sv)) => Ok(sv),
        _ => Err(LedgerError::NotStructured(
            item.target_index.unwrap_or(item.index),
        )),
    }
}

fn decode_entry(index: u64, bytes: &[u8]) -> Result<Entry> {
    let entry: Entry = postcard::from_bytes(bytes)
        .map_err(|e| LedgerError::corruption(index, format!("undecodable entry: {e}")))?;
    if entry.index != index {
        return Err(LedgerError::corruption(
            index,
            format!("record claims index {}", entry.index),
        ));
    }
    Ok(entry)
}

/// Rebuild in-memory state from the committed prefix of the log.
fn recover(store: &LedgerStore) -> Result<LedgerState> {
    let checkpoint = store.get_checkpoint()?;
    let committed = checkpoint.map_or(0, |root| root.index);

    let mut state = LedgerState::default();
    let mut uncommitted = Vec::new();

    store.for_each_raw_entry(|index, bytes| {
        if index > committed {
            uncommitted.push(index);
            return Ok(());
        }
        let expected = state.tree.size() + 1;
        if index != expected {
            return Err(LedgerError::corruption(expected, "entry missing from log"));
        }
        let entry = decode_entry(index, bytes)?;
        let leaf = entry.leaf_digest()?;
        state.apply(&entry, leaf);
        Ok(())
    })?;

    let size = state.tree.size();
    if size != committed {
        return Err(LedgerError::corruption(
            size + 1,
            format!("log ends before committed size {committed}"),
        ));
    }
    if let Some(checkpoint) = checkpoint {
        let root = state.tree.root();
        if root.digest != checkpoint.digest {
            error!(%root, %checkpoint, "recomputed root does not match checkpoint");
            return Err(LedgerError::corruption(
                committed,
                format!(
                    "recomputed root {} does not match committed {}",
                    root.digest, checkpoint.digest
                ),
            ));
        }
    }

    if let Some(first) = uncommitted.first() {
        warn!(
            count = uncommitted.len(),
            first, "discarding entries past the last checkpoint"
        );
        for index in &uncommitted {
            store.remove_entry(*index)?;
        }
    }

    Ok(state)
}
