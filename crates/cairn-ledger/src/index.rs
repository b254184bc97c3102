//! In-memory secondary indexes rebuilt from the log on open.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use cairn_types::Score;

/// Per-key summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct KeyHead {
    /// Most recent entry for the key, of any kind.
    pub latest: u64,
    /// Most recent entry carrying a value (raw or structured).
    pub latest_value: Option<u64>,
    /// Number of entries written for the key.
    pub versions: u64,
}

/// Key → latest index, plus a back-link per index for history walks.
#[derive(Debug, Default)]
pub(crate) struct KeyIndex {
    heads: BTreeMap<Vec<u8>, KeyHead>,
    /// `previous[i - 1]` is the prior index for the key of entry `i`.
    /// `None` for first versions and for entries outside the key map.
    previous: Vec<Option<u64>>,
    /// Whether entry `i` carries a value, same indexing as `previous`.
    carries_value: Vec<bool>,
}

impl KeyIndex {
    /// Record a keyed entry. Indices must arrive densely, in order.
    pub fn record(&mut self, key: &[u8], index: u64, carries_value: bool) {
        debug_assert_eq!(index, self.previous.len() as u64 + 1);

        let prior = match self.heads.get_mut(key) {
            Some(head) => {
                let prior = head.latest;
                head.latest = index;
                head.versions += 1;
                if carries_value {
                    head.latest_value = Some(index);
                }
                Some(prior)
            }
            None => {
                self.heads.insert(
                    key.to_vec(),
                    KeyHead {
                        latest: index,
                        latest_value: carries_value.then_some(index),
                        versions: 1,
                    },
                );
                None
            }
        };
        self.previous.push(prior);
        self.carries_value.push(carries_value);
    }

    /// Advance past an entry that is not part of the key map.
    pub fn skip(&mut self, index: u64) {
        debug_assert_eq!(index, self.previous.len() as u64 + 1);
        self.previous.push(None);
        self.carries_value.push(false);
    }

    pub fn head(&self, key: &[u8]) -> Option<KeyHead> {
        self.heads.get(key).copied()
    }

    /// Every index written for `key`, oldest first.
    pub fn history(&self, key: &[u8]) -> Vec<u64> {
        let mut indices = Vec::new();
        let mut cursor = self.heads.get(key).map(|head| head.latest);
        while let Some(index) = cursor {
            indices.push(index);
            cursor = self.previous[(index - 1) as usize];
        }
        indices.reverse();
        indices
    }

    /// Keys starting with `prefix`, in order, strictly after `offset` if given.
    pub fn range<'a>(
        &'a self,
        prefix: &'a [u8],
        offset: Option<&'a [u8]>,
    ) -> impl Iterator<Item = (&'a [u8], KeyHead)> + 'a {
        let start = match offset {
            Some(offset) if offset >= prefix => Bound::Excluded(offset),
            _ => Bound::Included(prefix),
        };
        self.heads
            .range::<[u8], _>((start, Bound::Unbounded))
            .take_while(move |(key, _)| key.starts_with(prefix))
            .map(|(key, head)| (key.as_slice(), *head))
    }

    /// Number of distinct keys starting with `prefix`.
    pub fn count(&self, prefix: &[u8]) -> u64 {
        self.range(prefix, None).count() as u64
    }
}

/// One member of a sorted set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SortedEntry {
    pub score: Score,
    pub member: Vec<u8>,
    pub index: u64,
}

/// Set name → members ordered by `(score, member)`.
#[derive(Debug, Default)]
pub(crate) struct SortedIndex {
    sets: HashMap<Vec<u8>, BTreeMap<(Score, Vec<u8>), u64>>,
}

impl SortedIndex {
    /// Map `(set, score, member)` to `index`, replacing any earlier index.
    pub fn insert(&mut self, set: &[u8], score: Score, member: &[u8], index: u64) {
        self.sets
            .entry(set.to_vec())
            .or_default()
            .insert((score, member.to_vec()), index);
    }

    /// Up to `limit` members strictly after `offset` (before, if `reverse`).
    pub fn scan(
        &self,
        set: &[u8],
        offset: Option<(Score, &[u8])>,
        limit: usize,
        reverse: bool,
    ) -> Vec<SortedEntry> {
        let Some(members) = self.sets.get(set) else {
            return Vec::new();
        };

        let offset = offset.map(|(score, member)| (score, member.to_vec()));
        let bounds = match (offset, reverse) {
            (None, _) => (Bound::Unbounded, Bound::Unbounded),
            (Some(o), false) => (Bound::Excluded(o), Bound::Unbounded),
            (Some(o), true) => (Bound::Unbounded, Bound::Excluded(o)),
        };

        let range = members.range(bounds);
        let to_entry = |((score, member), index): (&(Score, Vec<u8>), &u64)| SortedEntry {
            score: *score,
            member: member.clone(),
            index: *index,
        };

        if reverse {
            range.rev().take(limit).map(to_entry).collect()
        } else {
            range.take(limit).map(to_entry).collect()
        }
    }
}
