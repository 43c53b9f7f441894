use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::model::{Comment, Gift};
use crate::store::{ns, KvSerde};

/// Entries kept per agent before the oldest are dropped.
pub const DEFAULT_CAPACITY: usize = 500;

/// What a memory entry was recorded from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryKind {
    /// A comment the agent chose to answer.
    Comment,
    /// A gift the agent thanked.
    Gift,
}

impl MemoryKind {
    fn tag(self) -> &'static str {
        match self {
            MemoryKind::Comment => "comment",
            MemoryKind::Gift => "gift",
        }
    }
}

/// One remembered interaction.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MemoryEntry {
    /// Source type.
    pub kind: MemoryKind,
    /// Id of the comment or gift.
    pub source_id: String,
    /// Viewer display name.
    pub author: String,
    /// Comment text, or a gift summary.
    pub text: String,
    /// When it was recorded (ms since epoch).
    pub at_ms: u64,
}

impl MemoryEntry {
    /// Entry for a comment.
    pub fn from_comment(c: &Comment, at_ms: u64) -> Self {
        Self {
            kind: MemoryKind::Comment,
            source_id: c.id.clone(),
            author: c.author_name.clone(),
            text: c.text.clone(),
            at_ms,
        }
    }

    /// Entry for a gift.
    pub fn from_gift(g: &Gift, at_ms: u64) -> Self {
        Self {
            kind: MemoryKind::Gift,
            source_id: g.id.clone(),
            author: g.sender_name.clone(),
            text: format!("sent {} x{}", g.gift_name, g.amount),
            at_ms,
        }
    }
}

/// Per-agent interaction log on top of a KV store.
///
/// Layout: `memory:{agent}:{kind}:{source_id}` holds the entry and
/// `memory:{agent}:index` the keys in insertion order. Recording the same
/// source twice overwrites in place.
#[derive(Clone)]
pub struct AgentMemory<K> {
    kv: K,
    agent_id: String,
    capacity: usize,
}

impl<K: KvSerde> AgentMemory<K> {
    /// Memory for `agent_id` with [`DEFAULT_CAPACITY`].
    pub fn new(kv: K, agent_id: impl Into<String>) -> Self {
        Self { kv, agent_id: agent_id.into(), capacity: DEFAULT_CAPACITY }
    }

    /// Override how many entries are kept.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    fn entry_key(&self, kind: MemoryKind, source_id: &str) -> String {
        format!("{}:{}:{}", self.agent_id, kind.tag(), source_id)
    }

    fn index_key(&self) -> Vec<u8> {
        ns("memory", &format!("{}:index", self.agent_id))
    }

    /// Persist `entry`, evicting the oldest entries beyond capacity.
    pub fn record(&self, entry: &MemoryEntry) -> Result<()> {
        let key = self.entry_key(entry.kind, &entry.source_id);
        self.kv.put_t(&ns("memory", &key), entry)?;

        let mut index: Vec<String> = self.kv.get_t(&self.index_key())?.unwrap_or_default();
        if !index.contains(&key) {
            index.push(key);
        }
        if index.len() > self.capacity {
            let overflow = index.len() - self.capacity;
            tracing::debug!("memory agent={} evicting {} entries", self.agent_id, overflow);
            for old in index.drain(..overflow) {
                self.kv.delete(&ns("memory", &old))?;
            }
        }
        self.kv.put_t(&self.index_key(), &index)
    }

    /// Look up a single entry.
    pub fn recall(&self, kind: MemoryKind, source_id: &str) -> Result<Option<MemoryEntry>> {
        self.kv.get_t(&ns("memory", &self.entry_key(kind, source_id)))
    }

    /// The `n` most recent entries, oldest first.
    pub fn recent(&self, n: usize) -> Result<Vec<MemoryEntry>> {
        let index: Vec<String> = self.kv.get_t(&self.index_key())?.unwrap_or_default();
        let start = index.len().saturating_sub(n);
        let mut out = Vec::with_capacity(index.len() - start);
        for key in &index[start..] {
            if let Some(e) = self.kv.get_t::<MemoryEntry>(&ns("memory", key))? {
                out.push(e);
            }
        }
        Ok(out)
    }
}
