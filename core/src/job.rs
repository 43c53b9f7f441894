use std::fmt;

use serde::{Deserialize, Serialize};

/// The recurring behaviours of the cohost. The registry is built from this closed set.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Thank viewers for unread gifts.
    Gifts,
    /// Read new chat comments and reply to one of them.
    Chat,
    /// Thank a random top liker.
    TopLikers,
    /// Say something unprompted.
    Thought,
    /// Reply in the shared peer-agent room.
    PeerChat,
    /// Pick an idle animation.
    Animation,
    /// Liveness update.
    Heartbeat,
}

impl JobKind {
    /// Every kind, in default priority order.
    pub const ALL: [JobKind; 7] = [
        JobKind::Gifts,
        JobKind::Chat,
        JobKind::TopLikers,
        JobKind::Thought,
        JobKind::PeerChat,
        JobKind::Animation,
        JobKind::Heartbeat,
    ];

    /// Stable identifier used in config, logs and the status API.
    pub fn name(self) -> &'static str {
        match self {
            JobKind::Gifts => "gifts",
            JobKind::Chat => "chat",
            JobKind::TopLikers => "top_likers",
            JobKind::Thought => "thought",
            JobKind::PeerChat => "peer_chat",
            JobKind::Animation => "animation",
            JobKind::Heartbeat => "heartbeat",
        }
    }

    /// Reverse of [`JobKind::name`].
    pub fn from_name(name: &str) -> Option<JobKind> {
        JobKind::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Built-in `(priority, min interval ms)` for this kind.
    pub fn default_timing(self) -> (u32, u64) {
        match self {
            JobKind::Gifts => (1, 5_000),
            JobKind::Chat => (2, 10_000),
            JobKind::TopLikers => (3, 300_000),
            JobKind::Thought => (4, 120_000),
            JobKind::PeerChat => (4, 30_000),
            JobKind::Animation => (5, 60_000),
            JobKind::Heartbeat => (5, 30_000),
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A scheduled job specification.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct JobSpec {
    /// Which behaviour runs.
    pub kind: JobKind,
    /// Lower value wins among jobs eligible on the same tick.
    pub priority: u32,
    /// Minimum time between the last run and the next one (milliseconds).
    pub min_interval_ms: u64,
}

impl JobSpec {
    /// Spec with the kind's built-in timing.
    pub fn with_defaults(kind: JobKind) -> Self {
        let (priority, min_interval_ms) = kind.default_timing();
        Self { kind, priority, min_interval_ms }
    }

    /// The default registry, one spec per kind in priority order.
    pub fn default_registry() -> Vec<JobSpec> {
        JobKind::ALL.into_iter().map(JobSpec::with_defaults).collect()
    }
}

/// Runtime state for a job.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct JobState {
    /// Timestamp (ms since epoch) the last run completed; `None` before the first run.
    pub last_run_ms: Option<u64>,
    /// True strictly while the job body executes.
    pub is_running: bool,
    /// Completed runs, successful or not.
    pub runs: u64,
    /// Runs that ended in an error (timeouts included).
    pub failures: u64,
    /// Runs cut short by the timeout.
    pub timeouts: u64,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
}

impl JobState {
    /// Not running and `min_interval_ms` elapsed since the last run.
    pub fn is_eligible(&self, spec: &JobSpec, now_ms: u64) -> bool {
        if self.is_running {
            return false;
        }
        match self.last_run_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= spec.min_interval_ms,
        }
    }
}

/// Spec and state of one registry entry, as reported to observers.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct JobView {
    /// Position in the registry (tie-breaker after priority).
    pub index: usize,
    /// Static description.
    pub spec: JobSpec,
    /// Mutable bookkeeping.
    pub state: JobState,
}
