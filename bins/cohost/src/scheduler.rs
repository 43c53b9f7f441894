use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use cohost_core::error::JobError;
use cohost_core::job::{JobKind, JobSpec, JobState, JobView};

use crate::clock::Clock;
use crate::module::{Module, ModuleCtx};

/// Executes one job body to completion.
///
/// Implementations match exhaustively on [`JobKind`]; the scheduler never
/// calls `run` while another run is outstanding.
#[async_trait]
pub trait JobRunner: Send + 'static {
    async fn run(&mut self, kind: JobKind) -> Result<(), JobError>;
}

struct Entry {
    spec: JobSpec,
    state: JobState,
}

/// The fixed job registry. Only the scheduler mutates it; everyone else reads snapshots.
#[derive(Clone)]
pub struct RegistryHandle {
    inner: Arc<Mutex<Vec<Entry>>>,
}

impl RegistryHandle {
    pub(crate) fn new(specs: Vec<JobSpec>) -> Self {
        let entries = specs.into_iter().map(|spec| Entry { spec, state: JobState::default() }).collect();
        Self { inner: Arc::new(Mutex::new(entries)) }
    }

    // Bookkeeping must land even if a previous holder panicked.
    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> Vec<JobView> {
        self.lock()
            .iter()
            .enumerate()
            .map(|(index, e)| JobView { index, spec: e.spec, state: e.state.clone() })
            .collect()
    }

    pub fn running_count(&self) -> usize {
        self.lock().iter().filter(|e| e.state.is_running).count()
    }

    /// Pick the eligible entry with the lowest `(priority, index)` and mark it running.
    fn claim(&self, now_ms: u64) -> Option<(usize, JobKind)> {
        let mut entries = self.lock();
        if entries.iter().any(|e| e.state.is_running) {
            return None;
        }
        let (index, entry) = entries
            .iter_mut()
            .enumerate()
            .filter(|(_, e)| e.state.is_eligible(&e.spec, now_ms))
            .min_by_key(|(i, e)| (e.spec.priority, *i))?;
        entry.state.is_running = true;
        Some((index, entry.spec.kind))
    }

    /// Record completion: `last_run` first, then release the slot.
    fn finish(&self, index: usize, finished_ms: u64, error: Option<&JobError>) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(index) else { return };
        let st = &mut entry.state;
        st.runs = st.runs.saturating_add(1);
        if let Some(e) = error {
            st.failures = st.failures.saturating_add(1);
            if e.is_timeout() {
                st.timeouts = st.timeouts.saturating_add(1);
            }
            st.last_error = Some(e.to_string());
        }
        st.last_run_ms = Some(finished_ms);
        st.is_running = false;
    }

    fn abandon(&self, index: usize, finished_ms: u64) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(index) else { return };
        let st = &mut entry.state;
        st.runs = st.runs.saturating_add(1);
        st.failures = st.failures.saturating_add(1);
        st.last_error = Some("run dropped before completion".to_string());
        st.last_run_ms = Some(finished_ms);
        st.is_running = false;
    }
}

/// Releases a claimed slot even when the tick future is dropped mid-run.
struct Claim<'a> {
    registry: &'a RegistryHandle,
    clock: &'a dyn Clock,
    index: usize,
    settled: bool,
}

impl Claim<'_> {
    fn settle(mut self, error: Option<&JobError>) -> u64 {
        let now = self.clock.now_ms();
        self.registry.finish(self.index, now, error);
        self.settled = true;
        now
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.registry.abandon(self.index, self.clock.now_ms());
        }
    }
}

/// One completed run, as returned by [`Scheduler::tick`].
#[derive(Debug)]
pub struct JobRun {
    pub kind: JobKind,
    pub started_ms: u64,
    pub finished_ms: u64,
    pub outcome: Result<(), JobError>,
}

#[derive(Debug)]
pub enum TickOutcome {
    /// Nothing was eligible.
    Idle,
    Ran(JobRun),
}

/// Cooperative single-slot scheduler over a fixed registry of recurring jobs.
pub struct Scheduler<R> {
    registry: RegistryHandle,
    runner: R,
    clock: Arc<dyn Clock>,
    tick_every: Duration,
    job_timeout: Duration,
}

impl<R: JobRunner> Scheduler<R> {
    pub fn new(
        specs: Vec<JobSpec>,
        runner: R,
        clock: Arc<dyn Clock>,
        tick_every: Duration,
        job_timeout: Duration,
    ) -> anyhow::Result<Self> {
        if specs.is_empty() {
            bail!("job registry is empty");
        }
        let mut seen = HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.kind) {
                bail!("job {} registered twice", spec.kind);
            }
        }
        if tick_every.is_zero() {
            bail!("tick period must be positive");
        }
        Ok(Self { registry: RegistryHandle::new(specs), runner, clock, tick_every, job_timeout })
    }

    pub fn handle(&self) -> RegistryHandle {
        self.registry.clone()
    }

    /// Run at most one eligible job to completion and update its bookkeeping.
    ///
    /// Errors and timeouts are logged and returned in the outcome; they never
    /// leave a job marked running.
    pub async fn tick(&mut self, now_ms: u64) -> TickOutcome {
        let Some((index, kind)) = self.registry.claim(now_ms) else {
            return TickOutcome::Idle;
        };
        let claim = Claim { registry: &self.registry, clock: self.clock.as_ref(), index, settled: false };
        debug!("job start name={} now={}", kind, now_ms);

        let outcome = match timeout(self.job_timeout, self.runner.run(kind)).await {
            Ok(res) => res,
            Err(_) => Err(JobError::Timeout(self.job_timeout)),
        };

        match &outcome {
            Ok(()) => debug!("job ok name={}", kind),
            Err(e) => warn!("job err name={} err={}", kind, e),
        }
        let finished_ms = claim.settle(outcome.as_ref().err());
        TickOutcome::Ran(JobRun { kind, started_ms: now_ms, finished_ms, outcome })
    }

    /// Stopping a running scheduler is not supported; this only logs.
    ///
    /// The loop ends when the process shutdown signal fires between ticks.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn stop(&self) {
        warn!("scheduler stop requested; not supported, ignoring");
    }
}

impl<R: JobRunner> Module for Scheduler<R> {
    fn name(&self) -> &'static str { "scheduler" }

    fn spawn(mut self: Box<Self>, mut ctx: ModuleCtx) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move {
            let mut tick = interval(self.tick_every);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("scheduler running jobs={} tick_ms={}", self.registry.snapshot().len(), self.tick_every.as_millis());

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let now = self.clock.now_ms();
                        self.tick(now).await;
                    }
                    changed = ctx.shutdown.changed() => {
                        if changed.is_err() || *ctx.shutdown.borrow() {
                            info!("scheduler stopping");
                            break;
                        }
                    }
                }
            }
            Ok(())
        })
    }
}
