// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Five-lane strict-priority dispatch scheduler.
//!
//! Lanes are scanned 1 (highest) through 5 (lowest); within a lane the
//! order is strict FIFO. Concurrency tracks fleet readiness (refreshed
//! every 50 ms), per-caller counts are decremented exactly once per
//! entry at terminal, and transient failures requeue at the head of
//! their lane with exponential backoff. A `NoBotsAvailable` rejection
//! never consumes an attempt.
//!
//! Dequeue runs under the state lock, which serializes the
//! check-and-dispatch step; handler invocations themselves run on
//! spawned tasks, up to `concurrency` at a time.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use floatd_core::error::FloatdError;
use floatd_core::link::InspectLink;
use floatd_core::types::DecoratedItem;

use crate::job::{Job, JobError};

/// Number of priority lanes. Priority 1 is the highest, 5 the lowest.
pub const LANES: usize = 5;

/// Retry budget per entry.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// How often concurrency is reconciled with fleet readiness.
const CONCURRENCY_TICK: Duration = Duration::from_millis(50);

/// Pause before requeueing after `NoBotsAvailable`, bounding the retry
/// spin while readiness catches up.
const NO_BOTS_REQUEUE_DELAY: Duration = Duration::from_millis(50);

/// One queued unit of work.
pub struct QueueEntry {
    pub link: InspectLink,
    pub price: Option<u64>,
    pub ip: String,
    /// Lane, 1..=5.
    pub priority: usize,
    pub attempts: u32,
    pub max_attempts: u32,
    pub job: Arc<Job>,
}

/// A successful dispatch: the resolved item and the pacing delay to
/// honor before the slot is reused.
pub struct DispatchOutcome {
    pub item: DecoratedItem,
    pub delay: Duration,
}

/// The scheduler's downstream: resolves one entry through the fleet.
#[async_trait]
pub trait InspectHandler: Send + Sync {
    async fn handle(&self, entry: &QueueEntry) -> Result<DispatchOutcome, FloatdError>;
}

/// Source of the fleet readiness count driving concurrency.
pub trait FleetHealth: Send + Sync {
    fn ready_count(&self) -> usize;
}

struct SchedState {
    lanes: [VecDeque<QueueEntry>; LANES],
    users: HashMap<String, usize>,
    processing: usize,
    concurrency: usize,
    paused: bool,
}

/// Multi-priority dispatch queue feeding the bot fleet.
pub struct Scheduler {
    handler: Arc<dyn InspectHandler>,
    state: Mutex<SchedState>,
}

impl Scheduler {
    /// Creates a paused scheduler; call [`Scheduler::start`] to begin
    /// dispatching.
    pub fn new(handler: Arc<dyn InspectHandler>) -> Arc<Self> {
        Arc::new(Self {
            handler,
            state: Mutex::new(SchedState {
                lanes: std::array::from_fn(|_| VecDeque::new()),
                users: HashMap::new(),
                processing: 0,
                concurrency: 0,
                paused: true,
            }),
        })
    }

    /// Unpauses and spawns the concurrency reconciliation tick.
    pub fn start(self: &Arc<Self>, health: Arc<dyn FleetHealth>, cancel: CancellationToken) {
        self.state.lock().expect("scheduler mutex poisoned").paused = false;
        let sched = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(CONCURRENCY_TICK);
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let grew = {
                            let mut st = sched.state.lock().expect("scheduler mutex poisoned");
                            let old = st.concurrency;
                            st.concurrency = health.ready_count();
                            st.concurrency > old
                        };
                        if grew {
                            sched.check_queue();
                        }
                    }
                    _ = cancel.cancelled() => break,
                }
            }
        });
    }

    /// Stops dispatching; queued entries stay put.
    pub fn pause(&self) {
        self.state.lock().expect("scheduler mutex poisoned").paused = true;
    }

    /// Adds an entry to the tail of its lane and accounts it to its
    /// caller. Admission limits are the gateway's job, checked before
    /// this point.
    pub fn enqueue(self: &Arc<Self>, entry: QueueEntry) {
        {
            let mut st = self.state.lock().expect("scheduler mutex poisoned");
            let lane = lane_index(entry.priority);
            *st.users.entry(entry.ip.clone()).or_insert(0) += 1;
            st.lanes[lane].push_back(entry);
        }
        self.check_queue();
    }

    /// Entries across all lanes.
    pub fn size(&self) -> usize {
        let st = self.state.lock().expect("scheduler mutex poisoned");
        st.lanes.iter().map(VecDeque::len).sum()
    }

    /// Entries currently dispatched to the handler (including pacing
    /// holds).
    pub fn processing_count(&self) -> usize {
        self.state.lock().expect("scheduler mutex poisoned").processing
    }

    pub fn concurrency(&self) -> usize {
        self.state.lock().expect("scheduler mutex poisoned").concurrency
    }

    /// Outstanding entries (queued + in-flight) for one caller.
    pub fn user_queued(&self, ip: &str) -> usize {
        self.state
            .lock()
            .expect("scheduler mutex poisoned")
            .users
            .get(ip)
            .copied()
            .unwrap_or(0)
    }

    /// Rejects every queued entry with `Shutdown` and pauses. In-flight
    /// entries finish on their own.
    pub fn drain_shutdown(&self) {
        let drained: Vec<QueueEntry> = {
            let mut st = self.state.lock().expect("scheduler mutex poisoned");
            st.paused = true;
            let mut drained = Vec::new();
            for lane in st.lanes.iter_mut() {
                drained.extend(lane.drain(..));
            }
            for entry in &drained {
                decrement_user(&mut st.users, &entry.ip);
            }
            drained
        };
        for entry in drained {
            entry
                .job
                .set_response(&entry.link.a, Err(JobError::from(&FloatdError::Shutdown)));
        }
    }

    /// Pops and dispatches while capacity allows. Runs the dequeue step
    /// under the lock; at most one caller at a time deschedules entries.
    fn check_queue(self: &Arc<Self>) {
        loop {
            let entry = {
                let mut st = self.state.lock().expect("scheduler mutex poisoned");
                if st.paused || st.processing >= st.concurrency {
                    return;
                }
                let Some(entry) = pop_highest(&mut st.lanes) else {
                    return;
                };
                st.processing += 1;
                entry
            };
            let sched = self.clone();
            tokio::spawn(async move {
                sched.dispatch(entry).await;
            });
        }
    }

    async fn dispatch(self: Arc<Self>, mut entry: QueueEntry) {
        let outcome = std::panic::AssertUnwindSafe(self.handler.handle(&entry))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                error!(asset_id = %entry.link.a, "handler panicked");
                Err(FloatdError::GenericBad)
            });

        match outcome {
            Ok(resolved) => {
                debug!(
                    asset_id = %entry.link.a,
                    priority = entry.priority,
                    delay_ms = resolved.delay.as_millis() as u64,
                    "entry resolved"
                );
                entry.job.set_response(&entry.link.a, Ok(resolved.item));
                self.finish_user(&entry.ip);
                if !resolved.delay.is_zero() {
                    tokio::time::sleep(resolved.delay).await;
                }
                self.release_slot();
            }
            Err(FloatdError::NoBotsAvailable) => {
                // Not a real attempt: the fleet was briefly saturated.
                debug!(asset_id = %entry.link.a, "no bots available, requeueing at head");
                tokio::time::sleep(NO_BOTS_REQUEUE_DELAY).await;
                {
                    let mut st = self.state.lock().expect("scheduler mutex poisoned");
                    let lane = lane_index(entry.priority);
                    st.lanes[lane].push_front(entry);
                }
                self.release_slot();
            }
            Err(e) => {
                entry.attempts += 1;
                if entry.attempts >= entry.max_attempts {
                    warn!(
                        asset_id = %entry.link.a,
                        attempts = entry.attempts,
                        error = %e,
                        "job failed"
                    );
                    entry.job.set_response(
                        &entry.link.a,
                        Err(JobError::from(&FloatdError::TtlExceeded)),
                    );
                    self.finish_user(&entry.ip);
                    self.release_slot();
                } else {
                    let backoff = Duration::from_millis(1_000u64 << (entry.attempts - 1));
                    warn!(
                        asset_id = %entry.link.a,
                        attempts = entry.attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "entry failed, retrying"
                    );
                    self.release_slot();
                    let sched = self.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(backoff).await;
                        {
                            let mut st =
                                sched.state.lock().expect("scheduler mutex poisoned");
                            let lane = lane_index(entry.priority);
                            st.lanes[lane].push_front(entry);
                        }
                        sched.check_queue();
                    });
                }
            }
        }
    }

    fn finish_user(&self, ip: &str) {
        let mut st = self.state.lock().expect("scheduler mutex poisoned");
        decrement_user(&mut st.users, ip);
    }

    fn release_slot(self: &Arc<Self>) {
        {
            let mut st = self.state.lock().expect("scheduler mutex poisoned");
            st.processing = st.processing.saturating_sub(1);
        }
        self.check_queue();
    }
}

fn lane_index(priority: usize) -> usize {
    priority.clamp(1, LANES) - 1
}

fn pop_highest(lanes: &mut [VecDeque<QueueEntry>; LANES]) -> Option<QueueEntry> {
    lanes.iter_mut().find_map(VecDeque::pop_front)
}

fn decrement_user(users: &mut HashMap<String, usize>, ip: &str) {
    if let Some(count) = users.get_mut(ip) {
        *count -= 1;
        if *count == 0 {
            users.remove(ip);
        }
    }
}
