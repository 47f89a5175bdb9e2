// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-credential session actor.
//!
//! Each bot owns one authenticated back-end session and its
//! game-coordinator subchannel, driven by a single task that consumes a
//! merged stream of control commands, driver events, and timers. The
//! actor enforces the session state machine, login backoff, scheduled
//! relogin, the single in-flight correlation slot, and per-bot pacing.
//!
//! State machine: Disconnected -> LoggingIn -> LoggedIn -> Ready -> Busy
//! -> Ready -> ..., with ShuttingDown as the absorbing branch.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use floatd_cache::ResultCache;
use floatd_config::BotSettings;
use floatd_core::error::FloatdError;
use floatd_core::link::InspectLink;
use floatd_core::traits::gc::{GcDriver, GcDriverFactory, GcEvent};
use floatd_core::types::{DecoratedItem, LoginCredential, RawItemInfo};
use floatd_gamedata::GameData;
use rand::Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// The app whose game coordinator answers inspect queries.
pub const APP_ID: u32 = 730;

/// Ceiling for exponential login backoff.
const MAX_LOGIN_BACKOFF: Duration = Duration::from_secs(300);
/// Base of the exponential login backoff formula.
const LOGIN_BACKOFF_BASE_SECS: u64 = 5;
/// A due relogin with work in flight retries at this pace.
const RELOG_DEFER: Duration = Duration::from_secs(1);
/// Upper bound on scheduled-relogin jitter.
const RELOG_JITTER_MAX_SECS: u64 = 240;
/// Back-end result code for login rate limiting.
const ERESULT_RATE_LIMIT: i32 = 84;
/// Result codes for login denials (bad auth/device/email codes). These
/// are reported loudly but keep retrying with backoff.
const ERESULT_LOGIN_DENIED: [i32; 4] = [61, 63, 65, 66];

/// States of the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    /// No session; the login poller owns the next step.
    Disconnected,
    /// Credentials sent; waiting for the back-end verdict.
    LoggingIn,
    /// Session up; game-coordinator subchannel not yet confirmed.
    LoggedIn,
    /// Game coordinator reachable; accepting inspects.
    Ready,
    /// One inspect in flight, correlated by asset id.
    Busy,
    /// Graceful shutdown in progress.
    ShuttingDown,
}

impl std::fmt::Display for BotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotState::Disconnected => write!(f, "disconnected"),
            BotState::LoggingIn => write!(f, "logging_in"),
            BotState::LoggedIn => write!(f, "logged_in"),
            BotState::Ready => write!(f, "ready"),
            BotState::Busy => write!(f, "busy"),
            BotState::ShuttingDown => write!(f, "shutting_down"),
        }
    }
}

/// Resolved per-bot policy, clamped where the wire contract demands it.
#[derive(Debug, Clone)]
pub struct BotPolicy {
    pub request_delay: Duration,
    pub request_ttl: Duration,
    pub connection_timeout: Duration,
    pub login_retry_delay: Duration,
    pub gc_reconnect_delay: Duration,
    pub max_login_attempts: u32,
    pub relogin_interval: Duration,
    /// Bound of the local backlog. The correlation slot itself is always
    /// single.
    pub queue_limit: usize,
}

impl BotPolicy {
    pub fn from_settings(settings: &BotSettings, bot: &str) -> Self {
        let mut queue_limit = settings.max_concurrent_requests;
        if queue_limit > 1 {
            warn!(
                bot = %bot,
                configured = queue_limit,
                "max_concurrent_requests > 1 is unsupported by the wire correlation, clamping to 1"
            );
            queue_limit = 1;
        }
        Self {
            request_delay: Duration::from_millis(settings.request_delay_ms),
            request_ttl: Duration::from_millis(settings.request_ttl_ms),
            connection_timeout: Duration::from_millis(settings.connection_timeout_ms),
            login_retry_delay: Duration::from_millis(settings.login_retry_delay_ms),
            gc_reconnect_delay: Duration::from_millis(settings.gc_reconnect_delay_ms),
            max_login_attempts: settings.max_login_attempts,
            relogin_interval: Duration::from_secs(settings.relogin_interval_secs),
            queue_limit: queue_limit.max(1),
        }
    }
}

/// A resolved inspect plus the pacing delay the dispatcher must honor
/// before reusing the slot.
#[derive(Debug)]
pub struct BotResponse {
    pub item: DecoratedItem,
    pub delay: Duration,
}

type InspectReply = oneshot::Sender<Result<BotResponse, FloatdError>>;

enum BotCommand {
    Inspect {
        link: InspectLink,
        price: Option<u64>,
        reply: InspectReply,
    },
    Relog,
}

/// Cheap clonable handle to a running bot actor.
#[derive(Clone)]
pub struct BotHandle {
    name: Arc<str>,
    ready: Arc<AtomicBool>,
    busy: Arc<AtomicBool>,
    control: mpsc::Sender<BotCommand>,
}

impl BotHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the bot holds a live game-coordinator session.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Whether the bot's slot (or pacing window) is occupied.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Resolves one inspect link through this bot.
    pub async fn inspect(
        &self,
        link: InspectLink,
        price: Option<u64>,
    ) -> Result<BotResponse, FloatdError> {
        let (reply, rx) = oneshot::channel();
        self.control
            .send(BotCommand::Inspect { link, price, reply })
            .await
            .map_err(|_| FloatdError::NotReady)?;
        rx.await.map_err(|_| FloatdError::NotReady)?
    }

    /// Requests a graceful relog. Best-effort.
    pub async fn relog(&self) {
        let _ = self.control.send(BotCommand::Relog).await;
    }
}

/// Spawns the actor task for one credential and returns its handle.
pub fn spawn_bot(
    credential: LoginCredential,
    proxy: Option<String>,
    settings: &BotSettings,
    factory: Arc<dyn GcDriverFactory>,
    cache: Arc<ResultCache>,
    game_data: Arc<GameData>,
    cancel: CancellationToken,
) -> BotHandle {
    let name: Arc<str> = credential.username.clone().into();
    let policy = BotPolicy::from_settings(settings, &name);
    let ready = Arc::new(AtomicBool::new(false));
    let busy = Arc::new(AtomicBool::new(false));
    let (control_tx, control_rx) = mpsc::channel(16);

    let runner = BotRunner {
        name: name.clone(),
        credential,
        proxy,
        policy,
        factory,
        cache,
        game_data,
        ready_flag: ready.clone(),
        busy_flag: busy.clone(),
        control_rx,
        cancel,
        state: BotState::Disconnected,
        driver: None,
        events_rx: None,
        consecutive_failures: 0,
        next_login_at: Instant::now(),
        login_deadline: None,
        gc_retry_at: None,
        relog_at: None,
        pacing_until: None,
        current: None,
        backlog: VecDeque::new(),
    };
    tokio::spawn(runner.run());

    BotHandle {
        name,
        ready,
        busy,
        control: control_tx,
    }
}

struct CurrentRequest {
    link: InspectLink,
    price: Option<u64>,
    reply: InspectReply,
    deadline: Instant,
    dispatched_at: Instant,
}

struct PendingInspect {
    link: InspectLink,
    price: Option<u64>,
    reply: InspectReply,
}

enum Wake {
    Cancelled,
    Command(Option<BotCommand>),
    Event(Option<GcEvent>),
    Timer,
}

struct BotRunner {
    name: Arc<str>,
    credential: LoginCredential,
    proxy: Option<String>,
    policy: BotPolicy,
    factory: Arc<dyn GcDriverFactory>,
    cache: Arc<ResultCache>,
    game_data: Arc<GameData>,
    ready_flag: Arc<AtomicBool>,
    busy_flag: Arc<AtomicBool>,
    control_rx: mpsc::Receiver<BotCommand>,
    cancel: CancellationToken,

    state: BotState,
    driver: Option<Arc<dyn GcDriver>>,
    events_rx: Option<mpsc::Receiver<GcEvent>>,
    consecutive_failures: u32,
    next_login_at: Instant,
    login_deadline: Option<Instant>,
    gc_retry_at: Option<Instant>,
    relog_at: Option<Instant>,
    pacing_until: Option<Instant>,
    current: Option<CurrentRequest>,
    backlog: VecDeque<PendingInspect>,
}

async fn next_event(rx: &mut Option<mpsc::Receiver<GcEvent>>) -> Option<GcEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

impl BotRunner {
    async fn run(mut self) {
        info!(bot = %self.name, "bot task started");
        loop {
            let deadline = self.next_deadline();
            let wake = {
                let BotRunner {
                    cancel,
                    control_rx,
                    events_rx,
                    ..
                } = &mut self;
                tokio::select! {
                    _ = cancel.cancelled() => Wake::Cancelled,
                    cmd = control_rx.recv() => Wake::Command(cmd),
                    ev = next_event(events_rx) => Wake::Event(ev),
                    _ = tokio::time::sleep_until(deadline) => Wake::Timer,
                }
            };
            match wake {
                Wake::Cancelled | Wake::Command(None) => {
                    self.shutdown().await;
                    break;
                }
                Wake::Command(Some(cmd)) => self.handle_command(cmd).await,
                Wake::Event(Some(ev)) => self.handle_event(ev).await,
                Wake::Event(None) => {
                    self.on_disconnected(0, Some("event channel closed".to_string()))
                        .await;
                }
                Wake::Timer => self.handle_timers().await,
            }
            self.refresh_flags();
        }
        self.refresh_flags();
        info!(bot = %self.name, "bot task stopped");
    }

    /// Earliest pending deadline across login poll, login timeout,
    /// in-flight TTL, pacing, GC reconnect, and scheduled relogin.
    fn next_deadline(&self) -> Instant {
        let mut deadline = Instant::now() + Duration::from_secs(600);
        match self.state {
            BotState::Disconnected => deadline = deadline.min(self.next_login_at),
            BotState::LoggingIn => {
                if let Some(t) = self.login_deadline {
                    deadline = deadline.min(t);
                }
            }
            _ => {}
        }
        if let Some(cur) = &self.current {
            deadline = deadline.min(cur.deadline);
        }
        for t in [self.pacing_until, self.gc_retry_at, self.relog_at]
            .into_iter()
            .flatten()
        {
            deadline = deadline.min(t);
        }
        deadline
    }

    async fn handle_timers(&mut self) {
        let now = Instant::now();

        if self.state == BotState::Disconnected && now >= self.next_login_at {
            self.begin_login().await;
        }

        if self.state == BotState::LoggingIn
            && self.login_deadline.is_some_and(|t| now >= t)
        {
            warn!(bot = %self.name, "login timed out");
            self.on_login_failure();
        }

        if self.current.as_ref().is_some_and(|c| now >= c.deadline) {
            self.timeout_current().await;
        }

        if self.pacing_until.is_some_and(|t| now >= t) {
            self.pacing_until = None;
            self.drain_backlog().await;
        }

        if self.gc_retry_at.is_some_and(|t| now >= t) {
            self.gc_retry_at = None;
            if self.state == BotState::LoggedIn {
                if let Some(driver) = self.driver.clone() {
                    if let Err(e) = driver.games_played(&[APP_ID]).await {
                        warn!(bot = %self.name, error = %e, "games_played failed");
                        self.gc_retry_at = Some(Instant::now() + self.policy.gc_reconnect_delay);
                    }
                }
            }
        }

        if self.relog_at.is_some_and(|t| now >= t) {
            self.maybe_relog().await;
        }
    }

    async fn begin_login(&mut self) {
        let (events_tx, events_rx) = mpsc::channel(64);
        let driver = match self.factory.create(self.proxy.as_deref(), events_tx) {
            Ok(driver) => driver,
            Err(e) => {
                error!(bot = %self.name, error = %e, "driver creation failed");
                self.on_login_failure();
                return;
            }
        };
        debug!(bot = %self.name, attempt_failures = self.consecutive_failures, "logging in");
        self.state = BotState::LoggingIn;
        self.login_deadline = Some(Instant::now() + self.policy.connection_timeout);
        self.events_rx = Some(events_rx);
        match driver.log_on(&self.credential).await {
            Ok(()) => self.driver = Some(driver),
            Err(e) => {
                warn!(bot = %self.name, error = %e, "log_on failed");
                self.on_login_failure();
            }
        }
    }

    fn on_login_failure(&mut self) {
        self.consecutive_failures += 1;
        self.driver = None;
        self.events_rx = None;
        self.login_deadline = None;
        self.state = BotState::Disconnected;
        let backoff = self.login_backoff();
        warn!(
            bot = %self.name,
            failures = self.consecutive_failures,
            backoff_secs = backoff.as_secs(),
            "login failed, scheduling retry"
        );
        self.next_login_at = Instant::now() + backoff;
    }

    /// `login_retry_delay` up to the failure threshold, then
    /// `min(300s, 5s * 2^(failures - max_attempts))`.
    fn login_backoff(&self) -> Duration {
        if self.consecutive_failures <= self.policy.max_login_attempts {
            self.policy.login_retry_delay
        } else {
            let exp = (self.consecutive_failures - self.policy.max_login_attempts).min(10);
            Duration::from_secs(LOGIN_BACKOFF_BASE_SECS << exp).min(MAX_LOGIN_BACKOFF)
        }
    }

    async fn handle_event(&mut self, event: GcEvent) {
        match event {
            GcEvent::LoggedOn => {
                info!(bot = %self.name, "logged on");
                self.state = BotState::LoggedIn;
                self.login_deadline = None;
                self.consecutive_failures = 0;
            }
            GcEvent::OwnershipCached { owns_app } => {
                let Some(driver) = self.driver.clone() else {
                    return;
                };
                if !owns_app {
                    info!(bot = %self.name, app = APP_ID, "requesting free license");
                    if let Err(e) = driver.request_free_license(&[APP_ID]).await {
                        warn!(bot = %self.name, error = %e, "free license request failed");
                    }
                }
                if let Err(e) = driver.games_played(&[APP_ID]).await {
                    warn!(bot = %self.name, error = %e, "games_played failed");
                    self.gc_retry_at = Some(Instant::now() + self.policy.gc_reconnect_delay);
                }
            }
            GcEvent::ConnectedToGc => {
                info!(bot = %self.name, "game coordinator session established");
                self.state = BotState::Ready;
                self.schedule_relog();
                self.drain_backlog().await;
            }
            GcEvent::DisconnectedFromGc { reason } => {
                warn!(bot = %self.name, reason = %reason, "game coordinator dropped");
                if let Some(cur) = self.current.take() {
                    let _ = cur
                        .reply
                        .send(Err(FloatdError::Session("gc disconnected".to_string())));
                }
                if matches!(self.state, BotState::Ready | BotState::Busy) {
                    self.state = BotState::LoggedIn;
                }
                self.gc_retry_at = Some(Instant::now() + self.policy.gc_reconnect_delay);
            }
            GcEvent::SessionError(message) => {
                warn!(bot = %self.name, error = %message, "session error");
                self.on_disconnected(0, Some(message)).await;
            }
            GcEvent::Disconnected { eresult, message } => {
                self.on_disconnected(eresult, message).await;
            }
            GcEvent::InspectItemInfo(raw) => self.on_item_info(raw).await,
        }
    }

    /// Correlates by echoed item id; anything else is dropped.
    async fn on_item_info(&mut self, raw: RawItemInfo) {
        let matches_current = self
            .current
            .as_ref()
            .is_some_and(|cur| cur.link.a == raw.itemid);
        if !matches_current {
            debug!(
                bot = %self.name,
                itemid = %raw.itemid,
                "dropping uncorrelated iteminfo"
            );
            return;
        }
        let cur = self.current.take().expect("checked above");

        let mut item = DecoratedItem::from_raw(&cur.link, raw);
        self.game_data.annotate(&mut item);
        let rank = self.cache.get_rank(&item.a);
        item.low_rank = rank.low_rank;
        item.high_rank = rank.high_rank;
        if let Some(price) = cur.price {
            item.price = Some(price);
        }
        self.cache.insert(item.clone(), cur.price);

        let delay = self
            .policy
            .request_delay
            .saturating_sub(cur.dispatched_at.elapsed());
        self.state = BotState::Ready;
        self.pacing_until = if delay.is_zero() {
            None
        } else {
            Some(Instant::now() + delay)
        };
        debug!(bot = %self.name, asset_id = %item.a, delay_ms = delay.as_millis() as u64, "inspect resolved");
        let _ = cur.reply.send(Ok(BotResponse { item, delay }));
        if self.pacing_until.is_none() {
            self.drain_backlog().await;
        }
    }

    async fn timeout_current(&mut self) {
        let Some(cur) = self.current.take() else {
            return;
        };
        warn!(bot = %self.name, asset_id = %cur.link.a, "inspect timed out");
        self.state = BotState::Ready;
        let _ = cur.reply.send(Err(FloatdError::Timeout));
        self.drain_backlog().await;
    }

    async fn on_disconnected(&mut self, eresult: i32, message: Option<String>) {
        if self.state == BotState::Disconnected && self.driver.is_none() {
            return;
        }
        warn!(
            bot = %self.name,
            eresult,
            message = message.as_deref().unwrap_or(""),
            "session disconnected"
        );
        let was_logging_in = self.state == BotState::LoggingIn;

        if let Some(cur) = self.current.take() {
            let _ = cur
                .reply
                .send(Err(FloatdError::Session("session dropped".to_string())));
        }
        while let Some(pending) = self.backlog.pop_front() {
            let _ = pending.reply.send(Err(FloatdError::NotReady));
        }

        self.driver = None;
        self.events_rx = None;
        self.login_deadline = None;
        self.gc_retry_at = None;
        self.relog_at = None;
        self.pacing_until = None;
        self.state = BotState::Disconnected;

        let delay = if eresult == ERESULT_RATE_LIMIT {
            self.consecutive_failures += 1;
            error!(bot = %self.name, "login rate limited, applying maximum backoff");
            MAX_LOGIN_BACKOFF
        } else if ERESULT_LOGIN_DENIED.contains(&eresult) {
            self.consecutive_failures += 1;
            error!(bot = %self.name, eresult, "login denied by back-end");
            self.login_backoff()
        } else if was_logging_in {
            self.consecutive_failures += 1;
            self.login_backoff()
        } else {
            self.policy.login_retry_delay
        };
        self.next_login_at = Instant::now() + delay;
    }

    async fn handle_command(&mut self, command: BotCommand) {
        match command {
            BotCommand::Inspect { link, price, reply } => {
                if !matches!(self.state, BotState::Ready | BotState::Busy) {
                    let _ = reply.send(Err(FloatdError::NotReady));
                    return;
                }
                if self.can_dispatch() {
                    self.dispatch(link, price, reply).await;
                } else if self.backlog.len() < self.policy.queue_limit {
                    self.backlog.push_back(PendingInspect { link, price, reply });
                } else {
                    let _ = reply.send(Err(FloatdError::NotReady));
                }
            }
            BotCommand::Relog => self.maybe_relog().await,
        }
    }

    fn can_dispatch(&self) -> bool {
        self.state == BotState::Ready
            && self.current.is_none()
            && self.pacing_until.is_none_or(|t| t <= Instant::now())
    }

    async fn dispatch(&mut self, link: InspectLink, price: Option<u64>, reply: InspectReply) {
        let Some(driver) = self.driver.clone() else {
            let _ = reply.send(Err(FloatdError::NotReady));
            return;
        };
        let now = Instant::now();
        match driver.inspect_item(link.owner(), &link.a, &link.d).await {
            Ok(()) => {
                debug!(bot = %self.name, asset_id = %link.a, "inspect dispatched");
                self.current = Some(CurrentRequest {
                    link,
                    price,
                    reply,
                    deadline: now + self.policy.request_ttl,
                    dispatched_at: now,
                });
                self.state = BotState::Busy;
            }
            Err(e) => {
                warn!(bot = %self.name, error = %e, "inspect send failed");
                let _ = reply.send(Err(FloatdError::Session(format!(
                    "inspect send failed: {e}"
                ))));
            }
        }
    }

    async fn drain_backlog(&mut self) {
        while self.can_dispatch() {
            let Some(pending) = self.backlog.pop_front() else {
                break;
            };
            self.dispatch(pending.link, pending.price, pending.reply)
                .await;
        }
    }

    fn schedule_relog(&mut self) {
        let jitter = rand::thread_rng().gen_range(0..=RELOG_JITTER_MAX_SECS);
        self.relog_at =
            Some(Instant::now() + self.policy.relogin_interval + Duration::from_secs(jitter));
    }

    /// Graceful relog when the session is idle; otherwise defer and try
    /// again shortly.
    async fn maybe_relog(&mut self) {
        if self.state == BotState::Ready && self.current.is_none() {
            info!(bot = %self.name, "relogging");
            while let Some(pending) = self.backlog.pop_front() {
                let _ = pending.reply.send(Err(FloatdError::NotReady));
            }
            if let Some(driver) = self.driver.take() {
                driver.log_off().await;
            }
            self.events_rx = None;
            self.gc_retry_at = None;
            self.relog_at = None;
            self.pacing_until = None;
            self.state = BotState::Disconnected;
            self.next_login_at = Instant::now();
        } else if self.state != BotState::ShuttingDown {
            self.relog_at = Some(Instant::now() + RELOG_DEFER);
        }
    }

    async fn shutdown(&mut self) {
        self.state = BotState::ShuttingDown;
        if let Some(cur) = self.current.take() {
            let _ = cur.reply.send(Err(FloatdError::Shutdown));
        }
        while let Some(pending) = self.backlog.pop_front() {
            let _ = pending.reply.send(Err(FloatdError::Shutdown));
        }
        if let Some(driver) = self.driver.take() {
            driver.log_off().await;
            info!(bot = %self.name, "logged off");
        }
        self.events_rx = None;
    }

    fn refresh_flags(&self) {
        let ready = matches!(self.state, BotState::Ready | BotState::Busy);
        self.ready_flag.store(ready, Ordering::SeqCst);
        let busy = self.current.is_some()
            || !self.backlog.is_empty()
            || self.pacing_until.is_some_and(|t| t > Instant::now());
        self.busy_flag.store(busy, Ordering::SeqCst);
    }
}
