// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fleet controller: owns the bot handles, routes inspects to a free
//! bot, and exposes aggregate health.

use async_trait::async_trait;
use rand::Rng;
use tracing::info;

use floatd_core::error::FloatdError;
use floatd_core::link::InspectLink;
use floatd_queue::{DispatchOutcome, FleetHealth, InspectHandler, QueueEntry};

use crate::bot::{BotHandle, BotResponse};

/// Routes inspect requests across the fleet.
#[derive(Default)]
pub struct BotController {
    bots: Vec<BotHandle>,
}

impl BotController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a spawned bot. Called during wiring, before traffic.
    pub fn add_bot(&mut self, handle: BotHandle) {
        info!(bot = handle.name(), "bot registered");
        self.bots.push(handle);
    }

    /// Whether any bots are configured at all.
    pub fn has_any(&self) -> bool {
        !self.bots.is_empty()
    }

    pub fn bot_count(&self) -> usize {
        self.bots.len()
    }

    /// Bots holding a live game-coordinator session.
    pub fn ready_count(&self) -> usize {
        self.bots.iter().filter(|b| b.is_ready()).count()
    }

    /// Resolves one link through a randomly chosen free bot.
    ///
    /// `SteamOffline` when no bot is ready at all; `NoBotsAvailable` when
    /// every ready bot is occupied (the scheduler retries the latter
    /// without consuming an attempt).
    pub async fn lookup_float(
        &self,
        link: &InspectLink,
        price: Option<u64>,
    ) -> Result<BotResponse, FloatdError> {
        if self.ready_count() == 0 {
            return Err(FloatdError::SteamOffline);
        }
        let free: Vec<&BotHandle> = self
            .bots
            .iter()
            .filter(|b| b.is_ready() && !b.is_busy())
            .collect();
        if free.is_empty() {
            return Err(FloatdError::NoBotsAvailable);
        }
        let bot = free[rand::thread_rng().gen_range(0..free.len())];
        match bot.inspect(link.clone(), price).await {
            // The bot lost its slot between selection and dispatch.
            Err(FloatdError::NotReady) => Err(FloatdError::NoBotsAvailable),
            other => other,
        }
    }

    /// Admin operation: ask every healthy bot to relog gracefully.
    pub async fn try_relog_all(&self) {
        for bot in self.bots.iter().filter(|b| b.is_ready()) {
            bot.relog().await;
        }
    }
}

#[async_trait]
impl InspectHandler for BotController {
    async fn handle(&self, entry: &QueueEntry) -> Result<DispatchOutcome, FloatdError> {
        let resp = self.lookup_float(&entry.link, entry.price).await?;
        Ok(DispatchOutcome {
            item: resp.item,
            delay: resp.delay,
        })
    }
}

impl FleetHealth for BotController {
    fn ready_count(&self) -> usize {
        BotController::ready_count(self)
    }
}
