use crate::{
    error::BotResult,
    leaderboard::lookup::RankLookup,
    storage::{
        cache::RankCache,
        retry_queue::{RetryOutcome, RetryQueue, RetryQueueEntry, RetrySummary},
    },
    valorant::region::Region,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

struct RetryLoop {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

struct Inner {
    lookup: RankLookup,
    cache: RankCache,
    queue: RetryQueue,
    default_region: Region,
    interval: Duration,
    loops: Mutex<HashMap<String, RetryLoop>>,
    started: AtomicUsize,
}

/// Drives one background retry loop per guild. Every `interval` a loop
/// looks up the due entries of its guild queue and commits the outcomes.
#[derive(Clone)]
pub struct RetryScheduler {
    inner: Arc<Inner>,
}

impl RetryScheduler {
    pub fn new(
        lookup: RankLookup,
        cache: RankCache,
        queue: RetryQueue,
        default_region: Region,
        interval: Duration,
    ) -> RetryScheduler {
        RetryScheduler {
            inner: Arc::new(Inner {
                lookup,
                cache,
                queue,
                default_region,
                interval,
                loops: Mutex::new(HashMap::new()),
                started: AtomicUsize::new(0),
            }),
        }
    }

    /// Starts the loop of `guild` unless one is already running. Returns
    /// whether a new loop was spawned.
    pub fn start(&self, guild: &str) -> bool {
        let mut loops = match self.inner.loops.lock() {
            Ok(loops) => loops,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(running) = loops.get(guild) {
            if !running.handle.is_finished() {
                return false;
            }
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            self.inner.clone(),
            guild.to_string(),
            token.clone(),
        ));
        loops.insert(guild.to_string(), RetryLoop { token, handle });
        self.inner.started.fetch_add(1, Ordering::SeqCst);
        true
    }

    /// Signals the loop of `guild` to stop. It exits at its next sleep.
    pub fn stop(&self, guild: &str) -> bool {
        let removed = match self.inner.loops.lock() {
            Ok(mut loops) => loops.remove(guild),
            Err(poisoned) => poisoned.into_inner().remove(guild),
        };
        match removed {
            Some(retry_loop) => {
                retry_loop.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, guild: &str) -> bool {
        match self.inner.loops.lock() {
            Ok(loops) => loops
                .get(guild)
                .map(|l| !l.handle.is_finished())
                .unwrap_or_default(),
            Err(_) => false,
        }
    }

    pub fn active_loops(&self) -> usize {
        match self.inner.loops.lock() {
            Ok(loops) => loops.values().filter(|l| !l.handle.is_finished()).count(),
            Err(_) => 0,
        }
    }

    /// Number of loops spawned since creation.
    pub fn loops_started(&self) -> usize {
        self.inner.started.load(Ordering::SeqCst)
    }

    /// Starts a loop for every guild with a non-empty persisted queue.
    pub async fn resume_pending(&self) -> usize {
        let mut resumed = 0;
        for guild in self.inner.queue.pending_guilds().await {
            if self.start(&guild) {
                resumed += 1;
            }
        }
        if resumed > 0 {
            info!("Resumed retry loops for {resumed} guilds");
        }
        resumed
    }

    /// Stops every loop and waits for them to exit.
    pub async fn shutdown(&self) {
        let loops: Vec<RetryLoop> = match self.inner.loops.lock() {
            Ok(mut loops) => loops.drain().map(|(_, l)| l).collect(),
            Err(poisoned) => poisoned.into_inner().drain().map(|(_, l)| l).collect(),
        };
        for retry_loop in &loops {
            retry_loop.token.cancel();
        }
        for retry_loop in loops {
            if let Err(e) = retry_loop.handle.await {
                error!("Retry loop did not exit cleanly. {e}");
            }
        }
    }

    pub async fn run_cycle(&self, guild: &str) -> BotResult<RetrySummary> {
        self.inner.run_cycle_at(guild, Utc::now()).await
    }

    /// One pass over the queue of `guild` as if it were `now`.
    pub async fn run_cycle_at(&self, guild: &str, now: DateTime<Utc>) -> BotResult<RetrySummary> {
        self.inner.run_cycle_at(guild, now).await
    }
}

impl Inner {
    async fn run_cycle_at(&self, guild: &str, now: DateTime<Utc>) -> BotResult<RetrySummary> {
        let due = self.queue.due(guild, now).await;
        if due.is_empty() {
            return Ok(RetrySummary::default());
        }
        info!("Retrying {} rank lookups for guild {guild}", due.len());

        let outcomes = join_all(due.into_iter().map(|entry| self.retry(guild, entry))).await;
        let summary = self.queue.apply(guild, &outcomes, now).await?;

        if !summary.exhausted.is_empty() {
            warn!(
                "Gave up on {} players of guild {guild} after {} attempts: {}",
                summary.exhausted.len(),
                self.queue.max_attempts(),
                summary
                    .exhausted
                    .iter()
                    .map(|p| p.key())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        info!(
            "Retry cycle for guild {guild}: {} succeeded, {} rescheduled",
            summary.succeeded.len(),
            summary.rescheduled.len()
        );
        Ok(summary)
    }

    async fn retry(
        &self,
        guild: &str,
        entry: RetryQueueEntry,
    ) -> (RetryQueueEntry, RetryOutcome) {
        let region = entry.region.unwrap_or(self.default_region);
        let key = entry.player.key();

        let outcome = match self.lookup.rank(region, &entry.player).await {
            Ok(snapshot) => match self.cache.put(guild, &key, snapshot).await {
                Ok(()) => RetryOutcome::Succeeded,
                Err(e) => {
                    warn!("Retried rank of {key} could not be cached. {e}");
                    RetryOutcome::Failed
                }
            },
            Err(e) => {
                warn!("Retry for {key} failed. {e}");
                if let Err(e) = self.cache.mark_failed(guild, &key).await {
                    warn!("Could not record failed attempt for {key}. {e}");
                }
                RetryOutcome::Failed
            }
        };
        (entry, outcome)
    }
}

async fn run_loop(inner: Arc<Inner>, guild: String, token: CancellationToken) {
    info!("Retry loop started for guild {guild}");
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(inner.interval) => {}
        }
        if let Err(e) = inner.run_cycle_at(&guild, Utc::now()).await {
            error!("Retry cycle failed for guild {guild}. {e}");
        }
    }
    info!("Retry loop stopped for guild {guild}");
}
