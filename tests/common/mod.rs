#![allow(dead_code)]

use async_trait::async_trait;
use rankbot::{
    error::{BotError, BotResult},
    leaderboard::lookup::RankLookup,
    storage::{cache::RankCache, retry_queue::RetryQueue, JsonStore},
    valorant::{
        client::RankApi,
        rank::{AccountInfo, PlayerIdentity, RankSnapshot},
        region::Region,
    },
};
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

#[derive(Debug, Clone)]
pub enum Outcome {
    Rank(RankSnapshot),
    RateLimited,
    NotFound,
    Upstream(u16),
    // Never answers
    Hang,
}

impl Outcome {
    fn into_result(self, player: &PlayerIdentity) -> BotResult<RankSnapshot> {
        match self {
            Outcome::Rank(snapshot) => Ok(snapshot),
            Outcome::RateLimited => Err(BotError::RateLimited),
            Outcome::NotFound => Err(BotError::NotFound(player.key())),
            Outcome::Upstream(status) => Err(BotError::Upstream(status)),
            Outcome::Hang => unreachable!(),
        }
    }
}

pub fn snapshot(tier: &str, rr: i64) -> RankSnapshot {
    RankSnapshot {
        tier_name: tier.to_string(),
        rr,
        ..RankSnapshot::unrated()
    }
}

pub fn player(name: &str) -> PlayerIdentity {
    PlayerIdentity::new(name, "EU1")
}

/// Scripted rank API. Players without a script get `Gold 1`.
#[derive(Default)]
pub struct MockApi {
    scripts: Mutex<HashMap<String, VecDeque<Outcome>>>,
    always: Mutex<HashMap<String, Outcome>>,
    unknown_accounts: Mutex<HashSet<String>>,
    delay: Duration,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockApi {
    pub fn new() -> MockApi {
        MockApi::default()
    }

    pub fn with_delay(delay: Duration) -> MockApi {
        MockApi {
            delay,
            ..MockApi::default()
        }
    }

    /// Answers for the next calls for `player`, in order.
    pub fn script(&self, player: &PlayerIdentity, outcomes: Vec<Outcome>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(player.key(), outcomes.into());
    }

    pub fn always(&self, player: &PlayerIdentity, outcome: Outcome) {
        self.always.lock().unwrap().insert(player.key(), outcome);
    }

    pub fn unknown_account(&self, player: &PlayerIdentity) {
        self.unknown_accounts.lock().unwrap().insert(player.key());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_outcome(&self, player: &PlayerIdentity) -> Outcome {
        let key = player.key();
        if let Some(outcome) = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(|queue| queue.pop_front())
        {
            return outcome;
        }
        self.always
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Outcome::Rank(snapshot("Gold 1", 10)))
    }
}

// Leaves the gauge on drop, so calls abandoned by a timeout are counted out too.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(gauge: &'a AtomicUsize, max: &AtomicUsize) -> InFlight<'a> {
        let current = gauge.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(current, Ordering::SeqCst);
        InFlight(gauge)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RankApi for MockApi {
    async fn fetch_account(&self, player: &PlayerIdentity) -> BotResult<AccountInfo> {
        if self.unknown_accounts.lock().unwrap().contains(&player.key()) {
            return Err(BotError::NotFound(player.key()));
        }
        Ok(AccountInfo {
            puuid: format!("puuid-{}", player.key()),
            name: player.name.clone(),
            tag: player.tag.clone(),
            region: Some("eu".to_string()),
            account_level: Some(100),
        })
    }

    async fn fetch_rank(&self, _region: Region, player: &PlayerIdentity) -> BotResult<RankSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(&self.in_flight, &self.max_in_flight);

        let outcome = self.next_outcome(player);
        if let Outcome::Hang = outcome {
            tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
        } else if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match outcome {
            Outcome::Hang => Err(BotError::Timeout),
            other => other.into_result(player),
        }
    }
}

pub struct Stores {
    pub dir: tempfile::TempDir,
    pub store: JsonStore,
    pub cache: RankCache,
    pub queue: RetryQueue,
}

pub fn stores() -> Stores {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonStore::new(dir.path());
    let cache = RankCache::new(store.clone(), Duration::from_secs(3600));
    let queue = RetryQueue::new(store.clone(), Duration::from_secs(120), 3);
    Stores {
        dir,
        store,
        cache,
        queue,
    }
}

pub fn lookup(api: Arc<MockApi>, max_concurrent: usize, timeout: Duration) -> RankLookup {
    RankLookup::new(api, max_concurrent, timeout)
}
