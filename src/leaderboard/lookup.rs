use crate::{
    error::{BotError, BotResult},
    valorant::{
        client::RankApi,
        rank::{AccountInfo, PlayerIdentity, RankSnapshot},
        region::Region,
    },
};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::sync::Semaphore;

/// Live lookups sharing one concurrency budget. The upstream API rate
/// limits the whole key, so batch fetches, retries and commands all draw
/// from the same permits.
#[derive(Clone)]
pub struct RankLookup {
    api: Arc<dyn RankApi>,
    limiter: Arc<Semaphore>,
    timeout: Duration,
}

impl RankLookup {
    pub fn new(api: Arc<dyn RankApi>, max_concurrent: usize, timeout: Duration) -> RankLookup {
        RankLookup {
            api,
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout,
        }
    }

    async fn limited<T, F>(&self, call: F) -> BotResult<T>
    where
        F: Future<Output = BotResult<T>>,
    {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| BotError::Scheduler("Lookup limiter closed".to_string()))?;
        // Only the request itself is timed, not the wait for a permit.
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| BotError::Timeout)?
    }

    pub async fn rank(&self, region: Region, player: &PlayerIdentity) -> BotResult<RankSnapshot> {
        self.limited(self.api.fetch_rank(region, player)).await
    }

    pub async fn account(&self, player: &PlayerIdentity) -> BotResult<AccountInfo> {
        self.limited(self.api.fetch_account(player)).await
    }
}
