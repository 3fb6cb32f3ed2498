use crate::{
    error::{BotError, BotResult},
    valorant::{
        rank::{AccountInfo, PlayerIdentity, RankSnapshot, UNRATED},
        region::Region,
    },
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::{fmt, time::Duration};
use tracing::debug;

/// Rank lookups against the upstream API. One request per call, no retry.
#[async_trait]
pub trait RankApi: Send + Sync {
    async fn fetch_account(&self, player: &PlayerIdentity) -> BotResult<AccountInfo>;

    async fn fetch_rank(&self, region: Region, player: &PlayerIdentity)
        -> BotResult<RankSnapshot>;
}

enum Endpoint<'a> {
    Account(&'a PlayerIdentity),
    Mmr(Region, &'a PlayerIdentity),
}

impl Endpoint<'_> {
    fn segments(&self) -> Vec<String> {
        match self {
            Endpoint::Account(player) => vec![
                "v2".to_string(),
                "account".to_string(),
                player.name.clone(),
                player.tag.clone(),
            ],
            Endpoint::Mmr(region, player) => vec![
                "v3".to_string(),
                "mmr".to_string(),
                region.to_string(),
                "pc".to_string(),
                player.name.clone(),
                player.tag.clone(),
            ],
        }
    }
}

impl fmt::Display for Endpoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Endpoint::Account(player) => {
                write!(f, "/v2/account/{}/{}", player.name, player.tag)
            }
            Endpoint::Mmr(region, player) => {
                write!(f, "/v3/mmr/{}/pc/{}/{}", region, player.name, player.tag)
            }
        }
    }
}

pub struct HenrikDev {
    http_client: Client,
    base_url: Url,
    api_key: String,
    season: Option<String>,
}

impl HenrikDev {
    pub fn new(base_url: &str, timeout: Duration, api_key: String) -> BotResult<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        let base_url = Url::parse(base_url)
            .map_err(|e| BotError::Config(format!("Invalid API base url '{base_url}'. {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(BotError::Config(format!(
                "API base url '{base_url}' cannot hold a path"
            )));
        }
        Ok(Self {
            http_client,
            base_url,
            api_key,
            season: None,
        })
    }

    /// Restricts rank lookups to a given act, e.g. `e9a1`.
    pub fn with_season(mut self, season: impl Into<String>) -> Self {
        self.season = Some(season.into());
        self
    }

    fn url(&self, endpoint: &Endpoint) -> BotResult<Url> {
        let mut url = self.base_url.clone();
        {
            // Segments are percent-encoded, names may contain spaces or unicode.
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| BotError::Parse(format!("Cannot build url for {endpoint}")))?;
            segments.pop_if_empty();
            segments.extend(endpoint.segments());
        }
        Ok(url)
    }

    async fn get(&self, endpoint: &Endpoint<'_>, subject: &PlayerIdentity) -> BotResult<String> {
        let url = self.url(endpoint)?;
        debug!("GET {endpoint}");

        let mut request = self
            .http_client
            .get(url)
            .header("Authorization", self.api_key.as_str());

        if let (Endpoint::Mmr(..), Some(season)) = (endpoint, &self.season) {
            request = request.query(&[("season", season)]);
        }
        let response = request.send().await?;

        match response.status() {
            StatusCode::OK => response
                .text()
                .await
                .map_err(|e| BotError::Parse(e.to_string())),
            status => Err(BotError::from_status(status, &subject.key())),
        }
    }

    fn parse_account(account: &str) -> BotResult<AccountInfo> {
        // Response from the account API.
        // Structs defined here as they are only used by this function.
        #[derive(Debug, Deserialize)]
        struct AccountResponse {
            data: Option<AccountData>,
        }

        #[derive(Debug, Deserialize)]
        struct AccountData {
            puuid: String,
            name: String,
            tag: String,
            region: Option<String>,
            account_level: Option<u64>,
        }

        let parsed = serde_json::from_str::<AccountResponse>(account)
            .map_err(|e| BotError::Parse(format!("Account payload. {e}")))?;
        // A 200 without data means the account does not exist.
        let data = parsed
            .data
            .ok_or_else(|| BotError::NotFound("account data missing".to_string()))?;

        Ok(AccountInfo {
            puuid: data.puuid,
            name: data.name,
            tag: data.tag,
            region: data.region,
            account_level: data.account_level,
        })
    }

    fn parse_rank(mmr: &str) -> BotResult<RankSnapshot> {
        // Response from the v3 MMR API, keeping only what we display.
        #[derive(Debug, Deserialize)]
        struct MmrResponse {
            data: Option<MmrData>,
        }

        #[derive(Debug, Deserialize)]
        struct MmrData {
            current: Option<MmrCurrent>,
            peak: Option<MmrPeak>,
        }

        #[derive(Debug, Deserialize)]
        struct MmrCurrent {
            tier: Option<MmrTier>,
            rr: Option<i64>,
            leaderboard_placement: Option<MmrPlacement>,
        }

        #[derive(Debug, Deserialize)]
        struct MmrPeak {
            tier: Option<MmrTier>,
            rr: Option<i64>,
        }

        #[derive(Debug, Deserialize)]
        struct MmrTier {
            name: Option<String>,
        }

        #[derive(Debug, Deserialize)]
        struct MmrPlacement {
            rank: Option<u64>,
        }

        fn tier_name(tier: Option<MmrTier>) -> String {
            tier.and_then(|t| t.name)
                .unwrap_or_else(|| UNRATED.to_string())
        }

        let parsed = serde_json::from_str::<MmrResponse>(mmr)
            .map_err(|e| BotError::Parse(format!("MMR payload. {e}")))?;
        let data = parsed
            .data
            .ok_or_else(|| BotError::Parse("MMR payload without data".to_string()))?;

        let (tier_name_current, rr, leaderboard_rank) = match data.current {
            Some(current) => (
                tier_name(current.tier),
                current.rr.unwrap_or_default(),
                current.leaderboard_placement.and_then(|p| p.rank),
            ),
            None => (UNRATED.to_string(), 0, None),
        };
        let (peak_tier, peak_rr) = match data.peak {
            Some(peak) => (tier_name(peak.tier), peak.rr.unwrap_or_default()),
            None => (UNRATED.to_string(), 0),
        };

        Ok(RankSnapshot {
            tier_name: tier_name_current,
            rr,
            peak_tier,
            peak_rr,
            leaderboard_rank,
        })
    }
}

#[async_trait]
impl RankApi for HenrikDev {
    async fn fetch_account(&self, player: &PlayerIdentity) -> BotResult<AccountInfo> {
        let endpoint = Endpoint::Account(player);
        let resp = self.get(&endpoint, player).await?;
        HenrikDev::parse_account(&resp)
    }

    async fn fetch_rank(
        &self,
        region: Region,
        player: &PlayerIdentity,
    ) -> BotResult<RankSnapshot> {
        let endpoint = Endpoint::Mmr(region, player);
        let resp = self.get(&endpoint, player).await?;
        HenrikDev::parse_rank(&resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_percent_encoded() {
        let client = HenrikDev::new(
            "https://api.example.com/valorant",
            Duration::from_secs(1),
            "key".to_string(),
        )
        .unwrap();
        let player = PlayerIdentity::new("Player Name", "JP1");

        let url = client.url(&Endpoint::Mmr(Region::Ap, &player)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/valorant/v3/mmr/ap/pc/Player%20Name/JP1"
        );

        let url = client.url(&Endpoint::Account(&player)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/valorant/v2/account/Player%20Name/JP1"
        );
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            HenrikDev::new("not a url", Duration::from_secs(1), "key".to_string()),
            Err(BotError::Config(_))
        ));
    }

    #[test]
    fn parses_mmr_payload() {
        let payload = r#"{
            "status": 200,
            "data": {
                "account": {"name": "Foo", "tag": "EUW"},
                "peak": {"tier": {"id": 24, "name": "Immortal 1"}},
                "current": {
                    "tier": {"id": 21, "name": "Ascendant 1"},
                    "rr": 42,
                    "leaderboard_placement": {"rank": 1234, "updated_at": "2024-01-01T00:00:00Z"}
                }
            }
        }"#;

        let snapshot = HenrikDev::parse_rank(payload).unwrap();
        assert_eq!(snapshot.tier_name, "Ascendant 1");
        assert_eq!(snapshot.rr, 42);
        assert_eq!(snapshot.peak_tier, "Immortal 1");
        assert_eq!(snapshot.peak_rr, 0);
        assert_eq!(snapshot.leaderboard_rank, Some(1234));
    }

    #[test]
    fn missing_current_is_unrated() {
        let snapshot =
            HenrikDev::parse_rank(r#"{"data": {"current": null, "peak": null}}"#).unwrap();
        assert_eq!(snapshot, RankSnapshot::unrated());
    }

    #[test]
    fn account_without_data_is_not_found() {
        assert!(matches!(
            HenrikDev::parse_account(r#"{"status": 200, "data": null}"#),
            Err(BotError::NotFound(_))
        ));
        assert!(matches!(
            HenrikDev::parse_account("not json"),
            Err(BotError::Parse(_))
        ));
    }
}
