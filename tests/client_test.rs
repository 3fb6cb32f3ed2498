use rankbot::{
    error::BotError,
    valorant::{
        client::{HenrikDev, RankApi},
        rank::PlayerIdentity,
        region::Region,
    },
};
use serde_json::json;
use std::time::Duration;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

async fn client(server: &MockServer) -> HenrikDev {
    HenrikDev::new(
        &format!("{}/valorant", server.uri()),
        Duration::from_secs(5),
        "HDEV-secret".to_string(),
    )
    .unwrap()
}

fn mmr_body() -> serde_json::Value {
    json!({
        "status": 200,
        "data": {
            "current": {
                "tier": {"id": 18, "name": "Diamond 1"},
                "rr": 67,
                "leaderboard_placement": null
            },
            "peak": {
                "tier": {"id": 21, "name": "Ascendant 1"},
                "rr": 12
            }
        }
    })
}

#[tokio::test]
async fn fetches_rank_with_key_and_encoded_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/valorant/v3/mmr/eu/pc/Player%20Name/EU1"))
        .and(header("Authorization", "HDEV-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mmr_body()))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = client(&server)
        .await
        .fetch_rank(Region::Eu, &PlayerIdentity::new("Player Name", "EU1"))
        .await
        .unwrap();

    assert_eq!(snapshot.tier_name, "Diamond 1");
    assert_eq!(snapshot.rr, 67);
    assert_eq!(snapshot.peak_tier, "Ascendant 1");
    assert_eq!(snapshot.peak_rr, 12);
    assert_eq!(snapshot.leaderboard_rank, None);
}

#[tokio::test]
async fn season_is_sent_as_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/valorant/v3/mmr/ap/pc/Ace/JP1"))
        .and(query_param("season", "e9a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mmr_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).await.with_season("e9a1");
    assert!(client
        .fetch_rank(Region::Ap, &PlayerIdentity::new("Ace", "JP1"))
        .await
        .is_ok());
}

#[tokio::test]
async fn fetches_account() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/valorant/v2/account/Ace/EU1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "data": {
                "puuid": "abc-123",
                "name": "Ace",
                "tag": "EU1",
                "region": "eu",
                "account_level": 212
            }
        })))
        .mount(&server)
        .await;

    let account = client(&server)
        .await
        .fetch_account(&PlayerIdentity::new("Ace", "EU1"))
        .await
        .unwrap();

    assert_eq!(account.puuid, "abc-123");
    assert_eq!(account.region.as_deref(), Some("eu"));
    assert_eq!(account.account_level, Some(212));
}

async fn rank_with_status(status: u16) -> BotError {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status).set_body_string("{}"))
        .mount(&server)
        .await;

    client(&server)
        .await
        .fetch_rank(Region::Na, &PlayerIdentity::new("Ace", "NA1"))
        .await
        .unwrap_err()
}

#[tokio::test]
async fn classifies_error_statuses() {
    assert!(matches!(rank_with_status(404).await, BotError::NotFound(_)));
    assert!(matches!(rank_with_status(429).await, BotError::RateLimited));
    assert!(matches!(rank_with_status(500).await, BotError::Upstream(500)));
    assert!(matches!(rank_with_status(403).await, BotError::Upstream(403)));
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(mmr_body())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = HenrikDev::new(
        &format!("{}/valorant", server.uri()),
        Duration::from_millis(200),
        "HDEV-secret".to_string(),
    )
    .unwrap();
    let error = client
        .fetch_rank(Region::Eu, &PlayerIdentity::new("Ace", "EU1"))
        .await
        .unwrap_err();

    assert!(matches!(error, BotError::Timeout));
}

#[tokio::test]
async fn garbage_body_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let error = client(&server)
        .await
        .fetch_rank(Region::Eu, &PlayerIdentity::new("Ace", "EU1"))
        .await
        .unwrap_err();

    assert!(matches!(error, BotError::Parse(_)));
}
