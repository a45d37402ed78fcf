use super::*;
use crate::DbClient;
use chrono::{DateTime, Duration, TimeZone, Utc};

async fn setup() -> SqlPushTokenRepository {
    let client = DbClient::from_url("sqlite::memory:").await.unwrap();
    let repo = SqlPushTokenRepository::new(client);
    repo.init_schema().await.unwrap();
    repo
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

fn device(doctor_id: i64, device_id: &str, token: &str, at: DateTime<Utc>) -> TokenUpsert {
    TokenUpsert {
        doctor_id,
        token: token.to_string(),
        device_id: Some(device_id.to_string()),
        device_type: Some("android".to_string()),
        app_version: Some("2.4.0".to_string()),
        at,
    }
}

#[tokio::test]
async fn upsert_same_device_updates_in_place() {
    let repo = setup().await;
    let first = repo
        .upsert(device(7, "dev-000001", "tok-old", base_time()))
        .await
        .unwrap();
    let later = base_time() + Duration::minutes(5);
    let second = repo
        .upsert(device(7, "dev-000001", "tok-new", later))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.token, "tok-new");
    assert_eq!(second.created_at, base_time());
    assert_eq!(second.updated_at, later);
    assert_eq!(repo.find_by_doctor(7).await.unwrap().len(), 1);
}

#[tokio::test]
async fn upsert_keeps_device_type_when_omitted() {
    let repo = setup().await;
    repo.upsert(device(7, "dev-000001", "tok", base_time()))
        .await
        .unwrap();

    let mut refresh = device(7, "dev-000001", "tok", base_time());
    refresh.device_type = None;
    refresh.app_version = Some("2.5.0".to_string());
    let stored = repo.upsert(refresh).await.unwrap();

    assert_eq!(stored.device_type.as_deref(), Some("android"));
    assert_eq!(stored.app_version.as_deref(), Some("2.5.0"));
}

#[tokio::test]
async fn legacy_tokens_are_keyed_by_token() {
    let repo = setup().await;
    let legacy = TokenUpsert {
        doctor_id: 3,
        token: "legacy-token".to_string(),
        device_id: None,
        device_type: None,
        app_version: None,
        at: base_time(),
    };
    let first = repo.upsert(legacy.clone()).await.unwrap();
    let second = repo
        .upsert(TokenUpsert {
            doctor_id: 4,
            ..legacy
        })
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.doctor_id, 4);
    assert_eq!(repo.all_tokens().await.unwrap(), vec!["legacy-token"]);
}

#[tokio::test]
async fn enforce_limit_drops_least_recently_updated() {
    let repo = setup().await;
    for i in 0..5 {
        repo.upsert(device(
            9,
            &format!("device-{:04}", i),
            &format!("tok-{}", i),
            base_time() + Duration::minutes(i),
        ))
        .await
        .unwrap();
    }
    // Re-registering the oldest device makes it the most recent one
    repo.upsert(device(9, "device-0000", "tok-0", base_time() + Duration::hours(1)))
        .await
        .unwrap();

    assert_eq!(repo.enforce_limit(9, 3).await.unwrap(), 2);

    let remaining: Vec<String> = repo
        .find_by_doctor(9)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.token)
        .collect();
    assert_eq!(remaining, vec!["tok-0", "tok-4", "tok-3"]);
    assert_eq!(repo.enforce_limit(9, 3).await.unwrap(), 0);
}

#[tokio::test]
async fn tokens_for_flattens_and_deduplicates() {
    let repo = setup().await;
    repo.upsert(device(1, "device-a-01", "only-one", base_time()))
        .await
        .unwrap();
    // Two device rows of one doctor may carry the same token
    repo.upsert(device(2, "device-b-01", "shared", base_time()))
        .await
        .unwrap();
    repo.upsert(device(2, "device-b-02", "shared", base_time()))
        .await
        .unwrap();
    repo.upsert(device(2, "device-b-03", "only-two", base_time()))
        .await
        .unwrap();
    repo.upsert(device(3, "device-c-01", "other", base_time()))
        .await
        .unwrap();

    assert_eq!(
        repo.tokens_for(&[1, 2]).await.unwrap(),
        vec!["only-one", "only-two", "shared"]
    );
    assert!(repo.tokens_for(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn token_moves_to_the_doctor_who_registered_it_last() {
    let repo = setup().await;
    repo.upsert(device(1, "shared-phone", "handset", base_time()))
        .await
        .unwrap();
    repo.upsert(device(1, "own-tablet-1", "tablet", base_time()))
        .await
        .unwrap();

    let later = base_time() + Duration::hours(2);
    repo.upsert(device(2, "shared-phone", "handset", later))
        .await
        .unwrap();

    assert_eq!(repo.tokens_for(&[1]).await.unwrap(), vec!["tablet"]);
    assert_eq!(repo.tokens_for(&[2]).await.unwrap(), vec!["handset"]);

    // A legacy registration of the token takes it over as well
    repo.upsert(TokenUpsert {
        doctor_id: 3,
        token: "handset".to_string(),
        device_id: None,
        device_type: None,
        app_version: None,
        at: later,
    })
    .await
    .unwrap();
    assert!(repo.tokens_for(&[2]).await.unwrap().is_empty());
    assert_eq!(repo.tokens_for(&[3]).await.unwrap(), vec!["handset"]);
}

#[tokio::test]
async fn stored_values_read_back_unchanged() {
    let repo = setup().await;
    let at = Utc.with_ymd_and_hms(2031, 11, 30, 23, 59, 58).unwrap() + Duration::milliseconds(417);
    repo.upsert(TokenUpsert {
        doctor_id: 4_000_000_123,
        token: "legacy-bare".to_string(),
        device_id: None,
        device_type: None,
        app_version: None,
        at,
    })
    .await
    .unwrap();

    let stored = repo.find_by_doctor(4_000_000_123).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].doctor_id, 4_000_000_123);
    assert_eq!(stored[0].device_id, None);
    assert_eq!(stored[0].device_type, None);
    assert_eq!(stored[0].app_version, None);
    assert_eq!(stored[0].created_at, at);
    assert_eq!(stored[0].updated_at, at);
}

#[tokio::test]
async fn remove_matches_all_given_selectors() {
    let repo = setup().await;
    repo.upsert(device(5, "device-0001", "tok-1", base_time()))
        .await
        .unwrap();
    repo.upsert(device(5, "device-0002", "tok-2", base_time()))
        .await
        .unwrap();

    assert_eq!(
        repo.remove(5, Some("tok-1"), Some("device-0002"))
            .await
            .unwrap(),
        0
    );
    assert_eq!(repo.remove(5, None, Some("device-0002")).await.unwrap(), 1);
    assert_eq!(repo.remove(6, Some("tok-1"), None).await.unwrap(), 0);
    assert_eq!(repo.remove(5, Some("tok-1"), None).await.unwrap(), 1);
    assert!(repo.remove(5, None, None).await.is_err());
}

#[tokio::test]
async fn purge_created_before_uses_creation_time() {
    let repo = setup().await;
    let old = base_time() - Duration::days(200);
    repo.upsert(device(1, "device-old-1", "stale", old))
        .await
        .unwrap();
    // Refreshing does not move created_at
    repo.upsert(device(1, "device-old-1", "stale", base_time()))
        .await
        .unwrap();
    repo.upsert(device(1, "device-new-1", "fresh", base_time()))
        .await
        .unwrap();

    let purged = repo
        .purge_created_before(base_time() - Duration::days(180))
        .await
        .unwrap();

    assert_eq!(purged, 1);
    assert_eq!(repo.all_tokens().await.unwrap(), vec!["fresh"]);
}

#[tokio::test]
async fn purge_tokens_handles_more_than_one_chunk() {
    let repo = setup().await;
    let mut tokens = Vec::new();
    for i in 0..520 {
        let token = format!("tok-{:04}", i);
        repo.upsert(device(i, "device-0001", &token, base_time()))
            .await
            .unwrap();
        tokens.push(token);
    }
    tokens.push("never-registered".to_string());

    assert_eq!(repo.purge_tokens(&tokens).await.unwrap(), 520);
    assert!(repo.all_tokens().await.unwrap().is_empty());
}
