use std::collections::BTreeMap;
use std::time::Duration;

use hoplink_core::mapping::{MappingPatch, OwnerQuery, SortBy, SortOrder, UrlMapping};
use hoplink_core::repository::{ReadRepository, Repository};
use hoplink_core::{ShortCode, StorageError};
use hoplink_storage::PgMappingStore;
use hoplink_test_infra::{PostgresConfig, PostgresServer};
use jiff::{SignedDuration, Timestamp};
use sqlx::postgres::PgPoolOptions;

struct Fixture {
    _postgres: PostgresServer,
    store: PgMappingStore,
}

impl Fixture {
    async fn start() -> Self {
        let postgres = PostgresServer::new(PostgresConfig::builder().build())
            .await
            .expect("start postgres");
        let url = postgres.database_url().await.expect("postgres url");
        let pool = connect_with_retry(&url).await;

        sqlx::raw_sql(include_str!("../ddl/postgres/url_mappings.sql"))
            .execute(&pool)
            .await
            .expect("create schema");

        Self {
            _postgres: postgres,
            store: PgMappingStore::new(pool),
        }
    }
}

async fn connect_with_retry(url: &str) -> sqlx::PgPool {
    let mut last_error = None;

    for _ in 0..20 {
        match PgPoolOptions::new().max_connections(5).connect(url).await {
            Ok(pool) => return pool,
            Err(err) => {
                last_error = Some(err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("failed to connect postgres: {last_error:?}");
}

fn code(value: &str) -> ShortCode {
    ShortCode::new_unchecked(value)
}

fn mapping(code_str: &str, owner: &str) -> UrlMapping {
    let mut metadata = BTreeMap::new();
    metadata.insert("campaign".to_string(), "spring".to_string());

    UrlMapping {
        short_code: code(code_str),
        long_url: format!("https://example.com/{code_str}"),
        owner_id: owner.to_string(),
        created_at: Timestamp::now(),
        expires_at: None,
        click_count: 0,
        last_accessed: None,
        active: true,
        metadata,
    }
}

#[tokio::test]
async fn insert_and_get_round_trips() {
    let fixture = Fixture::start().await;
    let m = mapping("abc1234", "u1");

    fixture.store.insert(&m).await.unwrap();

    let got = fixture.store.get(&m.short_code).await.unwrap().unwrap();
    assert_eq!(got.long_url, m.long_url);
    assert_eq!(got.owner_id, "u1");
    assert_eq!(got.metadata.get("campaign").map(String::as_str), Some("spring"));
    assert!(got.active);
    assert_eq!(got.expires_at, None);
}

#[tokio::test]
async fn duplicate_code_conflicts() {
    let fixture = Fixture::start().await;
    let m = mapping("abc1234", "u1");

    fixture.store.insert(&m).await.unwrap();
    let err = fixture.store.insert(&m).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));
}

#[tokio::test]
async fn soft_deleted_codes_stay_reserved() {
    let fixture = Fixture::start().await;
    let m = mapping("abc1234", "u1");

    fixture.store.insert(&m).await.unwrap();
    assert!(fixture.store.soft_delete(&m.short_code).await.unwrap());

    // The row is hidden from active reads but keeps its code.
    assert!(fixture.store.get_active(&m.short_code).await.unwrap().is_none());
    assert!(fixture.store.exists(&m.short_code).await.unwrap());

    let err = fixture.store.insert(&m).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));

    // A second delete affects nothing.
    assert!(!fixture.store.soft_delete(&m.short_code).await.unwrap());
}

#[tokio::test]
async fn update_patches_only_provided_fields() {
    let fixture = Fixture::start().await;
    let m = mapping("abc1234", "u1");
    fixture.store.insert(&m).await.unwrap();

    let expires = Timestamp::now() + SignedDuration::from_hours(1);
    let patch = MappingPatch {
        long_url: Some("https://new.example".to_string()),
        expires_at: Some(expires),
        metadata: None,
    };

    let updated = fixture
        .store
        .update(&m.short_code, patch)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.long_url, "https://new.example");
    assert_eq!(
        updated.expires_at.map(|ts| ts.as_second()),
        Some(expires.as_second())
    );
    // Untouched fields survive.
    assert_eq!(updated.metadata.get("campaign").map(String::as_str), Some("spring"));
}

#[tokio::test]
async fn update_of_deleted_mapping_is_none() {
    let fixture = Fixture::start().await;
    let m = mapping("abc1234", "u1");
    fixture.store.insert(&m).await.unwrap();
    fixture.store.soft_delete(&m.short_code).await.unwrap();

    let patch = MappingPatch {
        long_url: Some("https://new.example".to_string()),
        ..Default::default()
    };
    assert!(fixture.store.update(&m.short_code, patch).await.unwrap().is_none());
}

#[tokio::test]
async fn increment_click_is_atomic_and_cumulative() {
    let fixture = Fixture::start().await;
    let m = mapping("abc1234", "u1");
    fixture.store.insert(&m).await.unwrap();

    for _ in 0..5 {
        fixture.store.increment_click(&m.short_code).await.unwrap();
    }

    assert_eq!(fixture.store.click_count(&m.short_code).await.unwrap(), Some(5));
    let got = fixture.store.get(&m.short_code).await.unwrap().unwrap();
    assert!(got.last_accessed.is_some());
}

#[tokio::test]
async fn listing_pages_and_sorts() {
    let fixture = Fixture::start().await;
    for i in 0..5 {
        fixture
            .store
            .insert(&mapping(&format!("code{i:03}"), "u1"))
            .await
            .unwrap();
    }
    fixture.store.insert(&mapping("other01", "u2")).await.unwrap();

    let query = OwnerQuery::new(1, 2, SortBy::CreatedAt, SortOrder::Asc).unwrap();
    let page = fixture.store.list_by_owner("u1", query).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(page.has_next);

    let query = OwnerQuery::new(3, 2, SortBy::CreatedAt, SortOrder::Asc).unwrap();
    let page = fixture.store.list_by_owner("u1", query).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert!(!page.has_next);

    // Deleted rows drop out of listings.
    fixture.store.soft_delete(&code("code000")).await.unwrap();
    let query = OwnerQuery::new(1, 10, SortBy::CreatedAt, SortOrder::Asc).unwrap();
    let page = fixture.store.list_by_owner("u1", query).await.unwrap();
    assert_eq!(page.items.len(), 4);
}
