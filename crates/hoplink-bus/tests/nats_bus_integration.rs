use std::time::Duration;

use hoplink_bus::{decode_click_payload, NatsEventBus};
use hoplink_core::bus::{EventPublisher, EventStream};
use hoplink_core::{ClickEvent, ShortCode};
use hoplink_test_infra::NatsServer;
use jiff::Timestamp;

struct Fixture {
    _nats: NatsServer,
    bus: NatsEventBus,
}

impl Fixture {
    async fn start() -> Self {
        let nats = NatsServer::new().await.expect("start nats");
        let url = nats.bus_url().await.expect("nats url");
        let bus = connect_with_retry(&url).await;
        Self { _nats: nats, bus }
    }
}

async fn connect_with_retry(url: &str) -> NatsEventBus {
    let mut last_error = None;

    for _ in 0..20 {
        match NatsEventBus::connect(url).await {
            Ok(bus) => return bus,
            Err(err) => {
                last_error = Some(err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("failed to connect nats: {last_error:?}");
}

fn event(code: &str, session: &str) -> ClickEvent {
    ClickEvent {
        short_code: ShortCode::new_unchecked(code),
        long_url: "https://example.com".to_string(),
        client_address: "203.0.113.7".to_string(),
        user_agent: "Mozilla/5.0".to_string(),
        referrer: String::new(),
        occurred_at: Timestamp::now(),
        session_id: session.to_string(),
    }
}

#[tokio::test]
async fn click_events_round_trip_through_nats() {
    let fixture = Fixture::start().await;
    let mut stream = fixture.bus.subscribe_clicks().await.unwrap();

    fixture.bus.publish_click(&event("abc1234", "s1")).await.unwrap();

    let payload = tokio::time::timeout(Duration::from_secs(5), stream.next_payload())
        .await
        .expect("timed out waiting for click")
        .expect("stream closed");

    let decoded = decode_click_payload(&payload).unwrap();
    assert_eq!(decoded.short_code.as_str(), "abc1234");
    assert_eq!(decoded.session_id, "s1");
}

#[tokio::test]
async fn queue_group_splits_the_stream_without_losing_events() {
    let fixture = Fixture::start().await;
    let mut a = fixture.bus.subscribe_clicks().await.unwrap();
    let mut b = fixture.bus.subscribe_clicks().await.unwrap();

    const EVENTS: usize = 10;
    for i in 0..EVENTS {
        fixture
            .bus
            .publish_click(&event("abc1234", &format!("s{i}")))
            .await
            .unwrap();
    }

    // Each event lands on exactly one member of the queue group.
    let mut received = 0;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while received < EVENTS && tokio::time::Instant::now() < deadline {
        tokio::select! {
            Some(_) = a.next_payload() => received += 1,
            Some(_) = b.next_payload() => received += 1,
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
    }

    assert_eq!(received, EVENTS);
}
