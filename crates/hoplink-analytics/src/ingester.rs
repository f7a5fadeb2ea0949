use crate::enrich::parse_user_agent;
use crate::error::IngestError;
use crate::geo::GeoProvider;
use crate::model::ClickRecord;
use crate::store::ClickStore;
use hoplink_bus::decode_click_payload;
use hoplink_cache::{RollingCounters, SessionMarkers};
use hoplink_core::bus::EventStream;
use hoplink_core::{ClickEvent, SharedCache};
use jiff::Timestamp;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Tunables for the ingestion worker pool.
#[derive(Debug, Clone)]
pub struct IngesterConfig {
    /// Events processed concurrently; the subscription backpressures
    /// once all permits are out.
    pub concurrency: usize,
}

impl Default for IngesterConfig {
    fn default() -> Self {
        Self { concurrency: 8 }
    }
}

/// Consumes `url.clicked`, enriches each event, and appends one
/// [`ClickRecord`] per delivery.
///
/// Handlers are independent and commutative; totals are counts, so
/// ordering between events does not matter. Exactly-once is not
/// attempted: duplicate deliveries inflate totals, which the platform
/// documents as eventually-consistent approximations.
pub struct ClickIngester<S, C> {
    store: Arc<S>,
    markers: SessionMarkers<C>,
    counters: RollingCounters<C>,
    geo: Arc<dyn GeoProvider>,
    config: IngesterConfig,
}

impl<S, C> ClickIngester<S, C>
where
    S: ClickStore,
    C: SharedCache,
{
    pub fn new(
        store: S,
        shared_cache: Arc<C>,
        geo: Arc<dyn GeoProvider>,
        config: IngesterConfig,
    ) -> Self {
        Self {
            store: Arc::new(store),
            markers: SessionMarkers::new(Arc::clone(&shared_cache)),
            counters: RollingCounters::new(shared_cache),
            geo,
            config,
        }
    }

    /// Decodes and processes one raw payload. Malformed payloads are
    /// reported as [`IngestError::Decode`] for the caller to
    /// dead-letter.
    pub async fn process_payload(&self, payload: &[u8]) -> Result<ClickRecord, IngestError> {
        let event = decode_click_payload(payload)?;
        self.process_event(event).await
    }

    /// Runs the enrichment pipeline for one decoded event and appends
    /// the record.
    pub async fn process_event(&self, event: ClickEvent) -> Result<ClickRecord, IngestError> {
        let agent = parse_user_agent(&event.user_agent);
        let geo = self.geo.lookup(&event.client_address).await;
        let is_unique = self.detect_unique(&event).await;

        let record = ClickRecord {
            short_code: event.short_code.clone(),
            long_url: event.long_url,
            client_address: event.client_address,
            user_agent: event.user_agent,
            referrer: event.referrer,
            country: geo.country,
            city: geo.city,
            device_type: agent.device_type,
            browser: agent.browser,
            os: agent.os,
            occurred_at: event.occurred_at,
            session_id: event.session_id,
            is_unique,
            created_at: Timestamp::now(),
        };

        self.store.append(&record).await?;

        // Rollup counter is best-effort; the columnar store already
        // has the record.
        if let Err(e) = self.counters.bump_total(&record.short_code).await {
            warn!(code = %record.short_code, error = %e, "failed to bump rollup counter");
        }

        debug!(
            code = %record.short_code,
            is_unique,
            country = %record.country,
            device = %record.device_type,
            "click processed"
        );
        Ok(record)
    }

    /// Uniqueness detection: the fast session marker first, then a
    /// bounded probe of the columnar store. First sight marks the
    /// session for 24 hours. Cache trouble degrades to the store
    /// probe.
    async fn detect_unique(&self, event: &ClickEvent) -> bool {
        match self.markers.seen(&event.short_code, &event.session_id).await {
            Ok(true) => return false,
            Ok(false) => {}
            Err(e) => {
                warn!(code = %event.short_code, error = %e, "session marker read failed");
            }
        }

        match self
            .store
            .session_exists(&event.short_code, &event.session_id)
            .await
        {
            Ok(true) => false,
            Ok(false) => {
                if let Err(e) = self.markers.mark(&event.short_code, &event.session_id).await {
                    warn!(code = %event.short_code, error = %e, "session marker write failed");
                }
                true
            }
            Err(e) => {
                // Uniqueness stays approximate; undercounting beats
                // failing the append.
                warn!(code = %event.short_code, error = %e, "session probe failed");
                false
            }
        }
    }

    /// Drains the subscription, dispatching events to a bounded worker
    /// pool. Returns when the stream closes.
    pub async fn run<St>(self: Arc<Self>, mut stream: St)
    where
        St: EventStream,
    {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        info!(concurrency = self.config.concurrency, "click ingester running");

        while let Some(payload) = stream.next_payload().await {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let ingester = Arc::clone(&self);

            tokio::spawn(async move {
                let _permit = permit;
                match ingester.process_payload(&payload).await {
                    Ok(record) => {
                        debug!(code = %record.short_code, "click stored");
                    }
                    Err(IngestError::Decode(e)) => {
                        // Dead-letter: log and drop, never crash the
                        // subscription.
                        warn!(error = %e, "discarding malformed click payload");
                    }
                    Err(IngestError::Store(e)) => {
                        warn!(error = %e, "failed to persist click record");
                    }
                }
            });
        }

        info!("click subscription closed, ingester stopping");
    }
}
