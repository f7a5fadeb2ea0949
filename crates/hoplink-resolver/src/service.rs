use hoplink_core::repository::ResolverStore;
use hoplink_core::session::{session_bucket, DEFAULT_SESSION_WINDOW};
use hoplink_core::target::target_policy;
use hoplink_core::{ClickEvent, Error, EventPublisher, Result, ShortCode};
use jiff::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Deadline for the detached click task (increment + publish).
const CLICK_TASK_DEADLINE: Duration = Duration::from_secs(2);

/// Everything the resolver knows about the requesting client.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub client_address: String,
    pub user_agent: String,
    pub referrer: String,
}

/// Outcome of a resolution. `NotFound` and `Expired` are ordinary
/// outcomes, not errors; the gateway maps them to 404/410.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found { long_url: String, click_count: u64 },
    NotFound,
    Expired,
}

/// Tunables for the resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Width of the session bucket used for unique-visitor detection.
    pub session_window: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            session_window: DEFAULT_SESSION_WINDOW,
        }
    }
}

/// Resolution state machine plus the asynchronous click fan-out.
pub struct ResolverService<S, P> {
    store: Arc<S>,
    publisher: Arc<P>,
    config: ResolverConfig,
    dropped_clicks: Arc<AtomicU64>,
}

impl<S, P> Clone for ResolverService<S, P> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            publisher: Arc::clone(&self.publisher),
            config: self.config.clone(),
            dropped_clicks: Arc::clone(&self.dropped_clicks),
        }
    }
}

impl<S, P> ResolverService<S, P>
where
    S: ResolverStore,
    P: EventPublisher,
{
    pub fn new(store: S, publisher: P, config: ResolverConfig) -> Self {
        Self {
            store: Arc::new(store),
            publisher: Arc::new(publisher),
            config,
            dropped_clicks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Resolves a short code for a redirect.
    ///
    /// Syntax is checked before any I/O. On success a click task is
    /// detached; the response never waits for it.
    pub async fn resolve(&self, code: &str, client: ClientInfo) -> Result<Resolution> {
        let code = ShortCode::new(code)?;
        trace!(code = %code, "resolving");

        let entry = match self.store.resolve(&code).await.map_err(Error::from)? {
            Some(entry) => entry,
            None => return Ok(Resolution::NotFound),
        };

        // Cached entries may outlive a soft delete briefly; never let
        // them mask one.
        if !entry.active {
            return Ok(Resolution::NotFound);
        }

        if entry.is_expired(Timestamp::now()) {
            debug!(code = %code, "mapping has expired");
            if let Err(e) = self.store.invalidate(&code).await {
                warn!(code = %code, error = %e, "failed to drop expired cache entry");
            }
            return Ok(Resolution::Expired);
        }

        // Records may predate stricter validation; recheck before
        // handing the target out.
        if let Err(reason) = target_policy(&entry.long_url) {
            return Err(Error::InvalidTarget(reason));
        }

        self.spawn_click_task(self.build_event(&code, &entry.long_url, &client));

        Ok(Resolution::Found {
            long_url: entry.long_url,
            click_count: entry.click_count,
        })
    }

    /// Builds and publishes a click event for an already-resolved
    /// redirect. Returns the event and whether the publish landed.
    pub async fn track_click(
        &self,
        code: &str,
        long_url: &str,
        client: ClientInfo,
    ) -> Result<(ClickEvent, bool)> {
        let code = ShortCode::new(code)?;
        let event = self.build_event(&code, long_url, &client);

        let published = match self.publisher.publish_click(&event).await {
            Ok(()) => true,
            Err(e) => {
                self.note_dropped(&code, &e);
                false
            }
        };

        Ok((event, published))
    }

    /// Number of click events dropped after bounded publish retries.
    pub fn dropped_clicks(&self) -> u64 {
        self.dropped_clicks.load(Ordering::Relaxed)
    }

    fn build_event(&self, code: &ShortCode, long_url: &str, client: &ClientInfo) -> ClickEvent {
        let now = Timestamp::now();
        ClickEvent {
            short_code: code.clone(),
            long_url: long_url.to_string(),
            client_address: client.client_address.clone(),
            user_agent: client.user_agent.clone(),
            referrer: client.referrer.clone(),
            occurred_at: now,
            session_id: session_bucket(&client.client_address, now, self.config.session_window),
        }
    }

    /// Detaches the counter bump and the bus publish with their own
    /// deadline. The task owns clones of the shared handles only; it
    /// holds nothing belonging to the calling handler.
    fn spawn_click_task(&self, event: ClickEvent) {
        let store = Arc::clone(&self.store);
        let publisher = Arc::clone(&self.publisher);
        let dropped = Arc::clone(&self.dropped_clicks);

        tokio::spawn(async move {
            let code = event.short_code.clone();
            let work = async {
                if let Err(e) = store.increment_click(&code).await {
                    warn!(code = %code, error = %e, "failed to increment click count");
                }
                if let Err(e) = publisher.publish_click(&event).await {
                    dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(code = %code, error = %e, "dropped click event");
                }
            };

            if tokio::time::timeout(CLICK_TASK_DEADLINE, work).await.is_err() {
                dropped.fetch_add(1, Ordering::Relaxed);
                warn!(code = %code, "click task deadline elapsed, event abandoned");
            }
        });
    }

    fn note_dropped(&self, code: &ShortCode, error: &hoplink_core::BusError) {
        self.dropped_clicks.fetch_add(1, Ordering::Relaxed);
        warn!(code = %code, error = %error, "dropped click event");
    }
}
