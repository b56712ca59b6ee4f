//! Refresh orchestration.
//!
//! A refresh cycle loads the stored record, decides which parts are due,
//! fetches and merges them in dependency order (channel, playlist, videos)
//! and persists whatever changed. Cycles for the same feed key never
//! interleave; cycles for different keys run freely in parallel.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;

use crate::app::{Result, TubeError};
use crate::config::Config;
use crate::domain::{FeedKey, FeedRecord, FeedType, Part};
use crate::fetcher::{PartOutcome, PartRequest, YouTubeApi};
use crate::merge::{merge, Merged};
use crate::store::{KeyLocks, Store};

pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub results_limit: usize,
    pub max_age: Duration,
    pub call_timeout: Duration,
    pub workers: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            results_limit: 15,
            max_age: Duration::from_secs(900),
            call_timeout: Duration::from_secs(10),
            workers: DEFAULT_WORKERS,
        }
    }
}

impl From<&Config> for SyncSettings {
    fn from(config: &Config) -> Self {
        Self {
            results_limit: config.feed.results_limit,
            max_age: Duration::from_secs(config.feed.max_age_secs),
            call_timeout: config.api.timeout(),
            workers: config.feed.workers.max(1),
        }
    }
}

/// Outcome of one refresh cycle.
#[derive(Debug, Clone)]
pub struct Refreshed {
    pub record: FeedRecord,
    /// At least one part was merged and the record was persisted
    pub changed: bool,
    /// Upstream was contacted
    pub fetched: bool,
}

/// Parts a cycle should fetch for `record`, in the order they must run.
///
/// Every part is due when the cycle is `stale`; otherwise only parts that
/// have never been merged are. Videos additionally become due during the
/// cycle when the playlist part changes.
pub fn plan(record: &FeedRecord, stale: bool) -> Vec<Part> {
    let mut parts = Vec::with_capacity(3);

    if record.key().feed_type() == FeedType::Channel && (stale || !record.has_part(Part::Channel)) {
        parts.push(Part::Channel);
    }

    for part in [Part::Playlist, Part::Videos] {
        if stale || !record.has_part(part) {
            parts.push(part);
        }
    }

    parts
}

/// Whether a feed last checked at `checked_at` is due at `now`.
pub fn is_stale(checked_at: Option<DateTime<Utc>>, now: DateTime<Utc>, max_age: Duration) -> bool {
    match checked_at {
        None => true,
        Some(at) => {
            let age = now.signed_duration_since(at);
            // A clock that went backwards counts as fresh.
            age.to_std().map(|age| age >= max_age).unwrap_or(false)
        }
    }
}

fn log_stop(key: &FeedKey, err: &TubeError) {
    if err.is_terminal() {
        tracing::warn!("Refresh of {} stopped, upstream data rejected: {}", key, err);
    } else if err.is_transport() {
        tracing::warn!("Refresh of {} stopped, upstream unavailable: {}", key, err);
    } else if matches!(err, TubeError::Cancelled) {
        tracing::info!("Refresh of {} cancelled", key);
    } else {
        tracing::error!("Refresh of {} failed: {}", key, err);
    }
}

/// Record under construction during one cycle.
struct Cycle {
    record: FeedRecord,
    changed: bool,
    fetched: bool,
}

impl Cycle {
    fn apply(&mut self, part: Part, outcome: PartOutcome, now: DateTime<Utc>, limit: usize) -> Result<bool> {
        match merge(&self.record, part, outcome, now, limit)? {
            Merged::Unchanged => {
                tracing::debug!("{}: {} part unchanged", self.record.key(), part);
                Ok(false)
            }
            Merged::Updated(next) => {
                tracing::info!("{}: merged {} part", self.record.key(), part);
                self.record = next;
                self.changed = true;
                Ok(true)
            }
        }
    }
}

pub struct Synchronizer<S> {
    api: YouTubeApi,
    store: Arc<S>,
    locks: KeyLocks,
    settings: SyncSettings,
}

impl<S: Store + Send + Sync + 'static> Synchronizer<S> {
    pub fn new(api: YouTubeApi, store: Arc<S>, settings: SyncSettings) -> Self {
        Self {
            api,
            store,
            locks: KeyLocks::new(),
            settings,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Refresh `key`, contacting upstream only for parts that are due.
    pub async fn refresh(&self, key: &FeedKey) -> Result<Refreshed> {
        self.refresh_until(key, false, std::future::pending::<()>())
            .await
    }

    /// Refresh `key`, treating every part as stale.
    pub async fn force_refresh(&self, key: &FeedKey) -> Result<Refreshed> {
        self.refresh_until(key, true, std::future::pending::<()>())
            .await
    }

    /// Refresh `key` until `cancel` resolves.
    ///
    /// On cancellation the stage in flight is abandoned, parts merged before
    /// it are still persisted, and [`TubeError::Cancelled`] is returned.
    /// Cancelling while another cycle holds the key returns at once and
    /// leaves the store alone. Errors from a later stage never roll back
    /// earlier stages.
    pub async fn refresh_until<F>(&self, key: &FeedKey, force: bool, cancel: F) -> Result<Refreshed>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(cancel);

        let lock_key = key.storage_key();
        let _guard = tokio::select! {
            biased;
            _ = &mut cancel => {
                tracing::debug!("Refresh of {} cancelled while waiting for the key", key);
                return Err(TubeError::Cancelled);
            }
            guard = self.locks.acquire(&lock_key) => guard,
        };

        let now = Utc::now();
        let prior = self.store.get(key)?;
        let stale = force || is_stale(self.store.checked_at(key)?, now, self.settings.max_age);

        let mut cycle = Cycle {
            record: prior.unwrap_or_else(|| FeedRecord::new(key.clone())),
            changed: false,
            fetched: false,
        };

        let parts = plan(&cycle.record, stale);
        if parts.is_empty() {
            tracing::debug!("{} is fresh, serving stored record", key);
            return Ok(Refreshed {
                record: cycle.record,
                changed: false,
                fetched: false,
            });
        }

        let outcome = tokio::select! {
            biased;
            _ = &mut cancel => Err(TubeError::Cancelled),
            result = self.run_stages(&mut cycle, &parts, now) => result,
        };

        match outcome {
            Ok(()) => {
                if cycle.changed {
                    self.store.put(key, &cycle.record)?;
                    tracing::info!("Persisted {}", key);
                }
                if cycle.fetched {
                    self.store.mark_checked(key, now)?;
                }
                Ok(Refreshed {
                    record: cycle.record,
                    changed: cycle.changed,
                    fetched: cycle.fetched,
                })
            }
            Err(e) => {
                if cycle.changed {
                    match self.store.put(key, &cycle.record) {
                        Ok(()) => tracing::info!("Persisted {} up to the failed stage", key),
                        Err(put_err) => tracing::error!("Failed to persist {}: {}", key, put_err),
                    }
                }
                log_stop(key, &e);
                Err(e)
            }
        }
    }

    async fn run_stages(&self, cycle: &mut Cycle, parts: &[Part], now: DateTime<Utc>) -> Result<()> {
        let key = cycle.record.key().clone();
        let limit = self.settings.results_limit;

        if parts.contains(&Part::Channel) {
            let etag = cycle.record.etag(Part::Channel).map(str::to_owned);
            cycle.fetched = true;
            let outcome = self
                .call(PartRequest::Channel(key.id()), etag.as_deref())
                .await?;
            cycle.apply(Part::Channel, outcome, now, limit)?;
        }

        let Some(playlist_id) = cycle.record.playlist_source().map(str::to_owned) else {
            tracing::warn!("{}: uploads playlist unknown, skipping playlist and videos", key);
            return Ok(());
        };

        let mut playlist_changed = false;
        if parts.contains(&Part::Playlist) {
            let etag = cycle.record.etag(Part::Playlist).map(str::to_owned);
            cycle.fetched = true;
            let outcome = self
                .call(PartRequest::Playlist(&playlist_id), etag.as_deref())
                .await?;
            playlist_changed = cycle.apply(Part::Playlist, outcome, now, limit)?;
        }

        let video_ids = cycle.record.playlist.video_ids.clone();
        if video_ids.is_empty() {
            tracing::debug!("{}: playlist is empty, no videos to fetch", key);
            return Ok(());
        }

        if playlist_changed || parts.contains(&Part::Videos) {
            // The stored videos etag belongs to the previous id set.
            let etag = if playlist_changed {
                None
            } else {
                cycle.record.etag(Part::Videos).map(str::to_owned)
            };
            cycle.fetched = true;
            let outcome = self
                .call(PartRequest::Videos(&video_ids), etag.as_deref())
                .await?;
            cycle.apply(Part::Videos, outcome, now, limit)?;
        }

        Ok(())
    }

    async fn call(&self, request: PartRequest<'_>, etag: Option<&str>) -> Result<PartOutcome> {
        let timeout = self.settings.call_timeout;
        match tokio::time::timeout(timeout, self.api.fetch(request, etag)).await {
            Ok(result) => result,
            Err(_) => Err(TubeError::Timeout(timeout)),
        }
    }

    /// Refresh many feeds concurrently, at most `workers` at a time.
    ///
    /// Results come back in the order of `keys`; one feed failing does not
    /// affect the others.
    pub async fn refresh_all(self: &Arc<Self>, keys: Vec<FeedKey>) -> Vec<(FeedKey, Result<Refreshed>)> {
        let semaphore = Arc::new(Semaphore::new(self.settings.workers.max(1)));
        let mut handles = Vec::new();

        for key in keys {
            let sync = Arc::clone(self);
            let semaphore = semaphore.clone();

            let handle = tokio::spawn(async move {
                let result = match semaphore.acquire().await {
                    Ok(_permit) => sync.refresh(&key).await,
                    Err(_) => Err(TubeError::Cancelled),
                };
                (key, result)
            });

            handles.push(handle);
        }

        let mut results = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!("Task join error: {}", e);
                }
            }
        }

        results
    }
}
