use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use super::observation::{Observation, ObservationIngest};
use super::sources::YieldSource;
use crate::cache::YieldCache;
use crate::constants::LATEST_YIELD_CACHE_KEY;
use crate::db::Store;
use crate::db::models::to_numeric;
use crate::error::{AdvisorError, FetchError};
use crate::strategy::risk_scorer;

/// Outcome of one source within a single `fetch_all` round
#[derive(Debug)]
pub struct SourceOutcome {
    pub source: String,
    pub result: Result<usize, FetchError>,
}

/// Per-source accounting so that "returned nothing" and "failed" stay distinguishable
#[derive(Debug, Default)]
pub struct AggregationReport {
    pub outcomes: Vec<SourceOutcome>,
}

impl AggregationReport {
    pub fn failed_sources(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| o.source.as_str())
            .collect()
    }

    pub fn succeeded_sources(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| o.source.as_str())
            .collect()
    }
}

/// Payload stored under the latest-yield cache key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedYieldData {
    pub data: BTreeMap<String, Observation>,
    pub timestamp: DateTime<Utc>,
    pub count: usize,
}

pub struct ExternalYieldAggregator {
    sources: Vec<Box<dyn YieldSource>>,
    store: Arc<dyn Store>,
    cache: Arc<dyn YieldCache>,
    source_timeout: Duration,
    cache_ttl: Duration,
}

impl ExternalYieldAggregator {
    pub fn new(
        sources: Vec<Box<dyn YieldSource>>,
        store: Arc<dyn Store>,
        cache: Arc<dyn YieldCache>,
        source_timeout: Duration,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            sources,
            store,
            cache,
            source_timeout,
            cache_ttl,
        }
    }

    pub fn source_keys(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.key()).collect()
    }

    /// Fetches every source concurrently, merges the successes, caches and persists them.
    /// Only a persistence failure propagates.
    pub async fn fetch_all(&self) -> Result<HashMap<String, Observation>, AdvisorError> {
        self.fetch_all_with_report().await.map(|(merged, _)| merged)
    }

    #[instrument(skip(self), fields(sources = self.sources.len(), on_close = true))]
    pub async fn fetch_all_with_report(
        &self,
    ) -> Result<(HashMap<String, Observation>, AggregationReport), AdvisorError> {
        let (merged, report) = self.collect_sources().await;

        info!(
            observations = merged.len(),
            succeeded = ?report.succeeded_sources(),
            failed = ?report.failed_sources(),
            "External yield fetch completed"
        );

        self.write_cache(&merged).await;
        self.persist(&merged).await?;

        Ok((merged, report))
    }

    /// Fan-out/fan-in with an independent timeout per source. A panicking adapter is
    /// contained and reported like any other failed source.
    async fn collect_sources(&self) -> (HashMap<String, Observation>, AggregationReport) {
        let timeout = self.source_timeout;
        let fetches = self.sources.iter().map(|source| async move {
            let guarded = AssertUnwindSafe(tokio::time::timeout(timeout, source.fetch())).catch_unwind();
            let result = match guarded.await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(FetchError::Timeout(timeout)),
                Err(payload) => Err(FetchError::Panicked(panic_message(payload.as_ref()))),
            };
            (source.key().to_string(), result)
        });

        let mut merged = HashMap::new();
        let mut report = AggregationReport::default();
        for (source, result) in join_all(fetches).await {
            match result {
                Ok(observations) => {
                    debug!(source = %source, count = observations.len(), "Source fetched");
                    report.outcomes.push(SourceOutcome {
                        source,
                        result: Ok(observations.len()),
                    });
                    merged.extend(observations);
                }
                Err(e) => {
                    error!(source = %source, error = %e, "Source fetch failed; excluded from this round");
                    report.outcomes.push(SourceOutcome { source, result: Err(e) });
                }
            }
        }
        (merged, report)
    }

    /// Best effort: a cache failure is logged and otherwise ignored
    async fn write_cache(&self, merged: &HashMap<String, Observation>) {
        let payload = CachedYieldData {
            data: merged.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            timestamp: Utc::now(),
            count: merged.len(),
        };
        let serialized = match serde_json::to_string(&payload) {
            Ok(s) => s,
            Err(e) => {
                warn!(?e, "Failed to serialize yield cache payload");
                return;
            }
        };
        if let Err(e) = self.cache.set(LATEST_YIELD_CACHE_KEY, &serialized, self.cache_ttl).await {
            warn!(error = %e, "Failed to write yield cache");
        }
    }

    async fn persist(&self, merged: &HashMap<String, Observation>) -> Result<(), AdvisorError> {
        if merged.is_empty() {
            return Ok(());
        }
        // Stable order keeps strategy creation deterministic across runs
        let mut keys: Vec<&String> = merged.keys().collect();
        keys.sort();
        let items: Vec<ObservationIngest> = keys
            .into_iter()
            .filter_map(|k| {
                let obs = &merged[k];
                if to_numeric(obs.tvl).is_err() {
                    warn!(key = %k, tvl = %obs.tvl, "Skipping observation with unstorable tvl");
                    return None;
                }
                Some(ObservationIngest::from_observation(
                    obs,
                    risk_scorer::score(obs.protocol, obs.tvl, obs.apy),
                ))
            })
            .collect();
        if items.is_empty() {
            return Ok(());
        }

        match self.store.ingest_observations(&items).await {
            Ok(ids) => {
                info!(ingested = ids.len(), "Observations stored");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to store observations; batch rolled back");
                Err(AdvisorError::Persistence(e))
            }
        }
    }

    /// Latest cached aggregate, `None` on miss or any cache problem
    pub async fn get_cached_yield_data(&self) -> Option<CachedYieldData> {
        match self.cache.get(LATEST_YIELD_CACHE_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(data) => Some(data),
                Err(e) => {
                    warn!(?e, "Discarding unreadable yield cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Yield cache read failed");
                None
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("index out of bounds");
        assert_eq!(panic_message(payload.as_ref()), "index out of bounds");
        let payload: Box<dyn Any + Send> = Box::new(String::from("boom"));
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
