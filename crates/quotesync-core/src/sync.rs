// Periodic fetch-then-reconcile against the remote source
use crate::clock::Clock;
use crate::merge::MergeReport;
use crate::models::Quote;
use crate::remote::RemoteFetcher;
use crate::store::QuoteStore;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Default gap between sync cycles
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Outcome of one successful cycle
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SyncReport {
    pub merge: MergeReport,
    pub synced_at: DateTime<Utc>,
}

/// One-shot notifications for whoever is watching the loop
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Synced(SyncReport),
    Failed(String),
    /// A trigger arrived while a cycle was still running and was dropped
    Skipped,
}

/// Drives sync cycles against a shared store
///
/// Overlapping triggers are coalesced: a cycle that finds another one in
/// flight does nothing. The periodic loop also skips ticks missed during a
/// slow cycle, so cycles never queue up or race each other.
pub struct SyncService {
    store: Arc<Mutex<QuoteStore>>,
    fetcher: Arc<dyn RemoteFetcher>,
    clock: Arc<dyn Clock>,
    in_flight: Mutex<()>,
}

impl SyncService {
    pub fn new(
        store: Arc<Mutex<QuoteStore>>,
        fetcher: Arc<dyn RemoteFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            fetcher,
            clock,
            in_flight: Mutex::new(()),
        }
    }

    pub fn store(&self) -> Arc<Mutex<QuoteStore>> {
        Arc::clone(&self.store)
    }

    /// Fetch the remote batch and reconcile it into the store.
    ///
    /// Returns `Ok(None)` when another cycle is already running. A failed
    /// fetch leaves the collection untouched; there is no internal retry,
    /// the next trigger is the retry.
    pub async fn sync_once(&self) -> Result<Option<SyncReport>> {
        let _cycle = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Sync already in flight, coalescing trigger");
                return Ok(None);
            }
        };

        let remote = self.fetcher.fetch_quotes().await?;

        let merge = {
            let mut store = self.store.lock().await;
            store.reconcile(&remote)
        };

        Ok(Some(SyncReport {
            merge,
            synced_at: self.clock.now(),
        }))
    }

    /// Push a local quote to the remote source
    pub async fn publish(&self, quote: &Quote) -> Result<Option<u64>> {
        let id = self.fetcher.publish(quote).await?;
        if let Some(id) = id {
            info!("Quote posted to server as #{}", id);
        }
        Ok(id)
    }

    /// Run one cycle and report it to the log and the optional channel
    async fn run_cycle(&self, events: Option<&mpsc::UnboundedSender<SyncEvent>>) {
        let event = match self.sync_once().await {
            Ok(Some(report)) => {
                info!(
                    "Quotes synced with server! {} remote, {} local kept, {} total",
                    report.merge.remote_count, report.merge.kept_local, report.merge.total
                );
                SyncEvent::Synced(report)
            }
            Ok(None) => SyncEvent::Skipped,
            Err(e) => {
                warn!("Error syncing quotes: {}", e);
                SyncEvent::Failed(e.to_string())
            }
        };

        if let Some(tx) = events {
            // Nobody listening is fine
            let _ = tx.send(event);
        }
    }

    /// Sync now, then every `interval`, until `shutdown` flips to true
    pub async fn run_periodic(
        &self,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
        events: Option<mpsc::UnboundedSender<SyncEvent>>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Starting periodic sync every {:?}", interval);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle(events.as_ref()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Periodic sync stopped");
    }
}
