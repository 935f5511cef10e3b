//! One ingestion run: fetch every source, reconcile the drafts, sweep stale
//! records.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::db::{ReconcileOutcome, Store};
use crate::error::PipelineError;
use crate::fetch::HttpFetcher;
use crate::models::{DraftEvent, Event};
use crate::scraping::sample::FallbackSamples;
use crate::scraping::{self, ScrapeContext, SourceAdapter};

/// A source that could not be fetched during a run.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub url: String,
    pub message: String,
}

#[derive(Debug)]
pub struct CollectedDrafts {
    pub drafts: Vec<DraftEvent>,
    pub failures: Vec<SourceFailure>,
    pub fallback_used: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub processed: usize,
    pub created: usize,
    pub changed: usize,
    pub refreshed: usize,
    pub swept: usize,
    pub fallback_used: bool,
    pub failures: Vec<SourceFailure>,
}

/// Fetches all sources concurrently and concatenates their drafts in source
/// order. A failing source is recorded and skipped. When fewer than
/// `fallback_threshold` drafts come back the fallback samples are appended.
pub async fn collect_drafts(
    fetcher: &HttpFetcher,
    adapters: &[Arc<dyn SourceAdapter>],
    ctx: &ScrapeContext,
    fallback_threshold: usize,
) -> CollectedDrafts {
    let fetches = adapters.iter().map(|adapter| async move {
        let url = adapter.listing_url();
        let failure = |message: String| {
            warn!(
                source = adapter.source_website(),
                url,
                error = %message,
                "source scrape failed"
            );
            SourceFailure {
                source: adapter.source_website().to_string(),
                url: url.to_string(),
                message,
            }
        };

        let html = fetcher
            .fetch(url)
            .await
            .map_err(|err| failure(format!("{err:#}")))?;

        // Parsing a large page is CPU-bound; keep it off the async workers.
        let parser = adapter.clone();
        let parse_ctx = ctx.clone();
        let drafts = tokio::task::spawn_blocking(move || parser.parse_listing(&html, &parse_ctx))
            .await
            .map_err(|err| failure(format!("parser task failed: {err}")))?;
        info!(source = adapter.source_website(), count = drafts.len(), "source scraped");
        Ok::<_, SourceFailure>(drafts)
    });

    let mut drafts = Vec::new();
    let mut failures = Vec::new();
    for result in join_all(fetches).await {
        match result {
            Ok(mut scraped) => drafts.append(&mut scraped),
            Err(failure) => failures.push(failure),
        }
    }

    let fallback_used = drafts.len() < fallback_threshold;
    if fallback_used {
        info!(live = drafts.len(), "few live events, appending fallback samples");
        drafts.extend(FallbackSamples.drafts(ctx));
    }

    CollectedDrafts {
        drafts,
        failures,
        fallback_used,
    }
}

/// Marks a run as in progress until dropped.
pub struct RunGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct Pipeline {
    config: Arc<AppConfig>,
    store: Arc<Store>,
    fetcher: HttpFetcher,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    running: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(config: Arc<AppConfig>, store: Arc<Store>, fetcher: HttpFetcher) -> Self {
        let adapters = scraping::configured_adapters(&config.sources);
        Self {
            config,
            store,
            fetcher,
            adapters,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Claims the single run slot, or `None` when a run is already going.
    pub fn try_begin(&self) -> Option<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard {
                flag: self.running.clone(),
            })
    }

    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let guard = self.try_begin().ok_or(PipelineError::AlreadyRunning)?;
        self.run_claimed(guard).await
    }

    pub async fn run_claimed(&self, _guard: RunGuard) -> Result<RunReport, PipelineError> {
        let started_at = Utc::now();
        let ctx = ScrapeContext::new(&self.config, started_at);
        let collected = collect_drafts(
            &self.fetcher,
            &self.adapters,
            &ctx,
            self.config.fallback_threshold,
        )
        .await;

        let processed = collected.drafts.len();
        let store = self.store.clone();
        let drafts = collected.drafts;
        let (created, changed, refreshed, swept) =
            tokio::task::spawn_blocking(move || -> rusqlite::Result<_> {
                let (mut created, mut changed, mut refreshed) = (0usize, 0usize, 0usize);
                for draft in &drafts {
                    match store.reconcile(draft, started_at)? {
                        ReconcileOutcome::Created => created += 1,
                        ReconcileOutcome::Changed => changed += 1,
                        ReconcileOutcome::Refreshed => refreshed += 1,
                    }
                }
                let swept = store.sweep_stale(Utc::now())?;
                Ok((created, changed, refreshed, swept))
            })
            .await??;

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            processed,
            created,
            changed,
            refreshed,
            swept,
            fallback_used: collected.fallback_used,
            failures: collected.failures,
        };
        info!(
            processed = report.processed,
            created = report.created,
            changed = report.changed,
            swept = report.swept,
            failed_sources = report.failures.len(),
            "pipeline run complete"
        );
        Ok(report)
    }

    /// Operator import of a catalog record on behalf of `actor`.
    pub async fn import_event(
        &self,
        id: String,
        actor: String,
        notes: Option<String>,
    ) -> Result<Event, PipelineError> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            store.import_event(&id, &actor, notes.as_deref(), Utc::now())
        })
        .await?
    }
}
