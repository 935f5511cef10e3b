pub mod base;
pub mod eventbrite_html;
pub mod sample;
pub mod timeout_html;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::config::{AppConfig, SourceConfig, SourceKind};
use crate::models::DraftEvent;

/// Run-wide values every adapter stamps onto its drafts.
#[derive(Debug, Clone)]
pub struct ScrapeContext {
    pub city: String,
    pub tz: Tz,
    pub scraped_at: DateTime<Utc>,
}

impl ScrapeContext {
    pub fn new(config: &AppConfig, scraped_at: DateTime<Utc>) -> Self {
        Self {
            city: config.city.clone(),
            tz: config.tz(),
            scraped_at,
        }
    }
}

/// Turns the raw markup of one listing page into drafts.
///
/// Parsing never fails: items without a usable title or link are skipped, and a
/// page that yields nothing simply produces an empty list.
pub trait SourceAdapter: Send + Sync {
    fn source_website(&self) -> &str;
    fn listing_url(&self) -> &str;
    fn parse_listing(&self, html: &str, ctx: &ScrapeContext) -> Vec<DraftEvent>;
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub url: String,
    pub kind: SourceKind,
}

pub fn adapter_for(source: &SourceConfig) -> Arc<dyn SourceAdapter> {
    match source.kind {
        SourceKind::Timeout => Arc::new(timeout_html::TimeoutListing::new(source.clone())),
        SourceKind::Eventbrite => Arc::new(eventbrite_html::EventbriteListing::new(source.clone())),
    }
}

pub fn configured_adapters(sources: &[SourceConfig]) -> Vec<Arc<dyn SourceAdapter>> {
    sources.iter().map(adapter_for).collect()
}

pub fn list_sources(sources: &[SourceConfig]) -> Vec<SourceInfo> {
    sources
        .iter()
        .map(|source| SourceInfo {
            name: source.name.clone(),
            url: source.url.clone(),
            kind: source.kind,
        })
        .collect()
}
