use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Candidate record produced by a source adapter for a single pipeline run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DraftEvent {
    pub title: String,
    pub date_time: DateTime<Utc>,
    pub venue_name: Option<String>,
    pub venue_address: Option<String>,
    pub city: String,
    pub description: Option<String>,
    pub category: Vec<String>,
    pub image_url: Option<String>,
    pub source_website: String,
    pub original_url: String,
    pub last_scraped_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    New,
    Updated,
    Inactive,
    Imported,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::New => "new",
            EventStatus::Updated => "updated",
            EventStatus::Inactive => "inactive",
            EventStatus::Imported => "imported",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown event status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for EventStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "new" => Ok(EventStatus::New),
            "updated" => Ok(EventStatus::Updated),
            "inactive" => Ok(EventStatus::Inactive),
            "imported" => Ok(EventStatus::Imported),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Persisted catalog record.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String, // sha256 of original_url|title
    pub title: String,
    pub date_time: DateTime<Utc>,
    pub venue_name: Option<String>,
    pub venue_address: Option<String>,
    pub city: String,
    pub description: Option<String>,
    pub category: Vec<String>,
    pub image_url: Option<String>,
    pub source_website: String,
    pub original_url: String,
    pub last_scraped_at: DateTime<Utc>,
    pub status: EventStatus,
    pub imported_at: Option<DateTime<Utc>>,
    pub imported_by: Option<String>,
    pub import_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filters for catalog reads. Every field is optional; an empty query returns
/// the whole catalog ordered by date.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub city: Option<String>,
    pub keyword: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub status: Option<EventStatus>,
    /// Only future events that have not been swept.
    pub upcoming: bool,
    pub limit: Option<u32>,
}

/// A visitor asking to hear about tickets for an event.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TicketInterest {
    pub id: i64,
    pub email: String,
    pub event_id: String,
    pub opt_in: bool,
    pub created_at: DateTime<Utc>,
}
