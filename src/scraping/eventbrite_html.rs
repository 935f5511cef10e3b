use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use super::base::{self, RawListing};
use super::{ScrapeContext, SourceAdapter};
use crate::config::SourceConfig;
use crate::models::DraftEvent;

const DEFAULT_DESCRIPTION: &str = "Check Eventbrite for full details.";

static CARD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[data-testid="event-card"], .event-card, [data-event-id]"#)
        .expect("eventbrite card selector")
});
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"h2, h3, [data-testid="event-title"]"#).expect("eventbrite title")
});
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("eventbrite link"));
static IMAGE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("eventbrite image"));
static DATE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[data-testid="event-date"], .event-date"#).expect("eventbrite date")
});
static VENUE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[data-testid="event-venue"], .event-venue"#).expect("eventbrite venue")
});
static DESCRIPTION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p").expect("eventbrite description"));

/// Ticketing listing whose cards expose a date label and venue name.
pub struct EventbriteListing {
    source: SourceConfig,
}

impl EventbriteListing {
    pub fn new(source: SourceConfig) -> Self {
        Self { source }
    }
}

impl SourceAdapter for EventbriteListing {
    fn source_website(&self) -> &str {
        &self.source.name
    }

    fn listing_url(&self) -> &str {
        &self.source.url
    }

    fn parse_listing(&self, html: &str, ctx: &ScrapeContext) -> Vec<DraftEvent> {
        let document = Html::parse_document(html);
        let filter = self.source.link_filter.as_deref();
        let mut drafts = Vec::new();

        for (index, card) in document.select(&CARD_SELECTOR).enumerate() {
            let title = base::first_text(&card, &TITLE_SELECTOR);

            let href = card
                .select(&LINK_SELECTOR)
                .filter_map(|link| link.value().attr("href"))
                .find(|href| filter.map_or(true, |f| href.contains(f)))
                .map(str::to_string);
            // Cards without a usable link share the listing page as their link.
            let link = base::absolute_url(self.source.base_url(), href)
                .unwrap_or_else(|| self.source.url.clone());

            let date_time = base::all_text(&card, &DATE_SELECTOR)
                .and_then(|text| base::parse_listing_date(&text, ctx.tz, ctx.scraped_at))
                .unwrap_or_else(|| base::synthesized_date(ctx.scraped_at, index));

            let raw = RawListing {
                title,
                date_time: Some(date_time),
                venue_name: base::all_text(&card, &VENUE_SELECTOR),
                description: base::first_text(&card, &DESCRIPTION_SELECTOR)
                    .or_else(|| Some(DEFAULT_DESCRIPTION.to_string())),
                image_url: base::first_attr(&card, &IMAGE_SELECTOR, "src"),
                original_url: Some(link),
                ..RawListing::default()
            };

            if let Some(draft) = base::build_draft(raw, &self.source.name, ctx) {
                drafts.push(draft);
            }
        }

        drafts
    }
}
