use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use super::base::{self, RawListing};
use super::{ScrapeContext, SourceAdapter};
use crate::config::SourceConfig;
use crate::models::DraftEvent;

const DEFAULT_DESCRIPTION: &str = "Check the source for details.";

static CARD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[data-testid="card"], .card, article"#).expect("timeout card selector")
});
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"h2, h3, [data-testid="card-title"]"#).expect("timeout title")
});
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("timeout link"));
static IMAGE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("timeout image"));
static DESCRIPTION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"p, [data-testid="card-description"]"#).expect("timeout description")
});

/// Editorial "things to do" listing made of cards. Cards carry no machine
/// readable date, so every draft gets a position-derived placeholder start.
pub struct TimeoutListing {
    source: SourceConfig,
}

impl TimeoutListing {
    pub fn new(source: SourceConfig) -> Self {
        Self { source }
    }
}

impl SourceAdapter for TimeoutListing {
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
            let Some(link) = base::absolute_url(self.source.base_url(), href) else {
                continue;
            };

            let raw = RawListing {
                title,
                date_time: Some(base::synthesized_date(ctx.scraped_at, index)),
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
