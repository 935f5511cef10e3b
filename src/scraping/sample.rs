use chrono::Duration;

use super::base::{self, RawListing};
use super::ScrapeContext;
use crate::models::DraftEvent;

pub const SAMPLE_SOURCE: &str = "Sample Source";

struct SampleVenue {
    title: &'static str,
    days_ahead: i64,
    venue_name: &'static str,
    venue_address: &'static str,
    description: &'static str,
    category: [&'static str; 2],
    image_url: &'static str,
    original_url: &'static str,
}

const SAMPLES: [SampleVenue; 5] = [
    SampleVenue {
        title: "Sydney Opera House Tours",
        days_ahead: 2,
        venue_name: "Sydney Opera House",
        venue_address: "Bennelong Point, Sydney NSW 2000",
        description: "Guided tours of one of the world's most iconic buildings.",
        category: ["Tour", "Culture"],
        image_url: "https://images.unsplash.com/photo-1523059623039-a9ed027e7fad?w=400",
        original_url: "https://www.sydneyoperahouse.com/",
    },
    SampleVenue {
        title: "Bondi Beach Yoga",
        days_ahead: 3,
        venue_name: "Bondi Beach",
        venue_address: "Bondi Beach, Sydney NSW",
        description: "Free community yoga session at Bondi Beach.",
        category: ["Fitness", "Outdoor"],
        image_url: "https://images.unsplash.com/photo-1544367567-0f2fcb009e0b?w=400",
        original_url: "https://www.timeout.com/sydney/things-to-do",
    },
    SampleVenue {
        title: "The Rocks Markets",
        days_ahead: 1,
        venue_name: "The Rocks",
        venue_address: "George St, The Rocks NSW 2000",
        description: "Weekend markets with local crafts and food.",
        category: ["Markets", "Shopping"],
        image_url: "https://images.unsplash.com/photo-1488646953014-85cb44e25828?w=400",
        original_url: "https://therocks.com/",
    },
    SampleVenue {
        title: "Vivid Sydney Light Festival",
        days_ahead: 7,
        venue_name: "Circular Quay",
        venue_address: "Circular Quay, Sydney NSW 2000",
        description: "Annual light art and music festival across Sydney.",
        category: ["Festival", "Arts"],
        image_url: "https://images.unsplash.com/photo-1492684223066-81342ee5ff30?w=400",
        original_url: "https://www.vividsydney.com/",
    },
    SampleVenue {
        title: "Cooking Class - Thai Cuisine",
        days_ahead: 5,
        venue_name: "Sydney Cooking School",
        venue_address: "Surry Hills, Sydney",
        description: "Learn to cook authentic Thai dishes.",
        category: ["Food", "Workshop"],
        image_url: "https://images.unsplash.com/photo-1556909114-f6e7ad7d3136?w=400",
        original_url: "https://www.eventbrite.com.au/d/australia--sydney/food/",
    },
];

/// Hand-curated seed events appended when live sources come back nearly empty.
pub struct FallbackSamples;

impl FallbackSamples {
    pub fn drafts(&self, ctx: &ScrapeContext) -> Vec<DraftEvent> {
        SAMPLES
            .iter()
            .filter_map(|sample| {
                let raw = RawListing {
                    title: Some(sample.title.to_string()),
                    date_time: Some(ctx.scraped_at + Duration::days(sample.days_ahead)),
                    venue_name: Some(sample.venue_name.to_string()),
                    venue_address: Some(sample.venue_address.to_string()),
                    description: Some(sample.description.to_string()),
                    category: sample.category.iter().map(|c| c.to_string()).collect(),
                    image_url: Some(sample.image_url.to_string()),
                    original_url: Some(sample.original_url.to_string()),
                };
                base::build_draft(raw, SAMPLE_SOURCE, ctx)
            })
            .collect()
    }
}
