use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound,
    TimeZone, Utc,
};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

use super::ScrapeContext;
use crate::models::DraftEvent;

/// Titles shorter than this are treated as layout noise, not events.
pub const MIN_TITLE_LEN: usize = 3;

const DEFAULT_START_TIME: &str = "7:00 PM";

const WEEKDAYS: [&str; 14] = [
    "mon", "tue", "wed", "thu", "fri", "sat", "sun", "monday", "tuesday", "wednesday",
    "thursday", "friday", "saturday", "sunday",
];

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{1,2})(?::(\d{2}))?\s*(am|pm)").expect("valid time regex"));

// 24-hour clock, e.g. `19:30`.
static CLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").expect("valid clock regex"));

/// Loose fields pulled from one listing item before normalization.
#[derive(Debug, Clone, Default)]
pub struct RawListing {
    pub title: Option<String>,
    pub date_time: Option<DateTime<Utc>>,
    pub venue_name: Option<String>,
    pub venue_address: Option<String>,
    pub description: Option<String>,
    pub category: Vec<String>,
    pub image_url: Option<String>,
    pub original_url: Option<String>,
}

pub fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn first_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element.select(selector).next().and_then(|node| {
        let cleaned = inner_text(node);
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    })
}

/// Text of every match joined together, mirroring how jQuery-style `.text()`
/// reads a multi-element selection.
pub fn all_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    let joined = element
        .select(selector)
        .map(inner_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

pub fn inner_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

pub fn first_attr(element: &ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    element
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn absolute_url(base: &str, href: Option<String>) -> Option<String> {
    let href = href?;
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href);
    }
    let base_url = reqwest::Url::parse(base).ok()?;
    base_url.join(&href).ok().map(|u| u.to_string())
}

pub fn find_first_time(text: &str) -> Option<String> {
    let cleaned = clean_text(text);
    let caps = TIME_RE.captures(&cleaned)?;
    let hour = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let minute = caps
        .get(2)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(0);
    let period = caps.get(3)?.as_str().to_uppercase();
    Some(format!("{:02}:{:02} {}", hour, minute, period))
}

/// Best-effort parse of a human date label such as `Sat, Oct 18, 7:00 PM` or
/// `Saturday, 18 October at 7pm` or `Sat, 18 Oct, 19:30`, interpreted in the city's timezone.
///
/// Year-less labels roll forward to next year when they would otherwise land
/// before `now`. Labels without a time default to a 7pm start.
pub fn parse_listing_date(text: &str, tz: Tz, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&cleaned) {
        return Some(dt.with_timezone(&Utc));
    }

    let without_meridiem = TIME_RE.replace_all(&cleaned, " ");
    let time = match find_first_time(&cleaned) {
        Some(value) => parse_naive_time_str(&value)?,
        None => find_clock_time(&without_meridiem)
            .or_else(|| parse_naive_time_str(DEFAULT_START_TIME))?,
    };

    let without_time = CLOCK_RE.replace_all(&without_meridiem, " ");
    let without_time = without_time
        .replace(" at ", " ")
        .replace(['•', '|', '.'], " ");
    let date_text = clean_text(strip_weekday(&without_time));
    let date_text = date_text.trim_matches(|c: char| c == ',' || c == '-' || c.is_whitespace());

    let reference = now.with_timezone(&tz).date_naive();
    let date = parse_naive_date(date_text, reference)?;
    to_timezone_datetime(date, time, tz).map(|dt| dt.with_timezone(&Utc))
}

/// Placeholder start for undated items: one day per listing position so that
/// items stay ordered and never collapse onto `now`.
pub fn synthesized_date(now: DateTime<Utc>, index: usize) -> DateTime<Utc> {
    now + Duration::days(index as i64 + 1)
}

/// Short city tag used as the default category, e.g. `Sydney` for
/// `Sydney, Australia`.
pub fn city_tag(city: &str) -> String {
    city.split(',').next().map(clean_text).unwrap_or_default()
}

/// Applies the canonical draft shape: trimmed strings, non-empty title of at
/// least [`MIN_TITLE_LEN`] characters, a required link, a millisecond-precision
/// start time and a category that is never empty.
pub fn build_draft(raw: RawListing, source_website: &str, ctx: &ScrapeContext) -> Option<DraftEvent> {
    let title = raw.title.as_deref().map(clean_text)?;
    if title.chars().count() < MIN_TITLE_LEN {
        return None;
    }
    let original_url = raw
        .original_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())?
        .to_string();
    let date_time = raw.date_time?.trunc_subsecs(3);

    let mut category: Vec<String> = Vec::new();
    for tag in raw.category.iter().map(|tag| clean_text(tag)) {
        if !tag.is_empty() && !category.contains(&tag) {
            category.push(tag);
        }
    }
    if category.is_empty() {
        let tag = city_tag(&ctx.city);
        if !tag.is_empty() {
            category.push(tag);
        }
        category.push("Events".to_string());
    }

    Some(DraftEvent {
        title,
        date_time,
        venue_name: optional_text(raw.venue_name),
        venue_address: optional_text(raw.venue_address),
        city: ctx.city.clone(),
        description: optional_text(raw.description),
        category,
        image_url: optional_text(raw.image_url),
        source_website: source_website.to_string(),
        original_url,
        last_scraped_at: ctx.scraped_at.trunc_subsecs(3),
    })
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| clean_text(&v)).filter(|v| !v.is_empty())
}

fn strip_weekday(text: &str) -> &str {
    let trimmed = text.trim_start();
    let Some(split_at) = trimmed.find(|c: char| c == ',' || c.is_whitespace()) else {
        return trimmed;
    };
    let first = trimmed[..split_at].to_lowercase();
    if WEEKDAYS.contains(&first.as_str()) {
        trimmed[split_at..].trim_start_matches(|c: char| c == ',' || c.is_whitespace())
    } else {
        trimmed
    }
}

fn parse_naive_time_str(text: &str) -> Option<NaiveTime> {
    let normalized = find_first_time(text)?;
    for fmt in ["%I:%M %p", "%I %p"].iter() {
        if let Ok(time) = NaiveTime::parse_from_str(&normalized, fmt) {
            return Some(time);
        }
    }
    None
}

fn find_clock_time(text: &str) -> Option<NaiveTime> {
    let caps = CLOCK_RE.captures(text)?;
    let hour = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let minute = caps.get(2)?.as_str().parse::<u32>().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn parse_naive_date(input: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let with_year = [
        "%B %d, %Y",
        "%b %d, %Y",
        "%B %d %Y",
        "%b %d %Y",
        "%d %B %Y",
        "%d %b %Y",
        "%d %B, %Y",
        "%d %b, %Y",
        "%Y-%m-%d",
        "%d/%m/%Y",
    ];
    for fmt in with_year.iter() {
        if let Ok(date) = NaiveDate::parse_from_str(input, fmt) {
            return Some(date);
        }
    }

    let without_year = ["%B %d", "%b %d", "%d %B", "%d %b"];
    let year = reference.year();
    for fmt in without_year.iter() {
        let candidate = format!("{input} {year}");
        if let Ok(date) = NaiveDate::parse_from_str(&candidate, &format!("{fmt} %Y")) {
            if date < reference {
                return date.with_year(year + 1);
            }
            return Some(date);
        }
    }

    None
}

fn to_timezone_datetime(date: NaiveDate, time: NaiveTime, tz: Tz) -> Option<DateTime<Tz>> {
    let naive = NaiveDateTime::new(date, time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(dt, _) => Some(dt),
        LocalResult::None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn ctx(now: DateTime<Utc>) -> ScrapeContext {
        ScrapeContext {
            city: "Sydney, Australia".to_string(),
            tz: chrono_tz::Australia::Sydney,
            scraped_at: now,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn parses_weekday_prefixed_label_in_city_timezone() {
        let tz = chrono_tz::Australia::Sydney;
        let parsed = parse_listing_date("Sat, Oct 18, 7:30 PM", tz, now()).expect("date");
        let local = parsed.with_timezone(&tz);
        assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2025, 10, 18).unwrap());
        assert_eq!((local.hour(), local.minute()), (19, 30));
    }

    #[test]
    fn parses_day_first_label_with_at() {
        let tz = chrono_tz::Australia::Sydney;
        let parsed = parse_listing_date("Saturday, 25 October 2025 at 6pm", tz, now())
            .expect("date");
        let local = parsed.with_timezone(&tz);
        assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2025, 10, 25).unwrap());
        assert_eq!(local.hour(), 18);
    }

    #[test]
    fn parses_24_hour_clock_label() {
        let tz = chrono_tz::Australia::Sydney;
        let parsed = parse_listing_date("Sat, 18 Oct, 19:30", tz, now()).expect("date");
        let local = parsed.with_timezone(&tz);
        assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2025, 10, 18).unwrap());
        assert_eq!((local.hour(), local.minute()), (19, 30));
    }

    #[test]
    fn yearless_label_in_the_past_rolls_forward() {
        let tz = chrono_tz::Australia::Sydney;
        let parsed = parse_listing_date("Mar 3", tz, now()).expect("date");
        let local = parsed.with_timezone(&tz);
        assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 3).unwrap());
        assert_eq!(local.hour(), 19);
    }

    #[test]
    fn garbage_label_is_rejected() {
        let tz = chrono_tz::Australia::Sydney;
        assert!(parse_listing_date("Multiple dates", tz, now()).is_none());
        assert!(parse_listing_date("   ", tz, now()).is_none());
    }

    #[test]
    fn synthesized_dates_are_one_day_apart_starting_tomorrow() {
        let base = now();
        assert_eq!(synthesized_date(base, 0), base + Duration::days(1));
        assert_eq!(synthesized_date(base, 4), base + Duration::days(5));
    }

    #[test]
    fn build_draft_trims_and_defaults() {
        let raw = RawListing {
            title: Some("  Harbour   Lights \n Walk ".to_string()),
            date_time: Some(now() + Duration::nanoseconds(1_234_567)),
            venue_name: Some("   ".to_string()),
            description: Some(" Evening walk ".to_string()),
            original_url: Some(" https://example.com/walk ".to_string()),
            ..RawListing::default()
        };
        let draft = build_draft(raw, "Timeout Sydney", &ctx(now())).expect("draft");
        assert_eq!(draft.title, "Harbour Lights Walk");
        assert_eq!(draft.venue_name, None);
        assert_eq!(draft.description.as_deref(), Some("Evening walk"));
        assert_eq!(draft.original_url, "https://example.com/walk");
        assert_eq!(draft.category, vec!["Sydney".to_string(), "Events".to_string()]);
        assert_eq!(draft.city, "Sydney, Australia");
        assert_eq!(draft.date_time.timestamp_subsec_nanos(), 1_000_000);
    }

    #[test]
    fn build_draft_skips_short_titles_and_missing_links() {
        let short = RawListing {
            title: Some("Hi".to_string()),
            date_time: Some(now()),
            original_url: Some("https://example.com".to_string()),
            ..RawListing::default()
        };
        assert!(build_draft(short, "src", &ctx(now())).is_none());

        let unlinked = RawListing {
            title: Some("Proper Title".to_string()),
            date_time: Some(now()),
            ..RawListing::default()
        };
        assert!(build_draft(unlinked, "src", &ctx(now())).is_none());
    }

    #[test]
    fn absolute_url_resolves_relative_links() {
        assert_eq!(
            absolute_url("https://www.timeout.com", Some("/sydney/things-to-do/x".to_string()))
                .as_deref(),
            Some("https://www.timeout.com/sydney/things-to-do/x")
        );
        assert_eq!(
            absolute_url("https://a.com", Some("https://b.com/x".to_string())).as_deref(),
            Some("https://b.com/x")
        );
    }
}
