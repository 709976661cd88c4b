//! Post date normalization and the trailing-window filter.
//!
//! Scraped posts carry their date in one of three shapes: a millisecond
//! timestamp, an ISO-8601 string, or whatever text the page displayed
//! ("Jan 15", "3 days ago", "2w"). Everything is reduced to a calendar date
//! relative to a reference day so posts can be windowed.

use std::sync::LazyLock;

use apify_client::LinkedInPost;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime};
use prospect_common::Post;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

/// Absolute formats tried in order; first success wins.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%SZ"];

/// Month-day formats with no year. The reference year is assumed.
const MONTH_DAY_FORMATS: &[&str] = &["%b %d", "%B %d"];

static RE_MONTHS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s+months?\s+ago").expect("valid regex"));
static RE_YEARS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s+years?\s+ago").expect("valid regex"));
static RE_WEEKS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s+weeks?\s+ago").expect("valid regex"));
static RE_DAYS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s+days?\s+ago").expect("valid regex"));
static RE_SAME_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s+(?:hours?|minutes?|seconds?)\s+ago|^just now$").expect("valid regex")
});
// LinkedIn's compact form: "3d", "2w", "1mo", "5h", "1yr", "3d • Edited"
static RE_SHORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)\s*(mo|yrs?|y|w|d|h|m|s)\b").expect("valid regex")
});

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// A post's date as reported by the scraper, before interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDate {
    pub timestamp_ms: Option<i64>,
    pub iso: Option<String>,
    pub text: Option<String>,
}

impl RawDate {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

impl From<&LinkedInPost> for RawDate {
    fn from(post: &LinkedInPost) -> Self {
        Self {
            timestamp_ms: post.posted_at_timestamp,
            iso: post.posted_at_iso.clone().filter(|s| !s.trim().is_empty()),
            text: post.time_since_posted.clone(),
        }
    }
}

/// Result of interpreting a [`RawDate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizedDate {
    /// From a timestamp or ISO string; displayed as `%Y-%m-%d`.
    Exact(NaiveDate),
    /// From display text; the text itself is kept for display.
    Parsed(NaiveDate),
    /// Nothing usable. Treated as the reference date, i.e. always recent.
    Assumed(NaiveDate),
}

impl NormalizedDate {
    pub fn date(&self) -> NaiveDate {
        match *self {
            NormalizedDate::Exact(d) | NormalizedDate::Parsed(d) | NormalizedDate::Assumed(d) => d,
        }
    }

    pub fn is_assumed(&self) -> bool {
        matches!(self, NormalizedDate::Assumed(_))
    }
}

/// Interpret a post date relative to `reference`.
///
/// Order: millisecond timestamp, ISO-8601, absolute formats, relative
/// phrases, then the reference date itself (with a warning).
pub fn normalize_post_date(raw: &RawDate, reference: NaiveDate) -> NormalizedDate {
    if let Some(date) = raw.timestamp_ms.and_then(date_from_millis) {
        return NormalizedDate::Exact(date);
    }
    if let Some(date) = raw.iso.as_deref().and_then(date_from_iso) {
        return NormalizedDate::Exact(date);
    }

    let text = raw.text.as_deref().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        warn!("Empty date for post, assuming it is recent");
        return NormalizedDate::Assumed(reference);
    }

    match parse_date_text(text, reference) {
        Some(date) => NormalizedDate::Parsed(date),
        None => {
            warn!(date = text, "Could not parse post date, assuming it is recent");
            NormalizedDate::Assumed(reference)
        }
    }
}

/// Display string for a normalized date.
pub fn display_date(raw: &RawDate, normalized: NormalizedDate) -> String {
    match (normalized, raw.text.as_deref().map(str::trim)) {
        (NormalizedDate::Exact(date), _) => date.format("%Y-%m-%d").to_string(),
        (_, Some(text)) if !text.is_empty() => text.to_string(),
        (other, _) => other.date().format("%Y-%m-%d").to_string(),
    }
}

/// Parse display text: absolute formats first, then relative phrases.
pub fn parse_date_text(text: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let text = text.trim();
    parse_absolute(text, reference).or_else(|| parse_relative(text, reference))
}

fn date_from_millis(ms: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.date_naive())
}

fn date_from_iso(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

fn parse_absolute(text: &str, reference: NaiveDate) -> Option<NaiveDate> {
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
    {
        return Some(date);
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Some(dt.date());
    }

    // Month and day only: current year, or last year if that lands in the future.
    let with_year = format!("{text} {}", reference.year());
    let date = MONTH_DAY_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(&with_year, &format!("{fmt} %Y")).ok()
    })?;
    if date > reference {
        date.with_year(reference.year() - 1)
    } else {
        Some(date)
    }
}

fn parse_relative(text: &str, reference: NaiveDate) -> Option<NaiveDate> {
    if let Some(n) = leading_count(&RE_MONTHS_AGO, text) {
        return reference.checked_sub_months(Months::new(n));
    }
    if let Some(n) = leading_count(&RE_YEARS_AGO, text) {
        return reference.checked_sub_months(Months::new(n.saturating_mul(12)));
    }
    if let Some(n) = leading_count(&RE_WEEKS_AGO, text) {
        return reference.checked_sub_days(Days::new(u64::from(n) * 7));
    }
    if let Some(n) = leading_count(&RE_DAYS_AGO, text) {
        return reference.checked_sub_days(Days::new(u64::from(n)));
    }
    if RE_SAME_DAY.is_match(text) {
        return Some(reference);
    }

    let lower = text.to_lowercase();
    if lower.contains("yesterday") {
        return reference.checked_sub_days(Days::new(1));
    }
    if lower.contains("last week") {
        return reference.checked_sub_days(Days::new(7));
    }
    if lower.contains("today") {
        return Some(reference);
    }

    let caps = RE_SHORT.captures(text)?;
    let n: u32 = caps.get(1)?.as_str().parse().ok()?;
    match caps.get(2)?.as_str().to_lowercase().as_str() {
        "mo" => reference.checked_sub_months(Months::new(n)),
        "y" | "yr" | "yrs" => reference.checked_sub_months(Months::new(n.saturating_mul(12))),
        "w" => reference.checked_sub_days(Days::new(u64::from(n) * 7)),
        "d" => reference.checked_sub_days(Days::new(u64::from(n))),
        _ => Some(reference),
    }
}

fn leading_count(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

// ---------------------------------------------------------------------------
// Window filter
// ---------------------------------------------------------------------------

/// Trailing window of `months` ending at `reference`, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostWindow {
    pub reference: NaiveDate,
    pub months: u32,
}

impl PostWindow {
    pub fn new(reference: NaiveDate, months: u32) -> Self {
        Self { reference, months }
    }

    pub fn start(&self) -> NaiveDate {
        self.reference
            .checked_sub_months(Months::new(self.months))
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start()
    }
}

/// Counters for one post batch. Logged once per batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostFilterStats {
    pub total: usize,
    pub skipped_no_content: usize,
    pub skipped_too_old: usize,
    pub skipped_url_mismatch: usize,
    pub assumed_recent: usize,
    pub accepted: usize,
    pub matched_by_url: usize,
    pub matched_by_id: usize,
    pub matched_by_name: usize,
}

/// A scraped post that survived the content and date filters.
#[derive(Debug, Clone)]
pub struct WindowedPost {
    pub source: LinkedInPost,
    pub post: Post,
}

/// Keep posts with non-empty content whose date falls in the window.
///
/// Content is checked first, so an empty post is dropped regardless of date.
/// Undated or unparseable posts are kept and counted as `assumed_recent`.
pub fn filter_posts(
    posts: Vec<LinkedInPost>,
    window: &PostWindow,
    stats: &mut PostFilterStats,
) -> Vec<WindowedPost> {
    stats.total += posts.len();
    let mut kept = Vec::with_capacity(posts.len());

    for source in posts {
        let Some(content) = source.content().map(str::to_string) else {
            stats.skipped_no_content += 1;
            continue;
        };

        let raw = RawDate::from(&source);
        let normalized = normalize_post_date(&raw, window.reference);
        if !window.contains(normalized.date()) {
            stats.skipped_too_old += 1;
            continue;
        }
        if normalized.is_assumed() {
            stats.assumed_recent += 1;
        }
        stats.accepted += 1;

        let post = Post {
            content,
            url: source.url.clone().filter(|u| !u.trim().is_empty()),
            date: display_date(&raw, normalized),
        };
        kept.push(WindowedPost { source, post });
    }

    kept
}
