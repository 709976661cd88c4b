use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

// --- LinkedIn profile scraper types ---

/// Input for the dev_fusion/linkedin-profile-scraper actor.
#[derive(Debug, Clone, Serialize)]
pub struct LinkedInProfileInput {
    #[serde(rename = "profileUrls")]
    pub profile_urls: Vec<String>,
}

/// A single profile from the dataset. The actor's schema drifts between
/// versions, so every field is optional and accessors pick the first
/// populated alias.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkedInProfile {
    #[serde(rename = "profileUrl")]
    pub profile_url: Option<String>,
    #[serde(rename = "publicIdentifier")]
    pub public_identifier: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
    pub headline: Option<String>,
    pub title: Option<String>,
    pub position: Option<String>,
    pub summary: Option<String>,
    pub about: Option<String>,
    pub bio: Option<String>,
    pub description: Option<String>,
}

impl LinkedInProfile {
    /// The URL (or public identifier) the scraper reports for this profile.
    pub fn canonical_url(&self) -> Option<&str> {
        first_populated(&[&self.profile_url, &self.public_identifier, &self.url])
    }

    /// Display name from `fullName`, `name`, or `firstName lastName`.
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = first_populated(&[&self.full_name, &self.name]) {
            return Some(name.to_string());
        }
        join_names(self.first_name.as_deref(), self.last_name.as_deref())
    }

    pub fn headline_text(&self) -> Option<&str> {
        first_populated(&[&self.headline, &self.title, &self.position])
    }

    pub fn bio_text(&self) -> Option<&str> {
        first_populated(&[&self.summary, &self.about, &self.bio, &self.description])
    }
}

// --- LinkedIn post scraper types ---

/// Input for the supreme_coder/linkedin-post actor.
#[derive(Debug, Clone, Serialize)]
pub struct LinkedInPostInput {
    pub urls: Vec<String>,
    #[serde(rename = "limitPerSource")]
    pub limit_per_source: u32,
    #[serde(rename = "deepScrape")]
    pub deep_scrape: bool,
}

/// Author block nested inside a post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostAuthor {
    #[serde(rename = "publicId")]
    pub public_id: Option<String>,
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
}

impl PostAuthor {
    pub fn full_name(&self) -> Option<String> {
        join_names(self.first_name.as_deref(), self.last_name.as_deref())
    }
}

/// A single post from the dataset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkedInPost {
    #[serde(rename = "sourceUrl")]
    pub source_url: Option<String>,
    pub author: Option<PostAuthor>,
    pub text: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "timeSincePosted")]
    pub time_since_posted: Option<String>,
    /// Milliseconds since the epoch.
    #[serde(rename = "postedAtTimestamp", default, deserialize_with = "lenient_millis")]
    pub posted_at_timestamp: Option<i64>,
    #[serde(rename = "postedAtISO")]
    pub posted_at_iso: Option<String>,
}

impl LinkedInPost {
    pub fn content(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    pub fn author_public_id(&self) -> Option<&str> {
        self.author
            .as_ref()
            .and_then(|a| a.public_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    pub fn author_name(&self) -> Option<String> {
        self.author.as_ref().and_then(PostAuthor::full_name)
    }
}

fn first_populated<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .map(str::trim)
        .find(|s| !s.is_empty())
}

fn join_names(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let joined = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!joined.is_empty()).then_some(joined)
}

/// Accept the timestamp as an integer, a float, or a numeric string.
fn lenient_millis<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_accessors_prefer_first_populated_alias() {
        let profile: LinkedInProfile = serde_json::from_str(
            r#"{
                "profileUrl": "",
                "publicIdentifier": "jane-doe",
                "firstName": "Jane",
                "lastName": "Doe",
                "title": "VP Marketing",
                "about": "  Builds brands.  "
            }"#,
        )
        .unwrap();
        assert_eq!(profile.canonical_url(), Some("jane-doe"));
        assert_eq!(profile.display_name().as_deref(), Some("Jane Doe"));
        assert_eq!(profile.headline_text(), Some("VP Marketing"));
        assert_eq!(profile.bio_text(), Some("Builds brands."));
    }

    #[test]
    fn profile_without_any_url_has_no_canonical_url() {
        let profile: LinkedInProfile = serde_json::from_str(r#"{"fullName": "X"}"#).unwrap();
        assert!(profile.canonical_url().is_none());
    }

    #[test]
    fn post_timestamp_accepts_numbers_and_strings() {
        let post: LinkedInPost =
            serde_json::from_str(r#"{"postedAtTimestamp": 1717977600000}"#).unwrap();
        assert_eq!(post.posted_at_timestamp, Some(1_717_977_600_000));

        let post: LinkedInPost =
            serde_json::from_str(r#"{"postedAtTimestamp": "1717977600000"}"#).unwrap();
        assert_eq!(post.posted_at_timestamp, Some(1_717_977_600_000));

        let post: LinkedInPost = serde_json::from_str(r#"{"postedAtTimestamp": null}"#).unwrap();
        assert_eq!(post.posted_at_timestamp, None);
    }

    #[test]
    fn post_author_helpers() {
        let post: LinkedInPost = serde_json::from_str(
            r#"{"text": "  ", "author": {"publicId": "", "firstName": "Jane", "lastName": ""}}"#,
        )
        .unwrap();
        assert!(post.content().is_none());
        assert!(post.author_public_id().is_none());
        assert_eq!(post.author_name().as_deref(), Some("Jane"));
    }
}
