use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const PLACEHOLDER_HEADLINE: &str = "Profile information unavailable";
pub const PLACEHOLDER_BIO: &str = "Profile information could not be retrieved";
pub const DEFAULT_HEADLINE: &str = "No headline available";
pub const DEFAULT_BIO: &str = "No bio available";
pub const DEFAULT_COMPANY: &str = "Popular Pays, a Lightricks brand";

// --- Profiles ---

/// A recent post by a target, with the date as displayed to the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
    pub date: String,
}

/// A researched individual profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub headline: String,
    pub bio: String,
    pub url: String,
    #[serde(default)]
    pub recent_posts: Vec<Post>,
    /// True when the profile could not be scraped and this target was synthesized.
    #[serde(default)]
    pub placeholder: bool,
}

impl Target {
    pub fn new(
        name: impl Into<String>,
        headline: impl Into<String>,
        bio: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            headline: headline.into(),
            bio: bio.into(),
            url: url.into(),
            recent_posts: Vec::new(),
            placeholder: false,
        }
    }

    /// Stand-in for a requested profile the scraper did not return.
    pub fn placeholder(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            placeholder: true,
            ..Self::new(name, PLACEHOLDER_HEADLINE, PLACEHOLDER_BIO, url)
        }
    }

    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.name, self.headline)
    }
}

// --- Case studies ---

/// A previously-run campaign, used as social proof in outreach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CaseStudy {
    /// Listed in the public website's case-study index.
    Website {
        brand: String,
        url: String,
        summary: String,
    },
    /// Image attachment from the internal wiki, described by a vision model.
    Wiki {
        brand: String,
        #[serde(with = "base64_bytes")]
        image: Vec<u8>,
        analysis: String,
        filename: String,
    },
}

impl CaseStudy {
    pub fn brand(&self) -> &str {
        match self {
            CaseStudy::Website { brand, .. } | CaseStudy::Wiki { brand, .. } => brand,
        }
    }

    /// Descriptive text fed into prompts.
    pub fn text(&self) -> &str {
        match self {
            CaseStudy::Website { summary, .. } => summary,
            CaseStudy::Wiki { analysis, .. } => analysis,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            CaseStudy::Website { url, .. } => Some(url),
            CaseStudy::Wiki { .. } => None,
        }
    }

    pub fn citation(&self) -> String {
        format!("Popular Pays Case Study: {}", self.brand())
    }
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}

// --- Research ---

/// Multi-stage LLM research about the topic, plus supporting material.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicResearch {
    pub topic: String,
    pub initial: Option<String>,
    pub expanded: Option<String>,
    pub final_report: Option<String>,
    /// Deduplicated, first-seen order.
    #[serde(default)]
    pub citations: Vec<String>,
    #[serde(default)]
    pub case_studies: Vec<CaseStudy>,
    /// True when research failed and only placeholder content is present.
    #[serde(default)]
    pub degraded: bool,
}

impl TopicResearch {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    /// Placeholder used when the research API is unavailable.
    pub fn basic(topic: impl Into<String>) -> Self {
        let topic = topic.into();
        Self {
            final_report: Some(format!("Basic information about {topic}")),
            degraded: true,
            ..Self::new(topic)
        }
    }

    pub fn add_citations(&mut self, citations: impl IntoIterator<Item = String>) {
        for citation in citations {
            if !self.citations.contains(&citation) {
                self.citations.push(citation);
            }
        }
    }

    pub fn with_case_studies(mut self, case_studies: Vec<CaseStudy>) -> Self {
        self.case_studies = case_studies;
        self
    }

    /// Non-empty research stages in order.
    pub fn stages(&self) -> impl Iterator<Item = &str> {
        [&self.initial, &self.expanded, &self.final_report]
            .into_iter()
            .filter_map(|s| s.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

// --- Generated content ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub content: String,
    #[serde(default)]
    pub citations: Vec<String>,
    #[serde(default)]
    pub case_studies: Vec<CaseStudy>,
    #[serde(default)]
    pub degraded: bool,
}

/// Who the outreach is signed by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderInfo {
    pub name: String,
    pub title: String,
    pub company: String,
    pub email: String,
    pub phone: String,
}

impl Default for SenderInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            title: String::new(),
            company: DEFAULT_COMPANY.to_string(),
            email: String::new(),
            phone: String::new(),
        }
    }
}

// --- Pipeline results ---

/// Everything produced for one requested URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileOutcome {
    pub requested_url: String,
    pub target: Target,
    pub report: Option<Report>,
    pub emails: Option<String>,
    pub messages: Option<String>,
    pub error: Option<String>,
    #[serde(default)]
    pub partial_data: bool,
}

impl ProfileOutcome {
    pub fn failed(requested_url: impl Into<String>, target: Target, error: impl Into<String>) -> Self {
        Self {
            requested_url: requested_url.into(),
            target,
            report: None,
            emails: None,
            messages: None,
            error: Some(error.into()),
            partial_data: false,
        }
    }

    pub fn citations(&self) -> &[String] {
        self.report.as_ref().map_or(&[], |r| r.citations.as_slice())
    }
}

/// One pipeline run: exactly one outcome per distinct requested URL, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub topic: String,
    pub created_at: DateTime<Utc>,
    pub profiles: Vec<ProfileOutcome>,
}

impl PipelineResult {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            created_at: Utc::now(),
            profiles: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn get(&self, requested_url: &str) -> Option<&ProfileOutcome> {
        self.profiles.iter().find(|p| p.requested_url == requested_url)
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.requested_url.as_str())
    }

    /// Insert or replace the outcome for its requested URL.
    pub fn insert(&mut self, outcome: ProfileOutcome) {
        match self
            .profiles
            .iter_mut()
            .find(|p| p.requested_url == outcome.requested_url)
        {
            Some(existing) => *existing = outcome,
            None => self.profiles.push(outcome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_study_round_trips_with_source_tag() {
        let wiki = CaseStudy::Wiki {
            brand: "Acme".into(),
            image: vec![0xff, 0xd8, 0x00],
            analysis: "Grew reach 3x".into(),
            filename: "acme.png".into(),
        };
        let json = serde_json::to_value(&wiki).unwrap();
        assert_eq!(json["source"], "wiki");
        assert_eq!(json["image"], "/9gA");
        let back: CaseStudy = serde_json::from_value(json).unwrap();
        assert_eq!(back, wiki);
        assert_eq!(back.citation(), "Popular Pays Case Study: Acme");
        assert!(back.url().is_none());
    }

    #[test]
    fn citations_are_deduplicated_in_order() {
        let mut research = TopicResearch::new("Acme");
        research.add_citations(["b".to_string(), "a".to_string()]);
        research.add_citations(["a".to_string(), "c".to_string()]);
        assert_eq!(research.citations, ["b", "a", "c"]);
    }

    #[test]
    fn basic_research_has_placeholder_stage() {
        let research = TopicResearch::basic("Acme");
        assert!(research.degraded);
        assert_eq!(research.stages().collect::<Vec<_>>(), ["Basic information about Acme"]);
    }

    #[test]
    fn insert_replaces_existing_url() {
        let mut result = PipelineResult::new("t");
        let url = "https://linkedin.com/in/a";
        result.insert(ProfileOutcome::failed(url, Target::placeholder(url, "A"), "first"));
        result.insert(ProfileOutcome::failed(url, Target::placeholder(url, "A"), "second"));
        assert_eq!(result.len(), 1);
        assert_eq!(result.get(url).unwrap().error.as_deref(), Some("second"));
    }

    #[test]
    fn first_name_and_display() {
        let target = Target::new("Jane Doe", "CMO", "", "u");
        assert_eq!(target.first_name(), "Jane");
        assert_eq!(target.to_string(), "Jane Doe - CMO");
        assert!(Target::placeholder("u", "X").placeholder);
    }
}
