//! Case studies published on the public website, discovered via sitemap.xml.

use std::sync::{Arc, LazyLock};

use anyhow::{Context, Result};
use async_trait::async_trait;
use prospect_common::CaseStudy;
use regex::Regex;
use tracing::{info, warn};

use crate::traits::{CaseStudySource, ChatModel};

static LOC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<loc>\s*([^<]+?)\s*</loc>").expect("valid regex"));

const CASE_STUDY_PATH: &str = "/case-studies/";

/// Minimum similarity for an LLM-suggested title to count as a pick.
const TITLE_MATCH_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    pub url: String,
    pub title: String,
}

impl SitemapEntry {
    fn into_case_study(self) -> CaseStudy {
        CaseStudy::Website {
            summary: format!("Case study from Popular Pays website: {}", self.title),
            brand: self.title,
            url: self.url,
        }
    }
}

/// `"acme-summer-launch"` -> `"Acme Summer Launch"`.
fn title_from_slug(slug: &str) -> String {
    slug.trim_matches('/')
        .split(['-', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Undo the five predefined XML entities. `&amp;` goes last so `&amp;lt;`
/// stays `&lt;`.
fn decode_xml_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Every case-study page listed in a sitemap, excluding the index page.
pub fn parse_sitemap(xml: &str) -> Vec<SitemapEntry> {
    LOC.captures_iter(xml)
        .filter_map(|c| {
            let url = decode_xml_entities(c.get(1)?.as_str());
            let (_, slug) = url.split_once(CASE_STUDY_PATH)?;
            let slug = slug.split(['?', '#']).next().unwrap_or_default();
            let title = title_from_slug(slug);
            if title.is_empty() {
                return None;
            }
            Some(SitemapEntry { url, title })
        })
        .collect()
}

fn selection_prompt(topic: &str, titles: &[&str], count: usize) -> String {
    format!(
        "Given information about {topic}, which {count} case studies are most relevant? \
         Choose only {count} and your output should be only the case study titles \
         separated by commas without any additional text. \
         Here is the list of case studies: {}",
        titles.join(", ")
    )
}

/// Resolve a comma-separated list of suggested titles against the entries,
/// then top up in sitemap order until `count` are chosen.
pub fn select_entries(suggested: &str, entries: &[SitemapEntry], count: usize) -> Vec<SitemapEntry> {
    let mut chosen: Vec<&SitemapEntry> = Vec::new();

    for suggestion in suggested.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let suggestion = suggestion.to_lowercase();
        let best = entries
            .iter()
            .map(|e| (e, strsim::normalized_levenshtein(&suggestion, &e.title.to_lowercase())))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((entry, score)) = best {
            if score > TITLE_MATCH_THRESHOLD && !chosen.contains(&entry) {
                chosen.push(entry);
            }
        }
    }

    for entry in entries {
        if chosen.len() >= count {
            break;
        }
        if !chosen.contains(&entry) {
            chosen.push(entry);
        }
    }

    chosen.into_iter().take(count).cloned().collect()
}

pub struct SitemapCaseStudies {
    http: reqwest::Client,
    sitemap_url: String,
    selector: Arc<dyn ChatModel>,
}

impl SitemapCaseStudies {
    pub fn new(http: reqwest::Client, sitemap_url: impl Into<String>, selector: Arc<dyn ChatModel>) -> Self {
        Self {
            http,
            sitemap_url: sitemap_url.into(),
            selector,
        }
    }

    async fn entries(&self) -> Result<Vec<SitemapEntry>> {
        let xml = self
            .http
            .get(&self.sitemap_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("fetching sitemap {}", self.sitemap_url))?
            .text()
            .await
            .context("reading sitemap body")?;
        Ok(parse_sitemap(&xml))
    }
}

#[async_trait]
impl CaseStudySource for SitemapCaseStudies {
    async fn find(&self, topic: &str, count: usize) -> Result<Vec<CaseStudy>> {
        let entries = self.entries().await?;
        info!(found = entries.len(), "Case study pages in sitemap");
        if entries.is_empty() || count == 0 {
            return Ok(Vec::new());
        }

        let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
        let suggested = match self.selector.pick(&selection_prompt(topic, &titles, count)).await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Case study selection failed, using sitemap order");
                String::new()
            }
        };

        let selected = select_entries(&suggested, &entries, count);
        info!(topic, selected = selected.len(), "Website case studies selected");
        Ok(selected.into_iter().map(SitemapEntry::into_case_study).collect())
    }
}
