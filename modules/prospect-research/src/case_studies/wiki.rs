//! Campaign examples kept on the internal Confluence wiki.
//!
//! Layout: a "Campaign Examples" page whose children are category pages.
//! Each category page holds a table with (at least) `Brand` and `Preview`
//! columns; the preview cell carries the case-study image as an attachment,
//! an inline image, or a link.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use prospect_common::config::WikiConfig;
use prospect_common::CaseStudy;
use reqwest::header::ACCEPT;
use scraper::{ElementRef, Html, Selector};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, warn};

use crate::traits::{CaseStudySource, ChatModel, ImageDescriber};

const CAMPAIGN_EXAMPLES: &str = "Campaign Examples";
const BRAND_MATCH_THRESHOLD: f64 = 0.6;
const ANALYSIS_FAILED: &str = "Failed to analyze case study image.";

static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").expect("valid selector"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));

// --- Confluence payloads ---

#[derive(Debug, Deserialize)]
struct Results<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Space {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PageRef {
    id: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Default, Deserialize)]
struct PageContent {
    #[serde(default)]
    body: Option<PageBody>,
}

#[derive(Debug, Default, Deserialize)]
struct PageBody {
    #[serde(default)]
    storage: Option<Storage>,
}

#[derive(Debug, Default, Deserialize)]
struct Storage {
    #[serde(default)]
    value: String,
}

// --- Table parsing ---

/// Where the case-study image for a row lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    /// Page attachments, by filename.
    Attachments(Vec<String>),
    /// `<img src>`.
    Image(String),
    /// `<a href>`.
    Link(String),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandRow {
    pub brand: String,
    pub preview: Preview,
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().map(str::trim).collect()
}

fn cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
        .collect()
}

fn preview(cell: ElementRef<'_>) -> Preview {
    let elements: Vec<ElementRef<'_>> = cell.descendants().filter_map(ElementRef::wrap).collect();

    let attachments: Vec<String> = elements
        .iter()
        .filter(|el| el.value().name() == "ri:attachment")
        .filter_map(|el| el.value().attr("ri:filename"))
        .map(str::to_string)
        .collect();
    if !attachments.is_empty() {
        return Preview::Attachments(attachments);
    }

    let attr_of = |tag: &str, attr: &str| {
        elements
            .iter()
            .find(|el| el.value().name() == tag)
            .and_then(|el| el.value().attr(attr))
            .map(str::to_string)
    };
    if let Some(src) = attr_of("img", "src") {
        return Preview::Image(src);
    }
    if let Some(href) = attr_of("a", "href") {
        return Preview::Link(href);
    }
    Preview::Empty
}

/// Rows of the first table in a page's storage HTML.
pub fn parse_brand_table(storage: &str) -> Result<Vec<BrandRow>> {
    let document = Html::parse_fragment(storage);
    let table = document.select(&TABLE).next().context("no table in category page")?;
    let mut rows = table.select(&ROW);

    let header = rows.next().context("table has no rows")?;
    let headers: Vec<String> = cells(header).into_iter().map(|c| cell_text(c).to_lowercase()).collect();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let (Some(brand_idx), Some(preview_idx)) = (column("brand"), column("preview")) else {
        bail!("table is missing brand/preview columns (found {headers:?})");
    };

    Ok(rows
        .filter_map(|row| {
            let cells = cells(row);
            let brand = cell_text(*cells.get(brand_idx)?);
            let preview = preview(*cells.get(preview_idx)?);
            Some(BrandRow { brand, preview })
        })
        .collect())
}

/// Best option per suggestion, scoring at least the threshold.
pub fn close_matches(suggestions: &[String], options: &[String]) -> HashSet<String> {
    suggestions
        .iter()
        .filter_map(|s| {
            let s = s.to_lowercase();
            options
                .iter()
                .map(|o| (o, strsim::normalized_levenshtein(&s, &o.to_lowercase())))
                .filter(|(_, score)| *score >= BRAND_MATCH_THRESHOLD)
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(o, _)| o.clone())
        })
        .collect()
}

/// Absolute URL for a wiki-relative `src`/`href`.
fn absolute_url(base: &str, target: &str) -> String {
    if target.starts_with("http") {
        target.to_string()
    } else if target.starts_with('/') {
        format!("{base}{target}")
    } else {
        format!("{base}/{target}")
    }
}

fn file_name(target: &str) -> Option<String> {
    let path = target.split('?').next()?;
    path.rsplit('/').next().filter(|s| !s.is_empty()).map(str::to_string)
}

fn category_prompt(topic: &str, categories: &[&str]) -> String {
    format!(
        "Given information about {topic}, which category is most relevant? \
         Choose only 1 and your output should be only the category name without any additional text. \
         Here is the list of categories: {}",
        categories.join(", ")
    )
}

fn brands_prompt(topic: &str, brands: &[&str], count: usize) -> String {
    format!(
        "The {topic} brand is most relevant to which {count} brands? \
         Choose only {count} and your output should be only the brand names separated by commas \
         without any additional text. Here is the list of brands: {}",
        brands.join(", ")
    )
}

fn vision_prompt(topic: &str) -> String {
    format!(
        "This is a case study image for a Popular Pays marketing campaign.\n\n\
         Please extract and summarize the key details from this image including:\n\
         1. The client/brand featured in the case study\n\
         2. Key performance metrics (e.g., engagement rate, ROI, reach)\n\
         3. Campaign strategy used\n\
         4. Target audience if mentioned\n\
         5. Any specific successful tactics mentioned\n\n\
         Format this as a concise summary that could be referenced when discussing with {topic}.\n\
         Only include factual information visible in the image, don't make up details."
    )
}

// --- Source ---

pub struct WikiCaseStudies {
    http: reqwest::Client,
    config: WikiConfig,
    selector: Arc<dyn ChatModel>,
    describer: Arc<dyn ImageDescriber>,
}

impl WikiCaseStudies {
    pub fn new(
        http: reqwest::Client,
        mut config: WikiConfig,
        selector: Arc<dyn ChatModel>,
        describer: Arc<dyn ImageDescriber>,
    ) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self {
            http,
            config,
            selector,
            describer,
        }
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        self.http
            .get(url)
            .basic_auth(&self.config.email, Some(&self.config.api_token))
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("GET {url}"))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{path}", self.config.base_url);
        self.get(&url, query)
            .await?
            .json()
            .await
            .with_context(|| format!("decoding {path}"))
    }

    async fn space_id(&self) -> Result<String> {
        let space = self.config.space.trim();
        if !space.is_empty() && space.chars().all(|c| c.is_ascii_digit()) {
            return Ok(space.to_string());
        }
        let spaces: Results<Space> = self.get_json("/wiki/api/v2/spaces", &[("keys", space)]).await?;
        spaces
            .results
            .into_iter()
            .next()
            .map(|s| s.id)
            .with_context(|| format!("no space with key {space}"))
    }

    async fn page_by_title(&self, space_id: &str, title: &str) -> Result<PageRef> {
        let pages: Results<PageRef> = self
            .get_json(
                "/wiki/rest/api/content",
                &[("spaceId", space_id), ("title", title), ("limit", "1")],
            )
            .await?;
        pages
            .results
            .into_iter()
            .next()
            .with_context(|| format!("no page titled {title:?}"))
    }

    async fn child_pages(&self, page_id: &str) -> Result<Vec<PageRef>> {
        let pages: Results<PageRef> = self
            .get_json(&format!("/wiki/rest/api/content/{page_id}/child/page"), &[])
            .await?;
        Ok(pages.results)
    }

    async fn page_storage(&self, page_id: &str) -> Result<String> {
        let page: PageContent = self
            .get_json(
                &format!("/wiki/rest/api/content/{page_id}"),
                &[("expand", "body.storage")],
            )
            .await?;
        page.body
            .and_then(|b| b.storage)
            .map(|s| s.value)
            .filter(|v| !v.trim().is_empty())
            .context("category page has no storage content")
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self.get(url, &[]).await?.bytes().await.context("reading image body")?;
        Ok(bytes.to_vec())
    }

    /// First preview image that downloads, with its filename.
    async fn fetch_preview(&self, page_id: &str, preview: &Preview) -> Option<(Vec<u8>, Option<String>)> {
        let base = &self.config.base_url;
        let candidates: Vec<(String, Option<String>)> = match preview {
            Preview::Attachments(files) => files
                .iter()
                .map(|f| (format!("{base}/wiki/download/attachments/{page_id}/{f}"), Some(f.clone())))
                .collect(),
            Preview::Image(target) | Preview::Link(target) => {
                vec![(absolute_url(base, target), file_name(target))]
            }
            Preview::Empty => Vec::new(),
        };

        for (url, filename) in candidates {
            match self.download(&url).await {
                Ok(bytes) => return Some((bytes, filename)),
                Err(e) => warn!(url, error = %e, "Case study image download failed"),
            }
        }
        None
    }

    async fn choose_category<'a>(&self, topic: &str, categories: &'a [PageRef]) -> Option<&'a PageRef> {
        let titles: Vec<&str> = categories.iter().map(|c| c.title.as_str()).collect();
        let picked = match self.selector.pick(&category_prompt(topic, &titles)).await {
            Ok(picked) => picked,
            Err(e) => {
                warn!(error = %e, "Category selection failed, using first category");
                String::new()
            }
        };
        categories
            .iter()
            .find(|c| c.title == picked.trim())
            .or_else(|| categories.first())
    }

    async fn choose_brands(&self, topic: &str, brands: &[String], count: usize) -> HashSet<String> {
        let names: Vec<&str> = brands.iter().map(String::as_str).collect();
        let suggestions: Vec<String> = match self.selector.pick(&brands_prompt(topic, &names, count)).await {
            Ok(picked) => picked.split(',').map(|s| s.trim().to_string()).collect(),
            Err(e) => {
                warn!(error = %e, "Brand selection failed, using first brands");
                brands.iter().take(count).cloned().collect()
            }
        };
        close_matches(&suggestions, brands)
    }
}

#[async_trait]
impl CaseStudySource for WikiCaseStudies {
    async fn find(&self, topic: &str, count: usize) -> Result<Vec<CaseStudy>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let space_id = self.space_id().await?;
        let root = self.page_by_title(&space_id, CAMPAIGN_EXAMPLES).await?;
        let categories = self.child_pages(&root.id).await?;
        let category = self
            .choose_category(topic, &categories)
            .await
            .context("no categories under Campaign Examples")?;
        info!(category = %category.title, "Wiki case study category selected");

        let storage = self.page_storage(&category.id).await?;
        let rows = parse_brand_table(&storage)?;
        let brands: Vec<String> = rows.iter().map(|r| r.brand.clone()).collect();
        let selected = self.choose_brands(topic, &brands, count).await;

        let mut case_studies = Vec::new();
        for row in rows.iter().filter(|r| selected.contains(&r.brand)) {
            if case_studies.len() >= count {
                break;
            }
            let Some((image, filename)) = self.fetch_preview(&category.id, &row.preview).await else {
                warn!(brand = %row.brand, "No preview image for case study");
                continue;
            };

            let analysis = match self.describer.describe(&vision_prompt(topic), &image).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(brand = %row.brand, error = %e, "Case study image analysis failed");
                    ANALYSIS_FAILED.to_string()
                }
            };

            case_studies.push(CaseStudy::Wiki {
                filename: filename.unwrap_or_else(|| format!("{}.png", row.brand)),
                brand: row.brand.clone(),
                image,
                analysis,
            });
        }

        info!(topic, found = case_studies.len(), "Wiki case studies collected");
        Ok(case_studies)
    }
}
