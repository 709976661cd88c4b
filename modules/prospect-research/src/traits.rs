// Trait abstractions for the pipeline's outbound dependencies.
//
// ChatModel — research and generation calls (Perplexity, OpenAI).
// ImageDescriber — vision analysis of wiki case-study images.
// ProfileScraper / PostScraper — the two Apify batch fetches.
// CaseStudySource — everything behind "find case studies for this topic".
// ProgressSink — optional step reporting, passed explicitly to Pipeline::run.
//
// Production impls live here; mocks live in testing.rs.

use std::sync::atomic::{AtomicUsize, Ordering};

use ai_client::{Completion, Message, OpenAi, Perplexity};
use anyhow::Result;
use apify_client::{ApifyClient, LinkedInPost, LinkedInProfile};
use async_trait::async_trait;
use prospect_common::CaseStudy;
use tracing::info;

// ---------------------------------------------------------------------------
// ChatModel
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Multi-turn completion. Fails when the response carries no content.
    async fn chat(&self, messages: &[Message]) -> Result<Completion>;

    /// Short, deterministic answer to a single prompt (selection lists).
    async fn pick(&self, prompt: &str) -> Result<String> {
        let completion = self.chat(&[Message::user(prompt)]).await?;
        Ok(completion.content.trim().to_string())
    }

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

#[async_trait]
impl ChatModel for OpenAi {
    async fn chat(&self, messages: &[Message]) -> Result<Completion> {
        Ok(OpenAi::chat(self, messages).await?)
    }

    async fn pick(&self, prompt: &str) -> Result<String> {
        Ok(OpenAi::pick(self, prompt).await?)
    }

    fn model_name(&self) -> &str {
        self.model()
    }
}

#[async_trait]
impl ChatModel for Perplexity {
    async fn chat(&self, messages: &[Message]) -> Result<Completion> {
        Ok(self.research(messages).await?)
    }

    fn model_name(&self) -> &str {
        self.model()
    }
}

// ---------------------------------------------------------------------------
// ImageDescriber
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ImageDescriber: Send + Sync {
    async fn describe(&self, prompt: &str, image: &[u8]) -> Result<String>;
}

/// Token cap for a single case-study image description.
pub const IMAGE_ANALYSIS_MAX_TOKENS: u32 = 800;

#[async_trait]
impl ImageDescriber for OpenAi {
    async fn describe(&self, prompt: &str, image: &[u8]) -> Result<String> {
        Ok(self
            .describe_image(prompt, image, IMAGE_ANALYSIS_MAX_TOKENS)
            .await?)
    }
}

// ---------------------------------------------------------------------------
// Scrapers
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ProfileScraper: Send + Sync {
    /// Scrape all profiles in one batch. Order of results is not guaranteed.
    async fn scrape_profiles(&self, urls: &[String]) -> Result<Vec<LinkedInProfile>>;
}

#[async_trait]
pub trait PostScraper: Send + Sync {
    /// Scrape up to `limit_per_profile` recent posts for each profile, in one batch.
    async fn scrape_posts(&self, urls: &[String], limit_per_profile: u32) -> Result<Vec<LinkedInPost>>;
}

#[async_trait]
impl ProfileScraper for ApifyClient {
    async fn scrape_profiles(&self, urls: &[String]) -> Result<Vec<LinkedInProfile>> {
        Ok(self.scrape_linkedin_profiles(urls).await?)
    }
}

#[async_trait]
impl PostScraper for ApifyClient {
    async fn scrape_posts(&self, urls: &[String], limit_per_profile: u32) -> Result<Vec<LinkedInPost>> {
        Ok(self.scrape_linkedin_posts(urls, limit_per_profile).await?)
    }
}

// ---------------------------------------------------------------------------
// CaseStudySource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CaseStudySource: Send + Sync {
    /// Up to `count` case studies relevant to `topic`, most relevant first.
    async fn find(&self, topic: &str, count: usize) -> Result<Vec<CaseStudy>>;
}

// ---------------------------------------------------------------------------
// ProgressSink
// ---------------------------------------------------------------------------

pub trait ProgressSink: Send + Sync {
    /// Called once per completed-or-started step; `step` is 1-based.
    fn step(&self, step: usize, total: usize, label: &str);
}

/// Step counter shared by concurrently running profile chains.
pub(crate) struct Progress<'a> {
    sink: Option<&'a dyn ProgressSink>,
    total: usize,
    current: AtomicUsize,
}

impl<'a> Progress<'a> {
    pub(crate) fn new(sink: Option<&'a dyn ProgressSink>, total: usize) -> Self {
        Self {
            sink,
            total,
            current: AtomicUsize::new(0),
        }
    }

    pub(crate) fn advance(&self, label: &str) {
        let step = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        info!(step, total = self.total, "{label}");
        if let Some(sink) = self.sink {
            sink.step(step, self.total, label);
        }
    }
}
