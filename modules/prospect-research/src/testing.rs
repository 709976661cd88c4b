// Test mocks for the research pipeline.
//
// One mock per trait boundary:
// - MockChat (ChatModel) — scripted replies, or replies keyed on prompt text
// - MockScraper (ProfileScraper + PostScraper) — canned batches or failures
// - MockCaseStudies (CaseStudySource) — fixed list or failure
// - MockDescriber (ImageDescriber) — echoes a fixed analysis
// - RecordingProgress (ProgressSink) — remembers every step
//
// Plus helpers for building scraped records.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use ai_client::{AiError, Completion, Message};
use anyhow::{anyhow, bail, Result};
use apify_client::{LinkedInPost, LinkedInProfile, PostAuthor};
use async_trait::async_trait;
use prospect_common::CaseStudy;

use crate::traits::{CaseStudySource, ChatModel, ImageDescriber, PostScraper, ProfileScraper, ProgressSink};

// ---------------------------------------------------------------------------
// MockChat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Scripted {
    Reply(Completion),
    Fail(String),
    Timeout,
}

impl Scripted {
    fn into_result(self) -> Result<Completion> {
        match self {
            Scripted::Reply(c) => Ok(c),
            Scripted::Fail(msg) => Err(anyhow!(AiError::Network(msg))),
            Scripted::Timeout => Err(anyhow!(AiError::Timeout("operation timed out".into()))),
        }
    }
}

/// Chat model with a queue of scripted responses.
///
/// Rules registered with `.when()` take precedence: the first rule whose needle
/// appears in any message content answers, and rules are never consumed. Calls
/// are otherwise answered from the queue in order; an empty queue is an error.
pub struct MockChat {
    queue: Mutex<VecDeque<Scripted>>,
    rules: Vec<(String, Scripted)>,
    delay: Option<(String, Duration)>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockChat {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            rules: Vec::new(),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn push(self, scripted: Scripted) -> Self {
        self.queue.lock().unwrap().push_back(scripted);
        self
    }

    pub fn reply(self, content: &str) -> Self {
        self.reply_with_citations(content, &[])
    }

    pub fn reply_with_citations(self, content: &str, citations: &[&str]) -> Self {
        self.push(Scripted::Reply(Completion {
            content: content.to_string(),
            citations: citations.iter().map(|c| c.to_string()).collect(),
        }))
    }

    pub fn fail(self, message: &str) -> Self {
        self.push(Scripted::Fail(message.to_string()))
    }

    pub fn timeout(self) -> Self {
        self.push(Scripted::Timeout)
    }

    /// Answer any call whose messages contain `needle` with `content`.
    pub fn when(mut self, needle: &str, content: &str) -> Self {
        self.rules.push((
            needle.to_string(),
            Scripted::Reply(Completion {
                content: content.to_string(),
                citations: Vec::new(),
            }),
        ));
        self
    }

    /// Fail any call whose messages contain `needle` with a timeout.
    pub fn timeout_when(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), Scripted::Timeout));
        self
    }

    /// Sleep before answering calls whose messages contain `needle`.
    pub fn delay_when(mut self, needle: &str, delay: Duration) -> Self {
        self.delay = Some((needle.to_string(), delay));
        self
    }

    /// Every message list received, in call order.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockChat {
    fn default() -> Self {
        Self::new()
    }
}

fn mentions(messages: &[Message], needle: &str) -> bool {
    messages.iter().any(|m| m.content.contains(needle))
}

#[async_trait]
impl ChatModel for MockChat {
    async fn chat(&self, messages: &[Message]) -> Result<Completion> {
        self.calls.lock().unwrap().push(messages.to_vec());

        if let Some((needle, delay)) = &self.delay {
            if mentions(messages, needle) {
                tokio::time::sleep(*delay).await;
            }
        }

        if let Some((_, scripted)) = self.rules.iter().find(|(needle, _)| mentions(messages, needle)) {
            return scripted.clone().into_result();
        }

        let next = self.queue.lock().unwrap().pop_front();
        match next {
            Some(scripted) => scripted.into_result(),
            None => bail!("MockChat: no scripted response left"),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// MockScraper
// ---------------------------------------------------------------------------

/// Canned profile and post batches. Unset batches are empty; `fail_*` makes
/// the whole batch fail.
#[derive(Default)]
pub struct MockScraper {
    profiles: Vec<LinkedInProfile>,
    posts: Vec<LinkedInPost>,
    profiles_error: Option<String>,
    posts_error: Option<String>,
    post_requests: Mutex<Vec<(Vec<String>, u32)>>,
}

impl MockScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(mut self, profiles: Vec<LinkedInProfile>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn with_posts(mut self, posts: Vec<LinkedInPost>) -> Self {
        self.posts = posts;
        self
    }

    pub fn fail_profiles(mut self, message: &str) -> Self {
        self.profiles_error = Some(message.to_string());
        self
    }

    pub fn fail_posts(mut self, message: &str) -> Self {
        self.posts_error = Some(message.to_string());
        self
    }

    pub fn post_requests(&self) -> Vec<(Vec<String>, u32)> {
        self.post_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProfileScraper for MockScraper {
    async fn scrape_profiles(&self, _urls: &[String]) -> Result<Vec<LinkedInProfile>> {
        match &self.profiles_error {
            Some(msg) => bail!("MockScraper: {msg}"),
            None => Ok(self.profiles.clone()),
        }
    }
}

#[async_trait]
impl PostScraper for MockScraper {
    async fn scrape_posts(&self, urls: &[String], limit_per_profile: u32) -> Result<Vec<LinkedInPost>> {
        self.post_requests
            .lock()
            .unwrap()
            .push((urls.to_vec(), limit_per_profile));
        match &self.posts_error {
            Some(msg) => bail!("MockScraper: {msg}"),
            None => Ok(self.posts.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// MockCaseStudies / MockDescriber
// ---------------------------------------------------------------------------

pub struct MockCaseStudies {
    result: std::result::Result<Vec<CaseStudy>, String>,
}

impl MockCaseStudies {
    pub fn returning(case_studies: Vec<CaseStudy>) -> Self {
        Self {
            result: Ok(case_studies),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl CaseStudySource for MockCaseStudies {
    async fn find(&self, _topic: &str, count: usize) -> Result<Vec<CaseStudy>> {
        match &self.result {
            Ok(list) => Ok(list.iter().take(count).cloned().collect()),
            Err(msg) => bail!("MockCaseStudies: {msg}"),
        }
    }
}

/// Returns `"<analysis> (<n> bytes)"` for every image.
pub struct MockDescriber {
    pub analysis: String,
}

#[async_trait]
impl ImageDescriber for MockDescriber {
    async fn describe(&self, _prompt: &str, image: &[u8]) -> Result<String> {
        Ok(format!("{} ({} bytes)", self.analysis, image.len()))
    }
}

// ---------------------------------------------------------------------------
// RecordingProgress
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingProgress {
    steps: Mutex<Vec<(usize, usize, String)>>,
}

impl RecordingProgress {
    pub fn steps(&self) -> Vec<(usize, usize, String)> {
        self.steps.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn step(&self, step: usize, total: usize, label: &str) {
        self.steps.lock().unwrap().push((step, total, label.to_string()));
    }
}

// ---------------------------------------------------------------------------
// Record builders
// ---------------------------------------------------------------------------

pub fn scraped_profile(url: &str, name: &str, headline: &str) -> LinkedInProfile {
    LinkedInProfile {
        profile_url: Some(url.to_string()),
        full_name: Some(name.to_string()),
        headline: Some(headline.to_string()),
        summary: Some(format!("{name} bio")),
        ..LinkedInProfile::default()
    }
}

pub fn scraped_post(source_url: &str, text: &str, time_since_posted: &str) -> LinkedInPost {
    LinkedInPost {
        source_url: Some(source_url.to_string()),
        author: Some(PostAuthor::default()),
        text: Some(text.to_string()),
        url: Some(format!("{source_url}/post")),
        time_since_posted: Some(time_since_posted.to_string()),
        ..LinkedInPost::default()
    }
}
