//! End-to-end research run for one topic and a batch of profile URLs.
//!
//! research topic -> case studies -> profiles (batch) -> posts (batch)
//! -> attach posts -> per profile {report -> emails -> messages} -> assemble
//!
//! Only the two batch fetches can fail the run. Everything else degrades:
//! research falls back to a basic placeholder, case studies to none,
//! generation to fixed failure text, and a profile chain that runs out of
//! time becomes an entry with an error.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Datelike, NaiveDate};
use futures::stream::{self, StreamExt};
use prospect_common::{Config, PipelineResult, ProfileOutcome, Report, SenderInfo, Target, TopicResearch};
use thiserror::Error;
use tracing::{error, info, warn};
use typed_builder::TypedBuilder;

use crate::dates::{filter_posts, PostFilterStats, PostWindow};
use crate::generator::{Generated, Generator};
use crate::matcher::{match_posts, match_profiles};
use crate::research::research_or_basic;
use crate::traits::{CaseStudySource, ChatModel, PostScraper, ProfileScraper, Progress, ProgressSink};

/// Run-level failures. Per-profile problems never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to fetch LinkedIn profiles: {0}")]
    ProfileFetch(String),

    #[error("Failed to fetch LinkedIn posts: {0}")]
    PostFetch(String),
}

/// Fixed steps before the per-profile chains start.
const SETUP_STEPS: usize = 4;
/// Steps in each profile chain.
const PROFILE_STEPS: usize = 3;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub posts_per_profile: u32,
    pub post_window_months: u32,
    pub case_study_count: usize,
    pub profile_concurrency: usize,
    pub profile_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            posts_per_profile: 10,
            post_window_months: 6,
            case_study_count: 3,
            profile_concurrency: 1,
            profile_timeout: Duration::from_secs(15 * 60),
        }
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            posts_per_profile: config.posts_per_profile,
            post_window_months: config.post_window_months,
            case_study_count: config.case_study_count,
            profile_concurrency: config.profile_concurrency,
            profile_timeout: Duration::from_secs(config.profile_timeout_secs),
        }
    }
}

/// Distinct, trimmed, non-empty URLs in first-seen order.
pub fn dedupe_urls(urls: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty() && seen.insert(*u))
        .map(str::to_string)
        .collect()
}

/// Total progress steps for `profiles` distinct URLs.
pub fn total_steps(profiles: usize) -> usize {
    SETUP_STEPS + PROFILE_STEPS * profiles
}

#[derive(TypedBuilder)]
pub struct Pipeline {
    researcher: Arc<dyn ChatModel>,
    report_model: Arc<dyn ChatModel>,
    outreach_model: Arc<dyn ChatModel>,
    profile_scraper: Arc<dyn ProfileScraper>,
    post_scraper: Arc<dyn PostScraper>,
    case_studies: Arc<dyn CaseStudySource>,
    #[builder(default)]
    settings: PipelineSettings,
}

impl Pipeline {
    /// Run the whole pipeline. `today` anchors the post window and the
    /// "current year" given to generation.
    ///
    /// On success the result holds exactly one entry per distinct requested
    /// URL, in request order.
    pub async fn run(
        &self,
        topic: &str,
        urls: &[String],
        sender: &SenderInfo,
        today: NaiveDate,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<PipelineResult, PipelineError> {
        let started = Instant::now();
        let requested = dedupe_urls(urls);
        let progress = Progress::new(sink, total_steps(requested.len()));
        info!(topic, profiles = requested.len(), "Research pipeline started");

        // 1. Topic research
        progress.advance(&format!("Researching {topic}"));
        let research = research_or_basic(self.researcher.as_ref(), topic).await;

        // 2. Case studies
        progress.advance("Fetching case studies");
        let case_studies = match self.case_studies.find(topic, self.settings.case_study_count).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Case study lookup failed, continuing without");
                Vec::new()
            }
        };
        let research = research.with_case_studies(case_studies);

        // 3. Profiles
        progress.advance("Fetching LinkedIn profiles");
        let scraped = if requested.is_empty() {
            Vec::new()
        } else {
            self.profile_scraper.scrape_profiles(&requested).await.map_err(|e| {
                error!(error = format!("{e:#}"), "Profile batch fetch failed");
                PipelineError::ProfileFetch(format!("{e:#}"))
            })?
        };
        let matched = match_profiles(&requested, &scraped);
        info!(
            scraped = scraped.len(),
            unmatched = matched.unmatched,
            placeholders = matched.placeholders,
            "Profiles matched"
        );

        // 4. Posts
        progress.advance("Fetching LinkedIn posts");
        let raw_posts = if requested.is_empty() {
            Vec::new()
        } else {
            self.post_scraper
                .scrape_posts(&requested, self.settings.posts_per_profile)
                .await
                .map_err(|e| {
                    error!(error = format!("{e:#}"), "Post batch fetch failed");
                    PipelineError::PostFetch(format!("{e:#}"))
                })?
        };
        let window = PostWindow::new(today, self.settings.post_window_months);
        let mut stats = PostFilterStats::default();
        let windowed = filter_posts(raw_posts, &window, &mut stats);
        let mut posts_by_url = match_posts(&requested, windowed, &mut stats);
        info!(
            total = stats.total,
            accepted = stats.accepted,
            skipped_no_content = stats.skipped_no_content,
            skipped_too_old = stats.skipped_too_old,
            skipped_url_mismatch = stats.skipped_url_mismatch,
            assumed_recent = stats.assumed_recent,
            window_start = %window.start(),
            "Posts filtered"
        );

        let targets: Vec<(String, Target)> = matched
            .targets
            .into_iter()
            .map(|(url, mut target)| {
                target.recent_posts = posts_by_url.remove(&url).unwrap_or_default();
                (url, target)
            })
            .collect();

        // 5. Per-profile generation
        let generator = Generator {
            report_model: self.report_model.as_ref(),
            outreach_model: self.outreach_model.as_ref(),
            sender,
            current_year: today.year(),
        };
        let research = &research;
        let progress = &progress;
        let outcomes: Vec<ProfileOutcome> = stream::iter(targets.into_iter().map(|(url, target)| {
            self.process_profile(generator, url, target, research, progress)
        }))
        .buffer_unordered(self.settings.profile_concurrency.max(1))
        .collect()
        .await;

        // 6. Assemble in request order
        let mut by_url: HashMap<String, ProfileOutcome> = outcomes
            .into_iter()
            .map(|o| (o.requested_url.clone(), o))
            .collect();
        let mut result = PipelineResult::new(topic);
        for url in &requested {
            match by_url.remove(url) {
                Some(outcome) => result.insert(outcome),
                None => warn!(url = url.as_str(), "No outcome for requested URL"),
            }
        }

        info!(
            topic,
            profiles = result.len(),
            errors = result.profiles.iter().filter(|p| p.error.is_some()).count(),
            partial = result.profiles.iter().filter(|p| p.partial_data).count(),
            elapsed_secs = started.elapsed().as_secs_f32(),
            "Research pipeline completed"
        );
        Ok(result)
    }

    async fn process_profile(
        &self,
        generator: Generator<'_>,
        url: String,
        target: Target,
        research: &TopicResearch,
        progress: &Progress<'_>,
    ) -> ProfileOutcome {
        let timeout = self.settings.profile_timeout;
        let steps = ProfileSteps::new(progress);
        let chain = generate_for(generator, &target, research, &steps);
        let outcome = tokio::time::timeout(timeout, chain).await;

        match outcome {
            Ok((report, emails, messages)) => {
                let partial_data =
                    target.placeholder || report.degraded || emails.degraded || messages.degraded;
                ProfileOutcome {
                    requested_url: url,
                    target,
                    report: Some(report),
                    emails: Some(emails.text),
                    messages: Some(messages.text),
                    error: None,
                    partial_data,
                }
            }
            Err(_) => {
                error!(url = url.as_str(), timeout_secs = timeout.as_secs(), "Profile processing timed out");
                steps.finish(&format!("Timed out processing {}", target.name));
                let reason = format!("timed out after {}s", timeout.as_secs());
                let mut outcome =
                    ProfileOutcome::failed(url, target, format!("Failed to process profile: {reason}"));
                outcome.partial_data = outcome.target.placeholder;
                outcome
            }
        }
    }
}

/// One profile's share of the run's progress steps.
struct ProfileSteps<'p, 'a> {
    progress: &'p Progress<'a>,
    emitted: AtomicUsize,
}

impl<'p, 'a> ProfileSteps<'p, 'a> {
    fn new(progress: &'p Progress<'a>) -> Self {
        Self {
            progress,
            emitted: AtomicUsize::new(0),
        }
    }

    fn advance(&self, label: &str) {
        self.emitted.fetch_add(1, Ordering::SeqCst);
        self.progress.advance(label);
    }

    /// Emit whatever steps the chain did not get to, so the run still reaches
    /// its total.
    fn finish(&self, label: &str) {
        let emitted = self.emitted.load(Ordering::SeqCst);
        for _ in emitted..PROFILE_STEPS {
            self.advance(label);
        }
    }
}

/// Report, then emails, then messages. Emails and messages build on the report.
async fn generate_for(
    generator: Generator<'_>,
    target: &Target,
    research: &TopicResearch,
    progress: &ProfileSteps<'_, '_>,
) -> (Report, Generated, Generated) {
    info!(target = target.name.as_str(), url = target.url.as_str(), "Processing profile");

    progress.advance(&format!("Generating report for {}", target.name));
    let report = generator.generate_report(target, research).await;

    progress.advance(&format!("Generating emails for {}", target.name));
    let emails = generator.generate_emails(target, &report).await;

    progress.advance(&format!("Generating LinkedIn messages for {}", target.name));
    let messages = generator.generate_messages(target, &report).await;

    (report, emails, messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingProgress;

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let urls = vec![
            " https://linkedin.com/in/a ".to_string(),
            "https://linkedin.com/in/b".to_string(),
            "https://linkedin.com/in/a".to_string(),
            "".to_string(),
        ];
        assert_eq!(
            dedupe_urls(&urls),
            ["https://linkedin.com/in/a", "https://linkedin.com/in/b"]
        );
    }

    #[test]
    fn step_totals() {
        assert_eq!(total_steps(0), 4);
        assert_eq!(total_steps(3), 13);
    }

    #[test]
    fn unfinished_profile_steps_are_filled_in() {
        let sink = RecordingProgress::default();
        let progress = Progress::new(Some(&sink), PROFILE_STEPS);
        let steps = ProfileSteps::new(&progress);
        steps.advance("report");
        steps.finish("timed out");
        let numbers: Vec<usize> = sink.steps().iter().map(|(n, _, _)| *n).collect();
        assert_eq!(numbers, [1, 2, 3]);

        steps.finish("again");
        assert_eq!(sink.steps().len(), 3);
    }

    #[test]
    fn settings_defaults() {
        let s = PipelineSettings::default();
        assert_eq!(s.profile_concurrency, 1);
        assert_eq!(s.profile_timeout, Duration::from_secs(900));
        assert_eq!(s.post_window_months, 6);
    }
}
