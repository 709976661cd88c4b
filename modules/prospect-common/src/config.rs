use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::info;

use crate::error::ProspectError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // AI providers
    pub openai_api_key: String,
    pub perplexity_api_key: String,
    pub research_model: String,
    pub report_model: String,
    pub outreach_model: String,

    // Scraping
    pub apify_api_token: String,
    pub posts_per_profile: u32,
    pub post_window_months: u32,

    // Case studies
    pub case_study_sitemap_url: String,
    pub case_study_count: usize,
    pub wiki: Option<WikiConfig>,

    // Runtime
    pub http_timeout_secs: u64,
    pub profile_concurrency: usize,
    pub profile_timeout_secs: u64,
    pub results_dir: PathBuf,
}

/// Confluence credentials for the internal case-study library.
#[derive(Debug, Clone)]
pub struct WikiConfig {
    pub base_url: String,
    pub email: String,
    pub api_token: String,
    /// Space key, or numeric space id.
    pub space: String,
}

const DEFAULT_RESULTS_DIR: &str = "data/research-results";

/// Result store location. Needs no credentials.
pub fn results_dir_from_env() -> PathBuf {
    results_dir_from_lookup(|key| env::var(key).ok())
}

pub fn results_dir_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup("RESULTS_DIR")
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR))
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ProspectError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ProspectError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                ProspectError::Config(format!("{key} environment variable is required"))
            })
        };
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let wiki = match (
            get("CONFLUENCE_BASE_URL"),
            get("CONFLUENCE_EMAIL"),
            get("CONFLUENCE_API_TOKEN"),
        ) {
            (Some(base_url), Some(email), Some(api_token)) => Some(WikiConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                email,
                api_token,
                space: or("CONFLUENCE_SPACE", "18514037"),
            }),
            _ => None,
        };

        Ok(Self {
            openai_api_key: required("OPENAI_API_KEY")?,
            perplexity_api_key: required("PERPLEXITY_API_KEY")?,
            research_model: or("RESEARCH_MODEL", "sonar-reasoning-pro"),
            report_model: or("REPORT_MODEL", "o3-mini"),
            outreach_model: or("OUTREACH_MODEL", "gpt-4.5-preview"),
            apify_api_token: required("APIFY_API_TOKEN")?,
            posts_per_profile: parsed(get("POSTS_PER_PROFILE"), "POSTS_PER_PROFILE", 10)?,
            post_window_months: parsed(get("POST_WINDOW_MONTHS"), "POST_WINDOW_MONTHS", 6)?,
            case_study_sitemap_url: or(
                "CASE_STUDY_SITEMAP_URL",
                "https://popularpays.com/sitemap.xml",
            ),
            case_study_count: parsed(get("CASE_STUDY_COUNT"), "CASE_STUDY_COUNT", 3)?,
            wiki,
            http_timeout_secs: parsed(get("HTTP_TIMEOUT_SECS"), "HTTP_TIMEOUT_SECS", 300)?,
            profile_concurrency: parsed(get("PROFILE_CONCURRENCY"), "PROFILE_CONCURRENCY", 1)?
                .max(1),
            profile_timeout_secs: parsed(
                get("PROFILE_TIMEOUT_SECS"),
                "PROFILE_TIMEOUT_SECS",
                900,
            )?,
            results_dir: results_dir_from_lookup(&lookup),
        })
    }

    /// Log the effective configuration without secrets.
    pub fn log_redacted(&self) {
        info!(
            research_model = %self.research_model,
            report_model = %self.report_model,
            outreach_model = %self.outreach_model,
            posts_per_profile = self.posts_per_profile,
            post_window_months = self.post_window_months,
            case_study_count = self.case_study_count,
            wiki_enabled = self.wiki.is_some(),
            http_timeout_secs = self.http_timeout_secs,
            profile_concurrency = self.profile_concurrency,
            results_dir = %self.results_dir.display(),
            "Configuration loaded"
        );
    }
}

fn parsed<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T, ProspectError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ProspectError::Config(format!("{key} must be a number, got {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("OPENAI_API_KEY", "sk"),
        ("PERPLEXITY_API_KEY", "pplx"),
        ("APIFY_API_TOKEN", "apify"),
    ];

    #[test]
    fn defaults_apply_when_optional_vars_missing() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.research_model, "sonar-reasoning-pro");
        assert_eq!(config.post_window_months, 6);
        assert_eq!(config.posts_per_profile, 10);
        assert_eq!(config.http_timeout_secs, 300);
        assert_eq!(config.profile_concurrency, 1);
        assert!(config.wiki.is_none());
    }

    #[test]
    fn missing_required_key_is_config_error() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains("APIFY_API_TOKEN"));
    }

    #[test]
    fn bad_number_is_config_error() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("POST_WINDOW_MONTHS", "six"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ProspectError::Config(_)));
    }

    #[test]
    fn wiki_enabled_when_credentials_present() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("CONFLUENCE_BASE_URL", "https://wiki.example.net/"),
            ("CONFLUENCE_EMAIL", "ops@example.com"),
            ("CONFLUENCE_API_TOKEN", "t"),
        ]);
        let wiki = Config::from_lookup(lookup(&pairs)).unwrap().wiki.unwrap();
        assert_eq!(wiki.base_url, "https://wiki.example.net");
        assert_eq!(wiki.space, "18514037");
    }

    #[test]
    fn results_dir_needs_no_credentials() {
        assert_eq!(
            results_dir_from_lookup(lookup(&[])),
            PathBuf::from("data/research-results")
        );
        assert_eq!(
            results_dir_from_lookup(lookup(&[("RESULTS_DIR", "/tmp/out")])),
            PathBuf::from("/tmp/out")
        );
    }
}
