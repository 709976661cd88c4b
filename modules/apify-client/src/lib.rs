pub mod error;
pub mod types;

pub use error::{ApifyError, Result};
pub use types::{
    LinkedInPost, LinkedInPostInput, LinkedInProfile, LinkedInProfileInput, PostAuthor, RunData,
};

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use types::ApiResponse;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Actor ID for dev_fusion/linkedin-profile-scraper.
const LINKEDIN_PROFILE_SCRAPER: &str = "dev_fusion~linkedin-profile-scraper";

/// Actor ID for supreme_coder/linkedin-post.
const LINKEDIN_POST_SCRAPER: &str = "supreme_coder~linkedin-post";

/// Total timeout per HTTP request. Must exceed the 60s long-poll window.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            token,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        self
    }

    /// Start an actor run. Returns immediately with run metadata.
    pub async fn start_run<I: Serialize>(&self, actor_id: &str, input: &I) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", self.base_url, actor_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Poll until a run completes. Uses `waitForFinish=60` for efficient long-polling.
    pub async fn wait_for_run(&self, run_id: &str) -> Result<RunData> {
        loop {
            let url = format!("{}/actor-runs/{}?waitForFinish=60", self.base_url, run_id);
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ApifyError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let api_resp: ApiResponse<RunData> = resp.json().await?;
            match api_resp.data.status.as_str() {
                "SUCCEEDED" => return Ok(api_resp.data),
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(ApifyError::RunFailed(api_resp.data.status));
                }
                _ => {
                    tracing::debug!(run_id, status = %api_resp.data.status, "Run still in progress");
                    continue;
                }
            }
        }
    }

    /// Fetch dataset items from a completed run.
    pub async fn get_dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items?format=json", self.base_url, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let items: Vec<T> = serde_json::from_str(&body)?;
        Ok(items)
    }

    /// Start a run, poll until it finishes, and fetch its dataset.
    pub async fn run_actor<I: Serialize, T: DeserializeOwned>(
        &self,
        actor_id: &str,
        input: &I,
    ) -> Result<Vec<T>> {
        let run = self.start_run(actor_id, input).await?;
        tracing::info!(actor_id, run_id = %run.id, "Apify run started, polling for completion");

        let completed = self.wait_for_run(&run.id).await?;
        tracing::info!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            "Run completed, fetching results"
        );

        self.get_dataset_items(&completed.default_dataset_id).await
    }

    /// Scrape LinkedIn profiles end-to-end: start run, poll, fetch results.
    pub async fn scrape_linkedin_profiles(&self, urls: &[String]) -> Result<Vec<LinkedInProfile>> {
        tracing::info!(count = urls.len(), "Starting LinkedIn profile scrape");

        let input = LinkedInProfileInput {
            profile_urls: urls.to_vec(),
        };
        let profiles: Vec<LinkedInProfile> =
            self.run_actor(LINKEDIN_PROFILE_SCRAPER, &input).await?;
        tracing::info!(count = profiles.len(), "Fetched LinkedIn profiles");

        Ok(profiles)
    }

    /// Scrape recent LinkedIn posts for each profile URL.
    pub async fn scrape_linkedin_posts(
        &self,
        urls: &[String],
        limit_per_source: u32,
    ) -> Result<Vec<LinkedInPost>> {
        tracing::info!(count = urls.len(), limit_per_source, "Starting LinkedIn post scrape");

        let input = LinkedInPostInput {
            urls: urls.to_vec(),
            limit_per_source,
            deep_scrape: true,
        };
        let posts: Vec<LinkedInPost> = self.run_actor(LINKEDIN_POST_SCRAPER, &input).await?;
        tracing::info!(count = posts.len(), "Fetched LinkedIn posts");

        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn run(status: &str) -> serde_json::Value {
        json!({"data": {"id": "run1", "status": status, "defaultDatasetId": "ds1"}})
    }

    #[tokio::test]
    async fn scrape_profiles_runs_actor_and_reads_dataset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/acts/{LINKEDIN_PROFILE_SCRAPER}/runs")))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(json!({"profileUrls": ["https://linkedin.com/in/jane-doe"]})))
            .respond_with(ResponseTemplate::new(201).set_body_json(run("RUNNING")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/actor-runs/run1"))
            .and(query_param("waitForFinish", "60"))
            .respond_with(ResponseTemplate::new(200).set_body_json(run("SUCCEEDED")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/datasets/ds1/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"profileUrl": "https://linkedin.com/in/jane-doe/", "fullName": "Jane Doe"}
            ])))
            .mount(&server)
            .await;

        let client = ApifyClient::new("tok".into()).with_base_url(server.uri());
        let profiles = client
            .scrape_linkedin_profiles(&["https://linkedin.com/in/jane-doe".to_string()])
            .await
            .unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].display_name().as_deref(), Some("Jane Doe"));
    }

    #[tokio::test]
    async fn failed_run_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(run("READY")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/actor-runs/run1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(run("FAILED")))
            .mount(&server)
            .await;

        let client = ApifyClient::new("tok".into()).with_base_url(server.uri());
        let err = client.scrape_linkedin_posts(&[], 10).await.unwrap_err();
        assert!(matches!(err, ApifyError::RunFailed(ref s) if s == "FAILED"), "got {err:?}");
    }

    #[tokio::test]
    async fn rejected_start_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let client = ApifyClient::new("tok".into()).with_base_url(server.uri());
        let err = client.scrape_linkedin_profiles(&[]).await.unwrap_err();
        assert!(matches!(err, ApifyError::Api { status: 401, .. }), "got {err:?}");
    }
}
