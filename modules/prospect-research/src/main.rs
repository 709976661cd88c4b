use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ai_client::{OpenAi, Perplexity};
use anyhow::{bail, Context, Result};
use apify_client::ApifyClient;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;
use uuid::Uuid;

use prospect_common::{results_dir_from_env, Config, SenderInfo, DEFAULT_COMPANY};
use prospect_research::case_studies::{CaseStudyLibrary, SitemapCaseStudies, WikiCaseStudies};
use prospect_research::export;
use prospect_research::traits::{ChatModel, ProgressSink};
use prospect_research::{Pipeline, PipelineSettings, ResultStore};

#[derive(Parser)]
#[command(name = "prospect", about = "LinkedIn prospect research and outreach generation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Research a topic and generate outreach for a batch of profiles.
    Run(RunArgs),
    /// Write a stored result as CSV.
    Export {
        id: Uuid,
        /// Output file (stdout when omitted).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Summarize a stored result.
    Show { id: Uuid },
    /// Delete a stored result.
    Clear { id: Uuid },
    /// List stored result ids.
    List,
}

#[derive(Args)]
struct RunArgs {
    /// Company or industry to research.
    #[arg(long)]
    topic: String,
    /// LinkedIn profile URL (repeatable).
    #[arg(long = "url")]
    urls: Vec<String>,
    /// File with one profile URL per line.
    #[arg(long)]
    urls_file: Option<PathBuf>,
    #[arg(long, env = "SENDER_NAME", default_value = "")]
    sender_name: String,
    #[arg(long, env = "SENDER_TITLE", default_value = "")]
    sender_title: String,
    #[arg(long, env = "SENDER_COMPANY", default_value = DEFAULT_COMPANY)]
    sender_company: String,
    #[arg(long, env = "SENDER_EMAIL", default_value = "")]
    sender_email: String,
    #[arg(long, env = "SENDER_PHONE", default_value = "")]
    sender_phone: String,
}

impl RunArgs {
    fn sender(&self) -> SenderInfo {
        SenderInfo {
            name: self.sender_name.clone(),
            title: self.sender_title.clone(),
            company: self.sender_company.clone(),
            email: self.sender_email.clone(),
            phone: self.sender_phone.clone(),
        }
    }

    fn all_urls(&self) -> Result<Vec<String>> {
        let mut urls = self.urls.clone();
        if let Some(path) = &self.urls_file {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("reading URL file {}", path.display()))?;
            urls.extend(
                contents
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty() && !l.starts_with('#'))
                    .map(str::to_string),
            );
        }
        validate_urls(&urls)?;
        Ok(urls)
    }
}

/// At least one URL, each an absolute http(s) URL.
fn validate_urls(urls: &[String]) -> Result<()> {
    if urls.iter().all(|u| u.trim().is_empty()) {
        bail!("at least one LinkedIn URL is required (--url or --urls-file)");
    }
    for raw in urls.iter().map(|u| u.trim()).filter(|u| !u.is_empty()) {
        let parsed = Url::parse(raw).with_context(|| format!("invalid URL: {raw}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("URL must be http or https: {raw}");
        }
    }
    Ok(())
}

/// Prints each step to stderr as it starts.
struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn step(&self, step: usize, total: usize, label: &str) {
        eprintln!("[{step}/{total}] {label}");
    }
}

fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let timeout = Duration::from_secs(config.http_timeout_secs);
    let http = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("building HTTP client")?;

    let openai = OpenAi::new(config.openai_api_key.clone(), config.outreach_model.clone()).with_timeout(timeout);
    let report_model = Arc::new(openai.with_model(config.report_model.clone()));
    let outreach_model = Arc::new(openai);
    let researcher = Arc::new(
        Perplexity::new(config.perplexity_api_key.clone(), config.research_model.clone()).with_timeout(timeout),
    );
    let apify = Arc::new(ApifyClient::new(config.apify_api_token.clone()).with_timeout(timeout));

    let selector: Arc<dyn ChatModel> = outreach_model.clone();
    let mut library = CaseStudyLibrary::new(SitemapCaseStudies::new(
        http.clone(),
        config.case_study_sitemap_url.clone(),
        selector.clone(),
    ));
    if let Some(wiki) = &config.wiki {
        library = library.with_wiki(WikiCaseStudies::new(
            http,
            wiki.clone(),
            selector,
            outreach_model.clone(),
        ));
    }

    Ok(Pipeline::builder()
        .researcher(researcher)
        .report_model(report_model)
        .outreach_model(outreach_model)
        .profile_scraper(apify.clone())
        .post_scraper(apify)
        .case_studies(Arc::new(library))
        .settings(PipelineSettings::from(config))
        .build())
}

async fn run(config: &Config, store: &ResultStore, args: RunArgs) -> Result<()> {
    let urls = args.all_urls()?;
    let pipeline = build_pipeline(config)?;
    let today = Utc::now().date_naive();
    let progress: &dyn ProgressSink = &StderrProgress;

    let result = pipeline
        .run(&args.topic, &urls, &args.sender(), today, Some(progress))
        .await?;

    let id = store.save(&result)?;
    info!(%id, profiles = result.len(), "Pipeline finished");
    println!("{id}");
    Ok(())
}

fn show(store: &ResultStore, id: Uuid) -> Result<()> {
    let result = store.load(id)?.with_context(|| format!("no stored result {id}"))?;
    println!("Topic: {}", result.topic);
    println!("Created: {}", result.created_at.to_rfc3339());
    println!("Profiles: {}", result.len());
    for outcome in &result.profiles {
        println!();
        println!("{}", outcome.target);
        println!("  URL: {}", outcome.requested_url);
        println!("  Posts: {}", outcome.target.recent_posts.len());
        println!("  Citations: {}", outcome.citations().len());
        println!("  Status: {}", export::status(outcome));
    }
    Ok(())
}

fn export_csv(store: &ResultStore, id: Uuid, out: Option<PathBuf>) -> Result<()> {
    let result = store.load(id)?.with_context(|| format!("no stored result {id}"))?;
    match out {
        Some(path) => {
            let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
            export::write_csv(&result, BufWriter::new(file))?;
            info!(%id, path = %path.display(), rows = result.len(), "CSV exported");
        }
        None => export::write_csv(&result, io::stdout().lock())?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("prospect=info".parse()?))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let store = ResultStore::new(results_dir_from_env());

    match cli.command {
        Command::Run(args) => {
            let config = Config::from_env()?;
            config.log_redacted();
            run(&config, &store, args).await
        }
        Command::Export { id, out } => export_csv(&store, id, out),
        Command::Show { id } => show(&store, id),
        Command::Clear { id } => {
            if store.delete(id)? {
                println!("Deleted {id}");
            } else {
                println!("No stored result {id}");
            }
            Ok(())
        }
        Command::List => {
            for id in store.list()? {
                println!("{id}");
            }
            Ok(())
        }
    }
}
