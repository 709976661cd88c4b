//! Three-stage topic research on one growing conversation.

use std::time::Instant;

use ai_client::Message;
use anyhow::{Context, Result};
use prospect_common::TopicResearch;
use tracing::{info, warn};

use crate::traits::ChatModel;

fn system_prompt(topic: &str) -> String {
    format!(
        "You are a sales person working for Popular Pays, a Lightricks brand. Popular Pays is an \
         influencer agency. You are tasked with the goal of securing a meeting with relevant people \
         from {topic} so we can sell them an influencer campaign. When mentioning any statistics, \
         case studies, or blog posts, please provide actual URLs."
    )
}

fn initial_prompt(topic: &str) -> String {
    format!(
        "Do an exhaustive research on {topic}, I want to know:\n\
         1. About pain points.\n\
         2. What is the value proposition Popular Pays can offer?\n\
         3. What their brand is about?\n\
         4. Research marketing, social media, influencers, brand teams, creative teams, communities etc.\n\
         5. Find a connection between {topic} and Lightricks.\n\
         I want at least 500 words on each of the relevant points with specific evidence and examples."
    )
}

const EXPANSION_PROMPT: &str = "Expand on the most critical pain points and how Popular Pays \
    specifically addresses them. Include competitor analysis and specific use cases with evidence.";

const FINAL_PROMPT: &str = "Give me a final comprehensive report on everything you've researched \
    about this topic. Include specific strategies, statistics, case studies, and actionable insights.";

/// Run the three research turns. Any failure aborts the sequence with an error.
pub async fn research_topic(model: &dyn ChatModel, topic: &str) -> Result<TopicResearch> {
    let started = Instant::now();
    let mut research = TopicResearch::new(topic);
    let mut messages = vec![Message::system(system_prompt(topic)), Message::user(initial_prompt(topic))];

    info!(topic, model = model.model_name(), "Initial topic research");
    let initial = model.chat(&messages).await.context("initial research request")?;
    research.add_citations(initial.citations);
    messages.push(Message::assistant(initial.content.clone()));
    messages.push(Message::user(EXPANSION_PROMPT));
    research.initial = Some(initial.content);

    info!(topic, "Expanding topic research");
    let expanded = model.chat(&messages).await.context("expansion research request")?;
    research.add_citations(expanded.citations);
    messages.push(Message::assistant(expanded.content.clone()));
    messages.push(Message::user(FINAL_PROMPT));
    research.expanded = Some(expanded.content);

    info!(topic, "Finalizing topic research");
    let final_report = model.chat(&messages).await.context("final research request")?;
    research.add_citations(final_report.citations);
    research.final_report = Some(final_report.content);

    info!(
        topic,
        citations = research.citations.len(),
        elapsed_secs = started.elapsed().as_secs_f32(),
        "Topic research completed"
    );
    Ok(research)
}

/// Research the topic, degrading to a basic placeholder on any failure.
pub async fn research_or_basic(model: &dyn ChatModel, topic: &str) -> TopicResearch {
    match research_topic(model, topic).await {
        Ok(research) => research,
        Err(e) => {
            warn!(topic, error = format!("{e:#}"), "Topic research failed, using basic research");
            TopicResearch::basic(topic)
        }
    }
}
