//! Report, email sequence and LinkedIn message generation for one target.
//!
//! Each call is independent and absorbs its own failure: the caller always
//! gets text back, with `degraded` set when that text is a failure notice.
//! The output grammar ("Email N:", "Message N:") is requested in the prompt
//! only; `extract` deals with whatever comes back.

use std::time::Instant;

use ai_client::Message;
use prospect_common::{CaseStudy, Report, SenderInfo, Target, TopicResearch};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::traits::ChatModel;

pub const EMAILS_FAILED: &str = "Failed to generate emails due to API error. Please try again later.";
pub const MESSAGES_FAILED: &str =
    "Failed to generate LinkedIn messages due to API error. Please try again later.";

const EMAIL_POSTS: usize = 5;
const MESSAGE_POSTS: usize = 3;

/// Generated free text plus whether it is a failure placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generated {
    pub text: String,
    pub degraded: bool,
}

/// Everything generation needs besides the target itself.
#[derive(Clone, Copy)]
pub struct Generator<'a> {
    pub report_model: &'a dyn ChatModel,
    pub outreach_model: &'a dyn ChatModel,
    pub sender: &'a SenderInfo,
    pub current_year: i32,
}

impl<'a> Generator<'a> {
    /// Industry report synthesizing the research stages and case studies.
    ///
    /// Citations are the research citations followed by one
    /// "Popular Pays Case Study: <brand>" entry per case study.
    pub async fn generate_report(&self, target: &Target, research: &TopicResearch) -> Report {
        let started = Instant::now();
        let system = format!(
            "You are a talented sales researcher helping prepare a detailed industry analysis for \
             outreach to {name}. Your task is to synthesize research about this industry/company and \
             create a comprehensive report that can be used as a foundation for personalized outreach \
             to various stakeholders in the industry.",
            name = target.name,
        );
        let user = report_prompt(target, research);

        match self.report_model.chat(&[Message::system(system), Message::user(user)]).await {
            Ok(completion) => {
                let mut citations = research.citations.clone();
                citations.extend(research.case_studies.iter().map(CaseStudy::citation));
                info!(
                    target = target.name.as_str(),
                    elapsed_secs = started.elapsed().as_secs_f32(),
                    "Report generated"
                );
                Report {
                    content: completion.content,
                    citations,
                    case_studies: research.case_studies.clone(),
                    degraded: research.degraded,
                }
            }
            Err(e) => {
                error!(target = target.name.as_str(), error = %e, "Report generation failed");
                Report {
                    content: format!("Failed to generate report for {}. Error: {e}", target.name),
                    citations: Vec::new(),
                    case_studies: Vec::new(),
                    degraded: true,
                }
            }
        }
    }

    /// Five-email outreach sequence.
    pub async fn generate_emails(&self, target: &Target, report: &Report) -> Generated {
        let system = email_system_prompt(self.current_year);
        let user = email_prompt(target, report, self.sender);
        self.outreach(target, "emails", system, user, EMAILS_FAILED).await
    }

    /// Three-message LinkedIn sequence.
    pub async fn generate_messages(&self, target: &Target, report: &Report) -> Generated {
        let system = message_system_prompt(self.current_year);
        let user = message_prompt(target, report, self.sender);
        self.outreach(target, "LinkedIn messages", system, user, MESSAGES_FAILED).await
    }

    async fn outreach(
        &self,
        target: &Target,
        what: &str,
        system: String,
        user: String,
        failure: &str,
    ) -> Generated {
        let started = Instant::now();
        match self.outreach_model.chat(&[Message::system(system), Message::user(user)]).await {
            Ok(completion) => {
                info!(
                    target = target.name.as_str(),
                    what,
                    elapsed_secs = started.elapsed().as_secs_f32(),
                    "Outreach generated"
                );
                Generated {
                    text: completion.content,
                    degraded: false,
                }
            }
            Err(e) => {
                error!(target = target.name.as_str(), what, error = %e, "Outreach generation failed");
                Generated {
                    text: failure.to_string(),
                    degraded: true,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Prompt building
// ---------------------------------------------------------------------------

fn report_prompt(target: &Target, research: &TopicResearch) -> String {
    let research_text = research.stages().collect::<Vec<_>>().join("\n\n");
    let case_studies = research
        .case_studies
        .iter()
        .map(|cs| format!("Case Study - {}:\n{}", cs.brand(), cs.text()))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "## Topic Information\n\
         - Industry/Company: {topic}\n\
         - Prepared for outreach to: {target}\n\n\
         ## Research Data\n{research_text}\n\n\
         ## Actual Popular Pays Case Studies\n{case_studies}\n\n\
         Based on this information, please create a comprehensive industry/company report that:\n\
         1. Analyzes the industry/company landscape, trends, and challenges\n\
         2. Identifies specific pain points common in this industry/company\n\
         3. Outlines tailored value propositions for Popular Pays that address these pain points\n\
         4. Provides key statistics, case studies, and resources that demonstrate our value\n\
         5. Suggests specific talking points for securing meetings with decision-makers\n\n\
         This report will serve as the foundation for personalized outreach to various stakeholders, \
         so make it comprehensive enough to be adaptable to different roles and seniority levels. \
         Only write about what is in the research data. When referencing case studies, ONLY mention \
         the provided Popular Pays case studies, not external ones.\n\n\
         Format the report with clear headings, bullet points, and actionable insights.",
        topic = research.topic,
        target = target,
    )
}

fn case_study_block(case_studies: &[CaseStudy]) -> String {
    case_studies
        .iter()
        .map(|cs| match cs {
            CaseStudy::Website { brand, url, summary } => {
                format!("Case Study - {brand}:\nURL: {url}\n{summary}")
            }
            CaseStudy::Wiki { brand, analysis, .. } => format!("Case Study - {brand}:\n{analysis}"),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn linked_brands(case_studies: &[CaseStudy]) -> String {
    case_studies
        .iter()
        .filter_map(|cs| cs.url().map(|url| format!("{}: {url}", cs.brand())))
        .collect::<Vec<_>>()
        .join("\n")
}

fn recent_posts_block(target: &Target, limit: usize) -> String {
    let posts: Vec<String> = target
        .recent_posts
        .iter()
        .filter(|p| !p.content.trim().is_empty())
        .take(limit)
        .enumerate()
        .map(|(i, p)| format!("Post {} ({}):\n{}", i + 1, p.date, p.content.trim()))
        .collect();
    if posts.is_empty() {
        String::new()
    } else {
        format!("RECENT LINKEDIN POSTS:\n{}", posts.join("\n\n"))
    }
}

fn recipient_block(target: &Target, limit: usize) -> String {
    format!(
        "RECIPIENT:\n\
         - Name: {}\n\
         - First Name: {}\n\
         - Position: {}\n\
         - LinkedIn: {}\n\
         - Bio: {}\n\
         {}",
        target.name,
        target.first_name(),
        target.headline,
        target.url,
        target.bio,
        recent_posts_block(target, limit),
    )
}

/// Multi-line signature for emails; empty without a sender name.
pub fn email_signature(sender: &SenderInfo) -> String {
    if sender.name.trim().is_empty() {
        return String::new();
    }
    [
        sender.name.as_str(),
        sender.title.as_str(),
        sender.company.as_str(),
        sender.email.as_str(),
        sender.phone.as_str(),
    ]
    .into_iter()
    .filter(|line| !line.trim().is_empty())
    .collect::<Vec<_>>()
    .join("\n")
}

/// One-line signature for LinkedIn; empty without a sender name.
pub fn message_signature(sender: &SenderInfo) -> String {
    if sender.name.trim().is_empty() {
        return String::new();
    }
    let mut signature = sender.name.clone();
    if !sender.title.trim().is_empty() {
        signature.push_str(&format!(", {}", sender.title));
    }
    signature.push_str(&format!(" at {}", sender.company));
    signature
}

fn email_system_prompt(current_year: i32) -> String {
    let previous_year = current_year - 1;
    format!(
        "You are a senior sales development representative for Popular Pays, a Lightricks brand \
         specializing in influencer marketing. Your job is to craft compelling, personalized outreach \
         emails to secure meetings with potential clients.\n\n\
         Current year: {current_year}\n\n\
         Follow these guidelines:\n\
         - Create 5 sequential emails following a standard outreach sequence\n\
         - Be upbeat, engaging, and focused on securing a meeting\n\
         - Each email must be highly personalized to the recipient's background and needs\n\
         - Include specific pain points and value propositions relevant to their industry\n\
         - When mentioning resources, use HTML formatting: <a href=\"URL_HERE\">text here</a>\n\
         - Keep emails concise, actionable, and with clear CTAs\n\
         - ALWAYS use the recipient's proper name, not their LinkedIn handle\n\
         - ONLY reference Popular Pays' actual case studies, not external ones\n\
         - ALWAYS include the HTML link when mentioning a case study that has a URL\n\
         - ONLY mention recent achievements or recognition (from {previous_year}-{current_year}). \
         Do not congratulate or mention achievements older than {previous_year}\n\
         - If the person has recent LinkedIn posts, reference them in a natural, conversational way\n\n\
         FORMAT INSTRUCTIONS (CRITICAL):\n\
         - Start each email with \"Email 1:\", \"Email 2:\", etc.\n\
         - Include \"Subject:\" on its own line for each email\n\
         - Separate emails with a blank line\n\
         - DO NOT include any explanatory text between emails\n\
         - DO NOT include any notes or comments at the end"
    )
}

fn email_prompt(target: &Target, report: &Report, sender: &SenderInfo) -> String {
    let mut instructions = String::new();
    let links = linked_brands(&report.case_studies);
    if !links.is_empty() {
        instructions.push_str(&format!(
            "IMPORTANT: Whenever you mention ANY of the following case studies, you MUST include the \
             corresponding HTML link immediately after the brand name, for example: 'Our work with \
             Chameleon Cold Brew (<a href=\"https://example.com\">case study</a>) showed...'\n\n\
             Here are the case studies with their URLs:\n{links}\n\n"
        ));
    }
    if report.case_studies.iter().any(|cs| cs.url().is_none()) {
        instructions.push_str(
            "For case studies with images, mention that you're attaching a relevant case study image, \
             e.g. \"I've attached a case study showing our results with [brand].\"\n\n",
        );
    }

    let signature = email_signature(sender);
    let signature_instructions = if signature.is_empty() {
        String::new()
    } else {
        format!("Use the following signature at the end of each email:\n\n{signature}\n")
    };
    let resources = serde_json::to_string_pretty(&report.citations).unwrap_or_default();

    format!(
        "Generate 5 sequential outreach emails for:\n\n\
         {recipient}\n\n\
         INDUSTRY/COMPANY CONTEXT:\n{context}\n\n\
         POPULAR PAYS CASE STUDIES TO REFERENCE:\n{case_studies}\n\n\
         AVAILABLE RESOURCES (use these exact URLs when referencing):\n{resources}\n\n\
         The emails should follow this sequence:\n\
         1. Email 1: Initial cold outreach - introduce value proposition and establish relevance to {name}'s specific role\n\
         2. Email 2: Follow-up with specific case study or resource that addresses pain points relevant to their position as \"{headline}\"\n\
         3. Email 3: Value-add email sharing a relevant insight or resource specific to their background\n\
         4. Email 4: Meeting request with specific agenda tailored to their role\n\
         5. Email 5: Final breakup email with soft call-to-action\n\n\
         If they have recent LinkedIn posts, reference them in Email 1 or 2.\n\n\
         {instructions}\
         For Email 2 or 3, reference at least one case study. If the case study has a URL, include the HTML link \
         immediately after mentioning the brand name.\n\n\
         {signature_instructions}\n\
         IMPORTANT: Use this EXACT format for each email:\n\n\
         Email 1:\nSubject: [Your subject line]\n\n[Email body]\n\n[Your signature]\n\n\
         Email 2:\nSubject: [Your subject line]\n\n[Email body]\n\n[Your signature]\n\n\
         (and so on for all 5 emails)",
        recipient = recipient_block(target, EMAIL_POSTS),
        context = report.content,
        case_studies = case_study_block(&report.case_studies),
        name = target.name,
        headline = target.headline,
    )
}

fn message_system_prompt(current_year: i32) -> String {
    let previous_year = current_year - 1;
    format!(
        "You are a senior sales development representative for Popular Pays, a Lightricks brand \
         specializing in influencer marketing. Your job is to craft compelling, personalized LinkedIn \
         outreach messages to secure meetings with potential clients.\n\n\
         Current year: {current_year}\n\n\
         Follow these guidelines:\n\
         - Create 3 sequential LinkedIn messages following a standard outreach sequence\n\
         - Be upbeat, engaging, and focused on securing a meeting\n\
         - Each message must be highly personalized to the recipient's background and needs\n\
         - Keep messages concise (under 300 characters for the first message, under 1500 for follow-ups)\n\
         - ALWAYS use the recipient's proper name, not their LinkedIn handle\n\
         - ONLY reference Popular Pays' actual case studies, not external ones\n\
         - When mentioning a case study with a URL, ALWAYS offer to share the link\n\
         - ONLY mention recent achievements or recognition (from {previous_year}-{current_year}). \
         Do not congratulate or mention achievements older than {previous_year}\n\n\
         FORMAT INSTRUCTIONS (CRITICAL):\n\
         - Start each message with \"Message 1:\", \"Message 2:\", etc.\n\
         - Separate messages with a blank line\n\
         - DO NOT include any explanatory text between messages\n\
         - DO NOT include any notes or comments at the end"
    )
}

fn message_prompt(target: &Target, report: &Report, sender: &SenderInfo) -> String {
    let mut instructions = String::new();
    let links = linked_brands(&report.case_studies);
    if !links.is_empty() {
        instructions.push_str(&format!(
            "Whenever you mention ANY of the following case studies, explicitly offer to share the case \
             study link, for example: 'I'd be happy to share our Chameleon Cold Brew case study link...'\n\n\
             Here are the case studies with their URLs:\n{links}\n\n"
        ));
    }
    if report.case_studies.iter().any(|cs| cs.url().is_none()) {
        instructions.push_str(
            "For case studies with images, mention that you can share a relevant case study image.\n\n",
        );
    }

    let signature = message_signature(sender);
    let signature_instructions = if signature.is_empty() {
        String::new()
    } else {
        format!("Use the following signature at the end of each message:\n\n{signature}\n")
    };

    format!(
        "Generate 3 sequential LinkedIn outreach messages for:\n\n\
         {recipient}\n\n\
         INDUSTRY/COMPANY CONTEXT:\n{context}\n\n\
         POPULAR PAYS CASE STUDIES TO REFERENCE:\n{case_studies}\n\n\
         The messages should follow this sequence:\n\
         1. Message 1: Initial connection request - brief, personalized, under 300 characters\n\
         2. Message 2: Follow-up after connection - introduce value proposition with specific relevance to {name}'s role\n\
         3. Message 3: Value-add message with a specific case study or resource that addresses their pain points\n\n\
         If they have recent LinkedIn posts, briefly reference one in the connection request.\n\n\
         {instructions}\
         {signature_instructions}\n\
         IMPORTANT: Use this EXACT format for each message:\n\n\
         Message 1:\n[Message body]\n\n[Your signature]\n\n\
         Message 2:\n[Message body]\n\n[Your signature]\n\n\
         Message 3:\n[Message body]\n\n[Your signature]",
        recipient = recipient_block(target, MESSAGE_POSTS),
        context = report.content,
        case_studies = case_study_block(&report.case_studies),
        name = target.name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChat;
    use prospect_common::Post;

    fn target() -> Target {
        let mut target = Target::new("Jane Doe", "VP Marketing", "Builds brands", "https://linkedin.com/in/jane-doe");
        target.recent_posts = (1..=7)
            .map(|i| Post {
                content: format!("post {i}"),
                url: None,
                date: format!("{i}d"),
            })
            .collect();
        target
    }

    fn research() -> TopicResearch {
        let mut research = TopicResearch::new("Acme");
        research.final_report = Some("Acme sells rockets".into());
        research.add_citations(["https://acme.example".to_string()]);
        research.with_case_studies(vec![CaseStudy::Website {
            brand: "Chameleon Cold Brew".into(),
            url: "https://popularpays.com/case-studies/chameleon-cold-brew".into(),
            summary: "Case study from Popular Pays website: Chameleon Cold Brew".into(),
        }])
    }

    fn generator<'a>(model: &'a MockChat, sender: &'a SenderInfo) -> Generator<'a> {
        Generator {
            report_model: model,
            outreach_model: model,
            sender,
            current_year: 2025,
        }
    }

    #[tokio::test]
    async fn report_merges_case_study_citations() {
        let model = MockChat::new().reply("the report");
        let sender = SenderInfo::default();
        let report = generator(&model, &sender).generate_report(&target(), &research()).await;

        assert_eq!(report.content, "the report");
        assert_eq!(
            report.citations,
            ["https://acme.example", "Popular Pays Case Study: Chameleon Cold Brew"]
        );
        assert!(!report.degraded);
        let prompt = &model.calls()[0][1].content;
        assert!(prompt.contains("Acme sells rockets"));
        assert!(prompt.contains("Case Study - Chameleon Cold Brew"));
    }

    #[tokio::test]
    async fn report_failure_names_target_and_error() {
        let model = MockChat::new().timeout();
        let sender = SenderInfo::default();
        let report = generator(&model, &sender).generate_report(&target(), &research()).await;
        assert!(report.degraded);
        assert!(report.content.starts_with("Failed to generate report for Jane Doe. Error: "));
        assert!(report.citations.is_empty());
    }

    #[tokio::test]
    async fn email_prompt_limits_posts_and_links_case_studies() {
        let model = MockChat::new().reply("the report").reply("Email 1:\nSubject: hi\n\nbody");
        let sender = SenderInfo {
            name: "Sam Sender".into(),
            title: "AE".into(),
            ..SenderInfo::default()
        };
        let generator = generator(&model, &sender);
        let report = generator.generate_report(&target(), &research()).await;
        let emails = generator.generate_emails(&target(), &report).await;

        assert!(!emails.degraded);
        let calls = model.calls();
        let system = &calls[1][0].content;
        let prompt = &calls[1][1].content;
        assert!(system.contains("Current year: 2025"));
        assert!(system.contains("2024-2025"));
        assert!(prompt.contains("Post 5 (5d)"));
        assert!(!prompt.contains("Post 6"));
        assert!(prompt.contains("Chameleon Cold Brew: https://popularpays.com/case-studies/chameleon-cold-brew"));
        assert!(prompt.contains("Sam Sender\nAE\nPopular Pays, a Lightricks brand"));
        assert!(prompt.contains("- First Name: Jane"));
    }

    #[tokio::test]
    async fn outreach_failures_use_fixed_text() {
        let model = MockChat::new().timeout().fail("boom");
        let sender = SenderInfo::default();
        let generator = generator(&model, &sender);
        let report = Report {
            content: "r".into(),
            citations: vec![],
            case_studies: vec![],
            degraded: false,
        };

        let emails = generator.generate_emails(&target(), &report).await;
        assert_eq!(emails.text, EMAILS_FAILED);
        assert!(emails.degraded);

        let messages = generator.generate_messages(&target(), &report).await;
        assert_eq!(messages.text, MESSAGES_FAILED);
        assert!(messages.degraded);
    }

    #[test]
    fn signatures() {
        let sender = SenderInfo {
            name: "Sam".into(),
            title: "AE".into(),
            email: "sam@example.com".into(),
            ..SenderInfo::default()
        };
        assert_eq!(
            email_signature(&sender),
            "Sam\nAE\nPopular Pays, a Lightricks brand\nsam@example.com"
        );
        assert_eq!(message_signature(&sender), "Sam, AE at Popular Pays, a Lightricks brand");
        assert_eq!(email_signature(&SenderInfo::default()), "");
    }
}
