//! Flatten a pipeline result into the 14-column outreach CSV.

use std::io::Write;

use anyhow::{Context, Result};
use csv::{QuoteStyle, WriterBuilder};
use prospect_common::{PipelineResult, ProfileOutcome};

use crate::extract::{extract_segment, SegmentKind};

pub const HEADERS: [&str; 14] = [
    "Name",
    "LinkedIn URL",
    "Headline",
    "Bio",
    "Email 1 (Cold Outreach)",
    "Email 2 (Follow-up)",
    "Email 3 (Value Add)",
    "Email 4 (Meeting Request)",
    "Email 5 (Final Follow-up)",
    "LinkedIn Message 1 (Connection Request)",
    "LinkedIn Message 2 (Resource Share)",
    "LinkedIn Message 3 (Case Study & Question)",
    "Citations",
    "Processing Status",
];

/// "Success", "Error: <e>", either prefixed with "Partial Data: ".
pub fn status(outcome: &ProfileOutcome) -> String {
    let status = match &outcome.error {
        Some(e) => format!("Error: {e}"),
        None => "Success".to_string(),
    };
    if outcome.partial_data {
        format!("Partial Data: {status}")
    } else {
        status
    }
}

fn segments(text: Option<&str>, kind: SegmentKind) -> Vec<String> {
    (1..=kind.count())
        .map(|n| match text {
            Some(text) if !text.trim().is_empty() => extract_segment(text, kind, n).to_cell(kind, n),
            _ => String::new(),
        })
        .collect()
}

/// One CSV row per outcome. Missing text becomes empty cells.
pub fn row(outcome: &ProfileOutcome) -> Vec<String> {
    let target = &outcome.target;
    let mut row = vec![
        target.name.clone(),
        target.url.clone(),
        target.headline.clone(),
        target.bio.clone(),
    ];
    row.extend(segments(outcome.emails.as_deref(), SegmentKind::Email));
    row.extend(segments(outcome.messages.as_deref(), SegmentKind::LinkedInMessage));
    row.push(outcome.citations().join("\n"));
    row.push(status(outcome));
    row
}

/// Write the header and one fully-quoted row per profile.
pub fn write_csv<W: Write>(result: &PipelineResult, out: W) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(out);

    writer.write_record(HEADERS).context("writing CSV header")?;
    for outcome in &result.profiles {
        writer
            .write_record(row(outcome))
            .with_context(|| format!("writing CSV row for {}", outcome.requested_url))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

pub fn to_csv_string(result: &PipelineResult) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(result, &mut buf)?;
    String::from_utf8(buf).context("CSV output is not UTF-8")
}
