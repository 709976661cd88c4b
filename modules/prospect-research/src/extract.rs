//! Pull individual emails and LinkedIn messages out of generated free text.
//!
//! Generation only asks for the "Email N:" / "Message N:" layout, so this is
//! best-effort: marker match first, then a positional slice for the first
//! segment, otherwise an explicit `NotFound`.

use regex::RegexBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Email,
    LinkedInMessage,
}

impl SegmentKind {
    /// Number of segments generation asks for.
    pub fn count(self) -> usize {
        match self {
            SegmentKind::Email => 5,
            SegmentKind::LinkedInMessage => 3,
        }
    }

    fn label(self) -> &'static str {
        match self {
            SegmentKind::Email => "Email",
            SegmentKind::LinkedInMessage => "LinkedIn Message",
        }
    }

    /// Marker words tried in order.
    fn markers(self) -> &'static [&'static str] {
        match self {
            SegmentKind::Email => &["Email"],
            SegmentKind::LinkedInMessage => &["Message", "LinkedIn Message"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text found under its marker.
    Found(String),
    /// No marker; a leading slice of the text was taken instead.
    Fallback(String),
    NotFound,
}

impl Segment {
    pub fn text(&self) -> Option<&str> {
        match self {
            Segment::Found(s) | Segment::Fallback(s) => Some(s),
            Segment::NotFound => None,
        }
    }

    /// Cell text for export: the segment, or a "content not found" notice.
    pub fn to_cell(&self, kind: SegmentKind, number: usize) -> String {
        match self.text() {
            Some(text) => text.to_string(),
            None => format!("{} {number} content not found", kind.label()),
        }
    }
}

fn capture(pattern: &str, text: &str) -> Option<String> {
    let re = RegexBuilder::new(pattern).dot_matches_new_line(true).build().ok()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Extract segment `number` (1-based) of `kind` from generated text.
pub fn extract_segment(text: &str, kind: SegmentKind, number: usize) -> Segment {
    if text.trim().is_empty() || number == 0 {
        return Segment::NotFound;
    }

    for marker in kind.markers() {
        let pattern = format!(
            r"{marker}\s+{number}[^\n]*\n(.*?)(?:{marker}\s+{next}|$)",
            next = number + 1
        );
        if let Some(found) = capture(&pattern, text) {
            return Segment::Found(found);
        }
    }

    if number != 1 {
        return Segment::NotFound;
    }

    if kind == SegmentKind::Email {
        if let Some(found) = capture(r"Subject:[^\n]*\n(.*?)(?:Email\s+2|$)", text) {
            return Segment::Found(found);
        }
    }

    let divisor = kind.count();
    let paragraphs: Vec<&str> = text.split("\n\n").collect();
    if paragraphs.len() >= divisor {
        let leading = paragraphs[..paragraphs.len() / divisor].join("\n\n");
        Segment::Fallback(leading.trim().to_string())
    } else {
        Segment::Fallback(text.trim().to_string())
    }
}

/// All segments of `kind`, in order.
pub fn extract_all(text: &str, kind: SegmentKind) -> Vec<Segment> {
    (1..=kind.count())
        .map(|n| extract_segment(text, kind, n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMAILS: &str = "Email 1:\nSubject: Hello\n\nFirst body\n\nEmail 2:\nSubject: Again\n\nSecond body\n\nEmail 3:\nSubject: Third\n\nThird body";

    #[test]
    fn emails_split_on_markers() {
        assert_eq!(
            extract_segment(EMAILS, SegmentKind::Email, 1),
            Segment::Found("Subject: Hello\n\nFirst body".into())
        );
        assert_eq!(
            extract_segment(EMAILS, SegmentKind::Email, 3),
            Segment::Found("Subject: Third\n\nThird body".into())
        );
        assert_eq!(extract_segment(EMAILS, SegmentKind::Email, 4), Segment::NotFound);
    }

    #[test]
    fn email_one_falls_back_to_subject_block() {
        let text = "Subject: Hello\nBody line\n\nMore";
        assert_eq!(
            extract_segment(text, SegmentKind::Email, 1),
            Segment::Found("Body line\n\nMore".into())
        );
    }

    #[test]
    fn first_segment_uses_positional_slice() {
        let text = "a\n\nb\n\nc\n\nd\n\ne\n\nf\n\ng\n\nh\n\ni\n\nj";
        assert_eq!(
            extract_segment(text, SegmentKind::Email, 1),
            Segment::Fallback("a\n\nb".into())
        );
        assert_eq!(
            extract_segment(text, SegmentKind::LinkedInMessage, 1),
            Segment::Fallback("a\n\nb\n\nc".into())
        );
        assert_eq!(
            extract_segment("just one paragraph", SegmentKind::LinkedInMessage, 1),
            Segment::Fallback("just one paragraph".into())
        );
    }

    #[test]
    fn linkedin_messages() {
        let text = "Message 1:\nHi Jane\n\nMessage 2:\nFollow up\n\nMessage 3:\nCase study";
        let all = extract_all(text, SegmentKind::LinkedInMessage);
        let texts: Vec<_> = all.iter().map(|s| s.text().unwrap()).collect();
        assert_eq!(texts, ["Hi Jane", "Follow up", "Case study"]);
    }

    #[test]
    fn empty_text_is_not_found() {
        assert_eq!(extract_segment("", SegmentKind::Email, 1), Segment::NotFound);
        assert_eq!(extract_segment("  \n", SegmentKind::LinkedInMessage, 1), Segment::NotFound);
    }

    #[test]
    fn not_found_cells_are_labelled() {
        assert_eq!(
            Segment::NotFound.to_cell(SegmentKind::Email, 4),
            "Email 4 content not found"
        );
        assert_eq!(
            Segment::NotFound.to_cell(SegmentKind::LinkedInMessage, 2),
            "LinkedIn Message 2 content not found"
        );
    }
}
