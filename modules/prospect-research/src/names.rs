//! Display names derived from profile URLs, for records the scraper left unnamed.

use tracing::debug;

/// Turn a profile URL slug into a display name.
///
/// `https://linkedin.com/in/jane-doe/` → `Jane Doe`, `janeDoe` → `Jane Doe`.
/// Returns the URL unchanged when the slug is empty or numeric.
pub fn name_from_profile_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let slug = trimmed.rsplit('/').next().unwrap_or_default();
    let slug = slug.split(['?', '#']).next().unwrap_or_default();

    if slug.is_empty() || slug.chars().all(|c| c.is_ascii_digit()) || slug.contains(':') {
        return url.to_string();
    }

    let spaced = split_camel_case(&slug.replace(['-', '_'], " "));
    let name = spaced
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");

    if name.is_empty() {
        return url.to_string();
    }

    debug!(slug, name = name.as_str(), "Derived display name from URL");
    name
}

/// Lowercased name used for fuzzy comparisons against post authors.
pub fn comparable_name(name: &str) -> String {
    name.to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;
    for c in s.chars() {
        if c.is_uppercase() && prev_lower {
            out.push(' ');
        }
        prev_lower = c.is_lowercase();
        out.push(c);
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyphenated_slug_becomes_title_case() {
        assert_eq!(name_from_profile_url("https://linkedin.com/in/jane-doe"), "Jane Doe");
    }

    #[test]
    fn trailing_slash_and_query_are_ignored() {
        assert_eq!(
            name_from_profile_url("https://www.linkedin.com/in/jane_doe/"),
            "Jane Doe"
        );
        assert_eq!(
            name_from_profile_url("https://www.linkedin.com/in/jane-doe?trk=abc"),
            "Jane Doe"
        );
    }

    #[test]
    fn camel_case_is_split() {
        assert_eq!(
            name_from_profile_url("https://linkedin.com/in/nathanPoekert"),
            "Nathan Poekert"
        );
    }

    #[test]
    fn numeric_or_empty_slug_returns_url() {
        let numeric = "https://linkedin.com/in/123456";
        assert_eq!(name_from_profile_url(numeric), numeric);
        assert_eq!(name_from_profile_url(""), "");
        assert_eq!(name_from_profile_url("https://"), "https://");
    }

    #[test]
    fn comparable_name_normalizes_case_and_separators() {
        assert_eq!(comparable_name("Jane-Doe  Smith"), "jane doe smith");
    }
}
