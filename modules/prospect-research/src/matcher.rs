//! Reconcile scraped profile and post records with the URLs that were requested.
//!
//! The scraper reports its own canonical URL for each record, which rarely
//! matches the requested string exactly (trailing slashes, `www.`, locale
//! suffixes). Matching is best-effort: URL containment first, then the
//! author's public id, then a fuzzy name comparison.

use std::collections::HashMap;

use apify_client::{LinkedInPost, LinkedInProfile};
use prospect_common::{Post, Target, DEFAULT_BIO, DEFAULT_HEADLINE};
use tracing::{debug, info, warn};

use crate::dates::{PostFilterStats, WindowedPost};
use crate::names::{comparable_name, name_from_profile_url};

/// Minimum Jaro-Winkler similarity for an author name to count as a match.
const NAME_SIMILARITY: f64 = 0.9;

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Targets for every requested URL, in request order.
#[derive(Debug, Clone, Default)]
pub struct ProfileMatch {
    pub targets: Vec<(String, Target)>,
    /// Scraped records that matched no requested URL. Dropped.
    pub unmatched: usize,
    /// Requested URLs that got a synthesized placeholder.
    pub placeholders: usize,
}

impl ProfileMatch {
    pub fn get(&self, url: &str) -> Option<&Target> {
        self.targets.iter().find(|(u, _)| u == url).map(|(_, t)| t)
    }
}

/// Lowercased URL without query, fragment or trailing slash.
fn comparable_url(url: &str) -> String {
    let url = url.trim();
    let end = url.find(['?', '#']).unwrap_or(url.len());
    url[..end].trim_end_matches('/').to_lowercase()
}

/// How well a requested URL fits a scraped one. Exact beats overlap, and among
/// overlaps the longer requested URL wins.
fn url_fit(scraped: &str, requested: &str) -> Option<(bool, usize)> {
    let requested = comparable_url(requested);
    if requested.is_empty() {
        return None;
    }
    if scraped == requested {
        Some((true, requested.len()))
    } else if scraped.contains(&requested) || requested.contains(scraped) {
        Some((false, requested.len()))
    } else {
        None
    }
}

/// Best requested URL for a scraped one. Ties go to `preferred`, then to
/// request order.
fn best_requested<'a>(requested: &'a [String], scraped: &str, preferred: Option<usize>) -> Option<&'a str> {
    let scraped = comparable_url(scraped);
    let mut best: Option<(usize, (bool, usize))> = None;
    for (index, url) in requested.iter().enumerate() {
        let Some(fit) = url_fit(&scraped, url) else {
            continue;
        };
        let better = match best {
            None => true,
            Some((_, current)) => fit > current || (fit == current && preferred == Some(index)),
        };
        if better {
            best = Some((index, fit));
        }
    }
    best.map(|(index, _)| requested[index].as_str())
}

/// Build a target from a scraped record. Records without any URL are unusable.
pub fn target_from_profile(profile: &LinkedInProfile) -> Option<Target> {
    let url = profile.canonical_url()?;
    let name = profile
        .display_name()
        .unwrap_or_else(|| name_from_profile_url(url));
    Some(Target::new(
        name,
        profile.headline_text().unwrap_or(DEFAULT_HEADLINE),
        profile.bio_text().unwrap_or(DEFAULT_BIO),
        url,
    ))
}

/// Assign each scraped profile to a requested URL.
///
/// URLs are compared lowercased, without query string or trailing slash. An
/// exact match wins; otherwise the longest requested URL that overlaps the
/// scraped one. When the scraper returned exactly as many records as were
/// requested, the URL at the same index breaks ties. A later record overwrites
/// an earlier match for the same URL. Requested URLs left without a record get
/// a placeholder target.
pub fn match_profiles(requested: &[String], scraped: &[LinkedInProfile]) -> ProfileMatch {
    let mut assigned: HashMap<&str, Target> = HashMap::new();
    let mut unmatched = 0;
    let positional = scraped.len() == requested.len();

    for (index, profile) in scraped.iter().enumerate() {
        let Some(target) = target_from_profile(profile) else {
            warn!(index, "Skipping scraped profile with no URL");
            continue;
        };

        let key = best_requested(requested, &target.url, positional.then_some(index));

        match key {
            Some(url) => {
                debug!(requested = url, scraped = target.url.as_str(), "Matched profile");
                assigned.insert(url, target);
            }
            None => {
                warn!(scraped = target.url.as_str(), "Scraped profile matches no requested URL, dropping");
                unmatched += 1;
            }
        }
    }

    let mut placeholders = 0;
    let targets = requested
        .iter()
        .map(|url| {
            let target = assigned.remove(url.as_str()).unwrap_or_else(|| {
                placeholders += 1;
                Target::placeholder(url, name_from_profile_url(url))
            });
            (url.clone(), target)
        })
        .collect();

    info!(
        requested = requested.len(),
        scraped = scraped.len(),
        unmatched,
        placeholders,
        "Profile matching complete"
    );

    ProfileMatch {
        targets,
        unmatched,
        placeholders,
    }
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostMatch {
    SourceUrl,
    AuthorId,
    AuthorName,
}

/// Find which requested URL a scraped post belongs to.
pub fn attribute_post<'a>(requested: &'a [String], post: &LinkedInPost) -> Option<(&'a str, PostMatch)> {
    if let Some(source) = post.source_url.as_deref().filter(|s| !s.is_empty()) {
        let source = comparable_url(source);
        if let Some(url) = requested
            .iter()
            .filter(|url| {
                let url = comparable_url(url);
                !url.is_empty() && source.contains(&url)
            })
            .max_by_key(|url| comparable_url(url).len())
        {
            return Some((url.as_str(), PostMatch::SourceUrl));
        }
    }

    if let Some(id) = post.author_public_id() {
        let id = id.to_lowercase();
        if let Some(url) = requested.iter().find(|url| url.to_lowercase().contains(&id)) {
            return Some((url.as_str(), PostMatch::AuthorId));
        }
    }

    let author = comparable_name(&post.author_name()?);
    requested
        .iter()
        .find(|url| names_match(&author, &comparable_name(&name_from_profile_url(url))))
        .map(|url| (url.as_str(), PostMatch::AuthorName))
}

fn names_match(author: &str, from_url: &str) -> bool {
    if author.is_empty() || from_url.is_empty() {
        return false;
    }
    author.contains(from_url)
        || from_url.contains(author)
        || strsim::jaro_winkler(author, from_url) >= NAME_SIMILARITY
}

/// Group windowed posts by requested URL. Posts that match nothing are counted
/// as URL mismatches and dropped.
pub fn match_posts(
    requested: &[String],
    posts: Vec<WindowedPost>,
    stats: &mut PostFilterStats,
) -> HashMap<String, Vec<Post>> {
    let mut by_url: HashMap<String, Vec<Post>> = HashMap::new();

    for windowed in posts {
        match attribute_post(requested, &windowed.source) {
            Some((url, how)) => {
                match how {
                    PostMatch::SourceUrl => stats.matched_by_url += 1,
                    PostMatch::AuthorId => stats.matched_by_id += 1,
                    PostMatch::AuthorName => stats.matched_by_name += 1,
                }
                by_url.entry(url.to_string()).or_default().push(windowed.post);
            }
            None => stats.skipped_url_mismatch += 1,
        }
    }

    by_url
}

#[cfg(test)]
mod tests {
    use super::*;
    use apify_client::PostAuthor;

    fn profile(url: &str, name: &str) -> LinkedInProfile {
        LinkedInProfile {
            profile_url: Some(url.into()),
            full_name: Some(name.into()),
            headline: Some("CMO".into()),
            ..LinkedInProfile::default()
        }
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn trailing_slash_and_case_are_ignored() {
        let requested = urls(&["https://linkedin.com/in/jane-doe"]);
        let scraped = [profile("https://LinkedIn.com/in/Jane-Doe/?trk=x", "Jane Doe")];
        let result = match_profiles(&requested, &scraped);
        assert_eq!(result.targets.len(), 1);
        let target = result.get("https://linkedin.com/in/jane-doe").unwrap();
        assert_eq!(target.name, "Jane Doe");
        assert!(!target.placeholder);
        assert_eq!(result.unmatched, 0);
    }

    #[test]
    fn missing_profile_gets_placeholder() {
        let requested = urls(&["https://linkedin.com/in/jane-doe"]);
        let result = match_profiles(&requested, &[]);
        let target = result.get("https://linkedin.com/in/jane-doe").unwrap();
        assert_eq!(target.name, "Jane Doe");
        assert_eq!(target.headline, "Profile information unavailable");
        assert_eq!(target.bio, "Profile information could not be retrieved");
        assert!(target.placeholder);
        assert_eq!(result.placeholders, 1);
    }

    #[test]
    fn unrelated_record_is_dropped_not_added() {
        let requested = urls(&["https://linkedin.com/in/jane-doe"]);
        let scraped = [profile("https://linkedin.com/in/someone-else", "Someone")];
        let result = match_profiles(&requested, &scraped);
        assert_eq!(result.targets.len(), 1);
        assert_eq!(result.unmatched, 1);
        assert!(result.targets[0].1.placeholder);
    }

    #[test]
    fn positional_pairing_needs_overlap() {
        let requested = urls(&["https://linkedin.com/in/a-person", "https://linkedin.com/in/b-person"]);
        // Returned in reverse order; positional pairing fails, the scan recovers.
        let scraped = [
            profile("https://linkedin.com/in/b-person/", "B"),
            profile("https://linkedin.com/in/a-person/", "A"),
        ];
        let result = match_profiles(&requested, &scraped);
        assert_eq!(result.get(&requested[0]).unwrap().name, "A");
        assert_eq!(result.get(&requested[1]).unwrap().name, "B");
    }

    #[test]
    fn prefix_related_slugs_go_to_their_own_url() {
        let requested = urls(&["https://linkedin.com/in/jane", "https://linkedin.com/in/jane-doe"]);
        let scraped = [
            profile("https://linkedin.com/in/jane-doe/", "Jane Doe"),
            profile("https://linkedin.com/in/jane/", "Jane Short"),
        ];
        let result = match_profiles(&requested, &scraped);
        assert_eq!(result.get(&requested[0]).unwrap().name, "Jane Short");
        assert_eq!(result.get(&requested[1]).unwrap().name, "Jane Doe");
        assert_eq!(result.placeholders, 0);
        assert_eq!(result.unmatched, 0);

        let reordered = match_profiles(&urls(&[requested[1].as_str(), requested[0].as_str()]), &scraped);
        assert_eq!(reordered.get(&requested[0]).unwrap().name, "Jane Short");
        assert_eq!(reordered.get(&requested[1]).unwrap().name, "Jane Doe");
    }

    #[test]
    fn longer_requested_url_wins_without_exact_match() {
        let requested = urls(&["https://linkedin.com/in/jane", "https://linkedin.com/in/jane-doe"]);
        let scraped = [profile("https://www.linkedin.com/in/jane-doe", "Jane Doe")];
        let result = match_profiles(&requested, &scraped);
        assert!(result.get(&requested[0]).unwrap().placeholder);
        assert_eq!(result.get(&requested[1]).unwrap().name, "Jane Doe");
    }

    #[test]
    fn post_source_prefers_longest_requested_url() {
        let requested = urls(&["https://linkedin.com/in/jane", "https://linkedin.com/in/jane-doe"]);
        let p = post(Some("https://linkedin.com/in/jane-doe/recent-activity"), None, "", "");
        assert_eq!(
            attribute_post(&requested, &p),
            Some((requested[1].as_str(), PostMatch::SourceUrl))
        );
    }

    #[test]
    fn record_without_url_is_skipped() {
        let requested = urls(&["https://linkedin.com/in/jane-doe"]);
        let scraped = [LinkedInProfile {
            full_name: Some("Ghost".into()),
            ..LinkedInProfile::default()
        }];
        let result = match_profiles(&requested, &scraped);
        assert!(result.targets[0].1.placeholder);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let record = LinkedInProfile {
            url: Some("https://linkedin.com/in/sam-lee".into()),
            ..LinkedInProfile::default()
        };
        let target = target_from_profile(&record).unwrap();
        assert_eq!(target.name, "Sam Lee");
        assert_eq!(target.headline, "No headline available");
        assert_eq!(target.bio, "No bio available");
    }

    fn post(source: Option<&str>, id: Option<&str>, first: &str, last: &str) -> LinkedInPost {
        LinkedInPost {
            source_url: source.map(String::from),
            author: Some(PostAuthor {
                public_id: id.map(String::from),
                first_name: Some(first.into()),
                last_name: Some(last.into()),
            }),
            text: Some("hello".into()),
            ..LinkedInPost::default()
        }
    }

    #[test]
    fn posts_attributed_by_url_then_id_then_name() {
        let requested = urls(&["https://linkedin.com/in/jane-doe", "https://linkedin.com/in/bob-smith"]);

        let by_url = post(Some("https://linkedin.com/in/jane-doe/recent-activity"), None, "", "");
        assert_eq!(
            attribute_post(&requested, &by_url),
            Some((requested[0].as_str(), PostMatch::SourceUrl))
        );

        let by_id = post(None, Some("Bob-Smith"), "", "");
        assert_eq!(
            attribute_post(&requested, &by_id),
            Some((requested[1].as_str(), PostMatch::AuthorId))
        );

        let by_name = post(None, None, "Jane", "Doe");
        assert_eq!(
            attribute_post(&requested, &by_name),
            Some((requested[0].as_str(), PostMatch::AuthorName))
        );

        let nobody = post(Some("https://linkedin.com/in/other"), Some("other"), "Zed", "Quux");
        assert_eq!(attribute_post(&requested, &nobody), None);
    }

    #[test]
    fn match_posts_counts_outcomes() {
        let requested = urls(&["https://linkedin.com/in/jane-doe"]);
        let windowed = |p: LinkedInPost| WindowedPost {
            source: p,
            post: Post {
                content: "hello".into(),
                url: None,
                date: "1d".into(),
            },
        };
        let mut stats = PostFilterStats::default();
        let grouped = match_posts(
            &requested,
            vec![
                windowed(post(Some("https://linkedin.com/in/jane-doe"), None, "", "")),
                windowed(post(None, None, "Zed", "Quux")),
            ],
            &mut stats,
        );
        assert_eq!(grouped[&requested[0]].len(), 1);
        assert_eq!(stats.matched_by_url, 1);
        assert_eq!(stats.skipped_url_mismatch, 1);
    }
}
