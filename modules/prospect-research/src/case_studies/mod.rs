//! Case-study lookup: the public website first, the internal wiki to fill gaps.

pub mod sitemap;
pub mod wiki;

use anyhow::Result;
use async_trait::async_trait;
use prospect_common::CaseStudy;
use tracing::{info, warn};

use crate::traits::CaseStudySource;

pub use sitemap::SitemapCaseStudies;
pub use wiki::WikiCaseStudies;

/// Combines a preferred source with an optional fallback. A failing source
/// contributes nothing; the library itself never fails.
pub struct CaseStudyLibrary {
    website: Box<dyn CaseStudySource>,
    wiki: Option<Box<dyn CaseStudySource>>,
}

impl CaseStudyLibrary {
    pub fn new(website: impl CaseStudySource + 'static) -> Self {
        Self {
            website: Box::new(website),
            wiki: None,
        }
    }

    pub fn with_wiki(mut self, wiki: impl CaseStudySource + 'static) -> Self {
        self.wiki = Some(Box::new(wiki));
        self
    }
}

async fn collect(source: &dyn CaseStudySource, name: &str, topic: &str, count: usize) -> Vec<CaseStudy> {
    match source.find(topic, count).await {
        Ok(found) => found,
        Err(e) => {
            warn!(source = name, error = %e, "Case study source failed");
            Vec::new()
        }
    }
}

#[async_trait]
impl CaseStudySource for CaseStudyLibrary {
    async fn find(&self, topic: &str, count: usize) -> Result<Vec<CaseStudy>> {
        let mut found = collect(self.website.as_ref(), "website", topic, count).await;
        found.truncate(count);
        let from_website = found.len();

        let remaining = count - found.len();
        if remaining > 0 {
            if let Some(wiki) = &self.wiki {
                let mut extra = collect(wiki.as_ref(), "wiki", topic, remaining).await;
                extra.truncate(remaining);
                found.extend(extra);
            }
        }

        for (i, cs) in found.iter().enumerate() {
            match cs {
                CaseStudy::Website { brand, url, .. } => info!(n = i + 1, brand, url, "Case study (website)"),
                CaseStudy::Wiki { brand, filename, .. } => info!(n = i + 1, brand, filename, "Case study (wiki)"),
            }
        }
        info!(from_website, from_wiki = found.len() - from_website, "Case studies collected");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCaseStudies;

    fn website(brand: &str) -> CaseStudy {
        CaseStudy::Website {
            brand: brand.into(),
            url: format!("https://popularpays.com/case-studies/{brand}"),
            summary: format!("Case study from Popular Pays website: {brand}"),
        }
    }

    fn wiki(brand: &str) -> CaseStudy {
        CaseStudy::Wiki {
            brand: brand.into(),
            image: vec![1, 2, 3],
            analysis: "analysis".into(),
            filename: format!("{brand}.png"),
        }
    }

    fn brands(found: &[CaseStudy]) -> Vec<&str> {
        found.iter().map(CaseStudy::brand).collect()
    }

    #[tokio::test]
    async fn website_first_then_wiki_fills() {
        let library = CaseStudyLibrary::new(MockCaseStudies::returning(vec![website("a")]))
            .with_wiki(MockCaseStudies::returning(vec![wiki("x"), wiki("y"), wiki("z")]));
        let found = library.find("Acme", 3).await.unwrap();
        assert_eq!(brands(&found), ["a", "x", "y"]);
    }

    #[tokio::test]
    async fn full_website_skips_wiki() {
        let library = CaseStudyLibrary::new(MockCaseStudies::returning(vec![website("a"), website("b")]))
            .with_wiki(MockCaseStudies::failing("should not be called"));
        let found = library.find("Acme", 2).await.unwrap();
        assert_eq!(brands(&found), ["a", "b"]);
    }

    #[tokio::test]
    async fn failing_sources_yield_empty() {
        let library = CaseStudyLibrary::new(MockCaseStudies::failing("sitemap down"))
            .with_wiki(MockCaseStudies::failing("wiki down"));
        assert!(library.find("Acme", 3).await.unwrap().is_empty());

        let library = CaseStudyLibrary::new(MockCaseStudies::failing("sitemap down"))
            .with_wiki(MockCaseStudies::returning(vec![wiki("x")]));
        assert_eq!(brands(&library.find("Acme", 3).await.unwrap()), ["x"]);
    }
}
