//! Case-study sources against a local HTTP server.

use std::sync::Arc;

use prospect_common::{CaseStudy, WikiConfig};
use prospect_research::case_studies::{CaseStudyLibrary, SitemapCaseStudies, WikiCaseStudies};
use prospect_research::testing::{MockChat, MockDescriber};
use prospect_research::traits::CaseStudySource;
use serde_json::json;
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SITEMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://popularpays.com/case-studies/</loc></url>
  <url><loc>https://popularpays.com/case-studies/acme-summer-launch</loc></url>
  <url><loc>https://popularpays.com/case-studies/northwind-coffee</loc></url>
  <url><loc>https://popularpays.com/about</loc></url>
</urlset>"#;

const CATEGORY_PAGE: &str = r#"<table><tbody>
<tr><th>Brand</th><th>Preview</th></tr>
<tr><td>Zeta Beauty</td><td><ac:image><ri:attachment ri:filename="zeta.png"></ri:attachment></ac:image></td></tr>
<tr><td>Northwind</td><td><ac:image><ri:attachment ri:filename="nw.png"></ri:attachment></ac:image></td></tr>
</tbody></table>"#;

fn selector() -> Arc<MockChat> {
    Arc::new(
        MockChat::new()
            .when("case studies are most relevant", "Northwind Coffee")
            .when("which category is most relevant", "Food")
            .when("brands separated by commas", "Northwind"),
    )
}

fn wiki_config(server: &MockServer) -> WikiConfig {
    WikiConfig {
        base_url: format!("{}/", server.uri()),
        email: "ops@example.com".into(),
        api_token: "token".into(),
        space: "REV".into(),
    }
}

fn wiki_source(server: &MockServer) -> WikiCaseStudies {
    WikiCaseStudies::new(
        reqwest::Client::new(),
        wiki_config(server),
        selector(),
        Arc::new(MockDescriber {
            analysis: "Northwind grew reach 3x".into(),
        }),
    )
}

async fn mount_wiki(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/wiki/api/v2/spaces"))
        .and(query_param("keys", "REV"))
        .and(basic_auth("ops@example.com", "token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [{"id": "42"}]})))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wiki/rest/api/content"))
        .and(query_param("spaceId", "42"))
        .and(query_param("title", "Campaign Examples"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"results": [{"id": "100", "title": "Campaign Examples"}]})),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wiki/rest/api/content/100/child/page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": "200", "title": "Beauty"}, {"id": "201", "title": "Food"}]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wiki/rest/api/content/201"))
        .and(query_param("expand", "body.storage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "201",
            "body": {"storage": {"value": CATEGORY_PAGE}}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wiki/download/attachments/201/nw.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, 0x50, 0x4e, 0x47]))
        .mount(server)
        .await;
}

#[tokio::test]
async fn sitemap_source_picks_suggested_then_tops_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SITEMAP))
        .mount(&server)
        .await;

    let source = SitemapCaseStudies::new(
        reqwest::Client::new(),
        format!("{}/sitemap.xml", server.uri()),
        selector(),
    );
    let found = source.find("Acme", 2).await.unwrap();

    let brands: Vec<&str> = found.iter().map(CaseStudy::brand).collect();
    assert_eq!(brands, ["Northwind Coffee", "Acme Summer Launch"]);
    assert_eq!(
        found[0].url(),
        Some("https://popularpays.com/case-studies/northwind-coffee")
    );
}

#[tokio::test]
async fn sitemap_http_error_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = SitemapCaseStudies::new(
        reqwest::Client::new(),
        format!("{}/sitemap.xml", server.uri()),
        selector(),
    );
    assert!(source.find("Acme", 3).await.is_err());
}

#[tokio::test]
async fn wiki_source_walks_campaign_examples() {
    let server = MockServer::start().await;
    mount_wiki(&server).await;

    let found = wiki_source(&server).find("Acme", 3).await.unwrap();

    assert_eq!(found.len(), 1);
    match &found[0] {
        CaseStudy::Wiki {
            brand,
            image,
            analysis,
            filename,
        } => {
            assert_eq!(brand, "Northwind");
            assert_eq!(image, &vec![0x89, 0x50, 0x4e, 0x47]);
            assert_eq!(analysis, "Northwind grew reach 3x (4 bytes)");
            assert_eq!(filename, "nw.png");
        }
        other => panic!("expected wiki case study, got {other:?}"),
    }
}

#[tokio::test]
async fn library_falls_back_to_wiki_when_sitemap_is_down() {
    let server = MockServer::start().await;
    mount_wiki(&server).await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let website = SitemapCaseStudies::new(
        reqwest::Client::new(),
        format!("{}/sitemap.xml", server.uri()),
        selector(),
    );
    let library = CaseStudyLibrary::new(website).with_wiki(wiki_source(&server));

    let found = library.find("Acme", 3).await.unwrap();
    assert_eq!(found.iter().map(CaseStudy::brand).collect::<Vec<_>>(), ["Northwind"]);
}
