//! Encyclopedia tools backed by the MediaWiki action API.
//!
//! Three tools share one client and one page cache: search for titles, list
//! the sections of a page (which caches the page), then fetch the text of a
//! single section of a cached page.

use super::html::html_to_text;
use super::{parse_args, ParamKind, ParameterSpec, Tool, ToolDescriptor, ToolError, ToolOutput};
use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

const USER_AGENT: &str = concat!("gaia-agent/", env!("CARGO_PKG_VERSION"));

/// Section markup dropped before extracting text: infoboxes, images and scripts.
const SKIPPED_TAGS: &[&str] = &["style", "script", "figure", "table"];

/// Sections of a fetched page, keyed by canonical page title.
pub type PageCache = RwLock<HashMap<String, CachedPage>>;

/// A page whose section list has been fetched.
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub title: String,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Section {
    /// Section heading as plain text.
    pub line: String,
    /// Section index used by the parse API.
    pub index: String,
}

/// Thin MediaWiki client.
pub struct WikipediaClient {
    http: reqwest::Client,
    endpoint: String,
    cache: PageCache,
}

#[derive(Debug, Deserialize)]
struct SearchReply {
    query: SearchQuery,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ParseReply {
    parse: Option<ParseBody>,
    error: Option<ParseError>,
}

#[derive(Debug, Deserialize)]
struct ParseBody {
    title: String,
    #[serde(default)]
    sections: Vec<Section>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    properties: Vec<PageProperty>,
}

#[derive(Debug, Deserialize)]
struct PageProperty {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ParseError {
    code: String,
    info: String,
}

impl WikipediaClient {
    pub fn new(language: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Self::with_endpoint(http, &format!("https://{}.wikipedia.org/w/api.php", language))
    }

    fn with_endpoint(http: reqwest::Client, endpoint: &str) -> Result<Self> {
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            cache: RwLock::new(HashMap::new()),
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, params: &[(&str, &str)]) -> std::result::Result<T, ToolError> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ToolError::Upstream(format!("HTTP {}", response.status())));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ToolError::Upstream(format!("unexpected reply: {}", e)))
    }

    /// Page titles matching `query`.
    pub async fn search(&self, query: &str, limit: u32) -> std::result::Result<Vec<String>, ToolError> {
        let limit = limit.to_string();
        let reply: SearchReply = self
            .get(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
            ])
            .await?;
        Ok(reply.query.search.into_iter().map(|h| h.title).collect())
    }

    /// Fetch the section list of a page and cache it under its canonical title.
    pub async fn sections(&self, title: &str) -> std::result::Result<CachedPage, ToolError> {
        let reply: ParseReply = self
            .get(&[
                ("action", "parse"),
                ("page", title),
                ("prop", "sections|properties"),
                ("redirects", "1"),
            ])
            .await?;

        let body = parse_body(reply, title)?;
        if body.properties.iter().any(|p| p.name == "disambiguation") {
            let options = self.search(&body.title, 10).await.unwrap_or_default();
            return Err(ToolError::Evaluation(format!(
                "Disambiguation required. Call this tool again with one of the following options: {:?}",
                options
            )));
        }

        let page = CachedPage {
            title: body.title,
            sections: body.sections,
        };
        self.cache
            .write()
            .await
            .insert(page.title.clone(), page.clone());
        Ok(page)
    }

    /// Plain text of one section of a cached page.
    pub async fn section_text(&self, page_title: &str, section_title: &str) -> std::result::Result<String, ToolError> {
        let page = self.cache.read().await.get(page_title).cloned().ok_or_else(|| {
            ToolError::NotFound(
                "Page not found in cache. Please use the correct page title as returned by the \
                wikipedia_page_sections_retriever tool."
                    .to_string(),
            )
        })?;

        let section = page
            .sections
            .iter()
            .find(|s| s.line.eq_ignore_ascii_case(section_title.trim()))
            .ok_or_else(|| {
                ToolError::NotFound(format!(
                    "Section '{}' not found on page '{}'",
                    section_title, page.title
                ))
            })?;

        let reply: ParseReply = self
            .get(&[
                ("action", "parse"),
                ("page", page.title.as_str()),
                ("section", section.index.as_str()),
                ("prop", "text"),
                ("disableeditsection", "1"),
            ])
            .await?;
        let body = parse_body(reply, &page.title)?;
        let html = body.text.unwrap_or_default();
        debug!("Section '{}' of '{}': {} bytes of HTML", section.line, page.title, html.len());

        Ok(html_to_text(&html, SKIPPED_TAGS))
    }
}

fn parse_body(reply: ParseReply, title: &str) -> std::result::Result<ParseBody, ToolError> {
    match (reply.parse, reply.error) {
        (Some(body), _) => Ok(body),
        (None, Some(error)) if error.code == "missingtitle" => {
            Err(ToolError::NotFound(format!("No Wikipedia page titled '{}'", title)))
        }
        (None, Some(error)) => Err(ToolError::Upstream(error.info)),
        (None, None) => Err(ToolError::Upstream("empty reply".to_string())),
    }
}

/// `wikipedia_page_search` tool.
pub struct WikipediaPageSearch {
    descriptor: ToolDescriptor,
    client: Arc<WikipediaClient>,
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct PageSearchArgs {
    query: String,
}

impl WikipediaPageSearch {
    pub fn new(client: Arc<WikipediaClient>, limit: u32) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                "wikipedia_page_search",
                "Search Wikipedia and return the titles of matching pages.",
                vec![ParameterSpec::required("query", ParamKind::String, "Search terms")],
            ),
            client,
            limit,
        }
    }
}

#[async_trait]
impl Tool for WikipediaPageSearch {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, args: serde_json::Value) -> ToolOutput {
        let args: PageSearchArgs = parse_args(args)?;
        let titles = self.client.search(&args.query, self.limit).await?;
        if titles.is_empty() {
            return Ok(format!("No Wikipedia pages found for '{}'.", args.query));
        }
        Ok(format!("{:?}", titles))
    }
}

/// `wikipedia_page_sections_retriever` tool.
pub struct WikipediaSections {
    descriptor: ToolDescriptor,
    client: Arc<WikipediaClient>,
}

#[derive(Debug, Deserialize)]
struct SectionsArgs {
    page_title: String,
}

impl WikipediaSections {
    pub fn new(client: Arc<WikipediaClient>) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                "wikipedia_page_sections_retriever",
                "List the section titles of a Wikipedia page. Call this before \
                wikipedia_section_content_retriever.",
                vec![ParameterSpec::required(
                    "page_title",
                    ParamKind::String,
                    "Exact page title, as returned by wikipedia_page_search",
                )],
            ),
            client,
        }
    }
}

#[async_trait]
impl Tool for WikipediaSections {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, args: serde_json::Value) -> ToolOutput {
        let args: SectionsArgs = parse_args(args)?;
        let page = self.client.sections(&args.page_title).await?;
        let headings: Vec<&str> = page.sections.iter().map(|s| s.line.as_str()).collect();
        Ok(format!("Page title: {}\nSections: {:?}", page.title, headings))
    }
}

/// `wikipedia_section_content_retriever` tool.
pub struct WikipediaSectionContent {
    descriptor: ToolDescriptor,
    client: Arc<WikipediaClient>,
}

#[derive(Debug, Deserialize)]
struct SectionContentArgs {
    page_title: String,
    section_title: String,
}

impl WikipediaSectionContent {
    pub fn new(client: Arc<WikipediaClient>) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                "wikipedia_section_content_retriever",
                "Return the text of one section of a Wikipedia page previously opened with \
                wikipedia_page_sections_retriever.",
                vec![
                    ParameterSpec::required("page_title", ParamKind::String, "Page title"),
                    ParameterSpec::required("section_title", ParamKind::String, "Section title"),
                ],
            ),
            client,
        }
    }
}

#[async_trait]
impl Tool for WikipediaSectionContent {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, args: serde_json::Value) -> ToolOutput {
        let args: SectionContentArgs = parse_args(args)?;
        self.client
            .section_text(&args.page_title, &args.section_title)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_client() -> WikipediaClient {
        WikipediaClient::with_endpoint(reqwest::Client::new(), "http://127.0.0.1:9/w/api.php").unwrap()
    }

    #[test]
    fn test_section_html_to_text() {
        let html = r#"<div><style>.x{}</style><p>Mercury has <a href="/wiki/Moon">no moons</a> &amp; a thin atmosphere.</p>

<figure><img src="x"/><figcaption>caption</figcaption></figure>


<p>Second&nbsp;paragraph.</p></div>"#;
        assert_eq!(
            html_to_text(html, SKIPPED_TAGS),
            "Mercury has no moons & a thin atmosphere.\nSecond paragraph."
        );

        let cited = r#"<p>Paris<sup class="reference">&#91;1&#93;</sup> &mdash; capital</p>
<table class="infobox"><tr><td>Mayor</td></tr></table>
<div role="navigation"><div><a>Cities</a></div><div>Europe</div></div><p>End.</p>"#;
        assert_eq!(
            html_to_text(cited, SKIPPED_TAGS),
            "Paris[1] \u{2014} capital\nEnd."
        );
    }

    #[tokio::test]
    async fn test_section_requires_cached_page() {
        let client = offline_client();
        let err = client.section_text("Mercury (planet)", "Orbit").await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_section_of_cached_page() {
        let client = offline_client();
        client.cache.write().await.insert(
            "Mercury (planet)".to_string(),
            CachedPage {
                title: "Mercury (planet)".to_string(),
                sections: vec![Section {
                    line: "Orbit".to_string(),
                    index: "1".to_string(),
                }],
            },
        );

        let err = client
            .section_text("Mercury (planet)", "Moons")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Moons"));
    }

    #[tokio::test]
    async fn test_tool_rejects_missing_arguments() {
        let tool = WikipediaSectionContent::new(Arc::new(offline_client()));
        let output = tool.invoke(serde_json::json!({"page_title": "x"})).await;
        assert!(matches!(output, Err(ToolError::InvalidArguments(_))));
    }

    #[test]
    fn test_parse_body_missing_title() {
        let reply = ParseReply {
            parse: None,
            error: Some(ParseError {
                code: "missingtitle".to_string(),
                info: "The page you specified doesn't exist.".to_string(),
            }),
        };
        assert!(matches!(parse_body(reply, "Nope"), Err(ToolError::NotFound(_))));
    }
}
