use super::html::html_to_text;
use super::{parse_args, ParamKind, ParameterSpec, Tool, ToolDescriptor, ToolError, ToolOutput};
use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) gaia-agent";

/// Elements whose content is never shown to a reader.
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "svg", "template"];

/// `fetch_text_content` tool: download a web page and return its readable text.
pub struct WebFetch {
    descriptor: ToolDescriptor,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct FetchArgs {
    url: String,
}

impl WebFetch {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            descriptor: ToolDescriptor::new(
                "fetch_text_content",
                "Fetch a web page by URL and return its visible text content.",
                vec![ParameterSpec::required(
                    "url",
                    ParamKind::String,
                    "Absolute http or https URL",
                )],
            ),
            http,
        })
    }
}

fn validate_url(raw: &str) -> std::result::Result<Url, ToolError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ToolError::InvalidArguments(format!("'{}' is not a valid URL: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ToolError::Unsupported(format!("URL scheme '{}'", other))),
    }
}

#[async_trait]
impl Tool for WebFetch {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, args: serde_json::Value) -> ToolOutput {
        let args: FetchArgs = parse_args(args)?;
        let url = validate_url(&args.url)?;

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Upstream(format!("{} returned HTTP {}", url, status)));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("html"))
            .unwrap_or(true);

        let body = response
            .text()
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))?;
        debug!("Fetched {} ({} bytes)", url, body.len());

        let text = if is_html {
            html_to_text(&body, HIDDEN_TAGS)
        } else {
            body.trim().to_string()
        };

        if text.is_empty() {
            return Err(ToolError::NotFound(format!("no text content at {}", url)));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> WebFetch {
        WebFetch::new(Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_page_text() {
        let html = r#"<html><head><title>T</title><style>p{color:red}</style></head>
<body><script>var x = 1;</script><!-- nav --><noscript>Enable JS</noscript>
<h1>Heading</h1>
<p>First   line &amp; more</p>
<p>Caf&eacute; &#8211; &copy; 2024</p></body></html>"#;
        assert_eq!(
            html_to_text(html, HIDDEN_TAGS),
            "Heading\nFirst line & more\nCaf\u{e9} \u{2013} \u{a9} 2024"
        );
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.org/page").is_ok());
        assert!(matches!(
            validate_url("not a url"),
            Err(ToolError::InvalidArguments(_))
        ));
        assert!(matches!(
            validate_url("file:///etc/passwd"),
            Err(ToolError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme_without_fetching() {
        let output = fetcher()
            .invoke(serde_json::json!({"url": "ftp://example.org/file"}))
            .await;
        assert!(matches!(output, Err(ToolError::Unsupported(_))));
    }
}
