//! HTML to plain text for the page-reading tools.

use scraper::{ElementRef, Html, Node, Selector};

/// Elements that start a new line of output.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p",
    "pre", "section", "td", "th", "tr", "ul",
];

enum Step<'a> {
    Open(ElementRef<'a>),
    Text(&'a str),
    Close,
}

/// Visible text of `html`, one block element per line.
///
/// Subtrees rooted at any of `skip_tags`, or carrying `role="navigation"`,
/// are dropped. Entities are decoded by the parser.
pub(crate) fn html_to_text(html: &str, skip_tags: &[&str]) -> String {
    let document = Html::parse_document(html);
    let root = Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next())
        .unwrap_or_else(|| document.root_element());

    clean_whitespace(&collect_text(root, skip_tags))
}

// Walks with an explicit stack so deeply nested markup cannot exhaust the call stack.
fn collect_text(root: ElementRef<'_>, skip_tags: &[&str]) -> String {
    let mut out = String::new();
    let mut stack = vec![Step::Open(root)];

    while let Some(step) = stack.pop() {
        match step {
            Step::Text(text) => out.extend(text.chars().map(|c| if c == '\n' { ' ' } else { c })),
            Step::Close => out.push('\n'),
            Step::Open(element) => {
                let el = element.value();
                if skip_tags.contains(&el.name()) || el.attr("role") == Some("navigation") {
                    continue;
                }
                if BLOCK_TAGS.contains(&el.name()) {
                    out.push('\n');
                    stack.push(Step::Close);
                }
                for child in element.children().rev() {
                    match child.value() {
                        Node::Text(text) => stack.push(Step::Text(&**text)),
                        Node::Element(_) => {
                            if let Some(child) = ElementRef::wrap(child) {
                                stack.push(Step::Open(child));
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    out
}

/// Collapse runs of whitespace and drop blank lines.
fn clean_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
