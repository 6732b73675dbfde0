// MIT License
// Copyright (c) 2024 Graham King

use std::collections::HashSet;
use std::sync::LazyLock;

use comrak::nodes::{AstNode, NodeValue};
use comrak::{format_html, parse_document, Arena, Options};
use regex::Regex;

static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:ht|f)tps?://\S+").unwrap());

/// The article fields that live inside the markdown source
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Extracted {
    pub title: String,
    pub punchline: String,
    pub description: String,
    /// Whatever is left once the fields above are taken out
    pub rendered_html: String,
    pub full_rendered_content: String,
}

/// Render the markdown and pull the article fields out of it:
///
/// - title: the first `<h1>`
/// - punchline: the first `<p>` of the first `<blockquote>`
/// - description: the last `<p>` before the first `<h2>`
///
/// Each step removes what it took, so later steps and `rendered_html` only
/// see the rest. Missing elements give empty strings.
pub fn extract(raw_markdown: &str) -> Extracted {
    let arena = Arena::new();
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    let root = parse_document(&arena, raw_markdown, &options);

    let full_rendered_content = render(root, &options);

    let title = match find_first(root, |v| matches!(v, NodeValue::Heading(h) if h.level == 1)) {
        Some(h1) => {
            h1.detach();
            inner_html(h1, &options)
        }
        None => String::new(),
    };

    let punchline = match find_first(root, |v| matches!(v, NodeValue::BlockQuote)) {
        Some(quote) => {
            quote.detach();
            quote
                .descendants()
                .find(|n| is_paragraph(n))
                .map(|p| inner_html(p, &options).trim().to_string())
                .unwrap_or_default()
        }
        None => String::new(),
    };

    let description = match paragraph_before_first_h2(root) {
        Some(p) => {
            p.detach();
            inner_html(p, &options)
        }
        None => String::new(),
    };

    Extracted {
        title,
        punchline,
        description,
        rendered_html: render(root, &options),
        full_rendered_content,
    }
}

/// Number of distinct URLs in the text
pub fn count_links(text: &str) -> usize {
    LINK.find_iter(text)
        .map(|m| m.as_str())
        .collect::<HashSet<&str>>()
        .len()
}

fn find_first<'a>(
    root: &'a AstNode<'a>,
    pred: impl Fn(&NodeValue) -> bool,
) -> Option<&'a AstNode<'a>> {
    root.descendants().find(|n| pred(&n.data.borrow().value))
}

// Paragraphs in a tight list render without <p>, so they don't count
fn is_paragraph<'a>(node: &'a AstNode<'a>) -> bool {
    if !matches!(node.data.borrow().value, NodeValue::Paragraph) {
        return false;
    }
    let in_tight_list = node
        .parent()
        .and_then(|item| item.parent())
        .map(|list| matches!(&list.data.borrow().value, NodeValue::List(l) if l.tight))
        .unwrap_or(false);
    !in_tight_list
}

// Document order: the nearest <p> that opens before the <h2> does
fn paragraph_before_first_h2<'a>(root: &'a AstNode<'a>) -> Option<&'a AstNode<'a>> {
    let mut last_paragraph = None;
    for node in root.descendants() {
        if matches!(&node.data.borrow().value, NodeValue::Heading(h) if h.level == 2) {
            return last_paragraph;
        }
        if is_paragraph(node) {
            last_paragraph = Some(node);
        }
    }
    None
}

fn inner_html<'a>(node: &'a AstNode<'a>, options: &Options) -> String {
    node.children().map(|child| render(child, options)).collect()
}

fn render<'a>(node: &'a AstNode<'a>, options: &Options) -> String {
    let mut html = Vec::new();
    if let Err(err) = format_html(node, options, &mut html) {
        tracing::warn!(%err, "markdown render failed");
    }
    String::from_utf8_lossy(&html).into_owned()
}
