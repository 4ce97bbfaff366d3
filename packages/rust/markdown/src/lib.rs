//! Markdown export for rendered docrender pages.
//!
//! Takes the HTML produced by the core HTML sink, keeps the page body,
//! converts it with `htmd` and runs a set of cleanup passes so the result
//! reads like hand-written Markdown.

mod cleanup;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use docrender_shared::{DocRenderError, Result};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Result of exporting one page.
#[derive(Debug, Clone)]
pub struct ExportResult {
    /// Final Markdown, front matter included.
    pub markdown: String,
    pub title: String,
    /// Approximate word count of the body, fenced code excluded.
    pub word_count: usize,
}

/// Options for [`export`].
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Page title. When empty, the first `# ` heading of the body is used.
    pub title: String,
    /// Site-relative permalink (`/docs/reference/agentchat/groupchat`).
    pub permalink: String,
    pub description: Option<String>,
    /// Site root. Relative links resolve against `base_url` + `permalink`.
    pub base_url: Option<Url>,
}

impl ExportOptions {
    /// Absolute page URL, when a base URL is configured.
    pub fn page_url(&self) -> Option<Url> {
        let base = self.base_url.as_ref()?;
        base.join(&self.permalink).ok()
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Convert a rendered page (or fragment) to Markdown with YAML front matter.
#[instrument(skip(html), fields(permalink = %opts.permalink))]
pub fn export(html: &str, opts: &ExportOptions) -> Result<ExportResult> {
    let body_html = extract_body_html(html);
    let body_html = preprocess_tables(&body_html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "nav", "aside", "iframe", "noscript", "svg"])
        .build();
    let raw = converter
        .convert(&body_html)
        .map_err(|e| DocRenderError::Conversion(format!("htmd conversion failed: {e}")))?;
    debug!(raw_len = raw.len(), "htmd conversion complete");

    let page_url = opts.page_url();
    let mut body = cleanup::run_pipeline(&raw, page_url.as_ref());

    let body_title = first_title(&body);
    let title = if opts.title.is_empty() {
        body_title.clone().unwrap_or_else(|| "Untitled".to_string())
    } else {
        opts.title.clone()
    };
    if body_title.is_none() {
        body = format!("# {title}\n\n{body}");
    }

    let word_count = count_words(&body);
    let front_matter = build_front_matter(&title, opts, page_url.as_ref());
    let markdown = format!("{front_matter}\n{body}");

    debug!(title = %title, word_count, len = markdown.len(), "export complete");

    Ok(ExportResult {
        markdown,
        title,
        word_count,
    })
}

// ---------------------------------------------------------------------------
// Body extraction
// ---------------------------------------------------------------------------

/// Keep the page body and drop the chrome around it (header, footer,
/// pagination, TOC sidebar).
fn extract_body_html(html: &str) -> String {
    const CONTAINERS: &[&str] = &["article .markdown", ".markdown", "article", "main"];

    let doc = Html::parse_document(html);
    for container in CONTAINERS {
        let Ok(selector) = Selector::parse(container) else {
            continue;
        };
        if let Some(el) = doc.select(&selector).next() {
            return el.inner_html();
        }
    }

    match Selector::parse("body") {
        Ok(body) => doc
            .select(&body)
            .next()
            .map_or_else(|| html.to_string(), |el| el.inner_html()),
        Err(_) => html.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Rewrite `<table>` elements as pipe tables before `htmd` sees them.
fn preprocess_tables(html: &str) -> String {
    static TABLE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?is)<table\b.*?</table>").expect("valid regex"));
    static TABLE_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("table").expect("valid selector"));

    TABLE_RE
        .replace_all(html, |caps: &regex::Captures| {
            let fragment = Html::parse_fragment(&caps[0]);
            fragment
                .select(&TABLE_SEL)
                .next()
                .map_or_else(|| caps[0].to_string(), |table| table_to_markdown(&table))
        })
        .into_owned()
}

fn table_to_markdown(table: &ElementRef) -> String {
    static ROW_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
    static CELL_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("th, td").expect("valid selector"));

    let rows: Vec<Vec<String>> = table
        .select(&ROW_SEL)
        .map(|tr| {
            tr.select(&CELL_SEL)
                .map(|cell| {
                    cell.text()
                        .collect::<String>()
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ")
                        .replace('|', "\\|")
                })
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return String::new();
    }

    let line = |cells: &[String]| {
        let mut padded = cells.to_vec();
        padded.resize(width, String::new());
        format!("| {} |\n", padded.join(" | "))
    };

    let mut md = String::from("\n\n");
    md.push_str(&line(&rows[0]));
    md.push_str(&line(&vec!["---".to_string(); width]));
    for row in &rows[1..] {
        md.push_str(&line(row));
    }
    md.push('\n');
    md
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn first_title(md: &str) -> Option<String> {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^# (.+)$").expect("valid regex"));

    H1_RE.captures(md).map(|c| c[1].trim().to_string())
}

fn count_words(md: &str) -> usize {
    static FENCE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));

    FENCE_RE
        .replace_all(md, "")
        .split_whitespace()
        .filter(|w| !w.chars().all(|c| c == '#'))
        .count()
}

fn build_front_matter(title: &str, opts: &ExportOptions, page_url: Option<&Url>) -> String {
    let mut fm = String::from("---\n");
    fm.push_str(&format!("title: \"{}\"\n", escape_yaml(title)));
    fm.push_str(&format!("permalink: \"{}\"\n", escape_yaml(&opts.permalink)));
    if let Some(description) = &opts.description {
        fm.push_str(&format!("description: \"{}\"\n", escape_yaml(description)));
    }
    if let Some(url) = page_url {
        fm.push_str(&format!("source_url: \"{url}\"\n"));
    }
    fm.push_str("---\n");
    fm
}

fn escape_yaml(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use docrender_core::{ComponentContext, assemble_bundle, load_bundle, page_to_html};
    use docrender_shared::RenderOptions;

    fn opts(title: &str, permalink: &str) -> ExportOptions {
        ExportOptions {
            title: title.into(),
            permalink: permalink.into(),
            ..ExportOptions::default()
        }
    }

    fn fixture_export(name: &str, base_url: Option<&str>) -> ExportResult {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/json")
            .join(name);
        let bundle = load_bundle(&path).unwrap();
        let page = assemble_bundle(&bundle, &ComponentContext::root(), &RenderOptions::default())
            .unwrap();

        export(
            &page_to_html(&page),
            &ExportOptions {
                title: page.title.clone(),
                permalink: page.permalink.clone(),
                description: None,
                base_url: base_url.map(|u| Url::parse(u).unwrap()),
            },
        )
        .unwrap()
    }

    #[test]
    fn export_writes_front_matter() {
        let result = export(
            "<p>Body text.</p>",
            &ExportOptions {
                description: Some("GroupChat \"Objects\"".into()),
                ..opts("agentchat.groupchat", "/docs/reference/agentchat/groupchat")
            },
        )
        .unwrap();

        assert!(result.markdown.starts_with("---\ntitle: \"agentchat.groupchat\"\n"));
        assert!(result.markdown.contains("permalink: \"/docs/reference/agentchat/groupchat\""));
        assert!(result.markdown.contains("description: \"GroupChat \\\"Objects\\\"\""));
        assert!(!result.markdown.contains("source_url"));
    }

    #[test]
    fn export_prepends_title_when_body_has_none() {
        let result = export("<h2>Usage</h2><p>Text.</p>", &opts("Guide", "/docs/guide")).unwrap();
        assert!(result.markdown.contains("# Guide\n\n## Usage"));
    }

    #[test]
    fn export_keeps_body_title() {
        let result = export("<h1>Own Title</h1><p>Text.</p>", &opts("", "/docs/x")).unwrap();
        assert_eq!(result.title, "Own Title");
        assert_eq!(result.markdown.matches("# Own Title").count(), 1);
    }

    #[test]
    fn export_converts_tables() {
        let html = "<table><thead><tr><th>Name</th><th>Default</th></tr></thead>\
                    <tbody><tr><td>max_round</td><td>10</td></tr></tbody></table>";
        let result = export(html, &opts("Config", "/docs/config")).unwrap();

        assert!(result.markdown.contains("| Name | Default |"));
        assert!(result.markdown.contains("| max_round | 10 |"));
    }

    #[test]
    fn export_keeps_blank_lines_in_code() {
        let html = "<pre><code class=\"language-python\">import os\n\n\ndef f():\n    pass\n</code></pre>";
        let result = export(html, &opts("Code", "/docs/code")).unwrap();
        assert!(result.markdown.contains("import os\n\n\ndef f():"));
    }

    #[test]
    fn exported_doc_page_keeps_body_only() {
        let result = fixture_export("groupchat.bundle.json", None);
        let md = &result.markdown;

        assert!(md.contains("## GroupChat Objects"));
        assert!(md.contains("```python"));
        assert!(md.contains("class GroupChat()"));
        // chrome and hash links are gone
        assert!(!md.contains("[#]("));
        assert!(!md.contains("Edit this page"));
        assert!(!md.contains("user_proxy_agent"));
        assert!(!md.contains("<div"));
    }

    #[test]
    fn exported_blog_post_resolves_links() {
        let result = fixture_export(
            "code-execution-in-docker.bundle.json",
            Some("https://microsoft.github.io"),
        );

        assert!(result.markdown.contains(
            "source_url: \"https://microsoft.github.io/autogen/blog/2024/01/23/Code-execution-in-docker\""
        ));
        assert!(result.markdown.contains("https://microsoft.github.io/autogen/docs/FAQ#code-execution"));
        assert!(result.word_count > 20);
    }

    #[test]
    fn word_count_skips_fences() {
        let result = export(
            "<h1>T</h1><p>One two three.</p><pre><code>lots of code words here</code></pre>",
            &opts("", "/x"),
        )
        .unwrap();
        assert_eq!(result.word_count, 4);
    }

    #[test]
    fn page_url_joins_permalink() {
        let o = ExportOptions {
            base_url: Some(Url::parse("https://microsoft.github.io/").unwrap()),
            ..opts("t", "/autogen/docs/Getting-Started")
        };
        assert_eq!(
            o.page_url().unwrap().as_str(),
            "https://microsoft.github.io/autogen/docs/Getting-Started"
        );
        assert!(opts("t", "/x").page_url().is_none());
    }
}
