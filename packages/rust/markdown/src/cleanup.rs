//! Cleanup passes applied to `htmd` output.
//!
//! Each pass is `&str -> String`; [`run_pipeline`] applies them in order.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

/// Run every cleanup pass over freshly converted Markdown.
pub(crate) fn run_pipeline(md: &str, page_url: Option<&Url>) -> String {
    let mut result = strip_anchor_links(md);

    result = demote_extra_titles(&result);
    result = collapse_blank_lines(&result);
    result = fix_fence_languages(&result);
    result = strip_leftover_html(&result);
    result = resolve_links(&result, page_url);
    result = trim_line_ends(&result);
    ensure_trailing_newline(&result)
}

// ---------------------------------------------------------------------------
// Anchor links
// ---------------------------------------------------------------------------

/// Drop the `[#](#id)` hash links headings carry in rendered HTML.
fn strip_anchor_links(md: &str) -> String {
    static HASH_LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[ \t]*\[\\?#\]\(#[^)\s]*\)").expect("valid regex"));

    HASH_LINK_RE.replace_all(md, "").into_owned()
}

// ---------------------------------------------------------------------------
// Headings
// ---------------------------------------------------------------------------

/// Keep the first `# ` heading; demote later ones to `## `.
fn demote_extra_titles(md: &str) -> String {
    static H1_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#\s+(.+)$").expect("valid regex"));

    let mut seen_title = false;
    let mut in_fence = false;
    let mut lines = Vec::new();

    for line in md.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        match H1_RE.captures(line) {
            Some(caps) if !in_fence => {
                if seen_title {
                    lines.push(format!("## {}", &caps[1]));
                } else {
                    seen_title = true;
                    lines.push(line.to_string());
                }
            }
            _ => lines.push(line.to_string()),
        }
    }

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of blank lines to a single blank line. Fenced code keeps
/// its blank lines.
fn collapse_blank_lines(md: &str) -> String {
    let mut in_fence = false;
    let mut prev_blank = false;
    let mut out = Vec::new();

    for line in md.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            prev_blank = false;
            out.push(line);
            continue;
        }
        if in_fence {
            out.push(line);
            continue;
        }

        let blank = line.trim().is_empty();
        if blank && prev_blank {
            continue;
        }
        prev_blank = blank;
        out.push(if blank { "" } else { line });
    }

    let mut result = out.join("\n");
    if md.ends_with('\n') {
        result.push('\n');
    }
    result
}

// ---------------------------------------------------------------------------
// Code fences
// ---------------------------------------------------------------------------

/// Turn class-style fence hints (`language-python`, `lang-js`) into plain ones.
fn fix_fence_languages(md: &str) -> String {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^```(?:language-|lang-|highlight-)([\w+-]+)").expect("valid regex")
    });

    FENCE_RE.replace_all(md, "```$1").into_owned()
}

// ---------------------------------------------------------------------------
// Leftover HTML
// ---------------------------------------------------------------------------

/// Remove layout tags `htmd` passes through, keeping their text. Fenced code
/// is left alone.
fn strip_leftover_html(md: &str) -> String {
    static LAYOUT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"</?(?:div|span|section|article|aside|header|footer|time|samp|kbd|details|summary)(?:\s[^>]*)?>",
        )
        .expect("valid regex")
    });

    let mut in_fence = false;
    let mut out = Vec::new();
    for line in md.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            out.push(line.to_string());
        } else if in_fence {
            out.push(line.to_string());
        } else {
            out.push(LAYOUT_TAG_RE.replace_all(line, "").into_owned());
        }
    }
    out.join("\n")
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// Make site-relative link and image targets absolute against the page URL.
/// Absolute URLs, in-page anchors and `mailto:` links are kept.
fn resolve_links(md: &str, page_url: Option<&Url>) -> String {
    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(!?)\[([^\]]*)\]\(([^)\s]+)\)").expect("valid regex"));

    let Some(base) = page_url else {
        return md.to_string();
    };

    LINK_RE
        .replace_all(md, |caps: &Captures| {
            let bang = &caps[1];
            let text = &caps[2];
            let href = &caps[3];

            let keep = href.starts_with('#')
                || href.starts_with("mailto:")
                || Url::parse(href).is_ok();
            if keep {
                return caps[0].to_string();
            }

            match base.join(href) {
                Ok(resolved) => format!("{bang}[{text}]({resolved})"),
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Whitespace
// ---------------------------------------------------------------------------

fn trim_line_ends(md: &str) -> String {
    md.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

fn ensure_trailing_newline(md: &str) -> String {
    format!("{}\n", md.trim_matches('\n'))
}
