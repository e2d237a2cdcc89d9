//! Whitespace minification for cached HTML
//!
//! A regex based, non-parsing pass. It refuses to touch markup where
//! whitespace is significant or where regexes cannot tell code from text,
//! and returns such input unchanged.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Authors can opt a page out of minification by including this token
pub const SKIP_MARKER: &str = "skipmin";

static WHITESPACE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<(pre|textarea)\b").unwrap());

static SCRIPT_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<script\b[^>]*>").unwrap());

static SPACED_ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"=\s*(?:"[^"]* {2,}[^"]*"|'[^']* {2,}[^']*')"#).unwrap());

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--(.*?)-->").unwrap());

static LINE_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*(\S)").unwrap());

static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n]").unwrap());

static BLANKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\t ]+").unwrap());

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(google[\w:\s]+)\]").unwrap());

/// HTML minifier applied to every body before it is stored
#[derive(Debug, Clone, Copy, Default)]
pub struct Minifier;

impl Minifier {
    pub fn new() -> Self {
        Self
    }

    /// Returns false when the markup must be stored verbatim:
    ///
    /// 1. it contains the skip marker
    /// 2. it contains `<pre>` or `<textarea>`
    /// 3. it embeds script code (an opening `<script>` not immediately closed)
    /// 4. an attribute value contains two or more adjacent spaces
    pub fn should_minify(&self, html: &str) -> bool {
        !(html.contains(SKIP_MARKER)
            || WHITESPACE_TAG.is_match(html)
            || has_inline_script(html)
            || SPACED_ATTRIBUTE.is_match(html))
    }

    /// Minifies the markup, or returns it unchanged if `should_minify` fails
    pub fn compress(&self, html: &str) -> String {
        if !self.should_minify(html) {
            return html.to_string();
        }

        let stripped = COMMENT.replace_all(html, |caps: &Captures| {
            if keep_comment(&caps[1]) {
                caps[0].to_string()
            } else {
                String::new()
            }
        });
        let joined = LINE_START.replace_all(&stripped, " ${1}");
        let single_line = LINE_BREAK.replace_all(&joined, "");
        let collapsed = BLANKS.replace_all(&single_line, " ");

        PLACEHOLDER
            .replace_all(&collapsed, "<!--${1}-->")
            .into_owned()
    }
}

fn has_inline_script(html: &str) -> bool {
    SCRIPT_OPEN.find_iter(html).any(|open| {
        let rest = &html[open.end()..];
        !rest
            .get(..9)
            .is_some_and(|close| close.eq_ignore_ascii_case("</script>"))
    })
}

/// Conditional comments, cache markers and restored placeholders survive
fn keep_comment(inner: &str) -> bool {
    let inner = inner.trim_start();

    if inner.starts_with("[if ") || inner.starts_with("<!") || inner.starts_with('>') {
        return true;
    }

    if inner.starts_with("google") {
        return true;
    }

    inner
        .strip_prefix("cachetop")
        .is_some_and(|rest| rest.trim_start().starts_with(':'))
}
