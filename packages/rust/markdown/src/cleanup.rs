//! Pre-parse cleanup of markdown exported by the knowledge-base editor.
//!
//! Each pass is a function `&str -> String` applied in sequence.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on raw markdown text.
pub(crate) fn run_pipeline(md: &str) -> String {
    let mut result = normalize_line_endings(md);
    result = strip_empty_paragraph_markers(&result);
    result
}

// ---------------------------------------------------------------------------
// Pass 1: Line endings
// ---------------------------------------------------------------------------

fn normalize_line_endings(md: &str) -> String {
    md.replace("\r\n", "\n")
}

// ---------------------------------------------------------------------------
// Pass 2: Empty paragraph markers
// ---------------------------------------------------------------------------

/// Indentation at which a line becomes an indented code block.
const CODE_INDENT: usize = 4;

/// Drop lines consisting of a single backslash.
///
/// The editor serializes empty paragraphs as a lone `\`, which would
/// otherwise render as a visible backslash. Fenced code (at any nesting
/// depth, e.g. inside list items) and lines indented as code are left
/// untouched.
fn strip_empty_paragraph_markers(md: &str) -> String {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^\s*(`{3,}|~{3,})").expect("valid regex")
    });

    // Marker character and length of the open fence, if any.
    let mut open_fence: Option<(char, usize)> = None;
    let mut lines: Vec<&str> = Vec::new();

    for line in md.lines() {
        if let Some(marker) = FENCE_RE.captures(line).and_then(|c| c.get(1)) {
            let fence_char = marker.as_str().chars().next().unwrap_or('`');
            let fence_len = marker.as_str().len();
            open_fence = match open_fence {
                None => Some((fence_char, fence_len)),
                Some((c, len)) if c == fence_char && fence_len >= len => None,
                still_open => still_open,
            };
            lines.push(line);
            continue;
        }

        if open_fence.is_none() && is_paragraph_marker(line) {
            lines.push("");
            continue;
        }

        lines.push(line);
    }

    let mut out = lines.join("\n");
    if md.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn is_paragraph_marker(line: &str) -> bool {
    let body = line.trim_start();
    let indent = line.len() - body.len();
    body.trim_end() == "\\" && indent < CODE_INDENT
}
